//! Protective roots: keep generation artifacts alive during activation.
//!
//! The external realization tool scans named symlinks under the state
//! directory's `gcroots/` and refuses to garbage-collect anything they reach.
//! Activation registers the new generation under [`ACTIVATING_ROOT`] before
//! mutating anything, and repoints [`CURRENT_ROOT`] only on success. The
//! activating root is released on every exit path, including failure, via
//! [`RootGuard`]'s `Drop`.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::install::atomic_symlink;
use crate::error::RootsError;

/// Root name protecting the generation currently being activated.
pub const ACTIVATING_ROOT: &str = "activating-home";

/// Root name protecting the current (last successfully activated) generation.
pub const CURRENT_ROOT: &str = "current-home";

/// Scoped registration of the new generation's protective root.
#[derive(Debug)]
pub struct RootGuard {
    gcroots: PathBuf,
    released: bool,
}

impl RootGuard {
    /// Register the new-generation root: a symlink under `gcroots` pointing
    /// at the bundle directory.
    ///
    /// # Errors
    ///
    /// Returns [`RootsError::Register`] if the roots directory or the symlink
    /// cannot be created.
    pub fn register(gcroots: &Path, bundle: &Path) -> Result<Self, RootsError> {
        let root = gcroots.join(ACTIVATING_ROOT);
        let register_err = |source| RootsError::Register {
            root: root.clone(),
            source,
        };

        std::fs::create_dir_all(gcroots).map_err(register_err)?;
        atomic_symlink(bundle, &root).map_err(register_err)?;
        debug!("registered root {} -> {}", root.display(), bundle.display());

        Ok(Self {
            gcroots: gcroots.to_path_buf(),
            released: false,
        })
    }

    /// Repoint the current-generation root at `bundle`, then release the
    /// activating root. Called only once activation has fully succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`RootsError::Register`] if the current root cannot be
    /// replaced; the activating root is still released by `Drop`.
    pub fn commit(mut self, bundle: &Path) -> Result<(), RootsError> {
        let current = self.gcroots.join(CURRENT_ROOT);
        atomic_symlink(bundle, &current).map_err(|source| RootsError::Register {
            root: current.clone(),
            source,
        })?;
        debug!(
            "updated root {} -> {}",
            current.display(),
            bundle.display()
        );
        self.release();
        Ok(())
    }

    /// Remove the activating root, tolerating "already gone".
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let root = self.gcroots.join(ACTIVATING_ROOT);
        let _ = std::fs::remove_file(&root);
        debug!("released root {}", root.display());
    }
}

impl Drop for RootGuard {
    fn drop(&mut self) {
        self.release();
    }
}
