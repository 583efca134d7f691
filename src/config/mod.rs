//! Environment settings and generation bundle loading.
pub mod bundle;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Name of the persisted manifest file inside the state directory.
const MANIFEST_FILE: &str = "manifest.json";

/// Name of the protective-roots directory inside the state directory.
const GCROOTS_DIR: &str = "gcroots";

/// Resolved per-user paths, threaded explicitly into every component.
///
/// There is deliberately no ambient global: the home and state locations are
/// resolved once at startup and passed down, so tests can point an engine at
/// a temporary directory without touching the process environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The user's home directory; all targets are placed beneath it.
    pub home: PathBuf,
    /// Per-user state location holding the manifest and protective roots.
    pub state_dir: PathBuf,
}

impl Settings {
    /// Build settings from explicit paths.
    #[must_use]
    pub const fn new(home: PathBuf, state_dir: PathBuf) -> Self {
        Self { home, state_dir }
    }

    /// Resolve settings from the process environment.
    ///
    /// The home directory comes from `HOME` (or `USERPROFILE` on Windows).
    /// The state directory is the first of: `STASH_STATE_HOME` (taken as-is),
    /// `XDG_STATE_HOME/stash`, or `<home>/.local/state/stash`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HomeNotSet`] when no home directory variable is
    /// set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = if cfg!(target_os = "windows") {
            std::env::var_os("USERPROFILE").or_else(|| std::env::var_os("HOME"))
        } else {
            std::env::var_os("HOME")
        }
        .map(PathBuf::from)
        .ok_or(ConfigError::HomeNotSet)?;

        let state_dir = std::env::var_os("STASH_STATE_HOME").map_or_else(
            || {
                std::env::var_os("XDG_STATE_HOME").map_or_else(
                    || home.join(".local/state/stash"),
                    |xdg| PathBuf::from(xdg).join("stash"),
                )
            },
            PathBuf::from,
        );

        Ok(Self { home, state_dir })
    }

    /// Path of the persisted manifest file.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.state_dir.join(MANIFEST_FILE)
    }

    /// Directory of protective-root symlinks scanned by the external
    /// realization tool.
    #[must_use]
    pub fn gcroots_dir(&self) -> PathBuf {
        self.state_dir.join(GCROOTS_DIR)
    }

    /// Ensure the state directory exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::StateDir`] if the directory cannot be created.
    pub fn ensure_state_dir(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.state_dir).map_err(|source| ConfigError::StateDir {
            path: self.state_dir.clone(),
            source,
        })
    }

    /// Absolute form of a target path declared relative to home.
    #[must_use]
    pub fn target_abs(&self, target: &Path) -> PathBuf {
        self.home.join(target)
    }
}
