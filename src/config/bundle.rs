//! Generation bundle loading.
//!
//! A bundle is a directory produced by the configuration compiler: the
//! content-addressed artifact files plus an `entries.json` descriptor mapping
//! entry identifiers to [`DeclaredEntry`] values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::BundleError;

/// Name of the descriptor file inside a bundle directory.
const DESCRIPTOR_FILE: &str = "entries.json";

/// One declared mapping from a source artifact to a target under home.
#[derive(Debug, Clone, Deserialize)]
pub struct DeclaredEntry {
    /// Absolute path of the artifact; must exist at expansion time.
    pub source: PathBuf,
    /// Target path relative to the home directory.
    pub target: PathBuf,
    /// When set, `source` is a directory whose files are placed individually.
    #[serde(default)]
    pub recursive: bool,
    /// Advisory flag carried through to the manifest; does not affect linking.
    #[serde(default, rename = "static")]
    pub is_static: bool,
    /// Bypass collision checks and always overwrite the target.
    #[serde(default)]
    pub forced: bool,
}

/// A loaded generation bundle.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Bundle directory, also the referent of the protective roots.
    pub dir: PathBuf,
    /// Declared entries keyed by their descriptor identifier.
    pub entries: BTreeMap<String, DeclaredEntry>,
}

impl Bundle {
    /// Load the bundle rooted at `dir` by parsing its entries descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::MissingDescriptor`] when `entries.json` is
    /// absent, [`BundleError::InvalidDescriptor`] when it does not parse, and
    /// [`BundleError::AbsoluteTarget`] when any entry declares a target that
    /// is not relative to home.
    pub fn load(dir: &Path) -> Result<Self, BundleError> {
        let descriptor = dir.join(DESCRIPTOR_FILE);
        let raw = match std::fs::read_to_string(&descriptor) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BundleError::MissingDescriptor { path: descriptor });
            }
            Err(source) => {
                return Err(BundleError::Io {
                    path: descriptor,
                    source,
                });
            }
        };

        let entries: BTreeMap<String, DeclaredEntry> =
            serde_json::from_str(&raw).map_err(|source| BundleError::InvalidDescriptor {
                path: descriptor,
                source,
            })?;

        for (id, entry) in &entries {
            if entry.target.is_absolute() {
                return Err(BundleError::AbsoluteTarget {
                    id: id.clone(),
                    target: entry.target.clone(),
                });
            }
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
        })
    }

    /// The set of declared target paths, used by the cleaner's superseded
    /// check.
    #[must_use]
    pub fn declared_targets(&self) -> std::collections::BTreeSet<PathBuf> {
        self.entries.values().map(|e| e.target.clone()).collect()
    }
}
