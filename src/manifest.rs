//! The generation manifest: every target path the engine currently owns.
//!
//! A manifest is immutable once persisted. Generation N's manifest is
//! read-only input while activating generation N+1; a brand-new manifest is
//! built in memory during activation and, only on success, atomically
//! replaces the persisted one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

/// One installed symlink, the unit of tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Absolute path of the artifact the link points at.
    pub source: PathBuf,
    /// Target path relative to home; unique key within a manifest.
    pub target: PathBuf,
    /// Target of the owning recursive declared entry, when this entry was
    /// produced by expansion. Not an ownership pointer — purely a lookup aid
    /// for the cleaner's superseded check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<PathBuf>,
    /// Advisory flag carried from the declared entry.
    #[serde(default, rename = "static")]
    pub is_static: bool,
    /// Whether collision checks were bypassed when this link was installed.
    #[serde(default)]
    pub forced: bool,
}

/// Mapping from target path to [`ManifestEntry`].
///
/// Backed by a [`BTreeMap`] so serialization order is stable: re-persisting
/// an unchanged generation produces byte-identical content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<PathBuf, ManifestEntry>,
}

impl Manifest {
    /// Create an empty manifest.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Load the manifest at `path`.
    ///
    /// A missing file is not an error: it means no previous generation exists
    /// and surfaces as `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Corrupt`] when the file exists but does not
    /// parse, and [`ManifestError::Io`] on any other read failure.
    pub fn load(path: &Path) -> Result<Option<Self>, ManifestError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ManifestError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let manifest = serde_json::from_str(&raw).map_err(|source| ManifestError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(manifest))
    }

    /// Persist the manifest to `path` atomically.
    ///
    /// The content is written to a sibling temporary file and renamed into
    /// place, so the on-disk manifest is always either the fully-previous or
    /// the fully-new version, never a partial write.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Persist`] if the temporary file cannot be
    /// written or the rename fails.
    pub fn persist(&self, path: &Path) -> Result<(), ManifestError> {
        let persist_err = |source| ManifestError::Persist {
            path: path.to_path_buf(),
            source,
        };

        let mut rendered = serde_json::to_string_pretty(self)
            .map_err(|e| persist_err(std::io::Error::other(e)))?;
        rendered.push('\n');

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, rendered).map_err(persist_err)?;
        std::fs::rename(&tmp, path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp);
            persist_err(source)
        })
    }

    /// Insert an entry, keyed by its target path.
    pub fn insert(&mut self, entry: ManifestEntry) {
        self.entries.insert(entry.target.clone(), entry);
    }

    /// Whether `target` is owned by this manifest.
    #[must_use]
    pub fn contains_target(&self, target: &Path) -> bool {
        self.entries.contains_key(target)
    }

    /// Whether any entry's recorded source equals `path`.
    ///
    /// Used to recognise a link into the previous generation's storage whose
    /// target key is no longer (or was never) tracked — the corrupted-managed
    /// case left behind by a manual edit or an interrupted run.
    #[must_use]
    pub fn owns_source(&self, path: &Path) -> bool {
        self.entries.values().any(|e| e.source == path)
    }

    /// Iterate over all entries in target order.
    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.values()
    }

    /// Number of tracked targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest tracks nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn entry(source: &str, target: &str, parent: Option<&str>) -> ManifestEntry {
        ManifestEntry {
            source: PathBuf::from(source),
            target: PathBuf::from(target),
            parent: parent.map(PathBuf::from),
            is_static: false,
            forced: false,
        }
    }

    #[test]
    fn load_missing_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        let loaded = Manifest::load(&tmp.path().join("manifest.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_malformed_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("manifest.json");
        std::fs::write(&path, "{ definitely not json").unwrap();
        let err = Manifest::load(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Corrupt { .. }));
    }

    #[test]
    fn persist_then_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("manifest.json");

        let mut manifest = Manifest::new();
        manifest.insert(entry("/artifacts/genA/bashrc", ".bashrc", None));
        manifest.insert(entry(
            "/artifacts/genA/app/a.conf",
            ".config/app/a.conf",
            Some(".config/app"),
        ));
        manifest.persist(&path).unwrap();

        let loaded = Manifest::load(&path).unwrap().unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains_target(Path::new(".bashrc")));
    }

    #[test]
    fn persist_is_byte_stable() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("manifest.json");

        let mut manifest = Manifest::new();
        manifest.insert(entry("/s/b", ".b", None));
        manifest.insert(entry("/s/a", ".a", None));

        manifest.persist(&path).unwrap();
        let first = std::fs::read(&path).unwrap();
        manifest.persist(&path).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second, "re-persisting must be byte-identical");
    }

    #[test]
    fn persist_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("manifest.json");
        Manifest::new().persist(&path).unwrap();

        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["manifest.json".to_string()]);
    }

    #[test]
    fn owns_source_matches_recorded_sources() {
        let mut manifest = Manifest::new();
        manifest.insert(entry("/artifacts/genA/bashrc", ".bashrc", None));
        assert!(manifest.owns_source(Path::new("/artifacts/genA/bashrc")));
        assert!(!manifest.owns_source(Path::new("/artifacts/genB/bashrc")));
    }

    #[test]
    fn insert_replaces_same_target() {
        let mut manifest = Manifest::new();
        manifest.insert(entry("/artifacts/genA/bashrc", ".bashrc", None));
        manifest.insert(entry("/artifacts/genB/bashrc", ".bashrc", None));
        assert_eq!(manifest.len(), 1);
        let only = manifest.entries().next().unwrap();
        assert_eq!(only.source, PathBuf::from("/artifacts/genB/bashrc"));
    }

    #[test]
    fn parent_serializes_only_when_present() {
        let mut manifest = Manifest::new();
        manifest.insert(entry("/s/a", ".a", None));
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(!json.contains("parent"), "null parent must be omitted");

        let mut manifest = Manifest::new();
        manifest.insert(entry("/s/a", ".config/app/a", Some(".config/app")));
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"parent\":\".config/app\""));
    }
}
