// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed activation environment (home, state
// and artifact trees plus generation bundles) so each integration test can
// exercise full activations without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use stash_activate::config::Settings;
use stash_activate::config::bundle::Bundle;
use stash_activate::engine::activate::{self, ActivationReport};
use stash_activate::engine::compare::{Comparator, Comparison};
use stash_activate::error::{ActivationError, ComparatorError};

/// An isolated activation environment backed by a [`tempfile::TempDir`].
///
/// Layout:
/// - `home/`      — the directory links are placed into
/// - `state/`     — manifest and protective roots
/// - `artifacts/` — content-addressed source files, grouped by generation
/// - `bundles/`   — generation bundles with their `entries.json` descriptors
pub struct ActivationFixture {
    root: tempfile::TempDir,
}

impl ActivationFixture {
    /// Create a fresh environment with empty home, state, and artifact trees.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        for dir in ["home", "state", "artifacts", "bundles"] {
            std::fs::create_dir_all(root.path().join(dir)).expect("create fixture dir");
        }
        Self { root }
    }

    /// The home directory targets are placed into.
    pub fn home(&self) -> PathBuf {
        self.root.path().join("home")
    }

    /// The state directory holding the manifest and protective roots.
    pub fn state(&self) -> PathBuf {
        self.root.path().join("state")
    }

    /// Settings pointing the engine at this fixture.
    pub fn settings(&self) -> Settings {
        Settings::new(self.home(), self.state())
    }

    /// Path of the persisted manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.settings().manifest_path()
    }

    /// Write an artifact file under `artifacts/<rel>`, creating parents.
    pub fn write_artifact(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.path().join("artifacts").join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create artifact parent");
        }
        std::fs::write(&path, content).expect("write artifact");
        path
    }

    /// Create an artifact directory under `artifacts/<rel>` for recursive
    /// entries.
    pub fn artifact_dir(&self, rel: &str) -> PathBuf {
        let path = self.root.path().join("artifacts").join(rel);
        std::fs::create_dir_all(&path).expect("create artifact dir");
        path
    }

    /// Materialise a generation bundle named `name` from a JSON descriptor
    /// value and load it.
    pub fn bundle(&self, name: &str, entries: &serde_json::Value) -> Bundle {
        let dir = self.root.path().join("bundles").join(name);
        std::fs::create_dir_all(&dir).expect("create bundle dir");
        let rendered = serde_json::to_string_pretty(entries).expect("render descriptor");
        std::fs::write(dir.join("entries.json"), rendered).expect("write descriptor");
        Bundle::load(&dir).expect("load bundle")
    }

    /// Run a full activation of `bundle` against this fixture.
    pub fn activate(&self, bundle: &Bundle) -> Result<ActivationReport, ActivationError> {
        activate::activate(&self.settings(), bundle, &ByteComparator, false)
    }

    /// Run a dry-run activation of `bundle` against this fixture.
    pub fn activate_dry(&self, bundle: &Bundle) -> Result<ActivationReport, ActivationError> {
        activate::activate(&self.settings(), bundle, &ByteComparator, true)
    }

    /// Raw bytes of the persisted manifest, for byte-stability assertions.
    pub fn manifest_bytes(&self) -> Vec<u8> {
        std::fs::read(self.manifest_path()).expect("read manifest")
    }

    /// Parsed JSON value of the persisted manifest.
    pub fn manifest_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.manifest_bytes()).expect("parse manifest")
    }
}

/// In-process byte comparator, so integration tests do not depend on an
/// external `cmp` binary being present.
pub struct ByteComparator;

impl Comparator for ByteComparator {
    fn compare(&self, a: &Path, b: &Path) -> Result<Comparison, ComparatorError> {
        let read = |p: &Path| {
            std::fs::read(p)
                .map_err(|e| ComparatorError::Execution(format!("reading {}: {e}", p.display())))
        };
        if read(a)? == read(b)? {
            Ok(Comparison::Equal)
        } else {
            Ok(Comparison::Different)
        }
    }
}
