//! Domain-specific error types for the activation engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ManifestError`],
//! [`InstallError`]) while the command handler at the CLI boundary converts
//! them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! ActivationError
//! ├── Config(ConfigError)     — home/state directory resolution
//! ├── Bundle(BundleError)     — generation bundle descriptor loading
//! ├── Manifest(ManifestError) — manifest load/persist
//! ├── Roots(RootsError)       — protective-root registration
//! └── Engine(EngineError)     — expansion, classification, fatal collisions
//! ```
//!
//! Mutation-phase failures ([`InstallError`], [`CleanError`]) are deliberately
//! *not* part of [`ActivationError`]: they are reported per entry as warnings
//! and never abort sibling entries.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for an activation run.
///
/// Every variant is fatal: by construction, an `ActivationError` is only ever
/// produced before the first filesystem mutation, or while persisting the
/// manifest after the mutation phase has completed.
#[derive(Error, Debug)]
pub enum ActivationError {
    /// Environment resolution error (home or state directory).
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generation bundle could not be loaded.
    #[error("bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// Previous manifest unreadable, or new manifest could not be persisted.
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Protective root registration or commit failed.
    #[error("protective root error: {0}")]
    Roots(#[from] RootsError),

    /// The engine aborted before mutating anything.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Errors that arise from environment resolution.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The home directory environment variable is unset.
    #[error("HOME environment variable is not set")]
    HomeNotSet,

    /// The state directory could not be created.
    #[error("creating state directory {path}: {source}")]
    StateDir {
        /// Path of the state directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise from loading a generation bundle.
#[derive(Error, Debug)]
pub enum BundleError {
    /// The bundle directory has no entries descriptor.
    #[error("bundle has no entries descriptor at {path}")]
    MissingDescriptor {
        /// Expected path of the descriptor file.
        path: PathBuf,
    },

    /// The entries descriptor is not valid JSON or has the wrong shape.
    #[error("invalid entries descriptor {path}: {source}")]
    InvalidDescriptor {
        /// Path of the malformed descriptor.
        path: PathBuf,
        /// Underlying deserialization error.
        source: serde_json::Error,
    },

    /// A declared target escapes the home directory.
    #[error("entry '{id}' declares non-relative target {target}")]
    AbsoluteTarget {
        /// Identifier of the offending entry in the descriptor.
        id: String,
        /// The declared target path.
        target: PathBuf,
    },

    /// An I/O error occurred while reading the descriptor.
    #[error("reading {path}: {source}")]
    Io {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise from the manifest store.
///
/// A *missing* manifest file is not an error — it is the first-ever
/// activation and surfaces as `Ok(None)` from the loader. Malformed content
/// is treated conservatively as blocking rather than silently discarded.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file exists but cannot be parsed.
    #[error("corrupt manifest {path}: {source}")]
    Corrupt {
        /// Path of the unreadable manifest.
        path: PathBuf,
        /// Underlying deserialization error.
        source: serde_json::Error,
    },

    /// An I/O error occurred while reading the manifest.
    #[error("reading manifest {path}: {source}")]
    Io {
        /// Path of the manifest file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The new manifest could not be written or renamed into place.
    #[error("persisting manifest {path}: {source}")]
    Persist {
        /// Final path of the manifest file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise from protective-root registration.
#[derive(Error, Debug)]
pub enum RootsError {
    /// The root symlink could not be created or replaced.
    #[error("registering root {root}: {source}")]
    Register {
        /// Path of the root symlink.
        root: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that abort the whole activation before any mutation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A declared or expanded entry's source is absent.
    #[error(transparent)]
    Expand(#[from] ExpandError),

    /// Classification of a placement failed (comparator or path resolution).
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// One or more targets are unmanaged symlinks with differing content.
    ///
    /// This is the primary data-safety guarantee: the engine never overwrites
    /// an unmanaged symlink, and it reports every offending target at once.
    #[error("unmanaged symlinks at {} target(s), refusing to activate: {}", .0.len(), join_paths(.0))]
    FatalCollisions(Vec<PathBuf>),
}

/// Errors that arise while expanding declared entries into placements.
#[derive(Error, Debug)]
pub enum ExpandError {
    /// A declared source does not exist at expansion time.
    #[error("source {source_path} for target {target} does not exist")]
    SourceMissing {
        /// The absent source path.
        source_path: PathBuf,
        /// Target of the declared entry, for context.
        target: PathBuf,
    },

    /// A recursive source directory could not be walked.
    #[error("walking {dir}: {source}")]
    Walk {
        /// Directory that could not be read.
        dir: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise while classifying a single placement.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// The external equality primitive failed outright.
    #[error(transparent)]
    Comparator(#[from] ComparatorError),

    /// An existing target's real path could not be resolved.
    #[error("resolving {path}: {source}")]
    Resolve {
        /// Path whose resolution failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors from the external byte-equality primitive.
///
/// Distinct from any collision verdict: the comparator reporting *different*
/// is a classification input, while the comparator failing to run at all is
/// a tool error that aborts the activation.
#[derive(Error, Debug)]
pub enum ComparatorError {
    /// The comparator process could not be launched.
    #[error("comparator execution failed: {0}")]
    Execution(String),

    /// The comparator exited with neither the equal nor the different code.
    #[error("comparator exited with unexpected status {code} for {a} vs {b}")]
    UnexpectedExit {
        /// Raw exit code (-1 when terminated by signal).
        code: i32,
        /// First compared path.
        a: PathBuf,
        /// Second compared path.
        b: PathBuf,
    },
}

/// Per-entry errors from the link installer.
///
/// Reported as warnings during the mutation phase; the failed entry is
/// excluded from the new manifest but sibling entries proceed.
#[derive(Error, Debug)]
pub enum InstallError {
    /// A backup already exists at the backup path.
    #[error("backup already exists at {backup}")]
    BackupCollision {
        /// The occupied backup path.
        backup: PathBuf,
    },

    /// The existing target could not be renamed to its backup path.
    #[error("backing up {target} to {backup}: {source}")]
    Backup {
        /// Target being backed up.
        target: PathBuf,
        /// Intended backup path.
        backup: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Ancestor directories of the target could not be created.
    #[error("creating parent directories for {target}: {source}")]
    CreateDirs {
        /// Target whose ancestors could not be created.
        target: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The symlink could not be created or renamed into place.
    #[error("installing link {target} -> {link_source}: {source}")]
    Link {
        /// Final target path of the link.
        target: PathBuf,
        /// Artifact the link points at.
        link_source: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Per-entry errors from the stale-entry cleaner.
#[derive(Error, Debug)]
pub enum CleanError {
    /// The stale target could not be inspected.
    #[error("inspecting {target}: {source}")]
    Inspect {
        /// Target that could not be inspected.
        target: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The stale target could not be removed.
    #[error("removing {target}: {source}")]
    Remove {
        /// Target that could not be removed.
        target: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Render a path list for error messages: comma-separated display paths.
fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
