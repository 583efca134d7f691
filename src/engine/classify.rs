//! Collision classification: decide, per placement, whether installing a new
//! link is safe, backup-requiring, or fatal.
//!
//! Classification reconciles three sources of truth — live filesystem state,
//! the previous generation's manifest, and the new generation's declared
//! entries — and performs no mutation, so the orchestrator fans it out across
//! all placements concurrently.

use std::path::{Path, PathBuf};

use super::Placement;
use super::compare::{Comparator, Comparison};
use crate::error::ClassifyError;
use crate::manifest::Manifest;

/// Per-placement collision verdict.
///
/// A closed set of named outcomes, each carrying four orthogonal facets:
///
/// | Verdict                   | collision | overwrite-safe | needs backup | fatal |
/// |---------------------------|-----------|----------------|--------------|-------|
/// | `Nothing`                 | no        | –              | –            | no    |
/// | `Forced`                  | no        | yes            | no           | no    |
/// | `IdenticalFiles`          | yes       | no             | no           | no    |
/// | `ManagedSymlink`          | yes       | yes            | no           | no    |
/// | `CorruptedManagedSymlink` | yes       | yes            | no           | no    |
/// | `FileAtTarget`            | yes       | no             | yes          | no    |
/// | `SymlinkAtTarget`         | yes       | no             | no           | yes   |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The target does not exist; plain install.
    Nothing,
    /// The placement is forced; checks were bypassed entirely.
    Forced,
    /// The target already points at, or matches, the source; skip.
    IdenticalFiles,
    /// The target path was owned by the previous manifest; safe overwrite.
    ManagedSymlink,
    /// The target resolves into the previous generation's storage but isn't
    /// in its manifest (manual edit or interrupted run); safe overwrite.
    CorruptedManagedSymlink,
    /// Unmanaged plain file with differing content; back up, then overwrite.
    FileAtTarget,
    /// Unmanaged symlink with differing content — a symlink cannot be safely
    /// backed up, so the whole activation aborts.
    SymlinkAtTarget,
}

impl Verdict {
    /// Whether the target already existed.
    #[must_use]
    pub const fn is_collision(self) -> bool {
        !matches!(self, Self::Nothing | Self::Forced)
    }

    /// Whether the target may be replaced without a backup.
    #[must_use]
    pub const fn overwrite_safe(self) -> bool {
        matches!(
            self,
            Self::Forced | Self::ManagedSymlink | Self::CorruptedManagedSymlink
        )
    }

    /// Whether existing content must be preserved before replacing.
    #[must_use]
    pub const fn needs_backup(self) -> bool {
        matches!(self, Self::FileAtTarget)
    }

    /// Whether this placement must not proceed, aborting the activation.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::SymlinkAtTarget)
    }
}

/// Classify one placement against live filesystem state and the previous
/// generation's manifest.
///
/// Decision order, first match wins:
///
/// 1. target absent on disk → [`Verdict::Nothing`]
/// 2. placement forced → [`Verdict::Forced`]
/// 3. target's real path equals the source → [`Verdict::IdenticalFiles`]
/// 4. previous manifest owns the target path → [`Verdict::ManagedSymlink`]
/// 5. previous manifest owns the resolved real path →
///    [`Verdict::CorruptedManagedSymlink`]
/// 6. byte comparison: equal → [`Verdict::IdenticalFiles`]; different →
///    [`Verdict::SymlinkAtTarget`] for symlinks, [`Verdict::FileAtTarget`]
///    otherwise
///
/// Existence in step 1 follows symlinks: a dangling symlink probes as absent
/// and will simply be renamed over by the installer.
///
/// # Errors
///
/// Returns [`ClassifyError::Resolve`] when an existing target cannot be
/// canonicalized, and [`ClassifyError::Comparator`] when the external
/// equality primitive fails — both abort the activation before any mutation.
pub fn classify(
    placement: &Placement,
    previous: Option<&Manifest>,
    comparator: &dyn Comparator,
    home: &Path,
) -> Result<Verdict, ClassifyError> {
    let target = home.join(&placement.target);

    // `exists` follows symlinks, matching the original stat-based probe.
    if !target.exists() {
        return Ok(Verdict::Nothing);
    }
    if placement.forced {
        return Ok(Verdict::Forced);
    }

    let real = canonicalize(&target)?;
    let source_real = canonicalize(&placement.source)?;
    if real == source_real {
        return Ok(Verdict::IdenticalFiles);
    }

    if let Some(prev) = previous {
        if prev.contains_target(&placement.target) {
            return Ok(Verdict::ManagedSymlink);
        }
        if owns_real_source(prev, &real) {
            return Ok(Verdict::CorruptedManagedSymlink);
        }
    }

    match comparator.compare(&placement.source, &real)? {
        Comparison::Equal => Ok(Verdict::IdenticalFiles),
        Comparison::Different => {
            let is_symlink = target
                .symlink_metadata()
                .map(|m| m.is_symlink())
                .unwrap_or(false);
            if is_symlink {
                Ok(Verdict::SymlinkAtTarget)
            } else {
                Ok(Verdict::FileAtTarget)
            }
        }
    }
}

/// Whether any previous-manifest entry's source is `real`.
///
/// Recorded sources are compared both verbatim and canonicalized, since
/// `real` has already been resolved through any symlinked path components.
fn owns_real_source(prev: &Manifest, real: &Path) -> bool {
    prev.owns_source(real)
        || prev
            .entries()
            .any(|e| dunce::canonicalize(&e.source).is_ok_and(|c| c == real))
}

/// Symlink-following canonicalization without Windows UNC noise.
fn canonicalize(path: &Path) -> Result<PathBuf, ClassifyError> {
    dunce::canonicalize(path).map_err(|source| ClassifyError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::ComparatorError;
    use crate::manifest::ManifestEntry;

    /// Test comparator with a fixed answer, so classification tests do not
    /// depend on an external binary.
    struct FixedComparator(Result<Comparison, ()>);

    impl Comparator for FixedComparator {
        fn compare(&self, _: &Path, _: &Path) -> Result<Comparison, ComparatorError> {
            self.0
                .map_err(|()| ComparatorError::Execution("forced failure".to_string()))
        }
    }

    fn placement(source: &Path, target: &str, forced: bool) -> Placement {
        Placement {
            source: source.to_path_buf(),
            target: PathBuf::from(target),
            parent: None,
            is_static: false,
            forced,
        }
    }

    fn manifest_with(source: &Path, target: &str) -> Manifest {
        let mut m = Manifest::new();
        m.insert(ManifestEntry {
            source: source.to_path_buf(),
            target: PathBuf::from(target),
            parent: None,
            is_static: false,
            forced: false,
        });
        m
    }

    #[test]
    fn absent_target_is_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src");
        std::fs::write(&source, "content").unwrap();

        let verdict = classify(
            &placement(&source, ".bashrc", false),
            None,
            &FixedComparator(Ok(Comparison::Different)),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(verdict, Verdict::Nothing);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_probes_as_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src");
        std::fs::write(&source, "content").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone"), tmp.path().join(".bashrc")).unwrap();

        let verdict = classify(
            &placement(&source, ".bashrc", false),
            None,
            &FixedComparator(Ok(Comparison::Different)),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(verdict, Verdict::Nothing);
    }

    #[test]
    fn forced_bypasses_all_checks() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src");
        std::fs::write(&source, "content").unwrap();
        std::fs::write(tmp.path().join(".bashrc"), "other").unwrap();

        let verdict = classify(
            &placement(&source, ".bashrc", true),
            None,
            &FixedComparator(Err(())),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(verdict, Verdict::Forced);
    }

    #[cfg(unix)]
    #[test]
    fn link_already_pointing_at_source_is_identical() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src");
        std::fs::write(&source, "content").unwrap();
        std::os::unix::fs::symlink(&source, tmp.path().join(".bashrc")).unwrap();

        let verdict = classify(
            &placement(&source, ".bashrc", false),
            None,
            &FixedComparator(Ok(Comparison::Different)),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(verdict, Verdict::IdenticalFiles);
    }

    #[test]
    fn previous_manifest_target_is_managed() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src");
        std::fs::write(&source, "content").unwrap();
        std::fs::write(tmp.path().join(".bashrc"), "old content").unwrap();

        let prev = manifest_with(Path::new("/artifacts/old/bashrc"), ".bashrc");
        let verdict = classify(
            &placement(&source, ".bashrc", false),
            Some(&prev),
            &FixedComparator(Ok(Comparison::Different)),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(verdict, Verdict::ManagedSymlink);
    }

    #[cfg(unix)]
    #[test]
    fn link_into_previous_storage_without_key_is_corrupted_managed() {
        let tmp = tempfile::tempdir().unwrap();
        let old_artifact = tmp.path().join("old-artifact");
        std::fs::write(&old_artifact, "old").unwrap();
        let source = tmp.path().join("src");
        std::fs::write(&source, "new").unwrap();
        // Link at an untracked target pointing into the old generation.
        std::os::unix::fs::symlink(&old_artifact, tmp.path().join(".profile")).unwrap();

        let prev = manifest_with(&old_artifact, ".bashrc");
        let verdict = classify(
            &placement(&source, ".profile", false),
            Some(&prev),
            &FixedComparator(Ok(Comparison::Different)),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(verdict, Verdict::CorruptedManagedSymlink);
    }

    #[test]
    fn equal_content_is_identical() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src");
        std::fs::write(&source, "same").unwrap();
        std::fs::write(tmp.path().join(".bashrc"), "same").unwrap();

        let verdict = classify(
            &placement(&source, ".bashrc", false),
            None,
            &FixedComparator(Ok(Comparison::Equal)),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(verdict, Verdict::IdenticalFiles);
    }

    #[test]
    fn differing_plain_file_needs_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src");
        std::fs::write(&source, "new").unwrap();
        std::fs::write(tmp.path().join(".bashrc"), "old").unwrap();

        let verdict = classify(
            &placement(&source, ".bashrc", false),
            None,
            &FixedComparator(Ok(Comparison::Different)),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(verdict, Verdict::FileAtTarget);
        assert!(verdict.needs_backup());
        assert!(!verdict.is_fatal());
    }

    #[cfg(unix)]
    #[test]
    fn differing_unmanaged_symlink_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src");
        std::fs::write(&source, "new").unwrap();
        let elsewhere = tmp.path().join("elsewhere");
        std::fs::write(&elsewhere, "old").unwrap();
        std::os::unix::fs::symlink(&elsewhere, tmp.path().join(".bashrc")).unwrap();

        let verdict = classify(
            &placement(&source, ".bashrc", false),
            None,
            &FixedComparator(Ok(Comparison::Different)),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(verdict, Verdict::SymlinkAtTarget);
        assert!(verdict.is_fatal());
    }

    #[test]
    fn comparator_failure_propagates() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src");
        std::fs::write(&source, "new").unwrap();
        std::fs::write(tmp.path().join(".bashrc"), "old").unwrap();

        let err = classify(
            &placement(&source, ".bashrc", false),
            None,
            &FixedComparator(Err(())),
            tmp.path(),
        )
        .unwrap_err();
        assert!(matches!(err, ClassifyError::Comparator(_)));
    }

    #[test]
    fn facet_table_holds() {
        use Verdict::{
            CorruptedManagedSymlink, FileAtTarget, Forced, IdenticalFiles, ManagedSymlink, Nothing,
            SymlinkAtTarget,
        };

        assert!(!Nothing.is_collision());
        assert!(!Forced.is_collision());
        for v in [
            IdenticalFiles,
            ManagedSymlink,
            CorruptedManagedSymlink,
            FileAtTarget,
            SymlinkAtTarget,
        ] {
            assert!(v.is_collision(), "{v:?} should be a collision");
        }

        for v in [Forced, ManagedSymlink, CorruptedManagedSymlink] {
            assert!(v.overwrite_safe(), "{v:?} should be overwrite-safe");
        }
        for v in [IdenticalFiles, FileAtTarget, SymlinkAtTarget] {
            assert!(!v.overwrite_safe(), "{v:?} should not be overwrite-safe");
        }

        assert!(FileAtTarget.needs_backup());
        assert!(SymlinkAtTarget.is_fatal());
        for v in [
            Nothing,
            Forced,
            IdenticalFiles,
            ManagedSymlink,
            CorruptedManagedSymlink,
            FileAtTarget,
        ] {
            assert!(!v.is_fatal(), "{v:?} should not be fatal");
        }
    }
}
