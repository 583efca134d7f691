//! Link installation: optional backup, then atomic symlink swap.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::Placement;
use super::classify::Verdict;
use crate::error::InstallError;

/// Suffix appended to a target's file name when backing it up.
pub const BACKUP_SUFFIX: &str = "stash.bak";

/// Suffix of the temporary sibling link used for the atomic swap.
const TMP_SUFFIX: &str = "stash-tmp";

// Process-wide counter producing unique temporary names.
static NEXT_TMP: AtomicU64 = AtomicU64::new(0);

/// Outcome of installing one placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// A new link was installed.
    Installed {
        /// Whether the previous target content was moved to a backup first.
        backed_up: bool,
    },
    /// The target already matched the source; nothing was touched.
    AlreadyLinked,
}

/// Install the link for one placement according to its verdict.
///
/// `IdenticalFiles` is a no-op. `FileAtTarget` first renames the existing
/// target to `<target>.stash.bak`. All ancestor directories are created, then
/// the symlink is created at a sibling temporary path and renamed over the
/// final target — there is no window where the target is missing or
/// half-written, and a crash on either side of the rename leaves a fully
/// consistent target.
///
/// With `dry_run` set, logs the planned mutation and reports the outcome
/// without touching the filesystem.
///
/// # Errors
///
/// Returns [`InstallError::BackupCollision`] when a backup already occupies
/// the backup path, or an I/O-carrying variant when a mutation step fails.
pub fn install(
    placement: &Placement,
    verdict: Verdict,
    home: &Path,
    dry_run: bool,
) -> Result<InstallOutcome, InstallError> {
    if verdict == Verdict::IdenticalFiles {
        debug!("already linked: {}", placement.target.display());
        return Ok(InstallOutcome::AlreadyLinked);
    }

    let target = home.join(&placement.target);

    if dry_run {
        debug!(
            "dry-run: would link {} -> {}",
            target.display(),
            placement.source.display()
        );
        return Ok(InstallOutcome::Installed {
            backed_up: verdict.needs_backup(),
        });
    }

    let mut backed_up = false;
    if verdict.needs_backup() {
        let backup = backup_path(&target);
        if backup.symlink_metadata().is_ok() {
            return Err(InstallError::BackupCollision { backup });
        }
        std::fs::rename(&target, &backup).map_err(|source| InstallError::Backup {
            target: target.clone(),
            backup: backup.clone(),
            source,
        })?;
        debug!("backed up {} to {}", target.display(), backup.display());
        backed_up = true;
    }

    if let Some(parent) = target.parent() {
        // Concurrent placements may share ancestors; create_dir_all treats
        // "already exists" as success.
        std::fs::create_dir_all(parent).map_err(|source| InstallError::CreateDirs {
            target: target.clone(),
            source,
        })?;
    }

    atomic_symlink(&placement.source, &target).map_err(|source| InstallError::Link {
        target: target.clone(),
        link_source: placement.source.clone(),
        source,
    })?;

    debug!(
        "linked {} -> {}",
        target.display(),
        placement.source.display()
    );
    Ok(InstallOutcome::Installed { backed_up })
}

/// The backup path for `target`: the same path with `.stash.bak` appended to
/// the file name.
#[must_use]
pub fn backup_path(target: &Path) -> PathBuf {
    let name = target.file_name().map_or_else(
        || BACKUP_SUFFIX.to_string(),
        |n| format!("{}.{BACKUP_SUFFIX}", n.to_string_lossy()),
    );
    target.with_file_name(name)
}

/// Atomically point `target` at `source`.
///
/// The link is created under a unique sibling temporary name and renamed over
/// the final path, replacing whatever is there. Re-running after a crash is
/// idempotent: before the rename the old target is untouched, after it the
/// new link is fully installed.
///
/// # Errors
///
/// Returns the underlying I/O error if the link cannot be created or renamed.
pub(crate) fn atomic_symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let name = target
        .file_name()
        .map_or_else(|| "link".to_string(), |n| n.to_string_lossy().into_owned());
    let counter = NEXT_TMP.fetch_add(1, Ordering::Relaxed);
    let tmp = parent.join(format!(
        ".{name}.{}.{counter}.{TMP_SUFFIX}",
        std::process::id()
    ));

    create_symlink(source, &tmp)?;
    if let Err(e) = std::fs::rename(&tmp, target) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Create a symlink (platform-specific).
fn create_symlink(source: &Path, link: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source, link)
    }

    #[cfg(windows)]
    {
        if source.is_dir() {
            std::os::windows::fs::symlink_dir(source, link)
        } else {
            std::os::windows::fs::symlink_file(source, link)
        }
    }
}
