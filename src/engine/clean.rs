//! Stale-entry cleanup: remove links belonging to the retired generation.
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CleanError;
use crate::manifest::ManifestEntry;

/// Outcome of cleaning one previous-generation manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanOutcome {
    /// The entry is carried into the new generation; the installer relinks
    /// it, so cleanup skips it.
    Superseded,
    /// The live target no longer resolves to the recorded source. The user
    /// or another tool modified it — never remove data the engine doesn't
    /// still recognise as its own.
    Diverged {
        /// What the target resolves to now, when resolvable.
        actual: Option<PathBuf>,
    },
    /// The target was removed, along with any now-empty ancestor
    /// directories.
    Removed {
        /// Number of emptied ancestor directories pruned.
        pruned_dirs: usize,
    },
    /// The target was already gone; ancestors were still pruned.
    AlreadyGone {
        /// Number of emptied ancestor directories pruned.
        pruned_dirs: usize,
    },
}

/// Clean one entry from the previous generation's manifest.
///
/// An entry is superseded — and skipped — when its target, or its parent's
/// target, appears among the new generation's declared targets. Otherwise the
/// live target is verified to still resolve to the recorded source before
/// removal; a diverged target is left alone with a warning from the caller.
/// After removal, emptied ancestor directories are pruned walking up to (but
/// excluding) the home directory.
///
/// With `dry_run` set, reports the decision without mutating anything.
///
/// # Errors
///
/// Returns [`CleanError`] when the target cannot be inspected or removed for
/// any reason other than "already gone".
pub fn clean(
    entry: &ManifestEntry,
    declared_targets: &BTreeSet<PathBuf>,
    home: &Path,
    dry_run: bool,
) -> Result<CleanOutcome, CleanError> {
    if declared_targets.contains(&entry.target)
        || entry
            .parent
            .as_ref()
            .is_some_and(|parent| declared_targets.contains(parent))
    {
        debug!("superseded, keeping: {}", entry.target.display());
        return Ok(CleanOutcome::Superseded);
    }

    let target = home.join(&entry.target);
    match std::fs::symlink_metadata(&target) {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let pruned_dirs = if dry_run {
                0
            } else {
                prune_empty_ancestors(&target, home)
            };
            return Ok(CleanOutcome::AlreadyGone { pruned_dirs });
        }
        Err(source) => {
            return Err(CleanError::Inspect {
                target: target.clone(),
                source,
            });
        }
        Ok(_) => {}
    }

    if !resolves_to_source(&target, &entry.source) {
        let actual = dunce::canonicalize(&target).ok();
        return Ok(CleanOutcome::Diverged { actual });
    }

    if dry_run {
        debug!("dry-run: would remove {}", target.display());
        return Ok(CleanOutcome::Removed { pruned_dirs: 0 });
    }

    match std::fs::remove_file(&target) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(source) => {
            return Err(CleanError::Remove {
                target: target.clone(),
                source,
            });
        }
    }
    debug!("removed stale link: {}", target.display());

    let pruned_dirs = prune_empty_ancestors(&target, home);
    Ok(CleanOutcome::Removed { pruned_dirs })
}

/// Whether the live target still resolves to the recorded source.
///
/// A direct `read_link` match is tried first so that a link whose artifact
/// has already been garbage-collected (and therefore cannot be
/// canonicalized) is still recognised as ours.
fn resolves_to_source(target: &Path, source: &Path) -> bool {
    if std::fs::read_link(target).is_ok_and(|dest| dest == source) {
        return true;
    }
    match (dunce::canonicalize(target), dunce::canonicalize(source)) {
        (Ok(real_target), Ok(real_source)) => real_target == real_source,
        _ => false,
    }
}

/// Remove emptied directories walking up from the target's parent toward
/// (but excluding) the home root.
///
/// Stops at the first non-empty directory or the first removal failure other
/// than "already gone". Directory-removal races are tolerated: a sibling
/// placement may have recreated or emptied a shared ancestor concurrently.
fn prune_empty_ancestors(target: &Path, home: &Path) -> usize {
    let mut pruned = 0;
    let mut dir = target.parent();
    while let Some(d) = dir {
        if d == home || !d.starts_with(home) {
            break;
        }
        match std::fs::remove_dir(d) {
            Ok(()) => {
                debug!("pruned empty directory: {}", d.display());
                pruned += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(_) => break,
        }
        dir = d.parent();
    }
    pruned
}
