//! Entry expansion: declared entries to per-file placements.
use std::path::{Path, PathBuf};

use tracing::debug;

use super::Placement;
use crate::config::bundle::DeclaredEntry;
use crate::error::ExpandError;

/// Expand every declared entry of a generation into a flat placement list.
///
/// # Errors
///
/// Returns [`ExpandError::SourceMissing`] if any declared source is absent,
/// or [`ExpandError::Walk`] if a recursive source cannot be read.
pub fn expand_entries(entries: &[DeclaredEntry]) -> Result<Vec<Placement>, ExpandError> {
    let mut placements = Vec::new();
    for entry in entries {
        expand(entry, &mut placements)?;
    }
    Ok(placements)
}

/// Expand one declared entry, appending placements in walk order.
///
/// Non-recursive entries yield exactly one placement mirroring the input.
/// Recursive entries walk the source directory and place each contained file
/// at `target/<path relative to source>`, with `parent` recording the
/// declared target. Symlinks inside the source are not followed.
///
/// # Errors
///
/// Returns [`ExpandError::SourceMissing`] if the source is absent at
/// expansion time.
pub fn expand(entry: &DeclaredEntry, out: &mut Vec<Placement>) -> Result<(), ExpandError> {
    if entry.source.symlink_metadata().is_err() {
        return Err(ExpandError::SourceMissing {
            source_path: entry.source.clone(),
            target: entry.target.clone(),
        });
    }

    if entry.recursive {
        let before = out.len();
        walk_files(entry, &entry.source, out)?;
        debug!(
            "expanded {} into {} placement(s)",
            entry.target.display(),
            out.len() - before
        );
    } else {
        out.push(Placement {
            source: entry.source.clone(),
            target: entry.target.clone(),
            parent: None,
            is_static: entry.is_static,
            forced: entry.forced,
        });
    }
    Ok(())
}

/// Depth-first walk of `dir`, placing every regular file it contains.
///
/// Directory entries are sorted so expansion order is deterministic across
/// runs. Symlinks are skipped via `symlink_metadata`, never followed.
fn walk_files(
    entry: &DeclaredEntry,
    dir: &Path,
    out: &mut Vec<Placement>,
) -> Result<(), ExpandError> {
    let walk_err = |source| ExpandError::Walk {
        dir: dir.to_path_buf(),
        source,
    };

    let mut children: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(walk_err)?
        .map(|e| e.map(|entry| entry.path()))
        .collect::<Result<_, _>>()
        .map_err(walk_err)?;
    children.sort();

    for child in children {
        let meta = child.symlink_metadata().map_err(walk_err)?;
        if meta.is_dir() {
            walk_files(entry, &child, out)?;
        } else if meta.is_file() {
            // Strip the source prefix to compute the target-relative path.
            let rel = child.strip_prefix(&entry.source).unwrap_or(&child);
            out.push(Placement {
                source: child.clone(),
                target: entry.target.join(rel),
                parent: Some(entry.target.clone()),
                is_static: entry.is_static,
                forced: entry.forced,
            });
        }
        // Symlinks and other file types inside the source are not placed.
    }
    Ok(())
}
