//! The activation orchestrator: a single all-or-nothing-before-mutation
//! transaction over one generation transition.
//!
//! States: `Expanding → Classifying → Barrier → CleaningAndInstalling →
//! Persisting → Done`, with `Aborted` reachable from classification and the
//! barrier. Classification is read-only and fans out across placements; the
//! barrier awaits every verdict before evaluating any of them, and no
//! mutation begins until it passes.

use std::path::PathBuf;
use std::sync::Mutex;

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use super::Placement;
use super::classify::{self, Verdict};
use super::clean::{self, CleanOutcome};
use super::compare::Comparator;
use super::expand;
use super::install::{self, InstallOutcome};
use super::roots::RootGuard;
use crate::config::Settings;
use crate::config::bundle::Bundle;
use crate::error::{ActivationError, ClassifyError, EngineError};
use crate::manifest::Manifest;

/// Per-outcome counts for one activation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Total placements after expansion.
    pub placements: usize,
    /// Links newly installed or re-pointed.
    pub installed: usize,
    /// Placements whose target already matched; untouched.
    pub already_linked: usize,
    /// Installs that moved prior content to a backup first.
    pub backed_up: usize,
    /// Stale links removed.
    pub removed: usize,
    /// Stale entries whose target was gone already.
    pub already_gone: usize,
    /// Stale entries carried into the new generation; left for the installer.
    pub superseded: usize,
    /// Stale entries skipped because the live target no longer matched.
    pub diverged: usize,
    /// Emptied ancestor directories pruned during cleanup.
    pub pruned_dirs: usize,
    /// Entries whose mutation failed; excluded from the new manifest.
    pub failed: usize,
}

impl std::ops::AddAssign for ActivationReport {
    fn add_assign(&mut self, rhs: Self) {
        self.placements += rhs.placements;
        self.installed += rhs.installed;
        self.already_linked += rhs.already_linked;
        self.backed_up += rhs.backed_up;
        self.removed += rhs.removed;
        self.already_gone += rhs.already_gone;
        self.superseded += rhs.superseded;
        self.diverged += rhs.diverged;
        self.pruned_dirs += rhs.pruned_dirs;
        self.failed += rhs.failed;
    }
}

impl ActivationReport {
    /// One-line human summary in the style of a task result.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} linked, {} already ok, {} backed up, {} cleaned, {} failed",
            self.installed, self.already_linked, self.backed_up, self.removed, self.failed
        )
    }
}

/// Activate the generation in `bundle` against the current state of `home`.
///
/// Loads the previous manifest, expands and classifies every declared entry,
/// aborts with zero side effects on any fatal classification, then cleans
/// stale entries, installs the new placements, and atomically persists the
/// new manifest. The new generation's protective root is registered before
/// the first mutation and released on every exit path; the current-generation
/// root is repointed only on success.
///
/// Per-entry mutation failures are logged as warnings and excluded from the
/// persisted manifest without aborting sibling entries; the caller decides
/// the process exit status from [`ActivationReport::failed`].
///
/// # Errors
///
/// Returns [`ActivationError`] for every pre-mutation abort (missing source,
/// comparator failure, fatal collision, corrupt manifest) and for a failure
/// to persist the manifest or roots after mutation.
pub fn activate(
    settings: &Settings,
    bundle: &Bundle,
    comparator: &dyn Comparator,
    dry_run: bool,
) -> Result<ActivationReport, ActivationError> {
    // Expanding
    let entries: Vec<_> = bundle.entries.values().cloned().collect();
    let placements = expand::expand_entries(&entries).map_err(EngineError::from)?;
    debug!(
        "expanded {} declared entries into {} placements",
        entries.len(),
        placements.len()
    );

    let previous = Manifest::load(&settings.manifest_path())?;
    if let Some(prev) = previous.as_ref() {
        debug!("previous generation tracks {} targets", prev.len());
    } else {
        debug!("no previous generation manifest");
    }

    // Classifying: read-only fan-out with a full join before the barrier.
    let results: Vec<Result<Verdict, ClassifyError>> = placements
        .par_iter()
        .map(|p| classify::classify(p, previous.as_ref(), comparator, &settings.home))
        .collect();

    // Barrier: every placement has a verdict (or error) before any decision.
    let verdicts = barrier(settings, &placements, results)?;

    let mut report = ActivationReport {
        placements: placements.len(),
        ..ActivationReport::default()
    };

    // CleaningAndInstalling: the protective root brackets all mutation.
    let guard = if dry_run {
        info!("dry-run: no filesystem changes will be made");
        None
    } else {
        settings.ensure_state_dir()?;
        Some(RootGuard::register(&settings.gcroots_dir(), &bundle.dir)?)
    };

    if let Some(prev) = previous.as_ref() {
        report += clean_stale(settings, bundle, prev, dry_run);
    }

    let (new_manifest, install_report) =
        install_placements(settings, &placements, &verdicts, dry_run);
    report += install_report;

    // Persisting
    if !dry_run {
        new_manifest.persist(&settings.manifest_path())?;
        debug!(
            "persisted manifest with {} entries to {}",
            new_manifest.len(),
            settings.manifest_path().display()
        );
        if report.failed == 0
            && let Some(guard) = guard
        {
            guard.commit(&bundle.dir)?;
        }
        // On partial failure the guard drops here, releasing the activating
        // root while leaving the current root on the previous generation.
    }

    Ok(report)
}

/// Evaluate all classification results at once.
///
/// Comparator and resolution errors abort first; otherwise every fatal
/// verdict is reported before the activation aborts with the complete target
/// list. Returns the verdicts aligned with the placement order.
fn barrier(
    settings: &Settings,
    placements: &[Placement],
    results: Vec<Result<Verdict, ClassifyError>>,
) -> Result<Vec<Verdict>, ActivationError> {
    let mut verdicts = Vec::with_capacity(placements.len());
    let mut first_error = None;
    for (placement, result) in placements.iter().zip(results) {
        match result {
            Ok(verdict) => {
                debug!("{}: {verdict:?}", placement.target.display());
                verdicts.push(verdict);
            }
            Err(e) => {
                error!("classifying {}: {e}", placement.target.display());
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    if let Some(e) = first_error {
        return Err(EngineError::from(e).into());
    }

    let fatal: Vec<PathBuf> = placements
        .iter()
        .zip(&verdicts)
        .filter(|(_, v)| v.is_fatal())
        .map(|(p, _)| settings.target_abs(&p.target))
        .collect();
    if !fatal.is_empty() {
        for target in &fatal {
            error!("unmanaged symlink with differing content: {}", target.display());
        }
        return Err(EngineError::FatalCollisions(fatal).into());
    }

    Ok(verdicts)
}

/// Clean every previous-manifest entry not superseded by the new generation.
///
/// Entries fan out in parallel; each touches only its own target path and
/// ancestor chain. Failures are warnings, never aborts.
fn clean_stale(
    settings: &Settings,
    bundle: &Bundle,
    previous: &Manifest,
    dry_run: bool,
) -> ActivationReport {
    let declared = bundle.declared_targets();
    let report = Mutex::new(ActivationReport::default());

    previous.entries().collect::<Vec<_>>().par_iter().for_each(|entry| {
        let mut delta = ActivationReport::default();
        match clean::clean(entry, &declared, &settings.home, dry_run) {
            Ok(CleanOutcome::Superseded) => delta.superseded += 1,
            Ok(CleanOutcome::Removed { pruned_dirs }) => {
                delta.removed += 1;
                delta.pruned_dirs += pruned_dirs;
            }
            Ok(CleanOutcome::AlreadyGone { pruned_dirs }) => {
                delta.already_gone += 1;
                delta.pruned_dirs += pruned_dirs;
            }
            Ok(CleanOutcome::Diverged { actual }) => {
                delta.diverged += 1;
                warn!(
                    "not removing {}: it no longer points at {} (now {})",
                    settings.target_abs(&entry.target).display(),
                    entry.source.display(),
                    actual.map_or_else(|| "unresolvable".to_string(), |p| p.display().to_string()),
                );
            }
            Err(e) => {
                delta.failed += 1;
                warn!("cleanup failed: {e}");
            }
        }
        *report
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) += delta;
    });

    report
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Install every placement, collecting the new manifest from those that
/// verifiably succeeded.
fn install_placements(
    settings: &Settings,
    placements: &[Placement],
    verdicts: &[Verdict],
    dry_run: bool,
) -> (Manifest, ActivationReport) {
    let manifest = Mutex::new(Manifest::new());
    let report = Mutex::new(ActivationReport::default());

    placements
        .par_iter()
        .zip(verdicts.par_iter())
        .for_each(|(placement, verdict)| {
            let mut delta = ActivationReport::default();
            match install::install(placement, *verdict, &settings.home, dry_run) {
                Ok(outcome) => {
                    match outcome {
                        InstallOutcome::Installed { backed_up } => {
                            delta.installed += 1;
                            if backed_up {
                                delta.backed_up += 1;
                            }
                        }
                        InstallOutcome::AlreadyLinked => delta.already_linked += 1,
                    }
                    manifest
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .insert(placement.manifest_entry());
                }
                Err(e) => {
                    delta.failed += 1;
                    warn!("install failed: {e}");
                }
            }
            *report
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) += delta;
        });

    (
        manifest
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner),
        report
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner),
    )
}
