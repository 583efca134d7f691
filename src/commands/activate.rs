//! The activate command: wire environment, bundle, and engine together.
use anyhow::Result;
use tracing::{debug, info};

use crate::cli::Cli;
use crate::config::Settings;
use crate::config::bundle::Bundle;
use crate::engine::activate;
use crate::engine::compare::CmpComparator;

/// Run an activation for the bundle named on the command line.
///
/// # Errors
///
/// Returns an error — and therefore a non-zero exit — when the environment
/// cannot be resolved, the bundle does not load, the engine aborts before
/// mutation, or any entry's mutation failed.
pub fn run(args: &Cli) -> Result<()> {
    let settings = Settings::from_env()?;
    debug!("home: {}", settings.home.display());
    debug!("state: {}", settings.state_dir.display());

    let bundle = Bundle::load(&args.bundle)?;
    info!(
        "activating {} ({} declared entries)",
        bundle.dir.display(),
        bundle.entries.len()
    );

    let comparator = CmpComparator::default();
    let report = activate::activate(&settings, &bundle, &comparator, args.dry_run)?;

    info!("{}", report.summary());

    if report.failed > 0 {
        anyhow::bail!("{} entries failed during activation", report.failed);
    }
    Ok(())
}
