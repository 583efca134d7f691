//! Command-line interface definition.
use clap::Parser;
use std::path::PathBuf;

/// Top-level CLI entry point for the activation engine.
///
/// The command surface is deliberately small: one positional argument naming
/// the new-generation bundle to activate. Exit code 0 on success; non-zero on
/// a usage error, a fatal collision, or any unrecoverable I/O or tool error.
#[derive(Parser, Debug)]
#[command(
    name = "stash-activate",
    about = "Generation-based symlink activation engine for home directories",
    version = version_string()
)]
pub struct Cli {
    /// Path to the new-generation bundle directory
    pub bundle: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Preview changes without applying
    #[arg(short = 'd', long)]
    pub dry_run: bool,
}

/// The version reported by `--version`: the release tag injected at build
/// time when available, the Cargo package version otherwise.
const fn version_string() -> &'static str {
    match option_env!("STASH_VERSION") {
        Some(v) => v,
        None => env!("CARGO_PKG_VERSION"),
    }
}
