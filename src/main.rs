//! Binary entry point for the `stash-activate` CLI.
//!
//! Parses command-line arguments, initializes logging, and dispatches to the
//! activate command handler.

use anyhow::Result;
use clap::Parser;

use stash_activate::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    logging::init(args.verbose);

    commands::activate::run(&args)
}
