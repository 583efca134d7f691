//! Generation-based symlink activation engine.
//!
//! Activates a declarative set of managed links — each mapping a
//! content-addressed source artifact to a target path inside the user's home
//! directory — by installing them as symlinks, while safely transitioning
//! away from the previous generation's link set.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]** — environment settings and generation bundle loading
//! - **[`manifest`]** — the persisted record of every owned target path
//! - **[`engine`]** — expansion, collision classification, link installation,
//!   stale-entry cleanup, and the activation orchestrator
//! - **[`commands`]** — top-level command orchestration (`activate`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod logging;
pub mod manifest;
