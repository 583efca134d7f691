//! Thin wrappers around external process execution.
use anyhow::{Context, Result};
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Raw exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Run a command, allowing failure (returns the result without bailing).
///
/// # Errors
///
/// Returns an error only if the process could not be launched at all; a
/// non-zero exit is reported through [`ExecResult::success`] and
/// [`ExecResult::code`].
pub fn run_unchecked(program: &str, args: &[&str]) -> Result<ExecResult> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to execute: {program}"))?;

    Ok(ExecResult::from(output))
}

/// Check if a program is available on PATH.
#[must_use]
pub fn which(program: &str) -> bool {
    #[cfg(target_os = "windows")]
    let check = Command::new("where").arg(program).output();

    #[cfg(not(target_os = "windows"))]
    let check = Command::new("which").arg(program).output();

    check.is_ok_and(|o| o.status.success())
}
