//! The byte-equality seam around the external file comparator.
use std::path::Path;

use crate::error::ComparatorError;
use crate::exec;

/// Outcome of a byte-level comparison of two files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// The files have identical content.
    Equal,
    /// The files differ.
    Different,
}

/// Byte-level equality of two files, provided by an external primitive.
///
/// Implementations must be [`Sync`]: classification fans out across worker
/// threads with a single shared comparator.
pub trait Comparator: Sync {
    /// Compare the files at `a` and `b` byte for byte.
    ///
    /// # Errors
    ///
    /// Returns [`ComparatorError`] when the primitive reports neither equal
    /// nor different — this aborts the activation rather than producing a
    /// collision verdict.
    fn compare(&self, a: &Path, b: &Path) -> Result<Comparison, ComparatorError>;
}

/// Production comparator shelling out to `cmp -s`.
///
/// Exit 0 means equal, exit 1 means different; anything else (including
/// a missing file raced away between classification steps) is an execution
/// error.
#[derive(Debug, Clone)]
pub struct CmpComparator {
    program: String,
}

impl CmpComparator {
    /// Comparator invoking the given program with `cmp`-compatible semantics.
    #[must_use]
    pub const fn with_program(program: String) -> Self {
        Self { program }
    }
}

impl Default for CmpComparator {
    fn default() -> Self {
        Self::with_program("cmp".to_string())
    }
}

impl Comparator for CmpComparator {
    fn compare(&self, a: &Path, b: &Path) -> Result<Comparison, ComparatorError> {
        let a_str = a.to_string_lossy();
        let b_str = b.to_string_lossy();
        let result = exec::run_unchecked(&self.program, &["-s", &a_str, &b_str])
            .map_err(|e| ComparatorError::Execution(format!("{e:#}")))?;

        match result.code {
            Some(0) => Ok(Comparison::Equal),
            Some(1) => Ok(Comparison::Different),
            code => Err(ComparatorError::UnexpectedExit {
                code: code.unwrap_or(-1),
                a: a.to_path_buf(),
                b: b.to_path_buf(),
            }),
        }
    }
}
