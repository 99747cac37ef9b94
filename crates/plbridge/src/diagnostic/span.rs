//! Source location tracking.

use std::fmt;
use std::path::PathBuf;

/// Where a declaration was found. Builder declarations have no file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub file: Option<PathBuf>,
    /// 1-based line of the `def` (or the first decorator).
    pub line: usize,
}

impl Span {
    pub fn new(file: PathBuf, line: usize) -> Self {
        Self {
            file: Some(file),
            line,
        }
    }

    /// Span for declarations built in code rather than parsed from a file.
    pub fn builder() -> Self {
        Self { file: None, line: 0 }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", file.display(), self.line),
            None => write!(f, "<builder>"),
        }
    }
}
