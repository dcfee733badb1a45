//! Trace Source Error Types

use std::path::PathBuf;

use thiserror::Error;

/// Errors while opening or streaming a trace file.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Underlying file I/O failure
    #[error("trace I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The trace has no header row
    #[error("trace file is empty: {0}")]
    EmptyTrace(PathBuf),
}
