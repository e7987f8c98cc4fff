//! Error types for sxbmon.

use std::io;
use thiserror::Error;

/// Result type for sxbmon operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sxbmon operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (serial port, file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The serial channel is not open.
    #[error("Not connected")]
    NotConnected,

    /// Input file extension is not a supported record format.
    #[error("Unsupported file format: {0} (expected .hex or .srec)")]
    UnsupportedFormat(String),

    /// Input file could not be opened.
    #[error("Could not open {path}: {source}")]
    Open {
        /// Path of the file that failed to open.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Malformed or truncated record in the input file.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unsupported operation for the selected board model.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}
