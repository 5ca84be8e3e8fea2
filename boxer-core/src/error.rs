//! Release engine error types with clear, actionable messages

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the core release cycle
///
/// All of these are unrecoverable for the current run: nothing is retried,
/// and every one of them aborts before any partial metadata write.
#[derive(Error, Debug)]
pub enum BoxerError {
    /// No base name could be resolved from any configuration source
    #[error("No box name configured.\n\nPass --base <name> or provide a config file with a \"vm-name\" field.")]
    MissingRequiredConfig,

    /// The config file exists but its contents are unusable
    #[error("Invalid config file {path}: {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    /// A version string whose final segment cannot be incremented
    #[error("Cannot bump version {version:?}: the final dotted segment must be a non-negative integer")]
    InvalidVersionFormat { version: String },

    /// The external packaging tool failed, or claimed success without producing a box
    #[error("Packaging failed: {reason}")]
    PackagingFailed { reason: String },

    /// Copying or hashing the produced artifact did not complete
    #[error("Checksum failed for {path}")]
    ChecksumFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the persisted release metadata failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Errors specific to the persisted version ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to read release metadata from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse release metadata in {path} (corrupted or invalid JSON)")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write release metadata to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
