//! ---
//! ve_section: "03-persistence-logging"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Persistence abstractions and storage bindings."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! The engine's outward storage surface: an append-only JSONL log of
//! snapshot records. External result stores tail this log; nothing in the
//! engine talks to a database directly.

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistError>;

/// Error type for the persistence surface.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// IO failure while reading or writing log files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// The log file is missing its header line.
    #[error("snapshot log at {0} has no header")]
    MissingHeader(std::path::PathBuf),
}

pub mod snapshot_log;

pub use snapshot_log::{SnapshotLogEntry, SnapshotLogReader, SnapshotLogWriter, SNAPSHOT_LOG_VERSION};
