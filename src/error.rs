//! Error types for the indexing system.
//!
//! Structured errors using thiserror. Resolution ambiguity is never an
//! error: unresolvable calls and imports are dropped by the resolvers.
//! The only fatal kinds are configuration and ingest transport.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for indexing operations.
#[derive(Error, Debug)]
pub enum IndexError {
    /// File system errors
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The grammar refused the input outright. Partial trees with ERROR
    /// nodes are not parse errors and are processed normally.
    #[error("Failed to parse {language} file '{path}': {reason}")]
    Parse {
        path: PathBuf,
        language: &'static str,
        reason: String,
    },

    /// Configuration errors fail fast at startup.
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// A query bundle failed to compile against its grammar.
    #[error("Query '{query}' failed to compile for {language}: {reason}")]
    QueryCompile {
        language: &'static str,
        query: &'static str,
        reason: String,
    },

    /// The graph store rejected a batch; the current pass aborts and the
    /// partial graph remains (delete-and-rescan is the recovery).
    #[error("Ingest operation '{operation}' failed: {reason}")]
    Ingest { operation: String, reason: String },

    #[error("{0}")]
    General(String),
}

/// Result type alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
