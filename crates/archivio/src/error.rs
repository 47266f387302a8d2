//! Engine error types.

use thiserror::Error;

/// Errors surfaced by the archive engine.
///
/// Request input never produces an error: malformed parameters coerce to safe
/// defaults and at worst yield an empty result set. Only collaborator
/// failures and broken persisted configuration are reported.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid block configuration")]
    InvalidConfiguration(#[source] serde_json::Error),

    #[error("taxonomy term lookup failed")]
    Terms(#[source] anyhow::Error),

    #[error("content query failed")]
    Query(#[source] anyhow::Error),

    #[error("render context serialization failed")]
    Serialize(#[source] serde_json::Error),
}

/// Result type alias using ArchiveError.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
