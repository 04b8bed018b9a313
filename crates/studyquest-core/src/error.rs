//! Core error types for studyquest-core.
//!
//! Coordinator operations surface a [`ProgressionError`]; everything a
//! caller can act on is a distinct variant. Store-level failures live in
//! [`DatabaseError`] and are wrapped.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::duel::Challenge;

/// Top-level error type for studyquest-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Progression-engine errors
    #[error("Progression error: {0}")]
    Progression(#[from] ProgressionError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Lost a race on a conditional write (busy/locked)
    #[error("Conflicting concurrent write")]
    Conflict,
}

/// Errors surfaced by the coordinator operations.
///
/// `DuplicateChallenge` and `AlreadyClaimed` are the expected outcome of a
/// retried request, not genuine failures; callers should render them as
/// such.
#[derive(Error, Debug)]
pub enum ProgressionError {
    /// Request rejected before touching the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced record does not exist
    #[error("No {kind} with id {id}")]
    NotFound { kind: &'static str, id: Uuid },

    /// Actor is neither challenger nor opponent
    #[error("Player {actor_id} is not a participant in challenge {challenge_id}")]
    NotAParticipant { challenge_id: Uuid, actor_id: Uuid },

    /// A pending challenge for this pair already exists; carries the
    /// existing row so a retried caller needs no second query.
    #[error("A challenge against this opponent is already pending")]
    DuplicateChallenge { existing: Box<Challenge> },

    /// Challenge is already completed
    #[error("Challenge {challenge_id} is already completed")]
    ChallengeClosed { challenge_id: Uuid },

    /// The reward was already paid out
    #[error("Reward {claimable_id} was already claimed")]
    AlreadyClaimed { claimable_id: Uuid },

    /// Actor does not own the claimable, or its completion condition is unmet
    #[error("Not eligible: {reason}")]
    NotEligible { reason: String },

    /// No trusted calendar day available
    #[error("No trusted calendar day available")]
    Clock,

    /// A conditional write kept losing races after the internal retry
    #[error("Storage conflict persisted after retry")]
    StorageConflict,

    /// Underlying store failure
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ProgressionError {
    fn is_conflict(&self) -> bool {
        matches!(
            self,
            ProgressionError::Database(DatabaseError::Conflict) | ProgressionError::StorageConflict
        )
    }
}

/// Run `op`, retrying exactly once when the store reports a write
/// conflict. A second conflict surfaces as `StorageConflict`.
pub(crate) fn retry_on_conflict<T, F>(mut op: F) -> Result<T, ProgressionError>
where
    F: FnMut() -> Result<T, ProgressionError>,
{
    match op() {
        Err(e) if e.is_conflict() => {
            tracing::debug!("conditional write lost a race, retrying once");
            op().map_err(|e| {
                if e.is_conflict() {
                    ProgressionError::StorageConflict
                } else {
                    e
                }
            })
        }
        other => other,
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => match err.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    DatabaseError::Conflict
                }
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ProgressionError {
    fn from(err: rusqlite::Error) -> Self {
        ProgressionError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_conflict_surfaces_as_storage_conflict() {
        let mut calls = 0;
        let result: Result<(), ProgressionError> = retry_on_conflict(|| {
            calls += 1;
            Err(DatabaseError::Conflict.into())
        });
        assert_eq!(calls, 2);
        assert!(matches!(result, Err(ProgressionError::StorageConflict)));
    }

    #[test]
    fn retry_succeeds_after_single_conflict() {
        let mut calls = 0;
        let result = retry_on_conflict(|| {
            calls += 1;
            if calls == 1 {
                Err(ProgressionError::Database(DatabaseError::Conflict))
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn non_conflict_errors_pass_through_without_retry() {
        let mut calls = 0;
        let result: Result<(), ProgressionError> = retry_on_conflict(|| {
            calls += 1;
            Err(ProgressionError::Clock)
        });
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(ProgressionError::Clock)));
    }
}
