//! Moderation error taxonomy

use crate::orm::moderation_categories::Severity;
use sea_orm::DbErr;

pub type ModerationResult<T> = Result<T, ModerationError>;

/// Errors raised by the moderation engine.
#[derive(Debug)]
pub enum ModerationError {
    /// Unknown category, moderated object, or content reference
    NotFound(String),
    /// The reporter already has a report against this moderated object
    DuplicateReport {
        reporter_id: i32,
        moderated_object_id: i32,
    },
    /// Serialization failure or deadlock. Safe to retry the whole operation.
    ConcurrentModificationConflict(String),
    /// No suspension formula exists for this severity tier
    UnhandledSeverityPolicy(Severity),
    /// Input rejected before anything was written
    InvalidInput(String),
    /// Any other database failure
    PersistenceFailure(DbErr),
}

impl ModerationError {
    pub fn not_found(what: &str, id: i32) -> Self {
        ModerationError::NotFound(format!("{} #{} not found", what, id))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ModerationError::ConcurrentModificationConflict(_))
    }
}

impl std::fmt::Display for ModerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModerationError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ModerationError::DuplicateReport {
                reporter_id,
                moderated_object_id,
            } => write!(
                f,
                "User {} has already reported moderated object {}",
                reporter_id, moderated_object_id
            ),
            ModerationError::ConcurrentModificationConflict(msg) => {
                write!(f, "Concurrent modification conflict: {}", msg)
            }
            ModerationError::UnhandledSeverityPolicy(severity) => {
                write!(f, "No penalty policy for {} severity", severity)
            }
            ModerationError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            ModerationError::PersistenceFailure(e) => write!(f, "Persistence failure: {}", e),
        }
    }
}

impl std::error::Error for ModerationError {}

impl From<DbErr> for ModerationError {
    fn from(e: DbErr) -> Self {
        if crate::db::is_serialization_failure(&e) {
            return ModerationError::ConcurrentModificationConflict(e.to_string());
        }
        match e {
            DbErr::RecordNotFound(msg) => ModerationError::NotFound(msg),
            other => ModerationError::PersistenceFailure(other),
        }
    }
}

impl From<validator::ValidationErrors> for ModerationError {
    fn from(e: validator::ValidationErrors) -> Self {
        ModerationError::InvalidInput(e.to_string())
    }
}
