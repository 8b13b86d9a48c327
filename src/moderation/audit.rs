//! Append-only change log for moderated objects
//!
//! Every mutation of a moderated object writes exactly one entry per changed
//! field, carrying the value before and after the change and the actor.

use crate::error::{ModerationError, ModerationResult};
use crate::orm::moderated_object_logs::{self, LogType};
use crate::orm::moderated_objects::Status;
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    entity::*, query::*, ActiveEnum, ActiveValue::Set, ConnectionTrait, DbErr, PaginatorTrait,
};
use serde::{Deserialize, Serialize};

/// What changed, with the before/after pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogDetail {
    DescriptionChanged {
        changed_from: Option<String>,
        changed_to: Option<String>,
    },
    CategoryChanged {
        changed_from: i32,
        changed_to: i32,
    },
    StatusChanged {
        changed_from: Status,
        changed_to: Status,
    },
    VerifiedChanged {
        changed_from: bool,
        changed_to: bool,
    },
    SubmittedChanged {
        changed_from: bool,
        changed_to: bool,
    },
}

impl LogDetail {
    pub fn log_type(&self) -> LogType {
        match self {
            Self::DescriptionChanged { .. } => LogType::DescriptionChanged,
            Self::CategoryChanged { .. } => LogType::CategoryChanged,
            Self::StatusChanged { .. } => LogType::StatusChanged,
            Self::VerifiedChanged { .. } => LogType::VerifiedChanged,
            Self::SubmittedChanged { .. } => LogType::SubmittedChanged,
        }
    }
}

/// A decoded log row
#[derive(Clone, Debug, PartialEq)]
pub struct AuditEntry {
    pub id: i32,
    pub log_type: LogType,
    pub actor_id: Option<i32>,
    pub moderated_object_id: i32,
    pub detail: LogDetail,
    pub created_at: NaiveDateTime,
}

impl TryFrom<moderated_object_logs::Model> for AuditEntry {
    type Error = ModerationError;

    fn try_from(model: moderated_object_logs::Model) -> Result<Self, Self::Error> {
        let detail: LogDetail = serde_json::from_str(&model.detail).map_err(|e| {
            ModerationError::PersistenceFailure(DbErr::Custom(format!(
                "Unreadable detail in moderation log {}: {}",
                model.id, e
            )))
        })?;

        Ok(Self {
            id: model.id,
            log_type: model.log_type,
            actor_id: model.actor_id,
            moderated_object_id: model.moderated_object_id,
            detail,
            created_at: model.created_at,
        })
    }
}

/// Append one entry to a moderated object's log.
pub async fn record<C>(
    conn: &C,
    moderated_object_id: i32,
    actor_id: Option<i32>,
    detail: LogDetail,
) -> ModerationResult<moderated_object_logs::Model>
where
    C: ConnectionTrait,
{
    let serialized = serde_json::to_string(&detail)
        .map_err(|e| ModerationError::PersistenceFailure(DbErr::Custom(e.to_string())))?;

    let log = moderated_object_logs::ActiveModel {
        log_type: Set(detail.log_type()),
        actor_id: Set(actor_id),
        moderated_object_id: Set(moderated_object_id),
        detail: Set(serialized),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    Ok(log.insert(conn).await?)
}

/// Entries for a moderated object, oldest first.
pub async fn entries_for<C>(conn: &C, moderated_object_id: i32) -> ModerationResult<Vec<AuditEntry>>
where
    C: ConnectionTrait,
{
    moderated_object_logs::Entity::find()
        .filter(moderated_object_logs::Column::ModeratedObjectId.eq(moderated_object_id))
        .order_by_asc(moderated_object_logs::Column::CreatedAt)
        .order_by_asc(moderated_object_logs::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(AuditEntry::try_from)
        .collect()
}

/// Count entries for a moderated object, optionally of one type only.
pub async fn count_for<C>(
    conn: &C,
    moderated_object_id: i32,
    log_type: Option<LogType>,
) -> ModerationResult<u64>
where
    C: ConnectionTrait,
{
    let mut query = moderated_object_logs::Entity::find()
        .filter(moderated_object_logs::Column::ModeratedObjectId.eq(moderated_object_id));

    if let Some(log_type) = log_type {
        query = query.filter(moderated_object_logs::Column::LogType.eq(log_type.to_value()));
    }

    Ok(query.count(conn).await? as u64)
}
