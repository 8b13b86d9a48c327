//! Moderated object state machine
//!
//! Status moves from Pending to Approved or Rejected (and back again if a
//! moderator changes their mind); `verified` is an independent flag. Every
//! transition writes its log entry before the row is saved, inside the
//! caller's transaction.

use crate::db;
use crate::error::{ModerationError, ModerationResult};
use crate::moderation::audit::{self, LogDetail};
use crate::moderation::category::CategoryRegistry;
use crate::moderation::content::ModeratedContent;
use crate::moderation::penalty;
use crate::orm::moderated_objects::{self, ObjectType, Status};
use chrono::Utc;
use sea_orm::{
    entity::*, query::*, ActiveEnum, ActiveValue::Set, ConnectionTrait, DatabaseTransaction,
    TransactionTrait,
};
use serde::Deserialize;
use validator::Validate;

/// Moderator edits to a moderated object. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ModeratedObjectUpdate {
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub category_id: Option<i32>,
}

pub async fn find_by_content<C>(
    conn: &C,
    object_type: ObjectType,
    object_id: i32,
) -> ModerationResult<Option<moderated_objects::Model>>
where
    C: ConnectionTrait,
{
    Ok(moderated_objects::Entity::find()
        .filter(moderated_objects::Column::ObjectType.eq(object_type.to_value()))
        .filter(moderated_objects::Column::ObjectId.eq(object_id))
        .one(conn)
        .await?)
}

/// Load a moderated object and hold its row lock until the transaction ends.
pub(crate) async fn load_for_update(
    txn: &DatabaseTransaction,
    moderated_object_id: i32,
) -> ModerationResult<moderated_objects::Model> {
    db::lock_moderated_object(txn, moderated_object_id).await?;

    moderated_objects::Entity::find_by_id(moderated_object_id)
        .one(txn)
        .await?
        .ok_or_else(|| ModerationError::not_found("Moderated object", moderated_object_id))
}

/// Return the moderated object for the content, creating a pending one if needed.
///
/// An existing object is returned unchanged, whatever its category. The insert
/// runs in a savepoint so losing a race to a concurrent creator only rolls
/// back the insert, after which the winner's row is read.
pub(crate) async fn get_or_create(
    txn: &DatabaseTransaction,
    content: &ModeratedContent,
    category_id: i32,
) -> ModerationResult<moderated_objects::Model> {
    let object_type = content.object_type();
    let object_id = content.object_id();

    if let Some(existing) = find_by_content(txn, object_type, object_id).await? {
        log::debug!(
            "Reusing moderated object {} for {} #{}",
            existing.id,
            object_type.label(),
            object_id
        );
        return Ok(existing);
    }

    let new_object = moderated_objects::ActiveModel {
        community_id: Set(content.community_id()),
        description: Set(None),
        verified: Set(false),
        status: Set(Status::Pending),
        category_id: Set(category_id),
        object_audit_snapshot: Set(None),
        object_type: Set(object_type),
        object_id: Set(object_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    let savepoint = txn.begin().await?;
    match new_object.insert(&savepoint).await {
        Ok(created) => {
            savepoint.commit().await?;
            log::info!(
                "Created moderated object {} for {} #{}",
                created.id,
                object_type.label(),
                object_id
            );
            Ok(created)
        }
        Err(e) if db::is_unique_violation(&e) => {
            savepoint.rollback().await?;
            find_by_content(txn, object_type, object_id)
                .await?
                .ok_or_else(|| ModerationError::not_found(object_type.label(), object_id))
        }
        Err(e) => {
            savepoint.rollback().await?;
            Err(e.into())
        }
    }
}

/// Apply moderator edits. An unchanged description writes no log entry;
/// a provided category always does.
pub(crate) async fn update(
    txn: &DatabaseTransaction,
    categories: &CategoryRegistry,
    moderated_object: moderated_objects::Model,
    actor_id: Option<i32>,
    changes: ModeratedObjectUpdate,
) -> ModerationResult<moderated_objects::Model> {
    let mut active: moderated_objects::ActiveModel = moderated_object.clone().into();
    let mut changed = false;

    if let Some(description) = changes.description {
        if moderated_object.description.as_deref() != Some(description.as_str()) {
            audit::record(
                txn,
                moderated_object.id,
                actor_id,
                LogDetail::DescriptionChanged {
                    changed_from: moderated_object.description.clone(),
                    changed_to: Some(description.clone()),
                },
            )
            .await?;
            active.description = Set(Some(description));
            changed = true;
        }
    }

    if let Some(category_id) = changes.category_id {
        categories.lookup(txn, category_id).await?;
        audit::record(
            txn,
            moderated_object.id,
            actor_id,
            LogDetail::CategoryChanged {
                changed_from: moderated_object.category_id,
                changed_to: category_id,
            },
        )
        .await?;
        active.category_id = Set(category_id);
        changed = true;
    }

    if !changed {
        return Ok(moderated_object);
    }
    Ok(active.update(txn).await?)
}

/// Move to `status`. Logs even when the status is already `status`.
pub(crate) async fn set_status(
    txn: &DatabaseTransaction,
    moderated_object: moderated_objects::Model,
    actor_id: Option<i32>,
    status: Status,
) -> ModerationResult<moderated_objects::Model> {
    audit::record(
        txn,
        moderated_object.id,
        actor_id,
        LogDetail::StatusChanged {
            changed_from: moderated_object.status,
            changed_to: status,
        },
    )
    .await?;

    let mut active: moderated_objects::ActiveModel = moderated_object.into();
    active.status = Set(status);
    Ok(active.update(txn).await?)
}

pub(crate) async fn mark_verified(
    txn: &DatabaseTransaction,
    moderated_object: moderated_objects::Model,
    actor_id: Option<i32>,
) -> ModerationResult<moderated_objects::Model> {
    audit::record(
        txn,
        moderated_object.id,
        actor_id,
        LogDetail::VerifiedChanged {
            changed_from: moderated_object.verified,
            changed_to: true,
        },
    )
    .await?;

    let mut active: moderated_objects::ActiveModel = moderated_object.into();
    active.verified = Set(true);
    Ok(active.update(txn).await?)
}

/// Clear the verified flag, drop every penalty the object issued and forget
/// the audit snapshot.
pub(crate) async fn mark_unverified(
    txn: &DatabaseTransaction,
    moderated_object: moderated_objects::Model,
    actor_id: Option<i32>,
) -> ModerationResult<moderated_objects::Model> {
    audit::record(
        txn,
        moderated_object.id,
        actor_id,
        LogDetail::VerifiedChanged {
            changed_from: moderated_object.verified,
            changed_to: false,
        },
    )
    .await?;

    let removed = penalty::delete_for_object(txn, moderated_object.id).await?;
    if removed > 0 {
        log::info!(
            "Removed {} penalties issued by moderated object {}",
            removed,
            moderated_object.id
        );
    }

    let mut active: moderated_objects::ActiveModel = moderated_object.into();
    active.verified = Set(false);
    active.object_audit_snapshot = Set(None);
    Ok(active.update(txn).await?)
}
