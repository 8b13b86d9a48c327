//! Moderation report ledger
//!
//! One report per reporter per moderated object, enforced by a unique index.

use crate::error::{ModerationError, ModerationResult};
use crate::orm::moderated_objects::ObjectType;
use crate::orm::moderation_reports;
use chrono::Utc;
use sea_orm::{entity::*, query::*, ActiveValue::Set, ConnectionTrait, PaginatorTrait};
use serde::Deserialize;
use std::collections::BTreeSet;
use validator::Validate;

/// A user's report against some content
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewReport {
    pub object_type: ObjectType,
    pub object_id: i32,
    pub reporter_id: i32,
    pub category_id: i32,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// Insert a report row. A second report by the same reporter is DuplicateReport.
pub(crate) async fn insert_report<C>(
    conn: &C,
    moderated_object_id: i32,
    report: &NewReport,
) -> ModerationResult<moderation_reports::Model>
where
    C: ConnectionTrait,
{
    let row = moderation_reports::ActiveModel {
        reporter_id: Set(report.reporter_id),
        moderated_object_id: Set(moderated_object_id),
        category_id: Set(report.category_id),
        description: Set(report.description.clone()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    row.insert(conn).await.map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            ModerationError::DuplicateReport {
                reporter_id: report.reporter_id,
                moderated_object_id,
            }
        } else {
            e.into()
        }
    })
}

/// Ids of every user who reported the moderated object.
pub async fn reporters_of<C>(conn: &C, moderated_object_id: i32) -> ModerationResult<BTreeSet<i32>>
where
    C: ConnectionTrait,
{
    Ok(reports_for(conn, moderated_object_id)
        .await?
        .into_iter()
        .map(|r| r.reporter_id)
        .collect())
}

/// Reports against a moderated object, oldest first.
pub async fn reports_for<C>(
    conn: &C,
    moderated_object_id: i32,
) -> ModerationResult<Vec<moderation_reports::Model>>
where
    C: ConnectionTrait,
{
    Ok(moderation_reports::Entity::find()
        .filter(moderation_reports::Column::ModeratedObjectId.eq(moderated_object_id))
        .order_by_asc(moderation_reports::Column::Id)
        .all(conn)
        .await?)
}

pub async fn has_reported<C>(
    conn: &C,
    reporter_id: i32,
    moderated_object_id: i32,
) -> ModerationResult<bool>
where
    C: ConnectionTrait,
{
    let count = moderation_reports::Entity::find()
        .filter(moderation_reports::Column::ReporterId.eq(reporter_id))
        .filter(moderation_reports::Column::ModeratedObjectId.eq(moderated_object_id))
        .count(conn)
        .await?;
    Ok(count > 0)
}
