//! Penalty engine
//!
//! When an approved moderated object is verified, every penalty target is
//! suspended for a time that grows with the number of penalties they already
//! have at the same severity:
//!
//! - High: n⁴ days
//! - Medium: n² hours
//! - Low: n² hours
//!
//! where n is the count before the new penalty. Critical severity has no
//! formula and is reported back as `UnhandledSeverityPolicy`.

use crate::db;
use crate::error::{ModerationError, ModerationResult};
use crate::orm::moderation_categories::{self, Severity};
use crate::orm::moderation_penalties::{self, PenaltyType};
use crate::orm::moderated_objects;
use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::sea_query::JoinType;
use sea_orm::{
    entity::*, query::*, ActiveEnum, ActiveValue::Set, ConnectionTrait, DatabaseTransaction,
    PaginatorTrait, TransactionTrait,
};

/// Longest duration chrono can represent, in seconds
const MAX_DURATION_SECONDS: i64 = i64::MAX / 1_000;

const SECONDS_PER_HOUR: i64 = 60 * 60;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// Suspension length for an offence at `severity` by someone with `prior_count`
/// earlier penalties at that severity.
pub fn suspension_duration(severity: Severity, prior_count: u64) -> ModerationResult<Duration> {
    let n = i64::try_from(prior_count).unwrap_or(i64::MAX);

    let seconds = match severity {
        Severity::High => n.saturating_pow(4).saturating_mul(SECONDS_PER_DAY),
        Severity::Medium | Severity::Low => n.saturating_pow(2).saturating_mul(SECONDS_PER_HOUR),
        Severity::Critical => return Err(ModerationError::UnhandledSeverityPolicy(severity)),
    };

    Ok(Duration::seconds(seconds.min(MAX_DURATION_SECONDS)))
}

/// Outcome of penalising one target during a verification
#[derive(Debug)]
pub struct PenaltyOutcome {
    pub user_id: i32,
    pub result: ModerationResult<moderation_penalties::Model>,
}

impl PenaltyOutcome {
    pub fn is_issued(&self) -> bool {
        self.result.is_ok()
    }
}

/// How long a user remains suspended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Suspension {
    Permanent,
    Until(NaiveDateTime),
}

/// Count a user's penalties whose moderated object currently has `severity`.
///
/// `excluding` leaves out penalties owned by that moderated object.
pub async fn count_penalties_at_severity<C>(
    conn: &C,
    user_id: i32,
    severity: Severity,
    excluding: Option<i32>,
) -> ModerationResult<u64>
where
    C: ConnectionTrait,
{
    let mut query = moderation_penalties::Entity::find()
        .join(
            JoinType::InnerJoin,
            moderation_penalties::Relation::ModeratedObject.def(),
        )
        .join(JoinType::InnerJoin, moderated_objects::Relation::Category.def())
        .filter(moderation_penalties::Column::UserId.eq(user_id))
        .filter(moderation_categories::Column::Severity.eq(severity.to_value()));

    if let Some(moderated_object_id) = excluding {
        query = query.filter(moderation_penalties::Column::ModeratedObjectId.ne(moderated_object_id));
    }

    Ok(query.count(conn).await? as u64)
}

/// Suspend every target, each in its own savepoint.
///
/// A failure for one target rolls back only that target's writes and is
/// returned in its outcome; the other targets are still processed.
pub(crate) async fn issue_suspensions(
    txn: &DatabaseTransaction,
    moderated_object_id: i32,
    severity: Severity,
    targets: &[i32],
) -> Vec<PenaltyOutcome> {
    let mut outcomes = Vec::with_capacity(targets.len());

    for &user_id in targets {
        let result = issue_suspension(txn, moderated_object_id, severity, user_id).await;

        match &result {
            Ok(penalty) => log::info!(
                "Suspended user {} for {:?} seconds (moderated object {}, {} severity)",
                user_id,
                penalty.duration_seconds,
                moderated_object_id,
                severity
            ),
            Err(e) => log::warn!(
                "Could not penalise user {} for moderated object {}: {}",
                user_id,
                moderated_object_id,
                e
            ),
        }

        outcomes.push(PenaltyOutcome { user_id, result });
    }

    outcomes
}

async fn issue_suspension(
    txn: &DatabaseTransaction,
    moderated_object_id: i32,
    severity: Severity,
    user_id: i32,
) -> ModerationResult<moderation_penalties::Model> {
    let savepoint = txn.begin().await?;

    match create_suspension(&savepoint, moderated_object_id, severity, user_id).await {
        Ok(penalty) => {
            savepoint.commit().await?;
            Ok(penalty)
        }
        Err(e) => {
            savepoint.rollback().await?;
            Err(e)
        }
    }
}

async fn create_suspension<C>(
    conn: &C,
    moderated_object_id: i32,
    severity: Severity,
    user_id: i32,
) -> ModerationResult<moderation_penalties::Model>
where
    C: ConnectionTrait,
{
    db::lock_user_penalties(conn, user_id).await?;

    let prior_count =
        count_penalties_at_severity(conn, user_id, severity, Some(moderated_object_id)).await?;
    let duration = suspension_duration(severity, prior_count)?;

    let penalty = moderation_penalties::ActiveModel {
        user_id: Set(user_id),
        moderated_object_id: Set(moderated_object_id),
        penalty_type: Set(PenaltyType::Suspension),
        duration_seconds: Set(Some(duration.num_seconds())),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    Ok(penalty.insert(conn).await?)
}

/// Remove every penalty a moderated object issued. Returns how many were removed.
pub(crate) async fn delete_for_object<C>(conn: &C, moderated_object_id: i32) -> ModerationResult<u64>
where
    C: ConnectionTrait,
{
    let result = moderation_penalties::Entity::delete_many()
        .filter(moderation_penalties::Column::ModeratedObjectId.eq(moderated_object_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub async fn penalties_for_user<C>(
    conn: &C,
    user_id: i32,
) -> ModerationResult<Vec<moderation_penalties::Model>>
where
    C: ConnectionTrait,
{
    Ok(moderation_penalties::Entity::find()
        .filter(moderation_penalties::Column::UserId.eq(user_id))
        .order_by_asc(moderation_penalties::Column::Id)
        .all(conn)
        .await?)
}

/// The suspension currently in force for a user, if any.
///
/// Overlapping suspensions do not stack: the latest end wins, and any
/// permanent one overrides the rest.
pub async fn active_suspension<C>(
    conn: &C,
    user_id: i32,
    now: NaiveDateTime,
) -> ModerationResult<Option<Suspension>>
where
    C: ConnectionTrait,
{
    let mut suspension = None;

    for penalty in penalties_for_user(conn, user_id).await? {
        if penalty.penalty_type != PenaltyType::Suspension || !penalty.is_active_at(now) {
            continue;
        }
        suspension = match (suspension, penalty.expires_at()) {
            (Some(Suspension::Permanent), _) | (_, None) => Some(Suspension::Permanent),
            (Some(Suspension::Until(current)), Some(end)) => Some(Suspension::Until(current.max(end))),
            (None, Some(end)) => Some(Suspension::Until(end)),
        };
    }

    Ok(suspension)
}
