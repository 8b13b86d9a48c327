//! Content moderation: reports, review workflow, audit log and penalties
//!
//! [`Moderation`] is the entry point. Every operation that writes runs in a
//! single database transaction, so a failure leaves no partial log entries
//! or half-applied state behind.

pub mod audit;
pub mod category;
pub mod content;
pub mod lifecycle;
pub mod penalty;
pub mod reports;

use crate::app_config::{self, ModerationConfig};
use crate::db;
use crate::error::{ModerationError, ModerationResult};
use crate::orm::moderation_categories::Severity;
use crate::orm::moderated_objects::{self, ObjectType, Status};
use crate::orm::{moderation_penalties, moderation_reports};
use audit::AuditEntry;
use category::CategoryRegistry;
use chrono::Utc;
use content::{ContentStore, ModeratedContent};
use lifecycle::ModeratedObjectUpdate;
use penalty::{PenaltyOutcome, Suspension};
use reports::NewReport;
use sea_orm::{entity::*, DatabaseConnection, TransactionTrait};
use std::collections::BTreeSet;
use std::sync::Arc;
use validator::Validate;

/// Result of verifying a moderated object
#[derive(Debug)]
pub struct Verification {
    pub moderated_object: moderated_objects::Model,
    /// One entry per penalty target. Empty unless the object was approved.
    pub penalties: Vec<PenaltyOutcome>,
}

impl Verification {
    pub fn issued(&self) -> impl Iterator<Item = &moderation_penalties::Model> {
        self.penalties.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (i32, &ModerationError)> {
        self.penalties
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.user_id, e)))
    }
}

/// The moderation engine.
pub struct Moderation {
    db: DatabaseConnection,
    content: Arc<dyn ContentStore>,
    categories: CategoryRegistry,
}

impl Moderation {
    pub fn new(
        db: DatabaseConnection,
        content: Arc<dyn ContentStore>,
        config: &ModerationConfig,
    ) -> Self {
        Self {
            db,
            content,
            categories: CategoryRegistry::new(config),
        }
    }

    /// Connect and build the engine from the global configuration.
    pub async fn from_config(content: Arc<dyn ContentStore>) -> ModerationResult<Self> {
        let db = db::connect(&app_config::database()).await?;
        Ok(Self::new(db, content, &app_config::moderation()))
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    /// Resolve a content reference, failing with NotFound if nothing backs it.
    pub async fn resolve(
        &self,
        object_type: ObjectType,
        object_id: i32,
    ) -> ModerationResult<ModeratedContent> {
        ModeratedContent::resolve(self.content.as_ref(), &self.db, object_type, object_id).await
    }

    /// Return the moderated object for some content, creating it if it does not exist yet.
    pub async fn get_or_create_moderated_object(
        &self,
        object_type: ObjectType,
        object_id: i32,
        category_id: i32,
    ) -> ModerationResult<moderated_objects::Model> {
        self.categories.get(&self.db, category_id).await?;

        let txn = self.db.begin().await?;

        let content =
            ModeratedContent::resolve(self.content.as_ref(), &txn, object_type, object_id).await?;
        let moderated_object = lifecycle::get_or_create(&txn, &content, category_id).await?;

        txn.commit().await?;
        Ok(moderated_object)
    }

    /// File a report, creating the moderated object on the first report.
    ///
    /// Reporting the same object twice fails with
    /// [`ModerationError::DuplicateReport`].
    pub async fn create_report(
        &self,
        report: NewReport,
    ) -> ModerationResult<moderation_reports::Model> {
        report.validate()?;
        // Categories are never deleted once committed
        self.categories.get(&self.db, report.category_id).await?;

        let txn = self.db.begin().await?;

        let content = ModeratedContent::resolve(
            self.content.as_ref(),
            &txn,
            report.object_type,
            report.object_id,
        )
        .await?;
        let moderated_object =
            lifecycle::get_or_create(&txn, &content, report.category_id).await?;

        let created = match reports::insert_report(&txn, moderated_object.id, &report).await {
            Ok(created) => created,
            Err(e) => {
                if let ModerationError::DuplicateReport { .. } = e {
                    log::warn!(
                        "User {} tried to report moderated object {} twice",
                        report.reporter_id,
                        moderated_object.id
                    );
                }
                return Err(e);
            }
        };

        txn.commit().await?;

        log::info!(
            "User {} reported {} #{} (report {}, moderated object {})",
            report.reporter_id,
            report.object_type.label(),
            report.object_id,
            created.id,
            moderated_object.id
        );
        Ok(created)
    }

    pub async fn get(&self, moderated_object_id: i32) -> ModerationResult<moderated_objects::Model> {
        moderated_objects::Entity::find_by_id(moderated_object_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ModerationError::not_found("Moderated object", moderated_object_id))
    }

    pub async fn find_for_content(
        &self,
        object_type: ObjectType,
        object_id: i32,
    ) -> ModerationResult<Option<moderated_objects::Model>> {
        lifecycle::find_by_content(&self.db, object_type, object_id).await
    }

    /// Edit the description and/or category of a moderated object.
    pub async fn update(
        &self,
        moderated_object_id: i32,
        actor_id: Option<i32>,
        changes: ModeratedObjectUpdate,
    ) -> ModerationResult<moderated_objects::Model> {
        changes.validate()?;

        let txn = self.db.begin().await?;
        let moderated_object = lifecycle::load_for_update(&txn, moderated_object_id).await?;
        let updated =
            lifecycle::update(&txn, &self.categories, moderated_object, actor_id, changes).await?;
        txn.commit().await?;

        log::info!(
            "Moderated object {} updated by {:?}",
            moderated_object_id,
            actor_id
        );
        Ok(updated)
    }

    pub async fn approve(
        &self,
        moderated_object_id: i32,
        actor_id: Option<i32>,
    ) -> ModerationResult<moderated_objects::Model> {
        self.set_status(moderated_object_id, actor_id, Status::Approved)
            .await
    }

    pub async fn reject(
        &self,
        moderated_object_id: i32,
        actor_id: Option<i32>,
    ) -> ModerationResult<moderated_objects::Model> {
        self.set_status(moderated_object_id, actor_id, Status::Rejected)
            .await
    }

    async fn set_status(
        &self,
        moderated_object_id: i32,
        actor_id: Option<i32>,
        status: Status,
    ) -> ModerationResult<moderated_objects::Model> {
        let txn = self.db.begin().await?;
        let moderated_object = lifecycle::load_for_update(&txn, moderated_object_id).await?;
        let updated = lifecycle::set_status(&txn, moderated_object, actor_id, status).await?;
        txn.commit().await?;

        log::info!(
            "Moderated object {} set to {:?} by {:?}",
            moderated_object_id,
            status,
            actor_id
        );
        Ok(updated)
    }

    /// Mark a moderated object as verified. If it is approved, suspend every
    /// penalty target.
    ///
    /// Each target's outcome is reported separately; a failed target does not
    /// stop the others.
    pub async fn verify(
        &self,
        moderated_object_id: i32,
        actor_id: Option<i32>,
    ) -> ModerationResult<Verification> {
        let txn = self.db.begin().await?;
        let moderated_object = lifecycle::load_for_update(&txn, moderated_object_id).await?;
        let moderated_object = lifecycle::mark_verified(&txn, moderated_object, actor_id).await?;

        let penalties = if moderated_object.is_approved() {
            let severity = self
                .categories
                .severity_of(&txn, moderated_object.category_id)
                .await?;
            let content = ModeratedContent::resolve(
                self.content.as_ref(),
                &txn,
                moderated_object.object_type,
                moderated_object.object_id,
            )
            .await?;
            let targets = content.penalty_targets(&txn).await?;

            penalty::issue_suspensions(&txn, moderated_object.id, severity, &targets).await
        } else {
            Vec::new()
        };

        txn.commit().await?;

        log::info!(
            "Moderated object {} verified by {:?} ({} penalties issued)",
            moderated_object_id,
            actor_id,
            penalties.iter().filter(|o| o.is_issued()).count()
        );
        Ok(Verification {
            moderated_object,
            penalties,
        })
    }

    /// Undo a verification, removing every penalty it issued.
    pub async fn unverify(
        &self,
        moderated_object_id: i32,
        actor_id: Option<i32>,
    ) -> ModerationResult<moderated_objects::Model> {
        let txn = self.db.begin().await?;
        let moderated_object = lifecycle::load_for_update(&txn, moderated_object_id).await?;
        let updated = lifecycle::mark_unverified(&txn, moderated_object, actor_id).await?;
        txn.commit().await?;

        log::info!(
            "Moderated object {} unverified by {:?}",
            moderated_object_id,
            actor_id
        );
        Ok(updated)
    }

    pub async fn get_reporters(&self, moderated_object_id: i32) -> ModerationResult<BTreeSet<i32>> {
        reports::reporters_of(&self.db, moderated_object_id).await
    }

    /// Everyone who reported some content. Empty if it was never reported.
    pub async fn reporters_for_content(
        &self,
        object_type: ObjectType,
        object_id: i32,
    ) -> ModerationResult<BTreeSet<i32>> {
        self.resolve(object_type, object_id)
            .await?
            .reporters(&self.db)
            .await
    }

    pub async fn reports(
        &self,
        moderated_object_id: i32,
    ) -> ModerationResult<Vec<moderation_reports::Model>> {
        reports::reports_for(&self.db, moderated_object_id).await
    }

    pub async fn has_reported(
        &self,
        reporter_id: i32,
        moderated_object_id: i32,
    ) -> ModerationResult<bool> {
        reports::has_reported(&self.db, reporter_id, moderated_object_id).await
    }

    pub async fn logs(&self, moderated_object_id: i32) -> ModerationResult<Vec<AuditEntry>> {
        audit::entries_for(&self.db, moderated_object_id).await
    }

    /// Penalties issued by a moderated object.
    pub async fn penalties(
        &self,
        moderated_object_id: i32,
    ) -> ModerationResult<Vec<moderation_penalties::Model>> {
        let moderated_object = self.get(moderated_object_id).await?;
        Ok(moderated_object
            .find_related(moderation_penalties::Entity)
            .all(&self.db)
            .await?)
    }

    pub async fn penalties_for_user(
        &self,
        user_id: i32,
    ) -> ModerationResult<Vec<moderation_penalties::Model>> {
        penalty::penalties_for_user(&self.db, user_id).await
    }

    pub async fn count_penalties_at_severity(
        &self,
        user_id: i32,
        severity: Severity,
    ) -> ModerationResult<u64> {
        penalty::count_penalties_at_severity(&self.db, user_id, severity, None).await
    }

    pub async fn active_suspension(&self, user_id: i32) -> ModerationResult<Option<Suspension>> {
        penalty::active_suspension(&self.db, user_id, Utc::now().naive_utc()).await
    }
}
