//! Moderation category registry
//!
//! Categories are immutable once created, so committed lookups are served
//! from a TTL cache after the first database hit.

use crate::app_config::ModerationConfig;
use crate::error::{ModerationError, ModerationResult};
use crate::orm::moderation_categories::{self, Severity};
use chrono::Utc;
use moka::sync::Cache;
use sea_orm::{entity::*, query::*, ActiveValue::Set, ConnectionTrait, DatabaseConnection};
use serde::Deserialize;
use std::time::Duration;
use validator::Validate;

/// Categories every installation starts with: (name, title, description, severity)
pub const DEFAULT_CATEGORIES: &[(&str, &str, &str, Severity)] = &[
    (
        "child_abuse",
        "Child abuse",
        "Content depicting or promoting the abuse of minors.",
        Severity::Critical,
    ),
    (
        "pornography",
        "Pornography",
        "Sexually explicit content.",
        Severity::High,
    ),
    (
        "hatred_bullying",
        "Hatred and bullying",
        "Content attacking people based on who they are, or targeted harassment.",
        Severity::High,
    ),
    (
        "violence",
        "Violent or gory",
        "Graphic violence or threats of violence.",
        Severity::High,
    ),
    (
        "misinformation",
        "Misinformation",
        "Deliberately false or misleading content.",
        Severity::Medium,
    ),
    (
        "copyright",
        "Copyright infringement",
        "Content shared without the rights holder's permission.",
        Severity::Medium,
    ),
    (
        "spam",
        "Spam",
        "Unsolicited advertising or repetitive content.",
        Severity::Low,
    ),
    (
        "other",
        "Other",
        "Something else that breaks the community guidelines.",
        Severity::Low,
    ),
];

/// Input for creating a category
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 32))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub title: String,
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    pub severity: Severity,
}

/// Cached lookup of moderation categories by id.
pub struct CategoryRegistry {
    cache: Cache<i32, moderation_categories::Model>,
}

impl CategoryRegistry {
    pub fn new(config: &ModerationConfig) -> Self {
        Self {
            cache: Cache::builder()
                .time_to_live(Duration::from_secs(config.category_cache_ttl_seconds))
                .max_capacity(config.category_cache_capacity)
                .build(),
        }
    }

    /// Get a committed category by id, failing with NotFound if it does not exist.
    ///
    /// Only reads through the pool fill the cache, so a row created inside a
    /// transaction that later rolls back is never cached.
    pub async fn get(
        &self,
        db: &DatabaseConnection,
        id: i32,
    ) -> ModerationResult<moderation_categories::Model> {
        if let Some(category) = self.cache.get(&id) {
            return Ok(category);
        }

        let category = fetch(db, id).await?;
        self.cache.insert(id, category.clone());
        Ok(category)
    }

    /// Get a category through any connection, including an open transaction.
    /// Cache hits are served but misses are not cached.
    pub async fn lookup<C>(&self, conn: &C, id: i32) -> ModerationResult<moderation_categories::Model>
    where
        C: ConnectionTrait,
    {
        match self.cache.get(&id) {
            Some(category) => Ok(category),
            None => fetch(conn, id).await,
        }
    }

    pub async fn severity_of<C>(&self, conn: &C, id: i32) -> ModerationResult<Severity>
    where
        C: ConnectionTrait,
    {
        Ok(self.lookup(conn, id).await?.severity)
    }

    pub async fn find_by_name<C>(
        &self,
        conn: &C,
        name: &str,
    ) -> ModerationResult<Option<moderation_categories::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(moderation_categories::Entity::find()
            .filter(moderation_categories::Column::Name.eq(name))
            .one(conn)
            .await?)
    }

    /// All categories, most severe first.
    pub async fn all<C>(&self, conn: &C) -> ModerationResult<Vec<moderation_categories::Model>>
    where
        C: ConnectionTrait,
    {
        let mut categories = moderation_categories::Entity::find()
            .order_by_asc(moderation_categories::Column::Id)
            .all(conn)
            .await?;
        categories.sort_by_key(|c| severity_rank(c.severity));
        Ok(categories)
    }

    pub async fn create<C>(
        &self,
        conn: &C,
        new_category: NewCategory,
    ) -> ModerationResult<moderation_categories::Model>
    where
        C: ConnectionTrait,
    {
        new_category.validate()?;

        let category = moderation_categories::ActiveModel {
            name: Set(new_category.name.clone()),
            title: Set(new_category.title),
            description: Set(new_category.description),
            severity: Set(new_category.severity),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        };

        let category = category.insert(conn).await.map_err(|e| {
            if crate::db::is_unique_violation(&e) {
                ModerationError::InvalidInput(format!(
                    "Moderation category '{}' already exists",
                    new_category.name
                ))
            } else {
                e.into()
            }
        })?;

        log::info!(
            "Created moderation category {} ({}, {})",
            category.id,
            category.name,
            category.severity
        );
        Ok(category)
    }

    /// Insert any of [`DEFAULT_CATEGORIES`] that are missing. Returns how many were created.
    pub async fn seed_defaults<C>(&self, conn: &C) -> ModerationResult<usize>
    where
        C: ConnectionTrait,
    {
        let mut created = 0;
        for (name, title, description, severity) in DEFAULT_CATEGORIES {
            if self.find_by_name(conn, name).await?.is_some() {
                continue;
            }
            self.create(
                conn,
                NewCategory {
                    name: name.to_string(),
                    title: title.to_string(),
                    description: description.to_string(),
                    severity: *severity,
                },
            )
            .await?;
            created += 1;
        }
        Ok(created)
    }
}

async fn fetch<C>(conn: &C, id: i32) -> ModerationResult<moderation_categories::Model>
where
    C: ConnectionTrait,
{
    moderation_categories::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ModerationError::not_found("Moderation category", id))
}

fn severity_rank(severity: Severity) -> u8 {
    match severity {
        Severity::Critical => 0,
        Severity::High => 1,
        Severity::Medium => 2,
        Severity::Low => 3,
    }
}
