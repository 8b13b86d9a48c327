//! SeaORM Entity for moderation_penalties table

use chrono::{Duration, NaiveDateTime};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(5))")]
pub enum PenaltyType {
    #[sea_orm(string_value = "S")]
    Suspension,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "moderation_penalties")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub moderated_object_id: i32,
    pub penalty_type: PenaltyType,
    /// None means the penalty never expires
    pub duration_seconds: Option<i64>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::moderated_objects::Entity",
        from = "Column::ModeratedObjectId",
        to = "super::moderated_objects::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    ModeratedObject,
}

impl Related<super::moderated_objects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ModeratedObject.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn duration(&self) -> Option<Duration> {
        self.duration_seconds.map(Duration::seconds)
    }

    pub fn is_permanent(&self) -> bool {
        self.duration_seconds.is_none()
    }

    /// When the penalty stops applying, or None if permanent
    pub fn expires_at(&self) -> Option<NaiveDateTime> {
        self.duration()
            .and_then(|duration| self.created_at.checked_add_signed(duration))
    }

    pub fn is_active_at(&self, now: NaiveDateTime) -> bool {
        match self.duration() {
            Some(duration) => self
                .created_at
                .checked_add_signed(duration)
                .map_or(true, |expires_at| expires_at > now),
            None => true,
        }
    }
}
