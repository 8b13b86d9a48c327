//! SeaORM Entity for moderated_objects table
//!
//! One row per moderated piece of content, keyed uniquely by
//! `(object_type, object_id)`. The schema must carry that rule as
//! [`UNIQUE_INDEX`]; concurrent get-or-create relies on it to detect a lost race.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One moderated object per piece of content
pub const UNIQUE_INDEX: &str = "CREATE UNIQUE INDEX moderated_objects_object_uniq \
    ON moderated_objects (object_type, object_id)";

/// Review status of a moderated object
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(5))")]
pub enum Status {
    #[sea_orm(string_value = "P")]
    Pending,
    #[sea_orm(string_value = "A")]
    Approved,
    #[sea_orm(string_value = "R")]
    Rejected,
}

/// Kind of content a moderated object points at
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(5))")]
pub enum ObjectType {
    #[sea_orm(string_value = "P")]
    Post,
    #[sea_orm(string_value = "PC")]
    PostComment,
    #[sea_orm(string_value = "C")]
    Community,
    #[sea_orm(string_value = "U")]
    User,
    /// Another moderated object (reports against a report)
    #[sea_orm(string_value = "MO")]
    ModeratedObject,
}

impl ObjectType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Post => "Post",
            Self::PostComment => "Post Comment",
            Self::Community => "Community",
            Self::User => "User",
            Self::ModeratedObject => "Moderated Object",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "moderated_objects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub community_id: Option<i32>,
    pub description: Option<String>,
    pub verified: bool,
    pub status: Status,
    pub category_id: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub object_audit_snapshot: Option<String>,
    pub object_type: ObjectType,
    pub object_id: i32,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::moderation_categories::Entity",
        from = "Column::CategoryId",
        to = "super::moderation_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Category,
    #[sea_orm(has_many = "super::moderation_reports::Entity")]
    Reports,
    #[sea_orm(has_many = "super::moderation_penalties::Entity")]
    Penalties,
    #[sea_orm(has_many = "super::moderated_object_logs::Entity")]
    Logs,
}

impl Related<super::moderation_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::moderation_reports::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reports.def()
    }
}

impl Related<super::moderation_penalties::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Penalties.def()
    }
}

impl Related<super::moderated_object_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Logs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn is_approved(&self) -> bool {
        self.status == Status::Approved
    }

    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }
}
