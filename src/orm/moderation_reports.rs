//! SeaORM Entity for moderation_reports table
//!
//! One report per reporter per moderated object. The schema must carry
//! [`UNIQUE_INDEX`]; a violation of it surfaces as
//! `ModerationError::DuplicateReport`.

use sea_orm::entity::prelude::*;

/// One report per reporter per moderated object
pub const UNIQUE_INDEX: &str = "CREATE UNIQUE INDEX moderation_reports_reporter_uniq \
    ON moderation_reports (reporter_id, moderated_object_id)";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "moderation_reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub reporter_id: i32,
    pub moderated_object_id: i32,
    /// Category chosen by the reporter, independent of the object's current one
    pub category_id: i32,
    pub description: Option<String>,
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
    #[sea_orm(
        belongs_to = "super::moderation_categories::Entity",
        from = "Column::CategoryId",
        to = "super::moderation_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Category,
}

impl Related<super::moderated_objects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ModeratedObject.def()
    }
}

impl Related<super::moderation_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
