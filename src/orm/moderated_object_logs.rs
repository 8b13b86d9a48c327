//! SeaORM Entity for moderated_object_logs table
//!
//! Append-only. The `detail` column holds the serialized
//! [`LogDetail`](crate::moderation::audit::LogDetail) of the change.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(5))")]
pub enum LogType {
    #[sea_orm(string_value = "DC")]
    DescriptionChanged,
    #[sea_orm(string_value = "AC")]
    StatusChanged,
    #[sea_orm(string_value = "TC")]
    TypeChanged,
    #[sea_orm(string_value = "SC")]
    SubmittedChanged,
    #[sea_orm(string_value = "VC")]
    VerifiedChanged,
    #[sea_orm(string_value = "CC")]
    CategoryChanged,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "moderated_object_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub log_type: LogType,
    /// None for system-initiated changes
    pub actor_id: Option<i32>,
    pub moderated_object_id: i32,
    #[sea_orm(column_type = "Text")]
    pub detail: String,
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
