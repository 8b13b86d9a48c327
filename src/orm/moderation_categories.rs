//! SeaORM Entity for moderation_categories table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Severity tier of a category. Drives the suspension formula.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(5))")]
pub enum Severity {
    #[sea_orm(string_value = "C")]
    Critical,
    #[sea_orm(string_value = "H")]
    High,
    #[sea_orm(string_value = "M")]
    Medium,
    #[sea_orm(string_value = "L")]
    Low,
}

impl Severity {
    /// Get a human-readable label for the severity
    pub fn label(&self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "moderation_categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
