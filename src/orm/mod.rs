//! SeaORM entities for the moderation tables

pub mod moderated_object_logs;
pub mod moderated_objects;
pub mod moderation_categories;
pub mod moderation_penalties;
pub mod moderation_reports;
