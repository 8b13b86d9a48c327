pub mod app_config;
pub mod db;
pub mod error;
pub mod moderation;
pub mod orm;

pub use error::{ModerationError, ModerationResult};
pub use moderation::Moderation;
