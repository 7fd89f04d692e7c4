mod database;
mod store;

pub use database::{Database, MIGRATOR};

/// Autoresponder triggers and response templates.
pub mod autoresponders;
/// Custom embed definitions.
pub mod embeds;
/// Allow-listed per-guild settings.
pub mod guild_config;
/// Moderation history.
pub mod infractions;
/// Allow-listed per-user preferences.
pub mod user_config;
