//! Per-guild settings, one nullable column per allow-listed key.

use std::{fmt, str::FromStr};

use anyhow::Context;
use twilight_model::id::{Id, marker::GuildMarker};

use crate::database::{Database, to_sql};

/// The only settings that may be read or written.
///
/// Each key maps to a fixed column so user input never reaches SQL text.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum GuildConfigKey {
    Prefix,
    ModLogChannel,
    StaffRole,
    AutoresponderEditRole,
    EmbedEditRole,
    ServerConfigRole,
}

impl GuildConfigKey {
    pub const ALL: [Self; 6] = [
        Self::Prefix,
        Self::ModLogChannel,
        Self::StaffRole,
        Self::AutoresponderEditRole,
        Self::EmbedEditRole,
        Self::ServerConfigRole,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Self::Prefix => "prefix",
            Self::ModLogChannel => "mod_log_channel",
            Self::StaffRole => "staff_role",
            Self::AutoresponderEditRole => "autoresponder_edit_role",
            Self::EmbedEditRole => "embed_edit_role",
            Self::ServerConfigRole => "server_config_role",
        }
    }
}

impl fmt::Display for GuildConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for GuildConfigKey {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|key| key.column() == normalized)
            .ok_or(())
    }
}

impl Database {
    pub async fn get_guild_config(
        &self,
        guild_id: Id<GuildMarker>,
        key: GuildConfigKey,
    ) -> anyhow::Result<Option<String>> {
        let sql = format!("SELECT {} FROM guild_config WHERE guild_id = $1", key.column());
        let value: Option<Option<String>> = sqlx::query_scalar(&sql)
            .bind(to_sql(guild_id))
            .fetch_optional(self.pool())
            .await
            .with_context(|| format!("failed to read guild config `{key}`"))?;

        Ok(value.flatten())
    }

    pub async fn set_guild_config(
        &self,
        guild_id: Id<GuildMarker>,
        key: GuildConfigKey,
        value: &str,
    ) -> anyhow::Result<()> {
        let column = key.column();
        let sql = format!(
            "INSERT INTO guild_config (guild_id, {column}) VALUES ($1, $2) \
             ON CONFLICT (guild_id) DO UPDATE SET {column} = EXCLUDED.{column}"
        );
        sqlx::query(&sql)
            .bind(to_sql(guild_id))
            .bind(value)
            .execute(self.pool())
            .await
            .with_context(|| format!("failed to write guild config `{key}`"))?;

        Ok(())
    }

    pub async fn clear_guild_config(
        &self,
        guild_id: Id<GuildMarker>,
        key: GuildConfigKey,
    ) -> anyhow::Result<()> {
        let sql = format!(
            "UPDATE guild_config SET {} = NULL WHERE guild_id = $1",
            key.column()
        );
        sqlx::query(&sql)
            .bind(to_sql(guild_id))
            .execute(self.pool())
            .await
            .with_context(|| format!("failed to clear guild config `{key}`"))?;

        Ok(())
    }

    /// Every set key for a guild, in [`GuildConfigKey::ALL`] order.
    pub async fn guild_config_entries(
        &self,
        guild_id: Id<GuildMarker>,
    ) -> anyhow::Result<Vec<(GuildConfigKey, String)>> {
        let mut entries = Vec::new();
        for key in GuildConfigKey::ALL {
            if let Some(value) = self.get_guild_config(guild_id, key).await? {
                entries.push((key, value));
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_parse_from_user_input() {
        assert_eq!("prefix".parse(), Ok(GuildConfigKey::Prefix));
        assert_eq!("Mod-Log-Channel".parse(), Ok(GuildConfigKey::ModLogChannel));
        assert_eq!("staff_role".parse(), Ok(GuildConfigKey::StaffRole));
        assert_eq!("prefix; DROP TABLE".parse::<GuildConfigKey>(), Err(()));
    }

    #[test]
    fn every_key_has_a_distinct_column() {
        let mut columns = GuildConfigKey::ALL.map(GuildConfigKey::column).to_vec();
        columns.sort_unstable();
        columns.dedup();
        assert_eq!(columns.len(), GuildConfigKey::ALL.len());
    }
}
