//! Per-user preferences. They follow the user across guilds.

use std::{fmt, str::FromStr};

use anyhow::Context;
use twilight_model::id::{Id, marker::UserMarker};

use crate::database::{Database, to_sql};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum UserConfigKey {
    Language,
    MessageType,
}

impl UserConfigKey {
    pub const ALL: [Self; 2] = [Self::Language, Self::MessageType];

    pub fn column(self) -> &'static str {
        match self {
            Self::Language => "language",
            Self::MessageType => "message_type",
        }
    }
}

impl fmt::Display for UserConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for UserConfigKey {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|key| key.column() == normalized)
            .ok_or(())
    }
}

/// How a user wants informational replies rendered.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MessageStyle {
    #[default]
    Embed,
    Text,
}

impl MessageStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Embed => "embed",
            Self::Text => "text",
        }
    }
}

impl FromStr for MessageStyle {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "embed" => Ok(Self::Embed),
            "text" => Ok(Self::Text),
            _ => Err(()),
        }
    }
}

impl Database {
    pub async fn get_user_config(
        &self,
        user_id: Id<UserMarker>,
        key: UserConfigKey,
    ) -> anyhow::Result<Option<String>> {
        let sql = format!("SELECT {} FROM user_config WHERE user_id = $1", key.column());
        let value: Option<Option<String>> = sqlx::query_scalar(&sql)
            .bind(to_sql(user_id))
            .fetch_optional(self.pool())
            .await
            .with_context(|| format!("failed to read user config `{key}`"))?;

        Ok(value.flatten())
    }

    pub async fn set_user_config(
        &self,
        user_id: Id<UserMarker>,
        key: UserConfigKey,
        value: &str,
    ) -> anyhow::Result<()> {
        let column = key.column();
        let sql = format!(
            "INSERT INTO user_config (user_id, {column}) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET {column} = EXCLUDED.{column}"
        );
        sqlx::query(&sql)
            .bind(to_sql(user_id))
            .bind(value)
            .execute(self.pool())
            .await
            .with_context(|| format!("failed to write user config `{key}`"))?;

        Ok(())
    }

    pub async fn clear_user_config(
        &self,
        user_id: Id<UserMarker>,
        key: UserConfigKey,
    ) -> anyhow::Result<()> {
        let sql = format!(
            "UPDATE user_config SET {} = NULL WHERE user_id = $1",
            key.column()
        );
        sqlx::query(&sql)
            .bind(to_sql(user_id))
            .execute(self.pool())
            .await
            .with_context(|| format!("failed to clear user config `{key}`"))?;

        Ok(())
    }

    /// Every set key for a user, in [`UserConfigKey::ALL`] order.
    pub async fn user_config_entries(
        &self,
        user_id: Id<UserMarker>,
    ) -> anyhow::Result<Vec<(UserConfigKey, String)>> {
        let mut entries = Vec::new();
        for key in UserConfigKey::ALL {
            if let Some(value) = self.get_user_config(user_id, key).await? {
                entries.push((key, value));
            }
        }
        Ok(entries)
    }

    /// The user's reply style. Unset or unreadable values fall back to embeds.
    pub async fn message_style(&self, user_id: Id<UserMarker>) -> anyhow::Result<MessageStyle> {
        let raw = self
            .get_user_config(user_id, UserConfigKey::MessageType)
            .await?;
        Ok(raw
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_parse_from_user_input() {
        assert_eq!("language".parse(), Ok(UserConfigKey::Language));
        assert_eq!("Message-Type".parse(), Ok(UserConfigKey::MessageType));
        assert_eq!("prefix".parse::<UserConfigKey>(), Err(()));
    }

    #[test]
    fn message_styles_round_trip() {
        for style in [MessageStyle::Embed, MessageStyle::Text] {
            assert_eq!(style.as_str().parse(), Ok(style));
        }
        assert_eq!(" TEXT ".parse(), Ok(MessageStyle::Text));
        assert_eq!("fancy".parse::<MessageStyle>(), Err(()));
        assert_eq!(MessageStyle::default(), MessageStyle::Embed);
    }
}
