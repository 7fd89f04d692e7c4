//! Custom embed definitions, stored as raw JSON text.

use anyhow::Context;
use sqlx::FromRow;
use twilight_model::id::{
    Id,
    marker::{GuildMarker, UserMarker},
};

use crate::database::{Database, from_sql, ids_from_sql, ids_to_sql, to_sql};

#[derive(Debug, FromRow)]
struct EmbedRow {
    name: String,
    definition: String,
    creator_id: i64,
    editors: Vec<i64>,
    updated_at: i64,
}

#[derive(Clone, Debug)]
pub struct StoredEmbed {
    pub name: String,
    pub definition: String,
    pub creator_id: Id<UserMarker>,
    pub editors: Vec<Id<UserMarker>>,
    /// Unix seconds.
    pub updated_at: i64,
}

impl TryFrom<EmbedRow> for StoredEmbed {
    type Error = anyhow::Error;

    fn try_from(row: EmbedRow) -> Result<Self, Self::Error> {
        Ok(Self {
            creator_id: from_sql(row.creator_id).context("embed has a zero creator id")?,
            editors: ids_from_sql(&row.editors),
            name: row.name,
            definition: row.definition,
            updated_at: row.updated_at,
        })
    }
}

impl Database {
    /// Insert a new embed. Returns `false` when the name is already taken.
    pub async fn create_embed(
        &self,
        guild_id: Id<GuildMarker>,
        name: &str,
        definition: &str,
        creator_id: Id<UserMarker>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO embeds (guild_id, name, definition, creator_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (guild_id, name) DO NOTHING
            "#,
        )
        .bind(to_sql(guild_id))
        .bind(name)
        .bind(definition)
        .bind(to_sql(creator_id))
        .execute(self.pool())
        .await
        .context("failed to create embed")?;

        Ok(result.rows_affected() == 1)
    }

    /// Replace an embed's definition. Returns `false` when it does not exist.
    pub async fn update_embed(
        &self,
        guild_id: Id<GuildMarker>,
        name: &str,
        definition: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE embeds
            SET definition = $3, updated_at = EXTRACT(EPOCH FROM NOW())::BIGINT
            WHERE guild_id = $1 AND name = $2
            "#,
        )
        .bind(to_sql(guild_id))
        .bind(name)
        .bind(definition)
        .execute(self.pool())
        .await
        .context("failed to update embed")?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_embed(&self, guild_id: Id<GuildMarker>, name: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM embeds WHERE guild_id = $1 AND name = $2")
            .bind(to_sql(guild_id))
            .bind(name)
            .execute(self.pool())
            .await
            .context("failed to delete embed")?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get_embed(
        &self,
        guild_id: Id<GuildMarker>,
        name: &str,
    ) -> anyhow::Result<Option<StoredEmbed>> {
        let row: Option<EmbedRow> = sqlx::query_as(
            r#"
            SELECT name, definition, creator_id, editors, updated_at
            FROM embeds
            WHERE guild_id = $1 AND name = $2
            "#,
        )
        .bind(to_sql(guild_id))
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .context("failed to load embed")?;

        row.map(StoredEmbed::try_from).transpose()
    }

    /// Embed names for a guild, alphabetically.
    pub async fn list_embeds(&self, guild_id: Id<GuildMarker>) -> anyhow::Result<Vec<String>> {
        sqlx::query_scalar("SELECT name FROM embeds WHERE guild_id = $1 ORDER BY name")
            .bind(to_sql(guild_id))
            .fetch_all(self.pool())
            .await
            .context("failed to list embeds")
    }

    pub async fn set_embed_editors(
        &self,
        guild_id: Id<GuildMarker>,
        name: &str,
        editors: &[Id<UserMarker>],
    ) -> anyhow::Result<bool> {
        let result =
            sqlx::query("UPDATE embeds SET editors = $3 WHERE guild_id = $1 AND name = $2")
                .bind(to_sql(guild_id))
                .bind(name)
                .bind(ids_to_sql(editors))
                .execute(self.pool())
                .await
                .context("failed to update embed editors")?;

        Ok(result.rows_affected() == 1)
    }
}
