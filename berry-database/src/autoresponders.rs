//! Trigger → response templates.

use anyhow::Context;
use sqlx::FromRow;
use twilight_model::id::{
    Id,
    marker::{GuildMarker, UserMarker},
};

use crate::database::{Database, from_sql, ids_from_sql, ids_to_sql, to_sql};

#[derive(Debug, FromRow)]
struct AutoresponderRow {
    name: String,
    trigger_text: String,
    response: String,
    creator_id: i64,
    editors: Vec<i64>,
    created_at: i64,
}

#[derive(Clone, Debug)]
pub struct Autoresponder {
    pub name: String,
    /// Matched case-insensitively anywhere in a message.
    pub trigger: String,
    /// Template text, stored exactly as written.
    pub response: String,
    pub creator_id: Id<UserMarker>,
    pub editors: Vec<Id<UserMarker>>,
    /// Unix seconds.
    pub created_at: i64,
}

impl Autoresponder {
    pub fn matches(&self, content: &str) -> bool {
        let trigger = self.trigger.to_lowercase();
        !trigger.is_empty() && content.to_lowercase().contains(&trigger)
    }
}

impl TryFrom<AutoresponderRow> for Autoresponder {
    type Error = anyhow::Error;

    fn try_from(row: AutoresponderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            creator_id: from_sql(row.creator_id).context("autoresponder has a zero creator id")?,
            editors: ids_from_sql(&row.editors),
            name: row.name,
            trigger: row.trigger_text,
            response: row.response,
            created_at: row.created_at,
        })
    }
}

/// Fields for creating an autoresponder.
#[derive(Clone, Debug)]
pub struct NewAutoresponder<'a> {
    pub guild_id: Id<GuildMarker>,
    pub name: &'a str,
    pub trigger: &'a str,
    pub response: &'a str,
    pub creator_id: Id<UserMarker>,
}

const SELECT_COLUMNS: &str =
    "SELECT name, trigger_text, response, creator_id, editors, created_at FROM autoresponders";

impl Database {
    /// Returns `false` when the name is already taken in the guild.
    pub async fn create_autoresponder(&self, new: &NewAutoresponder<'_>) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO autoresponders (guild_id, name, trigger_text, response, creator_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (guild_id, name) DO NOTHING
            "#,
        )
        .bind(to_sql(new.guild_id))
        .bind(new.name)
        .bind(new.trigger)
        .bind(new.response)
        .bind(to_sql(new.creator_id))
        .execute(self.pool())
        .await
        .context("failed to create autoresponder")?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn update_autoresponder_response(
        &self,
        guild_id: Id<GuildMarker>,
        name: &str,
        response: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE autoresponders SET response = $3 WHERE guild_id = $1 AND name = $2",
        )
        .bind(to_sql(guild_id))
        .bind(name)
        .bind(response)
        .execute(self.pool())
        .await
        .context("failed to update autoresponder")?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_autoresponder(
        &self,
        guild_id: Id<GuildMarker>,
        name: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM autoresponders WHERE guild_id = $1 AND name = $2")
            .bind(to_sql(guild_id))
            .bind(name)
            .execute(self.pool())
            .await
            .context("failed to delete autoresponder")?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get_autoresponder(
        &self,
        guild_id: Id<GuildMarker>,
        name: &str,
    ) -> anyhow::Result<Option<Autoresponder>> {
        let sql = format!("{SELECT_COLUMNS} WHERE guild_id = $1 AND name = $2");
        let row: Option<AutoresponderRow> = sqlx::query_as(&sql)
            .bind(to_sql(guild_id))
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .context("failed to load autoresponder")?;

        row.map(Autoresponder::try_from).transpose()
    }

    /// All autoresponders of a guild, oldest first so earlier ones win ties.
    pub async fn list_autoresponders(
        &self,
        guild_id: Id<GuildMarker>,
    ) -> anyhow::Result<Vec<Autoresponder>> {
        let sql = format!("{SELECT_COLUMNS} WHERE guild_id = $1 ORDER BY created_at, name");
        let rows: Vec<AutoresponderRow> = sqlx::query_as(&sql)
            .bind(to_sql(guild_id))
            .fetch_all(self.pool())
            .await
            .context("failed to list autoresponders")?;

        rows.into_iter().map(Autoresponder::try_from).collect()
    }

    pub async fn set_autoresponder_editors(
        &self,
        guild_id: Id<GuildMarker>,
        name: &str,
        editors: &[Id<UserMarker>],
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE autoresponders SET editors = $3 WHERE guild_id = $1 AND name = $2",
        )
        .bind(to_sql(guild_id))
        .bind(name)
        .bind(ids_to_sql(editors))
        .execute(self.pool())
        .await
        .context("failed to update autoresponder editors")?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use berry_template::extract::parse;

    use super::*;

    fn autoresponder(trigger: &str) -> Autoresponder {
        Autoresponder {
            name: "greet".to_owned(),
            trigger: trigger.to_owned(),
            response: "hi {user}".to_owned(),
            creator_id: Id::new(1),
            editors: Vec::new(),
            created_at: 0,
        }
    }

    #[test]
    fn trigger_matches_case_insensitive_substring() {
        let ar = autoresponder("Good Morning");
        assert!(ar.matches("well, good morning everyone"));
        assert!(ar.matches("GOOD MORNING"));
        assert!(!ar.matches("good evening"));
    }

    #[test]
    fn stored_template_reparses_to_the_same_directives() {
        let template = "{react:🔥}Welcome {user}! {interaction:button:Hi {user_name}:v}\
                        {action:{role:add:Member}:v}{dm}{delete_response:5}\
                        {if:channel:#rules:ignore}{embed:welcome}";
        let row = AutoresponderRow {
            name: "welcome".to_owned(),
            trigger_text: "hello".to_owned(),
            response: template.to_owned(),
            creator_id: 7,
            editors: vec![8, 0],
            created_at: 1_700_000_000,
        };
        let stored = Autoresponder::try_from(row).unwrap();

        let written = parse(template).unwrap();
        let reloaded = parse(&stored.response).unwrap();
        assert_eq!(written.directives(), reloaded.directives());
        assert_eq!(written.text, reloaded.text);
        assert_eq!(reloaded.directives().len(), 7);
        assert_eq!(stored.editors, vec![Id::new(8)]);
    }

    #[test]
    fn empty_trigger_never_matches() {
        assert!(!autoresponder("").matches("anything"));
    }
}
