use async_trait::async_trait;
use berry_template::ExpansionStore;
use twilight_model::id::{
    Id,
    marker::{GuildMarker, UserMarker},
};

use crate::database::Database;

#[async_trait]
impl ExpansionStore for Database {
    async fn embed(&self, guild_id: Id<GuildMarker>, name: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .get_embed(guild_id, name)
            .await?
            .map(|stored| stored.definition))
    }

    async fn infraction_count(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> anyhow::Result<usize> {
        self.count_infractions(guild_id, user_id).await
    }
}
