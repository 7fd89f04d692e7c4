use tracing::{debug, warn};
use twilight_model::{
    gateway::payload::incoming::MessageCreate,
    id::{Id, marker::GuildMarker},
};

use berry_core::{Context, ResponseOrigin};
use berry_template::expand;

use crate::autoresponder::dispatch::{Trigger, deliver};
use crate::autoresponder::snapshot::build_context;
use crate::replies::user_mentions_only;

/// Answer `msg` with the first autoresponder whose trigger it contains.
pub async fn respond(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    prefix: &str,
) -> anyhow::Result<()> {
    let autoresponders = ctx.db.list_autoresponders(guild_id).await?;
    let Some(autoresponder) = autoresponders
        .into_iter()
        .find(|autoresponder| autoresponder.matches(&msg.content))
    else {
        return Ok(());
    };

    let expansion_ctx = build_context(ctx, msg, guild_id, prefix).await?;
    let result = match expand(&autoresponder.response, &expansion_ctx, &ctx.db).await {
        Ok(Some(result)) => result,
        Ok(None) => {
            debug!(autoresponder = %autoresponder.name, "response suppressed by condition");
            return Ok(());
        }
        Err(source) => {
            warn!(%source, autoresponder = %autoresponder.name, "autoresponder failed to expand");
            ctx.http
                .create_message(msg.channel_id)
                .content(&format!("Autoresponder `{}`: {source}", autoresponder.name))
                .allowed_mentions(Some(&user_mentions_only()))
                .await?;
            return Ok(());
        }
    };

    let trigger = Trigger {
        guild_id,
        channel_id: msg.channel_id,
        message_id: msg.id,
    };
    let origin = ResponseOrigin {
        name: autoresponder.name,
        trigger: autoresponder.trigger,
        creator_id: autoresponder.creator_id,
    };

    deliver(ctx, trigger, result, Some(origin)).await
}
