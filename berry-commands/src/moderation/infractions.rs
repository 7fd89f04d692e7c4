use twilight_model::{gateway::payload::incoming::MessageCreate, guild::Permissions};

use crate::CommandMeta;
use crate::moderation::embeds::{fetch_target_profile, infractions_embed};
use crate::moderation::{authorized, target_or_usage};
use crate::replies::guild_only_message;
use berry_core::Context;

pub const META: CommandMeta = CommandMeta {
    name: "infractions",
    desc: "Show a user's moderation history.",
    category: "moderation",
    usage: "infractions <user>",
};

pub async fn run(
    ctx: Context,
    msg: Box<MessageCreate>,
    prefix: &str,
    arg1: Option<&str>,
) -> anyhow::Result<()> {
    let http = &ctx.http;
    let Some(guild_id) = msg.guild_id else {
        http.create_message(msg.channel_id)
            .content(guild_only_message())
            .await?;
        return Ok(());
    };

    if !authorized(&ctx, &msg, guild_id, Permissions::MANAGE_MESSAGES).await? {
        return Ok(());
    }

    let target = target_or_usage(&ctx, &msg, prefix, META.usage, arg1).await?;
    let Some(target_user_id) = target else {
        return Ok(());
    };

    let infractions = ctx.db.get_infractions(guild_id, target_user_id).await?;
    let target_profile = fetch_target_profile(http, target_user_id).await;
    let embed = infractions_embed(&target_profile, &infractions)?;
    http.create_message(msg.channel_id).embeds(&[embed]).await?;

    Ok(())
}
