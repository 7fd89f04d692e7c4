use twilight_model::{gateway::payload::incoming::MessageCreate, guild::Permissions};

use crate::CommandMeta;
use crate::moderation::audit::{Case, finish};
use crate::moderation::embeds::{fetch_target_profile, moderation_action_embed};
use crate::moderation::{authorized, target_or_usage};
use crate::replies::{guild_only_message, self_action_message};
use berry_core::Context;
use berry_database::infractions::InfractionKind;

pub const META: CommandMeta = CommandMeta {
    name: "warn",
    desc: "Issue a warning to a user.",
    category: "moderation",
    usage: "warn <user> [reason]",
};

/// Record a warning for a target user and report it back to the channel.
pub async fn run(
    ctx: Context,
    msg: Box<MessageCreate>,
    prefix: &str,
    arg1: Option<&str>,
    arg_tail: Option<&str>,
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

    if target_user_id == msg.author.id {
        http.create_message(msg.channel_id)
            .content(&self_action_message("warn"))
            .await?;
        return Ok(());
    }

    let case = Case {
        guild_id,
        target: target_user_id,
        moderator: msg.author.id,
        kind: InfractionKind::Warn,
        reason: arg_tail,
        duration_secs: None,
    };
    let Some(case_id) = finish(&ctx, &case).await else {
        http.create_message(msg.channel_id)
            .content("I couldn't save that warning. Try again later.")
            .await?;
        return Ok(());
    };

    let target_profile = fetch_target_profile(http, target_user_id).await;
    let embed = moderation_action_embed(
        &target_profile,
        target_user_id,
        "warned",
        arg_tail,
        None,
        Some(case_id),
    )?;
    http.create_message(msg.channel_id).embeds(&[embed]).await?;

    Ok(())
}
