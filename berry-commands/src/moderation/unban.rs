use tracing::error;
use twilight_http::request::AuditLogReason as _;
use twilight_model::{gateway::payload::incoming::MessageCreate, guild::Permissions};

use crate::CommandMeta;
use crate::moderation::audit::{Case, finish};
use crate::moderation::embeds::{fetch_target_profile, moderation_action_embed};
use crate::moderation::{authorized, target_or_usage};
use crate::replies::guild_only_message;
use berry_core::Context;
use berry_database::infractions::InfractionKind;

pub const META: CommandMeta = CommandMeta {
    name: "unban",
    desc: "Lift a user's ban.",
    category: "moderation",
    usage: "unban <user> [reason]",
};

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

    if !authorized(&ctx, &msg, guild_id, Permissions::BAN_MEMBERS).await? {
        return Ok(());
    }

    let target = target_or_usage(&ctx, &msg, prefix, META.usage, arg1).await?;
    let Some(target_user_id) = target else {
        return Ok(());
    };

    let mut request = http.delete_ban(guild_id, target_user_id);
    if let Some(reason) = arg_tail {
        request = request.reason(reason);
    }

    if let Err(source) = request.await {
        error!(?source, "unban request failed");
        http.create_message(msg.channel_id)
            .content("I couldn't unban that user. They may not be banned, or I lack permissions.")
            .await?;
        return Ok(());
    }

    let case = Case {
        guild_id,
        target: target_user_id,
        moderator: msg.author.id,
        kind: InfractionKind::Unban,
        reason: arg_tail,
        duration_secs: None,
    };
    let case_id = finish(&ctx, &case).await;

    let target_profile = fetch_target_profile(http, target_user_id).await;
    let embed = moderation_action_embed(
        &target_profile,
        target_user_id,
        "unbanned",
        arg_tail,
        None,
        case_id,
    )?;
    http.create_message(msg.channel_id).embeds(&[embed]).await?;

    Ok(())
}
