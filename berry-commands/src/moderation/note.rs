use twilight_model::{gateway::payload::incoming::MessageCreate, guild::Permissions};

use crate::CommandMeta;
use crate::moderation::audit::{Case, finish};
use crate::moderation::{authorized, target_or_usage};
use crate::replies::{guild_only_message, usage_message};
use berry_core::Context;
use berry_database::infractions::InfractionKind;

pub const META: CommandMeta = CommandMeta {
    name: "note",
    desc: "Attach a staff-only note to a user's record.",
    category: "moderation",
    usage: "note <user> <text>",
};

/// Record a note without notifying the user.
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
    let Some(text) = arg_tail else {
        let usage = usage_message(prefix, META.usage);
        http.create_message(msg.channel_id).content(&usage).await?;
        return Ok(());
    };

    let case = Case {
        guild_id,
        target: target_user_id,
        moderator: msg.author.id,
        kind: InfractionKind::Note,
        reason: Some(text),
        duration_secs: None,
    };
    let out = match finish(&ctx, &case).await {
        Some(case_id) => format!("Noted as case #{case_id}."),
        None => "I couldn't save that note. Try again later.".to_owned(),
    };
    http.create_message(msg.channel_id).content(&out).await?;

    Ok(())
}
