use tracing::error;
use twilight_http::request::AuditLogReason as _;
use twilight_model::{gateway::payload::incoming::MessageCreate, guild::Permissions};

use crate::CommandMeta;
use crate::moderation::audit::{Case, finish};
use crate::moderation::embeds::{fetch_target_profile, moderation_action_embed};
use crate::moderation::{authorized, target_or_usage};
use crate::replies::{guild_only_message, self_action_message};
use berry_core::Context;
use berry_database::infractions::InfractionKind;
use berry_utils::parse::parse_duration_seconds;
use berry_utils::time::timestamp_after;

pub const META: CommandMeta = CommandMeta {
    name: "timeout",
    desc: "Timeout a user for a duration (default: 10m).",
    category: "moderation",
    usage: "timeout <user> [duration] [reason]",
};

const DEFAULT_TIMEOUT_SECS: u64 = 10 * 60;
/// Discord refuses timeouts longer than 28 days.
const MAX_TIMEOUT_SECS: u64 = 28 * 24 * 60 * 60;

/// Split an optional leading duration off the argument tail.
fn duration_and_reason(arg_tail: Option<&str>) -> (u64, Option<&str>) {
    let Some(tail) = arg_tail else {
        return (DEFAULT_TIMEOUT_SECS, None);
    };

    let mut parts = tail.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("");
    match parse_duration_seconds(first) {
        Some(secs) => {
            let reason = parts
                .next()
                .map(str::trim)
                .filter(|value| !value.is_empty());
            (secs, reason)
        }
        None => (DEFAULT_TIMEOUT_SECS, Some(tail)),
    }
}

/// Apply a temporary communication timeout to a target user.
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

    if !authorized(&ctx, &msg, guild_id, Permissions::MODERATE_MEMBERS).await? {
        return Ok(());
    }

    let target = target_or_usage(&ctx, &msg, prefix, META.usage, arg1).await?;
    let Some(target_user_id) = target else {
        return Ok(());
    };

    if target_user_id == msg.author.id {
        http.create_message(msg.channel_id)
            .content(&self_action_message("timeout"))
            .await?;
        return Ok(());
    }

    let (duration_secs, reason) = duration_and_reason(arg_tail);
    if duration_secs > MAX_TIMEOUT_SECS {
        http.create_message(msg.channel_id)
            .content("Timeouts can last at most 28 days.")
            .await?;
        return Ok(());
    }

    let expires_at = timestamp_after(duration_secs)?;
    let mut request = http
        .update_guild_member(guild_id, target_user_id)
        .communication_disabled_until(Some(expires_at));

    if let Some(reason) = reason {
        request = request.reason(reason);
    }

    if let Err(source) = request.await {
        error!(?source, "timeout request failed");
        http.create_message(msg.channel_id)
            .content("I couldn't timeout that user. Check role hierarchy and permissions.")
            .await?;
        return Ok(());
    }

    let case = Case {
        guild_id,
        target: target_user_id,
        moderator: msg.author.id,
        kind: InfractionKind::Timeout,
        reason,
        duration_secs: Some(duration_secs),
    };
    let case_id = finish(&ctx, &case).await;

    let target_profile = fetch_target_profile(http, target_user_id).await;
    let embed = moderation_action_embed(
        &target_profile,
        target_user_id,
        "timed out",
        reason,
        Some(duration_secs),
        case_id,
    )?;
    http.create_message(msg.channel_id).embeds(&[embed]).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_duration_is_optional() {
        assert_eq!(duration_and_reason(None), (DEFAULT_TIMEOUT_SECS, None));
        assert_eq!(duration_and_reason(Some("2h spam")), (7_200, Some("spam")));
        assert_eq!(duration_and_reason(Some("1d")), (86_400, None));
        assert_eq!(
            duration_and_reason(Some("being rude")),
            (DEFAULT_TIMEOUT_SECS, Some("being rude"))
        );
    }
}
