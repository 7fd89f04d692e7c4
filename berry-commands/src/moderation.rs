//! Moderation commands. Every action is recorded as an infraction and posted
//! to the mod-log channel.

pub mod audit;
pub mod ban;
pub mod embeds;
pub mod info;
pub mod infractions;
pub mod kick;
pub mod note;
pub mod timeout;
pub mod unban;
pub mod warn;

use twilight_model::{
    gateway::payload::incoming::MessageCreate,
    guild::Permissions,
    id::{
        Id,
        marker::{GuildMarker, UserMarker},
    },
};

use crate::access::require;
use crate::replies::{reply, usage_message};
use berry_core::Context;
use berry_database::guild_config::GuildConfigKey;
use berry_utils::parse::parse_target_user_id;
use berry_utils::permissions::Capability;

/// Whether the author may moderate with `permission`. The staff role also grants it.
pub async fn authorized(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    permission: Permissions,
) -> anyhow::Result<bool> {
    require(
        ctx,
        msg,
        guild_id,
        Capability::Moderate(permission),
        GuildConfigKey::StaffRole,
        None,
    )
    .await
}

/// Parse the target user, replying with `usage` when it's missing or malformed.
pub async fn target_or_usage(
    ctx: &Context,
    msg: &MessageCreate,
    prefix: &str,
    usage: &str,
    arg1: Option<&str>,
) -> anyhow::Result<Option<Id<UserMarker>>> {
    let target = arg1.and_then(parse_target_user_id);
    if target.is_none() {
        reply(ctx, msg, &usage_message(prefix, usage)).await?;
    }
    Ok(target)
}
