//! Glue between guild settings and the shared authorization rule.

use tracing::error;
use twilight_model::{
    gateway::payload::incoming::MessageCreate,
    id::{
        Id,
        marker::{GuildMarker, RoleMarker, UserMarker},
    },
};

use berry_core::Context;
use berry_database::guild_config::GuildConfigKey;
use berry_utils::parse::parse_role_id;
use berry_utils::permissions::{
    Capability, CapabilityRequest, Decision, authorize, message_subject,
};

/// A role id stored under `key`, if one is configured and readable.
pub async fn configured_role(
    ctx: &Context,
    guild_id: Id<GuildMarker>,
    key: GuildConfigKey,
) -> Option<Id<RoleMarker>> {
    match ctx.db.get_guild_config(guild_id, key).await {
        Ok(value) => value.as_deref().and_then(parse_role_id),
        Err(source) => {
            error!(?source, %key, "failed to read role setting");
            None
        }
    }
}

/// Owner and editors of the resource a command acts on.
pub struct Resource<'a> {
    pub owner: Id<UserMarker>,
    pub editors: &'a [Id<UserMarker>],
}

/// Decide whether the author of `msg` holds `capability`.
///
/// `role_key` names the guild setting whose role also grants it.
pub async fn check(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    capability: Capability,
    role_key: GuildConfigKey,
    resource: Option<Resource<'_>>,
) -> anyhow::Result<Decision> {
    let subject = message_subject(&ctx.http, msg).await?;
    let granting_role = configured_role(ctx, guild_id, role_key).await;

    let mut request = CapabilityRequest::new(capability, granting_role);
    if let Some(resource) = resource {
        request = request.on_resource(resource.owner, resource.editors);
    }

    Ok(authorize(&subject, &request))
}

/// Like [`check`], replying with the denial reason when refused.
pub async fn require(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    capability: Capability,
    role_key: GuildConfigKey,
    resource: Option<Resource<'_>>,
) -> anyhow::Result<bool> {
    let decision = check(ctx, msg, guild_id, capability, role_key, resource).await?;
    if !decision.is_allowed() {
        ctx.http
            .create_message(msg.channel_id)
            .content(&decision.to_string())
            .await?;
    }

    Ok(decision.is_allowed())
}
