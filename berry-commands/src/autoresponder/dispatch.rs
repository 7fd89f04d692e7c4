//! Carries out an [`ExpansionResult`] against Discord.
//!
//! Delivery failures never abort the remaining effects. They are collected and
//! posted once at the end as a single notice.

use std::time::Duration;

use tracing::{debug, warn};
use twilight_http::{Client, request::channel::reaction::RequestReactionType};
use twilight_model::id::{
    Id,
    marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker},
};

use berry_core::{Context, ResponseEntry, ResponseOrigin};
use berry_template::{
    ExpansionResult, ReactionEmoji, RoleAction, RoleEdit, RoleSnapshot, resolve_role,
};

use crate::replies::user_mentions_only;

/// The message that triggered a response.
#[derive(Clone, Copy, Debug)]
pub struct Trigger {
    pub guild_id: Id<GuildMarker>,
    pub channel_id: Id<ChannelMarker>,
    pub message_id: Id<MessageMarker>,
}

pub fn request_reaction(emoji: &ReactionEmoji) -> RequestReactionType<'_> {
    match emoji {
        ReactionEmoji::Unicode(name) => RequestReactionType::Unicode { name },
        ReactionEmoji::Custom { id, name, .. } => RequestReactionType::Custom {
            id: *id,
            name: Some(name),
        },
    }
}

fn describe_emoji(emoji: &ReactionEmoji) -> String {
    match emoji {
        ReactionEmoji::Unicode(name) => name.clone(),
        ReactionEmoji::Custom { id, name, animated } => {
            let prefix = if *animated { "a" } else { "" };
            format!("<{prefix}:{name}:{id}>")
        }
    }
}

/// Open a DM with `user_id` and send `content`.
pub async fn send_dm(http: &Client, user_id: Id<UserMarker>, content: &str) -> anyhow::Result<()> {
    let channel = http.create_private_channel(user_id).await?.model().await?;
    http.create_message(channel.id)
        .content(content)
        .allowed_mentions(Some(&user_mentions_only()))
        .await?;
    Ok(())
}

/// Guild roles as the template engine sees them.
pub async fn guild_roles(
    http: &Client,
    guild_id: Id<GuildMarker>,
) -> anyhow::Result<Vec<RoleSnapshot>> {
    let roles = http.roles(guild_id).await?.model().await?;
    Ok(roles
        .into_iter()
        .map(|role| RoleSnapshot {
            id: role.id,
            name: role.name,
            position: role.position,
        })
        .collect())
}

/// Apply one role edit to a member, returning a short outcome line.
pub async fn apply_role_edit(
    http: &Client,
    guild_id: Id<GuildMarker>,
    user_id: Id<UserMarker>,
    roles: &[RoleSnapshot],
    edit: &RoleEdit,
) -> Result<String, String> {
    let Some(role) = resolve_role(roles, &edit.role_name) else {
        return Err(format!("No role named `{}` exists.", edit.role_name));
    };

    let outcome = match edit.action {
        RoleAction::Add => http
            .add_guild_member_role(guild_id, user_id, role.id)
            .await
            .map(|_| format!("Gave you the `{}` role.", role.name)),
        RoleAction::Remove => http
            .remove_guild_member_role(guild_id, user_id, role.id)
            .await
            .map(|_| format!("Removed the `{}` role.", role.name)),
    };

    outcome.map_err(|source| {
        warn!(?source, role = %role.id, user = %user_id, "role edit failed");
        format!("I couldn't change the `{}` role. Check my role position.", role.name)
    })
}

async fn delete_later(
    ctx: Context,
    channel_id: Id<ChannelMarker>,
    message_id: Id<MessageMarker>,
    secs: u64,
) {
    tokio::time::sleep(Duration::from_secs(secs)).await;

    // The message may already be gone; that's fine.
    if let Err(source) = ctx.http.delete_message(channel_id, message_id).await {
        debug!(?source, message = %message_id, "delayed delete skipped");
    }
    ctx.responses.lock().await.remove(message_id);
}

/// Perform every side effect `result` describes, in order.
pub async fn deliver(
    ctx: &Context,
    trigger: Trigger,
    result: ExpansionResult,
    origin: Option<ResponseOrigin>,
) -> anyhow::Result<()> {
    let http = &ctx.http;
    // Placeholder values such as display names are member-controlled.
    let mentions = user_mentions_only();
    let mut failures: Vec<String> = Vec::new();

    for emoji in &result.reactions {
        if let Err(source) = http
            .create_reaction(trigger.channel_id, trigger.message_id, &request_reaction(emoji))
            .await
        {
            warn!(?source, "failed to react to trigger");
            failures.push(format!("I couldn't react with {}.", describe_emoji(emoji)));
        }
    }

    let mut response_id = None;
    if result.has_message() {
        let embeds: Vec<_> = result.embed.iter().cloned().collect();
        let components = result.components();

        let mut request = http
            .create_message(trigger.channel_id)
            .embeds(&embeds)
            .components(&components)
            .allowed_mentions(Some(&mentions));
        if !result.text.is_empty() {
            request = request.content(&result.text);
        }

        let message = request.await?.model().await?;
        response_id = Some(message.id);
    }

    // Bound reactions go on the response, or on the trigger when nothing was posted.
    let reaction_target = response_id.unwrap_or(trigger.message_id);
    for binding in &result.reaction_bindings {
        if let Err(source) = http
            .create_reaction(trigger.channel_id, reaction_target, &request_reaction(&binding.emoji))
            .await
        {
            warn!(?source, "failed to attach interaction reaction");
            failures.push(format!(
                "I couldn't add the {} reaction.",
                describe_emoji(&binding.emoji)
            ));
        }
    }

    let has_controls = !result.actions.is_empty() || origin.is_some();
    if has_controls {
        ctx.responses.lock().await.insert(
            reaction_target,
            ResponseEntry {
                guild_id: trigger.guild_id,
                channel_id: trigger.channel_id,
                origin,
                text: result.text.clone(),
                actions: result.actions.clone(),
                reaction_bindings: result.reaction_bindings.clone(),
            },
        );
    }

    if let Some(recipient) = result.dm_recipient
        && !result.text.is_empty()
        && let Err(source) = send_dm(http, recipient, &result.text).await
    {
        warn!(?source, user = %recipient, "failed to deliver DM copy");
        failures.push(format!("I couldn't DM <@{recipient}>. Their DMs may be closed."));
    }

    if result.delete_trigger
        && let Err(source) = http
            .delete_message(trigger.channel_id, trigger.message_id)
            .await
    {
        warn!(?source, "failed to delete trigger message");
        failures.push("I couldn't delete the triggering message.".to_owned());
    }

    if let (Some(secs), Some(message_id)) = (result.delete_after, response_id) {
        tokio::spawn(delete_later(ctx.clone(), trigger.channel_id, message_id, secs));
    }

    if !failures.is_empty() {
        http.create_message(trigger.channel_id)
            .content(&failures.join("\n"))
            .allowed_mentions(Some(&mentions))
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_emoji_becomes_custom_request() {
        let emoji = ReactionEmoji::Custom {
            id: Id::new(42),
            name: "berry".to_owned(),
            animated: false,
        };
        assert!(matches!(
            request_reaction(&emoji),
            RequestReactionType::Custom { name: Some("berry"), .. }
        ));
        assert_eq!(describe_emoji(&emoji), "<:berry:42>");
    }

    #[test]
    fn unicode_emoji_is_passed_through() {
        let emoji = ReactionEmoji::Unicode("🔥".to_owned());
        assert!(matches!(
            request_reaction(&emoji),
            RequestReactionType::Unicode { name: "🔥" }
        ));
    }
}
