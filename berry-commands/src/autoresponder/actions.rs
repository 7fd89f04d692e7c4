//! Runs the actions bound to buttons and reactions on sent responses.

use tracing::{debug, warn};
use twilight_model::{
    application::interaction::{Interaction, InteractionData},
    channel::message::EmojiReactionType,
    gateway::GatewayReaction,
    id::{
        Id,
        marker::{GuildMarker, UserMarker},
    },
};

use berry_core::{Context, ResponseEntry};
use berry_database::guild_config::GuildConfigKey;
use berry_template::{ActionSpec, ReactionEmoji, tag_from_custom_id};
use berry_utils::interaction::{interaction_user_id, respond_ephemeral_message};
use berry_utils::permissions::{
    Capability, CapabilityRequest, Subject, authorize, resolve_member_permissions,
};

use crate::access::configured_role;
use crate::autoresponder::dispatch::{apply_role_edit, guild_roles, send_dm};

const TRASH: &str = "🗑️";
const INFO: &str = "❓";

/// Run `spec` for `user_id`. Both arms carry a line to show the user.
pub async fn run_action(
    ctx: &Context,
    guild_id: Id<GuildMarker>,
    user_id: Id<UserMarker>,
    spec: &ActionSpec,
    response_text: &str,
) -> Result<String, String> {
    match spec {
        ActionSpec::RoleEdit(edit) => {
            let roles = guild_roles(&ctx.http, guild_id).await.map_err(|source| {
                warn!(?source, "failed to load guild roles");
                "I couldn't load this server's roles.".to_owned()
            })?;
            apply_role_edit(&ctx.http, guild_id, user_id, &roles, edit).await
        }
        ActionSpec::Dm(message) => {
            let content = message.as_deref().unwrap_or(response_text);
            if content.is_empty() {
                return Err("There is nothing to send you.".to_owned());
            }
            send_dm(&ctx.http, user_id, content)
                .await
                .map(|()| "Check your DMs.".to_owned())
                .map_err(|source| {
                    warn!(?source, user = %user_id, "failed to deliver action DM");
                    "I couldn't DM you. Your DMs may be closed.".to_owned()
                })
        }
        ActionSpec::Unknown(raw) => Err(format!("Unknown action `{raw}`.")),
    }
}

/// Tag of a clicked template button, or `None` for any other interaction.
fn template_tag(data: Option<&InteractionData>) -> Option<&str> {
    match data? {
        InteractionData::MessageComponent(data) => tag_from_custom_id(&data.custom_id),
        _ => None,
    }
}

/// Handle a click on a template button. Returns `false` for other interactions.
pub async fn handle_component(ctx: &Context, interaction: &Interaction) -> anyhow::Result<bool> {
    let Some(tag) = template_tag(interaction.data.as_ref()) else {
        return Ok(false);
    };
    let http = &ctx.http;

    let (Some(guild_id), Some(user_id), Some(message)) = (
        interaction.guild_id,
        interaction_user_id(interaction),
        interaction.message.as_ref(),
    ) else {
        respond_ephemeral_message(http, interaction, "This button only works in servers.").await?;
        return Ok(true);
    };

    let bound = {
        let responses = ctx.responses.lock().await;
        responses
            .get(message.id)
            .and_then(|entry| Some((entry.action_for(tag)?.clone(), entry.text.clone())))
    };

    let Some((spec, text)) = bound else {
        respond_ephemeral_message(http, interaction, "This button has expired.").await?;
        return Ok(true);
    };

    let reply = match run_action(ctx, guild_id, user_id, &spec, &text).await {
        Ok(line) | Err(line) => line,
    };
    respond_ephemeral_message(http, interaction, &reply).await?;

    Ok(true)
}

fn reaction_emoji(emoji: &EmojiReactionType) -> ReactionEmoji {
    match emoji {
        EmojiReactionType::Unicode { name } => ReactionEmoji::Unicode(name.clone()),
        EmojiReactionType::Custom { animated, id, name } => ReactionEmoji::Custom {
            id: *id,
            name: name.clone().unwrap_or_default(),
            animated: *animated,
        },
    }
}

fn is_unicode(emoji: &ReactionEmoji, expected: &str) -> bool {
    emoji.matches(&ReactionEmoji::Unicode(expected.to_owned()))
}

/// Handle a reaction added to any message the registry knows about.
pub async fn handle_reaction(ctx: &Context, reaction: &GatewayReaction) -> anyhow::Result<()> {
    if reaction
        .member
        .as_ref()
        .is_some_and(|member| member.user.bot)
    {
        return Ok(());
    }

    let Some(entry) = ctx.responses.lock().await.get(reaction.message_id).cloned() else {
        return Ok(());
    };
    let emoji = reaction_emoji(&reaction.emoji);

    if let Some(origin) = &entry.origin {
        if is_unicode(&emoji, TRASH) {
            return trash_response(ctx, reaction, &entry, origin.creator_id).await;
        }
        if is_unicode(&emoji, INFO) {
            let info = format!(
                "This response comes from the autoresponder `{}`.\nTrigger: `{}`\nCreated by <@{}>",
                origin.name, origin.trigger, origin.creator_id
            );
            if let Err(source) = send_dm(&ctx.http, reaction.user_id, &info).await {
                debug!(?source, user = %reaction.user_id, "could not DM autoresponder info");
            }
            return Ok(());
        }
    }

    let Some(spec) = entry
        .tag_for_reaction(&emoji)
        .and_then(|tag| entry.action_for(tag))
    else {
        return Ok(());
    };

    // Reactions have no private reply channel, so only failures are reported, by DM.
    if let Err(line) = run_action(ctx, entry.guild_id, reaction.user_id, spec, &entry.text).await
        && let Err(source) = send_dm(&ctx.http, reaction.user_id, &line).await
    {
        debug!(?source, user = %reaction.user_id, "could not report action failure");
    }

    Ok(())
}

async fn trash_response(
    ctx: &Context,
    reaction: &GatewayReaction,
    entry: &ResponseEntry,
    creator_id: Id<UserMarker>,
) -> anyhow::Result<()> {
    let Some(member) = reaction.member.as_ref() else {
        return Ok(());
    };

    let permissions =
        resolve_member_permissions(&ctx.http, entry.guild_id, reaction.user_id, &member.roles)
            .await?;
    let granting_role =
        configured_role(ctx, entry.guild_id, GuildConfigKey::AutoresponderEditRole).await;
    let decision = authorize(
        &Subject {
            user_id: reaction.user_id,
            role_ids: &member.roles,
            permissions,
        },
        &CapabilityRequest::new(Capability::EditAutoresponder, granting_role)
            .on_resource(creator_id, &[]),
    );
    if !decision.is_allowed() {
        return Ok(());
    }

    ctx.http
        .delete_message(entry.channel_id, reaction.message_id)
        .await?;
    ctx.responses.lock().await.remove(reaction.message_id);

    Ok(())
}
