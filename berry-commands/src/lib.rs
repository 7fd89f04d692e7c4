pub mod access;
pub mod autoresponder;
pub mod custom;
pub mod moderation;
pub mod replies;
pub mod utility;

use tracing::{debug, error};
use twilight_model::{
    gateway::payload::incoming::{
        InteractionCreate, MessageCreate, MessageDelete, MessageDeleteBulk, ReactionAdd,
    },
    id::{Id, marker::GuildMarker},
};

use berry_core::Context;
use berry_database::guild_config::GuildConfigKey;

// Global command meta data
pub struct CommandMeta {
    pub name: &'static str,
    pub desc: &'static str,
    pub category: &'static str,
    /// Written without the prefix, which differs per guild.
    pub usage: &'static str,
}

pub const COMMANDS: &[CommandMeta] = &[
    utility::ping::META,
    utility::help::META,
    utility::config::META,
    custom::ar::META,
    custom::embed::META,
    moderation::ban::META,
    moderation::unban::META,
    moderation::kick::META,
    moderation::timeout::META,
    moderation::warn::META,
    moderation::note::META,
    moderation::info::META,
    moderation::infractions::META,
    // Add new commands here
];

/// The guild's prefix, or the configured default.
async fn prefix_for(ctx: &Context, guild_id: Option<Id<GuildMarker>>) -> String {
    let configured = match guild_id {
        Some(guild_id) => match ctx.db.get_guild_config(guild_id, GuildConfigKey::Prefix).await {
            Ok(prefix) => prefix,
            Err(source) => {
                error!(?source, guild = %guild_id, "failed to read guild prefix");
                None
            }
        },
        None => None,
    };

    configured.unwrap_or_else(|| ctx.config.default_prefix.clone())
}

/// Split `<cmd> [arg1] [arg_tail]` after the prefix has been removed.
fn split_command(content: &str) -> (String, Option<&str>, Option<&str>) {
    let mut command_and_rest = content.trim().splitn(2, char::is_whitespace);
    let cmd = command_and_rest.next().unwrap_or("").to_ascii_lowercase();
    let rest = command_and_rest
        .next()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let (arg1, arg_tail) = match rest {
        Some(value) => {
            let mut args = value.splitn(2, char::is_whitespace);
            let first = args.next().filter(|arg| !arg.is_empty());
            let tail = args
                .next()
                .map(str::trim)
                .filter(|remaining| !remaining.is_empty());
            (first, tail)
        }
        None => (None, None),
    };

    (cmd, arg1, arg_tail)
}

pub async fn handle_message(ctx: Context, msg: Box<MessageCreate>) -> anyhow::Result<()> {
    if msg.author.bot {
        return Ok(());
    }

    let prefix = prefix_for(&ctx, msg.guild_id).await;
    let content_owned = msg.content.clone();

    let Some(command_text) = content_owned.trim().strip_prefix(prefix.as_str()) else {
        if let Some(guild_id) = msg.guild_id {
            autoresponder::runtime::respond(&ctx, &msg, guild_id, &prefix).await?;
        }
        return Ok(());
    };

    let (cmd, arg1, arg_tail) = split_command(command_text);
    let prefix = prefix.as_str();

    match cmd.as_str() {
        "ping" => utility::ping::run(ctx.clone(), msg).await?,
        "help" => utility::help::run(ctx.clone(), msg, prefix, arg1).await?,
        "config" => utility::config::run(ctx.clone(), msg, prefix, arg1, arg_tail).await?,

        "ar" => custom::ar::run(ctx.clone(), msg, prefix, arg1, arg_tail).await?,
        "embed" => custom::embed::run(ctx.clone(), msg, prefix, arg1, arg_tail).await?,

        "ban" => moderation::ban::run(ctx.clone(), msg, prefix, arg1, arg_tail).await?,
        "unban" => moderation::unban::run(ctx.clone(), msg, prefix, arg1, arg_tail).await?,
        "kick" => moderation::kick::run(ctx.clone(), msg, prefix, arg1, arg_tail).await?,
        "timeout" => moderation::timeout::run(ctx.clone(), msg, prefix, arg1, arg_tail).await?,
        "warn" => moderation::warn::run(ctx.clone(), msg, prefix, arg1, arg_tail).await?,
        "note" => moderation::note::run(ctx.clone(), msg, prefix, arg1, arg_tail).await?,
        "info" => moderation::info::run(ctx.clone(), msg, prefix, arg1).await?,
        "infractions" => moderation::infractions::run(ctx.clone(), msg, prefix, arg1).await?,
        // Add new commands here
        _ => {
            // Unknown commands may still be autoresponder triggers.
            if let Some(guild_id) = msg.guild_id {
                autoresponder::runtime::respond(&ctx, &msg, guild_id, prefix).await?;
            }
        }
    }

    Ok(())
}

pub async fn handle_interaction(
    ctx: Context,
    interaction: Box<InteractionCreate>,
) -> anyhow::Result<()> {
    if !autoresponder::actions::handle_component(&ctx, &interaction.0).await? {
        debug!(interaction = %interaction.0.id, "interaction not handled");
    }
    Ok(())
}

pub async fn handle_reaction_add(ctx: Context, reaction: Box<ReactionAdd>) -> anyhow::Result<()> {
    autoresponder::actions::handle_reaction(&ctx, &reaction.0).await
}

/// Forget responses that no longer exist.
pub async fn handle_message_delete(ctx: Context, event: MessageDelete) -> anyhow::Result<()> {
    ctx.responses.lock().await.remove(event.id);
    Ok(())
}

pub async fn handle_message_delete_bulk(
    ctx: Context,
    event: MessageDeleteBulk,
) -> anyhow::Result<()> {
    let mut responses = ctx.responses.lock().await;
    for id in event.ids {
        responses.remove(id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_text_splits_into_name_and_args() {
        assert_eq!(
            split_command("BAN <@1> being rude"),
            ("ban".to_owned(), Some("<@1>"), Some("being rude"))
        );
        assert_eq!(split_command("ping"), ("ping".to_owned(), None, None));
        assert_eq!(
            split_command(" ar   create  x "),
            ("ar".to_owned(), Some("create"), Some("x"))
        );
    }

    #[test]
    fn usages_omit_the_prefix() {
        for command in COMMANDS {
            assert!(command.usage.starts_with(command.name), "{}", command.name);
        }
    }
}
