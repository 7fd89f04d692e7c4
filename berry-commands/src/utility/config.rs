use twilight_model::{
    gateway::payload::incoming::MessageCreate,
    id::{Id, marker::GuildMarker},
};

use crate::CommandMeta;
use crate::access::require;
use crate::replies::{guild_only_message, reply, usage_message};
use berry_core::Context;
use berry_database::guild_config::GuildConfigKey;
use berry_database::user_config::{MessageStyle, UserConfigKey};
use berry_utils::embed::{DEFAULT_EMBED_COLOR, Field, build_embed_with};
use berry_utils::parse::{parse_channel_id, parse_role_id};
use berry_utils::permissions::Capability;

pub const META: CommandMeta = CommandMeta {
    name: "config",
    desc: "View or change this server's settings.",
    category: "utility",
    usage: "config [user] [set <key> <value> | clear <key>]",
};

const PREFIX_MAX_CHARS: usize = 5;
const USER_VALUE_MAX_CHARS: usize = 100;
pub const SUPPORTED_LANGUAGES: &[&str] = &["en"];

fn key_list() -> String {
    GuildConfigKey::ALL
        .iter()
        .map(|key| format!("`{key}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate `raw` for `key`, returning the value to store.
///
/// Channels and roles are stored as bare ids.
fn normalize_value(key: GuildConfigKey, raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    match key {
        GuildConfigKey::Prefix => {
            if raw.is_empty()
                || raw.chars().count() > PREFIX_MAX_CHARS
                || raw.chars().any(char::is_whitespace)
            {
                Err(format!("A prefix is 1 to {PREFIX_MAX_CHARS} characters with no spaces."))
            } else {
                Ok(raw.to_owned())
            }
        }
        GuildConfigKey::ModLogChannel => parse_channel_id(raw)
            .map(|id| id.to_string())
            .ok_or_else(|| "Give a channel mention or id.".to_owned()),
        GuildConfigKey::StaffRole
        | GuildConfigKey::AutoresponderEditRole
        | GuildConfigKey::EmbedEditRole
        | GuildConfigKey::ServerConfigRole => parse_role_id(raw)
            .map(|id| id.to_string())
            .ok_or_else(|| "Give a role mention or id.".to_owned()),
    }
}

fn user_key_list() -> String {
    UserConfigKey::ALL
        .iter()
        .map(|key| format!("`{key}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate a personal preference, returning the value to store.
fn normalize_user_value(key: UserConfigKey, raw: &str) -> Result<String, String> {
    let value = raw.trim().to_lowercase();
    if value.is_empty() || value.chars().count() > USER_VALUE_MAX_CHARS {
        return Err(format!("A value is 1 to {USER_VALUE_MAX_CHARS} characters."));
    }

    match key {
        UserConfigKey::Language if !SUPPORTED_LANGUAGES.contains(&value.as_str()) => Err(format!(
            "Supported languages: {}",
            SUPPORTED_LANGUAGES.join(", ")
        )),
        UserConfigKey::MessageType => value
            .parse::<MessageStyle>()
            .map(|style| style.as_str().to_owned())
            .map_err(|()| "Message type must be `embed` or `text`.".to_owned()),
        UserConfigKey::Language => Ok(value),
    }
}

/// Render a stored value the way it was meant to be read.
fn display_value(key: GuildConfigKey, value: &str) -> String {
    match key {
        GuildConfigKey::Prefix => format!("`{value}`"),
        GuildConfigKey::ModLogChannel => format!("<#{value}>"),
        _ => format!("<@&{value}>"),
    }
}

pub async fn run(
    ctx: Context,
    msg: Box<MessageCreate>,
    prefix: &str,
    arg1: Option<&str>,
    arg_tail: Option<&str>,
) -> anyhow::Result<()> {
    if arg1.is_some_and(|arg| arg.eq_ignore_ascii_case("user")) {
        return user(&ctx, &msg, prefix, arg_tail).await;
    }

    let Some(guild_id) = msg.guild_id else {
        return reply(&ctx, &msg, guild_only_message()).await;
    };

    if !require(
        &ctx,
        &msg,
        guild_id,
        Capability::ConfigureServer,
        GuildConfigKey::ServerConfigRole,
        None,
    )
    .await?
    {
        return Ok(());
    }

    match arg1.map(str::to_ascii_lowercase).as_deref() {
        None => view(&ctx, &msg, guild_id, prefix).await,
        Some("set") => set(&ctx, &msg, guild_id, prefix, arg_tail).await,
        Some("clear") => clear(&ctx, &msg, guild_id, prefix, arg_tail).await,
        Some(_) => reply(&ctx, &msg, &usage_message(prefix, META.usage)).await,
    }
}

/// `config user ...`: personal preferences, open to everyone and usable in DMs.
async fn user(
    ctx: &Context,
    msg: &MessageCreate,
    prefix: &str,
    rest: Option<&str>,
) -> anyhow::Result<()> {
    let (action, tail) = match rest.map(str::trim) {
        Some(rest) => match rest.split_once(char::is_whitespace) {
            Some((action, tail)) => (Some(action), Some(tail.trim())),
            None => (Some(rest), None),
        },
        None => (None, None),
    };
    let user_id = msg.author.id;

    match action.map(str::to_ascii_lowercase).as_deref() {
        None => {
            let entries = ctx.db.user_config_entries(user_id).await?;
            let fields: Vec<Field<'_>> = UserConfigKey::ALL
                .iter()
                .map(|key| {
                    let value = entries
                        .iter()
                        .find(|(entry_key, _)| entry_key == key)
                        .map_or_else(|| "not set".to_owned(), |(_, value)| format!("`{value}`"));
                    Field::inline(key.column(), value)
                })
                .collect();

            let footer = format!("{prefix}config user set <key> <value>");
            let embed = build_embed_with(
                "Your settings",
                "",
                DEFAULT_EMBED_COLOR,
                &fields,
                Some(&footer),
            )?;
            ctx.http
                .create_message(msg.channel_id)
                .embeds(&[embed])
                .await?;
            Ok(())
        }
        Some("set") => {
            let parts = tail.and_then(|tail| tail.split_once(char::is_whitespace));
            let Some((raw_key, raw_value)) = parts else {
                return reply(ctx, msg, &usage_message(prefix, "config user set <key> <value>"))
                    .await;
            };
            let Ok(key) = raw_key.parse::<UserConfigKey>() else {
                let out = format!("Unknown setting `{raw_key}`. Settings: {}", user_key_list());
                return reply(ctx, msg, &out).await;
            };
            let value = match normalize_user_value(key, raw_value) {
                Ok(value) => value,
                Err(out) => return reply(ctx, msg, &out).await,
            };

            ctx.db.set_user_config(user_id, key, &value).await?;
            reply(ctx, msg, &format!("Your `{key}` is now `{value}`.")).await
        }
        Some("clear") => {
            let Some(raw_key) = tail else {
                return reply(ctx, msg, &usage_message(prefix, "config user clear <key>")).await;
            };
            let Ok(key) = raw_key.parse::<UserConfigKey>() else {
                let out = format!("Unknown setting `{raw_key}`. Settings: {}", user_key_list());
                return reply(ctx, msg, &out).await;
            };

            ctx.db.clear_user_config(user_id, key).await?;
            reply(ctx, msg, &format!("Cleared your `{key}`.")).await
        }
        Some(_) => {
            let usage = usage_message(prefix, "config user [set <key> <value> | clear <key>]");
            reply(ctx, msg, &usage).await
        }
    }
}

async fn view(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    prefix: &str,
) -> anyhow::Result<()> {
    let entries = ctx.db.guild_config_entries(guild_id).await?;

    let fields: Vec<Field<'_>> = GuildConfigKey::ALL
        .iter()
        .map(|key| {
            let value = entries
                .iter()
                .find(|(entry_key, _)| entry_key == key)
                .map(|(_, value)| display_value(*key, value));
            let value = match (key, value) {
                (_, Some(value)) => value,
                (GuildConfigKey::Prefix, None) => {
                    format!("`{}` (default)", ctx.config.default_prefix)
                }
                (_, None) => "not set".to_owned(),
            };
            Field::inline(key.column(), value)
        })
        .collect();

    let footer = format!("{prefix}config set <key> <value>");
    let embed = build_embed_with(
        "Server settings",
        "",
        DEFAULT_EMBED_COLOR,
        &fields,
        Some(&footer),
    )?;
    ctx.http
        .create_message(msg.channel_id)
        .embeds(&[embed])
        .await?;
    Ok(())
}

async fn set(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    prefix: &str,
    arg_tail: Option<&str>,
) -> anyhow::Result<()> {
    let parts = arg_tail.and_then(|tail| tail.split_once(char::is_whitespace));
    let Some((raw_key, raw_value)) = parts else {
        return reply(ctx, msg, &usage_message(prefix, "config set <key> <value>")).await;
    };
    let Ok(key) = raw_key.parse::<GuildConfigKey>() else {
        let out = format!("Unknown setting `{raw_key}`. Settings: {}", key_list());
        return reply(ctx, msg, &out).await;
    };

    let value = match normalize_value(key, raw_value) {
        Ok(value) => value,
        Err(out) => return reply(ctx, msg, &out).await,
    };

    ctx.db.set_guild_config(guild_id, key, &value).await?;
    let out = format!("Set `{key}` to {}.", display_value(key, &value));
    reply(ctx, msg, &out).await
}

async fn clear(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    prefix: &str,
    arg_tail: Option<&str>,
) -> anyhow::Result<()> {
    let Some(raw_key) = arg_tail.map(str::trim) else {
        return reply(ctx, msg, &usage_message(prefix, "config clear <key>")).await;
    };
    let Ok(key) = raw_key.parse::<GuildConfigKey>() else {
        let out = format!("Unknown setting `{raw_key}`. Settings: {}", key_list());
        return reply(ctx, msg, &out).await;
    };

    ctx.db.clear_guild_config(guild_id, key).await?;
    reply(ctx, msg, &format!("Cleared `{key}`.")).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_short_and_unspaced() {
        assert_eq!(normalize_value(GuildConfigKey::Prefix, " ! "), Ok("!".to_owned()));
        assert!(normalize_value(GuildConfigKey::Prefix, "toolong").is_err());
        assert!(normalize_value(GuildConfigKey::Prefix, "a b").is_err());
        assert!(normalize_value(GuildConfigKey::Prefix, "").is_err());
    }

    #[test]
    fn channels_and_roles_store_ids() {
        assert_eq!(
            normalize_value(GuildConfigKey::ModLogChannel, "<#42>"),
            Ok("42".to_owned())
        );
        assert!(normalize_value(GuildConfigKey::ModLogChannel, "<@&42>").is_err());
        assert_eq!(
            normalize_value(GuildConfigKey::StaffRole, "<@&7>"),
            Ok("7".to_owned())
        );
        assert_eq!(
            normalize_value(GuildConfigKey::EmbedEditRole, "7"),
            Ok("7".to_owned())
        );
    }

    #[test]
    fn user_preferences_are_validated() {
        assert_eq!(
            normalize_user_value(UserConfigKey::MessageType, " Text "),
            Ok("text".to_owned())
        );
        assert!(normalize_user_value(UserConfigKey::MessageType, "html").is_err());
        assert_eq!(
            normalize_user_value(UserConfigKey::Language, "EN"),
            Ok("en".to_owned())
        );
        assert!(normalize_user_value(UserConfigKey::Language, "xx").is_err());
        assert!(normalize_user_value(UserConfigKey::Language, &"e".repeat(101)).is_err());
    }

    #[test]
    fn values_render_as_mentions() {
        assert_eq!(display_value(GuildConfigKey::ModLogChannel, "42"), "<#42>");
        assert_eq!(display_value(GuildConfigKey::StaffRole, "7"), "<@&7>");
        assert_eq!(display_value(GuildConfigKey::Prefix, "!"), "`!`");
    }
}
