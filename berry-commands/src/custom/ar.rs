use tracing::error;
use twilight_model::{
    gateway::payload::incoming::MessageCreate,
    id::{Id, marker::GuildMarker},
};

use crate::CommandMeta;
use crate::access::{Resource, require};
use crate::custom::{NAME_MAX_CHARS, clip, mention_list, parse_user_list, valid_name};
use crate::replies::{guild_only_message, not_found_message, reply, sanitize, usage_message};
use berry_core::Context;
use berry_database::autoresponders::{Autoresponder, NewAutoresponder};
use berry_database::guild_config::GuildConfigKey;
use berry_template::extract::parse;
use berry_utils::embed::{DEFAULT_EMBED_COLOR, Field, build_embed, build_embed_with};
use berry_utils::parse::take_first_arg;
use berry_utils::permissions::Capability;

pub const META: CommandMeta = CommandMeta {
    name: "ar",
    desc: "Create and manage autoresponders.",
    category: "custom",
    usage: "ar <create|edit|delete|list|info|editors> ...",
};

const CREATE_USAGE: &str = "ar create <name> \"<trigger>\" <response>";
const EDIT_USAGE: &str = "ar edit <name> <response>";
const EDITORS_USAGE: &str = "ar editors <name> [users...]";

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

    let subcommand = arg1.map(str::to_ascii_lowercase);
    let rest = arg_tail.unwrap_or("");

    match subcommand.as_deref() {
        Some("create") => create(&ctx, &msg, guild_id, prefix, rest).await,
        Some("edit") => edit(&ctx, &msg, guild_id, prefix, rest).await,
        Some("delete") => delete(&ctx, &msg, guild_id, prefix, rest).await,
        Some("list") => list(&ctx, &msg, guild_id).await,
        Some("info") => info(&ctx, &msg, guild_id, prefix, rest).await,
        Some("editors") => editors(&ctx, &msg, guild_id, prefix, rest).await,
        _ => {
            let usage = usage_message(prefix, META.usage);
            http.create_message(msg.channel_id).content(&usage).await?;
            Ok(())
        }
    }
}

/// Template problems are reported the same way they would be at trigger time.
fn template_error(response: &str) -> Option<String> {
    parse(response)
        .err()
        .map(|source| format!("That response has an error: {source}"))
}

async fn load(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    name: &str,
) -> anyhow::Result<Option<Autoresponder>> {
    let found = ctx.db.get_autoresponder(guild_id, name).await?;
    if found.is_none() {
        reply(ctx, msg, &not_found_message("autoresponder", name)).await?;
    }
    Ok(found)
}

async fn create(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    prefix: &str,
    rest: &str,
) -> anyhow::Result<()> {
    let parsed = take_first_arg(rest).and_then(|(name, rest)| {
        let (trigger, response) = take_first_arg(rest)?;
        Some((name, trigger, response.trim()))
    });
    let Some((name, trigger, response)) = parsed.filter(|(_, trigger, response)| {
        !trigger.trim().is_empty() && !response.is_empty()
    }) else {
        return reply(ctx, msg, &usage_message(prefix, CREATE_USAGE)).await;
    };

    if !valid_name(&name, true) {
        let out = format!(
            "Autoresponder names use letters, digits, `-` and `_`, up to {NAME_MAX_CHARS} characters."
        );
        return reply(ctx, msg, &out).await;
    }

    if !require(
        ctx,
        msg,
        guild_id,
        Capability::EditAutoresponder,
        GuildConfigKey::AutoresponderEditRole,
        None,
    )
    .await?
    {
        return Ok(());
    }

    if let Some(out) = template_error(response) {
        return reply(ctx, msg, &out).await;
    }

    let created = ctx
        .db
        .create_autoresponder(&NewAutoresponder {
            guild_id,
            name: &name,
            trigger: trigger.trim(),
            response,
            creator_id: msg.author.id,
        })
        .await?;

    let out = if created {
        format!("Created autoresponder `{name}`.")
    } else {
        format!("An autoresponder named `{name}` already exists.")
    };
    reply(ctx, msg, &out).await
}

async fn edit(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    prefix: &str,
    rest: &str,
) -> anyhow::Result<()> {
    let Some((name, response)) = take_first_arg(rest).filter(|(_, response)| !response.is_empty())
    else {
        return reply(ctx, msg, &usage_message(prefix, EDIT_USAGE)).await;
    };

    let Some(autoresponder) = load(ctx, msg, guild_id, &name).await? else {
        return Ok(());
    };
    let resource = Resource {
        owner: autoresponder.creator_id,
        editors: &autoresponder.editors,
    };
    if !require(
        ctx,
        msg,
        guild_id,
        Capability::EditAutoresponder,
        GuildConfigKey::AutoresponderEditRole,
        Some(resource),
    )
    .await?
    {
        return Ok(());
    }

    if let Some(out) = template_error(response) {
        return reply(ctx, msg, &out).await;
    }

    ctx.db
        .update_autoresponder_response(guild_id, &autoresponder.name, response)
        .await?;
    reply(ctx, msg, &format!("Updated autoresponder `{}`.", autoresponder.name)).await
}

async fn delete(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    prefix: &str,
    rest: &str,
) -> anyhow::Result<()> {
    let Some((name, _)) = take_first_arg(rest) else {
        return reply(ctx, msg, &usage_message(prefix, "ar delete <name>")).await;
    };

    let Some(autoresponder) = load(ctx, msg, guild_id, &name).await? else {
        return Ok(());
    };
    let resource = Resource {
        owner: autoresponder.creator_id,
        editors: &autoresponder.editors,
    };
    if !require(
        ctx,
        msg,
        guild_id,
        Capability::EditAutoresponder,
        GuildConfigKey::AutoresponderEditRole,
        Some(resource),
    )
    .await?
    {
        return Ok(());
    }

    ctx.db
        .delete_autoresponder(guild_id, &autoresponder.name)
        .await?;
    reply(ctx, msg, &format!("Deleted autoresponder `{}`.", autoresponder.name)).await
}

async fn list(ctx: &Context, msg: &MessageCreate, guild_id: Id<GuildMarker>) -> anyhow::Result<()> {
    let autoresponders = ctx.db.list_autoresponders(guild_id).await?;
    if autoresponders.is_empty() {
        return reply(ctx, msg, "This server has no autoresponders.").await;
    }

    let description = autoresponders
        .iter()
        .map(|autoresponder| {
            format!(
                "`{}` → {}",
                autoresponder.name,
                sanitize(&clip(&autoresponder.trigger, 60))
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let embed = build_embed(
        &format!("Autoresponders ({})", autoresponders.len()),
        clip(&description, 4000),
    )?;
    ctx.http
        .create_message(msg.channel_id)
        .embeds(&[embed])
        .await?;
    Ok(())
}

/// Directive counts in extraction order, e.g. `react ×2, dm ×1`.
fn directive_summary(template: &str) -> String {
    let directives = match parse(template) {
        Ok(extracted) => extracted.directives(),
        Err(source) => return format!("Invalid: {source}"),
    };

    let mut counts: Vec<(&str, usize)> = Vec::new();
    for directive in &directives {
        match counts.iter_mut().find(|(keyword, _)| *keyword == directive.keyword()) {
            Some((_, count)) => *count += 1,
            None => counts.push((directive.keyword(), 1)),
        }
    }

    if counts.is_empty() {
        return "none".to_owned();
    }
    counts
        .iter()
        .map(|(keyword, count)| format!("`{keyword}` ×{count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn info(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    prefix: &str,
    rest: &str,
) -> anyhow::Result<()> {
    let Some((name, _)) = take_first_arg(rest) else {
        return reply(ctx, msg, &usage_message(prefix, "ar info <name>")).await;
    };
    let Some(autoresponder) = load(ctx, msg, guild_id, &name).await? else {
        return Ok(());
    };

    let fields = [
        Field::new("Trigger", sanitize(&clip(&autoresponder.trigger, 1000))),
        Field::inline("Creator", format!("<@{}>", autoresponder.creator_id)),
        Field::inline("Editors", mention_list(&autoresponder.editors)),
        Field::inline("Created", format!("<t:{}:R>", autoresponder.created_at)),
        Field::new("Directives", directive_summary(&autoresponder.response)),
        Field::new(
            "Response",
            format!("```\n{}\n```", clip(&autoresponder.response.replace("```", "'''"), 1000)),
        ),
    ];
    let embed = build_embed_with(
        &format!("Autoresponder `{}`", autoresponder.name),
        "",
        DEFAULT_EMBED_COLOR,
        &fields,
        None,
    )?;
    ctx.http
        .create_message(msg.channel_id)
        .embeds(&[embed])
        .await?;
    Ok(())
}

/// Replace the editor list. Editors themselves can't change it.
async fn editors(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    prefix: &str,
    rest: &str,
) -> anyhow::Result<()> {
    let Some((name, users)) = take_first_arg(rest) else {
        return reply(ctx, msg, &usage_message(prefix, EDITORS_USAGE)).await;
    };
    let Some(users) = parse_user_list(users) else {
        return reply(ctx, msg, &usage_message(prefix, EDITORS_USAGE)).await;
    };

    let Some(autoresponder) = load(ctx, msg, guild_id, &name).await? else {
        return Ok(());
    };
    let resource = Resource {
        owner: autoresponder.creator_id,
        editors: &[],
    };
    if !require(
        ctx,
        msg,
        guild_id,
        Capability::EditAutoresponder,
        GuildConfigKey::AutoresponderEditRole,
        Some(resource),
    )
    .await?
    {
        return Ok(());
    }

    if let Err(source) = ctx
        .db
        .set_autoresponder_editors(guild_id, &autoresponder.name, &users)
        .await
    {
        error!(?source, "failed to store autoresponder editors");
        return reply(ctx, msg, "I couldn't save the editor list.").await;
    }

    let out = format!(
        "Editors of `{}`: {}",
        autoresponder.name,
        mention_list(&users)
    );
    reply(ctx, msg, &out).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_templates_are_rejected_at_save_time() {
        assert!(template_error("Hello {user}!").is_none());
        assert!(template_error("{interaction:button:Go:go}").is_some());
        assert!(template_error("{if:planet:x}").is_some());
        assert!(template_error("{role:Admin}").is_some());
    }

    #[test]
    fn summary_counts_directives_by_keyword() {
        assert_eq!(
            directive_summary("{react:🔥}{react:✅} {interaction:button:Go:go}{action:dm:go}"),
            "`react` ×2, `interaction` ×1, `action` ×1"
        );
        assert_eq!(directive_summary("plain"), "none");
        assert!(directive_summary("{if:planet:x}").starts_with("Invalid:"));
    }
}
