use tracing::error;
use twilight_model::{
    gateway::payload::incoming::MessageCreate,
    id::{Id, marker::GuildMarker},
};

use crate::CommandMeta;
use crate::access::{Resource, require};
use crate::autoresponder::snapshot::build_context;
use crate::custom::{NAME_MAX_CHARS, mention_list, parse_user_list, valid_name};
use crate::replies::{guild_only_message, not_found_message, reply, usage_message};
use berry_core::Context;
use berry_database::embeds::StoredEmbed;
use berry_database::guild_config::GuildConfigKey;
use berry_template::{DEFINITION_SIZE_LIMIT, EmbedDefinition, expand};
use berry_utils::embed::build_embed;
use berry_utils::parse::take_first_arg;
use berry_utils::permissions::Capability;

pub const META: CommandMeta = CommandMeta {
    name: "embed",
    desc: "Create and manage custom embeds used by {embed:name}.",
    category: "custom",
    usage: "embed <create|edit|delete|list|preview|editors> ...",
};

const CREATE_USAGE: &str = "embed create <name> <json>";
const EDIT_USAGE: &str = "embed edit <name> <json>";
const EDITORS_USAGE: &str = "embed editors <name> [users...]";

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
        Some("preview") => preview(&ctx, &msg, guild_id, prefix, rest).await,
        Some("editors") => editors(&ctx, &msg, guild_id, prefix, rest).await,
        _ => {
            let usage = usage_message(prefix, META.usage);
            http.create_message(msg.channel_id).content(&usage).await?;
            Ok(())
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Check a user-supplied definition and return it in stored form.
fn normalize_definition(raw: &str) -> Result<String, String> {
    let json = strip_code_fence(raw);
    if json.chars().count() > DEFINITION_SIZE_LIMIT {
        return Err(format!(
            "Embed definitions can be at most {DEFINITION_SIZE_LIMIT} characters."
        ));
    }

    let definition = EmbedDefinition::from_json(json)
        .map_err(|source| format!("That isn't a valid embed definition: {source}"))?;

    let has_content = [definition.title.as_deref(), definition.description.as_deref()]
        .into_iter()
        .flatten()
        .any(|text| !text.trim().is_empty())
        || !definition.fields.is_empty();
    if !has_content {
        return Err("An embed needs a title, a description or at least one field.".to_owned());
    }

    serde_json::to_string(&definition).map_err(|source| {
        error!(?source, "failed to serialize embed definition");
        "I couldn't store that embed.".to_owned()
    })
}

async fn load(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    name: &str,
) -> anyhow::Result<Option<StoredEmbed>> {
    let found = ctx.db.get_embed(guild_id, name).await?;
    if found.is_none() {
        reply(ctx, msg, &not_found_message("embed", name)).await?;
    }
    Ok(found)
}

/// Gate on embed editing, scoped to `resource` when given.
async fn allowed(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    resource: Option<Resource<'_>>,
) -> anyhow::Result<bool> {
    require(
        ctx,
        msg,
        guild_id,
        Capability::EditEmbed,
        GuildConfigKey::EmbedEditRole,
        resource,
    )
    .await
}

async fn create(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    prefix: &str,
    rest: &str,
) -> anyhow::Result<()> {
    let Some((name, json)) = take_first_arg(rest).filter(|(_, json)| !json.is_empty()) else {
        return reply(ctx, msg, &usage_message(prefix, CREATE_USAGE)).await;
    };
    if !valid_name(&name, false) {
        let out = format!("Embed names use letters and digits, up to {NAME_MAX_CHARS} characters.");
        return reply(ctx, msg, &out).await;
    }
    if !allowed(ctx, msg, guild_id, None).await? {
        return Ok(());
    }

    let definition = match normalize_definition(json) {
        Ok(definition) => definition,
        Err(out) => return reply(ctx, msg, &out).await,
    };

    let created = ctx
        .db
        .create_embed(guild_id, &name, &definition, msg.author.id)
        .await?;
    let out = if created {
        format!("Created embed `{name}`. Use it with `{{embed:{name}}}`.")
    } else {
        format!("An embed named `{name}` already exists.")
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
    let Some((name, json)) = take_first_arg(rest).filter(|(_, json)| !json.is_empty()) else {
        return reply(ctx, msg, &usage_message(prefix, EDIT_USAGE)).await;
    };
    let Some(stored) = load(ctx, msg, guild_id, &name).await? else {
        return Ok(());
    };
    let resource = Resource {
        owner: stored.creator_id,
        editors: &stored.editors,
    };
    if !allowed(ctx, msg, guild_id, Some(resource)).await? {
        return Ok(());
    }

    let definition = match normalize_definition(json) {
        Ok(definition) => definition,
        Err(out) => return reply(ctx, msg, &out).await,
    };

    ctx.db
        .update_embed(guild_id, &stored.name, &definition)
        .await?;
    reply(ctx, msg, &format!("Updated embed `{}`.", stored.name)).await
}

async fn delete(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    prefix: &str,
    rest: &str,
) -> anyhow::Result<()> {
    let Some((name, _)) = take_first_arg(rest) else {
        return reply(ctx, msg, &usage_message(prefix, "embed delete <name>")).await;
    };
    let Some(stored) = load(ctx, msg, guild_id, &name).await? else {
        return Ok(());
    };
    let resource = Resource {
        owner: stored.creator_id,
        editors: &stored.editors,
    };
    if !allowed(ctx, msg, guild_id, Some(resource)).await? {
        return Ok(());
    }

    ctx.db.delete_embed(guild_id, &stored.name).await?;
    reply(ctx, msg, &format!("Deleted embed `{}`.", stored.name)).await
}

async fn list(ctx: &Context, msg: &MessageCreate, guild_id: Id<GuildMarker>) -> anyhow::Result<()> {
    let names = ctx.db.list_embeds(guild_id).await?;
    if names.is_empty() {
        return reply(ctx, msg, "This server has no custom embeds.").await;
    }

    let description = names
        .iter()
        .map(|name| format!("`{name}`"))
        .collect::<Vec<_>>()
        .join(", ");
    let embed = build_embed(&format!("Embeds ({})", names.len()), description)?;
    ctx.http
        .create_message(msg.channel_id)
        .embeds(&[embed])
        .await?;
    Ok(())
}

/// Render a stored embed with this message's placeholders filled in.
async fn preview(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    prefix: &str,
    rest: &str,
) -> anyhow::Result<()> {
    let Some((name, _)) = take_first_arg(rest) else {
        return reply(ctx, msg, &usage_message(prefix, "embed preview <name>")).await;
    };
    if !valid_name(&name, false) {
        return reply(ctx, msg, &not_found_message("embed", &name)).await;
    }

    let expansion_ctx = build_context(ctx, msg, guild_id, prefix).await?;
    let template = format!("{{embed:{name}}}");
    let embed = match expand(&template, &expansion_ctx, &ctx.db).await {
        Ok(result) => result.and_then(|result| result.embed),
        Err(source) => return reply(ctx, msg, &source.to_string()).await,
    };

    match embed {
        Some(embed) => {
            ctx.http
                .create_message(msg.channel_id)
                .embeds(&[embed])
                .await?;
            Ok(())
        }
        None => reply(ctx, msg, "That embed renders as nothing.").await,
    }
}

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
    let Some(stored) = load(ctx, msg, guild_id, &name).await? else {
        return Ok(());
    };
    let resource = Resource {
        owner: stored.creator_id,
        editors: &[],
    };
    if !allowed(ctx, msg, guild_id, Some(resource)).await? {
        return Ok(());
    }

    ctx.db
        .set_embed_editors(guild_id, &stored.name, &users)
        .await?;
    let out = format!("Editors of `{}`: {}", stored.name, mention_list(&users));
    reply(ctx, msg, &out).await
}
