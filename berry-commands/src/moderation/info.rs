use twilight_model::{
    gateway::payload::incoming::MessageCreate,
    guild::Permissions,
    id::{Id, marker::UserMarker},
};

use crate::CommandMeta;
use crate::custom::clip;
use crate::moderation::authorized;
use crate::replies::{guild_only_message, reply, sanitize, usage_message};
use berry_core::Context;
use berry_database::infractions::{Infraction, InfractionKind};
use berry_database::user_config::MessageStyle;
use berry_utils::embed::{DEFAULT_EMBED_COLOR, Field, build_embed_with};
use berry_utils::parse::parse_target_user_id;
use berry_utils::time::snowflake_unix_secs;

pub const META: CommandMeta = CommandMeta {
    name: "info",
    desc: "Show when a member joined, plus their infractions and notes.",
    category: "moderation",
    usage: "info [user]",
};

const LISTED_ENTRIES: usize = 5;

fn entry_line(infraction: &Infraction) -> String {
    format!(
        "**#{}** {} <t:{}:d> by <@{}>: {}",
        infraction.id,
        infraction.kind,
        infraction.created_at,
        infraction.issued_by,
        sanitize(&clip(&infraction.reason, 120))
    )
}

fn entry_list<'a>(entries: impl Iterator<Item = &'a Infraction>, empty: &str) -> String {
    let entries: Vec<&Infraction> = entries.collect();
    if entries.is_empty() {
        return empty.to_owned();
    }

    let mut lines: Vec<String> = entries
        .iter()
        .take(LISTED_ENTRIES)
        .map(|infraction| entry_line(infraction))
        .collect();
    if entries.len() > LISTED_ENTRIES {
        lines.push(format!("…and {} more", entries.len() - LISTED_ENTRIES));
    }
    lines.join("\n")
}

/// Labelled sections shown by `info`, in display order.
fn info_sections(
    user_id: Id<UserMarker>,
    joined_at: Option<i64>,
    history: &[Infraction],
) -> Vec<(&'static str, String)> {
    let joined = joined_at.map_or_else(
        || "Not in this server".to_owned(),
        |secs| format!("<t:{secs}:F>"),
    );
    let created = snowflake_unix_secs(user_id.get());

    vec![
        ("ID", user_id.to_string()),
        ("Joined", joined),
        ("Created", format!("<t:{created}:F>")),
        (
            "Infractions",
            entry_list(
                history
                    .iter()
                    .filter(|infraction| infraction.kind != InfractionKind::Note),
                "No infractions found.",
            ),
        ),
        (
            "Notes",
            entry_list(
                history
                    .iter()
                    .filter(|infraction| infraction.kind == InfractionKind::Note),
                "No notes found.",
            ),
        ),
    ]
}

fn as_text(title: &str, sections: &[(&'static str, String)]) -> String {
    let mut out = format!("**{title}**");
    for (name, value) in sections {
        out.push_str(&format!("\n**{name}:** {value}"));
    }
    out
}

pub async fn run(
    ctx: Context,
    msg: Box<MessageCreate>,
    prefix: &str,
    arg1: Option<&str>,
) -> anyhow::Result<()> {
    let http = &ctx.http;
    let Some(guild_id) = msg.guild_id else {
        return reply(&ctx, &msg, guild_only_message()).await;
    };

    let target_user_id = match arg1 {
        None => msg.author.id,
        Some(raw) => match parse_target_user_id(raw) {
            Some(user_id) => user_id,
            None => return reply(&ctx, &msg, &usage_message(prefix, META.usage)).await,
        },
    };

    // Anyone may look themselves up; other members need moderation rights.
    if target_user_id != msg.author.id
        && !authorized(&ctx, &msg, guild_id, Permissions::MANAGE_MESSAGES).await?
    {
        return Ok(());
    }

    let member = match http.guild_member(guild_id, target_user_id).await {
        Ok(response) => response.model().await.ok(),
        Err(_) => None,
    };
    let joined_at = member
        .as_ref()
        .and_then(|member| member.joined_at)
        .map(|joined| joined.as_secs());
    let title = member.map_or_else(
        || format!("User {target_user_id}"),
        |member| format!("User info: {}", member.user.name),
    );

    let history = ctx.db.get_infractions(guild_id, target_user_id).await?;
    let sections = info_sections(target_user_id, joined_at, &history);

    match ctx.db.message_style(msg.author.id).await? {
        MessageStyle::Text => reply(&ctx, &msg, &clip(&as_text(&title, &sections), 2000)).await,
        MessageStyle::Embed => {
            let fields: Vec<Field<'_>> = sections
                .iter()
                .map(|(name, value)| Field::new(name, clip(value, 1024)))
                .collect();
            let embed = build_embed_with(&title, "", DEFAULT_EMBED_COLOR, &fields, None)?;
            http.create_message(msg.channel_id).embeds(&[embed]).await?;
            Ok(())
        }
    }
}
