use twilight_model::gateway::payload::incoming::MessageCreate;

use crate::replies::reply;
use crate::{COMMANDS, CommandMeta};
use berry_core::Context;
use berry_utils::embed::{DEFAULT_EMBED_COLOR, Field, build_embed_with};

pub const META: CommandMeta = CommandMeta {
    name: "help",
    desc: "List commands, or show how to use one.",
    category: "utility",
    usage: "help [command|category]",
};

fn categories() -> Vec<&'static str> {
    let mut categories: Vec<&str> = COMMANDS.iter().map(|command| command.category).collect();
    categories.sort_unstable();
    categories.dedup();
    categories
}

/// One line per command, grouped under category headings.
fn catalog(commands: &[&CommandMeta], prefix: &str) -> Vec<(String, String)> {
    categories()
        .into_iter()
        .filter_map(|category| {
            let lines: Vec<String> = commands
                .iter()
                .filter(|command| command.category == category)
                .map(|command| format!("`{prefix}{}` {}", command.name, command.desc))
                .collect();
            (!lines.is_empty()).then(|| (category.to_owned(), lines.join("\n")))
        })
        .collect()
}

pub async fn run(
    ctx: Context,
    msg: Box<MessageCreate>,
    prefix: &str,
    arg1: Option<&str>,
) -> anyhow::Result<()> {
    let lookup = arg1.map(|raw| raw.trim().trim_start_matches(prefix).to_ascii_lowercase());

    if let Some(name) = lookup.as_deref()
        && let Some(command) = COMMANDS.iter().find(|command| command.name == name)
    {
        let fields = [
            Field::new("Usage", format!("`{prefix}{}`", command.usage)),
            Field::inline("Category", command.category),
        ];
        let embed =
            build_embed_with(command.name, command.desc, DEFAULT_EMBED_COLOR, &fields, None)?;
        ctx.http
            .create_message(msg.channel_id)
            .embeds(&[embed])
            .await?;
        return Ok(());
    }

    let commands: Vec<&CommandMeta> = match lookup.as_deref() {
        Some(category) if categories().contains(&category) => COMMANDS
            .iter()
            .filter(|command| command.category == category)
            .collect(),
        Some(unknown) => {
            let out = format!(
                "No command or category named `{unknown}`. Categories: {}",
                categories().join(", ")
            );
            return reply(&ctx, &msg, &out).await;
        }
        None => COMMANDS.iter().collect(),
    };

    let sections = catalog(&commands, prefix);
    let fields: Vec<Field<'_>> = sections
        .iter()
        .map(|(category, lines)| Field::new(category, lines.as_str()))
        .collect();
    let footer = format!("{prefix}help <command> shows its usage");
    let embed = build_embed_with("Commands", "", DEFAULT_EMBED_COLOR, &fields, Some(&footer))?;
    ctx.http
        .create_message(msg.channel_id)
        .embeds(&[embed])
        .await?;

    Ok(())
}
