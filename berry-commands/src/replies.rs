//! Short reply strings shared across commands.

use twilight_model::{
    channel::message::{AllowedMentions, MentionType},
    gateway::payload::incoming::MessageCreate,
};

use berry_core::Context;

/// Mentions allowed in text built from member input: users may be pinged,
/// `@everyone`, `@here` and roles may not.
pub fn user_mentions_only() -> AllowedMentions {
    AllowedMentions {
        parse: vec![MentionType::Users],
        replied_user: false,
        roles: Vec::new(),
        users: Vec::new(),
    }
}

/// Post `content` in the channel `msg` came from.
pub async fn reply(ctx: &Context, msg: &MessageCreate, content: &str) -> anyhow::Result<()> {
    ctx.http
        .create_message(msg.channel_id)
        .content(content)
        .allowed_mentions(Some(&user_mentions_only()))
        .await?;
    Ok(())
}

pub fn usage_message(prefix: &str, usage: &str) -> String {
    format!("Usage: `{prefix}{usage}`")
}

pub fn guild_only_message() -> &'static str {
    "This command only works in servers."
}

pub fn self_action_message(action: &str) -> String {
    format!("You can't {action} yourself.")
}

pub fn not_found_message(kind: &str, name: &str) -> String {
    format!("No {kind} named `{}` exists.", sanitize(name))
}

/// Break mentions so echoed user text can't ping anyone.
pub fn sanitize(text: &str) -> String {
    text.replace('@', "@\u{200B}")
}
