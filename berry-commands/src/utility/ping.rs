use std::time::Instant;

use twilight_model::gateway::payload::incoming::MessageCreate;

use crate::CommandMeta;
use berry_core::Context;

pub const META: CommandMeta = CommandMeta {
    name: "ping",
    desc: "Check that the bot is responsive.",
    category: "utility",
    usage: "ping",
};

/// Reply, then edit the reply with the REST round trip time.
pub async fn run(ctx: Context, msg: Box<MessageCreate>) -> anyhow::Result<()> {
    let http = &ctx.http;
    let started = Instant::now();
    let sent = http
        .create_message(msg.channel_id)
        .content("Pong!")
        .await?
        .model()
        .await?;

    let content = format!("Pong! `{}ms`", started.elapsed().as_millis());
    http.update_message(msg.channel_id, sent.id)
        .content(Some(&content))
        .await?;

    Ok(())
}
