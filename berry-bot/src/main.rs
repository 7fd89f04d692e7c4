use std::future::Future;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use twilight_gateway::{EventTypeFlags, Intents, Shard, ShardId, StreamExt as _};
use twilight_http::Client;
use twilight_model::gateway::event::Event;

use rustls::crypto::ring::default_provider;
use sqlx::postgres::PgPoolOptions;

use berry_commands::{
    handle_interaction, handle_message, handle_message_delete, handle_message_delete_bulk,
    handle_reaction_add,
};
use berry_core::{Config, Context};
use berry_database::{Database, MIGRATOR};

/// Run a handler off the event loop so slow requests and delayed deletes
/// never hold up other events.
fn spawn_handler(
    kind: &'static str,
    handler: impl Future<Output = anyhow::Result<()>> + Send + 'static,
) {
    tokio::spawn(async move {
        if let Err(source) = handler.await {
            error!(?source, kind, "event handler failed");
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load the .env file before anything reads the environment
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    let config = Config::from_env()?;

    // Create a single shared HTTP Client
    let http = Arc::new(Client::new(config.discord_token.clone()));
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    info!("PostgreSQL connection established.");

    MIGRATOR.run(&db_pool).await?;
    info!("Database migrations applied.");

    let token = config.discord_token.clone();
    let ctx = Context::new(Arc::clone(&http), Database::new(db_pool), config);

    // Declare which intents the bot has
    let intents = Intents::GUILDS
        | Intents::GUILD_MESSAGES
        | Intents::MESSAGE_CONTENT
        | Intents::GUILD_MESSAGE_REACTIONS
        | Intents::GUILD_MEMBERS;

    // A shard is one Gateway WebSocket connection to Discord
    let mut shard = Shard::new(ShardId::new(0, 1), token, intents);

    info!("Berry is connecting...");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        let event = match item {
            Ok(event) => event,
            Err(source) => {
                error!(?source, "gateway event stream error");
                continue;
            }
        };

        match event {
            Event::Ready(ready) => {
                info!(user = %ready.user.name, guilds = ready.guilds.len(), "Berry is ready");
            }

            Event::MessageCreate(msg) => {
                spawn_handler("message_create", handle_message(ctx.clone(), msg));
            }
            Event::MessageDelete(event) => {
                spawn_handler("message_delete", handle_message_delete(ctx.clone(), event));
            }
            Event::MessageDeleteBulk(event) => {
                spawn_handler(
                    "message_delete_bulk",
                    handle_message_delete_bulk(ctx.clone(), event),
                );
            }
            Event::ReactionAdd(reaction) => {
                spawn_handler("reaction_add", handle_reaction_add(ctx.clone(), reaction));
            }
            Event::InteractionCreate(interaction) => {
                spawn_handler("interaction_create", handle_interaction(ctx.clone(), interaction));
            }
            _ => {} // Ignore unused events
        }
    }

    Ok(()) // Return Success, shutdown cleanly
}
