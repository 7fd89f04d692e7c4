use std::sync::Arc;

use berry_database::Database;
use tokio::sync::Mutex;
use twilight_http::Client;

pub mod config;
pub mod registry;

pub use config::{Config, ConfigError};
pub use registry::{ResponseEntry, ResponseOrigin, ResponseRegistry};

/// Shared application context passed into command handlers.
///
/// Cheap to clone because it only stores reference-counted shared state.
#[derive(Clone)]
pub struct Context {
    pub http: Arc<Client>,
    pub db: Database,
    pub config: Arc<Config>,
    pub responses: Arc<Mutex<ResponseRegistry>>,
}

impl Context {
    /// Create a new application context.
    pub fn new(http: Arc<Client>, db: Database, config: Config) -> Self {
        let responses = ResponseRegistry::new(config.response_registry_capacity);
        Self {
            http,
            db,
            config: Arc::new(config),
            responses: Arc::new(Mutex::new(responses)),
        }
    }
}
