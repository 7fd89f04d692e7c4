use std::{env, str::FromStr};

use thiserror::Error;

pub const DEFAULT_PREFIX: &str = "y;";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_REGISTRY_CAPACITY: usize = 1000;

/// Source of environment variables, swappable in tests.
pub trait ReadEnv {
    fn var(&self, key: &str) -> Result<String, env::VarError>;
}

/// The process environment.
pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    fn var(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}

/// Process-wide settings read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    /// Used when a guild has no prefix of its own.
    pub default_prefix: String,
    pub database_max_connections: u32,
    /// How many sent responses keep their interaction bindings.
    pub response_registry_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(&SystemEnv)
    }

    pub fn from_reader(env: &impl ReadEnv) -> Result<Self, ConfigError> {
        Ok(Self {
            discord_token: required(env, "DISCORD_TOKEN")?,
            database_url: required(env, "DATABASE_URL")?,
            default_prefix: optional(env, "BOT_PREFIX")
                .unwrap_or_else(|| DEFAULT_PREFIX.to_owned()),
            database_max_connections: parsed(
                env,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            response_registry_capacity: parsed(
                env,
                "RESPONSE_REGISTRY_CAPACITY",
                DEFAULT_REGISTRY_CAPACITY,
            )?,
        })
    }
}

fn optional(env: &impl ReadEnv, key: &str) -> Option<String> {
    env.var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn required(env: &impl ReadEnv, key: &'static str) -> Result<String, ConfigError> {
    optional(env, key).ok_or(ConfigError::Missing(key))
}

/// Positive number, or `default` when unset.
fn parsed<T>(env: &impl ReadEnv, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(raw) = optional(env, key) else {
        return Ok(default);
    };

    raw.parse::<T>()
        .ok()
        .filter(|value| *value > T::default())
        .ok_or(ConfigError::Invalid { key, value: raw })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct MapEnv(HashMap<&'static str, &'static str>);

    impl ReadEnv for MapEnv {
        fn var(&self, key: &str) -> Result<String, env::VarError> {
            self.0
                .get(key)
                .map(|value| (*value).to_owned())
                .ok_or(env::VarError::NotPresent)
        }
    }

    fn env(pairs: &[(&'static str, &'static str)]) -> MapEnv {
        MapEnv(pairs.iter().copied().collect())
    }

    const BASE: [(&str, &str); 2] = [
        ("DISCORD_TOKEN", "token"),
        ("DATABASE_URL", "postgres://localhost/berry"),
    ];

    #[test]
    fn defaults_apply_when_optional_values_are_unset() {
        let config = Config::from_reader(&env(&BASE)).unwrap();
        assert_eq!(config.default_prefix, "y;");
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.response_registry_capacity, 1000);
    }

    #[test]
    fn overrides_are_read() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("BOT_PREFIX", "!"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("RESPONSE_REGISTRY_CAPACITY", "50"),
        ]);
        let config = Config::from_reader(&env(&pairs)).unwrap();
        assert_eq!(config.default_prefix, "!");
        assert_eq!(config.database_max_connections, 12);
        assert_eq!(config.response_registry_capacity, 50);
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = Config::from_reader(&env(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DISCORD_TOKEN"));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("RESPONSE_REGISTRY_CAPACITY", "0"));
        assert!(matches!(
            Config::from_reader(&env(&pairs)),
            Err(ConfigError::Invalid {
                key: "RESPONSE_REGISTRY_CAPACITY",
                ..
            })
        ));
    }
}
