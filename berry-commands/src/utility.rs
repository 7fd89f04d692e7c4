pub mod config;
pub mod help;
pub mod ping;
