//! Everything that happens after a message matches an autoresponder.

pub mod actions;
pub mod dispatch;
pub mod runtime;
pub mod snapshot;
