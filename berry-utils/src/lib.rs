/// Shared embed builders used by command replies.
pub mod embed;
/// Interaction response helpers.
pub mod interaction;
/// Pure argument parsers.
pub mod parse;
/// Permission resolution and the shared authorization rule.
pub mod permissions;
/// Shared time helpers.
pub mod time;
