use thiserror::Error;

/// Reasons an expansion is aborted.
///
/// The `Display` output is the diagnostic shown to whoever triggered the
/// template, so every message is written for a server member to read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpansionError {
    #[error("`{{{directive}}}` is missing its {field}.")]
    MissingField {
        directive: &'static str,
        field: &'static str,
    },

    #[error("`{{{directive}}}` has an invalid {field} `{value}`; expected one of: {expected}.")]
    InvalidValue {
        directive: &'static str,
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("`{{{directive}:...}}` is not closed properly or nests braces too deeply.")]
    Malformed { directive: String },

    #[error("`{{role:...}}` only works inside `{{action:...}}`, bound to a button or reaction.")]
    RoleOutsideAction,

    #[error("`{{{directive}}}` can only be used once per response.")]
    Duplicate { directive: &'static str },

    #[error("Interaction `{tag}` has no matching `{{action:...:{tag}}}`.")]
    UnboundInteraction { tag: String },

    #[error("A response can have at most {max} buttons.")]
    TooManyButtons { max: usize },

    #[error("Embed `{name}` does not exist.")]
    EmbedNotFound { name: String },

    #[error("Embed `{name}` is stored in an unreadable format.")]
    EmbedCorrupt { name: String },

    #[error("`{emoji}` is not a standard emoji or an emoji from this server.")]
    InvalidEmoji { emoji: String },

    #[error("Couldn't load data for this response. Try again later.")]
    Store,
}
