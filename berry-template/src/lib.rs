//! Placeholder and directive expansion for user-authored response templates.

pub mod action;
pub mod condition;
pub mod context;
pub mod directive;
pub mod embed;
pub mod emoji;
pub mod engine;
pub mod error;
pub mod extract;
pub mod placeholders;

pub use action::{ActionSpec, RoleAction, RoleEdit, RoleSnapshot, resolve_role};
pub use context::{
    ChannelSnapshot, EmojiSnapshot, ExpansionContext, GuildSnapshot, MemberSnapshot,
    MessageSnapshot,
};
pub use embed::{DEFINITION_SIZE_LIMIT, EmbedDefinition, render_embed};
pub use emoji::ReactionEmoji;
pub use engine::{
    BUTTON_ID_PREFIX, ButtonSpec, ExpansionResult, ExpansionStore, ReactionBinding, expand,
    tag_from_custom_id,
};
pub use error::ExpansionError;
