//! Read-only snapshot of the event a template is expanded for.

use twilight_model::id::{
    Id,
    marker::{ChannelMarker, EmojiMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker},
};

use crate::action::RoleSnapshot;

/// Everything the engine may read while expanding one template.
///
/// Built fresh by the caller for every triggering event and never persisted.
#[derive(Debug, Clone)]
pub struct ExpansionContext {
    pub author: MemberSnapshot,
    /// First user mentioned in the triggering message, if any.
    pub mention: Option<MemberSnapshot>,
    pub channel: ChannelSnapshot,
    pub guild: GuildSnapshot,
    pub message: MessageSnapshot,
    /// Active command prefix for the guild.
    pub prefix: String,
    /// Whether the author may read staff-only placeholders.
    pub elevated: bool,
}

#[derive(Debug, Clone)]
pub struct MemberSnapshot {
    pub id: Id<UserMarker>,
    pub name: String,
    pub display_name: String,
    pub avatar_url: String,
    pub banner_url: Option<String>,
    /// Unix seconds.
    pub joined_at: Option<i64>,
    /// Unix seconds.
    pub created_at: i64,
    pub role_ids: Vec<Id<RoleMarker>>,
}

#[derive(Debug, Clone)]
pub struct ChannelSnapshot {
    pub id: Id<ChannelMarker>,
    pub name: String,
    /// Unix seconds of the channel's latest message.
    pub last_message_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct GuildSnapshot {
    pub id: Id<GuildMarker>,
    pub name: String,
    pub icon_url: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
    pub member_count: u64,
    pub boost_tier: u8,
    pub boost_count: u64,
    pub channel_count: usize,
    pub roles: Vec<RoleSnapshot>,
    pub emojis: Vec<EmojiSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiSnapshot {
    pub id: Id<EmojiMarker>,
    pub name: String,
    pub animated: bool,
}

#[derive(Debug, Clone)]
pub struct MessageSnapshot {
    pub id: Id<MessageMarker>,
    pub content: String,
    /// Unix seconds.
    pub created_at: i64,
    /// Rendered reactions, e.g. `👍 ×3`.
    pub reactions: Vec<String>,
}

impl MemberSnapshot {
    /// Name of the member's highest positioned role, `@everyone` when none.
    pub fn top_role<'a>(&self, guild: &'a GuildSnapshot) -> &'a str {
        guild
            .roles
            .iter()
            .filter(|role| self.role_ids.contains(&role.id))
            .max_by_key(|role| role.position)
            .map_or("@everyone", |role| role.name.as_str())
    }

    pub fn has_role_named(&self, guild: &GuildSnapshot, name: &str) -> bool {
        guild
            .roles
            .iter()
            .any(|role| role.name == name && self.role_ids.contains(&role.id))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn member(id: u64, name: &str) -> MemberSnapshot {
        MemberSnapshot {
            id: Id::new(id),
            name: name.to_owned(),
            display_name: name.to_owned(),
            avatar_url: format!("https://cdn.discordapp.com/embed/avatars/{}.png", id % 6),
            banner_url: None,
            joined_at: Some(1_700_000_000),
            created_at: 1_600_000_000,
            role_ids: vec![Id::new(20)],
        }
    }

    pub fn context() -> ExpansionContext {
        ExpansionContext {
            author: member(100, "berry"),
            mention: None,
            channel: ChannelSnapshot {
                id: Id::new(300),
                name: "general".to_owned(),
                last_message_at: Some(1_710_000_500),
            },
            guild: GuildSnapshot {
                id: Id::new(400),
                name: "Orchard".to_owned(),
                icon_url: None,
                created_at: 1_500_000_000,
                member_count: 42,
                boost_tier: 2,
                boost_count: 9,
                channel_count: 12,
                roles: vec![
                    RoleSnapshot {
                        id: Id::new(20),
                        name: "Member".to_owned(),
                        position: 1,
                    },
                    RoleSnapshot {
                        id: Id::new(21),
                        name: "Staff".to_owned(),
                        position: 5,
                    },
                ],
                emojis: vec![EmojiSnapshot {
                    id: Id::new(900),
                    name: "blobwave".to_owned(),
                    animated: false,
                }],
            },
            message: MessageSnapshot {
                id: Id::new(500),
                content: "hello there".to_owned(),
                created_at: 1_710_000_000,
                reactions: Vec::new(),
            },
            prefix: "y;".to_owned(),
            elevated: false,
        }
    }
}
