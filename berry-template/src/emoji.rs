//! Reaction emoji parsing and validation against a guild's emoji list.

use twilight_model::id::{Id, marker::EmojiMarker};

use crate::context::EmojiSnapshot;

/// An emoji ready to be attached as a reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionEmoji {
    Unicode(String),
    Custom {
        id: Id<EmojiMarker>,
        name: String,
        animated: bool,
    },
}

impl ReactionEmoji {
    /// Parse without consulting the guild: `<:name:id>`, `<a:name:id>` and
    /// `name:id` are custom, anything else is taken as Unicode.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        Some(parse_custom(trimmed).unwrap_or_else(|| Self::Unicode(trimmed.to_owned())))
    }

    /// Whether a user's reaction matches this emoji.
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unicode(a), Self::Unicode(b)) => {
                a.trim_end_matches('\u{FE0F}') == b.trim_end_matches('\u{FE0F}')
            }
            (Self::Custom { id: a, .. }, Self::Custom { id: b, .. }) => a == b,
            _ => false,
        }
    }
}

fn parse_custom(raw: &str) -> Option<ReactionEmoji> {
    let (animated, body) = match raw.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
        Some(inner) => match inner.strip_prefix("a:") {
            Some(rest) => (true, rest),
            None => (false, inner.strip_prefix(':')?),
        },
        None => (false, raw),
    };

    let (name, id) = body.rsplit_once(':')?;
    let id = id.parse::<u64>().ok().filter(|id| *id != 0)?;
    let name = name.trim_matches(':');
    if name.is_empty() {
        return None;
    }

    Some(ReactionEmoji::Custom {
        id: Id::new(id),
        name: name.to_owned(),
        animated,
    })
}

/// Resolve an emoji named in `{interaction:reaction:...}`.
///
/// Accepts standard Unicode emoji, custom emoji markup whose id belongs to the
/// guild, and bare or colon-wrapped names of guild emoji.
pub fn resolve_guild_emoji(raw: &str, guild_emojis: &[EmojiSnapshot]) -> Option<ReactionEmoji> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(ReactionEmoji::Custom { id, .. }) = parse_custom(trimmed) {
        return guild_emojis
            .iter()
            .find(|emoji| emoji.id == id)
            .map(custom_from_snapshot);
    }

    if is_standard_emoji(trimmed) {
        return Some(ReactionEmoji::Unicode(trimmed.to_owned()));
    }

    let name = trimmed.trim_matches(':');
    guild_emojis
        .iter()
        .find(|emoji| emoji.name == name)
        .map(custom_from_snapshot)
}

fn custom_from_snapshot(emoji: &EmojiSnapshot) -> ReactionEmoji {
    ReactionEmoji::Custom {
        id: emoji.id,
        name: emoji.name.clone(),
        animated: emoji.animated,
    }
}

/// Heuristic check that `text` is made only of emoji code points.
pub fn is_standard_emoji(text: &str) -> bool {
    let keycap = text.contains('\u{20E3}');
    let mut has_base = false;

    for ch in text.chars() {
        if is_pictographic(ch) {
            has_base = true;
        } else if is_emoji_modifier(ch) || (keycap && matches!(ch, '0'..='9' | '#' | '*')) {
            continue;
        } else {
            return false;
        }
    }

    has_base || keycap
}

fn is_pictographic(ch: char) -> bool {
    matches!(
        u32::from(ch),
        0x00A9
            | 0x00AE
            | 0x203C
            | 0x2049
            | 0x2122
            | 0x2139
            | 0x2194..=0x21AA
            | 0x231A..=0x23FF
            | 0x24C2
            | 0x25A0..=0x25FF
            | 0x2600..=0x27BF
            | 0x2934..=0x2935
            | 0x2B00..=0x2BFF
            | 0x3030
            | 0x303D
            | 0x3297
            | 0x3299
            | 0x1F000..=0x1FAFF
    )
}

fn is_emoji_modifier(ch: char) -> bool {
    matches!(
        u32::from(ch),
        0x200D | 0x20E3 | 0xFE0E | 0xFE0F | 0xE0020..=0xE007F
    )
}
