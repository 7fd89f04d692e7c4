//! Commands that manage guild-authored content: autoresponders and embeds.

pub mod ar;
pub mod embed;

use twilight_model::id::{Id, marker::UserMarker};

use berry_utils::parse::parse_target_user_id;

pub const NAME_MAX_CHARS: usize = 32;

/// Whether `name` is usable as an autoresponder or embed name.
///
/// Embed names are strictly alphanumeric; autoresponders also allow `-` and `_`.
pub fn valid_name(name: &str, allow_separators: bool) -> bool {
    !name.is_empty()
        && name.chars().count() <= NAME_MAX_CHARS
        && name.chars().all(|ch| {
            ch.is_ascii_alphanumeric() || (allow_separators && matches!(ch, '-' | '_'))
        })
}

/// Parse a whitespace-separated list of user mentions or ids.
///
/// `None` when any entry is not a user.
pub fn parse_user_list(raw: &str) -> Option<Vec<Id<UserMarker>>> {
    let mut users = Vec::new();
    for part in raw.split_whitespace() {
        let user = parse_target_user_id(part)?;
        if !users.contains(&user) {
            users.push(user);
        }
    }
    Some(users)
}

pub fn mention_list(users: &[Id<UserMarker>]) -> String {
    if users.is_empty() {
        return "none".to_owned();
    }
    users
        .iter()
        .map(|user| format!("<@{user}>"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Cut `text` to `max` characters, marking the cut with `…`.
pub fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut clipped: String = text.chars().take(max.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_checked() {
        assert!(valid_name("welcome", false));
        assert!(valid_name("rules2", false));
        assert!(!valid_name("good-morning", false));
        assert!(valid_name("good-morning", true));
        assert!(valid_name("good_morning", true));
        assert!(!valid_name("", true));
        assert!(!valid_name("has space", true));
        assert!(!valid_name(&"a".repeat(NAME_MAX_CHARS + 1), true));
    }

    #[test]
    fn user_lists_parse_and_dedupe() {
        assert_eq!(
            parse_user_list("<@1> 2 <@!1>"),
            Some(vec![Id::new(1), Id::new(2)])
        );
        assert_eq!(parse_user_list(""), Some(Vec::new()));
        assert_eq!(parse_user_list("<@1> everyone"), None);
    }

    #[test]
    fn mention_list_renders() {
        assert_eq!(mention_list(&[]), "none");
        assert_eq!(mention_list(&[Id::new(3), Id::new(4)]), "<@3>, <@4>");
    }

    #[test]
    fn clip_marks_truncation() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdef", 4), "abc…");
    }
}
