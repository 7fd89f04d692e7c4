//! `{name}` placeholder vocabularies and literal substitution.

use crate::context::ExpansionContext;

/// Replacement for staff-only placeholders when the author lacks access.
pub const RESTRICTED_SENTINEL: &str = "[staff only]";

/// Tokens only resolved for elevated authors.
pub const STAFF_PLACEHOLDERS: [&str; 6] = [
    "{message_id}",
    "{message_content}",
    "{message_reactions}",
    "{message_created}",
    "{infractions}",
    "{channel_last_message}",
];

const INFRACTIONS: &str = "{infractions}";

/// Append the English ordinal suffix to `n`.
pub fn ordinal(n: u64) -> String {
    let suffix = if (11..=13).contains(&(n % 100)) {
        "th"
    } else {
        match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    };

    format!("{n}{suffix}")
}

/// Render unix seconds as a Discord timestamp markup token.
fn discord_timestamp(secs: i64, style: char) -> String {
    format!("<t:{secs}:{style}>")
}

/// Ordered `{token}` → value table.
///
/// Replacement walks the table in insertion order; there is no escaping, so a
/// literal `{user}` in a template is always substituted.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderTable {
    entries: Vec<(&'static str, String)>,
}

impl PlaceholderTable {
    fn push(&mut self, token: &'static str, value: impl Into<String>) {
        self.entries.push((token, value.into()));
    }

    /// Placeholders available to everyone.
    pub fn public(ctx: &ExpansionContext) -> Self {
        let author = &ctx.author;
        let guild = &ctx.guild;
        let mention = ctx.mention.as_ref();
        let mut table = Self::default();

        table.push("{user}", format!("<@{}>", author.id));
        table.push("{user_name}", author.name.as_str());
        table.push("{user_display_name}", author.display_name.as_str());
        table.push("{user_id}", author.id.to_string());
        table.push("{user_avatar}", author.avatar_url.as_str());
        table.push(
            "{user_banner}",
            author.banner_url.as_deref().unwrap_or("[no banner]"),
        );
        table.push(
            "{user_join_date}",
            author
                .joined_at
                .map_or_else(|| "[unknown]".to_owned(), |at| discord_timestamp(at, 'F')),
        );
        table.push(
            "{user_creation_date}",
            discord_timestamp(author.created_at, 'F'),
        );
        table.push("{top_role}", author.top_role(guild));

        table.push(
            "{mention}",
            mention.map_or_else(|| "[user]".to_owned(), |m| format!("<@{}>", m.id)),
        );
        table.push(
            "{mention_name}",
            mention.map_or("[user]", |m| m.name.as_str()),
        );
        table.push(
            "{mention_id}",
            mention.map_or_else(|| "[0000]".to_owned(), |m| m.id.to_string()),
        );
        table.push(
            "{mention_join_date}",
            mention
                .and_then(|m| m.joined_at)
                .map_or_else(|| "[00-00-0000]".to_owned(), |at| discord_timestamp(at, 'F')),
        );

        table.push("{channel}", format!("<#{}>", ctx.channel.id));
        table.push("{channel_name}", ctx.channel.name.as_str());
        table.push("{channel_id}", ctx.channel.id.to_string());

        table.push("{server_name}", guild.name.as_str());
        table.push("{server_id}", guild.id.to_string());
        table.push(
            "{server_icon}",
            guild.icon_url.as_deref().unwrap_or("[no icon]"),
        );
        table.push(
            "{server_creation_date}",
            discord_timestamp(guild.created_at, 'F'),
        );
        table.push("{server_boost_tier}", guild.boost_tier.to_string());
        table.push("{server_boost_count}", guild.boost_count.to_string());
        table.push("{server_role_count}", guild.roles.len().to_string());
        table.push("{server_channel_count}", guild.channel_count.to_string());
        table.push("{member_count_ordinal}", ordinal(guild.member_count));
        table.push("{member_count}", guild.member_count.to_string());

        table.push("{time}", discord_timestamp(ctx.message.created_at, 'F'));
        table.push("{date}", discord_timestamp(ctx.message.created_at, 'd'));
        table.push("{prefix}", ctx.prefix.as_str());

        table
    }

    /// Staff-only placeholders, or the restricted sentinel for everyone else.
    ///
    /// `infractions` is the author's infraction count when it was loaded.
    pub fn staff(ctx: &ExpansionContext, infractions: Option<usize>) -> Self {
        let mut table = Self::default();

        if !ctx.elevated {
            for token in STAFF_PLACEHOLDERS {
                table.push(token, RESTRICTED_SENTINEL);
            }
            return table;
        }

        let message = &ctx.message;
        table.push("{message_id}", message.id.to_string());
        table.push("{message_content}", message.content.as_str());
        table.push(
            "{message_reactions}",
            if message.reactions.is_empty() {
                "none".to_owned()
            } else {
                message.reactions.join(", ")
            },
        );
        table.push(
            "{message_created}",
            discord_timestamp(message.created_at, 'F'),
        );
        table.push(
            INFRACTIONS,
            infractions.map_or_else(|| "[unavailable]".to_owned(), |count| count.to_string()),
        );
        table.push(
            "{channel_last_message}",
            ctx.channel
                .last_message_at
                .map_or_else(|| "[never]".to_owned(), |at| discord_timestamp(at, 'R')),
        );

        table
    }

    pub fn apply(&self, text: &str) -> String {
        self.entries
            .iter()
            .fold(text.to_owned(), |acc, (token, value)| acc.replace(token, value))
    }
}

/// Whether resolving `text` needs the author's infraction count.
pub fn needs_infraction_count(text: &str) -> bool {
    text.contains(INFRACTIONS)
}

/// Both substitution tiers, applied public first.
#[derive(Debug, Clone)]
pub struct Substitutor {
    public: PlaceholderTable,
    staff: PlaceholderTable,
}

impl Substitutor {
    pub fn new(ctx: &ExpansionContext, infractions: Option<usize>) -> Self {
        Self {
            public: PlaceholderTable::public(ctx),
            staff: PlaceholderTable::staff(ctx, infractions),
        }
    }

    pub fn apply(&self, text: &str) -> String {
        self.staff.apply(&self.public.apply(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures::{context, member};

    #[test]
    fn ordinal_suffixes() {
        let cases = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (21, "21st"),
            (102, "102nd"),
            (111, "111th"),
            (1013, "1013th"),
        ];
        for (n, expected) in cases {
            assert_eq!(ordinal(n), expected);
        }
    }

    #[test]
    fn public_placeholders_resolve_from_context() {
        let ctx = context();
        let out = PlaceholderTable::public(&ctx)
            .apply("Welcome {user} to {server_name}, you are member {member_count_ordinal}!");
        assert_eq!(out, "Welcome <@100> to Orchard, you are member 42nd!");
    }

    #[test]
    fn user_token_does_not_clobber_longer_tokens() {
        let ctx = context();
        let out = PlaceholderTable::public(&ctx).apply("{user} {user_name} {user_id}");
        assert_eq!(out, "<@100> berry 100");
    }

    #[test]
    fn mention_placeholders_fall_back_without_mention() {
        let mut ctx = context();
        let table = PlaceholderTable::public(&ctx);
        assert_eq!(
            table.apply("{mention_name}|{mention_id}|{mention_join_date}"),
            "[user]|[0000]|[00-00-0000]"
        );

        ctx.mention = Some(member(777, "sprout"));
        let table = PlaceholderTable::public(&ctx);
        assert_eq!(
            table.apply("{mention_name}|{mention_id}"),
            "sprout|777"
        );
    }

    #[test]
    fn staff_placeholders_are_restricted_without_elevation() {
        let ctx = context();
        let out = Substitutor::new(&ctx, Some(3)).apply("{message_id} {infractions}");
        assert_eq!(out, format!("{RESTRICTED_SENTINEL} {RESTRICTED_SENTINEL}"));
    }

    #[test]
    fn staff_placeholders_resolve_with_elevation() {
        let mut ctx = context();
        ctx.elevated = true;
        let out = Substitutor::new(&ctx, Some(3))
            .apply("{message_id} {message_content} {infractions} {message_reactions}");
        assert_eq!(out, "500 hello there 3 none");
    }

    #[test]
    fn infraction_count_only_needed_when_referenced() {
        assert!(needs_infraction_count("you have {infractions} strikes"));
        assert!(!needs_infraction_count("{user_id}"));
    }
}
