use twilight_http::Client;
use twilight_model::{
    channel::message::embed::Embed,
    id::{Id, marker::UserMarker},
};
use twilight_util::builder::embed::{
    EmbedAuthorBuilder, EmbedBuilder, EmbedFooterBuilder, ImageSource,
};

use crate::custom::clip;
use crate::replies::sanitize;
use berry_database::infractions::Infraction;
use berry_utils::embed::{DANGER_EMBED_COLOR, DEFAULT_EMBED_COLOR, user_avatar_url};
use berry_utils::parse::format_duration;

pub const NO_REASON: &str = "No reason provided";
const LISTED_INFRACTIONS: usize = 10;

/// Display name and avatar of a moderation target.
#[derive(Clone, Debug)]
pub struct TargetProfile {
    pub display_name: String,
    pub avatar_url: String,
}

/// Resolve a moderation target profile for display in embeds.
///
/// Falls back to a placeholder name when the user can't be fetched.
pub async fn fetch_target_profile(http: &Client, user_id: Id<UserMarker>) -> TargetProfile {
    let user = match http.user(user_id).await {
        Ok(response) => response.model().await.ok(),
        Err(_) => None,
    };

    match user {
        Some(user) => TargetProfile {
            avatar_url: user_avatar_url(user_id, user.avatar),
            display_name: user.global_name.unwrap_or(user.name),
        },
        None => TargetProfile {
            display_name: format!("User {user_id}"),
            avatar_url: user_avatar_url(user_id, None),
        },
    }
}

fn with_profile(builder: EmbedBuilder, profile: &TargetProfile, title: String) -> EmbedBuilder {
    match ImageSource::url(profile.avatar_url.as_str()) {
        Ok(icon) => builder.author(EmbedAuthorBuilder::new(title).icon_url(icon).build()),
        Err(_) => builder.title(title),
    }
}

/// Result embed for a moderation action, posted where the command ran.
pub fn moderation_action_embed(
    target_profile: &TargetProfile,
    target_user_id: Id<UserMarker>,
    action_past_tense: &str,
    reason: Option<&str>,
    duration_secs: Option<u64>,
    case_id: Option<i64>,
) -> anyhow::Result<Embed> {
    let reason = sanitize(reason.unwrap_or(NO_REASON));
    let mut description = format!("Target: <@{target_user_id}>\nReason: {reason}");
    if let Some(secs) = duration_secs {
        description.push_str(&format!("\nDuration: {}", format_duration(secs)));
    }

    let mut builder = EmbedBuilder::new()
        .color(DEFAULT_EMBED_COLOR)
        .description(description);
    if let Some(case_id) = case_id {
        builder = builder.footer(EmbedFooterBuilder::new(format!("Case #{case_id}")).build());
    }

    let title = format!("{} has been {action_past_tense}", target_profile.display_name);
    Ok(with_profile(builder, target_profile, title).validate()?.build())
}

fn infraction_line(infraction: &Infraction) -> String {
    let mut line = format!(
        "**#{}** {} • <t:{}:d> • by <@{}>",
        infraction.id, infraction.kind, infraction.created_at, infraction.issued_by
    );
    if let Some(secs) = infraction.duration_secs {
        line.push_str(&format!(" • {}", format_duration(secs)));
    }
    line.push_str(&format!("\n{}", sanitize(&clip(&infraction.reason, 200))));
    line
}

/// History embed for `infractions`, newest first.
pub fn infractions_embed(
    target_profile: &TargetProfile,
    infractions: &[Infraction],
) -> anyhow::Result<Embed> {
    let mut description = format!("Total infractions: **{}**\n\n", infractions.len());
    if infractions.is_empty() {
        description.push_str("Clean record.");
    } else {
        let lines: Vec<String> = infractions
            .iter()
            .take(LISTED_INFRACTIONS)
            .map(infraction_line)
            .collect();
        description.push_str(&lines.join("\n\n"));
        if infractions.len() > LISTED_INFRACTIONS {
            description.push_str(&format!(
                "\n\n…and {} older",
                infractions.len() - LISTED_INFRACTIONS
            ));
        }
    }

    let color = if infractions.is_empty() {
        DEFAULT_EMBED_COLOR
    } else {
        DANGER_EMBED_COLOR
    };
    let builder = EmbedBuilder::new().color(color).description(description);
    let title = format!("Infractions for {}", target_profile.display_name);

    Ok(with_profile(builder, target_profile, title).validate()?.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use berry_database::infractions::InfractionKind;

    fn profile() -> TargetProfile {
        TargetProfile {
            display_name: "Berry".to_owned(),
            avatar_url: user_avatar_url(Id::new(5), None),
        }
    }

    fn infraction(id: i64, kind: InfractionKind) -> Infraction {
        Infraction {
            id,
            user_id: Id::new(5),
            kind,
            reason: "spam @everyone".to_owned(),
            duration_secs: None,
            issued_by: Id::new(9),
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn action_embed_carries_duration_and_case() {
        let embed = moderation_action_embed(
            &profile(),
            Id::new(5),
            "timed out",
            Some("flooding"),
            Some(600),
            Some(12),
        )
        .unwrap();

        let description = embed.description.unwrap();
        assert!(description.contains("Duration: 10m"));
        assert!(description.contains("Reason: flooding"));
        assert_eq!(embed.footer.map(|footer| footer.text), Some("Case #12".to_owned()));
        assert_eq!(
            embed.author.map(|author| author.name),
            Some("Berry has been timed out".to_owned())
        );
    }

    #[test]
    fn missing_reason_uses_placeholder() {
        let embed =
            moderation_action_embed(&profile(), Id::new(5), "kicked", None, None, None).unwrap();
        assert!(embed.description.unwrap().contains(NO_REASON));
        assert!(embed.footer.is_none());
    }

    #[test]
    fn history_lists_newest_and_defuses_mentions() {
        let infractions: Vec<Infraction> = (1..=12)
            .rev()
            .map(|id| infraction(id, InfractionKind::Warn))
            .collect();
        let embed = infractions_embed(&profile(), &infractions).unwrap();
        let description = embed.description.unwrap();

        assert!(description.starts_with("Total infractions: **12**"));
        assert!(description.contains("**#12** warn"));
        assert!(!description.contains("**#2** warn"));
        assert!(description.contains("…and 2 older"));
        assert!(!description.contains("@everyone"));
        assert_eq!(embed.color, Some(DANGER_EMBED_COLOR));
    }

    #[test]
    fn empty_history_is_clean() {
        let embed = infractions_embed(&profile(), &[]).unwrap();
        assert!(embed.description.unwrap().contains("Clean record."));
        assert_eq!(embed.color, Some(DEFAULT_EMBED_COLOR));
    }
}
