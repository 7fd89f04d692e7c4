//! Infraction recording and the mod-log channel.

use tracing::{error, warn};
use twilight_model::{
    channel::message::embed::Embed,
    id::{
        Id,
        marker::{GuildMarker, UserMarker},
    },
};

use crate::moderation::embeds::NO_REASON;
use crate::replies::sanitize;
use berry_core::Context;
use berry_database::guild_config::GuildConfigKey;
use berry_database::infractions::{InfractionKind, NewInfraction};
use berry_utils::embed::{DANGER_EMBED_COLOR, DEFAULT_EMBED_COLOR, Field, build_embed_with};
use berry_utils::parse::{format_duration, parse_channel_id};

/// One moderation action, as recorded and logged.
#[derive(Clone, Copy, Debug)]
pub struct Case<'a> {
    pub guild_id: Id<GuildMarker>,
    pub target: Id<UserMarker>,
    pub moderator: Id<UserMarker>,
    pub kind: InfractionKind,
    pub reason: Option<&'a str>,
    pub duration_secs: Option<u64>,
}

fn color_for(kind: InfractionKind) -> u32 {
    match kind {
        InfractionKind::Ban | InfractionKind::Kick | InfractionKind::Timeout => DANGER_EMBED_COLOR,
        InfractionKind::Warn | InfractionKind::Note | InfractionKind::Unban => DEFAULT_EMBED_COLOR,
    }
}

pub fn audit_embed(case: &Case<'_>, case_id: Option<i64>) -> anyhow::Result<Embed> {
    let title = match case_id {
        Some(id) => format!("Case #{id} | {}", case.kind),
        None => case.kind.to_string(),
    };

    let mut fields = vec![
        Field::inline("User", format!("<@{}>", case.target)),
        Field::inline("Moderator", format!("<@{}>", case.moderator)),
    ];
    if let Some(secs) = case.duration_secs {
        fields.push(Field::inline("Duration", format_duration(secs)));
    }
    fields.push(Field::new("Reason", sanitize(case.reason.unwrap_or(NO_REASON))));

    build_embed_with(&title, "", color_for(case.kind), &fields, None)
}

/// Store the infraction. Failures are logged and yield no case id.
pub async fn record(ctx: &Context, case: &Case<'_>) -> Option<i64> {
    let new = NewInfraction {
        guild_id: case.guild_id,
        user_id: case.target,
        kind: case.kind,
        reason: case.reason.unwrap_or(NO_REASON),
        duration_secs: case.duration_secs,
        issued_by: case.moderator,
    };

    match ctx.db.record_infraction(&new).await {
        Ok(id) => Some(id),
        Err(source) => {
            error!(?source, kind = %case.kind, "failed to record infraction");
            None
        }
    }
}

/// Post the case to the configured mod-log channel, if there is one.
pub async fn log_case(ctx: &Context, case: &Case<'_>, case_id: Option<i64>) {
    let channel = match ctx
        .db
        .get_guild_config(case.guild_id, GuildConfigKey::ModLogChannel)
        .await
    {
        Ok(value) => value.as_deref().and_then(parse_channel_id),
        Err(source) => {
            error!(?source, "failed to read mod-log channel");
            None
        }
    };
    let Some(channel_id) = channel else {
        return;
    };

    let embed = match audit_embed(case, case_id) {
        Ok(embed) => embed,
        Err(source) => {
            error!(?source, "failed to build audit embed");
            return;
        }
    };

    if let Err(source) = ctx.http.create_message(channel_id).embeds(&[embed]).await {
        warn!(?source, channel = %channel_id, "failed to post to mod-log");
    }
}

/// Record and log `case`, returning its id when stored.
pub async fn finish(ctx: &Context, case: &Case<'_>) -> Option<i64> {
    let case_id = record(ctx, case).await;
    log_case(ctx, case, case_id).await;
    case_id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(kind: InfractionKind) -> Case<'static> {
        Case {
            guild_id: Id::new(1),
            target: Id::new(2),
            moderator: Id::new(3),
            kind,
            reason: None,
            duration_secs: None,
        }
    }

    #[test]
    fn audit_embed_names_case_and_parties() {
        let timeout = Case {
            duration_secs: Some(3_600),
            reason: Some("spam"),
            ..case(InfractionKind::Timeout)
        };
        let embed = audit_embed(&timeout, Some(41)).unwrap();

        assert_eq!(embed.title.as_deref(), Some("Case #41 | timeout"));
        assert_eq!(embed.color, Some(DANGER_EMBED_COLOR));
        let names: Vec<&str> = embed.fields.iter().map(|field| field.name.as_str()).collect();
        assert_eq!(names, ["User", "Moderator", "Duration", "Reason"]);
        assert_eq!(embed.fields[2].value, "1h");
    }

    #[test]
    fn unrecorded_case_still_renders() {
        let embed = audit_embed(&case(InfractionKind::Note), None).unwrap();
        assert_eq!(embed.title.as_deref(), Some("note"));
        assert_eq!(embed.fields.last().map(|field| field.value.as_str()), Some(NO_REASON));
    }
}
