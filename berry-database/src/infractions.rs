//! Moderation history.

use std::{fmt, str::FromStr};

use anyhow::Context;
use sqlx::FromRow;
use twilight_model::id::{
    Id,
    marker::{GuildMarker, UserMarker},
};

use crate::database::{Database, from_sql, to_sql};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InfractionKind {
    Warn,
    Note,
    Ban,
    Kick,
    Unban,
    Timeout,
}

impl InfractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Note => "note",
            Self::Ban => "ban",
            Self::Kick => "kick",
            Self::Unban => "unban",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for InfractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InfractionKind {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "warn" => Ok(Self::Warn),
            "note" => Ok(Self::Note),
            "ban" => Ok(Self::Ban),
            "kick" => Ok(Self::Kick),
            "unban" => Ok(Self::Unban),
            "timeout" => Ok(Self::Timeout),
            _ => Err(()),
        }
    }
}

#[derive(Debug, FromRow)]
struct InfractionRow {
    id: i64,
    user_id: i64,
    kind: String,
    reason: String,
    duration_secs: Option<i64>,
    issued_by: i64,
    created_at: i64,
}

#[derive(Clone, Debug)]
pub struct Infraction {
    pub id: i64,
    pub user_id: Id<UserMarker>,
    pub kind: InfractionKind,
    pub reason: String,
    pub duration_secs: Option<u64>,
    pub issued_by: Id<UserMarker>,
    /// Unix seconds.
    pub created_at: i64,
}

impl TryFrom<InfractionRow> for Infraction {
    type Error = anyhow::Error;

    fn try_from(row: InfractionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: from_sql(row.user_id).context("infraction has a zero user id")?,
            kind: row
                .kind
                .parse()
                .map_err(|()| anyhow::anyhow!("unknown infraction kind `{}`", row.kind))?,
            reason: row.reason,
            duration_secs: row.duration_secs.and_then(|secs| u64::try_from(secs).ok()),
            issued_by: from_sql(row.issued_by).context("infraction has a zero issuer id")?,
            created_at: row.created_at,
        })
    }
}

/// Fields for recording an infraction.
#[derive(Clone, Debug)]
pub struct NewInfraction<'a> {
    pub guild_id: Id<GuildMarker>,
    pub user_id: Id<UserMarker>,
    pub kind: InfractionKind,
    pub reason: &'a str,
    pub duration_secs: Option<u64>,
    pub issued_by: Id<UserMarker>,
}

impl Database {
    /// Store an infraction and return its case id.
    pub async fn record_infraction(&self, new: &NewInfraction<'_>) -> anyhow::Result<i64> {
        let duration = new
            .duration_secs
            .map(i64::try_from)
            .transpose()
            .context("infraction duration out of range")?;

        let id = sqlx::query_scalar(
            r#"
            INSERT INTO infractions (guild_id, user_id, kind, reason, duration_secs, issued_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(to_sql(new.guild_id))
        .bind(to_sql(new.user_id))
        .bind(new.kind.as_str())
        .bind(new.reason)
        .bind(duration)
        .bind(to_sql(new.issued_by))
        .fetch_one(self.pool())
        .await
        .context("failed to record infraction")?;

        Ok(id)
    }

    /// A member's infractions, newest first.
    pub async fn get_infractions(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> anyhow::Result<Vec<Infraction>> {
        let rows: Vec<InfractionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, kind, reason, duration_secs, issued_by, created_at
            FROM infractions
            WHERE guild_id = $1 AND user_id = $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(to_sql(guild_id))
        .bind(to_sql(user_id))
        .fetch_all(self.pool())
        .await
        .context("failed to load infractions")?;

        rows.into_iter().map(Infraction::try_from).collect()
    }

    pub async fn count_infractions(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> anyhow::Result<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM infractions WHERE guild_id = $1 AND user_id = $2")
                .bind(to_sql(guild_id))
                .bind(to_sql(user_id))
                .fetch_one(self.pool())
                .await
                .context("failed to count infractions")?;

        Ok(usize::try_from(count)?)
    }
}
