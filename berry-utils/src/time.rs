use std::time::{SystemTime, UNIX_EPOCH};

use twilight_model::util::Timestamp;

/// Discord's snowflake epoch, in milliseconds.
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// Creation time of any snowflake, in unix seconds.
pub fn snowflake_unix_secs(id: u64) -> i64 {
    let millis = (id >> 22).saturating_add(DISCORD_EPOCH_MS);
    i64::try_from(millis / 1000).unwrap_or(i64::MAX)
}

/// A timestamp `secs` from now, for communication-disable deadlines.
pub fn timestamp_after(secs: u64) -> anyhow::Result<Timestamp> {
    let until = now_unix_secs().saturating_add(secs);
    Ok(Timestamp::from_secs(i64::try_from(until)?)?)
}
