use twilight_model::id::{
    Id,
    marker::{ChannelMarker, RoleMarker, UserMarker},
};

/// Strip `<{sigil}...>` markup around a snowflake and parse it.
///
/// Raw numeric ids are accepted too; zero is never a valid id.
fn parse_snowflake(raw: &str, sigil: &str, alt_sigil: Option<&str>) -> Option<u64> {
    let trimmed = raw.trim();

    let numeric = match trimmed
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
    {
        Some(inner) => {
            let inner = inner.strip_prefix(sigil)?;
            alt_sigil
                .and_then(|alt| inner.strip_prefix(alt))
                .unwrap_or(inner)
        }
        None => trimmed,
    };

    numeric.parse::<u64>().ok().filter(|id| *id != 0)
}

/// Parse a target user from a raw argument (`<@id>`, `<@!id>`, or raw ID).
pub fn parse_target_user_id(raw: &str) -> Option<Id<UserMarker>> {
    parse_snowflake(raw, "@", Some("!")).map(Id::new)
}

/// Parse a role from `<@&id>` or a raw ID.
pub fn parse_role_id(raw: &str) -> Option<Id<RoleMarker>> {
    parse_snowflake(raw, "@&", None).map(Id::new)
}

/// Parse a channel from `<#id>` or a raw ID.
pub fn parse_channel_id(raw: &str) -> Option<Id<ChannelMarker>> {
    parse_snowflake(raw, "#", None).map(Id::new)
}

/// Parse a compact duration token like `30s`, `10m`, `2h`, `1d`, or plain seconds.
pub fn parse_duration_seconds(raw: &str) -> Option<u64> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let mut chars = value.chars();
    let (number_raw, multiplier) = match chars.next_back() {
        Some('s' | 'S') => (chars.as_str(), 1_u64),
        Some('m' | 'M') => (chars.as_str(), 60),
        Some('h' | 'H') => (chars.as_str(), 60 * 60),
        Some('d' | 'D') => (chars.as_str(), 60 * 60 * 24),
        Some('w' | 'W') => (chars.as_str(), 60 * 60 * 24 * 7),
        Some(last) if last.is_ascii_digit() => (value, 1),
        _ => return None,
    };

    let number = number_raw.parse::<u64>().ok().filter(|n| *n != 0)?;
    number.checked_mul(multiplier)
}

/// Render seconds the way durations are typed, e.g. `90` → `1m 30s`.
pub fn format_duration(secs: u64) -> String {
    const UNITS: [(u64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];

    if secs == 0 {
        return "0s".to_owned();
    }

    let mut remaining = secs;
    let mut parts = Vec::new();
    for (size, suffix) in UNITS {
        if remaining >= size {
            parts.push(format!("{}{suffix}", remaining / size));
            remaining %= size;
        }
    }
    parts.join(" ")
}

/// Split command arguments on whitespace, keeping `"quoted text"` together.
///
/// An unterminated quote runs to the end of the input.
pub fn split_quoted_args(raw: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in raw.chars() {
        match ch {
            '"' => {
                if quoted {
                    args.push(std::mem::take(&mut current));
                }
                quoted = !quoted;
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }
    args
}

/// Split off the first quoted-or-bare argument, returning it and the untouched rest.
pub fn take_first_arg(raw: &str) -> Option<(String, &str)> {
    let trimmed = raw.trim_start();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(rest) = trimmed.strip_prefix('"') {
        return Some(match rest.split_once('"') {
            Some((arg, tail)) => (arg.to_owned(), tail.trim_start()),
            None => (rest.to_owned(), ""),
        });
    }

    Some(match trimmed.split_once(char::is_whitespace) {
        Some((arg, tail)) => (arg.to_owned(), tail.trim_start()),
        None => (trimmed.to_owned(), ""),
    })
}
