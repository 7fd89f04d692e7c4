//! Stored rich-message definitions and their conversion to Discord embeds.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use twilight_model::{channel::message::embed::Embed, util::Timestamp};
use twilight_util::builder::embed::{
    EmbedAuthorBuilder, EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder, ImageSource,
};

pub const TITLE_LIMIT: usize = 256;
pub const DESCRIPTION_LIMIT: usize = 4096;
pub const FOOTER_LIMIT: usize = 2048;
pub const AUTHOR_NAME_LIMIT: usize = 256;
pub const FIELD_NAME_LIMIT: usize = 256;
pub const FIELD_VALUE_LIMIT: usize = 1024;
pub const FIELD_COUNT_LIMIT: usize = 25;
/// Upper bound on a stored definition's serialized size.
pub const DEFINITION_SIZE_LIMIT: usize = 6000;

/// A custom embed as authored by server staff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedDefinition {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "deserialize_color")]
    pub color: Option<u32>,
    pub footer: Option<EmbedFooterDefinition>,
    pub thumbnail: Option<String>,
    pub image: Option<String>,
    pub author: Option<EmbedAuthorDefinition>,
    /// ISO-8601, with or without an offset.
    pub timestamp: Option<String>,
    pub fields: Vec<EmbedFieldDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedFooterDefinition {
    pub text: String,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedAuthorDefinition {
    pub name: String,
    pub url: Option<String>,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedFieldDefinition {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Colors may be stored as integers or as `0x`/`#` prefixed hex strings.
fn deserialize_color<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawColor {
        Number(u32),
        Text(String),
    }

    Ok(match Option::<RawColor>::deserialize(deserializer)? {
        Some(RawColor::Number(value)) => Some(value),
        Some(RawColor::Text(text)) => parse_color(&text),
        None => None,
    })
}

pub fn parse_color(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .or_else(|| trimmed.strip_prefix('#'));

    match hex {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => trimmed.parse::<u32>().ok(),
    }
}

impl EmbedDefinition {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn serialized_len(&self) -> usize {
        serde_json::to_string(self).map_or(usize::MAX, |json| json.len())
    }

    /// Run `substitute` over every string in the serialized definition and
    /// rebuild it.
    pub fn substituted(&self, substitute: impl Fn(&str) -> String) -> serde_json::Result<Self> {
        let mut value = serde_json::to_value(self)?;
        substitute_strings(&mut value, &substitute);
        serde_json::from_value(value)
    }
}

fn substitute_strings(value: &mut Value, substitute: &impl Fn(&str) -> String) {
    match value {
        Value::String(text) => *text = substitute(text),
        Value::Array(items) => items
            .iter_mut()
            .for_each(|item| substitute_strings(item, substitute)),
        Value::Object(map) => map
            .values_mut()
            .for_each(|item| substitute_strings(item, substitute)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Truncate to at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => text[..byte_index].to_owned(),
        None => text.to_owned(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

fn image(url: Option<&str>) -> Option<ImageSource> {
    non_empty(url).and_then(|url| ImageSource::url(url).ok())
}

fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    Timestamp::parse(raw)
        .or_else(|_| Timestamp::parse(&format!("{raw}+00:00")))
        .ok()
}

/// Build a Discord embed, silently truncating to platform limits and skipping
/// unusable URLs and timestamps.
pub fn render_embed(definition: &EmbedDefinition) -> Embed {
    let mut builder = EmbedBuilder::new();

    if let Some(title) = non_empty(definition.title.as_deref()) {
        builder = builder.title(truncate_chars(title, TITLE_LIMIT));
    }
    if let Some(description) = non_empty(definition.description.as_deref()) {
        builder = builder.description(truncate_chars(description, DESCRIPTION_LIMIT));
    }
    if let Some(color) = definition.color {
        builder = builder.color(color & 0xFF_FF_FF);
    }

    if let Some(footer) = &definition.footer
        && let Some(text) = non_empty(Some(&footer.text))
    {
        let mut footer_builder = EmbedFooterBuilder::new(truncate_chars(text, FOOTER_LIMIT));
        if let Some(icon) = image(footer.icon_url.as_deref()) {
            footer_builder = footer_builder.icon_url(icon);
        }
        builder = builder.footer(footer_builder.build());
    }

    if let Some(thumbnail) = image(definition.thumbnail.as_deref()) {
        builder = builder.thumbnail(thumbnail);
    }
    if let Some(main_image) = image(definition.image.as_deref()) {
        builder = builder.image(main_image);
    }

    if let Some(author) = &definition.author
        && let Some(name) = non_empty(Some(&author.name))
    {
        let mut author_builder = EmbedAuthorBuilder::new(truncate_chars(name, AUTHOR_NAME_LIMIT));
        if let Some(url) = non_empty(author.url.as_deref()) {
            author_builder = author_builder.url(url);
        }
        if let Some(icon) = image(author.icon_url.as_deref()) {
            author_builder = author_builder.icon_url(icon);
        }
        builder = builder.author(author_builder.build());
    }

    if let Some(timestamp) = non_empty(definition.timestamp.as_deref()).and_then(parse_timestamp) {
        builder = builder.timestamp(timestamp);
    }

    for field in definition.fields.iter().take(FIELD_COUNT_LIMIT) {
        let mut field_builder = EmbedFieldBuilder::new(
            truncate_chars(&field.name, FIELD_NAME_LIMIT),
            truncate_chars(&field.value, FIELD_VALUE_LIMIT),
        );
        if field.inline {
            field_builder = field_builder.inline();
        }
        builder = builder.field(field_builder.build());
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn render_truncates_to_platform_limits() {
        let definition = EmbedDefinition {
            title: Some("t".repeat(300)),
            description: Some("d".repeat(5000)),
            footer: Some(EmbedFooterDefinition {
                text: "f".repeat(3000),
                icon_url: None,
            }),
            fields: (0..30)
                .map(|i| EmbedFieldDefinition {
                    name: format!("{i}{}", "n".repeat(300)),
                    value: "v".repeat(2000),
                    inline: i % 2 == 0,
                })
                .collect(),
            ..EmbedDefinition::default()
        };

        let embed = render_embed(&definition);
        assert_eq!(embed.title.map(|t| t.chars().count()), Some(TITLE_LIMIT));
        assert_eq!(
            embed.description.map(|d| d.chars().count()),
            Some(DESCRIPTION_LIMIT)
        );
        assert_eq!(
            embed.footer.map(|f| f.text.chars().count()),
            Some(FOOTER_LIMIT)
        );
        assert_eq!(embed.fields.len(), FIELD_COUNT_LIMIT);
        assert!(embed.fields.iter().all(|f| f.name.chars().count() <= FIELD_NAME_LIMIT));
        assert!(embed.fields.iter().all(|f| f.value.chars().count() <= FIELD_VALUE_LIMIT));
    }

    #[test]
    fn invalid_urls_and_timestamps_are_skipped() {
        let definition = EmbedDefinition {
            title: Some("Rules".to_owned()),
            thumbnail: Some("not a url".to_owned()),
            timestamp: Some("yesterday".to_owned()),
            ..EmbedDefinition::default()
        };

        let embed = render_embed(&definition);
        assert_eq!(embed.title.as_deref(), Some("Rules"));
        assert!(embed.thumbnail.is_none());
        assert!(embed.timestamp.is_none());
    }

    #[test]
    fn naive_timestamps_are_read_as_utc() {
        let definition = EmbedDefinition {
            timestamp: Some("2025-08-07T12:00:00".to_owned()),
            ..EmbedDefinition::default()
        };
        assert!(render_embed(&definition).timestamp.is_some());
    }

    #[test]
    fn colors_accept_numbers_and_hex_strings() {
        let numeric = EmbedDefinition::from_json(r#"{"color": 65280}"#).unwrap();
        let hex = EmbedDefinition::from_json(r##"{"color": "#00FF00"}"##).unwrap();
        let prefixed = EmbedDefinition::from_json(r#"{"color": "0x00ff00"}"#).unwrap();
        assert_eq!(numeric.color, Some(0x00FF00));
        assert_eq!(hex.color, Some(0x00FF00));
        assert_eq!(prefixed.color, Some(0x00FF00));
    }

    #[test]
    fn substitution_reaches_nested_strings() {
        let definition = EmbedDefinition::from_json(
            r#"{
                "title": "Welcome {user_name}",
                "footer": {"text": "ID {user_id}"},
                "fields": [{"name": "Server", "value": "{server_name}", "inline": true}]
            }"#,
        )
        .unwrap();

        let out = definition
            .substituted(|text| {
                text.replace("{user_name}", "berry \"quoted\"")
                    .replace("{user_id}", "100")
                    .replace("{server_name}", "Orchard")
            })
            .unwrap();

        assert_eq!(out.title.as_deref(), Some("Welcome berry \"quoted\""));
        assert_eq!(out.footer.map(|f| f.text), Some("ID 100".to_owned()));
        assert_eq!(out.fields[0].value, "Orchard");
        assert!(out.fields[0].inline);
    }
}
