use twilight_model::{
    channel::message::embed::Embed,
    id::{Id, marker::UserMarker},
    util::ImageHash,
};
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder};

/// Default embed color used across the bot UI.
pub const DEFAULT_EMBED_COLOR: u32 = 0x90_54_30;
/// Color for destructive moderation actions.
pub const DANGER_EMBED_COLOR: u32 = 0xD9_3B_3B;

/// CDN URL of a user's avatar, falling back to the default avatar.
pub fn user_avatar_url(user_id: Id<UserMarker>, avatar: Option<ImageHash>) -> String {
    match avatar {
        Some(hash) => format!(
            "https://cdn.discordapp.com/avatars/{}/{hash}.png?size=128",
            user_id.get()
        ),
        None => format!(
            "https://cdn.discordapp.com/embed/avatars/{}.png",
            (user_id.get() >> 22) % 6
        ),
    }
}

/// A named embed field.
pub struct Field<'a> {
    pub name: &'a str,
    pub value: String,
    pub inline: bool,
}

impl<'a> Field<'a> {
    pub fn new(name: &'a str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            inline: false,
        }
    }

    pub fn inline(name: &'a str, value: impl Into<String>) -> Self {
        Self {
            inline: true,
            ..Self::new(name, value)
        }
    }
}

/// Build a standard embed with consistent styling.
pub fn build_embed(title: &str, description: impl Into<String>) -> anyhow::Result<Embed> {
    build_embed_with(title, description, DEFAULT_EMBED_COLOR, &[], None)
}

/// Build an embed with a color, fields and an optional footer.
///
/// Empty descriptions are left out so field-only embeds validate.
pub fn build_embed_with(
    title: &str,
    description: impl Into<String>,
    color: u32,
    fields: &[Field<'_>],
    footer: Option<&str>,
) -> anyhow::Result<Embed> {
    let description = description.into();
    let mut builder = EmbedBuilder::new().title(title).color(color);

    if !description.is_empty() {
        builder = builder.description(description);
    }
    for field in fields {
        let mut field_builder = EmbedFieldBuilder::new(field.name, field.value.as_str());
        if field.inline {
            field_builder = field_builder.inline();
        }
        builder = builder.field(field_builder.build());
    }
    if let Some(text) = footer.filter(|text| !text.is_empty()) {
        builder = builder.footer(EmbedFooterBuilder::new(text).build());
    }

    Ok(builder.validate()?.build())
}
