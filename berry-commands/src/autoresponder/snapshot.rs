//! Builds the read-only event snapshot a template is expanded against.

use twilight_model::{
    channel::{
        Channel,
        message::{EmojiReactionType, Mention, Reaction},
    },
    gateway::payload::incoming::MessageCreate,
    guild::{Guild, PartialMember},
    id::{
        Id,
        marker::{GuildMarker, UserMarker},
    },
    user::User,
    util::ImageHash,
};

use berry_core::Context;
use berry_database::guild_config::GuildConfigKey;
use berry_template::{
    ChannelSnapshot, EmojiSnapshot, ExpansionContext, GuildSnapshot, MemberSnapshot,
    MessageSnapshot, RoleSnapshot,
};
use berry_utils::embed::user_avatar_url;
use berry_utils::permissions::{
    Capability, CapabilityRequest, Subject, authorize, permissions_from_roles,
};
use berry_utils::time::snowflake_unix_secs;

use crate::access::configured_role;

/// Identity fields shared by full users and message mentions.
struct Identity<'a> {
    id: Id<UserMarker>,
    name: &'a str,
    global_name: Option<&'a str>,
    avatar: Option<ImageHash>,
    banner: Option<ImageHash>,
}

impl<'a> From<&'a User> for Identity<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: user.id,
            name: &user.name,
            global_name: user.global_name.as_deref(),
            avatar: user.avatar,
            banner: user.banner,
        }
    }
}

impl<'a> From<&'a Mention> for Identity<'a> {
    fn from(mention: &'a Mention) -> Self {
        Self {
            id: mention.id,
            name: &mention.name,
            global_name: None,
            avatar: mention.avatar,
            banner: None,
        }
    }
}

fn member_snapshot(user: Identity<'_>, member: Option<&PartialMember>) -> MemberSnapshot {
    let display_name = member
        .and_then(|member| member.nick.as_deref())
        .or(user.global_name)
        .unwrap_or(user.name)
        .to_owned();

    MemberSnapshot {
        id: user.id,
        name: user.name.to_owned(),
        display_name,
        avatar_url: user_avatar_url(user.id, user.avatar),
        banner_url: user.banner.map(|hash| {
            format!("https://cdn.discordapp.com/banners/{}/{hash}.png?size=512", user.id)
        }),
        joined_at: member
            .and_then(|member| member.joined_at)
            .map(|joined| joined.as_secs()),
        created_at: snowflake_unix_secs(user.id.get()),
        role_ids: member.map(|member| member.roles.clone()).unwrap_or_default(),
    }
}

fn guild_snapshot(guild: &Guild, channel_count: usize) -> GuildSnapshot {
    GuildSnapshot {
        id: guild.id,
        name: guild.name.clone(),
        icon_url: guild
            .icon
            .map(|hash| format!("https://cdn.discordapp.com/icons/{}/{hash}.png", guild.id)),
        created_at: snowflake_unix_secs(guild.id.get()),
        member_count: guild
            .approximate_member_count
            .or(guild.member_count)
            .unwrap_or_default(),
        boost_tier: u8::from(guild.premium_tier),
        boost_count: guild.premium_subscription_count.unwrap_or_default(),
        channel_count,
        roles: guild
            .roles
            .iter()
            .map(|role| RoleSnapshot {
                id: role.id,
                name: role.name.clone(),
                position: role.position,
            })
            .collect(),
        emojis: guild
            .emojis
            .iter()
            .map(|emoji| EmojiSnapshot {
                id: emoji.id,
                name: emoji.name.clone(),
                animated: emoji.animated,
            })
            .collect(),
    }
}

fn channel_snapshot(channel: &Channel) -> ChannelSnapshot {
    ChannelSnapshot {
        id: channel.id,
        name: channel.name.clone().unwrap_or_default(),
        last_message_at: channel
            .last_message_id
            .map(|id| snowflake_unix_secs(id.get())),
    }
}

/// Render a reaction as `emoji ×count`.
pub fn render_reaction(reaction: &Reaction) -> String {
    let emoji = match &reaction.emoji {
        EmojiReactionType::Unicode { name } => name.clone(),
        EmojiReactionType::Custom { animated, id, name } => {
            let name = name.as_deref().unwrap_or("emoji");
            let prefix = if *animated { "a" } else { "" };
            format!("<{prefix}:{name}:{id}>")
        }
    };
    format!("{emoji} ×{}", reaction.count)
}

/// Snapshot everything a template may read about `msg`.
pub async fn build_context(
    ctx: &Context,
    msg: &MessageCreate,
    guild_id: Id<GuildMarker>,
    prefix: &str,
) -> anyhow::Result<ExpansionContext> {
    let http = &ctx.http;
    let guild = http.guild(guild_id).with_counts(true).await?.model().await?;
    let channels = http.guild_channels(guild_id).await?.model().await?;

    let channel = match channels.iter().find(|channel| channel.id == msg.channel_id) {
        Some(channel) => channel_snapshot(channel),
        None => channel_snapshot(&http.channel(msg.channel_id).await?.model().await?),
    };

    let author = member_snapshot(Identity::from(&msg.author), msg.member.as_ref());
    let mention = msg
        .mentions
        .iter()
        .find(|mention| mention.id != msg.author.id)
        .map(|mention| member_snapshot(Identity::from(mention), mention.member.as_ref()));

    let permissions = permissions_from_roles(&guild, msg.author.id, &author.role_ids);
    let staff_role = configured_role(ctx, guild_id, GuildConfigKey::StaffRole).await;
    let elevated = authorize(
        &Subject {
            user_id: msg.author.id,
            role_ids: &author.role_ids,
            permissions,
        },
        &CapabilityRequest::new(Capability::ViewStaffVariables, staff_role),
    )
    .is_allowed();

    Ok(ExpansionContext {
        author,
        mention,
        channel,
        guild: guild_snapshot(&guild, channels.len()),
        message: MessageSnapshot {
            id: msg.id,
            content: msg.content.clone(),
            created_at: msg.timestamp.as_secs(),
            reactions: msg.reactions.iter().map(render_reaction).collect(),
        },
        prefix: prefix.to_owned(),
        elevated,
    })
}
