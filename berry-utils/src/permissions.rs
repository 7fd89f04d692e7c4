use std::fmt;

use twilight_http::Client;
use twilight_model::{
    gateway::payload::incoming::MessageCreate,
    guild::{Guild, Permissions},
    id::{
        Id,
        marker::{GuildMarker, RoleMarker, UserMarker},
    },
};

/// Something a member may want to do that is gated per guild.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Capability {
    EditAutoresponder,
    EditEmbed,
    /// Carries the Discord permission the specific action needs.
    Moderate(Permissions),
    ConfigureServer,
    ViewStaffVariables,
}

impl Capability {
    /// Discord permission that grants the capability on its own.
    pub fn required_permission(self) -> Permissions {
        match self {
            Self::EditAutoresponder | Self::EditEmbed | Self::ConfigureServer => {
                Permissions::MANAGE_GUILD
            }
            Self::Moderate(permission) => permission,
            Self::ViewStaffVariables => Permissions::MANAGE_MESSAGES,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::EditAutoresponder => "edit autoresponders",
            Self::EditEmbed => "edit embeds",
            Self::Moderate(_) => "use moderation commands",
            Self::ConfigureServer => "change server settings",
            Self::ViewStaffVariables => "use staff-only variables",
        }
    }
}

/// The member asking.
#[derive(Clone, Copy, Debug)]
pub struct Subject<'a> {
    pub user_id: Id<UserMarker>,
    pub role_ids: &'a [Id<RoleMarker>],
    pub permissions: Permissions,
}

/// A capability check, optionally scoped to one owned resource.
#[derive(Clone, Copy, Debug)]
pub struct CapabilityRequest<'a> {
    pub capability: Capability,
    /// Guild-configured role that grants the capability.
    pub granting_role: Option<Id<RoleMarker>>,
    /// Creator of the resource being changed.
    pub owner: Option<Id<UserMarker>>,
    /// Users the owner has allowed to edit the resource.
    pub editors: &'a [Id<UserMarker>],
}

impl<'a> CapabilityRequest<'a> {
    pub fn new(capability: Capability, granting_role: Option<Id<RoleMarker>>) -> Self {
        Self {
            capability,
            granting_role,
            owner: None,
            editors: &[],
        }
    }

    pub fn on_resource(mut self, owner: Id<UserMarker>, editors: &'a [Id<UserMarker>]) -> Self {
        self.owner = Some(owner);
        self.editors = editors;
        self
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Grant {
    Administrator,
    Permission,
    Role,
    Creator,
    Editor,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Allow(Grant),
    Deny(Capability),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow(_))
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow(grant) => write!(f, "allowed ({grant:?})"),
            Self::Deny(capability) => {
                write!(f, "You don't have permission to {}.", capability.describe())
            }
        }
    }
}

/// Single authorization rule shared by every gated command.
///
/// Administrators always pass. Otherwise the member needs the capability's
/// Discord permission, the configured granting role, or (for owned
/// resources) to be the creator or a listed editor.
pub fn authorize(subject: &Subject<'_>, request: &CapabilityRequest<'_>) -> Decision {
    if subject.permissions.contains(Permissions::ADMINISTRATOR) {
        return Decision::Allow(Grant::Administrator);
    }
    if subject
        .permissions
        .contains(request.capability.required_permission())
    {
        return Decision::Allow(Grant::Permission);
    }
    if let Some(role) = request.granting_role
        && subject.role_ids.contains(&role)
    {
        return Decision::Allow(Grant::Role);
    }
    if request.owner == Some(subject.user_id) {
        return Decision::Allow(Grant::Creator);
    }
    if request.editors.contains(&subject.user_id) {
        return Decision::Allow(Grant::Editor);
    }

    Decision::Deny(request.capability)
}

/// Resolve the invoking author's effective guild permissions for a message command.
///
/// Returns `Ok(None)` when the message is not from a guild context.
pub async fn resolve_message_author_permissions(
    http: &Client,
    msg: &MessageCreate,
) -> anyhow::Result<Option<Permissions>> {
    if let Some(perms) = msg.member.as_ref().and_then(|m| m.permissions) {
        return Ok(Some(perms));
    }

    let Some(guild_id) = msg.guild_id else {
        return Ok(None);
    };

    let member_roles = match msg.member.as_ref() {
        Some(member) => member.roles.clone(),
        None => {
            http.guild_member(guild_id, msg.author.id)
                .await?
                .model()
                .await?
                .roles
        }
    };

    resolve_member_permissions(http, guild_id, msg.author.id, &member_roles)
        .await
        .map(Some)
}

/// Guild-level permissions of a member from their role list.
///
/// The guild owner holds every permission.
pub async fn resolve_member_permissions(
    http: &Client,
    guild_id: Id<GuildMarker>,
    user_id: Id<UserMarker>,
    member_roles: &[Id<RoleMarker>],
) -> anyhow::Result<Permissions> {
    let guild = http.guild(guild_id).await?.model().await?;
    Ok(permissions_from_roles(&guild, user_id, member_roles))
}

/// Fold a member's role permissions using an already fetched guild.
pub fn permissions_from_roles(
    guild: &Guild,
    user_id: Id<UserMarker>,
    member_roles: &[Id<RoleMarker>],
) -> Permissions {
    if guild.owner_id == user_id {
        return Permissions::all();
    }

    guild
        .roles
        .iter()
        .filter(|role| role.id == guild.id.cast() || member_roles.contains(&role.id))
        .fold(Permissions::empty(), |acc, role| acc | role.permissions)
}

/// Build a [`Subject`] for the author of `msg`.
///
/// Outside a guild the subject has no roles and no permissions.
pub async fn message_subject<'a>(
    http: &Client,
    msg: &'a MessageCreate,
) -> anyhow::Result<Subject<'a>> {
    let permissions = resolve_message_author_permissions(http, msg)
        .await?
        .unwrap_or_else(Permissions::empty);

    Ok(Subject {
        user_id: msg.author.id,
        role_ids: msg
            .member
            .as_ref()
            .map_or(&[][..], |member| member.roles.as_slice()),
        permissions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAFF: Id<RoleMarker> = Id::new(21);

    fn subject(permissions: Permissions, roles: &[Id<RoleMarker>]) -> Subject<'_> {
        Subject {
            user_id: Id::new(100),
            role_ids: roles,
            permissions,
        }
    }

    #[test]
    fn administrator_passes_everything() {
        let admin = subject(Permissions::ADMINISTRATOR, &[]);
        let request = CapabilityRequest::new(Capability::Moderate(Permissions::BAN_MEMBERS), None);
        assert_eq!(authorize(&admin, &request), Decision::Allow(Grant::Administrator));
    }

    #[test]
    fn moderation_needs_the_specific_permission() {
        let kicker = subject(Permissions::KICK_MEMBERS, &[]);
        let kick = CapabilityRequest::new(Capability::Moderate(Permissions::KICK_MEMBERS), None);
        let ban = CapabilityRequest::new(Capability::Moderate(Permissions::BAN_MEMBERS), None);

        assert!(authorize(&kicker, &kick).is_allowed());
        assert!(!authorize(&kicker, &ban).is_allowed());
    }

    #[test]
    fn configured_role_grants_capability() {
        let roles = [STAFF];
        let staff = subject(Permissions::empty(), &roles);
        let request = CapabilityRequest::new(Capability::ViewStaffVariables, Some(STAFF));
        assert_eq!(authorize(&staff, &request), Decision::Allow(Grant::Role));

        let nobody = subject(Permissions::empty(), &[]);
        assert_eq!(
            authorize(&nobody, &request),
            Decision::Deny(Capability::ViewStaffVariables)
        );
    }

    #[test]
    fn creators_and_editors_may_edit_their_resources() {
        let member = subject(Permissions::empty(), &[]);
        let editors = [Id::new(100)];

        let own = CapabilityRequest::new(Capability::EditAutoresponder, None)
            .on_resource(Id::new(100), &[]);
        let shared = CapabilityRequest::new(Capability::EditEmbed, None)
            .on_resource(Id::new(5), &editors);
        let foreign = CapabilityRequest::new(Capability::EditEmbed, None)
            .on_resource(Id::new(5), &[]);

        assert_eq!(authorize(&member, &own), Decision::Allow(Grant::Creator));
        assert_eq!(authorize(&member, &shared), Decision::Allow(Grant::Editor));
        assert!(!authorize(&member, &foreign).is_allowed());
    }

    #[test]
    fn deny_reason_names_the_capability() {
        let decision = Decision::Deny(Capability::EditEmbed);
        assert_eq!(decision.to_string(), "You don't have permission to edit embeds.");
    }
}
