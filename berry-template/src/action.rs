//! Action specs bound to interaction tags, resolved when a control fires.

use std::str::FromStr;

use twilight_model::id::{Id, marker::RoleMarker};

use crate::error::ExpansionError;

/// What happens when a tagged button or reaction is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSpec {
    RoleEdit(RoleEdit),
    /// Direct-message the acting user. `None` reuses the response text.
    Dm(Option<String>),
    /// Kept verbatim so the acting user can be told which action is unknown.
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleEdit {
    pub action: RoleAction,
    pub role_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleAction {
    #[default]
    Add,
    Remove,
}

impl FromStr for RoleAction {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            _ => Err(()),
        }
    }
}

/// Parse the fields after `role` in `{role[:add|remove]:<name>}`.
///
/// A single field is the role name with the default `add` action. With two or
/// more fields the first must be an action and the rest form the name, so role
/// names containing `:` survive.
pub fn parse_role_fields(fields: &[&str]) -> Result<RoleEdit, ExpansionError> {
    match fields {
        [] => Err(ExpansionError::MissingField {
            directive: "role",
            field: "role name",
        }),
        [name] => role_edit(RoleAction::Add, name),
        [action, rest @ ..] => {
            let action = action
                .parse::<RoleAction>()
                .map_err(|()| ExpansionError::InvalidValue {
                    directive: "role",
                    field: "action",
                    value: (*action).to_owned(),
                    expected: "add, remove",
                })?;
            role_edit(action, &rest.join(":"))
        }
    }
}

fn role_edit(action: RoleAction, name: &str) -> Result<RoleEdit, ExpansionError> {
    let role_name = name.trim();
    if role_name.is_empty() {
        return Err(ExpansionError::MissingField {
            directive: "role",
            field: "role name",
        });
    }

    Ok(RoleEdit {
        action,
        role_name: role_name.to_owned(),
    })
}

/// Parse the spec portion of `{action:<spec>:<tag>}`.
///
/// Accepts `role[:add|remove]:<name>` (optionally wrapped as `{role:...}`),
/// `dm` and `dm:<message>`. Anything else is kept as [`ActionSpec::Unknown`]
/// and reported when the control fires.
pub fn parse_action_spec(raw: &str) -> Result<ActionSpec, ExpansionError> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(trimmed);

    let (head, tail) = match inner.split_once(':') {
        Some((head, tail)) => (head, Some(tail)),
        None => (inner, None),
    };

    match head.trim().to_ascii_lowercase().as_str() {
        "role" => {
            let fields: Vec<&str> = tail.map(|t| t.split(':').collect()).unwrap_or_default();
            parse_role_fields(&fields).map(ActionSpec::RoleEdit)
        }
        "dm" => Ok(ActionSpec::Dm(
            tail.map(str::trim)
                .filter(|message| !message.is_empty())
                .map(ToOwned::to_owned),
        )),
        _ => Ok(ActionSpec::Unknown(trimmed.to_owned())),
    }
}

/// Minimal view of a guild role for name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSnapshot {
    pub id: Id<RoleMarker>,
    pub name: String,
    pub position: i64,
}

/// Find a role by exact name, preferring the highest positioned one when
/// several roles share the name.
pub fn resolve_role<'a>(roles: &'a [RoleSnapshot], name: &str) -> Option<&'a RoleSnapshot> {
    roles
        .iter()
        .filter(|role| role.name == name)
        .max_by_key(|role| role.position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_spec_defaults_to_add() {
        let spec = parse_action_spec("role:Member").unwrap();
        assert_eq!(
            spec,
            ActionSpec::RoleEdit(RoleEdit {
                action: RoleAction::Add,
                role_name: "Member".to_owned(),
            })
        );
    }

    #[test]
    fn braced_role_spec_with_remove() {
        let spec = parse_action_spec("{role:remove:Muted}").unwrap();
        assert_eq!(
            spec,
            ActionSpec::RoleEdit(RoleEdit {
                action: RoleAction::Remove,
                role_name: "Muted".to_owned(),
            })
        );
    }

    #[test]
    fn role_spec_with_bad_action_is_rejected() {
        let err = parse_action_spec("role:toggle:Member").unwrap_err();
        assert!(matches!(
            err,
            ExpansionError::InvalidValue { field: "action", .. }
        ));
    }

    #[test]
    fn role_spec_without_name_is_rejected() {
        assert!(parse_action_spec("role").is_err());
        assert!(parse_action_spec("role:add: ").is_err());
    }

    #[test]
    fn dm_spec_with_and_without_message() {
        assert_eq!(parse_action_spec("dm").unwrap(), ActionSpec::Dm(None));
        assert_eq!(
            parse_action_spec("dm:Thanks for verifying!").unwrap(),
            ActionSpec::Dm(Some("Thanks for verifying!".to_owned()))
        );
    }

    #[test]
    fn unrecognised_spec_passes_through() {
        assert_eq!(
            parse_action_spec("launch:rocket").unwrap(),
            ActionSpec::Unknown("launch:rocket".to_owned())
        );
    }

    #[test]
    fn resolve_role_prefers_highest_position() {
        let roles = vec![
            RoleSnapshot {
                id: Id::new(1),
                name: "Member".to_owned(),
                position: 1,
            },
            RoleSnapshot {
                id: Id::new(2),
                name: "Member".to_owned(),
                position: 5,
            },
            RoleSnapshot {
                id: Id::new(3),
                name: "Staff".to_owned(),
                position: 9,
            },
        ];

        assert_eq!(resolve_role(&roles, "Member").map(|r| r.id), Some(Id::new(2)));
        assert!(resolve_role(&roles, "member").is_none());
    }
}
