//! Parsed directive records and the closed vocabularies they draw from.

use std::str::FromStr;

use crate::action::ActionSpec;

/// One instruction extracted from a template.
///
/// Role edits only appear inside [`Directive::Action`] as
/// [`ActionSpec::RoleEdit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    React(String),
    Interaction(Interaction),
    Action { tag: String, spec: ActionSpec },
    Dm(DmTarget),
    Delete,
    DelayedDelete(u64),
    Condition(Condition),
    EmbedRef(String),
}

impl Directive {
    /// The name written after `{` in a template.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::React(_) => "react",
            Self::Interaction(_) => "interaction",
            Self::Action { .. } => "action",
            Self::Dm(_) => "dm",
            Self::Delete => "delete",
            Self::DelayedDelete(_) => "delete_response",
            Self::Condition(_) => "if",
            Self::EmbedRef(_) => "embed",
        }
    }
}

/// Default delay for `{delete_response}` without an explicit value.
pub const DEFAULT_DELETE_DELAY_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub kind: InteractionKind,
    pub value: String,
    pub tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Reaction,
    Button,
}

impl FromStr for InteractionKind {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reaction" => Ok(Self::Reaction),
            "button" => Ok(Self::Button),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DmTarget {
    #[default]
    User,
    Mention,
}

impl FromStr for DmTarget {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "mention" => Ok(Self::Mention),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub scope: ConditionScope,
    pub value: String,
    pub effect: ConditionEffect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionScope {
    User,
    Channel,
    Role,
}

impl FromStr for ConditionScope {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "channel" => Ok(Self::Channel),
            "role" => Ok(Self::Role),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionEffect {
    #[default]
    Allow,
    Ignore,
}

impl FromStr for ConditionEffect {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "ignore" => Ok(Self::Ignore),
            _ => Err(()),
        }
    }
}
