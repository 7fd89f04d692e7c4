//! Directive extraction and shape validation.
//!
//! Each directive type has a fixed bracket grammar:
//! - `{react:<emoji>}`
//! - `{interaction:<reaction|button>:<value>[:<tag>]}`
//! - `{action:<spec>:<tag>}`
//! - `{dm[:user|mention]}`
//! - `{delete_response[:<seconds>]}`
//! - `{delete}`
//! - `{if:<user|channel|role>:<value>[:allow|ignore]}`
//! - `{role[:add|remove]:<name>}`
//! - `{embed:<name>}`
//!
//! Types are extracted one after another in that order, and every match is
//! removed from the working text before the next type is scanned.

use std::sync::LazyLock;

use regex::Regex;

use crate::action::{ActionSpec, parse_action_spec};
use crate::directive::{
    Condition, ConditionEffect, ConditionScope, DEFAULT_DELETE_DELAY_SECS, Directive, DmTarget,
    Interaction, InteractionKind,
};
use crate::error::ExpansionError;

/// Discord allows five rows of five buttons.
pub const MAX_BUTTONS: usize = 25;

/// Longest delay `{delete_response}` accepts: one day.
pub const MAX_DELETE_DELAY_SECS: u64 = 86_400;

/// `{name}` or `{name:<body>}`. Bodies may hold one level of nested braces,
/// e.g. `{action:{role:add:Member}:verify}` or `{interaction:button:Hi {user_name}:hi}`.
fn directive_pattern(name: &str) -> Regex {
    Regex::new(&format!(r"\{{{name}(?::((?:\{{[^{{}}]*\}}|[^{{}}])*))?\}}")).expect("valid regex")
}

static REACT_RE: LazyLock<Regex> = LazyLock::new(|| directive_pattern("react"));
static INTERACTION_RE: LazyLock<Regex> = LazyLock::new(|| directive_pattern("interaction"));
static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| directive_pattern("action"));
static DM_RE: LazyLock<Regex> = LazyLock::new(|| directive_pattern("dm"));
static DELETE_RESPONSE_RE: LazyLock<Regex> =
    LazyLock::new(|| directive_pattern("delete_response"));
static DELETE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{delete\}").expect("valid regex"));
static IF_RE: LazyLock<Regex> = LazyLock::new(|| directive_pattern("if"));
static ROLE_RE: LazyLock<Regex> = LazyLock::new(|| directive_pattern("role"));
static EMBED_RE: LazyLock<Regex> = LazyLock::new(|| directive_pattern("embed"));
// Anything still opening like a directive after extraction is unclosed or
// nested too deeply.
static LEFTOVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(react|interaction|action|dm|delete_response|delete|if|role|embed)[:}]")
        .expect("valid regex")
});

/// A tag bound to an action spec by `{action:...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBinding {
    pub tag: String,
    pub spec: ActionSpec,
}

/// Literal text left after extraction plus the directives found, per type,
/// in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    pub reactions: Vec<String>,
    pub interactions: Vec<Interaction>,
    pub actions: Vec<ActionBinding>,
    pub dm: Vec<DmTarget>,
    pub delayed_delete: Vec<u64>,
    pub delete: usize,
    pub conditions: Vec<Condition>,
    pub embeds: Vec<String>,
}

impl Extracted {
    /// Flatten into directive records in extraction order.
    pub fn directives(&self) -> Vec<Directive> {
        let mut out = Vec::new();
        out.extend(self.reactions.iter().cloned().map(Directive::React));
        out.extend(self.interactions.iter().cloned().map(Directive::Interaction));
        out.extend(self.actions.iter().map(|binding| Directive::Action {
            tag: binding.tag.clone(),
            spec: binding.spec.clone(),
        }));
        out.extend(self.dm.iter().copied().map(Directive::Dm));
        out.extend(self.delayed_delete.iter().copied().map(Directive::DelayedDelete));
        out.extend(std::iter::repeat_n(Directive::Delete, self.delete));
        out.extend(self.conditions.iter().cloned().map(Directive::Condition));
        out.extend(self.embeds.iter().cloned().map(Directive::EmbedRef));
        out
    }

    pub fn action_for(&self, tag: &str) -> Option<&ActionSpec> {
        self.actions
            .iter()
            .find(|binding| binding.tag == tag)
            .map(|binding| &binding.spec)
    }
}

/// Split a directive body on `:` while keeping `{...}` and Discord markup such
/// as `<:name:id>` or `<@id>` intact.
fn split_fields(body: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut braces = 0_usize;
    let mut markup = false;
    let mut start = 0;
    let mut chars = body.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        match ch {
            '{' => braces += 1,
            '}' => braces = braces.saturating_sub(1),
            '<' if matches!(chars.peek(), Some((_, '@' | '#' | ':' | 'a' | 't'))) => markup = true,
            '>' => markup = false,
            ':' if braces == 0 && !markup => {
                fields.push(&body[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }

    fields.push(&body[start..]);
    fields
}

/// Collect the optional body capture of every match, then strip the matches.
fn take_all(re: &Regex, text: &mut String) -> Vec<Option<String>> {
    let bodies = re
        .captures_iter(text)
        .map(|caps| caps.get(1).map(|body| body.as_str().to_owned()))
        .collect::<Vec<_>>();

    if !bodies.is_empty() {
        *text = re.replace_all(text, "").into_owned();
    }

    bodies
}

fn required<'a>(
    value: Option<&'a str>,
    directive: &'static str,
    field: &'static str,
) -> Result<&'a str, ExpansionError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ExpansionError::MissingField { directive, field })
}

fn parse_interaction(body: Option<&str>) -> Result<Interaction, ExpansionError> {
    let fields = body.map(split_fields).unwrap_or_default();

    let kind_raw = required(fields.first().copied(), "interaction", "type")?;
    let kind = kind_raw
        .parse::<InteractionKind>()
        .map_err(|()| ExpansionError::InvalidValue {
            directive: "interaction",
            field: "type",
            value: kind_raw.to_owned(),
            expected: "reaction, button",
        })?;

    let (value, tag) = match fields.len() {
        0 | 1 => (None, None),
        2 => (Some(fields[1].to_owned()), None),
        n => (Some(fields[1..n - 1].join(":")), Some(fields[n - 1])),
    };

    let value = required(value.as_deref(), "interaction", "value")?.to_owned();
    let tag = tag
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map_or_else(|| value.clone(), ToOwned::to_owned);

    Ok(Interaction { kind, value, tag })
}

fn parse_action(body: Option<&str>) -> Result<ActionBinding, ExpansionError> {
    let fields = body.map(split_fields).unwrap_or_default();
    let Some((tag, spec_fields)) = fields.split_last() else {
        return Err(ExpansionError::MissingField {
            directive: "action",
            field: "action",
        });
    };

    let spec = spec_fields.join(":");
    let spec = required(Some(&spec), "action", "action")?;
    let tag = required(Some(tag), "action", "tag")?;

    Ok(ActionBinding {
        tag: tag.to_owned(),
        spec: parse_action_spec(spec)?,
    })
}

fn parse_dm(body: Option<&str>) -> Result<DmTarget, ExpansionError> {
    match body.map(str::trim).filter(|target| !target.is_empty()) {
        None => Ok(DmTarget::default()),
        Some(target) => target
            .parse::<DmTarget>()
            .map_err(|()| ExpansionError::InvalidValue {
                directive: "dm",
                field: "target",
                value: target.to_owned(),
                expected: "user, mention",
            }),
    }
}

fn parse_delay(body: Option<&str>) -> Result<u64, ExpansionError> {
    match body.map(str::trim).filter(|delay| !delay.is_empty()) {
        None => Ok(DEFAULT_DELETE_DELAY_SECS),
        Some(delay) => delay
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs <= MAX_DELETE_DELAY_SECS)
            .ok_or_else(|| ExpansionError::InvalidValue {
                directive: "delete_response",
                field: "delay",
                value: delay.to_owned(),
                expected: "a whole number of seconds up to 86400",
            }),
    }
}

fn parse_condition(body: Option<&str>) -> Result<Condition, ExpansionError> {
    let fields = body.map(split_fields).unwrap_or_default();

    let scope_raw = required(fields.first().copied(), "if", "scope")?;
    let scope = scope_raw
        .parse::<ConditionScope>()
        .map_err(|()| ExpansionError::InvalidValue {
            directive: "if",
            field: "scope",
            value: scope_raw.to_owned(),
            expected: "user, channel, role",
        })?;

    let (value, effect) = match fields.len() {
        0 | 1 => (None, ConditionEffect::default()),
        2 => (Some(fields[1].to_owned()), ConditionEffect::default()),
        n => {
            let effect_raw = fields[n - 1].trim();
            let effect = effect_raw
                .parse::<ConditionEffect>()
                .map_err(|()| ExpansionError::InvalidValue {
                    directive: "if",
                    field: "effect",
                    value: effect_raw.to_owned(),
                    expected: "allow, ignore",
                })?;
            (Some(fields[1..n - 1].join(":")), effect)
        }
    };

    let value = required(value.as_deref(), "if", "value")?.to_owned();
    Ok(Condition {
        scope,
        value,
        effect,
    })
}

/// Scan `template`, stripping every directive and checking its shape.
///
/// Fails on the first malformed directive.
pub fn extract(template: &str) -> Result<Extracted, ExpansionError> {
    let mut text = template.to_owned();
    let mut out = Extracted::default();

    for body in take_all(&REACT_RE, &mut text) {
        out.reactions
            .push(required(body.as_deref(), "react", "emoji")?.to_owned());
    }
    for body in take_all(&INTERACTION_RE, &mut text) {
        out.interactions.push(parse_interaction(body.as_deref())?);
    }
    for body in take_all(&ACTION_RE, &mut text) {
        out.actions.push(parse_action(body.as_deref())?);
    }
    for body in take_all(&DM_RE, &mut text) {
        out.dm.push(parse_dm(body.as_deref())?);
    }
    for body in take_all(&DELETE_RESPONSE_RE, &mut text) {
        out.delayed_delete.push(parse_delay(body.as_deref())?);
    }
    out.delete = take_all(&DELETE_RE, &mut text).len();
    for body in take_all(&IF_RE, &mut text) {
        out.conditions.push(parse_condition(body.as_deref())?);
    }
    // Role edits only run when a bound control fires.
    if ROLE_RE.is_match(&text) {
        return Err(ExpansionError::RoleOutsideAction);
    }
    for body in take_all(&EMBED_RE, &mut text) {
        out.embeds
            .push(required(body.as_deref(), "embed", "name")?.to_owned());
    }

    if let Some(caps) = LEFTOVER_RE.captures(&text) {
        return Err(ExpansionError::Malformed {
            directive: caps[1].to_owned(),
        });
    }

    out.text = text;
    Ok(out)
}

/// Cross-directive checks that need the full extraction.
pub fn validate(extracted: &Extracted) -> Result<(), ExpansionError> {
    let singletons = [
        ("embed", extracted.embeds.len()),
        ("dm", extracted.dm.len()),
        ("delete", extracted.delete),
        ("delete_response", extracted.delayed_delete.len()),
    ];
    if let Some((directive, _)) = singletons.into_iter().find(|(_, count)| *count > 1) {
        return Err(ExpansionError::Duplicate { directive });
    }

    if let Some(unbound) = extracted
        .interactions
        .iter()
        .find(|interaction| extracted.action_for(&interaction.tag).is_none())
    {
        return Err(ExpansionError::UnboundInteraction {
            tag: unbound.tag.clone(),
        });
    }

    let buttons = extracted
        .interactions
        .iter()
        .filter(|interaction| interaction.kind == InteractionKind::Button)
        .count();
    if buttons > MAX_BUTTONS {
        return Err(ExpansionError::TooManyButtons { max: MAX_BUTTONS });
    }

    Ok(())
}

/// [`extract`] followed by [`validate`].
pub fn parse(template: &str) -> Result<Extracted, ExpansionError> {
    let extracted = extract(template)?;
    validate(&extracted)?;
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{RoleAction, RoleEdit};

    #[test]
    fn literal_text_passes_through() {
        let extracted = parse("  just some words, nothing else  ").unwrap();
        assert_eq!(extracted.text, "  just some words, nothing else  ");
        assert!(extracted.directives().is_empty());
    }

    #[test]
    fn reactions_keep_declaration_order() {
        let extracted = parse("hot {react:🔥}{react:✅} take").unwrap();
        assert_eq!(extracted.reactions, vec!["🔥", "✅"]);
        assert_eq!(extracted.text, "hot  take");
    }

    #[test]
    fn interaction_with_custom_emoji_value() {
        let extracted =
            parse("{interaction:reaction:<:blob:900>:wave}{action:dm:hi:wave}").unwrap();
        assert_eq!(
            extracted.interactions,
            vec![Interaction {
                kind: InteractionKind::Reaction,
                value: "<:blob:900>".to_owned(),
                tag: "wave".to_owned(),
            }]
        );
    }

    #[test]
    fn interaction_tag_defaults_to_value() {
        let extracted = parse("{interaction:button:Verify}{action:role:Member:Verify}").unwrap();
        assert_eq!(extracted.interactions[0].tag, "Verify");
    }

    #[test]
    fn interaction_without_action_is_rejected() {
        let err = parse("Press it {interaction:button:Confirm:confirm1}").unwrap_err();
        assert_eq!(
            err,
            ExpansionError::UnboundInteraction {
                tag: "confirm1".to_owned()
            }
        );
    }

    #[test]
    fn interaction_missing_fields_are_rejected() {
        assert!(matches!(
            extract("{interaction}").unwrap_err(),
            ExpansionError::MissingField { field: "type", .. }
        ));
        assert!(matches!(
            extract("{interaction:button}").unwrap_err(),
            ExpansionError::MissingField { field: "value", .. }
        ));
        assert!(matches!(
            extract("{interaction:slider:x:y}").unwrap_err(),
            ExpansionError::InvalidValue { field: "type", .. }
        ));
    }

    #[test]
    fn action_accepts_nested_role_spec() {
        let extracted = extract("{action:{role:remove:Muted}:unmute}").unwrap();
        assert_eq!(
            extracted.actions,
            vec![ActionBinding {
                tag: "unmute".to_owned(),
                spec: ActionSpec::RoleEdit(RoleEdit {
                    action: RoleAction::Remove,
                    role_name: "Muted".to_owned(),
                }),
            }]
        );
        assert_eq!(extracted.text, "");
    }

    #[test]
    fn action_without_tag_is_rejected() {
        assert!(matches!(
            extract("{action:dm}").unwrap_err(),
            ExpansionError::MissingField { .. }
        ));
    }

    #[test]
    fn dm_target_defaults_and_validates() {
        assert_eq!(extract("{dm}").unwrap().dm, vec![DmTarget::User]);
        assert_eq!(extract("{dm:mention}").unwrap().dm, vec![DmTarget::Mention]);
        assert!(matches!(
            extract("{dm:everyone}").unwrap_err(),
            ExpansionError::InvalidValue { directive: "dm", .. }
        ));
    }

    #[test]
    fn delete_and_delete_response_are_distinct() {
        let extracted = extract("bye {delete}{delete_response}").unwrap();
        assert_eq!(extracted.delete, 1);
        assert_eq!(extracted.delayed_delete, vec![DEFAULT_DELETE_DELAY_SECS]);
        assert_eq!(extracted.text, "bye ");

        assert_eq!(extract("{delete_response:30}").unwrap().delayed_delete, vec![30]);
        assert!(extract("{delete_response:soon}").is_err());
    }

    #[test]
    fn conditions_parse_scope_value_and_effect() {
        let extracted = extract("{if:channel:general:ignore}{if:role:Staff}").unwrap();
        assert_eq!(
            extracted.conditions,
            vec![
                Condition {
                    scope: ConditionScope::Channel,
                    value: "general".to_owned(),
                    effect: ConditionEffect::Ignore,
                },
                Condition {
                    scope: ConditionScope::Role,
                    value: "Staff".to_owned(),
                    effect: ConditionEffect::Allow,
                },
            ]
        );
    }

    #[test]
    fn condition_value_may_hold_placeholder() {
        let extracted = extract("{if:user:{mention_name}:ignore}").unwrap();
        assert_eq!(extracted.conditions[0].value, "{mention_name}");
    }

    #[test]
    fn invalid_condition_scope_is_rejected() {
        let err = parse("{react:🔥} hi {if:invalid_scope:x}").unwrap_err();
        assert!(matches!(
            err,
            ExpansionError::InvalidValue {
                directive: "if",
                field: "scope",
                ..
            }
        ));
        assert!(err.to_string().contains("invalid_scope"));
    }

    #[test]
    fn invalid_condition_effect_is_rejected() {
        assert!(matches!(
            extract("{if:channel:general:maybe}").unwrap_err(),
            ExpansionError::InvalidValue { field: "effect", .. }
        ));
    }

    #[test]
    fn role_outside_action_is_rejected() {
        assert_eq!(
            extract("hi {role:Admin}").unwrap_err(),
            ExpansionError::RoleOutsideAction
        );
        assert_eq!(
            extract("{role:remove:Guest}").unwrap_err(),
            ExpansionError::RoleOutsideAction
        );
    }

    #[test]
    fn directive_values_may_hold_placeholders() {
        let extracted =
            parse("Click {interaction:button:Hi {user_name}:t}{action:dm:t}").unwrap();
        assert_eq!(extracted.text, "Click ");
        assert_eq!(extracted.interactions[0].value, "Hi {user_name}");
        assert_eq!(extracted.interactions[0].tag, "t");

        assert_eq!(extract("{embed:{user_name}}").unwrap().embeds, vec!["{user_name}"]);
        assert!(matches!(
            extract("{dm:{mention}}").unwrap_err(),
            ExpansionError::InvalidValue { directive: "dm", .. }
        ));
    }

    #[test]
    fn unclosed_or_deeply_nested_directives_are_rejected() {
        assert_eq!(
            extract("Click {interaction:button:Go").unwrap_err(),
            ExpansionError::Malformed {
                directive: "interaction".to_owned()
            }
        );
        assert_eq!(
            extract("{embed:{a{b}}}").unwrap_err(),
            ExpansionError::Malformed {
                directive: "embed".to_owned()
            }
        );
        assert!(matches!(
            extract("{react}").unwrap_err(),
            ExpansionError::MissingField { directive: "react", .. }
        ));
    }

    #[test]
    fn delete_delay_is_capped_at_a_day() {
        assert_eq!(
            extract("{delete_response:86400}").unwrap().delayed_delete,
            vec![MAX_DELETE_DELAY_SECS]
        );
        assert!(matches!(
            extract("{delete_response:86401}").unwrap_err(),
            ExpansionError::InvalidValue { field: "delay", .. }
        ));
        assert!(extract("{delete_response:99999999999999999999}").is_err());
    }

    #[test]
    fn duplicate_singletons_are_rejected() {
        assert_eq!(
            parse("{embed:a}{embed:b}").unwrap_err(),
            ExpansionError::Duplicate { directive: "embed" }
        );
        assert_eq!(
            parse("{delete}{delete}").unwrap_err(),
            ExpansionError::Duplicate { directive: "delete" }
        );
        assert_eq!(
            parse("{dm}{dm}").unwrap_err(),
            ExpansionError::Duplicate { directive: "dm" }
        );
        assert_eq!(
            parse("{delete_response}{delete_response:3}").unwrap_err(),
            ExpansionError::Duplicate {
                directive: "delete_response"
            }
        );
    }

    #[test]
    fn button_count_is_limited() {
        let buttons = |count: usize| {
            (0..count)
                .map(|n| format!("{{interaction:button:B{n}:b{n}}}{{action:dm:b{n}}}"))
                .collect::<String>()
        };

        assert_eq!(parse(&buttons(MAX_BUTTONS)).unwrap().interactions.len(), 25);
        assert_eq!(
            parse(&buttons(MAX_BUTTONS + 1)).unwrap_err(),
            ExpansionError::TooManyButtons { max: MAX_BUTTONS }
        );
    }

    #[test]
    fn placeholders_are_left_for_substitution() {
        let extracted = parse("hi {user} in {channel}").unwrap();
        assert_eq!(extracted.text, "hi {user} in {channel}");
    }

    #[test]
    fn split_fields_keeps_markup_together() {
        assert_eq!(
            split_fields("reaction:<a:party:123>:tag"),
            vec!["reaction", "<a:party:123>", "tag"]
        );
        assert_eq!(split_fields("user:{user_name}:ignore"), vec!["user", "{user_name}", "ignore"]);
    }
}
