//! `{if:...}` gating.

use std::collections::HashSet;

use crate::context::ExpansionContext;
use crate::directive::{Condition, ConditionEffect, ConditionScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOutcome {
    Proceed,
    Suppress,
}

/// Whether a single condition's value names the current user, channel or role.
///
/// Matching is by display name, so two channels or roles sharing a name are
/// indistinguishable here.
pub fn matches(condition: &Condition, ctx: &ExpansionContext) -> bool {
    let value = condition.value.trim();
    match condition.scope {
        ConditionScope::User => ctx.author.display_name == value || ctx.author.name == value,
        ConditionScope::Channel => ctx.channel.name == value.strip_prefix('#').unwrap_or(value),
        ConditionScope::Role => ctx.author.has_role_named(&ctx.guild, value),
    }
}

/// Evaluate conditions in extraction order.
///
/// The first matching `ignore` suppresses the expansion. `allow` conditions act
/// as an allow-list per scope: when a scope has any, one of them must match.
pub fn evaluate(conditions: &[Condition], ctx: &ExpansionContext) -> ConditionOutcome {
    let mut allow_scopes = HashSet::new();
    let mut allowed_scopes = HashSet::new();

    for condition in conditions {
        let hit = matches(condition, ctx);
        match condition.effect {
            ConditionEffect::Ignore if hit => return ConditionOutcome::Suppress,
            ConditionEffect::Ignore => {}
            ConditionEffect::Allow => {
                allow_scopes.insert(condition.scope);
                if hit {
                    allowed_scopes.insert(condition.scope);
                }
            }
        }
    }

    if allow_scopes.is_subset(&allowed_scopes) {
        ConditionOutcome::Proceed
    } else {
        ConditionOutcome::Suppress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures::context;

    fn condition(scope: ConditionScope, value: &str, effect: ConditionEffect) -> Condition {
        Condition {
            scope,
            value: value.to_owned(),
            effect,
        }
    }

    #[test]
    fn ignore_in_matching_channel_suppresses() {
        let ctx = context();
        let conditions = [condition(
            ConditionScope::Channel,
            "general",
            ConditionEffect::Ignore,
        )];
        assert_eq!(evaluate(&conditions, &ctx), ConditionOutcome::Suppress);
    }

    #[test]
    fn ignore_in_other_channel_proceeds() {
        let mut ctx = context();
        ctx.channel.name = "memes".to_owned();
        let conditions = [condition(
            ConditionScope::Channel,
            "general",
            ConditionEffect::Ignore,
        )];
        assert_eq!(evaluate(&conditions, &ctx), ConditionOutcome::Proceed);
    }

    #[test]
    fn channel_value_may_carry_hash() {
        let ctx = context();
        let conditions = [condition(
            ConditionScope::Channel,
            "#general",
            ConditionEffect::Ignore,
        )];
        assert_eq!(evaluate(&conditions, &ctx), ConditionOutcome::Suppress);
    }

    #[test]
    fn role_condition_checks_membership() {
        let ctx = context();
        let staff = [condition(ConditionScope::Role, "Staff", ConditionEffect::Ignore)];
        let member = [condition(ConditionScope::Role, "Member", ConditionEffect::Ignore)];
        assert_eq!(evaluate(&staff, &ctx), ConditionOutcome::Proceed);
        assert_eq!(evaluate(&member, &ctx), ConditionOutcome::Suppress);
    }

    #[test]
    fn allow_conditions_form_an_allow_list_per_scope() {
        let ctx = context();
        let elsewhere = [
            condition(ConditionScope::Channel, "memes", ConditionEffect::Allow),
            condition(ConditionScope::Channel, "art", ConditionEffect::Allow),
        ];
        assert_eq!(evaluate(&elsewhere, &ctx), ConditionOutcome::Suppress);

        let here = [
            condition(ConditionScope::Channel, "memes", ConditionEffect::Allow),
            condition(ConditionScope::Channel, "general", ConditionEffect::Allow),
        ];
        assert_eq!(evaluate(&here, &ctx), ConditionOutcome::Proceed);
    }

    #[test]
    fn user_condition_matches_display_name() {
        let mut ctx = context();
        ctx.author.display_name = "Berry Bot".to_owned();
        let conditions = [condition(
            ConditionScope::User,
            "Berry Bot",
            ConditionEffect::Ignore,
        )];
        assert_eq!(evaluate(&conditions, &ctx), ConditionOutcome::Suppress);
    }
}
