//! The expansion pipeline: extract, validate, substitute, gate, assemble.

use async_trait::async_trait;
use tracing::warn;
use twilight_model::{
    channel::message::{
        component::{ActionRow, Button, ButtonStyle, Component},
        embed::Embed,
    },
    id::{
        Id,
        marker::{GuildMarker, UserMarker},
    },
};

use crate::action::ActionSpec;
use crate::condition::{ConditionOutcome, evaluate};
use crate::context::ExpansionContext;
use crate::directive::{DmTarget, InteractionKind};
use crate::embed::{EmbedDefinition, render_embed};
use crate::emoji::{ReactionEmoji, resolve_guild_emoji};
use crate::error::ExpansionError;
use crate::extract::{ActionBinding, parse};
use crate::placeholders::{Substitutor, needs_infraction_count};

/// Custom id prefix for buttons produced by templates.
pub const BUTTON_ID_PREFIX: &str = "tpl:";

const BUTTONS_PER_ROW: usize = 5;

/// Storage the engine reads from while expanding.
#[async_trait]
pub trait ExpansionStore: Send + Sync {
    /// Raw JSON of a guild's named embed definition.
    async fn embed(&self, guild_id: Id<GuildMarker>, name: &str) -> anyhow::Result<Option<String>>;

    async fn infraction_count(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> anyhow::Result<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSpec {
    pub label: String,
    pub tag: String,
    pub action: ActionSpec,
}

impl ButtonSpec {
    pub fn custom_id(&self) -> String {
        format!("{BUTTON_ID_PREFIX}{}", self.tag)
    }
}

/// Tag carried by a template button's custom id.
pub fn tag_from_custom_id(custom_id: &str) -> Option<&str> {
    custom_id.strip_prefix(BUTTON_ID_PREFIX)
}

/// A reaction placed on the response that fires the action bound to `tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionBinding {
    pub emoji: ReactionEmoji,
    pub tag: String,
}

/// A fully resolved template, ready for the chat runtime to deliver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpansionResult {
    pub text: String,
    /// Emoji from `{react}` for the triggering message, in declaration order.
    pub reactions: Vec<ReactionEmoji>,
    pub reaction_bindings: Vec<ReactionBinding>,
    pub buttons: Vec<ButtonSpec>,
    pub embed: Option<Embed>,
    /// Receives a copy of the text when `{dm}` is present.
    pub dm_recipient: Option<Id<UserMarker>>,
    pub delete_trigger: bool,
    /// Seconds after which the response removes itself.
    pub delete_after: Option<u64>,
    pub actions: Vec<ActionBinding>,
}

impl ExpansionResult {
    /// Whether there is anything to post as a message.
    pub fn has_message(&self) -> bool {
        !self.text.is_empty() || self.embed.is_some() || !self.buttons.is_empty()
    }

    pub fn action_for(&self, tag: &str) -> Option<&ActionSpec> {
        self.actions
            .iter()
            .find(|binding| binding.tag == tag)
            .map(|binding| &binding.spec)
    }

    /// Buttons laid out five to a row.
    pub fn components(&self) -> Vec<Component> {
        self.buttons
            .chunks(BUTTONS_PER_ROW)
            .map(|row| {
                Component::ActionRow(ActionRow {
                    id: None,
                    components: row
                        .iter()
                        .map(|button| {
                            Component::Button(Button {
                                id: None,
                                custom_id: Some(button.custom_id()),
                                disabled: false,
                                emoji: None,
                                label: Some(button.label.clone()),
                                style: ButtonStyle::Primary,
                                url: None,
                                sku_id: None,
                            })
                        })
                        .collect(),
                })
            })
            .collect()
    }
}

async fn load_embed(
    store: &dyn ExpansionStore,
    guild_id: Id<GuildMarker>,
    name: &str,
) -> Result<String, ExpansionError> {
    match store.embed(guild_id, name).await {
        Ok(Some(raw)) => Ok(raw),
        Ok(None) => Err(ExpansionError::EmbedNotFound {
            name: name.to_owned(),
        }),
        Err(source) => {
            warn!(?source, embed = name, "failed to load embed definition");
            Err(ExpansionError::Store)
        }
    }
}

async fn load_infractions(store: &dyn ExpansionStore, ctx: &ExpansionContext) -> Option<usize> {
    match store.infraction_count(ctx.guild.id, ctx.author.id).await {
        Ok(count) => Some(count),
        Err(source) => {
            warn!(?source, user = %ctx.author.id, "failed to load infraction count");
            None
        }
    }
}

/// Expand `template` for the event described by `ctx`.
///
/// Returns `Ok(None)` when an `{if}` condition suppresses the response. Any
/// error aborts the expansion before side effects are described, and its
/// `Display` output is the diagnostic to show in place of the response.
pub async fn expand(
    template: &str,
    ctx: &ExpansionContext,
    store: &dyn ExpansionStore,
) -> Result<Option<ExpansionResult>, ExpansionError> {
    let extracted = parse(template)?;

    let raw_embed = match extracted.embeds.first() {
        Some(name) => Some((name, load_embed(store, ctx.guild.id, name).await?)),
        None => None,
    };

    let wants_infractions = needs_infraction_count(template)
        || raw_embed
            .as_ref()
            .is_some_and(|(_, raw)| needs_infraction_count(raw));
    let infractions = if ctx.elevated && wants_infractions {
        load_infractions(store, ctx).await
    } else {
        None
    };

    let substitutor = Substitutor::new(ctx, infractions);

    let conditions = extracted
        .conditions
        .iter()
        .cloned()
        .map(|mut condition| {
            condition.value = substitutor.apply(&condition.value);
            condition
        })
        .collect::<Vec<_>>();
    if evaluate(&conditions, ctx) == ConditionOutcome::Suppress {
        return Ok(None);
    }

    let text = substitutor.apply(&extracted.text).trim().to_owned();

    let reactions = extracted
        .reactions
        .iter()
        .filter_map(|raw| {
            resolve_guild_emoji(raw, &ctx.guild.emojis).or_else(|| ReactionEmoji::parse(raw))
        })
        .collect();

    let actions = extracted
        .actions
        .iter()
        .cloned()
        .map(|mut binding| {
            if let ActionSpec::Dm(Some(message)) = &mut binding.spec {
                *message = substitutor.apply(message);
            }
            binding
        })
        .collect::<Vec<ActionBinding>>();
    let bound = |tag: &str| {
        actions
            .iter()
            .find(|binding| binding.tag == tag)
            .map(|binding| binding.spec.clone())
            .ok_or_else(|| ExpansionError::UnboundInteraction {
                tag: tag.to_owned(),
            })
    };

    let mut reaction_bindings = Vec::new();
    let mut buttons = Vec::new();
    for interaction in &extracted.interactions {
        match interaction.kind {
            InteractionKind::Reaction => {
                let emoji = resolve_guild_emoji(&interaction.value, &ctx.guild.emojis).ok_or_else(
                    || ExpansionError::InvalidEmoji {
                        emoji: interaction.value.clone(),
                    },
                )?;
                reaction_bindings.push(ReactionBinding {
                    emoji,
                    tag: interaction.tag.clone(),
                });
            }
            InteractionKind::Button => buttons.push(ButtonSpec {
                label: substitutor.apply(&interaction.value),
                tag: interaction.tag.clone(),
                action: bound(&interaction.tag)?,
            }),
        }
    }

    let embed = match raw_embed {
        Some((name, raw)) => {
            let corrupt = || ExpansionError::EmbedCorrupt { name: name.clone() };
            let definition = EmbedDefinition::from_json(&raw)
                .and_then(|definition| definition.substituted(|text| substitutor.apply(text)))
                .map_err(|_| corrupt())?;
            Some(render_embed(&definition))
        }
        None => None,
    };

    let dm_recipient = extracted.dm.first().map(|target| match target {
        DmTarget::User => ctx.author.id,
        DmTarget::Mention => ctx
            .mention
            .as_ref()
            .map_or(ctx.author.id, |mention| mention.id),
    });

    Ok(Some(ExpansionResult {
        text,
        reactions,
        reaction_bindings,
        buttons,
        embed,
        dm_recipient,
        delete_trigger: extracted.delete > 0,
        delete_after: extracted.delayed_delete.first().copied(),
        actions,
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::anyhow;

    use super::*;
    use crate::action::{RoleAction, RoleEdit};
    use crate::context::fixtures::{context, member};
    use crate::placeholders::RESTRICTED_SENTINEL;

    #[derive(Default)]
    struct MemoryStore {
        embeds: HashMap<String, String>,
        infractions: usize,
        failing: bool,
    }

    impl MemoryStore {
        fn with_embed(name: &str, json: &str) -> Self {
            Self {
                embeds: HashMap::from([(name.to_owned(), json.to_owned())]),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ExpansionStore for MemoryStore {
        async fn embed(
            &self,
            _guild_id: Id<GuildMarker>,
            name: &str,
        ) -> anyhow::Result<Option<String>> {
            if self.failing {
                return Err(anyhow!("connection refused"));
            }
            Ok(self.embeds.get(name).cloned())
        }

        async fn infraction_count(
            &self,
            _guild_id: Id<GuildMarker>,
            _user_id: Id<UserMarker>,
        ) -> anyhow::Result<usize> {
            if self.failing {
                return Err(anyhow!("connection refused"));
            }
            Ok(self.infractions)
        }
    }

    async fn run(template: &str) -> Result<Option<ExpansionResult>, ExpansionError> {
        expand(template, &context(), &MemoryStore::default()).await
    }

    #[tokio::test]
    async fn literal_text_is_trimmed_and_unchanged() {
        let result = run("   plain words stay plain   ").await.unwrap().unwrap();
        assert_eq!(result.text, "plain words stay plain");
        assert!(result.reactions.is_empty());
        assert!(result.buttons.is_empty());
        assert!(result.embed.is_none());
    }

    #[tokio::test]
    async fn react_directives_become_ordered_reactions() {
        let result = run("nice {react:🔥}{react:✅}").await.unwrap().unwrap();
        assert_eq!(result.text, "nice");
        assert_eq!(
            result.reactions,
            vec![
                ReactionEmoji::Unicode("🔥".to_owned()),
                ReactionEmoji::Unicode("✅".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn ignore_condition_suppresses_only_in_matching_channel() {
        let template = "no memes here {if:channel:general:ignore}";
        assert_eq!(run(template).await.unwrap(), None);

        let mut ctx = context();
        ctx.channel.name = "memes".to_owned();
        let result = expand(template, &ctx, &MemoryStore::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.text, "no memes here");
    }

    #[tokio::test]
    async fn condition_values_are_substituted() {
        let mut ctx = context();
        ctx.mention = Some(member(777, "berry"));
        let result = expand(
            "{if:user:{mention_name}:ignore}hi",
            &ctx,
            &MemoryStore::default(),
        )
        .await
        .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn dm_mention_falls_back_to_author() {
        let result = run("psst {dm:mention}").await.unwrap().unwrap();
        assert_eq!(result.dm_recipient, Some(Id::new(100)));

        let mut ctx = context();
        ctx.mention = Some(member(777, "sprout"));
        let result = expand("psst {dm:mention}", &ctx, &MemoryStore::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.dm_recipient, Some(Id::new(777)));
    }

    #[tokio::test]
    async fn staff_placeholders_depend_on_elevation() {
        let store = MemoryStore {
            infractions: 2,
            ..MemoryStore::default()
        };
        let template = "id {message_id}, strikes {infractions}";

        let mut ctx = context();
        let public = expand(template, &ctx, &store).await.unwrap().unwrap();
        ctx.elevated = true;
        let staff = expand(template, &ctx, &store).await.unwrap().unwrap();

        assert_eq!(
            public.text,
            format!("id {RESTRICTED_SENTINEL}, strikes {RESTRICTED_SENTINEL}")
        );
        assert_eq!(staff.text, "id 500, strikes 2");
        assert_ne!(public.text, staff.text);
    }

    #[tokio::test]
    async fn infraction_lookup_failure_degrades_to_placeholder() {
        let store = MemoryStore {
            failing: true,
            ..MemoryStore::default()
        };
        let mut ctx = context();
        ctx.elevated = true;
        let result = expand("{infractions}", &ctx, &store).await.unwrap().unwrap();
        assert_eq!(result.text, "[unavailable]");
    }

    #[tokio::test]
    async fn malformed_directive_yields_no_partial_result() {
        let err = run("{react:🔥}{interaction:button:Go:go}{action:dm:go}{if:invalid_scope:x}")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid_scope"));
    }

    #[tokio::test]
    async fn unbound_interaction_is_an_error() {
        let err = run("{interaction:button:Confirm:confirm1}").await.unwrap_err();
        assert_eq!(
            err,
            ExpansionError::UnboundInteraction {
                tag: "confirm1".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn buttons_carry_their_bound_action() {
        let result = run("Verify here {interaction:button:Verify:v}{action:{role:Member}:v}")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            result.buttons,
            vec![ButtonSpec {
                label: "Verify".to_owned(),
                tag: "v".to_owned(),
                action: ActionSpec::RoleEdit(RoleEdit {
                    action: RoleAction::Add,
                    role_name: "Member".to_owned(),
                }),
            }]
        );
        assert_eq!(result.buttons[0].custom_id(), "tpl:v");
        assert_eq!(tag_from_custom_id("tpl:v"), Some("v"));
        assert_eq!(result.components().len(), 1);
    }

    #[tokio::test]
    async fn reaction_interactions_need_known_emoji() {
        let result = run("{interaction:reaction:blobwave:wave}{action:dm:hello {user_name}:wave}")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.reaction_bindings.len(), 1);
        assert_eq!(
            result.action_for("wave"),
            Some(&ActionSpec::Dm(Some("hello berry".to_owned())))
        );

        let err = run("{interaction:reaction:<:stranger:123>:x}{action:dm:x}")
            .await
            .unwrap_err();
        assert!(matches!(err, ExpansionError::InvalidEmoji { .. }));
    }

    #[tokio::test]
    async fn embed_is_loaded_substituted_and_rendered() {
        let store = MemoryStore::with_embed(
            "welcome",
            r#"{"title": "Welcome to {server_name}", "description": "Hi {user}"}"#,
        );
        let result = expand("{embed:welcome}", &context(), &store)
            .await
            .unwrap()
            .unwrap();

        let embed = result.embed.unwrap();
        assert_eq!(embed.title.as_deref(), Some("Welcome to Orchard"));
        assert_eq!(embed.description.as_deref(), Some("Hi <@100>"));
        assert!(result.text.is_empty());
    }

    #[tokio::test]
    async fn missing_or_corrupt_embed_is_an_error() {
        assert_eq!(
            run("{embed:nope}").await.unwrap_err(),
            ExpansionError::EmbedNotFound {
                name: "nope".to_owned()
            }
        );

        let store = MemoryStore::with_embed("broken", "{not json");
        let err = expand("{embed:broken}", &context(), &store)
            .await
            .unwrap_err();
        assert!(matches!(err, ExpansionError::EmbedCorrupt { .. }));

        let store = MemoryStore {
            failing: true,
            ..MemoryStore::default()
        };
        let err = expand("{embed:any}", &context(), &store).await.unwrap_err();
        assert_eq!(err, ExpansionError::Store);
    }

    #[tokio::test]
    async fn side_effect_flags_are_reported() {
        let result = run("bye {delete}{delete_response:3}").await.unwrap().unwrap();
        assert!(result.delete_trigger);
        assert_eq!(result.delete_after, Some(3));
        assert!(result.has_message());
    }

    #[tokio::test]
    async fn role_edits_need_a_bound_control() {
        assert_eq!(
            run("hi {role:Admin}").await.unwrap_err(),
            ExpansionError::RoleOutsideAction
        );
    }

    #[tokio::test]
    async fn button_labels_take_placeholders() {
        let result = run("Click {interaction:button:Hi {user_name}:t}{action:dm:t}")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.text, "Click");
        assert_eq!(result.buttons.len(), 1);
        assert_eq!(result.buttons[0].label, "Hi berry");
        assert_eq!(result.buttons[0].custom_id(), "tpl:t");
    }
}
