//! Bounded memory of responses the bot has sent, keyed by message id.

use std::collections::{HashMap, VecDeque};

use berry_template::{
    ActionSpec, ReactionBinding, ReactionEmoji, extract::ActionBinding,
};
use twilight_model::id::{
    Id,
    marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker},
};

/// Which autoresponder produced a response, for the `❓` reaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseOrigin {
    pub name: String,
    pub trigger: String,
    pub creator_id: Id<UserMarker>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResponseEntry {
    pub guild_id: Id<GuildMarker>,
    pub channel_id: Id<ChannelMarker>,
    pub origin: Option<ResponseOrigin>,
    /// Expanded response text, resent by a bare `dm` action.
    pub text: String,
    pub actions: Vec<ActionBinding>,
    pub reaction_bindings: Vec<ReactionBinding>,
}

impl ResponseEntry {
    pub fn action_for(&self, tag: &str) -> Option<&ActionSpec> {
        self.actions
            .iter()
            .find(|binding| binding.tag == tag)
            .map(|binding| &binding.spec)
    }

    /// Tag bound to a reaction emoji on this response.
    pub fn tag_for_reaction(&self, emoji: &ReactionEmoji) -> Option<&str> {
        self.reaction_bindings
            .iter()
            .find(|binding| binding.emoji.matches(emoji))
            .map(|binding| binding.tag.as_str())
    }
}

/// Insertion-ordered map that forgets its oldest entries past `capacity`.
#[derive(Debug)]
pub struct ResponseRegistry {
    capacity: usize,
    entries: HashMap<Id<MessageMarker>, ResponseEntry>,
    order: VecDeque<Id<MessageMarker>>,
}

impl ResponseRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn insert(&mut self, message_id: Id<MessageMarker>, entry: ResponseEntry) {
        if self.entries.insert(message_id, entry).is_none() {
            self.order.push_back(message_id);
        }

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    pub fn get(&self, message_id: Id<MessageMarker>) -> Option<&ResponseEntry> {
        self.entries.get(&message_id)
    }

    pub fn remove(&mut self, message_id: Id<MessageMarker>) -> Option<ResponseEntry> {
        let removed = self.entries.remove(&message_id)?;
        self.order.retain(|id| *id != message_id);
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ResponseEntry {
        ResponseEntry {
            guild_id: Id::new(1),
            channel_id: Id::new(2),
            origin: None,
            text: "welcome".to_owned(),
            actions: vec![ActionBinding {
                tag: "v".to_owned(),
                spec: ActionSpec::Dm(None),
            }],
            reaction_bindings: vec![ReactionBinding {
                emoji: ReactionEmoji::Unicode("✅".to_owned()),
                tag: "v".to_owned(),
            }],
        }
    }

    #[test]
    fn oldest_entries_are_evicted_at_capacity() {
        let mut registry = ResponseRegistry::new(2);
        registry.insert(Id::new(10), entry());
        registry.insert(Id::new(11), entry());
        registry.insert(Id::new(12), entry());

        assert_eq!(registry.len(), 2);
        assert!(registry.get(Id::new(10)).is_none());
        assert!(registry.get(Id::new(12)).is_some());
    }

    #[test]
    fn reinserting_does_not_grow_the_queue() {
        let mut registry = ResponseRegistry::new(2);
        registry.insert(Id::new(10), entry());
        registry.insert(Id::new(10), entry());
        registry.insert(Id::new(11), entry());

        assert_eq!(registry.len(), 2);
        assert!(registry.get(Id::new(10)).is_some());
    }

    #[test]
    fn removal_forgets_the_message() {
        let mut registry = ResponseRegistry::new(4);
        registry.insert(Id::new(10), entry());
        assert!(registry.remove(Id::new(10)).is_some());
        assert!(registry.remove(Id::new(10)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn bindings_resolve_tags() {
        let entry = entry();
        assert_eq!(entry.action_for("v"), Some(&ActionSpec::Dm(None)));
        assert_eq!(
            entry.tag_for_reaction(&ReactionEmoji::Unicode("✅".to_owned())),
            Some("v")
        );
        assert_eq!(
            entry.tag_for_reaction(&ReactionEmoji::Unicode("❌".to_owned())),
            None
        );
    }
}
