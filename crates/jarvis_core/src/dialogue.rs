//! Conversational state carried across turns.
//!
//! These are plain data. The context tracker in `jarvis_reasoning` is the
//! only writer; the memory store persists snapshots of them.

use crate::entities::{EntityKind, EntitySet};
use crate::intent::Intent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const GENERAL_TOPIC: &str = "general";

/// An incomplete directive waiting for one more user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PendingFollowup {
    /// Neither recipient nor body is known.
    WhatsappDetails,
    /// Recipient known, body missing.
    WhatsappMessage { person: String },
    AppName,
    WebsiteName,
    SearchQuery,
}

impl PendingFollowup {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WhatsappDetails => "whatsapp_details",
            Self::WhatsappMessage { .. } => "whatsapp_message",
            Self::AppName => "app_name",
            Self::WebsiteName => "website_name",
            Self::SearchQuery => "search_query",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMemoryEntry {
    pub value: String,
    /// Last time this value was observed.
    pub timestamp: DateTime<Utc>,
    /// Start of the utterance it came from.
    pub source_snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub timestamp: DateTime<Utc>,
    pub user_text: String,
    pub response_text: String,
    pub intent: Intent,
    pub entities: EntitySet,
    pub topic: String,
    pub needs_followup: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextState {
    pub topic_stack: Vec<String>,
    pub entity_memory: BTreeMap<EntityKind, Vec<EntityMemoryEntry>>,
    pub turn_history: Vec<TurnRecord>,
    pub pending_followup: Option<PendingFollowup>,
    /// Total turns seen, including ones already dropped from `turn_history`.
    #[serde(default)]
    pub turn_count: u64,
}

impl ContextState {
    pub fn current_topic(&self) -> &str {
        self.topic_stack
            .last()
            .map(String::as_str)
            .unwrap_or(GENERAL_TOPIC)
    }

    pub fn last_turn(&self) -> Option<&TurnRecord> {
        self.turn_history.last()
    }

    /// Take the pending follow-up, leaving none behind.
    pub fn take_pending(&mut self) -> Option<PendingFollowup> {
        self.pending_followup.take()
    }
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_topic_defaults_to_general() {
        let state = ContextState::default();
        assert_eq!(state.current_topic(), GENERAL_TOPIC);
    }

    #[test]
    fn test_take_pending_clears() {
        let mut state = ContextState {
            pending_followup: Some(PendingFollowup::SearchQuery),
            ..Default::default()
        };
        assert_eq!(state.take_pending(), Some(PendingFollowup::SearchQuery));
        assert!(state.pending_followup.is_none());
        assert_eq!(state.take_pending(), None);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("नमस्ते दुनिया", 3).chars().count(), 3);
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_pending_followup_serde_tag() {
        let p = PendingFollowup::WhatsappMessage {
            person: "raj".into(),
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["type"], "whatsapp_message");
        assert_eq!(json["person"], "raj");
        let back: PendingFollowup = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }
}
