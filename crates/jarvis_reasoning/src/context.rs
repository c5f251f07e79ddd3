//! Conversational context: topic stack, decaying entity memory, turn
//! history and the parked follow-up.
//!
//! `ContextTracker` is the only writer of [`ContextState`]. Everything the
//! decision stage needs is handed out through the read-only
//! [`ContextTracker::context_for_intent`] projection.

use crate::followup;
use chrono::{DateTime, Duration, Utc};
use jarvis_core::config::ContextConfig;
use jarvis_core::dialogue::{truncate_chars, GENERAL_TOPIC};
use jarvis_core::{
    normalize, ContextState, EntityKind, EntityMemoryEntry, EntitySet, Intent, PendingFollowup,
    TurnRecord,
};
use serde::Serialize;

const USER_TEXT_MAX: usize = 200;
const RESPONSE_TEXT_MAX: usize = 200;
const SNIPPET_MAX: usize = 50;
const RECENT_ENTITY_LIMIT: usize = 10;
const RECENT_FAMILY_LIMIT: usize = 5;

// ============================================================================
// Topic table
// ============================================================================

/// Checked in order; the first topic with a hit wins.
const TOPICS: &[(&str, &[&str])] = &[
    ("youtube", &["youtube", "video", "watch", "play"]),
    ("whatsapp", &["whatsapp", "message", "send", "text", "msg"]),
    ("web_search", &["search", "google", "find", "look up"]),
    (
        "system",
        &["battery", "cpu", "ram", "memory", "system", "disk", "volume", "brightness"],
    ),
    ("apps", &["open", "launch", "start", "close", "minimize", "maximize", "app"]),
    ("coding", &["code", "program", "python", "function", "script", "debug"]),
];

/// Pronouns and pointers that refer back to the previous turn.
const CONTINUATION_WORDS: &[&str] = &[
    "it", "that", "this", "there", "next", "then", "also", "too", "again", "more", "another",
    "us", "usko", "isko", "wahan",
];

const STOP_CHARS: &[char] = &['.', ',', '!', '?', ':', ';', '"', '\''];

fn tokens(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|t| t.trim_matches(STOP_CHARS))
        .filter(|t| !t.is_empty())
        .collect()
}

fn detect_topic(text: &str) -> Option<&'static str> {
    let toks = tokens(text);
    TOPICS
        .iter()
        .find(|(_, words)| {
            words.iter().any(|w| {
                if w.contains(' ') {
                    text.contains(w)
                } else {
                    toks.contains(w)
                }
            })
        })
        .map(|(topic, _)| *topic)
}

// ============================================================================
// Types
// ============================================================================

/// Everything the tracker needs to record one turn.
#[derive(Debug, Clone)]
pub struct TurnInput<'a> {
    /// The text that was classified (after any follow-up rewrite).
    pub utterance: &'a str,
    /// What the assistant did, usually the action name.
    pub response: &'a str,
    pub intent: Intent,
    pub entities: &'a EntitySet,
    /// This turn answered a parked follow-up, so it may not park another.
    pub consumed_followup: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentEntity {
    pub kind: EntityKind,
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

/// Intent-family specific slice of the context.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum FamilyContext {
    Messaging {
        last_contact: Option<String>,
        last_messaging_turn: Option<TurnRecord>,
    },
    Web {
        last_query: Option<String>,
        last_website: Option<String>,
    },
    Apps {
        last_app: Option<String>,
        recent_apps: Vec<String>,
    },
    System {
        last_system_turn: Option<TurnRecord>,
        recent_checks: Vec<String>,
    },
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentContext {
    pub current_topic: String,
    pub recent_entities: Vec<RecentEntity>,
    pub pending_followup: Option<PendingFollowup>,
    pub family: FamilyContext,
}

impl Default for IntentContext {
    fn default() -> Self {
        Self {
            current_topic: GENERAL_TOPIC.to_string(),
            recent_entities: Vec::new(),
            pending_followup: None,
            family: FamilyContext::None,
        }
    }
}

impl IntentContext {
    /// Last app the user worked with, for window commands without a target.
    pub fn last_app(&self) -> Option<&str> {
        match &self.family {
            FamilyContext::Apps { last_app, .. } => last_app.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSummary {
    pub current_topic: String,
    pub topic_stack: Vec<String>,
    pub turn_count: u64,
    pub turns_in_history: usize,
    pub tracked_entities: usize,
    pub last_intent: Option<Intent>,
    pub pending_followup: Option<String>,
}

// ============================================================================
// ContextTracker
// ============================================================================

pub struct ContextTracker {
    config: ContextConfig,
    state: ContextState,
}

impl ContextTracker {
    pub fn new(config: ContextConfig) -> Self {
        Self::restore(config, ContextState::default())
    }

    /// Resume from a persisted snapshot.
    pub fn restore(config: ContextConfig, state: ContextState) -> Self {
        Self { config, state }
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.config.entity_ttl_secs)
    }

    /// Rewrite `text` against the parked follow-up and clear it.
    /// Returns the text to classify and whether a follow-up was consumed.
    pub fn apply_followup(&mut self, text: &str) -> (String, bool) {
        let consumed = self.state.pending_followup.is_some();
        (followup::handle(text, &mut self.state), consumed)
    }

    pub fn update(&mut self, input: TurnInput<'_>) -> ContextState {
        self.update_at(input, Utc::now())
    }

    pub fn update_at(&mut self, input: TurnInput<'_>, now: DateTime<Utc>) -> ContextState {
        let text = normalize(input.utterance);
        let continuation = self.is_continuation(&text);

        let topic = if continuation {
            self.state.current_topic().to_string()
        } else {
            detect_topic(&text).unwrap_or(GENERAL_TOPIC).to_string()
        };
        self.push_topic(&topic);

        self.upsert_entities(input.entities, input.utterance, now);
        self.prune_expired(now);

        let pending = if input.consumed_followup {
            None
        } else {
            followup::infer(input.intent, input.entities)
        };
        let response_text = match &pending {
            Some(p) => followup::prompt_for(p),
            None => input.response.to_string(),
        };

        self.state.turn_history.push(TurnRecord {
            timestamp: now,
            user_text: truncate_chars(input.utterance, USER_TEXT_MAX),
            response_text: truncate_chars(&response_text, RESPONSE_TEXT_MAX),
            intent: input.intent,
            entities: input.entities.clone(),
            topic: topic.clone(),
            needs_followup: pending.is_some(),
        });
        let overflow = self
            .state
            .turn_history
            .len()
            .saturating_sub(self.config.history_capacity);
        self.state.turn_history.drain(..overflow);

        if let Some(p) = &pending {
            tracing::debug!(followup = p.kind(), "Follow-up parked");
        }
        self.state.pending_followup = pending;
        self.state.turn_count += 1;

        tracing::debug!(
            topic = %topic,
            continuation,
            intent = %input.intent,
            turn = self.state.turn_count,
            "Context updated"
        );
        self.state.clone()
    }

    fn is_continuation(&self, text: &str) -> bool {
        let toks = tokens(text);
        if toks.iter().any(|t| CONTINUATION_WORDS.contains(t)) {
            return true;
        }
        toks.len() < 3
            && self
                .state
                .last_turn()
                .map(|t| t.needs_followup)
                .unwrap_or(false)
    }

    fn push_topic(&mut self, topic: &str) {
        if self.state.topic_stack.last().map(String::as_str) == Some(topic) {
            return;
        }
        self.state.topic_stack.push(topic.to_string());
        let overflow = self
            .state
            .topic_stack
            .len()
            .saturating_sub(self.config.topic_stack_capacity);
        self.state.topic_stack.drain(..overflow);
    }

    fn upsert_entities(&mut self, entities: &EntitySet, source: &str, now: DateTime<Utc>) {
        let snippet = truncate_chars(source, SNIPPET_MAX);
        for (kind, values) in entities.iter() {
            let slot = self.state.entity_memory.entry(kind).or_default();
            for value in values {
                match slot.iter_mut().find(|e| &e.value == value) {
                    Some(existing) => {
                        existing.timestamp = now;
                        existing.source_snippet = snippet.clone();
                    }
                    None => slot.push(EntityMemoryEntry {
                        value: value.clone(),
                        timestamp: now,
                        source_snippet: snippet.clone(),
                    }),
                }
            }
        }
    }

    fn prune_expired(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl();
        for entries in self.state.entity_memory.values_mut() {
            entries.retain(|e| now - e.timestamp <= ttl);
        }
        self.state.entity_memory.retain(|_, entries| !entries.is_empty());
    }

    /// Live entities, newest first. `kind = None` means every kind.
    pub fn recent_entities(&self, kind: Option<EntityKind>, limit: usize) -> Vec<RecentEntity> {
        self.recent_entities_at(kind, limit, Utc::now())
    }

    pub fn recent_entities_at(
        &self,
        kind: Option<EntityKind>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<RecentEntity> {
        let ttl = self.ttl();
        let mut out: Vec<RecentEntity> = self
            .state
            .entity_memory
            .iter()
            .filter(|(k, _)| kind.map_or(true, |want| want == **k))
            .flat_map(|(k, entries)| {
                entries.iter().map(move |e| RecentEntity {
                    kind: *k,
                    value: e.value.clone(),
                    timestamp: e.timestamp,
                })
            })
            .filter(|e| now - e.timestamp <= ttl)
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out.truncate(limit);
        out
    }

    pub fn context_for_intent(&self, intent: Intent) -> IntentContext {
        self.context_for_intent_at(intent, Utc::now())
    }

    pub fn context_for_intent_at(&self, intent: Intent, now: DateTime<Utc>) -> IntentContext {
        let latest = |kind| {
            self.recent_entities_at(Some(kind), 1, now)
                .into_iter()
                .next()
                .map(|e| e.value)
        };
        let values = |kind| -> Vec<String> {
            self.recent_entities_at(Some(kind), RECENT_FAMILY_LIMIT, now)
                .into_iter()
                .map(|e| e.value)
                .collect()
        };
        let last_turn_for = |wanted: Intent| {
            self.state
                .turn_history
                .iter()
                .rev()
                .find(|t| t.intent == wanted)
                .cloned()
        };

        let family = match intent {
            Intent::SendMessage => FamilyContext::Messaging {
                last_contact: latest(EntityKind::Person),
                last_messaging_turn: last_turn_for(Intent::SendMessage),
            },
            Intent::SearchWeb | Intent::OpenWebsite => FamilyContext::Web {
                last_query: latest(EntityKind::Query),
                last_website: latest(EntityKind::Website),
            },
            Intent::OpenApp | Intent::ControlWindow => FamilyContext::Apps {
                last_app: latest(EntityKind::AppName),
                recent_apps: values(EntityKind::AppName),
            },
            Intent::SystemInfo => FamilyContext::System {
                last_system_turn: last_turn_for(Intent::SystemInfo),
                recent_checks: values(EntityKind::SystemMetric),
            },
            _ => FamilyContext::None,
        };

        IntentContext {
            current_topic: self.state.current_topic().to_string(),
            recent_entities: self.recent_entities_at(None, RECENT_ENTITY_LIMIT, now),
            pending_followup: self.state.pending_followup.clone(),
            family,
        }
    }

    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            current_topic: self.state.current_topic().to_string(),
            topic_stack: self.state.topic_stack.clone(),
            turn_count: self.state.turn_count,
            turns_in_history: self.state.turn_history.len(),
            tracked_entities: self.state.entity_memory.values().map(Vec::len).sum(),
            last_intent: self.state.last_turn().map(|t| t.intent),
            pending_followup: self
                .state
                .pending_followup
                .as_ref()
                .map(|p| p.kind().to_string()),
        }
    }

    /// Most likely next action for the current topic.
    pub fn predict_next_action(&self) -> Option<&'static str> {
        match self.state.current_topic() {
            "youtube" => Some("search"),
            "whatsapp" => Some("send"),
            "web_search" => Some("open"),
            "system" => Some("check"),
            "apps" => Some("switch"),
            "coding" => Some("run"),
            _ => None,
        }
    }

    /// A snapshot should be persisted after this turn.
    pub fn checkpoint_due(&self) -> bool {
        let every = self.config.snapshot_every_turns;
        every > 0 && self.state.turn_count > 0 && self.state.turn_count % every == 0
    }

    pub fn clear(&mut self) {
        self.state = ContextState::default();
        tracing::info!("Context cleared");
    }
}

// ============================================================================
// Tests
// ============================================================================
