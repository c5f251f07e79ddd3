use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Slot types the extractor can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    AppName,
    Website,
    Query,
    Person,
    Message,
    Song,
    Platform,
    SystemMetric,
    WindowAction,
    WindowTarget,
    Language,
    CommandName,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppName => "app_name",
            Self::Website => "website",
            Self::Query => "query",
            Self::Person => "person",
            Self::Message => "message",
            Self::Song => "song",
            Self::Platform => "platform",
            Self::SystemMetric => "system_metric",
            Self::WindowAction => "window_action",
            Self::WindowTarget => "window_target",
            Self::Language => "language",
            Self::CommandName => "command_name",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracted slots, keyed by kind. Values keep insertion order; the last
/// value of a kind is the most recent one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySet {
    slots: BTreeMap<EntityKind, Vec<String>>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. Blank values and duplicates within the kind are
    /// ignored. Returns whether the value was added.
    pub fn insert(&mut self, kind: EntityKind, value: impl Into<String>) -> bool {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let values = self.slots.entry(kind).or_default();
        if values.iter().any(|v| v == value) {
            return false;
        }
        values.push(value.to_string());
        true
    }

    pub fn with(mut self, kind: EntityKind, value: impl Into<String>) -> Self {
        self.insert(kind, value);
        self
    }

    pub fn get(&self, kind: EntityKind) -> &[String] {
        self.slots.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Most recently inserted value of this kind.
    pub fn latest(&self, kind: EntityKind) -> Option<&str> {
        self.slots
            .get(&kind)
            .and_then(|v| v.last())
            .map(String::as_str)
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        self.latest(kind).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &[String])> {
        self.slots.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Merge another set into this one, keeping the dedup rule.
    pub fn extend(&mut self, other: &EntitySet) {
        for (kind, values) in other.iter() {
            for v in values {
                self.insert(kind, v.clone());
            }
        }
    }
}
