use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// One executed directive, as remembered for the next few minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: u64,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortTermStats {
    pub count: usize,
    pub capacity: usize,
    pub action_counts: BTreeMap<String, usize>,
}

/// Fixed-capacity ring of recent directives. Eviction is strictly FIFO and
/// ids never repeat, even after eviction.
#[derive(Debug, Clone)]
pub struct ShortTermMemory {
    capacity: usize,
    next_id: u64,
    entries: VecDeque<MemoryEntry>,
}

impl ShortTermMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_id: 1,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Rebuild from persisted entries (oldest first). Only the newest
    /// `capacity` survive.
    pub fn restore(capacity: usize, entries: Vec<MemoryEntry>) -> Self {
        let mut memory = Self::new(capacity);
        memory.next_id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        memory.entries.extend(entries);
        memory.trim();
        memory
    }

    pub fn push(&mut self, action: impl Into<String>, details: serde_json::Value) -> MemoryEntry {
        self.push_at(action, details, Utc::now())
    }

    pub fn push_at(
        &mut self,
        action: impl Into<String>,
        details: serde_json::Value,
        now: DateTime<Utc>,
    ) -> MemoryEntry {
        let entry = MemoryEntry {
            id: self.next_id,
            action: action.into(),
            timestamp: now,
            details,
        };
        self.next_id += 1;
        self.entries.push_back(entry.clone());
        self.trim();
        tracing::debug!(id = entry.id, action = %entry.action, "Short-term memory updated");
        entry
    }

    fn trim(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn get(&self, id: u64) -> Option<&MemoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Up to `count` newest entries, oldest first.
    pub fn recent(&self, count: usize) -> Vec<&MemoryEntry> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip).collect()
    }

    /// Case-insensitive match against the action name and the serialized
    /// details.
    pub fn search(&self, query: &str) -> Vec<&MemoryEntry> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|e| {
                e.action.to_lowercase().contains(&query)
                    || e.details.to_string().to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn stats(&self) -> ShortTermStats {
        let mut action_counts = BTreeMap::new();
        for e in &self.entries {
            *action_counts.entry(e.action.clone()).or_insert(0) += 1;
        }
        ShortTermStats {
            count: self.entries.len(),
            capacity: self.capacity,
            action_counts,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
