//! Memory of failures, so repeated faults are counted rather than logged
//! as new ones.

use chrono::{DateTime, Duration, Utc};
use jarvis_core::config::MemoryConfig;
use jarvis_core::dialogue::truncate_chars;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const MAX_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: u64,
    pub error_type: String,
    pub message: String,
    pub context: String,
    pub occurrence_count: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorStats {
    pub total: usize,
    pub recent: usize,
    pub by_type: BTreeMap<String, usize>,
    pub most_common: Option<String>,
}

/// Jaccard similarity over lowercase whitespace tokens. Empty input is 0.
pub fn jaccard(a: &str, b: &str) -> f32 {
    let ta: BTreeSet<String> = a.to_lowercase().split_whitespace().map(str::to_string).collect();
    let tb: BTreeSet<String> = b.to_lowercase().split_whitespace().map(str::to_string).collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let inter = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    inter as f32 / union as f32
}

#[derive(Debug, Clone)]
pub struct ErrorMemory {
    message_threshold: f32,
    context_threshold: f32,
    capacity: usize,
    next_id: u64,
    records: Vec<ErrorRecord>,
}

impl ErrorMemory {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            message_threshold: config.error_message_similarity,
            context_threshold: config.error_context_similarity,
            capacity: config.error_history_capacity,
            next_id: 1,
            records: Vec::new(),
        }
    }

    pub fn restore(config: &MemoryConfig, records: Vec<ErrorRecord>) -> Self {
        let mut memory = Self::new(config);
        memory.next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        memory.records = records;
        memory.trim();
        memory
    }

    /// Record a failure. A record of the same type with a similar message or
    /// context absorbs it; otherwise a new record is created. Returns the
    /// affected record.
    pub fn record_error(
        &mut self,
        error_type: &str,
        message: &str,
        context: &str,
        now: DateTime<Utc>,
    ) -> ErrorRecord {
        let message = truncate_chars(message, MAX_MESSAGE_CHARS);
        let (msg_t, ctx_t) = (self.message_threshold, self.context_threshold);
        let similar = self.records.iter_mut().find(|r| {
            r.error_type == error_type
                && (jaccard(&r.message, &message) > msg_t || jaccard(&r.context, context) > ctx_t)
        });

        if let Some(record) = similar {
            record.occurrence_count += 1;
            record.last_seen = now;
            tracing::debug!(
                error_type,
                occurrences = record.occurrence_count,
                "Repeated error"
            );
            return record.clone();
        }

        let record = ErrorRecord {
            id: self.next_id,
            error_type: error_type.to_string(),
            message,
            context: context.to_string(),
            occurrence_count: 1,
            first_seen: now,
            last_seen: now,
        };
        self.next_id += 1;
        self.records.push(record.clone());
        self.trim();
        tracing::debug!(error_type, context, "New error recorded");
        record
    }

    fn trim(&mut self) {
        if self.records.len() > self.capacity {
            let excess = self.records.len() - self.capacity;
            self.records.drain(..excess);
        }
    }

    pub fn stats(&self, days: i64, now: DateTime<Utc>) -> ErrorStats {
        let cutoff = now - Duration::days(days);
        let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut recent = 0;
        for r in self.records.iter().filter(|r| r.last_seen >= cutoff) {
            recent += 1;
            *by_type.entry(r.error_type.clone()).or_insert(0) += 1;
        }
        let most_common = by_type
            .iter()
            .fold(None::<(&String, usize)>, |best, (k, v)| match best {
                Some((_, b)) if *v <= b => best,
                _ => Some((k, *v)),
            })
            .map(|(k, _)| k.clone());
        ErrorStats {
            total: self.records.len(),
            recent,
            by_type,
            most_common,
        }
    }

    /// Drop records not seen within `days`. Returns how many were removed.
    pub fn cleanup_older_than(&mut self, days: i64, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(days);
        let before = self.records.len();
        self.records.retain(|r| r.last_seen >= cutoff);
        before - self.records.len()
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }
}
