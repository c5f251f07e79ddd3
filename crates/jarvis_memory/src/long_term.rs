//! Long-term usage patterns.
//!
//! Learning is a pure function: [`merge_pattern`] takes the current
//! snapshot and a new observation and returns the next snapshot.
//! [`LongTermMemory`] is a thin owner around that function.

use chrono::{DateTime, Duration, Utc};
use jarvis_core::config::MemoryConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub pattern: String,
    pub confidence: f32,
    pub usage_count: u32,
    pub first_seen: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergePolicy {
    /// Merge when strictly more tokens than this are shared.
    pub min_shared_tokens: usize,
    pub confidence_step: f32,
    pub initial_confidence: f32,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            min_shared_tokens: 2,
            confidence_step: 0.1,
            initial_confidence: 0.5,
        }
    }
}

impl MergePolicy {
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self {
            min_shared_tokens: config.merge_min_shared_tokens,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged { index: usize },
    Appended { index: usize },
}

fn tokens(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Number of distinct lowercase whitespace tokens two patterns share.
pub fn shared_tokens(a: &str, b: &str) -> usize {
    tokens(a).intersection(&tokens(b)).count()
}

/// Fold one observed pattern into the snapshot. The first existing entry
/// that shares enough tokens absorbs it; otherwise it is appended.
pub fn merge_pattern(
    existing: &[PatternEntry],
    new: &str,
    policy: &MergePolicy,
    now: DateTime<Utc>,
) -> (Vec<PatternEntry>, MergeOutcome) {
    let mut next = existing.to_vec();
    let hit = next
        .iter()
        .position(|p| shared_tokens(&p.pattern, new) > policy.min_shared_tokens);

    match hit {
        Some(index) => {
            let entry = &mut next[index];
            entry.usage_count += 1;
            entry.confidence = (entry.confidence + policy.confidence_step).min(1.0);
            entry.last_used = now;
            (next, MergeOutcome::Merged { index })
        }
        None => {
            next.push(PatternEntry {
                pattern: new.to_string(),
                confidence: policy.initial_confidence,
                usage_count: 1,
                first_seen: now,
                last_used: now,
            });
            let index = next.len() - 1;
            (next, MergeOutcome::Appended { index })
        }
    }
}

/// Patterns still worth keeping: used within `days`, or used often.
pub fn retain_recent(patterns: &[PatternEntry], days: i64, now: DateTime<Utc>) -> Vec<PatternEntry> {
    let cutoff = now - Duration::days(days);
    patterns
        .iter()
        .filter(|p| p.last_used >= cutoff || p.usage_count > 5)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct LongTermMemory {
    policy: MergePolicy,
    patterns: Vec<PatternEntry>,
}

impl LongTermMemory {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            patterns: Vec::new(),
        }
    }

    pub fn restore(policy: MergePolicy, patterns: Vec<PatternEntry>) -> Self {
        Self { policy, patterns }
    }

    pub fn remember(&mut self, pattern: &str, now: DateTime<Utc>) -> MergeOutcome {
        let (next, outcome) = merge_pattern(&self.patterns, pattern, &self.policy, now);
        self.patterns = next;
        tracing::debug!(pattern, ?outcome, "Pattern remembered");
        outcome
    }

    /// Drop stale patterns. Returns how many were removed.
    pub fn cleanup_older_than(&mut self, days: i64, now: DateTime<Utc>) -> usize {
        let before = self.patterns.len();
        self.patterns = retain_recent(&self.patterns, days, now);
        before - self.patterns.len()
    }

    pub fn patterns(&self) -> &[PatternEntry] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pattern_appended_at_half_confidence() {
        let now = Utc::now();
        let (next, outcome) = merge_pattern(&[], "open_app open chrome", &MergePolicy::default(), now);
        assert_eq!(outcome, MergeOutcome::Appended { index: 0 });
        assert_eq!(next[0].confidence, 0.5);
        assert_eq!(next[0].usage_count, 1);
    }

    #[test]
    fn test_merge_requires_more_than_threshold() {
        let now = Utc::now();
        let policy = MergePolicy::default();
        let (snap, _) = merge_pattern(&[], "open_app open chrome", &policy, now);

        // Two shared tokens: not enough.
        let (snap, outcome) = merge_pattern(&snap, "open_app open firefox", &policy, now);
        assert_eq!(outcome, MergeOutcome::Appended { index: 1 });

        // Three shared tokens: merged into the first.
        let (snap, outcome) = merge_pattern(&snap, "open_app open chrome now", &policy, now);
        assert_eq!(outcome, MergeOutcome::Merged { index: 0 });
        assert_eq!(snap[0].usage_count, 2);
        assert!((snap[0].confidence - 0.6).abs() < 1e-6);
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn test_merge_does_not_mutate_input() {
        let now = Utc::now();
        let policy = MergePolicy::default();
        let (snap, _) = merge_pattern(&[], "a b c d", &policy, now);
        let before = snap.clone();
        let _ = merge_pattern(&snap, "a b c", &policy, now);
        assert_eq!(snap, before);
    }

    #[test]
    fn test_confidence_capped() {
        let now = Utc::now();
        let policy = MergePolicy::default();
        let (mut snap, _) = merge_pattern(&[], "x y z w", &policy, now);
        for _ in 0..20 {
            snap = merge_pattern(&snap, "x y z w", &policy, now).0;
        }
        assert_eq!(snap[0].confidence, 1.0);
        assert_eq!(snap[0].usage_count, 21);
    }

    #[test]
    fn test_cleanup_keeps_frequent_patterns() {
        let now = Utc::now();
        let old = now - Duration::days(60);
        let mut mem = LongTermMemory::restore(
            MergePolicy::default(),
            vec![
                PatternEntry {
                    pattern: "stale".into(),
                    confidence: 0.5,
                    usage_count: 1,
                    first_seen: old,
                    last_used: old,
                },
                PatternEntry {
                    pattern: "habit".into(),
                    confidence: 0.9,
                    usage_count: 9,
                    first_seen: old,
                    last_used: old,
                },
                PatternEntry {
                    pattern: "fresh".into(),
                    confidence: 0.5,
                    usage_count: 1,
                    first_seen: now,
                    last_used: now,
                },
            ],
        );
        assert_eq!(mem.cleanup_older_than(30, now), 1);
        let names: Vec<&str> = mem.patterns().iter().map(|p| p.pattern.as_str()).collect();
        assert_eq!(names, vec!["habit", "fresh"]);
    }
}
