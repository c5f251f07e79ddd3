//! Coarse session lifecycle: which phase of a listen/think/act cycle the
//! assistant is in, and how long it has spent in each.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

const HISTORY_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Listening,
    Processing,
    Speaking,
    Executing,
    Error,
    Learning,
    Sleep,
    Shutdown,
}

impl SessionState {
    pub const ALL: [SessionState; 9] = [
        Self::Idle,
        Self::Listening,
        Self::Processing,
        Self::Speaking,
        Self::Executing,
        Self::Error,
        Self::Learning,
        Self::Sleep,
        Self::Shutdown,
    ];

    /// States reachable from `self` without forcing.
    pub fn allowed_targets(&self) -> &'static [SessionState] {
        use SessionState::*;
        match self {
            Idle => &[Listening, Sleep, Shutdown],
            Listening => &[Processing, Idle, Error],
            Processing => &[Executing, Speaking, Error],
            Speaking => &[Idle, Listening],
            Executing => &[Idle, Speaking, Error],
            Error => &[Idle, Learning],
            Learning => &[Idle],
            Sleep => &[Idle, Listening],
            Shutdown => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Speaking => "speaking",
            Self::Executing => "executing",
            Self::Error => "error",
            Self::Learning => "learning",
            Self::Sleep => "sleep",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid session transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: SessionState,
    pub to: SessionState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: SessionState,
    pub to: SessionState,
    pub at: DateTime<Utc>,
    /// Time spent in `from` before leaving it.
    pub elapsed: Duration,
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateStats {
    pub duration: Duration,
    /// Share of the total tracked time, 0 - 100.
    pub percentage: f64,
    /// Number of times this state was entered.
    pub transitions: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub current: SessionState,
    pub total: Duration,
    pub per_state: BTreeMap<SessionState, StateStats>,
}

pub struct SessionStateMachine {
    current: SessionState,
    previous: Option<SessionState>,
    entered_at: Instant,
    durations: BTreeMap<SessionState, Duration>,
    entries: BTreeMap<SessionState, u64>,
    history: VecDeque<TransitionRecord>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self {
            current: SessionState::Idle,
            previous: None,
            entered_at: Instant::now(),
            durations: BTreeMap::new(),
            entries: BTreeMap::new(),
            history: VecDeque::new(),
        }
    }

    pub fn current(&self) -> SessionState {
        self.current
    }

    pub fn previous(&self) -> Option<SessionState> {
        self.previous
    }

    pub fn can_transition(&self, target: SessionState) -> bool {
        self.current.allowed_targets().contains(&target)
    }

    /// Move to `target` if the current state allows it. On rejection the
    /// machine is left untouched.
    pub fn transition(&mut self, target: SessionState) -> Result<TransitionRecord, InvalidTransition> {
        if !self.can_transition(target) {
            tracing::debug!(from = %self.current, to = %target, "Rejected session transition");
            return Err(InvalidTransition {
                from: self.current,
                to: target,
            });
        }
        let record = self.apply(target, false);
        tracing::debug!(from = %record.from, to = %record.to, "Session transition");
        Ok(record)
    }

    /// Emergency path: skip validation but keep the accounting.
    pub fn force(&mut self, target: SessionState) -> TransitionRecord {
        let record = self.apply(target, true);
        tracing::warn!(from = %record.from, to = %record.to, forced = true, "Forced session transition");
        record
    }

    fn apply(&mut self, target: SessionState, forced: bool) -> TransitionRecord {
        let now = Instant::now();
        let elapsed = now.duration_since(self.entered_at);
        *self.durations.entry(self.current).or_default() += elapsed;
        *self.entries.entry(target).or_default() += 1;

        let record = TransitionRecord {
            from: self.current,
            to: target,
            at: Utc::now(),
            elapsed,
            forced,
        };
        if self.history.len() >= HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(record.clone());

        self.previous = Some(self.current);
        self.current = target;
        self.entered_at = now;
        record
    }

    pub fn history(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.history.iter()
    }

    pub fn current_state_duration(&self) -> Duration {
        self.entered_at.elapsed()
    }

    /// Per-state time accounting, counting the time spent so far in the
    /// current state.
    pub fn stats(&self) -> SessionStats {
        let mut durations = self.durations.clone();
        *durations.entry(self.current).or_default() += self.current_state_duration();
        let total: Duration = durations.values().sum();

        let per_state = SessionState::ALL
            .iter()
            .map(|state| {
                let duration = durations.get(state).copied().unwrap_or_default();
                let percentage = if total.is_zero() {
                    0.0
                } else {
                    duration.as_secs_f64() / total.as_secs_f64() * 100.0
                };
                let stats = StateStats {
                    duration,
                    percentage,
                    transitions: self.entries.get(state).copied().unwrap_or(0),
                };
                (*state, stats)
            })
            .collect();

        SessionStats {
            current: self.current,
            total,
            per_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    #[test]
    fn test_happy_path_cycle() {
        let mut sm = SessionStateMachine::new();
        for target in [Listening, Processing, Executing, Speaking, Idle] {
            sm.transition(target).unwrap();
        }
        assert_eq!(sm.current(), Idle);
        assert_eq!(sm.previous(), Some(Speaking));
        assert_eq!(sm.history().count(), 5);
        assert!(sm.history().all(|r| !r.forced));
    }

    #[test]
    fn test_invalid_transition_leaves_state() {
        let mut sm = SessionStateMachine::new();
        sm.transition(Shutdown).unwrap();
        let err = sm.transition(Listening).unwrap_err();
        assert_eq!(err.from, Shutdown);
        assert_eq!(err.to, Listening);
        assert_eq!(sm.current(), Shutdown);
        assert_eq!(sm.history().count(), 1);
    }

    #[test]
    fn test_idle_cannot_jump_to_processing() {
        let sm = SessionStateMachine::new();
        assert!(!sm.can_transition(Processing));
        assert!(sm.can_transition(Sleep));
    }

    #[test]
    fn test_force_is_recorded() {
        let mut sm = SessionStateMachine::new();
        let rec = sm.force(Executing);
        assert!(rec.forced);
        assert_eq!(sm.current(), Executing);
        assert!(sm.history().last().unwrap().forced);
    }

    #[test]
    fn test_history_is_capped() {
        let mut sm = SessionStateMachine::new();
        for _ in 0..(HISTORY_CAPACITY / 2 + 10) {
            sm.transition(Listening).unwrap();
            sm.transition(Idle).unwrap();
        }
        assert_eq!(sm.history().count(), HISTORY_CAPACITY);
    }

    #[test]
    fn test_stats_counts_entries() {
        let mut sm = SessionStateMachine::new();
        sm.transition(Listening).unwrap();
        sm.transition(Idle).unwrap();
        sm.transition(Listening).unwrap();
        let stats = sm.stats();
        assert_eq!(stats.current, Listening);
        assert_eq!(stats.per_state[&Listening].transitions, 2);
        assert_eq!(stats.per_state[&Idle].transitions, 1);
        assert_eq!(stats.per_state[&Shutdown].transitions, 0);
        let pct: f64 = stats.per_state.values().map(|s| s.percentage).sum();
        assert!(pct == 0.0 || (pct - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_error_recovery_path() {
        let mut sm = SessionStateMachine::new();
        sm.transition(Listening).unwrap();
        sm.transition(Processing).unwrap();
        sm.transition(Error).unwrap();
        sm.transition(Learning).unwrap();
        sm.transition(Idle).unwrap();
        assert_eq!(sm.current(), Idle);
    }
}
