//! Property-based tests for jarvis_core.
//!
//! Invariants on the shared types that must hold for arbitrary inputs.

use jarvis_core::config::SafetyConfig;
use jarvis_core::{
    Action, Decision, EmotionLabel, EmotionState, EntityKind, EntitySet, SafetyPolicy,
    SessionState, SessionStateMachine,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_label() -> impl Strategy<Value = EmotionLabel> {
    prop::sample::select(EmotionLabel::ALL.to_vec())
}

fn arb_kind() -> impl Strategy<Value = EntityKind> {
    prop::sample::select(vec![
        EntityKind::AppName,
        EntityKind::Website,
        EntityKind::Query,
        EntityKind::Person,
        EntityKind::Message,
        EntityKind::Song,
    ])
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    prop::sample::select(SessionState::ALL.to_vec())
}

// ============================================================================
// Emotion
// ============================================================================

proptest! {
    /// Mood stays in [-1, 1] and its sign follows the label's valence.
    #[test]
    fn mood_score_bounded_and_signed(label in arb_label(), intensity in any::<f32>()) {
        let state = EmotionState::new(label, intensity);
        prop_assert!(state.intensity() >= 0.0 && state.intensity() <= 1.0);
        prop_assert!(state.mood_score() >= -1.0 && state.mood_score() <= 1.0);
        match label.valence_sign() {
            s if s > 0.0 => prop_assert!(state.mood_score() >= 0.0),
            s if s < 0.0 => prop_assert!(state.mood_score() <= 0.0),
            _ => prop_assert_eq!(state.mood_score(), 0.0),
        }
    }
}

// ============================================================================
// EntitySet
// ============================================================================

proptest! {
    /// No blank values and no duplicates within a kind, whatever is inserted.
    #[test]
    fn entity_set_never_holds_blanks_or_duplicates(
        inserts in prop::collection::vec((arb_kind(), "[ a-c]{0,4}"), 0..40)
    ) {
        let mut set = EntitySet::new();
        for (kind, value) in &inserts {
            set.insert(*kind, value.clone());
        }
        for (_, values) in set.iter() {
            prop_assert!(!values.is_empty());
            for (i, v) in values.iter().enumerate() {
                prop_assert!(!v.trim().is_empty());
                prop_assert!(!values[i + 1..].contains(v));
            }
        }
    }
}

// ============================================================================
// Safety
// ============================================================================

proptest! {
    /// Any app name containing a denylisted entry is confirmed, however
    /// confident the rule was, even when the entry is glued to other text.
    #[test]
    fn denylisted_app_always_requires_confirmation(
        prefix in "[a-z0-9]{0,6}",
        suffix in "[a-z0-9]{0,6}",
        spaced in any::<bool>(),
        entry in prop::sample::select(SafetyConfig::default().dangerous_apps),
        confidence in 0.0f32..=1.0,
    ) {
        let policy = SafetyPolicy::new(SafetyConfig::default());
        let name = if spaced {
            format!("{prefix} {entry} {suffix}").trim().to_string()
        } else {
            format!("{prefix}{entry}{suffix}")
        };
        let decision = Decision::new(Action::OpenApp { app_name: Some(name.clone()) }, confidence, false);
        let out = policy.enforce(decision);
        prop_assert!(out.requires_confirmation);
        match out.action {
            Action::ConfirmDangerous { target, .. } => prop_assert_eq!(target, name),
            other => prop_assert!(false, "expected confirm_dangerous, got {:?}", other),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

proptest! {
    /// A rejected transition never moves the machine.
    #[test]
    fn rejected_transitions_leave_state(targets in prop::collection::vec(arb_state(), 0..60)) {
        let mut sm = SessionStateMachine::new();
        for target in targets {
            let before = sm.current();
            let allowed = sm.can_transition(target);
            match sm.transition(target) {
                Ok(rec) => {
                    prop_assert!(allowed);
                    prop_assert_eq!(rec.from, before);
                    prop_assert_eq!(sm.current(), target);
                }
                Err(_) => {
                    prop_assert!(!allowed);
                    prop_assert_eq!(sm.current(), before);
                }
            }
        }
    }
}
