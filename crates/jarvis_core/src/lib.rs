pub mod config;
pub mod decision;
pub mod dialogue;
pub mod emotion;
pub mod entities;
pub mod intent;
pub mod safety;
pub mod session;

pub use config::JarvisConfig;
pub use decision::{Action, DangerReason, Decision, WindowAction};
pub use dialogue::{ContextState, EntityMemoryEntry, PendingFollowup, TurnRecord};
pub use emotion::{EmotionLabel, EmotionState, ResponseStyle, VoiceFeatures};
pub use entities::{EntityKind, EntitySet};
pub use intent::{Classification, CustomCommand, Intent, MatchTier};
pub use safety::{DenylistHit, SafetyPolicy};
pub use session::{
    InvalidTransition, SessionState, SessionStateMachine, SessionStats, StateStats, TransitionRecord,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recognized user utterance, produced once per listen cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Lowercased, trimmed form used by every matching stage.
    pub fn normalized(&self) -> String {
        normalize(&self.text)
    }
}

/// Lowercase and collapse whitespace.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// What an external skill reports back after running a directive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    /// Text the assistant should say aloud, if any.
    pub speak: Option<String>,
    pub details: serde_json::Value,
}

impl ExecutionReport {
    pub fn ok(speak: impl Into<String>) -> Self {
        Self {
            success: true,
            speak: Some(speak.into()),
            details: serde_json::Value::Null,
        }
    }

    pub fn failed(details: serde_json::Value) -> Self {
        Self {
            success: false,
            speak: None,
            details,
        }
    }
}

/// The skill runner on the far side of the brain. It owns confirmation
/// dialogs and the actual automation.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, decision: &Decision) -> anyhow::Result<ExecutionReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  Open   Chrome \n"), "open chrome");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_utterance_normalized() {
        let u = Utterance::new("Search  Rust Tutorials");
        assert_eq!(u.normalized(), "search rust tutorials");
        assert_eq!(u.text, "Search  Rust Tutorials");
    }
}
