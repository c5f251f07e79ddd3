use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of things the user can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    OpenApp,
    OpenWebsite,
    SearchWeb,
    SendMessage,
    PlayMusic,
    SystemInfo,
    ControlWindow,
    CodeAssist,
    CustomCommand,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenApp => "open_app",
            Self::OpenWebsite => "open_website",
            Self::SearchWeb => "search_web",
            Self::SendMessage => "send_message",
            Self::PlayMusic => "play_music",
            Self::SystemInfo => "system_info",
            Self::ControlWindow => "control_window",
            Self::CodeAssist => "code_assist",
            Self::CustomCommand => "custom_command",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which stage of the classification cascade produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    CustomCommand,
    Pattern,
    Keyword,
    Fallback,
}

impl MatchTier {
    /// Fixed confidence for each tier of the cascade.
    pub fn confidence(&self) -> f32 {
        match self {
            Self::CustomCommand => 0.9,
            Self::Pattern => 0.8,
            Self::Keyword => 0.6,
            Self::Fallback => 0.3,
        }
    }
}

/// A user-defined command triggered by a literal substring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomCommand {
    pub name: String,
    pub trigger: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f32,
    pub tier: MatchTier,
    /// Set only when `tier == CustomCommand`.
    pub custom: Option<CustomCommand>,
}

impl Classification {
    pub fn new(intent: Intent, tier: MatchTier) -> Self {
        Self {
            intent,
            confidence: tier.confidence(),
            tier,
            custom: None,
        }
    }

    pub fn custom(command: CustomCommand) -> Self {
        Self {
            intent: Intent::CustomCommand,
            confidence: MatchTier::CustomCommand.confidence(),
            tier: MatchTier::CustomCommand,
            custom: Some(command),
        }
    }

    pub fn unknown() -> Self {
        Self::new(Intent::Unknown, MatchTier::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_serializes_snake_case() {
        let json = serde_json::to_string(&Intent::OpenWebsite).unwrap();
        assert_eq!(json, "\"open_website\"");
        let parsed: Intent = serde_json::from_str("\"send_message\"").unwrap();
        assert_eq!(parsed, Intent::SendMessage);
        assert_eq!(Intent::SendMessage.to_string(), "send_message");
    }

    #[test]
    fn test_tier_confidence_ordering() {
        assert!(MatchTier::CustomCommand.confidence() > MatchTier::Pattern.confidence());
        assert!(MatchTier::Pattern.confidence() > MatchTier::Keyword.confidence());
        assert!(MatchTier::Keyword.confidence() > MatchTier::Fallback.confidence());
    }

    #[test]
    fn test_custom_classification_carries_command() {
        let cmd = CustomCommand {
            name: "movie_mode".into(),
            trigger: "movie time".into(),
            actions: vec!["dim lights".into()],
        };
        let c = Classification::custom(cmd.clone());
        assert_eq!(c.intent, Intent::CustomCommand);
        assert_eq!(c.custom, Some(cmd));
        assert!((c.confidence - 0.9).abs() < f32::EPSILON);
    }
}
