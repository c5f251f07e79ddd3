use crate::emotion::ResponseStyle;
use crate::intent::Intent;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAction {
    Minimize,
    Maximize,
    Close,
    Restore,
}

impl WindowAction {
    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "minimize" => Some(Self::Minimize),
            "maximize" => Some(Self::Maximize),
            "close" => Some(Self::Close),
            "restore" => Some(Self::Restore),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DangerReason {
    DangerousApp,
    DangerousWebsite,
}

/// What the executor should do. Serializes as `{"action": ..., "params": {...}}`.
///
/// Slot-derived fields are `Option`s: a missing slot stays `None` rather
/// than being filled with a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "params", rename_all = "snake_case")]
pub enum Action {
    OpenApp {
        app_name: Option<String>,
    },
    OpenWebsite {
        website: Option<String>,
        url: Option<String>,
    },
    SearchWeb {
        query: Option<String>,
        engine: String,
    },
    SendMessage {
        person: Option<String>,
        message: Option<String>,
        person_found: bool,
    },
    PlayMusic {
        song: Option<String>,
        platform: String,
    },
    SystemInfo {
        query: String,
    },
    ControlWindow {
        action: WindowAction,
        window: String,
    },
    CodeAssist {
        query: String,
        language: String,
    },
    ExecuteCustom {
        command_name: String,
        actions: Vec<String>,
    },
    ConfirmDangerous {
        target: String,
        reason: DangerReason,
        original: Box<Action>,
    },
    AiFallback {
        original_intent: Intent,
        text: String,
    },
    AskFollowup {
        followup: String,
        prompt: String,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenApp { .. } => "open_app",
            Self::OpenWebsite { .. } => "open_website",
            Self::SearchWeb { .. } => "search_web",
            Self::SendMessage { .. } => "send_message",
            Self::PlayMusic { .. } => "play_music",
            Self::SystemInfo { .. } => "system_info",
            Self::ControlWindow { .. } => "control_window",
            Self::CodeAssist { .. } => "code_assist",
            Self::ExecuteCustom { .. } => "execute_custom",
            Self::ConfirmDangerous { .. } => "confirm_dangerous",
            Self::AiFallback { .. } => "ai_fallback",
            Self::AskFollowup { .. } => "ask_followup",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The directive handed to the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(flatten)]
    pub action: Action,
    pub confidence: f32,
    pub requires_confirmation: bool,
    #[serde(default)]
    pub style: ResponseStyle,
}

impl Decision {
    pub fn new(action: Action, confidence: f32, requires_confirmation: bool) -> Self {
        Self {
            action,
            confidence: clamp_unit(confidence),
            requires_confirmation,
            style: ResponseStyle::default(),
        }
    }

    pub fn with_style(mut self, style: ResponseStyle) -> Self {
        self.style = style;
        self
    }

    pub fn set_confidence(&mut self, confidence: f32) {
        self.confidence = clamp_unit(confidence);
    }

    pub fn action_name(&self) -> &'static str {
        self.action.name()
    }

    pub fn is_followup_request(&self) -> bool {
        matches!(self.action, Action::AskFollowup { .. })
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
