//! Discrete emotion model shared by the fusion engine, the decision stage
//! and the speech side.
//!
//! The label set is fixed. `mood_score` is always derived from the label and
//! its intensity, so an `EmotionState` can only be built through
//! [`EmotionState::new`].

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLabel {
    Happy,
    Sad,
    Angry,
    Excited,
    Calm,
    #[default]
    Neutral,
}

impl EmotionLabel {
    /// Fixed order used for tie-breaking and iteration.
    pub const ALL: [EmotionLabel; 6] = [
        Self::Happy,
        Self::Sad,
        Self::Angry,
        Self::Excited,
        Self::Calm,
        Self::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Excited => "excited",
            Self::Calm => "calm",
            Self::Neutral => "neutral",
        }
    }

    /// How positive the emotion feels (0.0 - 1.0).
    pub fn positivity(&self) -> f32 {
        match self {
            Self::Happy => 0.9,
            Self::Sad => 0.2,
            Self::Angry => 0.1,
            Self::Excited => 0.8,
            Self::Calm => 0.7,
            Self::Neutral => 0.5,
        }
    }

    /// Activation level, used by the speech side for pacing.
    pub fn energy(&self) -> f32 {
        match self {
            Self::Happy => 0.8,
            Self::Sad => 0.3,
            Self::Angry => 0.9,
            Self::Excited => 0.95,
            Self::Calm => 0.4,
            Self::Neutral => 0.5,
        }
    }

    /// +1 for positive emotions, -1 for negative ones, 0 for neutral.
    pub fn valence_sign(&self) -> f32 {
        match self {
            Self::Happy | Self::Excited | Self::Calm => 1.0,
            Self::Sad | Self::Angry => -1.0,
            Self::Neutral => 0.0,
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionState {
    label: EmotionLabel,
    intensity: f32,
    mood_score: f32,
}

impl Default for EmotionState {
    fn default() -> Self {
        Self::new(EmotionLabel::Neutral, 0.5)
    }
}

impl EmotionState {
    pub fn new(label: EmotionLabel, intensity: f32) -> Self {
        let intensity = if intensity.is_finite() {
            intensity.clamp(0.0, 1.0)
        } else {
            0.5
        };
        let mood_score = (label.valence_sign() * label.positivity() * intensity).clamp(-1.0, 1.0);
        Self {
            label,
            intensity,
            mood_score,
        }
    }

    pub fn label(&self) -> EmotionLabel {
        self.label
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn mood_score(&self) -> f32 {
        self.mood_score
    }

    /// Rebuild with a new intensity; the mood score follows.
    pub fn with_intensity(&self, intensity: f32) -> Self {
        Self::new(self.label, intensity)
    }
}

/// Prosodic features supplied by the speech-to-text collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VoiceFeatures {
    /// Fundamental frequency in Hz.
    pub pitch: f32,
    /// Words per minute.
    pub speed: f32,
    /// Normalized loudness (0.0 - 1.0).
    pub volume: f32,
}

/// How the assistant should sound when replying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseStyle {
    pub tone: String,
    pub speed: String,
    pub volume: String,
    pub prefix: String,
}

impl ResponseStyle {
    pub fn for_label(label: EmotionLabel) -> Self {
        let (tone, speed, volume, prefix) = match label {
            EmotionLabel::Happy => ("cheerful", "fast", "high", "Great! "),
            EmotionLabel::Sad => ("gentle", "slow", "low", "I understand. "),
            EmotionLabel::Angry => ("calm", "medium", "medium", "I apologize. "),
            EmotionLabel::Excited => ("energetic", "very_fast", "high", "Awesome! "),
            EmotionLabel::Calm => ("soothing", "slow", "low", "Sure. "),
            EmotionLabel::Neutral => ("professional", "normal", "medium", ""),
        };
        Self {
            tone: tone.to_string(),
            speed: speed.to_string(),
            volume: volume.to_string(),
            prefix: prefix.to_string(),
        }
    }
}

impl Default for ResponseStyle {
    fn default() -> Self {
        Self::for_label(EmotionLabel::Neutral)
    }
}
