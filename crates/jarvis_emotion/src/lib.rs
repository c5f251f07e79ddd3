//! Emotion fusion: a keyword reading of the text, an optional prosody
//! reading of the voice, and a bounded history of fused results.

pub mod text;
pub mod voice;

pub use text::{detect_from_text, score_text, TextScores};
pub use voice::detect_from_voice;

use chrono::{DateTime, Utc};
use jarvis_core::config::EmotionConfig;
use jarvis_core::dialogue::truncate_chars;
use jarvis_core::{EmotionLabel, EmotionState, ResponseStyle, VoiceFeatures};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const AGREEMENT_BOOST: f32 = 0.2;
const TREND_DELTA: f32 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRecord {
    pub timestamp: DateTime<Utc>,
    pub state: EmotionState,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionTrend {
    pub direction: TrendDirection,
    pub dominant: EmotionLabel,
    /// Percentage per label, in `EmotionLabel::ALL` order.
    pub distribution: Vec<(EmotionLabel, f32)>,
    pub samples: usize,
}

/// Combine a text reading with an optional voice label.
///
/// Agreement boosts intensity; disagreement goes to whichever channel has
/// the larger configured weight (text on a tie).
pub fn fuse(text: EmotionState, voice: Option<EmotionLabel>, config: &EmotionConfig) -> EmotionState {
    let Some(voice) = voice else {
        return text;
    };
    if voice == text.label() {
        if voice == EmotionLabel::Neutral {
            return text;
        }
        return text.with_intensity(text.intensity() + AGREEMENT_BOOST);
    }
    if config.voice_weight > config.text_weight {
        match voice {
            EmotionLabel::Neutral => EmotionState::default(),
            label => EmotionState::new(label, voice::VOICE_INTENSITY),
        }
    } else {
        text
    }
}

pub struct EmotionEngine {
    config: EmotionConfig,
    current: EmotionState,
    history: VecDeque<EmotionRecord>,
}

impl EmotionEngine {
    pub fn new(config: EmotionConfig) -> Self {
        Self {
            config,
            current: EmotionState::default(),
            history: VecDeque::new(),
        }
    }

    /// Read the emotion of one utterance and append it to the history.
    pub fn detect(&mut self, text: &str, voice: Option<VoiceFeatures>) -> EmotionState {
        let from_text = detect_from_text(text, self.config.neutral_floor);
        let from_voice = voice.as_ref().map(detect_from_voice);
        let fused = fuse(from_text, from_voice, &self.config);

        tracing::debug!(
            text_label = %from_text.label(),
            voice_label = ?from_voice,
            label = %fused.label(),
            intensity = fused.intensity(),
            mood = fused.mood_score(),
            "Emotion detected"
        );

        self.record(fused, text);
        fused
    }

    fn record(&mut self, state: EmotionState, text: &str) {
        self.current = state;
        if self.config.history_capacity == 0 {
            return;
        }
        while self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(EmotionRecord {
            timestamp: Utc::now(),
            state,
            text: truncate_chars(text, 100),
        });
    }

    pub fn current(&self) -> EmotionState {
        self.current
    }

    pub fn response_style(&self) -> ResponseStyle {
        ResponseStyle::for_label(self.current.label())
    }

    pub fn history(&self) -> impl Iterator<Item = &EmotionRecord> {
        self.history.iter()
    }

    /// Share of each label across the whole history, as percentages.
    pub fn distribution(&self) -> Vec<(EmotionLabel, f32)> {
        distribution_of(self.history.iter())
    }

    /// Direction of mood over the last `window` readings.
    pub fn trend(&self, window: usize) -> EmotionTrend {
        let skip = self.history.len().saturating_sub(window);
        let recent: Vec<&EmotionRecord> = self.history.iter().skip(skip).collect();

        let direction = match (recent.first(), recent.last()) {
            (Some(first), Some(last)) if recent.len() >= 2 => {
                let (a, b) = (first.state.mood_score(), last.state.mood_score());
                if b > a + TREND_DELTA {
                    TrendDirection::Improving
                } else if b < a - TREND_DELTA {
                    TrendDirection::Declining
                } else {
                    TrendDirection::Stable
                }
            }
            _ => TrendDirection::Stable,
        };

        let distribution = distribution_of(recent.iter().copied());
        let dominant = distribution
            .iter()
            .fold(None::<(EmotionLabel, f32)>, |best, (label, pct)| match best {
                Some((_, b)) if *pct <= b => best,
                _ => Some((*label, *pct)),
            })
            .filter(|(_, pct)| *pct > 0.0)
            .map(|(label, _)| label)
            .unwrap_or(EmotionLabel::Neutral);

        EmotionTrend {
            direction,
            dominant,
            distribution,
            samples: recent.len(),
        }
    }
}

fn distribution_of<'a>(records: impl Iterator<Item = &'a EmotionRecord>) -> Vec<(EmotionLabel, f32)> {
    let mut counts = [0usize; 6];
    let mut total = 0usize;
    for record in records {
        if let Some(i) = EmotionLabel::ALL.iter().position(|l| *l == record.state.label()) {
            counts[i] += 1;
            total += 1;
        }
    }
    EmotionLabel::ALL
        .iter()
        .zip(counts)
        .map(|(label, count)| {
            let pct = if total == 0 {
                0.0
            } else {
                count as f32 / total as f32 * 100.0
            };
            (*label, pct)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> EmotionEngine {
        EmotionEngine::new(EmotionConfig::default())
    }

    fn excited_voice() -> VoiceFeatures {
        VoiceFeatures {
            pitch: 230.0,
            speed: 200.0,
            volume: 0.9,
        }
    }

    #[test]
    fn test_detect_updates_current_and_history() {
        let mut e = engine();
        let s = e.detect("Thanks, that's great!", None);
        assert_eq!(s.label(), EmotionLabel::Happy);
        assert!(s.mood_score() > 0.0);
        assert_eq!(e.current(), s);
        assert_eq!(e.history().count(), 1);
        assert_eq!(e.response_style().prefix, "Great! ");
    }

    #[test]
    fn test_text_outweighs_voice_by_default() {
        let mut e = engine();
        let s = e.detect("kya time hua?", Some(excited_voice()));
        assert_eq!(s.label(), EmotionLabel::Calm);
    }

    #[test]
    fn test_voice_wins_when_weighted_higher() {
        let mut e = EmotionEngine::new(EmotionConfig {
            text_weight: 0.2,
            voice_weight: 0.8,
            ..Default::default()
        });
        let s = e.detect("open chrome", Some(excited_voice()));
        assert_eq!(s.label(), EmotionLabel::Excited);
        assert!((s.intensity() - voice::VOICE_INTENSITY).abs() < 1e-6);
    }

    #[test]
    fn test_agreement_boosts_intensity() {
        let text = detect_from_text("chalo start karo!", 0.7);
        assert_eq!(text.label(), EmotionLabel::Excited);
        let fused = fuse(text, Some(EmotionLabel::Excited), &EmotionConfig::default());
        assert!(fused.intensity() > text.intensity() || text.intensity() == 1.0);
        assert!(fused.intensity() <= 1.0);
    }

    #[test]
    fn test_history_capacity() {
        let mut e = EmotionEngine::new(EmotionConfig {
            history_capacity: 3,
            ..Default::default()
        });
        for _ in 0..5 {
            e.detect("hello", None);
        }
        assert_eq!(e.history().count(), 3);
    }

    #[test]
    fn test_trend_improving() {
        let mut e = engine();
        e.detect("yeh kaam nahi hua, galti hai", None);
        e.detect("open chrome", None);
        e.detect("Thanks, that's great!", None);
        let trend = e.trend(10);
        assert_eq!(trend.direction, TrendDirection::Improving);
        assert_eq!(trend.samples, 3);
    }

    #[test]
    fn test_trend_on_empty_history() {
        let trend = engine().trend(10);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.dominant, EmotionLabel::Neutral);
        assert_eq!(trend.samples, 0);
    }

    #[test]
    fn test_distribution_percentages() {
        let mut e = engine();
        e.detect("Thanks, that's great!", None);
        e.detect("open chrome", None);
        let dist = e.distribution();
        let happy = dist.iter().find(|(l, _)| *l == EmotionLabel::Happy).unwrap().1;
        assert!((happy - 50.0).abs() < 1e-4);
        let total: f32 = dist.iter().map(|(_, p)| p).sum();
        assert!((total - 100.0).abs() < 1e-3);
    }
}
