use jarvis_core::{EmotionLabel, VoiceFeatures};

/// Intensity assigned to a non-neutral voice reading. Prosody rules are
/// binary, so there is no score to scale from.
pub const VOICE_INTENSITY: f32 = 0.6;

/// Threshold rules over pitch (Hz), speed (wpm) and volume, first match wins.
pub fn detect_from_voice(features: &VoiceFeatures) -> EmotionLabel {
    let VoiceFeatures {
        pitch,
        speed,
        volume,
    } = *features;

    if pitch > 200.0 && speed > 180.0 {
        EmotionLabel::Excited
    } else if pitch < 150.0 && speed < 120.0 {
        EmotionLabel::Sad
    } else if volume > 0.8 && speed > 160.0 {
        EmotionLabel::Angry
    } else if volume < 0.6 && speed < 140.0 {
        EmotionLabel::Calm
    } else if pitch > 180.0 && volume > 0.7 {
        EmotionLabel::Happy
    } else {
        EmotionLabel::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(pitch: f32, speed: f32, volume: f32) -> VoiceFeatures {
        VoiceFeatures {
            pitch,
            speed,
            volume,
        }
    }

    #[test]
    fn test_rule_order() {
        assert_eq!(detect_from_voice(&v(220.0, 190.0, 0.9)), EmotionLabel::Excited);
        assert_eq!(detect_from_voice(&v(120.0, 100.0, 0.5)), EmotionLabel::Sad);
        assert_eq!(detect_from_voice(&v(170.0, 170.0, 0.9)), EmotionLabel::Angry);
        assert_eq!(detect_from_voice(&v(170.0, 130.0, 0.5)), EmotionLabel::Calm);
        assert_eq!(detect_from_voice(&v(190.0, 150.0, 0.75)), EmotionLabel::Happy);
        assert_eq!(detect_from_voice(&v(170.0, 150.0, 0.65)), EmotionLabel::Neutral);
    }
}
