//! Keyboard stand-in for a speech recognizer.
//!
//! A line may start with a prosody tag, `[pitch=280 speed=190 volume=0.9]`,
//! so voice-driven emotion can be tried from a terminal.

use anyhow::{Context, Result};
use async_trait::async_trait;
use jarvis_core::{Utterance, VoiceFeatures};
use jarvis_voice::{AudioFormat, SpeechToText, Transcript};

pub struct TypedSpeech;

#[async_trait]
impl SpeechToText for TypedSpeech {
    async fn transcribe(&self, audio: &[u8], format: AudioFormat) -> Result<String> {
        Ok(self.transcribe_with_features(audio, format).await?.utterance.text)
    }

    async fn transcribe_with_features(&self, audio: &[u8], format: AudioFormat) -> Result<Transcript> {
        if format != AudioFormat::Text {
            anyhow::bail!("Typed input cannot decode {}", format.mime_type());
        }
        let line = std::str::from_utf8(audio).context("Typed input is not UTF-8")?;
        let (features, text) = split_tag(line.trim());
        Ok(Transcript {
            utterance: Utterance::new(text),
            features,
        })
    }

    fn supports_language(&self, _lang: &str) -> bool {
        true
    }

    fn provider_name(&self) -> &'static str {
        "typed"
    }
}

/// Split off a leading prosody tag. An incomplete or malformed tag is
/// dropped and the rest of the line is used without features.
fn split_tag(line: &str) -> (Option<VoiceFeatures>, &str) {
    let Some(rest) = line.strip_prefix('[') else {
        return (None, line);
    };
    let Some((tag, text)) = rest.split_once(']') else {
        return (None, line);
    };

    let (mut pitch, mut speed, mut volume) = (None, None, None);
    for field in tag.split_whitespace() {
        let Some((key, value)) = field.split_once('=') else {
            continue;
        };
        let value = value.parse::<f32>().ok();
        match key {
            "pitch" => pitch = value,
            "speed" => speed = value,
            "volume" => volume = value,
            _ => {}
        }
    }

    let features = match (pitch, speed, volume) {
        (Some(pitch), Some(speed), Some(volume)) => Some(VoiceFeatures {
            pitch,
            speed,
            volume,
        }),
        _ => {
            tracing::warn!(tag, "Ignoring incomplete prosody tag");
            None
        }
    };
    (features, text.trim())
}
