//! Speech-to-Text (STT) trait definition

use anyhow::Result;
use async_trait::async_trait;
use jarvis_core::{Utterance, VoiceFeatures};

/// Supported audio formats for STT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    /// Raw PCM straight from the microphone
    Pcm { sample_rate: u32, channels: u8 },
    /// UTF-8 text typed in place of speech
    Text,
}

impl AudioFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Pcm { .. } => "audio/pcm",
            Self::Text => "text/plain",
        }
    }
}

/// A recognized utterance with the prosody the recognizer measured, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub utterance: Utterance,
    pub features: Option<VoiceFeatures>,
}

/// Speech-to-Text trait for transcribing audio to text
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe audio data to text
    async fn transcribe(&self, audio: &[u8], format: AudioFormat) -> Result<String>;

    /// Transcribe and measure pitch, speed and volume.
    ///
    /// Default implementation reports no voice features. Engines that can
    /// measure prosody should override this.
    async fn transcribe_with_features(&self, audio: &[u8], format: AudioFormat) -> Result<Transcript> {
        let text = self.transcribe(audio, format).await?;
        Ok(Transcript {
            utterance: Utterance::new(text),
            features: None,
        })
    }

    /// Check if this STT engine supports a given language
    fn supports_language(&self, lang: &str) -> bool;

    /// Get the name of this STT provider
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedStt;

    #[async_trait]
    impl SpeechToText for FixedStt {
        async fn transcribe(&self, _audio: &[u8], _format: AudioFormat) -> Result<String> {
            Ok("open chrome".to_string())
        }

        fn supports_language(&self, lang: &str) -> bool {
            lang == "en" || lang == "hi"
        }

        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_default_transcript_has_no_features() {
        let t = FixedStt
            .transcribe_with_features(&[], AudioFormat::Wav)
            .await
            .unwrap();
        assert_eq!(t.utterance.text, "open chrome");
        assert!(t.features.is_none());
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(AudioFormat::Wav.mime_type(), "audio/wav");
        let pcm = AudioFormat::Pcm {
            sample_rate: 16_000,
            channels: 1,
        };
        assert_eq!(pcm.mime_type(), "audio/pcm");
        assert_eq!(AudioFormat::Text.mime_type(), "text/plain");
    }
}
