//! Text-to-Speech (TTS) trait definition

use anyhow::Result;
use async_trait::async_trait;
use jarvis_core::EmotionLabel;

/// Text-to-Speech trait for speaking a response aloud
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Speak `text`, returning once playback has finished.
    ///
    /// `emotion` is the user's detected emotion; engines that support it
    /// adapt their delivery to it.
    async fn speak(&self, text: &str, emotion: Option<EmotionLabel>) -> Result<()>;

    /// Get the name of this TTS provider
    fn provider_name(&self) -> &'static str;

    /// Check if this TTS engine supports emotional synthesis
    fn supports_emotion(&self) -> bool {
        false
    }
}
