//! Bounded speech queue.
//!
//! Responses are handed to a single tokio worker that speaks them in order.
//! Enqueueing never waits: when the queue is full the request is dropped so
//! the next listen cycle is not held up by a slow speaker.

use crate::tts::TextToSpeech;
use jarvis_core::EmotionLabel;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeechError {
    #[error("Speech queue is full, dropped: {0}")]
    QueueFull(String),
    #[error("Speech worker has stopped")]
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub emotion: Option<EmotionLabel>,
}

pub struct SpeechQueue {
    tx: mpsc::Sender<SpeechRequest>,
    worker: JoinHandle<usize>,
}

impl SpeechQueue {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn(tts: Arc<dyn TextToSpeech>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<SpeechRequest>(capacity.max(1));

        let worker = tokio::spawn(async move {
            let mut spoken = 0usize;
            while let Some(req) = rx.recv().await {
                let emotion = req.emotion.filter(|_| tts.supports_emotion());
                match tts.speak(&req.text, emotion).await {
                    Ok(()) => spoken += 1,
                    Err(e) => tracing::warn!(
                        provider = tts.provider_name(),
                        "Speech failed: {:#}",
                        e
                    ),
                }
            }
            tracing::debug!(spoken, "Speech worker stopped");
            spoken
        });

        Self { tx, worker }
    }

    /// Queue `text` for speaking without waiting.
    pub fn enqueue(
        &self,
        text: impl Into<String>,
        emotion: Option<EmotionLabel>,
    ) -> Result<(), SpeechError> {
        let req = SpeechRequest {
            text: text.into(),
            emotion,
        };
        match self.tx.try_send(req) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(req)) => {
                tracing::warn!(text = %req.text, "Speech queue full, dropping request");
                Err(SpeechError::QueueFull(req.text))
            }
            Err(TrySendError::Closed(_)) => Err(SpeechError::Closed),
        }
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    /// Stop accepting requests, let the worker drain what is queued, and
    /// return how many requests were spoken successfully.
    pub async fn shutdown(self) -> usize {
        drop(self.tx);
        match self.worker.await {
            Ok(spoken) => spoken,
            Err(e) => {
                tracing::warn!("Speech worker panicked: {}", e);
                0
            }
        }
    }
}
