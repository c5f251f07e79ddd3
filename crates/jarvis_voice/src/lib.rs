//! Voice module for Jarvis
//!
//! Provides Speech-to-Text (STT) and Text-to-Speech (TTS) abstractions plus
//! the queue that keeps speaking off the listen path. Concrete engines live
//! outside the brain.

mod queue;
mod stt;
mod tts;

pub use queue::{SpeechError, SpeechQueue, SpeechRequest};
pub use stt::{AudioFormat, SpeechToText, Transcript};
pub use tts::TextToSpeech;
