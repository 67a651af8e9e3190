//! Text-to-speech synthesis.
//!
//! Alerts, elixir reminders and introductions are spoken with audio rendered
//! by an external speech service. The service is reached through the
//! [`SpeechSynthesizer`] trait, implemented for Google Cloud Text-to-Speech by
//! [`GoogleSpeech`].

mod google;

pub use crate::tts::google::GoogleSpeech;

use mockall::automock;
use serenity::async_trait;
use thiserror::Error;

/// Text to render and the voice to render it with.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    /// BCP-47 language, e.g. `en-US`
    pub language_code: String,
    /// Voice of the service, e.g. `en-US-Neural2-C`
    pub voice_name: String,
    /// Semitones, the service default when `None`
    pub pitch: Option<f32>,
    /// Speaking rate, the service default when `None`
    pub speed: Option<f32>,
}

impl SpeechRequest {
    /// Creates a request with the default pitch and speaking rate.
    pub fn new(text: &str, language_code: &str, voice_name: &str) -> Self {
        SpeechRequest {
            text: text.to_string(),
            language_code: language_code.to_string(),
            voice_name: voice_name.to_string(),
            pitch: None,
            speed: None,
        }
    }
}

/// Errors that can occur while synthesizing speech.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service rejected the request.
    #[error("speech service answered {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    /// The service answered without usable audio.
    #[error("invalid speech payload: {0}")]
    InvalidAudio(String),
}

/// Trait for rendering text into MP3 audio.
#[automock]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Renders the request into encoded MP3 bytes.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, SynthesisError>;
}
