//! Google Cloud Text-to-Speech REST client.

use base64::{Engine, engine::general_purpose::STANDARD};
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serenity::async_trait;

use crate::tts::{SpeechRequest, SpeechSynthesizer, SynthesisError};

/// Audio effects profile applied to every rendering.
const EFFECTS_PROFILE: &str = "headphone-class-device";

/// HTTP client for the `text:synthesize` endpoint.
///
/// # Examples
///
/// ```no_run
/// let speech = GoogleSpeech::new("https://texttospeech.googleapis.com", "api-key");
/// let request = SpeechRequest::new("Welcome to the chat", "en-US", "en-US-Wavenet-C");
/// let mp3 = speech.synthesize(&request).await?;
/// ```
pub struct GoogleSpeech {
    /// Root URL of the service, without trailing slash
    url: String,
    api_key: String,
    client: Client,
}

#[derive(Serialize)]
struct SynthesizeBody<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    effects_profile_id: [&'static str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    pitch: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speaking_rate: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

impl GoogleSpeech {
    /// Create a new [GoogleSpeech].
    ///
    /// # Arguments
    ///
    /// * `url` - Root URL of the service, e.g. `https://texttospeech.googleapis.com`.
    /// * `api_key` - API key of the Google Cloud project.
    pub fn new(url: &str, api_key: &str) -> Self {
        GoogleSpeech {
            url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeech {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, SynthesisError> {
        info!(
            "synthesize \"{}\" with {}",
            request.text, request.voice_name
        );

        let body = SynthesizeBody {
            input: SynthesisInput {
                text: &request.text,
            },
            voice: VoiceSelection {
                language_code: &request.language_code,
                name: &request.voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                effects_profile_id: [EFFECTS_PROFILE],
                pitch: request.pitch,
                speaking_rate: request.speed,
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/text:synthesize", self.url))
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Status { status, message });
        }

        let payload: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::InvalidAudio(e.to_string()))?;
        let audio = STANDARD
            .decode(payload.audio_content)
            .map_err(|e| SynthesisError::InvalidAudio(e.to_string()))?;

        if audio.is_empty() {
            return Err(SynthesisError::InvalidAudio("empty audio".to_string()));
        }

        debug!("synthesized {} bytes", audio.len());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_synthesize() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/text:synthesize")
            .match_query(Matcher::UrlEncoded("key".into(), "secret".into()))
            .match_body(Matcher::Json(json!({
                "input": {"text": "Welcome to the chat"},
                "voice": {"languageCode": "en-US", "name": "en-US-Wavenet-C"},
                "audioConfig": {
                    "audioEncoding": "MP3",
                    "effectsProfileId": ["headphone-class-device"]
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"audioContent": "SUQzBA=="}"#)
            .create_async()
            .await;

        let speech = GoogleSpeech::new(&format!("{}/", server.url()), "secret");
        let request = SpeechRequest::new("Welcome to the chat", "en-US", "en-US-Wavenet-C");
        let audio = speech.synthesize(&request).await.unwrap();

        assert_eq!(audio, b"ID3\x04".to_vec());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_synthesize_with_pitch_and_speed() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/text:synthesize")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "audioConfig": {"pitch": 4.0, "speakingRate": 1.5}
            })))
            .with_status(200)
            .with_body(r#"{"audioContent": "SUQzBA=="}"#)
            .create_async()
            .await;

        let speech = GoogleSpeech::new(&server.url(), "secret");
        let mut request = SpeechRequest::new("Shini has joined the chat", "ja-JP", "ja-JP-Wavenet-A");
        request.pitch = Some(4.0);
        request.speed = Some(1.5);

        assert!(speech.synthesize(&request).await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_synthesize_rejected() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/v1/text:synthesize")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error": {"message": "API key not valid"}}"#)
            .create_async()
            .await;

        let speech = GoogleSpeech::new(&server.url(), "wrong");
        let request = SpeechRequest::new("Hello", "en-US", "en-US-Neural2-C");
        let result = speech.synthesize(&request).await;

        assert!(matches!(
            result,
            Err(SynthesisError::Status { status, ref message })
                if status.as_u16() == 403 && message.contains("API key not valid")
        ));
    }

    #[tokio::test]
    async fn test_synthesize_invalid_audio() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/v1/text:synthesize")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"audioContent": "not base64!"}"#)
            .create_async()
            .await;

        let speech = GoogleSpeech::new(&server.url(), "secret");
        let request = SpeechRequest::new("Hello", "en-US", "en-US-Neural2-C");

        assert!(matches!(
            speech.synthesize(&request).await,
            Err(SynthesisError::InvalidAudio(_))
        ));
    }

    #[tokio::test]
    async fn test_synthesize_empty_audio() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/v1/text:synthesize")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"audioContent": ""}"#)
            .create_async()
            .await;

        let speech = GoogleSpeech::new(&server.url(), "secret");
        let request = SpeechRequest::new("Hello", "en-US", "en-US-Neural2-C");

        assert!(matches!(
            speech.synthesize(&request).await,
            Err(SynthesisError::InvalidAudio(_))
        ));
    }
}
