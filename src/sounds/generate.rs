//! Rendering of the bundled sound files through the speech service.

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    sounds::{ELIXIR_ALERTS_DIR, INTROS_DIR, WELCOMES_DIR},
    tts::{SpeechRequest, SpeechSynthesizer, SynthesisError},
};

/// Text of every elixir reminder variant.
const ELIXIR_ALERT_TEXT: &str = "Don't forget to pop a potion!";

/// One sound file to render.
///
/// Custom sounds are listed in the `custom_sounds` section of the
/// configuration:
///
/// ```yaml
/// custom_sounds:
///   - path: "intros/429914580592885771.mp3"
///     text: "Shini has joined the chat"
///     language_code: "ja-JP"
///     voice_name: "ja-JP-Wavenet-A"
///     pitch: 4
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SoundSpec {
    /// Path of the file, relative to the sounds directory
    pub path: PathBuf,
    pub text: String,
    pub language_code: String,
    pub voice_name: String,
    #[serde(default)]
    pub pitch: Option<f32>,
    #[serde(default)]
    pub speed: Option<f32>,
}

impl SoundSpec {
    fn new(path: PathBuf, text: &str, language_code: &str, voice_name: &str) -> Self {
        SoundSpec {
            path,
            text: text.to_string(),
            language_code: language_code.to_string(),
            voice_name: voice_name.to_string(),
            pitch: None,
            speed: None,
        }
    }

    fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }

    fn request(&self) -> SpeechRequest {
        SpeechRequest {
            text: self.text.clone(),
            language_code: self.language_code.clone(),
            voice_name: self.voice_name.clone(),
            pitch: self.pitch,
            speed: self.speed,
        }
    }
}

/// Errors raised while generating sounds.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("failed to synthesize {}: {source}", .path.display())]
    Synthesis {
        path: PathBuf,
        source: SynthesisError,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The generic introduction and welcome.
pub fn default_intros() -> Vec<SoundSpec> {
    vec![
        SoundSpec::new(
            Path::new(INTROS_DIR).join("default.mp3"),
            "Someone has joined the chat",
            "en-US",
            "en-US-Neural2-C",
        ),
        SoundSpec::new(
            Path::new(WELCOMES_DIR).join("default.mp3"),
            "Welcome to the chat",
            "en-US",
            "en-US-Wavenet-C",
        ),
    ]
}

/// The elixir reminder, in several accents and speaking rates.
pub fn elixir_alerts() -> Vec<SoundSpec> {
    let variants = [
        ("en-US", "en-US-Neural2-C", 1.0),
        ("es-US", "es-US-Neural2-A", 1.0),
        ("en-AU", "en-AU-Neural2-A", 1.25),
        ("en-GB", "en-GB-Neural2-D", 1.25),
        ("ja-JP", "ja-JP-Wavenet-A", 1.5),
    ];

    variants
        .iter()
        .enumerate()
        .map(|(i, (language_code, voice_name, speed))| {
            SoundSpec::new(
                Path::new(ELIXIR_ALERTS_DIR).join(format!("{}.mp3", i + 1)),
                ELIXIR_ALERT_TEXT,
                language_code,
                voice_name,
            )
            .with_speed(*speed)
        })
        .collect()
}

/// Renders sounds and writes them under `root`.
///
/// Stops at the first failure, the files written before it are kept.
///
/// # Returns
///
/// The number of files written.
pub async fn generate_sounds<S: SpeechSynthesizer>(
    synthesizer: &S,
    root: &Path,
    specs: &[SoundSpec],
) -> Result<usize, GenerateError> {
    for spec in specs {
        let path = root.join(&spec.path);
        info!("generating {}", path.display());

        let audio = synthesizer
            .synthesize(&spec.request())
            .await
            .map_err(|source| GenerateError::Synthesis {
                path: path.clone(),
                source,
            })?;

        let io_error = |source| GenerateError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&path, audio).await.map_err(io_error)?;
    }

    Ok(specs.len())
}
