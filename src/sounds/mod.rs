//! Bundled sound files.
//!
//! The sounds directory holds the pre-rendered MP3 files played by the bot:
//!
//! ```text
//! sounds/
//! ├── intros/         <user_id>.mp3 and default.mp3
//! ├── welcomes/       <user_id>.mp3 and default.mp3
//! └── elixir_alerts/  any number of *.mp3
//! ```
//!
//! The files are produced by the `generate-sounds` subcommand, see
//! [`generate`].

pub mod generate;

use std::path::{Path, PathBuf};

use log::{debug, warn};
use rand::seq::IndexedRandom;
use serenity::all::UserId;
use thiserror::Error;

pub const INTROS_DIR: &str = "intros";
pub const WELCOMES_DIR: &str = "welcomes";
pub const ELIXIR_ALERTS_DIR: &str = "elixir_alerts";

const DEFAULT_SOUND: &str = "default.mp3";

/// Errors raised while reading sound files.
#[derive(Error, Debug)]
pub enum SoundError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no sound file in {}", .0.display())]
    Empty(PathBuf),
}

/// Read access to the sounds directory.
///
/// # Examples
///
/// ```no_run
/// let sounds = SoundLibrary::new("./sounds");
/// let welcome = sounds.welcome(user_id).await;
/// let reminder = sounds.random_elixir_alert().await?;
/// ```
pub struct SoundLibrary {
    root: PathBuf,
}

impl SoundLibrary {
    pub fn new(root: impl AsRef<Path>) -> Self {
        SoundLibrary {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root of the sounds directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The personal introduction of a user, if one was generated.
    pub async fn intro(&self, user_id: UserId) -> Option<Vec<u8>> {
        read_optional(&self.user_sound(INTROS_DIR, user_id)).await
    }

    /// The generic introduction.
    pub async fn default_intro(&self) -> Option<Vec<u8>> {
        read_optional(&self.root.join(INTROS_DIR).join(DEFAULT_SOUND)).await
    }

    /// The welcome of a user, or the generic one.
    pub async fn welcome(&self, user_id: UserId) -> Option<Vec<u8>> {
        match read_optional(&self.user_sound(WELCOMES_DIR, user_id)).await {
            Some(audio) => Some(audio),
            None => read_optional(&self.root.join(WELCOMES_DIR).join(DEFAULT_SOUND)).await,
        }
    }

    /// One of the elixir reminders, picked at random.
    ///
    /// # Errors
    ///
    /// [`SoundError::Empty`] if the directory holds no MP3 file,
    /// [`SoundError::Io`] if it cannot be listed or the file cannot be read.
    pub async fn random_elixir_alert(&self) -> Result<Vec<u8>, SoundError> {
        let dir = self.root.join(ELIXIR_ALERTS_DIR);
        let files = list_mp3(&dir).await?;

        let path = files
            .choose(&mut rand::rng())
            .ok_or_else(|| SoundError::Empty(dir.clone()))?;
        debug!("picked elixir alert {}", path.display());

        tokio::fs::read(path).await.map_err(|source| SoundError::Io {
            path: path.clone(),
            source,
        })
    }

    fn user_sound(&self, dir: &str, user_id: UserId) -> PathBuf {
        self.root.join(dir).join(format!("{}.mp3", user_id))
    }
}

/// Reads a file, `None` if it does not exist.
async fn read_optional(path: &Path) -> Option<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(audio) => Some(audio),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("failed to read {}: {}", path.display(), e);
            None
        }
    }
}

/// Lists the MP3 files of a directory, sorted by name.
async fn list_mp3(dir: &Path) -> Result<Vec<PathBuf>, SoundError> {
    let io_error = |source| SoundError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_error)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "mp3") {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}
