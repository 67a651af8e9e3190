//! Configuration of the dabs bot.
//!
//! The configuration is read from a YAML file, every value can be overridden
//! with an environment variable prefixed by `DABS_`, sections separated by `__`
//! (`DABS_DISCORD__TOKEN`, `DABS_TTS__API_KEY`).
//!
//! # Configuration File Format
//!
//! ```yaml
//! discord:
//!   # Token of the bot account
//!   token: "discord-bot-token"
//!
//! events:
//!   # Recent events endpoint
//!   url: "https://d4armory.io/api/events/recent"
//!   # Seconds between two fetches of the events
//!   polling_interval: 60
//!   # Seconds between two evaluations of the alerts
//!   alert_interval: 10
//!   # Seconds before the event at which an alert is spoken
//!   boss_lead_times: [3600, 1800, 900, 300, 60]
//!   legion_lead_times: [210]
//!   helltide_lead_times: [60]
//!
//! tts:
//!   url: "https://texttospeech.googleapis.com"
//!   api_key: "google-api-key"
//!   language_code: "en-US"
//!   voice_name: "en-US-Neural2-C"
//!
//! voice:
//!   # Voice channels receiving the event alerts and elixir reminders
//!   channel_ids: [1096573380286812220]
//!
//! elixir:
//!   enabled: true
//!   polling_interval: 60
//!   after_join_delay: 60
//!   interval: 900
//!
//! introducer:
//!   enabled: true
//!   voice_name: "en-US-Wavenet-F"
//!
//! custom_sounds:
//!   - path: "intros/429914580592885771.mp3"
//!     text: "Shini has joined the chat"
//!     language_code: "ja-JP"
//!     voice_name: "ja-JP-Wavenet-A"
//! ```
//!
//! Only `discord.token` and `tts.api_key` are required.

use std::path::Path;

use chrono::TimeDelta;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, de::Error as _};

use crate::{
    alerts::{ElixirSchedule, LeadTimes},
    sounds::generate::SoundSpec,
};

/// Prefix of the environment variables overriding the file.
const ENV_PREFIX: &str = "DABS_";

/// Root configuration of the bot.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub discord: Discord,
    #[serde(default)]
    pub events: Events,
    pub tts: Tts,
    #[serde(default)]
    pub voice: Voice,
    #[serde(default)]
    pub elixir: Elixir,
    #[serde(default)]
    pub introducer: Introducer,
    /// Extra sounds rendered by `generate-sounds --custom-intros`
    #[serde(default)]
    pub custom_sounds: Vec<SoundSpec>,
}

impl Config {
    /// Loads the configuration from a YAML file and the `DABS_` environment.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed, a required value is
    /// missing from both the file and the environment, or an interval is zero.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let config = Config::load("config.yaml")?;
    /// println!("Polling events every {}s", config.events.polling_interval);
    /// ```
    pub fn load(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        let config: Config = Figment::new()
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects the intervals the periodic tasks cannot tick with.
    fn validate(&self) -> Result<(), figment::Error> {
        let intervals = [
            ("events.polling_interval", self.events.polling_interval),
            ("events.alert_interval", self.events.alert_interval),
            ("elixir.polling_interval", self.elixir.polling_interval),
        ];

        match intervals.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(figment::Error::custom(format!(
                "{} must be greater than zero",
                name
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Discord {
    pub token: String,
}

/// Diablo IV events API and alert timing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Events {
    pub url: String,
    /// Seconds between two fetches
    pub polling_interval: u64,
    /// Seconds between two evaluations of the scheduler
    pub alert_interval: u64,
    pub boss_lead_times: Vec<u64>,
    pub legion_lead_times: Vec<u64>,
    pub helltide_lead_times: Vec<u64>,
}

impl Events {
    pub fn lead_times(&self) -> LeadTimes {
        LeadTimes::from_seconds(
            &self.boss_lead_times,
            &self.legion_lead_times,
            &self.helltide_lead_times,
        )
    }
}

impl Default for Events {
    fn default() -> Self {
        Events {
            url: "https://d4armory.io/api/events/recent".to_string(),
            polling_interval: 60,
            alert_interval: 10,
            boss_lead_times: vec![3600, 1800, 900, 300, 60],
            legion_lead_times: vec![210],
            helltide_lead_times: vec![60],
        }
    }
}

/// Text-to-speech service.
#[derive(Debug, Deserialize)]
pub struct Tts {
    #[serde(default = "default_tts_url")]
    pub url: String,
    pub api_key: String,
    /// Language of the event alerts
    #[serde(default = "default_language_code")]
    pub language_code: String,
    /// Voice of the event alerts
    #[serde(default = "default_alert_voice")]
    pub voice_name: String,
}

fn default_tts_url() -> String {
    "https://texttospeech.googleapis.com".to_string()
}

fn default_language_code() -> String {
    "en-US".to_string()
}

fn default_alert_voice() -> String {
    "en-US-Neural2-C".to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Voice {
    /// Channels receiving the event alerts and the elixir reminders
    pub channel_ids: Vec<u64>,
}

/// Elixir reminders, durations in seconds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Elixir {
    pub enabled: bool,
    pub polling_interval: u64,
    /// Delay before the first reminder once a human joins
    pub after_join_delay: u64,
    pub interval: u64,
}

impl Elixir {
    pub fn schedule(&self) -> ElixirSchedule {
        ElixirSchedule::new(seconds(self.after_join_delay), seconds(self.interval))
    }
}

/// Converts seconds from the configuration, saturating on overflow.
fn seconds(value: u64) -> TimeDelta {
    i64::try_from(value)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

impl Default for Elixir {
    fn default() -> Self {
        Elixir {
            enabled: true,
            polling_interval: 60,
            after_join_delay: 60,
            interval: 900,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Introducer {
    pub enabled: bool,
    /// Voice of the spoken introductions
    pub voice_name: String,
}

impl Default for Introducer {
    fn default() -> Self {
        Introducer {
            enabled: true,
            voice_name: "en-US-Wavenet-F".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    const MINIMAL: &str = concat!(
        "discord:\n",
        "  token: \"file-token\"\n",
        "tts:\n",
        "  api_key: \"file-key\"\n",
    );

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    #[serial]
    fn test_load_minimal_uses_defaults() {
        let (_dir, path) = write_config(MINIMAL);
        let config = Config::load(&path).unwrap();

        assert_eq!(config.discord.token, "file-token");
        assert_eq!(config.tts.api_key, "file-key");
        assert_eq!(config.tts.url, "https://texttospeech.googleapis.com");
        assert_eq!(config.tts.voice_name, "en-US-Neural2-C");
        assert_eq!(config.events.url, "https://d4armory.io/api/events/recent");
        assert_eq!(config.events.polling_interval, 60);
        assert_eq!(config.events.alert_interval, 10);
        assert_eq!(config.events.boss_lead_times, vec![3600, 1800, 900, 300, 60]);
        assert!(config.voice.channel_ids.is_empty());
        assert!(config.elixir.enabled);
        assert_eq!(config.elixir.interval, 900);
        assert_eq!(config.introducer.voice_name, "en-US-Wavenet-F");
        assert!(config.custom_sounds.is_empty());
    }

    #[test]
    #[serial]
    fn test_load_full() {
        let content = concat!(
            "discord:\n",
            "  token: \"file-token\"\n",
            "events:\n",
            "  polling_interval: 30\n",
            "  legion_lead_times: [300, 120]\n",
            "tts:\n",
            "  api_key: \"file-key\"\n",
            "  language_code: \"en-GB\"\n",
            "voice:\n",
            "  channel_ids: [11, 22]\n",
            "elixir:\n",
            "  enabled: false\n",
            "introducer:\n",
            "  voice_name: \"en-GB-Neural2-D\"\n",
            "custom_sounds:\n",
            "  - path: \"intros/42.mp3\"\n",
            "    text: \"Shini has joined the chat\"\n",
            "    language_code: \"ja-JP\"\n",
            "    voice_name: \"ja-JP-Wavenet-A\"\n",
        );
        let (_dir, path) = write_config(content);
        let config = Config::load(&path).unwrap();

        assert_eq!(config.events.polling_interval, 30);
        assert_eq!(config.events.alert_interval, 10);
        assert_eq!(config.events.legion_lead_times, vec![300, 120]);
        assert_eq!(config.tts.language_code, "en-GB");
        assert_eq!(config.voice.channel_ids, vec![11, 22]);
        assert!(!config.elixir.enabled);
        assert_eq!(config.elixir.after_join_delay, 60);
        assert_eq!(config.introducer.voice_name, "en-GB-Neural2-D");
        assert!(config.introducer.enabled);
        assert_eq!(config.custom_sounds.len(), 1);
        assert_eq!(config.custom_sounds[0].voice_name, "ja-JP-Wavenet-A");
    }

    #[test]
    #[serial]
    fn test_missing_token_is_an_error() {
        let (_dir, path) = write_config("tts:\n  api_key: \"file-key\"\n");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let (_dir, path) = write_config(MINIMAL);

        unsafe {
            std::env::set_var("DABS_DISCORD__TOKEN", "env-token");
            std::env::set_var("DABS_ELIXIR__INTERVAL", "600");
        }
        let config = Config::load(&path);
        unsafe {
            std::env::remove_var("DABS_DISCORD__TOKEN");
            std::env::remove_var("DABS_ELIXIR__INTERVAL");
        }

        let config = config.unwrap();
        assert_eq!(config.discord.token, "env-token");
        assert_eq!(config.tts.api_key, "file-key");
        assert_eq!(config.elixir.interval, 600);
    }

    #[test]
    #[serial]
    fn test_zero_interval_is_an_error() {
        let content = format!("{}events:\n  alert_interval: 0\n", MINIMAL);
        let (_dir, path) = write_config(&content);

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("events.alert_interval"));
    }

    #[test]
    #[serial]
    fn test_zero_interval_from_env_is_an_error() {
        let (_dir, path) = write_config(MINIMAL);

        unsafe {
            std::env::set_var("DABS_ELIXIR__POLLING_INTERVAL", "0");
        }
        let config = Config::load(&path);
        unsafe {
            std::env::remove_var("DABS_ELIXIR__POLLING_INTERVAL");
        }

        let err = config.unwrap_err();
        assert!(err.to_string().contains("elixir.polling_interval"));
    }

    #[test]
    fn test_lead_times_from_events() {
        let events = Events::default();
        let lead_times = events.lead_times();
        assert_eq!(lead_times, LeadTimes::default());
    }

    #[test]
    fn test_seconds_saturates() {
        assert_eq!(seconds(90), TimeDelta::seconds(90));
        assert_eq!(seconds(u64::MAX), TimeDelta::MAX);
    }
}
