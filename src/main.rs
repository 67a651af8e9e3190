//! dabs - A Discord voice bot for a Diablo IV clan.
//!
//! # Overview
//!
//! dabs hangs around the voice channels of the clan server and talks:
//!
//! - **Event Alerts**: speaks the upcoming world boss, legion and helltide
//!   events ahead of time, using the public events API
//! - **Elixir Reminders**: reminds the players in a channel to drink their
//!   elixir every 15 minutes
//! - **Introductions**: introduces members joining a channel, or welcomes
//!   them if they are alone
//!
//! Nothing is ever played in a channel without a human member.
//!
//! # Configuration
//!
//! Create a `config.yaml` file with your settings, see [`config`] for every
//! option:
//!
//! ```yaml
//! discord:
//!   token: "discord-bot-token"
//!
//! tts:
//!   api_key: "google-api-key"
//!
//! voice:
//!   channel_ids: [1096573380286812220]
//! ```
//!
//! # Environment Variable Overrides
//!
//! Override any configuration value using environment variables with the `DABS_` prefix:
//!
//! ```bash
//! export DABS_DISCORD__TOKEN="discord-bot-token"
//! export DABS_TTS__API_KEY="google-api-key"
//! ```
//!
//! # Usage
//!
//! ```bash
//! # Render the bundled sounds once
//! dabs --config config.yaml --sounds ./sounds generate-sounds --all
//!
//! # Run the bot
//! dabs --config config.yaml --sounds ./sounds
//! ```
//!
//! # Architecture
//!
//! - [`alerts`] - Event alert scheduling and dispatch, elixir reminders
//! - [`bot`] - Discord client and gateway events
//! - [`config`] - YAML configuration with environment variable overrides
//! - [`events`] - Diablo IV events API client
//! - [`introducer`] - Welcomes and introductions
//! - [`sounds`] - Bundled sound files and their generation
//! - [`tts`] - Text-to-speech client
//! - [`utils`] - Text helpers
//! - [`voice`] - Voice channel access
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info};

use crate::{
    bot::Bot,
    config::Config,
    sounds::generate::{SoundSpec, default_intros, elixir_alerts, generate_sounds},
    tts::GoogleSpeech,
};

mod alerts;
mod bot;
mod config;
mod events;
mod introducer;
mod sounds;
mod tts;
mod utils;
mod voice;

/// Command-line arguments for the dabs bot.
///
/// # Examples
///
/// ```bash
/// dabs --config config.yaml --sounds ./sounds
/// ```
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: String,

    /// Path to the sounds directory.
    ///
    /// Holds `intros/`, `welcomes/` and `elixir_alerts/`, see [`sounds`].
    #[arg(short, long, default_value = "./sounds")]
    sounds: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render sound files through the text-to-speech service, then exit.
    GenerateSounds {
        /// Generic introduction and welcome
        #[arg(long)]
        default_intros: bool,

        /// Sounds listed in the `custom_sounds` section of the configuration
        #[arg(long)]
        custom_intros: bool,

        /// Elixir reminders
        #[arg(long)]
        elixir_alerts: bool,

        /// Everything above
        #[arg(long)]
        all: bool,
    },
}

/// Collects the sounds selected on the command line.
fn selected_sounds(command: &Command, config: &Config) -> Vec<SoundSpec> {
    let Command::GenerateSounds {
        default_intros: with_defaults,
        custom_intros: with_customs,
        elixir_alerts: with_elixirs,
        all,
    } = command;

    let mut specs = Vec::new();
    if *all || *with_defaults {
        specs.extend(default_intros());
    }
    if *all || *with_customs {
        specs.extend(config.custom_sounds.iter().cloned());
    }
    if *all || *with_elixirs {
        specs.extend(elixir_alerts());
    }
    specs
}

/// Main entry point for the dabs bot.
///
/// 1. **Logging Setup**: `info` level by default, overridden with `RUST_LOG`
/// 2. **Argument Parsing** with `clap`
/// 3. **Configuration Loading** from the YAML file and the environment
/// 4. Either renders the requested sounds and exits, or runs the bot until Ctrl-C
///
/// Errors are logged and end the process without panicking.
#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting dabs {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return;
        }
    };

    if let Some(command) = &args.command {
        let specs = selected_sounds(command, &config);
        if specs.is_empty() {
            error!("Nothing to generate, pass --default-intros, --custom-intros, --elixir-alerts or --all");
            return;
        }

        let synthesizer = GoogleSpeech::new(&config.tts.url, &config.tts.api_key);
        match generate_sounds(&synthesizer, &args.sounds, &specs).await {
            Ok(count) => info!("Generated {} sounds in {}", count, args.sounds.display()),
            Err(e) => error!("Failed to generate sounds: {}", e),
        }
        return;
    }

    let bot = match Bot::new(config, args.sounds).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to initialize bot: {}", e);
            return;
        }
    };
    if let Err(e) = bot.start().await {
        error!("Bot stopped: {}", e);
    }
}
