//! Discord client wiring.
//!
//! This module provides the [`Bot`], which connects to the Discord gateway and
//! drives the services of the bot from the gateway events:
//!
//! - `ready`: creates the services and spawns the periodic tasks, once
//! - `guild_create`: registers the configured voice channels of the guild
//! - `voice_state_update`: forwards human presence changes to the elixir
//!   reminders, the alert loop and the introducer
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────────┐   fetch    ┌─────────────┐
//!                  │   PollLoop   │──────────▶ │ events API  │
//!                  └──────┬───────┘            └─────────────┘
//!                         │ due alerts
//!                  ┌──────▼───────┐ synthesize ┌─────────────┐
//!                  │AlertDispatch │──────────▶ │  TTS (REST) │
//!                  └──────┬───────┘            └─────────────┘
//!  ┌──────────┐           │
//!  │ Elixir   │───┐       │
//!  └──────────┘   │ ┌─────▼───────┐  songbird  ┌─────────────┐
//!  ┌──────────┐   └▶│ VoicePlayer │──────────▶ │ voice calls │
//!  │Introducer│────▶└─────────────┘            └─────────────┘
//!  └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! let config = Config::load("config.yaml")?;
//! let bot = Bot::new(config, args).await?;
//! bot.start().await?; // Runs until Ctrl-C
//! ```

use std::{
    path::PathBuf,
    sync::{Arc, OnceLock},
    time::Duration,
};

use chrono::Utc;
use log::{debug, error, info};
use serenity::{
    Client,
    all::{Context, EventHandler, GatewayIntents, Guild, Ready, VoiceState},
    async_trait,
    cache::Cache,
};
use songbird::{SerenityInit, Songbird};
use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
    alerts::{AlertDispatcher, AlertScheduler, ElixirAlerter, PollLoop},
    config::Config,
    events::EventsRequester,
    introducer::Introducer,
    sounds::SoundLibrary,
    tts::GoogleSpeech,
    voice::{DiscordVoice, VoiceChannelRegistry, VoicePlayer},
};

/// Services needing the gateway cache, created on the first `ready`.
struct Services {
    poll_loop: Arc<PollLoop<EventsRequester, DiscordVoice, GoogleSpeech>>,
    elixir: Option<Arc<ElixirAlerter<DiscordVoice>>>,
    introducer: Option<Arc<Introducer<DiscordVoice, GoogleSpeech>>>,
}

/// Gateway event handler.
struct Handler {
    config: Config,
    songbird: Arc<Songbird>,
    synthesizer: Arc<GoogleSpeech>,
    sounds: Arc<SoundLibrary>,
    registry: Arc<VoiceChannelRegistry>,
    services: OnceLock<Services>,
    /// Periodic tasks, aborted on shutdown
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Handler {
    fn create_services(&self, cache: Arc<Cache>) -> Services {
        let voice = Arc::new(DiscordVoice::new(cache, Arc::clone(&self.songbird)));
        let player = Arc::new(VoicePlayer::new(voice));

        let dispatcher = Arc::new(AlertDispatcher::new(
            Arc::clone(&player),
            Arc::clone(&self.synthesizer),
            Arc::clone(&self.registry),
            &self.config.tts.language_code,
            &self.config.tts.voice_name,
        ));
        let poll_loop = Arc::new(PollLoop::new(
            Arc::new(EventsRequester::new(&self.config.events.url)),
            AlertScheduler::new(self.config.events.lead_times()),
            dispatcher,
            Duration::from_secs(self.config.events.polling_interval),
            Duration::from_secs(self.config.events.alert_interval),
        ));

        let elixir = self.config.elixir.enabled.then(|| {
            Arc::new(ElixirAlerter::new(
                Arc::clone(&player),
                Arc::clone(&self.registry),
                Arc::clone(&self.sounds),
                self.config.elixir.schedule(),
                Duration::from_secs(self.config.elixir.polling_interval),
            ))
        });

        let introducer = self.config.introducer.enabled.then(|| {
            Arc::new(Introducer::new(
                Arc::clone(&player),
                Arc::clone(&self.synthesizer),
                Arc::clone(&self.sounds),
                &self.config.tts.language_code,
                &self.config.introducer.voice_name,
            ))
        });

        Services {
            poll_loop,
            elixir,
            introducer,
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected to Discord", ready.user.name);

        if self.services.get().is_some() {
            debug!("gateway session resumed, tasks already running");
            return;
        }
        if self.services.set(self.create_services(ctx.cache.clone())).is_err() {
            return;
        }
        let Some(services) = self.services.get() else {
            return;
        };

        let mut tasks = self.tasks.lock().await;
        tasks.extend(Arc::clone(&services.poll_loop).start());
        if let Some(elixir) = &services.elixir {
            tasks.push(Arc::clone(elixir).start());
        }
        info!("started {} periodic tasks", tasks.len());
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        debug!("guild available: {} ({})", guild.name, guild.id);

        let channels = DiscordVoice::scan_channels(&guild);
        self.registry.scan_guild(guild.id, &channels).await;
    }

    async fn voice_state_update(&self, _ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(services) = self.services.get() else {
            return;
        };
        let Some(guild_id) = new.guild_id else {
            return;
        };
        if new.member.as_ref().is_some_and(|member| member.user.bot) {
            return;
        }

        let left = old.as_ref().and_then(|state| state.channel_id);
        let joined = new.channel_id;
        if left == joined {
            // mute, deafen or stream toggled
            return;
        }
        debug!(
            "user {} moved from {:?} to {:?} in guild {}",
            new.user_id, left, joined, guild_id
        );

        services.poll_loop.notify_presence_change();
        if let Some(elixir) = &services.elixir {
            elixir.on_presence_change(left, joined, Utc::now()).await;
        }

        if let (Some(introducer), Some(channel_id)) = (&services.introducer, joined) {
            let display_name = new
                .member
                .as_ref()
                .map(|member| member.display_name().to_string())
                .unwrap_or_else(|| new.user_id.to_string());
            introducer
                .greet(guild_id, channel_id, new.user_id, &display_name)
                .await;
        }
    }
}

/// The Discord bot.
///
/// Holds the gateway client and the handles of the periodic tasks spawned
/// once the gateway session is ready.
pub struct Bot {
    client: Client,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Bot {
    /// Creates the Discord client from the configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration.
    /// * `sounds_path` - Root of the sounds directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the Discord client cannot be built, for example
    /// with a malformed token.
    pub async fn new(config: Config, sounds_path: PathBuf) -> Result<Self, anyhow::Error> {
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_VOICE_STATES
            | GatewayIntents::GUILD_MEMBERS;

        let songbird = Songbird::serenity();
        let tasks = Arc::new(Mutex::new(Vec::new()));
        let token = config.discord.token.clone();

        let handler = Handler {
            songbird: Arc::clone(&songbird),
            synthesizer: Arc::new(GoogleSpeech::new(&config.tts.url, &config.tts.api_key)),
            sounds: Arc::new(SoundLibrary::new(sounds_path)),
            registry: Arc::new(VoiceChannelRegistry::new(&config.voice.channel_ids)),
            services: OnceLock::new(),
            tasks: Arc::clone(&tasks),
            config,
        };

        let client = Client::builder(&token, intents)
            .event_handler(handler)
            .register_songbird_with(songbird)
            .await?;

        Ok(Bot { client, tasks })
    }

    /// Connects to the gateway and runs until Ctrl-C.
    ///
    /// On Ctrl-C the periodic tasks are aborted, without waiting for an alert
    /// being played, then every shard is shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway connection fails.
    pub async fn start(mut self) -> Result<(), anyhow::Error> {
        let shard_manager = self.client.shard_manager.clone();
        let tasks = Arc::clone(&self.tasks);

        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl-C: {}", e);
                return;
            }

            info!("shutting down");
            for task in tasks.lock().await.drain(..) {
                task.abort();
            }
            shard_manager.shutdown_all().await;
        });

        info!("connecting to Discord...");
        self.client.start().await?;

        Ok(())
    }
}
