//! [`VoiceGateway`] implementation for Discord.
//!
//! Channel membership is read from the serenity cache, which the gateway keeps
//! up to date with voice state events. Voice sessions and playback go through
//! songbird.

use std::{sync::Arc, time::Duration};

use log::{debug, error};
use serenity::{
    all::{ChannelId, ChannelType, Guild, GuildId},
    async_trait,
    cache::Cache,
};
use songbird::{
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
    error::ControlError, input::Input, tracks::PlayMode,
};
use tokio::sync::{Mutex, oneshot};

use crate::voice::{
    ChannelMember, VoiceError, VoiceGateway, VoiceSession, registry::ScannedChannel,
};

/// Longest playback waited for before giving up on a track.
const PLAYBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// Discord voice access through the serenity cache and songbird.
pub struct DiscordVoice {
    cache: Arc<Cache>,
    songbird: Arc<Songbird>,
}

impl DiscordVoice {
    pub fn new(cache: Arc<Cache>, songbird: Arc<Songbird>) -> Self {
        DiscordVoice { cache, songbird }
    }

    /// Lists the channels of a guild, for the channel registry.
    pub fn scan_channels(guild: &Guild) -> Vec<ScannedChannel> {
        guild
            .channels
            .values()
            .map(|channel| ScannedChannel {
                channel_id: channel.id,
                voice: is_voice_kind(channel.kind),
            })
            .collect()
    }
}

fn is_voice_kind(kind: ChannelType) -> bool {
    matches!(kind, ChannelType::Voice | ChannelType::Stage)
}

/// Logs a failed stop of an overrunning track, which is only a debug
/// concern since the channel already counts as failed.
fn track_stopped(channel_id: ChannelId, stopped: Result<(), ControlError>) -> bool {
    match stopped {
        Ok(()) => true,
        Err(e) => {
            debug!("failed to stop track on channel {}: {}", channel_id, e);
            false
        }
    }
}

#[async_trait]
impl VoiceGateway for DiscordVoice {
    fn list_voice_channel_members(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Vec<ChannelMember>, VoiceError> {
        let guild = self
            .cache
            .guild(guild_id)
            .ok_or(VoiceError::UnknownChannel(channel_id))?;

        let channel = guild
            .channels
            .get(&channel_id)
            .ok_or(VoiceError::UnknownChannel(channel_id))?;
        if !is_voice_kind(channel.kind) {
            return Err(VoiceError::NotVoiceChannel(channel_id));
        }

        let members = guild
            .voice_states
            .values()
            .filter(|state| state.channel_id == Some(channel_id))
            .map(|state| {
                let bot = guild
                    .members
                    .get(&state.user_id)
                    .or(state.member.as_ref())
                    .map(|member| member.user.bot)
                    .unwrap_or(false);
                ChannelMember {
                    user_id: state.user_id,
                    bot,
                }
            })
            .collect();

        Ok(members)
    }

    async fn active_voice_session(&self, guild_id: GuildId) -> Option<VoiceSession> {
        let call = self.songbird.get(guild_id)?;
        let channel = call.lock().await.current_channel()?;

        Some(VoiceSession {
            guild_id,
            channel_id: ChannelId::new(channel.0.get()),
        })
    }

    async fn connect_voice_session(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<VoiceSession, VoiceError> {
        let call = self
            .songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|e| VoiceError::Connect {
                channel_id,
                reason: e.to_string(),
            })?;

        if let Err(e) = call.lock().await.deafen(true).await {
            debug!("failed to deafen on channel {}: {}", channel_id, e);
        }

        Ok(VoiceSession {
            guild_id,
            channel_id,
        })
    }

    async fn disconnect_voice_session(&self, session: &VoiceSession) -> Result<(), VoiceError> {
        self.songbird
            .remove(session.guild_id)
            .await
            .map_err(|e| VoiceError::Connect {
                channel_id: session.channel_id,
                reason: e.to_string(),
            })
    }

    async fn play_audio(&self, session: &VoiceSession, audio: Vec<u8>) -> Result<(), VoiceError> {
        let call = self
            .songbird
            .get(session.guild_id)
            .ok_or(VoiceError::NoSession(session.guild_id))?;

        let (sender, receiver) = oneshot::channel();
        let notifier = Arc::new(PlaybackNotifier {
            sender: Mutex::new(Some(sender)),
        });

        let track = call.lock().await.play_input(Input::from(audio));
        for event in [TrackEvent::End, TrackEvent::Error] {
            track
                .add_event(Event::Track(event), PlaybackEnd(Arc::clone(&notifier)))
                .map_err(|e| VoiceError::Playback {
                    channel_id: session.channel_id,
                    reason: e.to_string(),
                })?;
        }

        let playback_error = |reason: String| VoiceError::Playback {
            channel_id: session.channel_id,
            reason,
        };

        match tokio::time::timeout(PLAYBACK_TIMEOUT, receiver).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(playback_error(reason)),
            Ok(Err(_)) => Err(playback_error("track dropped".to_string())),
            Err(_) => {
                error!("playback on channel {} timed out", session.channel_id);
                track_stopped(session.channel_id, track.stop());
                Err(playback_error("timed out".to_string()))
            }
        }
    }
}

/// Completion signal shared by the end and error handlers of a track.
struct PlaybackNotifier {
    sender: Mutex<Option<oneshot::Sender<Result<(), String>>>>,
}

struct PlaybackEnd(Arc<PlaybackNotifier>);

#[async_trait]
impl VoiceEventHandler for PlaybackEnd {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let result = match ctx {
            EventContext::Track(tracks) => match tracks.first() {
                Some((state, _)) => match &state.playing {
                    PlayMode::Errored(e) => Err(format!("{:?}", e)),
                    _ => Ok(()),
                },
                None => Ok(()),
            },
            _ => Ok(()),
        };

        if let Some(sender) = self.0.sender.lock().await.take() {
            let _ = sender.send(result);
        }

        // one-shot handler
        Some(Event::Cancel)
    }
}
