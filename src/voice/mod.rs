//! Voice channel access for alerts and introductions.
//!
//! This module hides the chat platform behind the [`VoiceGateway`] trait so
//! the alerting logic can be tested without a gateway connection.
//!
//! # Modules
//!
//! - `discord` - [`VoiceGateway`] implementation backed by the serenity cache and songbird
//! - `player` - Per-guild session discipline and playback
//! - `presence` - Channel eligibility rules
//! - `registry` - Voice channels the alerts are sent to

mod discord;
mod player;
mod presence;
mod registry;

pub use crate::voice::discord::DiscordVoice;
pub use crate::voice::player::{PlayOutcome, VoicePlayer};
pub use crate::voice::presence::{has_human_members, is_eligible};
pub use crate::voice::registry::{ScannedChannel, VoiceChannelRegistry};

use mockall::automock;
use serenity::{
    all::{ChannelId, GuildId, UserId},
    async_trait,
};
use thiserror::Error;

/// A member currently connected to a voice channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMember {
    pub user_id: UserId,
    /// `true` for bot accounts, the bot itself included
    pub bot: bool,
}

/// An established voice connection of the bot.
///
/// There is at most one session per guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceSession {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
}

/// Errors raised while talking to voice channels.
///
/// None of them is fatal: the caller logs the error and moves on to the next
/// channel.
#[derive(Error, Debug)]
pub enum VoiceError {
    /// The channel is not known to the cache.
    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),

    /// The channel exists but does not carry voice.
    #[error("channel {0} is not a voice channel")]
    NotVoiceChannel(ChannelId),

    /// Joining or leaving the channel failed.
    #[error("voice connection to channel {channel_id} failed: {reason}")]
    Connect { channel_id: ChannelId, reason: String },

    /// The audio could not be decoded or the track stopped on an error.
    #[error("playback on channel {channel_id} failed: {reason}")]
    Playback { channel_id: ChannelId, reason: String },

    /// The session vanished between connecting and playing.
    #[error("no voice session in guild {0}")]
    NoSession(GuildId),
}

/// Trait for the chat platform voice operations.
///
/// Implemented by [`DiscordVoice`] and mocked in tests.
#[automock]
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Lists the members connected to a voice channel.
    ///
    /// # Errors
    ///
    /// [`VoiceError::UnknownChannel`] if the guild or the channel is not in the
    /// cache, [`VoiceError::NotVoiceChannel`] if the channel is a text channel.
    fn list_voice_channel_members(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Vec<ChannelMember>, VoiceError>;

    /// Returns the session of the bot in a guild, if any.
    async fn active_voice_session(&self, guild_id: GuildId) -> Option<VoiceSession>;

    /// Connects the bot to a channel, self-deafened.
    async fn connect_voice_session(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<VoiceSession, VoiceError>;

    /// Leaves the channel of a session.
    async fn disconnect_voice_session(&self, session: &VoiceSession) -> Result<(), VoiceError>;

    /// Plays encoded audio on a session and resolves when playback ends.
    async fn play_audio(&self, session: &VoiceSession, audio: Vec<u8>) -> Result<(), VoiceError>;
}
