//! Playback on voice channels with one session per guild.
//!
//! This module provides the [`VoicePlayer`], the only component allowed to
//! move the bot between channels. Every guild has its own lock: playbacks in
//! different guilds run concurrently, playbacks in the same guild queue up.

use std::{collections::HashMap, sync::Arc};

use log::{debug, info, warn};
use serenity::all::{ChannelId, GuildId};
use tokio::sync::Mutex;

use crate::voice::{VoiceError, VoiceGateway, VoiceSession, is_eligible};

/// Result of a playback attempt that checks the channel first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The audio was played to completion
    Played,
    /// The channel had no human member anymore, nothing was played
    Skipped,
}

/// Plays audio on voice channels through a [`VoiceGateway`].
///
/// # Examples
///
/// ```no_run
/// let player = VoicePlayer::new(Arc::new(DiscordVoice::new(cache, songbird)));
/// player.play_on_channel(guild_id, channel_id, audio).await?;
/// ```
pub struct VoicePlayer<V: VoiceGateway> {
    gateway: Arc<V>,
    /// One lock per guild, guarding its voice session
    guild_locks: Mutex<HashMap<GuildId, Arc<Mutex<()>>>>,
}

impl<V: VoiceGateway> VoicePlayer<V> {
    pub fn new(gateway: Arc<V>) -> Self {
        VoicePlayer {
            gateway,
            guild_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the gateway used by the player.
    pub fn gateway(&self) -> &V {
        &self.gateway
    }

    /// Joins a channel and plays the audio to completion.
    ///
    /// # Errors
    ///
    /// Returns the [`VoiceError`] of the connection or of the playback.
    pub async fn play_on_channel(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        audio: Vec<u8>,
    ) -> Result<(), VoiceError> {
        let guild_lock = self.guild_lock(guild_id).await;
        let _guard = guild_lock.lock().await;

        let session = self.join(guild_id, channel_id).await?;
        self.gateway.play_audio(&session, audio).await
    }

    /// Same as [`VoicePlayer::play_on_channel`], but only if the channel still
    /// holds a human member once the guild session is available.
    pub async fn play_if_eligible(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        audio: Vec<u8>,
    ) -> Result<PlayOutcome, VoiceError> {
        let guild_lock = self.guild_lock(guild_id).await;
        let _guard = guild_lock.lock().await;

        let members = self
            .gateway
            .list_voice_channel_members(guild_id, channel_id)?;
        if !is_eligible(&members) {
            debug!("channel {} emptied before playback, skipping", channel_id);
            return Ok(PlayOutcome::Skipped);
        }

        let session = self.join(guild_id, channel_id).await?;
        self.gateway.play_audio(&session, audio).await?;

        Ok(PlayOutcome::Played)
    }

    async fn guild_lock(&self, guild_id: GuildId) -> Arc<Mutex<()>> {
        let mut locks = self.guild_locks.lock().await;
        Arc::clone(locks.entry(guild_id).or_default())
    }

    /// Brings the session of the guild to `channel_id`.
    ///
    /// A session already on the channel is reused. A session on another
    /// channel of the guild is closed before connecting.
    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<VoiceSession, VoiceError> {
        match self.gateway.active_voice_session(guild_id).await {
            Some(session) if session.channel_id == channel_id => {
                debug!("reusing voice session on channel {}", channel_id);
                return Ok(session);
            }
            Some(session) => {
                info!(
                    "moving from channel {} to channel {}",
                    session.channel_id, channel_id
                );
                if let Err(e) = self.gateway.disconnect_voice_session(&session).await {
                    warn!("failed to leave channel {}: {}", session.channel_id, e);
                }
            }
            None => {}
        }

        info!("joining channel {} of guild {}", channel_id, guild_id);
        self.gateway
            .connect_voice_session(guild_id, channel_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use mockall::{Sequence, predicate::eq};
    use serenity::all::UserId;

    use super::*;
    use crate::voice::{ChannelMember, MockVoiceGateway};

    const GUILD: GuildId = GuildId::new(1);
    const CHANNEL: ChannelId = ChannelId::new(10);
    const OTHER_CHANNEL: ChannelId = ChannelId::new(11);

    fn session(channel_id: ChannelId) -> VoiceSession {
        VoiceSession {
            guild_id: GUILD,
            channel_id,
        }
    }

    fn human() -> ChannelMember {
        ChannelMember {
            user_id: UserId::new(100),
            bot: false,
        }
    }

    #[tokio::test]
    async fn test_play_connects_when_no_session() {
        let mut gateway = MockVoiceGateway::new();
        gateway
            .expect_active_voice_session()
            .with(eq(GUILD))
            .returning(|_| None);
        gateway
            .expect_connect_voice_session()
            .with(eq(GUILD), eq(CHANNEL))
            .times(1)
            .returning(|_, channel_id| Ok(session(channel_id)));
        gateway.expect_disconnect_voice_session().never();
        gateway
            .expect_play_audio()
            .withf(|s, audio| s.channel_id == CHANNEL && audio == &vec![1, 2, 3])
            .times(1)
            .returning(|_, _| Ok(()));

        let player = VoicePlayer::new(Arc::new(gateway));
        assert!(player.play_on_channel(GUILD, CHANNEL, vec![1, 2, 3]).await.is_ok());
    }

    #[tokio::test]
    async fn test_play_reuses_session_on_same_channel() {
        let mut gateway = MockVoiceGateway::new();
        gateway
            .expect_active_voice_session()
            .returning(|_| Some(session(CHANNEL)));
        gateway.expect_connect_voice_session().never();
        gateway.expect_disconnect_voice_session().never();
        gateway.expect_play_audio().times(1).returning(|_, _| Ok(()));

        let player = VoicePlayer::new(Arc::new(gateway));
        assert!(player.play_on_channel(GUILD, CHANNEL, vec![0]).await.is_ok());
    }

    #[tokio::test]
    async fn test_play_moves_session_from_other_channel() {
        let mut seq = Sequence::new();
        let mut gateway = MockVoiceGateway::new();
        gateway
            .expect_active_voice_session()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Some(session(OTHER_CHANNEL)));
        gateway
            .expect_disconnect_voice_session()
            .withf(|s| s.channel_id == OTHER_CHANNEL)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        gateway
            .expect_connect_voice_session()
            .with(eq(GUILD), eq(CHANNEL))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, channel_id| Ok(session(channel_id)));
        gateway
            .expect_play_audio()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let player = VoicePlayer::new(Arc::new(gateway));
        assert!(player.play_on_channel(GUILD, CHANNEL, vec![0]).await.is_ok());
    }

    #[tokio::test]
    async fn test_play_reports_connection_error() {
        let mut gateway = MockVoiceGateway::new();
        gateway.expect_active_voice_session().returning(|_| None);
        gateway.expect_connect_voice_session().returning(|_, channel_id| {
            Err(VoiceError::Connect {
                channel_id,
                reason: "timeout".to_string(),
            })
        });
        gateway.expect_play_audio().never();

        let player = VoicePlayer::new(Arc::new(gateway));
        let result = player.play_on_channel(GUILD, CHANNEL, vec![0]).await;
        assert!(matches!(result, Err(VoiceError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_play_if_eligible_skips_empty_channel() {
        let mut gateway = MockVoiceGateway::new();
        gateway
            .expect_list_voice_channel_members()
            .returning(|_, _| Ok(vec![]));
        gateway.expect_active_voice_session().never();
        gateway.expect_play_audio().never();

        let player = VoicePlayer::new(Arc::new(gateway));
        let outcome = player.play_if_eligible(GUILD, CHANNEL, vec![0]).await;
        assert_eq!(outcome.unwrap(), PlayOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_play_if_eligible_plays_to_humans() {
        let mut gateway = MockVoiceGateway::new();
        gateway
            .expect_list_voice_channel_members()
            .returning(|_, _| Ok(vec![human()]));
        gateway.expect_active_voice_session().returning(|_| None);
        gateway
            .expect_connect_voice_session()
            .returning(|_, channel_id| Ok(session(channel_id)));
        gateway.expect_play_audio().times(1).returning(|_, _| Ok(()));

        let player = VoicePlayer::new(Arc::new(gateway));
        let outcome = player.play_if_eligible(GUILD, CHANNEL, vec![0]).await;
        assert_eq!(outcome.unwrap(), PlayOutcome::Played);
    }

    #[tokio::test]
    async fn test_play_if_eligible_unknown_channel() {
        let mut gateway = MockVoiceGateway::new();
        gateway
            .expect_list_voice_channel_members()
            .returning(|_, channel_id| Err(VoiceError::UnknownChannel(channel_id)));

        let player = VoicePlayer::new(Arc::new(gateway));
        let outcome = player.play_if_eligible(GUILD, CHANNEL, vec![0]).await;
        assert!(matches!(outcome, Err(VoiceError::UnknownChannel(_))));
    }
}
