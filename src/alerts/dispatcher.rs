//! Delivery of due alerts to the voice channels.
//!
//! This module provides the [`AlertDispatcher`], turning a [`DueAlert`] into
//! speech played on every registered channel with a human listening.

use std::{collections::BTreeMap, sync::Arc};

use futures::future::join_all;
use log::{error, info, warn};
use serenity::all::{ChannelId, GuildId};

use crate::{
    alerts::alert::DueAlert,
    tts::{SpeechRequest, SpeechSynthesizer, SynthesisError},
    voice::{PlayOutcome, VoiceChannelRegistry, VoiceGateway, VoicePlayer, is_eligible},
};

/// Outcome of one dispatch, channel by channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Channels the alert was played on
    pub delivered: usize,
    /// Channels where joining or playing failed
    pub failed: usize,
    /// Channels without a human listener, or unknown to the platform
    pub skipped: usize,
}

/// Speaks alerts on the registered voice channels.
///
/// # Examples
///
/// ```no_run
/// let dispatcher = AlertDispatcher::new(player, synthesizer, registry, "en-US", "en-US-Neural2-C");
///
/// for alert in scheduler.evaluate(Utc::now()) {
///     let report = dispatcher.dispatch(&alert).await?;
///     println!("delivered to {} channels", report.delivered);
/// }
/// ```
pub struct AlertDispatcher<V: VoiceGateway, S: SpeechSynthesizer> {
    player: Arc<VoicePlayer<V>>,
    synthesizer: Arc<S>,
    registry: Arc<VoiceChannelRegistry>,
    /// Language of the alert voice
    language_code: String,
    /// Voice used for every alert
    voice_name: String,
}

impl<V: VoiceGateway, S: SpeechSynthesizer> AlertDispatcher<V, S> {
    pub fn new(
        player: Arc<VoicePlayer<V>>,
        synthesizer: Arc<S>,
        registry: Arc<VoiceChannelRegistry>,
        language_code: &str,
        voice_name: &str,
    ) -> Self {
        AlertDispatcher {
            player,
            synthesizer,
            registry,
            language_code: language_code.to_string(),
            voice_name: voice_name.to_string(),
        }
    }

    /// Speaks an alert on every eligible registered channel.
    ///
    /// The utterance is synthesized once, only if at least one channel has a
    /// human member. Guilds are served concurrently, the channels of one guild
    /// one after the other since the bot holds a single session per guild.
    /// A channel failing does not affect the others.
    ///
    /// # Errors
    ///
    /// Returns the [`SynthesisError`] if the utterance could not be rendered,
    /// in which case nothing is played.
    pub async fn dispatch(&self, alert: &DueAlert) -> Result<DispatchReport, SynthesisError> {
        let mut report = DispatchReport::default();

        let mut targets: BTreeMap<GuildId, Vec<ChannelId>> = BTreeMap::new();
        for (guild_id, channel_id) in self.registry.channels().await {
            match self
                .player
                .gateway()
                .list_voice_channel_members(guild_id, channel_id)
            {
                Ok(members) if is_eligible(&members) => {
                    targets.entry(guild_id).or_default().push(channel_id)
                }
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    warn!("{} alert: skipping channel {}: {}", alert.kind, channel_id, e);
                    report.skipped += 1;
                }
            }
        }

        if targets.is_empty() {
            info!("{} alert: no channel with listeners, nothing to play", alert.kind);
            return Ok(report);
        }

        let utterance = alert.utterance();
        info!("{} alert: \"{}\"", alert.kind, utterance);

        let request = SpeechRequest::new(&utterance, &self.language_code, &self.voice_name);
        let audio = self.synthesizer.synthesize(&request).await.map_err(|e| {
            error!("{} alert: synthesis failed: {}", alert.kind, e);
            e
        })?;

        let guild_outcomes = join_all(targets.into_iter().map(|(guild_id, channel_ids)| {
            let audio = &audio;
            async move {
                let mut outcomes = Vec::with_capacity(channel_ids.len());
                for channel_id in channel_ids {
                    let outcome = self
                        .player
                        .play_if_eligible(guild_id, channel_id, audio.clone())
                        .await;
                    if let Err(e) = &outcome {
                        error!("{} alert: channel {}: {}", alert.kind, channel_id, e);
                    }
                    outcomes.push(outcome);
                }
                outcomes
            }
        }))
        .await;

        for outcome in guild_outcomes.into_iter().flatten() {
            match outcome {
                Ok(PlayOutcome::Played) => report.delivered += 1,
                Ok(PlayOutcome::Skipped) => report.skipped += 1,
                Err(_) => report.failed += 1,
            }
        }

        info!(
            "{} alert: delivered={}, failed={}, skipped={}",
            alert.kind, report.delivered, report.failed, report.skipped
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta};
    use serenity::all::UserId;

    use super::*;
    use crate::{
        events::EventKind,
        tts::MockSpeechSynthesizer,
        voice::{ChannelMember, MockVoiceGateway, ScannedChannel, VoiceError, VoiceSession},
    };

    const HUMAN_CHANNEL: u64 = 10;
    const BOT_CHANNEL: u64 = 11;
    const OTHER_GUILD_CHANNEL: u64 = 20;
    const UNKNOWN_CHANNEL: u64 = 30;

    fn create_test_alert() -> DueAlert {
        let event_time = DateTime::from_timestamp(10_000, 0).unwrap();
        DueAlert {
            kind: EventKind::Helltide,
            text: "The Helltide will rise in Kehjistan in".to_string(),
            event_time,
            alert_time: event_time - TimeDelta::minutes(1),
            lead_time: TimeDelta::minutes(1),
            time_remaining: TimeDelta::minutes(1),
        }
    }

    async fn create_registry(channels: &[(u64, u64)]) -> Arc<VoiceChannelRegistry> {
        let ids: Vec<u64> = channels.iter().map(|(_, c)| *c).collect();
        let registry = VoiceChannelRegistry::new(&ids);
        for (guild, channel) in channels {
            registry
                .scan_guild(
                    GuildId::new(*guild),
                    &[ScannedChannel {
                        channel_id: ChannelId::new(*channel),
                        voice: true,
                    }],
                )
                .await;
        }
        Arc::new(registry)
    }

    fn members_of(channel_id: ChannelId) -> Result<Vec<ChannelMember>, VoiceError> {
        let bot = ChannelMember {
            user_id: UserId::new(1),
            bot: true,
        };
        let human = ChannelMember {
            user_id: UserId::new(2),
            bot: false,
        };
        match channel_id.get() {
            HUMAN_CHANNEL | OTHER_GUILD_CHANNEL => Ok(vec![bot, human]),
            BOT_CHANNEL => Ok(vec![bot]),
            _ => Err(VoiceError::UnknownChannel(channel_id)),
        }
    }

    fn create_gateway() -> MockVoiceGateway {
        let mut gateway = MockVoiceGateway::new();
        gateway
            .expect_list_voice_channel_members()
            .returning(|_, channel_id| members_of(channel_id));
        gateway.expect_active_voice_session().returning(|_| None);
        gateway
            .expect_connect_voice_session()
            .returning(|guild_id, channel_id| {
                Ok(VoiceSession {
                    guild_id,
                    channel_id,
                })
            });
        gateway
    }

    fn create_dispatcher(
        gateway: MockVoiceGateway,
        synthesizer: MockSpeechSynthesizer,
        registry: Arc<VoiceChannelRegistry>,
    ) -> AlertDispatcher<MockVoiceGateway, MockSpeechSynthesizer> {
        AlertDispatcher::new(
            Arc::new(VoicePlayer::new(Arc::new(gateway))),
            Arc::new(synthesizer),
            registry,
            "en-US",
            "en-US-Neural2-C",
        )
    }

    #[tokio::test]
    async fn test_dispatch_plays_on_every_eligible_channel() {
        let registry = create_registry(&[(1, HUMAN_CHANNEL), (2, OTHER_GUILD_CHANNEL)]).await;

        let mut gateway = create_gateway();
        gateway
            .expect_play_audio()
            .withf(|_, audio| audio == b"mp3")
            .times(2)
            .returning(|_, _| Ok(()));

        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .withf(|request| {
                request.text == "The Helltide will rise in Kehjistan in less than 1 minute"
                    && request.voice_name == "en-US-Neural2-C"
            })
            .times(1)
            .returning(|_| Ok(b"mp3".to_vec()));

        let dispatcher = create_dispatcher(gateway, synthesizer, registry);
        let report = dispatcher.dispatch(&create_test_alert()).await.unwrap();

        assert_eq!(
            report,
            DispatchReport {
                delivered: 2,
                failed: 0,
                skipped: 0
            }
        );
    }

    #[tokio::test]
    async fn test_dispatch_never_plays_to_bots_only() {
        let registry = create_registry(&[(1, BOT_CHANNEL)]).await;

        let mut gateway = create_gateway();
        gateway.expect_play_audio().never();
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_synthesize().never();

        let dispatcher = create_dispatcher(gateway, synthesizer, registry);
        let report = dispatcher.dispatch(&create_test_alert()).await.unwrap();

        assert_eq!(report.delivered, 0);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_dispatch_aborts_on_synthesis_error() {
        let registry = create_registry(&[(1, HUMAN_CHANNEL)]).await;

        let mut gateway = create_gateway();
        gateway.expect_play_audio().never();
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_synthesize().returning(|_| {
            Err(SynthesisError::InvalidAudio("empty audio".to_string()))
        });

        let dispatcher = create_dispatcher(gateway, synthesizer, registry);
        assert!(dispatcher.dispatch(&create_test_alert()).await.is_err());
    }

    #[tokio::test]
    async fn test_dispatch_isolates_channel_failures() {
        let registry = create_registry(&[
            (1, HUMAN_CHANNEL),
            (1, BOT_CHANNEL),
            (2, OTHER_GUILD_CHANNEL),
            (3, UNKNOWN_CHANNEL),
        ])
        .await;

        let mut gateway = create_gateway();
        gateway.expect_play_audio().returning(|session, _| {
            if session.channel_id.get() == HUMAN_CHANNEL {
                Err(VoiceError::Playback {
                    channel_id: session.channel_id,
                    reason: "decoder error".to_string(),
                })
            } else {
                Ok(())
            }
        });
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .times(1)
            .returning(|_| Ok(b"mp3".to_vec()));

        let dispatcher = create_dispatcher(gateway, synthesizer, registry);
        let report = dispatcher.dispatch(&create_test_alert()).await.unwrap();

        assert_eq!(
            report,
            DispatchReport {
                delivered: 1,
                failed: 1,
                skipped: 2
            }
        );
    }

    #[tokio::test]
    async fn test_dispatch_without_registered_channel() {
        let registry = Arc::new(VoiceChannelRegistry::new(&[]));

        let gateway = create_gateway();
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_synthesize().never();

        let dispatcher = create_dispatcher(gateway, synthesizer, registry);
        let report = dispatcher.dispatch(&create_test_alert()).await.unwrap();
        assert_eq!(report, DispatchReport::default());
    }
}
