//! Elixir reminders.
//!
//! Elixirs last 30 minutes in Diablo IV. Players in a registered channel get
//! a spoken reminder a short while after the first of them joins, then at a
//! fixed interval for as long as somebody is listening.
//!
//! The [`ElixirSchedule`] holds the per-channel timing and has no I/O. The
//! [`ElixirAlerter`] feeds it from a periodic task and from presence changes,
//! and plays a random reminder sound when it says so.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use log::{debug, error, info, warn};
use serenity::all::{ChannelId, GuildId};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    sounds::SoundLibrary,
    voice::{VoiceChannelRegistry, VoiceGateway, VoicePlayer, is_eligible},
};

/// What the schedule decided for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElixirDecision {
    /// Nobody is listening, the schedule was cleared
    Cleared,
    /// Somebody arrived, the first reminder is set for the given time
    Armed(DateTime<Utc>),
    /// The next reminder is not due before the given time
    Waiting(DateTime<Utc>),
    /// A reminder is due, the next one is set for the given time
    Play(DateTime<Utc>),
}

/// Per-channel reminder times.
pub struct ElixirSchedule {
    /// Delay between the first human joining and the first reminder
    after_join_delay: TimeDelta,
    /// Delay between two reminders
    interval: TimeDelta,
    /// Next reminder per channel, `None` while the channel is empty
    next_alert_times: HashMap<ChannelId, Option<DateTime<Utc>>>,
}

impl ElixirSchedule {
    pub fn new(after_join_delay: TimeDelta, interval: TimeDelta) -> Self {
        ElixirSchedule {
            after_join_delay,
            interval,
            next_alert_times: HashMap::new(),
        }
    }

    /// Updates the schedule of a channel.
    ///
    /// # Arguments
    ///
    /// * `channel_id` - The channel to check.
    /// * `eligible` - `true` if a human is in the channel.
    /// * `new_member` - `true` if a human just joined the channel.
    /// * `now` - Current time.
    pub fn check(
        &mut self,
        channel_id: ChannelId,
        eligible: bool,
        new_member: bool,
        now: DateTime<Utc>,
    ) -> ElixirDecision {
        let next_alert_time = self.next_alert_times.entry(channel_id).or_insert(None);

        if !eligible {
            if next_alert_time.is_some() {
                info!("channel {} emptied, clearing elixir reminders", channel_id);
            }
            *next_alert_time = None;
            return ElixirDecision::Cleared;
        }

        let next = match *next_alert_time {
            Some(next) if !new_member => next,
            _ => {
                let first = now + self.after_join_delay;
                info!(
                    "member joined channel {}, first elixir reminder at {}",
                    channel_id, first
                );
                *next_alert_time = Some(first);
                return ElixirDecision::Armed(first);
            }
        };

        if next > now {
            debug!(
                "channel {}: {}s before the elixir reminder",
                channel_id,
                (next - now).num_seconds()
            );
            return ElixirDecision::Waiting(next);
        }

        let following = now + self.interval;
        *next_alert_time = Some(following);
        ElixirDecision::Play(following)
    }
}

/// Plays the elixir reminders on the registered channels.
pub struct ElixirAlerter<V: VoiceGateway> {
    player: Arc<VoicePlayer<V>>,
    registry: Arc<VoiceChannelRegistry>,
    sounds: Arc<SoundLibrary>,
    schedule: Mutex<ElixirSchedule>,
    polling_interval: Duration,
}

impl<V: VoiceGateway + 'static> ElixirAlerter<V> {
    pub fn new(
        player: Arc<VoicePlayer<V>>,
        registry: Arc<VoiceChannelRegistry>,
        sounds: Arc<SoundLibrary>,
        schedule: ElixirSchedule,
        polling_interval: Duration,
    ) -> Self {
        ElixirAlerter {
            player,
            registry,
            sounds,
            schedule: Mutex::new(schedule),
            polling_interval,
        }
    }

    /// Spawns the periodic check of every registered channel.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "checking elixir reminders every {} seconds",
                self.polling_interval.as_secs()
            );
            let mut interval = time::interval(self.polling_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                self.check_all(Utc::now()).await;
            }
        })
    }

    /// Checks every registered channel concurrently.
    pub async fn check_all(&self, now: DateTime<Utc>) {
        let channels = self.registry.channels().await;
        join_all(
            channels
                .into_iter()
                .map(|(guild_id, channel_id)| self.check_channel(guild_id, channel_id, false, now)),
        )
        .await;
    }

    /// Reacts to a human moving between channels.
    ///
    /// Leaving a registered channel re-checks it, so the schedule is cleared
    /// once the last human is gone. Otherwise arriving in a registered channel
    /// re-arms its schedule.
    pub async fn on_presence_change(
        &self,
        left: Option<ChannelId>,
        joined: Option<ChannelId>,
        now: DateTime<Utc>,
    ) {
        if left == joined {
            return;
        }

        if let Some((guild_id, channel_id)) = self.registered(left).await {
            self.check_channel(guild_id, channel_id, false, now).await;
        } else if let Some((guild_id, channel_id)) = self.registered(joined).await {
            self.check_channel(guild_id, channel_id, true, now).await;
        }
    }

    async fn registered(&self, channel_id: Option<ChannelId>) -> Option<(GuildId, ChannelId)> {
        let channel_id = channel_id?;
        let guild_id = self.registry.guild_of(channel_id).await?;
        Some((guild_id, channel_id))
    }

    /// Runs the schedule of one channel and plays a reminder when due.
    pub async fn check_channel(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        new_member: bool,
        now: DateTime<Utc>,
    ) -> ElixirDecision {
        let eligible = match self
            .player
            .gateway()
            .list_voice_channel_members(guild_id, channel_id)
        {
            Ok(members) => is_eligible(&members),
            Err(e) => {
                warn!("elixir reminder: channel {}: {}", channel_id, e);
                false
            }
        };

        let decision = self
            .schedule
            .lock()
            .await
            .check(channel_id, eligible, new_member, now);

        if let ElixirDecision::Play(_) = decision {
            info!("playing elixir reminder on channel {}", channel_id);
            match self.sounds.random_elixir_alert().await {
                Ok(audio) => {
                    if let Err(e) = self.player.play_on_channel(guild_id, channel_id, audio).await {
                        error!("elixir reminder on channel {} failed: {}", channel_id, e);
                    }
                }
                Err(e) => error!("no elixir reminder to play: {}", e),
            }
        }

        decision
    }
}
