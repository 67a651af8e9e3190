//! Registry of the voice channels receiving alerts.
//!
//! The configuration lists channel ids without their guild. The registry
//! learns the guild of each channel when the guild shows up on the gateway,
//! at startup or when the bot joins it. Entries are never removed.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info, warn};
use serenity::all::{ChannelId, GuildId};
use tokio::sync::RwLock;

/// A channel of a guild as seen when scanning the guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedChannel {
    pub channel_id: ChannelId,
    /// `true` for voice and stage channels
    pub voice: bool,
}

/// Configured alert channels, with the guild each one belongs to.
///
/// # Examples
///
/// ```no_run
/// let registry = VoiceChannelRegistry::new(&[1088975077179150479]);
/// registry.scan_guild(guild.id, &scanned_channels).await;
///
/// for (guild_id, channel_id) in registry.channels().await {
///     println!("{} -> {}", guild_id, channel_id);
/// }
/// ```
pub struct VoiceChannelRegistry {
    /// Channel ids from the configuration
    configured: HashSet<ChannelId>,
    /// Registered channels with their guild
    registered: RwLock<BTreeMap<ChannelId, GuildId>>,
}

impl VoiceChannelRegistry {
    /// Creates an empty registry accepting the given channel ids.
    pub fn new(channel_ids: &[u64]) -> Self {
        VoiceChannelRegistry {
            configured: channel_ids
                .iter()
                .filter(|id| **id != 0)
                .map(|id| ChannelId::new(*id))
                .collect(),
            registered: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers the configured channels found in a guild.
    ///
    /// Channels already registered are left untouched, configured channels
    /// that are not voice channels are reported and skipped.
    ///
    /// # Returns
    ///
    /// The channels newly registered by this scan.
    pub async fn scan_guild(
        &self,
        guild_id: GuildId,
        channels: &[ScannedChannel],
    ) -> Vec<ChannelId> {
        let mut registered = self.registered.write().await;
        let mut added = Vec::new();

        for channel in channels {
            if !self.configured.contains(&channel.channel_id)
                || registered.contains_key(&channel.channel_id)
            {
                continue;
            }

            if !channel.voice {
                warn!(
                    "configured channel {} of guild {} is not a voice channel",
                    channel.channel_id, guild_id
                );
                continue;
            }

            info!(
                "registered voice channel {} of guild {}",
                channel.channel_id, guild_id
            );
            registered.insert(channel.channel_id, guild_id);
            added.push(channel.channel_id);
        }

        if added.is_empty() {
            debug!("no new alert channel in guild {}", guild_id);
        }

        added
    }

    /// Returns the guild of a registered channel.
    pub async fn guild_of(&self, channel_id: ChannelId) -> Option<GuildId> {
        self.registered.read().await.get(&channel_id).copied()
    }

    /// Returns `true` if the channel is registered.
    pub async fn contains(&self, channel_id: ChannelId) -> bool {
        self.registered.read().await.contains_key(&channel_id)
    }

    /// Returns every registered channel as `(guild, channel)`, ordered by channel id.
    pub async fn channels(&self) -> Vec<(GuildId, ChannelId)> {
        self.registered
            .read()
            .await
            .iter()
            .map(|(channel_id, guild_id)| (*guild_id, *channel_id))
            .collect()
    }
}
