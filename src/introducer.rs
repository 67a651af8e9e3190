//! Greetings for members joining a voice channel.
//!
//! When a human moves into a voice channel the bot follows and plays:
//!
//! - a **welcome** if nobody else is there: `welcomes/<user_id>.mp3`, or
//!   `welcomes/default.mp3`
//! - an **introduction** to the members already there: `intros/<user_id>.mp3`,
//!   else a spoken "<name> has joined the chat", else `intros/default.mp3`
//!
//! Spoken introductions are kept in memory, one per user and name.

use std::{collections::HashMap, sync::Arc};

use log::{debug, error, info, warn};
use serenity::all::{ChannelId, GuildId, UserId};
use tokio::sync::Mutex;

use crate::{
    sounds::SoundLibrary,
    tts::{SpeechRequest, SpeechSynthesizer},
    utils::spoken_name,
    voice::{VoiceGateway, VoicePlayer, has_human_members},
};

/// The greeting chosen for a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Greeting {
    Welcome,
    Introduction,
}

/// Plays welcomes and introductions.
pub struct Introducer<V: VoiceGateway, S: SpeechSynthesizer> {
    player: Arc<VoicePlayer<V>>,
    synthesizer: Arc<S>,
    sounds: Arc<SoundLibrary>,
    language_code: String,
    voice_name: String,
    /// Synthesized introductions by user, with the name they were spoken for
    spoken_intros: Mutex<HashMap<UserId, (String, Vec<u8>)>>,
}

impl<V: VoiceGateway, S: SpeechSynthesizer> Introducer<V, S> {
    pub fn new(
        player: Arc<VoicePlayer<V>>,
        synthesizer: Arc<S>,
        sounds: Arc<SoundLibrary>,
        language_code: &str,
        voice_name: &str,
    ) -> Self {
        Introducer {
            player,
            synthesizer,
            sounds,
            language_code: language_code.to_string(),
            voice_name: voice_name.to_string(),
            spoken_intros: Mutex::new(HashMap::new()),
        }
    }

    /// Greets a human who just moved into a channel.
    ///
    /// # Arguments
    ///
    /// * `guild_id` - The guild of the channel.
    /// * `channel_id` - The channel the member moved into.
    /// * `user_id` - The member.
    /// * `display_name` - Name of the member in the guild.
    ///
    /// # Returns
    ///
    /// The greeting played, `None` if nothing could be played.
    pub async fn greet(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        user_id: UserId,
        display_name: &str,
    ) -> Option<Greeting> {
        let members = match self
            .player
            .gateway()
            .list_voice_channel_members(guild_id, channel_id)
        {
            Ok(members) => members,
            Err(e) => {
                warn!("cannot greet {} in channel {}: {}", user_id, channel_id, e);
                return None;
            }
        };

        let (greeting, audio) = if has_human_members(&members, 2) {
            (Greeting::Introduction, self.introduction(user_id, display_name).await)
        } else {
            (Greeting::Welcome, self.sounds.welcome(user_id).await)
        };

        let Some(audio) = audio else {
            warn!("no {:?} sound for {}", greeting, user_id);
            return None;
        };

        info!("{:?} for {} in channel {}", greeting, display_name, channel_id);
        if let Err(e) = self.player.play_on_channel(guild_id, channel_id, audio).await {
            error!("failed to greet {} in channel {}: {}", user_id, channel_id, e);
            return None;
        }

        Some(greeting)
    }

    async fn introduction(&self, user_id: UserId, display_name: &str) -> Option<Vec<u8>> {
        if let Some(audio) = self.sounds.intro(user_id).await {
            return Some(audio);
        }

        let name = spoken_name(display_name);
        let cached = self
            .spoken_intros
            .lock()
            .await
            .get(&user_id)
            .filter(|(spoken_for, _)| *spoken_for == name)
            .map(|(_, audio)| audio.clone());
        if cached.is_some() {
            debug!("reusing spoken introduction of {}", user_id);
            return cached;
        }

        let request = SpeechRequest::new(
            &format!("{} has joined the chat", name),
            &self.language_code,
            &self.voice_name,
        );
        match self.synthesizer.synthesize(&request).await {
            Ok(audio) => {
                self.spoken_intros
                    .lock()
                    .await
                    .insert(user_id, (name, audio.clone()));
                Some(audio)
            }
            Err(e) => {
                warn!("failed to synthesize introduction of {}: {}", user_id, e);
                self.sounds.default_intro().await
            }
        }
    }
}
