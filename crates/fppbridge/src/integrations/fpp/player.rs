use chrono::Utc;
use tracing::debug;
use tracing::info;

use super::api;
use super::api::Command;
use super::client::FppClient;
use super::error::FppError;
use crate::engine::MediaPlayerCommand;
use crate::engine::MediaPlayerFeatures;
use crate::engine::MediaPlayerState;
use crate::engine::PlayerStatus;
use crate::engine::RepeatMode;

/// Media player entity backed by one Falcon Pi Player
///
/// Owns the state record. The record is replaced by [`Player::refresh`];
/// commands fire a request and leave reading the result to the next refresh.
pub struct Player<C: FppClient> {
    /// Entity ID (e.g., "media_player.garage")
    entity_id: String,

    /// Human-readable name
    name: String,

    client: C,

    /// Topic for the MQTT repeat toggle; repeat is unsupported without one
    repeat_topic: Option<String>,

    state: MediaPlayerState,
}

impl<C: FppClient> Player<C> {
    pub fn new(id: &str, name: &str, client: C, repeat_topic: Option<String>) -> Self {
        let mut supported_features = MediaPlayerFeatures::VOLUME_SET
            | MediaPlayerFeatures::VOLUME_STEP
            | MediaPlayerFeatures::SELECT_SOURCE
            | MediaPlayerFeatures::STOP
            | MediaPlayerFeatures::PLAY
            | MediaPlayerFeatures::PAUSE
            | MediaPlayerFeatures::NEXT_TRACK
            | MediaPlayerFeatures::PREVIOUS_TRACK;
        if repeat_topic.is_some() {
            supported_features |= MediaPlayerFeatures::REPEAT_SET;
        }

        Self {
            entity_id: format!("media_player.{}", id),
            name: name.to_string(),
            client,
            repeat_topic,
            state: MediaPlayerState {
                status: PlayerStatus::Off,
                supported_features,
                ..Default::default()
            },
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &MediaPlayerState {
        &self.state
    }

    pub fn supported_features(&self) -> MediaPlayerFeatures {
        self.state.supported_features
    }

    /// Poll the device and replace the state record
    ///
    /// An unreachable device yields an unavailable, off state without any HTTP
    /// request. HTTP and decoding errors propagate and leave the state as it was.
    pub async fn refresh(&mut self) -> Result<(), FppError> {
        if !self.client.is_reachable().await {
            debug!("{} is unreachable", self.entity_id);
            let mut state = self.state.clone();
            state.available = false;
            state.status = PlayerStatus::Off;
            state.clear_playback();
            self.state = state;
            return Ok(());
        }

        let status = self.client.status().await?;
        let source_list = self.client.playable_playlists().await?;

        let mut state = self.state.clone();
        state.available = true;
        state.status = PlayerStatus::from_status_name(&status.status_name);
        state.volume_level = status.volume as f64 / 100.0;
        state.source_list = source_list;

        match state.status {
            PlayerStatus::Playing => {
                state.media_title = status.title();
                state.media_playlist = status.playlist();
                state.media_duration =
                    Some(status.seconds_played.saturating_add(status.seconds_remaining));
                state.media_position = Some(status.seconds_played);
                state.media_position_updated_at = Some(Utc::now());
            }
            // Keep showing what was playing
            PlayerStatus::Paused => {}
            PlayerStatus::Idle | PlayerStatus::Off => state.clear_playback(),
        }

        debug!(
            "{} refreshed: status={}, volume={}, title={:?}",
            self.entity_id, state.status, state.volume_level, state.media_title
        );
        self.state = state;
        Ok(())
    }

    /// Start a playlist
    pub async fn select_source(&self, source: &str) -> Result<(), FppError> {
        info!("{}: starting playlist '{}'", self.entity_id, source);
        self.client.get(&api::playlist_start_path(source)).await
    }

    /// Set volume from a level in 0.0-1.0
    pub async fn set_volume(&self, volume_level: f64) -> Result<(), FppError> {
        if !(0.0..=1.0).contains(&volume_level) {
            return Err(FppError::InvalidVolume(volume_level));
        }
        // Round rather than truncate so a level read back from the device
        // (percent / 100) maps to the same percent
        let percent = (volume_level * 100.0).round() as u8;
        info!("{}: volume is {}", self.entity_id, percent);
        self.client.command(&Command::volume_set(percent)).await
    }

    /// Increase volume by one step
    pub async fn volume_up(&self) -> Result<(), FppError> {
        self.client.command(&Command::volume_increase()).await
    }

    /// Decrease volume by one step
    pub async fn volume_down(&self) -> Result<(), FppError> {
        self.client.command(&Command::volume_decrease()).await
    }

    /// Immediately stop all playing sequences
    pub async fn stop(&self) -> Result<(), FppError> {
        self.client.get(api::STOP_PATH).await
    }

    pub async fn play(&self) -> Result<(), FppError> {
        self.client.get(api::RESUME_PATH).await
    }

    pub async fn pause(&self) -> Result<(), FppError> {
        self.client.get(api::PAUSE_PATH).await
    }

    pub async fn next_track(&self) -> Result<(), FppError> {
        self.client
            .get(&api::named_command_path(api::NEXT_PLAYLIST_ITEM))
            .await
    }

    pub async fn previous_track(&self) -> Result<(), FppError> {
        self.client
            .get(&api::named_command_path(api::PREV_PLAYLIST_ITEM))
            .await
    }

    /// Toggle playlist repeat through FPP's MQTT command
    ///
    /// FPP has a single repeat flag, so `One` sets it like `All`. The device
    /// does not report the flag back; the mode is recorded once the command
    /// succeeds.
    pub async fn set_repeat(&mut self, repeat: RepeatMode) -> Result<(), FppError> {
        let topic = self
            .repeat_topic
            .as_deref()
            .ok_or(FppError::Unsupported("repeat"))?;
        let value = match repeat {
            RepeatMode::Off => 0,
            RepeatMode::All | RepeatMode::One => 1,
        };

        self.client.command(&Command::mqtt(topic, value)).await?;
        self.state.repeat = repeat;
        Ok(())
    }

    /// Run a platform command against the device
    pub async fn execute(&mut self, command: &MediaPlayerCommand) -> Result<(), FppError> {
        match command {
            MediaPlayerCommand::Play => self.play().await,
            MediaPlayerCommand::Pause => self.pause().await,
            MediaPlayerCommand::Stop => self.stop().await,
            MediaPlayerCommand::NextTrack => self.next_track().await,
            MediaPlayerCommand::PreviousTrack => self.previous_track().await,
            MediaPlayerCommand::VolumeUp => self.volume_up().await,
            MediaPlayerCommand::VolumeDown => self.volume_down().await,
            MediaPlayerCommand::SetVolume { volume_level } => self.set_volume(*volume_level).await,
            MediaPlayerCommand::SelectSource { source } => self.select_source(source).await,
            MediaPlayerCommand::SetRepeat { repeat } => self.set_repeat(*repeat).await,
        }
    }
}
