use std::collections::HashMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use strum::EnumString;

/// Playback status of a media player.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlayerStatus {
    Off,
    #[default]
    Idle,
    Playing,
    Paused,
}

impl PlayerStatus {
    /// Map a status name reported by a device. Unknown names fall back to idle.
    pub fn from_status_name(name: &str) -> Self {
        name.parse().unwrap_or(PlayerStatus::Idle)
    }
}

/// Repeat mode of a media player.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

bitflags::bitflags! {
    /// Commands a media player accepts. Bit values follow Home Assistant's
    /// media player feature flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct MediaPlayerFeatures: u32 {
        const PAUSE = 1;
        const VOLUME_SET = 1 << 2;
        const PREVIOUS_TRACK = 1 << 4;
        const NEXT_TRACK = 1 << 5;
        const VOLUME_STEP = 1 << 10;
        const SELECT_SOURCE = 1 << 11;
        const STOP = 1 << 12;
        const PLAY = 1 << 14;
        const REPEAT_SET = 1 << 18;
    }
}

/// State of a media player entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaPlayerState {
    /// Whether the device answered the last reachability probe.
    pub available: bool,

    pub status: PlayerStatus,

    /// Volume level (0.0-1.0).
    pub volume_level: f64,

    pub media_title: Option<String>,

    /// Playlist currently running. Doubles as the selected source.
    pub media_playlist: Option<String>,

    /// Playlists that can be started.
    pub source_list: Vec<String>,

    /// Length of the current item, in seconds.
    pub media_duration: Option<u64>,

    /// Playback position, in seconds, as of `media_position_updated_at`.
    pub media_position: Option<u64>,

    pub media_position_updated_at: Option<DateTime<Utc>>,

    pub repeat: RepeatMode,

    pub supported_features: MediaPlayerFeatures,
}

impl MediaPlayerState {
    /// Clear the fields that only make sense while something is playing.
    pub fn clear_playback(&mut self) {
        self.media_title = None;
        self.media_playlist = None;
        self.media_duration = None;
        self.media_position = None;
        self.media_position_updated_at = None;
    }
}

/// Centralized snapshot of the entire engine state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct State {
    pub media_players: HashMap<String, MediaPlayerState>,
}
