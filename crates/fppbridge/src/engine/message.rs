//! Type-safe message system for fppbridge
//!
//! Messages are split by direction to enforce correct usage at compile time:
//! - `FromIntegrationMessage`: Events from integrations to the engine
//! - `ToIntegrationMessage`: Commands from the engine to integrations

use serde::Deserialize;
use serde::Serialize;

use super::state::MediaPlayerState;
use super::state::RepeatMode;

/// Messages FROM integrations TO the engine (events/state updates)
#[derive(Debug, Clone)]
pub enum FromIntegrationMessage {
    /// An entity was discovered and registered
    EntityDiscovered {
        entity_id: String,
        integration_name: String,
    },

    /// An entity was removed
    EntityRemoved { entity_id: String },

    /// A media player's state changed
    MediaPlayerStateChanged {
        entity_id: String,
        state: MediaPlayerState,
    },
}

/// A command for a media player entity.
///
/// Deserializes from e.g. `{"command": "select_source", "source": "Show1"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MediaPlayerCommand {
    Play,
    Pause,
    Stop,
    NextTrack,
    PreviousTrack,
    VolumeUp,
    VolumeDown,
    SetVolume { volume_level: f64 },
    SelectSource { source: String },
    SetRepeat { repeat: RepeatMode },
}

/// Messages FROM the engine TO integrations (commands)
#[derive(Debug, Clone)]
pub enum ToIntegrationMessage {
    /// Command to a media player
    MediaPlayerCommand {
        entity_id: String,
        command: MediaPlayerCommand,
    },
}

impl ToIntegrationMessage {
    /// Entity the message is addressed to
    pub fn entity_id(&self) -> &str {
        match self {
            ToIntegrationMessage::MediaPlayerCommand { entity_id, .. } => entity_id,
        }
    }
}
