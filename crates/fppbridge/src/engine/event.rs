use super::state::MediaPlayerState;

/// Events published to engine subscribers.
///
/// Distinct from `FromIntegrationMessage` (transport-level). The engine converts
/// `FromIntegrationMessage` into `Event` once the state snapshot is updated.
#[derive(Debug, Clone)]
pub enum Event {
    MediaPlayerStateChanged {
        entity_id: String,
        state: MediaPlayerState,
    },
    EntityRemoved {
        entity_id: String,
    },
}
