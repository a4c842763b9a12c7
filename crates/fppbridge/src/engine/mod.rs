#[allow(clippy::module_inception)]
mod engine;
mod event;
mod integration;
mod message;
pub mod state;

pub use engine::Engine;
pub use event::Event;
pub use integration::FromIntegrationSender;
pub use integration::Integration;
pub use integration::IntegrationContext;
pub use integration::IntegrationError;
pub use integration::IntegrationFactoryResult;
pub use integration::REGISTRY as INTEGRATION_REGISTRY;
pub use message::FromIntegrationMessage;
pub use message::MediaPlayerCommand;
pub use message::ToIntegrationMessage;
pub use state::MediaPlayerFeatures;
pub use state::MediaPlayerState;
pub use state::PlayerStatus;
pub use state::RepeatMode;
pub use state::State;
