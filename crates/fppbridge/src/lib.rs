pub mod api;
pub mod config;
mod engine;
pub mod integrations;

pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
pub use engine::Engine;
pub use engine::Event;
pub use engine::MediaPlayerCommand;
pub use engine::MediaPlayerFeatures;
pub use engine::MediaPlayerState;
pub use engine::PlayerStatus;
pub use engine::RepeatMode;
pub use engine::State;
