//! Contract between the engine and the integrations that own entities.
//!
//! Integrations report to the engine over one shared bounded channel and
//! receive commands over their own unbounded channel. Routing a command never
//! waits on a device: `handle_message` only hands the command to whatever
//! task drives the entity.

use async_trait::async_trait;
use linkme::distributed_slice;
use tokio::sync::mpsc;

use super::message::FromIntegrationMessage;
use super::message::ToIntegrationMessage;
use crate::config::Config;

/// Reports buffered before integrations wait on the engine
pub const FROM_INTEGRATION_CHANNEL_SIZE: usize = 1024;

pub type FromIntegrationSender = mpsc::Sender<FromIntegrationMessage>;
pub type FromIntegrationReceiver = mpsc::Receiver<FromIntegrationMessage>;
pub type ToIntegrationSender = mpsc::UnboundedSender<ToIntegrationMessage>;

/// A message that could not be delivered between the engine and an integration
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("no integration owns entity {0}")]
    UnknownEntity(String),

    /// The task that should receive the message has exited
    #[error("{0} is not running")]
    Stopped(String),

    #[error("engine is no longer accepting messages")]
    EngineClosed,
}

impl From<mpsc::error::SendError<FromIntegrationMessage>> for IntegrationError {
    fn from(_: mpsc::error::SendError<FromIntegrationMessage>) -> Self {
        IntegrationError::EngineClosed
    }
}

/// Result type for integration factory functions
pub type IntegrationFactoryResult = anyhow::Result<Option<Box<dyn Integration>>>;

pub struct IntegrationContext<'a> {
    pub config: &'a Config,
}

/// Integration factories. Each returns `None` when its config section is absent.
#[distributed_slice]
pub static REGISTRY: [fn(&IntegrationContext) -> IntegrationFactoryResult];

#[async_trait]
pub trait Integration: Send + Sync {
    fn name(&self) -> &str;

    /// Announce every entity with `EntityDiscovered`, then start reporting
    /// state changes on `tx`.
    async fn setup(&mut self, tx: FromIntegrationSender) -> Result<(), IntegrationError>;

    /// Queue a command for the addressed entity.
    ///
    /// Success means the command was accepted, not that the device carried
    /// it out. The outcome shows up in the next state report.
    fn handle_message(&mut self, msg: ToIntegrationMessage) -> Result<(), IntegrationError>;

    /// Stop background work and report `EntityRemoved` for every entity
    async fn shutdown(&mut self) -> Result<(), IntegrationError>;
}
