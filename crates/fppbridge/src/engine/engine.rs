use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::event::Event;
use super::integration::FROM_INTEGRATION_CHANNEL_SIZE;
use super::integration::FromIntegrationReceiver;
use super::integration::FromIntegrationSender;
use super::integration::Integration;
use super::integration::IntegrationError;
use super::integration::ToIntegrationSender;
use super::message::FromIntegrationMessage;
use super::message::MediaPlayerCommand;
use super::message::ToIntegrationMessage;
use super::state::State;
use crate::engine::IntegrationContext;

/// fppbridge engine
///
/// This structure handles the flow of events, sending commands to the
/// correct integration, and maintaining a view of the world with State.
pub struct Engine {
    /// Centralized state snapshot (readers load the Arc, writer stores a new one)
    state: ArcSwap<State>,

    /// Map of entity_id -> integration name for routing messages
    entity_integration_map: std::sync::Mutex<HashMap<String, String>>,

    /// Communication channels to integrations (for commands)
    integration_channels: std::sync::Mutex<HashMap<String, ToIntegrationSender>>,

    /// Receive messages from integrations (events)
    message_rx: Mutex<FromIntegrationReceiver>,

    /// Sender for integrations to report events back to the engine
    message_tx: FromIntegrationSender,

    /// Fan-out of processed events to subscribers
    events: broadcast::Sender<Event>,

    /// Handles for integration tasks
    integration_handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

/// Events buffered per subscriber before it starts lagging
const EVENT_CHANNEL_SIZE: usize = 256;

impl Engine {
    /// Create a new Engine instance
    pub fn new() -> Self {
        let (message_tx, message_rx) = mpsc::channel(FROM_INTEGRATION_CHANNEL_SIZE);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            state: ArcSwap::new(Arc::default()),
            entity_integration_map: std::sync::Mutex::new(HashMap::new()),
            integration_channels: std::sync::Mutex::new(HashMap::new()),
            message_rx: Mutex::new(message_rx),
            message_tx,
            events,
            integration_handles: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Register integrations from configuration
    ///
    /// Runs every integration factory in the registry. Factories return
    /// `None` when their configuration section is absent.
    pub fn register_integrations_from_config(&self, cfg: &crate::config::Config) {
        let ctx = IntegrationContext { config: cfg };
        for constr in super::integration::REGISTRY {
            let integration = match constr(&ctx) {
                Ok(Some(i)) => i,
                Err(e) => {
                    error!("failed to setup integration: {:#}", e);
                    continue;
                }
                Ok(None) => continue,
            };
            let name = integration.name().to_string();
            self.register_integration(name, integration);
        }
    }

    /// Register an integration with the engine
    ///
    /// This spawns the integration in a background task, wires up channels,
    /// and starts its setup process.
    pub fn register_integration(&self, name: String, mut integration: Box<dyn Integration>) {
        let (to_integration_tx, mut to_integration_rx) = mpsc::unbounded_channel();
        let from_integration_tx = self.message_tx.clone();

        if let Ok(mut channels) = self.integration_channels.lock() {
            channels.insert(name.clone(), to_integration_tx);
        }

        info!("Registering integration '{}'", name);

        // Spawn integration task
        let handle = tokio::spawn(async move {
            // Setup integration (gives it the sender for events)
            if let Err(e) = integration.setup(from_integration_tx).await {
                warn!("Integration '{}' setup failed: {}", name, e);
                return;
            }

            // Process commands from engine
            while let Some(msg) = to_integration_rx.recv().await {
                if let Err(e) = integration.handle_message(msg) {
                    warn!("Integration '{}' failed to handle message: {}", name, e);
                }
            }

            if let Err(e) = integration.shutdown().await {
                warn!("Integration '{}' shutdown failed: {}", name, e);
            }
        });

        if let Ok(mut handles) = self.integration_handles.lock() {
            handles.push(handle);
        }
    }

    /// Send a command to an integration
    ///
    /// Routes the command to the integration that announced the entity.
    pub fn send_command(&self, msg: ToIntegrationMessage) -> Result<(), IntegrationError> {
        let entity_id = msg.entity_id();

        let integration_name = self
            .entity_integration_map
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(entity_id)
            .cloned()
            .ok_or_else(|| IntegrationError::UnknownEntity(entity_id.to_string()))?;

        let channels = self
            .integration_channels
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let stopped = || IntegrationError::Stopped(format!("integration '{}'", integration_name));

        channels
            .get(&integration_name)
            .ok_or_else(stopped)?
            .send(msg)
            .map_err(|_| stopped())
    }

    /// Send a command to a media player entity
    pub fn send_media_player_command(
        &self,
        entity_id: String,
        command: MediaPlayerCommand,
    ) -> Result<(), IntegrationError> {
        info!("Media player command for {}: {:?}", entity_id, command);
        self.send_command(ToIntegrationMessage::MediaPlayerCommand { entity_id, command })
    }

    /// Whether an integration has claimed this entity
    pub fn has_entity(&self, entity_id: &str) -> bool {
        self.entity_integration_map
            .lock()
            .map(|map| map.contains_key(entity_id))
            .unwrap_or(false)
    }

    /// Run the engine's main event loop
    ///
    /// Processes incoming events from integrations and updates state.
    pub async fn run(&self) {
        info!("Engine starting");

        let mut rx = self.message_rx.lock().await;
        while let Some(msg) = rx.recv().await {
            self.handle_event(msg);
        }

        info!("Engine shutting down");
    }

    /// Get a snapshot of the current engine state.
    ///
    /// Clones the `Arc` (atomic refcount bump), essentially free.
    pub fn state_snapshot(&self) -> Arc<State> {
        self.state.load_full()
    }

    /// Subscribe to events processed by the engine
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Stop all integrations and wait for their tasks to finish.
    ///
    /// Dropping the command channels ends each integration's command loop,
    /// which then runs its `shutdown()`.
    pub async fn shutdown(&self) {
        if let Ok(mut channels) = self.integration_channels.lock() {
            channels.clear();
        }

        let handles: Vec<JoinHandle<()>> = match self.integration_handles.lock() {
            Ok(mut handles) => handles.drain(..).collect(),
            Err(_) => Vec::new(),
        };

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Integration task ended abnormally: {}", e);
            }
        }
    }

    fn publish(&self, event: Event) {
        // No subscribers is fine
        if self.events.send(event).is_err() {
            debug!("No event subscribers");
        }
    }

    /// Handle an event from an integration
    fn handle_event(&self, msg: FromIntegrationMessage) {
        match msg {
            FromIntegrationMessage::EntityDiscovered {
                entity_id,
                integration_name,
            } => {
                info!(
                    "Entity discovered: {} (from {})",
                    entity_id, integration_name
                );

                // Record which integration owns this entity for command routing.
                // State is not populated until the first state-change message arrives.
                if let Ok(mut map) = self.entity_integration_map.lock() {
                    map.insert(entity_id, integration_name);
                }
            }
            FromIntegrationMessage::EntityRemoved { entity_id } => {
                info!("Entity removed: {}", entity_id);

                {
                    let mut state = State::clone(&self.state.load());
                    state.media_players.remove(&entity_id);
                    self.state.store(Arc::new(state));
                }

                if let Ok(mut map) = self.entity_integration_map.lock() {
                    map.remove(&entity_id);
                }

                self.publish(Event::EntityRemoved { entity_id });
            }
            FromIntegrationMessage::MediaPlayerStateChanged { entity_id, state } => {
                info!(
                    "Media player state changed: {} -> {} (available={}, title={:?})",
                    entity_id, state.status, state.available, state.media_title
                );

                {
                    let mut snapshot = State::clone(&self.state.load());
                    snapshot
                        .media_players
                        .insert(entity_id.clone(), state.clone());
                    self.state.store(Arc::new(snapshot));
                }

                self.publish(Event::MediaPlayerStateChanged { entity_id, state });
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::engine::state::MediaPlayerState;
    use crate::engine::state::PlayerStatus;

    /// Integration that registers one entity and records the commands it receives
    struct RecordingIntegration {
        entity_id: String,
        received: mpsc::UnboundedSender<ToIntegrationMessage>,
    }

    #[async_trait]
    impl Integration for RecordingIntegration {
        fn name(&self) -> &str {
            "recording"
        }

        async fn setup(&mut self, tx: FromIntegrationSender) -> Result<(), IntegrationError> {
            tx.send(FromIntegrationMessage::EntityDiscovered {
                entity_id: self.entity_id.clone(),
                integration_name: "recording".to_string(),
            })
            .await?;
            Ok(())
        }

        fn handle_message(&mut self, msg: ToIntegrationMessage) -> Result<(), IntegrationError> {
            self.received
                .send(msg)
                .map_err(|_| IntegrationError::Stopped("recorder".to_string()))
        }

        async fn shutdown(&mut self) -> Result<(), IntegrationError> {
            Ok(())
        }
    }

    async fn wait_for_entity(engine: &Engine, entity_id: &str) {
        for _ in 0..100 {
            if engine.has_entity(entity_id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("entity {} never registered", entity_id);
    }

    #[tokio::test]
    async fn test_state_change_updates_snapshot_and_broadcasts() {
        let engine = Arc::new(Engine::new());
        let mut events = engine.subscribe();

        let runner = engine.clone();
        tokio::spawn(async move { runner.run().await });

        let state = MediaPlayerState {
            available: true,
            status: PlayerStatus::Playing,
            volume_level: 0.5,
            ..Default::default()
        };
        engine
            .message_tx
            .send(FromIntegrationMessage::MediaPlayerStateChanged {
                entity_id: "media_player.garage".to_string(),
                state: state.clone(),
            })
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            Event::MediaPlayerStateChanged {
                entity_id,
                state: received,
            } => {
                assert_eq!(entity_id, "media_player.garage");
                assert_eq!(received, state);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let snapshot = engine.state_snapshot();
        assert_eq!(snapshot.media_players.get("media_player.garage"), Some(&state));
    }

    #[tokio::test]
    async fn test_entity_removed_clears_state() {
        let engine = Arc::new(Engine::new());
        let mut events = engine.subscribe();

        let runner = engine.clone();
        tokio::spawn(async move { runner.run().await });

        engine
            .message_tx
            .send(FromIntegrationMessage::MediaPlayerStateChanged {
                entity_id: "media_player.garage".to_string(),
                state: MediaPlayerState::default(),
            })
            .await
            .unwrap();
        engine
            .message_tx
            .send(FromIntegrationMessage::EntityRemoved {
                entity_id: "media_player.garage".to_string(),
            })
            .await
            .unwrap();

        // State change, then removal
        let _ = events.recv().await.unwrap();
        let event = events.recv().await.unwrap();
        assert!(matches!(event, Event::EntityRemoved { .. }));
        assert!(engine.state_snapshot().media_players.is_empty());
    }

    #[tokio::test]
    async fn test_command_routed_to_owning_integration() {
        let engine = Arc::new(Engine::new());
        let runner = engine.clone();
        tokio::spawn(async move { runner.run().await });

        let (received_tx, mut received_rx) = mpsc::unbounded_channel();
        engine.register_integration(
            "recording".to_string(),
            Box::new(RecordingIntegration {
                entity_id: "media_player.garage".to_string(),
                received: received_tx,
            }),
        );

        wait_for_entity(&engine, "media_player.garage").await;

        engine
            .send_media_player_command(
                "media_player.garage".to_string(),
                MediaPlayerCommand::Play,
            )
            .unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(1), received_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let ToIntegrationMessage::MediaPlayerCommand { entity_id, command } = msg;
        assert_eq!(entity_id, "media_player.garage");
        assert_eq!(command, MediaPlayerCommand::Play);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_command_for_unknown_entity_fails() {
        let engine = Engine::new();
        let result = engine
            .send_media_player_command("media_player.nope".to_string(), MediaPlayerCommand::Stop);
        assert!(matches!(
            result,
            Err(IntegrationError::UnknownEntity(ref id)) if id == "media_player.nope"
        ));
    }
}
