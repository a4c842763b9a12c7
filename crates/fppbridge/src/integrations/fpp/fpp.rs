use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::client::FppClient;
use super::player::Player;
use crate::engine::FromIntegrationMessage;
use crate::engine::FromIntegrationSender;
use crate::engine::Integration;
use crate::engine::IntegrationError;
use crate::engine::MediaPlayerCommand;
use crate::engine::MediaPlayerState;
use crate::engine::ToIntegrationMessage;

const INTEGRATION_NAME: &str = "fpp";

/// A player plus the last state reported to the engine
struct PlayerEntry<C: FppClient> {
    player: Player<C>,
    last_reported: Option<MediaPlayerState>,
}

/// Type alias for a player shared between its poll task and command task
type SharedEntry<C> = Arc<Mutex<PlayerEntry<C>>>;

/// Falcon Pi Player integration for fppbridge
///
/// Each player gets a poll task and a command task. Both take the player's
/// lock, so a refresh and a command for the same player never overlap, while
/// a slow device only delays its own commands.
pub struct FppIntegration<C: FppClient> {
    scan_interval: Duration,
    /// Players keyed by entity ID
    players: HashMap<String, SharedEntry<C>>,
    /// Command queues keyed by entity ID, filled in by setup
    commands: HashMap<String, mpsc::UnboundedSender<MediaPlayerCommand>>,
    to_engine: Option<FromIntegrationSender>,
    tasks: Vec<JoinHandle<()>>,
}

impl<C: FppClient + 'static> FppIntegration<C> {
    /// Create a new FPP integration
    pub fn new(scan_interval: Duration) -> Self {
        Self {
            scan_interval,
            players: HashMap::new(),
            commands: HashMap::new(),
            to_engine: None,
            tasks: Vec::new(),
        }
    }

    /// Add a player. Must be called before setup.
    pub fn add_player(&mut self, player: Player<C>) {
        let entity_id = player.entity_id().to_string();
        info!("Adding FPP player {} ({})", player.name(), entity_id);
        self.players.insert(
            entity_id,
            Arc::new(Mutex::new(PlayerEntry {
                player,
                last_reported: None,
            })),
        );
    }

    /// Refresh one player and report its state if it changed
    async fn refresh_and_report(entry: &mut PlayerEntry<C>, to_engine: &FromIntegrationSender) {
        let entity_id = entry.player.entity_id().to_string();

        if let Err(e) = entry.player.refresh().await {
            warn!("Failed to refresh {}: {}", entity_id, e);
            return;
        }

        let state = entry.player.state().clone();
        if entry.last_reported.as_ref() == Some(&state) {
            debug!("No change for {}", entity_id);
            return;
        }

        let msg = FromIntegrationMessage::MediaPlayerStateChanged {
            entity_id: entity_id.clone(),
            state: state.clone(),
        };
        if let Err(e) = to_engine.send(msg).await {
            warn!("Failed to send MediaPlayerStateChanged message: {}", e);
            return;
        }
        entry.last_reported = Some(state);
    }

    /// Poll a player until the engine goes away
    async fn poll_task(
        entry: SharedEntry<C>,
        scan_interval: Duration,
        to_engine: FromIntegrationSender,
    ) {
        let mut ticker = tokio::time::interval(scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !to_engine.is_closed() {
            // First tick completes immediately
            ticker.tick().await;
            let mut entry = entry.lock().await;
            Self::refresh_and_report(&mut entry, &to_engine).await;
        }
    }

    /// Run queued commands for one player, refreshing after each so the
    /// effect is reported without waiting for the next poll
    async fn command_task(
        entry: SharedEntry<C>,
        mut commands: mpsc::UnboundedReceiver<MediaPlayerCommand>,
        to_engine: FromIntegrationSender,
    ) {
        while let Some(command) = commands.recv().await {
            let mut entry = entry.lock().await;
            let entity_id = entry.player.entity_id().to_string();
            info!("Handling command for {}: {:?}", entity_id, command);

            match entry.player.execute(&command).await {
                Ok(()) => Self::refresh_and_report(&mut entry, &to_engine).await,
                Err(e) => warn!("Command {:?} for {} failed: {}", command, entity_id, e),
            }
        }
    }
}

#[async_trait]
impl<C: FppClient + 'static> Integration for FppIntegration<C> {
    fn name(&self) -> &str {
        INTEGRATION_NAME
    }

    async fn setup(&mut self, tx: FromIntegrationSender) -> Result<(), IntegrationError> {
        self.to_engine = Some(tx.clone());

        for (entity_id, entry) in &self.players {
            tx.send(FromIntegrationMessage::EntityDiscovered {
                entity_id: entity_id.clone(),
                integration_name: INTEGRATION_NAME.to_string(),
            })
            .await?;
            info!("Registered entity: {}", entity_id);

            let (command_tx, command_rx) = mpsc::unbounded_channel();
            self.commands.insert(entity_id.clone(), command_tx);

            self.tasks.push(tokio::spawn(Self::command_task(
                entry.clone(),
                command_rx,
                tx.clone(),
            )));
            self.tasks.push(tokio::spawn(Self::poll_task(
                entry.clone(),
                self.scan_interval,
                tx.clone(),
            )));
        }

        info!(
            "FPP integration polling {} player(s) every {:?}",
            self.players.len(),
            self.scan_interval
        );
        Ok(())
    }

    fn handle_message(&mut self, msg: ToIntegrationMessage) -> Result<(), IntegrationError> {
        match msg {
            ToIntegrationMessage::MediaPlayerCommand { entity_id, command } => {
                if !self.players.contains_key(&entity_id) {
                    return Err(IntegrationError::UnknownEntity(entity_id));
                }

                let stopped =
                    || IntegrationError::Stopped(format!("command queue for {}", entity_id));
                self.commands
                    .get(&entity_id)
                    .ok_or_else(stopped)?
                    .send(command)
                    .map_err(|_| stopped())
            }
        }
    }

    async fn shutdown(&mut self) -> Result<(), IntegrationError> {
        info!("FPP integration shutting down");
        self.commands.clear();
        for task in self.tasks.drain(..) {
            task.abort();
        }

        if let Some(to_engine) = self.to_engine.take() {
            for entity_id in self.players.keys() {
                let msg = FromIntegrationMessage::EntityRemoved {
                    entity_id: entity_id.clone(),
                };
                if to_engine.send(msg).await.is_err() {
                    debug!("Engine gone, not removing {}", entity_id);
                }
            }
        }
        Ok(())
    }
}
