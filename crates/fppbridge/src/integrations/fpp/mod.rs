mod api;
mod client;
mod config;
mod error;
#[allow(clippy::module_inception)]
mod fpp;
mod player;

use std::time::Duration;

use anyhow::Context;
pub use client::FppClient;
pub use client::HttpFppClient;
pub use config::Config as FppConfig;
pub use config::PlayerConfig as FppPlayerConfig;
pub use error::FppError;
pub use fpp::FppIntegration;
use linkme::distributed_slice;
pub use player::Player;
use tracing::info;

use crate::engine;

#[distributed_slice(engine::INTEGRATION_REGISTRY)]
fn init_fpp(ctx: &engine::IntegrationContext) -> engine::IntegrationFactoryResult {
    let fpp_config = if let Some(c) = &ctx.config.integrations.fpp {
        c
    } else {
        return Ok(None);
    };

    if fpp_config.players.is_empty() {
        info!("FPP integration configured without players, skipping");
        return Ok(None);
    }

    let mut integration = FppIntegration::new(Duration::from_secs(fpp_config.scan_interval_secs));
    for (id, player_config) in &fpp_config.players {
        let client = HttpFppClient::new(
            player_config.host.get_ref(),
            Duration::from_millis(player_config.probe_timeout_ms),
            player_config.request_timeout_secs.map(Duration::from_secs),
        )
        .with_context(|| format!("Failed to create HTTP client for FPP player '{}'", id))?;

        integration.add_player(Player::new(
            id,
            &player_config.name,
            client,
            player_config.repeat_topic.clone(),
        ));
    }

    Ok(Some(Box::new(integration)))
}
