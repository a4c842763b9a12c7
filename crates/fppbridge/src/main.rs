use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use fppbridge::Config;
use fppbridge::Engine;
use fppbridge::LogLevel;
use fppbridge::api;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Bridge Falcon Pi Player show controllers into a media player API
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "fppbridge.toml")]
    config: PathBuf,

    /// Override the configured default log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

fn init_tracing(config: &Config, cli_level: Option<LogLevel>) {
    let level = cli_level.unwrap_or(config.logging.level);
    let filter = Targets::new()
        .with_default(LevelFilter::from(level))
        .with_targets(
            config
                .logging
                .overrides
                .iter()
                .map(|(target, level)| (target.clone(), LevelFilter::from(*level))),
        );

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.report());
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config, cli.log_level);

    tracing::info!("fppbridge starting");
    tracing::info!("Loaded config from: {}", cli.config.display());

    let engine = Arc::new(Engine::new());
    engine.register_integrations_from_config(&config);

    let engine_task = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run().await })
    };

    let mut api_shutdown = None;
    let mut api_task = None;
    if config.api.enabled {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let listen = config.api.listen.clone();
        let port = config.api.port;
        let engine = engine.clone();
        api_shutdown = Some(tx);
        api_task = Some(tokio::spawn(async move {
            if let Err(e) = api::serve(listen, port, engine, rx).await {
                tracing::error!("HTTP API server failed: {}", e);
            }
        }));
    } else {
        tracing::info!("HTTP API disabled");
    }

    tracing::info!("Press Ctrl+C to exit");
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received shutdown signal"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }

    if let Some(tx) = api_shutdown {
        let _ = tx.send(());
    }
    if let Some(task) = api_task {
        let _ = task.await;
    }

    engine.shutdown().await;
    engine_task.abort();

    tracing::info!("fppbridge shutdown complete");
    ExitCode::SUCCESS
}
