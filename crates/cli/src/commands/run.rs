//! `blockpilot run`: the long-running agent.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use blockpilot_channels::{ChannelRegistry, ConsoleChannel, DiscordChannel, DiscordConfig};
use blockpilot_config::AppConfig;
use blockpilot_runtime::{Dispatcher, RuntimeSettings, SessionSlot, Supervisor};
use blockpilot_world::{SimSessionFactory, SimWorldConfig};

pub async fn run(console: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let settings = RuntimeSettings::from_config(&config);

    println!("blockpilot: starting agent");
    println!("   Server:   {} ({})", config.server.address(), config.server.version);
    println!("   Username: {}", config.server.username);
    println!("   Prefix:   {}", settings.prefix);

    let registry = Arc::new(blockpilot_commands::default_registry());
    let slot = SessionSlot::new();

    let factory = Arc::new(SimSessionFactory::new(
        config.server.address(),
        SimWorldConfig {
            username: config.server.username.clone(),
            ..SimWorldConfig::default()
        },
    ));
    let supervisor = Supervisor::new(factory, registry.clone(), slot.clone(), settings.clone());
    let dispatcher = Dispatcher::new(registry, slot, settings.behavior.show_coordinates);

    let mut channels = ChannelRegistry::new();
    if config.discord.enabled {
        let discord = DiscordChannel::new(DiscordConfig::from(&config.discord));
        discord.register_commands(dispatcher.slash_commands());
        channels.register(Arc::new(discord));
    }
    if console {
        channels.register(Arc::new(ConsoleChannel::new()));
        println!("   Console:  type /help, or exit to leave chat input");
    }
    if channels.is_empty() {
        warn!("No chat channel enabled; only in-game help is available");
    }
    for (name, healthy) in channels.health_check_all().await {
        if !healthy {
            warn!(channel = %name, "Channel reports unhealthy");
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let on_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => warn!(error = %e, "Could not listen for Ctrl+C, shutting down"),
        }
        on_signal.send_replace(true);
    });

    let dispatcher_shutdown = shutdown_rx.clone();
    let serving = async {
        if channels.is_empty() {
            return;
        }
        if let Err(e) = dispatcher.serve(&channels, dispatcher_shutdown).await {
            warn!(error = %e, "Chat channels failed to start");
        }
        // Every channel closed, e.g. `exit` typed on the console.
        shutdown_tx.send_replace(true);
    };
    tokio::join!(supervisor.run(shutdown_rx), serving);

    println!("blockpilot stopped after {} connection attempt(s)", supervisor.attempts());
    Ok(())
}
