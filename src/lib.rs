pub mod channels;    // Broadcast channels between hub and host
pub mod client;      // Register client boundary
pub mod command;     // User commands
pub mod config;      // Configuration management
pub mod control;     // Control point and select descriptors
pub mod coordinator; // Poll orchestration and command dispatch
pub mod error;       // Error types
pub mod guard;       // Single-flight busy guard
pub mod hub;         // Device session and presentation API
pub mod logging;     // Logger setup
pub mod mode;        // Extended control modes
pub mod prelude;     // Common imports and types
pub mod scheduler;   // Periodic refresh
pub mod snapshot;    // Snapshot store
pub mod version;     // Client library version gate

const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use crate::scheduler::Scheduler;

/// Builds a `C` from `config`, initializes the hub and runs the scheduler
/// and command receiver until `shutdown_rx` fires.
pub async fn app<C: RegisterClient + 'static>(
    config: Config,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    logging::init(config.loglevel());
    info!("fronius-bridge {} starting", CARGO_PKG_VERSION);

    let channels = Channels::new();

    info!("Initializing hub {}...", config.hub_id());
    let hub = Hub::<C>::connect(config, channels).await?;

    info!("  Starting scheduler...");
    let scheduler = Scheduler::new(hub.clone());
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            error!("Scheduler task failed: {}", e);
        }
    });

    info!("  Starting command receiver...");
    let receiver_hub = hub.clone();
    let receiver_handle = tokio::spawn(async move {
        if let Err(e) = receiver_hub.start().await {
            error!("Command receiver failed: {}", e);
        }
    });

    info!("Waiting for shutdown signal...");
    let _ = shutdown_rx.recv().await;

    info!("Shutdown signal received, stopping components...");
    hub.stop();

    if let Err(e) = scheduler_handle.await {
        error!("Error waiting for scheduler task: {}", e);
    }
    if let Err(e) = receiver_handle.await {
        error!("Error waiting for command receiver task: {}", e);
    }
    hub.close().await;

    if let Ok(stats) = hub.coordinator().stats.lock() {
        stats.print_summary();
    }

    info!("Shutdown complete");
    Ok(())
}

/// Runs `app` until ctrl-c.
pub async fn run<C: RegisterClient + 'static>(config: Config) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
        }
        let _ = shutdown_tx.send(());
    });

    app::<C>(config, shutdown_rx).await
}
