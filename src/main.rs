use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use vidhost_rs::{
    build_state, create_app, init_observability, observability::Metrics, shutdown_observability,
    Config, HttpSettings,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first (basic logging only)
    let config = Config::from_environment().await?;
    println!("Configuration loaded successfully");

    init_observability(&config.observability)?;

    info!("Starting vidhost-rs service");
    info!(
        "Service: {} v{}",
        config.observability.service_name, config.observability.service_version
    );
    info!(
        "Supabase tables: videos={}, channels={}, waitlist={}",
        config.supabase.videos_table, config.supabase.channels_table, config.supabase.waitlist_table
    );

    let metrics = Arc::new(Metrics::new()?);
    info!("Metrics initialized successfully");

    let state = build_state(&config, metrics)?;
    info!("Services initialized successfully");

    let app = create_app(state, HttpSettings::from(&config.server));

    let addr: SocketAddr = config.server.bind_address().parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    shutdown_observability().await;
    info!("Server shutdown complete");
    Ok(())
}
