use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quotaguard::config::ServiceConfig;
use quotaguard::http;
use quotaguard::hubspot::{HttpTransport, HubSpotClient, HubSpotRateLimiter};
use quotaguard::ratelimit::RateLimitManager;

#[derive(Debug, Parser)]
#[command(name = "quotaguard", about = "Rate-limit governor for CRM integrations")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address override
    #[arg(short, long)]
    listen: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting Quotaguard");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    info!(listen_addr = %config.server.listen_addr, "Configuration loaded");

    // Composition root: one governor instance, handed to every façade.
    let manager = Arc::new(RateLimitManager::new());
    for quota in &config.integrations {
        manager.register_integration(quota.clone());
    }
    let limiter = HubSpotRateLimiter::new(Arc::clone(&manager));
    info!(
        integrations = manager.integration_count(),
        "Rate-limit governor initialized"
    );

    let access_token = config.hubspot_access_token().unwrap_or_else(|| {
        warn!("No HubSpot access token configured; outbound calls will be rejected upstream");
        String::new()
    });
    let transport = HttpTransport::with_base_url(access_token, &config.hubspot.base_url);
    let client = Arc::new(HubSpotClient::with_transport(transport, limiter));

    let app = http::router(client);
    let listener = tokio::net::TcpListener::bind(config.server.listen_addr).await?;
    info!("Listening on {}", config.server.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Quotaguard stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
