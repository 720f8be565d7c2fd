//! Relay web server - receives Fourthwall order webhooks and forwards
//! conversions to Tapfiliate.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relay::web::is_secret_configured;
use relay::{router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("relay_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        tapfiliate_api_key_set = config.tapfiliate_api_key.is_some(),
        tapfiliate_program_id = ?config.tapfiliate_program_id,
        tapfiliate_endpoint = config.outbound_shape.as_str(),
        webhook_secret_set = is_secret_configured(config.webhook_secret.as_deref()),
        signature_policy = config.verification_policy.as_str(),
        referral_policy = config.referral_policy.as_str(),
        allowed_event_types = ?config.allowed_event_types,
        allowed_statuses = ?config.allowed_statuses,
        request_timeout_ms = config.request_timeout_ms,
        "config_loaded"
    );

    if config.verification_policy.is_insecure() {
        warn!(
            signature_policy = config.verification_policy.as_str(),
            "signature_policy_insecure: webhooks may be accepted without a valid signature"
        );
    }
    if config.tapfiliate_api_key.is_none() || config.tapfiliate_program_id.is_none() {
        warn!("tapfiliate_credentials_missing: webhooks will be answered with 500");
    }

    let port = config.port;
    let state = AppState::new(config).context("Failed to build application state")?;
    info!(endpoint = %state.client.endpoint(), "tapfiliate_client_created");

    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("relay_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_shutting_down");
}
