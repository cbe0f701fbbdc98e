//! Todo API Authorizer
//!
//! Entry point for the bearer-token authorizer service.

use std::net::SocketAddr;
use std::sync::Arc;
use todo_authorizer::config::Config;
use todo_authorizer::observability::metrics::init_metrics_recorder;
use todo_authorizer::routes::{self, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Todo API Authorizer");

    // Missing issuer configuration is fatal here, never per request
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        issuer = %config.issuer,
        audience = ?config.audience,
        bind_address = %config.bind_address,
        key_cache_ttl_seconds = config.key_cache_ttl.as_secs(),
        key_cache_max_entries = config.key_cache_max_entries,
        jwks_fetch_timeout_seconds = config.jwks_fetch_timeout.as_secs(),
        jwt_clock_skew_seconds = config.jwt_clock_skew.as_secs(),
        "Configuration loaded successfully"
    );

    if let Some(dev) = &config.dev_identity {
        warn!(
            principal = %dev.principal_id(),
            "Development mode enabled: requests without an Authorization header are accepted"
        );
    }

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState::new(config));
    let app = routes::build_routes(state, metrics_handle);

    info!("Todo API Authorizer listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Todo API Authorizer shutdown complete");

    Ok(())
}

/// Initialize tracing. `LOG_FORMAT=json` selects structured JSON output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "todo_authorizer=info,authz=info,common=info,tower_http=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
