use std::{path::PathBuf, sync::Arc};

use axum::{BoxError, error_handling::HandleErrorLayer, http::StatusCode};
use clap::Parser;
use tower::{ServiceBuilder, limit::ConcurrencyLimitLayer, timeout::TimeoutLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod config;
mod routes;

use config::ServerConfig;
use routes::AppState;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "HTTP service over a maritime traffic network",
    long_about = None
)]
struct Args {
    /// TOML file with the [server], [data] and [network] sections
    #[arg(short, long, default_value = "seaway.toml")]
    config: PathBuf,
}

async fn handle_layer_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "request timed out".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unhandled internal error: {err}"),
        )
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = ServerConfig::from_file(&args.config)?;
    tracing::info!("Loaded configuration from {}", args.config.display());

    let tables = config.traffic_network();
    let snapshots =
        tokio::task::spawn_blocking(move || seaway_core::loading::create_traffic_network(&tables))
            .await??;
    for summary in snapshots.summaries() {
        tracing::info!(
            kind = %summary.kind,
            nodes = summary.nodes,
            edges = summary.edges,
            "Network snapshot ready"
        );
    }

    let state = Arc::new(AppState {
        snapshots,
        matching: config.network.matching.clone(),
    });
    let app = routes::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(HandleErrorLayer::new(handle_layer_error))
            .layer(TimeoutLayer::new(config.server.request_timeout()))
            .layer(ConcurrencyLimitLayer::new(config.server.concurrency_limit)),
    );

    let listener = tokio::net::TcpListener::bind(config.server.bind).await?;
    tracing::info!("Listening on {}", config.server.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
