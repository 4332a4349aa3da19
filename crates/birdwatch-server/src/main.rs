mod api;
mod middleware;

use std::sync::Arc;

use anyhow::Context;
use birdwatch_ebird::EbirdClient;
use birdwatch_geo::{LocationResolver, NominatimClient};
use birdwatch_pipeline::Controller;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = birdwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let api_key = config
        .ebird_api_key
        .as_deref()
        .context("EBIRD_API_KEY is required to serve observations")?;
    let ebird = EbirdClient::with_base_url(
        api_key,
        config.request_timeout_secs,
        &config.user_agent,
        &config.ebird_base_url,
    )?;
    let geocoder = NominatimClient::with_base_url(
        config.request_timeout_secs,
        &config.user_agent,
        &config.geocoder_base_url,
    )?;

    let controller = Controller::new(
        Arc::new(ebird),
        Arc::new(LocationResolver::new(geocoder)),
        config.default_radius,
    );
    let app = build_app(AppState {
        controller: Arc::new(controller),
    });

    tracing::info!(
        env = %config.env,
        bind_addr = %config.bind_addr,
        radius_km = config.default_radius.km(),
        "starting birdwatch server"
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
