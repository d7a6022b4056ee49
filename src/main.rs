use chrono::Local;
use gig_calendar::{refresh, router, AppConfig, AppState};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = AppConfig::from_env()?;
    let port = config.port;
    info!(
        api = %config.api_url,
        weeks_past = config.weeks_past,
        weeks_future = config.weeks_future,
        policy = ?config.failure_policy,
        "loaded configuration"
    );

    let state = AppState::new(config);
    if state.config.refresh_on_start {
        let state = state.clone();
        tokio::spawn(async move {
            let location = state.config.default_location().to_string();
            if let Err(err) = refresh(&state, &location, Local::now().naive_local()).await {
                warn!("initial refresh failed: {err}");
            }
        });
    }

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
