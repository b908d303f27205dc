use std::net::SocketAddr;

use promptverse::{
    config::Config,
    create_app,
    database::Database,
    handlers::AppState,
    services::{catalog, RedisService},
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("promptverse=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(port = config.port, "Configuration loaded");

    let database = Database::new(&config.database_url).await?;
    database.migrate().await?;
    info!("Database migrations applied");

    catalog::seed(&database).await?;

    // The leaderboard cache is optional; run without it when redis is down.
    let redis = match config.redis_url.as_deref() {
        Some(url) => match RedisService::new(url).await {
            Ok(redis) => Some(redis),
            Err(e) => {
                warn!(error = %e, "Redis unavailable, leaderboard cache disabled");
                None
            }
        },
        None => None,
    };

    let port = config.port;
    let state = AppState::new(config, database, redis)?;
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("PromptVerse listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
