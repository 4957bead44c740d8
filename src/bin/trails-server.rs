use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use trails::{
    config::ServerConfig,
    server::{AppState, auth::StaticCredentials, router},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env();
    let credentials = StaticCredentials::load(&config.users_file).map_err(|err| {
        format!("cannot load credentials from {}: {err}", config.users_file.display())
    })?;
    if credentials.is_empty() {
        warn!(path = %config.users_file.display(), "credentials file lists no users");
    }
    info!(
        users = credentials.len(),
        data_dir = %config.data_dir.display(),
        "loaded credentials"
    );

    let addr = config.bind_addr;
    let app = router(AppState::new(config, Arc::new(credentials)));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}
