use tracing::info;
use ordereda::VERSION;
use ordereda::interface::api::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    info!("ordereda version: {}", VERSION);

    let config = ServerConfig::from_env()?;
    info!(
        max_upload_bytes = config.max_upload_bytes,
        max_sessions = config.max_sessions,
        default_strategy = %config.default_strategy,
        "configuration loaded"
    );

    start_server(config).await?;
    Ok(())
}
