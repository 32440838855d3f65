use anyhow::Result;
use tracing_subscriber::EnvFilter;

use gift_advisor::{Config, GiftAdvisor, api};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::load();
    let bind = config.bind_addr()?;

    let advisor = GiftAdvisor::from_config(&config);
    let router = api::router(advisor, &config.server.static_dir);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(
        %bind,
        static_dir = %config.server.static_dir,
        model = %config.openrouter.model,
        "Server running"
    );
    tracing::info!(
        openrouter_key = config.openrouter_key_present(),
        unsplash_key = config.unsplash_key_present(),
        "Environment check"
    );

    axum::serve(listener, router).await?;
    Ok(())
}
