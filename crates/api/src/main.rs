use anyhow::Context;

use wrenchbook_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wrenchbook_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let bind_addr = config.bind_addr.clone();

    let app = wrenchbook_api::app::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(bind_addr.as_str())
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
