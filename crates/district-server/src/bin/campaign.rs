use district_server::{ServerConfig, init_tracing, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    init_tracing();

    let state = config.app_state(&config.campaign_db_path)?;
    let router = district_api::campaign_router(state);

    serve("campaign", router, &config.host, config.campaign_port).await
}
