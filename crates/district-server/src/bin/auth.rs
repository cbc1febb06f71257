use district_server::{ServerConfig, init_tracing, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    init_tracing();

    let state = config.app_state(&config.auth_db_path)?;
    let router = district_api::auth_router(state);

    serve("auth", router, &config.host, config.auth_port).await
}
