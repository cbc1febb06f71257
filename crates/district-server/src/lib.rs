use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use axum::Router;
use axum::http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE, LOCATION},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use district_api::{AppState, AppStateInner, TokenCodec};
use district_db::Database;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub token_leeway: chrono::Duration,
    pub host: String,
    pub auth_port: u16,
    pub campaign_port: u16,
    pub auth_db_path: PathBuf,
    pub campaign_db_path: PathBuf,
}

impl ServerConfig {
    /// Loads `.env` if present, then reads the `DISTRICT_*` variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = lookup("DISTRICT_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!(
                "DISTRICT_JWT_SECRET is unset or still a placeholder; \
                 both services must share the same secret"
            );
        }

        let token_ttl_hours: i64 = parse_or(&lookup, "DISTRICT_TOKEN_TTL_HOURS", 24)?;
        if token_ttl_hours <= 0 {
            bail!("DISTRICT_TOKEN_TTL_HOURS must be positive");
        }
        let token_leeway_secs: u32 = parse_or(&lookup, "DISTRICT_TOKEN_LEEWAY_SECS", 0)?;

        Ok(Self {
            jwt_secret,
            token_ttl: chrono::Duration::hours(token_ttl_hours),
            token_leeway: chrono::Duration::seconds(token_leeway_secs.into()),
            host: lookup("DISTRICT_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            auth_port: parse_or(&lookup, "DISTRICT_AUTH_PORT", 8081)?,
            campaign_port: parse_or(&lookup, "DISTRICT_CAMPAIGN_PORT", 8082)?,
            auth_db_path: lookup("DISTRICT_AUTH_DB_PATH")
                .unwrap_or_else(|| "district-auth.db".into())
                .into(),
            campaign_db_path: lookup("DISTRICT_CAMPAIGN_DB_PATH")
                .unwrap_or_else(|| "district-campaign.db".into())
                .into(),
        })
    }

    /// Opens the service's database and wires it to a codec built from the
    /// shared secret.
    pub fn app_state(&self, db_path: &Path) -> anyhow::Result<AppState> {
        let db = Database::open(db_path)
            .with_context(|| format!("failed to open database {}", db_path.display()))?;
        Ok(Arc::new(AppStateInner {
            db,
            tokens: TokenCodec::new(self.jwt_secret.as_bytes(), self.token_leeway),
            token_ttl: self.token_ttl,
        }))
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "district=debug,tower_http=debug".into()),
        )
        .init();
}

/// Binds `host:port` and serves `router` until Ctrl+C or SIGTERM.
pub async fn serve(name: &str, router: Router, host: &str, port: u16) -> anyhow::Result<()> {
    // Clients read issued tokens from the Authorization response header
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .expose_headers([AUTHORIZATION, LOCATION])
        .allow_credentials(false);

    let app = router.layer(cors).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("District {} service listening on {}", name, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("District {} service stopped", name);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
