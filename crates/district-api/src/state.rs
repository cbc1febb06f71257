use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};

use district_db::Database;

use crate::error::ApiError;
use crate::token::TokenCodec;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenCodec,
    pub token_ttl: Duration,
}

impl AppStateInner {
    /// Signs a token for `subject` valid for `token_ttl` from now.
    pub fn issue_token(&self, subject: &str) -> Result<String, ApiError> {
        self.issue_token_at(subject, Utc::now())
    }

    fn issue_token_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, ApiError> {
        // Claims carry microseconds; truncate so the token expires exactly
        // at issued_at + token_ttl.
        let now = now.trunc_subsecs(6);
        self.tokens
            .sign(subject, now, now + self.token_ttl)
            .map_err(ApiError::internal)
    }
}

/// Runs blocking DB work off the async runtime. The closure keeps running
/// to completion even if the client goes away, so a transaction inside it
/// always either commits or rolls back.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("spawn_blocking join error: {e}")))?
}
