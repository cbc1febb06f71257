use std::sync::OnceLock;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use rand_core::OsRng;
use tracing::info;
use uuid::Uuid;

use district_db::{AccountStore, StoreError};
use district_types::api::{SignInRequest, SignUpRequest};
use district_types::models::{Identity, NewAccount};

use crate::error::ApiError;
use crate::identity::IdentityContext;
use crate::state::{AppState, run_blocking};

const MIN_PASSWORD_LEN: usize = 7;

pub async fn sign_up(
    State(state): State<AppState>,
    Extension(ctx): Extension<IdentityContext>,
    WithRejection(Json(req), _): WithRejection<Json<SignUpRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if ctx.is_verified() {
        return Err(ApiError::ValidationFailed("already signed in".into()));
    }
    validate_sign_up(&req)?;

    let db = state.clone();
    let account = run_blocking(move || {
        if db.db.has_username(&req.username)? {
            return Err(ApiError::Conflict(format!(
                "username already exists: {}",
                req.username
            )));
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(ApiError::internal)?
            .to_string();

        // A concurrent sign-up can still win the race; the unique index
        // turns that into DuplicateAccount.
        let account = db.db.create_account(&NewAccount {
            id: Uuid::new_v4().to_string(),
            username: req.username,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
        })?;
        Ok(account)
    })
    .await?;

    let token = state.issue_token(&account.id)?;

    Ok((
        StatusCode::CREATED,
        [(header::AUTHORIZATION, format!("Bearer {token}"))],
        Json(account),
    ))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Extension(ctx): Extension<IdentityContext>,
    WithRejection(Json(req), _): WithRejection<Json<SignInRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if ctx.is_verified() {
        return Err(ApiError::ValidationFailed("already signed in".into()));
    }

    let db = state.clone();
    let account = run_blocking(move || {
        let Some(row) = db.db.find_by_username_or_email(&req.username_or_email)? else {
            // Same Argon2 cost as a wrong password for a known account
            verify_against_dummy(&req.password);
            return Err(invalid_credentials());
        };

        // Verify password
        let parsed_hash = PasswordHash::new(&row.password_hash).map_err(ApiError::internal)?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| invalid_credentials())?;

        Ok(row.account)
    })
    .await?;

    let token = state.issue_token(&account.id)?;
    info!("Account {} signed in", account.username);

    Ok((
        StatusCode::OK,
        [(header::AUTHORIZATION, format!("Bearer {token}"))],
        Json(account),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let account = run_blocking(move || match state.db.get_account(&identity.subject) {
        Ok(account) => Ok(account),
        Err(StoreError::NotFound) => Err(ApiError::NotFound("account not found".into())),
        Err(e) => Err(e.into()),
    })
    .await?;

    Ok(Json(account))
}

/// Tokens stay valid until they expire; there is no server-side revocation.
pub async fn sign_out(Extension(identity): Extension<Identity>) -> StatusCode {
    info!("Account {} signed out", identity.subject);
    StatusCode::NO_CONTENT
}

fn invalid_credentials() -> ApiError {
    ApiError::AuthInvalid("invalid username or password".into())
}

/// Argon2id hash of a throwaway password, computed once per process.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    DUMMY_HASH
        .get_or_init(|| {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(b"district-no-such-account", &salt)
                .map(|hash| hash.to_string())
                .ok()
        })
        .as_deref()
}

fn verify_against_dummy(password: &str) {
    let Some(parsed) = dummy_hash().and_then(|hash| PasswordHash::new(hash).ok()) else {
        return;
    };
    let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
}

fn validate_sign_up(req: &SignUpRequest) -> Result<(), ApiError> {
    let username_len = req.username.chars().count();
    if !(3..=32).contains(&username_len) {
        return Err(ApiError::ValidationFailed(
            "username must be between 3 and 32 characters".into(),
        ));
    }
    if !req.email.contains('@') {
        return Err(ApiError::ValidationFailed("email is not valid".into()));
    }
    if req.first_name.trim().is_empty() {
        return Err(ApiError::ValidationFailed("first name is required".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::ValidationFailed(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
