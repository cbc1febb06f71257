use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::error::ApiError;
use crate::middleware::{authenticator, campaign_ctx, ownership_guard, verifier};
use crate::state::AppState;
use crate::{accounts, campaigns};

// Layers added later run first: `route_layer(a).route_layer(b)` runs b, then a.

/// Account service: sign-up, sign-in, and the caller's own profile.
pub fn auth_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(accounts::sign_up))
        .route("/auth/signin", post(accounts::sign_in));

    let protected_routes = Router::new()
        .route("/auth/me", get(accounts::me))
        .route("/auth/signout", post(accounts::sign_out))
        .route_layer(middleware::from_fn(authenticator));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), verifier))
        .with_state(state)
}

/// Campaign service. Mutations of an existing campaign run the full chain:
/// verifier, authenticator, campaign lookup, ownership guard.
pub fn campaign_router(state: AppState) -> Router {
    let lookup = middleware::from_fn_with_state(state.clone(), campaign_ctx);

    let public_routes = Router::new()
        .route("/campaigns/{campaign_id}", get(campaigns::get_campaign))
        .route_layer(lookup.clone());

    let create_routes = Router::new()
        .route("/campaigns", post(campaigns::create_campaign))
        .route_layer(middleware::from_fn(authenticator));

    let donation_routes = Router::new()
        .route("/campaigns/{campaign_id}/donations", post(campaigns::donate))
        .route_layer(lookup.clone())
        .route_layer(middleware::from_fn(authenticator));

    let owner_routes = Router::new()
        .route(
            "/campaigns/{campaign_id}",
            put(campaigns::update_campaign).delete(campaigns::archive_campaign),
        )
        .route_layer(middleware::from_fn(ownership_guard))
        .route_layer(lookup)
        .route_layer(middleware::from_fn(authenticator));

    Router::new()
        .merge(public_routes)
        .merge(create_routes)
        .merge(donation_routes)
        .merge(owner_routes)
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), verifier))
        .with_state(state)
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("route not found".into())
}
