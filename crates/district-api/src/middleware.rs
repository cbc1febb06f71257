//! Request interceptors for authenticated mutations, in the order they run:
//!
//! 1. [`verifier`] attaches an [`IdentityContext`] and always forwards.
//! 2. [`authenticator`] rejects with 401 unless that context is verified,
//!    then exposes the bare [`Identity`] to later stages.
//! 3. [`campaign_ctx`] resolves the `{campaign_id}` path segment into a
//!    [`CampaignContext`].
//! 4. [`ownership_guard`] needs both, and turns them into an
//!    [`OwnedCampaign`] or rejects with 403/404.
//!
//! Every stage stores a distinct typed value in the request extensions, and
//! handlers extract the value of the last stage they depend on.

use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tracing::{debug, warn};

use district_db::{CampaignStore, StoreError};
use district_types::models::{Campaign, Identity};

use crate::error::ApiError;
use crate::identity::IdentityContext;
use crate::state::{AppState, run_blocking};

/// Result of the campaign lookup stage; `None` when no such campaign exists.
#[derive(Debug, Clone)]
pub struct CampaignContext(Option<Campaign>);

impl CampaignContext {
    pub fn campaign(&self) -> Option<&Campaign> {
        self.0.as_ref()
    }

    pub fn require(&self) -> Result<&Campaign, ApiError> {
        self.campaign()
            .ok_or_else(|| ApiError::NotFound("campaign not found".into()))
    }
}

/// Proof that the caller owns the campaign. Only [`authorize`] builds one.
#[derive(Debug, Clone)]
pub struct OwnedCampaign {
    identity: Identity,
    campaign: Campaign,
}

impl OwnedCampaign {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }
}

pub async fn verifier(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    // Parse at most once per request, even if the layer is stacked twice
    if req.extensions().get::<IdentityContext>().is_none() {
        let ctx = IdentityContext::from_headers(req.headers(), &state.tokens, Utc::now());
        if let IdentityContext::Failed(reason) = &ctx {
            debug!(?reason, path = %req.uri().path(), "Request carries no verified identity");
        }
        req.extensions_mut().insert(ctx);
    }
    next.run(req).await
}

pub async fn authenticator(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let identity = authenticate(req.extensions().get::<IdentityContext>())?.clone();
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

pub async fn campaign_ctx(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let campaign = match campaign_id.parse::<i64>() {
        Ok(id) => {
            run_blocking(move || match state.db.get_campaign(id) {
                Ok(campaign) => Ok(Some(campaign)),
                Err(StoreError::NotFound) => Ok(None),
                Err(e) => Err(e.into()),
            })
            .await?
        }
        Err(_) => None,
    };

    req.extensions_mut().insert(CampaignContext(campaign));
    Ok(next.run(req).await)
}

pub async fn ownership_guard(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or(ApiError::AuthMissing)?;
    let ctx = req
        .extensions()
        .get::<CampaignContext>()
        .ok_or_else(|| ApiError::internal("ownership guard ran before campaign lookup"))?;

    let owned = authorize(identity, ctx)?;
    req.extensions_mut().insert(owned);
    Ok(next.run(req).await)
}

/// Stage-two decision: a missing or failed context stops the chain.
pub fn authenticate(ctx: Option<&IdentityContext>) -> Result<&Identity, ApiError> {
    let ctx = ctx.ok_or(ApiError::AuthMissing)?;
    Ok(ctx.identity()?)
}

/// Stage-four decision: compares the caller to the campaign's creator.
pub fn authorize(identity: &Identity, ctx: &CampaignContext) -> Result<OwnedCampaign, ApiError> {
    let campaign = ctx.require()?;

    if !campaign.is_owned_by(&identity.subject) {
        warn!(
            campaign_id = campaign.id,
            subject = %identity.subject,
            "Rejected mutation of a campaign owned by another account"
        );
        return Err(ApiError::Forbidden(
            "campaign creator id is not equal to requester id".into(),
        ));
    }

    Ok(OwnedCampaign {
        identity: identity.clone(),
        campaign: campaign.clone(),
    })
}

#[cfg(test)]
pub(crate) fn found(campaign: Campaign) -> CampaignContext {
    CampaignContext(Some(campaign))
}
