use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;

use district_types::api::{CreateCampaignRequest, DonateRequest, UpdateCampaignRequest};
use district_types::models::Identity;

use crate::coordinator::MutationCoordinator;
use crate::error::ApiError;
use crate::middleware::{CampaignContext, OwnedCampaign};
use crate::state::{AppState, run_blocking};

pub async fn get_campaign(
    Extension(ctx): Extension<CampaignContext>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign = ctx.require()?.clone();
    Ok(Json(campaign))
}

pub async fn create_campaign(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    WithRejection(Json(req), _): WithRejection<Json<CreateCampaignRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign = run_blocking(move || {
        MutationCoordinator::new(&state.db).create(&identity, req, Utc::now())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/campaigns/{}", campaign.id))],
        Json(campaign),
    ))
}

pub async fn update_campaign(
    State(state): State<AppState>,
    Extension(target): Extension<OwnedCampaign>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateCampaignRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign = run_blocking(move || {
        MutationCoordinator::new(&state.db).update(&target, req.into(), Utc::now())
    })
    .await?;

    Ok(Json(campaign))
}

pub async fn archive_campaign(
    State(state): State<AppState>,
    Extension(target): Extension<OwnedCampaign>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign =
        run_blocking(move || MutationCoordinator::new(&state.db).archive(&target)).await?;

    Ok(Json(campaign))
}

pub async fn donate(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(ctx): Extension<CampaignContext>,
    WithRejection(Json(req), _): WithRejection<Json<DonateRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign_id = ctx.require()?.id;
    let campaign = run_blocking(move || {
        MutationCoordinator::new(&state.db).donate(&identity, campaign_id, req.amount)
    })
    .await?;

    Ok(Json(campaign))
}
