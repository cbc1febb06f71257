use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::CampaignDiff;

// -- JWT Claims --

/// Bearer token payload shared by every service that verifies tokens.
///
/// `iat` and `exp` are the registered claims in whole seconds since the Unix
/// epoch. `iat_us` and `exp_us` hold the same instants in microseconds and
/// are the ones expiry is checked against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iat_us: i64,
    pub exp_us: i64,
}

// -- Accounts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignUpRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignInRequest {
    pub username_or_email: String,
    pub password: String,
}

// -- Campaigns --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCampaignRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub goal: i64,
    pub deadline: DateTime<Utc>,
}

/// Every field is optional: absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCampaignRequest {
    pub description: Option<String>,
    pub goal: Option<i64>,
    pub deadline: Option<DateTime<Utc>>,
}

impl From<UpdateCampaignRequest> for CampaignDiff {
    fn from(req: UpdateCampaignRequest) -> Self {
        CampaignDiff {
            description: req.description,
            goal: req.goal,
            deadline: req.deadline,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DonateRequest {
    pub amount: i64,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    pub message: String,
}
