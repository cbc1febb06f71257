use axum::http::HeaderMap;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use chrono::{DateTime, Utc};

use district_types::models::Identity;

use crate::token::{TokenCodec, VerifyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    TokenMissing,
    TokenInvalid,
    TokenExpired,
}

/// Outcome of bearer-token verification for one request. Attached once by
/// the verifier stage and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityContext {
    Verified(Identity),
    Failed(AuthFailure),
}

impl IdentityContext {
    /// Reads `Authorization: Bearer <token>` (scheme is case-insensitive).
    /// Any other scheme counts as a missing token.
    pub fn from_headers(headers: &HeaderMap, codec: &TokenCodec, now: DateTime<Utc>) -> Self {
        let Some(auth) = headers.typed_get::<Authorization<Bearer>>() else {
            return IdentityContext::Failed(AuthFailure::TokenMissing);
        };

        match codec.verify(auth.token(), now) {
            Ok(identity) => IdentityContext::Verified(identity),
            Err(VerifyError::Expired) => IdentityContext::Failed(AuthFailure::TokenExpired),
            Err(VerifyError::InvalidSignature | VerifyError::Malformed) => {
                IdentityContext::Failed(AuthFailure::TokenInvalid)
            }
        }
    }

    pub fn identity(&self) -> Result<&Identity, AuthFailure> {
        match self {
            IdentityContext::Verified(identity) => Ok(identity),
            IdentityContext::Failed(reason) => Err(*reason),
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, IdentityContext::Verified(_))
    }
}
