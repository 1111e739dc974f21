//! Account identity extraction.
//!
//! Authentication itself is out of scope: the core treats account
//! identity as an opaque string handed to it by whatever sits in
//! front of this service. This extractor only pulls that string out
//! of the `X-Account-Id` header, the same header-extraction shape
//! this lineage's tenant-id extraction uses, minus the JWT/API-key
//! validation that decided it in the first place.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pck_core::AccountId;

use crate::error::ApiError;

pub const ACCOUNT_HEADER: &str = "x-account-id";

pub struct AccountIdHeader(pub AccountId);

impl<S> FromRequestParts<S> for AccountIdHeader
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACCOUNT_HEADER)
            .ok_or_else(|| ApiError::unauthorized("missing X-Account-Id header"))?
            .to_str()
            .map_err(|_| ApiError::unauthorized("X-Account-Id header is not valid UTF-8"))?;

        if raw.trim().is_empty() {
            return Err(ApiError::unauthorized("X-Account-Id header is empty"));
        }

        Ok(AccountIdHeader(AccountId::new(raw)))
    }
}
