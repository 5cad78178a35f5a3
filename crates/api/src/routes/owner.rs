//! Caller identity extraction.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{GuestToken, Owner, UserId};

use crate::error::ApiError;

/// Header carrying the authenticated user id, set by the auth collaborator.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the anonymous session token.
pub const GUEST_TOKEN_HEADER: &str = "x-guest-token";

/// The owner a request acts for. A user id takes precedence over a guest token.
#[derive(Debug, Clone)]
pub struct CurrentOwner(pub Owner);

impl<S: Send + Sync> FromRequestParts<S> for CurrentOwner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(value) = parts.headers.get(USER_ID_HEADER) {
            let id = value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<i64>().ok())
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid {USER_ID_HEADER} header")))?;
            return Ok(CurrentOwner(Owner::User(UserId::new(id))));
        }

        if let Some(value) = parts.headers.get(GUEST_TOKEN_HEADER) {
            let token = value
                .to_str()
                .ok()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    ApiError::BadRequest(format!("Invalid {GUEST_TOKEN_HEADER} header"))
                })?;
            return Ok(CurrentOwner(Owner::Guest(GuestToken::new(token))));
        }

        Err(ApiError::BadRequest(format!(
            "Missing {USER_ID_HEADER} or {GUEST_TOKEN_HEADER} header"
        )))
    }
}
