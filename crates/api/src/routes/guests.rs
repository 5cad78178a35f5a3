//! Guest session endpoints used by the auth collaborator.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{GuestToken, UserId};
use domain::MergeOutcome;
use order_store::Store;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct GuestTokenResponse {
    pub guest_token: GuestToken,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub reassigned_orders: u64,
    pub merged_line_items: usize,
    pub basket_merged: bool,
    pub promocode_cleared: bool,
}

impl From<MergeOutcome> for MergeResponse {
    fn from(outcome: MergeOutcome) -> Self {
        Self {
            reassigned_orders: outcome.reassigned_orders,
            merged_line_items: outcome.merged_line_items,
            basket_merged: outcome.basket_merged,
            promocode_cleared: outcome.promocode_cleared,
        }
    }
}

/// POST /guests: issue a fresh guest token.
pub async fn create() -> (StatusCode, Json<GuestTokenResponse>) {
    (
        StatusCode::CREATED,
        Json(GuestTokenResponse {
            guest_token: GuestToken::generate(),
        }),
    )
}

/// POST /guests/{token}/merge: move the guest's orders to a user after sign-in.
#[tracing::instrument(skip(state))]
pub async fn merge<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(token): Path<String>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<MergeResponse>, ApiError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::BadRequest("Guest token is empty".to_string()));
    }

    let outcome = state
        .order_service
        .merge_guest_into_user(&GuestToken::new(token), UserId::new(req.user_id))
        .await?;
    Ok(Json(outcome.into()))
}
