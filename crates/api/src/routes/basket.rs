//! Basket endpoints acting on the caller's current basket.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::FoodId;
use order_store::Store;
use serde::Deserialize;

use super::CurrentOwner;
use super::orders::OrderResponse;
use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct SetCountRequest {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub address: String,
    #[serde(default)]
    pub extra_address: String,
}

#[derive(Debug, Deserialize)]
pub struct PromocodeRequest {
    pub code: String,
}

// -- Handlers --

/// GET /basket: the caller's basket.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentOwner(owner): CurrentOwner,
) -> Result<Json<OrderResponse>, ApiError> {
    let basket = state.order_service.get_basket(&owner).await?;
    Ok(Json(basket.into()))
}

/// POST /basket/food/{food_id}: add one unit.
#[tracing::instrument(skip(state))]
pub async fn add_food<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentOwner(owner): CurrentOwner,
    Path(food_id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let basket = state
        .order_service
        .add_food(owner, FoodId::new(food_id))
        .await?;
    Ok(Json(basket.into()))
}

/// PUT /basket/food/{food_id}: set the count; zero or less removes.
#[tracing::instrument(skip(state, req))]
pub async fn set_food_count<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentOwner(owner): CurrentOwner,
    Path(food_id): Path<i64>,
    Json(req): Json<SetCountRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let basket = state
        .order_service
        .set_food_count(owner, FoodId::new(food_id), req.count)
        .await?;
    Ok(Json(basket.into()))
}

/// DELETE /basket/food/{food_id}: remove the food if present.
#[tracing::instrument(skip(state))]
pub async fn remove_food<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentOwner(owner): CurrentOwner,
    Path(food_id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let basket = state
        .order_service
        .remove_food(owner, FoodId::new(food_id))
        .await?;
    Ok(Json(basket.into()))
}

/// POST /basket/place: place the basket as an order.
#[tracing::instrument(skip(state, req))]
pub async fn place<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentOwner(owner): CurrentOwner,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .order_service
        .place_order(owner, &req.address, &req.extra_address)
        .await?;
    Ok(Json(order.into()))
}

/// POST /basket/promocode: apply a code to the basket.
#[tracing::instrument(skip(state))]
pub async fn apply_promocode<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentOwner(owner): CurrentOwner,
    Json(req): Json<PromocodeRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let basket = state.order_service.resolve_basket(&owner).await?;
    let basket = state
        .promocode_service
        .apply_promocode(basket.id(), &req.code)
        .await?;
    Ok(Json(basket.into()))
}

/// DELETE /basket/promocode: clear the basket's code.
#[tracing::instrument(skip(state))]
pub async fn remove_promocode<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentOwner(owner): CurrentOwner,
) -> Result<Json<OrderResponse>, ApiError> {
    let basket = state.order_service.find_basket(&owner).await?;
    let basket = state
        .promocode_service
        .remove_promocode(basket.id())
        .await?;
    Ok(Json(basket.into()))
}
