//! Order history and fulfillment hook endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::{FoodId, Money, OrderId, OrderStatus, Owner, PromocodeId, RestaurantId};
use domain::{FoodLineItem, Order};
use order_store::Store;
use serde::Serialize;

use super::CurrentOwner;
use crate::AppState;
use crate::error::ApiError;

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub owner: Owner,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub placed_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub extra_address: Option<String>,
    pub items: Vec<LineItemResponse>,
    pub subtotal: Money,
    pub total: Money,
    pub promocode_id: Option<PromocodeId>,
    pub commented: bool,
    pub restaurant_id: Option<RestaurantId>,
}

#[derive(Debug, Serialize)]
pub struct LineItemResponse {
    pub food_id: FoodId,
    pub name: String,
    pub count: u32,
    pub weight: i32,
    pub price: Money,
    pub line_total: Money,
    pub image_url: String,
    pub restaurant_id: RestaurantId,
}

impl From<&FoodLineItem> for LineItemResponse {
    fn from(item: &FoodLineItem) -> Self {
        Self {
            food_id: item.food_id,
            name: item.name.clone(),
            count: item.count,
            weight: item.weight,
            price: item.price,
            line_total: item.line_total(),
            image_url: item.image_url.clone(),
            restaurant_id: item.restaurant_id,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id(),
            owner: order.owner().clone(),
            status: order.status(),
            created_at: order.created_at(),
            placed_at: order.placed_at(),
            delivered_at: order.delivered_at(),
            address: order.address().map(String::from),
            extra_address: order.extra_address().map(String::from),
            items: order.items().iter().map(LineItemResponse::from).collect(),
            subtotal: order.subtotal(),
            total: order.total(),
            promocode_id: order.promocode_id(),
            commented: order.is_commented(),
            restaurant_id: order.restaurant_id(),
        }
    }
}

// -- Handlers --

/// GET /orders: the caller's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentOwner(owner): CurrentOwner,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.order_service.list_orders(&owner).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}: one of the caller's orders.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentOwner(owner): CurrentOwner,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.order_service.get_order(OrderId::new(id)).await?;
    if order.owner() != &owner {
        return Err(ApiError::NotFound(format!("Order not found: {id}")));
    }
    Ok(Json(order.into()))
}

/// POST /orders/{id}/deliver: fulfillment hook, placed → delivered.
#[tracing::instrument(skip(state))]
pub async fn deliver<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.order_service.mark_delivered(OrderId::new(id)).await?;
    Ok(Json(order.into()))
}

/// POST /orders/{id}/comment: comment hook for delivered orders.
#[tracing::instrument(skip(state))]
pub async fn comment<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.order_service.mark_commented(OrderId::new(id)).await?;
    Ok(Json(order.into()))
}
