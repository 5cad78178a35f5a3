use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{FoodId, GuestToken, OrderId, Owner, PromocodeId, RestaurantId, UserId};

use crate::{LineItemRecord, NewPromocode, OrderRecord, Promocode, Result};

/// Persistence of the order aggregate root.
#[async_trait]
pub trait OrderRepository: Send {
    /// Finds the owner's `basket`-status order and locks its row.
    async fn find_basket(&mut self, owner: &Owner) -> Result<Option<OrderRecord>>;

    /// Inserts an empty basket for the owner.
    ///
    /// Returns `None` when the one-basket-per-owner constraint rejected the
    /// insert because another transaction created the basket first.
    async fn insert_basket(
        &mut self,
        owner: &Owner,
        created_at: DateTime<Utc>,
    ) -> Result<Option<OrderRecord>>;

    /// Loads an order by id and locks its row.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Lists every order of an owner, newest first.
    async fn list_orders(&mut self, owner: &Owner) -> Result<Vec<OrderRecord>>;

    /// Writes every mutable column of the order.
    async fn update_order(&mut self, order: &OrderRecord) -> Result<()>;

    /// Deletes an order together with its line items and redemptions.
    async fn delete_order(&mut self, id: OrderId) -> Result<()>;

    /// Moves every order owned by `token` to `user`, clearing the token.
    ///
    /// Returns the number of orders moved.
    async fn reassign_guest_orders(&mut self, token: &GuestToken, user: UserId) -> Result<u64>;

    /// Counts the owner's delivered orders, optionally at one restaurant.
    async fn count_delivered(
        &mut self,
        owner: &Owner,
        restaurant_id: Option<RestaurantId>,
    ) -> Result<u64>;
}

/// Persistence of the order ↔ food association.
#[async_trait]
pub trait LineItemRepository: Send {
    /// Lists an order's line items in insertion order.
    async fn list_line_items(&mut self, order_id: OrderId) -> Result<Vec<LineItemRecord>>;

    /// Finds the line item for one food in an order.
    async fn find_line_item(
        &mut self,
        order_id: OrderId,
        food_id: FoodId,
    ) -> Result<Option<LineItemRecord>>;

    /// Inserts the line item, or overwrites count and snapshot of the
    /// existing `(order, food)` row while keeping its position.
    async fn upsert_line_item(&mut self, item: &LineItemRecord) -> Result<()>;

    /// Deletes one line item. Returns false if it did not exist.
    async fn delete_line_item(&mut self, order_id: OrderId, food_id: FoodId) -> Result<bool>;

    /// Deletes all line items of an order. Returns the number deleted.
    async fn delete_line_items(&mut self, order_id: OrderId) -> Result<u64>;
}

/// Persistence of promocode definitions and their redemption history.
#[async_trait]
pub trait PromocodeRepository: Send {
    /// Finds a promocode by its code string.
    async fn find_promocode_by_code(&mut self, code: &str) -> Result<Option<Promocode>>;

    /// Finds a promocode by id.
    async fn find_promocode(&mut self, id: PromocodeId) -> Result<Option<Promocode>>;

    /// Inserts a promocode definition.
    async fn insert_promocode(&mut self, promocode: NewPromocode) -> Result<Promocode>;

    /// Records that a promocode was applied to an order.
    async fn record_redemption(
        &mut self,
        order_id: OrderId,
        promocode_id: PromocodeId,
        redeemed_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Counts how many times a promocode was applied to an order.
    async fn count_redemptions(&mut self, order_id: OrderId, promocode_id: PromocodeId)
    -> Result<u64>;
}

/// A unit of work over the order store.
///
/// Dropping a transaction without calling [`Transaction::commit`] rolls
/// back everything it wrote.
#[async_trait]
pub trait Transaction:
    OrderRepository + LineItemRepository + PromocodeRepository + Send + Sized
{
    /// Makes the transaction's writes visible.
    async fn commit(self) -> Result<()>;
}

/// Entry point to the order store.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// The transaction type handed out by this store.
    type Tx: Transaction;

    /// Starts a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;
}
