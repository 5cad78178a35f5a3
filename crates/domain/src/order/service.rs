//! Order service: basket resolution, line-item mutation and status changes.

use chrono::{DateTime, Utc};
use common::{FoodId, GuestToken, OrderId, OrderStatus, Owner, UserId};
use order_store::{LineItemRecord, LineItemRepository, OrderRecord, OrderRepository, Store, StoreError, Transaction};

use crate::catalog::{Catalog, CatalogError, FoodItem};
use crate::config::ServiceConfig;
use crate::error::DomainError;
use crate::operation;

use super::{Order, OrderError, recompute_total};

/// Addresses the order a mutation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasketRef {
    /// The owner's basket, created if missing.
    Owner(Owner),
    /// A specific order, whatever its status.
    Order(OrderId),
}

impl From<Owner> for BasketRef {
    fn from(owner: Owner) -> Self {
        BasketRef::Owner(owner)
    }
}

impl From<&Owner> for BasketRef {
    fn from(owner: &Owner) -> Self {
        BasketRef::Owner(owner.clone())
    }
}

impl From<UserId> for BasketRef {
    fn from(user: UserId) -> Self {
        BasketRef::Owner(Owner::User(user))
    }
}

impl From<GuestToken> for BasketRef {
    fn from(token: GuestToken) -> Self {
        BasketRef::Owner(Owner::Guest(token))
    }
}

impl From<OrderId> for BasketRef {
    fn from(id: OrderId) -> Self {
        BasketRef::Order(id)
    }
}

/// Service for managing orders.
///
/// Holds no mutable state of its own: every operation runs in one store
/// transaction bounded by the configured timeout, so concurrent calls
/// against the same basket serialize on the store's row lock.
pub struct OrderService<S: Store, C: Catalog> {
    pub(super) store: S,
    pub(super) catalog: C,
    pub(super) config: ServiceConfig,
}

impl<S: Store, C: Catalog> OrderService<S, C> {
    /// Creates a new order service with default configuration.
    pub fn new(store: S, catalog: C) -> Self {
        Self::with_config(store, catalog, ServiceConfig::default())
    }

    pub fn with_config(store: S, catalog: C, config: ServiceConfig) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the owner's basket, creating it if none exists.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_basket(&self, owner: &Owner) -> Result<Order, DomainError> {
        operation::run("resolve_basket", self.config.operation_timeout, async {
            let mut tx = self.store.begin().await?;
            let basket = resolve_in(&mut tx, owner).await?;
            let items = tx.list_line_items(basket.id).await?;
            tx.commit().await?;
            Ok(Order::new(basket, items))
        })
        .await
    }

    /// Returns the owner's basket without creating one.
    #[tracing::instrument(skip(self))]
    pub async fn find_basket(&self, owner: &Owner) -> Result<Order, DomainError> {
        operation::run("find_basket", self.config.operation_timeout, async {
            let mut tx = self.store.begin().await?;
            let basket = tx
                .find_basket(owner)
                .await?
                .ok_or_else(|| OrderError::BasketNotFound(owner.clone()))?;
            let items = tx.list_line_items(basket.id).await?;
            tx.commit().await?;
            Ok(Order::new(basket, items))
        })
        .await
    }

    /// Returns the owner's basket, creating it only when lazy creation is on.
    pub async fn get_basket(&self, owner: &Owner) -> Result<Order, DomainError> {
        if self.config.lazy_basket {
            self.resolve_basket(owner).await
        } else {
            self.find_basket(owner).await
        }
    }

    /// Loads an order by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        operation::run("get_order", self.config.operation_timeout, async {
            let mut tx = self.store.begin().await?;
            let order = tx
                .lock_order(order_id)
                .await?
                .ok_or(OrderError::OrderNotFound(order_id))?;
            let items = tx.list_line_items(order_id).await?;
            tx.commit().await?;
            Ok(Order::new(order, items))
        })
        .await
    }

    /// Lists the owner's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, owner: &Owner) -> Result<Vec<Order>, DomainError> {
        operation::run("list_orders", self.config.operation_timeout, async {
            let mut tx = self.store.begin().await?;
            let records = tx.list_orders(owner).await?;
            let mut orders = Vec::with_capacity(records.len());
            for record in records {
                let items = tx.list_line_items(record.id).await?;
                orders.push(Order::new(record, items));
            }
            tx.commit().await?;
            Ok(orders)
        })
        .await
    }

    /// Adds one unit of a food to the order.
    pub async fn add_food(
        &self,
        target: impl Into<BasketRef>,
        food_id: FoodId,
    ) -> Result<Order, DomainError> {
        self.add_food_count(target, food_id, 1).await
    }

    /// Adds `delta` units of a food, creating the line item if needed.
    #[tracing::instrument(skip(self, target))]
    pub async fn add_food_count(
        &self,
        target: impl Into<BasketRef>,
        food_id: FoodId,
        delta: i64,
    ) -> Result<Order, DomainError> {
        let delta = checked_count(delta)?;
        let target = target.into();

        operation::run("add_food", self.config.operation_timeout, async {
            let food = self.lookup_food(food_id).await?;

            let mut tx = self.store.begin().await?;
            let mut order = lock_target(&mut tx, &target).await?;
            ensure_mutable(&order)?;

            let now = Utc::now();
            let existing = tx.find_line_item(order.id, food_id).await?;
            let (count, created_at) = match existing {
                Some(item) => (
                    checked_count(i64::from(item.count) + i64::from(delta))?,
                    item.created_at,
                ),
                None => (delta, now),
            };
            tx.upsert_line_item(&snapshot(order.id, &food, count, created_at, now))
                .await?;

            let items = recompute_total(&mut tx, &mut order).await?;
            tx.commit().await?;
            Ok(Order::new(order, items))
        })
        .await
    }

    /// Sets a food's count exactly. A count of zero or less removes it.
    #[tracing::instrument(skip(self, target))]
    pub async fn set_food_count(
        &self,
        target: impl Into<BasketRef>,
        food_id: FoodId,
        count: i64,
    ) -> Result<Order, DomainError> {
        if count <= 0 {
            return self.remove_food(target, food_id).await;
        }
        let count = checked_count(count)?;
        let target = target.into();

        operation::run("set_food_count", self.config.operation_timeout, async {
            let food = self.lookup_food(food_id).await?;

            let mut tx = self.store.begin().await?;
            let mut order = lock_target(&mut tx, &target).await?;
            ensure_mutable(&order)?;

            let now = Utc::now();
            let created_at = tx
                .find_line_item(order.id, food_id)
                .await?
                .map_or(now, |item| item.created_at);
            tx.upsert_line_item(&snapshot(order.id, &food, count, created_at, now))
                .await?;

            let items = recompute_total(&mut tx, &mut order).await?;
            tx.commit().await?;
            Ok(Order::new(order, items))
        })
        .await
    }

    /// Removes a food from the order. Removing an absent food is a no-op.
    #[tracing::instrument(skip(self, target))]
    pub async fn remove_food(
        &self,
        target: impl Into<BasketRef>,
        food_id: FoodId,
    ) -> Result<Order, DomainError> {
        let target = target.into();

        operation::run("remove_food", self.config.operation_timeout, async {
            let mut tx = self.store.begin().await?;
            let mut order = lock_target(&mut tx, &target).await?;
            ensure_mutable(&order)?;

            if !tx.delete_line_item(order.id, food_id).await? {
                tracing::debug!(order_id = %order.id, %food_id, "food not in order");
            }

            let items = recompute_total(&mut tx, &mut order).await?;
            tx.commit().await?;
            Ok(Order::new(order, items))
        })
        .await
    }

    /// Places the order, freezing its line items.
    ///
    /// Both address fields must be non-blank and the order must hold at
    /// least one line item. Nothing is written when validation fails.
    #[tracing::instrument(skip(self, target))]
    pub async fn place_order(
        &self,
        target: impl Into<BasketRef>,
        address: &str,
        extra_address: &str,
    ) -> Result<Order, DomainError> {
        let address = required("address", address)?;
        let extra_address = required("extra_address", extra_address)?;
        let target = target.into();

        operation::run("place_order", self.config.operation_timeout, async {
            let mut tx = self.store.begin().await?;
            let mut order = match &target {
                BasketRef::Owner(owner) => tx
                    .find_basket(owner)
                    .await?
                    .ok_or(OrderError::EmptyOrder)?,
                BasketRef::Order(id) => tx
                    .lock_order(*id)
                    .await?
                    .ok_or(OrderError::OrderNotFound(*id))?,
            };
            ensure_mutable(&order)?;

            if tx.list_line_items(order.id).await?.is_empty() {
                return Err(OrderError::EmptyOrder.into());
            }

            order.status = OrderStatus::Placed;
            order.placed_at = Some(Utc::now());
            order.address = Some(address);
            order.extra_address = Some(extra_address);
            let items = recompute_total(&mut tx, &mut order).await?;
            tx.commit().await?;

            metrics::counter!("orders_placed_total").increment(1);
            tracing::info!(
                order_id = %order.id,
                owner = %order.owner,
                total = %order.total,
                "order placed"
            );
            Ok(Order::new(order, items))
        })
        .await
    }

    /// Moves a placed order to delivered.
    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(&self, order_id: OrderId) -> Result<Order, DomainError> {
        operation::run("mark_delivered", self.config.operation_timeout, async {
            let mut tx = self.store.begin().await?;
            let mut order = tx
                .lock_order(order_id)
                .await?
                .ok_or(OrderError::OrderNotFound(order_id))?;

            if order.status != OrderStatus::Placed {
                return Err(OrderError::InvalidTransition {
                    order_id,
                    from: order.status,
                    to: OrderStatus::Delivered,
                }
                .into());
            }

            order.status = OrderStatus::Delivered;
            order.delivered_at = Some(Utc::now());
            tx.update_order(&order).await?;
            let items = tx.list_line_items(order_id).await?;
            tx.commit().await?;

            metrics::counter!("orders_delivered_total").increment(1);
            tracing::info!(order_id = %order_id, owner = %order.owner, "order delivered");
            Ok(Order::new(order, items))
        })
        .await
    }

    /// Flags a delivered order as commented. Allowed once per order.
    #[tracing::instrument(skip(self))]
    pub async fn mark_commented(&self, order_id: OrderId) -> Result<Order, DomainError> {
        operation::run("mark_commented", self.config.operation_timeout, async {
            let mut tx = self.store.begin().await?;
            let mut order = tx
                .lock_order(order_id)
                .await?
                .ok_or(OrderError::OrderNotFound(order_id))?;

            if order.status != OrderStatus::Delivered {
                return Err(OrderError::NotDelivered {
                    order_id,
                    status: order.status,
                }
                .into());
            }
            if order.commented {
                return Err(OrderError::AlreadyCommented(order_id).into());
            }

            order.commented = true;
            tx.update_order(&order).await?;
            let items = tx.list_line_items(order_id).await?;
            tx.commit().await?;
            Ok(Order::new(order, items))
        })
        .await
    }

    async fn lookup_food(&self, food_id: FoodId) -> Result<FoodItem, DomainError> {
        match self.catalog.food_by_id(food_id).await {
            Ok(food) => Ok(food),
            Err(CatalogError::NotFound(id)) => Err(OrderError::FoodNotFound(id).into()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Finds the owner's basket or creates it.
///
/// A lost creation race surfaces as `None` from the insert and is retried
/// once as a lookup.
pub(super) async fn resolve_in<T: Transaction>(
    tx: &mut T,
    owner: &Owner,
) -> Result<OrderRecord, DomainError> {
    if let Some(basket) = tx.find_basket(owner).await? {
        return Ok(basket);
    }

    if let Some(basket) = tx.insert_basket(owner, Utc::now()).await? {
        metrics::counter!("baskets_created_total").increment(1);
        tracing::info!(order_id = %basket.id, %owner, "basket created");
        return Ok(basket);
    }

    tracing::warn!(%owner, "basket created concurrently, retrying as lookup");
    tx.find_basket(owner)
        .await?
        .ok_or_else(|| StoreError::Conflict { op: "insert_basket" }.into())
}

async fn lock_target<T: Transaction>(
    tx: &mut T,
    target: &BasketRef,
) -> Result<OrderRecord, DomainError> {
    match target {
        BasketRef::Owner(owner) => resolve_in(tx, owner).await,
        BasketRef::Order(id) => Ok(tx
            .lock_order(*id)
            .await?
            .ok_or(OrderError::OrderNotFound(*id))?),
    }
}

/// Validates a line-item count against `1..=LineItemRecord::MAX_COUNT`.
pub(super) fn checked_count(count: i64) -> Result<u32, OrderError> {
    u32::try_from(count)
        .ok()
        .filter(|count| (1..=LineItemRecord::MAX_COUNT).contains(count))
        .ok_or(OrderError::InvalidCount { count })
}

fn ensure_mutable(order: &OrderRecord) -> Result<(), OrderError> {
    if order.status.is_mutable() {
        Ok(())
    } else {
        Err(OrderError::OrderNotMutable {
            order_id: order.id,
            status: order.status,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, OrderError> {
    let value = value.trim();
    if value.is_empty() {
        Err(OrderError::MissingAddress { field })
    } else {
        Ok(value.to_string())
    }
}

fn snapshot(
    order_id: OrderId,
    food: &FoodItem,
    count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> LineItemRecord {
    LineItemRecord {
        order_id,
        food_id: food.id,
        count,
        name: food.name.clone(),
        weight: food.weight,
        price: food.price,
        image_url: food.image_url.clone(),
        restaurant_id: food.restaurant_id,
        created_at,
        updated_at,
    }
}
