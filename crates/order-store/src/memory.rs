use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    FoodId, GuestToken, OrderId, OrderStatus, Owner, PromocodeId, RestaurantId, UserId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    LineItemRecord, NewPromocode, OrderRecord, Promocode, Result, StoreError,
    repository::{LineItemRepository, OrderRepository, PromocodeRepository, Store, Transaction},
};

#[derive(Debug, Clone)]
struct Redemption {
    order_id: OrderId,
    promocode_id: PromocodeId,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_order_id: i64,
    last_promocode_id: i64,
    orders: BTreeMap<OrderId, OrderRecord>,
    /// Kept in insertion order.
    line_items: Vec<LineItemRecord>,
    promocodes: BTreeMap<PromocodeId, Promocode>,
    redemptions: Vec<Redemption>,
}

impl MemoryState {
    fn basket_of(&self, owner: &Owner) -> Option<&OrderRecord> {
        self.orders
            .values()
            .find(|o| o.status == OrderStatus::Basket && &o.owner == owner)
    }
}

/// In-memory order store for testing and single-process deployments.
///
/// A transaction holds the store-wide lock for its whole lifetime and works
/// on a private copy of the state, so transactions are fully serialized and
/// an uncommitted transaction leaves nothing behind.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the total number of line items stored.
    pub async fn line_item_count(&self) -> usize {
        self.state.lock().await.line_items.len()
    }

    /// Clears all stored data.
    pub async fn clear(&self) {
        *self.state.lock().await = MemoryState::default();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTransaction { guard, working })
    }
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(mut self) -> Result<()> {
        *self.guard = std::mem::take(&mut self.working);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryTransaction {
    async fn find_basket(&mut self, owner: &Owner) -> Result<Option<OrderRecord>> {
        Ok(self.working.basket_of(owner).cloned())
    }

    async fn insert_basket(
        &mut self,
        owner: &Owner,
        created_at: DateTime<Utc>,
    ) -> Result<Option<OrderRecord>> {
        if self.working.basket_of(owner).is_some() {
            return Ok(None);
        }

        self.working.last_order_id += 1;
        let id = OrderId::new(self.working.last_order_id);
        let record = OrderRecord::new_basket(id, owner.clone(), created_at);
        self.working.orders.insert(id, record.clone());
        Ok(Some(record))
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn list_orders(&mut self, owner: &Owner) -> Result<Vec<OrderRecord>> {
        let mut orders: Vec<OrderRecord> = self
            .working
            .orders
            .values()
            .filter(|o| &o.owner == owner)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn update_order(&mut self, order: &OrderRecord) -> Result<()> {
        if order.status == OrderStatus::Basket
            && let Some(other) = self.working.basket_of(&order.owner)
            && other.id != order.id
        {
            return Err(StoreError::Conflict { op: "update_order" });
        }

        match self.working.orders.get_mut(&order.id) {
            Some(slot) => {
                *slot = order.clone();
                Ok(())
            }
            None => Err(StoreError::Conflict { op: "update_order" }),
        }
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<()> {
        self.working.orders.remove(&id);
        self.working.line_items.retain(|i| i.order_id != id);
        self.working.redemptions.retain(|r| r.order_id != id);
        Ok(())
    }

    async fn reassign_guest_orders(&mut self, token: &GuestToken, user: UserId) -> Result<u64> {
        let guest = Owner::Guest(token.clone());
        let target = Owner::User(user);

        if self.working.basket_of(&guest).is_some() && self.working.basket_of(&target).is_some()
        {
            return Err(StoreError::Conflict {
                op: "reassign_guest_orders",
            });
        }

        let mut moved = 0;
        for order in self.working.orders.values_mut() {
            if order.owner == guest {
                order.owner = target.clone();
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn count_delivered(
        &mut self,
        owner: &Owner,
        restaurant_id: Option<RestaurantId>,
    ) -> Result<u64> {
        let count = self
            .working
            .orders
            .values()
            .filter(|o| &o.owner == owner && o.status == OrderStatus::Delivered)
            .filter(|o| restaurant_id.is_none() || o.restaurant_id == restaurant_id)
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl LineItemRepository for InMemoryTransaction {
    async fn list_line_items(&mut self, order_id: OrderId) -> Result<Vec<LineItemRecord>> {
        Ok(self
            .working
            .line_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn find_line_item(
        &mut self,
        order_id: OrderId,
        food_id: FoodId,
    ) -> Result<Option<LineItemRecord>> {
        Ok(self
            .working
            .line_items
            .iter()
            .find(|i| i.order_id == order_id && i.food_id == food_id)
            .cloned())
    }

    async fn upsert_line_item(&mut self, item: &LineItemRecord) -> Result<()> {
        if !self.working.orders.contains_key(&item.order_id) {
            return Err(StoreError::Conflict {
                op: "upsert_line_item",
            });
        }
        if item.count > LineItemRecord::MAX_COUNT {
            return Err(StoreError::corrupt(
                "upsert_line_item",
                format!("count {} too large", item.count),
            ));
        }

        match self
            .working
            .line_items
            .iter_mut()
            .find(|i| i.order_id == item.order_id && i.food_id == item.food_id)
        {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = item.clone();
                existing.created_at = created_at;
            }
            None => self.working.line_items.push(item.clone()),
        }
        Ok(())
    }

    async fn delete_line_item(&mut self, order_id: OrderId, food_id: FoodId) -> Result<bool> {
        let before = self.working.line_items.len();
        self.working
            .line_items
            .retain(|i| !(i.order_id == order_id && i.food_id == food_id));
        Ok(self.working.line_items.len() != before)
    }

    async fn delete_line_items(&mut self, order_id: OrderId) -> Result<u64> {
        let before = self.working.line_items.len();
        self.working.line_items.retain(|i| i.order_id != order_id);
        Ok((before - self.working.line_items.len()) as u64)
    }
}

#[async_trait]
impl PromocodeRepository for InMemoryTransaction {
    async fn find_promocode_by_code(&mut self, code: &str) -> Result<Option<Promocode>> {
        Ok(self
            .working
            .promocodes
            .values()
            .find(|p| p.code == code)
            .cloned())
    }

    async fn find_promocode(&mut self, id: PromocodeId) -> Result<Option<Promocode>> {
        Ok(self.working.promocodes.get(&id).cloned())
    }

    async fn insert_promocode(&mut self, promocode: NewPromocode) -> Result<Promocode> {
        if self
            .working
            .promocodes
            .values()
            .any(|p| p.code == promocode.code)
        {
            return Err(StoreError::Conflict {
                op: "insert_promocode",
            });
        }

        self.working.last_promocode_id += 1;
        let id = PromocodeId::new(self.working.last_promocode_id);
        let promocode = promocode.into_promocode(id);
        self.working.promocodes.insert(id, promocode.clone());
        Ok(promocode)
    }

    async fn record_redemption(
        &mut self,
        order_id: OrderId,
        promocode_id: PromocodeId,
        _redeemed_at: DateTime<Utc>,
    ) -> Result<()> {
        self.working.redemptions.push(Redemption {
            order_id,
            promocode_id,
        });
        Ok(())
    }

    async fn count_redemptions(
        &mut self,
        order_id: OrderId,
        promocode_id: PromocodeId,
    ) -> Result<u64> {
        let count = self
            .working
            .redemptions
            .iter()
            .filter(|r| r.order_id == order_id && r.promocode_id == promocode_id)
            .count();
        Ok(count as u64)
    }
}
