//! Order aggregate as returned by the services.

use chrono::{DateTime, Utc};
use common::{FoodId, Money, OrderId, OrderStatus, Owner, PromocodeId, RestaurantId};
use order_store::{LineItemRecord, OrderRecord};

/// A food line item with its catalog snapshot.
pub type FoodLineItem = LineItemRecord;

/// Order aggregate root.
///
/// An order row together with its line items in insertion order. A basket
/// is an order in [`OrderStatus::Basket`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    record: OrderRecord,
    items: Vec<FoodLineItem>,
}

impl Order {
    pub(crate) fn new(record: OrderRecord, items: Vec<FoodLineItem>) -> Self {
        Self { record, items }
    }

    pub fn id(&self) -> OrderId {
        self.record.id
    }

    pub fn owner(&self) -> &Owner {
        &self.record.owner
    }

    pub fn status(&self) -> OrderStatus {
        self.record.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.record.created_at
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.record.placed_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.record.delivered_at
    }

    pub fn address(&self) -> Option<&str> {
        self.record.address.as_deref()
    }

    pub fn extra_address(&self) -> Option<&str> {
        self.record.extra_address.as_deref()
    }

    /// Returns the stored total, discount included.
    pub fn total(&self) -> Money {
        self.record.total
    }

    pub fn promocode_id(&self) -> Option<PromocodeId> {
        self.record.promocode_id
    }

    pub fn is_commented(&self) -> bool {
        self.record.commented
    }

    /// Returns the restaurant of the earliest line item.
    pub fn restaurant_id(&self) -> Option<RestaurantId> {
        self.record.restaurant_id
    }

    /// Returns the line items in insertion order.
    pub fn items(&self) -> &[FoodLineItem] {
        &self.items
    }

    /// Gets the line item for a food.
    pub fn get_item(&self, food_id: FoodId) -> Option<&FoodLineItem> {
        self.items.iter().find(|item| item.food_id == food_id)
    }

    /// Returns the number of distinct foods.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the sum of all counts.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.count)).sum()
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    /// Returns Σ price × count, before any discount.
    pub fn subtotal(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(), |acc, item| acc.saturating_add(item.line_total()))
    }

    /// Returns the underlying row.
    pub fn record(&self) -> &OrderRecord {
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UserId;

    fn item(order_id: OrderId, food: i64, count: u32, price: i64) -> FoodLineItem {
        let now = Utc::now();
        FoodLineItem {
            order_id,
            food_id: FoodId::new(food),
            count,
            name: format!("food-{food}"),
            weight: 100,
            price: Money::new(price),
            image_url: String::new(),
            restaurant_id: RestaurantId::new(1),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_accessors() {
        let id = OrderId::new(3);
        let record = OrderRecord::new_basket(id, Owner::User(UserId::new(1)), Utc::now());
        let order = Order::new(record, vec![item(id, 1, 2, 500), item(id, 2, 1, 300)]);

        assert_eq!(order.id(), id);
        assert_eq!(order.status(), OrderStatus::Basket);
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.total_quantity(), 3);
        assert_eq!(order.subtotal(), Money::new(1300));
        assert_eq!(order.get_item(FoodId::new(2)).map(|i| i.count), Some(1));
        assert!(order.get_item(FoodId::new(9)).is_none());
    }

    #[test]
    fn test_empty_order() {
        let record =
            OrderRecord::new_basket(OrderId::new(1), Owner::User(UserId::new(1)), Utc::now());
        let order = Order::new(record, Vec::new());
        assert!(!order.has_items());
        assert!(order.subtotal().is_zero());
    }
}
