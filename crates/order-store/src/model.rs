//! Persisted shapes of orders, food line items and promocodes.

use chrono::{DateTime, Utc};
use common::{FoodId, Money, OrderId, OrderStatus, Owner, PromocodeId, RestaurantId};

/// A row of the `orders` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub owner: Owner,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub placed_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub extra_address: Option<String>,
    /// Denormalized total; written only through total recomputation.
    pub total: Money,
    pub promocode_id: Option<PromocodeId>,
    pub commented: bool,
    /// Restaurant of the earliest line item, if any.
    pub restaurant_id: Option<RestaurantId>,
}

impl OrderRecord {
    /// Creates an empty basket row for `owner`.
    pub fn new_basket(id: OrderId, owner: Owner, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            status: OrderStatus::Basket,
            created_at,
            placed_at: None,
            delivered_at: None,
            address: None,
            extra_address: None,
            total: Money::zero(),
            promocode_id: None,
            commented: false,
            restaurant_id: None,
        }
    }
}

/// A row of the `order_food` table.
///
/// Name, weight, price and image are a snapshot of the catalog entry taken
/// when the food was last looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemRecord {
    pub order_id: OrderId,
    pub food_id: FoodId,
    pub count: u32,
    pub name: String,
    pub weight: i32,
    pub price: Money,
    pub image_url: String,
    pub restaurant_id: RestaurantId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LineItemRecord {
    /// Largest count a line item may carry; the column is a signed 32-bit int.
    pub const MAX_COUNT: u32 = i32::MAX as u32;

    /// Returns `price × count`, or `None` if it does not fit in [`Money`].
    pub fn checked_line_total(&self) -> Option<Money> {
        self.price.checked_multiply(self.count)
    }

    /// Returns `price × count`, clamped for display.
    pub fn line_total(&self) -> Money {
        self.price.saturating_multiply(self.count)
    }
}

/// The eligibility rule family of a promocode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromocodeKind {
    /// Valid only for an owner's first order.
    FirstOrder,
    /// Valid only for an owner's first order at the carried restaurant.
    FirstAtRestaurant { restaurant_id: RestaurantId },
    /// Valid once the pre-discount total reaches the carried minimum.
    Threshold { min_sum: Money },
    /// Redeemable at most once per order.
    SingleUse,
}

impl PromocodeKind {
    /// Returns the storage tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            PromocodeKind::FirstOrder => "first-order",
            PromocodeKind::FirstAtRestaurant { .. } => "first-at-restaurant",
            PromocodeKind::Threshold { .. } => "threshold",
            PromocodeKind::SingleUse => "single-use",
        }
    }

    /// Returns the carried restaurant, if the kind has one.
    pub fn restaurant_id(&self) -> Option<RestaurantId> {
        match self {
            PromocodeKind::FirstAtRestaurant { restaurant_id } => Some(*restaurant_id),
            _ => None,
        }
    }

    /// Returns the carried minimum sum, if the kind has one.
    pub fn min_sum(&self) -> Option<Money> {
        match self {
            PromocodeKind::Threshold { min_sum } => Some(*min_sum),
            _ => None,
        }
    }

    /// Rebuilds a kind from its storage columns.
    ///
    /// Returns `None` for an unknown tag or a missing carried value.
    pub fn from_columns(
        kind: &str,
        restaurant_id: Option<i64>,
        min_sum: Option<i64>,
    ) -> Option<Self> {
        match kind {
            "first-order" => Some(PromocodeKind::FirstOrder),
            "first-at-restaurant" => restaurant_id.map(|id| PromocodeKind::FirstAtRestaurant {
                restaurant_id: RestaurantId::new(id),
            }),
            "threshold" => min_sum.map(|sum| PromocodeKind::Threshold {
                min_sum: Money::new(sum),
            }),
            "single-use" => Some(PromocodeKind::SingleUse),
            _ => None,
        }
    }
}

impl std::fmt::Display for PromocodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row of the `promocode` table. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promocode {
    pub id: PromocodeId,
    pub code: String,
    /// Discount percentage, 0 to 100.
    pub discount_pct: u8,
    pub expires_at: DateTime<Utc>,
    pub kind: PromocodeKind,
}

impl Promocode {
    /// Returns true if the code can no longer be redeemed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Fields of a promocode about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPromocode {
    pub code: String,
    pub discount_pct: u8,
    pub expires_at: DateTime<Utc>,
    pub kind: PromocodeKind,
}

impl NewPromocode {
    /// Creates a promocode definition.
    pub fn new(
        code: impl Into<String>,
        discount_pct: u8,
        expires_at: DateTime<Utc>,
        kind: PromocodeKind,
    ) -> Self {
        Self {
            code: code.into(),
            discount_pct: discount_pct.min(100),
            expires_at,
            kind,
        }
    }

    /// Attaches the id assigned by the store.
    pub fn into_promocode(self, id: PromocodeId) -> Promocode {
        Promocode {
            id,
            code: self.code,
            discount_pct: self.discount_pct,
            expires_at: self.expires_at,
            kind: self.kind,
        }
    }
}
