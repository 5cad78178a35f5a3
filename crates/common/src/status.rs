//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Basket ──► Placed ──► Delivered
/// ```
///
/// Status only moves forward; there is no way back to `Basket`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Mutable pre-checkout cart.
    #[default]
    Basket,

    /// Confirmed by the customer, contents frozen.
    Placed,

    /// Handed over to the customer (terminal state).
    Delivered,
}

impl OrderStatus {
    /// Returns true if line items and promocodes can be changed in this status.
    pub fn is_mutable(&self) -> bool {
        matches!(self, OrderStatus::Basket)
    }

    /// Returns true if `next` is the single valid successor of this status.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Basket, OrderStatus::Placed)
                | (OrderStatus::Placed, OrderStatus::Delivered)
        )
    }

    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }

    /// Returns the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Basket => "basket",
            OrderStatus::Placed => "placed",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basket" => Some(OrderStatus::Basket),
            "placed" => Some(OrderStatus::Placed),
            "delivered" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
