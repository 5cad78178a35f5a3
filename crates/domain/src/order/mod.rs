//! Order lifecycle: baskets, line items, placement, delivery and merge.

mod aggregate;
mod merge;
mod service;
mod totals;

pub use aggregate::{FoodLineItem, Order};
pub use merge::MergeOutcome;
pub use service::{BasketRef, OrderService};
pub use totals::compute_total;
pub(crate) use totals::recompute_total;

use common::{FoodId, OrderId, OrderStatus, Owner};
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Placing an order that has no line items.
    #[error("Order has no items")]
    EmptyOrder,

    /// A required delivery field was blank.
    #[error("Missing required field: {field}")]
    MissingAddress { field: &'static str },

    /// A count outside `1..=LineItemRecord::MAX_COUNT`.
    #[error("Invalid count: {count} (must be between 1 and 2147483647)")]
    InvalidCount { count: i64 },

    /// The order total does not fit in a money amount.
    #[error("Order total is too large")]
    TotalOverflow,

    /// The order is no longer a basket.
    #[error("Order {order_id} is {status} and can no longer be changed")]
    OrderNotMutable {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// A status change that does not move one step forward.
    #[error("Invalid transition for order {order_id}: {from} -> {to}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Commenting on an order that was not delivered.
    #[error("Order {order_id} is {status}, not delivered")]
    NotDelivered {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The order already carries a comment.
    #[error("Order {0} is already commented")]
    AlreadyCommented(OrderId),

    #[error("Food not found: {0}")]
    FoodNotFound(FoodId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("No basket for {0}")]
    BasketNotFound(Owner),
}

impl OrderError {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            OrderError::EmptyOrder
            | OrderError::MissingAddress { .. }
            | OrderError::InvalidCount { .. }
            | OrderError::TotalOverflow => ErrorKind::Validation,
            OrderError::OrderNotMutable { .. }
            | OrderError::InvalidTransition { .. }
            | OrderError::NotDelivered { .. }
            | OrderError::AlreadyCommented(_) => ErrorKind::State,
            OrderError::FoodNotFound(_)
            | OrderError::OrderNotFound(_)
            | OrderError::BasketNotFound(_) => ErrorKind::NotFound,
        }
    }
}
