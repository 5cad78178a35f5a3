//! Eligibility rules per promocode kind.

use common::{Money, RestaurantId};
use order_store::{Promocode, PromocodeKind};

/// Store-derived facts a promocode rule is evaluated against.
///
/// Only the facts the code's kind needs are filled in by the service; the
/// rest keep their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EligibilityFacts {
    /// Delivered orders of the owner, anywhere.
    pub delivered_orders: u64,
    /// Delivered orders of the owner at the code's restaurant.
    pub delivered_at_restaurant: u64,
    /// Restaurant of the order the code is applied to.
    pub order_restaurant: Option<RestaurantId>,
    /// Pre-discount total of the order.
    pub subtotal: Money,
    /// Times this code was already applied to the order.
    pub prior_redemptions: u64,
}

impl EligibilityFacts {
    /// Evaluates the code's rule. On rejection returns the reason.
    pub fn check(&self, promocode: &Promocode) -> Result<(), &'static str> {
        match promocode.kind {
            PromocodeKind::FirstOrder => {
                if self.delivered_orders > 0 {
                    return Err("owner already has a delivered order");
                }
            }
            PromocodeKind::FirstAtRestaurant { restaurant_id } => {
                if self.order_restaurant != Some(restaurant_id) {
                    return Err("order is not from the code's restaurant");
                }
                if self.delivered_at_restaurant > 0 {
                    return Err("owner already has a delivered order at this restaurant");
                }
            }
            PromocodeKind::Threshold { min_sum } => {
                if self.subtotal < min_sum {
                    return Err("order total is below the code's minimum");
                }
            }
            PromocodeKind::SingleUse => {
                if self.prior_redemptions >= 1 {
                    return Err("code was already used on this order");
                }
            }
        }
        Ok(())
    }
}
