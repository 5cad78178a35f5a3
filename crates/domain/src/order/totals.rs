//! Order total recomputation.

use common::Money;
use order_store::{LineItemRecord, OrderRecord, Transaction};

use crate::error::DomainError;

use super::OrderError;

/// Computes `floor(Σ price × count × (100 − pct) / 100)`.
///
/// Without a discount this is the plain subtotal. Fails with
/// [`OrderError::TotalOverflow`] when the subtotal does not fit in [`Money`].
pub fn compute_total(
    items: &[LineItemRecord],
    discount_pct: Option<u8>,
) -> Result<Money, OrderError> {
    let subtotal = items.iter().try_fold(Money::zero(), |acc, item| {
        item.checked_line_total()
            .and_then(|line| acc.checked_add(line))
            .ok_or(OrderError::TotalOverflow)
    })?;
    Ok(match discount_pct {
        Some(pct) => subtotal.discounted(pct),
        None => subtotal,
    })
}

/// Recomputes `order.total` and `order.restaurant_id` from the current line
/// items and promocode, then writes the order row.
///
/// Must run in the same transaction as the mutation that triggered it.
/// Returns the line items it loaded.
pub(crate) async fn recompute_total<T: Transaction>(
    tx: &mut T,
    order: &mut OrderRecord,
) -> Result<Vec<LineItemRecord>, DomainError> {
    let items = tx.list_line_items(order.id).await?;

    let discount = match order.promocode_id {
        Some(promocode_id) => match tx.find_promocode(promocode_id).await? {
            Some(promocode) => Some(promocode.discount_pct),
            None => {
                tracing::warn!(
                    order_id = %order.id,
                    promocode_id = %promocode_id,
                    "order references a missing promocode, dropping it"
                );
                order.promocode_id = None;
                None
            }
        },
        None => None,
    };

    order.total = compute_total(&items, discount)?;
    order.restaurant_id = items.first().map(|item| item.restaurant_id);
    tx.update_order(order).await?;

    Ok(items)
}
