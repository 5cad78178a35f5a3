//! Promocode service: applying and removing discount codes.

use chrono::Utc;
use common::{OrderId, OrderStatus};
use order_store::{LineItemRepository, OrderRecord, Promocode, PromocodeKind, PromocodeRepository, Store, Transaction};

use crate::config::ServiceConfig;
use crate::error::DomainError;
use crate::operation;
use crate::order::{Order, OrderError, compute_total, recompute_total};

use super::{EligibilityFacts, PromocodeError};

/// Service for applying promocodes to baskets.
pub struct PromocodeService<S: Store> {
    store: S,
    config: ServiceConfig,
}

impl<S: Store> PromocodeService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    pub fn with_config(store: S, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Applies `code` to the order and recomputes its total.
    ///
    /// Applying the code the order already carries is a no-op. A rejected
    /// code leaves the order untouched.
    #[tracing::instrument(skip(self))]
    pub async fn apply_promocode(&self, order_id: OrderId, code: &str) -> Result<Order, DomainError> {
        operation::run("apply_promocode", self.config.operation_timeout, async {
            let mut tx = self.store.begin().await?;
            let mut order = lock_basket(&mut tx, order_id).await?;

            let promocode = match tx.find_promocode_by_code(code).await? {
                Some(promocode) if !promocode.is_expired(Utc::now()) => promocode,
                _ => {
                    return Err(PromocodeError::NotFound {
                        code: code.to_string(),
                    }
                    .into());
                }
            };

            if order.promocode_id == Some(promocode.id) {
                let items = tx.list_line_items(order_id).await?;
                tx.commit().await?;
                return Ok(Order::new(order, items));
            }

            let facts = gather_facts(&mut tx, &order, &promocode).await?;
            if let Err(reason) = facts.check(&promocode) {
                metrics::counter!("promocodes_rejected_total", "kind" => promocode.kind.as_str())
                    .increment(1);
                tracing::info!(%order_id, code, reason, "promocode rejected");
                return Err(PromocodeError::NotEligible {
                    code: promocode.code,
                    reason,
                }
                .into());
            }

            let now = Utc::now();
            order.promocode_id = Some(promocode.id);
            tx.record_redemption(order_id, promocode.id, now).await?;
            let items = recompute_total(&mut tx, &mut order).await?;
            tx.commit().await?;

            metrics::counter!("promocodes_applied_total", "kind" => promocode.kind.as_str())
                .increment(1);
            tracing::info!(
                %order_id,
                code,
                discount_pct = promocode.discount_pct,
                total = %order.total,
                "promocode applied"
            );
            Ok(Order::new(order, items))
        })
        .await
    }

    /// Clears the order's promocode. No-op if none is applied.
    #[tracing::instrument(skip(self))]
    pub async fn remove_promocode(&self, order_id: OrderId) -> Result<Order, DomainError> {
        operation::run("remove_promocode", self.config.operation_timeout, async {
            let mut tx = self.store.begin().await?;
            let mut order = lock_basket(&mut tx, order_id).await?;

            let items = if order.promocode_id.take().is_some() {
                recompute_total(&mut tx, &mut order).await?
            } else {
                tx.list_line_items(order_id).await?
            };
            tx.commit().await?;
            Ok(Order::new(order, items))
        })
        .await
    }
}

async fn lock_basket<T: Transaction>(
    tx: &mut T,
    order_id: OrderId,
) -> Result<OrderRecord, DomainError> {
    let order = tx
        .lock_order(order_id)
        .await?
        .ok_or(OrderError::OrderNotFound(order_id))?;

    if order.status != OrderStatus::Basket {
        return Err(OrderError::OrderNotMutable {
            order_id,
            status: order.status,
        }
        .into());
    }
    Ok(order)
}

/// Re-evaluates the order's applied promocode against its current owner
/// and contents.
///
/// Returns the rejection reason when the code no longer applies. Single-use
/// redemptions belong to the order, not the owner, so those codes are kept.
pub(crate) async fn recheck_applied<T: Transaction>(
    tx: &mut T,
    order: &OrderRecord,
) -> Result<Option<&'static str>, DomainError> {
    let Some(promocode_id) = order.promocode_id else {
        return Ok(None);
    };
    let Some(promocode) = tx.find_promocode(promocode_id).await? else {
        return Ok(None);
    };
    if matches!(promocode.kind, PromocodeKind::SingleUse) {
        return Ok(None);
    }

    let facts = gather_facts(tx, order, &promocode).await?;
    Ok(facts.check(&promocode).err())
}

async fn gather_facts<T: Transaction>(
    tx: &mut T,
    order: &OrderRecord,
    promocode: &Promocode,
) -> Result<EligibilityFacts, DomainError> {
    let mut facts = EligibilityFacts {
        order_restaurant: order.restaurant_id,
        ..Default::default()
    };

    match promocode.kind {
        PromocodeKind::FirstOrder => {
            facts.delivered_orders = tx.count_delivered(&order.owner, None).await?;
        }
        PromocodeKind::FirstAtRestaurant { restaurant_id } => {
            facts.delivered_at_restaurant =
                tx.count_delivered(&order.owner, Some(restaurant_id)).await?;
        }
        PromocodeKind::Threshold { .. } => {
            let items = tx.list_line_items(order.id).await?;
            facts.subtotal = compute_total(&items, None)?;
        }
        PromocodeKind::SingleUse => {
            facts.prior_redemptions = tx.count_redemptions(order.id, promocode.id).await?;
        }
    }

    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::{Money, Owner, UserId};
    use order_store::{InMemoryStore, NewPromocode, OrderRepository, PromocodeRepository};

    async fn seed(store: &InMemoryStore, code: NewPromocode) -> OrderId {
        let mut tx = store.begin().await.unwrap();
        tx.insert_promocode(code).await.unwrap();
        let basket = tx
            .insert_basket(&Owner::User(UserId::new(1)), Utc::now())
            .await
            .unwrap()
            .unwrap();
        tx.commit().await.unwrap();
        basket.id
    }

    #[tokio::test]
    async fn test_unknown_code() {
        let store = InMemoryStore::new();
        let order_id = seed(
            &store,
            NewPromocode::new("A", 10, Utc::now() + Duration::days(1), PromocodeKind::SingleUse),
        )
        .await;
        let service = PromocodeService::new(store);

        let result = service.apply_promocode(order_id, "B").await;
        assert!(matches!(
            result,
            Err(DomainError::Promocode(PromocodeError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_expired_code_is_not_found() {
        let store = InMemoryStore::new();
        let order_id = seed(
            &store,
            NewPromocode::new("OLD", 10, Utc::now() - Duration::days(1), PromocodeKind::SingleUse),
        )
        .await;
        let service = PromocodeService::new(store);

        let result = service.apply_promocode(order_id, "OLD").await;
        assert!(matches!(
            result,
            Err(DomainError::Promocode(PromocodeError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_apply_to_empty_basket() {
        let store = InMemoryStore::new();
        let order_id = seed(
            &store,
            NewPromocode::new("FIRST", 20, Utc::now() + Duration::days(1), PromocodeKind::FirstOrder),
        )
        .await;
        let service = PromocodeService::new(store);

        let order = service.apply_promocode(order_id, "FIRST").await.unwrap();
        assert!(order.promocode_id().is_some());
        assert_eq!(order.total(), Money::zero());

        let order = service.remove_promocode(order_id).await.unwrap();
        assert!(order.promocode_id().is_none());
    }

    #[tokio::test]
    async fn test_remove_without_code_is_noop() {
        let store = InMemoryStore::new();
        let order_id = seed(
            &store,
            NewPromocode::new("X", 5, Utc::now() + Duration::days(1), PromocodeKind::SingleUse),
        )
        .await;
        let service = PromocodeService::new(store);

        let order = service.remove_promocode(order_id).await.unwrap();
        assert!(order.promocode_id().is_none());
        assert!(order.total().is_zero());
    }

    #[tokio::test]
    async fn test_missing_order() {
        let service = PromocodeService::new(InMemoryStore::new());
        let result = service.apply_promocode(OrderId::new(9), "X").await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::OrderNotFound(_)))
        ));
    }
}
