//! Guest-to-user merge, run once after sign-in.

use chrono::Utc;
use common::{GuestToken, Owner, UserId};
use order_store::{LineItemRecord, LineItemRepository, OrderRepository, Store, Transaction};

use crate::catalog::Catalog;
use crate::error::DomainError;
use crate::operation;
use crate::promocode::recheck_applied;

use super::service::checked_count;
use super::{OrderService, recompute_total};

/// What a guest merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Orders moved from the guest token to the user.
    pub reassigned_orders: u64,
    /// Guest line items folded into the user's existing basket.
    pub merged_line_items: usize,
    /// Whether the guest basket was folded into the user's basket and dropped.
    pub basket_merged: bool,
    /// Whether the basket's promocode was dropped because it does not apply
    /// to the user.
    pub promocode_cleared: bool,
}

impl<S: Store, C: Catalog> OrderService<S, C> {
    /// Moves every order of `token` to `user` in one transaction.
    ///
    /// When both own a basket, the guest's line items are added to the
    /// user's basket (counts summed per food) and the guest basket is
    /// deleted. Otherwise the guest basket changes owner like any other order.
    ///
    /// The resulting basket's promocode is then checked against the user's
    /// history and cleared if the user is not eligible for it.
    #[tracing::instrument(skip(self))]
    pub async fn merge_guest_into_user(
        &self,
        token: &GuestToken,
        user: UserId,
    ) -> Result<MergeOutcome, DomainError> {
        operation::run("merge_guest_into_user", self.config.operation_timeout, async {
            let mut tx = self.store.begin().await?;
            let mut outcome = MergeOutcome::default();

            let owner = Owner::User(user);
            let guest_basket = tx.find_basket(&Owner::Guest(token.clone())).await?;
            if let Some(guest_basket) = &guest_basket
                && let Some(mut user_basket) = tx.find_basket(&owner).await?
            {
                let now = Utc::now();
                for item in tx.list_line_items(guest_basket.id).await? {
                    let merged = match tx.find_line_item(user_basket.id, item.food_id).await? {
                        Some(existing) => LineItemRecord {
                            count: checked_count(
                                i64::from(existing.count) + i64::from(item.count),
                            )?,
                            updated_at: now,
                            ..existing
                        },
                        None => LineItemRecord {
                            order_id: user_basket.id,
                            updated_at: now,
                            ..item
                        },
                    };
                    tx.upsert_line_item(&merged).await?;
                    outcome.merged_line_items += 1;
                }

                tx.delete_order(guest_basket.id).await?;
                recompute_total(&mut tx, &mut user_basket).await?;
                outcome.basket_merged = true;
            }

            outcome.reassigned_orders = tx.reassign_guest_orders(token, user).await?;

            if guest_basket.is_some()
                && let Some(mut basket) = tx.find_basket(&owner).await?
                && let Some(reason) = recheck_applied(&mut tx, &basket).await?
            {
                tracing::warn!(
                    order_id = %basket.id,
                    %user,
                    reason,
                    "promocode does not apply to the merged basket, clearing it"
                );
                basket.promocode_id = None;
                recompute_total(&mut tx, &mut basket).await?;
                outcome.promocode_cleared = true;
            }
            tx.commit().await?;

            metrics::counter!("guest_merges_total").increment(1);
            tracing::info!(
                %user,
                reassigned = outcome.reassigned_orders,
                merged_items = outcome.merged_line_items,
                basket_merged = outcome.basket_merged,
                promocode_cleared = outcome.promocode_cleared,
                "guest orders merged"
            );
            Ok(outcome)
        })
        .await
    }
}
