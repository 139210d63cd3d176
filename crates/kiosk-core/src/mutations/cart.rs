//! Optimistic cart mutations: add, quantity update, removal.

use rust_decimal::Decimal;

use crate::api::{AddItemRequest, StorefrontApi};
use crate::error::CoreError;
use crate::models::{Cart, CartItem, LineRef};
use crate::store::{MutationKind, QueryKey, QueryStatus, ResourceValue};

use super::coordinator::MutationCoordinator;

/// Parameters for an add-to-cart mutation. The price fields snapshot what the
/// UI displayed at click time; the server recomputes both authoritatively
/// when it answers.
#[derive(Debug, Clone)]
pub struct AddToCart {
    pub product_id: u64,
    pub variant_id: Option<u64>,
    pub quantity: u32,
    pub price: Decimal,
    pub retail_price: Option<Decimal>,
}

impl<A: StorefrontApi> MutationCoordinator<A> {
    pub async fn add_to_cart(&self, request: AddToCart) -> Result<Cart, CoreError> {
        let mut flight = self.begin(MutationKind::CartAdd, &[QueryKey::Cart], &[]);

        // Speculate: merge into an existing line for the same product/variant,
        // otherwise append a pending line with a client-assigned ref.
        {
            let mut cache = self.cache.borrow_mut();
            let mut cart = cache.cart().cloned().unwrap_or_default();
            match cart.find_line_mut(request.product_id, request.variant_id) {
                Some(line) => line.quantity += request.quantity,
                None => cart.items.push(CartItem::pending(
                    request.product_id,
                    request.variant_id,
                    request.quantity,
                    request.price,
                    request.retail_price,
                )),
            }
            cache.write_speculative(QueryKey::Cart, ResourceValue::Cart(cart));
        }

        let wire = AddItemRequest {
            product: request.product_id,
            variant: request.variant_id,
            quantity: request.quantity,
        };
        match self.dispatch(&mut flight, || self.api.add_cart_item(&wire)).await {
            Ok(cart) => {
                self.commit(flight, |cache| {
                    cache.write(
                        QueryKey::Cart,
                        ResourceValue::Cart(cart.clone()),
                        QueryStatus::Success,
                    );
                });
                Ok(cart)
            }
            Err(error) => {
                self.rollback(flight, &error);
                Err(error.into())
            }
        }
    }

    /// Change a line's quantity. A requested quantity of zero or below never
    /// reaches the server as an update: it is redirected to the removal
    /// mutation, so "removed" and "quantity 0" are one state, not two.
    pub async fn update_quantity(&self, line: LineRef, quantity: i64) -> Result<Cart, CoreError> {
        if quantity <= 0 {
            return self.remove_item(line).await;
        }
        let quantity = quantity as u32;
        let item_id = require_server_id(&line)?;
        self.require_cached_line(&line)?;

        let mut flight = self.begin(MutationKind::CartUpdate, &[QueryKey::Cart], &[]);

        {
            let mut cache = self.cache.borrow_mut();
            // require_cached_line checked presence; an empty default never hits.
            let mut cart = cache.cart().cloned().unwrap_or_default();
            if let Some(item) = cart.item_mut(&line) {
                item.quantity = quantity;
            }
            cache.write_speculative(QueryKey::Cart, ResourceValue::Cart(cart));
        }

        match self
            .dispatch(&mut flight, || self.api.update_cart_item(item_id, quantity))
            .await
        {
            Ok(cart) => {
                self.commit(flight, |cache| {
                    cache.write(
                        QueryKey::Cart,
                        ResourceValue::Cart(cart.clone()),
                        QueryStatus::Success,
                    );
                });
                Ok(cart)
            }
            Err(error) => {
                self.rollback(flight, &error);
                Err(error.into())
            }
        }
    }

    pub async fn remove_item(&self, line: LineRef) -> Result<Cart, CoreError> {
        let item_id = require_server_id(&line)?;
        self.require_cached_line(&line)?;

        let mut flight = self.begin(MutationKind::CartRemove, &[QueryKey::Cart], &[]);

        {
            let mut cache = self.cache.borrow_mut();
            let mut cart = cache.cart().cloned().unwrap_or_default();
            cart.items.retain(|item| !item.matches(&line));
            cache.write_speculative(QueryKey::Cart, ResourceValue::Cart(cart));
        }

        match self
            .dispatch(&mut flight, || self.api.remove_cart_item(item_id))
            .await
        {
            Ok(cart) => {
                self.commit(flight, |cache| {
                    cache.write(
                        QueryKey::Cart,
                        ResourceValue::Cart(cart.clone()),
                        QueryStatus::Success,
                    );
                });
                Ok(cart)
            }
            Err(error) => {
                self.rollback(flight, &error);
                Err(error.into())
            }
        }
    }

    /// Mutations address lines the UI is rendering from the cache; a miss
    /// means the line is already gone.
    fn require_cached_line(&self, line: &LineRef) -> Result<(), CoreError> {
        let cache = self.cache.borrow();
        match cache.cart() {
            Some(cart) if cart.item(line).is_some() => Ok(()),
            _ => Err(CoreError::UnknownItem),
        }
    }
}

/// Only server-confirmed lines can be addressed remotely.
fn require_server_id(line: &LineRef) -> Result<u64, CoreError> {
    match line {
        LineRef::Server(id) => Ok(*id),
        LineRef::Pending(client_ref) => Err(CoreError::UnsyncedItem(*client_ref)),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::error::{ApiError, CoreError};
    use crate::events::CoreEvent;
    use crate::models::LineRef;
    use crate::mutations::testing::{cart_with, harness, server_line};
    use crate::store::{QueryKey, QueryStatus};

    use super::AddToCart;

    fn add_request(product_id: u64) -> AddToCart {
        AddToCart {
            product_id,
            variant_id: None,
            quantity: 1,
            price: dec!(10.00),
            retail_price: None,
        }
    }

    #[tokio::test]
    async fn test_optimistic_add_then_server_truth() {
        let h = harness();
        h.seed_cart(cart_with(vec![]));

        // The server merges the add and also applies a discount the client
        // did not guess.
        let mut server_cart = cart_with(vec![server_line(7, 5, 1, dec!(10.00))]);
        server_cart.total_discount = Some(dec!(1.00));
        h.api.push_cart(Ok(server_cart.clone()));
        let release = h.api.gate_next_cart();

        let mutation = h.coordinator.add_to_cart(add_request(5));
        let observer = async {
            // While the call is in flight the speculative line is already
            // visible, with a client-assigned ref and no server id.
            let cart = h.cached_cart().unwrap();
            assert_eq!(cart.items.len(), 1);
            assert_eq!(cart.items[0].id, None);
            assert!(cart.items[0].client_ref.is_some());
            let _ = release.send(());
        };
        let (result, ()) = tokio::join!(mutation, observer);

        // Commit ends in exactly the server's state, not the speculation.
        assert_eq!(result.unwrap(), server_cart);
        assert_eq!(h.cached_cart().unwrap(), server_cart);
        assert_eq!(h.cached_cart().unwrap().items[0].id, Some(7));
    }

    #[tokio::test]
    async fn test_rollback_restores_exact_prior_state() {
        let mut h = harness();
        h.seed_cart(cart_with(vec![server_line(7, 5, 2, dec!(10.00))]));
        let before = h.cache.borrow().read(&QueryKey::Cart);

        h.api
            .push_cart(Err(ApiError::from_status(422, "out of stock".to_string())));

        let result = h
            .coordinator
            .update_quantity(LineRef::Server(7), 5)
            .await;
        assert!(matches!(result, Err(CoreError::Api(ApiError::Client { status: 422, .. }))));

        let after = h.cache.borrow().read(&QueryKey::Cart);
        assert_eq!(after.value, before.value);
        assert_eq!(after.status, before.status);
        // Settle-time invalidation schedules a revalidation of the restored
        // value.
        assert!(after.stale);

        let events = h.drain_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, CoreEvent::MutationFailed { .. })));
    }

    #[tokio::test]
    async fn test_zero_quantity_is_removal() {
        let h = harness();
        h.seed_cart(cart_with(vec![server_line(7, 5, 2, dec!(10.00))]));
        h.api.push_cart(Ok(cart_with(vec![])));

        let cart = h
            .coordinator
            .update_quantity(LineRef::Server(7), 0)
            .await
            .unwrap();

        assert!(cart.is_empty());
        assert!(h.cached_cart().unwrap().is_empty());
        // The update was redirected to the removal endpoint; no PATCH with a
        // zero quantity ever goes out.
        assert_eq!(h.api.call_log(), vec!["DELETE cart/items/7".to_string()]);
    }

    #[tokio::test]
    async fn test_negative_quantity_is_removal() {
        let h = harness();
        h.seed_cart(cart_with(vec![server_line(7, 5, 2, dec!(10.00))]));
        h.api.push_cart(Ok(cart_with(vec![])));

        h.coordinator
            .update_quantity(LineRef::Server(7), -3)
            .await
            .unwrap();
        assert_eq!(h.api.call_log(), vec!["DELETE cart/items/7".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_response_cannot_overwrite_later_mutation() {
        let h = harness();
        h.seed_cart(cart_with(vec![server_line(7, 5, 1, dec!(10.00))]));

        // First update's response is held back; the second settles first.
        let release_first = h.api.gate_next_cart();
        h.api.push_cart(Ok(cart_with(vec![server_line(7, 5, 2, dec!(10.00))])));
        h.api.push_cart(Ok(cart_with(vec![server_line(7, 5, 3, dec!(10.00))])));

        let first = h.coordinator.update_quantity(LineRef::Server(7), 2);
        let second = async {
            let result = h.coordinator.update_quantity(LineRef::Server(7), 3).await;
            let _ = release_first.send(());
            result
        };
        let (first_result, second_result) = tokio::join!(first, second);

        assert!(first_result.is_ok());
        assert!(second_result.is_ok());

        // The earlier request's response arrived last but may not commit; the
        // cache reflects the latest issued mutation and is left stale for
        // revalidation.
        let cart = h.cached_cart().unwrap();
        assert_eq!(cart.items[0].quantity, 3);
        assert!(h.cache.borrow().read(&QueryKey::Cart).stale);
    }

    #[tokio::test]
    async fn test_transient_failure_retries_then_commits() {
        let h = harness();
        h.seed_cart(cart_with(vec![server_line(7, 5, 1, dec!(10.00))]));

        h.api.push_cart(Err(ApiError::from_status(503, String::new())));
        let server_cart = cart_with(vec![server_line(7, 5, 4, dec!(10.00))]);
        h.api.push_cart(Ok(server_cart.clone()));

        let result = h
            .coordinator
            .update_quantity(LineRef::Server(7), 4)
            .await
            .unwrap();

        assert_eq!(result, server_cart);
        assert_eq!(h.api.call_log().len(), 2);
        let stats = h.stats.snapshot();
        assert_eq!(stats.retries.get("cart_update"), Some(&1));
        assert_eq!(stats.committed.get("cart_update"), Some(&1));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let h = harness();
        h.seed_cart(cart_with(vec![server_line(7, 5, 1, dec!(10.00))]));
        h.api
            .push_cart(Err(ApiError::from_status(404, "gone".to_string())));

        let result = h.coordinator.update_quantity(LineRef::Server(7), 2).await;

        assert!(result.is_err());
        assert_eq!(h.api.call_log().len(), 1);
        assert_eq!(h.stats.snapshot().retries.get("cart_update"), None);
    }

    #[tokio::test]
    async fn test_pending_line_cannot_be_mutated() {
        let h = harness();
        let pending = crate::models::CartItem::pending(5, None, 1, dec!(10.00), None);
        let line = pending.line_ref().unwrap();
        h.seed_cart(cart_with(vec![pending]));

        let result = h.coordinator.update_quantity(line, 2).await;
        assert!(matches!(result, Err(CoreError::UnsyncedItem(_))));
        assert!(h.api.call_log().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_line_fails_before_dispatch() {
        let h = harness();
        h.seed_cart(cart_with(vec![]));

        let result = h.coordinator.remove_item(LineRef::Server(99)).await;
        assert!(matches!(result, Err(CoreError::UnknownItem)));
        assert!(h.api.call_log().is_empty());
    }

    #[tokio::test]
    async fn test_add_merges_existing_line_speculatively() {
        let h = harness();
        h.seed_cart(cart_with(vec![server_line(7, 5, 1, dec!(10.00))]));

        let server_cart = cart_with(vec![server_line(7, 5, 2, dec!(10.00))]);
        h.api.push_cart(Ok(server_cart.clone()));
        let release = h.api.gate_next_cart();

        let mutation = h.coordinator.add_to_cart(add_request(5));
        let observer = async {
            // Same product and variant: the existing line grows instead of a
            // second line appearing.
            let cart = h.cached_cart().unwrap();
            assert_eq!(cart.items.len(), 1);
            assert_eq!(cart.items[0].quantity, 2);
            let _ = release.send(());
        };
        let (result, ()) = tokio::join!(mutation, observer);

        assert_eq!(result.unwrap(), server_cart);
        assert_eq!(h.cached_cart().unwrap(), server_cart);
    }

    #[tokio::test]
    async fn test_mutation_status_never_shows_loading() {
        let h = harness();
        h.seed_cart(cart_with(vec![server_line(7, 5, 1, dec!(10.00))]));
        h.api.push_cart(Ok(cart_with(vec![server_line(7, 5, 2, dec!(10.00))])));
        let release = h.api.gate_next_cart();

        let mutation = h.coordinator.update_quantity(LineRef::Server(7), 2);
        let observer = async {
            // The already-cached portion renders without a loading state
            // while the call is in flight.
            let entry = h.cache.borrow().read(&QueryKey::Cart);
            assert_eq!(entry.status, QueryStatus::Success);
            let _ = release.send(());
        };
        let (result, ()) = tokio::join!(mutation, observer);
        result.unwrap();
    }
}
