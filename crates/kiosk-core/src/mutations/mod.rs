pub mod cart;
pub mod coordinator;
pub mod reviews;
pub mod wishlist;

pub use cart::AddToCart;
pub use coordinator::{InFlight, MutationCoordinator, MutationPhase};

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use crate::api::fake::FakeApi;
    use crate::events::CoreEvent;
    use crate::models::{Cart, CartItem, Review};
    use crate::stats::SharedMutationStats;
    use crate::store::{QueryKey, QueryStatus, ResourceCache, ResourceValue};

    use super::MutationCoordinator;

    pub(crate) struct Harness {
        pub api: Rc<FakeApi>,
        pub cache: Rc<RefCell<ResourceCache>>,
        pub coordinator: MutationCoordinator<FakeApi>,
        pub stats: SharedMutationStats,
        pub events: UnboundedReceiver<CoreEvent>,
    }

    pub(crate) fn harness() -> Harness {
        let (event_tx, events) = mpsc::unbounded_channel();
        let cache = Rc::new(RefCell::new(ResourceCache::with_events(event_tx.clone())));
        let api = Rc::new(FakeApi::new());
        let stats = SharedMutationStats::new();
        let coordinator = MutationCoordinator::new(
            Rc::clone(&api),
            Rc::clone(&cache),
            stats.clone(),
            event_tx,
        );
        Harness {
            api,
            cache,
            coordinator,
            stats,
            events,
        }
    }

    impl Harness {
        pub fn seed_cart(&self, cart: Cart) {
            self.cache.borrow_mut().write(
                QueryKey::Cart,
                ResourceValue::Cart(cart),
                QueryStatus::Success,
            );
        }

        pub fn cached_cart(&self) -> Option<Cart> {
            self.cache.borrow().cart().cloned()
        }

        pub fn drain_events(&mut self) -> Vec<CoreEvent> {
            let mut drained = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                drained.push(event);
            }
            drained
        }
    }

    pub(crate) fn server_line(id: u64, product_id: u64, quantity: u32, price: Decimal) -> CartItem {
        CartItem {
            id: Some(id),
            client_ref: None,
            product_id,
            variant_id: None,
            quantity,
            price_at_time: price,
            retail_price_at_time: None,
        }
    }

    pub(crate) fn cart_with(items: Vec<CartItem>) -> Cart {
        Cart {
            id: Some(1),
            items,
            ..Cart::default()
        }
    }

    pub(crate) fn review(id: u64, product_id: u64, helpful_count: u32, voted: bool) -> Review {
        Review {
            id,
            product_id,
            author: "maya".to_string(),
            rating: 4,
            title: None,
            body: "solid".to_string(),
            helpful_count,
            voted_helpful: voted,
            created_at: Utc::now(),
        }
    }
}
