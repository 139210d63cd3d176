//! Which cached queries a settled mutation must refresh.
//!
//! A static mapping from mutation kind to a predicate over [`QueryKey`].
//! Applied on settle (success or failure) via
//! [`ResourceCache::invalidate_where`](super::ResourceCache::invalidate_where).
//! Invalidation only marks entries stale; refetching waits until a subscribed
//! key is read again, so off-screen data costs no network traffic.

use super::QueryKey;

/// Kind of state-changing operation, as the invalidation policy and the
/// stats counters see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    CartAdd,
    CartUpdate,
    CartRemove,
    WishlistAdd { product_id: u64 },
    WishlistRemove { product_id: u64 },
    ReviewCreate { product_id: u64 },
    ReviewUpdate { product_id: u64, review_id: u64 },
    ReviewDelete { product_id: u64, review_id: u64 },
    HelpfulToggle { product_id: u64, review_id: u64 },
}

impl MutationKind {
    pub fn label(&self) -> &'static str {
        match self {
            MutationKind::CartAdd => "cart_add",
            MutationKind::CartUpdate => "cart_update",
            MutationKind::CartRemove => "cart_remove",
            MutationKind::WishlistAdd { .. } => "wishlist_add",
            MutationKind::WishlistRemove { .. } => "wishlist_remove",
            MutationKind::ReviewCreate { .. } => "review_create",
            MutationKind::ReviewUpdate { .. } => "review_update",
            MutationKind::ReviewDelete { .. } => "review_delete",
            MutationKind::HelpfulToggle { .. } => "helpful_toggle",
        }
    }

    /// Whether `key` must be marked stale once a mutation of this kind
    /// settles.
    pub fn invalidates(&self, key: &QueryKey) -> bool {
        match *self {
            // The cart is a singleton resource per session.
            MutationKind::CartAdd | MutationKind::CartUpdate | MutationKind::CartRemove => {
                matches!(key, QueryKey::Cart)
            }

            // The list and the derived membership check must agree.
            MutationKind::WishlistAdd { product_id }
            | MutationKind::WishlistRemove { product_id } => {
                matches!(key, QueryKey::Wishlist)
                    || *key == QueryKey::WishlistCheck { product_id }
            }

            // Rating aggregates are embedded in product detail too; all four
            // views of the product's review state go stale together.
            MutationKind::ReviewCreate { product_id }
            | MutationKind::ReviewUpdate { product_id, .. }
            | MutationKind::ReviewDelete { product_id, .. } => {
                matches!(key, QueryKey::Reviews { product_id: p, .. } if *p == product_id)
                    || *key == QueryKey::RatingStats { product_id }
                    || *key == QueryKey::MyReviews
                    || *key == QueryKey::ProductDetail { product_id }
            }

            // Both locations a vote count can be displayed from. Every page of
            // the product is included rather than only the one holding the
            // review; the extra pages refetch lazily.
            MutationKind::HelpfulToggle {
                product_id,
                review_id,
            } => {
                *key == QueryKey::ReviewDetail { review_id }
                    || matches!(key, QueryKey::Reviews { product_id: p, .. } if *p == product_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cart;
    use crate::store::{QueryStatus, ResourceCache, ResourceValue};

    fn seeded_cache() -> ResourceCache {
        let mut cache = ResourceCache::new();
        let keys = [
            QueryKey::Cart,
            QueryKey::Wishlist,
            QueryKey::WishlistCheck { product_id: 9 },
            QueryKey::Reviews { product_id: 9, page: 1 },
            QueryKey::Reviews { product_id: 9, page: 2 },
            QueryKey::Reviews { product_id: 4, page: 1 },
            QueryKey::RatingStats { product_id: 9 },
            QueryKey::RatingStats { product_id: 4 },
            QueryKey::MyReviews,
            QueryKey::ProductDetail { product_id: 9 },
            QueryKey::ProductDetail { product_id: 4 },
        ];
        for key in keys {
            // The value type does not matter for staleness tracking.
            cache.write(key, ResourceValue::Cart(Cart::default()), QueryStatus::Success);
        }
        cache
    }

    fn stale_keys(cache: &ResourceCache, keys: &[QueryKey]) -> Vec<bool> {
        keys.iter().map(|key| cache.read(key).stale).collect()
    }

    #[test]
    fn test_cart_mutations_touch_only_cart() {
        let mut cache = seeded_cache();
        cache.invalidate_where(|key| MutationKind::CartAdd.invalidates(key));

        assert!(cache.read(&QueryKey::Cart).stale);
        assert!(!cache.read(&QueryKey::Wishlist).stale);
        assert!(!cache.read(&QueryKey::MyReviews).stale);
    }

    #[test]
    fn test_review_create_fan_out() {
        let mut cache = seeded_cache();
        let kind = MutationKind::ReviewCreate { product_id: 9 };
        cache.invalidate_where(|key| kind.invalidates(key));

        let expected_stale = [
            QueryKey::Reviews { product_id: 9, page: 1 },
            QueryKey::Reviews { product_id: 9, page: 2 },
            QueryKey::RatingStats { product_id: 9 },
            QueryKey::MyReviews,
            QueryKey::ProductDetail { product_id: 9 },
        ];
        assert!(stale_keys(&cache, &expected_stale).iter().all(|stale| *stale));

        // Unrelated product untouched.
        let untouched = [
            QueryKey::Reviews { product_id: 4, page: 1 },
            QueryKey::RatingStats { product_id: 4 },
            QueryKey::ProductDetail { product_id: 4 },
            QueryKey::Cart,
        ];
        assert!(stale_keys(&cache, &untouched).iter().all(|stale| !*stale));
    }

    #[test]
    fn test_wishlist_toggle_touches_list_and_check() {
        let mut cache = seeded_cache();
        let kind = MutationKind::WishlistAdd { product_id: 9 };
        cache.invalidate_where(|key| kind.invalidates(key));

        assert!(cache.read(&QueryKey::Wishlist).stale);
        assert!(cache.read(&QueryKey::WishlistCheck { product_id: 9 }).stale);
        assert!(!cache.read(&QueryKey::Cart).stale);
    }

    #[test]
    fn test_helpful_toggle_touches_detail_and_product_pages() {
        let mut cache = seeded_cache();
        let kind = MutationKind::HelpfulToggle {
            product_id: 9,
            review_id: 70,
        };
        cache.invalidate_where(|key| kind.invalidates(key));

        assert!(cache.read(&QueryKey::Reviews { product_id: 9, page: 1 }).stale);
        assert!(cache.read(&QueryKey::Reviews { product_id: 9, page: 2 }).stale);
        assert!(!cache.read(&QueryKey::Reviews { product_id: 4, page: 1 }).stale);
        assert!(!cache.read(&QueryKey::RatingStats { product_id: 9 }).stale);
    }
}
