//! Optimistic wishlist membership toggle.

use crate::api::StorefrontApi;
use crate::error::CoreError;
use crate::models::WishlistCheck;
use crate::store::{MutationKind, QueryKey, QueryStatus, ResourceValue};

use super::coordinator::MutationCoordinator;

impl<A: StorefrontApi> MutationCoordinator<A> {
    /// Flip the product's wishlist membership. Returns the new membership.
    ///
    /// The direction (add vs. remove) is decided once, synchronously, from
    /// the pre-mutation cache; it is not re-evaluated mid-flight. If
    /// membership is not cached yet, the check endpoint is consulted before
    /// the mutation begins, since speculating the wrong direction would
    /// flicker on rollback.
    pub async fn toggle_wishlist(&self, product_id: u64) -> Result<bool, CoreError> {
        let current = match self.cached_membership(product_id) {
            Some(check) => check,
            None => {
                let check = self.api.check_wishlist(product_id).await?;
                self.cache.borrow_mut().write(
                    QueryKey::WishlistCheck { product_id },
                    ResourceValue::WishlistCheck(check),
                    QueryStatus::Success,
                );
                check
            }
        };

        if current.in_wishlist {
            self.remove_from_wishlist(product_id, current.item_id)
                .await
                .map(|_| false)
        } else {
            self.add_to_wishlist(product_id).await.map(|_| true)
        }
    }

    /// Membership as the cache knows it: the check entry if present, else
    /// derived from the cached list.
    fn cached_membership(&self, product_id: u64) -> Option<WishlistCheck> {
        let cache = self.cache.borrow();
        if let Some(check) = cache.wishlist_check(product_id) {
            return Some(check);
        }
        cache.wishlist().map(|items| {
            let item = items.iter().find(|item| item.product_id == product_id);
            WishlistCheck {
                in_wishlist: item.is_some(),
                item_id: item.map(|item| item.id),
            }
        })
    }

    async fn add_to_wishlist(&self, product_id: u64) -> Result<(), CoreError> {
        let kind = MutationKind::WishlistAdd { product_id };
        let keys = [
            QueryKey::Wishlist,
            QueryKey::WishlistCheck { product_id },
        ];
        let mut flight = self.begin(kind, &keys, &[]);

        // Speculate the membership flag only; the list gains its entry from
        // the server payload at commit (an unconfirmed row has no id to show).
        self.cache.borrow_mut().write_speculative(
            QueryKey::WishlistCheck { product_id },
            ResourceValue::WishlistCheck(WishlistCheck {
                in_wishlist: true,
                item_id: None,
            }),
        );

        match self
            .dispatch(&mut flight, || self.api.add_wishlist_item(product_id))
            .await
        {
            Ok(item) => {
                self.commit(flight, |cache| {
                    cache.write(
                        QueryKey::WishlistCheck { product_id },
                        ResourceValue::WishlistCheck(WishlistCheck {
                            in_wishlist: true,
                            item_id: Some(item.id),
                        }),
                        QueryStatus::Success,
                    );
                    let cached_list = cache.wishlist().map(<[_]>::to_vec);
                    if let Some(mut items) = cached_list {
                        items.retain(|existing| existing.product_id != product_id);
                        items.push(item.clone());
                        cache.write(
                            QueryKey::Wishlist,
                            ResourceValue::Wishlist(items),
                            QueryStatus::Success,
                        );
                    }
                });
                Ok(())
            }
            Err(error) => {
                self.rollback(flight, &error);
                Err(error.into())
            }
        }
    }

    async fn remove_from_wishlist(
        &self,
        product_id: u64,
        item_id: Option<u64>,
    ) -> Result<(), CoreError> {
        // The row id may be missing when membership was derived from a stale
        // check; re-ask the server before mutating.
        let item_id = match item_id {
            Some(id) => id,
            None => {
                let check = self.api.check_wishlist(product_id).await?;
                match check.item_id {
                    Some(id) => id,
                    None => {
                        // Already absent server-side; reflect that and finish.
                        self.cache.borrow_mut().write(
                            QueryKey::WishlistCheck { product_id },
                            ResourceValue::WishlistCheck(check),
                            QueryStatus::Success,
                        );
                        return Ok(());
                    }
                }
            }
        };

        let kind = MutationKind::WishlistRemove { product_id };
        let keys = [
            QueryKey::Wishlist,
            QueryKey::WishlistCheck { product_id },
        ];
        let mut flight = self.begin(kind, &keys, &[]);

        {
            let mut cache = self.cache.borrow_mut();
            cache.write_speculative(
                QueryKey::WishlistCheck { product_id },
                ResourceValue::WishlistCheck(WishlistCheck {
                    in_wishlist: false,
                    item_id: None,
                }),
            );
            let cached_list = cache.wishlist().map(<[_]>::to_vec);
            if let Some(mut items) = cached_list {
                items.retain(|item| item.id != item_id);
                cache.write_speculative(QueryKey::Wishlist, ResourceValue::Wishlist(items));
            }
        }

        match self
            .dispatch(&mut flight, || self.api.remove_wishlist_item(item_id))
            .await
        {
            Ok(()) => {
                // The speculative state already matches the server's: absence.
                self.commit(flight, |_cache| {});
                Ok(())
            }
            Err(error) => {
                self.rollback(flight, &error);
                Err(error.into())
            }
        }
    }
}
