//! Review mutations.
//!
//! The helpful-vote toggle is optimistic; create/update/delete dispatch first
//! and only write the server payload, then fan out invalidation to every
//! view of the product's review state.

use crate::api::{CreateReviewRequest, StorefrontApi, UpdateReviewRequest};
use crate::error::CoreError;
use crate::models::Review;
use crate::store::{MutationKind, QueryKey};

use super::coordinator::MutationCoordinator;

impl<A: StorefrontApi> MutationCoordinator<A> {
    pub async fn create_review(&self, request: CreateReviewRequest) -> Result<Review, CoreError> {
        let kind = MutationKind::ReviewCreate {
            product_id: request.product,
        };
        let review = self
            .run_plain(
                kind,
                || self.api.create_review(&request),
                |cache, review: &Review| cache.push_my_review(review.clone()),
            )
            .await?;
        Ok(review)
    }

    pub async fn update_review(
        &self,
        review_id: u64,
        request: UpdateReviewRequest,
    ) -> Result<Review, CoreError> {
        let product_id = self.require_cached_review(review_id)?.product_id;
        let kind = MutationKind::ReviewUpdate {
            product_id,
            review_id,
        };
        let review = self
            .run_plain(
                kind,
                || self.api.update_review(review_id, &request),
                |cache, review: &Review| cache.upsert_review(review.clone()),
            )
            .await?;
        Ok(review)
    }

    pub async fn delete_review(&self, review_id: u64) -> Result<(), CoreError> {
        let product_id = self.require_cached_review(review_id)?.product_id;
        let kind = MutationKind::ReviewDelete {
            product_id,
            review_id,
        };
        self.run_plain(
            kind,
            || self.api.delete_review(review_id),
            |cache, _: &()| cache.remove_review(review_id),
        )
        .await?;
        Ok(())
    }

    /// Flip the current user's helpful vote on a review. Returns the settled
    /// review.
    ///
    /// Which endpoint to call (mark vs. unmark) is decided once from the
    /// pre-mutation snapshot and not re-evaluated mid-flight. The speculation
    /// touches the single normalized record, so the detail view and any
    /// cached page move together.
    pub async fn toggle_helpful(&self, review_id: u64) -> Result<Review, CoreError> {
        let current = self.cache.borrow().review(review_id).cloned();
        let current = match current {
            Some(review) => review,
            None => {
                // Not cached yet (e.g. deep link straight to a review).
                let fetched = self.api.fetch_review(review_id).await?;
                self.cache.borrow_mut().store_review_detail(fetched.clone());
                fetched
            }
        };

        let kind = MutationKind::HelpfulToggle {
            product_id: current.product_id,
            review_id,
        };
        let keys = [QueryKey::ReviewDetail { review_id }];
        let mut flight = self.begin(kind, &keys, &[review_id]);

        let marking = !current.voted_helpful;

        {
            let mut speculated = current.clone();
            speculated.voted_helpful = marking;
            speculated.helpful_count = if marking {
                speculated.helpful_count + 1
            } else {
                speculated.helpful_count.saturating_sub(1)
            };
            self.cache.borrow_mut().upsert_review(speculated);
        }

        let api = &self.api;
        let result = self
            .dispatch(&mut flight, || async move {
                if marking {
                    api.mark_helpful(review_id).await
                } else {
                    api.unmark_helpful(review_id).await
                }
            })
            .await;

        match result {
            Ok(review) => {
                self.commit(flight, |cache| {
                    cache.store_review_detail(review.clone());
                });
                Ok(review)
            }
            Err(error) => {
                self.rollback(flight, &error);
                Err(error.into())
            }
        }
    }

    fn require_cached_review(&self, review_id: u64) -> Result<Review, CoreError> {
        self.cache
            .borrow()
            .review(review_id)
            .cloned()
            .ok_or(CoreError::UnknownReview(review_id))
    }
}
