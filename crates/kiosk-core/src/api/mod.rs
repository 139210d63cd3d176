//! Transport seam between the core and the storefront service.
//!
//! The remote API owns all business logic (pricing rules, inventory, stacking
//! of discounts); the core only depends on the request/response contracts
//! expressed by [`StorefrontApi`]. Production uses [`HttpClient`]; tests
//! script a fake.

pub mod client;

use serde::Serialize;

use crate::error::ApiError;
use crate::models::{
    Cart, ProductDetail, RatingStats, Review, ReviewPage, WishlistCheck, WishlistItem,
};

pub use client::HttpClient;

/// Payload for `POST cart/items`.
#[derive(Debug, Clone, Serialize)]
pub struct AddItemRequest {
    pub product: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<u64>,
    pub quantity: u32,
}

/// Payload for `POST reviews`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateReviewRequest {
    pub product: u64,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
}

/// Payload for `PATCH reviews/{id}`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// The storefront service's request/response contracts.
///
/// Futures returned here carry no `Send` bound: the core runs on a
/// current-thread runtime and shares its cache via `Rc`.
#[allow(async_fn_in_trait)]
pub trait StorefrontApi {
    async fn fetch_cart(&self) -> Result<Cart, ApiError>;
    async fn add_cart_item(&self, request: &AddItemRequest) -> Result<Cart, ApiError>;
    async fn update_cart_item(&self, item_id: u64, quantity: u32) -> Result<Cart, ApiError>;
    async fn remove_cart_item(&self, item_id: u64) -> Result<Cart, ApiError>;

    async fn fetch_reviews(&self, product_id: u64, page: u32) -> Result<ReviewPage, ApiError>;
    async fn fetch_review(&self, review_id: u64) -> Result<Review, ApiError>;
    async fn fetch_my_reviews(&self) -> Result<Vec<Review>, ApiError>;
    async fn fetch_rating_stats(&self, product_id: u64) -> Result<RatingStats, ApiError>;
    async fn fetch_product(&self, product_id: u64) -> Result<ProductDetail, ApiError>;
    async fn create_review(&self, request: &CreateReviewRequest) -> Result<Review, ApiError>;
    async fn update_review(
        &self,
        review_id: u64,
        request: &UpdateReviewRequest,
    ) -> Result<Review, ApiError>;
    async fn delete_review(&self, review_id: u64) -> Result<(), ApiError>;
    async fn mark_helpful(&self, review_id: u64) -> Result<Review, ApiError>;
    async fn unmark_helpful(&self, review_id: u64) -> Result<Review, ApiError>;

    async fn fetch_wishlist(&self) -> Result<Vec<WishlistItem>, ApiError>;
    async fn add_wishlist_item(&self, product_id: u64) -> Result<WishlistItem, ApiError>;
    async fn remove_wishlist_item(&self, item_id: u64) -> Result<(), ApiError>;
    async fn check_wishlist(&self, product_id: u64) -> Result<WishlistCheck, ApiError>;
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use tokio::sync::oneshot;

    use super::*;

    /// Scripted transport for coordinator tests.
    ///
    /// Responses are queued per payload type and popped in call order; the
    /// call log records which endpoints were hit. Cart-endpoint calls can be
    /// gated on a oneshot so tests control completion order.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub carts: RefCell<VecDeque<Result<Cart, ApiError>>>,
        pub reviews: RefCell<VecDeque<Result<Review, ApiError>>>,
        pub pages: RefCell<VecDeque<Result<ReviewPage, ApiError>>>,
        pub wishlist_items: RefCell<VecDeque<Result<WishlistItem, ApiError>>>,
        pub checks: RefCell<VecDeque<Result<WishlistCheck, ApiError>>>,
        pub units: RefCell<VecDeque<Result<(), ApiError>>>,
        pub cart_gates: RefCell<VecDeque<oneshot::Receiver<()>>>,
        pub calls: RefCell<Vec<String>>,
    }

    impl FakeApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_cart(&self, response: Result<Cart, ApiError>) {
            self.carts.borrow_mut().push_back(response);
        }

        pub fn push_review(&self, response: Result<Review, ApiError>) {
            self.reviews.borrow_mut().push_back(response);
        }

        pub fn push_check(&self, response: Result<WishlistCheck, ApiError>) {
            self.checks.borrow_mut().push_back(response);
        }

        pub fn push_wishlist_item(&self, response: Result<WishlistItem, ApiError>) {
            self.wishlist_items.borrow_mut().push_back(response);
        }

        pub fn push_unit(&self, response: Result<(), ApiError>) {
            self.units.borrow_mut().push_back(response);
        }

        /// Gate the next cart-endpoint call; it will not answer until the
        /// returned sender fires.
        pub fn gate_next_cart(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.cart_gates.borrow_mut().push_back(rx);
            tx
        }

        pub fn call_log(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn record(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }

        /// Pops the response first, then waits on the gate, so concurrent
        /// callers receive their responses in call order even when a gate
        /// reorders completions.
        async fn answer_cart(&self, call: String) -> Result<Cart, ApiError> {
            self.record(call);
            let response = self
                .carts
                .borrow_mut()
                .pop_front()
                .expect("unscripted cart response");
            let gate = self.cart_gates.borrow_mut().pop_front();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            response
        }
    }

    impl StorefrontApi for FakeApi {
        async fn fetch_cart(&self) -> Result<Cart, ApiError> {
            self.answer_cart("GET cart".to_string()).await
        }

        async fn add_cart_item(&self, request: &AddItemRequest) -> Result<Cart, ApiError> {
            self.answer_cart(format!(
                "POST cart/items product={} quantity={}",
                request.product, request.quantity
            ))
            .await
        }

        async fn update_cart_item(&self, item_id: u64, quantity: u32) -> Result<Cart, ApiError> {
            self.answer_cart(format!("PATCH cart/items/{item_id} quantity={quantity}"))
                .await
        }

        async fn remove_cart_item(&self, item_id: u64) -> Result<Cart, ApiError> {
            self.answer_cart(format!("DELETE cart/items/{item_id}")).await
        }

        async fn fetch_reviews(&self, product_id: u64, page: u32) -> Result<ReviewPage, ApiError> {
            self.record(format!("GET reviews?product={product_id}&page={page}"));
            self.pages
                .borrow_mut()
                .pop_front()
                .expect("unscripted page response")
        }

        async fn fetch_review(&self, review_id: u64) -> Result<Review, ApiError> {
            self.record(format!("GET reviews/{review_id}"));
            self.reviews
                .borrow_mut()
                .pop_front()
                .expect("unscripted review response")
        }

        async fn fetch_my_reviews(&self) -> Result<Vec<Review>, ApiError> {
            unimplemented!("not scripted")
        }

        async fn fetch_rating_stats(&self, _product_id: u64) -> Result<RatingStats, ApiError> {
            unimplemented!("not scripted")
        }

        async fn fetch_product(&self, _product_id: u64) -> Result<ProductDetail, ApiError> {
            unimplemented!("not scripted")
        }

        async fn create_review(&self, request: &CreateReviewRequest) -> Result<Review, ApiError> {
            self.record(format!("POST reviews product={}", request.product));
            self.reviews
                .borrow_mut()
                .pop_front()
                .expect("unscripted review response")
        }

        async fn update_review(
            &self,
            review_id: u64,
            _request: &UpdateReviewRequest,
        ) -> Result<Review, ApiError> {
            self.record(format!("PATCH reviews/{review_id}"));
            self.reviews
                .borrow_mut()
                .pop_front()
                .expect("unscripted review response")
        }

        async fn delete_review(&self, review_id: u64) -> Result<(), ApiError> {
            self.record(format!("DELETE reviews/{review_id}"));
            self.units
                .borrow_mut()
                .pop_front()
                .expect("unscripted unit response")
        }

        async fn mark_helpful(&self, review_id: u64) -> Result<Review, ApiError> {
            self.record(format!("POST reviews/{review_id}/helpful"));
            self.reviews
                .borrow_mut()
                .pop_front()
                .expect("unscripted review response")
        }

        async fn unmark_helpful(&self, review_id: u64) -> Result<Review, ApiError> {
            self.record(format!("DELETE reviews/{review_id}/helpful"));
            self.reviews
                .borrow_mut()
                .pop_front()
                .expect("unscripted review response")
        }

        async fn fetch_wishlist(&self) -> Result<Vec<WishlistItem>, ApiError> {
            unimplemented!("not scripted")
        }

        async fn add_wishlist_item(&self, product_id: u64) -> Result<WishlistItem, ApiError> {
            self.record(format!("POST wishlist product={product_id}"));
            self.wishlist_items
                .borrow_mut()
                .pop_front()
                .expect("unscripted wishlist response")
        }

        async fn remove_wishlist_item(&self, item_id: u64) -> Result<(), ApiError> {
            self.record(format!("DELETE wishlist/{item_id}"));
            self.units
                .borrow_mut()
                .pop_front()
                .expect("unscripted unit response")
        }

        async fn check_wishlist(&self, product_id: u64) -> Result<WishlistCheck, ApiError> {
            self.record(format!("GET wishlist/check?product={product_id}"));
            self.checks
                .borrow_mut()
                .pop_front()
                .expect("unscripted check response")
        }
    }
}
