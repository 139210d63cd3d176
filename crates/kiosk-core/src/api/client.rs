//! reqwest-backed implementation of [`StorefrontApi`].

use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::models::{
    Cart, ProductDetail, RatingStats, Review, ReviewListResponse, ReviewPage, WishlistCheck,
    WishlistItem,
};

use super::{AddItemRequest, CreateReviewRequest, StorefrontApi, UpdateReviewRequest};

/// HTTP client for the storefront API.
///
/// One instance per runtime; endpoints are resolved relative to the
/// configured base URL. Works for anonymous/guest sessions; none of these
/// endpoints require authentication headers.
pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Classify the status, then decode the success payload.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), message));
        }
        Ok(response.json().await?)
    }

    /// For endpoints that answer 204 No Content.
    async fn expect_empty(response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), message));
        }
        Ok(())
    }
}

impl StorefrontApi for HttpClient {
    async fn fetch_cart(&self) -> Result<Cart, ApiError> {
        let response = self.client.get(self.url("cart")).send().await?;
        Self::decode(response).await
    }

    async fn add_cart_item(&self, request: &AddItemRequest) -> Result<Cart, ApiError> {
        let response = self
            .client
            .post(self.url("cart/items"))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn update_cart_item(&self, item_id: u64, quantity: u32) -> Result<Cart, ApiError> {
        let response = self
            .client
            .patch(self.url(&format!("cart/items/{item_id}")))
            .json(&serde_json::json!({ "quantity": quantity }))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn remove_cart_item(&self, item_id: u64) -> Result<Cart, ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("cart/items/{item_id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn fetch_reviews(&self, product_id: u64, page: u32) -> Result<ReviewPage, ApiError> {
        let response = self
            .client
            .get(self.url("reviews"))
            .query(&[("product", product_id), ("page", u64::from(page))])
            .send()
            .await?;
        let wire: ReviewListResponse = Self::decode(response).await?;
        Ok(wire.into())
    }

    async fn fetch_review(&self, review_id: u64) -> Result<Review, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("reviews/{review_id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn fetch_my_reviews(&self) -> Result<Vec<Review>, ApiError> {
        let response = self.client.get(self.url("reviews/mine")).send().await?;
        let wire: ReviewListResponse = Self::decode(response).await?;
        Ok(ReviewPage::from(wire).results)
    }

    async fn fetch_rating_stats(&self, product_id: u64) -> Result<RatingStats, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("products/{product_id}/rating-stats")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn fetch_product(&self, product_id: u64) -> Result<ProductDetail, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("products/{product_id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn create_review(&self, request: &CreateReviewRequest) -> Result<Review, ApiError> {
        let response = self
            .client
            .post(self.url("reviews"))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn update_review(
        &self,
        review_id: u64,
        request: &UpdateReviewRequest,
    ) -> Result<Review, ApiError> {
        let response = self
            .client
            .patch(self.url(&format!("reviews/{review_id}")))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn delete_review(&self, review_id: u64) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("reviews/{review_id}")))
            .send()
            .await?;
        Self::expect_empty(response).await
    }

    async fn mark_helpful(&self, review_id: u64) -> Result<Review, ApiError> {
        let response = self
            .client
            .post(self.url(&format!("reviews/{review_id}/helpful")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn unmark_helpful(&self, review_id: u64) -> Result<Review, ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("reviews/{review_id}/helpful")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn fetch_wishlist(&self) -> Result<Vec<WishlistItem>, ApiError> {
        let response = self.client.get(self.url("wishlist")).send().await?;
        Self::decode(response).await
    }

    async fn add_wishlist_item(&self, product_id: u64) -> Result<WishlistItem, ApiError> {
        let response = self
            .client
            .post(self.url("wishlist"))
            .json(&serde_json::json!({ "product": product_id }))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn remove_wishlist_item(&self, item_id: u64) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("wishlist/{item_id}")))
            .send()
            .await?;
        Self::expect_empty(response).await
    }

    async fn check_wishlist(&self, product_id: u64) -> Result<WishlistCheck, ApiError> {
        let response = self
            .client
            .get(self.url("wishlist/check"))
            .query(&[("product", product_id)])
            .send()
            .await?;
        Self::decode(response).await
    }
}
