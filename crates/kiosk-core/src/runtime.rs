//! Session-scoped owner of the cache, API client and mutation coordinator.
//!
//! One `CoreRuntime` exists per application session: created at startup,
//! torn down (and persisted) on exit or logout. All access to server-owned
//! state goes through it; nothing else holds cache references beyond the
//! `Rc` it hands out. The runtime is single-threaded: drive it from a
//! current-thread tokio runtime.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use futures::FutureExt;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::api::{CreateReviewRequest, HttpClient, StorefrontApi, UpdateReviewRequest};
use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::events::CoreEvent;
use crate::models::{
    Cart, LineRef, ProductDetail, RatingStats, Review, ReviewPage, WishlistCheck, WishlistItem,
};
use crate::mutations::{AddToCart, MutationCoordinator};
use crate::pricing::{self, PriceBreakdown};
use crate::stats::SharedMutationStats;
use crate::store::{
    session_cache, CacheEntry, QueryKey, QueryStatus, ResourceCache, ResourceValue, SessionState,
};

pub struct CoreRuntime<A: StorefrontApi = HttpClient> {
    config: CoreConfig,
    cache: Rc<RefCell<ResourceCache>>,
    coordinator: MutationCoordinator<A>,
    api: Rc<A>,
    stats: SharedMutationStats,
    event_rx: Option<UnboundedReceiver<CoreEvent>>,
}

impl CoreRuntime<HttpClient> {
    /// Runtime talking to the configured HTTP API. The settled session
    /// snapshot is loaded from disk and seeded stale, so it renders
    /// immediately and revalidates on first read.
    pub fn new(config: CoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let api = HttpClient::new(config.api_base.clone());
        Ok(Self::with_api(config, api))
    }
}

impl<A: StorefrontApi> CoreRuntime<A> {
    /// Runtime over an arbitrary transport (tests script a fake here).
    pub fn with_api(config: CoreConfig, api: A) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cache = Rc::new(RefCell::new(ResourceCache::with_events(event_tx.clone())));
        let api = Rc::new(api);
        let stats = SharedMutationStats::new();
        let coordinator = MutationCoordinator::new(
            Rc::clone(&api),
            Rc::clone(&cache),
            stats.clone(),
            event_tx,
        );

        let runtime = Self {
            config,
            cache,
            coordinator,
            api,
            stats,
            event_rx: Some(event_rx),
        };
        runtime.seed_from_session();
        runtime
    }

    fn seed_from_session(&self) {
        let Some(state) = session_cache::load_session(&self.config.data_dir) else {
            return;
        };
        let mut cache = self.cache.borrow_mut();
        if let Some(cart) = state.cart {
            cache.write(QueryKey::Cart, ResourceValue::Cart(cart), QueryStatus::Success);
            cache.invalidate(&QueryKey::Cart);
        }
        if let Some(wishlist) = state.wishlist {
            cache.write(
                QueryKey::Wishlist,
                ResourceValue::Wishlist(wishlist),
                QueryStatus::Success,
            );
            cache.invalidate(&QueryKey::Wishlist);
        }
        tracing::info!("seeded cache from session snapshot");
    }

    /// Persist the settled session snapshot. Unconfirmed cart lines are
    /// speculative state and are never written.
    pub fn shutdown(&self) {
        let state = {
            let cache = self.cache.borrow();
            let cart = cache.cart().cloned().map(|mut cart| {
                cart.items.retain(|item| item.id.is_some());
                cart
            });
            SessionState {
                cart,
                wishlist: cache.wishlist().map(<[_]>::to_vec),
            }
        };
        if let Err(error) = session_cache::save_session(&self.config.data_dir, state) {
            tracing::warn!(error = %error, "failed to persist session snapshot");
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn cache(&self) -> Rc<RefCell<ResourceCache>> {
        Rc::clone(&self.cache)
    }

    pub fn stats(&self) -> SharedMutationStats {
        self.stats.clone()
    }

    /// Hand the event channel to the frontend. Subscribers re-read the cache
    /// on each event.
    pub fn take_event_rx(&mut self) -> Option<UnboundedReceiver<CoreEvent>> {
        self.event_rx.take()
    }

    /// Non-blocking event poll for frontends with their own loop.
    pub fn poll_event(&mut self) -> Option<CoreEvent> {
        self.event_rx.as_mut()?.recv().now_or_never().flatten()
    }

    /// Current entry for any key, without touching the network.
    pub fn cached(&self, key: &QueryKey) -> CacheEntry {
        self.cache.borrow().read(key)
    }

    pub fn subscribe(&self, key: QueryKey) {
        self.cache.borrow_mut().subscribe(key);
    }

    pub fn unsubscribe(&self, key: &QueryKey) {
        self.cache.borrow_mut().unsubscribe(key);
    }

    // ===== Read-through accessors =====
    //
    // Fresh cache hit -> no network. Stale or missing -> fetch, cache, serve
    // server truth. Fetch failures surface as errors even for anonymous
    // resources; the last-good value stays cached for rendering.

    pub async fn cart(&self) -> Result<Cart, CoreError> {
        if !self.cache.borrow().needs_refresh(&QueryKey::Cart) {
            if let Some(cart) = self.cache.borrow().cart() {
                return Ok(cart.clone());
            }
        }
        self.refresh_cart().await
    }

    pub async fn refresh_cart(&self) -> Result<Cart, CoreError> {
        self.cache.borrow_mut().mark_fetching(&QueryKey::Cart);
        match self.api.fetch_cart().await {
            Ok(cart) => {
                self.cache.borrow_mut().write(
                    QueryKey::Cart,
                    ResourceValue::Cart(cart.clone()),
                    QueryStatus::Success,
                );
                Ok(cart)
            }
            Err(error) => {
                self.cache.borrow_mut().mark_error(&QueryKey::Cart);
                Err(error.into())
            }
        }
    }

    pub async fn wishlist(&self) -> Result<Vec<WishlistItem>, CoreError> {
        let key = QueryKey::Wishlist;
        if !self.cache.borrow().needs_refresh(&key) {
            if let Some(items) = self.cache.borrow().wishlist() {
                return Ok(items.to_vec());
            }
        }
        self.cache.borrow_mut().mark_fetching(&key);
        match self.api.fetch_wishlist().await {
            Ok(items) => {
                self.cache.borrow_mut().write(
                    key,
                    ResourceValue::Wishlist(items.clone()),
                    QueryStatus::Success,
                );
                Ok(items)
            }
            Err(error) => {
                self.cache.borrow_mut().mark_error(&key);
                Err(error.into())
            }
        }
    }

    pub async fn wishlist_check(&self, product_id: u64) -> Result<WishlistCheck, CoreError> {
        let key = QueryKey::WishlistCheck { product_id };
        if !self.cache.borrow().needs_refresh(&key) {
            if let Some(check) = self.cache.borrow().wishlist_check(product_id) {
                return Ok(check);
            }
        }
        self.cache.borrow_mut().mark_fetching(&key);
        match self.api.check_wishlist(product_id).await {
            Ok(check) => {
                self.cache.borrow_mut().write(
                    key,
                    ResourceValue::WishlistCheck(check),
                    QueryStatus::Success,
                );
                Ok(check)
            }
            Err(error) => {
                self.cache.borrow_mut().mark_error(&key);
                Err(error.into())
            }
        }
    }

    pub async fn reviews(&self, product_id: u64, page: u32) -> Result<ReviewPage, CoreError> {
        let key = QueryKey::Reviews { product_id, page };
        if !self.cache.borrow().needs_refresh(&key) {
            if let Some(cached) = self.cache.borrow().review_page(product_id, page) {
                return Ok(cached);
            }
        }
        self.cache.borrow_mut().mark_fetching(&key);
        match self.api.fetch_reviews(product_id, page).await {
            Ok(fetched) => {
                self.cache
                    .borrow_mut()
                    .store_review_page(product_id, page, fetched.clone());
                Ok(fetched)
            }
            Err(error) => {
                self.cache.borrow_mut().mark_error(&key);
                Err(error.into())
            }
        }
    }

    pub async fn review(&self, review_id: u64) -> Result<Review, CoreError> {
        let key = QueryKey::ReviewDetail { review_id };
        if !self.cache.borrow().needs_refresh(&key) {
            if let Some(review) = self.cache.borrow().review(review_id) {
                return Ok(review.clone());
            }
        }
        self.cache.borrow_mut().mark_fetching(&key);
        match self.api.fetch_review(review_id).await {
            Ok(review) => {
                self.cache.borrow_mut().store_review_detail(review.clone());
                Ok(review)
            }
            Err(error) => {
                self.cache.borrow_mut().mark_error(&key);
                Err(error.into())
            }
        }
    }

    pub async fn my_reviews(&self) -> Result<Vec<Review>, CoreError> {
        let key = QueryKey::MyReviews;
        if !self.cache.borrow().needs_refresh(&key) {
            if let Some(reviews) = self.cache.borrow().my_reviews() {
                return Ok(reviews);
            }
        }
        self.cache.borrow_mut().mark_fetching(&key);
        match self.api.fetch_my_reviews().await {
            Ok(reviews) => {
                self.cache.borrow_mut().store_my_reviews(reviews.clone());
                Ok(reviews)
            }
            Err(error) => {
                self.cache.borrow_mut().mark_error(&key);
                Err(error.into())
            }
        }
    }

    pub async fn rating_stats(&self, product_id: u64) -> Result<RatingStats, CoreError> {
        let key = QueryKey::RatingStats { product_id };
        if !self.cache.borrow().needs_refresh(&key) {
            if let Some(stats) = self.cache.borrow().rating_stats(product_id) {
                return Ok(stats);
            }
        }
        self.cache.borrow_mut().mark_fetching(&key);
        match self.api.fetch_rating_stats(product_id).await {
            Ok(stats) => {
                self.cache.borrow_mut().write(
                    key,
                    ResourceValue::RatingStats(stats),
                    QueryStatus::Success,
                );
                Ok(stats)
            }
            Err(error) => {
                self.cache.borrow_mut().mark_error(&key);
                Err(error.into())
            }
        }
    }

    pub async fn product_detail(&self, product_id: u64) -> Result<ProductDetail, CoreError> {
        let key = QueryKey::ProductDetail { product_id };
        if !self.cache.borrow().needs_refresh(&key) {
            if let Some(detail) = self.cache.borrow().product_detail(product_id) {
                return Ok(detail.clone());
            }
        }
        self.cache.borrow_mut().mark_fetching(&key);
        match self.api.fetch_product(product_id).await {
            Ok(detail) => {
                self.cache.borrow_mut().write(
                    key,
                    ResourceValue::ProductDetail(detail.clone()),
                    QueryStatus::Success,
                );
                Ok(detail)
            }
            Err(error) => {
                self.cache.borrow_mut().mark_error(&key);
                Err(error.into())
            }
        }
    }

    /// Refetch every subscribed query whose entry has gone stale (after a
    /// mutation settled, or past its freshness horizon). Off-screen entries
    /// are left for their next read. Failures keep the last-good value and
    /// are logged, not raised; one failed query must not take down the rest.
    pub async fn revalidate_subscribed(&self) {
        let keys = self.cache.borrow().subscribed_stale_keys();
        for key in keys {
            let result = match key.clone() {
                QueryKey::Cart => self.refresh_cart().await.map(|_| ()),
                QueryKey::Wishlist => self.wishlist().await.map(|_| ()),
                QueryKey::WishlistCheck { product_id } => {
                    self.wishlist_check(product_id).await.map(|_| ())
                }
                QueryKey::Reviews { product_id, page } => {
                    self.reviews(product_id, page).await.map(|_| ())
                }
                QueryKey::ReviewDetail { review_id } => self.review(review_id).await.map(|_| ()),
                QueryKey::MyReviews => self.my_reviews().await.map(|_| ()),
                QueryKey::RatingStats { product_id } => {
                    self.rating_stats(product_id).await.map(|_| ())
                }
                QueryKey::ProductDetail { product_id } => {
                    self.product_detail(product_id).await.map(|_| ())
                }
            };
            if let Err(error) = result {
                tracing::warn!(?key, error = %error, "background revalidation failed");
            }
        }
    }

    // ===== Mutations =====

    pub async fn add_to_cart(&self, request: AddToCart) -> Result<Cart, CoreError> {
        self.coordinator.add_to_cart(request).await
    }

    pub async fn update_quantity(&self, line: LineRef, quantity: i64) -> Result<Cart, CoreError> {
        self.coordinator.update_quantity(line, quantity).await
    }

    pub async fn remove_item(&self, line: LineRef) -> Result<Cart, CoreError> {
        self.coordinator.remove_item(line).await
    }

    pub async fn toggle_wishlist(&self, product_id: u64) -> Result<bool, CoreError> {
        self.coordinator.toggle_wishlist(product_id).await
    }

    pub async fn create_review(&self, request: CreateReviewRequest) -> Result<Review, CoreError> {
        self.coordinator.create_review(request).await
    }

    pub async fn update_review(
        &self,
        review_id: u64,
        request: UpdateReviewRequest,
    ) -> Result<Review, CoreError> {
        self.coordinator.update_review(review_id, request).await
    }

    pub async fn delete_review(&self, review_id: u64) -> Result<(), CoreError> {
        self.coordinator.delete_review(review_id).await
    }

    pub async fn toggle_helpful(&self, review_id: u64) -> Result<Review, CoreError> {
        self.coordinator.toggle_helpful(review_id).await
    }

    // ===== Derived state =====

    /// Recompute the full price pipeline from the cached cart. `None` until a
    /// cart value exists. Never stored; call again after any cart change.
    pub fn price_breakdown(&self) -> Option<PriceBreakdown> {
        let cache = self.cache.borrow();
        cache
            .cart()
            .map(|cart| pricing::price_breakdown(cart, &self.config.pricing))
    }
}
