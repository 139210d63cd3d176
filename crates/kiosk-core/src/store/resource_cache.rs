//! Keyed in-memory cache of server-owned resources.
//!
//! Single source of truth for every UI subscriber. Entries are mutated only
//! through the write API here; no other component keeps a long-lived
//! reference to raw query data. All access happens on the UI's cooperative
//! event loop, so writes never race at the instruction level, but a network
//! response can still arrive after a later optimistic write to the same key,
//! which is what the per-key mutation tokens guard against.
//!
//! Reviews are entity-normalized: a `Review` is held once in `reviews_by_id`,
//! and both the paginated list entries and the detail entry store ids that
//! are resolved into projections on read. A helpful-vote therefore updates
//! exactly one record.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;

use crate::constants::{
    CART_STALE_AFTER_SECS, PRODUCT_STALE_AFTER_SECS, REVIEWS_STALE_AFTER_SECS,
    WISHLIST_STALE_AFTER_SECS,
};
use crate::events::CoreEvent;
use crate::models::{Cart, ProductDetail, RatingStats, Review, ReviewPage, WishlistCheck, WishlistItem};

/// Identity of a cached query: resource type plus parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Cart,
    Wishlist,
    WishlistCheck { product_id: u64 },
    Reviews { product_id: u64, page: u32 },
    ReviewDetail { review_id: u64 },
    RatingStats { product_id: u64 },
    MyReviews,
    ProductDetail { product_id: u64 },
}

impl QueryKey {
    /// Freshness horizon: a read within this window of the last write serves
    /// the cached value without a network call.
    pub fn stale_after(&self) -> Duration {
        let secs = match self {
            QueryKey::Cart => CART_STALE_AFTER_SECS,
            QueryKey::Wishlist | QueryKey::WishlistCheck { .. } => WISHLIST_STALE_AFTER_SECS,
            QueryKey::Reviews { .. }
            | QueryKey::ReviewDetail { .. }
            | QueryKey::RatingStats { .. }
            | QueryKey::MyReviews => REVIEWS_STALE_AFTER_SECS,
            QueryKey::ProductDetail { .. } => PRODUCT_STALE_AFTER_SECS,
        };
        Duration::from_secs(secs)
    }
}

/// Ids of one page of reviews; the records live in the entity map.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPageRef {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub review_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceValue {
    Cart(Cart),
    Wishlist(Vec<WishlistItem>),
    WishlistCheck(WishlistCheck),
    ReviewPage(ReviewPageRef),
    /// Detail entries reference the entity map rather than holding a copy.
    ReviewRef(u64),
    /// My-reviews, as ids into the entity map.
    ReviewIds(Vec<u64>),
    RatingStats(RatingStats),
    ProductDetail(ProductDetail),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Fetching,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Option<ResourceValue>,
    pub status: QueryStatus,
    pub updated_at: Instant,
    /// Set by invalidation; cleared by the next write.
    pub stale: bool,
}

impl CacheEntry {
    /// Placeholder for a query that has never been fetched.
    pub fn idle() -> Self {
        Self {
            value: None,
            status: QueryStatus::Idle,
            updated_at: Instant::now(),
            stale: false,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// Per-key monotonically increasing mutation token. Only the latest issued
/// token for a key may settle (commit or roll back) that key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationToken(u64);

/// Capture of the cache state a mutation may need to restore. Held only for
/// the duration of one in-flight mutation; never persisted.
///
/// `None` records an entry/entity that was absent at snapshot time, so
/// restore removes anything the speculation created.
#[derive(Debug, Clone)]
pub struct MutationSnapshot {
    entries: Vec<(QueryKey, Option<CacheEntry>)>,
    reviews: Vec<(u64, Option<Review>)>,
}

pub struct ResourceCache {
    entries: HashMap<QueryKey, CacheEntry>,
    reviews_by_id: HashMap<u64, Review>,
    issued_tokens: HashMap<QueryKey, u64>,
    subscribers: HashMap<QueryKey, usize>,
    event_tx: Option<UnboundedSender<CoreEvent>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            reviews_by_id: HashMap::new(),
            issued_tokens: HashMap::new(),
            subscribers: HashMap::new(),
            event_tx: None,
        }
    }

    /// A cache that pushes [`CoreEvent::CacheUpdated`] to `event_tx` on every
    /// settled write.
    pub fn with_events(event_tx: UnboundedSender<CoreEvent>) -> Self {
        Self {
            event_tx: Some(event_tx),
            ..Self::new()
        }
    }

    fn notify(&self, key: &QueryKey) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(CoreEvent::CacheUpdated(key.clone()));
        }
    }

    // ===== Read API =====

    /// Current entry for a key, or an idle placeholder if never fetched.
    pub fn read(&self, key: &QueryKey) -> CacheEntry {
        self.entries.get(key).cloned().unwrap_or_else(CacheEntry::idle)
    }

    pub fn value(&self, key: &QueryKey) -> Option<&ResourceValue> {
        self.entries.get(key).and_then(|entry| entry.value.as_ref())
    }

    /// Whether a read of this key should trigger a (re)fetch. The cached
    /// value, if any, is still served while the fetch runs.
    pub fn needs_refresh(&self, key: &QueryKey) -> bool {
        match self.entries.get(key) {
            None => true,
            Some(entry) => match entry.status {
                QueryStatus::Fetching => false,
                _ => {
                    entry.stale
                        || entry.value.is_none()
                        || entry.updated_at.elapsed() >= key.stale_after()
                }
            },
        }
    }

    // ===== Write API =====

    pub fn write(&mut self, key: QueryKey, value: ResourceValue, status: QueryStatus) {
        self.entries.insert(
            key.clone(),
            CacheEntry {
                value: Some(value),
                status,
                updated_at: Instant::now(),
                stale: false,
            },
        );
        self.notify(&key);
    }

    /// An optimistic write: the value is a local guess, shown with no loading
    /// state until the server settles it.
    pub fn write_speculative(&mut self, key: QueryKey, value: ResourceValue) {
        tracing::debug!(?key, "speculative write");
        self.write(key, value, QueryStatus::Success);
    }

    /// Begin a fetch, keeping the last-good value visible.
    pub fn mark_fetching(&mut self, key: &QueryKey) {
        let entry = self.entries.entry(key.clone()).or_insert_with(CacheEntry::idle);
        entry.status = QueryStatus::Fetching;
        self.notify(key);
    }

    /// Record a failed fetch, keeping the last-good value visible.
    pub fn mark_error(&mut self, key: &QueryKey) {
        let entry = self.entries.entry(key.clone()).or_insert_with(CacheEntry::idle);
        entry.status = QueryStatus::Error;
        self.notify(key);
    }

    // ===== Invalidation =====

    /// Mark an entry stale. The next read of a subscribed key refetches;
    /// unsubscribed entries wait until they are displayed again.
    pub fn invalidate(&mut self, key: &QueryKey) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.stale = true;
        }
    }

    pub fn invalidate_where(&mut self, predicate: impl Fn(&QueryKey) -> bool) {
        for (key, entry) in self.entries.iter_mut() {
            if predicate(key) {
                entry.stale = true;
            }
        }
    }

    // ===== Subscriptions =====

    pub fn subscribe(&mut self, key: QueryKey) {
        *self.subscribers.entry(key).or_insert(0) += 1;
    }

    pub fn unsubscribe(&mut self, key: &QueryKey) {
        if let Some(count) = self.subscribers.get_mut(key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.subscribers.remove(key);
            }
        }
    }

    pub fn is_subscribed(&self, key: &QueryKey) -> bool {
        self.subscribers.get(key).copied().unwrap_or(0) > 0
    }

    /// Keys that are on display right now and due a refetch. Unsubscribed
    /// stale entries are excluded; they revalidate on their next read.
    pub fn subscribed_stale_keys(&self) -> Vec<QueryKey> {
        self.subscribers
            .keys()
            .filter(|key| self.needs_refresh(key))
            .cloned()
            .collect()
    }

    // ===== Mutation tokens =====

    /// Issue the next token for a key. Called at snapshot time by the
    /// mutation coordinator.
    pub fn begin_mutation(&mut self, key: &QueryKey) -> MutationToken {
        let counter = self.issued_tokens.entry(key.clone()).or_insert(0);
        *counter += 1;
        MutationToken(*counter)
    }

    /// Whether `token` is still the latest issued for `key`. A superseded
    /// settle must not write the key.
    pub fn is_latest(&self, key: &QueryKey, token: MutationToken) -> bool {
        self.issued_tokens.get(key).copied().unwrap_or(0) == token.0
    }

    // ===== Snapshot / restore =====

    pub fn snapshot(&self, keys: &[QueryKey], review_ids: &[u64]) -> MutationSnapshot {
        MutationSnapshot {
            entries: keys
                .iter()
                .map(|key| (key.clone(), self.entries.get(key).cloned()))
                .collect(),
            reviews: review_ids
                .iter()
                .map(|id| (*id, self.reviews_by_id.get(id).cloned()))
                .collect(),
        }
    }

    /// Restore a snapshot wholesale. Entries and entities absent at snapshot
    /// time are removed again; there is no partial restore.
    pub fn restore(&mut self, snapshot: MutationSnapshot) {
        for (key, entry) in snapshot.entries {
            match entry {
                Some(entry) => {
                    self.entries.insert(key.clone(), entry);
                }
                None => {
                    self.entries.remove(&key);
                }
            }
            self.notify(&key);
        }
        for (review_id, review) in snapshot.reviews {
            match review {
                Some(review) => {
                    self.reviews_by_id.insert(review_id, review);
                }
                None => {
                    self.reviews_by_id.remove(&review_id);
                }
            }
            self.notify(&QueryKey::ReviewDetail { review_id });
        }
    }

    // ===== Typed projections =====

    pub fn cart(&self) -> Option<&Cart> {
        match self.value(&QueryKey::Cart) {
            Some(ResourceValue::Cart(cart)) => Some(cart),
            _ => None,
        }
    }

    pub fn wishlist(&self) -> Option<&[WishlistItem]> {
        match self.value(&QueryKey::Wishlist) {
            Some(ResourceValue::Wishlist(items)) => Some(items),
            _ => None,
        }
    }

    pub fn wishlist_check(&self, product_id: u64) -> Option<WishlistCheck> {
        match self.value(&QueryKey::WishlistCheck { product_id }) {
            Some(ResourceValue::WishlistCheck(check)) => Some(*check),
            _ => None,
        }
    }

    pub fn rating_stats(&self, product_id: u64) -> Option<RatingStats> {
        match self.value(&QueryKey::RatingStats { product_id }) {
            Some(ResourceValue::RatingStats(stats)) => Some(*stats),
            _ => None,
        }
    }

    pub fn product_detail(&self, product_id: u64) -> Option<&ProductDetail> {
        match self.value(&QueryKey::ProductDetail { product_id }) {
            Some(ResourceValue::ProductDetail(detail)) => Some(detail),
            _ => None,
        }
    }

    pub fn review(&self, review_id: u64) -> Option<&Review> {
        self.reviews_by_id.get(&review_id)
    }

    /// Assemble a page projection from the entity map. Ids whose entity has
    /// been evicted are skipped; the page is stale at that point anyway.
    pub fn review_page(&self, product_id: u64, page: u32) -> Option<ReviewPage> {
        match self.value(&QueryKey::Reviews { product_id, page }) {
            Some(ResourceValue::ReviewPage(page_ref)) => Some(ReviewPage {
                count: page_ref.count,
                next: page_ref.next.clone(),
                previous: page_ref.previous.clone(),
                results: page_ref
                    .review_ids
                    .iter()
                    .filter_map(|id| self.reviews_by_id.get(id).cloned())
                    .collect(),
            }),
            _ => None,
        }
    }

    pub fn my_reviews(&self) -> Option<Vec<Review>> {
        match self.value(&QueryKey::MyReviews) {
            Some(ResourceValue::ReviewIds(ids)) => Some(
                ids.iter()
                    .filter_map(|id| self.reviews_by_id.get(id).cloned())
                    .collect(),
            ),
            _ => None,
        }
    }

    // ===== Review entity writes =====

    /// Upsert one review record. Both the detail projection and any cached
    /// page containing it observe the change; subscribers of each are
    /// notified.
    pub fn upsert_review(&mut self, review: Review) {
        let review_id = review.id;
        self.reviews_by_id.insert(review_id, review);

        let affected: Vec<QueryKey> = self
            .entries
            .iter()
            .filter(|(key, entry)| match (key, &entry.value) {
                (QueryKey::Reviews { .. }, Some(ResourceValue::ReviewPage(page_ref))) => {
                    page_ref.review_ids.contains(&review_id)
                }
                (QueryKey::MyReviews, Some(ResourceValue::ReviewIds(ids))) => {
                    ids.contains(&review_id)
                }
                _ => false,
            })
            .map(|(key, _)| key.clone())
            .collect();

        self.notify(&QueryKey::ReviewDetail { review_id });
        for key in affected {
            self.notify(&key);
        }
    }

    /// Drop a review record (after a confirmed delete). Page refs keep the
    /// dead id until their refetch; projections skip it meanwhile.
    pub fn remove_review(&mut self, review_id: u64) {
        self.reviews_by_id.remove(&review_id);
        self.entries.remove(&QueryKey::ReviewDetail { review_id });
        self.notify(&QueryKey::ReviewDetail { review_id });
    }

    /// Store a fetched page: entities into the map, ids into the entry.
    pub fn store_review_page(&mut self, product_id: u64, page: u32, data: ReviewPage) {
        let page_ref = ReviewPageRef {
            count: data.count,
            next: data.next,
            previous: data.previous,
            review_ids: data.results.iter().map(|review| review.id).collect(),
        };
        for review in data.results {
            self.reviews_by_id.insert(review.id, review);
        }
        self.write(
            QueryKey::Reviews { product_id, page },
            ResourceValue::ReviewPage(page_ref),
            QueryStatus::Success,
        );
    }

    /// Store a fetched review detail: entity into the map, ref into the entry.
    pub fn store_review_detail(&mut self, review: Review) {
        let review_id = review.id;
        self.reviews_by_id.insert(review_id, review);
        self.write(
            QueryKey::ReviewDetail { review_id },
            ResourceValue::ReviewRef(review_id),
            QueryStatus::Success,
        );
    }

    pub fn store_my_reviews(&mut self, reviews: Vec<Review>) {
        let ids: Vec<u64> = reviews.iter().map(|review| review.id).collect();
        for review in reviews {
            self.reviews_by_id.insert(review.id, review);
        }
        self.write(
            QueryKey::MyReviews,
            ResourceValue::ReviewIds(ids),
            QueryStatus::Success,
        );
    }

    /// Append a newly created review to the cached my-reviews projection.
    pub fn push_my_review(&mut self, review: Review) {
        let review_id = review.id;
        self.reviews_by_id.insert(review_id, review);
        if let Some(entry) = self.entries.get_mut(&QueryKey::MyReviews) {
            if let Some(ResourceValue::ReviewIds(ids)) = &mut entry.value {
                if !ids.contains(&review_id) {
                    ids.push(review_id);
                }
            }
        }
        self.notify(&QueryKey::MyReviews);
    }

    #[cfg(test)]
    pub(crate) fn age_entry(&mut self, key: &QueryKey, by: Duration) {
        if let Some(entry) = self.entries.get_mut(key) {
            if let Some(rewound) = entry.updated_at.checked_sub(by) {
                entry.updated_at = rewound;
            }
        }
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}
