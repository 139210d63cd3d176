//! Application-wide constants
//!
//! Centralized location for pricing defaults, freshness horizons and retry
//! policy used across multiple modules.

use rust_decimal::Decimal;

/// Default storefront API base URL.
pub const DEFAULT_API_BASE: &str = "https://shop.kiosk.app/api";

// Pricing defaults. The server owns the real rules; these drive the
// client-side breakdown shown between server responses.

/// Flat VAT rate applied to the discounted subtotal (20%).
pub const VAT_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// Undiscounted-subtotal level at or above which shipping is waived (£75).
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(75, 0, 0, false, 0);

/// Flat shipping fee charged below the free-shipping threshold (£4.99).
pub const SHIPPING_FEE: Decimal = Decimal::from_parts(499, 0, 0, false, 2);

// Freshness horizons, in seconds. A read within the horizon serves the cached
// value without a network call; past it, the stale value is served while a
// refetch runs.

/// The cart changes often and drives checkout; keep it on a short leash.
pub const CART_STALE_AFTER_SECS: u64 = 30;

/// Wishlist and membership checks.
pub const WISHLIST_STALE_AFTER_SECS: u64 = 60;

/// Review pages, review detail, rating aggregates and my-reviews.
pub const REVIEWS_STALE_AFTER_SECS: u64 = 5 * 60;

/// Product detail (includes the embedded rating aggregate).
pub const PRODUCT_STALE_AFTER_SECS: u64 = 5 * 60;

// Mutation retry policy for transient failures (no response, 5xx, 408, 429).

/// Total attempts per mutation, including the first.
pub const MAX_MUTATION_ATTEMPTS: u32 = 3;

/// Backoff before the first retry; doubles per attempt.
pub const RETRY_BASE_DELAY_MS: u64 = 250;
