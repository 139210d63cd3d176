use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: u64,
    pub product_id: u64,
    pub added_at: DateTime<Utc>,
}

/// Response of the membership-check endpoint.
///
/// `item_id` is the wishlist row to delete when removing; it is only present
/// when `in_wishlist` is true.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WishlistCheck {
    pub in_wishlist: bool,
    #[serde(default)]
    pub item_id: Option<u64>,
}
