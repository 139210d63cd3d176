use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product detail as the storefront renders it.
///
/// Carries its own copy of the rating aggregate; the invalidation policy
/// keeps it in step with the standalone rating-stats query after review
/// mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: u64,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub retail_price: Option<Decimal>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub review_count: u32,
}
