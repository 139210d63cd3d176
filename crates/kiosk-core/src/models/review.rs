use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    pub product_id: u64,
    pub author: String,
    /// 1..=5 stars.
    pub rating: u8,
    #[serde(default)]
    pub title: Option<String>,
    pub body: String,
    #[serde(default)]
    pub helpful_count: u32,
    /// Whether the current session's user has marked this review helpful.
    #[serde(default)]
    pub voted_helpful: bool,
    pub created_at: DateTime<Utc>,
}

/// One page of a product's reviews, normalized from either wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPage {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Review>,
}

/// The review list endpoint answers either a bare array or a
/// `{count, next, previous, results}` page envelope depending on deployment;
/// both normalize into [`ReviewPage`].
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ReviewListResponse {
    Paged {
        count: u64,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<Review>,
    },
    Bare(Vec<Review>),
}

impl From<ReviewListResponse> for ReviewPage {
    fn from(response: ReviewListResponse) -> Self {
        match response {
            ReviewListResponse::Paged {
                count,
                next,
                previous,
                results,
            } => ReviewPage {
                count,
                next,
                previous,
                results,
            },
            ReviewListResponse::Bare(results) => ReviewPage {
                count: results.len() as u64,
                next: None,
                previous: None,
                results,
            },
        }
    }
}

/// Rating aggregate for one product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingStats {
    #[serde(default)]
    pub average: f64,
    #[serde(default)]
    pub count: u32,
}
