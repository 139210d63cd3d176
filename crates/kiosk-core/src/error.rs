use uuid::Uuid;

/// Transport-level failure taxonomy for storefront API calls.
///
/// The core only distinguishes retryable network-class failures from
/// client-class rejections; everything finer-grained stays server-owned.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 5xx, 408 and 429: the request may succeed if repeated.
    #[error("server error ({status})")]
    Server { status: u16 },

    /// Any other 4xx: repeating the request will not help.
    #[error("request rejected ({status}): {message}")]
    Client { status: u16, message: String },
}

impl ApiError {
    /// Classify a non-2xx HTTP status.
    pub fn from_status(status: u16, message: String) -> Self {
        // 408 and 429 are transient despite being 4xx codes.
        if status >= 500 || status == 408 || status == 429 {
            ApiError::Server { status }
        } else {
            ApiError::Client { status, message }
        }
    }

    /// Transient failures are retried with the optimistic value left visible;
    /// client-class failures roll back immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Server { .. })
    }
}

/// Errors surfaced to the invoking UI action.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("item not found in cart")]
    UnknownItem,

    /// The line still carries its client-assigned id; the server has no row
    /// to address until the add settles.
    #[error("cart item {0} has not been confirmed by the server yet")]
    UnsyncedItem(Uuid),

    #[error("review {0} is not cached")]
    UnknownReview(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(ApiError::from_status(500, String::new()).is_retryable());
        assert!(ApiError::from_status(503, String::new()).is_retryable());
        assert!(ApiError::from_status(408, String::new()).is_retryable());
        assert!(ApiError::from_status(429, String::new()).is_retryable());

        assert!(!ApiError::from_status(400, String::new()).is_retryable());
        assert!(!ApiError::from_status(404, String::new()).is_retryable());
        assert!(!ApiError::from_status(401, String::new()).is_retryable());
        assert!(!ApiError::from_status(422, String::new()).is_retryable());
    }

    #[test]
    fn test_client_error_keeps_message() {
        let err = ApiError::from_status(422, "quantity exceeds stock".to_string());
        assert_eq!(
            err.to_string(),
            "request rejected (422): quantity exceeds stock"
        );
    }
}
