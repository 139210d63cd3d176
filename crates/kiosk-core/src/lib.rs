pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod models;
pub mod mutations;
pub mod pricing;
pub mod runtime;
pub mod stats;
pub mod store;

// Re-export the session-facing types at the crate root for convenience
pub use config::CoreConfig;
pub use error::{ApiError, CoreError};
pub use events::CoreEvent;
pub use pricing::{price_breakdown, PriceBreakdown, PricingConfig};
pub use runtime::CoreRuntime;
