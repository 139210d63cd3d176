pub mod invalidation;
pub mod resource_cache;
pub mod session_cache;

pub use invalidation::MutationKind;
pub use resource_cache::{
    CacheEntry, MutationSnapshot, MutationToken, QueryKey, QueryStatus, ResourceCache,
    ResourceValue, ReviewPageRef,
};
pub use session_cache::{load_session, save_session, SessionState};
