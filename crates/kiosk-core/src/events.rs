use crate::store::{MutationKind, QueryKey};

/// Change notifications pushed to the frontend's event channel.
///
/// Subscribers re-read the cache (and re-derive the price breakdown) on
/// receipt; events carry identity, not payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// A cache entry changed: optimistic write, commit, rollback or refetch.
    CacheUpdated(QueryKey),
    /// A mutation settled in failure and its optimistic write was undone.
    MutationFailed {
        kind: MutationKind,
        message: String,
    },
}
