//! The optimistic mutation protocol.
//!
//! Every state-changing operation runs the same lifecycle:
//!
//! ```text
//! snapshot -> speculate -> dispatch -> commit
//!                                   \-> rollback
//! ```
//!
//! The snapshot is captured at the `Speculating` transition and consumed only
//! at `RolledBack`; commit always overwrites the speculative value with the
//! server payload so the cache ends in exactly the server's state. Transient
//! failures retry with the speculative value left visible; client-class
//! failures roll back immediately and surface to the caller.
//!
//! Same-key mutations are guarded by a per-key token issued at snapshot
//! time: a settle whose token has been superseded skips its cache write and
//! marks the key stale instead, so response reordering cannot leave an
//! earlier request's result on display.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::api::StorefrontApi;
use crate::constants::{MAX_MUTATION_ATTEMPTS, RETRY_BASE_DELAY_MS};
use crate::error::ApiError;
use crate::events::CoreEvent;
use crate::stats::SharedMutationStats;
use crate::store::{MutationKind, MutationSnapshot, MutationToken, QueryKey, ResourceCache};

/// Lifecycle phase of one in-flight mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Speculating,
    InFlight,
    Committed,
    RolledBack,
}

/// Guard for one mutation: the pre-speculation snapshot, the per-key token
/// and the current phase. Created by [`MutationCoordinator::begin`], consumed
/// by `commit` or `rollback`.
#[derive(Debug)]
pub struct InFlight {
    kind: MutationKind,
    primary_key: QueryKey,
    token: MutationToken,
    snapshot: MutationSnapshot,
    phase: MutationPhase,
}

impl InFlight {
    pub fn phase(&self) -> MutationPhase {
        self.phase
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }
}

/// Wraps every state-changing operation with snapshot-before,
/// speculative-apply, server-call and commit-or-rollback. Domain operations
/// live in the sibling modules (`cart`, `wishlist`, `reviews`).
pub struct MutationCoordinator<A> {
    pub(crate) api: Rc<A>,
    pub(crate) cache: Rc<RefCell<ResourceCache>>,
    pub(crate) stats: SharedMutationStats,
    pub(crate) event_tx: UnboundedSender<CoreEvent>,
}

impl<A: StorefrontApi> MutationCoordinator<A> {
    pub fn new(
        api: Rc<A>,
        cache: Rc<RefCell<ResourceCache>>,
        stats: SharedMutationStats,
        event_tx: UnboundedSender<CoreEvent>,
    ) -> Self {
        Self {
            api,
            cache,
            stats,
            event_tx,
        }
    }

    /// Issue the key's next token and capture the snapshot. The caller does
    /// its speculative writes immediately after, before any await.
    pub(crate) fn begin(
        &self,
        kind: MutationKind,
        keys: &[QueryKey],
        review_ids: &[u64],
    ) -> InFlight {
        let mut cache = self.cache.borrow_mut();
        let primary_key = keys[0].clone();
        let token = cache.begin_mutation(&primary_key);
        let snapshot = cache.snapshot(keys, review_ids);
        tracing::debug!(kind = kind.label(), ?keys, "mutation speculating");
        InFlight {
            kind,
            primary_key,
            token,
            snapshot,
            phase: MutationPhase::Speculating,
        }
    }

    /// Issue the server call, retrying transient failures with exponential
    /// backoff. The speculative value stays visible between attempts.
    pub(crate) async fn dispatch<T, F, Fut>(
        &self,
        flight: &mut InFlight,
        call: F,
    ) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        debug_assert_eq!(flight.phase, MutationPhase::Speculating);
        flight.phase = MutationPhase::InFlight;
        self.stats.record_dispatched(flight.kind.label());
        self.retry_loop(flight.kind.label(), call).await
    }

    /// Settle successfully: `apply` writes the server payload, then the
    /// invalidation policy fans out. A superseded token skips the write and
    /// marks the key stale so the next read converges on server truth.
    pub(crate) fn commit(&self, mut flight: InFlight, apply: impl FnOnce(&mut ResourceCache)) {
        debug_assert_eq!(flight.phase, MutationPhase::InFlight);
        {
            let mut cache = self.cache.borrow_mut();
            if cache.is_latest(&flight.primary_key, flight.token) {
                apply(&mut cache);
            } else {
                tracing::debug!(
                    kind = flight.kind.label(),
                    "commit superseded by a later mutation"
                );
                cache.invalidate(&flight.primary_key);
            }
            cache.invalidate_where(|key| flight.kind.invalidates(key));
        }
        flight.phase = MutationPhase::Committed;
        self.stats.record_committed(flight.kind.label());
        tracing::info!(kind = flight.kind.label(), "mutation committed");
    }

    /// Settle in failure: restore the snapshot wholesale and surface the
    /// error on the event channel. No partial rollback. A superseded token
    /// leaves the later mutation's state alone and marks the key stale.
    pub(crate) fn rollback(&self, mut flight: InFlight, error: &ApiError) {
        debug_assert_eq!(flight.phase, MutationPhase::InFlight);
        {
            let mut cache = self.cache.borrow_mut();
            if cache.is_latest(&flight.primary_key, flight.token) {
                cache.restore(flight.snapshot);
            } else {
                tracing::debug!(
                    kind = flight.kind.label(),
                    "rollback superseded by a later mutation"
                );
                cache.invalidate(&flight.primary_key);
            }
            cache.invalidate_where(|key| flight.kind.invalidates(key));
        }
        flight.phase = MutationPhase::RolledBack;
        self.fail(flight.kind, error);
        tracing::warn!(kind = flight.kind.label(), error = %error, "mutation rolled back");
    }

    /// Mutations outside the optimistic protocol (review CRUD) share the
    /// retry loop and settle-time invalidation but write nothing until the
    /// server answers.
    pub(crate) async fn run_plain<T, F, Fut>(
        &self,
        kind: MutationKind,
        call: F,
        apply: impl FnOnce(&mut ResourceCache, &T),
    ) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.stats.record_dispatched(kind.label());
        match self.retry_loop(kind.label(), call).await {
            Ok(value) => {
                {
                    let mut cache = self.cache.borrow_mut();
                    apply(&mut cache, &value);
                    cache.invalidate_where(|key| kind.invalidates(key));
                }
                self.stats.record_committed(kind.label());
                tracing::info!(kind = kind.label(), "mutation committed");
                Ok(value)
            }
            Err(error) => {
                self.cache
                    .borrow_mut()
                    .invalidate_where(|key| kind.invalidates(key));
                self.fail(kind, &error);
                Err(error)
            }
        }
    }

    fn fail(&self, kind: MutationKind, error: &ApiError) {
        self.stats.record_failed(kind.label());
        let _ = self.event_tx.send(CoreEvent::MutationFailed {
            kind,
            message: error.to_string(),
        });
    }

    async fn retry_loop<T, F, Fut>(&self, label: &'static str, call: F) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 1u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < MAX_MUTATION_ATTEMPTS => {
                    tracing::warn!(
                        kind = label,
                        attempt,
                        error = %error,
                        "transient failure, retrying"
                    );
                    self.stats.record_retry(label);
                    tokio::time::sleep(Duration::from_millis(RETRY_BASE_DELAY_MS << (attempt - 1)))
                        .await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
