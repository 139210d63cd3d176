//! Disk-backed snapshot of settled session state.
//!
//! Persists the last settled cart and wishlist to a binary file in the data
//! directory so a restarted frontend renders immediately while its first
//! revalidation is in flight. The snapshot is seeded into the resource cache
//! as stale on load.
//!
//! # Cache invalidation
//! The file is silently discarded when:
//! - `SESSION_SCHEMA_VERSION` is incremented (a code change altered the
//!   stored types)
//! - the file is missing or corrupt
//! - the snapshot is older than `MAX_SESSION_AGE_SECS`
//!
//! Speculative state is never written: callers strip unconfirmed cart lines
//! before saving.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::models::{Cart, WishlistItem};

/// Increment whenever the schema of `SessionState` or any of its
/// transitively-referenced types changes in a way that would make old
/// snapshots unreadable.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// Maximum snapshot age in seconds (24 hours). Older snapshots are discarded;
/// a day-old cart is better refetched than rendered.
const MAX_SESSION_AGE_SECS: u64 = 24 * 60 * 60;

/// Versioned binary envelope wrapping the actual payload.
#[derive(Serialize, Deserialize)]
struct SessionEnvelope {
    schema_version: u32,
    /// Unix seconds when this snapshot was written.
    saved_at: u64,
    state: SessionState,
}

/// The settled session data worth carrying across restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub cart: Option<Cart>,
    pub wishlist: Option<Vec<WishlistItem>>,
}

/// Returns the path to the snapshot file inside `data_dir`.
pub fn session_path(data_dir: &Path) -> PathBuf {
    data_dir.join("session_cache.bin")
}

/// Serialize `state` and write it atomically to
/// `<data_dir>/session_cache.bin`.
///
/// Uses a write-to-temp-then-rename pattern so an unexpected shutdown
/// mid-write cannot leave a corrupt file behind.
pub fn save_session(data_dir: &Path, state: SessionState) -> Result<(), Box<dyn std::error::Error>> {
    let saved_at = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    let envelope = SessionEnvelope {
        schema_version: SESSION_SCHEMA_VERSION,
        saved_at,
        state,
    };

    let bytes = bincode::serialize(&envelope)?;

    let session_file = session_path(data_dir);
    let temp_file = session_file.with_extension("bin.tmp");

    std::fs::write(&temp_file, &bytes)?;
    std::fs::rename(&temp_file, &session_file)?;

    Ok(())
}

/// Attempt to load the snapshot from `<data_dir>/session_cache.bin`.
///
/// Returns `None` on any failure: file missing, corrupted data, schema
/// version mismatch, or snapshot too old.
pub fn load_session(data_dir: &Path) -> Option<SessionState> {
    let bytes = std::fs::read(session_path(data_dir)).ok()?;

    let envelope: SessionEnvelope = bincode::deserialize(&bytes).ok()?;

    if envelope.schema_version != SESSION_SCHEMA_VERSION {
        tracing::info!(
            "session_cache: schema version mismatch (cached={} current={}) — discarding",
            envelope.schema_version,
            SESSION_SCHEMA_VERSION
        );
        return None;
    }

    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();

    if now.saturating_sub(envelope.saved_at) > MAX_SESSION_AGE_SECS {
        tracing::info!(
            "session_cache: snapshot too old (age={}s max={}s) — discarding",
            now.saturating_sub(envelope.saved_at),
            MAX_SESSION_AGE_SECS
        );
        return None;
    }

    Some(envelope.state)
}

/// Delete the snapshot file (e.g. on logout). Ignores errors.
pub fn invalidate_session(data_dir: &Path) {
    let _ = std::fs::remove_file(session_path(data_dir));
}
