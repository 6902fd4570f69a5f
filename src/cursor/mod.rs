//! Resumable search positions.
//!
//! Two tiers share one key space (`criteria_hex ∥ window_hex`):
//! - the live tier parks open decoders in process, so the next window resumes
//!   without reopening the dump;
//! - the persisted tier ([`CursorStore`]) records how many matches precede a
//!   window, so another process can rebuild the position by replaying.

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tracing::debug;

use crate::constants::cursor::RAW_OFFSET_KEY_SUFFIX;
use crate::hash::hex_key;
use crate::source::DumpDecoder;
use crate::types::CacheKey;

/// Persisted cursor stores.
pub mod store;

pub use store::{CursorStore, FileCursorStore, InMemoryCursorStore};

/// Cache key for the window identified by `window_hash` under `criteria_hash`.
pub fn cursor_key(criteria_hash: u64, window_hash: u64) -> CacheKey {
    let mut key = hex_key(criteria_hash);
    key.push_str(&hex_key(window_hash));
    key
}

/// Persisted key holding the raw-record offset that accompanies `key`.
pub fn raw_offset_key(key: &str) -> CacheKey {
    format!("{key}{RAW_OFFSET_KEY_SUFFIX}")
}

/// Open decoder positioned just after the last record a search examined.
pub struct LiveCursor {
    /// Decoder owning the dump stream.
    pub decoder: DumpDecoder,
    /// Filtered matches consumed before the decoder's position.
    pub matched: u64,
}

impl LiveCursor {
    /// Raw records consumed by the decoder so far.
    pub fn records_read(&self) -> u64 {
        self.decoder.records_read()
    }
}

struct ParkedCursor {
    cursor: LiveCursor,
    parked_at: Instant,
}

/// In-process tier: a bounded, insertion-ordered arena of live decoders.
///
/// Entries are moved out on [`take`](Self::take), so a position can only be
/// resumed once. Replacing or evicting an entry drops its decoder, which
/// releases the stream.
pub struct LiveCursorCache {
    entries: IndexMap<CacheKey, ParkedCursor>,
    capacity: usize,
    ttl: Option<Duration>,
}

impl LiveCursorCache {
    /// Cache holding at most `capacity` decoders, each valid for `ttl`.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity,
            ttl,
        }
    }

    /// Number of parked decoders (expired ones included until purged).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no decoder is parked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if a decoder is parked under `key`, expired or not.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove and return the decoder parked under `key`, unless it expired.
    pub fn take(&mut self, key: &str) -> Option<LiveCursor> {
        let parked = self.entries.shift_remove(key)?;
        if self.is_expired(&parked) {
            debug!(key, "[wikidump:cursor] dropped expired live cursor");
            return None;
        }
        Some(parked.cursor)
    }

    /// Park `cursor` under `key`, replacing any previous entry.
    pub fn insert(&mut self, key: CacheKey, cursor: LiveCursor) {
        // Re-inserting must move the key to the back of the eviction order.
        if self.entries.shift_remove(&key).is_some() {
            debug!(key = %key, "[wikidump:cursor] replaced live cursor");
        }
        self.entries.insert(
            key,
            ParkedCursor {
                cursor,
                parked_at: Instant::now(),
            },
        );
        self.enforce_limit();
    }

    /// Drop every expired decoder. Returns how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, parked| !ttl.is_some_and(|ttl| parked.parked_at.elapsed() >= ttl));
        let purged = before - self.entries.len();
        if purged > 0 {
            debug!(purged, "[wikidump:cursor] purged expired live cursors");
        }
        purged
    }

    /// Drop every parked decoder.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn is_expired(&self, parked: &ParkedCursor) -> bool {
        self.ttl
            .is_some_and(|ttl| parked.parked_at.elapsed() >= ttl)
    }

    fn enforce_limit(&mut self) {
        if self.capacity == 0 {
            self.entries.clear();
            return;
        }
        while self.entries.len() > self.capacity {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                debug!(
                    key = %evicted,
                    capacity = self.capacity,
                    "[wikidump:cursor] evicted oldest live cursor"
                );
            } else {
                break;
            }
        }
    }
}
