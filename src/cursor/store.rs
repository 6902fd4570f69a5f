use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use simd_r_drive::storage_engine::DataStore;
use simd_r_drive::storage_engine::traits::{DataStoreReader, DataStoreWriter};
use tracing::debug;

use crate::constants::cursor::{
    BITCODE_PREFIX, CURSOR_ENTRY_VERSION, CURSOR_KEY_PREFIX, CURSOR_STORE_VERSION,
    DEFAULT_CURSOR_STORE_FILENAME, META_KEY,
};
use crate::errors::SearchError;
use crate::types::CacheKey;

/// Key-value store for persisted cursor counts.
///
/// Values are non-negative counters. Failures must surface as
/// [`SearchError::CacheUnavailable`]; callers treat the store as an
/// optimization and fall back to a cold scan.
pub trait CursorStore: Send + Sync {
    /// Value stored under `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> Result<Option<u64>, SearchError>;
    /// Store `value` under `key`, expiring after `ttl` when given.
    fn set(&self, key: &str, value: u64, ttl: Option<Duration>) -> Result<(), SearchError>;
    /// True if a live value is stored under `key`.
    fn exists(&self, key: &str) -> Result<bool, SearchError> {
        Ok(self.get(key)?.is_some())
    }
}

fn expiry_from(now: DateTime<Utc>, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    let ttl = ttl?;
    let delta = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
    Some(now.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC))
}

#[derive(Clone, Copy, Debug)]
struct StoredCount {
    value: u64,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredCount {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// Process-local cursor store.
#[derive(Debug, Default)]
pub struct InMemoryCursorStore {
    entries: Mutex<HashMap<CacheKey, StoredCount>>,
}

impl InMemoryCursorStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries. Expired entries linger until the next `set`
    /// or a `get` of their key.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cursor store poisoned").len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CursorStore for InMemoryCursorStore {
    fn get(&self, key: &str) -> Result<Option<u64>, SearchError> {
        let now = Utc::now();
        let mut entries = self.entries.lock().expect("cursor store poisoned");
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value)),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: u64, ttl: Option<Duration>) -> Result<(), SearchError> {
        let now = Utc::now();
        let entry = StoredCount {
            value,
            expires_at: expiry_from(now, ttl),
        };
        let mut entries = self.entries.lock().expect("cursor store poisoned");
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(key.to_string(), entry);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, bitcode::Encode, bitcode::Decode)]
/// Versioned header stored once per cursor file.
struct StoreMeta {
    version: u8,
}

/// On-disk value of one cursor key.
#[derive(Clone, Copy, Debug, bitcode::Encode, bitcode::Decode)]
struct PersistedCount {
    version: u8,
    value: u64,
    /// Absolute expiry in Unix milliseconds.
    expires_at_ms: Option<i64>,
}

/// File-backed cursor store.
///
/// Each cursor key is its own entry in an append-only `simd_r_drive`
/// [`DataStore`], so a `set` writes one small record no matter how many
/// cursors exist. Opening a path that is a directory uses
/// [`DEFAULT_CURSOR_STORE_FILENAME`] inside it.
pub struct FileCursorStore {
    path: PathBuf,
    store: DataStore,
}

impl fmt::Debug for FileCursorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCursorStore")
            .field("path", &self.path)
            .finish()
    }
}

impl FileCursorStore {
    /// Open (or create) a cursor store at `path`.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, SearchError> {
        let path = coerce_store_path(path.into());
        ensure_parent_dir(&path)?;
        let store = DataStore::open(path.as_path()).map_err(map_store_err)?;
        let store = Self { path, store };
        store.verify_metadata()?;
        debug!(
            path = %store.path.display(),
            "[wikidump:cursor] opened cursor store"
        );
        Ok(store)
    }

    /// Default cursor-store file path inside `dir`.
    pub fn default_path_in_dir<P: AsRef<Path>>(dir: P) -> PathBuf {
        dir.as_ref().join(DEFAULT_CURSOR_STORE_FILENAME)
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn verify_metadata(&self) -> Result<(), SearchError> {
        match read_bytes(&self.store, META_KEY)? {
            Some(bytes) => {
                let meta = decode_store_meta(&bytes)?;
                if meta.version != CURSOR_STORE_VERSION {
                    return Err(SearchError::CacheUnavailable(format!(
                        "cursor store version mismatch (expected {}, found {})",
                        CURSOR_STORE_VERSION, meta.version
                    )));
                }
            }
            None => {
                let meta = StoreMeta {
                    version: CURSOR_STORE_VERSION,
                };
                write_bytes(&self.store, META_KEY, &encode_store_meta(&meta))?;
            }
        }
        Ok(())
    }
}

impl CursorStore for FileCursorStore {
    fn get(&self, key: &str) -> Result<Option<u64>, SearchError> {
        let Some(bytes) = read_bytes(&self.store, &entry_key(key))? else {
            return Ok(None);
        };
        let count = decode_count(&bytes)?;
        Ok(count.is_live(Utc::now()).then_some(count.value))
    }

    fn set(&self, key: &str, value: u64, ttl: Option<Duration>) -> Result<(), SearchError> {
        let count = StoredCount {
            value,
            expires_at: expiry_from(Utc::now(), ttl),
        };
        write_bytes(&self.store, &entry_key(key), &encode_count(&count))
    }
}

fn entry_key(key: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(CURSOR_KEY_PREFIX.len() + key.len());
    out.extend_from_slice(CURSOR_KEY_PREFIX);
    out.extend_from_slice(key.as_bytes());
    out
}

fn read_bytes(store: &DataStore, key: &[u8]) -> Result<Option<Vec<u8>>, SearchError> {
    store
        .read(key)
        .map_err(map_store_err)?
        .map(|entry| Ok(entry.as_ref().to_vec()))
        .transpose()
}

fn write_bytes(store: &DataStore, key: &[u8], payload: &[u8]) -> Result<(), SearchError> {
    store.write(key, payload).map_err(map_store_err)?;
    Ok(())
}

fn encode_store_meta(meta: &StoreMeta) -> Vec<u8> {
    encode_bitcode_payload(&bitcode::encode(meta))
}

fn decode_store_meta(bytes: &[u8]) -> Result<StoreMeta, SearchError> {
    let raw = decode_bitcode_payload(bytes)?;
    bitcode::decode(&raw).map_err(|err| {
        SearchError::CacheUnavailable(format!("failed to decode cursor store metadata: {err}"))
    })
}

fn encode_count(count: &StoredCount) -> Vec<u8> {
    let persisted = PersistedCount {
        version: CURSOR_ENTRY_VERSION,
        value: count.value,
        expires_at_ms: count.expires_at.map(|at| at.timestamp_millis()),
    };
    encode_bitcode_payload(&bitcode::encode(&persisted))
}

fn decode_count(bytes: &[u8]) -> Result<StoredCount, SearchError> {
    let raw = decode_bitcode_payload(bytes)?;
    let persisted: PersistedCount = bitcode::decode(&raw).map_err(|err| {
        SearchError::CacheUnavailable(format!("corrupt cursor entry: {err}"))
    })?;
    if persisted.version != CURSOR_ENTRY_VERSION {
        return Err(SearchError::CacheUnavailable(format!(
            "cursor entry version mismatch (expected {}, found {})",
            CURSOR_ENTRY_VERSION, persisted.version
        )));
    }
    let expires_at = persisted
        .expires_at_ms
        .map(|ms| DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::MIN_UTC));
    Ok(StoredCount {
        value: persisted.value,
        expires_at,
    })
}

fn encode_bitcode_payload(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + bytes.len());
    out.push(BITCODE_PREFIX);
    out.extend_from_slice(bytes);
    out
}

fn decode_bitcode_payload(bytes: &[u8]) -> Result<Vec<u8>, SearchError> {
    if bytes.first().copied() != Some(BITCODE_PREFIX) {
        return Err(SearchError::CacheUnavailable(
            "cursor store payload missing expected prefix".into(),
        ));
    }
    Ok(bytes[1..].to_vec())
}

fn coerce_store_path(path: PathBuf) -> PathBuf {
    if path.is_dir() {
        return path.join(DEFAULT_CURSOR_STORE_FILENAME);
    }
    path
}

fn ensure_parent_dir(path: &Path) -> Result<(), SearchError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(map_store_err)?;
    }
    Ok(())
}

fn map_store_err(err: io::Error) -> SearchError {
    SearchError::CacheUnavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn in_memory_store_round_trips_and_expires() {
        let store = InMemoryCursorStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", 7, None).unwrap();
        store.set("short", 1, Some(Duration::from_millis(5))).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(7));
        assert!(store.exists("k").unwrap());

        thread::sleep(Duration::from_millis(20));
        assert!(!store.exists("short").unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn in_memory_set_prunes_expired_entries() {
        let store = InMemoryCursorStore::new();
        for n in 0..100 {
            store
                .set(&format!("window-{n}"), n, Some(Duration::from_millis(5)))
                .unwrap();
        }
        store.set("kept", 1, None).unwrap();
        assert_eq!(store.len(), 101);

        thread::sleep(Duration::from_millis(20));
        // No `get` on the expired keys: the next write alone clears them.
        store.set("fresh", 2, Some(Duration::from_secs(3600))).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("kept").unwrap(), Some(1));
        assert_eq!(store.get("fresh").unwrap(), Some(2));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = FileCursorStore::default_path_in_dir(dir.path());
        {
            let store = FileCursorStore::open(&path).unwrap();
            store.set("a", 10, None).unwrap();
            store.set("b", 20, Some(Duration::from_secs(3600))).unwrap();
            store.set("a", 11, None).unwrap();
        }
        let reopened = FileCursorStore::open(&path).unwrap();
        assert_eq!(reopened.get("a").unwrap(), Some(11));
        assert_eq!(reopened.get("b").unwrap(), Some(20));
        assert_eq!(reopened.get("c").unwrap(), None);
    }

    #[test]
    fn file_store_keeps_many_keys_independently() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cursors.bin");
        {
            let store = FileCursorStore::open(&path).unwrap();
            for n in 0..1000u64 {
                store.set(&format!("cursor-{n}"), n * 3, None).unwrap();
            }
            store.set("cursor-500", 7, None).unwrap();
        }
        let reopened = FileCursorStore::open(&path).unwrap();
        assert_eq!(reopened.get("cursor-0").unwrap(), Some(0));
        assert_eq!(reopened.get("cursor-500").unwrap(), Some(7));
        assert_eq!(reopened.get("cursor-999").unwrap(), Some(2997));
        assert_eq!(reopened.get("cursor-1000").unwrap(), None);
    }

    #[test]
    fn directory_path_uses_default_filename() {
        let dir = tempdir().unwrap();
        let store = FileCursorStore::open(dir.path()).unwrap();
        assert_eq!(store.path(), FileCursorStore::default_path_in_dir(dir.path()));
        store.set("x", 1, None).unwrap();
        assert!(store.path().is_file());
    }

    #[test]
    fn expired_file_entries_are_absent_after_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cursors.bin");
        let store = FileCursorStore::open(&path).unwrap();
        store.set("gone", 5, Some(Duration::from_millis(5))).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(store.get("gone").unwrap(), None);
        drop(store);

        let reopened = FileCursorStore::open(&path).unwrap();
        assert!(!reopened.exists("gone").unwrap());
    }

    #[test]
    fn corrupt_entries_are_cache_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cursors.bin");
        let store = FileCursorStore::open(&path).unwrap();
        write_bytes(&store.store, &entry_key("k"), &[0x00, 0x01]).unwrap();
        let err = store.get("k").unwrap_err();
        assert!(matches!(err, SearchError::CacheUnavailable(ref msg) if msg.contains("prefix")));

        write_bytes(&store.store, &entry_key("k"), &[BITCODE_PREFIX, 0xFF, 0xEE]).unwrap();
        let err = store.get("k").unwrap_err();
        assert!(matches!(err, SearchError::CacheUnavailable(_)));
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cursors.bin");
        {
            let raw = DataStore::open(path.as_path()).unwrap();
            let meta = StoreMeta {
                version: CURSOR_STORE_VERSION.wrapping_add(1),
            };
            write_bytes(&raw, META_KEY, &encode_store_meta(&meta)).unwrap();
        }

        let err = FileCursorStore::open(&path).unwrap_err();
        assert!(matches!(err, SearchError::CacheUnavailable(ref msg) if msg.contains("version mismatch")));
    }
}
