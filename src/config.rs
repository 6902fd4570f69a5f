use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::cursor::{DEFAULT_CURSOR_TTL, DEFAULT_LIVE_CURSOR_CAPACITY};
use crate::errors::SearchError;

/// Selects which language's label and description an entity reports.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Language {
    code: Cow<'static, str>,
}

impl Language {
    /// Select terms for an arbitrary language code (e.g. `de`, `pt-br`).
    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self { code: code.into() }
    }

    /// English (`en`).
    pub const fn english() -> Self {
        Self {
            code: Cow::Borrowed("en"),
        }
    }

    /// Language code used as the label/description map key.
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::english()
    }
}

/// Top-level searcher configuration.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Dump file to search. Ignored when a custom opener is supplied.
    pub dump_path: PathBuf,
    /// Max number of live decoder handles parked between searches.
    ///
    /// Each live handle keeps one open (and possibly decompressing) stream.
    pub live_cursor_capacity: usize,
    /// Time after which cached cursors in either tier are treated as absent.
    /// `None` keeps them until evicted.
    pub cursor_ttl: Option<Duration>,
    /// Also persist the raw-record offset next to each match count, so a
    /// resumed search can skip raw records without parsing them.
    pub persist_raw_offsets: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            dump_path: PathBuf::new(),
            live_cursor_capacity: DEFAULT_LIVE_CURSOR_CAPACITY,
            cursor_ttl: Some(DEFAULT_CURSOR_TTL),
            persist_raw_offsets: true,
        }
    }
}

impl SearchConfig {
    /// Config for searching the dump at `dump_path` with default cursor settings.
    pub fn new(dump_path: impl Into<PathBuf>) -> Self {
        Self {
            dump_path: dump_path.into(),
            ..Self::default()
        }
    }

    /// Override live cursor capacity.
    pub fn with_live_cursor_capacity(mut self, capacity: usize) -> Self {
        self.live_cursor_capacity = capacity;
        self
    }

    /// Override cursor time-to-live (`None` disables expiry).
    pub fn with_cursor_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cursor_ttl = ttl;
        self
    }

    /// Enable or disable persisting raw-record offsets.
    pub fn with_persist_raw_offsets(mut self, persist: bool) -> Self {
        self.persist_raw_offsets = persist;
        self
    }

    /// Reject settings that would make the cursor cache meaningless.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.live_cursor_capacity == 0 {
            return Err(SearchError::Configuration(
                "live_cursor_capacity must be at least 1".to_string(),
            ));
        }
        if self.cursor_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(SearchError::Configuration(
                "cursor_ttl must be positive; use None to disable expiry".to_string(),
            ));
        }
        Ok(())
    }
}
