//! Paginated search over a dump with resumable cursors.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::constants::search::{PROGRESS_REPORT_INTERVAL, PROGRESS_REPORT_MIN_RECORDS};
use crate::criteria::{PageCriteria, SearchCriteria};
use crate::cursor::{CursorStore, LiveCursor, LiveCursorCache, cursor_key, raw_offset_key};
use crate::data::Entity;
use crate::decimal::DecimalFormatter;
use crate::errors::SearchError;
use crate::parser::EntityParser;
use crate::source::{DumpOpener, RecordDecoder};
use crate::transport::FileDumpOpener;

/// Where a search resumed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorTier {
    /// Parked in-process decoder.
    Live,
    /// Persisted match count (and raw offset, when stored).
    Persisted,
    /// Fresh stream from the first record.
    Cold,
}

impl CursorTier {
    /// Lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CursorTier::Live => "live",
            CursorTier::Persisted => "persisted",
            CursorTier::Cold => "cold",
        }
    }
}

/// Cost counters for one search call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchStats {
    /// Tier the call resumed from.
    pub tier: CursorTier,
    /// Raw records fully decoded and parsed during the call.
    pub records_decoded: u64,
    /// Raw records skipped without parsing (persisted raw offset).
    pub records_skipped: u64,
    /// Filtered matches preceding the final stream position.
    pub matches_seen: u64,
}

/// Entities for one window, plus how expensive they were to produce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Matching entities in the requested window, in dump order.
    pub entities: Vec<Entity>,
    /// Cost counters.
    pub stats: SearchStats,
}

/// Filtered, paginated search over one dump.
///
/// Sequential pages reuse the previous call's open decoder; with a
/// [`CursorStore`] attached, a fresh process can resume by replaying up to a
/// persisted position instead of rescanning from the start.
pub struct WikiDumpSearcher {
    config: SearchConfig,
    opener: Arc<dyn DumpOpener>,
    parser: EntityParser,
    live: Mutex<LiveCursorCache>,
    persisted: Option<Arc<dyn CursorStore>>,
}

impl WikiDumpSearcher {
    /// Searcher over the file at `config.dump_path`.
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        let opener = FileDumpOpener::new(config.dump_path.clone())?;
        Self::with_opener(config, Arc::new(opener))
    }

    /// Searcher reading dump streams from `opener`.
    pub fn with_opener(
        config: SearchConfig,
        opener: Arc<dyn DumpOpener>,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        let live = LiveCursorCache::new(config.live_cursor_capacity, config.cursor_ttl);
        Ok(Self {
            config,
            opener,
            parser: EntityParser::default(),
            live: Mutex::new(live),
            persisted: None,
        })
    }

    /// Attach a persisted cursor store.
    pub fn with_cursor_store(mut self, store: Arc<dyn CursorStore>) -> Self {
        self.persisted = Some(store);
        self
    }

    /// Replace the decimal formatter used for quantity and coordinate fields.
    pub fn with_decimal_formatter(mut self, decimals: Arc<dyn DecimalFormatter>) -> Self {
        self.parser = EntityParser::new(decimals);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Matching entities in `page`'s window, in dump order.
    ///
    /// Short or empty when the filtered sequence ends inside or before the window.
    pub fn search(
        &self,
        criteria: &SearchCriteria,
        page: &PageCriteria,
    ) -> Result<Vec<Entity>, SearchError> {
        Ok(self.search_with_stats(criteria, page)?.entities)
    }

    /// Like [`search`](Self::search), also reporting cursor tier and scan cost.
    pub fn search_with_stats(
        &self,
        criteria: &SearchCriteria,
        page: &PageCriteria,
    ) -> Result<SearchOutcome, SearchError> {
        let started = Instant::now();
        let criteria_hash = criteria.content_hash();
        let current_key = cursor_key(criteria_hash, page.window_hash());

        let mut stats = SearchStats {
            tier: CursorTier::Cold,
            records_decoded: 0,
            records_skipped: 0,
            matches_seen: 0,
        };
        let mut cursor = self.resume(&current_key, criteria, page, &mut stats)?;
        debug!(
            key = %current_key,
            tier = stats.tier.as_str(),
            matched = cursor.matched,
            page_index = page.page_index(),
            page_size = page.page_size(),
            "[wikidump:search] resolved cursor"
        );

        let mut progress = Progress::new(started);
        let mut entities = Vec::new();
        while cursor.matched < page.end() {
            let Some(raw) = cursor.decoder.next_record()? else {
                break;
            };
            stats.records_decoded += 1;
            let entity = self.parser.parse(raw, criteria.language())?;
            if criteria.matches(&entity) {
                let index = cursor.matched;
                cursor.matched += 1;
                if page.contains(index) {
                    entities.push(entity);
                }
            }
            progress.tick(cursor.records_read(), cursor.matched);
        }
        stats.matches_seen = cursor.matched;

        let next_key = cursor_key(criteria_hash, page.next_window_hash());
        self.persist_position(&next_key, &cursor);
        self.live
            .lock()
            .expect("live cursor cache poisoned")
            .insert(next_key, cursor);

        debug!(
            tier = stats.tier.as_str(),
            records_decoded = stats.records_decoded,
            records_skipped = stats.records_skipped,
            matches = stats.matches_seen,
            returned = entities.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "[wikidump:search] window complete"
        );
        Ok(SearchOutcome { entities, stats })
    }

    /// Walk the whole filtered sequence one entity at a time.
    pub fn iter<'a>(&'a self, criteria: &'a SearchCriteria) -> SearchIter<'a> {
        SearchIter {
            searcher: self,
            criteria,
            next_index: 0,
            done: false,
        }
    }

    /// Drop every parked decoder, releasing their streams.
    pub fn clear_cursors(&self) {
        self.live
            .lock()
            .expect("live cursor cache poisoned")
            .clear();
    }

    /// Number of decoders currently parked in process.
    pub fn live_cursor_count(&self) -> usize {
        self.live.lock().expect("live cursor cache poisoned").len()
    }

    fn resume(
        &self,
        key: &str,
        criteria: &SearchCriteria,
        page: &PageCriteria,
        stats: &mut SearchStats,
    ) -> Result<LiveCursor, SearchError> {
        let parked = {
            let mut live = self.live.lock().expect("live cursor cache poisoned");
            live.purge_expired();
            live.take(key)
        };
        if let Some(cursor) = parked {
            stats.tier = CursorTier::Live;
            return Ok(cursor);
        }

        if let Some(position) = self.persisted_position(key, page) {
            let mut cursor = self.open_cursor()?;
            match position.raw_offset {
                Some(raw_offset) => {
                    stats.records_skipped = cursor.decoder.skip_records(raw_offset)?;
                    cursor.matched = position.matched;
                }
                None => self.replay(&mut cursor, criteria, position.matched, stats)?,
            }
            stats.tier = CursorTier::Persisted;
            return Ok(cursor);
        }

        stats.tier = CursorTier::Cold;
        self.open_cursor()
    }

    /// Decode and filter until `target` matches have been consumed.
    fn replay(
        &self,
        cursor: &mut LiveCursor,
        criteria: &SearchCriteria,
        target: u64,
        stats: &mut SearchStats,
    ) -> Result<(), SearchError> {
        while cursor.matched < target {
            let Some(raw) = cursor.decoder.next_record()? else {
                break;
            };
            stats.records_decoded += 1;
            let entity = self.parser.parse(raw, criteria.language())?;
            if criteria.matches(&entity) {
                cursor.matched += 1;
            }
        }
        Ok(())
    }

    fn open_cursor(&self) -> Result<LiveCursor, SearchError> {
        let reader = self.opener.open()?;
        debug!(
            dump = %self.opener.describe(),
            "[wikidump:search] opened fresh dump stream"
        );
        Ok(LiveCursor {
            decoder: RecordDecoder::new(reader),
            matched: 0,
        })
    }

    /// Persisted position for `key`, or `None` on a miss or a store failure.
    fn persisted_position(&self, key: &str, page: &PageCriteria) -> Option<PersistedPosition> {
        let store = self.persisted.as_ref()?;
        let matched = match store.get(key) {
            Ok(Some(matched)) => matched,
            Ok(None) => return None,
            Err(err) => {
                warn!(
                    key,
                    error = %err,
                    "[wikidump:search] cursor store read failed; falling back to cold start"
                );
                return None;
            }
        };
        if matched > page.start() {
            warn!(
                key,
                matched,
                start = page.start(),
                "[wikidump:search] persisted cursor is past the window start; ignoring it"
            );
            return None;
        }
        let raw_offset = if self.config.persist_raw_offsets {
            match store.get(&raw_offset_key(key)) {
                Ok(offset) => offset,
                Err(err) => {
                    warn!(
                        key,
                        error = %err,
                        "[wikidump:search] raw offset read failed; replaying matches instead"
                    );
                    None
                }
            }
        } else {
            None
        };
        Some(PersistedPosition {
            matched,
            raw_offset,
        })
    }

    fn persist_position(&self, key: &str, cursor: &LiveCursor) {
        let Some(store) = self.persisted.as_ref() else {
            return;
        };
        let ttl = self.config.cursor_ttl;
        if self.config.persist_raw_offsets
            && let Err(err) = store.set(&raw_offset_key(key), cursor.records_read(), ttl)
        {
            warn!(
                key,
                error = %err,
                "[wikidump:search] failed persisting raw offset"
            );
        }
        if let Err(err) = store.set(key, cursor.matched, ttl) {
            warn!(
                key,
                error = %err,
                "[wikidump:search] failed persisting cursor"
            );
        }
    }
}

struct PersistedPosition {
    matched: u64,
    raw_offset: Option<u64>,
}

/// Rate-limited progress logging for long scans.
struct Progress {
    started: Instant,
    last_report: Instant,
}

impl Progress {
    fn new(started: Instant) -> Self {
        Self {
            started,
            last_report: started,
        }
    }

    fn tick(&mut self, records_read: u64, matched: u64) {
        if records_read < PROGRESS_REPORT_MIN_RECORDS || records_read % 1024 != 0 {
            return;
        }
        if self.last_report.elapsed() < PROGRESS_REPORT_INTERVAL {
            return;
        }
        self.last_report = Instant::now();
        info!(
            records_read,
            matched,
            elapsed_s = self.started.elapsed().as_secs_f64(),
            "[wikidump:search] scanning dump"
        );
    }
}

/// Sequential walk over the filtered sequence, one single-entity page per step.
///
/// Consecutive steps hit the live cursor tier, so the walk reads the dump once.
/// Stops after the first empty page or the first error.
pub struct SearchIter<'a> {
    searcher: &'a WikiDumpSearcher,
    criteria: &'a SearchCriteria,
    next_index: u64,
    done: bool,
}

impl Iterator for SearchIter<'_> {
    type Item = Result<Entity, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let page = match PageCriteria::new(self.next_index, 1) {
            Ok(page) => page,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        match self.searcher.search(self.criteria, &page) {
            Ok(mut entities) => match entities.pop() {
                Some(entity) => {
                    self.next_index += 1;
                    Some(Ok(entity))
                }
                None => {
                    self.done = true;
                    None
                }
            },
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
