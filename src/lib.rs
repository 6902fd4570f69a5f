#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Searcher configuration and language selection.
pub mod config;
/// Centralized constants used across decoding, cursors, and transport.
pub mod constants;
/// Cursor cache tiers and persisted cursor stores.
pub mod cursor;
/// Search filters and page windows.
pub mod criteria;
/// Entity and claim value types.
pub mod data;
/// Precision-preserving decimal formatting.
pub mod decimal;
/// Reusable CLI runner shared by the demo binary.
pub mod example_apps;
mod hash;
/// Raw record to entity conversion.
pub mod parser;
/// Search orchestrator.
pub mod search;
/// Dump stream interfaces and record decoding.
pub mod source;
/// Input transports used to open dumps (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use config::{Language, SearchConfig};
pub use criteria::{PageCriteria, SearchCriteria, SearchCriteriaBuilder, SetComplement};
pub use cursor::{CursorStore, FileCursorStore, InMemoryCursorStore, LiveCursorCache};
pub use data::{
    Claim, ClaimPropertyValue, CoordinateValue, Entity, EntityType, MonolingualTextValue,
    QuantityValue,
};
pub use decimal::{CanonicalDecimal, DecimalFormatter};
pub use errors::SearchError;
pub use parser::{EntityParser, ValueKind};
pub use search::{CursorTier, SearchIter, SearchOutcome, SearchStats, WikiDumpSearcher};
pub use source::{DumpOpener, InMemoryDump, RawRecord, RecordDecoder};
pub use transport::{DumpCodec, FileDumpOpener};
pub use types::{CacheKey, Datatype, EntityId, LanguageCode, PathString, PropertyId};
