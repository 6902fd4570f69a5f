use std::io;

use thiserror::Error;

use crate::types::{Datatype, EntityId, PathString, PropertyId};

/// Error type for dump decoding, entity parsing, configuration, and cursor persistence.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The dump's top-level array or one of its records could not be decoded.
    #[error("failed to decode dump record {record_index}: {reason}")]
    Decode {
        /// Zero-based index of the record being decoded.
        record_index: u64,
        /// Decoder message.
        reason: String,
    },
    /// A claim value of a known kind did not have the expected shape.
    #[error("malformed '{property_id}' value on entity '{entity_id}': {reason}")]
    MalformedValue {
        /// Entity carrying the claim.
        entity_id: EntityId,
        /// Claim property.
        property_id: PropertyId,
        /// What was wrong with the payload.
        reason: String,
    },
    /// A claim declared a datatype outside the known dispatch table.
    #[error("unknown value kind '{datatype}' for property '{property_id}' on entity '{entity_id}'")]
    UnknownValueKind {
        /// Entity carrying the claim.
        entity_id: EntityId,
        /// Claim property.
        property_id: PropertyId,
        /// Unrecognized datatype string.
        datatype: Datatype,
    },
    /// Invalid searcher, page, or opener settings.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The persisted cursor store could not be reached or read.
    #[error("cursor cache unavailable: {0}")]
    CacheUnavailable(String),
    /// The dump stream could not be opened.
    #[error("dump '{path}' is unavailable: {reason}")]
    SourceUnavailable {
        /// Dump location.
        path: PathString,
        /// Underlying failure.
        reason: String,
    },
    /// I/O failure while reading the dump.
    #[error(transparent)]
    Io(#[from] io::Error),
}
