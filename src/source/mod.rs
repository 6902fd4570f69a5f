//! Dump stream interfaces and record decoding.
//!
//! Ownership model:
//! - `DumpOpener` produces a fresh, owned byte stream positioned at the start
//!   of the dump on every call. Dumps are forward-only; there is no seek.
//! - `RecordDecoder` owns one such stream and yields raw records in file order.
//! - Live decoders may be parked in the cursor cache between searches; the
//!   stream is released when the decoder is dropped.

use std::io::{BufRead, Cursor};
use std::sync::Arc;

use crate::errors::SearchError;

/// Incremental decoder over the dump's top-level array.
pub mod decoder;
/// Raw dump record schema.
pub mod record;

pub use decoder::RecordDecoder;
pub use record::{RawClaim, RawDataValue, RawRecord, RawSnak, RawTerm};

/// Decompressed dump bytes as an owned, sendable buffered reader.
pub type DumpReader = Box<dyn BufRead + Send>;

/// Decoder over a dump stream, as stored in the live cursor tier.
pub type DumpDecoder = RecordDecoder<DumpReader>;

/// Source of dump streams.
///
/// Each `open` call must return an independent stream that starts at the
/// first byte of the decompressed dump. Codec selection lives here, outside
/// the search core.
pub trait DumpOpener: Send + Sync {
    /// Human-readable description of the dump, used in logs.
    fn describe(&self) -> String;
    /// Open a fresh stream from the start of the dump.
    fn open(&self) -> Result<DumpReader, SearchError>;
}

/// Dump held in memory, for tests and small embedded datasets.
#[derive(Clone)]
pub struct InMemoryDump {
    name: String,
    bytes: Arc<[u8]>,
}

impl InMemoryDump {
    /// Wrap already-decompressed dump bytes.
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl DumpOpener for InMemoryDump {
    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn open(&self) -> Result<DumpReader, SearchError> {
        Ok(Box::new(Cursor::new(SharedBytes(Arc::clone(&self.bytes)))))
    }
}

/// `AsRef<[u8]>` adapter so `Cursor` can read a shared buffer without copying.
struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
