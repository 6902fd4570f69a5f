/// Constants used by stable content hashing.
pub mod hash {
    /// Seed for every xxh64 content hash.
    pub const CONTENT_HASH_SEED: u64 = 0;
    /// Domain tag mixed into criteria hashes so they never collide with window hashes.
    pub const CRITERIA_HASH_DOMAIN: &str = "search_criteria:v2";
    /// Domain tag mixed into page-window hashes.
    pub const WINDOW_HASH_DOMAIN: &str = "page_window:v2";
    /// Domain tag mixed into entity structural hashes.
    pub const ENTITY_HASH_DOMAIN: &str = "entity:v2";
}

/// Claim datatype strings recognized by the entity parser.
pub mod datatypes {
    /// Reference to an item (`Q…`).
    pub const WIKIBASE_ITEM: &str = "wikibase-item";
    /// Reference to a property (`P…`).
    pub const WIKIBASE_PROPERTY: &str = "wikibase-property";
    /// Reference to a lexeme (`L…`).
    pub const WIKIBASE_LEXEME: &str = "wikibase-lexeme";
    /// Reference to a lexeme form (`L…-F…`).
    pub const WIKIBASE_FORM: &str = "wikibase-form";
    /// Point in time with calendar model.
    pub const TIME: &str = "time";
    /// Identifier in an external database.
    pub const EXTERNAL_ID: &str = "external-id";
    /// Decimal amount with unit.
    pub const QUANTITY: &str = "quantity";
    /// Latitude/longitude pair on a globe.
    pub const GLOBE_COORDINATE: &str = "globe-coordinate";
    /// Plain string.
    pub const STRING: &str = "string";
    /// Text tagged with a language.
    pub const MONOLINGUAL_TEXT: &str = "monolingualtext";
    /// URL.
    pub const URL: &str = "url";
    /// TeX formula.
    pub const MATH: &str = "math";
    /// LilyPond notation.
    pub const MUSICAL_NOTATION: &str = "musical-notation";
    /// Commons media file name (known, not modeled).
    pub const COMMONS_MEDIA: &str = "commonsMedia";
    /// Commons geo-shape page (known, not modeled).
    pub const GEO_SHAPE: &str = "geo-shape";
    /// Commons tabular-data page (known, not modeled).
    pub const TABULAR_DATA: &str = "tabular-data";
    /// Reference to a lexeme sense (known, not modeled).
    pub const WIKIBASE_SENSE: &str = "wikibase-sense";
    /// Reference to an entity schema (known, not modeled).
    pub const ENTITY_SCHEMA: &str = "entity-schema";
}

/// Constants used by the cursor cache tiers.
pub mod cursor {
    use std::time::Duration;

    /// Default number of live decoder handles kept in process.
    pub const DEFAULT_LIVE_CURSOR_CAPACITY: usize = 64;
    /// Default time-to-live for cursor entries in both tiers.
    pub const DEFAULT_CURSOR_TTL: Duration = Duration::from_secs(60 * 60);
    /// Suffix appended to a cursor key for the persisted raw-record offset.
    pub const RAW_OFFSET_KEY_SUFFIX: &str = ":raw";
    /// Version tag stored in the cursor file's metadata entry.
    pub const CURSOR_STORE_VERSION: u8 = 2;
    /// Version tag stored in every persisted cursor entry.
    pub const CURSOR_ENTRY_VERSION: u8 = 1;
    /// Key of the cursor file's metadata entry.
    pub const META_KEY: &[u8] = b"__meta__";
    /// Prefix for persisted cursor entry keys.
    pub const CURSOR_KEY_PREFIX: &[u8] = b"cursor:";
    /// Prefix marker for bitcode-encoded payloads.
    pub const BITCODE_PREFIX: u8 = b'B';
    /// Default filename for the persisted cursor store.
    pub const DEFAULT_CURSOR_STORE_FILENAME: &str = "cursor_store.bin";
}

/// Constants used by dump transport.
pub mod transport {
    /// Read buffer size used for dump streams.
    pub const DUMP_READ_BUFFER_BYTES: usize = 1 << 20;
    /// Extensions decoded as zstd streams.
    pub const ZSTD_EXTENSIONS: [&str; 2] = ["zst", "zstd"];
    /// Extensions decoded as (multistream) bzip2.
    pub const BZIP2_EXTENSIONS: [&str; 2] = ["bz2", "bzip2"];
    /// Extensions decoded as (multi-member) gzip.
    pub const GZIP_EXTENSIONS: [&str; 2] = ["gz", "gzip"];
    /// Compressed extensions that need a caller-supplied opener.
    pub const UNSUPPORTED_COMPRESSED_EXTENSIONS: [&str; 1] = ["xz"];
}

/// Constants used by search progress reporting.
pub mod search {
    use std::time::Duration;

    /// Minimum interval between progress log lines during long scans.
    pub const PROGRESS_REPORT_INTERVAL: Duration = Duration::from_millis(750);
    /// Raw record count after which a scan emits progress logs.
    pub const PROGRESS_REPORT_MIN_RECORDS: u64 = 100_000;
}
