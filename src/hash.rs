use xxhash_rust::xxh64::Xxh64;

use crate::constants::hash::CONTENT_HASH_SEED;

/// Streaming xxh64 hasher with an explicit byte layout.
///
/// Every field is written as fixed-width little-endian integers, length
/// prefixed strings, and tag bytes for optional values, so keys derived from
/// it stay valid across processes, targets, and compiler versions.
pub struct ContentHasher {
    inner: Xxh64,
}

impl ContentHasher {
    /// Start a hash in `domain`; different domains never share a key space.
    pub fn new(domain: &str) -> Self {
        let mut hasher = Self {
            inner: Xxh64::new(CONTENT_HASH_SEED),
        };
        hasher.write_str(domain);
        hasher
    }

    /// Single discriminant byte.
    pub fn write_tag(&mut self, tag: u8) {
        self.inner.update(&[tag]);
    }

    /// Fixed-width little-endian integer.
    pub fn write_u64(&mut self, value: u64) {
        self.inner.update(&value.to_le_bytes());
    }

    /// Length-prefixed UTF-8 bytes.
    pub fn write_str(&mut self, value: &str) {
        self.write_u64(value.len() as u64);
        self.inner.update(value.as_bytes());
    }

    /// `0` for `None`, `1` followed by the string for `Some`.
    pub fn write_opt_str(&mut self, value: Option<&str>) {
        match value {
            None => self.write_tag(0),
            Some(value) => {
                self.write_tag(1);
                self.write_str(value);
            }
        }
    }

    /// Count-prefixed list of strings.
    pub fn write_strs<S: AsRef<str>>(&mut self, values: &[S]) {
        self.write_u64(values.len() as u64);
        for value in values {
            self.write_str(value.as_ref());
        }
    }

    /// Digest of everything written so far.
    pub fn finish(&self) -> u64 {
        self.inner.digest()
    }
}

/// Render a hash as a fixed-width lowercase hex key segment.
pub fn hex_key(hash: u64) -> String {
    format!("{hash:016x}")
}
