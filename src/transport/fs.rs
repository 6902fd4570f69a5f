use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::transport::{
    BZIP2_EXTENSIONS, DUMP_READ_BUFFER_BYTES, GZIP_EXTENSIONS, UNSUPPORTED_COMPRESSED_EXTENSIONS,
    ZSTD_EXTENSIONS,
};
use crate::errors::SearchError;
use crate::source::{DumpOpener, DumpReader};

/// Stream codec chosen from a dump's file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpCodec {
    /// Uncompressed JSON.
    Plain,
    /// Zstandard-compressed JSON.
    Zstd,
    /// Bzip2-compressed JSON, single or multistream.
    Bzip2,
    /// Gzip-compressed JSON, single or multi-member.
    Gzip,
}

impl DumpCodec {
    /// Pick a codec for `path`, rejecting compressed formats this crate cannot decode.
    pub fn for_path(path: &Path) -> Result<Self, SearchError> {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return Ok(DumpCodec::Plain);
        };
        let matches = |candidates: &[&str]| {
            candidates
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        };
        if matches(&ZSTD_EXTENSIONS) {
            return Ok(DumpCodec::Zstd);
        }
        if matches(&BZIP2_EXTENSIONS) {
            return Ok(DumpCodec::Bzip2);
        }
        if matches(&GZIP_EXTENSIONS) {
            return Ok(DumpCodec::Gzip);
        }
        if matches(&UNSUPPORTED_COMPRESSED_EXTENSIONS) {
            return Err(SearchError::Configuration(format!(
                "no built-in decoder for '.{ext}' dumps ({}); decompress it or supply a custom DumpOpener",
                path.display()
            )));
        }
        Ok(DumpCodec::Plain)
    }

    fn feature(self) -> &'static str {
        match self {
            DumpCodec::Plain => "",
            DumpCodec::Zstd => "zstd",
            DumpCodec::Bzip2 => "bzip2",
            DumpCodec::Gzip => "gzip",
        }
    }
}

/// Opens a dump file from disk, decompressing by extension.
#[derive(Clone, Debug)]
pub struct FileDumpOpener {
    path: PathBuf,
    codec: DumpCodec,
}

impl FileDumpOpener {
    /// Create an opener for `path`. Fails fast on unsupported compressed extensions.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SearchError> {
        let path = path.into();
        let codec = DumpCodec::for_path(&path)?;
        Ok(Self { path, codec })
    }

    /// Dump path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Codec used for this dump.
    pub fn codec(&self) -> DumpCodec {
        self.codec
    }

    fn unavailable(&self, reason: String) -> SearchError {
        SearchError::SourceUnavailable {
            path: self.path.display().to_string(),
            reason,
        }
    }
}

impl DumpOpener for FileDumpOpener {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&self) -> Result<DumpReader, SearchError> {
        let file = File::open(&self.path)
            .map_err(|err| self.unavailable(format!("failed opening dump: {err}")))?;
        debug!(
            path = %self.path.display(),
            codec = ?self.codec,
            "[wikidump:fs] opened dump stream"
        );
        let reader = match self.codec {
            DumpCodec::Plain => Ok(buffered(file)),
            DumpCodec::Zstd => open_zstd(file),
            DumpCodec::Bzip2 => open_bzip2(file),
            DumpCodec::Gzip => open_gzip(file),
        };
        reader.map_err(|err| match err {
            SearchError::Io(io) => self.unavailable(format!(
                "failed starting {} stream: {io}",
                self.codec.feature()
            )),
            other => other,
        })
    }
}

fn buffered<R: Read + Send + 'static>(reader: R) -> DumpReader {
    Box::new(BufReader::with_capacity(DUMP_READ_BUFFER_BYTES, reader))
}

#[cfg(not(all(feature = "zstd", feature = "bzip2", feature = "gzip")))]
fn missing_feature(codec: DumpCodec) -> SearchError {
    SearchError::Configuration(format!(
        "{} dumps require the `{}` feature",
        codec.feature(),
        codec.feature()
    ))
}

#[cfg(feature = "zstd")]
fn open_zstd(file: File) -> Result<DumpReader, SearchError> {
    let decoder = zstd::stream::read::Decoder::new(file)?;
    Ok(buffered(decoder))
}

#[cfg(not(feature = "zstd"))]
fn open_zstd(_file: File) -> Result<DumpReader, SearchError> {
    Err(missing_feature(DumpCodec::Zstd))
}

// Published dumps are written by parallel compressors as concatenated
// streams; the single-stream decoders stop after the first one.
#[cfg(feature = "bzip2")]
fn open_bzip2(file: File) -> Result<DumpReader, SearchError> {
    let decoder = bzip2::read::MultiBzDecoder::new(BufReader::new(file));
    Ok(buffered(decoder))
}

#[cfg(not(feature = "bzip2"))]
fn open_bzip2(_file: File) -> Result<DumpReader, SearchError> {
    Err(missing_feature(DumpCodec::Bzip2))
}

#[cfg(feature = "gzip")]
fn open_gzip(file: File) -> Result<DumpReader, SearchError> {
    let decoder = flate2::read::MultiGzDecoder::new(BufReader::new(file));
    Ok(buffered(decoder))
}

#[cfg(not(feature = "gzip"))]
fn open_gzip(_file: File) -> Result<DumpReader, SearchError> {
    Err(missing_feature(DumpCodec::Gzip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RecordDecoder;
    use std::fs;
    use tempfile::tempdir;

    const DUMP: &str = r#"[
{"id":"Q1","type":"item"},
{"id":"P31","type":"property"}
]"#;

    #[test]
    fn codec_follows_extension() {
        assert_eq!(
            DumpCodec::for_path(Path::new("latest-all.json")).unwrap(),
            DumpCodec::Plain
        );
        assert_eq!(
            DumpCodec::for_path(Path::new("latest-all.json.ZST")).unwrap(),
            DumpCodec::Zstd
        );
        assert_eq!(
            DumpCodec::for_path(Path::new("dump")).unwrap(),
            DumpCodec::Plain
        );
        assert_eq!(
            DumpCodec::for_path(Path::new("latest-all.json.bz2")).unwrap(),
            DumpCodec::Bzip2
        );
        assert_eq!(
            DumpCodec::for_path(Path::new("latest-all.json.GZ")).unwrap(),
            DumpCodec::Gzip
        );
        let err = DumpCodec::for_path(Path::new("latest-all.json.xz")).unwrap_err();
        assert!(matches!(err, SearchError::Configuration(ref msg) if msg.contains(".xz")));
    }

    fn read_ids(path: &Path) -> Vec<String> {
        let opener = FileDumpOpener::new(path).unwrap();
        RecordDecoder::new(opener.open().unwrap())
            .map(|record| record.unwrap().id)
            .collect()
    }

    // Splits the dump mid-array so each compressed stream holds half of it.
    const FIRST_HALF: &str = "[\n{\"id\":\"Q1\",\"type\":\"item\"},\n";
    const SECOND_HALF: &str = "{\"id\":\"P31\",\"type\":\"property\"}\n]";

    #[test]
    fn plain_file_streams_records() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("dump.json");
        fs::write(&path, DUMP).unwrap();

        let opener = FileDumpOpener::new(&path).unwrap();
        let ids: Vec<String> = RecordDecoder::new(opener.open().unwrap())
            .map(|record| record.unwrap().id)
            .collect();
        assert_eq!(ids, vec!["Q1", "P31"]);
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let temp = tempdir().unwrap();
        let opener = FileDumpOpener::new(temp.path().join("absent.json")).unwrap();
        let err = opener.open().err().unwrap();
        assert!(matches!(err, SearchError::SourceUnavailable { .. }));
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn zstd_file_is_decompressed_transparently() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("dump.json.zst");
        let compressed = zstd::stream::encode_all(DUMP.as_bytes(), 3).unwrap();
        fs::write(&path, compressed).unwrap();

        let opener = FileDumpOpener::new(&path).unwrap();
        assert_eq!(opener.codec(), DumpCodec::Zstd);
        let ids: Vec<String> = RecordDecoder::new(opener.open().unwrap())
            .map(|record| record.unwrap().id)
            .collect();
        assert_eq!(ids, vec!["Q1", "P31"]);
    }

    #[cfg(feature = "bzip2")]
    fn bzip2_bytes(text: &str) -> Vec<u8> {
        use std::io::Write;

        let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[cfg(feature = "bzip2")]
    #[test]
    fn bzip2_file_is_decompressed_transparently() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("dump.json.bz2");
        fs::write(&path, bzip2_bytes(DUMP)).unwrap();

        assert_eq!(FileDumpOpener::new(&path).unwrap().codec(), DumpCodec::Bzip2);
        assert_eq!(read_ids(&path), vec!["Q1", "P31"]);
    }

    #[cfg(feature = "bzip2")]
    #[test]
    fn multistream_bzip2_reads_every_stream() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("dump.json.bz2");
        let mut bytes = bzip2_bytes(FIRST_HALF);
        bytes.extend(bzip2_bytes(SECOND_HALF));
        fs::write(&path, bytes).unwrap();

        assert_eq!(read_ids(&path), vec!["Q1", "P31"]);
    }

    #[cfg(feature = "gzip")]
    fn gzip_bytes(text: &str) -> Vec<u8> {
        use std::io::Write;

        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn gzip_file_is_decompressed_transparently() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("dump.json.gz");
        fs::write(&path, gzip_bytes(DUMP)).unwrap();

        assert_eq!(FileDumpOpener::new(&path).unwrap().codec(), DumpCodec::Gzip);
        assert_eq!(read_ids(&path), vec!["Q1", "P31"]);
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn multi_member_gzip_reads_every_member() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("dump.json.gz");
        let mut bytes = gzip_bytes(FIRST_HALF);
        bytes.extend(gzip_bytes(SECOND_HALF));
        fs::write(&path, bytes).unwrap();

        assert_eq!(read_ids(&path), vec!["Q1", "P31"]);
    }
}
