/// Filesystem dump opener with extension-based codec selection.
pub mod fs;

pub use fs::{DumpCodec, FileDumpOpener};
