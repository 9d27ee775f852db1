//! Constants identifying the archive format.

/// `SNAR` when read as little-endian bytes.
pub const ARCHIVE_MAGIC: u32 = 0x52414e53;
pub const ARCHIVE_FORMAT_VERSION: u16 = 1;
/// Extension of archive files.
pub const ARCHIVE_EXTENSION: &str = "sar";
