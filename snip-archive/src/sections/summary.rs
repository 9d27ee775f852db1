use snip_core::{
    binary::{Error, ErrorKind},
    serializable_bitflags, serializable_structure,
    uuid::Uuid,
};

use crate::format;

/// Archive header. Locates the tables that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub magic: u32,
    pub format_version: u16,
    pub flags: ArchiveFlags,
    /// Name of the module stored in the archive. Other archives refer to it by this name.
    pub name: String,
    pub namespace: Option<String>,
    pub uuid: Uuid,

    pub dependency_count: u32,
    pub dependency_offset: u32,
    pub import_count: u32,
    pub import_offset: u32,
    pub export_count: u32,
    pub export_offset: u32,
}

serializable_structure! {
    type Summary {
        magic,
        format_version,
        flags,
        name,
        namespace,
        uuid,
        dependency_count,
        dependency_offset,
        import_count,
        import_offset,
        export_count,
        export_offset,
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ArchiveFlags: u32 {
        /// One of the exported functions is flagged as the entry point.
        const HAS_ENTRY_POINT = 0x1;
    }
}

serializable_bitflags!(type ArchiveFlags; validate);

impl Summary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            magic: format::ARCHIVE_MAGIC,
            format_version: format::ARCHIVE_FORMAT_VERSION,
            flags: ArchiveFlags::empty(),
            name: name.into(),
            namespace: None,
            uuid: Uuid::nil(),
            dependency_count: 0,
            dependency_offset: 0,
            import_count: 0,
            import_offset: 0,
            export_count: 0,
            export_offset: 0,
        }
    }

    /// Checks that the summary describes an archive this version can read.
    pub fn validate(&self) -> Result<(), Error> {
        if self.magic != format::ARCHIVE_MAGIC {
            return Err(ErrorKind::Deserialize.make(format!(
                "not an archive (magic is {:#010x}, expected {:#010x})",
                self.magic,
                format::ARCHIVE_MAGIC
            )));
        }
        if self.format_version != format::ARCHIVE_FORMAT_VERSION {
            return Err(ErrorKind::Deserialize.make(format!(
                "unsupported archive format version {} (expected {})",
                self.format_version,
                format::ARCHIVE_FORMAT_VERSION
            )));
        }
        Ok(())
    }
}
