use std::io::Cursor;

use anyhow::Context;
use snip_core::{
    binary::{Serialize, Serializer},
    uuid::Uuid,
};
use thiserror::Error;

use crate::sections::{ArchiveFlags, DependencyTable, ExportTable, ImportTable, Summary};

/// Archive welder. Assembles an archive from its tables.
pub struct Welder<'a> {
    pub name: &'a str,
    pub namespace: Option<&'a str>,
    pub flags: ArchiveFlags,
    pub dependency_table: &'a DependencyTable,
    pub import_table: &'a ImportTable,
    pub export_table: &'a ExportTable,
}

impl<'a> Welder<'a> {
    /// Welds into `buffer`, replacing its contents. On failure the buffer holds whatever had
    /// been written up to that point.
    pub fn weld_into(self, buffer: &mut Vec<u8>) -> anyhow::Result<()> {
        buffer.clear();
        let mut summary = Summary {
            flags: self.flags,
            namespace: self.namespace.map(|namespace| namespace.to_owned()),
            uuid: Uuid::new_v4(),
            dependency_count: count(self.dependency_table.libraries.len())?,
            import_count: count(self.import_table.imports.len())?,
            export_count: count(self.export_table.classes.len())?,
            ..Summary::new(self.name)
        };

        let mut cursor = Cursor::new(buffer);

        // Written once with zeroed offsets to reserve space, then again at the end once the
        // offsets are known. The summary's size does not depend on the offsets' values.
        summary
            .serialize(&mut Serializer::new(&mut cursor))
            .context("cannot serialize initial summary")?;

        summary.dependency_offset = offset(&cursor)?;
        for library in &self.dependency_table.libraries {
            library
                .serialize(&mut Serializer::new(&mut cursor))
                .context("cannot serialize dependency table entry")?;
        }

        summary.import_offset = offset(&cursor)?;
        for import in &self.import_table.imports {
            import
                .serialize(&mut Serializer::new(&mut cursor))
                .context("cannot serialize import table entry")?;
        }

        summary.export_offset = offset(&cursor)?;
        for class in &self.export_table.classes {
            class
                .serialize(&mut Serializer::new(&mut cursor))
                .with_context(|| format!("cannot serialize exported class {}", class.name))?;
        }

        cursor.set_position(0);
        summary
            .serialize(&mut Serializer::new(&mut cursor))
            .context("cannot serialize final summary")?;

        Ok(())
    }
}

fn offset(cursor: &Cursor<&mut Vec<u8>>) -> Result<u32, Error> {
    cursor
        .position()
        .try_into()
        .map_err(|_| Error::ArchiveTooBig)
}

fn count(len: usize) -> Result<u32, Error> {
    len.try_into().map_err(|_| Error::TooManyEntries(len))
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("archive is too big (max is 4 GiB)")]
    ArchiveTooBig,
    #[error("table has too many entries ({0})")]
    TooManyEntries(usize),
}
