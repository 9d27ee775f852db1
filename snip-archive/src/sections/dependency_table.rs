use std::io::{Read, Seek, SeekFrom};

use snip_core::binary::{Deserializer, Error, ResultContextExt};
use tracing::debug;

use super::Summary;

/// Names of the libraries an archive imports functions from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyTable {
    pub libraries: Vec<String>,
}

impl Summary {
    pub fn deserialize_dependency_table(
        &self,
        deserializer: &mut Deserializer<impl Read + Seek>,
    ) -> Result<DependencyTable, Error> {
        debug!(
            "Deserializing dependency table ({} dependencies at {:08x})",
            self.dependency_count, self.dependency_offset
        );
        deserializer.seek(SeekFrom::Start(self.dependency_offset as u64))?;
        let mut libraries = vec![];
        for i in 0..self.dependency_count {
            libraries.push(
                deserializer
                    .deserialize()
                    .with_context(|| format!("cannot deserialize dependency {i}"))?,
            );
        }
        Ok(DependencyTable { libraries })
    }
}
