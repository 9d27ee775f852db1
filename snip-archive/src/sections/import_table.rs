use std::io::{Read, Seek, SeekFrom};

use snip_analysis::Import;
use snip_core::{
    binary::{Deserializer, Error, ResultContextExt},
    serializable_structure, Type,
};
use tracing::debug;

use super::Summary;

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionImport {
    pub library: String,
    pub class: String,
    pub function: String,
    pub params: Vec<Type>,
    pub return_ty: Type,
}

serializable_structure! {
    type FunctionImport {
        library,
        class,
        function,
        params,
        return_ty,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportTable {
    pub imports: Vec<FunctionImport>,
}

impl From<&Import> for FunctionImport {
    fn from(import: &Import) -> Self {
        Self {
            library: import.library.clone(),
            class: import.class.clone(),
            function: import.function.clone(),
            params: import.params.clone(),
            return_ty: import.return_ty,
        }
    }
}

impl From<FunctionImport> for Import {
    fn from(import: FunctionImport) -> Self {
        Self {
            library: import.library,
            class: import.class,
            function: import.function,
            params: import.params,
            return_ty: import.return_ty,
        }
    }
}

impl Summary {
    pub fn deserialize_import_table(
        &self,
        deserializer: &mut Deserializer<impl Read + Seek>,
    ) -> Result<ImportTable, Error> {
        debug!(
            "Deserializing import table ({} imports at {:08x})",
            self.import_count, self.import_offset
        );
        deserializer.seek(SeekFrom::Start(self.import_offset as u64))?;
        let mut imports = vec![];
        for i in 0..self.import_count {
            imports.push(
                deserializer
                    .deserialize()
                    .with_context(|| format!("cannot deserialize import {i}"))?,
            );
        }
        Ok(ImportTable { imports })
    }
}
