use std::io::{Read, Seek, SeekFrom};

use snip_analysis::{function::FunctionFlags, ir::Ir};
use snip_core::{
    binary::{Deserializer, Error, ResultContextExt},
    serializable_structure, Type,
};
use tracing::debug;

use super::Summary;

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedClass {
    pub name: String,
    pub functions: Vec<ExportedFunction>,
}

serializable_structure! {
    type ExportedClass {
        name,
        functions,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFunction {
    pub name: String,
    pub flags: FunctionFlags,
    pub params: Vec<ExportedParam>,
    pub return_ty: Type,
    pub ir: Ir,
}

serializable_structure! {
    type ExportedFunction {
        name,
        flags,
        params,
        return_ty,
        ir,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedParam {
    pub name: String,
    pub ty: Type,
}

serializable_structure! {
    type ExportedParam {
        name,
        ty,
    }
}

/// Classes defined by an archive.
///
/// Functions are numbered in the order they appear, class after class. Calls between functions
/// of the same archive refer to them by that number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    pub classes: Vec<ExportedClass>,
}

impl ExportTable {
    pub fn functions(&self) -> impl Iterator<Item = (&ExportedClass, &ExportedFunction)> {
        self.classes
            .iter()
            .flat_map(|class| class.functions.iter().map(move |function| (class, function)))
    }
}

impl Summary {
    pub fn deserialize_export_table(
        &self,
        deserializer: &mut Deserializer<impl Read + Seek>,
    ) -> Result<ExportTable, Error> {
        debug!(
            "Deserializing export table ({} classes at {:08x})",
            self.export_count, self.export_offset
        );
        deserializer.seek(SeekFrom::Start(self.export_offset as u64))?;
        let mut classes = vec![];
        for i in 0..self.export_count {
            classes.push(
                deserializer
                    .deserialize()
                    .with_context(|| format!("cannot deserialize exported class {i}"))?,
            );
        }
        Ok(ExportTable { classes })
    }
}
