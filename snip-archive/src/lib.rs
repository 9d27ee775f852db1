//! Reading and writing compiled modules as archives, and loading archives so that their
//! functions can be called.

mod error;
pub mod format;
mod loader;
pub mod sections;
pub mod welder;

use std::io::{Read, Seek};

use anyhow::bail;
use snip_analysis::{ClassDef, FunctionDef, Import, Module, ParamDef};
use snip_core::binary::{self, Deserializer, ResultContextExt};
use tracing::debug;

pub use error::*;
pub use loader::*;

use crate::{
    sections::{
        ArchiveFlags, DependencyTable, ExportTable, ExportedClass, ExportedFunction, ExportedParam,
        FunctionImport, ImportTable, Summary,
    },
    welder::Welder,
};

#[derive(Debug, Clone)]
pub struct Archive {
    pub summary: Summary,
    pub dependency_table: DependencyTable,
    pub import_table: ImportTable,
    pub export_table: ExportTable,
}

impl Archive {
    pub fn deserialize(
        deserializer: &mut Deserializer<impl Read + Seek>,
    ) -> Result<Self, binary::Error> {
        let summary = deserializer
            .deserialize::<Summary>()
            .context("cannot deserialize archive summary")?;
        summary.validate()?;
        debug!(name = %summary.name, uuid = %summary.uuid, "Deserializing archive");

        let dependency_table = summary
            .deserialize_dependency_table(deserializer)
            .context("cannot deserialize dependency table")?;
        let import_table = summary
            .deserialize_import_table(deserializer)
            .context("cannot deserialize import table")?;
        let export_table = summary
            .deserialize_export_table(deserializer)
            .context("cannot deserialize export table")?;

        Ok(Self {
            summary,
            dependency_table,
            import_table,
            export_table,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, binary::Error> {
        Self::deserialize(&mut Deserializer::from_buffer(bytes))
    }

    /// Rebuilds the module stored in the archive.
    pub fn into_module(self) -> Result<Module, Error> {
        let name = self.summary.name;

        for import in &self.import_table.imports {
            if !self.dependency_table.libraries.contains(&import.library) {
                return Err(Error::Inconsistent(format!(
                    "function `{}.{}` is imported from `{}`, which is not a dependency",
                    import.class, import.function, import.library
                )));
            }
        }

        let mut classes = vec![];
        let mut functions = vec![];
        for (class_index, class) in self.export_table.classes.into_iter().enumerate() {
            for (i, function) in class.functions.iter().enumerate() {
                if class.functions[..i]
                    .iter()
                    .any(|other| other.name == function.name)
                {
                    return Err(Error::Inconsistent(format!(
                        "function `{}.{}` is exported twice",
                        class.name, function.name
                    )));
                }
            }

            let mut indices = vec![];
            for function in class.functions {
                indices.push(functions.len() as u32);
                functions.push(FunctionDef {
                    class: class_index as u32,
                    name: function.name,
                    flags: function.flags,
                    params: function
                        .params
                        .into_iter()
                        .map(|param| ParamDef {
                            name: param.name,
                            ty: param.ty,
                        })
                        .collect(),
                    return_ty: function.return_ty,
                    ir: function.ir,
                });
            }
            classes.push(ClassDef {
                name: class.name,
                functions: indices,
            });
        }

        Ok(Module {
            name,
            namespace: self.summary.namespace,
            classes,
            functions,
            imports: self
                .import_table
                .imports
                .into_iter()
                .map(Import::from)
                .collect(),
        })
    }
}

/// Serializes a module into an archive.
///
/// Every class's functions must be numbered consecutively, in class order, which is how the
/// compiler numbers them.
pub fn weld_module(module: &Module) -> anyhow::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    weld_module_into(module, &mut buffer)?;
    Ok(buffer)
}

/// Like [`weld_module`], but welds into `buffer`. If welding fails, `buffer` is left with the
/// part of the archive that was written.
pub fn weld_module_into(module: &Module, buffer: &mut Vec<u8>) -> anyhow::Result<()> {
    buffer.clear();
    let mut next_function = 0;
    let mut classes = vec![];
    for class in &module.classes {
        let mut functions = vec![];
        for &index in &class.functions {
            if index != next_function {
                bail!(
                    "function {index} of class `{}` is out of order (expected {next_function})",
                    class.name
                );
            }
            next_function += 1;
            let Some(function) = module.function(index) else {
                bail!("class `{}` lists nonexistent function {index}", class.name);
            };
            functions.push(ExportedFunction {
                name: function.name.clone(),
                flags: function.flags,
                params: function
                    .params
                    .iter()
                    .map(|param| ExportedParam {
                        name: param.name.clone(),
                        ty: param.ty,
                    })
                    .collect(),
                return_ty: function.return_ty,
                ir: function.ir.clone(),
            });
        }
        classes.push(ExportedClass {
            name: class.name.clone(),
            functions,
        });
    }
    if next_function as usize != module.functions.len() {
        bail!(
            "{} function(s) do not belong to any class",
            module.functions.len() - next_function as usize
        );
    }

    let mut flags = ArchiveFlags::empty();
    if module.entry().is_some() {
        flags |= ArchiveFlags::HAS_ENTRY_POINT;
    }

    Welder {
        name: &module.name,
        namespace: module.namespace.as_deref(),
        flags,
        dependency_table: &DependencyTable {
            libraries: module
                .dependencies()
                .into_iter()
                .map(|library| library.to_owned())
                .collect(),
        },
        import_table: &ImportTable {
            imports: module.imports.iter().map(FunctionImport::from).collect(),
        },
        export_table: &ExportTable { classes },
    }
    .weld_into(buffer)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use snip_analysis::CompilerInput;
    use snip_core::binary::ErrorKind;
    use snip_foundation::source::{SourceFile, SourceFileSet};

    use super::*;

    pub(crate) fn compile(name: &str, source: &str, input: &dyn CompilerInput) -> Module {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new(format!("{name}.snip"), source));
        let unit = snip_syntax::parse_unit(file, source).unwrap();
        let compilation = snip_analysis::compile(file, &unit, name, input);
        assert!(
            compilation.diagnostics.iter().all(|d| !d.is_error()),
            "{:#?}",
            compilation.diagnostics
        );
        compilation.module.unwrap()
    }

    const GEOMETRY: &str = indoc! {"
        namespace Shapes;

        class Square {
            static int Area(int side) { return side * side; }
            static string Describe() { return \"square\"; }
        }

        class Circle {
            static float Area(float radius) { return 3.0 * radius * radius; }
        }
    "};

    #[test]
    fn welded_module_reads_back_unchanged() {
        let module = compile("geometry", GEOMETRY, &());
        let bytes = weld_module(&module).unwrap();
        let archive = Archive::from_bytes(&bytes).unwrap();
        assert_eq!(archive.summary.name, "geometry");
        assert!(!archive.summary.uuid.is_nil());
        assert_eq!(archive.export_table.classes.len(), 2);
        assert!(!archive
            .summary
            .flags
            .contains(ArchiveFlags::HAS_ENTRY_POINT));
        assert_eq!(archive.into_module().unwrap(), module);
    }

    #[test]
    fn every_weld_gets_a_fresh_uuid() {
        let module = compile("geometry", GEOMETRY, &());
        let first = Archive::from_bytes(&weld_module(&module).unwrap()).unwrap();
        let second = Archive::from_bytes(&weld_module(&module).unwrap()).unwrap();
        assert_ne!(first.summary.uuid, second.summary.uuid);
    }

    #[test]
    fn foreign_files_are_rejected() {
        let error = Archive::from_bytes(b"PK\x03\x04 definitely a zip file").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Deserialize);
        assert!(error.to_string().contains("not an archive"));
    }

    #[test]
    fn truncated_files_are_rejected() {
        let module = compile("geometry", GEOMETRY, &());
        let bytes = weld_module(&module).unwrap();
        for len in [0, 3, 20, bytes.len() / 2, bytes.len() - 1] {
            assert!(
                Archive::from_bytes(&bytes[..len]).is_err(),
                "archive truncated to {len} bytes was accepted"
            );
        }
    }

    #[test]
    fn out_of_order_functions_cannot_be_welded() {
        let mut module = compile("geometry", GEOMETRY, &());
        module.classes.swap(0, 1);
        assert!(weld_module(&module).is_err());
    }
}
