use std::path::Path;

use anyhow::Context;
use clap::Subcommand;
use snip_analysis::ir::dump::DumpFunction;
use snip_archive::{
    sections::{ExportedFunction, FunctionImport},
    Archive,
};
use tracing::{debug, info};

#[derive(Clone, Copy, Subcommand)]
pub enum Dump {
    /// Dump summarising information about the archive (aka the archive header).
    Summary,

    /// Dump the libraries the archive depends on.
    Dependencies,
    /// Dump the functions the archive imports from its dependencies.
    Imports,
    /// Dump the classes and functions the archive defines.
    Exports,

    /// Dump the IR of every function in the archive.
    Ir,
}

pub fn dump(filename: &Path, what: Dump) -> anyhow::Result<()> {
    info!(?filename, "Opening archive");
    let bytes = std::fs::read(filename)
        .with_context(|| format!("cannot read {}", filename.display()))?;

    debug!("Reading archive");
    let archive = Archive::from_bytes(&bytes).context("cannot deserialize archive")?;

    match what {
        Dump::Summary => {
            debug!("Printing summary");
            println!("{:#?}", archive.summary);
        }
        Dump::Dependencies => {
            for (i, library) in archive.dependency_table.libraries.iter().enumerate() {
                println!("{i:6} {library}");
            }
        }
        Dump::Imports => {
            for (i, import) in archive.import_table.imports.iter().enumerate() {
                let FunctionImport {
                    library,
                    class,
                    function,
                    params,
                    return_ty,
                } = import;
                let params = params
                    .iter()
                    .map(|ty| ty.keyword())
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("{i:6} {return_ty} {library}::{class}.{function}({params})");
            }
        }
        Dump::Exports => {
            for (i, (class, function)) in archive.export_table.functions().enumerate() {
                let ExportedFunction {
                    name,
                    flags,
                    params,
                    return_ty,
                    ..
                } = function;
                let params = params
                    .iter()
                    .map(|param| format!("{} {}", param.ty, param.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                let flags = if flags.is_empty() {
                    String::new()
                } else {
                    format!("{flags} ")
                };
                println!("{i:6} {flags}{return_ty} {}.{name}({params})", class.name);
            }
        }
        Dump::Ir => {
            debug!("Rebuilding module");
            let module = archive
                .into_module()
                .context("cannot rebuild module from archive")?;
            for (index, function) in module.functions.iter().enumerate() {
                println!("// {}", module.function_name(index as u32));
                println!(
                    "{}",
                    DumpFunction {
                        module: &module,
                        function,
                    }
                );
            }
        }
    }

    Ok(())
}
