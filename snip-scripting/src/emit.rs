use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use snip_analysis::Module;
use snip_archive::{format::ARCHIVE_EXTENSION, weld_module, weld_module_into, LoadedAssembly};
use snip_core::{uuid::Uuid, Value};
use snip_foundation::errors::Diagnostic;
use thiserror::Error;
use tracing::{debug, info_span, warn};

use crate::{config::OutputMode, resolver::ResolvedBinding};

/// A compiled fragment, ready to be invoked.
#[derive(Debug, Clone)]
pub enum Artifact {
    InMemory(Arc<LoadedAssembly>),
    OnDisk(PathBuf),
}

/// Outcome of compiling one fragment.
#[derive(Debug)]
pub struct CompilationResult {
    /// Rendered diagnostics explaining why compilation failed. Empty on success.
    pub diagnostic_text: String,
    /// Present exactly when compilation succeeded.
    pub artifact: Option<Artifact>,
    /// The diagnostics behind `diagnostic_text`.
    pub diagnostics: Vec<Diagnostic>,
    /// 1, or 2 if unresolved names had to be resolved.
    pub compile_passes: u8,
    /// Bindings declared in the fragment by the resolution pass.
    pub bindings: Vec<ResolvedBinding>,
}

impl CompilationResult {
    pub(crate) fn failure(diagnostic_text: String, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            diagnostic_text,
            artifact: None,
            diagnostics,
            compile_passes: 0,
            bindings: vec![],
        }
    }

    pub fn success(&self) -> bool {
        self.artifact.is_some()
    }

    pub fn assembly(&self) -> Option<&Arc<LoadedAssembly>> {
        match &self.artifact {
            Some(Artifact::InMemory(assembly)) => Some(assembly),
            _ => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.artifact {
            Some(Artifact::OnDisk(path)) => Some(path),
            _ => None,
        }
    }

    /// Values of the resolved bindings, keyed by name. Pass these to the assembly's
    /// `invoke_entry` to run the fragment with the values that were resolved for it.
    pub fn bound_values(&self) -> HashMap<String, Value> {
        self.bindings
            .iter()
            .map(|binding| (binding.name.clone(), binding.value.clone()))
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("cannot weld archive: {0:#}")]
    Weld(anyhow::Error),
    #[error("cannot create scratch directory `{}`", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write `{}`", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("compiled module cannot be loaded")]
    Load(#[from] snip_archive::Error),
}

impl EmitError {
    /// The error and its causes, formatted like a rendered diagnostic.
    pub(crate) fn diagnostic_text(self) -> String {
        format!("error: {:#}\n", anyhow::Error::new(self))
    }
}

/// Turns compiled modules into artifacts.
pub struct Emitter<'a> {
    pub scratch_dir: &'a Path,
    pub references: &'a [Arc<LoadedAssembly>],
}

impl<'a> Emitter<'a> {
    pub fn emit(&self, module: &Module, mode: OutputMode) -> Result<Artifact, EmitError> {
        let _span = info_span!("emit", module = %module.name, ?mode).entered();
        match mode {
            OutputMode::InMemory => self.emit_in_memory(module),
            OutputMode::Disk => self.emit_to_disk(module),
        }
    }

    fn emit_in_memory(&self, module: &Module) -> Result<Artifact, EmitError> {
        let mut buffer = vec![];
        let welded = weld_module_into(module, &mut buffer);
        // The buffer is loaded even if welding failed, so the log shows how far it got.
        let loaded = LoadedAssembly::load(&buffer, self.references);
        match (welded, loaded) {
            (Ok(()), Ok(assembly)) => Ok(Artifact::InMemory(assembly)),
            (Ok(()), Err(error)) => {
                warn!(bytes = buffer.len(), %error, "welded archive cannot be loaded");
                Err(EmitError::Load(error))
            }
            (Err(error), loaded) => {
                warn!(
                    bytes = buffer.len(),
                    partial_archive_loads = loaded.is_ok(),
                    "welding failed"
                );
                Err(EmitError::Weld(error))
            }
        }
    }

    fn emit_to_disk(&self, module: &Module) -> Result<Artifact, EmitError> {
        std::fs::create_dir_all(self.scratch_dir).map_err(|source| EmitError::CreateDir {
            path: self.scratch_dir.to_owned(),
            source,
        })?;
        let path = self
            .scratch_dir
            .join(format!("{}.{ARCHIVE_EXTENSION}", Uuid::new_v4()));
        let bytes = weld_module(module).map_err(EmitError::Weld)?;
        std::fs::write(&path, &bytes).map_err(|source| EmitError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote artifact");
        Ok(Artifact::OnDisk(path))
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use snip_foundation::source::{SourceFile, SourceFileSet};

    use super::*;

    fn compile(name: &str, source: &str, references: &[Arc<LoadedAssembly>]) -> Module {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new(format!("{name}.snip"), source));
        let unit = snip_syntax::parse_unit(file, source).unwrap();
        let references = references.to_vec();
        let compilation = snip_analysis::compile(file, &unit, name, &references);
        assert!(compilation.diagnostics.is_empty(), "{:#?}", compilation.diagnostics);
        compilation.module.unwrap()
    }

    fn failure(error: EmitError) -> CompilationResult {
        CompilationResult::failure(error.diagnostic_text(), vec![])
    }

    #[test]
    fn modules_that_cannot_be_welded_fail_in_both_modes() {
        let scratch = tempfile::tempdir().unwrap();
        let mut module = compile(
            "pair",
            indoc! {"
                class Pair {
                    static int First() { return 1; }
                    static int Second() { return 2; }
                }
            "},
            &[],
        );
        module.classes[0].functions.reverse();
        let emitter = Emitter {
            scratch_dir: scratch.path(),
            references: &[],
        };

        let error = emitter.emit(&module, OutputMode::InMemory).unwrap_err();
        assert!(matches!(error, EmitError::Weld(_)));
        let result = failure(error);
        assert!(!result.success());
        assert!(result.diagnostic_text.contains("out of order"), "{}", result.diagnostic_text);

        let error = emitter.emit(&module, OutputMode::Disk).unwrap_err();
        assert!(matches!(error, EmitError::Weld(_)));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn modules_that_cannot_be_linked_fail_in_memory() {
        let scratch = tempfile::tempdir().unwrap();
        let math = compile(
            "math",
            "class Math { static int Square(int x) { return x * x; } }",
            &[],
        );
        let math = LoadedAssembly::from_module(math, &[]).unwrap();
        let app = compile(
            "app",
            "class App { static object Run() { return Math.Square(3); } }",
            &[math],
        );

        // Emitted without the library the module was compiled against.
        let emitter = Emitter {
            scratch_dir: scratch.path(),
            references: &[],
        };
        let error = emitter.emit(&app, OutputMode::InMemory).unwrap_err();
        assert!(matches!(error, EmitError::Load(_)));
        let result = failure(error);
        assert!(!result.success());
        assert!(result.artifact.is_none());
        assert!(result.diagnostic_text.contains("cannot be loaded"), "{}", result.diagnostic_text);
    }
}
