//! The compile, resolve, recompile pipeline.

use std::{mem, path::Path, sync::Arc};

use snip_analysis::Module;
use snip_archive::{weld_module, LoadedAssembly};
use snip_core::uuid::Uuid;
use snip_foundation::{
    errors::{render_all, Diagnostic},
    source::{SourceFile, SourceFileId, SourceFileSet},
};
use snip_syntax::ast::Unit;
use thiserror::Error;
use tracing::{debug, info_span, trace, Instrument};

use crate::{
    classify::{classify, Classification, UnresolvedName},
    config::CompileOptions,
    emit::{Artifact, CompilationResult, EmitError, Emitter},
    inject::inject,
    resolver::{BindingResolver, ResolvedBinding},
    synthesis::{fix_trailing_return, synthesize, ENTRY_CLASS, ENTRY_FUNCTION},
};

/// Name diagnostics refer to the synthesized unit by.
const FRAGMENT_FILE_NAME: &str = "fragment.snip";

/// A compile could not run to completion.
///
/// Errors in the fragment itself are not reported this way, but through
/// [`CompilationResult::diagnostic_text`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("the fragment uses undeclared names, but no binding resolver was supplied")]
    MissingResolver,
    #[error("the fragment cannot be parsed\n{rendered}")]
    Parse {
        diagnostics: Vec<Diagnostic>,
        rendered: String,
    },
    #[error("binding resolver failed: {0:#}")]
    Resolver(anyhow::Error),
}

/// Where a compile is at. The pipeline resolves bindings at most once: the only way into
/// [`Stage::SecondCompile`] is through [`Stage::Resolving`], which is only entered from
/// [`Stage::FirstCompile`].
pub enum Stage<'a> {
    Synthesizing,
    FirstCompile {
        file: SourceFileId,
        unit: Unit,
    },
    Resolving {
        resolver: &'a dyn BindingResolver,
        file: SourceFileId,
        unit: Unit,
        unresolved: Vec<UnresolvedName>,
    },
    SecondCompile {
        file: SourceFileId,
        unit: Unit,
    },
    Emitting {
        module: Module,
    },
    Done(CompilationResult),
}

impl<'a> Stage<'a> {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Synthesizing => "synthesizing",
            Stage::FirstCompile { .. } => "first_compile",
            Stage::Resolving { .. } => "resolving",
            Stage::SecondCompile { .. } => "second_compile",
            Stage::Emitting { .. } => "emitting",
            Stage::Done(_) => "done",
        }
    }
}

/// State of one fragment compile.
pub(crate) struct Pipeline<'a> {
    fragment: &'a str,
    options: &'a CompileOptions,
    resolver: Option<&'a dyn BindingResolver>,
    scratch_dir: &'a Path,
    references: Vec<Arc<LoadedAssembly>>,
    module_name: String,
    files: SourceFileSet,
    compile_passes: u8,
    bindings: Vec<ResolvedBinding>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        fragment: &'a str,
        options: &'a CompileOptions,
        resolver: Option<&'a dyn BindingResolver>,
        scratch_dir: &'a Path,
        references: Vec<Arc<LoadedAssembly>>,
    ) -> Self {
        Self {
            fragment,
            options,
            resolver,
            scratch_dir,
            references,
            module_name: format!("snippet-{}", Uuid::new_v4().simple()),
            files: SourceFileSet::new(),
            compile_passes: 0,
            bindings: vec![],
        }
    }

    pub async fn run(mut self) -> Result<CompilationResult, PipelineError> {
        let mut stage = Stage::Synthesizing;
        loop {
            trace!(stage = stage.name(), "entering stage");
            stage = match stage {
                Stage::Done(result) => return Ok(result),
                Stage::Resolving {
                    resolver,
                    file,
                    unit,
                    unresolved,
                } => {
                    self.resolve(resolver, file, unit, unresolved)
                        .instrument(info_span!("stage", stage = "resolving"))
                        .await?
                }
                stage => self.step(stage)?,
            };
        }
    }

    /// Transitions out of every stage that does not need to wait.
    fn step(&mut self, stage: Stage<'a>) -> Result<Stage<'a>, PipelineError> {
        let _span = info_span!("stage", stage = stage.name()).entered();
        match stage {
            Stage::Synthesizing => {
                let source = synthesize(self.fragment);
                let file = self
                    .files
                    .add(SourceFile::new(FRAGMENT_FILE_NAME, source.as_str()));
                let unit = snip_syntax::parse_unit(file, &source).map_err(|diagnostics| {
                    PipelineError::Parse {
                        rendered: render_all(&self.files, &diagnostics),
                        diagnostics,
                    }
                })?;
                Ok(Stage::FirstCompile {
                    file,
                    unit: fix_trailing_return(&unit),
                })
            }
            Stage::FirstCompile { file, unit } => {
                let (module, classification) = self.compile_pass(file, &unit);
                if classification.unresolved.is_empty() {
                    return Ok(self.finish_compiling(module, classification));
                }
                let resolver = self.resolver.ok_or(PipelineError::MissingResolver)?;
                Ok(Stage::Resolving {
                    resolver,
                    file,
                    unit,
                    unresolved: classification.unresolved_names().cloned().collect(),
                })
            }
            Stage::SecondCompile { file, unit } => {
                let (module, classification) = self.compile_pass(file, &unit);
                Ok(self.finish_compiling(module, classification))
            }
            Stage::Emitting { mut module } => {
                if !module.mark_entry(ENTRY_CLASS, ENTRY_FUNCTION) {
                    return Ok(self.fail(
                        format!("error: entry point `{ENTRY_CLASS}.{ENTRY_FUNCTION}` is missing\n"),
                        vec![],
                    ));
                }
                let emitter = Emitter {
                    scratch_dir: self.scratch_dir,
                    references: &self.references,
                };
                match emitter.emit(&module, self.options.output) {
                    Ok(artifact) => Ok(self.succeed(artifact)),
                    Err(error) => Ok(self.fail(error.diagnostic_text(), vec![])),
                }
            }
            stage @ (Stage::Resolving { .. } | Stage::Done(_)) => Ok(stage),
        }
    }

    async fn resolve(
        &mut self,
        resolver: &'a dyn BindingResolver,
        file: SourceFileId,
        unit: Unit,
        unresolved: Vec<UnresolvedName>,
    ) -> Result<Stage<'a>, PipelineError> {
        let bindings = resolver.resolve().await.map_err(PipelineError::Resolver)?;
        debug!(
            unresolved = unresolved.len(),
            available = bindings.len(),
            "resolver returned bindings"
        );
        let (unit, used) = inject(&unit, &unresolved, &bindings);
        self.bindings = used;
        Ok(Stage::SecondCompile { file, unit })
    }

    fn compile_pass(&mut self, file: SourceFileId, unit: &Unit) -> (Option<Module>, Classification) {
        self.compile_passes += 1;
        let _span = info_span!("compile_pass", pass = self.compile_passes).entered();
        let compilation = snip_analysis::compile(file, unit, &self.module_name, &self.references);
        let classification = classify(compilation.diagnostics, self.files.source(file));
        debug!(
            unresolved = classification.unresolved.len(),
            other = classification.other.len(),
            "classified diagnostics"
        );
        (compilation.module, classification)
    }

    fn finish_compiling(
        &mut self,
        module: Option<Module>,
        classification: Classification,
    ) -> Stage<'a> {
        match module {
            Some(module) if !classification.has_diagnostics() => Stage::Emitting { module },
            _ => {
                let diagnostics = classification.into_diagnostics();
                let text = if diagnostics.is_empty() {
                    String::from("error: compilation failed\n")
                } else {
                    render_all(&self.files, &diagnostics)
                };
                self.fail(text, diagnostics)
            }
        }
    }

    fn fail(&mut self, diagnostic_text: String, diagnostics: Vec<Diagnostic>) -> Stage<'a> {
        debug!(passes = self.compile_passes, "compilation failed");
        Stage::Done(CompilationResult {
            compile_passes: self.compile_passes,
            bindings: mem::take(&mut self.bindings),
            ..CompilationResult::failure(diagnostic_text, diagnostics)
        })
    }

    fn succeed(&mut self, artifact: Artifact) -> Stage<'a> {
        debug!(passes = self.compile_passes, "compilation succeeded");
        Stage::Done(CompilationResult {
            diagnostic_text: String::new(),
            artifact: Some(artifact),
            diagnostics: vec![],
            compile_passes: self.compile_passes,
            bindings: mem::take(&mut self.bindings),
        })
    }
}

/// Compiles a complete unit into a library archive at `output`.
pub(crate) fn compile_library(
    name: &str,
    source: &str,
    references: &[Arc<LoadedAssembly>],
    output: &Path,
) -> Result<CompilationResult, PipelineError> {
    let _span = info_span!("compile_library", name).entered();
    let mut files = SourceFileSet::new();
    let file = files.add(SourceFile::new(format!("{name}.snip"), source));
    let unit = snip_syntax::parse_unit(file, source).map_err(|diagnostics| PipelineError::Parse {
        rendered: render_all(&files, &diagnostics),
        diagnostics,
    })?;

    let references = references.to_vec();
    let compilation = snip_analysis::compile(file, &unit, name, &references);
    let classification = classify(compilation.diagnostics, source);
    let module = match compilation.module {
        Some(module) if !classification.has_diagnostics() => module,
        _ => {
            let diagnostics = classification.into_diagnostics();
            let text = render_all(&files, &diagnostics);
            return Ok(CompilationResult {
                compile_passes: 1,
                ..CompilationResult::failure(text, diagnostics)
            });
        }
    };

    let written = weld_module(&module)
        .map_err(EmitError::Weld)
        .and_then(|bytes| {
            std::fs::write(output, bytes).map_err(|source| EmitError::Write {
                path: output.to_owned(),
                source,
            })
        });
    Ok(match written {
        Ok(()) => CompilationResult {
            diagnostic_text: String::new(),
            artifact: Some(Artifact::OnDisk(output.to_owned())),
            diagnostics: vec![],
            compile_passes: 1,
            bindings: vec![],
        },
        Err(error) => CompilationResult {
            compile_passes: 1,
            ..CompilationResult::failure(error.diagnostic_text(), vec![])
        },
    })
}
