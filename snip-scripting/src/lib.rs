//! Compiling host-supplied fragments that may use names the host only binds on demand.
//!
//! A fragment is wrapped into a complete unit and compiled. If the compiler reports names it
//! cannot find, the host's [`BindingResolver`] is asked once for the bindings it knows about,
//! declarations for the matching names are injected into the unit, and the unit is compiled a
//! second and final time.

mod classify;
mod config;
mod emit;
mod inject;
mod pipeline;
mod references;
mod resolver;
mod synthesis;
mod values;

use std::path::Path;

use tracing::{info_span, warn, Instrument};

pub use classify::*;
pub use config::*;
pub use emit::*;
pub use inject::*;
pub use pipeline::{PipelineError, Stage};
pub use references::*;
pub use resolver::*;
pub use synthesis::*;
pub use values::*;

use crate::pipeline::Pipeline;

/// Compiles fragments against a growing set of references.
#[derive(Debug)]
pub struct ScriptingService {
    config: ScriptingConfig,
    references: ReferenceSet,
}

impl ScriptingService {
    /// Creates the service and loads the configured default references. References that fail
    /// to load are skipped with a warning.
    pub fn new(config: ScriptingConfig) -> Self {
        let references = ReferenceSet::new(config.search_root.clone());
        for path in &config.default_references {
            if !references.add_path(path) {
                warn!(path = %path.display(), "default reference could not be added");
            }
        }
        Self { config, references }
    }

    pub fn config(&self) -> &ScriptingConfig {
        &self.config
    }

    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    /// Compiles `fragment`.
    ///
    /// `resolver` is consulted at most once, and only if the fragment uses names it does not
    /// declare. Problems with the fragment's code end up in the result's diagnostics; only
    /// failures to run the pipeline itself are returned as errors.
    pub async fn compile(
        &self,
        fragment: &str,
        options: &CompileOptions,
        resolver: Option<&dyn BindingResolver>,
    ) -> Result<CompilationResult, PipelineError> {
        Pipeline::new(
            fragment,
            options,
            resolver,
            &self.config.scratch_dir,
            self.references.snapshot(),
        )
        .run()
        .instrument(info_span!("compile_fragment", output = ?options.output))
        .await
    }

    /// Compiles a complete unit into a library named `name`, written to `output`. Other
    /// fragments and libraries can then reference it.
    pub fn compile_library(
        &self,
        name: &str,
        source: &str,
        output: &Path,
    ) -> Result<CompilationResult, PipelineError> {
        pipeline::compile_library(name, source, &self.references.snapshot(), output)
    }
}

impl Default for ScriptingService {
    fn default() -> Self {
        Self::new(ScriptingConfig::default())
    }
}
