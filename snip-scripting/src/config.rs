use std::path::{Path, PathBuf};

/// Settings shared by every compile made through one [`ScriptingService`].
///
/// [`ScriptingService`]: crate::ScriptingService
#[derive(Debug, Clone)]
pub struct ScriptingConfig {
    /// Directory searched for references that cannot be found at the path they were given with.
    pub search_root: Option<PathBuf>,
    /// Directory compiled fragments are written to in [`OutputMode::Disk`].
    pub scratch_dir: PathBuf,
    /// Libraries referenced by every compile. Loaded in order when the service is created.
    pub default_references: Vec<PathBuf>,
}

impl Default for ScriptingConfig {
    fn default() -> Self {
        Self {
            search_root: None,
            scratch_dir: std::env::temp_dir().join("snip-scratch"),
            default_references: vec![],
        }
    }
}

impl ScriptingConfig {
    pub fn with_search_root(mut self, search_root: impl Into<PathBuf>) -> Self {
        self.search_root = Some(search_root.into());
        self
    }

    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    pub fn with_default_reference(mut self, path: impl AsRef<Path>) -> Self {
        self.default_references.push(path.as_ref().to_owned());
        self
    }
}

/// Where a successful compile puts its artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Load the compiled fragment straight from memory.
    #[default]
    InMemory,
    /// Write the compiled fragment to a uniquely named file in the scratch directory.
    Disk,
}

/// Per-compile settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileOptions {
    pub output: OutputMode,
}

impl CompileOptions {
    pub fn in_memory() -> Self {
        Self {
            output: OutputMode::InMemory,
        }
    }

    pub fn disk() -> Self {
        Self {
            output: OutputMode::Disk,
        }
    }
}
