use std::{io, path::PathBuf};

use snip_analysis::RuntimeError;
use snip_core::binary;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed archive")]
    Malformed(#[from] binary::Error),
    #[error("archive is inconsistent: {0}")]
    Inconsistent(String),
    #[error("library `{library}` is needed by `{assembly}`, but was not referenced")]
    MissingDependency { assembly: String, library: String },
    #[error(
        "`{library}` has no static function `{class}.{function}` with the signature `{assembly}` was compiled against"
    )]
    UnresolvedImport {
        assembly: String,
        library: String,
        class: String,
        function: String,
    },
    #[error("`{assembly}` has no class `{class}`")]
    UnknownClass { assembly: String, class: String },
    #[error("class `{class}` has no function `{function}`")]
    UnknownFunction { class: String, function: String },
    #[error("`{0}` has no entry point")]
    NoEntryPoint(String),
    #[error("execution failed")]
    Runtime(#[from] RuntimeError),
}
