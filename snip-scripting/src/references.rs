use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use snip_archive::{LoadedAssembly, TypeHandle};
use tracing::{debug, warn};

/// A library referenced by compiled fragments.
#[derive(Debug, Clone)]
pub struct Reference {
    /// Canonical path of the library's archive.
    pub path: PathBuf,
    pub assembly: Arc<LoadedAssembly>,
}

/// Libraries that fragments are compiled against, without duplicates.
///
/// References can only be added. A library is linked against the references added before it,
/// so libraries must be added after the libraries they depend on.
#[derive(Debug, Default)]
pub struct ReferenceSet {
    search_root: Option<PathBuf>,
    references: Mutex<Vec<Reference>>,
}

impl ReferenceSet {
    pub fn new(search_root: Option<PathBuf>) -> Self {
        Self {
            search_root,
            references: Mutex::new(vec![]),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Reference>> {
        self.references
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds the library at `path`. Returns `false` if the library cannot be found or loaded.
    /// Adding a library that is already in the set succeeds without doing anything.
    pub fn add_path(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let Some(resolved) = self.locate(path) else {
            warn!(path = %path.display(), "reference not found");
            return false;
        };

        let mut references = self.lock();
        if references.iter().any(|reference| reference.path == resolved) {
            debug!(path = %resolved.display(), "reference already present");
            return true;
        }

        let assemblies: Vec<_> = references
            .iter()
            .map(|reference| Arc::clone(&reference.assembly))
            .collect();
        match LoadedAssembly::load_file(&resolved, &assemblies) {
            Ok(assembly) => {
                debug!(path = %resolved.display(), name = assembly.name(), "reference added");
                references.push(Reference {
                    path: resolved,
                    assembly,
                });
                true
            }
            Err(error) => {
                warn!(path = %resolved.display(), "reference rejected: {error}");
                false
            }
        }
    }

    /// Adds the library that defines `handle`. Classes of assemblies that were never loaded from
    /// a file cannot be referenced.
    pub fn add_type(&self, handle: &TypeHandle) -> bool {
        match handle.assembly().location() {
            Some(location) => self.add_path(location),
            None => {
                warn!(
                    class = handle.name(),
                    "cannot reference a class whose assembly was loaded from memory"
                );
                false
            }
        }
    }

    fn locate(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return path.canonicalize().ok();
        }
        let fallback = self.search_root.as_ref()?.join(path.file_name()?);
        if fallback.is_file() {
            fallback.canonicalize().ok()
        } else {
            None
        }
    }

    /// The assemblies currently in the set, in the order they were added.
    pub fn snapshot(&self) -> Vec<Arc<LoadedAssembly>> {
        self.lock()
            .iter()
            .map(|reference| Arc::clone(&reference.assembly))
            .collect()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .map(|reference| reference.path.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
