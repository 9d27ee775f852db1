use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use snip_analysis::{
    function::FunctionFlags,
    ir::interpret::{self, Context, Limits, Linkage, RuntimeError, ValueSource},
    ClassDef, CompilerInput, ExternalClass, ExternalFunction, FunctionDef, Import, Module,
};
use snip_core::{uuid::Uuid, Value};
use tracing::{debug, info_span};

use crate::{Archive, Error};

/// A module that has been loaded and linked against the assemblies it references, ready for
/// its functions to be called.
pub struct LoadedAssembly {
    name: String,
    uuid: Uuid,
    location: Option<PathBuf>,
    module: Module,
    /// Target of each of the module's imports, in import order.
    links: Vec<Link>,
}

struct Link {
    assembly: Arc<LoadedAssembly>,
    function: u32,
}

impl LoadedAssembly {
    /// Loads an archive from memory.
    pub fn load(bytes: &[u8], references: &[Arc<LoadedAssembly>]) -> Result<Arc<Self>, Error> {
        let archive = Archive::from_bytes(bytes)?;
        let uuid = archive.summary.uuid;
        Self::link(archive.into_module()?, uuid, None, references)
    }

    /// Loads an archive from disk. The assembly's location is the canonical path of the file.
    pub fn load_file(path: &Path, references: &[Arc<LoadedAssembly>]) -> Result<Arc<Self>, Error> {
        let io_error = |source| Error::Io {
            path: path.to_owned(),
            source,
        };
        let bytes = std::fs::read(path).map_err(io_error)?;
        let location = path.canonicalize().map_err(io_error)?;
        let archive = Archive::from_bytes(&bytes)?;
        let uuid = archive.summary.uuid;
        Self::link(archive.into_module()?, uuid, Some(location), references)
    }

    /// Links a module that never went through an archive.
    pub fn from_module(
        module: Module,
        references: &[Arc<LoadedAssembly>],
    ) -> Result<Arc<Self>, Error> {
        Self::link(module, Uuid::new_v4(), None, references)
    }

    fn link(
        module: Module,
        uuid: Uuid,
        location: Option<PathBuf>,
        references: &[Arc<LoadedAssembly>],
    ) -> Result<Arc<Self>, Error> {
        let _span = info_span!("link", assembly = %module.name).entered();

        let links = module
            .imports
            .iter()
            .map(|import| resolve_import(&module.name, import, references))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(imports = links.len(), "linked assembly");

        Ok(Arc::new(Self {
            name: module.name.clone(),
            uuid,
            location,
            module,
            links,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Where the assembly was loaded from. Assemblies loaded from memory have no location.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn classes(self: &Arc<Self>) -> impl Iterator<Item = TypeHandle> + '_ {
        (0..self.module.classes.len()).map(move |class| TypeHandle {
            assembly: Arc::clone(self),
            class: class as u32,
        })
    }

    pub fn class(self: &Arc<Self>, name: &str) -> Option<TypeHandle> {
        self.module
            .classes
            .iter()
            .position(|class| class.name == name)
            .map(|class| TypeHandle {
                assembly: Arc::clone(self),
                class: class as u32,
            })
    }

    /// Calls the static function `class.function`.
    pub fn invoke(
        &self,
        class: &str,
        function: &str,
        arguments: Vec<Value>,
        values: &dyn ValueSource,
    ) -> Result<Value, Error> {
        self.invoke_with_limits(class, function, arguments, values, Limits::default())
    }

    pub fn invoke_with_limits(
        &self,
        class: &str,
        function: &str,
        arguments: Vec<Value>,
        values: &dyn ValueSource,
        limits: Limits,
    ) -> Result<Value, Error> {
        if self.module.class(class).is_none() {
            return Err(Error::UnknownClass {
                assembly: self.name.clone(),
                class: class.to_owned(),
            });
        }
        let index = self
            .module
            .function_index(class, function)
            .filter(|&index| {
                self.module
                    .function(index)
                    .is_some_and(|def| def.flags.contains(FunctionFlags::STATIC))
            })
            .ok_or_else(|| Error::UnknownFunction {
                class: class.to_owned(),
                function: function.to_owned(),
            })?;
        self.call(index, arguments, values, limits)
    }

    /// Calls the function flagged as the assembly's entry point.
    pub fn invoke_entry(&self, values: &dyn ValueSource) -> Result<Value, Error> {
        self.invoke_entry_with_limits(values, Limits::default())
    }

    pub fn invoke_entry_with_limits(
        &self,
        values: &dyn ValueSource,
        limits: Limits,
    ) -> Result<Value, Error> {
        let index = self
            .module
            .entry()
            .ok_or_else(|| Error::NoEntryPoint(self.name.clone()))?;
        self.call(index, vec![], values, limits)
    }

    fn call(
        &self,
        index: u32,
        arguments: Vec<Value>,
        values: &dyn ValueSource,
        limits: Limits,
    ) -> Result<Value, Error> {
        let _span = info_span!(
            "invoke",
            assembly = %self.name,
            function = %self.module.function_name(index)
        )
        .entered();
        let context = Context::with_limits(values, limits);
        Ok(interpret::call(&self.module, self, index, arguments, &context)?)
    }
}

fn resolve_import(
    assembly: &str,
    import: &Import,
    references: &[Arc<LoadedAssembly>],
) -> Result<Link, Error> {
    let reference = references
        .iter()
        .find(|reference| reference.name == import.library)
        .ok_or_else(|| Error::MissingDependency {
            assembly: assembly.to_owned(),
            library: import.library.clone(),
        })?;
    let function = reference
        .module
        .function_index(&import.class, &import.function)
        .filter(|&index| {
            reference.module.function(index).is_some_and(|def| {
                def.flags.contains(FunctionFlags::STATIC)
                    && def.return_ty == import.return_ty
                    && def.params.len() == import.params.len()
                    && def.params.iter().zip(&import.params).all(|(p, &ty)| p.ty == ty)
            })
        })
        .ok_or_else(|| Error::UnresolvedImport {
            assembly: assembly.to_owned(),
            library: import.library.clone(),
            class: import.class.clone(),
            function: import.function.clone(),
        })?;
    Ok(Link {
        assembly: Arc::clone(reference),
        function,
    })
}

impl Linkage for LoadedAssembly {
    fn call_import(
        &self,
        import: u32,
        arguments: Vec<Value>,
        context: &Context<'_>,
    ) -> Result<Value, RuntimeError> {
        let link = self
            .links
            .get(import as usize)
            .ok_or(RuntimeError::Unlinked { import })?;
        interpret::call(
            &link.assembly.module,
            &*link.assembly,
            link.function,
            arguments,
            context,
        )
    }
}

/// Exposes the assembly's classes to code compiled against it.
impl CompilerInput for LoadedAssembly {
    fn class(&self, name: &str) -> Option<ExternalClass> {
        let class = self.module.class(name)?;
        Some(ExternalClass {
            library: self.name.clone(),
            name: class.name.clone(),
            functions: class
                .functions
                .iter()
                .filter_map(|&index| self.module.function(index))
                .map(|function| ExternalFunction {
                    name: function.name.clone(),
                    flags: function.flags,
                    params: function.params.iter().map(|param| param.ty).collect(),
                    return_ty: function.return_ty,
                })
                .collect(),
        })
    }
}

impl fmt::Debug for LoadedAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedAssembly")
            .field("name", &self.name)
            .field("uuid", &self.uuid)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// A class of a loaded assembly.
#[derive(Clone)]
pub struct TypeHandle {
    assembly: Arc<LoadedAssembly>,
    class: u32,
}

impl TypeHandle {
    pub fn assembly(&self) -> &Arc<LoadedAssembly> {
        &self.assembly
    }

    fn def(&self) -> &ClassDef {
        &self.assembly.module.classes[self.class as usize]
    }

    pub fn name(&self) -> &str {
        &self.def().name
    }

    /// The class name qualified with the assembly's namespace, if it has one.
    pub fn full_name(&self) -> String {
        match &self.assembly.module.namespace {
            Some(namespace) => format!("{namespace}.{}", self.name()),
            None => self.name().to_owned(),
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.def()
            .functions
            .iter()
            .filter_map(|&index| self.assembly.module.function(index))
    }

    /// Calls one of the class's static functions.
    pub fn invoke(
        &self,
        function: &str,
        arguments: Vec<Value>,
        values: &dyn ValueSource,
    ) -> Result<Value, Error> {
        self.assembly.invoke(self.name(), function, arguments, values)
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle")
            .field("assembly", &self.assembly.name)
            .field("class", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use indoc::indoc;

    use super::*;
    use crate::{tests::compile, weld_module};

    fn math() -> Arc<LoadedAssembly> {
        let module = compile(
            "math",
            indoc! {"
                class Math {
                    static int Square(int x) { return x * x; }
                    static int Cube(int x) { return x * Square(x); }
                    int NotStatic() { return 0; }
                }
            "},
            &(),
        );
        LoadedAssembly::load(&weld_module(&module).unwrap(), &[]).unwrap()
    }

    #[test]
    fn static_functions_can_be_invoked() {
        let math = math();
        assert_eq!(
            math.invoke("Math", "Cube", vec![Value::Int(3)], &()).unwrap(),
            Value::Int(27)
        );
        assert!(matches!(
            math.invoke("Math", "NotStatic", vec![], &()),
            Err(Error::UnknownFunction { .. })
        ));
        assert!(matches!(
            math.invoke("Physics", "Square", vec![], &()),
            Err(Error::UnknownClass { .. })
        ));
    }

    #[test]
    fn imports_are_linked_to_references() {
        let references = vec![math()];
        let mut module = compile(
            "app",
            indoc! {r#"
                class App {
                    static object Run() { return Math.Square(lookup<int>("n")) + 1; }
                }
            "#},
            &references,
        );
        assert!(module.mark_entry("App", "Run"));
        let app = LoadedAssembly::load(&weld_module(&module).unwrap(), &references).unwrap();

        let values = HashMap::from([("n".to_owned(), Value::Int(7))]);
        assert_eq!(app.invoke_entry(&values).unwrap(), Value::Int(50));
    }

    #[test]
    fn missing_references_fail_to_link() {
        let references = vec![math()];
        let module = compile(
            "app",
            "class App { static int F() { return Math.Square(2); } }",
            &references,
        );
        let bytes = weld_module(&module).unwrap();
        assert!(matches!(
            LoadedAssembly::load(&bytes, &[]),
            Err(Error::MissingDependency { library, .. }) if library == "math"
        ));
    }

    #[test]
    fn changed_signatures_fail_to_link() {
        let references = vec![math()];
        let module = compile(
            "app",
            "class App { static int F() { return Math.Square(2); } }",
            &references,
        );
        let bytes = weld_module(&module).unwrap();

        let changed = compile(
            "math",
            "class Math { static float Square(float x) { return x * x; } }",
            &(),
        );
        let changed = LoadedAssembly::from_module(changed, &[]).unwrap();
        assert!(matches!(
            LoadedAssembly::load(&bytes, &[changed]),
            Err(Error::UnresolvedImport { function, .. }) if function == "Square"
        ));
    }

    #[test]
    fn files_remember_where_they_were_loaded_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("math.sar");
        let module = compile("math", "class Math { static int One() { return 1; } }", &());
        std::fs::write(&path, weld_module(&module).unwrap()).unwrap();

        let math = LoadedAssembly::load_file(&path, &[]).unwrap();
        assert_eq!(math.location(), Some(path.canonicalize().unwrap().as_path()));
        assert_eq!(math.name(), "math");

        let class = math.class("Math").unwrap();
        assert_eq!(class.name(), "Math");
        assert_eq!(class.invoke("One", vec![], &()).unwrap(), Value::Int(1));
        assert!(matches!(
            LoadedAssembly::load_file(&dir.path().join("missing.sar"), &[]),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn assemblies_without_an_entry_point_cannot_be_run() {
        assert!(matches!(math().invoke_entry(&()), Err(Error::NoEntryPoint(_))));
    }
}
