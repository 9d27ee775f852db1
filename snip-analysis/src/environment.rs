use indexmap::{IndexMap, IndexSet};
use snip_foundation::{
    errors::{Diagnostic, DiagnosticSink},
    source::Span,
};

use crate::{function::Function, module::Import};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(u32);

impl ClassId {
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

impl FunctionId {
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// A class declared in the unit being compiled.
#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    pub span: Span,
    pub functions: IndexMap<String, FunctionId>,
}

/// Everything known about the unit being compiled: its classes, function signatures, the
/// functions it imports, and the diagnostics emitted so far.
#[derive(Debug, Default)]
pub struct Environment {
    pub diagnostics: Vec<Diagnostic>,

    classes: IndexMap<String, Class>,
    functions: Vec<Function>,
    imports: IndexSet<Import>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|diagnostic| diagnostic.is_error())
    }

    /// Registers a class. Returns `Err` with the ID of the existing class if one with the same
    /// name was already registered.
    pub fn register_class(&mut self, name: &str, span: Span) -> Result<ClassId, ClassId> {
        if let Some(index) = self.classes.get_index_of(name) {
            return Err(ClassId(index as u32));
        }
        let (index, _) = self.classes.insert_full(
            name.to_owned(),
            Class {
                name: name.to_owned(),
                span,
                functions: IndexMap::new(),
            },
        );
        Ok(ClassId(index as u32))
    }

    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.classes
            .get_index_of(name)
            .map(|index| ClassId(index as u32))
    }

    pub fn get_class(&self, id: ClassId) -> &Class {
        &self.classes[id.0 as usize]
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &Class)> {
        self.classes
            .values()
            .enumerate()
            .map(|(index, class)| (ClassId(index as u32), class))
    }

    /// Registers a function in its class. Returns `Err` with the ID of the existing function if
    /// the class already has one with the same name.
    pub fn register_function(&mut self, function: Function) -> Result<FunctionId, FunctionId> {
        let class = &mut self.classes[function.class_id.0 as usize];
        if let Some(&existing) = class.functions.get(&function.name) {
            return Err(existing);
        }
        let id = FunctionId(self.functions.len() as u32);
        class.functions.insert(function.name.clone(), id);
        self.functions.push(function);
        Ok(id)
    }

    pub fn get_function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn function_ids(&self) -> impl Iterator<Item = FunctionId> {
        (0..self.functions.len() as u32).map(FunctionId)
    }

    pub fn lookup_function(&self, class_id: ClassId, name: &str) -> Option<FunctionId> {
        self.get_class(class_id).functions.get(name).copied()
    }

    /// Returns the index of `import` in the module's import table, adding it if it's not there
    /// yet.
    pub fn import(&mut self, import: Import) -> u32 {
        let (index, _) = self.imports.insert_full(import);
        index as u32
    }

    pub fn imports(&self) -> impl Iterator<Item = &Import> {
        self.imports.iter()
    }
}

impl DiagnosticSink for Environment {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.emit(diagnostic);
    }
}
