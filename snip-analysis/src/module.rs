use snip_core::Type;

use crate::{function::FunctionFlags, ir::Ir};

/// The result of compiling a unit: its classes, their functions lowered to IR, and the functions
/// it imports from referenced libraries.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub namespace: Option<String>,
    pub classes: Vec<ClassDef>,
    /// Functions of all classes. [`Callee::Local`][crate::ir::Callee::Local] indexes into this.
    pub functions: Vec<FunctionDef>,
    /// [`Callee::Import`][crate::ir::Callee::Import] indexes into this.
    pub imports: Vec<Import>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    /// Indices into [`Module::functions`].
    pub functions: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    /// Index into [`Module::classes`].
    pub class: u32,
    pub name: String,
    pub flags: FunctionFlags,
    pub params: Vec<ParamDef>,
    pub return_ty: Type,
    pub ir: Ir,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub name: String,
    pub ty: Type,
}

/// A function the module calls, defined in another library.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Import {
    pub library: String,
    pub class: String,
    pub function: String,
    pub params: Vec<Type>,
    pub return_ty: Type,
}

impl Module {
    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|class| class.name == name)
    }

    /// Returns the index of the function `function` in class `class`.
    pub fn function_index(&self, class: &str, function: &str) -> Option<u32> {
        self.class(class)?
            .functions
            .iter()
            .copied()
            .find(|&index| {
                self.functions
                    .get(index as usize)
                    .is_some_and(|def| def.name == function)
            })
    }

    pub fn function(&self, index: u32) -> Option<&FunctionDef> {
        self.functions.get(index as usize)
    }

    /// Full name of a function, `Class.Function`.
    pub fn function_name(&self, index: u32) -> String {
        match self.function(index) {
            Some(function) => match self.classes.get(function.class as usize) {
                Some(class) => format!("{}.{}", class.name, function.name),
                None => function.name.clone(),
            },
            None => format!("<function {index}>"),
        }
    }

    /// The function flagged with [`FunctionFlags::ENTRY`], if any.
    pub fn entry(&self) -> Option<u32> {
        self.functions
            .iter()
            .position(|function| function.flags.contains(FunctionFlags::ENTRY))
            .map(|index| index as u32)
    }

    /// Flags `class.function` as the module's entry point. Returns `false` if there is no such
    /// function, or if it is not a static function without parameters.
    pub fn mark_entry(&mut self, class: &str, function: &str) -> bool {
        let Some(index) = self.function_index(class, function) else {
            return false;
        };
        let def = &mut self.functions[index as usize];
        if !def.flags.contains(FunctionFlags::STATIC) || !def.params.is_empty() {
            return false;
        }
        def.flags |= FunctionFlags::ENTRY;
        true
    }

    /// Names of the libraries this module imports from, in order of first import.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut libraries: Vec<&str> = vec![];
        for import in &self.imports {
            if !libraries.contains(&import.library.as_str()) {
                libraries.push(&import.library);
            }
        }
        libraries
    }
}
