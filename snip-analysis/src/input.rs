use std::sync::Arc;

use snip_core::Type;

use crate::function::FunctionFlags;

/// Classes the compiler can see beyond the unit being compiled.
pub trait CompilerInput {
    /// Looks up a class exported by one of the referenced libraries.
    fn class(&self, name: &str) -> Option<ExternalClass>;
}

/// A class exported by a referenced library.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalClass {
    /// Name of the library the class comes from.
    pub library: String,
    pub name: String,
    pub functions: Vec<ExternalFunction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalFunction {
    pub name: String,
    pub flags: FunctionFlags,
    pub params: Vec<Type>,
    pub return_ty: Type,
}

impl ExternalClass {
    pub fn function(&self, name: &str) -> Option<&ExternalFunction> {
        self.functions.iter().find(|function| function.name == name)
    }
}

/// No references.
impl CompilerInput for () {
    fn class(&self, _: &str) -> Option<ExternalClass> {
        None
    }
}

impl<T> CompilerInput for [T]
where
    T: CompilerInput,
{
    fn class(&self, name: &str) -> Option<ExternalClass> {
        self.iter().find_map(|input| input.class(name))
    }
}

impl<T> CompilerInput for Arc<T>
where
    T: CompilerInput + ?Sized,
{
    fn class(&self, name: &str) -> Option<ExternalClass> {
        (**self).class(name)
    }
}

impl<T> CompilerInput for Vec<T>
where
    T: CompilerInput,
{
    fn class(&self, name: &str) -> Option<ExternalClass> {
        self.as_slice().class(name)
    }
}
