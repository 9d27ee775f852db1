use std::{future::Future, pin::Pin};

use snip_core::{Type, Value};

/// A value the host knows about, which compiled fragments can refer to by name.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBinding {
    pub name: String,
    /// Type the name is declared with in the fragment.
    pub ty: Type,
    /// Value read by the injected declaration when the fragment runs.
    pub value: Value,
}

impl ResolvedBinding {
    /// Creates a binding typed after its value.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            ty: value.ty(),
            value,
        }
    }

    pub fn with_type(name: impl Into<String>, ty: Type, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            ty,
            value: value.into(),
        }
    }
}

pub type ResolveFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Vec<ResolvedBinding>>> + Send + 'a>>;

/// Supplies bindings for names that fragments use without declaring them.
pub trait BindingResolver: Sync {
    /// Returns every binding currently known.
    fn resolve(&self) -> ResolveFuture<'_>;
}

impl<F, Fut> BindingResolver for F
where
    F: Fn() -> Fut + Sync,
    Fut: Future<Output = anyhow::Result<Vec<ResolvedBinding>>> + Send + 'static,
{
    fn resolve(&self) -> ResolveFuture<'_> {
        Box::pin(self())
    }
}
