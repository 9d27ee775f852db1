use snip_core::Type;
use snip_foundation::{
    errors::{Diagnostic, Label},
    source::{Span, Spanned},
};
use snip_syntax::ast::{Local, LocalType};

use crate::{
    codes,
    function::builder::{FunctionBuilder, ScopedLocal},
    ir::{LocalId, Sink},
    Compiler,
};

impl<'a> Compiler<'a> {
    /// Declares a local in the current scope, reporting a redefinition if a local with the same
    /// name is already visible.
    pub(crate) fn declare_local(
        &mut self,
        builder: &mut FunctionBuilder,
        name: &str,
        span: Span,
        ty: Type,
    ) -> LocalId {
        if let Some(previous) = builder.lookup_local(name) {
            let mut diagnostic = Diagnostic::error(
                self.file,
                format!("a local variable named `{name}` is already defined in this scope"),
            )
            .with_code(codes::REDEFINITION)
            .with_label(Label::primary(&span, "redefined here"));
            if !previous.span.is_empty() {
                diagnostic =
                    diagnostic.with_label(Label::secondary(&previous.span, "previous definition is here"));
            }
            self.env.diagnostics.push(diagnostic);
        }

        let id = builder.ir.add_local(name, ty);
        builder.add_to_scope(ScopedLocal {
            name: name.to_owned(),
            id,
            span,
        });
        id
    }

    pub(super) fn local_stmt(&mut self, builder: &mut FunctionBuilder, local: &Local) {
        let init = self.expr(builder, &local.init);
        let init_ty = builder.ir.register_ty(init);

        let (ty, value) = match &local.ty {
            LocalType::Explicit(type_expr) => match self.resolve_type(type_expr) {
                Some(Type::Void) => {
                    self.void_local(type_expr.name.span);
                    (Type::Object, init)
                }
                Some(ty) => (ty, self.coerce(builder, init, ty, local.init.span())),
                None => (Type::Object, init),
            },
            LocalType::Inferred(span) => {
                if init_ty == Type::Void && !builder.ir.is_error(init) {
                    self.void_local(*span);
                    (Type::Object, init)
                } else {
                    (init_ty, init)
                }
            }
        };

        let id = self.declare_local(builder, &local.name.name, local.name.span, ty);
        builder.ir.append_sink(local.span, Sink::Store(id, value));
    }

    fn void_local(&mut self, span: Span) {
        self.env.diagnostics.push(
            Diagnostic::error(self.file, "variables cannot have type `void`")
                .with_code(codes::TYPE_MISMATCH)
                .with_label(Label::primary(&span, "")),
        );
    }
}
