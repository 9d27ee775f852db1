use snip_core::Type;
use snip_foundation::{
    errors::{Diagnostic, Label},
    source::Spanned,
};
use snip_syntax::ast::{Expr, Ident};

use crate::{
    codes,
    function::builder::FunctionBuilder,
    ir::{Insn, RegisterId, Sink},
    Compiler,
};

use super::error_register;

impl<'a> Compiler<'a> {
    pub(super) fn expr_ident(&mut self, builder: &mut FunctionBuilder, ident: &Ident) -> RegisterId {
        match builder.lookup_local(&ident.name) {
            Some(local) => {
                let id = local.id;
                let ty = builder.ir.local_ty(id);
                builder
                    .ir
                    .append_register(ident.span, ident.name.to_string(), ty, Insn::Local(id))
            }
            None => {
                self.unresolved_name(ident);
                error_register(builder, ident.span, Type::Object)
            }
        }
    }

    pub(super) fn expr_assign(
        &mut self,
        builder: &mut FunctionBuilder,
        target: &Ident,
        value: &Expr,
    ) -> RegisterId {
        let local = builder.lookup_local(&target.name).map(|local| local.id);
        let rvalue = self.expr(builder, value);
        let span = target.span.join(&value.span());
        match local {
            Some(id) => {
                let ty = builder.ir.local_ty(id);
                let rvalue = self.coerce(builder, rvalue, ty, value.span());
                builder.ir.append_sink(span, Sink::Store(id, rvalue));
                builder
                    .ir
                    .append_register(span, target.name.to_string(), ty, Insn::Local(id))
            }
            None => {
                self.unresolved_name(target);
                error_register(builder, span, Type::Object)
            }
        }
    }

    /// The primary label of this diagnostic covers exactly the name, so that the name can be
    /// recovered from the diagnostic alone.
    fn unresolved_name(&mut self, ident: &Ident) {
        self.env.diagnostics.push(
            Diagnostic::error(
                self.file,
                format!("the name `{}` does not exist in the current context", ident.name),
            )
            .with_code(codes::UNRESOLVED_NAME)
            .with_label(Label::primary(ident, "not found in this scope")),
        );
    }
}
