use std::sync::Arc;

use snip_core::Type;
use snip_foundation::errors::{Diagnostic, Label};
use snip_foundation::source::Span;
use snip_syntax::ast::TypeExpr;

use crate::{
    codes,
    function::builder::FunctionBuilder,
    ir::{Insn, RegisterId},
    Compiler,
};

use super::error_register;

impl<'a> Compiler<'a> {
    pub(super) fn expr_lookup(
        &mut self,
        builder: &mut FunctionBuilder,
        ty: &TypeExpr,
        key: &Arc<str>,
        span: Span,
    ) -> RegisterId {
        match self.resolve_type(ty) {
            Some(Type::Void) => {
                self.env.diagnostics.push(
                    Diagnostic::error(self.file, "cannot look up a value of type `void`")
                        .with_code(codes::UNSUPPORTED)
                        .with_label(Label::primary(&ty.name, "")),
                );
                error_register(builder, span, Type::Object)
            }
            Some(ty) => builder.ir.append_register(
                span,
                format!("lookup_{key}"),
                ty,
                Insn::Lookup {
                    key: key.to_string(),
                    ty,
                },
            ),
            None => error_register(builder, span, Type::Object),
        }
    }
}
