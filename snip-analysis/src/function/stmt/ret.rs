use snip_core::Type;
use snip_foundation::{
    errors::{Diagnostic, Label, ReplacementSuggestion},
    source::{Span, Spanned},
};
use snip_syntax::ast::Expr;

use crate::{
    codes,
    function::builder::FunctionBuilder,
    ir::{Insn, Terminator},
    Compiler,
};

impl<'a> Compiler<'a> {
    pub(super) fn return_stmt(
        &mut self,
        builder: &mut FunctionBuilder,
        span: Span,
        value: Option<&Expr>,
    ) {
        let return_ty = builder.return_ty;
        let return_value = match value {
            Some(expr) => {
                let register = self.expr(builder, expr);
                let value_ty = builder.ir.register_ty(register);
                if builder.ir.is_error(register) {
                    register
                } else if return_ty == Type::Void {
                    if value_ty != Type::Void {
                        self.return_value_in_void_function(builder, span, expr);
                    }
                    register
                } else if return_ty == Type::Object && value_ty == Type::Void {
                    // Evaluates to `null`.
                    register
                } else {
                    self.coerce(builder, register, return_ty, expr.span())
                }
            }
            None => {
                if return_ty != Type::Void {
                    self.env.diagnostics.push(
                        Diagnostic::error(
                            self.file,
                            format!(
                                "function was declared to return `{}`, but no return value was provided",
                                return_ty
                            ),
                        )
                        .with_code(codes::MISSING_RETURN_VALUE)
                        .with_label(Label::primary(&span, ""))
                        .with_label(Label::secondary(
                            &builder.name_span,
                            "function declared here",
                        )),
                    );
                }
                builder
                    .ir
                    .append_register(span, "return_void", Type::Void, Insn::Void)
            }
        };

        builder.ir.set_terminator(Terminator::Return(return_value));
        let _unreachable = builder.ir.append_basic_block("unreachable_after_return");
    }

    fn return_value_in_void_function(
        &mut self,
        builder: &FunctionBuilder,
        span: Span,
        value: &Expr,
    ) {
        self.env.diagnostics.push(
            Diagnostic::error(
                self.file,
                "function does not return anything, but a return value was provided",
            )
            .with_code(codes::TYPE_MISMATCH)
            .with_label(Label::primary(value, ""))
            .with_label(Label::secondary(&builder.name_span, "function declared here"))
            .with_note((
                "help: try removing the return value",
                ReplacementSuggestion {
                    span,
                    replacement: "return;".into(),
                },
            )),
        );
    }
}
