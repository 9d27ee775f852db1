mod call;
mod conversion;
mod ident;
mod lit;
mod lookup;
mod ops;

use snip_core::Type;
use snip_foundation::{
    errors::{Diagnostic, Label},
    source::{Span, Spanned},
};
use snip_syntax::ast::Expr;

use crate::{
    codes,
    ir::{Insn, RegisterId},
    Compiler,
};

use super::builder::FunctionBuilder;

impl<'a> Compiler<'a> {
    pub(crate) fn expr(&mut self, builder: &mut FunctionBuilder, expr: &Expr) -> RegisterId {
        match expr {
            Expr::Lit(lit) => self.expr_lit(builder, lit),
            Expr::Ident(ident) => self.expr_ident(builder, ident),
            Expr::Unary { op, operand, span } => self.expr_unary(builder, *op, operand, *span),
            Expr::Binary {
                left,
                op,
                op_span,
                right,
            } => self.expr_binary(builder, left, *op, *op_span, right),
            Expr::Paren { inner, .. } => self.expr(builder, inner),
            Expr::Assign { target, value } => self.expr_assign(builder, target, value),
            Expr::Call {
                function,
                args,
                span,
            } => self.expr_call(builder, function, args, *span),
            Expr::Lookup { ty, key, span } => self.expr_lookup(builder, ty, key, *span),
            Expr::Member { .. } => {
                self.env.diagnostics.push(
                    Diagnostic::error(self.file, "member access is only supported in calls")
                        .with_code(codes::UNSUPPORTED)
                        .with_label(Label::primary(expr, ""))
                        .with_note("help: call a static function with `Class.Function(...)`"),
                );
                error_register(builder, expr.span(), Type::Object)
            }
        }
    }
}

/// Appends a register standing in for an expression that failed to compile.
///
/// Error registers are skipped by type checks, so that one mistake does not cascade into many
/// diagnostics.
pub(crate) fn error_register(builder: &mut FunctionBuilder, span: Span, ty: Type) -> RegisterId {
    builder.ir.append_register(span, "error", ty, Insn::Error)
}

pub(crate) fn registers_are_valid(builder: &FunctionBuilder, registers: &[RegisterId]) -> bool {
    registers
        .iter()
        .all(|&register| !builder.ir.is_error(register))
}
