use snip_core::Type;
use snip_foundation::{
    errors::{Diagnostic, Label},
    source::{Span, Spanned},
};
use snip_syntax::ast::{BinaryOp, Expr, UnaryOp};

use crate::{
    codes,
    function::builder::FunctionBuilder,
    ir::{ArithmeticOp, CompareOp, Insn, RegisterId, Sink, Terminator},
    Compiler,
};

use super::{conversion::is_null_literal, error_register, registers_are_valid};

impl<'a> Compiler<'a> {
    pub(super) fn expr_unary(
        &mut self,
        builder: &mut FunctionBuilder,
        op: UnaryOp,
        operand: &Expr,
        span: Span,
    ) -> RegisterId {
        let operand_register = self.expr(builder, operand);
        let ty = builder.ir.register_ty(operand_register);
        if !registers_are_valid(builder, &[operand_register]) {
            return error_register(builder, span, ty);
        }

        match op {
            UnaryOp::Neg if ty.is_numeric() => {
                builder
                    .ir
                    .append_register(span, "neg", ty, Insn::Neg(operand_register))
            }
            UnaryOp::Not if ty == Type::Bool => {
                builder
                    .ir
                    .append_register(span, "not", ty, Insn::Not(operand_register))
            }
            _ => {
                self.env.diagnostics.push(
                    Diagnostic::error(
                        self.file,
                        format!("cannot apply unary operator `{}` to type `{ty}`", op.symbol()),
                    )
                    .with_code(codes::TYPE_MISMATCH)
                    .with_label(Label::primary(&span, ""))
                    .with_label(Label::secondary(operand, format!("this is `{ty}`"))),
                );
                error_register(builder, span, ty)
            }
        }
    }

    pub(super) fn expr_binary(
        &mut self,
        builder: &mut FunctionBuilder,
        left: &Expr,
        op: BinaryOp,
        op_span: Span,
        right: &Expr,
    ) -> RegisterId {
        match op {
            BinaryOp::And | BinaryOp::Or => {
                return self.expr_logical(builder, left, op, op_span, right)
            }
            _ => (),
        }

        let span = left.span().join(&right.span());
        let left_register = self.expr(builder, left);
        let right_register = self.expr(builder, right);
        let left_ty = builder.ir.register_ty(left_register);
        let right_ty = builder.ir.register_ty(right_register);

        let result_ty = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                if left_ty == Type::Float || right_ty == Type::Float {
                    Type::Float
                } else if op == BinaryOp::Add && left_ty == Type::String {
                    Type::String
                } else {
                    Type::Int
                }
            }
            _ => Type::Bool,
        };
        if !registers_are_valid(builder, &[left_register, right_register]) {
            return error_register(builder, span, result_ty);
        }

        let arithmetic = match op {
            BinaryOp::Add => Some(ArithmeticOp::Add),
            BinaryOp::Sub => Some(ArithmeticOp::Sub),
            BinaryOp::Mul => Some(ArithmeticOp::Mul),
            BinaryOp::Div => Some(ArithmeticOp::Div),
            BinaryOp::Rem => Some(ArithmeticOp::Rem),
            _ => None,
        };
        let compare = match op {
            BinaryOp::Equal => Some(CompareOp::Equal),
            BinaryOp::NotEqual => Some(CompareOp::NotEqual),
            BinaryOp::Less => Some(CompareOp::Less),
            BinaryOp::LessEqual => Some(CompareOp::LessEqual),
            BinaryOp::Greater => Some(CompareOp::Greater),
            BinaryOp::GreaterEqual => Some(CompareOp::GreaterEqual),
            _ => None,
        };

        if op == BinaryOp::Add && left_ty == Type::String && right_ty == Type::String {
            return builder.ir.append_register(
                span,
                "concat",
                Type::String,
                Insn::Concat {
                    left: left_register,
                    right: right_register,
                },
            );
        }

        if left_ty.is_numeric() && right_ty.is_numeric() {
            let operand_ty = if left_ty == Type::Float || right_ty == Type::Float {
                Type::Float
            } else {
                Type::Int
            };
            let left = self.coerce(builder, left_register, operand_ty, left.span());
            let right = self.coerce(builder, right_register, operand_ty, right.span());
            if let Some(op) = arithmetic {
                return builder.ir.append_register(
                    span,
                    "arith",
                    operand_ty,
                    Insn::Arithmetic { op, left, right },
                );
            }
            if let Some(op) = compare {
                return builder.ir.append_register(
                    span,
                    "cmp",
                    Type::Bool,
                    Insn::Compare { op, left, right },
                );
            }
        }

        if let Some(op @ (CompareOp::Equal | CompareOp::NotEqual)) = compare {
            let comparable = left_ty == right_ty
                || left_ty == Type::Object
                || right_ty == Type::Object
                || (left_ty == Type::String && is_null_literal(builder, right_register))
                || (right_ty == Type::String && is_null_literal(builder, left_register));
            if comparable && left_ty != Type::Void && right_ty != Type::Void {
                return builder.ir.append_register(
                    span,
                    "cmp",
                    Type::Bool,
                    Insn::Compare {
                        op,
                        left: left_register,
                        right: right_register,
                    },
                );
            }
        }

        self.env.diagnostics.push(
            Diagnostic::error(
                self.file,
                format!(
                    "cannot apply operator `{}` to `{left_ty}` and `{right_ty}`",
                    op.symbol()
                ),
            )
            .with_code(codes::TYPE_MISMATCH)
            .with_label(Label::primary(&op_span, ""))
            .with_label(Label::secondary(left, format!("this is `{left_ty}`")))
            .with_label(Label::secondary(right, format!("this is `{right_ty}`"))),
        );
        error_register(builder, span, result_ty)
    }

    /// Lowers `&&` and `||`, which only evaluate their right-hand side if the left-hand side does
    /// not decide the result already.
    fn expr_logical(
        &mut self,
        builder: &mut FunctionBuilder,
        left: &Expr,
        op: BinaryOp,
        op_span: Span,
        right: &Expr,
    ) -> RegisterId {
        let span = left.span().join(&right.span());
        let result = builder.ir.add_local(format!("{}_result", op_name(op)), Type::Bool);

        let left_register = self.expr(builder, left);
        self.ensure_logical_operand(builder, op, op_span, left, left_register);
        builder
            .ir
            .append_sink(left.span(), Sink::Store(result, left_register));
        let left_end = builder.ir.cursor();

        let rhs_begin = builder.ir.append_basic_block(&format!("{}_rhs", op_name(op)));
        let right_register = self.expr(builder, right);
        self.ensure_logical_operand(builder, op, op_span, right, right_register);
        builder
            .ir
            .append_sink(right.span(), Sink::Store(result, right_register));
        let rhs_end = builder.ir.cursor();

        let past = builder.ir.append_basic_block(&format!("past_{}", op_name(op)));
        let value = builder
            .ir
            .append_register(span, op_name(op), Type::Bool, Insn::Local(result));

        builder.ir.set_cursor(left_end);
        builder.ir.set_terminator(match op {
            BinaryOp::And => Terminator::GotoIf {
                condition: left_register,
                if_true: rhs_begin,
                if_false: past,
            },
            _ => Terminator::GotoIf {
                condition: left_register,
                if_true: past,
                if_false: rhs_begin,
            },
        });
        builder.ir.set_cursor(rhs_end);
        builder.ir.set_terminator(Terminator::Goto(past));
        builder.ir.set_cursor(past);

        value
    }

    fn ensure_logical_operand(
        &mut self,
        builder: &FunctionBuilder,
        op: BinaryOp,
        op_span: Span,
        operand: &Expr,
        register: RegisterId,
    ) {
        let ty = builder.ir.register_ty(register);
        if ty != Type::Bool && !builder.ir.is_error(register) {
            self.env.diagnostics.push(
                Diagnostic::error(
                    self.file,
                    format!("operands of `{}` must be `bool`, but this is `{ty}`", op.symbol()),
                )
                .with_code(codes::TYPE_MISMATCH)
                .with_label(Label::primary(operand, ""))
                .with_label(Label::secondary(&op_span, "operator used here")),
            );
        }
    }
}

fn op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::And => "and",
        _ => "or",
    }
}
