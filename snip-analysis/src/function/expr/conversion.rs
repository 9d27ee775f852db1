use snip_core::{Type, Value};
use snip_foundation::{
    errors::{Diagnostic, Label},
    source::Span,
};

use crate::{
    codes,
    function::builder::FunctionBuilder,
    ir::{Insn, RegisterId},
    Compiler,
};

use super::error_register;

impl<'a> Compiler<'a> {
    /// Converts the value of a register so that it can be used where `expected_ty` is expected.
    ///
    /// Emits a type mismatch error if there is no implicit conversion between the two types.
    pub(crate) fn coerce(
        &mut self,
        builder: &mut FunctionBuilder,
        input: RegisterId,
        expected_ty: Type,
        span: Span,
    ) -> RegisterId {
        let input_ty = builder.ir.register_ty(input);
        if builder.ir.is_error(input) || input_ty == expected_ty {
            return input;
        }

        if expected_ty.is_assignable_from(input_ty) {
            if expected_ty == Type::Float && input_ty == Type::Int {
                return builder.ir.append_register(
                    span,
                    "int_to_float",
                    Type::Float,
                    Insn::IntToFloat(input),
                );
            }
            return input;
        }

        if expected_ty == Type::String && is_null_literal(builder, input) {
            return input;
        }

        self.env.diagnostics.push(
            Diagnostic::error(self.file, "type mismatch")
                .with_code(codes::TYPE_MISMATCH)
                .with_label(Label::primary(&span, format!("this is `{input_ty}`")))
                .with_note(indoc::formatdoc! {"
                        expected `{}`
                             got `{}`
                    ",
                    expected_ty,
                    input_ty,
                }),
        );
        error_register(builder, span, expected_ty)
    }
}

pub(super) fn is_null_literal(builder: &FunctionBuilder, register: RegisterId) -> bool {
    builder
        .ir
        .register(register)
        .is_some_and(|register| register.insn == Insn::Const(Value::Null))
}
