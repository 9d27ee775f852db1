use snip_core::Type;
use snip_foundation::{
    errors::{Diagnostic, Label},
    source::Spanned,
};
use snip_syntax::ast::{Expr, Stmt};

use crate::{
    codes,
    function::builder::FunctionBuilder,
    ir::{RegisterId, Terminator},
    Compiler,
};

impl<'a> Compiler<'a> {
    pub(super) fn ensure_cond_is_bool(
        &mut self,
        builder: &FunctionBuilder,
        cond: &Expr,
        register_id: RegisterId,
    ) {
        let ty = builder.ir.register_ty(register_id);
        if ty != Type::Bool && !builder.ir.is_error(register_id) {
            // TODO: Suggest `x != 0` for numeric conditions and `x != null` for objects.
            self.env.diagnostics.push(
                Diagnostic::error(
                    self.file,
                    format!("condition must be a `bool`, but was found to be `{ty}`"),
                )
                .with_code(codes::TYPE_MISMATCH)
                .with_label(Label::primary(&cond.span(), "")),
            );
        }
    }

    pub(super) fn if_stmt(
        &mut self,
        builder: &mut FunctionBuilder,
        cond: &Expr,
        then: &Stmt,
        otherwise: Option<&Stmt>,
    ) {
        let condition = self.expr(builder, cond);
        self.ensure_cond_is_bool(builder, cond, condition);
        let cond_end = builder.ir.cursor();

        let if_true = builder.ir.append_basic_block("if_true");
        self.scoped_stmt(builder, then);
        let if_true_end = builder.ir.cursor();

        let if_false = otherwise.map(|otherwise| {
            let begin = builder.ir.append_basic_block("if_false");
            self.scoped_stmt(builder, otherwise);
            (begin, builder.ir.cursor())
        });

        let past_if = builder.ir.append_basic_block("past_if");

        builder.ir.set_cursor(cond_end);
        builder.ir.set_terminator(Terminator::GotoIf {
            condition,
            if_true,
            if_false: if_false.map_or(past_if, |(begin, _)| begin),
        });

        builder.ir.set_cursor(if_true_end);
        builder.ir.set_terminator(Terminator::Goto(past_if));

        if let Some((_, if_false_end)) = if_false {
            builder.ir.set_cursor(if_false_end);
            builder.ir.set_terminator(Terminator::Goto(past_if));
        }

        builder.ir.set_cursor(past_if);
    }
}
