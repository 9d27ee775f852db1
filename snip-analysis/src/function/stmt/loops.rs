use snip_syntax::ast::{Expr, Stmt};

use crate::{function::builder::FunctionBuilder, ir::Terminator, Compiler};

impl<'a> Compiler<'a> {
    pub(super) fn while_stmt(&mut self, builder: &mut FunctionBuilder, cond: &Expr, body: &Stmt) {
        let before_cond = builder.ir.cursor();

        let while_cond_begin = builder.ir.append_basic_block("while_cond");
        let condition = self.expr(builder, cond);
        self.ensure_cond_is_bool(builder, cond, condition);
        let while_cond_end = builder.ir.cursor();

        let while_body_begin = builder.ir.append_basic_block("while_body");
        self.scoped_stmt(builder, body);
        builder
            .ir
            .set_terminator(Terminator::Goto(while_cond_begin));

        let past_while = builder.ir.append_basic_block("past_while");

        builder.ir.set_cursor(before_cond);
        builder
            .ir
            .set_terminator(Terminator::Goto(while_cond_begin));

        builder.ir.set_cursor(while_cond_end);
        builder.ir.set_terminator(Terminator::GotoIf {
            condition,
            if_true: while_body_begin,
            if_false: past_while,
        });

        builder.ir.set_cursor(past_while);
    }
}
