mod cond;
mod local;
mod loops;
mod ret;

use snip_foundation::{
    errors::{Diagnostic, Label},
    source::{Span, Spanned},
};
use snip_syntax::ast::{self, Stmt};

use crate::{codes, ir::Sink, Compiler};

use super::builder::FunctionBuilder;

impl<'a> Compiler<'a> {
    pub(crate) fn block(&mut self, builder: &mut FunctionBuilder, block: &ast::Block) {
        builder.push_scope();
        for stmt in &block.stmts {
            self.stmt(builder, stmt);
        }
        builder.pop_scope();
    }

    pub(crate) fn stmt(&mut self, builder: &mut FunctionBuilder, stmt: &Stmt) {
        match stmt {
            Stmt::Empty { span } => self.empty_stmt(*span),
            Stmt::Block(block) => self.block(builder, block),
            Stmt::Local(local) => self.local_stmt(builder, local),
            Stmt::If {
                cond,
                then,
                otherwise,
                ..
            } => self.if_stmt(builder, cond, then, otherwise.as_deref()),
            Stmt::While { cond, body, .. } => self.while_stmt(builder, cond, body),
            Stmt::Return { value, span } => self.return_stmt(builder, *span, value.as_ref()),
            Stmt::Expr {
                expr, semicolon, ..
            } => {
                let register = self.expr(builder, expr);
                if !semicolon {
                    self.missing_semicolon(expr.span());
                }
                builder.ir.append_sink(expr.span(), Sink::Discard(register));
            }
        }
    }

    /// Lowers a statement that introduces its own scope, such as the body of an `if` or `while`.
    fn scoped_stmt(&mut self, builder: &mut FunctionBuilder, stmt: &Stmt) {
        builder.push_scope();
        self.stmt(builder, stmt);
        builder.pop_scope();
    }

    fn empty_stmt(&mut self, span: Span) {
        self.env.diagnostics.push(
            Diagnostic::warning(self.file, "empty statement has no effect")
                .with_label(Label::primary(&span, "this `;` does nothing")),
        );
    }

    fn missing_semicolon(&mut self, span: Span) {
        self.env.diagnostics.push(
            Diagnostic::error(self.file, "missing `;` after expression statement")
                .with_code(codes::MISSING_SEMICOLON)
                .with_label(Label::primary(&span, "add a `;` after this expression"))
                .with_note("only the final expression of a snippet may omit its `;`"),
        );
    }}
