pub mod builder;
mod expr;
mod stmt;

use std::sync::Arc;

use bitflags::bitflags;
use snip_core::{serializable_bitflags, Type};
use snip_foundation::{
    errors::{Diagnostic, Label},
    source::Span,
};
use snip_syntax::ast;
use tracing::{debug, info_span};

use crate::{
    codes,
    environment::{ClassId, FunctionId},
    ir::{Insn, Ir, Terminator},
    Compiler,
};

use self::builder::FunctionBuilder;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FunctionFlags: u32 {
        const STATIC = 0x1;
        /// The function is the entry point of its module.
        const ENTRY  = 0x2;
    }
}

serializable_bitflags!(type FunctionFlags; validate);

/// Signature of a function declared in the unit being compiled.
#[derive(Debug, Clone)]
pub struct Function {
    pub class_id: ClassId,
    pub name: String,
    pub name_span: Span,
    pub flags: FunctionFlags,
    pub params: Vec<Param>,
    pub return_ty: Type,
    pub syntax: Arc<ast::Function>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub span: Span,
    pub ty: Type,
}

impl<'a> Compiler<'a> {
    /// Resolves a type name to a type. Emits an error and returns `None` if there is no such type.
    pub(crate) fn resolve_type(&mut self, ty: &ast::TypeExpr) -> Option<Type> {
        let resolved = Type::from_keyword(&ty.name.name);
        if resolved.is_none() {
            self.env.diagnostics.push(
                Diagnostic::error(self.file, format!("the type `{}` could not be found", ty.name.name))
                    .with_code(codes::UNKNOWN_TYPE)
                    .with_label(Label::primary(&ty.name.span, "not found"))
                    .with_note("available types are `void`, `bool`, `int`, `float`, `string` and `object`"),
            );
        }
        resolved
    }

    /// Lowers the body of a function to IR.
    pub(crate) fn function_ir(&mut self, function_id: FunctionId) -> Ir {
        let function = self.env.get_function(function_id).clone();
        let _span = info_span!("function_ir", name = %function.name).entered();

        let mut builder = FunctionBuilder::new(function_id, &function);
        for param in &function.params {
            self.declare_local(&mut builder, &param.name, param.span, param.ty);
        }
        builder.ir.set_param_count(function.params.len());

        self.block(&mut builder, &function.syntax.body);

        let end = builder.ir.cursor();
        if builder.ir.terminator(end) == Some(&Terminator::Unreachable) {
            self.finish_function(&mut builder, &function);
        }

        let ir = builder.ir.into_ir();
        debug!(
            nodes = ir.nodes.len(),
            basic_blocks = ir.basic_blocks.len(),
            "lowered function"
        );
        ir
    }

    /// Terminates the block control falls into at the end of a function's body.
    fn finish_function(&mut self, builder: &mut FunctionBuilder, function: &Function) {
        let end = builder.ir.cursor();
        match builder.return_ty {
            Type::Void | Type::Object => {
                let void = builder
                    .ir
                    .append_register(Span::EMPTY, "implicit_return", Type::Void, Insn::Void);
                builder.ir.set_terminator(Terminator::Return(void));
            }
            ty => {
                if builder.ir.is_reachable(end) {
                    self.env.diagnostics.push(
                        Diagnostic::error(self.file, format!(
                            "not all code paths of `{}` return a value",
                            function.name
                        ))
                        .with_code(codes::MISSING_RETURN_VALUE)
                        .with_label(Label::primary(
                            &function.name_span,
                            format!("function must return a value of type `{ty}`"),
                        ))
                        .with_label(Label::secondary(
                            &function.syntax.body.span,
                            "control reaches the end of this block",
                        )),
                    );
                }
            }
        }
    }
}
