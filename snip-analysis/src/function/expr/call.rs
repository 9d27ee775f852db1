use snip_core::Type;
use snip_foundation::{
    errors::{Diagnostic, Label},
    source::{Span, Spanned},
};
use snip_syntax::ast::{Expr, Ident};

use crate::{
    codes,
    function::{builder::FunctionBuilder, FunctionFlags},
    ir::{Callee, Insn, RegisterId},
    Compiler, Import,
};

use super::error_register;

/// A function that a call expression was resolved to.
struct CallTarget {
    /// `Class.Function`, for diagnostics.
    name: String,
    callee: Callee,
    params: Vec<Type>,
    return_ty: Type,
}

impl<'a> Compiler<'a> {
    pub(super) fn expr_call(
        &mut self,
        builder: &mut FunctionBuilder,
        function: &Expr,
        args: &[Expr],
        span: Span,
    ) -> RegisterId {
        let target = self.resolve_call_target(builder, function);
        // Arguments are analyzed even if the function could not be found, so that their own
        // errors are reported too.
        let arguments: Vec<_> = args.iter().map(|arg| self.expr(builder, arg)).collect();

        let Some(target) = target else {
            return error_register(builder, span, Type::Object);
        };

        if arguments.len() != target.params.len() {
            self.env.diagnostics.push(
                Diagnostic::error(
                    self.file,
                    format!(
                        "function `{}` takes {} argument(s) but {} were supplied",
                        target.name,
                        target.params.len(),
                        arguments.len()
                    ),
                )
                .with_code(codes::WRONG_ARGUMENT_COUNT)
                .with_label(Label::primary(&span, ""))
                .with_note(format!(
                    "the function's parameters are ({})",
                    target
                        .params
                        .iter()
                        .map(|ty| ty.keyword())
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
            );
            return error_register(builder, span, target.return_ty);
        }

        let arguments = arguments
            .into_iter()
            .zip(args)
            .zip(&target.params)
            .map(|((register, arg), &ty)| self.coerce(builder, register, ty, arg.span()))
            .collect();
        builder.ir.append_register(
            span,
            format!("call_{}", target.name.replace('.', "_")),
            target.return_ty,
            Insn::Call {
                callee: target.callee,
                arguments,
            },
        )
    }

    fn resolve_call_target(
        &mut self,
        builder: &FunctionBuilder,
        function: &Expr,
    ) -> Option<CallTarget> {
        match function {
            Expr::Ident(name) => self.resolve_function_in_own_class(builder, name),
            Expr::Member { left, field } => match &**left {
                Expr::Ident(class_name) => {
                    if builder.lookup_local(&class_name.name).is_some() {
                        self.unsupported_callee(
                            function,
                            "functions cannot be called on values",
                        );
                        None
                    } else {
                        self.resolve_static_function(class_name, field)
                    }
                }
                _ => {
                    self.unsupported_callee(function, "only `Class.Function` paths can be called");
                    None
                }
            },
            _ => {
                self.unsupported_callee(function, "this expression cannot be called");
                None
            }
        }
    }

    fn resolve_function_in_own_class(
        &mut self,
        builder: &FunctionBuilder,
        name: &Ident,
    ) -> Option<CallTarget> {
        let class = self.env.get_class(builder.class_id);
        let class_name = class.name.clone();
        match self.env.lookup_function(builder.class_id, &name.name) {
            Some(id) => {
                let function = self.env.get_function(id);
                Some(CallTarget {
                    name: format!("{class_name}.{}", function.name),
                    callee: Callee::Local(id.to_u32()),
                    params: function.params.iter().map(|param| param.ty).collect(),
                    return_ty: function.return_ty,
                })
            }
            None => {
                let mut diagnostic = Diagnostic::error(
                    self.file,
                    format!(
                        "cannot find function `{}` in class `{class_name}`",
                        name.name
                    ),
                )
                .with_code(codes::UNKNOWN_FUNCTION)
                .with_label(Label::primary(name, "not found"));
                if builder.lookup_local(&name.name).is_some() {
                    diagnostic = diagnostic
                        .with_note(format!("`{}` is a variable, not a function", name.name));
                }
                self.env.diagnostics.push(diagnostic);
                None
            }
        }
    }

    /// Resolves `Class.Function`, looking in the unit first and in referenced libraries second.
    fn resolve_static_function(&mut self, class_name: &Ident, name: &Ident) -> Option<CallTarget> {
        let full_name = format!("{}.{}", class_name.name, name.name);

        if let Some(class_id) = self.env.class_id(&class_name.name) {
            let Some(id) = self.env.lookup_function(class_id, &name.name) else {
                self.unknown_function_in_class(class_name, name);
                return None;
            };
            let function = self.env.get_function(id);
            let is_static = function.flags.contains(FunctionFlags::STATIC);
            let target = CallTarget {
                name: full_name,
                callee: Callee::Local(id.to_u32()),
                params: function.params.iter().map(|param| param.ty).collect(),
                return_ty: function.return_ty,
            };
            if !is_static {
                self.not_static(&target.name, name);
                return None;
            }
            return Some(target);
        }

        if let Some(class) = self.input.class(&class_name.name) {
            let Some(function) = class.function(&name.name) else {
                self.unknown_function_in_class(class_name, name);
                return None;
            };
            if !function.flags.contains(FunctionFlags::STATIC) {
                self.not_static(&full_name, name);
                return None;
            }
            let index = self.env.import(Import {
                library: class.library.clone(),
                class: class.name.clone(),
                function: function.name.clone(),
                params: function.params.clone(),
                return_ty: function.return_ty,
            });
            return Some(CallTarget {
                name: full_name,
                callee: Callee::Import(index),
                params: function.params.clone(),
                return_ty: function.return_ty,
            });
        }

        self.env.diagnostics.push(
            Diagnostic::error(
                self.file,
                format!("the class `{}` could not be found", class_name.name),
            )
            .with_code(codes::UNKNOWN_TYPE)
            .with_label(Label::primary(class_name, "not found"))
            .with_note("help: classes from other libraries can be used after adding a reference to them"),
        );
        None
    }

    fn unknown_function_in_class(&mut self, class_name: &Ident, name: &Ident) {
        self.env.diagnostics.push(
            Diagnostic::error(
                self.file,
                format!(
                    "cannot find function `{}` in class `{}`",
                    name.name, class_name.name
                ),
            )
            .with_code(codes::UNKNOWN_FUNCTION)
            .with_label(Label::primary(name, "not found")),
        );
    }

    fn not_static(&mut self, full_name: &str, name: &Ident) {
        self.env.diagnostics.push(
            Diagnostic::error(self.file, format!("function `{full_name}` is not static"))
                .with_code(codes::UNKNOWN_FUNCTION)
                .with_label(Label::primary(name, ""))
                .with_note("only static functions can be called through their class name"),
        );
    }

    fn unsupported_callee(&mut self, function: &Expr, message: &str) {
        self.env.diagnostics.push(
            Diagnostic::error(self.file, message)
                .with_code(codes::UNSUPPORTED)
                .with_label(Label::primary(function, "")),
        );
    }
}
