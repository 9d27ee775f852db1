//! Name resolution, type checking and lowering of Snip syntax trees to IR.

pub mod codes;
mod environment;
pub mod function;
mod input;
pub mod ir;
mod module;

use snip_foundation::{
    errors::{Diagnostic, DiagnosticSink, Label},
    source::SourceFileId,
};
use snip_syntax::ast::Unit;
use thiserror::Error;
use tracing::{debug, info_span};

pub use environment::*;
pub use input::*;
pub use ir::interpret::{Context, Limits, Linkage, RuntimeError, ValueSource};
pub use module::*;

use crate::function::{Function, FunctionFlags, Param};

/// Full compiler state.
pub struct Compiler<'a> {
    /// The file diagnostics are reported against.
    pub file: SourceFileId,
    pub env: &'a mut Environment,
    pub input: &'a dyn CompilerInput,
}

/// Compilation failed irrecoverably.
///
/// No artifacts were produced; the environment can be checked to obtain detailed diagnostics on
/// why the error occurred.
#[derive(Debug, Error)]
#[error("compilation failed with {errors} error(s)")]
pub struct CompileError {
    pub errors: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(file: SourceFileId, env: &'a mut Environment, input: &'a dyn CompilerInput) -> Self {
        Self { file, env, input }
    }

    /// Compiles a unit into a module named `module_name`.
    ///
    /// Every function body is analyzed even after errors are found, so that as many diagnostics
    /// as possible end up in the environment.
    pub fn compile_unit(&mut self, unit: &Unit, module_name: &str) -> Result<Module, CompileError> {
        let _span = info_span!("compile_unit", module = module_name).entered();

        self.declare_unit(unit);
        let irs: Vec<_> = self
            .env
            .function_ids()
            .collect::<Vec<_>>()
            .into_iter()
            .map(|function_id| self.function_ir(function_id))
            .collect();

        let errors = self
            .env
            .diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.is_error())
            .count();
        debug!(
            diagnostics = self.env.diagnostics.len(),
            errors, "analyzed unit"
        );
        if errors > 0 {
            return Err(CompileError { errors });
        }

        let classes = self
            .env
            .classes()
            .map(|(_, class)| ClassDef {
                name: class.name.clone(),
                functions: class.functions.values().map(|id| id.to_u32()).collect(),
            })
            .collect();
        let functions = self
            .env
            .function_ids()
            .zip(irs)
            .map(|(id, ir)| {
                let function = self.env.get_function(id);
                FunctionDef {
                    class: function.class_id.to_u32(),
                    name: function.name.clone(),
                    flags: function.flags,
                    params: function
                        .params
                        .iter()
                        .map(|param| ParamDef {
                            name: param.name.clone(),
                            ty: param.ty,
                        })
                        .collect(),
                    return_ty: function.return_ty,
                    ir,
                }
            })
            .collect();

        Ok(Module {
            name: module_name.to_owned(),
            namespace: unit.namespace.as_ref().map(|path| {
                path.segments
                    .iter()
                    .map(|segment| &*segment.name)
                    .collect::<Vec<_>>()
                    .join(".")
            }),
            classes,
            functions,
            imports: self.env.imports().cloned().collect(),
        })
    }

    /// Registers the classes of a unit and the signatures of their functions.
    fn declare_unit(&mut self, unit: &Unit) {
        for class in &unit.classes {
            let class_id = match self.env.register_class(&class.name.name, class.name.span) {
                Ok(id) => id,
                Err(existing) => {
                    let previous = self.env.get_class(existing).span;
                    self.env.emit(
                        Diagnostic::error(
                            self.file,
                            format!("the class `{}` is defined multiple times", class.name.name),
                        )
                        .with_code(codes::REDEFINITION)
                        .with_label(Label::primary(&class.name, "redefined here"))
                        .with_label(Label::secondary(&previous, "previous definition is here")),
                    );
                    continue;
                }
            };

            for function in &class.functions {
                let return_ty = self
                    .resolve_type(&function.return_ty)
                    .unwrap_or(snip_core::Type::Object);
                let params = function
                    .params
                    .iter()
                    .map(|param| Param {
                        name: param.name.name.to_string(),
                        span: param.name.span,
                        ty: self.param_type(param),
                    })
                    .collect();
                let mut flags = FunctionFlags::empty();
                if function.is_static {
                    flags |= FunctionFlags::STATIC;
                }

                let signature = Function {
                    class_id,
                    name: function.name.name.to_string(),
                    name_span: function.name.span,
                    flags,
                    params,
                    return_ty,
                    syntax: function.clone(),
                };
                if let Err(existing) = self.env.register_function(signature) {
                    let previous = self.env.get_function(existing).name_span;
                    self.env.emit(
                        Diagnostic::error(
                            self.file,
                            format!(
                                "the function `{}` is defined multiple times in class `{}`",
                                function.name.name, class.name.name
                            ),
                        )
                        .with_code(codes::REDEFINITION)
                        .with_label(Label::primary(&function.name, "redefined here"))
                        .with_label(Label::secondary(&previous, "previous definition is here"))
                        .with_note("functions cannot be overloaded"),
                    );
                }
            }
        }
    }

    fn param_type(&mut self, param: &snip_syntax::ast::Param) -> snip_core::Type {
        match self.resolve_type(&param.ty) {
            Some(snip_core::Type::Void) => {
                self.env.emit(
                    Diagnostic::error(self.file, "parameters cannot have type `void`")
                        .with_code(codes::TYPE_MISMATCH)
                        .with_label(Label::primary(&param.ty, "")),
                );
                snip_core::Type::Object
            }
            Some(ty) => ty,
            None => snip_core::Type::Object,
        }
    }
}

/// The outcome of [`compile`].
#[derive(Debug)]
pub struct Compilation {
    /// `None` if any error was reported.
    pub module: Option<Module>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compiles a unit in a fresh environment.
pub fn compile(
    file: SourceFileId,
    unit: &Unit,
    module_name: &str,
    input: &dyn CompilerInput,
) -> Compilation {
    let mut env = Environment::new();
    let module = Compiler::new(file, &mut env, input)
        .compile_unit(unit, module_name)
        .ok();
    Compilation {
        module,
        diagnostics: env.diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use indoc::indoc;
    use snip_core::{Type, Value};
    use snip_foundation::source::{SourceFile, SourceFileSet};

    use super::*;
    use crate::ir::{dump::DumpFunction, interpret};

    struct Compiled {
        files: SourceFileSet,
        file: SourceFileId,
        compilation: Compilation,
    }

    fn compile_with(source: &str, input: &dyn CompilerInput) -> Compiled {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.snip", source));
        let unit = snip_syntax::parse_unit(file, source).expect("test source must parse");
        let compilation = compile(file, &unit, "test", input);
        Compiled {
            files,
            file,
            compilation,
        }
    }

    fn compile_ok(source: &str) -> Module {
        let compiled = compile_with(source, &());
        match compiled.compilation.module {
            Some(module) => module,
            None => panic!(
                "compilation failed:\n{}",
                snip_foundation::errors::render_all(
                    &compiled.files,
                    &compiled.compilation.diagnostics
                )
            ),
        }
    }

    fn error_codes(source: &str) -> Vec<String> {
        let compiled = compile_with(source, &());
        assert!(compiled.compilation.module.is_none());
        compiled
            .compilation
            .diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.is_error())
            .filter_map(|diagnostic| diagnostic.code.clone())
            .collect()
    }

    fn run(module: &Module, function: &str, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        run_with(module, function, arguments, &())
    }

    fn run_with(
        module: &Module,
        function: &str,
        arguments: Vec<Value>,
        values: &dyn ValueSource,
    ) -> Result<Value, RuntimeError> {
        let index = module
            .function_index("C", function)
            .expect("function must exist");
        interpret::call(module, &(), index, arguments, &Context::new(values))
    }

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        let module = compile_ok("class C { static float F() { return 1 + 2.5 * 2; } }");
        assert_eq!(run(&module, "F", vec![]), Ok(Value::Float(6.0)));
    }

    #[test]
    fn loops_and_locals() {
        let module = compile_ok(indoc! {"
            class C {
                static int Sum(int n) {
                    var total = 0;
                    int i = 1;
                    while (i <= n) {
                        total = total + i;
                        i = i + 1;
                    }
                    return total;
                }
            }
        "});
        assert_eq!(run(&module, "Sum", vec![Value::Int(10)]), Ok(Value::Int(55)));
        assert_eq!(run(&module, "Sum", vec![Value::Int(0)]), Ok(Value::Int(0)));
    }

    #[test]
    fn recursion_and_branches() {
        let module = compile_ok(indoc! {"
            class C {
                static int Fib(int n) {
                    if (n < 2) return n;
                    else return Fib(n - 1) + Fib(n - 2);
                }
            }
        "});
        assert_eq!(run(&module, "Fib", vec![Value::Int(15)]), Ok(Value::Int(610)));
    }

    #[test]
    fn logical_operators_short_circuit() {
        let module = compile_ok(indoc! {"
            class C {
                static bool And() { return false && Boom(); }
                static bool Or() { return true || Boom(); }
                static bool Boom() { return 1 / 0 == 0; }
            }
        "});
        assert_eq!(run(&module, "And", vec![]), Ok(Value::Bool(false)));
        assert_eq!(run(&module, "Or", vec![]), Ok(Value::Bool(true)));
        assert_eq!(run(&module, "Boom", vec![]), Err(RuntimeError::DivisionByZero));
    }

    #[test]
    fn strings_concatenate_and_compare() {
        let module = compile_ok(indoc! {r#"
            class C {
                static string Greet(string name) { return "hello, " + name; }
                static bool IsNull(string s) { return s == null; }
            }
        "#});
        assert_eq!(
            run(&module, "Greet", vec![Value::from("world")]),
            Ok(Value::from("hello, world"))
        );
        assert_eq!(run(&module, "IsNull", vec![Value::Null]), Ok(Value::Bool(true)));
        assert_eq!(run(&module, "IsNull", vec![Value::from("")]), Ok(Value::Bool(false)));
    }

    #[test]
    fn object_functions_fall_back_to_null() {
        let module = compile_ok(indoc! {"
            class C {
                static object Nothing() { var x = 1; }
                static void Effect() {}
                static object FromVoid() { return Effect(); }
            }
        "});
        assert_eq!(run(&module, "Nothing", vec![]), Ok(Value::Null));
        assert_eq!(run(&module, "FromVoid", vec![]), Ok(Value::Null));
    }

    #[test]
    fn lookups_read_from_the_value_source() {
        let module = compile_ok(r#"class C { static int F() { return lookup<int>("x") + 1; } }"#);
        let mut values = HashMap::new();
        values.insert("x".to_owned(), Value::Int(41));
        assert_eq!(run_with(&module, "F", vec![], &values), Ok(Value::Int(42)));

        values.insert("x".to_owned(), Value::from("41"));
        assert_eq!(
            run_with(&module, "F", vec![], &values),
            Err(RuntimeError::ValueType {
                key: "x".into(),
                expected: Type::Int,
                found: Type::String,
            })
        );
        assert_eq!(
            run(&module, "F", vec![]),
            Err(RuntimeError::MissingValue { key: "x".into() })
        );
    }

    #[test]
    fn runaway_loops_hit_the_step_limit() {
        let module = compile_ok("class C { static void Spin() { while (true) {} } }");
        let index = module.function_index("C", "Spin").unwrap();
        let context = Context::with_limits(
            &(),
            Limits {
                max_steps: 100,
                ..Limits::default()
            },
        );
        assert_eq!(
            interpret::call(&module, &(), index, vec![], &context),
            Err(RuntimeError::StepLimit(100))
        );
    }

    #[test]
    fn unresolved_names_point_at_the_name() {
        let source = "class C { static int F() { return y + 1; } }";
        let compiled = compile_with(source, &());
        let diagnostic = compiled
            .compilation
            .diagnostics
            .iter()
            .find(|diagnostic| diagnostic.has_code(codes::UNRESOLVED_NAME))
            .expect("unresolved name must be reported");
        let span = diagnostic.primary_span().unwrap();
        assert_eq!(compiled.files.span(compiled.file, &span), "y");
        // The error register stands in for `y`, so `+` doesn't report anything else.
        assert_eq!(compiled.compilation.diagnostics.len(), 1);
    }

    #[test]
    fn assigning_to_an_undeclared_name_is_an_unresolved_name() {
        assert_eq!(
            error_codes("class C { static void F() { x = 1; } }"),
            [codes::UNRESOLVED_NAME]
        );
    }

    #[test]
    fn arguments_of_unknown_functions_are_still_analyzed() {
        assert_eq!(
            error_codes("class C { static void F() { Missing(a); } }"),
            [codes::UNKNOWN_FUNCTION, codes::UNRESOLVED_NAME]
        );
    }

    #[test]
    fn error_codes_for_common_mistakes() {
        assert_eq!(
            error_codes("class C { static void F() { Nope.G(); } }"),
            [codes::UNKNOWN_TYPE]
        );
        assert_eq!(
            error_codes("class C { static void F() { G(1); } static void G() {} }"),
            [codes::WRONG_ARGUMENT_COUNT]
        );
        assert_eq!(
            error_codes(r#"class C { static int F() { return "one"; } }"#),
            [codes::TYPE_MISMATCH]
        );
        assert_eq!(
            error_codes("class C { static void F() { int a = 1; int a = 2; } }"),
            [codes::REDEFINITION]
        );
        assert_eq!(
            error_codes("class C { static int F() { if (true) return 1; } }"),
            [codes::MISSING_RETURN_VALUE]
        );
        assert_eq!(
            error_codes("class C { static void F() { var x = 1; x }  }"),
            [codes::MISSING_SEMICOLON]
        );
        assert_eq!(
            error_codes("class C { static void F() { C.G(); } void G() {} }"),
            [codes::UNKNOWN_FUNCTION]
        );
        assert_eq!(
            error_codes("class C { static void F() { widget w = null; } }"),
            [codes::UNKNOWN_TYPE]
        );
    }

    #[test]
    fn returning_from_both_branches_satisfies_the_return_check() {
        let module = compile_ok(indoc! {"
            class C {
                static int Sign(int x) {
                    if (x < 0) { return -1; } else { return 1; }
                }
            }
        "});
        assert_eq!(run(&module, "Sign", vec![Value::Int(-5)]), Ok(Value::Int(-1)));
    }

    struct MathLibrary;

    impl CompilerInput for MathLibrary {
        fn class(&self, name: &str) -> Option<ExternalClass> {
            (name == "Math").then(|| ExternalClass {
                library: "math".into(),
                name: "Math".into(),
                functions: vec![ExternalFunction {
                    name: "Square".into(),
                    flags: FunctionFlags::STATIC,
                    params: vec![Type::Int],
                    return_ty: Type::Int,
                }],
            })
        }
    }

    struct Squarer;

    impl Linkage for Squarer {
        fn call_import(
            &self,
            import: u32,
            arguments: Vec<Value>,
            _: &Context<'_>,
        ) -> Result<Value, RuntimeError> {
            assert_eq!(import, 0);
            let x = arguments[0].as_int().unwrap();
            Ok(Value::Int(x * x))
        }
    }

    #[test]
    fn library_functions_become_imports() {
        let compiled = compile_with(
            "class C { static int F() { return Math.Square(3) + Math.Square(4); } }",
            &MathLibrary,
        );
        let module = compiled.compilation.module.unwrap();
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.dependencies(), ["math"]);

        let index = module.function_index("C", "F").unwrap();
        assert_eq!(
            interpret::call(&module, &Squarer, index, vec![], &Context::new(&())),
            Ok(Value::Int(25))
        );
    }

    #[test]
    fn entry_points_must_be_static_and_parameterless() {
        let mut module = compile_ok(indoc! {"
            class C {
                static object Run() { return 1; }
                static object WithParam(int x) { return x; }
                object Instance() { return 2; }
            }
        "});
        assert!(!module.mark_entry("C", "WithParam"));
        assert!(!module.mark_entry("C", "Instance"));
        assert_eq!(module.entry(), None);
        assert!(module.mark_entry("C", "Run"));
        assert_eq!(module.entry(), module.function_index("C", "Run"));
    }

    #[test]
    fn dump_lists_blocks_and_registers() {
        let module = compile_ok("class C { static int F(int x) { return x * 2; } }");
        let dump = DumpFunction {
            module: &module,
            function: &module.functions[0],
        }
        .to_string();
        assert!(dump.starts_with("static int F(int x) {"), "{dump}");
        assert!(dump.contains("param int $x"), "{dump}");
        assert!(dump.contains("entry_0:"), "{dump}");
        assert!(dump.contains("mul %x_"), "{dump}");
        assert!(dump.contains("return %arith_"), "{dump}");
    }
}
