//! Lexing and parsing of Snip source code.

pub mod ast;
pub mod diagnostics;
pub mod lexis;
mod parsing;
pub mod printer;

pub use parsing::*;

use snip_foundation::{errors::Diagnostic, source::SourceFileId};
use tracing::trace;

use crate::{ast::Unit, lexis::Lexer};

/// Parses a complete compilation unit.
///
/// Any diagnostic emitted while parsing makes the whole parse fail, even if a tree could be
/// recovered.
pub fn parse_unit(file: SourceFileId, input: &str) -> Result<Unit, Vec<Diagnostic>> {
    let mut parser = Parser::new(file, input, Lexer::new(file, input));
    let result = parser.parse::<Unit>();
    trace!(ok = result.is_ok(), errors = parser.errors.len(), "parsed unit");
    match result {
        Ok(unit) if parser.errors.is_empty() => Ok(unit),
        _ => Err(parser.errors),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use snip_foundation::source::{SourceFile, SourceFileSet, Spanned};

    use super::*;
    use crate::{
        ast::{BinaryOp, Expr, Stmt},
        diagnostics::codes,
    };

    fn parse(input: &str) -> Result<Unit, Vec<Diagnostic>> {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.snip", input));
        parse_unit(file, input)
    }

    fn parse_body(body: &str) -> Vec<Stmt> {
        let input = format!("class C {{ static object F() {{ {body} }} }}");
        let unit = parse(&input).unwrap();
        unit.classes[0].functions[0]
            .body
            .stmts
            .iter()
            .map(|stmt| (**stmt).clone())
            .collect()
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let stmts = parse_body("1 + 2 * 3;");
        let Stmt::Expr { expr, .. } = &stmts[0] else {
            panic!("expression statement expected");
        };
        let Expr::Binary { op, right, .. } = expr else {
            panic!("binary expression expected");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(**right, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn assignment_is_right_associative() {
        let stmts = parse_body("a = b = 1;");
        let Stmt::Expr { expr: Expr::Assign { value, .. }, .. } = &stmts[0] else {
            panic!("assignment expected");
        };
        assert!(matches!(**value, Expr::Assign { .. }));
    }

    #[test]
    fn trailing_expression_may_omit_semicolon() {
        let stmts = parse_body("int a = 1; a + 1");
        assert!(matches!(stmts[0], Stmt::Local(_)));
        assert!(matches!(stmts[1], Stmt::Expr { semicolon: false, .. }));
    }

    #[test]
    fn missing_semicolon_in_the_middle_of_a_block_is_an_error() {
        let errors = parse("class C { static void F() { 1 + 1 2; } }").unwrap_err();
        assert_eq!(errors[0].code.as_deref(), Some("E0004"));
    }

    #[test]
    fn lookup_intrinsic() {
        let stmts = parse_body(r#"int x = lookup<int>("x");"#);
        let Stmt::Local(local) = &stmts[0] else {
            panic!("local expected");
        };
        let Expr::Lookup { ty, key, .. } = &local.init else {
            panic!("lookup expected");
        };
        assert_eq!(&*ty.name.name, "int");
        assert_eq!(&**key, "x");
    }

    #[test]
    fn errors_in_several_statements_are_all_reported() {
        let errors = parse("class C { static void F() { var = 1; var = 2; } }").unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn printed_unit_parses_back_to_the_same_source() {
        let source = indoc! {r#"
            namespace Tests.Printing;

            class Math {
                static int Twice(int x) {
                    return x * 2;
                }

                static object Run() {
                    var s = "a\"b";
                    if (!(1 < 2) || false) {
                        return null;
                    } else return Math.Twice(-3);
                    while (true) ;
                    s
                }
            }
        "#};
        let printed = parse(source).unwrap().to_string();
        let reprinted = parse(&printed).unwrap().to_string();
        assert_eq!(printed, reprinted);
        assert!(printed.contains("return Math.Twice(-3);"));
        assert!(printed.contains(r#"var s = "a\"b";"#));
    }

    #[test]
    fn deep_nesting_is_an_error_instead_of_a_stack_overflow() {
        let depth = 10_000;
        let body = format!("return {}1{};", "(".repeat(depth), ")".repeat(depth));
        let errors = parse(&format!("class C {{ static object F() {{ {body} }} }}")).unwrap_err();
        assert!(errors.iter().any(|error| error.has_code(codes::NESTING_TOO_DEEP)));

        let blocks = format!("{}{}", "{".repeat(depth), "}".repeat(depth));
        let errors = parse(&format!("class C {{ static void F() {{ {blocks} }} }}")).unwrap_err();
        assert!(errors.iter().any(|error| error.has_code(codes::NESTING_TOO_DEEP)));

        let chain = vec!["1"; depth].join(" + ");
        let errors = parse(&format!("class C {{ static int F() {{ return {chain}; }} }}")).unwrap_err();
        assert!(errors.iter().any(|error| error.has_code(codes::NESTING_TOO_DEEP)));
    }

    #[test]
    fn nesting_below_the_limit_is_fine() {
        let depth = MAX_NESTING_DEPTH / 2;
        let body = format!("return {}1{};", "(".repeat(depth), ")".repeat(depth));
        let stmts = parse_body(&body);
        assert!(matches!(stmts[0], Stmt::Return { .. }));
        let chain = vec!["1"; depth].join(" + ");
        parse_body(&format!("return {chain};"));
    }

    #[test]
    fn spans_cover_whole_constructs() {
        let input = "class C { static int F() { return 1 + 2; } }";
        let unit = parse(input).unwrap();
        let function = &unit.classes[0].functions[0];
        assert_eq!(function.span.get_input(input), "static int F() { return 1 + 2; }");
        assert_eq!(
            function.body.stmts[0].span().get_input(input),
            "return 1 + 2;"
        );
    }
}
