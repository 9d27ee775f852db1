//! Wrapping fragments into complete units.

use std::sync::Arc;

use indoc::formatdoc;
use snip_syntax::ast::{Stmt, Unit};

pub const ENTRY_NAMESPACE: &str = "Snippets";
pub const ENTRY_CLASS: &str = "Snippet";
pub const ENTRY_FUNCTION: &str = "Run";

/// Wraps `fragment` into the body of the entry function, `Snippets.Snippet.Run`.
pub fn synthesize(fragment: &str) -> String {
    formatdoc! {"
        namespace {namespace};

        class {class} {{
            static object {function}() {{
        {fragment}
            }}
        }}
        ",
        namespace = ENTRY_NAMESPACE,
        class = ENTRY_CLASS,
        function = ENTRY_FUNCTION,
        fragment = fragment,
    }
}

/// Turns a trailing expression statement of the entry function into a `return`, so that
/// fragments like `x + 1` produce their value.
///
/// Units whose entry function does not end with an expression are returned unchanged, sharing
/// all of their structure with the input.
pub fn fix_trailing_return(unit: &Unit) -> Unit {
    unit.map_functions(|class, function| {
        if &*class.name.name != ENTRY_CLASS || &*function.name.name != ENTRY_FUNCTION {
            return Arc::clone(function);
        }
        match function.body.stmts.last().map(|stmt| &**stmt) {
            Some(Stmt::Expr { expr, span, .. }) => {
                let body = function.body.with_last_replaced(Stmt::Return {
                    value: Some(expr.clone()),
                    span: *span,
                });
                Arc::new(function.with_body(body))
            }
            _ => Arc::clone(function),
        }
    })
}

#[cfg(test)]
mod tests {
    use snip_foundation::source::{SourceFile, SourceFileSet};

    use super::*;

    fn parse(fragment: &str) -> Unit {
        let source = synthesize(fragment);
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("fragment.snip", source.as_str()));
        snip_syntax::parse_unit(file, &source).unwrap()
    }

    fn entry_body(unit: &Unit) -> Vec<String> {
        unit.class(ENTRY_CLASS)
            .and_then(|class| class.function(ENTRY_FUNCTION))
            .unwrap()
            .body
            .stmts
            .iter()
            .map(|stmt| stmt.to_string())
            .collect()
    }

    #[test]
    fn fragment_lands_in_the_entry_function() {
        let source = synthesize("1 + 2");
        assert!(source.starts_with("namespace Snippets;\n"));
        assert!(source.contains("static object Run() {\n1 + 2\n    }"));
        assert_eq!(entry_body(&parse("1 + 2")), ["1 + 2"]);
    }

    #[test]
    fn trailing_expression_becomes_a_return() {
        let unit = fix_trailing_return(&parse("var a = 2;\na * 3"));
        assert_eq!(entry_body(&unit), ["var a = 2;", "return a * 3;"]);

        let unit = fix_trailing_return(&parse("Compute();"));
        assert_eq!(entry_body(&unit), ["return Compute();"]);
    }

    #[test]
    fn returning_units_are_left_alone() {
        let unit = fix_trailing_return(&parse("return 5;"));
        let again = fix_trailing_return(&unit);
        assert_eq!(again, unit);
        assert!(Arc::ptr_eq(&again.classes[0], &unit.classes[0]));

        let unit = parse("if (true) { 1; }");
        assert_eq!(fix_trailing_return(&unit), unit);
    }

    #[test]
    fn fixing_is_idempotent() {
        let once = fix_trailing_return(&parse("40 + 2"));
        assert_eq!(fix_trailing_return(&once), once);
    }
}
