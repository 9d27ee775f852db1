use std::sync::Arc;

use indexmap::IndexMap;
use snip_foundation::source::Span;
use snip_syntax::ast::{Expr, Ident, Local, LocalType, Stmt, TypeExpr, Unit};
use tracing::{debug, trace};

use crate::{
    classify::UnresolvedName,
    resolver::ResolvedBinding,
    synthesis::{ENTRY_CLASS, ENTRY_FUNCTION},
};

/// Declares the unresolved names that have a binding, by prepending
/// `T name = lookup<T>("name");` to the function each name was first reported in.
///
/// Returns the new unit along with the bindings that were used.
pub fn inject<'b>(
    unit: &Unit,
    unresolved: impl IntoIterator<Item = &'b UnresolvedName>,
    bindings: &[ResolvedBinding],
) -> (Unit, Vec<ResolvedBinding>) {
    // Keyed by name; the value says which class and function the declaration goes into.
    let mut declared: IndexMap<&str, (&str, &str, &ResolvedBinding)> = IndexMap::new();
    for name in unresolved {
        if declared.contains_key(name.name.as_str()) {
            continue;
        }
        let Some(binding) = bindings.iter().find(|binding| binding.name == name.name) else {
            trace!(name = %name.name, "no binding");
            continue;
        };
        let (class, function) = match unit.function_enclosing(name.span) {
            Some((class, function)) => (&*class.name.name, &*function.name.name),
            None => (ENTRY_CLASS, ENTRY_FUNCTION),
        };
        declared.insert(&binding.name, (class, function, binding));
    }
    debug!(declared = declared.len(), "injecting bindings");

    let unit = unit.map_functions(|class, function| {
        let declarations: Vec<_> = declared
            .values()
            .filter(|(target_class, target_function, _)| {
                *target_class == &*class.name.name && *target_function == &*function.name.name
            })
            .map(|(_, _, binding)| declaration(binding))
            .collect();
        if declarations.is_empty() {
            Arc::clone(function)
        } else {
            Arc::new(function.with_body(function.body.with_prepended(declarations)))
        }
    });
    let used = declared
        .into_values()
        .map(|(_, _, binding)| binding.clone())
        .collect();
    (unit, used)
}

fn declaration(binding: &ResolvedBinding) -> Stmt {
    let ty = || TypeExpr::synthetic(binding.ty.keyword());
    Stmt::Local(Local {
        ty: LocalType::Explicit(ty()),
        name: Ident::synthetic(binding.name.as_str()),
        init: Expr::lookup(ty(), binding.name.as_str()),
        span: Span::EMPTY,
    })
}

#[cfg(test)]
mod tests {
    use snip_core::Type;
    use snip_foundation::source::{SourceFile, SourceFileSet};

    use super::*;
    use crate::synthesis::{fix_trailing_return, synthesize};

    fn parse(source: &str) -> Unit {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("fragment.snip", source));
        snip_syntax::parse_unit(file, source).unwrap()
    }

    fn unresolved(source: &str, name: &str) -> UnresolvedName {
        let start = source.rfind(name).unwrap();
        UnresolvedName {
            name: name.into(),
            span: Span::new(start, start + name.len()),
        }
    }

    #[test]
    fn declarations_go_before_the_fragment() {
        let source = synthesize("x + 1");
        let unit = fix_trailing_return(&parse(&source));
        let names = [unresolved(&source, "x")];
        let (unit, used) = inject(&unit, &names, &[ResolvedBinding::new("x", 41_i64)]);

        assert_eq!(used, [ResolvedBinding::new("x", 41_i64)]);
        let printed = unit.to_string();
        let declaration = printed.find("int x = lookup<int>(\"x\");").unwrap();
        let ret = printed.find("return x + 1;").unwrap();
        assert!(declaration < ret);
    }

    #[test]
    fn names_are_declared_once_in_order_of_first_report() {
        let source = synthesize("b + a + b");
        let unit = parse(&source);
        let b = unresolved(&source, "b");
        let a = unresolved(&source, "a");
        let names = [b.clone(), a, b];
        let bindings = [
            ResolvedBinding::new("a", 1.5),
            ResolvedBinding::new("b", "text"),
            ResolvedBinding::new("unused", true),
        ];
        let (unit, used) = inject(&unit, &names, &bindings);

        let names: Vec<_> = used.iter().map(|binding| binding.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        let body = &unit.classes[0].functions[0].body;
        assert_eq!(body.stmts[0].to_string(), "string b = lookup<string>(\"b\");");
        assert_eq!(body.stmts[1].to_string(), "float a = lookup<float>(\"a\");");
        assert_eq!(body.stmts.len(), 3);
    }

    #[test]
    fn names_without_bindings_are_left_alone() {
        let source = synthesize("missing");
        let unit = parse(&source);
        let names = [unresolved(&source, "missing")];
        let (rewritten, used) = inject(&unit, &names, &[ResolvedBinding::new("other", 1_i64)]);
        assert!(used.is_empty());
        assert_eq!(rewritten, unit);
    }

    #[test]
    fn declarations_follow_the_function_the_name_is_used_in() {
        let source = indoc::indoc! {"
            class Snippet {
                static object Run() { return Helper(); }
                static int Helper() { return limit * 2; }
            }
        "};
        let unit = parse(source);
        let names = [unresolved(source, "limit")];
        let binding = ResolvedBinding::with_type("limit", Type::Int, 10_i64);
        let (unit, _) = inject(&unit, &names, &[binding]);

        let class = &unit.classes[0];
        assert_eq!(class.functions[0].body.stmts.len(), 1);
        assert_eq!(
            class.functions[1].body.stmts[0].to_string(),
            "int limit = lookup<int>(\"limit\");"
        );
    }
}
