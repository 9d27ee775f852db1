//! Printing syntax trees back to source code.
//!
//! The output is normalized (one statement per line, four-space indentation) and parses back
//! into an equivalent tree, with the exception of spans.

use std::fmt::{self, Display, Formatter, Write};

use crate::ast::{Block, Class, Expr, Function, LocalType, Lit, Stmt, Unit};

const INDENT: &str = "    ";

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(namespace) = &self.namespace {
            f.write_str("namespace ")?;
            for (i, segment) in namespace.segments.iter().enumerate() {
                if i != 0 {
                    f.write_char('.')?;
                }
                f.write_str(&segment.name)?;
            }
            f.write_str(";\n")?;
        }
        for class in &self.classes {
            f.write_char('\n')?;
            write_class(f, class)?;
        }
        Ok(())
    }
}

fn write_class(f: &mut Formatter<'_>, class: &Class) -> fmt::Result {
    writeln!(f, "class {} {{", class.name.name)?;
    for (i, function) in class.functions.iter().enumerate() {
        if i != 0 {
            f.write_char('\n')?;
        }
        write_function(f, function)?;
    }
    f.write_str("}\n")
}

fn write_function(f: &mut Formatter<'_>, function: &Function) -> fmt::Result {
    f.write_str(INDENT)?;
    if function.is_static {
        f.write_str("static ")?;
    }
    write!(f, "{} {}(", function.return_ty.name.name, function.name.name)?;
    for (i, param) in function.params.iter().enumerate() {
        if i != 0 {
            f.write_str(", ")?;
        }
        write!(f, "{} {}", param.ty.name.name, param.name.name)?;
    }
    f.write_str(") ")?;
    write_block(f, &function.body, 1)?;
    f.write_char('\n')
}

fn write_indent(f: &mut Formatter<'_>, level: usize) -> fmt::Result {
    for _ in 0..level {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn write_block(f: &mut Formatter<'_>, block: &Block, level: usize) -> fmt::Result {
    f.write_str("{\n")?;
    for stmt in &block.stmts {
        write_indent(f, level + 1)?;
        write_stmt(f, stmt, level + 1)?;
        f.write_char('\n')?;
    }
    write_indent(f, level)?;
    f.write_char('}')
}

fn write_stmt(f: &mut Formatter<'_>, stmt: &Stmt, level: usize) -> fmt::Result {
    match stmt {
        Stmt::Empty { .. } => f.write_char(';'),
        Stmt::Block(block) => write_block(f, block, level),
        Stmt::Local(local) => {
            match &local.ty {
                LocalType::Inferred(_) => f.write_str("var")?,
                LocalType::Explicit(ty) => f.write_str(&ty.name.name)?,
            }
            write!(f, " {} = {};", local.name.name, local.init)
        }
        Stmt::If {
            cond,
            then,
            otherwise,
            ..
        } => {
            write!(f, "if ({cond}) ")?;
            write_stmt(f, then, level)?;
            if let Some(otherwise) = otherwise {
                f.write_str(" else ")?;
                write_stmt(f, otherwise, level)?;
            }
            Ok(())
        }
        Stmt::While { cond, body, .. } => {
            write!(f, "while ({cond}) ")?;
            write_stmt(f, body, level)
        }
        Stmt::Return { value: None, .. } => f.write_str("return;"),
        Stmt::Return {
            value: Some(value), ..
        } => write!(f, "return {value};"),
        Stmt::Expr {
            expr, semicolon, ..
        } => {
            write!(f, "{expr}")?;
            if *semicolon {
                f.write_char(';')?;
            }
            Ok(())
        }
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_stmt(f, self, 0)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Lit(lit) => Display::fmt(lit, f),
            Expr::Ident(ident) => f.write_str(&ident.name),
            Expr::Unary { op, operand, .. } => write!(f, "{}{operand}", op.symbol()),
            Expr::Binary {
                left, op, right, ..
            } => write!(f, "{left} {} {right}", op.symbol()),
            Expr::Paren { inner, .. } => write!(f, "({inner})"),
            Expr::Assign { target, value } => write!(f, "{} = {value}", target.name),
            Expr::Member { left, field } => write!(f, "{left}.{}", field.name),
            Expr::Call { function, args, .. } => {
                write!(f, "{function}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_char(')')
            }
            Expr::Lookup { ty, key, .. } => {
                write!(f, "lookup<{}>(", ty.name.name)?;
                write_string(f, key)?;
                f.write_char(')')
            }
        }
    }
}

impl Display for Lit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Lit::Null(_) => f.write_str("null"),
            Lit::Bool(b, _) => write!(f, "{b}"),
            Lit::Int(i, _) => write!(f, "{i}"),
            Lit::Float(x, _) => write!(f, "{x:?}"),
            Lit::String(s, _) => write_string(f, s),
        }
    }
}

fn write_string(f: &mut Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\0' => f.write_str("\\0")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}
