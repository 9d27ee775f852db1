use std::sync::Arc;

use snip_foundation::{
    errors::{Diagnostic, Label},
    source::{Span, Spanned},
};

use crate::{
    diagnostics::codes,
    lexis::{
        token::{Token, TokenKind},
        TokenStream,
    },
    Parse, ParseError, Parser,
};

use super::{Expr, Ident, TypeExpr};

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Arc<Stmt>>,
    pub span: Span,
}

impl Block {
    /// Returns a copy of the block with `stmts` inserted before its first statement.
    pub fn with_prepended(&self, stmts: impl IntoIterator<Item = Stmt>) -> Block {
        Block {
            stmts: stmts
                .into_iter()
                .map(Arc::new)
                .chain(self.stmts.iter().cloned())
                .collect(),
            span: self.span,
        }
    }

    /// Returns a copy of the block with its last statement replaced by `stmt`.
    pub fn with_last_replaced(&self, stmt: Stmt) -> Block {
        let mut stmts = self.stmts.clone();
        stmts.pop();
        stmts.push(Arc::new(stmt));
        Block {
            stmts,
            span: self.span,
        }
    }
}

impl Spanned for Block {
    fn span(&self) -> Span {
        self.span
    }
}

impl Parse for Block {
    fn parse(parser: &mut Parser<'_, impl TokenStream>) -> Result<Self, ParseError> {
        let open = parser.expect_token(TokenKind::LeftBrace)?;
        let mut stmts = vec![];
        loop {
            let token = parser.peek_token()?;
            match token.kind {
                TokenKind::RightBrace => {
                    parser.next_token()?;
                    return Ok(Block {
                        stmts,
                        span: open.span.join(&token.span),
                    });
                }
                TokenKind::EndOfFile => {
                    return parser.bail(
                        token.span,
                        Diagnostic::error(parser.file, "missing `}` to close block")
                            .with_label(Label::primary(&token.span, "`}` expected here..."))
                            .with_label(Label::secondary(&open.span, "...to close this `{`")),
                    )
                }
                _ => match parser.parse::<Stmt>() {
                    Ok(stmt) => stmts.push(Arc::new(stmt)),
                    // Keep going so that more than one error can be reported per block.
                    Err(_) => parser.recover_to_statement_end(),
                },
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Empty {
        span: Span,
    },
    Block(Block),
    Local(Local),
    If {
        cond: Expr,
        then: Arc<Stmt>,
        otherwise: Option<Arc<Stmt>>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Arc<Stmt>,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Expr {
        expr: Expr,
        /// Whether the statement was terminated with a `;`. Only the last statement of a block
        /// may omit it.
        semicolon: bool,
        span: Span,
    },
}

impl Stmt {
    /// Builds `return value;`.
    pub fn return_value(value: Expr) -> Stmt {
        Stmt::Return {
            span: value.span(),
            value: Some(value),
        }
    }
}

impl Spanned for Stmt {
    fn span(&self) -> Span {
        match self {
            Stmt::Empty { span }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Expr { span, .. } => *span,
            Stmt::Block(block) => block.span,
            Stmt::Local(local) => local.span,
        }
    }
}

/// Declaration of a local variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Local {
    pub ty: LocalType,
    pub name: Ident,
    pub init: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocalType {
    /// `var`; the type is inferred from the initializer.
    Inferred(Span),
    Explicit(TypeExpr),
}

impl Parse for Stmt {
    fn parse(parser: &mut Parser<'_, impl TokenStream>) -> Result<Self, ParseError> {
        let token = parser.peek_token()?;
        parser.nested(|parser| {
            parser.descend(token.span)?;
            Stmt::parse_nested(parser, token)
        })
    }
}

impl Stmt {
    fn parse_nested(
        parser: &mut Parser<'_, impl TokenStream>,
        token: Token,
    ) -> Result<Self, ParseError> {
        match token.kind {
            TokenKind::LeftBrace => return Ok(Stmt::Block(parser.parse()?)),
            TokenKind::Semicolon => {
                parser.next_token()?;
                return Ok(Stmt::Empty { span: token.span });
            }
            _ => (),
        }

        if token.kind == TokenKind::Ident {
            match token.span.get_input(parser.input) {
                "if" => return Stmt::parse_if(parser),
                "while" => return Stmt::parse_while(parser),
                "return" => return Stmt::parse_return(parser),
                "var" => return Stmt::parse_local(parser),
                _ => {
                    if parser.peek_second_token()?.kind == TokenKind::Ident {
                        return Stmt::parse_local(parser);
                    }
                }
            }
        }

        let expr: Expr = parser.parse()?;
        let next = parser.peek_token()?;
        match next.kind {
            TokenKind::Semicolon => {
                parser.next_token()?;
                Ok(Stmt::Expr {
                    span: expr.span().join(&next.span),
                    expr,
                    semicolon: true,
                })
            }
            TokenKind::RightBrace => Ok(Stmt::Expr {
                span: expr.span(),
                expr,
                semicolon: false,
            }),
            _ => {
                let diagnostic = missing_semicolon(parser, expr.span(), "this expression statement");
                parser.bail(next.span, diagnostic)
            }
        }
    }
}

fn missing_semicolon(
    parser: &Parser<'_, impl TokenStream>,
    statement: Span,
    what: &str,
) -> Diagnostic {
    Diagnostic::error(parser.file, "missing `;` at the end of statement")
        .with_code(codes::MISSING_SEMICOLON)
        .with_label(Label::primary(
            &Span::new(statement.end, statement.end),
            "`;` expected here",
        ))
        .with_label(Label::secondary(&statement, format!("{what} is not terminated")))
}

impl Stmt {
    fn expect_semicolon(
        parser: &mut Parser<'_, impl TokenStream>,
        statement: Span,
        what: &str,
    ) -> Result<Span, ParseError> {
        let token = parser.peek_token()?;
        if token.kind == TokenKind::Semicolon {
            parser.next_token()?;
            Ok(token.span)
        } else {
            let diagnostic = missing_semicolon(parser, statement, what);
            parser.bail(token.span, diagnostic)
        }
    }

    fn parse_condition(parser: &mut Parser<'_, impl TokenStream>) -> Result<Expr, ParseError> {
        let open = parser.expect_token(TokenKind::LeftParen)?;
        let cond = parser.parse()?;
        let close = parser.peek_token()?;
        if close.kind == TokenKind::RightParen {
            parser.next_token()?;
            Ok(cond)
        } else {
            parser.bail(
                close.span,
                Diagnostic::error(parser.file, "missing `)` to close condition")
                    .with_label(Label::primary(&close.span, "`)` expected here..."))
                    .with_label(Label::secondary(&open.span, "...to close this `(`")),
            )
        }
    }

    fn parse_if(parser: &mut Parser<'_, impl TokenStream>) -> Result<Stmt, ParseError> {
        let keyword = parser.expect_keyword("if")?;
        let cond = Stmt::parse_condition(parser)?;
        let then: Stmt = parser.parse()?;
        let otherwise = if parser.next_is_keyword("else")? {
            parser.next_token()?;
            Some(Arc::new(parser.parse::<Stmt>()?))
        } else {
            None
        };
        let end = otherwise
            .as_ref()
            .map(|stmt| stmt.span())
            .unwrap_or_else(|| then.span());
        Ok(Stmt::If {
            cond,
            then: Arc::new(then),
            otherwise,
            span: keyword.span.join(&end),
        })
    }

    fn parse_while(parser: &mut Parser<'_, impl TokenStream>) -> Result<Stmt, ParseError> {
        let keyword = parser.expect_keyword("while")?;
        let cond = Stmt::parse_condition(parser)?;
        let body: Stmt = parser.parse()?;
        Ok(Stmt::While {
            cond,
            span: keyword.span.join(&body.span()),
            body: Arc::new(body),
        })
    }

    fn parse_return(parser: &mut Parser<'_, impl TokenStream>) -> Result<Stmt, ParseError> {
        let keyword = parser.expect_keyword("return")?;
        let value = if parser.next_is(TokenKind::Semicolon)? {
            None
        } else {
            Some(parser.parse::<Expr>()?)
        };
        let statement = value
            .as_ref()
            .map(|value| keyword.span.join(&value.span()))
            .unwrap_or(keyword.span);
        let semicolon = Stmt::expect_semicolon(parser, statement, "this `return`")?;
        Ok(Stmt::Return {
            value,
            span: statement.join(&semicolon),
        })
    }

    fn parse_local(parser: &mut Parser<'_, impl TokenStream>) -> Result<Stmt, ParseError> {
        let ty = if parser.next_is_keyword("var")? {
            LocalType::Inferred(parser.next_token()?.span)
        } else {
            LocalType::Explicit(parser.parse()?)
        };
        let name: Ident = parser.parse()?;
        let assign = parser.peek_token()?;
        if assign.kind != TokenKind::Assign {
            return parser.bail(
                assign.span,
                Diagnostic::error(parser.file, "local variables must be initialized")
                    .with_label(Label::primary(&assign.span, "`=` expected here"))
                    .with_label(Label::secondary(&name.span, "this variable has no initial value")),
            );
        }
        parser.next_token()?;
        let init: Expr = parser.parse()?;
        let start = match &ty {
            LocalType::Inferred(span) => *span,
            LocalType::Explicit(ty) => ty.span(),
        };
        let statement = start.join(&init.span());
        let semicolon = Stmt::expect_semicolon(parser, statement, "this variable declaration")?;
        Ok(Stmt::Local(Local {
            ty,
            name,
            init,
            span: statement.join(&semicolon),
        }))
    }
}
