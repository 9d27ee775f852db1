use std::sync::Arc;

use snip_foundation::{
    errors::{Diagnostic, Label},
    source::{Span, Spanned},
};

use crate::{
    diagnostics::{labels, notes},
    lexis::{
        token::{is_keyword, Token, TokenKind},
        TokenStream,
    },
    Parse, ParseError, Parser, PredictiveParse,
};

use super::Block;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: Arc<str>,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<Arc<str>>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// Creates an identifier that does not come from source code.
    pub fn synthetic(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Span::EMPTY)
    }
}

impl Spanned for Ident {
    fn span(&self) -> Span {
        self.span
    }
}

impl Parse for Ident {
    fn parse(parser: &mut Parser<'_, impl TokenStream>) -> Result<Self, ParseError> {
        let token = parser.expect_token(TokenKind::Ident)?;
        let name = token.span.get_input(parser.input);
        if is_keyword(name) {
            parser.bail(
                token.span,
                Diagnostic::error(parser.file, format!("`{name}` is a keyword and cannot be used as a name"))
                    .with_label(labels::invalid_identifier(token.span, parser.input))
                    .with_note(notes::IDENTIFIER_CHARS),
            )
        } else {
            Ok(Ident::new(name, token.span))
        }
    }
}

impl PredictiveParse for Ident {
    fn starts_with(token: &Token, input: &str) -> bool {
        token.kind == TokenKind::Ident && !is_keyword(token.span.get_input(input))
    }
}

/// Name of a type, as written in source code. Whether the name refers to an actual type is
/// decided during analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeExpr {
    pub name: Ident,
}

impl TypeExpr {
    pub fn synthetic(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: Ident::synthetic(name),
        }
    }
}

impl Spanned for TypeExpr {
    fn span(&self) -> Span {
        self.name.span
    }
}

impl Parse for TypeExpr {
    fn parse(parser: &mut Parser<'_, impl TokenStream>) -> Result<Self, ParseError> {
        Ok(Self {
            name: parser.parse_with_error(|parser, span| {
                Diagnostic::error(parser.file, "type expected")
                    .with_label(Label::primary(&span, "type name expected here"))
            })?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub segments: Vec<Ident>,
}

impl Spanned for Path {
    fn span(&self) -> Span {
        self.segments.span()
    }
}

impl Parse for Path {
    fn parse(parser: &mut Parser<'_, impl TokenStream>) -> Result<Self, ParseError> {
        let mut segments = vec![parser.parse()?];
        while parser.eat(TokenKind::Dot)?.is_some() {
            segments.push(parser.parse()?);
        }
        Ok(Self { segments })
    }
}

/// A complete compilation unit: an optional namespace and a list of classes.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub namespace: Option<Path>,
    pub classes: Vec<Arc<Class>>,
    pub span: Span,
}

impl Unit {
    pub fn class(&self, name: &str) -> Option<&Arc<Class>> {
        self.classes.iter().find(|class| &*class.name.name == name)
    }

    /// Returns the class and function whose source spans contain `span`.
    pub fn function_enclosing(&self, span: Span) -> Option<(&Arc<Class>, &Arc<Function>)> {
        self.classes.iter().find_map(|class| {
            class
                .functions
                .iter()
                .find(|function| !function.span.is_empty() && function.span.contains(&span))
                .map(|function| (class, function))
        })
    }

    /// Builds a new unit in which every function has been passed through `rewrite`.
    ///
    /// Classes whose functions all come back pointer-equal to the originals are shared with
    /// `self` instead of being copied.
    pub fn map_functions(
        &self,
        mut rewrite: impl FnMut(&Class, &Arc<Function>) -> Arc<Function>,
    ) -> Unit {
        Unit {
            namespace: self.namespace.clone(),
            classes: self
                .classes
                .iter()
                .map(|class| {
                    let functions: Vec<_> = class
                        .functions
                        .iter()
                        .map(|function| rewrite(class, function))
                        .collect();
                    let unchanged = functions
                        .iter()
                        .zip(&class.functions)
                        .all(|(new, old)| Arc::ptr_eq(new, old));
                    if unchanged {
                        Arc::clone(class)
                    } else {
                        Arc::new(Class {
                            name: class.name.clone(),
                            functions,
                            span: class.span,
                        })
                    }
                })
                .collect(),
            span: self.span,
        }
    }
}

impl Parse for Unit {
    fn parse(parser: &mut Parser<'_, impl TokenStream>) -> Result<Self, ParseError> {
        let start = parser.peek_token()?.span;
        let namespace = if parser.next_is_keyword("namespace")? {
            parser.next_token()?;
            let path = parser.parse()?;
            parser.parse_with_error::<Semi>(|parser, span| {
                Diagnostic::error(parser.file, "missing `;` after namespace declaration")
                    .with_code(crate::diagnostics::codes::MISSING_SEMICOLON)
                    .with_label(Label::primary(&span, "`;` expected here"))
            })?;
            Some(path)
        } else {
            None
        };

        let mut classes = vec![];
        loop {
            let token = parser.peek_token()?;
            if token.kind == TokenKind::EndOfFile {
                return Ok(Unit {
                    namespace,
                    classes,
                    span: start.join(&token.span),
                });
            }
            classes.push(Arc::new(parser.parse::<Class>()?));
        }
    }
}

/// `;` on its own, used where only the presence of the token matters.
struct Semi;

impl Parse for Semi {
    fn parse(parser: &mut Parser<'_, impl TokenStream>) -> Result<Self, ParseError> {
        parser.expect_token(TokenKind::Semicolon)?;
        Ok(Semi)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: Ident,
    pub functions: Vec<Arc<Function>>,
    pub span: Span,
}

impl Class {
    pub fn function(&self, name: &str) -> Option<&Arc<Function>> {
        self.functions
            .iter()
            .find(|function| &*function.name.name == name)
    }
}

impl Spanned for Class {
    fn span(&self) -> Span {
        self.span
    }
}

impl Parse for Class {
    fn parse(parser: &mut Parser<'_, impl TokenStream>) -> Result<Self, ParseError> {
        let keyword = parser.expect_keyword("class")?;
        let name = parser.parse()?;
        let open = parser.expect_token(TokenKind::LeftBrace)?;
        let mut functions = vec![];
        loop {
            let token = parser.peek_token()?;
            match token.kind {
                TokenKind::RightBrace => {
                    parser.next_token()?;
                    return Ok(Class {
                        name,
                        functions,
                        span: keyword.span.join(&token.span),
                    });
                }
                TokenKind::EndOfFile => {
                    return parser.bail(
                        token.span,
                        Diagnostic::error(parser.file, "missing `}` to close class body")
                            .with_label(Label::primary(&token.span, "`}` expected here..."))
                            .with_label(Label::secondary(&open.span, "...to close this `{`")),
                    )
                }
                _ => functions.push(Arc::new(parser.parse::<Function>()?)),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub is_static: bool,
    pub return_ty: TypeExpr,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

impl Function {
    /// Returns a copy of the function with a different body.
    pub fn with_body(&self, body: Block) -> Function {
        Function {
            body,
            ..self.clone()
        }
    }
}

impl Spanned for Function {
    fn span(&self) -> Span {
        self.span
    }
}

impl Parse for Function {
    fn parse(parser: &mut Parser<'_, impl TokenStream>) -> Result<Self, ParseError> {
        let start = parser.peek_token()?.span;
        let is_static = if parser.next_is_keyword("static")? {
            parser.next_token()?;
            true
        } else {
            false
        };
        let return_ty = parser.parse()?;
        let name = parser.parse()?;
        let open = parser.expect_token(TokenKind::LeftParen)?;
        let mut params = vec![];
        if parser.eat(TokenKind::RightParen)?.is_none() {
            loop {
                params.push(parser.parse()?);
                let token = parser.next_token()?;
                match token.kind {
                    TokenKind::Comma => (),
                    TokenKind::RightParen => break,
                    _ => {
                        return parser.bail(
                            token.span,
                            Diagnostic::error(parser.file, "`,` or `)` expected after parameter")
                                .with_label(Label::primary(
                                    &token.span,
                                    "this was expected to continue or close the parameter list",
                                ))
                                .with_label(Label::secondary(&open.span, "the parameter list starts here")),
                        )
                    }
                }
            }
        }
        let body: Block = parser.parse()?;
        Ok(Function {
            is_static,
            return_ty,
            name,
            params,
            span: start.join(&body.span),
            body,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: TypeExpr,
    pub name: Ident,
}

impl Parse for Param {
    fn parse(parser: &mut Parser<'_, impl TokenStream>) -> Result<Self, ParseError> {
        Ok(Param {
            ty: parser.parse()?,
            name: parser.parse()?,
        })
    }
}
