use std::{cmp::Ordering, sync::Arc};

use snip_foundation::{
    errors::{Diagnostic, Label},
    source::{Span, Spanned},
};

use crate::{
    diagnostics::notes,
    lexis::{
        token::{is_keyword, Token, TokenKind},
        TokenStream,
    },
    Parse, ParseError, Parser,
};

use super::{Ident, TypeExpr};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Lit),
    Ident(Ident),

    Unary {
        op: UnaryOp,
        operand: Arc<Expr>,
        span: Span,
    },
    Binary {
        left: Arc<Expr>,
        op: BinaryOp,
        op_span: Span,
        right: Arc<Expr>,
    },
    Paren {
        inner: Arc<Expr>,
        span: Span,
    },

    Assign {
        target: Ident,
        value: Arc<Expr>,
    },
    /// `left.field`. Only meaningful as the callee of a call, naming a function of a class.
    Member {
        left: Arc<Expr>,
        field: Ident,
    },
    Call {
        function: Arc<Expr>,
        args: Vec<Expr>,
        span: Span,
    },

    /// `lookup<T>("key")`, reading a value supplied by the host at run time.
    Lookup {
        ty: TypeExpr,
        key: Arc<str>,
        span: Span,
    },
}

impl Expr {
    /// Builds `lookup<ty>("key")`.
    pub fn lookup(ty: TypeExpr, key: impl Into<Arc<str>>) -> Expr {
        Expr::Lookup {
            ty,
            key: key.into(),
            span: Span::EMPTY,
        }
    }
}

impl Spanned for Expr {
    fn span(&self) -> Span {
        match self {
            Expr::Lit(lit) => lit.span(),
            Expr::Ident(ident) => ident.span,
            Expr::Unary { span, .. }
            | Expr::Paren { span, .. }
            | Expr::Call { span, .. }
            | Expr::Lookup { span, .. } => *span,
            Expr::Binary { left, right, .. } => left.span().join(&right.span()),
            Expr::Assign { target, value } => target.span.join(&value.span()),
            Expr::Member { left, field } => left.span().join(&field.span),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Null(Span),
    Bool(bool, Span),
    Int(i64, Span),
    Float(f64, Span),
    String(Arc<str>, Span),
}

impl Spanned for Lit {
    fn span(&self) -> Span {
        match self {
            Lit::Null(span)
            | Lit::Bool(_, span)
            | Lit::Int(_, span)
            | Lit::Float(_, span)
            | Lit::String(_, span) => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    fn from_token(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Add => BinaryOp::Add,
            TokenKind::Sub => BinaryOp::Sub,
            TokenKind::Mul => BinaryOp::Mul,
            TokenKind::Div => BinaryOp::Div,
            TokenKind::Rem => BinaryOp::Rem,
            TokenKind::Equal => BinaryOp::Equal,
            TokenKind::NotEqual => BinaryOp::NotEqual,
            TokenKind::Less => BinaryOp::Less,
            TokenKind::LessEqual => BinaryOp::LessEqual,
            TokenKind::Greater => BinaryOp::Greater,
            TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
            TokenKind::And => BinaryOp::And,
            TokenKind::Or => BinaryOp::Or,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl Parse for Expr {
    fn parse(parser: &mut Parser<'_, impl TokenStream>) -> Result<Self, ParseError> {
        Expr::precedence_parse(parser, Precedence::EXPR)
    }
}

// Expressions are parsed with precedence climbing rather than one recursive descent rule per
// precedence level.
impl Expr {
    fn parse_prefix(
        parser: &mut Parser<'_, impl TokenStream>,
        token: Token,
    ) -> Result<Expr, ParseError> {
        Ok(match token.kind {
            TokenKind::Ident => Expr::ident(parser, token)?,
            TokenKind::Int => Expr::Lit(Lit::Int(Expr::int(parser, token)?, token.span)),
            TokenKind::Float => Expr::Lit(Lit::Float(Expr::float(parser, token)?, token.span)),
            TokenKind::String => Expr::Lit(Lit::String(
                Expr::string(parser, token.span)?.into(),
                token.span,
            )),

            TokenKind::Sub | TokenKind::Not => {
                let op = if token.kind == TokenKind::Sub {
                    UnaryOp::Neg
                } else {
                    UnaryOp::Not
                };
                let operand = Expr::precedence_parse(parser, Precedence::PREFIX)?;
                Expr::Unary {
                    op,
                    span: token.span.join(&operand.span()),
                    operand: Arc::new(operand),
                }
            }

            TokenKind::LeftParen => {
                let inner = Expr::precedence_parse(parser, Precedence::EXPR)?;
                let close = parser.peek_token()?;
                if close.kind != TokenKind::RightParen {
                    return parser.bail(
                        close.span,
                        Diagnostic::error(parser.file, "missing `)` to close grouped expression")
                            .with_label(Label::primary(&close.span, "`)` expected here..."))
                            .with_label(Label::secondary(&token.span, "...to close this `(`")),
                    );
                }
                parser.next_token()?;
                Expr::Paren {
                    inner: Arc::new(inner),
                    span: token.span.join(&close.span),
                }
            }

            _ => parser.bail(
                token.span,
                Diagnostic::error(parser.file, "expression expected")
                    .with_label(Label::primary(
                        &token.span,
                        format!("{} does not start an expression", token.kind.name()),
                    ))
                    .with_note("note: expressions include literals, variables, calls, and math"),
            )?,
        })
    }

    fn ident(parser: &mut Parser<'_, impl TokenStream>, token: Token) -> Result<Expr, ParseError> {
        let s = token.span.get_input(parser.input);
        Ok(match s {
            "null" => Expr::Lit(Lit::Null(token.span)),
            "true" => Expr::Lit(Lit::Bool(true, token.span)),
            "false" => Expr::Lit(Lit::Bool(false, token.span)),
            "lookup" => Expr::lookup_intrinsic(parser, token)?,
            _ if is_keyword(s) => parser.bail(
                token.span,
                Diagnostic::error(parser.file, "expression expected")
                    .with_label(Label::primary(
                        &token.span,
                        format!("`{s}` is a keyword and cannot start an expression"),
                    ))
                    .with_note(notes::IDENTIFIER_CHARS),
            )?,
            _ => Expr::Ident(Ident::new(s, token.span)),
        })
    }

    fn lookup_intrinsic(
        parser: &mut Parser<'_, impl TokenStream>,
        keyword: Token,
    ) -> Result<Expr, ParseError> {
        parser.expect_token(TokenKind::Less)?;
        let ty = parser.parse()?;
        parser.expect_token(TokenKind::Greater)?;
        parser.expect_token(TokenKind::LeftParen)?;
        let key = parser.next_token()?;
        if key.kind != TokenKind::String {
            return parser.bail(
                key.span,
                Diagnostic::error(parser.file, "`lookup` requires a string literal key")
                    .with_label(Label::primary(&key.span, "string literal expected here")),
            );
        }
        let key_text = Expr::string(parser, key.span)?;
        let close = parser.expect_token(TokenKind::RightParen)?;
        Ok(Expr::Lookup {
            ty,
            key: key_text.into(),
            span: keyword.span.join(&close.span),
        })
    }

    fn int(parser: &mut Parser<'_, impl TokenStream>, token: Token) -> Result<i64, ParseError> {
        let s = token.span.get_input(parser.input);
        match s.parse::<i64>() {
            Ok(int) => Ok(int),
            Err(_) => parser.bail(
                token.span,
                Diagnostic::error(parser.file, "integer literal is too large")
                    .with_label(Label::primary(
                        &token.span,
                        format!("this does not fit in {} to {}", i64::MIN, i64::MAX),
                    )),
            ),
        }
    }

    fn float(parser: &mut Parser<'_, impl TokenStream>, token: Token) -> Result<f64, ParseError> {
        let s = token.span.get_input(parser.input);
        match s.parse::<f64>() {
            Ok(float) => Ok(float),
            Err(_) => parser.bail(
                token.span,
                Diagnostic::bug(parser.file, "float literal accepted by the lexer cannot be parsed")
                    .with_label(Label::primary(&token.span, "")),
            ),
        }
    }

    /// Decodes escape sequences in a string literal token (including its quotes).
    fn string(parser: &mut Parser<'_, impl TokenStream>, span: Span) -> Result<String, ParseError> {
        let source = span.get_input(parser.input);
        let inner = source
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(source);
        let mut result = String::with_capacity(inner.len());
        let mut chars = inner.char_indices();
        while let Some((_, c)) = chars.next() {
            if c != '\\' {
                result.push(c);
                continue;
            }
            match chars.next() {
                Some((_, '\\')) => result.push('\\'),
                Some((_, '"')) => result.push('"'),
                Some((_, 'n')) => result.push('\n'),
                Some((_, 'r')) => result.push('\r'),
                Some((_, 't')) => result.push('\t'),
                Some((_, '0')) => result.push('\0'),
                other => {
                    // +1 for the opening quote.
                    let start = span.start + 1 + other.map(|(i, _)| i - 1).unwrap_or(inner.len() - 1);
                    let escape = Span::new(start, (start + 2).min(span.end));
                    return parser.bail(
                        escape,
                        Diagnostic::error(parser.file, "invalid escape sequence in string literal")
                            .with_label(Label::primary(&escape, "this escape is not supported"))
                            .with_note(notes::STRING_ESCAPES),
                    );
                }
            }
        }
        Ok(result)
    }

    fn parse_infix(
        parser: &mut Parser<'_, impl TokenStream>,
        left: Expr,
        token: Token,
    ) -> Result<Expr, ParseError> {
        if let Some(op) = BinaryOp::from_token(token.kind) {
            let right = Expr::precedence_parse(parser, token.precedence())?;
            return Ok(Expr::Binary {
                left: Arc::new(left),
                op,
                op_span: token.span,
                right: Arc::new(right),
            });
        }

        Ok(match token.kind {
            TokenKind::Assign => {
                let target = match left {
                    Expr::Ident(target) => target,
                    other => {
                        return parser.bail(
                            token.span,
                            Diagnostic::error(parser.file, "invalid assignment target").with_label(
                                Label::primary(&other.span(), "only variables can be assigned to"),
                            ),
                        )
                    }
                };
                // Parsing the right-hand side one level lower makes `=` right-associative.
                let value = Expr::precedence_parse(parser, Precedence::BELOW_ASSIGN)?;
                Expr::Assign {
                    target,
                    value: Arc::new(value),
                }
            }
            TokenKind::Dot => Expr::Member {
                left: Arc::new(left),
                field: parser.parse()?,
            },
            TokenKind::LeftParen => Expr::function_call(parser, left, token)?,

            _ => parser.bail(
                token.span,
                Diagnostic::bug(parser.file, "unimplemented infix operator")
                    .with_label(Label::primary(&token.span, "this operator cannot be parsed"))
                    .with_note("note: this means an infix operator was given a precedence level, but wasn't matched by Expr::parse_infix"),
            )?,
        })
    }

    fn function_call(
        parser: &mut Parser<'_, impl TokenStream>,
        function: Expr,
        open: Token,
    ) -> Result<Expr, ParseError> {
        let mut args = vec![];
        let close = if let Some(close) = parser.eat(TokenKind::RightParen)? {
            close
        } else {
            loop {
                args.push(parser.parse()?);
                let token = parser.next_token()?;
                match token.kind {
                    TokenKind::Comma => (),
                    TokenKind::RightParen => break token,
                    _ => {
                        return parser.bail(
                            token.span,
                            Diagnostic::error(parser.file, "`,` or `)` expected after function argument")
                                .with_label(Label::primary(
                                    &token.span,
                                    "this was expected to continue or close the argument list",
                                ))
                                .with_label(Label::secondary(&open.span, "the argument list starts here"))
                                .with_note("note: arguments to functions are separated by commas `,`"),
                        )
                    }
                }
            }
        };
        Ok(Expr::Call {
            span: function.span().join(&close.span),
            function: Arc::new(function),
            args,
        })
    }

    pub fn precedence_parse(
        parser: &mut Parser<'_, impl TokenStream>,
        precedence: Precedence,
    ) -> Result<Expr, ParseError> {
        let token = parser.next_token()?;
        parser.nested(|parser| {
            parser.descend(token.span)?;
            let mut chain = Expr::parse_prefix(parser, token)?;

            while precedence < parser.peek_token()?.precedence() {
                let operator = parser.next_token()?;
                // Every operator applied here makes the tree one level deeper, even though the
                // parser itself does not recurse.
                parser.descend(operator.span)?;
                chain = Expr::parse_infix(parser, chain, operator)?;
            }

            Ok(chain)
        })
    }
}

impl Precedence {
    pub const PATH: Self = Self::Some(6);
    pub const CALL: Self = Self::Some(8);
    pub const PREFIX: Self = Self::Some(10);

    pub const ASSIGN: Self = Self::Some(50);
    pub const BELOW_ASSIGN: Self = Self::Some(51);

    pub const EXPR: Self = Self::Some(u8::MAX);
}

impl Token {
    fn precedence(&self) -> Precedence {
        match self.kind {
            TokenKind::Dot => Precedence::PATH,
            TokenKind::LeftParen => Precedence::CALL,
            TokenKind::Assign => Precedence::ASSIGN,

            TokenKind::Mul | TokenKind::Div | TokenKind::Rem => Precedence::Some(16),
            TokenKind::Add | TokenKind::Sub => Precedence::Some(20),
            TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual => Precedence::Some(24),
            TokenKind::Equal | TokenKind::NotEqual => Precedence::Some(26),
            TokenKind::And => Precedence::Some(30),
            TokenKind::Or => Precedence::Some(32),

            _ => Precedence::None,
        }
    }
}

/// Specialized version of [`Option<T>`] that's built for handling precedence levels.
///
/// Lower numbers bind tighter, so unlike [`Option<u8>`], `Some(0)` compares as the greatest
/// precedence level and `None` as the lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    None,
    Some(u8),
}

impl From<Precedence> for Option<u8> {
    fn from(value: Precedence) -> Self {
        match value {
            Precedence::None => None,
            Precedence::Some(x) => Some(x),
        }
    }
}

impl PartialOrd for Precedence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let this = Option::<u8>::from(*self).map(|x| u8::MAX - x);
        let other = Option::<u8>::from(*other).map(|x| u8::MAX - x);
        this.partial_cmp(&other)
    }
}
