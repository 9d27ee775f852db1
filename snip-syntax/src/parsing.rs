use snip_foundation::{
    errors::{Diagnostic, Label},
    source::{SourceFileId, Span},
};

use crate::{
    diagnostics::codes,
    lexis::{
        token::{Token, TokenKind},
        LexError, TokenStream,
    },
};

/// How deeply statements and expressions may nest inside one another. Parsing and compiling
/// recurse once per level, so this keeps both well within the stack.
pub const MAX_NESTING_DEPTH: usize = 128;

pub struct Parser<'a, T> {
    pub file: SourceFileId,
    pub input: &'a str,
    pub tokens: T,
    pub errors: Vec<Diagnostic>,
    depth: usize,
}

impl<'a, T> Parser<'a, T> {
    pub fn new(file: SourceFileId, input: &'a str, tokens: T) -> Self {
        Self {
            file,
            input,
            tokens,
            errors: vec![],
            depth: 0,
        }
    }

    pub fn sub(&mut self) -> Parser<'a, &mut T> {
        Parser {
            file: self.file,
            input: self.input,
            tokens: &mut self.tokens,
            errors: vec![],
            depth: self.depth,
        }
    }

    pub fn bail<TT>(&mut self, error_span: Span, error: Diagnostic) -> Result<TT, ParseError> {
        self.errors.push(error);
        Err(ParseError::new(error_span))
    }

    pub fn emit_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
    }

    /// Runs `f`, then restores the nesting depth to what it was before, no matter how many
    /// times `f` called [`descend`](Self::descend) and whether it succeeded.
    pub fn nested<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let depth = self.depth;
        let result = f(self);
        self.depth = depth;
        result
    }

    /// Goes one nesting level deeper, failing once [`MAX_NESTING_DEPTH`] is exceeded. Only call
    /// this inside [`nested`](Self::nested).
    pub fn descend(&mut self, span: Span) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return self.bail(
                span,
                Diagnostic::error(self.file, "code is nested too deeply")
                    .with_code(codes::NESTING_TOO_DEEP)
                    .with_label(Label::primary(&span, "nesting limit reached here"))
                    .with_note(format!(
                        "note: statements and expressions may nest at most {MAX_NESTING_DEPTH} levels deep"
                    )),
            );
        }
        self.depth += 1;
        Ok(())
    }
}

impl<'a, T> Parser<'a, T>
where
    T: TokenStream,
{
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.tokens.next().map_err(|LexError { span, diagnostic }| {
            self.errors.push(*diagnostic);
            ParseError::new(span)
        })
    }

    pub fn peek_token(&mut self) -> Result<Token, ParseError> {
        self.tokens.peek().map_err(|LexError { span, diagnostic }| {
            self.errors.push(*diagnostic);
            ParseError::new(span)
        })
    }

    pub fn peek_second_token(&mut self) -> Result<Token, ParseError> {
        self.tokens.peek_second().map_err(|LexError { span, diagnostic }| {
            self.errors.push(*diagnostic);
            ParseError::new(span)
        })
    }

    /// Returns whether the next token is of the given kind, without consuming it.
    pub fn next_is(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        Ok(self.peek_token()?.kind == kind)
    }

    /// Returns whether the next token is the identifier `keyword`, without consuming it.
    pub fn next_is_keyword(&mut self, keyword: &str) -> Result<bool, ParseError> {
        let token = self.peek_token()?;
        Ok(token.kind == TokenKind::Ident && token.span.get_input(self.input) == keyword)
    }

    /// Consumes the next token if it is of the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> Result<Option<Token>, ParseError> {
        if self.next_is(kind)? {
            Ok(Some(self.next_token()?))
        } else {
            Ok(None)
        }
    }

    pub fn expect_token(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let token = self.next_token()?;
        if token.kind == kind {
            Ok(token)
        } else {
            self.bail(
                token.span,
                Diagnostic::error(self.file, format!("{} expected", kind.name())).with_label(
                    Label::primary(
                        &token.span,
                        format!("{} expected here, but got {}", kind.name(), token.kind.name()),
                    ),
                ),
            )
        }
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> Result<Token, ParseError> {
        let token = self.next_token()?;
        if token.kind == TokenKind::Ident && token.span.get_input(self.input) == keyword {
            Ok(token)
        } else {
            self.bail(
                token.span,
                Diagnostic::error(self.file, format!("`{keyword}` expected"))
                    .with_label(Label::primary(&token.span, format!("`{keyword}` expected here"))),
            )
        }
    }

    pub fn parse<N>(&mut self) -> Result<N, ParseError>
    where
        N: Parse,
    {
        N::parse(self)
    }

    pub fn parse_with_error<N>(
        &mut self,
        diagnostic: impl FnOnce(&Self, Span) -> Diagnostic,
    ) -> Result<N, ParseError>
    where
        N: Parse,
    {
        let (result, sub_errors) = {
            let mut sub = self.sub();
            let result = sub.parse::<N>();
            (result, sub.errors)
        };
        match result {
            Ok(node) => {
                self.errors.extend(sub_errors);
                Ok(node)
            }
            Err(error) => {
                let diagnostic = diagnostic(self, error.span);
                self.errors.push(diagnostic);
                Err(error)
            }
        }
    }

    /// Skips tokens until just past the next `;`, or until (but not including) the next `}` at
    /// the current nesting level.
    pub fn recover_to_statement_end(&mut self) {
        let mut nesting = 0_usize;
        loop {
            let position = self.tokens.position();
            let Ok(token) = self.tokens.next() else {
                continue;
            };
            match token.kind {
                TokenKind::EndOfFile => {
                    self.tokens.seek(position);
                    return;
                }
                TokenKind::Semicolon if nesting == 0 => return,
                TokenKind::LeftBrace => nesting += 1,
                TokenKind::RightBrace if nesting == 0 => {
                    self.tokens.seek(position);
                    return;
                }
                TokenKind::RightBrace => nesting -= 1,
                _ => (),
            }
        }
    }
}

/// The AST node could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub span: Span,
}

impl ParseError {
    pub fn new(span: Span) -> Self {
        Self { span }
    }
}

pub trait Parse: Sized {
    fn parse(parser: &mut Parser<'_, impl TokenStream>) -> Result<Self, ParseError>;
}

pub trait PredictiveParse: Parse {
    /// Returns `true` if this syntactic construct starts with the given token.
    fn starts_with(token: &Token, input: &str) -> bool;
}

impl<N> Parse for Option<N>
where
    N: PredictiveParse,
{
    fn parse(parser: &mut Parser<'_, impl TokenStream>) -> Result<Self, ParseError> {
        let next_token = parser.peek_token()?;
        if N::starts_with(&next_token, parser.input) {
            Ok(Some(N::parse(parser)?))
        } else {
            Ok(None)
        }
    }
}
