use snip_foundation::{
    errors::{Diagnostic, Label, ReplacementSuggestion},
    source::{SourceFileId, Span},
};

use super::{
    token::{Token, TokenKind},
    LexError, TokenStream,
};

pub struct Lexer<'a> {
    pub file: SourceFileId,
    pub input: &'a str,
    pub position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(file: SourceFileId, input: &'a str) -> Self {
        Self {
            file,
            input,
            position: 0,
        }
    }

    pub fn current_char(&self) -> Option<char> {
        self.input.get(self.position..)?.chars().next()
    }

    pub fn advance_char(&mut self) {
        if let Some(char) = self.current_char() {
            self.position += char.len_utf8();
        }
    }

    fn span(&self, start: usize) -> Span {
        Span::new(start, self.position)
    }

    fn span_with_len(&self, start: usize, len: usize) -> Span {
        let len = self.input[start..]
            .char_indices()
            .nth(len)
            .map(|(index, _)| index)
            .unwrap_or(self.input.len() - start);
        Span::new(start, start + len)
    }

    fn skip_whitespace(&mut self) {
        while let Some(' ' | '\t' | '\r' | '\n') = self.current_char() {
            self.advance_char();
        }
    }

    fn comment_or_division(&mut self, start: usize) -> Result<TokenKind, LexError> {
        self.advance_char();
        match self.current_char() {
            Some('/') => {
                while !matches!(self.current_char(), None | Some('\n')) {
                    self.advance_char();
                }
                Ok(TokenKind::Comment)
            }
            Some('*') => {
                self.advance_char();
                loop {
                    match self.current_char() {
                        Some('*') => {
                            self.advance_char();
                            if self.current_char() == Some('/') {
                                self.advance_char();
                                return Ok(TokenKind::Comment);
                            }
                        }
                        None => {
                            let span = self.span_with_len(start, 2);
                            return Err(LexError::new(
                                span,
                                Diagnostic::error(
                                    self.file,
                                    "block comment does not have a matching `*/` terminator",
                                )
                                .with_label(Label::primary(&span, "the comment starts here")),
                            ));
                        }
                        _ => self.advance_char(),
                    }
                }
            }
            _ => Ok(TokenKind::Div),
        }
    }

    fn identifier(&mut self) -> TokenKind {
        while let Some('a'..='z' | 'A'..='Z' | '0'..='9' | '_') = self.current_char() {
            self.advance_char();
        }
        TokenKind::Ident
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, LexError> {
        while let Some('0'..='9') = self.current_char() {
            self.advance_char();
        }
        let mut kind = TokenKind::Int;
        if self.current_char() == Some('.')
            && matches!(self.input[self.position + 1..].chars().next(), Some('0'..='9'))
        {
            self.advance_char();
            while let Some('0'..='9') = self.current_char() {
                self.advance_char();
            }
            kind = TokenKind::Float;
        }

        if let Some('A'..='Z' | 'a'..='z' | '_') = self.current_char() {
            let ident_start = self.position;
            self.identifier();
            let ident_end = self.position;
            let span = Span::new(ident_start, ident_end);
            return Err(LexError::new(
                span,
                Diagnostic::error(
                    self.file,
                    "number literal must not be immediately followed by an identifier",
                )
                .with_label(Label::secondary(
                    &Span::new(start, ident_start),
                    "number literal occurs here...",
                ))
                .with_label(Label::primary(
                    &span,
                    "...and is immediately followed by an identifier",
                ))
                .with_note((
                    "help: add a space between the number and the identifier",
                    ReplacementSuggestion {
                        span: Span::new(start, ident_end),
                        replacement: format!(
                            "{} {}",
                            &self.input[start..ident_start],
                            &self.input[ident_start..ident_end]
                        ),
                    },
                )),
            ));
        }

        Ok(kind)
    }

    fn string(&mut self, start: usize) -> Result<TokenKind, LexError> {
        self.advance_char();
        while self.current_char() != Some('"') {
            match self.current_char() {
                None | Some('\n') => {
                    let span = self.span_with_len(start, 1);
                    return Err(LexError::new(
                        span,
                        Diagnostic::error(
                            self.file,
                            "string literal does not have a closing quote `\"`",
                        )
                        .with_label(Label::primary(&span, "the string starts here")),
                    ));
                }
                // Escapes are decoded by the parser. The lexer only needs to know that `\"`
                // does not end the string.
                Some('\\') => {
                    self.advance_char();
                    self.advance_char();
                }
                _ => self.advance_char(),
            }
        }
        self.advance_char();
        Ok(TokenKind::String)
    }

    fn single_char_token(&mut self, kind: TokenKind) -> TokenKind {
        self.advance_char();
        kind
    }

    fn single_or_double_char_token(
        &mut self,
        kind: TokenKind,
        second: char,
        second_kind: TokenKind,
    ) -> TokenKind {
        self.advance_char();
        if self.current_char() == Some(second) {
            self.advance_char();
            second_kind
        } else {
            kind
        }
    }

    fn double_char_token(
        &mut self,
        start: usize,
        second: char,
        kind: TokenKind,
    ) -> Result<TokenKind, LexError> {
        self.advance_char();
        if self.current_char() == Some(second) {
            self.advance_char();
            Ok(kind)
        } else {
            let span = self.span(start);
            Err(LexError::new(
                span,
                Diagnostic::error(self.file, format!("{} expected", kind.name()))
                    .with_label(Label::primary(&span, "this character is not a valid token")),
            ))
        }
    }

    pub fn next_token_include_comments(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let start = self.position;

        let kind = if let Some(char) = self.current_char() {
            match char {
                '/' => self.comment_or_division(start)?,
                'a'..='z' | 'A'..='Z' | '_' => self.identifier(),
                '0'..='9' => self.number(start)?,
                '"' => self.string(start)?,
                '+' => self.single_char_token(TokenKind::Add),
                '-' => self.single_char_token(TokenKind::Sub),
                '*' => self.single_char_token(TokenKind::Mul),
                '%' => self.single_char_token(TokenKind::Rem),
                '<' => self.single_or_double_char_token(TokenKind::Less, '=', TokenKind::LessEqual),
                '>' => self.single_or_double_char_token(
                    TokenKind::Greater,
                    '=',
                    TokenKind::GreaterEqual,
                ),
                '!' => self.single_or_double_char_token(TokenKind::Not, '=', TokenKind::NotEqual),
                '=' => self.single_or_double_char_token(TokenKind::Assign, '=', TokenKind::Equal),
                '&' => self.double_char_token(start, '&', TokenKind::And)?,
                '|' => self.double_char_token(start, '|', TokenKind::Or)?,
                '(' => self.single_char_token(TokenKind::LeftParen),
                ')' => self.single_char_token(TokenKind::RightParen),
                '{' => self.single_char_token(TokenKind::LeftBrace),
                '}' => self.single_char_token(TokenKind::RightBrace),
                '.' => self.single_char_token(TokenKind::Dot),
                ',' => self.single_char_token(TokenKind::Comma),
                ';' => self.single_char_token(TokenKind::Semicolon),
                unknown => {
                    self.advance_char();
                    let span = self.span(start);
                    return Err(LexError::new(
                        span,
                        Diagnostic::error(
                            self.file,
                            format!("unexpected character `{}`", unknown.escape_debug()),
                        )
                        .with_label(Label::primary(&span, "this character is not valid here")),
                    ));
                }
            }
        } else {
            TokenKind::EndOfFile
        };

        Ok(Token {
            kind,
            span: self.span(start),
        })
    }
}

impl<'a> TokenStream for Lexer<'a> {
    type Position = usize;

    fn position(&self) -> Self::Position {
        self.position
    }

    fn seek(&mut self, to: Self::Position) {
        self.position = to;
    }

    fn next_include_comments(&mut self) -> Result<Token, LexError> {
        self.next_token_include_comments()
    }
}

#[cfg(test)]
mod tests {
    use snip_foundation::source::{SourceFile, SourceFileSet};

    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.snip", input));
        let mut lexer = Lexer::new(file, input);
        let mut kinds = vec![];
        loop {
            let token = lexer.next().unwrap();
            if token.kind == TokenKind::EndOfFile {
                break kinds;
            }
            kinds.push(token.kind);
        }
    }

    #[test]
    fn operators_use_maximal_munch() {
        assert_eq!(
            kinds("a <= b == !c && d"),
            [
                TokenKind::Ident,
                TokenKind::LessEqual,
                TokenKind::Ident,
                TokenKind::Equal,
                TokenKind::Not,
                TokenKind::Ident,
                TokenKind::And,
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("1 // one\n/* two */ 2.5"),
            [TokenKind::Int, TokenKind::Float]
        );
    }

    #[test]
    fn member_access_on_integers_is_not_a_float() {
        assert_eq!(
            kinds("1.x"),
            [TokenKind::Int, TokenKind::Dot, TokenKind::Ident]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let input = "\"abc";
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.snip", input));
        let error = Lexer::new(file, input).next().unwrap_err();
        assert_eq!(error.span, Span::new(0, 1));
    }
}
