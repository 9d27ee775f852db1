use snip_foundation::source::{Span, Spanned};

macro_rules! define_tokens {
    ($($name:tt = $pretty_name:tt),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TokenKind {
            $($name),*
        }

        impl TokenKind {
            /// Human-readable name of the token kind, for use in diagnostics.
            pub fn name(self) -> &'static str {
                match self {
                    $(TokenKind::$name => $pretty_name),*
                }
            }
        }
    };
}

define_tokens! {
    Comment = "comment",

    Ident = "identifier",

    Int    = "int literal",
    Float  = "float literal",
    String = "string literal",

    Add          = "`+`",
    Sub          = "`-`",
    Mul          = "`*`",
    Div          = "`/`",
    Rem          = "`%`",
    Not          = "`!`",
    Equal        = "`==`",
    NotEqual     = "`!=`",
    Less         = "`<`",
    Greater      = "`>`",
    LessEqual    = "`<=`",
    GreaterEqual = "`>=`",
    And          = "`&&`",
    Or           = "`||`",
    Assign       = "`=`",

    LeftParen  = "`(`",
    RightParen = "`)`",
    LeftBrace  = "`{`",
    RightBrace = "`}`",
    Dot        = "`.`",
    Comma      = "`,`",
    Semicolon  = "`;`",

    EndOfFile = "end of file",
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Spanned for Token {
    fn span(&self) -> Span {
        self.span
    }
}

/// Words that cannot be used as names of variables, functions, or classes.
pub const KEYWORDS: &[&str] = &[
    "namespace",
    "class",
    "static",
    "var",
    "if",
    "else",
    "while",
    "return",
    "true",
    "false",
    "null",
    "lookup",
];

pub fn is_keyword(ident: &str) -> bool {
    KEYWORDS.contains(&ident)
}
