pub mod codes {
    /// A statement that requires a terminating `;` does not have one.
    pub const MISSING_SEMICOLON: &str = "E0004";
    /// Statements or expressions are nested deeper than the parser allows.
    pub const NESTING_TOO_DEEP: &str = "E0583";
}

pub mod labels {
    use snip_foundation::{errors::Label, source::Span};

    pub fn invalid_identifier(span: Span, input: &str) -> Label {
        Label::primary(
            &span,
            format!("`{}` is not a valid identifier", span.get_input(input)),
        )
    }
}

pub mod notes {
    pub const IDENTIFIER_CHARS: &str = "note: identifiers are made up of characters a-z, A-Z, 0-9 and _, must not start with a digit, and must not be a keyword";

    pub const STRING_ESCAPES: &str =
        "note: supported escape sequences are \\\\, \\\", \\n, \\r, \\t and \\0";
}
