//! Codes attached to diagnostics emitted by the compiler.
//!
//! Hosts may match on these to treat some classes of errors specially.

/// A name is used, but no variable with that name is in scope.
pub const UNRESOLVED_NAME: &str = "E0103";
/// A type or class name does not refer to anything.
pub const UNKNOWN_TYPE: &str = "E0246";
/// A called function does not exist.
pub const UNKNOWN_FUNCTION: &str = "E0117";
/// A value's type does not match what is expected of it.
pub const TYPE_MISMATCH: &str = "E0308";
/// A function was called with the wrong number of arguments.
pub const WRONG_ARGUMENT_COUNT: &str = "E0061";
/// A name was declared more than once in the same scope.
pub const REDEFINITION: &str = "E0128";
/// A function that must return a value does not return one.
pub const MISSING_RETURN_VALUE: &str = "E0069";
pub use snip_syntax::diagnostics::codes::MISSING_SEMICOLON;
/// The construct is valid syntax, but not supported by the compiler.
pub const UNSUPPORTED: &str = "E0999";
