//! Foundational types for the Snip compiler.

pub mod errors;
pub mod source;
