//! Syntax tree of a compilation unit.
//!
//! The tree is an immutable value. Subtrees are shared through [`Arc`](std::sync::Arc), so
//! rewriting a tree means building a new one that reuses every subtree that did not change.
//! Nodes created by rewrites rather than by the parser carry [`Span::EMPTY`].
//!
//! [`Span::EMPTY`]: snip_foundation::source::Span::EMPTY

mod expr;
mod item;
mod stmt;

pub use expr::*;
pub use item::*;
pub use stmt::*;
