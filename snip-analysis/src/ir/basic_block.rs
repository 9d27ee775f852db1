use crate::ir::Terminator;

use super::NodeId;

/// A basic block represents a continuous sequence of [`Node`]s ended with a [`Terminator`].
///
/// [`Node`]: super::Node
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: String,
    pub flow: Vec<NodeId>,
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            flow: vec![],
            terminator: Terminator::default(),
        }
    }
}
