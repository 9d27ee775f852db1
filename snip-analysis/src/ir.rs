mod basic_block;
pub mod dump;
mod insn;
pub mod interpret;
mod serialization;

use std::fmt;

use snip_core::Type;
use snip_foundation::source::Span;

pub use basic_block::*;
pub use insn::*;

/// Represents the IR of a function.
#[derive(Debug, Clone, PartialEq)]
pub struct Ir {
    pub return_ty: Type,
    /// Local variables declared in the function.
    pub locals: Vec<LocalVar>,
    /// The first `param_count` locals are treated as the function's parameters.
    pub param_count: u16,

    pub nodes: Vec<Node>,
    /// The first basic block in the function is treated as its entry point. Further blocks must
    /// be reached via this block.
    pub basic_blocks: Vec<BasicBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVar {
    pub name: String,
    pub ty: Type,
}

/// Unique ID of a [`Node`] within a function.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// Unique ID of a [`Register`] within a function.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterId(NodeId);

/// Unique ID of a [`BasicBlock`] within a function.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicBlockId(u32);

/// Unique ID of a local variable within a function.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalId(u32);

/// Represents an execution node inside of a function.
///
/// Nodes are executed in the order they appear in their basic block's flow. [`Register`]s
/// produce values and [`Sink`]s consume them for their side effects.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// The source span that produced this node. Empty for nodes loaded from archives.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Register(Register),
    Sink(Sink),
}

/// A register represents a single value produced in a basic block.
///
/// A register is assigned every time its basic block executes, and can be read by any node
/// that executes after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    /// Name for debugging purposes.
    pub name: String,
    pub ty: Type,
    pub insn: Insn,
}

impl Ir {
    pub fn new(return_ty: Type) -> Self {
        Self {
            return_ty,
            locals: vec![],
            param_count: 0,
            nodes: vec![],
            basic_blocks: vec![],
        }
    }

    pub fn add_local(&mut self, name: impl Into<String>, ty: Type) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(LocalVar {
            name: name.into(),
            ty,
        });
        id
    }

    pub fn create_basic_block(&mut self, basic_block: BasicBlock) -> BasicBlockId {
        let id = BasicBlockId(self.basic_blocks.len() as u32);
        self.basic_blocks.push(basic_block);
        id
    }

    pub fn create_register(&mut self, span: Span, name: String, ty: Type, insn: Insn) -> RegisterId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind: NodeKind::Register(Register { name, ty, insn }),
            span,
        });
        RegisterId(id)
    }

    pub fn create_sink(&mut self, span: Span, sink: Sink) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind: NodeKind::Sink(sink),
            span,
        });
        id
    }

    pub fn local(&self, id: LocalId) -> Option<&LocalVar> {
        self.locals.get(id.0 as usize)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// Returns the register with the given ID, or `None` if the ID is out of bounds or refers
    /// to a sink.
    pub fn register(&self, id: RegisterId) -> Option<&Register> {
        match &self.node(id.0)?.kind {
            NodeKind::Register(register) => Some(register),
            NodeKind::Sink(_) => None,
        }
    }

    pub fn basic_block(&self, id: BasicBlockId) -> Option<&BasicBlock> {
        self.basic_blocks.get(id.0 as usize)
    }

    pub fn basic_block_mut(&mut self, id: BasicBlockId) -> Option<&mut BasicBlock> {
        self.basic_blocks.get_mut(id.0 as usize)
    }

    pub fn basic_block_ids(&self) -> impl Iterator<Item = BasicBlockId> {
        (0..self.basic_blocks.len() as u32).map(BasicBlockId)
    }

    /// Returns whether `target` can be reached by following terminators from the entry block.
    pub fn is_reachable(&self, target: BasicBlockId) -> bool {
        let mut visited = vec![false; self.basic_blocks.len()];
        let mut stack = vec![BasicBlockId(0)];
        while let Some(id) = stack.pop() {
            let Some(seen) = visited.get_mut(id.0 as usize) else {
                continue;
            };
            if *seen {
                continue;
            }
            *seen = true;
            if id == target {
                return true;
            }
            if let Some(block) = self.basic_block(id) {
                stack.extend(block.terminator.successors());
            }
        }
        false
    }
}

impl NodeId {
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

impl BasicBlockId {
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

impl LocalId {
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

impl From<RegisterId> for NodeId {
    fn from(value: RegisterId) -> Self {
        value.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0 .0)
    }
}

impl fmt::Debug for BasicBlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

impl fmt::Debug for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}
