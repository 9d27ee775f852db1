use snip_core::{Type, Value};

use super::{BasicBlockId, LocalId, RegisterId};

/// [`Insn`] represents an instruction that produces a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Insn {
    /// Placeholder emitted when the compiler encounters an error. Never executed, since IR
    /// with errors is never emitted.
    Error,
    /// The result of an expression of type `void`. Evaluates to `null`.
    Void,

    /// Constant value.
    Const(Value),
    /// Reads a local variable.
    Local(LocalId),

    /// # Operators

    Neg(RegisterId),
    Not(RegisterId),
    /// Converts an `int` to a `float`.
    IntToFloat(RegisterId),
    /// Arithmetic on two operands of the same numeric type.
    Arithmetic {
        op: ArithmeticOp,
        left: RegisterId,
        right: RegisterId,
    },
    Compare {
        op: CompareOp,
        left: RegisterId,
        right: RegisterId,
    },
    /// Concatenates two strings.
    Concat {
        left: RegisterId,
        right: RegisterId,
    },

    /// # Functions

    Call {
        callee: Callee,
        arguments: Vec<RegisterId>,
    },
    /// Reads the value named `key` from the value source supplied by the host, and checks it
    /// against `ty`.
    Lookup { key: String, ty: Type },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

/// Target of a [`Insn::Call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callee {
    /// A function defined in the same module, by index into the module's functions.
    Local(u32),
    /// A function defined in a referenced library, by index into the module's imports.
    Import(u32),
}

/// [`Sink`] represents a side-effectful instruction that does not produce a meaningful result.
#[derive(Debug, Clone, PartialEq)]
pub enum Sink {
    /// Discards the value of the given register. Used for expression statements.
    Discard(RegisterId),
    /// Stores the value of a register in a local variable.
    Store(LocalId, RegisterId),
}

/// [`Terminator`] represents an instruction which ends the execution of a basic block.
///
/// Every basic block must end with a [`Terminator`]; this ensures the control flow forms an easily
/// digestible graph. Like [`Sink`]s, [`Terminator`]s do not produce any meaningful result.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Terminator {
    /// Block is unreachable. Reaching it at run time means the IR is broken.
    #[default]
    Unreachable,

    /// Unconditionally go to another block after the current one's done executing.
    Goto(BasicBlockId),
    /// Conditionally go to one of two blocks after the current one's done executing.
    GotoIf {
        condition: RegisterId,
        if_true: BasicBlockId,
        if_false: BasicBlockId,
    },

    /// Return a value from the function.
    ///
    /// If a function is to return nothing (`void`), use this in conjunction with [`Insn::Void`].
    Return(RegisterId),
}

impl Terminator {
    pub fn successors(&self) -> impl Iterator<Item = BasicBlockId> {
        let (first, second) = match *self {
            Terminator::Unreachable | Terminator::Return(_) => (None, None),
            Terminator::Goto(target) => (Some(target), None),
            Terminator::GotoIf {
                if_true, if_false, ..
            } => (Some(if_true), Some(if_false)),
        };
        first.into_iter().chain(second)
    }
}
