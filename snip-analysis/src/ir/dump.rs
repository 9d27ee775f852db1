use std::fmt::{self, Display, Formatter};

use bitflags::Flags;

use crate::{
    function::FunctionFlags,
    module::{FunctionDef, Module},
};

use super::{BasicBlockId, Callee, Insn, Ir, LocalId, NodeId, NodeKind, Register, RegisterId, Sink, Terminator};

/// Human-readable listing of a function's IR.
pub struct DumpIr<'a> {
    pub module: &'a Module,
    pub ir: &'a Ir,
}

impl<'a> DumpIr<'a> {
    fn register_id(&self, f: &mut Formatter<'_>, register_id: RegisterId) -> fmt::Result {
        let i = NodeId::from(register_id).to_u32();
        match self.ir.register(register_id) {
            Some(register) => write!(f, "%{}_{i}", register.name),
            None => write!(f, "%<invalid>_{i}"),
        }
    }

    fn basic_block_id(&self, f: &mut Formatter<'_>, basic_block_id: BasicBlockId) -> fmt::Result {
        let i = basic_block_id.to_u32();
        match self.ir.basic_block(basic_block_id) {
            Some(block) => write!(f, ":{}_{i}", block.label),
            None => write!(f, ":<invalid>_{i}"),
        }
    }

    fn local(&self, f: &mut Formatter<'_>, local: LocalId) -> fmt::Result {
        match self.ir.local(local) {
            Some(var) => write!(f, "{} ${}", var.ty, var.name),
            None => write!(f, "${}", local.to_u32()),
        }
    }

    fn callee(&self, f: &mut Formatter<'_>, callee: Callee) -> fmt::Result {
        match callee {
            Callee::Local(index) => f.write_str(&self.module.function_name(index)),
            Callee::Import(index) => match self.module.imports.get(index as usize) {
                Some(import) => write!(f, "import {}::{}.{}", import.library, import.class, import.function),
                None => write!(f, "import <invalid {index}>"),
            },
        }
    }

    fn register(&self, f: &mut Formatter<'_>, node_id: NodeId, register: &Register) -> fmt::Result {
        let i = node_id.to_u32();
        write!(f, "%{}_{i}: {} = ", register.name, register.ty)?;
        match &register.insn {
            Insn::Error => f.write_str("error")?,
            Insn::Void => f.write_str("void")?,
            Insn::Const(value) => write!(f, "const {value:?}")?,
            Insn::Local(local) => {
                f.write_str("local ")?;
                self.local(f, *local)?;
            }
            Insn::Neg(operand) => {
                f.write_str("neg ")?;
                self.register_id(f, *operand)?;
            }
            Insn::Not(operand) => {
                f.write_str("not ")?;
                self.register_id(f, *operand)?;
            }
            Insn::IntToFloat(operand) => {
                f.write_str("int_to_float ")?;
                self.register_id(f, *operand)?;
            }
            Insn::Arithmetic { op, left, right } => {
                write!(f, "{} ", format!("{op:?}").to_lowercase())?;
                self.register_id(f, *left)?;
                f.write_str(", ")?;
                self.register_id(f, *right)?;
            }
            Insn::Compare { op, left, right } => {
                write!(f, "cmp {} ", format!("{op:?}").to_lowercase())?;
                self.register_id(f, *left)?;
                f.write_str(", ")?;
                self.register_id(f, *right)?;
            }
            Insn::Concat { left, right } => {
                f.write_str("concat ")?;
                self.register_id(f, *left)?;
                f.write_str(", ")?;
                self.register_id(f, *right)?;
            }
            Insn::Call { callee, arguments } => {
                f.write_str("call ")?;
                self.callee(f, *callee)?;
                f.write_str(" (")?;
                for (i, register) in arguments.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    self.register_id(f, *register)?;
                }
                f.write_str(")")?;
            }
            Insn::Lookup { key, ty } => write!(f, "lookup {ty} {key:?}")?,
        }
        Ok(())
    }

    fn sink(&self, f: &mut Formatter<'_>, sink: &Sink) -> fmt::Result {
        match sink {
            Sink::Discard(register_id) => {
                f.write_str("discard ")?;
                self.register_id(f, *register_id)?;
            }
            Sink::Store(local, value) => {
                f.write_str("store [")?;
                self.local(f, *local)?;
                f.write_str("], ")?;
                self.register_id(f, *value)?;
            }
        }
        Ok(())
    }

    fn terminator(&self, f: &mut Formatter<'_>, terminator: &Terminator) -> fmt::Result {
        match terminator {
            Terminator::Unreachable => f.write_str("unreachable")?,
            Terminator::Goto(basic_block_id) => {
                f.write_str("goto ")?;
                self.basic_block_id(f, *basic_block_id)?;
            }
            Terminator::GotoIf {
                condition,
                if_true,
                if_false,
            } => {
                f.write_str("if ")?;
                self.register_id(f, *condition)?;
                f.write_str(" goto ")?;
                self.basic_block_id(f, *if_true)?;
                f.write_str(" else goto ")?;
                self.basic_block_id(f, *if_false)?;
            }
            Terminator::Return(register_id) => {
                f.write_str("return ")?;
                self.register_id(f, *register_id)?;
            }
        }
        Ok(())
    }
}

impl<'a> Display for DumpIr<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("{\n")?;

        for (i, var) in self.ir.locals.iter().enumerate() {
            let kind = if i < usize::from(self.ir.param_count) {
                "param"
            } else {
                "local"
            };
            writeln!(f, "    {kind} {} ${}", var.ty, var.name)?;
        }
        if !self.ir.locals.is_empty() {
            writeln!(f)?;
        }

        for (i, basic_block) in self.ir.basic_blocks.iter().enumerate() {
            if i != 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}_{i}:", basic_block.label)?;
            for &node_id in &basic_block.flow {
                f.write_str("    ")?;
                match self.ir.node(node_id).map(|node| &node.kind) {
                    Some(NodeKind::Register(register)) => self.register(f, node_id, register)?,
                    Some(NodeKind::Sink(sink)) => self.sink(f, sink)?,
                    None => write!(f, "<invalid node {}>", node_id.to_u32())?,
                }
                writeln!(f)?;
            }
            f.write_str("    ")?;
            self.terminator(f, &basic_block.terminator)?;
            writeln!(f)?;
        }

        f.write_str("}")?;

        Ok(())
    }
}

/// Signature and IR of a function.
pub struct DumpFunction<'a> {
    pub module: &'a Module,
    pub function: &'a FunctionDef,
}

impl<'a> Display for DumpFunction<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.function.flags.is_empty() {
            write!(f, "{} ", self.function.flags)?;
        }
        write!(f, "{} {}(", self.function.return_ty, self.function.name)?;
        for (i, param) in self.function.params.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", param.ty, param.name)?;
        }
        f.write_str(") ")?;
        DumpIr {
            module: self.module,
            ir: &self.function.ir,
        }
        .fmt(f)
    }
}

struct FlagDisplay<T> {
    flags: T,
    i: usize,
}

impl<T> FlagDisplay<T> {
    fn new(flags: T) -> Self {
        Self { flags, i: 0 }
    }

    fn flag(
        &mut self,
        f: &mut Formatter<'_>,
        single_flag: T,
        flag_name: &str,
    ) -> Result<&mut Self, fmt::Error>
    where
        T: Flags,
    {
        if self.flags.contains(single_flag) {
            if self.i != 0 {
                f.write_str(" ")?;
            }
            f.write_str(flag_name)?;
            self.i += 1;
        }
        Ok(self)
    }
}

impl Display for FunctionFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        FlagDisplay::new(*self)
            .flag(f, FunctionFlags::STATIC, "static")?
            .flag(f, FunctionFlags::ENTRY, "entry")?;
        Ok(())
    }
}
