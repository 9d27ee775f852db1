//! Binary representation of function IR, as stored in archives.
//!
//! Spans are not stored. Deserialized nodes carry [`Span::EMPTY`].

use std::io::{Read, Write};

use snip_core::{
    binary::{Deserialize, Deserializer, Error, ErrorKind, ResultContextExt, Serialize, Serializer},
    serializable_structure,
};
use snip_foundation::source::Span;

use super::{
    ArithmeticOp, BasicBlock, BasicBlockId, Callee, CompareOp, Insn, Ir, LocalId, LocalVar, Node,
    NodeId, NodeKind, Register, RegisterId, Sink, Terminator,
};

serializable_structure! {
    type Ir {
        return_ty,
        locals,
        param_count,
        nodes,
        basic_blocks,
    }
}

serializable_structure! {
    type LocalVar {
        name,
        ty,
    }
}

serializable_structure! {
    type BasicBlock {
        label,
        flow,
        terminator,
    }
}

serializable_structure! {
    type Register {
        name,
        ty,
        insn,
    }
}

macro_rules! serializable_id {
    ($T:ident($inner:ty)) => {
        impl Serialize for $T {
            fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
                self.0.serialize(serializer)
            }
        }

        impl Deserialize for $T {
            fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
                Ok(Self(deserializer.deserialize()?))
            }
        }
    };
}

serializable_id!(NodeId(u32));
serializable_id!(RegisterId(NodeId));
serializable_id!(BasicBlockId(u32));
serializable_id!(LocalId(u32));

impl Serialize for Node {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        match &self.kind {
            NodeKind::Register(register) => {
                0_u8.serialize(serializer)?;
                register.serialize(serializer)
            }
            NodeKind::Sink(sink) => {
                1_u8.serialize(serializer)?;
                sink.serialize(serializer)
            }
        }
    }
}

impl Deserialize for Node {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        let kind = match deserializer.deserialize::<u8>()? {
            0 => NodeKind::Register(deserializer.deserialize().context("in register")?),
            1 => NodeKind::Sink(deserializer.deserialize().context("in sink")?),
            other => return Err(invalid_tag("node", other)),
        };
        Ok(Node {
            kind,
            span: Span::EMPTY,
        })
    }
}

impl Serialize for Insn {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        match self {
            Insn::Error => 0_u8.serialize(serializer),
            Insn::Void => 1_u8.serialize(serializer),
            Insn::Const(value) => {
                2_u8.serialize(serializer)?;
                value.serialize(serializer)
            }
            Insn::Local(local) => {
                3_u8.serialize(serializer)?;
                local.serialize(serializer)
            }
            Insn::Neg(operand) => {
                4_u8.serialize(serializer)?;
                operand.serialize(serializer)
            }
            Insn::Not(operand) => {
                5_u8.serialize(serializer)?;
                operand.serialize(serializer)
            }
            Insn::IntToFloat(operand) => {
                6_u8.serialize(serializer)?;
                operand.serialize(serializer)
            }
            Insn::Arithmetic { op, left, right } => {
                7_u8.serialize(serializer)?;
                (*op as u8).serialize(serializer)?;
                left.serialize(serializer)?;
                right.serialize(serializer)
            }
            Insn::Compare { op, left, right } => {
                8_u8.serialize(serializer)?;
                (*op as u8).serialize(serializer)?;
                left.serialize(serializer)?;
                right.serialize(serializer)
            }
            Insn::Concat { left, right } => {
                9_u8.serialize(serializer)?;
                left.serialize(serializer)?;
                right.serialize(serializer)
            }
            Insn::Call { callee, arguments } => {
                10_u8.serialize(serializer)?;
                callee.serialize(serializer)?;
                arguments.serialize(serializer)
            }
            Insn::Lookup { key, ty } => {
                11_u8.serialize(serializer)?;
                key.serialize(serializer)?;
                ty.serialize(serializer)
            }
        }
    }
}

impl Deserialize for Insn {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        Ok(match deserializer.deserialize::<u8>()? {
            0 => Insn::Error,
            1 => Insn::Void,
            2 => Insn::Const(deserializer.deserialize()?),
            3 => Insn::Local(deserializer.deserialize()?),
            4 => Insn::Neg(deserializer.deserialize()?),
            5 => Insn::Not(deserializer.deserialize()?),
            6 => Insn::IntToFloat(deserializer.deserialize()?),
            7 => Insn::Arithmetic {
                op: deserializer.deserialize()?,
                left: deserializer.deserialize()?,
                right: deserializer.deserialize()?,
            },
            8 => Insn::Compare {
                op: deserializer.deserialize()?,
                left: deserializer.deserialize()?,
                right: deserializer.deserialize()?,
            },
            9 => Insn::Concat {
                left: deserializer.deserialize()?,
                right: deserializer.deserialize()?,
            },
            10 => Insn::Call {
                callee: deserializer.deserialize()?,
                arguments: deserializer.deserialize()?,
            },
            11 => Insn::Lookup {
                key: deserializer.deserialize()?,
                ty: deserializer.deserialize()?,
            },
            other => return Err(invalid_tag("instruction", other)),
        })
    }
}

impl Deserialize for ArithmeticOp {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        Ok(match deserializer.deserialize::<u8>()? {
            0 => ArithmeticOp::Add,
            1 => ArithmeticOp::Sub,
            2 => ArithmeticOp::Mul,
            3 => ArithmeticOp::Div,
            4 => ArithmeticOp::Rem,
            other => return Err(invalid_tag("arithmetic operator", other)),
        })
    }
}

impl Deserialize for CompareOp {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        Ok(match deserializer.deserialize::<u8>()? {
            0 => CompareOp::Equal,
            1 => CompareOp::NotEqual,
            2 => CompareOp::Less,
            3 => CompareOp::LessEqual,
            4 => CompareOp::Greater,
            5 => CompareOp::GreaterEqual,
            other => return Err(invalid_tag("comparison operator", other)),
        })
    }
}

impl Serialize for Callee {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        let (tag, index) = match *self {
            Callee::Local(index) => (0_u8, index),
            Callee::Import(index) => (1_u8, index),
        };
        tag.serialize(serializer)?;
        index.serialize(serializer)
    }
}

impl Deserialize for Callee {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        Ok(match deserializer.deserialize::<u8>()? {
            0 => Callee::Local(deserializer.deserialize()?),
            1 => Callee::Import(deserializer.deserialize()?),
            other => return Err(invalid_tag("callee", other)),
        })
    }
}

impl Serialize for Sink {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        match self {
            Sink::Discard(register) => {
                0_u8.serialize(serializer)?;
                register.serialize(serializer)
            }
            Sink::Store(local, register) => {
                1_u8.serialize(serializer)?;
                local.serialize(serializer)?;
                register.serialize(serializer)
            }
        }
    }
}

impl Deserialize for Sink {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        Ok(match deserializer.deserialize::<u8>()? {
            0 => Sink::Discard(deserializer.deserialize()?),
            1 => Sink::Store(deserializer.deserialize()?, deserializer.deserialize()?),
            other => return Err(invalid_tag("sink", other)),
        })
    }
}

impl Serialize for Terminator {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        match self {
            Terminator::Unreachable => 0_u8.serialize(serializer),
            Terminator::Goto(target) => {
                1_u8.serialize(serializer)?;
                target.serialize(serializer)
            }
            Terminator::GotoIf {
                condition,
                if_true,
                if_false,
            } => {
                2_u8.serialize(serializer)?;
                condition.serialize(serializer)?;
                if_true.serialize(serializer)?;
                if_false.serialize(serializer)
            }
            Terminator::Return(value) => {
                3_u8.serialize(serializer)?;
                value.serialize(serializer)
            }
        }
    }
}

impl Deserialize for Terminator {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        Ok(match deserializer.deserialize::<u8>()? {
            0 => Terminator::Unreachable,
            1 => Terminator::Goto(deserializer.deserialize()?),
            2 => Terminator::GotoIf {
                condition: deserializer.deserialize()?,
                if_true: deserializer.deserialize()?,
                if_false: deserializer.deserialize()?,
            },
            3 => Terminator::Return(deserializer.deserialize()?),
            other => return Err(invalid_tag("terminator", other)),
        })
    }
}

fn invalid_tag(what: &str, tag: u8) -> Error {
    ErrorKind::Deserialize.make(format!("invalid {what} tag {tag}"))
}

#[cfg(test)]
mod tests {
    use snip_core::{
        binary::{deserialize, serialize},
        Type, Value,
    };

    use super::*;

    #[test]
    fn ir_survives_a_trip_through_bytes_minus_spans() {
        let mut ir = Ir::new(Type::Int);
        let x = ir.add_local("x", Type::Int);
        ir.param_count = 1;
        let entry = ir.create_basic_block(BasicBlock::new("entry"));
        let read = ir.create_register(Span::new(3, 4), "x".into(), Type::Int, Insn::Local(x));
        let one = ir.create_register(
            Span::new(7, 8),
            "lit".into(),
            Type::Int,
            Insn::Const(Value::Int(1)),
        );
        let sum = ir.create_register(
            Span::new(3, 8),
            "add".into(),
            Type::Int,
            Insn::Arithmetic {
                op: ArithmeticOp::Add,
                left: read,
                right: one,
            },
        );
        let block = ir.basic_block_mut(entry).unwrap();
        block.flow.extend::<[NodeId; 3]>([read.into(), one.into(), sum.into()]);
        block.terminator = Terminator::Return(sum);

        let bytes = serialize(&ir).unwrap();
        let loaded: Ir = deserialize(&bytes).unwrap();
        assert_eq!(loaded.locals, ir.locals);
        assert_eq!(loaded.basic_blocks, ir.basic_blocks);
        assert_eq!(loaded.nodes.len(), 3);
        assert!(loaded.nodes.iter().all(|node| node.span == Span::EMPTY));
        assert_eq!(loaded.register(sum), ir.register(sum));
    }

    #[test]
    fn unknown_instruction_tags_are_rejected() {
        let err = deserialize::<Insn>(&[200]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Deserialize);
        assert!(err.to_string().contains("instruction"));
    }
}
