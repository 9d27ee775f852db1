//! IR interpreter.
//!
//! IR handed to the interpreter may come from an archive, so nothing about it is trusted: every
//! ID is bounds-checked and every operand's run time type is checked again.

use std::{
    cell::Cell,
    collections::HashMap,
    sync::Arc,
};

use snip_core::{Type, Value};
use thiserror::Error;
use tracing::trace;

use crate::module::Module;

use super::{ArithmeticOp, Callee, CompareOp, Insn, Ir, NodeKind, RegisterId, Sink, Terminator};

/// Supplies the values read by `lookup<T>("key")`.
pub trait ValueSource {
    fn value(&self, key: &str) -> Option<Value>;
}

/// No values.
impl ValueSource for () {
    fn value(&self, _: &str) -> Option<Value> {
        None
    }
}

impl ValueSource for HashMap<String, Value> {
    fn value(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

/// Resolves calls to functions imported from other modules.
pub trait Linkage {
    fn call_import(
        &self,
        import: u32,
        arguments: Vec<Value>,
        context: &Context<'_>,
    ) -> Result<Value, RuntimeError>;
}

/// Linkage of a module without imports.
impl Linkage for () {
    fn call_import(&self, import: u32, _: Vec<Value>, _: &Context<'_>) -> Result<Value, RuntimeError> {
        Err(RuntimeError::Unlinked { import })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_call_depth: usize,
    /// Upper bound on the number of basic blocks entered during one invocation, including calls.
    /// Keeps runaway loops from hanging the host.
    pub max_steps: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_call_depth: 256,
            max_steps: 10_000_000,
        }
    }
}

/// State shared by all the calls made during one invocation.
pub struct Context<'a> {
    pub values: &'a dyn ValueSource,
    pub limits: Limits,
    depth: Cell<usize>,
    steps: Cell<u64>,
}

impl<'a> Context<'a> {
    pub fn new(values: &'a dyn ValueSource) -> Self {
        Self::with_limits(values, Limits::default())
    }

    pub fn with_limits(values: &'a dyn ValueSource, limits: Limits) -> Self {
        Self {
            values,
            limits,
            depth: Cell::new(0),
            steps: Cell::new(0),
        }
    }

    fn step(&self) -> Result<(), RuntimeError> {
        let steps = self.steps.get() + 1;
        if steps > self.limits.max_steps {
            return Err(RuntimeError::StepLimit(self.limits.max_steps));
        }
        self.steps.set(steps);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("no value named `{key}` was supplied")]
    MissingValue { key: String },
    #[error("value `{key}` was expected to be `{expected}`, but it is `{found}`")]
    ValueType {
        key: String,
        expected: Type,
        found: Type,
    },
    #[error("function `{function}` takes {expected} argument(s) but {found} were supplied")]
    ArgumentCount {
        function: String,
        expected: usize,
        found: usize,
    },
    #[error("argument {index} of `{function}` must be `{expected}`, but it is `{found}`")]
    ArgumentType {
        function: String,
        index: usize,
        expected: Type,
        found: Type,
    },
    #[error("function `{function}` returned `{found}` where `{expected}` was declared")]
    ReturnType {
        function: String,
        expected: Type,
        found: Type,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("call depth exceeded the limit of {0}")]
    CallDepth(usize),
    #[error("execution exceeded the limit of {0} steps")]
    StepLimit(u64),
    #[error("import {import} is not linked to any function")]
    Unlinked { import: u32 },
    #[error("invalid IR: {0}")]
    InvalidIr(String),
}

fn invalid(message: impl Into<String>) -> RuntimeError {
    RuntimeError::InvalidIr(message.into())
}

/// Calls function `index` of `module`, converting the arguments to the function's parameter
/// types.
pub fn call(
    module: &Module,
    linkage: &dyn Linkage,
    index: u32,
    arguments: Vec<Value>,
    context: &Context<'_>,
) -> Result<Value, RuntimeError> {
    let function = module
        .function(index)
        .ok_or_else(|| invalid(format!("call to nonexistent function {index}")))?;

    if arguments.len() != function.params.len() {
        return Err(RuntimeError::ArgumentCount {
            function: module.function_name(index),
            expected: function.params.len(),
            found: arguments.len(),
        });
    }
    let arguments = arguments
        .into_iter()
        .zip(&function.params)
        .enumerate()
        .map(|(i, (argument, param))| {
            argument
                .coerce_to(param.ty)
                .ok_or_else(|| RuntimeError::ArgumentType {
                    function: module.function_name(index),
                    index: i,
                    expected: param.ty,
                    found: argument.ty(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let depth = context.depth.get();
    if depth >= context.limits.max_call_depth {
        return Err(RuntimeError::CallDepth(context.limits.max_call_depth));
    }
    context.depth.set(depth + 1);
    trace!(function = %module.function_name(index), depth, "call");
    let result = Frame::new(module, linkage, &function.ir, arguments, context).run();
    context.depth.set(depth);

    let value = result?;
    match function.return_ty {
        Type::Void => Ok(Value::Null),
        ty => value.coerce_to(ty).ok_or_else(|| RuntimeError::ReturnType {
            function: module.function_name(index),
            expected: ty,
            found: value.ty(),
        }),
    }
}

/// Execution state of a single function call.
struct Frame<'a, 'c> {
    module: &'a Module,
    linkage: &'a dyn Linkage,
    ir: &'a Ir,
    context: &'a Context<'c>,
    locals: Vec<Value>,
    registers: Vec<Value>,
}

impl<'a, 'c> Frame<'a, 'c> {
    fn new(
        module: &'a Module,
        linkage: &'a dyn Linkage,
        ir: &'a Ir,
        arguments: Vec<Value>,
        context: &'a Context<'c>,
    ) -> Self {
        let mut locals = arguments;
        locals.resize(ir.locals.len().max(locals.len()), Value::Null);
        Self {
            module,
            linkage,
            ir,
            context,
            locals,
            registers: vec![Value::Null; ir.nodes.len()],
        }
    }

    fn run(mut self) -> Result<Value, RuntimeError> {
        let ir = self.ir;
        let mut block_id = ir
            .basic_block_ids()
            .next()
            .ok_or_else(|| invalid("function has no basic blocks"))?;
        loop {
            self.context.step()?;
            let block = ir
                .basic_block(block_id)
                .ok_or_else(|| invalid(format!("jump to nonexistent basic block {block_id:?}")))?;

            for &node_id in &block.flow {
                let node = ir
                    .node(node_id)
                    .ok_or_else(|| invalid(format!("nonexistent node {node_id:?} in flow")))?;
                match &node.kind {
                    NodeKind::Register(register) => {
                        let value = self.eval(&register.insn)?;
                        self.registers[node_id.to_u32() as usize] = value;
                    }
                    NodeKind::Sink(sink) => self.sink(sink)?,
                }
            }

            match &block.terminator {
                Terminator::Unreachable => {
                    return Err(invalid(format!(
                        "unreachable basic block {block_id:?} ({}) reached",
                        block.label
                    )))
                }
                &Terminator::Goto(target) => block_id = target,
                &Terminator::GotoIf {
                    condition,
                    if_true,
                    if_false,
                } => {
                    block_id = if self.bool(condition)? {
                        if_true
                    } else {
                        if_false
                    }
                }
                &Terminator::Return(value) => return self.read(value),
            }
        }
    }

    fn read(&self, register: RegisterId) -> Result<Value, RuntimeError> {
        let id = super::NodeId::from(register);
        self.registers
            .get(id.to_u32() as usize)
            .cloned()
            .ok_or_else(|| invalid(format!("read of nonexistent register {register:?}")))
    }

    fn bool(&self, register: RegisterId) -> Result<bool, RuntimeError> {
        self.read(register)?
            .as_bool()
            .ok_or_else(|| invalid(format!("register {register:?} is not a bool")))
    }

    fn local_index(&self, local: super::LocalId) -> Result<usize, RuntimeError> {
        let index = local.to_u32() as usize;
        if index < self.locals.len() {
            Ok(index)
        } else {
            Err(invalid(format!("nonexistent local {local:?}")))
        }
    }

    fn sink(&mut self, sink: &Sink) -> Result<(), RuntimeError> {
        match sink {
            Sink::Discard(register) => {
                self.read(*register)?;
            }
            &Sink::Store(local, register) => {
                let index = self.local_index(local)?;
                self.locals[index] = self.read(register)?;
            }
        }
        Ok(())
    }

    fn eval(&self, insn: &Insn) -> Result<Value, RuntimeError> {
        Ok(match insn {
            Insn::Error => return Err(invalid("error placeholder reached")),
            Insn::Void => Value::Null,
            Insn::Const(value) => value.clone(),
            &Insn::Local(local) => self.locals[self.local_index(local)?].clone(),

            &Insn::Neg(operand) => match self.read(operand)? {
                Value::Int(x) => Value::Int(x.checked_neg().ok_or(RuntimeError::Overflow)?),
                Value::Float(x) => Value::Float(-x),
                other => return Err(operand_type("-", &other)),
            },
            &Insn::Not(operand) => Value::Bool(!self.bool(operand)?),
            &Insn::IntToFloat(operand) => match self.read(operand)? {
                Value::Int(x) => Value::Float(x as f64),
                other => return Err(operand_type("int_to_float", &other)),
            },
            &Insn::Arithmetic { op, left, right } => {
                arithmetic(op, self.read(left)?, self.read(right)?)?
            }
            &Insn::Compare { op, left, right } => {
                Value::Bool(compare(op, &self.read(left)?, &self.read(right)?)?)
            }
            &Insn::Concat { left, right } => {
                let left = self.read(left)?;
                let right = self.read(right)?;
                let mut result = String::from(string_or_empty(&left)?);
                result.push_str(string_or_empty(&right)?);
                Value::String(Arc::from(result))
            }

            Insn::Call { callee, arguments } => {
                let arguments = arguments
                    .iter()
                    .map(|&register| self.read(register))
                    .collect::<Result<Vec<_>, _>>()?;
                match *callee {
                    Callee::Local(index) => {
                        call(self.module, self.linkage, index, arguments, self.context)?
                    }
                    Callee::Import(index) => {
                        self.linkage.call_import(index, arguments, self.context)?
                    }
                }
            }
            Insn::Lookup { key, ty } => {
                let value = self
                    .context
                    .values
                    .value(key)
                    .ok_or_else(|| RuntimeError::MissingValue { key: key.clone() })?;
                value.coerce_to(*ty).ok_or_else(|| RuntimeError::ValueType {
                    key: key.clone(),
                    expected: *ty,
                    found: value.ty(),
                })?
            }
        })
    }
}

fn operand_type(op: &str, value: &Value) -> RuntimeError {
    invalid(format!("`{op}` applied to a value of type `{}`", value.ty()))
}

/// `null` strings concatenate as empty strings.
fn string_or_empty(value: &Value) -> Result<&str, RuntimeError> {
    match value {
        Value::Null => Ok(""),
        Value::String(s) => Ok(s),
        other => Err(operand_type("+", other)),
    }
}

fn arithmetic(op: ArithmeticOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                ArithmeticOp::Add => a.checked_add(b),
                ArithmeticOp::Sub => a.checked_sub(b),
                ArithmeticOp::Mul => a.checked_mul(b),
                ArithmeticOp::Div | ArithmeticOp::Rem if b == 0 => {
                    return Err(RuntimeError::DivisionByZero)
                }
                ArithmeticOp::Div => a.checked_div(b),
                ArithmeticOp::Rem => a.checked_rem(b),
            };
            result.map(Value::Int).ok_or(RuntimeError::Overflow)
        }
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(match op {
            ArithmeticOp::Add => a + b,
            ArithmeticOp::Sub => a - b,
            ArithmeticOp::Mul => a * b,
            ArithmeticOp::Div => a / b,
            ArithmeticOp::Rem => a % b,
        })),
        (left, right) => Err(invalid(format!(
            "arithmetic on `{}` and `{}`",
            left.ty(),
            right.ty()
        ))),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
    match op {
        CompareOp::Equal => Ok(equal(left, right)),
        CompareOp::NotEqual => Ok(!equal(left, right)),
        _ => {
            let ordering = match (left, right) {
                (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
                (a, b) => match (a.as_float(), b.as_float()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => {
                        return Err(invalid(format!(
                            "ordering of `{}` and `{}`",
                            left.ty(),
                            right.ty()
                        )))
                    }
                },
            };
            // Comparisons involving NaN are always false.
            Ok(ordering.is_some_and(|ordering| match op {
                CompareOp::Less => ordering.is_lt(),
                CompareOp::LessEqual => ordering.is_le(),
                CompareOp::Greater => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
    }
}

/// Equality as seen by `==`. Numbers compare by value regardless of whether they're ints or
/// floats.
fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            left.as_float() == right.as_float()
        }
        _ => left == right,
    }
}
