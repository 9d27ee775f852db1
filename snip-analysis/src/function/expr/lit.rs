use snip_core::{Type, Value};
use snip_foundation::source::Spanned;
use snip_syntax::ast::Lit;

use crate::{
    function::builder::FunctionBuilder,
    ir::{Insn, RegisterId},
    Compiler,
};

impl<'a> Compiler<'a> {
    pub(super) fn expr_lit(&mut self, builder: &mut FunctionBuilder, lit: &Lit) -> RegisterId {
        let (ty, value) = match lit {
            Lit::Null(_) => (Type::Object, Value::Null),
            Lit::Bool(b, _) => (Type::Bool, Value::Bool(*b)),
            Lit::Int(i, _) => (Type::Int, Value::Int(*i)),
            Lit::Float(x, _) => (Type::Float, Value::Float(*x)),
            Lit::String(s, _) => (Type::String, Value::String(s.clone())),
        };
        builder
            .ir
            .append_register(lit.span(), "lit", ty, Insn::Const(value))
    }
}
