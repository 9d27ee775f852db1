use snip_core::Type;
use snip_foundation::source::Span;

use crate::{
    environment::{ClassId, FunctionId},
    ir::{BasicBlock, BasicBlockId, Insn, Ir, LocalId, NodeId, Register, RegisterId, Sink, Terminator},
};

use super::Function;

/// State kept while lowering a single function.
pub struct FunctionBuilder {
    pub function_id: FunctionId,
    pub class_id: ClassId,
    pub return_ty: Type,
    /// Span of the function's name, for pointing at the declaration in diagnostics.
    pub name_span: Span,
    pub ir: IrBuilder,
    scopes: Vec<Vec<ScopedLocal>>,
}

#[derive(Debug, Clone)]
pub struct ScopedLocal {
    pub name: String,
    pub id: LocalId,
    pub span: Span,
}

impl FunctionBuilder {
    pub fn new(function_id: FunctionId, function: &Function) -> Self {
        Self {
            function_id,
            class_id: function.class_id,
            return_ty: function.return_ty,
            name_span: function.name_span,
            ir: IrBuilder::new(function.return_ty),
            scopes: vec![vec![]],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(vec![]);
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Finds the innermost local named `name`.
    pub fn lookup_local(&self, name: &str) -> Option<&ScopedLocal> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|local| local.name == name)
    }

    pub fn add_to_scope(&mut self, local: ScopedLocal) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(local);
        }
    }
}

/// Appends nodes to an [`Ir`] at a cursor.
pub struct IrBuilder {
    ir: Ir,
    cursor: BasicBlockId,
}

impl IrBuilder {
    pub fn new(return_ty: Type) -> Self {
        let mut ir = Ir::new(return_ty);
        let entry = ir.create_basic_block(BasicBlock::new("entry"));
        Self { ir, cursor: entry }
    }

    pub fn cursor(&self) -> BasicBlockId {
        self.cursor
    }

    pub fn set_cursor(&mut self, block: BasicBlockId) {
        self.cursor = block;
    }

    pub fn add_local(&mut self, name: impl Into<String>, ty: Type) -> LocalId {
        self.ir.add_local(name, ty)
    }

    pub fn set_param_count(&mut self, count: usize) {
        self.ir.param_count = count as u16;
    }

    pub fn local_ty(&self, local: LocalId) -> Type {
        self.ir.local(local).map(|var| var.ty).unwrap_or(Type::Object)
    }

    /// Creates a new basic block and moves the cursor to it.
    #[must_use = "the previous block is usually terminated with a jump to the new one"]
    pub fn append_basic_block(&mut self, label: &str) -> BasicBlockId {
        let id = self.ir.create_basic_block(BasicBlock::new(label));
        self.cursor = id;
        id
    }

    fn append_to_flow(&mut self, node: NodeId) {
        if let Some(block) = self.ir.basic_block_mut(self.cursor) {
            block.flow.push(node);
        }
    }

    pub fn append_register(
        &mut self,
        span: Span,
        name: impl Into<String>,
        ty: Type,
        insn: Insn,
    ) -> RegisterId {
        let register = self.ir.create_register(span, name.into(), ty, insn);
        self.append_to_flow(register.into());
        register
    }

    pub fn append_sink(&mut self, span: Span, sink: Sink) -> NodeId {
        let node = self.ir.create_sink(span, sink);
        self.append_to_flow(node);
        node
    }

    pub fn set_terminator(&mut self, terminator: Terminator) {
        if let Some(block) = self.ir.basic_block_mut(self.cursor) {
            block.terminator = terminator;
        }
    }

    pub fn terminator(&self, block: BasicBlockId) -> Option<&Terminator> {
        self.ir.basic_block(block).map(|block| &block.terminator)
    }

    pub fn register(&self, register: RegisterId) -> Option<&Register> {
        self.ir.register(register)
    }

    pub fn register_ty(&self, register: RegisterId) -> Type {
        self.register(register)
            .map(|register| register.ty)
            .unwrap_or(Type::Object)
    }

    /// Returns whether the register stands in for an expression that failed to compile.
    pub fn is_error(&self, register: RegisterId) -> bool {
        self.register(register)
            .map_or(true, |register| register.insn == Insn::Error)
    }

    pub fn is_reachable(&self, block: BasicBlockId) -> bool {
        self.ir.is_reachable(block)
    }

    pub fn into_ir(self) -> Ir {
        self.ir
    }
}
