//! Lowering of a single function

use log::trace;
use ql_ast::{BinaryOp, Body, Expr, ExprId, Function, UnaryOp};
use ql_intern::{Interner, Symbol};
use ql_lir::{
    BinOp, BlockId, CmpOp, FunctionDecl, LirBuilder, LirFunction, SlotId, UnOp, ValueId,
};
use ql_resolve::{FunctionResolution, ScopeOwner};
use rustc_hash::FxHashMap;

use crate::error::LowerError;

/// How a binary operator is lowered
enum BinaryLowering {
    Store,
    Arith(BinOp),
    Compare(CmpOp),
}

impl BinaryLowering {
    const fn of(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Declare | BinaryOp::Assign => Self::Store,
            BinaryOp::Add => Self::Arith(BinOp::Add),
            BinaryOp::Sub => Self::Arith(BinOp::Sub),
            BinaryOp::Mul => Self::Arith(BinOp::Mul),
            BinaryOp::And => Self::Arith(BinOp::And),
            BinaryOp::LessEq => Self::Compare(CmpOp::SignedLessEq),
            BinaryOp::NotEq => Self::Compare(CmpOp::NotEqual),
        }
    }
}

/// Callable functions of the module by name
pub type Signatures = FxHashMap<Symbol, FunctionDecl>;

/// Context for lowering one function to LIR
pub struct LoweringContext<'ctx> {
    builder: LirBuilder,
    body: &'ctx Body,
    resolution: &'ctx FunctionResolution,
    signatures: &'ctx Signatures,
    interner: &'ctx Interner,
    /// One slot per variable binding
    slots: FxHashMap<(ScopeOwner, Symbol), SlotId>,
    /// Block that starts at each label
    labels: FxHashMap<Symbol, BlockId>,
}

impl<'ctx> LoweringContext<'ctx> {
    /// Lower `function` using the scopes `resolution` computed for it
    ///
    /// # Errors
    ///
    /// Fails if the body calls an unknown function or uses a construct that
    /// cannot be lowered. [`LowerError::ArityMismatch`] is fatal for the
    /// caller; every other error only concerns this function.
    pub fn lower_function(
        function: &'ctx Function,
        decl: FunctionDecl,
        resolution: &'ctx FunctionResolution,
        signatures: &'ctx Signatures,
        interner: &'ctx Interner,
    ) -> Result<LirFunction, LowerError> {
        let mut ctx = Self {
            builder: LirBuilder::new(decl),
            body: &function.body,
            resolution,
            signatures,
            interner,
            slots: FxHashMap::default(),
            labels: FxHashMap::default(),
        };

        ctx.allocate_slots();
        ctx.store_params(function);
        ctx.create_label_blocks();

        ctx.expr(function.body.root)?;
        if !ctx.builder.is_terminated() {
            let zero = ctx.builder.iconst(0);
            ctx.builder.ret(zero);
        }

        Ok(ctx.builder.finish()?)
    }

    /// Slots are allocated at entry: function scope first (parameters lead),
    /// then every `if` scope in node order.
    fn allocate_slots(&mut self) {
        let scopes = &self.resolution.scopes;
        let interner = self.interner;
        let if_vars = scopes
            .if_scopes()
            .flat_map(|(_, scope)| scope.variables());
        for (symbol, owner) in scopes.root.variables().chain(if_vars) {
            let name = interner.resolve(symbol);
            let slot = self.builder.alloc_slot(name);
            trace!("slot {slot} for '{name}' ({owner:?})");
            self.slots.insert((owner, symbol), slot);
        }
    }

    fn store_params(&mut self, function: &Function) {
        for (index, param) in function.params.iter().enumerate() {
            if let Some(&slot) = self.slots.get(&(ScopeOwner::Function, param)) {
                let value = self.builder.param(index);
                self.builder.store(slot, value);
            }
        }
    }

    fn create_label_blocks(&mut self) {
        for label in self.resolution.scopes.root.labels() {
            let block = self.builder.create_block();
            trace!("label '{}' starts {block}", self.interner.resolve(label));
            self.labels.insert(label, block);
        }
    }

    fn function_name(&self) -> String {
        self.builder.decl().name.clone()
    }

    fn slot_for(&self, id: ExprId, symbol: Symbol) -> Result<SlotId, LowerError> {
        self.resolution
            .binding(id)
            .and_then(|owner| self.slots.get(&(owner, symbol)).copied())
            .ok_or_else(|| LowerError::UnresolvedVariable {
                function: self.function_name(),
                name: self.interner.resolve(symbol).to_owned(),
            })
    }

    /// Continue in a fresh block after a terminator, so the insertion point
    /// is always open once an expression has been lowered.
    fn continue_unreachable(&mut self) -> ValueId {
        let block = self.builder.create_block();
        self.builder.switch_to_block(block);
        self.builder.iconst(0)
    }

    fn enter_label(&mut self, label: Symbol) -> Result<(), LowerError> {
        let block =
            self.labels
                .get(&label)
                .copied()
                .ok_or_else(|| LowerError::UnknownLabel {
                    function: self.function_name(),
                    label: self.interner.resolve(label).to_owned(),
                })?;
        if !self.builder.is_terminated() {
            self.builder.jump(block);
        }
        self.builder.switch_to_block(block);
        Ok(())
    }

    /// Lowers the subtree at `id` and returns its value
    fn expr(&mut self, id: ExprId) -> Result<ValueId, LowerError> {
        let body = self.body;
        match &body[id] {
            Expr::Number(value) => Ok(self.builder.iconst(*value)),
            Expr::Variable(symbol) => {
                let slot = self.slot_for(id, *symbol)?;
                Ok(self.builder.load(slot))
            }
            Expr::AddressOf(symbol) => {
                let slot = self.slot_for(id, *symbol)?;
                Ok(self.builder.slot_addr(slot))
            }
            Expr::LabelRef(label) => Err(LowerError::InvalidLabelUse {
                function: self.function_name(),
                label: self.interner.resolve(*label).to_owned(),
            }),
            Expr::List(items) => {
                let mut last = None;
                for &item in items {
                    last = Some(self.expr(item)?);
                }
                match last {
                    Some(value) => Ok(value),
                    None => Ok(self.builder.iconst(0)),
                }
            }
            Expr::Statement { labels, inner } => {
                for label in labels.iter() {
                    self.enter_label(label)?;
                }
                self.expr(*inner)
            }
            Expr::Call { callee, args } => self.call(*callee, args),
            Expr::If {
                condition,
                then_body,
            } => {
                let cond = self.expr(*condition)?;
                let then_block = self.builder.create_block();
                let exit = self.builder.create_block();
                self.builder.branch(cond, then_block, exit);

                self.builder.switch_to_block(then_block);
                self.expr(*then_body)?;
                if !self.builder.is_terminated() {
                    self.builder.jump(exit);
                }

                self.builder.switch_to_block(exit);
                Ok(self.builder.iconst(0))
            }
            Expr::Binary { op, lhs, rhs } => match BinaryLowering::of(*op) {
                BinaryLowering::Store => {
                    trace!("lower {op} at {id:?}");
                    let value = self.expr(*rhs)?;
                    self.store_to(*lhs, value)?;
                    Ok(value)
                }
                BinaryLowering::Arith(bin_op) => {
                    let lhs = self.expr(*lhs)?;
                    let rhs = self.expr(*rhs)?;
                    Ok(self.builder.binary(bin_op, lhs, rhs))
                }
                BinaryLowering::Compare(cond) => {
                    let lhs = self.expr(*lhs)?;
                    let rhs = self.expr(*rhs)?;
                    Ok(self.builder.compare(cond, lhs, rhs))
                }
            },
            Expr::Unary { op, operand } => self.unary(*op, *operand),
        }
    }

    fn store_to(&mut self, target: ExprId, value: ValueId) -> Result<(), LowerError> {
        let body = self.body;
        match &body[target] {
            Expr::Variable(symbol) => {
                let slot = self.slot_for(target, *symbol)?;
                self.builder.store(slot, value);
                Ok(())
            }
            Expr::Unary {
                op: UnaryOp::Deref,
                operand,
            } => {
                let addr = self.expr(*operand)?;
                self.builder.store_indirect(addr, value);
                Ok(())
            }
            _ => Err(LowerError::InvalidAssignmentTarget {
                function: self.function_name(),
            }),
        }
    }

    fn unary(&mut self, op: UnaryOp, operand: ExprId) -> Result<ValueId, LowerError> {
        match op {
            UnaryOp::Not => {
                let arg = self.expr(operand)?;
                Ok(self.builder.unary(UnOp::Not, arg))
            }
            UnaryOp::Negate => {
                let arg = self.expr(operand)?;
                Ok(self.builder.unary(UnOp::Neg, arg))
            }
            UnaryOp::Deref => {
                let addr = self.expr(operand)?;
                Ok(self.builder.load_indirect(addr))
            }
            UnaryOp::Return => {
                let value = self.expr(operand)?;
                self.builder.ret(value);
                Ok(self.continue_unreachable())
            }
            UnaryOp::Goto => {
                let Expr::LabelRef(label) = self.body[operand] else {
                    return Err(LowerError::InvalidGotoTarget {
                        function: self.function_name(),
                    });
                };
                let target =
                    self.labels
                        .get(&label)
                        .copied()
                        .ok_or_else(|| LowerError::UnknownLabel {
                            function: self.function_name(),
                            label: self.interner.resolve(label).to_owned(),
                        })?;
                self.builder.jump(target);
                Ok(self.continue_unreachable())
            }
        }
    }

    fn call(&mut self, callee: Symbol, args: &[ExprId]) -> Result<ValueId, LowerError> {
        let callee_name = self.interner.resolve(callee);
        let Some(decl) = self.signatures.get(&callee) else {
            return Err(LowerError::UnknownCallee {
                function: self.function_name(),
                callee: callee_name.to_owned(),
            });
        };
        if decl.arity != args.len() {
            return Err(LowerError::ArityMismatch {
                function: self.function_name(),
                callee: callee_name.to_owned(),
                expected: decl.arity,
                found: args.len(),
            });
        }
        let id = decl.id;

        let mut values = Vec::with_capacity(args.len());
        for &arg in args {
            values.push(self.expr(arg)?);
        }
        Ok(self.builder.call(id, values))
    }
}
