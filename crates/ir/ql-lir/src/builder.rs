//! Incremental construction of LIR functions

use crate::backend::BackendError;
use crate::{
    BasicBlock, BinOp, BlockId, CmpOp, FuncId, FunctionDecl, Inst, LirFunction, SlotData, SlotId,
    Terminator, UnOp, ValueId,
};

/// Builder for one [`LirFunction`]
///
/// The builder always has an active block (the insertion point). It starts
/// at the entry block.
pub struct LirBuilder {
    function: LirFunction,
    current: BlockId,
    next_value: u32,
    /// First block that received code after its terminator
    misuse: Option<BlockId>,
}

impl LirBuilder {
    /// Start a function with an empty entry block
    #[must_use]
    pub fn new(decl: FunctionDecl) -> Self {
        let entry = BasicBlock {
            id: BlockId(0),
            insts: Vec::new(),
            terminator: None,
        };

        Self {
            function: LirFunction {
                decl,
                slots: Vec::new(),
                blocks: vec![entry],
                value_count: 0,
            },
            current: BlockId(0),
            next_value: 0,
            misuse: None,
        }
    }

    /// Signature of the function being built
    #[must_use]
    pub fn decl(&self) -> &FunctionDecl {
        &self.function.decl
    }

    /// Creates a new, empty block and returns its ID
    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId(self.function.blocks.len() as u32);
        self.function.blocks.push(BasicBlock {
            id,
            insts: Vec::new(),
            terminator: None,
        });
        id
    }

    /// Sets the block that subsequent instructions are appended to
    pub fn switch_to_block(&mut self, block: BlockId) {
        self.current = block;
    }

    /// Whether the active block already has a terminator
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.function.blocks[self.current.0 as usize]
            .terminator
            .is_some()
    }

    /// Allocates a stack slot for a variable
    pub fn alloc_slot(&mut self, name: impl Into<String>) -> SlotId {
        let id = SlotId(self.function.slots.len() as u32);
        self.function.slots.push(SlotData { name: name.into() });
        id
    }

    fn fresh(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }

    fn push(&mut self, inst: Inst) {
        if self.is_terminated() && self.misuse.is_none() {
            self.misuse = Some(self.current);
        }
        self.function.blocks[self.current.0 as usize]
            .insts
            .push(inst);
    }

    fn define(&mut self, make: impl FnOnce(ValueId) -> Inst) -> ValueId {
        let dst = self.fresh();
        self.push(make(dst));
        dst
    }

    /// Integer constant
    pub fn iconst(&mut self, value: i64) -> ValueId {
        self.define(|dst| Inst::Const { dst, value })
    }

    /// Incoming parameter `index`
    pub fn param(&mut self, index: usize) -> ValueId {
        self.define(|dst| Inst::Param { dst, index })
    }

    /// Read a slot
    pub fn load(&mut self, slot: SlotId) -> ValueId {
        self.define(|dst| Inst::Load { dst, slot })
    }

    /// Write a slot
    pub fn store(&mut self, slot: SlotId, value: ValueId) {
        self.push(Inst::Store { slot, value });
    }

    /// Address of a slot
    pub fn slot_addr(&mut self, slot: SlotId) -> ValueId {
        self.define(|dst| Inst::SlotAddr { dst, slot })
    }

    /// Read memory at `addr`
    pub fn load_indirect(&mut self, addr: ValueId) -> ValueId {
        self.define(|dst| Inst::LoadIndirect { dst, addr })
    }

    /// Write memory at `addr`
    pub fn store_indirect(&mut self, addr: ValueId, value: ValueId) {
        self.push(Inst::StoreIndirect { addr, value });
    }

    /// Binary arithmetic
    pub fn binary(&mut self, op: BinOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.define(|dst| Inst::Binary { dst, op, lhs, rhs })
    }

    /// Comparison, widened to 0 or 1
    pub fn compare(&mut self, cond: CmpOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.define(|dst| Inst::Compare {
            dst,
            cond,
            lhs,
            rhs,
        })
    }

    /// Unary arithmetic
    pub fn unary(&mut self, op: UnOp, arg: ValueId) -> ValueId {
        self.define(|dst| Inst::Unary { dst, op, arg })
    }

    /// Direct call
    pub fn call(&mut self, callee: FuncId, args: Vec<ValueId>) -> ValueId {
        self.define(|dst| Inst::Call { dst, callee, args })
    }

    fn terminate(&mut self, terminator: Terminator) {
        let block = &mut self.function.blocks[self.current.0 as usize];
        if block.terminator.is_some() {
            if self.misuse.is_none() {
                self.misuse = Some(self.current);
            }
            return;
        }
        block.terminator = Some(terminator);
    }

    /// Unconditional jump
    pub fn jump(&mut self, target: BlockId) {
        self.terminate(Terminator::Jump(target));
    }

    /// Two-way conditional branch
    pub fn branch(&mut self, cond: ValueId, then_block: BlockId, else_block: BlockId) {
        self.terminate(Terminator::Branch {
            cond,
            then_block,
            else_block,
        });
    }

    /// Return `value`
    pub fn ret(&mut self, value: ValueId) {
        self.terminate(Terminator::Return(value));
    }

    /// Finishes building and returns the function
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Malformed`] if a block is left without a
    /// terminator or received code after it was terminated.
    pub fn finish(mut self) -> Result<LirFunction, BackendError> {
        let name = self.function.decl.name.clone();
        if let Some(block) = self.misuse {
            return Err(BackendError::Malformed {
                function: name,
                reason: format!("{block} received code after its terminator"),
            });
        }
        if let Some(block) = self
            .function
            .blocks
            .iter()
            .find(|block| block.terminator.is_none())
        {
            return Err(BackendError::Malformed {
                function: name,
                reason: format!("{} has no terminator", block.id),
            });
        }
        self.function.value_count = self.next_value;
        Ok(self.function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(arity: usize) -> FunctionDecl {
        FunctionDecl {
            id: FuncId(0),
            name: "f".to_string(),
            arity,
        }
    }

    #[test]
    fn builds_branching_function() {
        let mut builder = LirBuilder::new(decl(1));
        let slot = builder.alloc_slot("a");
        let param = builder.param(0);
        builder.store(slot, param);
        let then_block = builder.create_block();
        let exit = builder.create_block();
        let cond = builder.load(slot);
        builder.branch(cond, then_block, exit);

        builder.switch_to_block(then_block);
        let one = builder.iconst(1);
        builder.store(slot, one);
        builder.jump(exit);

        builder.switch_to_block(exit);
        let result = builder.load(slot);
        builder.ret(result);

        let function = builder.finish().unwrap();
        assert_eq!(function.blocks.len(), 3);
        assert_eq!(function.slots.len(), 1);
        assert_eq!(function.value_count, 4);
        assert_eq!(
            function.block(then_block).terminator,
            Some(Terminator::Jump(exit))
        );
    }

    #[test]
    fn open_block_is_malformed() {
        let mut builder = LirBuilder::new(decl(0));
        let value = builder.iconst(0);
        builder.ret(value);
        builder.create_block();

        let err = builder.finish().unwrap_err();
        assert!(matches!(err, BackendError::Malformed { .. }));
        assert_eq!(err.to_string(), "function 'f' is malformed: bb1 has no terminator");
    }

    #[test]
    fn code_after_terminator_is_malformed() {
        let mut builder = LirBuilder::new(decl(0));
        let value = builder.iconst(0);
        builder.ret(value);
        builder.iconst(1);

        let err = builder.finish().unwrap_err();
        assert_eq!(
            err.to_string(),
            "function 'f' is malformed: bb0 received code after its terminator"
        );
    }
}
