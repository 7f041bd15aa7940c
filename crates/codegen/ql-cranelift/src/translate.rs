//! LIR → Cranelift IR

use cranelift::codegen::ir::{FuncRef, StackSlot};
use cranelift::prelude::*;
use ql_lir::{BackendError, BinOp, CmpOp, Inst, LirFunction, Terminator, UnOp, ValueId};

/// Slot size and alignment (log2) of every variable
const SLOT_SIZE: u32 = 8;
const SLOT_ALIGN_SHIFT: u8 = 3;

struct Translator<'func, 'lir> {
    builder: FunctionBuilder<'func>,
    lir: &'lir LirFunction,
    blocks: Vec<Block>,
    slots: Vec<StackSlot>,
    values: Vec<Option<Value>>,
    func_refs: &'lir [FuncRef],
}

/// Builds the body of `lir` into `builder`
///
/// Every LIR block maps to one Cranelift block and every slot to an 8-byte
/// explicit stack slot. `func_refs` is indexed by callee id.
///
/// # Errors
///
/// Returns [`BackendError::Malformed`] if the function uses a value, block,
/// slot, parameter or callee that does not exist.
pub fn translate_function(
    builder: FunctionBuilder<'_>,
    lir: &LirFunction,
    func_refs: &[FuncRef],
) -> Result<(), BackendError> {
    let mut translator = Translator {
        builder,
        lir,
        blocks: Vec::with_capacity(lir.blocks.len()),
        slots: Vec::with_capacity(lir.slots.len()),
        values: vec![None; lir.value_count as usize],
        func_refs,
    };
    translator.run()?;
    translator.finalize();
    Ok(())
}

impl Translator<'_, '_> {
    fn malformed(&self, reason: String) -> BackendError {
        BackendError::Malformed {
            function: self.lir.decl.name.clone(),
            reason,
        }
    }

    fn run(&mut self) -> Result<(), BackendError> {
        for _ in &self.lir.blocks {
            let block = self.builder.create_block();
            self.blocks.push(block);
        }
        let Some(&entry) = self.blocks.first() else {
            return Err(self.malformed("function has no blocks".to_owned()));
        };
        self.builder.append_block_params_for_function_params(entry);

        for _ in &self.lir.slots {
            let slot = self.builder.create_sized_stack_slot(StackSlotData::new(
                StackSlotKind::ExplicitSlot,
                SLOT_SIZE,
                SLOT_ALIGN_SHIFT,
            ));
            self.slots.push(slot);
        }

        let lir = self.lir;
        for block in &lir.blocks {
            let target = self.block(block.id.0)?;
            self.builder.switch_to_block(target);
            for inst in &block.insts {
                self.inst(entry, inst)?;
            }
            match &block.terminator {
                Some(terminator) => self.terminator(terminator)?,
                None => return Err(self.malformed(format!("{} has no terminator", block.id))),
            }
        }

        // Slots carry all mutable state, so no block has SSA variables to
        // resolve and every block can be sealed at once.
        self.builder.seal_all_blocks();
        Ok(())
    }

    fn finalize(self) {
        self.builder.finalize();
    }

    fn block(&self, index: u32) -> Result<Block, BackendError> {
        self.blocks
            .get(index as usize)
            .copied()
            .ok_or_else(|| self.malformed(format!("jump to unknown bb{index}")))
    }

    fn slot(&self, index: u32) -> Result<StackSlot, BackendError> {
        self.slots
            .get(index as usize)
            .copied()
            .ok_or_else(|| self.malformed(format!("use of unknown slot{index}")))
    }

    fn use_value(&self, id: ValueId) -> Result<Value, BackendError> {
        self.values
            .get(id.0 as usize)
            .copied()
            .flatten()
            .ok_or_else(|| self.malformed(format!("use of undefined value {id}")))
    }

    fn def_value(&mut self, id: ValueId, value: Value) -> Result<(), BackendError> {
        let index = id.0 as usize;
        match self.values.get(index) {
            Some(None) => {
                self.values[index] = Some(value);
                Ok(())
            }
            Some(Some(_)) => Err(self.malformed(format!("{id} defined twice"))),
            None => Err(self.malformed(format!("{id} is out of range"))),
        }
    }

    fn inst(&mut self, entry: Block, inst: &Inst) -> Result<(), BackendError> {
        match inst {
            Inst::Const { dst, value } => {
                let result = self.builder.ins().iconst(types::I64, *value);
                self.def_value(*dst, result)
            }
            Inst::Param { dst, index } => {
                let Some(&param) = self.builder.block_params(entry).get(*index) else {
                    return Err(self.malformed(format!("no parameter {index}")));
                };
                self.def_value(*dst, param)
            }
            Inst::Load { dst, slot } => {
                let slot = self.slot(slot.0)?;
                let result = self.builder.ins().stack_load(types::I64, slot, 0);
                self.def_value(*dst, result)
            }
            Inst::Store { slot, value } => {
                let slot = self.slot(slot.0)?;
                let value = self.use_value(*value)?;
                self.builder.ins().stack_store(value, slot, 0);
                Ok(())
            }
            Inst::SlotAddr { dst, slot } => {
                let slot = self.slot(slot.0)?;
                let result = self.builder.ins().stack_addr(types::I64, slot, 0);
                self.def_value(*dst, result)
            }
            Inst::LoadIndirect { dst, addr } => {
                let addr = self.use_value(*addr)?;
                let result = self
                    .builder
                    .ins()
                    .load(types::I64, MemFlags::new(), addr, 0);
                self.def_value(*dst, result)
            }
            Inst::StoreIndirect { addr, value } => {
                let addr = self.use_value(*addr)?;
                let value = self.use_value(*value)?;
                self.builder.ins().store(MemFlags::new(), value, addr, 0);
                Ok(())
            }
            Inst::Binary { dst, op, lhs, rhs } => {
                let lhs = self.use_value(*lhs)?;
                let rhs = self.use_value(*rhs)?;
                let result = match op {
                    BinOp::Add => self.builder.ins().iadd(lhs, rhs),
                    BinOp::Sub => self.builder.ins().isub(lhs, rhs),
                    BinOp::Mul => self.builder.ins().imul(lhs, rhs),
                    BinOp::And => self.builder.ins().band(lhs, rhs),
                };
                self.def_value(*dst, result)
            }
            Inst::Compare {
                dst,
                cond,
                lhs,
                rhs,
            } => {
                let lhs = self.use_value(*lhs)?;
                let rhs = self.use_value(*rhs)?;
                let cc = match cond {
                    CmpOp::SignedLessEq => IntCC::SignedLessThanOrEqual,
                    CmpOp::NotEqual => IntCC::NotEqual,
                };
                let cmp = self.builder.ins().icmp(cc, lhs, rhs);
                let result = self.builder.ins().uextend(types::I64, cmp);
                self.def_value(*dst, result)
            }
            Inst::Unary { dst, op, arg } => {
                let arg = self.use_value(*arg)?;
                let result = match op {
                    UnOp::Not => self.builder.ins().bnot(arg),
                    UnOp::Neg => self.builder.ins().ineg(arg),
                };
                self.def_value(*dst, result)
            }
            Inst::Call { dst, callee, args } => {
                let Some(&func_ref) = self.func_refs.get(callee.0 as usize) else {
                    return Err(self.malformed(format!("call to unknown {callee}")));
                };
                let args = args
                    .iter()
                    .map(|&arg| self.use_value(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let call = self.builder.ins().call(func_ref, &args);
                let Some(&result) = self.builder.inst_results(call).first() else {
                    return Err(self.malformed(format!("{callee} returns nothing")));
                };
                self.def_value(*dst, result)
            }
        }
    }

    fn terminator(&mut self, terminator: &Terminator) -> Result<(), BackendError> {
        match terminator {
            Terminator::Jump(target) => {
                let target = self.block(target.0)?;
                self.builder.ins().jump(target, &[]);
            }
            Terminator::Branch {
                cond,
                then_block,
                else_block,
            } => {
                let cond = self.use_value(*cond)?;
                let then_block = self.block(then_block.0)?;
                let else_block = self.block(else_block.0)?;
                self.builder
                    .ins()
                    .brif(cond, then_block, &[], else_block, &[]);
            }
            Terminator::Return(value) => {
                let value = self.use_value(*value)?;
                self.builder.ins().return_(&[value]);
            }
        }
        Ok(())
    }
}
