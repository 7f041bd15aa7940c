//! Low-level Intermediate Representation (LIR)
//!
//! LIR is the hand-off format between the lowering engine and a code
//! generator. Every value is a 64-bit integer. Mutable state lives in
//! per-function slots that are accessed with explicit loads and stores, so
//! LIR never needs phi nodes: a value is only ever used in the block that
//! defines it.

pub mod backend;
pub mod builder;
mod display;

use derive_more::Display;

pub use backend::{Backend, BackendError, TextBackend, check_calls};
pub use builder::LirBuilder;

/// SSA value, defined exactly once
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, Display)]
#[display("v{_0}")]
pub struct ValueId(pub u32);

/// Basic block ID
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, Display)]
#[display("bb{_0}")]
pub struct BlockId(pub u32);

/// Stack slot ID
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, Display)]
#[display("slot{_0}")]
pub struct SlotId(pub u32);

/// Module-level function ID
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, Display)]
#[display("fn{_0}")]
pub struct FuncId(pub u32);

/// Signature of a module-level function: `arity` integers in, one integer out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    /// Function ID
    pub id: FuncId,
    /// Symbol name
    pub name: String,
    /// Number of parameters
    pub arity: usize,
}

/// Stack slot metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotData {
    /// Variable name (for debugging)
    pub name: String,
}

/// Two-operand arithmetic and logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BinOp {
    /// Wrapping addition
    #[display("iadd")]
    Add,
    /// Wrapping subtraction
    #[display("isub")]
    Sub,
    /// Wrapping multiplication
    #[display("imul")]
    Mul,
    /// Bitwise and
    #[display("band")]
    And,
}

/// Comparisons; the result is widened to 0 or 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CmpOp {
    /// Signed `<=`
    #[display("sle")]
    SignedLessEq,
    /// `!=`
    #[display("ne")]
    NotEqual,
}

/// One-operand arithmetic and logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UnOp {
    /// Bitwise not
    #[display("bnot")]
    Not,
    /// Two's complement negation
    #[display("ineg")]
    Neg,
}

/// Non-terminating instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inst {
    /// Integer constant
    Const {
        /// Result
        dst: ValueId,
        /// Constant value
        value: i64,
    },
    /// Incoming function parameter
    Param {
        /// Result
        dst: ValueId,
        /// Zero-based parameter index
        index: usize,
    },
    /// Read a slot
    Load {
        /// Result
        dst: ValueId,
        /// Slot read
        slot: SlotId,
    },
    /// Write a slot
    Store {
        /// Slot written
        slot: SlotId,
        /// Value stored
        value: ValueId,
    },
    /// Address of a slot
    SlotAddr {
        /// Result
        dst: ValueId,
        /// Slot whose address is taken
        slot: SlotId,
    },
    /// Read memory at an integer address
    LoadIndirect {
        /// Result
        dst: ValueId,
        /// Address
        addr: ValueId,
    },
    /// Write memory at an integer address
    StoreIndirect {
        /// Address
        addr: ValueId,
        /// Value stored
        value: ValueId,
    },
    /// Binary arithmetic
    Binary {
        /// Result
        dst: ValueId,
        /// Operator
        op: BinOp,
        /// Left operand
        lhs: ValueId,
        /// Right operand
        rhs: ValueId,
    },
    /// Comparison widened to an integer
    Compare {
        /// Result
        dst: ValueId,
        /// Condition
        cond: CmpOp,
        /// Left operand
        lhs: ValueId,
        /// Right operand
        rhs: ValueId,
    },
    /// Unary arithmetic
    Unary {
        /// Result
        dst: ValueId,
        /// Operator
        op: UnOp,
        /// Operand
        arg: ValueId,
    },
    /// Direct call of a module-level function
    Call {
        /// Result
        dst: ValueId,
        /// Callee
        callee: FuncId,
        /// Arguments
        args: Vec<ValueId>,
    },
}

/// Block terminator (how control flow exits this block)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// Unconditional jump
    Jump(BlockId),
    /// Jump to `then_block` if `cond` is non-zero, else to `else_block`
    Branch {
        /// Condition value
        cond: ValueId,
        /// Target when the condition holds
        then_block: BlockId,
        /// Target otherwise
        else_block: BlockId,
    },
    /// Return from the function
    Return(ValueId),
}

/// Basic block in the control flow graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Block ID
    pub id: BlockId,
    /// Instructions in order
    pub insts: Vec<Inst>,
    /// Terminator, `None` while the block is still open
    pub terminator: Option<Terminator>,
}

/// A lowered function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LirFunction {
    /// Signature
    pub decl: FunctionDecl,
    /// Stack slots, all allocated at entry
    pub slots: Vec<SlotData>,
    /// Basic blocks; the first one is the entry block
    pub blocks: Vec<BasicBlock>,
    /// Number of values defined
    pub value_count: u32,
}

impl LirFunction {
    /// The entry block
    #[must_use]
    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    /// Look up a block
    #[must_use]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    /// Total number of instructions, terminators excluded
    #[must_use]
    pub fn inst_count(&self) -> usize {
        self.blocks.iter().map(|block| block.insts.len()).sum()
    }
}
