//! Abstract syntax tree for Quill programs
//!
//! The parser hands the core a [`Module`]: an ordered list of functions, each
//! owning its own node arena ([`Body`]). Every node has exactly one parent, so
//! a body is a strict tree addressed by [`ExprId`]. Scopes are not stored in
//! the nodes; the resolver attaches them in side tables keyed by `ExprId`.

pub mod builder;
pub mod render;

use std::ops::Index;

use derive_more::Display;
use la_arena::{Arena, Idx};
use ql_intern::Symbol;

pub use builder::BodyBuilder;
pub use render::RenderNotes;

/// Node ID inside a function body
pub type ExprId = Idx<Expr>;

/// A syntax node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Integer literal
    Number(i64),
    /// Read of a variable
    Variable(Symbol),
    /// Address of a variable's storage
    AddressOf(Symbol),
    /// Name of a label, only meaningful as the operand of `goto`
    LabelRef(Symbol),
    /// Ordered sequence of nodes (statement lists, `if` bodies)
    List(Vec<ExprId>),
    /// A statement, optionally preceded by labels
    Statement {
        /// Labels marking this statement
        labels: SymbolList,
        /// The statement itself
        inner: ExprId,
    },
    /// Call of a module-level function
    Call {
        /// Function name
        callee: Symbol,
        /// Arguments, evaluated left to right
        args: Vec<ExprId>,
    },
    /// Conditional block without `else`
    If {
        /// Condition, evaluated in the enclosing scope
        condition: ExprId,
        /// Body, always a [`Expr::List`]
        then_body: ExprId,
    },
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: ExprId,
        /// Right operand
        rhs: ExprId,
    },
    /// Unary operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: ExprId,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BinaryOp {
    /// First binding of a variable (`x := e`)
    #[display("DECLARE")]
    Declare,
    /// Assignment to an existing variable or memory location (`x = e`)
    #[display("ASSIGN")]
    Assign,
    /// Addition
    #[display("ADD")]
    Add,
    /// Subtraction
    #[display("SUB")]
    Sub,
    /// Multiplication
    #[display("MUL")]
    Mul,
    /// Bitwise and
    #[display("AND")]
    And,
    /// Signed `<=`
    #[display("LESSEQ")]
    LessEq,
    /// Inequality
    #[display("NOTEQ")]
    NotEq,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UnaryOp {
    /// Bitwise not
    #[display("NOT")]
    Not,
    /// Arithmetic negation
    #[display("NEG")]
    Negate,
    /// Load through an address
    #[display("DEREF")]
    Deref,
    /// Return from the function
    #[display("RETURN")]
    Return,
    /// Unconditional jump to a label
    #[display("GOTO")]
    Goto,
}

impl UnaryOp {
    /// Whether the operator ends the current basic block
    #[must_use]
    pub const fn is_terminator(self) -> bool {
        matches!(self, Self::Return | Self::Goto)
    }
}

/// Plain list of names: parameter lists and statement labels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolList(pub Vec<Symbol>);

impl SymbolList {
    /// Empty list
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a name
    pub fn push(&mut self, sym: Symbol) {
        self.0.push(sym);
    }

    /// Iterate over the names in order
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.0.iter().copied()
    }

    /// Number of names
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Symbol>> for SymbolList {
    fn from(syms: Vec<Symbol>) -> Self {
        Self(syms)
    }
}

/// Node storage of one function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    /// All nodes of the function
    pub exprs: Arena<Expr>,
    /// Statement list of the function, always a [`Expr::List`]
    pub root: ExprId,
}

impl Body {
    /// Iterate over every node in allocation order
    pub fn iter(&self) -> impl Iterator<Item = (ExprId, &Expr)> {
        self.exprs.iter()
    }
}

impl Index<ExprId> for Body {
    type Output = Expr;

    fn index(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Function name
    pub name: Symbol,
    /// Parameter names, in order
    pub params: SymbolList,
    /// Function body
    pub body: Body,
}

impl Function {
    /// Create a function from its parts
    #[must_use]
    pub const fn new(name: Symbol, params: SymbolList, body: Body) -> Self {
        Self { name, params, body }
    }

    /// Number of parameters
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A whole program: function definitions in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    /// Functions in definition order
    pub functions: Vec<Function>,
}

impl Module {
    /// Create an empty module
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a function definition
    pub fn push(&mut self, function: Function) {
        self.functions.push(function);
    }
}
