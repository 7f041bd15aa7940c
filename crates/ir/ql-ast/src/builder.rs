//! Bottom-up construction of function bodies
//!
//! The parser allocates children before their parent, so every builder method
//! takes already-built child ids and returns the id of the new node.

use la_arena::Arena;
use ql_intern::Symbol;

use crate::{BinaryOp, Body, Expr, ExprId, SymbolList, UnaryOp};

/// Builder for a single function body
#[derive(Debug, Default)]
pub struct BodyBuilder {
    exprs: Arena<Expr>,
}

impl BodyBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an arbitrary node
    pub fn alloc(&mut self, expr: Expr) -> ExprId {
        self.exprs.alloc(expr)
    }

    /// Integer literal
    pub fn number(&mut self, value: i64) -> ExprId {
        self.alloc(Expr::Number(value))
    }

    /// Variable read
    pub fn var(&mut self, name: Symbol) -> ExprId {
        self.alloc(Expr::Variable(name))
    }

    /// Address of a variable
    pub fn address_of(&mut self, name: Symbol) -> ExprId {
        self.alloc(Expr::AddressOf(name))
    }

    /// Label reference
    pub fn label_ref(&mut self, name: Symbol) -> ExprId {
        self.alloc(Expr::LabelRef(name))
    }

    /// Node list
    pub fn list(&mut self, items: Vec<ExprId>) -> ExprId {
        self.alloc(Expr::List(items))
    }

    /// Unlabelled statement
    pub fn stmt(&mut self, inner: ExprId) -> ExprId {
        self.labelled(Vec::new(), inner)
    }

    /// Statement preceded by `labels`
    pub fn labelled(&mut self, labels: Vec<Symbol>, inner: ExprId) -> ExprId {
        self.alloc(Expr::Statement {
            labels: SymbolList(labels),
            inner,
        })
    }

    /// Function call
    pub fn call(&mut self, callee: Symbol, args: Vec<ExprId>) -> ExprId {
        self.alloc(Expr::Call { callee, args })
    }

    /// Conditional block; `then_stmts` are wrapped into a list node
    pub fn if_then(&mut self, condition: ExprId, then_stmts: Vec<ExprId>) -> ExprId {
        let then_body = self.list(then_stmts);
        self.alloc(Expr::If {
            condition,
            then_body,
        })
    }

    /// Binary operation
    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.alloc(Expr::Binary { op, lhs, rhs })
    }

    /// Unary operation
    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.alloc(Expr::Unary { op, operand })
    }

    /// `name := value`
    pub fn declare(&mut self, name: Symbol, value: ExprId) -> ExprId {
        let target = self.var(name);
        self.binary(BinaryOp::Declare, target, value)
    }

    /// `name = value`
    pub fn assign(&mut self, name: Symbol, value: ExprId) -> ExprId {
        let target = self.var(name);
        self.binary(BinaryOp::Assign, target, value)
    }

    /// `return value`
    pub fn ret(&mut self, value: ExprId) -> ExprId {
        self.unary(UnaryOp::Return, value)
    }

    /// `goto label`
    pub fn goto(&mut self, label: Symbol) -> ExprId {
        let target = self.label_ref(label);
        self.unary(UnaryOp::Goto, target)
    }

    /// Finish the body with `statements` as its root list
    #[must_use]
    pub fn finish(mut self, statements: Vec<ExprId>) -> Body {
        let root = self.list(statements);
        Body {
            exprs: self.exprs,
            root,
        }
    }
}
