//! Visibility tables

use derive_more::Display;
use indexmap::IndexMap;
use ql_ast::ExprId;
use ql_intern::{Interner, Symbol};
use rustc_hash::FxBuildHasher;

/// Which kind of name a declaration introduces
///
/// Variables and labels live side by side: a variable and a label may share
/// a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Namespace {
    /// Parameters and `:=` targets
    #[display("variable")]
    Var,
    /// Statement labels
    #[display("label")]
    Label,
}

/// The node whose scope holds a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeOwner {
    /// The function's root scope
    Function,
    /// The scope of a conditional block
    If(ExprId),
}

/// A name bubbled up by the collect phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    /// Declared name
    pub symbol: Symbol,
    /// Namespace it is declared in
    pub namespace: Namespace,
}

impl Declaration {
    /// Variable declaration
    #[must_use]
    pub const fn var(symbol: Symbol) -> Self {
        Self {
            symbol,
            namespace: Namespace::Var,
        }
    }

    /// Label declaration
    #[must_use]
    pub const fn label(symbol: Symbol) -> Self {
        Self {
            symbol,
            namespace: Namespace::Label,
        }
    }
}

/// A name that was inserted twice into one scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    /// The duplicated name
    pub symbol: Symbol,
    /// Namespace of the duplicate
    pub namespace: Namespace,
}

type Table = IndexMap<Symbol, ScopeOwner, FxBuildHasher>;

/// Names visible at one node, one insertion-ordered table per namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    vars: Table,
    labels: Table,
}

impl Scope {
    /// Create an empty scope
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, namespace: Namespace) -> &Table {
        match namespace {
            Namespace::Var => &self.vars,
            Namespace::Label => &self.labels,
        }
    }

    /// Declare `symbol` in `namespace`, owned by `owner`
    ///
    /// # Errors
    ///
    /// Returns a [`Conflict`] if the name is already present in that
    /// namespace. The scope is left unchanged in that case.
    pub fn insert(
        &mut self,
        symbol: Symbol,
        namespace: Namespace,
        owner: ScopeOwner,
    ) -> Result<(), Conflict> {
        let table = match namespace {
            Namespace::Var => &mut self.vars,
            Namespace::Label => &mut self.labels,
        };
        if table.contains_key(&symbol) {
            return Err(Conflict { symbol, namespace });
        }
        table.insert(symbol, owner);
        Ok(())
    }

    /// Whether `symbol` is visible in `namespace`
    #[must_use]
    pub fn contains(&self, symbol: Symbol, namespace: Namespace) -> bool {
        self.table(namespace).contains_key(&symbol)
    }

    /// The scope that declared `symbol`, if it is visible
    #[must_use]
    pub fn lookup(&self, symbol: Symbol, namespace: Namespace) -> Option<ScopeOwner> {
        self.table(namespace).get(&symbol).copied()
    }

    /// Import every entry of `other`
    ///
    /// # Errors
    ///
    /// Stops at the first entry already present in this scope.
    pub fn merge(&mut self, other: &Self) -> Result<(), Conflict> {
        for (&symbol, &owner) in &other.vars {
            self.insert(symbol, Namespace::Var, owner)?;
        }
        for (&symbol, &owner) in &other.labels {
            self.insert(symbol, Namespace::Label, owner)?;
        }
        Ok(())
    }

    /// A copy of this scope with `parent` merged in
    ///
    /// # Errors
    ///
    /// See [`Scope::merge`].
    pub fn merged_with(&self, parent: &Self) -> Result<Self, Conflict> {
        let mut merged = self.clone();
        merged.merge(parent)?;
        Ok(merged)
    }

    /// Variables in declaration order
    pub fn variables(&self) -> impl Iterator<Item = (Symbol, ScopeOwner)> + '_ {
        self.vars.iter().map(|(&symbol, &owner)| (symbol, owner))
    }

    /// Labels in declaration order
    pub fn labels(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.labels.keys().copied()
    }

    /// Names visible in `namespace`
    pub fn names(&self, namespace: Namespace) -> impl Iterator<Item = Symbol> + '_ {
        self.table(namespace).keys().copied()
    }

    /// Number of entries across both namespaces
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len() + self.labels.len()
    }

    /// Whether the scope declares nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.labels.is_empty()
    }

    /// Debug dump: `Current scope: a,b,` (variables, then labels)
    #[must_use]
    pub fn render(&self, interner: &Interner) -> String {
        let mut out = String::from("Current scope: ");
        for symbol in self.vars.keys().chain(self.labels.keys()) {
            out.push_str(interner.resolve(*symbol));
            out.push(',');
        }
        out
    }
}
