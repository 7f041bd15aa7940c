//! String interning for symbols
//!
//! One [`Interner`] lives for exactly one compilation run. Ids are handed out
//! densely in first-occurrence order and are never reused.

use lasso::{Key as _, Rodeo};
pub use lasso::Spur as Symbol;

/// Append-only symbol table for a single compilation run
#[derive(Debug, Default)]
pub struct Interner {
    rodeo: Rodeo,
}

impl Interner {
    /// Create an empty interner
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning the existing symbol if it was seen before
    pub fn intern(&mut self, name: &str) -> Symbol {
        self.rodeo.get_or_intern(name)
    }

    /// Look up a name without interning it
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.rodeo.get(name)
    }

    /// Resolve a symbol back to its name
    ///
    /// # Panics
    ///
    /// Panics if `sym` was not allocated by this interner. That can only
    /// happen through a bug in the compiler itself.
    #[must_use]
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.rodeo.try_resolve(&sym).unwrap_or_else(|| {
            panic!(
                "internal error: symbol #{} was never interned in this session",
                sym.into_usize()
            )
        })
    }

    /// Resolve a symbol, returning `None` for ids this interner never allocated
    #[must_use]
    pub fn try_resolve(&self, sym: Symbol) -> Option<&str> {
        self.rodeo.try_resolve(&sym)
    }

    /// The stable integer id of a symbol
    #[must_use]
    pub fn index(sym: Symbol) -> usize {
        sym.into_usize()
    }

    /// Number of distinct names interned so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Whether nothing has been interned yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }

    /// Human-readable dump of the whole table, one `id: name` per line
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::from("Symbol table contents:\n");
        for (sym, name) in self.rodeo.iter() {
            out.push_str(&sym.into_usize().to_string());
            out.push_str(": ");
            out.push_str(name);
            out.push('\n');
        }
        out
    }
}
