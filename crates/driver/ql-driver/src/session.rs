//! Per-run compilation state

use ql_intern::{Interner, Symbol};

use crate::config::DriverConfig;

/// Everything that lives for exactly one compilation run
///
/// The parser interns names through the session while building the AST; the
/// passes then read the same table.
#[derive(Debug, Default)]
pub struct CompileSession {
    interner: Interner,
    config: DriverConfig,
}

impl CompileSession {
    /// Start a run with `config`
    #[must_use]
    pub fn new(config: DriverConfig) -> Self {
        Self {
            interner: Interner::new(),
            config,
        }
    }

    /// Intern a name
    pub fn intern(&mut self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    /// The symbol table
    #[must_use]
    pub const fn interner(&self) -> &Interner {
        &self.interner
    }

    /// The run's settings
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }
}
