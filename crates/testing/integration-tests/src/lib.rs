//! Integration test utilities for the Quill compiler
//!
//! There is no parser in this workspace, so fixtures build ASTs directly
//! through the session's interner, the way a parser would.

use anyhow::Result;
use ql_ast::{BodyBuilder, ExprId, Function, Module, SymbolList};
use ql_cranelift::{CraneliftBackend, JitArtifact};
use ql_driver::{CompileOutcome, CompileSession, DriverConfig, compile_module};
use ql_intern::Symbol;
use ql_lir::TextBackend;
use ql_resolve::{ModuleResolution, ResolutionError, resolve_module};

/// Test fixture: a session plus the module being built in it
#[derive(Debug, Default)]
pub struct TestFixture {
    /// Session owning the interner
    pub session: CompileSession,
    /// Functions added so far
    pub module: Module,
}

impl TestFixture {
    /// Creates an empty fixture with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty fixture with `config`
    #[must_use]
    pub fn with_config(config: DriverConfig) -> Self {
        Self {
            session: CompileSession::new(config),
            module: Module::new(),
        }
    }

    /// Interns a name
    pub fn sym(&mut self, name: &str) -> Symbol {
        self.session.intern(name)
    }

    /// Adds function `name(params…)` whose body is built by `body`
    ///
    /// `body` receives the builder and the fixture (to intern names) and returns
    /// the top-level statements.
    pub fn function(
        &mut self,
        name: &str,
        params: &[&str],
        body: impl FnOnce(&mut BodyBuilder, &mut Self) -> Vec<ExprId>,
    ) -> &mut Self {
        let name = self.sym(name);
        let params = SymbolList(params.iter().map(|param| self.sym(param)).collect());
        let mut builder = BodyBuilder::new();
        let statements = body(&mut builder, self);
        self.module
            .push(Function::new(name, params, builder.finish(statements)));
        self
    }

    /// Resolves the module built so far
    ///
    /// # Errors
    ///
    /// Returns the redefinition that stopped resolution.
    pub fn resolve(&self) -> Result<ModuleResolution, ResolutionError> {
        resolve_module(&self.module, self.session.interner())
    }

    /// Compiles to LIR text
    #[must_use]
    pub fn compile_lir(&self) -> CompileOutcome<String> {
        compile_module(&self.session, &self.module, TextBackend::new())
    }

    /// Compiles into executable memory
    ///
    /// # Errors
    ///
    /// Fails if the host is not supported by Cranelift.
    pub fn compile_jit(&self) -> Result<CompileOutcome<JitArtifact>> {
        Ok(compile_module(
            &self.session,
            &self.module,
            CraneliftBackend::jit()?,
        ))
    }

    /// Compiles into executable memory and requires success
    ///
    /// # Panics
    ///
    /// Panics with the diagnostics if compilation failed.
    #[must_use]
    pub fn jit(&self) -> JitArtifact {
        let outcome = self.compile_jit().expect("host should support the JIT");
        let rendered: Vec<String> = outcome.diagnostics.iter().map(ToString::to_string).collect();
        match outcome.artifact {
            Some(artifact) => artifact,
            None => panic!("compilation failed: {rendered:?}"),
        }
    }

    /// Diagnostics of a LIR compile, rendered as the driver writes them
    #[must_use]
    pub fn diagnostics(&self) -> String {
        let mut out = Vec::new();
        let outcome = self.compile_lir();
        if outcome.emit_diagnostics(&mut out).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}
