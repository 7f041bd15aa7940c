//! Compilation driver for Quill
//!
//! Runs the passes over a parsed [`Module`] in order: scope collection,
//! scope checking, lowering, and backend emission. Each phase finishes
//! before the next starts. A redefinition stops the run at once with that
//! single diagnostic; undefined references are reported together and keep
//! lowering from starting.

pub mod config;
pub mod diagnostics;
pub mod session;

use std::io;

use anyhow::Result;
use log::{debug, info};
use ql_ast::Module;
use ql_cranelift::CraneliftBackend;
use ql_lir::{Backend, TextBackend};
use ql_lower::lower_module;
use ql_resolve::resolve_module;

pub use config::{DriverConfig, EmitKind};
pub use diagnostics::{CompileError, ErrorCategory, write_diagnostics};
pub use session::CompileSession;

/// Result of one compilation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutcome<A> {
    /// Backend output, present only if every phase succeeded
    pub artifact: Option<A>,

    /// Problems in detection order
    pub diagnostics: Vec<CompileError>,

    /// Debug dumps requested by the configuration
    pub dumps: Vec<String>,
}

impl<A> CompileOutcome<A> {
    fn failed(diagnostics: Vec<CompileError>, dumps: Vec<String>) -> Self {
        Self {
            artifact: None,
            diagnostics,
            dumps,
        }
    }

    /// Whether an artifact was produced
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.artifact.is_some()
    }

    /// Failure category, `None` on success
    #[must_use]
    pub fn category(&self) -> Option<ErrorCategory> {
        (!self.is_success()).then(|| {
            self.diagnostics
                .first()
                .map_or(ErrorCategory::Scope, CompileError::category)
        })
    }

    /// Process exit status for this outcome
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.category().map_or(0, ErrorCategory::exit_code)
    }

    /// Writes every diagnostic, one per line
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn emit_diagnostics<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        write_diagnostics(writer, &self.diagnostics)
    }

    /// Converts the artifact, keeping diagnostics and dumps
    pub fn map<T>(self, f: impl FnOnce(A) -> T) -> CompileOutcome<T> {
        CompileOutcome {
            artifact: self.artifact.map(f),
            diagnostics: self.diagnostics,
            dumps: self.dumps,
        }
    }
}

/// Output of [`compile`], shaped by [`EmitKind`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Object file bytes
    Object(Vec<u8>),
    /// Cranelift IR text
    Clif(String),
    /// LIR text
    Lir(String),
}

/// Compiles `module` into `backend`
///
/// Lowering only starts if resolution found no errors, and the backend is
/// only finished if every function was lowered.
pub fn compile_module<B: Backend>(
    session: &CompileSession,
    module: &Module,
    mut backend: B,
) -> CompileOutcome<B::Artifact> {
    let interner = session.interner();
    let config = session.config();

    let mut dumps = Vec::new();
    if config.dump_ast {
        dumps.push(module.render(interner));
    }
    if config.dump_symbols {
        dumps.push(interner.dump());
    }

    info!(
        "compiling '{}': {} functions",
        config.module_name,
        module.functions.len()
    );

    let resolution = match resolve_module(module, interner) {
        Ok(resolution) => resolution,
        Err(fatal) => {
            debug!("resolution aborted: {fatal}");
            return CompileOutcome::failed(vec![fatal.into()], dumps);
        }
    };
    if config.dump_scopes {
        dumps.push(resolution.render(module, interner));
    }
    if !resolution.is_ok() {
        debug!(
            "resolution found {} errors; skipping lowering",
            resolution.error_count()
        );
        let diagnostics = resolution.errors().cloned().map(CompileError::from).collect();
        return CompileOutcome::failed(diagnostics, dumps);
    }

    let report = match lower_module(module, &resolution, interner, &mut backend) {
        Ok(report) => report,
        Err(fatal) => {
            debug!("lowering aborted: {fatal}");
            return CompileOutcome::failed(vec![fatal.into()], dumps);
        }
    };
    if !report.is_ok() {
        let diagnostics = report
            .failures
            .into_iter()
            .map(|failure| CompileError::from(failure.error))
            .collect();
        return CompileOutcome::failed(diagnostics, dumps);
    }

    match backend.finish() {
        Ok(artifact) => {
            info!("compiled '{}'", config.module_name);
            CompileOutcome {
                artifact: Some(artifact),
                diagnostics: Vec::new(),
                dumps,
            }
        }
        Err(err) => CompileOutcome::failed(vec![err.into()], dumps),
    }
}

/// Compiles `module` into the format the session's configuration asks for
///
/// # Errors
///
/// Fails only if the Cranelift backend cannot be created for this host;
/// compilation problems are reported in the outcome.
pub fn compile(session: &CompileSession, module: &Module) -> Result<CompileOutcome<Artifact>> {
    let config = session.config();
    let outcome = match config.emit {
        EmitKind::Object => {
            let backend = CraneliftBackend::object(&config.module_name)?;
            compile_module(session, module, backend).map(|object| Artifact::Object(object.bytes))
        }
        EmitKind::Clif => {
            let backend = CraneliftBackend::object(&config.module_name)?;
            compile_module(session, module, backend).map(|object| Artifact::Clif(object.clif))
        }
        EmitKind::Lir => compile_module(session, module, TextBackend::new()).map(Artifact::Lir),
    };
    Ok(outcome)
}
