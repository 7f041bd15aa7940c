//! AST → LIR lowering
//!
//! Every variable gets a stack slot at function entry and every read or
//! write of it becomes a load or store. Labels become blocks and `goto`
//! becomes a jump, so control flow needs no join-point bookkeeping here.
//!
//! Lowering is module-wide: all signatures are handed to the backend first,
//! so a body may call any function of the module, including later ones.

pub mod context;
pub mod error;

use log::{debug, warn};
use ql_ast::{Expr, Module};
use ql_intern::Interner;
use ql_lir::{Backend, FuncId, FunctionDecl};
use ql_resolve::ModuleResolution;

pub use context::{LoweringContext, Signatures};
pub use error::LowerError;

/// A function that could not be lowered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionFailure {
    /// Function name
    pub function: String,
    /// Why it was dropped
    pub error: LowerError,
}

/// Outcome of lowering a module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoweringReport {
    /// Functions handed to the backend, in definition order
    pub defined: Vec<String>,
    /// Functions that were dropped
    pub failures: Vec<FunctionFailure>,
}

impl LoweringReport {
    /// Whether every function was lowered
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Lower every function of `module` into `backend`
///
/// A function that fails to lower (or that the backend rejects) is dropped
/// and recorded in the report; its siblings are still lowered.
///
/// # Errors
///
/// Fails on a backend error while declaring signatures, or on a call with
/// the wrong number of arguments anywhere in the module.
///
/// # Panics
///
/// Panics if `resolution` was computed for a different module.
pub fn lower_module<B: Backend>(
    module: &Module,
    resolution: &ModuleResolution,
    interner: &Interner,
    backend: &mut B,
) -> Result<LoweringReport, LowerError> {
    assert_eq!(
        module.functions.len(),
        resolution.functions.len(),
        "internal error: resolution does not match the module"
    );

    let mut signatures = Signatures::default();
    let mut decls = Vec::with_capacity(module.functions.len());
    for (index, function) in module.functions.iter().enumerate() {
        let decl = FunctionDecl {
            id: FuncId(index as u32),
            name: interner.resolve(function.name).to_owned(),
            arity: function.arity(),
        };
        backend.declare_function(&decl)?;
        signatures.insert(function.name, decl.clone());
        decls.push(decl);
    }
    check_arities(module, &signatures, interner)?;

    let mut report = LoweringReport::default();
    for ((function, resolved), decl) in module
        .functions
        .iter()
        .zip(&resolution.functions)
        .zip(decls)
    {
        let name = decl.name.clone();
        let lowered =
            LoweringContext::lower_function(function, decl, resolved, &signatures, interner)
                .and_then(|lir| {
                    debug!(
                        "lowered '{name}': {} blocks, {} slots, {} instructions",
                        lir.blocks.len(),
                        lir.slots.len(),
                        lir.inst_count()
                    );
                    Ok(backend.define_function(&lir)?)
                });

        match lowered {
            Ok(()) => report.defined.push(name),
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => {
                warn!("dropping '{name}': {error}");
                report.failures.push(FunctionFailure {
                    function: name,
                    error,
                });
            }
        }
    }

    Ok(report)
}

/// Rejects the first call in `module` whose argument count differs from the
/// callee's parameter count
///
/// Runs before any body is lowered, so a mismatch stops the module even when
/// an earlier call in the same function names an unknown callee. Unknown
/// callees are left to lowering.
fn check_arities(
    module: &Module,
    signatures: &Signatures,
    interner: &Interner,
) -> Result<(), LowerError> {
    for function in &module.functions {
        for (_, expr) in function.body.iter() {
            let Expr::Call { callee, args } = expr else {
                continue;
            };
            let Some(decl) = signatures.get(callee) else {
                continue;
            };
            if decl.arity != args.len() {
                return Err(LowerError::ArityMismatch {
                    function: interner.resolve(function.name).to_owned(),
                    callee: decl.name.clone(),
                    expected: decl.arity,
                    found: args.len(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
