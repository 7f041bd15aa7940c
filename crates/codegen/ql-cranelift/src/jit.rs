//! In-process execution

use std::mem;

use anyhow::{Context as _, Result, anyhow, bail};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId as ClifFuncId, default_libcall_names};
use log::debug;
use ql_lir::{Backend, BackendError, FunctionDecl, LirFunction};
use rustc_hash::FxHashMap;

use crate::CraneliftBackend;

/// Largest arity [`JitArtifact::call`] can invoke
pub const MAX_CALL_ARITY: usize = 6;

/// Compiled functions ready to run
///
/// Owns the JIT memory; the code stays valid as long as the artifact lives.
pub struct JitArtifact {
    module: JITModule,
    functions: FxHashMap<String, (ClifFuncId, usize)>,
}

impl JitArtifact {
    /// Whether `name` was compiled
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Runs function `name` with `args`
    ///
    /// # Errors
    ///
    /// Fails if there is no such function, the argument count does not match
    /// its arity, or the arity exceeds [`MAX_CALL_ARITY`].
    #[allow(unsafe_code, reason = "entering JIT-compiled code needs a typed function pointer")]
    pub fn call(&self, name: &str, args: &[i64]) -> Result<i64> {
        let &(id, arity) = self
            .functions
            .get(name)
            .ok_or_else(|| anyhow!("no compiled function named '{name}'"))?;
        if args.len() != arity {
            bail!("'{name}' takes {arity} arguments but {} were given", args.len());
        }
        if arity > MAX_CALL_ARITY {
            bail!("'{name}' takes {arity} arguments; at most {MAX_CALL_ARITY} are supported");
        }

        let code = self.module.get_finalized_function(id);
        debug!("jit: calling '{name}' at {code:p}");

        // SAFETY: `code` is the finalized entry of a function declared with
        // exactly `args.len()` i64 parameters and one i64 result in the host
        // calling convention, and `self.module` keeps its memory alive.
        let result = unsafe {
            match *args {
                [] => mem::transmute::<*const u8, extern "C" fn() -> i64>(code)(),
                [a0] => mem::transmute::<*const u8, extern "C" fn(i64) -> i64>(code)(a0),
                [a0, a1] => {
                    mem::transmute::<*const u8, extern "C" fn(i64, i64) -> i64>(code)(a0, a1)
                }
                [a0, a1, a2] => mem::transmute::<*const u8, extern "C" fn(i64, i64, i64) -> i64>(
                    code,
                )(a0, a1, a2),
                [a0, a1, a2, a3] => mem::transmute::<
                    *const u8,
                    extern "C" fn(i64, i64, i64, i64) -> i64,
                >(code)(a0, a1, a2, a3),
                [a0, a1, a2, a3, a4] => mem::transmute::<
                    *const u8,
                    extern "C" fn(i64, i64, i64, i64, i64) -> i64,
                >(code)(a0, a1, a2, a3, a4),
                [a0, a1, a2, a3, a4, a5] => mem::transmute::<
                    *const u8,
                    extern "C" fn(i64, i64, i64, i64, i64, i64) -> i64,
                >(code)(a0, a1, a2, a3, a4, a5),
                _ => bail!("'{name}' takes {arity} arguments; at most {MAX_CALL_ARITY} are supported"),
            }
        };
        Ok(result)
    }
}

impl CraneliftBackend<JITModule> {
    /// Backend that compiles into executable memory of this process
    ///
    /// # Errors
    ///
    /// Fails if the host target is not supported by Cranelift.
    pub fn jit() -> Result<Self> {
        let builder =
            JITBuilder::new(default_libcall_names()).context("Failed to create JIT builder")?;
        Ok(Self::with_module(JITModule::new(builder)))
    }
}

impl Backend for CraneliftBackend<JITModule> {
    type Artifact = JitArtifact;

    fn declare_function(&mut self, decl: &FunctionDecl) -> Result<(), BackendError> {
        self.declare(decl)
    }

    fn define_function(&mut self, function: &LirFunction) -> Result<(), BackendError> {
        self.define(function)
    }

    fn finish(mut self) -> Result<JitArtifact, BackendError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(BackendError::Incomplete(missing));
        }

        self.module
            .finalize_definitions()
            .map_err(|err| BackendError::Emit(err.to_string()))?;

        let functions = self
            .functions
            .into_iter()
            .map(|f| (f.decl.name, (f.id, f.decl.arity)))
            .collect();
        Ok(JitArtifact {
            module: self.module,
            functions,
        })
    }
}
