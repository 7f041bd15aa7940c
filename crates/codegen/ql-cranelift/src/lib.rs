//! Cranelift backend for Quill
//!
//! Compiles LIR to native code, either into a relocatable object file
//! ([`CraneliftBackend::object`]) or into executable memory
//! ([`CraneliftBackend::jit`]). Every function takes and returns 64-bit
//! integers.

pub mod jit;
pub mod object;
pub mod translate;

use cranelift::codegen::ir::{FuncRef, UserFuncName};
use cranelift::codegen::{Context, verify_function};
use cranelift::prelude::*;
use cranelift_module::{FuncId as ClifFuncId, Linkage, Module};
use log::debug;
use ql_lir::{BackendError, FunctionDecl, LirFunction, check_calls};

pub use jit::JitArtifact;
pub use object::ObjectArtifact;

struct DeclaredFunction {
    decl: FunctionDecl,
    id: ClifFuncId,
    clif: Option<String>,
}

/// Backend that compiles LIR through Cranelift into module `M`
pub struct CraneliftBackend<M: Module> {
    /// Cranelift module receiving the code
    module: M,

    /// Function builder context
    builder_context: FunctionBuilderContext,

    /// Cranelift context
    ctx: Context,

    /// Declared functions, indexed by LIR function id
    functions: Vec<DeclaredFunction>,
}

impl<M: Module> CraneliftBackend<M> {
    fn with_module(module: M) -> Self {
        Self {
            ctx: module.make_context(),
            module,
            builder_context: FunctionBuilderContext::new(),
            functions: Vec::new(),
        }
    }

    fn declare(&mut self, decl: &FunctionDecl) -> Result<(), BackendError> {
        if self.functions.iter().any(|known| known.decl.name == decl.name) {
            return Err(BackendError::DuplicateDeclaration(decl.name.clone()));
        }
        if decl.id.0 as usize != self.functions.len() {
            return Err(BackendError::Rejected {
                function: decl.name.clone(),
                reason: format!("declared out of order as {}", decl.id),
            });
        }

        let mut sig = self.module.make_signature();
        for _ in 0..decl.arity {
            sig.params.push(AbiParam::new(types::I64));
        }
        sig.returns.push(AbiParam::new(types::I64));

        let id = self
            .module
            .declare_function(&decl.name, Linkage::Export, &sig)
            .map_err(|err| BackendError::Rejected {
                function: decl.name.clone(),
                reason: err.to_string(),
            })?;

        debug!("cranelift: declared '{}' as {id}", decl.name);
        self.functions.push(DeclaredFunction {
            decl: decl.clone(),
            id,
            clif: None,
        });
        Ok(())
    }

    fn define(&mut self, lir: &LirFunction) -> Result<(), BackendError> {
        let index = lir.decl.id.0 as usize;
        let Some(declared) = self.functions.get(index) else {
            return Err(BackendError::Undeclared(lir.decl.name.clone()));
        };
        if declared.decl != lir.decl {
            return Err(BackendError::Undeclared(lir.decl.name.clone()));
        }
        let func_id = declared.id;

        let decls: Vec<FunctionDecl> = self.functions.iter().map(|f| f.decl.clone()).collect();
        check_calls(lir, &decls)?;

        let result = self.build(func_id, lir);
        self.module.clear_context(&mut self.ctx);
        if result.is_err() {
            // A translation that stopped half way leaves builder state behind.
            self.builder_context = FunctionBuilderContext::new();
        }
        let clif = result?;

        self.functions[index].clif = Some(clif);
        debug!("cranelift: defined '{}'", lir.decl.name);
        Ok(())
    }

    /// Translates, verifies and defines one function; returns its CLIF text
    fn build(&mut self, func_id: ClifFuncId, lir: &LirFunction) -> Result<String, BackendError> {
        let rejected = |reason: String| BackendError::Rejected {
            function: lir.decl.name.clone(),
            reason,
        };

        self.ctx.func.signature = self
            .module
            .declarations()
            .get_function_decl(func_id)
            .signature
            .clone();
        self.ctx.func.name = UserFuncName::user(0, func_id.as_u32());

        let ids: Vec<ClifFuncId> = self.functions.iter().map(|f| f.id).collect();
        let func_refs: Vec<FuncRef> = ids
            .into_iter()
            .map(|id| self.module.declare_func_in_func(id, &mut self.ctx.func))
            .collect();

        let builder = FunctionBuilder::new(&mut self.ctx.func, &mut self.builder_context);
        translate::translate_function(builder, lir, &func_refs)?;

        verify_function(&self.ctx.func, self.module.isa())
            .map_err(|errors| rejected(errors.to_string()))?;
        let clif = self.ctx.func.display().to_string();

        self.module
            .define_function(func_id, &mut self.ctx)
            .map_err(|err| rejected(err.to_string()))?;
        Ok(clif)
    }

    /// Names of declared functions that have no body yet
    fn missing(&self) -> Vec<String> {
        self.functions
            .iter()
            .filter(|f| f.clif.is_none())
            .map(|f| f.decl.name.clone())
            .collect()
    }

    /// CLIF text of every defined function, in declaration order
    fn clif_text(&self) -> String {
        self.functions
            .iter()
            .filter_map(|f| f.clif.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
