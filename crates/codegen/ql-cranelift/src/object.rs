//! Object file emission

use anyhow::{Context as _, Result, anyhow};
use cranelift::prelude::*;
use cranelift_module::default_libcall_names;
use cranelift_object::{ObjectBuilder, ObjectModule};
use ql_lir::{Backend, BackendError, FunctionDecl, LirFunction};

use crate::CraneliftBackend;

/// A finished object file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectArtifact {
    /// Object file contents for the host target
    pub bytes: Vec<u8>,
    /// CLIF text of every function, in declaration order
    pub clif: String,
}

impl CraneliftBackend<ObjectModule> {
    /// Backend that emits a position-independent object file for the host
    ///
    /// # Errors
    ///
    /// Fails if the host target is not supported by Cranelift.
    pub fn object(module_name: &str) -> Result<Self> {
        let mut flag_builder = settings::builder();
        flag_builder
            .set("is_pic", "true")
            .context("Failed to enable PIC")?;
        let isa_builder = cranelift_native::builder()
            .map_err(|msg| anyhow!("host machine is not supported: {msg}"))?;
        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .context("Failed to build target ISA")?;
        let builder = ObjectBuilder::new(isa, module_name, default_libcall_names())
            .context("Failed to create object builder")?;

        Ok(Self::with_module(ObjectModule::new(builder)))
    }
}

impl Backend for CraneliftBackend<ObjectModule> {
    type Artifact = ObjectArtifact;

    fn declare_function(&mut self, decl: &FunctionDecl) -> Result<(), BackendError> {
        self.declare(decl)
    }

    fn define_function(&mut self, function: &LirFunction) -> Result<(), BackendError> {
        self.define(function)
    }

    fn finish(self) -> Result<ObjectArtifact, BackendError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(BackendError::Incomplete(missing));
        }

        let clif = self.clif_text();
        let bytes = self
            .module
            .finish()
            .emit()
            .map_err(|err| BackendError::Emit(err.to_string()))?;
        Ok(ObjectArtifact { bytes, clif })
    }
}
