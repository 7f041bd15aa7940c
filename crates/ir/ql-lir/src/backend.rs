//! Code generator interface
//!
//! A backend receives every function signature of a module first, then the
//! finished bodies, then produces its artifact. Splitting declaration from
//! definition is what lets a body call a function defined later in the
//! module.

use log::debug;
use thiserror::Error;

use crate::{FuncId, FunctionDecl, Inst, LirFunction};

/// Errors raised by a backend or by [`crate::LirBuilder::finish`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The LIR handed over is not well formed
    #[error("function '{function}' is malformed: {reason}")]
    Malformed {
        /// Function name
        function: String,
        /// What is wrong
        reason: String,
    },

    /// The code generator refused a well-formed function
    #[error("backend rejected function '{function}': {reason}")]
    Rejected {
        /// Function name
        function: String,
        /// Code generator message
        reason: String,
    },

    /// A function was defined or called without being declared first
    #[error("function '{0}' was never declared")]
    Undeclared(String),

    /// Two declarations share a name
    #[error("function '{0}' is declared twice")]
    DuplicateDeclaration(String),

    /// `finish` was reached while some declared functions have no body
    #[error("functions declared but never defined: {}", .0.join(", "))]
    Incomplete(Vec<String>),

    /// Writing the final artifact failed
    #[error("failed to emit module: {0}")]
    Emit(String),
}

/// A code generator that turns LIR functions into an artifact
pub trait Backend {
    /// What `finish` produces
    type Artifact;

    /// Register a function signature
    ///
    /// # Errors
    ///
    /// Fails if the name is already declared or the backend cannot represent
    /// the signature.
    fn declare_function(&mut self, decl: &FunctionDecl) -> Result<(), BackendError>;

    /// Provide the body of a previously declared function
    ///
    /// # Errors
    ///
    /// Fails if the function was not declared or the code generator rejects
    /// it. A failed definition leaves the function undefined.
    fn define_function(&mut self, function: &LirFunction) -> Result<(), BackendError>;

    /// Produce the artifact
    ///
    /// # Errors
    ///
    /// Fails if any declared function is still undefined or emission fails.
    fn finish(self) -> Result<Self::Artifact, BackendError>;
}

/// Checks every call in `function` against the declared signatures
///
/// # Errors
///
/// Returns [`BackendError::Rejected`] for a call to an unknown function id or
/// with the wrong number of arguments.
pub fn check_calls(function: &LirFunction, decls: &[FunctionDecl]) -> Result<(), BackendError> {
    for block in &function.blocks {
        for inst in &block.insts {
            let Inst::Call { callee, args, .. } = inst else {
                continue;
            };
            let Some(decl) = decls.get(callee.0 as usize) else {
                return Err(BackendError::Rejected {
                    function: function.decl.name.clone(),
                    reason: format!("call to unknown {callee}"),
                });
            };
            if decl.arity != args.len() {
                return Err(BackendError::Rejected {
                    function: function.decl.name.clone(),
                    reason: format!(
                        "call to '{}' passes {} arguments, expected {}",
                        decl.name,
                        args.len(),
                        decl.arity
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Backend that renders functions as LIR text
///
/// Its artifact is the text of every function in declaration order. Used to
/// inspect and compare lowerings.
#[derive(Debug, Default)]
pub struct TextBackend {
    decls: Vec<FunctionDecl>,
    bodies: Vec<Option<String>>,
}

impl TextBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_of(&self, function: &LirFunction) -> Result<usize, BackendError> {
        let index = function.decl.id.0 as usize;
        match self.decls.get(index) {
            Some(decl) if decl.name == function.decl.name => Ok(index),
            _ => Err(BackendError::Undeclared(function.decl.name.clone())),
        }
    }
}

impl Backend for TextBackend {
    type Artifact = String;

    fn declare_function(&mut self, decl: &FunctionDecl) -> Result<(), BackendError> {
        if self.decls.iter().any(|known| known.name == decl.name) {
            return Err(BackendError::DuplicateDeclaration(decl.name.clone()));
        }
        if decl.id != FuncId(self.decls.len() as u32) {
            return Err(BackendError::Rejected {
                function: decl.name.clone(),
                reason: format!("expected {} but got {}", FuncId(self.decls.len() as u32), decl.id),
            });
        }
        self.decls.push(decl.clone());
        self.bodies.push(None);
        Ok(())
    }

    fn define_function(&mut self, function: &LirFunction) -> Result<(), BackendError> {
        let index = self.slot_of(function)?;
        check_calls(function, &self.decls)?;
        debug!("text backend: defined {}", function.decl.name);
        self.bodies[index] = Some(function.to_string());
        Ok(())
    }

    fn finish(self) -> Result<String, BackendError> {
        let missing: Vec<String> = self
            .decls
            .iter()
            .zip(&self.bodies)
            .filter(|(_, body)| body.is_none())
            .map(|(decl, _)| decl.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(BackendError::Incomplete(missing));
        }

        Ok(self.bodies.into_iter().flatten().collect::<Vec<_>>().join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LirBuilder;

    fn decl(id: u32, name: &str, arity: usize) -> FunctionDecl {
        FunctionDecl {
            id: FuncId(id),
            name: name.to_string(),
            arity,
        }
    }

    fn returning(decl: FunctionDecl, value: i64) -> LirFunction {
        let mut builder = LirBuilder::new(decl);
        let v = builder.iconst(value);
        builder.ret(v);
        builder.finish().unwrap()
    }

    #[test]
    fn text_artifact_follows_declaration_order() {
        let mut backend = TextBackend::new();
        backend.declare_function(&decl(0, "first", 0)).unwrap();
        backend.declare_function(&decl(1, "second", 0)).unwrap();
        backend
            .define_function(&returning(decl(1, "second", 0), 2))
            .unwrap();
        backend
            .define_function(&returning(decl(0, "first", 0), 1))
            .unwrap();

        let text = backend.finish().unwrap();
        let first = text.find("first").unwrap();
        let second = text.find("second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn undefined_function_fails_finish() {
        let mut backend = TextBackend::new();
        backend.declare_function(&decl(0, "main", 0)).unwrap();
        backend.declare_function(&decl(1, "helper", 1)).unwrap();
        backend
            .define_function(&returning(decl(0, "main", 0), 0))
            .unwrap();

        assert_eq!(
            backend.finish(),
            Err(BackendError::Incomplete(vec!["helper".to_string()]))
        );
    }

    #[test]
    fn duplicate_and_undeclared_are_rejected() {
        let mut backend = TextBackend::new();
        backend.declare_function(&decl(0, "main", 0)).unwrap();
        assert_eq!(
            backend.declare_function(&decl(1, "main", 0)),
            Err(BackendError::DuplicateDeclaration("main".to_string()))
        );
        assert_eq!(
            backend.define_function(&returning(decl(3, "ghost", 0), 0)),
            Err(BackendError::Undeclared("ghost".to_string()))
        );
    }

    #[test]
    fn call_arity_is_checked() {
        let mut backend = TextBackend::new();
        backend.declare_function(&decl(0, "main", 0)).unwrap();
        backend.declare_function(&decl(1, "inc", 1)).unwrap();

        let mut builder = LirBuilder::new(decl(0, "main", 0));
        let result = builder.call(FuncId(1), Vec::new());
        builder.ret(result);
        let main = builder.finish().unwrap();

        let err = backend.define_function(&main).unwrap_err();
        assert_eq!(
            err.to_string(),
            "backend rejected function 'main': call to 'inc' passes 0 arguments, expected 1"
        );
    }
}
