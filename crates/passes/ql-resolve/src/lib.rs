//! Scope resolution for Quill
//!
//! Runs between parsing and lowering. It works out which variables and labels
//! are visible at every node and reports references that do not resolve.
//!
//! # Architecture
//!
//! - **Scopes**: two namespaces, variables and labels. Variables declared in an
//!   `if` block stay in that block; labels are visible in the whole function.
//! - **Collect**: bottom-up pass that builds the function scope and the scope
//!   of each `if` block.
//! - **Check**: top-down pass that validates references and records which
//!   scope each variable use resolved to.
//!
//! A redefinition stops resolution immediately. Undefined references are
//! accumulated so they can all be reported at once.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ql_resolve::resolve_module;
//!
//! let resolution = resolve_module(&module, &interner)?;
//! if !resolution.is_ok() {
//!     // report resolution.errors()
//! }
//! ```

pub mod error;
pub mod resolver;
pub mod scope;

pub use error::ResolutionError;
pub use resolver::{
    CollectedScopes, FunctionResolution, ModuleResolution, ScopeCheck, check_function,
    collect_function, resolve_module,
};
pub use scope::{Conflict, Declaration, Namespace, Scope, ScopeOwner};
