//! Lowering errors

use ql_lir::BackendError;

/// Errors raised while lowering a function
///
/// Every error except [`LowerError::ArityMismatch`] only drops the function
/// being lowered; the rest of the module is still lowered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LowerError {
    /// Call of a function the module does not define
    #[error("in '{function}': call to undefined function '{callee}'")]
    UnknownCallee {
        /// Function being lowered
        function: String,
        /// Called name
        callee: String,
    },

    /// Call with the wrong number of arguments
    #[error("in '{function}': '{callee}' takes {expected} arguments but {found} were given")]
    ArityMismatch {
        /// Function being lowered
        function: String,
        /// Called name
        callee: String,
        /// Declared parameter count
        expected: usize,
        /// Argument count at the call site
        found: usize,
    },

    /// `goto` to a label the function does not have
    #[error("in '{function}': no label named '{label}'")]
    UnknownLabel {
        /// Function being lowered
        function: String,
        /// Label name
        label: String,
    },

    /// `goto` whose operand is not a label name
    #[error("in '{function}': goto target is not a label")]
    InvalidGotoTarget {
        /// Function being lowered
        function: String,
    },

    /// Label name used as a value
    #[error("in '{function}': label '{label}' used as a value")]
    InvalidLabelUse {
        /// Function being lowered
        function: String,
        /// Label name
        label: String,
    },

    /// Assignment to something that is neither a variable nor a dereference
    #[error("in '{function}': invalid assignment target")]
    InvalidAssignmentTarget {
        /// Function being lowered
        function: String,
    },

    /// Variable use the resolver did not bind
    #[error("in '{function}': variable '{name}' was not resolved")]
    UnresolvedVariable {
        /// Function being lowered
        function: String,
        /// Variable name
        name: String,
    },

    /// The backend refused the function or the module
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl LowerError {
    /// Whether lowering of the whole module must stop
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ArityMismatch { .. })
    }
}
