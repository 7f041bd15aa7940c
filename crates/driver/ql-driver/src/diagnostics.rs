//! Diagnostics and exit statuses

use std::io;

use derive_more::Display;
use ql_lir::BackendError;
use ql_lower::LowerError;
use ql_resolve::ResolutionError;

/// Process-level failure category
///
/// The discriminant is the exit status reported for the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorCategory {
    /// Bad token
    #[display("lexical error")]
    Lex = 1,
    /// Bad grammar
    #[display("syntax error")]
    Syntax = 2,
    /// Undefined reference or redefinition; also used for code generation
    #[display("scope error")]
    Scope = 3,
}

impl ErrorCategory {
    /// Exit status for this category
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        self as i32
    }
}

/// One problem found while compiling
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// Name resolution
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Lowering a function
    #[error(transparent)]
    Lowering(#[from] LowerError),

    /// Finishing the backend artifact
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl CompileError {
    /// Exit category of this error
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Resolution(_) | Self::Lowering(_) | Self::Backend(_) => ErrorCategory::Scope,
        }
    }

    /// Whether this error stopped compilation on the spot
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Resolution(err) => err.is_fatal(),
            Self::Lowering(err) => err.is_fatal(),
            Self::Backend(_) => false,
        }
    }
}

/// Writes one line per diagnostic, in detection order
///
/// # Errors
///
/// Propagates write failures.
pub fn write_diagnostics<'diag, W: io::Write>(
    writer: &mut W,
    diagnostics: impl IntoIterator<Item = &'diag CompileError>,
) -> io::Result<()> {
    for diagnostic in diagnostics {
        writeln!(writer, "{diagnostic}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ql_intern::Interner;

    use super::*;

    #[test]
    fn exit_codes_follow_categories() {
        assert_eq!(ErrorCategory::Lex.exit_code(), 1);
        assert_eq!(ErrorCategory::Syntax.exit_code(), 2);
        assert_eq!(ErrorCategory::Scope.exit_code(), 3);
    }

    #[test]
    fn diagnostics_are_written_one_per_line() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let diagnostics = vec![
            CompileError::from(ResolutionError::UndefinedReference {
                name: "x".to_owned(),
                symbol: x,
                namespace: ql_resolve::Namespace::Var,
                help: None,
            }),
            CompileError::from(BackendError::Incomplete(vec!["f".to_owned()])),
        ];

        let mut out = Vec::new();
        write_diagnostics(&mut out, &diagnostics).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "undefined reference to 'x'\nfunctions declared but never defined: f\n"
        );
    }
}
