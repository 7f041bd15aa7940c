//! Error types for scope resolution

use std::mem;

use miette::Diagnostic;
use ql_intern::{Interner, Symbol};

use crate::scope::{Namespace, Scope};

/// Errors found while resolving names
///
/// Undefined references are collected and reported together. Redefinitions
/// are fatal: resolution stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum ResolutionError {
    /// A name that is not visible where it is used
    #[error("undefined reference to '{name}'")]
    #[diagnostic(code(resolve::undefined_reference))]
    UndefinedReference {
        /// Name as written
        name: String,
        /// Interned name
        symbol: Symbol,
        /// Namespace it was looked up in
        namespace: Namespace,
        /// "Did you mean" hint
        #[help]
        help: Option<String>,
    },

    /// A name declared twice in one effective scope
    #[error("Redefinition of symbol '{name}'")]
    #[diagnostic(code(resolve::redefinition))]
    Redefinition {
        /// Name as written
        name: String,
        /// Interned name
        symbol: Symbol,
        /// Namespace of both declarations
        namespace: Namespace,
    },

    /// Two functions of one module share a name
    #[error("Redefinition of symbol '{name}'")]
    #[diagnostic(code(resolve::duplicate_function))]
    DuplicateFunction {
        /// Function name
        name: String,
        /// Interned name
        symbol: Symbol,
    },
}

impl ResolutionError {
    /// Whether resolution must stop at this error
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::UndefinedReference { .. })
    }

    /// Undefined reference to `symbol`, with a suggestion drawn from `scope`
    pub(crate) fn undefined(
        symbol: Symbol,
        namespace: Namespace,
        scope: &Scope,
        interner: &Interner,
    ) -> Self {
        let candidates: Vec<Symbol> = scope.names(namespace).collect();
        let help = Self::compute_suggestions(symbol, interner, &candidates)
            .first()
            .map(|&best| format!("a {namespace} named '{}' is in scope", interner.resolve(best)));

        Self::UndefinedReference {
            name: interner.resolve(symbol).to_owned(),
            symbol,
            namespace,
            help,
        }
    }

    /// Compute suggestions for undefined names using Levenshtein distance
    ///
    /// Candidates are ordered by distance; only close matches are kept, where
    /// "close" scales with the length of the name.
    pub fn compute_suggestions(
        name: Symbol,
        interner: &Interner,
        available_names: &[Symbol],
    ) -> Vec<Symbol> {
        let target = interner.resolve(name);
        let limit = (target.chars().count() / 3).clamp(1, 3);
        let mut suggestions: Vec<(Symbol, usize)> = available_names
            .iter()
            .filter(|&&candidate| candidate != name)
            .map(|&candidate| {
                let distance = levenshtein_distance(target, interner.resolve(candidate));
                (candidate, distance)
            })
            .filter(|(_, distance)| *distance <= limit)
            .collect();

        suggestions.sort_by_key(|(_, distance)| *distance);
        suggestions.into_iter().take(3).map(|(sym, _)| sym).collect()
    }
}

/// Compute Levenshtein distance between two strings
fn levenshtein_distance(source: &str, target: &str) -> usize {
    let source: Vec<char> = source.chars().collect();
    let target: Vec<char> = target.chars().collect();

    if source.is_empty() {
        return target.len();
    }
    if target.is_empty() {
        return source.len();
    }

    let mut previous: Vec<usize> = (0..=target.len()).collect();
    let mut current = vec![0; target.len() + 1];

    for (idx, source_char) in source.iter().enumerate() {
        current[0] = idx + 1;
        for (jdx, target_char) in target.iter().enumerate() {
            let cost = usize::from(source_char != target_char);
            current[jdx + 1] = (previous[jdx + 1] + 1)
                .min(current[jdx] + 1)
                .min(previous[jdx] + cost);
        }
        mem::swap(&mut previous, &mut current);
    }

    previous[target.len()]
}
