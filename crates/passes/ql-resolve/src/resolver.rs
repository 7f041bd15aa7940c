//! Two-phase scope resolution
//!
//! Collect walks each body bottom-up and assembles the scopes of the
//! function and of every `if` block. Check then walks top-down, hands each
//! node the scope that applies to it and validates every reference.

use la_arena::ArenaMap;
use log::{debug, trace};
use ql_ast::{BinaryOp, Body, Expr, ExprId, Function, Module, RenderNotes};
use ql_intern::{Interner, Symbol};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ResolutionError;
use crate::scope::{Conflict, Declaration, Namespace, Scope, ScopeOwner};

/// Output of the collect phase for one function
#[derive(Debug, Clone, Default)]
pub struct CollectedScopes {
    /// Parameters, top-level variables and every label of the function
    pub root: Scope,
    /// Variables declared by each `if` block, keyed by the `If` node
    pub blocks: ArenaMap<ExprId, Scope>,
}

impl CollectedScopes {
    /// `if` scopes in node order
    pub fn if_scopes(&self) -> impl Iterator<Item = (ExprId, &Scope)> {
        self.blocks.iter()
    }
}

impl RenderNotes for CollectedScopes {
    fn function_note(&self, _: &Function, interner: &Interner) -> Option<String> {
        Some(self.root.render(interner))
    }

    fn if_note(&self, id: ExprId, interner: &Interner) -> Option<String> {
        self.blocks.get(id).map(|scope| scope.render(interner))
    }
}

/// Output of the check phase for one function
#[derive(Debug, Clone, Default)]
pub struct ScopeCheck {
    /// Scope each `if` body was checked against
    pub effective: ArenaMap<ExprId, Scope>,
    /// Declaring scope of every resolved variable use
    pub bindings: FxHashMap<ExprId, ScopeOwner>,
    /// Undefined references, in traversal order
    pub errors: Vec<ResolutionError>,
}

/// Resolution of one function
#[derive(Debug, Clone)]
pub struct FunctionResolution {
    /// Collected scopes
    pub scopes: CollectedScopes,
    /// Check results
    pub check: ScopeCheck,
}

impl FunctionResolution {
    /// Declaring scope of the variable used at `expr`
    #[must_use]
    pub fn binding(&self, expr: ExprId) -> Option<ScopeOwner> {
        self.check.bindings.get(&expr).copied()
    }
}

/// Resolution of a whole module, one entry per function in definition order
#[derive(Debug, Clone, Default)]
pub struct ModuleResolution {
    /// Per-function results
    pub functions: Vec<FunctionResolution>,
}

impl ModuleResolution {
    /// All recoverable errors, function by function
    pub fn errors(&self) -> impl Iterator<Item = &ResolutionError> {
        self.functions
            .iter()
            .flat_map(|function| function.check.errors.iter())
    }

    /// Number of recoverable errors
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.functions
            .iter()
            .map(|function| function.check.errors.len())
            .sum()
    }

    /// Whether the module may be lowered
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Renders `module` with the collected scope on every `FUN` and `IF` line
    ///
    /// # Panics
    ///
    /// Panics if this resolution was computed for a different module.
    #[must_use]
    pub fn render(&self, module: &Module, interner: &Interner) -> String {
        assert_eq!(
            module.functions.len(),
            self.functions.len(),
            "internal error: resolution does not match the module"
        );
        module
            .functions
            .iter()
            .zip(&self.functions)
            .map(|(function, resolved)| function.render_with(interner, &resolved.scopes))
            .collect()
    }
}

fn redefinition(conflict: Conflict, interner: &Interner) -> ResolutionError {
    ResolutionError::Redefinition {
        name: interner.resolve(conflict.symbol).to_owned(),
        symbol: conflict.symbol,
        namespace: conflict.namespace,
    }
}

struct Collector<'body> {
    body: &'body Body,
    interner: &'body Interner,
    blocks: ArenaMap<ExprId, Scope>,
}

impl Collector<'_> {
    /// Declarations of the subtree at `id` that are visible to its parent
    fn collect(&mut self, id: ExprId) -> Result<Vec<Declaration>, ResolutionError> {
        let body = self.body;
        match &body[id] {
            Expr::Number(_)
            | Expr::Variable(_)
            | Expr::AddressOf(_)
            | Expr::LabelRef(_)
            | Expr::Call { .. }
            | Expr::Unary { .. } => Ok(Vec::new()),
            Expr::List(items) => {
                let mut declarations = Vec::new();
                for &item in items {
                    declarations.extend(self.collect(item)?);
                }
                Ok(declarations)
            }
            Expr::Statement { labels, inner } => {
                let mut declarations: Vec<Declaration> =
                    labels.iter().map(Declaration::label).collect();
                declarations.extend(self.collect(*inner)?);
                Ok(declarations)
            }
            Expr::If { then_body, .. } => {
                let bubbled = self.collect(*then_body)?;
                let mut own = Scope::new();
                let mut exported = Vec::new();
                for declaration in bubbled {
                    match declaration.namespace {
                        Namespace::Var => own
                            .insert(declaration.symbol, Namespace::Var, ScopeOwner::If(id))
                            .map_err(|conflict| redefinition(conflict, self.interner))?,
                        Namespace::Label => exported.push(declaration),
                    }
                }
                trace!("collect: if {id:?} owns {} variables", own.len());
                self.blocks.insert(id, own);
                Ok(exported)
            }
            Expr::Binary {
                op: BinaryOp::Declare,
                lhs,
                ..
            } => Ok(match body[*lhs] {
                Expr::Variable(symbol) => vec![Declaration::var(symbol)],
                _ => Vec::new(),
            }),
            Expr::Binary { .. } => Ok(Vec::new()),
        }
    }
}

/// Collect phase for one function
///
/// Parameters are declared first. A top-level `:=` of a parameter's name is
/// that parameter's binding occurrence and is absorbed once; any further
/// declaration of a visible name is a redefinition.
///
/// # Errors
///
/// Returns the first [`ResolutionError::Redefinition`] found.
pub fn collect_function(
    function: &Function,
    interner: &Interner,
) -> Result<CollectedScopes, ResolutionError> {
    let mut collector = Collector {
        body: &function.body,
        interner,
        blocks: ArenaMap::default(),
    };
    let bubbled = collector.collect(function.body.root)?;

    let mut root = Scope::new();
    for param in function.params.iter() {
        root.insert(param, Namespace::Var, ScopeOwner::Function)
            .map_err(|conflict| redefinition(conflict, interner))?;
    }

    let mut unbound_params: FxHashSet<Symbol> = function.params.iter().collect();
    for declaration in bubbled {
        if declaration.namespace == Namespace::Var && unbound_params.remove(&declaration.symbol) {
            continue;
        }
        root.insert(declaration.symbol, declaration.namespace, ScopeOwner::Function)
            .map_err(|conflict| redefinition(conflict, interner))?;
    }

    debug!(
        "collect: '{}' {}",
        interner.resolve(function.name),
        root.render(interner)
    );

    Ok(CollectedScopes {
        root,
        blocks: collector.blocks,
    })
}

struct Checker<'body> {
    body: &'body Body,
    interner: &'body Interner,
    collected: &'body CollectedScopes,
    result: ScopeCheck,
}

impl Checker<'_> {
    fn reference(&mut self, id: ExprId, symbol: Symbol, namespace: Namespace, scope: &Scope) -> usize {
        if let Some(owner) = scope.lookup(symbol, namespace) {
            if namespace == Namespace::Var {
                self.result.bindings.insert(id, owner);
            }
            return 0;
        }
        self.result.errors.push(ResolutionError::undefined(
            symbol,
            namespace,
            scope,
            self.interner,
        ));
        1
    }

    /// Checks the subtree at `id` against `scope`; returns its error count
    fn check(&mut self, id: ExprId, scope: &Scope) -> Result<usize, ResolutionError> {
        let body = self.body;
        match &body[id] {
            Expr::Number(_) => Ok(0),
            Expr::Variable(symbol) | Expr::AddressOf(symbol) => {
                Ok(self.reference(id, *symbol, Namespace::Var, scope))
            }
            Expr::LabelRef(symbol) => Ok(self.reference(id, *symbol, Namespace::Label, scope)),
            Expr::List(items) | Expr::Call { args: items, .. } => {
                let mut errors = 0;
                for &item in items {
                    errors += self.check(item, scope)?;
                }
                Ok(errors)
            }
            Expr::Statement { inner, .. } => self.check(*inner, scope),
            Expr::If {
                condition,
                then_body,
            } => {
                let mut errors = self.check(*condition, scope)?;
                let own = self.collected.blocks.get(id).cloned().unwrap_or_default();
                let merged = own
                    .merged_with(scope)
                    .map_err(|conflict| redefinition(conflict, self.interner))?;
                errors += self.check(*then_body, &merged)?;
                self.result.effective.insert(id, merged);
                Ok(errors)
            }
            Expr::Binary { lhs, rhs, .. } => {
                Ok(self.check(*lhs, scope)? + self.check(*rhs, scope)?)
            }
            Expr::Unary { operand, .. } => self.check(*operand, scope),
        }
    }
}

/// Check phase for one function
///
/// Never modifies `collected`, so running it again gives the same result.
///
/// # Errors
///
/// Returns a fatal [`ResolutionError::Redefinition`] if an `if` block
/// declares a name its enclosing scope already has. Undefined references
/// are not fatal; they are returned in [`ScopeCheck::errors`].
pub fn check_function(
    function: &Function,
    collected: &CollectedScopes,
    interner: &Interner,
) -> Result<ScopeCheck, ResolutionError> {
    let mut checker = Checker {
        body: &function.body,
        interner,
        collected,
        result: ScopeCheck::default(),
    };
    let errors = checker.check(function.body.root, &collected.root)?;
    debug!(
        "check: '{}' has {errors} undefined references",
        interner.resolve(function.name)
    );
    Ok(checker.result)
}

/// Resolves every function of `module`
///
/// Collect runs over all functions before check runs over any of them.
///
/// # Errors
///
/// Returns the first fatal error: a duplicate function name or a
/// redefinition inside a function.
pub fn resolve_module(
    module: &Module,
    interner: &Interner,
) -> Result<ModuleResolution, ResolutionError> {
    let mut seen = FxHashSet::default();
    for function in &module.functions {
        if !seen.insert(function.name) {
            return Err(ResolutionError::DuplicateFunction {
                name: interner.resolve(function.name).to_owned(),
                symbol: function.name,
            });
        }
    }

    let collected = module
        .functions
        .iter()
        .map(|function| collect_function(function, interner))
        .collect::<Result<Vec<_>, _>>()?;

    let functions = module
        .functions
        .iter()
        .zip(collected)
        .map(|(function, scopes)| {
            let check = check_function(function, &scopes, interner)?;
            Ok(FunctionResolution { scopes, check })
        })
        .collect::<Result<Vec<_>, ResolutionError>>()?;

    Ok(ModuleResolution { functions })
}
