//! The rewrite-rule based simplifier.
//!
//! [`RewriteSimplifier`] is a bottom-up mutator: children are simplified
//! first, the node is rebuilt (sharing unchanged children), constant folding
//! and literal-constraint lookup run, and then the opcode's rule table is
//! tried in source order; the first matching rule wins. Rules marked
//! recursive re-enter the simplifier on their result, bounded by a global
//! rewrite budget.
//!
//! Most rewrite rules come in parallel truncated and floored division
//! families; rule comments note which family they belong to, since the two
//! only agree on non-negative operands.

use std::fmt;

use indexmap::IndexMap;

use crate::analysis::{side_effect, Analyzer, CompareResult, ConstraintFrame, SideEffect};
use crate::ast::{BinOpKind, Expr, ExprKind, Symbol};

pub mod compare;
pub mod const_fold;
pub mod normalize;
pub mod pattern;

mod arith;
mod boolean;
mod cmp;
mod divmod;
#[cfg(test)]
mod fuzz_test;
mod minmax;
mod misc;

pub use normalize::normalize_boolean_operators;

/// Optional behaviors, off by default, enabled as a bitset.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Extension(pub u32);

impl Extension {
    pub const NONE: Extension = Extension(0);
    /// Enables the transitive layer in the comparison engine.
    pub const TRANSITIVELY_PROVE_INEQUALITIES: Extension = Extension(1 << 0);
    /// Enables the `(A+B)*C` versus `(A*B)*D` comparison heuristic.
    pub const COMPARISON_OF_PRODUCT_AND_SUM: Extension = Extension(1 << 1);
    /// Within `&&`/`||`, assume each branch while re-simplifying the other.
    pub const APPLY_CONSTRAINTS_TO_BOOLEAN_BRANCHES: Extension = Extension(1 << 2);
    /// Hand stabilized boolean expressions to the external AND-of-ORs
    /// normalizer (see [`RewriteSimplifier::set_and_of_ors_normalizer`]).
    pub const CONVERT_BOOLEAN_TO_AND_OF_ORS: Extension = Extension(1 << 3);

    pub fn contains(self, other: Extension) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Extension {
    type Output = Extension;
    fn bitor(self, rhs: Extension) -> Extension {
        Extension(self.0 | rhs.0)
    }
}

/// Counters tracking the work one simplifier instance has performed.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct SimplifierStats {
    pub nodes_visited: u64,
    pub constraints_entered: u64,
    pub rewrites_attempted: u64,
    pub rewrites_performed: u64,
    pub max_recursive_depth: u64,
    pub num_recursive_rewrites: u64,
}

impl fmt::Display for SimplifierStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[nodes_visited={} constraints_entered={} rewrites_attempted={} \
             rewrites_performed={} max_recursive_depth={} num_recursive_rewrites={}]",
            self.nodes_visited,
            self.constraints_entered,
            self.rewrites_attempted,
            self.rewrites_performed,
            self.max_recursive_depth,
            self.num_recursive_rewrites,
        )
    }
}

/// Restore token returned by [`RewriteSimplifier::enter_constraint`]. Must be
/// passed to [`RewriteSimplifier::exit_constraint`] before any enclosing
/// handle, and exactly once.
#[must_use]
#[derive(Debug)]
pub struct ConstraintHandle {
    analyzer_frame: ConstraintFrame,
    old_literal_size: usize,
    new_literal_size: usize,
}

/// A rewrite-rule based expression simplifier. Single-threaded and
/// non-reentrant; borrows the analyzer that owns the analysis oracles for
/// its whole lifetime.
pub struct RewriteSimplifier<'a> {
    pub(crate) analyzer: &'a mut Analyzer,
    var_map: IndexMap<Symbol, Expr>,
    literal_constraints: Vec<Expr>,
    pub(crate) stats: SimplifierStats,
    enabled_extensions: Extension,
    maximum_rewrite_steps: u64,
    pub(crate) recur_depth: u64,
    pub(crate) recursively_visiting_boolean: bool,
    and_of_ors_normalizer: Option<Box<dyn Fn(&Expr) -> Expr>>,
}

impl<'a> RewriteSimplifier<'a> {
    pub fn new(analyzer: &'a mut Analyzer) -> Self {
        RewriteSimplifier {
            analyzer,
            var_map: IndexMap::new(),
            literal_constraints: Vec::new(),
            stats: SimplifierStats::default(),
            enabled_extensions: Extension::NONE,
            maximum_rewrite_steps: 1 << 20,
            recur_depth: 0,
            recursively_visiting_boolean: false,
            and_of_ors_normalizer: None,
        }
    }

    /// Simplify `expr`. Idempotent, deterministic, and total on well-typed
    /// input: runs the mutator until a pass returns its input unchanged, up
    /// to two passes.
    pub fn simplify(&mut self, expr: &Expr) -> Expr {
        let mut res = expr.clone();
        let max_iter = 2;
        for _ in 0..max_iter {
            let new_expr = self.visit_expr(&res);
            if Expr::ptr_eq(&new_expr, &res) || new_expr == res {
                return res;
            }
            res = new_expr;
        }
        res
    }

    /// Record a variable substitution applied during simplification.
    ///
    /// Panics when `can_override` is false and the variable is already bound
    /// to a structurally different expression; that is a programming error,
    /// not a recoverable condition.
    pub fn update(&mut self, var: Symbol, value: Expr, can_override: bool) {
        if !can_override {
            if let Some(existing) = self.var_map.get(&var) {
                assert!(
                    *existing == value,
                    "trying to update var '{}' with a different value: original={}, new={}",
                    var,
                    existing,
                    value
                );
            }
        }
        self.var_map.insert(var, value);
    }

    /// Assert `constraint` for the scope delimited by the returned handle:
    /// it is entered into the analysis oracles and, split into pure
    /// conjuncts together with their normalized negations, onto the
    /// literal-constraint stack consulted by the boolean rewrites.
    pub fn enter_constraint(&mut self, constraint: &Expr) -> ConstraintHandle {
        // the constraint is compared against already-simplified expressions,
        // so it has to be simplified as well
        let simplified = self.simplify(constraint);
        let analyzer_frame = self.analyzer.push_constraint(&simplified);
        let old_literal_size = self.literal_constraints.len();
        let subconstraints: Vec<Expr> = crate::analysis::split_conjunction(&simplified)
            .into_iter()
            .cloned()
            .collect();
        for sub in subconstraints {
            if side_effect(&sub) > SideEffect::Pure {
                continue;
            }
            self.literal_constraints.push(sub.clone());
            // Normalizing here means each expression checked against the
            // stack can be compared directly, without rewriting it first.
            let negation = if sub.ty.is_bool() {
                normalize_boolean_operators(&Expr::not(sub.clone()))
            } else {
                Expr::eq(sub.clone(), Expr::zero_like(&sub))
            };
            self.literal_constraints.push(Expr::not(negation));
        }
        self.stats.constraints_entered += 1;
        ConstraintHandle {
            analyzer_frame,
            old_literal_size,
            new_literal_size: self.literal_constraints.len(),
        }
    }

    /// Unwind a constraint scope. Handles must be returned in strict LIFO
    /// order; violations are asserted.
    pub fn exit_constraint(&mut self, handle: ConstraintHandle) {
        assert_eq!(
            self.literal_constraints.len(),
            handle.new_literal_size,
            "constraint handles must be restored in LIFO order"
        );
        self.literal_constraints.truncate(handle.old_literal_size);
        self.analyzer.pop_constraint(handle.analyzer_frame);
    }

    pub fn set_enabled_extensions(&mut self, flags: Extension) {
        self.enabled_extensions = flags;
    }

    pub fn enabled_extensions(&self) -> Extension {
        self.enabled_extensions
    }

    pub fn stats(&self) -> SimplifierStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SimplifierStats::default();
    }

    /// Cap the number of rule firings; once reached, expressions are still
    /// rebuilt from simplified children but no further rule fires, and the
    /// current expression is returned as-is.
    pub fn set_maximum_rewrite_steps(&mut self, maximum: u64) {
        self.maximum_rewrite_steps = maximum;
    }

    /// Install the external AND-of-ORs normalizer invoked when the
    /// [`Extension::CONVERT_BOOLEAN_TO_AND_OF_ORS`] extension is enabled and
    /// a boolean expression has stabilized.
    pub fn set_and_of_ors_normalizer(&mut self, normalizer: Box<dyn Fn(&Expr) -> Expr>) {
        self.and_of_ors_normalizer = Some(normalizer);
    }

    pub(crate) fn budget_exhausted(&self) -> bool {
        self.stats.rewrites_performed >= self.maximum_rewrite_steps
    }

    pub(crate) fn extension_enabled(&self, flag: Extension) -> bool {
        self.enabled_extensions.contains(flag)
    }

    /// Bottom-up dispatch. Subexpressions are visited left-to-right in post
    /// order.
    pub(crate) fn visit_expr(&mut self, e: &Expr) -> Expr {
        self.stats.nodes_visited += 1;
        match &e.kind {
            ExprKind::Var(_) => self.visit_var(e),
            ExprKind::Lit(_) => e.clone(),
            ExprKind::Binary(op, a, b) => match op {
                BinOpKind::Add => self.visit_add(e),
                BinOpKind::Sub => self.visit_sub(e),
                BinOpKind::Mul => self.visit_mul(e),
                BinOpKind::Div => self.visit_truncdiv(e),
                BinOpKind::Mod => self.visit_truncmod(e),
                BinOpKind::FloorDiv => self.visit_floordiv(e),
                BinOpKind::FloorMod => self.visit_floormod(e),
                BinOpKind::Min => self.visit_min(e),
                BinOpKind::Max => self.visit_max(e),
                BinOpKind::Eq => self.visit_eq(e),
                BinOpKind::Ne => self.visit_ne(e),
                BinOpKind::Lt => self.visit_lt(e),
                BinOpKind::Le => self.visit_le(e),
                // a > b and a >= b desugar to b < a and b <= a
                BinOpKind::Gt => {
                    let swapped = Expr::lt(b.clone(), a.clone());
                    self.visit_expr(&swapped)
                }
                BinOpKind::Ge => {
                    let swapped = Expr::le(b.clone(), a.clone());
                    self.visit_expr(&swapped)
                }
                BinOpKind::And => self.visit_and(e),
                BinOpKind::Or => self.visit_or(e),
            },
            ExprKind::Not(_) => self.visit_not(e),
            ExprKind::Select(_, _, _) => self.visit_select(e),
            ExprKind::Broadcast(_, _) => self.visit_broadcast(e),
            ExprKind::Ramp(_, _, _) => self.visit_ramp(e),
            ExprKind::Call(_, _) => self.visit_call(e),
            ExprKind::Cast(_) => self.visit_cast(e),
            ExprKind::Let(_, _, _) => self.visit_let(e),
        }
    }

    /// Hard cap on nested recursive rewrites. Pairs of recursive rules can
    /// commute forever (`x + max(y, z)` against its mirror); the depth cap
    /// cuts such chains, and the next pass picks up where they stopped.
    const MAX_RECUR_DEPTH: u64 = 5;

    /// Re-enter the simplifier on a freshly rewritten expression.
    pub(crate) fn recursive_rewrite(&mut self, e: Expr) -> Expr {
        self.stats.num_recursive_rewrites += 1;
        if self.recur_depth >= Self::MAX_RECUR_DEPTH || self.budget_exhausted() {
            return e;
        }
        self.recur_depth += 1;
        self.stats.max_recursive_depth = self.stats.max_recursive_depth.max(self.recur_depth);
        tracing::trace!(expr = %e, depth = self.recur_depth, "recursive rewrite");
        let was_boolean = self.recursively_visiting_boolean;
        if e.ty.is_bool() {
            self.recursively_visiting_boolean = true;
        }
        let res = self.visit_expr(&e);
        self.recursively_visiting_boolean = was_boolean;
        self.recur_depth -= 1;
        res
    }

    /// Visit children and rebuild the node, sharing it when nothing changed.
    pub(crate) fn rebuild_binary(&mut self, e: &Expr) -> Expr {
        let ExprKind::Binary(op, a, b) = &e.kind else {
            unreachable!("rebuild_binary on non-binary node")
        };
        let na = self.visit_expr(a);
        let nb = self.visit_expr(b);
        if Expr::ptr_eq(&na, a) && Expr::ptr_eq(&nb, b) {
            e.clone()
        } else {
            Expr::binary(*op, na, nb)
        }
    }

    /// Compare the expression against the entered literal constraints by
    /// structural equality: a match yields `true`, a match of its negation
    /// yields `false`.
    pub(crate) fn try_match_literal_constraint(&self, e: &Expr) -> Option<Expr> {
        let negation = Expr::not(e.clone());
        for constraint in &self.literal_constraints {
            if constraint == e {
                return Some(Expr::bool_typed(true, e.ty));
            }
            if *constraint == negation {
                return Some(Expr::bool_typed(false, e.ty));
            }
        }
        None
    }

    /// Bound-based non-negativity proof used by the division rules.
    pub(crate) fn can_prove_greater_equal(&self, e: &Expr, lower: i64) -> bool {
        self.analyzer.const_int_bound(e).min_value >= lower
    }

    pub(crate) fn can_prove_less(&self, e: &Expr, upper: i64) -> bool {
        self.analyzer.const_int_bound(e).max_value < upper
    }

    pub(crate) fn can_prove_equal(&mut self, e: &Expr, value: i64) -> bool {
        self.try_compare_const(e, value) == CompareResult::EQ
    }

    /// Prove a predicate by simplifying it to the `true` literal.
    pub(crate) fn can_prove(&mut self, e: &Expr) -> bool {
        self.visit_expr(e).is_true_lit()
    }
}

pub(crate) fn binary_parts(e: &Expr) -> (&Expr, &Expr) {
    match &e.kind {
        ExprKind::Binary(_, a, b) => (a, b),
        _ => unreachable!("expected a binary node"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::DataType;

    fn ity() -> DataType {
        DataType::int(32)
    }

    #[test]
    fn update_conflict_panics() {
        let mut analyzer = Analyzer::new();
        let mut simp = RewriteSimplifier::new(&mut analyzer);
        let x = Symbol::intern("x");
        simp.update(x, Expr::int(1, ity()), false);
        // same value is fine
        simp.update(x, Expr::int(1, ity()), true);
        simp.update(x, Expr::int(2, ity()), true);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            simp.update(x, Expr::int(3, ity()), false)
        }));
        assert!(result.is_err());
    }

    #[test]
    fn constraint_stack_discipline() {
        let mut analyzer = Analyzer::new();
        let mut simp = RewriteSimplifier::new(&mut analyzer);
        let x = Expr::var("x", ity());
        let outer = simp.enter_constraint(&Expr::le(Expr::int(0, ity()), x.clone()));
        let inner = simp.enter_constraint(&Expr::lt(x.clone(), Expr::int(16, ity())));
        simp.exit_constraint(inner);
        simp.exit_constraint(outer);
        assert_eq!(simp.literal_constraints.len(), 0);
    }

    #[test]
    fn out_of_order_exit_panics() {
        let mut analyzer = Analyzer::new();
        let mut simp = RewriteSimplifier::new(&mut analyzer);
        let x = Expr::var("x", ity());
        let outer = simp.enter_constraint(&Expr::le(Expr::int(0, ity()), x.clone()));
        let _inner = simp.enter_constraint(&Expr::lt(x.clone(), Expr::int(16, ity())));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            simp.exit_constraint(outer)
        }));
        assert!(result.is_err());
    }

    #[test]
    fn stats_accumulate_and_reset() {
        let mut analyzer = Analyzer::new();
        let mut simp = RewriteSimplifier::new(&mut analyzer);
        let x = Expr::var("x", ity());
        let e = Expr::add(Expr::sub(x.clone(), x.clone()), Expr::int(1, ity()));
        let _ = simp.simplify(&e);
        let stats = simp.stats();
        assert!(stats.nodes_visited > 0);
        assert!(stats.rewrites_attempted > 0);
        assert!(stats.rewrites_performed > 0);
        simp.reset_stats();
        assert_eq!(simp.stats(), SimplifierStats::default());
    }

    #[test]
    fn rewrite_budget_stops_firing() {
        let mut analyzer = Analyzer::new();
        let mut simp = RewriteSimplifier::new(&mut analyzer);
        simp.set_maximum_rewrite_steps(1);
        let x = Expr::var("x", ity());
        let e = Expr::add(
            Expr::sub(x.clone(), x.clone()),
            Expr::sub(x.clone(), x.clone()),
        );
        let _ = simp.simplify(&e);
        assert!(simp.stats().rewrites_performed <= 1);
    }
}
