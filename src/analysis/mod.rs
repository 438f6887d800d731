//! The analyzer owns the sub-analyses the simplifier consults as oracles:
//! constant integer bounds, modular-congruence sets, transitive comparisons,
//! and side-effect classification. Constraints are entered through a scoped
//! push/pop protocol whose frames assert strict LIFO discipline.

use crate::ast::{
    visit::{walk_expr, Visitor},
    BinOpKind, CallOp, Expr, ExprKind, Symbol,
};

pub mod bound;
pub use bound::{ConstIntBound, ConstIntBoundAnalyzer, NEG_INF, POS_INF};
pub mod modular;
pub use modular::{zero_aware_gcd, ModularSet, ModularSetAnalyzer};
pub mod transitive;
pub use transitive::{CompareResult, TransitiveComparisonAnalyzer};

/// Classification of the observable effects of evaluating an expression.
/// The ordering is by severity; rules that drop an operand guard on the
/// dropped operand being at most `ReadState`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum SideEffect {
    Pure,
    ReadState,
    UpdateState,
    Opaque,
}

/// The effect of evaluating `e`: everything in this IR is pure except calls
/// to external operations, which are opaque.
pub fn side_effect(e: &Expr) -> SideEffect {
    struct Collector {
        worst: SideEffect,
    }
    impl Visitor for Collector {
        fn visit_expr(&mut self, e: &Expr) {
            if let ExprKind::Call(CallOp::Extern(_), _) = &e.kind {
                self.worst = self.worst.max(SideEffect::Opaque);
            }
            walk_expr(self, e);
        }
    }
    let mut collector = Collector {
        worst: SideEffect::Pure,
    };
    collector.visit_expr(e);
    collector.worst
}

/// Token returned by [`Analyzer::push_constraint`]; consumed by
/// [`Analyzer::pop_constraint`], which asserts that frames unwind in the
/// exact reverse order they were created.
#[must_use]
#[derive(Debug)]
pub struct ConstraintFrame {
    depth: usize,
    bound_mark: usize,
    modular_mark: usize,
    transitive_mark: usize,
}

#[derive(Default)]
pub struct Analyzer {
    pub const_int_bound: ConstIntBoundAnalyzer,
    pub modular_set: ModularSetAnalyzer,
    pub transitive_comparisons: TransitiveComparisonAnalyzer,
    depth: usize,
}

impl Analyzer {
    pub fn new() -> Self {
        Analyzer::default()
    }

    pub fn const_int_bound(&self, e: &Expr) -> ConstIntBound {
        self.const_int_bound.eval(e)
    }

    pub fn modular_set(&self, e: &Expr) -> ModularSet {
        self.modular_set.eval(e)
    }

    pub fn compare(&self, x: &Expr, y: &Expr, propagate: bool) -> CompareResult {
        self.transitive_comparisons.compare(x, y, propagate)
    }

    /// Register a variable binding from an inlined trivial `let`. Bindings
    /// are permanent for the analyzer's lifetime.
    pub fn bind(&mut self, var: Symbol, value: &Expr) {
        let bound = self.const_int_bound.eval(value);
        let modular = self.modular_set.eval(value);
        self.const_int_bound.bind(var, bound);
        self.modular_set.bind(var, modular);
    }

    /// Layer a constraint into every sub-analysis for a scope. The returned
    /// frame must be passed to [`Analyzer::pop_constraint`] before any
    /// enclosing frame is popped.
    pub fn push_constraint(&mut self, constraint: &Expr) -> ConstraintFrame {
        let frame = ConstraintFrame {
            depth: self.depth + 1,
            bound_mark: self.const_int_bound.mark(),
            modular_mark: self.modular_set.mark(),
            transitive_mark: self.transitive_comparisons.mark(),
        };
        self.depth += 1;
        tracing::debug!(constraint = %constraint, "entering constraint");
        for atom in split_conjunction(constraint) {
            let atom = strip_negation(atom);
            self.const_int_bound.ingest(&atom);
            self.modular_set.ingest(&atom);
            self.transitive_comparisons.ingest(&atom);
        }
        frame
    }

    pub fn pop_constraint(&mut self, frame: ConstraintFrame) {
        assert_eq!(
            frame.depth, self.depth,
            "constraint frames must unwind in LIFO order"
        );
        self.const_int_bound.truncate(frame.bound_mark);
        self.modular_set.truncate(frame.modular_mark);
        self.transitive_comparisons.truncate(frame.transitive_mark);
        self.depth -= 1;
    }
}

/// The conjuncts of a top-level `&&` chain.
pub fn split_conjunction(e: &Expr) -> Vec<&Expr> {
    let mut atoms = Vec::new();
    fn walk<'a>(e: &'a Expr, atoms: &mut Vec<&'a Expr>) {
        match &e.kind {
            ExprKind::Binary(BinOpKind::And, a, b) => {
                walk(a, atoms);
                walk(b, atoms);
            }
            _ => atoms.push(e),
        }
    }
    walk(e, &mut atoms);
    atoms
}

/// Rewrite `!(a ⋈ b)` into the dual comparison so that the ingestion
/// functions only ever see positive atoms.
fn strip_negation(atom: &Expr) -> Expr {
    if let ExprKind::Not(inner) = &atom.kind {
        if let ExprKind::Binary(op, a, b) = &inner.kind {
            let dual = match op {
                BinOpKind::Lt => Some(BinOpKind::Ge),
                BinOpKind::Le => Some(BinOpKind::Gt),
                BinOpKind::Gt => Some(BinOpKind::Le),
                BinOpKind::Ge => Some(BinOpKind::Lt),
                BinOpKind::Eq => Some(BinOpKind::Ne),
                BinOpKind::Ne => Some(BinOpKind::Eq),
                _ => None,
            };
            if let Some(dual) = dual {
                return Expr::binary(dual, a.clone(), b.clone());
            }
        }
    }
    atom.clone()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::DataType;

    #[test]
    fn constraint_scoping() {
        let mut analyzer = Analyzer::new();
        let ty = DataType::int(64);
        let x = Expr::var("x", ty);
        let frame = analyzer.push_constraint(&Expr::le(Expr::int(0, ty), x.clone()));
        assert_eq!(analyzer.const_int_bound(&x).min_value, 0);
        analyzer.pop_constraint(frame);
        assert_eq!(analyzer.const_int_bound(&x).min_value, NEG_INF);
    }

    #[test]
    #[should_panic(expected = "LIFO")]
    fn out_of_order_pop() {
        let mut analyzer = Analyzer::new();
        let ty = DataType::int(64);
        let x = Expr::var("x", ty);
        let outer = analyzer.push_constraint(&Expr::le(Expr::int(0, ty), x.clone()));
        let _inner = analyzer.push_constraint(&Expr::lt(x, Expr::int(8, ty)));
        analyzer.pop_constraint(outer);
    }

    #[test]
    fn conjunction_split() {
        let ty = DataType::int(64);
        let x = Expr::var("x", ty);
        let c = Expr::and(
            Expr::le(Expr::int(0, ty), x.clone()),
            Expr::and(Expr::lt(x.clone(), Expr::int(10, ty)), Expr::ne(x.clone(), Expr::int(3, ty))),
        );
        assert_eq!(split_conjunction(&c).len(), 3);
        let mut analyzer = Analyzer::new();
        let _frame = analyzer.push_constraint(&c);
        let bound = analyzer.const_int_bound(&x);
        assert_eq!((bound.min_value, bound.max_value), (0, 9));
    }

    #[test]
    fn side_effects() {
        let ty = DataType::int(64);
        let x = Expr::var("x", ty);
        assert_eq!(side_effect(&x), SideEffect::Pure);
        let call = Expr::call(
            CallOp::Extern(Symbol::intern("load")),
            vec![x.clone()],
            ty,
        );
        assert_eq!(side_effect(&call), SideEffect::Opaque);
        assert_eq!(side_effect(&Expr::add(x, call.clone())), SideEffect::Opaque);
        assert!(SideEffect::Pure < SideEffect::ReadState);
        assert!(SideEffect::ReadState < SideEffect::UpdateState);
        assert!(SideEffect::UpdateState < SideEffect::Opaque);
    }
}
