//! Normalization of boolean operators.
//!
//! Performs a subset of the simplifications done by the full rewriter,
//! sufficient to negate an already-simplified expression: double-negation
//! elimination, De Morgan pushdown, and dualization of comparisons so that
//! only `<`, `<=`, `==`, `!=` remain. Used when entering the negation of a
//! constraint and as a cheap canonicalization before matching.

use crate::ast::{BinOpKind, Expr};

use super::const_fold::{fold_or_build, fold_or_build_not};
use super::pattern::{matches_one_of, pmatch, pvars_expr, MatchState, PatternNode};

pub fn normalize_boolean_operators(expr: &Expr) -> Expr {
    let [x, y] = pvars_expr();
    let mut st = MatchState::new();
    let mut expr = expr.clone();

    loop {
        if pmatch!(st, expr, !!x) {
            expr = x.get(&st);
        } else if pmatch!(st, expr, !(x.or(y))) {
            let a = normalize_boolean_operators(&fold_or_build_not(x.get(&st)));
            let b = normalize_boolean_operators(&fold_or_build_not(y.get(&st)));
            return fold_or_build(BinOpKind::And, a, b);
        } else if pmatch!(st, expr, !(x.and(y))) {
            let a = normalize_boolean_operators(&fold_or_build_not(x.get(&st)));
            let b = normalize_boolean_operators(&fold_or_build_not(y.get(&st)));
            return fold_or_build(BinOpKind::Or, a, b);
        } else if pmatch!(st, expr, matches_one_of((x.ge(y), !(x.lt(y)), !(y.gt(x))))) {
            return fold_or_build(BinOpKind::Le, y.get(&st), x.get(&st));
        } else if pmatch!(st, expr, matches_one_of((x.gt(y), !(x.le(y)), !(y.ge(x))))) {
            return fold_or_build(BinOpKind::Lt, y.get(&st), x.get(&st));
        } else if pmatch!(st, expr, !(x.eq(y))) {
            return fold_or_build(BinOpKind::Ne, x.get(&st), y.get(&st));
        } else if pmatch!(st, expr, !(x.ne(y))) {
            return fold_or_build(BinOpKind::Eq, x.get(&st), y.get(&st));
        } else {
            return expr;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::DataType;

    fn x() -> Expr {
        Expr::var("x", DataType::int(32))
    }

    fn y() -> Expr {
        Expr::var("y", DataType::int(32))
    }

    #[test]
    fn double_negation() {
        let b = Expr::var("b", DataType::bool_());
        let e = Expr::not(Expr::not(b.clone()));
        assert_eq!(normalize_boolean_operators(&e), b);
    }

    #[test]
    fn comparisons_dualize() {
        // x >= y  →  y <= x
        let e = Expr::ge(x(), y());
        assert_eq!(normalize_boolean_operators(&e), Expr::le(y(), x()));
        // !(x < y)  →  y <= x
        let e = Expr::not(Expr::lt(x(), y()));
        assert_eq!(normalize_boolean_operators(&e), Expr::le(y(), x()));
        // !(x == y)  →  x != y
        let e = Expr::not(Expr::eq(x(), y()));
        assert_eq!(normalize_boolean_operators(&e), Expr::ne(x(), y()));
    }

    #[test]
    fn de_morgan_pushdown() {
        let a = Expr::var("a", DataType::bool_());
        let b = Expr::var("b", DataType::bool_());
        // !(a || b)  →  !a && !b
        let e = Expr::not(Expr::or(a.clone(), b.clone()));
        assert_eq!(
            normalize_boolean_operators(&e),
            Expr::and(Expr::not(a.clone()), Expr::not(b.clone()))
        );
        // !(a && (x < y))  →  !a || (y <= x)
        let e = Expr::not(Expr::and(a.clone(), Expr::lt(x(), y())));
        assert_eq!(
            normalize_boolean_operators(&e),
            Expr::or(Expr::not(a), Expr::le(y(), x()))
        );
    }
}
