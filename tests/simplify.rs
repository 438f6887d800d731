//! End-to-end scenarios driving the public simplifier API.

use pretty_assertions::assert_eq;

use diophant::analysis::Analyzer;
use diophant::ast::{CallOp, DataType, Expr};
use diophant::rewrite::RewriteSimplifier;

fn ity() -> DataType {
    DataType::int(32)
}

fn x() -> Expr {
    Expr::var("x", ity())
}

fn int(v: i64) -> Expr {
    Expr::int(v, ity())
}

fn simplify(e: &Expr) -> Expr {
    let mut analyzer = Analyzer::new();
    let mut simp = RewriteSimplifier::new(&mut analyzer);
    simp.simplify(e)
}

#[test]
fn add_sub_cancellation() {
    // (x + 5) - 5 == x
    let e = Expr::sub(Expr::add(x(), int(5)), int(5));
    assert_eq!(simplify(&e), x());
    // (x - y) + y == x
    let y = Expr::var("y", ity());
    let e = Expr::add(Expr::sub(x(), y.clone()), y);
    assert_eq!(simplify(&e), x());
    // x - x == 0
    let e = Expr::sub(x(), x());
    assert_eq!(simplify(&e), int(0));
}

#[test]
fn min_of_offset() {
    // min(x, x + 3) == x
    let e = Expr::min(x(), Expr::add(x(), int(3)));
    assert_eq!(simplify(&e), x());
    // min(max(x, y), x) == x
    let y = Expr::var("y", ity());
    let e = Expr::min(Expr::max(x(), y), x());
    assert_eq!(simplify(&e), x());
}

#[test]
fn truncmod_needs_sign_information() {
    // truncated modulus is gated on a non-negative dividend
    let e = Expr::truncmod(Expr::add(Expr::mul(x(), int(4)), int(2)), int(4));
    assert_eq!(simplify(&e), e);

    let mut analyzer = Analyzer::new();
    let mut simp = RewriteSimplifier::new(&mut analyzer);
    let handle = simp.enter_constraint(&Expr::ge(x(), int(0)));
    assert_eq!(simp.simplify(&e), int(2));
    simp.exit_constraint(handle);
    // and the knowledge is gone after restore
    assert_eq!(simp.simplify(&e), e);
}

#[test]
fn floormod_is_sign_independent() {
    // the floored family needs no constraint at all
    let e = Expr::floormod(Expr::add(Expr::mul(x(), int(4)), int(2)), int(4));
    assert_eq!(simplify(&e), int(2));
}

#[test]
fn paired_parities_sum_to_one() {
    // (x + 1) %% 2 + x %% 2 == 1
    let e = Expr::add(
        Expr::floormod(Expr::add(x(), int(1)), int(2)),
        Expr::floormod(x(), int(2)),
    );
    assert_eq!(simplify(&e), int(1));
}

#[test]
fn floordiv_of_offset_minus_parity() {
    // floordiv(x + 1, 2) - floormod(x, 2) == floordiv(x, 2)
    let e = Expr::sub(
        Expr::floordiv(Expr::add(x(), int(1)), int(2)),
        Expr::floormod(x(), int(2)),
    );
    assert_eq!(simplify(&e), Expr::floordiv(x(), int(2)));
}

#[test]
fn div_mod_recomposition() {
    // x / 7 * 7 + x % 7 == x, in both families
    let e = Expr::add(
        Expr::mul(Expr::truncdiv(x(), int(7)), int(7)),
        Expr::truncmod(x(), int(7)),
    );
    assert_eq!(simplify(&e), x());
    let y = Expr::var("y", ity());
    let e = Expr::add(
        Expr::mul(Expr::floordiv(x(), y.clone()), y.clone()),
        Expr::floormod(x(), y),
    );
    assert_eq!(simplify(&e), x());
}

#[test]
fn contradictory_range_is_false() {
    // x < 10 && 20 < x is unsatisfiable
    let e = Expr::and(Expr::lt(x(), int(10)), Expr::lt(int(20), x()));
    assert_eq!(simplify(&e), Expr::bool_lit(false));
}

#[test]
fn satisfiable_range_is_kept() {
    // x < 10 && 5 < x stays, even knowing x >= 0
    let e = Expr::and(Expr::lt(x(), int(10)), Expr::lt(int(5), x()));
    let mut analyzer = Analyzer::new();
    let mut simp = RewriteSimplifier::new(&mut analyzer);
    let handle = simp.enter_constraint(&Expr::ge(x(), int(0)));
    assert_eq!(simp.simplify(&e), e);
    simp.exit_constraint(handle);
}

#[test]
fn entered_constraint_decides_predicates() {
    let mut analyzer = Analyzer::new();
    let mut simp = RewriteSimplifier::new(&mut analyzer);
    let c = Expr::lt(x(), int(16));
    let handle = simp.enter_constraint(&c);
    assert_eq!(simp.simplify(&c), Expr::bool_lit(true));
    assert_eq!(simp.simplify(&Expr::not(c.clone())), Expr::bool_lit(false));
    // an implied, weaker bound also resolves
    assert_eq!(
        simp.simplify(&Expr::lt(x(), int(100))),
        Expr::bool_lit(true)
    );
    simp.exit_constraint(handle);
}

#[test]
fn comparison_to_ceil_division() {
    // x * 8 < 12  ==>  x < 2  (ceil division on the constant side)
    let e = Expr::lt(Expr::mul(x(), int(8)), int(12));
    assert_eq!(simplify(&e), Expr::lt(x(), int(2)));
}

#[test]
fn comparison_common_factor() {
    // x * 4 < y * 8 divides both sides by 4
    let y = Expr::var("y", ity());
    let e = Expr::lt(Expr::mul(x(), int(4)), Expr::mul(y.clone(), int(8)));
    assert_eq!(simplify(&e), Expr::lt(x(), Expr::mul(y, int(2))));
}

#[test]
fn boolean_tautologies() {
    let y = Expr::var("y", ity());
    // x < y || y <= x
    let e = Expr::or(
        Expr::lt(x(), y.clone()),
        Expr::le(y.clone(), x()),
    );
    assert_eq!(simplify(&e), Expr::bool_lit(true));
    // x < y && y < x
    let e = Expr::and(Expr::lt(x(), y.clone()), Expr::lt(y.clone(), x()));
    assert_eq!(simplify(&e), Expr::bool_lit(false));
    // x < y || y < x  ==>  x != y
    let e = Expr::or(Expr::lt(x(), y.clone()), Expr::lt(y.clone(), x()));
    assert_eq!(simplify(&e), Expr::ne(x(), y));
}

#[test]
fn negation_pushdown() {
    let y = Expr::var("y", ity());
    // !(x < y) ==> y <= x
    let e = Expr::not(Expr::lt(x(), y.clone()));
    assert_eq!(simplify(&e), Expr::le(y, x()));
}

#[test]
fn select_with_decided_condition() {
    let y = Expr::var("y", ity());
    let e = Expr::select(Expr::bool_lit(true), x(), y.clone());
    assert_eq!(simplify(&e), x());
    let e = Expr::select(Expr::var("p", DataType::bool_()), y.clone(), y.clone());
    assert_eq!(simplify(&e), y);
}

#[test]
fn select_condition_informs_branches() {
    // select(0 <= x, truncmod(x * 4 + 2, 4), 7): the branch knows x >= 0
    let dividend = Expr::add(Expr::mul(x(), int(4)), int(2));
    let e = Expr::select(
        Expr::le(int(0), x()),
        Expr::truncmod(dividend, int(4)),
        int(7),
    );
    let simplified = simplify(&e);
    let expected = Expr::select(Expr::le(int(0), x()), int(2), int(7));
    assert_eq!(simplified, expected);
}

#[test]
fn nested_if_then_else_merges() {
    let bty = DataType::bool_();
    let c1 = Expr::var("c1", bty);
    let c2 = Expr::var("c2", bty);
    let t = Expr::var("t", ity());
    let inner = Expr::call(
        CallOp::IfThenElse,
        vec![c2.clone(), t.clone(), int(0)],
        ity(),
    );
    let e = Expr::call(CallOp::IfThenElse, vec![c1.clone(), inner, int(0)], ity());
    let expected = Expr::call(
        CallOp::IfThenElse,
        vec![Expr::and(c1, c2), t, int(0)],
        ity(),
    );
    assert_eq!(simplify(&e), expected);
}

#[test]
fn builtin_folds() {
    // shifts fold on literals
    let e = Expr::call(CallOp::ShiftLeft, vec![int(3), int(4)], ity());
    assert_eq!(simplify(&e), int(48));
    let e = Expr::call(CallOp::ShiftRight, vec![int(-16), int(2)], ity());
    assert_eq!(simplify(&e), int(-4));
    // count leading zeros on the declared width
    let e = Expr::call(CallOp::Clz, vec![int(1)], ity());
    assert_eq!(simplify(&e), int(31));
    let e = Expr::call(CallOp::Clz, vec![int(0)], ity());
    assert_eq!(simplify(&e), int(32));
    // ceil(log2(f)) folds on a literal
    let fty = DataType::float(64);
    let log = Expr::call(CallOp::Log2, vec![Expr::float(9.0, fty)], fty);
    let e = Expr::call(CallOp::Ceil, vec![log], fty);
    assert_eq!(simplify(&e), Expr::float(4.0, fty));
}

#[test]
fn likely_resolves_against_constraints() {
    let cond = Expr::lt(x(), int(8));
    let e = Expr::call(CallOp::Likely, vec![cond.clone()], DataType::bool_());
    // without knowledge the hint stays
    assert_eq!(simplify(&e), e);
    // a decided argument drops the hint
    let mut analyzer = Analyzer::new();
    let mut simp = RewriteSimplifier::new(&mut analyzer);
    let handle = simp.enter_constraint(&cond);
    assert_eq!(simp.simplify(&e), Expr::bool_lit(true));
    simp.exit_constraint(handle);
}

#[test]
fn trivial_lets_inline() {
    let xs = diophant::ast::Symbol::intern("x");
    // let x = 3 in x + 1  ==>  4
    let e = Expr::let_in(xs, int(3), Expr::add(x(), int(1)));
    assert_eq!(simplify(&e), int(4));
    // a non-trivial binding is preserved
    let y = Expr::var("y", ity());
    let bound = Expr::add(y.clone(), y.clone());
    let e = Expr::let_in(xs, bound, Expr::add(x(), int(1)));
    let simplified = simplify(&e);
    assert!(matches!(
        simplified.kind,
        diophant::ast::ExprKind::Let(..)
    ));
}

#[test]
fn vector_ramp_addition() {
    let lanes = int(4);
    let y = Expr::var("y", ity());
    // ramp(x, 1, 4) + ramp(y, 2, 4) == ramp(x + y, 3, 4)
    let e = Expr::add(
        Expr::ramp(x(), int(1), lanes.clone()),
        Expr::ramp(y.clone(), int(2), lanes.clone()),
    );
    let expected = Expr::ramp(Expr::add(x(), y), int(3), lanes.clone());
    assert_eq!(simplify(&e), expected);
    // broadcast(x, 4) * broadcast(2, 4) == broadcast(x * 2, 4)
    let e = Expr::mul(
        Expr::broadcast(x(), lanes.clone()),
        Expr::broadcast(int(2), lanes.clone()),
    );
    let expected = Expr::broadcast(Expr::mul(x(), int(2)), lanes);
    assert_eq!(simplify(&e), expected);
}

#[test]
fn scalable_vectors_refuse_lane_enumeration() {
    let vscale = Expr::call(CallOp::Vscale, vec![], ity());
    let lanes = Expr::mul(vscale, int(4));
    // the broadcast distribution is lane-agnostic and still applies
    let e = Expr::add(
        Expr::broadcast(x(), lanes.clone()),
        Expr::broadcast(int(1), lanes.clone()),
    );
    let expected = Expr::broadcast(Expr::add(x(), int(1)), lanes.clone());
    assert_eq!(simplify(&e), expected);
    // a ramp division that would enumerate lanes is left alone
    let e = Expr::truncdiv(
        Expr::ramp(Expr::mul(x(), int(2)), int(1), lanes.clone()),
        Expr::broadcast(int(3), lanes),
    );
    let mut analyzer = Analyzer::new();
    let mut simp = RewriteSimplifier::new(&mut analyzer);
    let handle = simp.enter_constraint(&Expr::ge(x(), int(0)));
    assert_eq!(simp.simplify(&e), e);
    simp.exit_constraint(handle);
}

#[test]
fn extensions_round_trip() {
    use diophant::rewrite::Extension;
    let mut analyzer = Analyzer::new();
    let mut simp = RewriteSimplifier::new(&mut analyzer);
    assert_eq!(simp.enabled_extensions(), Extension::NONE);
    let flags = Extension::TRANSITIVELY_PROVE_INEQUALITIES
        | Extension::APPLY_CONSTRAINTS_TO_BOOLEAN_BRANCHES;
    simp.set_enabled_extensions(flags);
    assert_eq!(simp.enabled_extensions(), flags);
    assert!(flags.contains(Extension::TRANSITIVELY_PROVE_INEQUALITIES));
    assert!(!flags.contains(Extension::COMPARISON_OF_PRODUCT_AND_SUM));
}

#[test]
fn transitive_extension_chains_inequalities() {
    use diophant::rewrite::Extension;
    let a = Expr::var("a", ity());
    let b = Expr::var("b", ity());
    let c = Expr::var("c", ity());

    let mut analyzer = Analyzer::new();
    let mut simp = RewriteSimplifier::new(&mut analyzer);
    let outer = simp.enter_constraint(&Expr::le(a.clone(), b.clone()));
    let inner = simp.enter_constraint(&Expr::lt(b.clone(), c.clone()));

    let query = Expr::lt(a.clone(), c.clone());
    // the chain a <= b < c is only followed with the extension enabled
    assert_eq!(simp.simplify(&query), query);
    simp.set_enabled_extensions(Extension::TRANSITIVELY_PROVE_INEQUALITIES);
    assert_eq!(simp.simplify(&query), Expr::bool_lit(true));

    simp.exit_constraint(inner);
    simp.exit_constraint(outer);
}

#[test]
fn and_of_ors_handoff() {
    use diophant::rewrite::Extension;
    use std::cell::Cell;
    use std::rc::Rc;

    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let mut analyzer = Analyzer::new();
    let mut simp = RewriteSimplifier::new(&mut analyzer);
    simp.set_and_of_ors_normalizer(Box::new(move |e| {
        seen.set(seen.get() + 1);
        e.clone()
    }));

    let p = Expr::var("p", DataType::bool_());
    let q = Expr::var("q", DataType::bool_());
    let e = Expr::and(p.clone(), q.clone());

    // without the flag the hook is never consulted
    let _ = simp.simplify(&e);
    assert_eq!(calls.get(), 0);

    simp.set_enabled_extensions(Extension::CONVERT_BOOLEAN_TO_AND_OF_ORS);
    let _ = simp.simplify(&e);
    assert!(calls.get() > 0);
}

#[test]
fn simplification_is_deterministic() {
    let y = Expr::var("y", ity());
    let e = Expr::add(
        Expr::mul(Expr::add(x(), int(1)), int(2)),
        Expr::sub(y.clone(), y),
    );
    assert_eq!(simplify(&e), simplify(&e));
}
