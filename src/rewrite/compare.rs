//! The comparison engine layered over the analysis oracles.

use crate::analysis::{CompareResult, ConstIntBound, POS_INF};
use crate::ast::Expr;

use super::pattern::{matches_one_of, pmatch, pvars_expr, MatchState, PatternNode};
use super::{Extension, RewriteSimplifier};

impl RewriteSimplifier<'_> {
    /// Relate `x` and `y`, strongest knowledge first: constant bounds and
    /// modular sets of the simplified difference, then known inequalities,
    /// then the product-versus-sum heuristic. Stops as soon as the relation
    /// is pinned to a single outcome.
    pub fn try_compare(&mut self, x: &Expr, y: &Expr) -> CompareResult {
        let mut output = CompareResult::UNKNOWN;

        output = output & self.try_compare_using_const_int_bounds(x, y);
        if output.is_decided() {
            return output;
        }

        output = output & self.try_compare_using_known_inequalities(x, y);
        if output.is_decided() {
            return output;
        }

        output & self.try_comparison_of_product_and_sum(x, y)
    }

    fn try_compare_using_const_int_bounds(&mut self, x: &Expr, y: &Expr) -> CompareResult {
        let diff = Expr::sub(x.clone(), y.clone());
        self.try_compare_const(&diff, 0)
    }

    fn try_compare_using_known_inequalities(&mut self, x: &Expr, y: &Expr) -> CompareResult {
        let propagate = self.extension_enabled(Extension::TRANSITIVELY_PROVE_INEQUALITIES);
        self.analyzer.compare(x, y, propagate)
    }

    /// Try to prove how `x` relates to the constant `val`.
    ///
    /// This is the hot path, called from the equality and comparison
    /// rewrites: it simplifies `x` and then consults only the constant bound
    /// and modular set, skipping the heavier layers.
    pub fn try_compare_const(&mut self, x: &Expr, val: i64) -> CompareResult {
        let diff = self.visit_expr(x);
        if let Some(v) = diff.as_const_int() {
            return match v.cmp(&val) {
                std::cmp::Ordering::Equal => CompareResult::EQ,
                std::cmp::Ordering::Greater => CompareResult::GT,
                std::cmp::Ordering::Less => CompareResult::LT,
            };
        }
        let dbound = self.analyzer.const_int_bound(&diff);
        if dbound.min_value == val && dbound.max_value == val {
            return CompareResult::EQ;
        }
        if dbound.min_value > val {
            return CompareResult::GT;
        }
        if dbound.max_value < val {
            return CompareResult::LT;
        }
        if dbound.min_value >= val {
            return CompareResult::GE;
        }
        if dbound.max_value <= val {
            return CompareResult::LE;
        }
        if val == 0 {
            // base != 0 under the coeff normalization means the value is
            // never congruent to zero
            let dmod = self.analyzer.modular_set(&diff);
            if dmod.base != 0 {
                return CompareResult::NE;
            }
        }
        CompareResult::UNKNOWN
    }

    /// Recognize differences of the shape `(A+B)*C - (A*B)*D` and decide the
    /// comparison through the reciprocal inequality `1/(A*D) + 1/(B*D) ⋛
    /// 1/C`, which is provable from the factor bounds when all four terms
    /// have known signs.
    fn try_comparison_of_product_and_sum(&mut self, x: &Expr, y: &Expr) -> CompareResult {
        if !self.extension_enabled(Extension::COMPARISON_OF_PRODUCT_AND_SUM) {
            return CompareResult::UNKNOWN;
        }

        let [a, b, c, d] = pvars_expr();
        let mut st = MatchState::new();

        // diff is `(A+B)*C - (A*B)*D`. Depending on previous
        // simplifications, the exact form of the expression may vary.
        let diff = self.visit_expr(&Expr::sub(x.clone(), y.clone()));

        let with_product_term = matches_one_of((
            (a + b) * c + (a * b) * d,
            (a + b) * c + (b * a) * d,
            (a * b) * d + (a + b) * c,
            (b * a) * d + (a + b) * c,
        ));
        let without_product_term = matches_one_of((
            (a + b) * c + (a * b),
            (a + b) * c + (b * a),
            (a * b) + (a + b) * c,
            (b * a) + (a + b) * c,
        ));

        let matched = if pmatch!(st, diff, with_product_term) {
            // the matched D carries the sign of the subtraction already
            let d_bound = self.analyzer.const_int_bound(&d.get(&st)).negate();
            Some((a.get(&st), b.get(&st), c.get(&st), d_bound))
        } else if pmatch!(st, diff, without_product_term) {
            Some((a.get(&st), b.get(&st), c.get(&st), ConstIntBound::single(-1)))
        } else {
            None
        };
        let Some((term_a, term_b, term_c, mut d_bound)) = matched else {
            return CompareResult::UNKNOWN;
        };

        let mut a_bound = self.analyzer.const_int_bound(&term_a);
        let mut b_bound = self.analyzer.const_int_bound(&term_b);
        let mut c_bound = self.analyzer.const_int_bound(&term_c);

        let is_negative = |bound: &ConstIntBound| bound.max_value < 0;
        let is_positive = |bound: &ConstIntBound| bound.min_value > 0;

        // If D is negative, we would be providing an upper bound for
        // `(A*B)*D` rather than a lower bound. Flip all the signs, find a
        // lower bound, and flip the resulting relation at the end.
        //
        // Before: (A+B)*C < (A*B)*D
        // After:  (A*B)*(-D) < (A+B)*(-C)
        let is_upper_bound = is_negative(&d_bound);
        if is_upper_bound {
            c_bound = c_bound.negate();
            d_bound = d_bound.negate();
        }

        // Before: (A+B)*C < (A*B)*D
        // After:  ((-A) + (-B))*(-C) < ((-A)*(-B))*D
        if is_negative(&c_bound) {
            a_bound = a_bound.negate();
            b_bound = b_bound.negate();
            c_bound = c_bound.negate();
        }

        let all_terms_positive = is_positive(&a_bound)
            && is_positive(&b_bound)
            && is_positive(&c_bound)
            && is_positive(&d_bound);
        if !all_terms_positive {
            return CompareResult::UNKNOWN;
        }

        // (A+B)*C < (A*B)*D
        // (A+B)*C / (A*B*C*D) < (A*B)*D / (A*B*C*D)
        // 1/(A*D) + 1/(B*D) < 1/C
        //
        // The product (A*B*C*D) is positive, so if the reciprocal term
        // 1/(A*D) + 1/(B*D) - 1/C is positive, it provides a lower bound on
        // the difference.
        let reciprocal_term_is_positive = {
            if d_bound.max_value == POS_INF {
                // If D can grow without bound, the 1/(A*D) and 1/(B*D) terms
                // approach zero and the -1/C term determines the sign.
                false
            } else if (a_bound.max_value.min(b_bound.max_value) as i128)
                * (d_bound.max_value as i128)
                <= c_bound.min_value as i128
            {
                // 1/(A*D) + 1/(B*D) - 1/C is positive when 1/C < 1/(A*D) +
                // 1/(B*D). Every term is positive, so the condition already
                // holds when A*D <= C or B*D <= C.
                true
            } else if a_bound.max_value != POS_INF && b_bound.max_value != POS_INF {
                // Even when neither term suffices on its own, the inequality
                // may be provable at the extreme values: the LHS 1/C is
                // maximal for minimal C, the RHS is minimal for maximal A,
                // B, and D.
                //
                //   1/C_min < 1/(A_max*D_max) + 1/(B_max*D_max)
                //   A_max*B_max*D_max < C_min*(A_max + B_max)
                (a_bound.max_value as i128)
                    * (b_bound.max_value as i128)
                    * (d_bound.max_value as i128)
                    < (c_bound.min_value as i128)
                        * (a_bound.max_value as i128 + b_bound.max_value as i128)
            } else {
                false
            }
        };

        if !reciprocal_term_is_positive {
            return CompareResult::UNKNOWN;
        }

        if is_upper_bound {
            // the sign flip at the start inverts the final relation
            CompareResult::LT
        } else {
            CompareResult::GT
        }
    }
}

#[cfg(test)]
mod test {
    use crate::analysis::{Analyzer, CompareResult};
    use crate::ast::{DataType, Expr};
    use crate::rewrite::{Extension, RewriteSimplifier};

    fn ity() -> DataType {
        DataType::int(64)
    }

    #[test]
    fn compare_against_constant() {
        let mut analyzer = Analyzer::new();
        let x = Expr::var("x", ity());
        let frame = analyzer.push_constraint(&Expr::ge(x.clone(), Expr::int(1, ity())));
        let mut simp = RewriteSimplifier::new(&mut analyzer);
        assert_eq!(simp.try_compare_const(&x, 0), CompareResult::GT);
        assert_eq!(simp.try_compare_const(&x, 1), CompareResult::GE);
        let two_x = Expr::mul(x.clone(), Expr::int(2, ity()));
        assert_eq!(simp.try_compare_const(&Expr::add(two_x, Expr::int(1, ity())), 0), CompareResult::GT);
        drop(simp);
        analyzer.pop_constraint(frame);
    }

    #[test]
    fn modular_disequality() {
        let mut analyzer = Analyzer::new();
        let mut simp = RewriteSimplifier::new(&mut analyzer);
        let x = Expr::var("x", ity());
        // x * 4 + 2 is never zero
        let e = Expr::add(Expr::mul(x, Expr::int(4, ity())), Expr::int(2, ity()));
        assert_eq!(simp.try_compare_const(&e, 0), CompareResult::NE);
    }

    #[test]
    fn product_vs_sum() {
        let mut analyzer = Analyzer::new();
        let bounded = |name: &str| Expr::var(name, ity());
        let ty = ity();
        let one = Expr::int(1, ty);
        let five = Expr::int(5, ty);
        let mut frames = Vec::new();
        for name in ["A", "B"] {
            let v = bounded(name);
            frames.push(analyzer.push_constraint(&Expr::and(
                Expr::ge(v.clone(), one.clone()),
                Expr::le(v.clone(), five.clone()),
            )));
        }
        let mut simp = RewriteSimplifier::new(&mut analyzer);
        simp.set_enabled_extensions(Extension::COMPARISON_OF_PRODUCT_AND_SUM);

        let a = bounded("A");
        let b = bounded("B");
        // (A+B)*12 vs (A*B)*2 with A,B ∈ [1,5]: min(A,B)*2 <= 12, so the
        // sum side is provably larger.
        let lhs = Expr::mul(Expr::add(a.clone(), b.clone()), Expr::int(12, ty));
        let rhs = Expr::mul(Expr::mul(a.clone(), b.clone()), Expr::int(2, ty));
        assert_eq!(simp.try_compare(&lhs, &rhs), CompareResult::GT);

        // Without the extension the comparison is unknown.
        simp.set_enabled_extensions(Extension::NONE);
        assert_eq!(simp.try_compare(&lhs, &rhs), CompareResult::UNKNOWN);
        drop(simp);
        for frame in frames.into_iter().rev() {
            analyzer.pop_constraint(frame);
        }
    }
}
