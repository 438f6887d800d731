//! Rewrite rules for the boolean connectives.
//!
//! While one operand of `&&` is being simplified, the other operand is
//! asserted into the analyzer (for `||`, its normalized negation), using the
//! scoped constraint protocol so nothing leaks past the node. With the
//! branch-constraints extension the two sides alternate, each revisited up
//! to twice, until neither changes.

use crate::ast::{BinOpKind, Expr, ExprKind};

use super::const_fold::{fold_or_build_not, try_binary_fold};
use super::normalize::normalize_boolean_operators;
use super::pattern::{
    broadcast, floordiv, floormod, matches_one_of, pbool, pint, pvars_expr, pvars_int,
    try_recursive_rewrite, try_recursive_rewrite_if, try_rewrite, try_rewrite_if, MatchState,
    PatternNode,
};
use super::{binary_parts, Extension, RewriteSimplifier};

impl RewriteSimplifier<'_> {
    /// Simplify both operands, alternating which one is assumed while the
    /// other is visited. `negate_constraint` is set for `||`, where the
    /// sibling's negation is what holds.
    fn visit_boolean_operands(&mut self, orig: &Expr, negate_constraint: bool) -> Expr {
        let ExprKind::Binary(op, a0, b0) = &orig.kind else {
            unreachable!("boolean visitor on a non-binary node")
        };
        let op = *op;

        let as_constraint = |sibling: &Expr| {
            if negate_constraint {
                normalize_boolean_operators(&fold_or_build_not(sibling.clone()))
            } else {
                sibling.clone()
            }
        };

        if !self.extension_enabled(Extension::APPLY_CONSTRAINTS_TO_BOOLEAN_BRANCHES) {
            let a = self.visit_expr(a0);
            let constraint = as_constraint(&a);
            let frame = self.analyzer.push_constraint(&constraint);
            let b = self.visit_expr(b0);
            self.analyzer.pop_constraint(frame);
            if Expr::ptr_eq(&a, a0) && Expr::ptr_eq(&b, b0) {
                return orig.clone();
            }
            return Expr::binary(op, a, b);
        }

        let mut a = a0.clone();
        let mut b = b0.clone();

        // Alternate which branch serves as the constraint and which is
        // simplified. Some analyses expect their constraints to be
        // simplified already, so each side may need a second visit; stop
        // early once neither side changes twice in a row.
        let mut iterations_since_update = 0;
        for i in 0..4 {
            let (target, sibling) = if i % 2 == 0 { (&a, &b) } else { (&b, &a) };
            let constraint = as_constraint(sibling);
            let frame = self.analyzer.push_constraint(&constraint);
            let updated = self.visit_expr(target);
            self.analyzer.pop_constraint(frame);

            let target = if i % 2 == 0 { &mut a } else { &mut b };
            if Expr::ptr_eq(&updated, target) || updated == *target {
                iterations_since_update += 1;
                if iterations_since_update >= 2 {
                    break;
                }
            } else {
                *target = updated;
                iterations_since_update = 0;
            }
        }

        if Expr::ptr_eq(&a, a0) && Expr::ptr_eq(&b, b0) {
            orig.clone()
        } else {
            Expr::binary(op, a, b)
        }
    }

    pub(crate) fn visit_and(&mut self, orig: &Expr) -> Expr {
        let ret = self.visit_boolean_operands(orig, false);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::And, a, b) {
                return folded;
            }
        }
        if let Some(matched) = self.try_match_literal_constraint(&ret) {
            return matched;
        }
        if self.extension_enabled(Extension::CONVERT_BOOLEAN_TO_AND_OF_ORS)
            && !self.recursively_visiting_boolean
        {
            if let Some(normalizer) = self.and_of_ors_normalizer.as_ref() {
                return normalizer(&ret);
            }
        }

        let [x, y, z] = pvars_expr();
        let [c1, c2, c3] = pvars_int();
        let mut st = MatchState::new();

        if ret.ty.is_vector() {
            let [bx, by, lanes] = pvars_expr();
            try_rewrite!(
                self, st, ret,
                broadcast(bx, lanes).and(broadcast(by, lanes)),
                broadcast(bx.and(by), lanes)
            );
        }

        try_rewrite!(self, st, ret, x.eq(y).and(x.ne(y)), pbool(false));
        try_rewrite!(self, st, ret, x.ne(y).and(x.eq(y)), pbool(false));
        try_rewrite!(self, st, ret, x.and(!x), pbool(false));
        try_rewrite!(self, st, ret, x.le(y).and(y.lt(x)), pbool(false));
        try_rewrite!(self, st, ret, y.lt(x).and(x.le(y)), pbool(false));

        try_rewrite_if!(
            self, st, ret,
            x.lt(c1).and(c2.lt(x)),
            pbool(false),
            c2.val(&st) + 1 >= c1.val(&st)
        );
        try_rewrite_if!(
            self, st, ret,
            c2.lt(x).and(x.lt(c1)),
            pbool(false),
            c2.val(&st) + 1 >= c1.val(&st)
        );

        try_rewrite_if!(
            self, st, ret,
            matches_one_of((
                x.lt(c1).and(c2.le(x)),
                c2.le(x).and(x.lt(c1)),
                x.le(c1).and(c2.lt(x)),
                c2.lt(x).and(x.le(c1)),
            )),
            pbool(false),
            c2.val(&st) >= c1.val(&st)
        );

        try_rewrite_if!(
            self, st, ret,
            matches_one_of((x.le(c1).and(c2.le(x)), c2.le(x).and(x.le(c1)))),
            pbool(false),
            c2.val(&st) > c1.val(&st)
        );

        // fold the second comparison under the established equality
        try_rewrite!(
            self, st, ret,
            x.eq(c1).and(x.eq(c2)),
            x.eq(c1).and(c1.eq(c2))
        );
        try_rewrite!(
            self, st, ret,
            matches_one_of((x.eq(c1).and(x.ne(c2)), x.ne(c2).and(x.eq(c1)))),
            x.eq(c1).and(c1.ne(c2))
        );

        // a quotient/remainder pair pins down the dividend
        try_recursive_rewrite!(
            self, st, ret,
            matches_one_of((
                floordiv(x, c2).eq(c1).and(floormod(x, c2).eq(c3)),
                floormod(x, c2).eq(c3).and(floordiv(x, c2).eq(c1)),
            )),
            x.eq(c1 * c2 + c3)
        );

        try_recursive_rewrite_if!(
            self, st, ret,
            matches_one_of((
                pint(0).le(x - y * c1).and((x - y * c1).lt(c1)),
                (x - y * c1).lt(c1).and(pint(0).le(x - y * c1)),
            )),
            y.eq(floordiv(x, c1)),
            c1.val(&st) > 0
        );

        try_recursive_rewrite!(
            self, st, ret,
            matches_one_of((
                c1.lt(x - y * c1).and((x - y * c1).le(0)),
                (x - y * c1).lt(c1).and(pint(0).le(x - y * c1)),
            )),
            y.eq(floordiv(x, c1))
        );
        try_recursive_rewrite_if!(
            self, st, ret,
            matches_one_of((
                pint(0).le(x + y * c2).and((x + y * c2).lt(c1)),
                (x + y * c2).lt(c1).and(pint(0).le(x + y * c2)),
            )),
            y.eq(floordiv(x, c1)),
            c2.val(&st) == -c1.val(&st)
        );

        try_recursive_rewrite_if!(
            self, st, ret,
            x.lt(c1).and(floormod(x, c2).lt(c3)),
            x.lt(c1 - c2 + c3).and(floormod(x, c2).lt(c3)),
            c2.val(&st) != 0 && c1.val(&st) % c2.val(&st) == 0
        );
        try_recursive_rewrite_if!(
            self, st, ret,
            x.lt(c1).and(floormod(x, c2).lt(c3)),
            x.lt(c1 - floormod(c1, c2) + c3).and(floormod(x, c2).lt(c3)),
            {
                let (c1v, c2v) = (c1.val(&st), c2.val(&st));
                c2v != 0 && ((c1v % c2v) + c2v) % c2v > c3.val(&st)
            }
        );

        try_recursive_rewrite_if!(
            self, st, ret,
            x.le(c1).and(floormod(x, c2).lt(c3)),
            x.lt(c1 + 1 - c2 + c3).and(floormod(x, c2).lt(c3)),
            c2.val(&st) != 0 && (c1.val(&st) + 1) % c2.val(&st) == 0
        );
        try_recursive_rewrite_if!(
            self, st, ret,
            x.le(c1).and(floormod(x, c2).lt(c3)),
            x.lt(c1 + 1 - floormod(c1, c2) + c3).and(floormod(x, c2).lt(c3)),
            {
                let (c1v, c2v) = (c1.val(&st), c2.val(&st));
                c2v != 0 && (((c1v + 1) % c2v) + c2v) % c2v > c3.val(&st)
            }
        );

        try_recursive_rewrite!(
            self, st, ret,
            matches_one_of((
                floordiv(x, c2).eq(c1).and(floormod(x, c2).lt(c3)),
                floormod(x, c2).lt(c3).and(floordiv(x, c2).eq(c1)),
            )),
            (c1 * c2).le(x).and(x.lt(c1 * c2 + c3))
        );
        try_recursive_rewrite!(
            self, st, ret,
            matches_one_of((
                floordiv(x, c2).eq(c1).and(floormod(x, c2).le(c3)),
                floormod(x, c2).le(c3).and(floordiv(x, c2).eq(c1)),
            )),
            (c1 * c2).le(x).and(x.le(c1 * c2 + c3))
        );

        try_recursive_rewrite!(
            self, st, ret,
            matches_one_of((
                floordiv(x, c2).eq(c1).and(c3.le(floormod(x, c2))),
                c3.le(floormod(x, c2)).and(floordiv(x, c2).eq(c1)),
            )),
            (c1 * c2 + c3).le(x).and(x.lt((c1 + 1) * c2))
        );
        try_recursive_rewrite!(
            self, st, ret,
            matches_one_of((
                floordiv(x, c2).eq(c1).and(c3.lt(floormod(x, c2))),
                c3.lt(floormod(x, c2)).and(floordiv(x, c2).eq(c1)),
            )),
            (c1 * c2 + c3).lt(x).and(x.lt((c1 + 1) * c2))
        );

        try_recursive_rewrite!(self, st, ret, x.and(y.and(z)), x.and(y).and(z));

        ret
    }

    pub(crate) fn visit_or(&mut self, orig: &Expr) -> Expr {
        let ret = self.visit_boolean_operands(orig, true);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::Or, a, b) {
                return folded;
            }
        }
        if let Some(matched) = self.try_match_literal_constraint(&ret) {
            return matched;
        }
        if self.extension_enabled(Extension::CONVERT_BOOLEAN_TO_AND_OF_ORS)
            && !self.recursively_visiting_boolean
        {
            if let Some(normalizer) = self.and_of_ors_normalizer.as_ref() {
                return normalizer(&ret);
            }
        }

        let [x, y, z] = pvars_expr();
        let [c1, c2] = pvars_int();
        let mut st = MatchState::new();

        if ret.ty.is_vector() {
            let [bx, by, lanes] = pvars_expr();
            try_rewrite!(
                self, st, ret,
                broadcast(bx, lanes).or(broadcast(by, lanes)),
                broadcast(bx.or(by), lanes)
            );
        }

        try_rewrite!(self, st, ret, x.eq(y).or(x.ne(y)), pbool(true));
        try_rewrite!(self, st, ret, x.ne(y).or(x.eq(y)), pbool(true));
        try_rewrite!(self, st, ret, x.or(!x), pbool(true));
        try_rewrite!(self, st, ret, x.le(y).or(y.lt(x)), pbool(true));
        try_rewrite!(self, st, ret, y.lt(x).or(x.le(y)), pbool(true));

        try_rewrite!(self, st, ret, x.lt(y).or(y.lt(x)), x.ne(y));

        try_rewrite_if!(
            self, st, ret,
            x.lt(c1).or(c2.lt(x)),
            pbool(true),
            c2.val(&st) < c1.val(&st)
        );
        try_rewrite_if!(
            self, st, ret,
            c2.lt(x).or(x.lt(c1)),
            pbool(true),
            c2.val(&st) < c1.val(&st)
        );

        try_rewrite_if!(
            self, st, ret,
            x.le(c1).or(c2.lt(x)),
            pbool(true),
            c2.val(&st) <= c1.val(&st)
        );
        try_rewrite_if!(
            self, st, ret,
            c2.lt(x).or(x.le(c1)),
            pbool(true),
            c2.val(&st) <= c1.val(&st)
        );
        try_rewrite_if!(
            self, st, ret,
            x.lt(c1).or(c2.le(x)),
            pbool(true),
            c2.val(&st) <= c1.val(&st)
        );
        try_rewrite_if!(
            self, st, ret,
            c2.le(x).or(x.lt(c1)),
            pbool(true),
            c2.val(&st) <= c1.val(&st)
        );

        try_rewrite_if!(
            self, st, ret,
            x.le(c1).or(c2.le(x)),
            pbool(true),
            c2.val(&st) <= c1.val(&st) + 1
        );
        try_rewrite_if!(
            self, st, ret,
            c2.le(x).or(x.le(c1)),
            pbool(true),
            c2.val(&st) <= c1.val(&st) + 1
        );

        try_rewrite!(self, st, ret, x.ne(c1).or(x.ne(c2)), x.ne(c1).or(c1.ne(c2)));
        try_rewrite!(self, st, ret, x.ne(c1).or(x.eq(c2)), x.ne(c1).or(c1.eq(c2)));
        try_rewrite!(self, st, ret, x.eq(c2).or(x.ne(c1)), x.ne(c1).or(c1.eq(c2)));

        try_recursive_rewrite!(self, st, ret, x.lt(y).or(x.eq(y)), x.le(y));
        try_recursive_rewrite!(self, st, ret, x.lt(y).or(y.eq(x)), x.le(y));
        try_recursive_rewrite!(self, st, ret, x.eq(y).or(x.lt(y)), x.le(y));
        try_recursive_rewrite!(self, st, ret, y.eq(x).or(x.lt(y)), x.le(y));

        try_recursive_rewrite!(self, st, ret, x.or(y.or(z)), x.or(y).or(z));

        ret
    }
}
