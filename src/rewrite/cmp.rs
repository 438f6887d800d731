//! Rewrite rules for comparisons and boolean negation.
//!
//! `a > b` and `a >= b` are desugared to `b < a` / `b <= a` at dispatch.
//! `!=` and `<=` are reduced through the `==` and `<` rule tables, using the
//! relation the comparison engine can prove when one is available.

use crate::analysis::{side_effect, zero_aware_gcd, CompareResult, SideEffect};
use crate::ast::{BinOpKind, Expr, ExprKind};

use super::const_fold::{
    extract_constant_offset, fold_or_build, fold_or_build_not, try_binary_fold, try_not_fold,
};
use super::pattern::{
    broadcast, floordiv, floormod, matches_one_of, max, min, pbool, pint, pvars_expr, pvars_int,
    ramp, truncdiv, truncmod, try_recursive_rewrite, try_rewrite, try_rewrite_if, MatchState,
    PatternNode,
};
use super::{binary_parts, RewriteSimplifier};

impl RewriteSimplifier<'_> {
    pub(crate) fn visit_eq(&mut self, orig: &Expr) -> Expr {
        let ret = self.rebuild_binary(orig);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::Eq, a, b) {
                return folded;
            }
        }
        if let Some(matched) = self.try_match_literal_constraint(&ret) {
            return matched;
        }
        self.apply_eq_rules(ret)
    }

    pub(crate) fn apply_eq_rules(&mut self, ret: Expr) -> Expr {
        let ExprKind::Binary(BinOpKind::Eq, ..) = &ret.kind else {
            return ret;
        };
        let [x, y, lanes] = pvars_expr();
        let [c1, c2] = pvars_int();
        let mut st = MatchState::new();

        // vector rule
        if ret.ty.is_vector() {
            try_rewrite!(
                self, st, ret,
                broadcast(x, lanes).eq(broadcast(y, lanes)),
                broadcast(x.eq(y), lanes)
            );
        }

        let operand_ty = binary_parts(&ret).0.ty;
        if operand_ty.is_index_type() {
            {
                let (a, b) = binary_parts(&ret);
                let (a, b) = (a.clone(), b.clone());
                let result = self.try_compare(&a, &b);
                if result == CompareResult::EQ {
                    return Expr::bool_typed(true, ret.ty);
                }
                if result == CompareResult::NE
                    || result == CompareResult::GT
                    || result == CompareResult::LT
                {
                    return Expr::bool_typed(false, ret.ty);
                }
            }
            try_rewrite!(self, st, ret, c1.eq(x), x.eq(c1));

            try_rewrite!(self, st, ret, (x - c1).eq(c2), x.eq(c2 + c1));
            try_rewrite!(self, st, ret, (c1 - x).eq(c2), x.eq(c1 - c2));
            try_rewrite!(self, st, ret, (x + c1).eq(c2), x.eq(c2 - c1));
            try_recursive_rewrite!(self, st, ret, (x * y).eq(0), x.eq(0).or(y.eq(0)));
            try_rewrite!(self, st, ret, x.eq(x), pbool(true));
        } else {
            // mirrors the subtraction cancellation; off the index path the
            // dropped operand's effects must be checked, and the rewrite
            // does not preserve NaN (`NaN == NaN` is false)
            try_rewrite_if!(
                self, st, ret,
                x.eq(x),
                pbool(true),
                side_effect(&x.get(&st)) <= SideEffect::ReadState
            );
        }
        ret
    }

    pub(crate) fn visit_ne(&mut self, orig: &Expr) -> Expr {
        let ret = self.rebuild_binary(orig);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::Ne, a, b) {
                return folded;
            }
        }
        if let Some(matched) = self.try_match_literal_constraint(&ret) {
            return matched;
        }

        let (a, b) = {
            let (a, b) = binary_parts(&ret);
            (a.clone(), b.clone())
        };
        if a.ty.is_index_type() {
            let result = self.try_compare(&a, &b);
            if result == CompareResult::NE
                || result == CompareResult::GT
                || result == CompareResult::LT
            {
                return Expr::bool_typed(true, ret.ty);
            }
            if result == CompareResult::EQ {
                return Expr::bool_typed(false, ret.ty);
            }
            if result == CompareResult::GE {
                // a >= b is known, so a != b reduces to b < a
                return self.apply_lt_rules(Expr::lt(b, a));
            }
            if result == CompareResult::LE {
                // a <= b is known, so a != b reduces to a < b
                return self.apply_lt_rules(Expr::lt(a, b));
            }
        }

        let eq = self.apply_eq_rules(Expr::eq(a, b));
        self.apply_not_rules(fold_or_build_not(eq))
    }

    pub(crate) fn visit_le(&mut self, orig: &Expr) -> Expr {
        let ret = self.rebuild_binary(orig);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::Le, a, b) {
                return folded;
            }
        }
        if let Some(matched) = self.try_match_literal_constraint(&ret) {
            return matched;
        }

        // Check for applicable rewrites before attempting to prove or
        // disprove the inequality. This keeps (A <= B*x) simplifying to
        // (ceildiv(A,B) <= x) when A % B != 0; proving first would yield the
        // equivalent (floordiv(A,B) < x) instead.
        let (a, b) = {
            let (a, b) = binary_parts(&ret);
            (a.clone(), b.clone())
        };
        let lt = self.apply_lt_rules(Expr::lt(b, a));
        let ret = self.apply_not_rules(fold_or_build_not(lt));

        if let ExprKind::Binary(BinOpKind::Le, la, lb) = &ret.kind {
            if la.ty.is_index_type() {
                let (la, lb) = (la.clone(), lb.clone());
                let result = self.try_compare(&la, &lb);
                if result == CompareResult::LE
                    || result == CompareResult::LT
                    || result == CompareResult::EQ
                {
                    return Expr::bool_typed(true, ret.ty);
                }
                if result == CompareResult::GT {
                    return Expr::bool_typed(false, ret.ty);
                }
                if result == CompareResult::NE {
                    // a != b is known, so a <= b reduces to a < b
                    return self.apply_lt_rules(Expr::lt(la, lb));
                }
                if result == CompareResult::GE {
                    // a >= b is known, so a <= b reduces to a == b
                    return self.apply_eq_rules(Expr::eq(la, lb));
                }
            }
        }
        ret
    }

    pub(crate) fn visit_lt(&mut self, orig: &Expr) -> Expr {
        let ret = self.rebuild_binary(orig);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::Lt, a, b) {
                return folded;
            }
        }
        if let Some(matched) = self.try_match_literal_constraint(&ret) {
            return matched;
        }
        self.apply_lt_rules(ret)
    }

    pub(crate) fn apply_lt_rules(&mut self, ret: Expr) -> Expr {
        let ExprKind::Binary(BinOpKind::Lt, ..) = &ret.kind else {
            return ret;
        };
        let [x, y, z, s1, lanes] = pvars_expr();
        let [c1, c2] = pvars_int();
        let mut st = MatchState::new();

        // vector rules
        if ret.ty.is_vector() {
            try_rewrite!(
                self, st, ret,
                broadcast(x, lanes).lt(broadcast(y, lanes)),
                broadcast(x.lt(y), lanes)
            );
            try_rewrite!(
                self, st, ret,
                ramp(x, s1, lanes).lt(ramp(y, s1, lanes)),
                broadcast(x.lt(y), lanes)
            );
        }

        let operand_ty = binary_parts(&ret).0.ty;
        if operand_ty.is_index_type() {
            {
                let (a, b) = binary_parts(&ret);
                let (a, b) = (a.clone(), b.clone());
                let result = self.try_compare(&a, &b);
                if result == CompareResult::LT {
                    return Expr::bool_typed(true, ret.ty);
                }
                if result == CompareResult::EQ
                    || result == CompareResult::GT
                    || result == CompareResult::GE
                {
                    return Expr::bool_typed(false, ret.ty);
                }
            }

            try_rewrite!(self, st, ret, (x + y).lt(x + z), y.lt(z));
            try_rewrite!(self, st, ret, (x + y).lt(z + x), y.lt(z));
            try_rewrite!(self, st, ret, (y + x).lt(x + z), y.lt(z));
            try_rewrite!(self, st, ret, (y + x).lt(z + x), y.lt(z));
            try_rewrite!(self, st, ret, (y - x).lt(z - x), y.lt(z));
            try_rewrite!(self, st, ret, (x - y).lt(x - z), z.lt(y));

            try_rewrite!(self, st, ret, x.lt(x + z), pint(0).lt(z));
            try_rewrite!(self, st, ret, x.lt(z + x), pint(0).lt(z));
            try_rewrite!(self, st, ret, x.lt(x - z), z.lt(0));

            try_rewrite_if!(self, st, ret, (x * c1).lt(y * c1), x.lt(y), c1.val(&st) > 0);
            try_rewrite_if!(self, st, ret, (x * c1).lt(y * c1), y.lt(x), c1.val(&st) < 0);

            // constant cancellation: only one modulus is needed
            // truncated division
            try_rewrite_if!(
                self, st, ret,
                (x * c2).lt(c1),
                x.lt(truncdiv(c1 - 1, c2) + 1),
                c1.val(&st) > 0 && c2.val(&st) > 0
            );
            // truncated division required
            try_rewrite_if!(
                self, st, ret,
                (x * c2).lt(c1),
                x.lt(truncdiv(c1, c2)),
                c1.val(&st) <= 0 && c2.val(&st) > 0
            );
            // truncated division required (euclidean is fine too, floored is
            // not)
            try_rewrite_if!(
                self, st, ret,
                (x * c2).lt(c1),
                (truncdiv(c1 - 1, c2) - 1).lt(x),
                c1.val(&st) > 0 && c2.val(&st) < 0
            );
            // truncated division required (floored is fine too, euclidean is
            // not)
            try_rewrite_if!(
                self, st, ret,
                (x * c2).lt(c1),
                truncdiv(c1, c2).lt(x),
                c1.val(&st) <= 0 && c2.val(&st) < 0
            );
            // truncated division required
            try_rewrite_if!(
                self, st, ret,
                c1.lt(x * c2),
                (truncdiv(c1 + 1, c2) - 1).lt(x),
                c1.val(&st) < 0 && c2.val(&st) > 0
            );
            try_rewrite_if!(
                self, st, ret,
                c1.lt(x * c2),
                truncdiv(c1, c2).lt(x),
                c1.val(&st) >= 0 && c2.val(&st) > 0
            );
            // truncated division required (floored is fine too, euclidean is
            // not)
            try_rewrite_if!(
                self, st, ret,
                c1.lt(x * c2),
                x.lt(truncdiv(c1 + 1, c2) + 1),
                c1.val(&st) < 0 && c2.val(&st) < 0
            );
            // truncated division required (euclidean is fine too, floored is
            // not)
            try_rewrite_if!(
                self, st, ret,
                c1.lt(x * c2),
                x.lt(truncdiv(c1, c2)),
                c1.val(&st) >= 0 && c2.val(&st) < 0
            );

            // DivMod rules
            // truncated division
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x, c1).lt(c2),
                x.lt(c1 * c2),
                c1.val(&st) > 0 && c2.val(&st) > 0
            );
            // truncated division required
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x, c1).lt(c2),
                x.lt(c1 * (c2 - 1) + 1),
                c1.val(&st) > 0 && c2.val(&st) <= 0
            );
            try_rewrite_if!(
                self, st, ret,
                c1.lt(truncdiv(x, c2)),
                ((c1 + 1) * c2 - 1).lt(x),
                c1.val(&st) >= 0 && c2.val(&st) > 0
            );
            // truncated division required
            try_rewrite_if!(
                self, st, ret,
                c1.lt(truncdiv(x, c2)),
                (c1 * c2).lt(x),
                c1.val(&st) < 0 && c2.val(&st) > 0
            );

            // invariant for any division mode: x - (x / c1) * c1 == x % c1
            try_rewrite_if!(
                self, st, ret,
                (truncdiv(x, c1) * c1).lt(x),
                pint(0).lt(truncmod(x, c1)),
                c1.val(&st) > 0
            );
            try_rewrite_if!(
                self, st, ret,
                (truncdiv(x, c1) * c1).lt(x + y),
                pint(0).lt(truncmod(x, c1) + y),
                c1.val(&st) > 0
            );
            try_rewrite_if!(
                self, st, ret,
                (truncdiv(x, c1) * c1).lt(x - y),
                y.lt(truncmod(x, c1)),
                c1.val(&st) > 0
            );

            try_rewrite_if!(
                self, st, ret,
                (truncdiv(x + c2, c1) * c1).lt(x),
                c2.lt(truncmod(x + c2, c1)),
                c1.val(&st) > 0
            );
            try_rewrite_if!(
                self, st, ret,
                (truncdiv(x + c2, c1) * c1).lt(x + y),
                c2.lt(truncmod(x + c2, c1) + y),
                c1.val(&st) > 0
            );
            try_rewrite_if!(
                self, st, ret,
                (truncdiv(x + c2, c1) * c1).lt(x - y),
                y.lt(truncmod(x + c2, c1) + (0 - c2)),
                c1.val(&st) > 0
            );

            // floored division
            try_rewrite_if!(
                self, st, ret,
                floordiv(x, c1).lt(c2),
                x.lt(c1 * c2),
                c1.val(&st) > 0
            );
            try_rewrite_if!(
                self, st, ret,
                c1.lt(floordiv(x, c2)),
                ((c1 + 1) * c2 - 1).lt(x),
                c2.val(&st) > 0
            );

            try_rewrite_if!(
                self, st, ret,
                (floordiv(x, c1) * c1).lt(x),
                pint(0).lt(floormod(x, c1)),
                c1.val(&st) > 0
            );
            try_rewrite_if!(
                self, st, ret,
                (floordiv(x, c1) * c1).lt(x + y),
                pint(0).lt(floormod(x, c1) + y),
                c1.val(&st) > 0
            );
            try_rewrite_if!(
                self, st, ret,
                (floordiv(x, c1) * c1).lt(x - y),
                y.lt(floormod(x, c1)),
                c1.val(&st) > 0
            );
            try_rewrite_if!(
                self, st, ret,
                (floordiv(x + c2, c1) * c1).lt(x),
                c2.lt(floormod(x + c2, c1)),
                c1.val(&st) > 0
            );
            try_rewrite_if!(
                self, st, ret,
                (floordiv(x + c2, c1) * c1).lt(x + y),
                c2.lt(floormod(x + c2, c1) + y),
                c1.val(&st) > 0
            );
            try_rewrite_if!(
                self, st, ret,
                (floordiv(x + c2, c1) * c1).lt(x - y),
                y.lt(floormod(x + c2, c1) + (0 - c2)),
                c1.val(&st) > 0
            );

            // canonicalization: push comparisons through min/max
            try_recursive_rewrite!(self, st, ret, min(x, y).lt(z), x.lt(z).or(y.lt(z)));
            try_recursive_rewrite!(self, st, ret, max(x, y).lt(z), x.lt(z).and(y.lt(z)));
            try_recursive_rewrite!(self, st, ret, z.lt(min(x, y)), z.lt(x).and(z.lt(y)));
            try_recursive_rewrite!(self, st, ret, z.lt(max(x, y)), z.lt(x).or(z.lt(y)));

            try_recursive_rewrite!(
                self, st, ret,
                matches_one_of((c1.lt(x + c2), (c1 - x).lt(c2))),
                (c1 - c2).lt(x)
            );
            try_recursive_rewrite!(
                self, st, ret,
                matches_one_of((c1.lt(c2 - x), (x + c1).lt(c2))),
                x.lt(c2 - c1)
            );
            try_recursive_rewrite!(self, st, ret, c1.lt(x - c2), (c1 + c2).lt(x));
            try_recursive_rewrite!(self, st, ret, (x - c2).lt(c1), x.lt(c1 + c2));

            try_recursive_rewrite!(self, st, ret, x.lt(c1 - y), (x + y).lt(c1));
            try_recursive_rewrite!(self, st, ret, (c1 - y).lt(x), c1.lt(x + y));

            try_recursive_rewrite!(self, st, ret, x.lt(c1 + y), (x - y).lt(c1));
            try_recursive_rewrite!(self, st, ret, (c1 + y).lt(x), c1.lt(x - y));

            // merge constant offsets on both sides
            let merged = {
                let (la, lb) = binary_parts(&ret);
                let (lhs, lhs_offset) = extract_constant_offset(la);
                let (rhs, rhs_offset) = extract_constant_offset(lb);
                if lhs_offset == 0 && rhs_offset == 0 {
                    None
                } else {
                    let diff = rhs_offset - lhs_offset;
                    if diff == 0 {
                        Some(Expr::lt(lhs, rhs))
                    } else if diff == 1 {
                        Some(Expr::le(lhs, rhs))
                    } else if diff < 0 && rhs_offset != 0 {
                        let shift = Expr::int(-diff, lhs.ty);
                        Some(Expr::lt(fold_or_build(BinOpKind::Add, lhs, shift), rhs))
                    } else if diff > 0 && lhs_offset != 0 {
                        let shift = Expr::int(diff, rhs.ty);
                        Some(Expr::lt(lhs, fold_or_build(BinOpKind::Add, rhs, shift)))
                    } else {
                        None
                    }
                }
            };
            if let Some(merged) = merged {
                return self.recursive_rewrite(merged);
            }

            // divide both sides by the common factor of their modular sets
            let common_factor = {
                let (la, lb) = binary_parts(&ret);
                let modular_a = self.analyzer.modular_set(la);
                let modular_b = self.analyzer.modular_set(lb);
                let gcd_lhs = zero_aware_gcd(modular_a.base, modular_a.coeff);
                let gcd_rhs = zero_aware_gcd(modular_b.base, modular_b.coeff);
                zero_aware_gcd(gcd_lhs, gcd_rhs)
            };
            if common_factor > 1 {
                let (la, lb) = binary_parts(&ret);
                let (la, lb) = (la.clone(), lb.clone());
                let factor_l = Expr::int(common_factor, la.ty);
                let factor_r = Expr::int(common_factor, lb.ty);
                let scaled = Expr::lt(
                    fold_or_build(BinOpKind::FloorDiv, la, factor_l),
                    fold_or_build(BinOpKind::FloorDiv, lb, factor_r),
                );
                return self.recursive_rewrite(scaled);
            }
        }
        ret
    }

    pub(crate) fn visit_not(&mut self, orig: &Expr) -> Expr {
        let ExprKind::Not(a) = &orig.kind else {
            unreachable!("visit_not on a non-negation node")
        };
        let na = self.visit_expr(a);
        let ret = if Expr::ptr_eq(&na, a) {
            orig.clone()
        } else {
            Expr::not(na)
        };
        {
            let ExprKind::Not(a) = &ret.kind else {
                unreachable!()
            };
            if let Some(folded) = try_not_fold(a) {
                return folded;
            }
        }
        if let Some(matched) = self.try_match_literal_constraint(&ret) {
            return matched;
        }
        self.apply_not_rules(ret)
    }

    pub(crate) fn apply_not_rules(&mut self, ret: Expr) -> Expr {
        let ExprKind::Not(_) = &ret.kind else {
            return ret;
        };
        let [x, y, lanes] = pvars_expr();
        let mut st = MatchState::new();

        if ret.ty.is_vector() {
            try_rewrite!(self, st, ret, !broadcast(x, lanes), broadcast(!x, lanes));
        }

        try_rewrite!(self, st, ret, !!x, x);
        try_rewrite!(self, st, ret, !(x.le(y)), y.lt(x));
        try_rewrite!(self, st, ret, !(x.ge(y)), x.lt(y));
        try_rewrite!(self, st, ret, !(x.lt(y)), y.le(x));
        try_rewrite!(self, st, ret, !(x.gt(y)), x.le(y));
        try_rewrite!(self, st, ret, !(x.eq(y)), x.ne(y));
        try_rewrite!(self, st, ret, !(x.ne(y)), x.eq(y));
        try_recursive_rewrite!(self, st, ret, !(x.or(y)), (!x).and(!y));
        try_recursive_rewrite!(self, st, ret, !(x.and(y)), (!x).or(!y));
        ret
    }
}
