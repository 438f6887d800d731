//! Rewrite rules for binary minimum and maximum.

use crate::ast::util::contains_vscale_call;
use crate::ast::{BinOpKind, Expr};

use super::const_fold::{fold_or_build, try_binary_fold};
use super::pattern::{
    broadcast, floordiv, matches_one_of, max, min, pmatch, pvars_expr, pvars_int, select,
    truncdiv, try_recursive_rewrite, try_recursive_rewrite_if, try_rewrite, try_rewrite_if,
    MatchState, PatternNode,
};
use super::{binary_parts, RewriteSimplifier};

impl RewriteSimplifier<'_> {
    pub(crate) fn visit_min(&mut self, orig: &Expr) -> Expr {
        let ret = self.rebuild_binary(orig);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::Min, a, b) {
                return folded;
            }
        }
        let [x, y, z, s1, s2, lanes] = pvars_expr();
        let [c1, c2] = pvars_int();
        let mut st = MatchState::new();

        // vector rules
        if ret.ty.is_vector() {
            try_rewrite!(
                self, st, ret,
                min(broadcast(x, lanes), broadcast(y, lanes)),
                broadcast(min(x, y), lanes)
            );
            try_rewrite!(
                self, st, ret,
                min(min(x, broadcast(y, lanes)), broadcast(z, lanes)),
                min(x, broadcast(min(y, z), lanes))
            );
        }
        if ret.ty.is_index_type() {
            try_rewrite!(self, st, ret, min(x, x), x);

            // constant int bound
            {
                let (a, b) = binary_parts(&ret);
                let a_bound = self.analyzer.const_int_bound(a);
                let b_bound = self.analyzer.const_int_bound(b);
                if a_bound.max_value <= b_bound.min_value {
                    return a.clone();
                }
                if b_bound.max_value <= a_bound.min_value {
                    return b.clone();
                }
            }

            // constant comparison
            if pmatch!(st, ret, min(x + c1, x + c2)) {
                let chosen = if c1.val(&st) < c2.val(&st) { x + c1 } else { x + c2 };
                return chosen.0.eval(&st, Some(&ret.ty));
            }
            if pmatch!(st, ret, min(x + c1, x)) || pmatch!(st, ret, min(x, x + c1)) {
                return if c1.val(&st) < 0 {
                    (x + c1).0.eval(&st, Some(&ret.ty))
                } else {
                    x.get(&st)
                };
            }
            if pmatch!(st, ret, min(c1 - x, c2 - x)) {
                let chosen = if c1.val(&st) < c2.val(&st) { c1 - x } else { c2 - x };
                return chosen.0.eval(&st, Some(&ret.ty));
            }

            // DivMod rules: truncdiv(x, y) >= floordiv(x, y), so the
            // round-up forms below hold in both families
            try_rewrite_if!(
                self, st, ret,
                matches_one_of((
                    min(truncdiv(x + c1, c2) * c2, x),
                    min(x, truncdiv(x + c1, c2) * c2),
                    min(floordiv(x + c1, c2) * c2, x),
                    min(x, floordiv(x + c1, c2) * c2),
                )),
                x,
                c2.val(&st) > 0 && c1.val(&st) + 1 == c2.val(&st)
            );

            try_rewrite_if!(
                self, st, ret,
                matches_one_of((
                    min(truncdiv(x + c1, c2) * c2, max(x, c2)),
                    min(max(x, c2), truncdiv(x + c1, c2) * c2),
                    min(floordiv(x + c1, c2) * c2, max(x, c2)),
                    min(max(x, c2), floordiv(x + c1, c2) * c2),
                )),
                max(x, c2),
                c2.val(&st) > 0
                    && c1.val(&st) + 1 == c2.val(&st)
                    && self.can_prove_greater_equal(&x.get(&st), 1)
            );

            // floored division
            try_rewrite_if!(
                self, st, ret,
                matches_one_of((min(x, floordiv(x, c2) * c2), min(floordiv(x, c2) * c2, x))),
                floordiv(x, c2) * c2,
                c2.val(&st) > 0
            );

            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    min(max(x, y), min(x, y)),
                    min(max(x, y), min(y, x)),
                    min(min(x, y), max(x, y)),
                    min(min(x, y), max(y, x)),
                    min(min(x, y), x),
                    min(min(x, y), y),
                    min(x, min(x, y)),
                    min(y, min(x, y)),
                )),
                min(x, y)
            );

            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    min(max(x, y), x),
                    min(max(y, x), x),
                    min(x, max(x, y)),
                    min(x, max(y, x)),
                )),
                x
            );

            try_rewrite!(self, st, ret, min(min(min(x, y), z), y), min(min(x, y), z));
            try_rewrite!(
                self, st, ret,
                min(min(min(min(x, y), z), s1), y),
                min(min(min(x, y), z), s1)
            );
            try_rewrite!(
                self, st, ret,
                min(min(min(min(min(x, y), z), s1), s2), y),
                min(min(min(min(x, y), z), s1), s2)
            );

            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    min(max(x, y), max(x, z)),
                    min(max(x, y), max(z, x)),
                    min(max(y, x), max(x, z)),
                    min(max(y, x), max(z, x)),
                )),
                max(min(y, z), x)
            );

            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    min(min(x, y), min(x, z)),
                    min(min(x, y), min(z, x)),
                    min(min(y, x), min(x, z)),
                    min(min(y, x), min(z, x)),
                )),
                min(min(y, z), x)
            );

            // add distribution
            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    min(y + x, z + x),
                    min(y + x, x + z),
                    min(x + y, x + z),
                    min(x + y, z + x),
                )),
                min(y, z) + x
            );

            // sub distribution
            try_rewrite!(self, st, ret, min(y - x, z - x), min(y, z) - x);
            try_rewrite!(self, st, ret, min(x - y, x - z), x - max(y, z));

            // constant folding rule
            try_rewrite!(self, st, ret, min(min(x, c1), c2), min(x, min(c1, c2)));

            // scaling rules
            // truncated division
            if pmatch!(st, ret, min(truncdiv(x, c1), truncdiv(y, c1))) {
                let pat = if c1.val(&st) > 0 {
                    truncdiv(min(x, y), c1)
                } else {
                    truncdiv(max(x, y), c1)
                };
                return pat.0.eval(&st, Some(&ret.ty));
            }
            // floored division
            if pmatch!(st, ret, min(floordiv(x, c1), floordiv(y, c1))) {
                let pat = if c1.val(&st) > 0 {
                    floordiv(min(x, y), c1)
                } else {
                    floordiv(max(x, y), c1)
                };
                return pat.0.eval(&st, Some(&ret.ty));
            }
            if pmatch!(st, ret, min(x * c1, y * c1)) {
                let pat = if c1.val(&st) > 0 {
                    min(x, y) * c1
                } else {
                    max(x, y) * c1
                };
                return pat.0.eval(&st, Some(&ret.ty));
            }
            if pmatch!(st, ret, min(x * c1, c2)) {
                let c1v = c1.val(&st);
                let c2v = c2.val(&st);
                if c1v == 0 {
                    return if c2v < 0 { c2.get(&st) } else { c1.get(&st) };
                }
                if c2v % c1v == 0 {
                    let quotient = Expr::int(c2v / c1v, ret.ty);
                    let inner = if c1v > 0 {
                        Expr::min(x.get(&st), quotient)
                    } else {
                        Expr::max(x.get(&st), quotient)
                    };
                    return fold_or_build(BinOpKind::Mul, inner, c1.get(&st));
                }
            }

            // vscale expression comparison
            {
                let (a, b) = binary_parts(&ret);
                if contains_vscale_call(a) || contains_vscale_call(b) {
                    let (a, b) = (a.clone(), b.clone());
                    if self.can_prove(&Expr::le(a.clone(), b.clone())) {
                        return a;
                    }
                    if self.can_prove(&Expr::le(b.clone(), a))  {
                        return b;
                    }
                }
            }

            // canonicalization: constants rotate to the outside
            try_recursive_rewrite!(self, st, ret, min(min(x, c1), y), min(min(x, y), c1));
            try_recursive_rewrite_if!(
                self, st, ret,
                min(c1 - x, c2),
                c1 - max(x, c1 - c2),
                c2.val(&st) != 0
            );
        }

        // condition rules
        try_rewrite!(
            self, st, ret,
            min(select(x, y, z), select(x, s1, s2)),
            select(x, min(y, s1), min(z, s2))
        );
        ret
    }

    pub(crate) fn visit_max(&mut self, orig: &Expr) -> Expr {
        let ret = self.rebuild_binary(orig);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::Max, a, b) {
                return folded;
            }
        }
        let [x, y, z, s1, s2, lanes] = pvars_expr();
        let [c1, c2] = pvars_int();
        let mut st = MatchState::new();

        // vector rules
        if ret.ty.is_vector() {
            try_rewrite!(
                self, st, ret,
                max(broadcast(x, lanes), broadcast(y, lanes)),
                broadcast(max(x, y), lanes)
            );
            try_rewrite!(
                self, st, ret,
                max(max(x, broadcast(y, lanes)), broadcast(z, lanes)),
                max(x, broadcast(max(y, z), lanes))
            );
        }
        if ret.ty.is_index_type() {
            try_rewrite!(self, st, ret, max(x, x), x);

            // constant int bound
            {
                let (a, b) = binary_parts(&ret);
                let a_bound = self.analyzer.const_int_bound(a);
                let b_bound = self.analyzer.const_int_bound(b);
                if a_bound.min_value >= b_bound.max_value {
                    return a.clone();
                }
                if b_bound.min_value >= a_bound.max_value {
                    return b.clone();
                }
            }

            // constant comparison
            if pmatch!(st, ret, max(x + c1, x + c2)) {
                let chosen = if c1.val(&st) > c2.val(&st) { x + c1 } else { x + c2 };
                return chosen.0.eval(&st, Some(&ret.ty));
            }
            if pmatch!(st, ret, max(x + c1, x)) || pmatch!(st, ret, max(x, x + c1)) {
                return if c1.val(&st) > 0 {
                    (x + c1).0.eval(&st, Some(&ret.ty))
                } else {
                    x.get(&st)
                };
            }
            if pmatch!(st, ret, max(c1 - x, c2 - x)) {
                let chosen = if c1.val(&st) > c2.val(&st) { c1 - x } else { c2 - x };
                return chosen.0.eval(&st, Some(&ret.ty));
            }

            // DivMod rules
            // round-up division: truncated family
            try_rewrite_if!(
                self, st, ret,
                matches_one_of((
                    max(truncdiv(x + c1, c2) * c2, x),
                    max(x, truncdiv(x + c1, c2) * c2),
                )),
                truncdiv(x + c1, c2) * c2,
                c2.val(&st) > 0 && c1.val(&st) + 1 == c2.val(&st)
            );
            // round-up division: floored family
            try_rewrite_if!(
                self, st, ret,
                matches_one_of((
                    max(floordiv(x + c1, c2) * c2, x),
                    max(x, floordiv(x + c1, c2) * c2),
                )),
                floordiv(x + c1, c2) * c2,
                c2.val(&st) > 0 && c1.val(&st) + 1 == c2.val(&st)
            );

            // floored division
            try_rewrite_if!(
                self, st, ret,
                matches_one_of((max(floordiv(x, c2) * c2, x), max(x, floordiv(x, c2) * c2))),
                x,
                c2.val(&st) > 0
            );

            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    max(min(x, y), x),
                    max(min(y, x), x),
                    max(x, min(x, y)),
                    max(x, min(y, x)),
                )),
                x
            );

            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    max(min(x, y), max(x, y)),
                    max(min(x, y), max(y, x)),
                    max(max(x, y), min(x, y)),
                    max(max(x, y), min(y, x)),
                    max(max(x, y), x),
                    max(max(x, y), y),
                    max(x, max(x, y)),
                    max(y, max(x, y)),
                )),
                max(x, y)
            );

            try_rewrite!(self, st, ret, max(max(max(x, y), z), y), max(max(x, y), z));
            try_rewrite!(
                self, st, ret,
                max(max(max(max(x, y), z), s1), y),
                max(max(max(x, y), z), s1)
            );
            try_rewrite!(
                self, st, ret,
                max(max(max(max(max(x, y), z), s1), s2), y),
                max(max(max(max(x, y), z), s1), s2)
            );

            // max/max cancellation
            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    max(max(x, y), max(x, z)),
                    max(max(x, y), max(z, x)),
                    max(max(y, x), max(x, z)),
                    max(max(y, x), max(z, x)),
                )),
                max(max(y, z), x)
            );

            // max/min distribution
            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    max(min(x, y), min(x, z)),
                    max(min(x, y), min(z, x)),
                    max(min(y, x), min(x, z)),
                    max(min(y, x), min(z, x)),
                )),
                min(max(y, z), x)
            );

            // add distribution
            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    max(y + x, z + x),
                    max(y + x, x + z),
                    max(x + y, x + z),
                    max(x + y, z + x),
                )),
                max(y, z) + x
            );

            // sub distribution
            try_rewrite!(self, st, ret, max(y - x, z - x), max(y, z) - x);
            try_rewrite!(self, st, ret, max(x - y, x - z), x - min(y, z));

            // constant folding rule
            try_rewrite!(self, st, ret, max(max(x, c1), c2), max(x, max(c1, c2)));

            // scaling rules
            // truncated division
            if pmatch!(st, ret, max(truncdiv(x, c1), truncdiv(y, c1))) {
                let pat = if c1.val(&st) > 0 {
                    truncdiv(max(x, y), c1)
                } else {
                    truncdiv(min(x, y), c1)
                };
                return pat.0.eval(&st, Some(&ret.ty));
            }
            // floored division
            if pmatch!(st, ret, max(floordiv(x, c1), floordiv(y, c1))) {
                let pat = if c1.val(&st) > 0 {
                    floordiv(max(x, y), c1)
                } else {
                    floordiv(min(x, y), c1)
                };
                return pat.0.eval(&st, Some(&ret.ty));
            }
            if pmatch!(st, ret, max(x * c1, y * c1)) {
                let pat = if c1.val(&st) > 0 {
                    max(x, y) * c1
                } else {
                    min(x, y) * c1
                };
                return pat.0.eval(&st, Some(&ret.ty));
            }
            if pmatch!(st, ret, max(x * c1, c2)) {
                let c1v = c1.val(&st);
                let c2v = c2.val(&st);
                if c1v == 0 {
                    return if c2v > 0 { c2.get(&st) } else { c1.get(&st) };
                }
                if c2v % c1v == 0 {
                    let quotient = Expr::int(c2v / c1v, ret.ty);
                    let inner = if c1v > 0 {
                        Expr::max(x.get(&st), quotient)
                    } else {
                        Expr::min(x.get(&st), quotient)
                    };
                    return fold_or_build(BinOpKind::Mul, inner, c1.get(&st));
                }
            }

            // vscale expression comparison
            {
                let (a, b) = binary_parts(&ret);
                if contains_vscale_call(a) || contains_vscale_call(b) {
                    let (a, b) = (a.clone(), b.clone());
                    if self.can_prove(&Expr::ge(a.clone(), b.clone())) {
                        return a;
                    }
                    if self.can_prove(&Expr::ge(b.clone(), a)) {
                        return b;
                    }
                }
            }

            // canonicalization: constants rotate to the outside
            try_recursive_rewrite!(self, st, ret, max(max(x, c1), y), max(max(x, y), c1));
            try_recursive_rewrite_if!(
                self, st, ret,
                max(c1 - x, c2),
                c1 - min(x, c1 - c2),
                c2.val(&st) != 0
            );
        }

        // condition rules
        try_rewrite!(
            self, st, ret,
            max(select(x, y, z), select(x, s1, s2)),
            select(x, max(y, s1), max(z, s2))
        );
        ret
    }
}
