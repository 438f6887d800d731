//! Rewrite rules for the two division families.
//!
//! Truncated division rounds towards zero and is not linear across sign
//! changes, so almost every truncated rule needs a proven non-negative
//! dividend. Floored division is linear on multiples of the divisor and
//! rewrites far more aggressively.

use crate::analysis::bound::{floordiv as floordiv64, floormod as floormod64};
use crate::ast::util::contains_vscale_call;
use crate::ast::{BinOpKind, Expr};

use super::const_fold::{fold_or_build, try_binary_fold};
use super::pattern::{
    broadcast, floordiv, floormod, matches_one_of, max, min, one_like, pmatch, pvars_expr,
    pvars_int, ramp, truncdiv, truncmod, try_recursive_rewrite_if, try_rewrite, try_rewrite_if,
    zero_like, MatchState, PatternNode,
};
use super::{binary_parts, RewriteSimplifier};

impl RewriteSimplifier<'_> {
    pub(crate) fn visit_truncdiv(&mut self, orig: &Expr) -> Expr {
        let ret = self.rebuild_binary(orig);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::Div, a, b) {
                return folded;
            }
            // x / c becomes x * (1/c) on floats
            if ret.ty.is_float() {
                if let Some(v) = b.as_const_float() {
                    if v != 0.0 {
                        let recip = Expr::float(1.0 / v, b.ty);
                        return fold_or_build(BinOpKind::Mul, a.clone(), recip);
                    }
                }
            }
        }
        let [x, y, z, b1, lanes] = pvars_expr();
        let [c1, c2, c3] = pvars_int();
        let mut st = MatchState::new();

        // Vector rules
        if ret.ty.is_vector() {
            // div works on both families here because the operands are
            // element-wise equal
            try_rewrite!(
                self, st, ret,
                truncdiv(broadcast(x, lanes), broadcast(y, lanes)),
                broadcast(truncdiv(x, y), lanes)
            );
            // ramp / broadcast
            if pmatch!(st, ret, truncdiv(ramp(b1, c1, lanes), broadcast(c2, lanes))) {
                let c1v = c1.val(&st);
                let c2v = c2.val(&st);
                if c2v != 0 {
                    if c1v % c2v == 0 {
                        let pat = ramp(truncdiv(b1, c2), truncdiv(c1, c2), lanes);
                        return pat.0.eval(&st, Some(&ret.ty));
                    }
                    // all indices of the ramp may land on the same quotient
                    let base = b1.get(&st);
                    let lanes_e = lanes.get(&st);
                    if self.can_prove_greater_equal(&base, 0) && !contains_vscale_call(&lanes_e) {
                        if let Some(lanes_int) = lanes_e.as_const_int() {
                            let bmod = self.analyzer.modular_set(&base);
                            let ramp_min = bmod.base.wrapping_div(c2v);
                            let last = bmod.base.wrapping_add((lanes_int - 1).wrapping_mul(c1v));
                            let ramp_max = last.wrapping_div(c2v);
                            if bmod.coeff % c2v == 0 && ramp_min == ramp_max {
                                let pat = broadcast(truncdiv(b1, c2), lanes);
                                return pat.0.eval(&st, Some(&ret.ty));
                            }
                        }
                    }
                }
            }
        }

        if ret.ty.is_index_type() {
            // The rules below are truncated division; most need
            // non-negative operands.

            // always true for truncated division, restricted to the common
            // positive-divisor case
            try_rewrite_if!(
                self, st, ret,
                truncdiv(truncdiv(x, c1), c2),
                truncdiv(x, c1 * c2),
                c1.val(&st) > 0 && c2.val(&st) > 0
            );

            try_rewrite_if!(
                self, st, ret,
                truncdiv(truncdiv(x, c1) + c2, c3),
                truncdiv(x + c1 * c2, c1 * c3),
                c1.val(&st) > 0
                    && c2.val(&st) >= 0
                    && c3.val(&st) > 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
            );

            if pmatch!(st, ret, truncdiv(x * c1, c2)) {
                let c1v = c1.val(&st);
                let c2v = c2.val(&st);
                if c1v > 0 && c2v > 0 {
                    if c1v % c2v == 0 {
                        let pat = x * truncdiv(c1, c2);
                        return pat.0.eval(&st, Some(&ret.ty));
                    }
                    if c2v % c1v == 0 {
                        let pat = truncdiv(x, truncdiv(c2, c1));
                        return pat.0.eval(&st, Some(&ret.ty));
                    }
                }
            }

            try_rewrite!(self, st, ret, truncdiv(x, x), one_like(x));
            try_rewrite!(
                self, st, ret,
                matches_one_of((truncdiv(x * c1, x), truncdiv(c1 * x, x))),
                c1
            );

            // rules involving 2 operands
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x * c1 + y, c2),
                x * truncdiv(c1, c2) + truncdiv(y, c2),
                c1.val(&st) >= 0
                    && c2.val(&st) > 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
                    && self.can_prove_greater_equal(&y.get(&st), 0)
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(min(x * c1, y), c2),
                min(x * truncdiv(c1, c2), truncdiv(y, c2)),
                c1.val(&st) >= 0
                    && c2.val(&st) > 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
                    && self.can_prove_greater_equal(&y.get(&st), 0)
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(max(x * c1, y), c2),
                max(x * truncdiv(c1, c2), truncdiv(y, c2)),
                c1.val(&st) >= 0
                    && c2.val(&st) > 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
                    && self.can_prove_greater_equal(&y.get(&st), 0)
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(y + x * c1, c2),
                truncdiv(y, c2) + x * truncdiv(c1, c2),
                c1.val(&st) >= 0
                    && c2.val(&st) > 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
                    && self.can_prove_greater_equal(&y.get(&st), 0)
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(min(y, x * c1), c2),
                min(truncdiv(y, c2), x * truncdiv(c1, c2)),
                c1.val(&st) >= 0
                    && c2.val(&st) > 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
                    && self.can_prove_greater_equal(&y.get(&st), 0)
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(max(y, x * c1), c2),
                max(truncdiv(y, c2), x * truncdiv(c1, c2)),
                c1.val(&st) >= 0
                    && c2.val(&st) > 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
                    && self.can_prove_greater_equal(&y.get(&st), 0)
            );

            // rules involving 3 operands
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x * c1 + y + z, c2),
                x * truncdiv(c1, c2) + truncdiv(y + z, c2),
                c1.val(&st) >= 0
                    && c2.val(&st) > 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
                    && {
                        let yz = (y + z).0.eval(&st, None);
                        self.can_prove_greater_equal(&yz, 0)
                    }
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x * c1 - y + z, c2),
                x * truncdiv(c1, c2) + truncdiv(z - y, c2),
                c1.val(&st) >= 0
                    && c2.val(&st) > 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
                    && {
                        let zy = (z - y).0.eval(&st, None);
                        self.can_prove_greater_equal(&zy, 0)
                    }
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x * c1 + y - z, c2),
                x * truncdiv(c1, c2) + truncdiv(y - z, c2),
                c1.val(&st) >= 0
                    && c2.val(&st) > 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
                    && {
                        let yz = (y - z).0.eval(&st, None);
                        self.can_prove_greater_equal(&yz, 0)
                    }
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(y + x * c1 + z, c2),
                x * truncdiv(c1, c2) + truncdiv(y + z, c2),
                c1.val(&st) > 0
                    && c2.val(&st) > 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
                    && {
                        let yz = (y + z).0.eval(&st, None);
                        self.can_prove_greater_equal(&yz, 0)
                    }
            );

            try_rewrite_if!(
                self, st, ret,
                truncdiv(x + c1, c2),
                truncdiv(x, c2) + truncdiv(c1, c2),
                c1.val(&st) > 0
                    && c2.val(&st) > 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
            );

            try_rewrite_if!(
                self, st, ret,
                matches_one_of((truncdiv(x + y, x), truncdiv(y + x, x))),
                truncdiv(y, x) + 1,
                self.can_prove_greater_equal(&x.get(&st), 0)
                    && self.can_prove_greater_equal(&y.get(&st), 0)
            );
            try_rewrite_if!(
                self, st, ret,
                matches_one_of((
                    truncdiv((x + y) + z, x),
                    truncdiv((y + x) + z, x),
                    truncdiv(y + (z + x), x),
                    truncdiv(y + (x + z), x),
                )),
                truncdiv(y + z, x) + 1,
                self.can_prove_greater_equal(&x.get(&st), 0) && {
                    let yz = (y + z).0.eval(&st, None);
                    self.can_prove_greater_equal(&yz, 0)
                }
            );

            try_rewrite_if!(
                self, st, ret,
                matches_one_of((truncdiv(x * y, y), truncdiv(y * x, y))),
                x,
                self.can_prove_greater_equal(&x.get(&st), 0)
                    && self.can_prove_greater_equal(&y.get(&st), 0)
            );

            try_rewrite_if!(
                self, st, ret,
                matches_one_of((truncdiv(x * z + y, z), truncdiv(z * x + y, z))),
                x + truncdiv(y, z),
                self.can_prove_greater_equal(&x.get(&st), 0)
                    && self.can_prove_greater_equal(&y.get(&st), 0)
                    && self.can_prove_greater_equal(&z.get(&st), 0)
            );
            try_rewrite_if!(
                self, st, ret,
                matches_one_of((truncdiv(y + x * z, z), truncdiv(y + z * x, z))),
                truncdiv(y, z) + x,
                self.can_prove_greater_equal(&x.get(&st), 0)
                    && self.can_prove_greater_equal(&y.get(&st), 0)
                    && self.can_prove_greater_equal(&z.get(&st), 0)
            );
        }
        ret
    }

    pub(crate) fn visit_truncmod(&mut self, orig: &Expr) -> Expr {
        let ret = self.rebuild_binary(orig);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::Mod, a, b) {
                return folded;
            }
        }
        let [x, y, b1, lanes] = pvars_expr();
        let [c1, c2] = pvars_int();
        let mut st = MatchState::new();

        // Vector rules
        if ret.ty.is_vector() {
            try_rewrite!(
                self, st, ret,
                truncmod(broadcast(x, lanes), broadcast(y, lanes)),
                broadcast(truncmod(x, y), lanes)
            );

            // ramp % broadcast
            if pmatch!(st, ret, truncmod(ramp(b1, c1, lanes), broadcast(c2, lanes))) {
                let c1v = c1.val(&st);
                let c2v = c2.val(&st);
                if c2v != 0 {
                    if c1v % c2v == 0 {
                        let pat = broadcast(truncmod(b1, c2), lanes);
                        return pat.0.eval(&st, Some(&ret.ty));
                    }
                    let base = b1.get(&st);
                    if self.can_prove_greater_equal(&base, 0) {
                        let bmod = self.analyzer.modular_set(&base);
                        let lanes_e = lanes.get(&st);
                        if !contains_vscale_call(&lanes_e) {
                            if let Some(lanes_int) = lanes_e.as_const_int() {
                                if bmod.coeff % c2v == 0 {
                                    let new_base =
                                        Expr::int(bmod.base.wrapping_rem(c2v), base.ty);
                                    let ramp_min = bmod.base.wrapping_div(c2v);
                                    let last = bmod
                                        .base
                                        .wrapping_add((lanes_int - 1).wrapping_mul(c1v));
                                    let ramp_max = last.wrapping_div(c2v);
                                    let new_ramp =
                                        Expr::ramp(new_base, c1.get(&st), lanes_e.clone());
                                    if ramp_min == ramp_max {
                                        return new_ramp;
                                    }
                                    let bcast = Expr::broadcast(c2.get(&st), lanes_e);
                                    return Expr::truncmod(new_ramp, bcast);
                                }
                            }
                        } else if bmod.coeff % c2v == 0 {
                            // scalable vectors: lanes cannot be enumerated,
                            // only the base can be reduced
                            let new_base = Expr::int(bmod.base.wrapping_rem(c2v), base.ty);
                            let new_ramp = Expr::ramp(new_base, c1.get(&st), lanes_e.clone());
                            let bcast = Expr::broadcast(c2.get(&st), lanes_e);
                            return Expr::truncmod(new_ramp, bcast);
                        }
                    }
                }
            }
        }

        if ret.ty.is_index_type() {
            // truncated modulus; non-negativity guards throughout
            try_rewrite_if!(
                self, st, ret,
                truncmod(x * c1, c2),
                zero_like(x),
                c2.val(&st) != 0 && c1.val(&st) % c2.val(&st) == 0
            );

            try_rewrite_if!(
                self, st, ret,
                truncmod(x * c1 + y, c2),
                truncmod(y, c2),
                c2.val(&st) > 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && {
                        let xc1 = (x * c1).0.eval(&st, None);
                        self.can_prove_greater_equal(&xc1, 0)
                    }
                    && self.can_prove_greater_equal(&y.get(&st), 0)
            );

            try_rewrite_if!(
                self, st, ret,
                truncmod(x + c1, c2),
                truncmod(x, c2),
                c2.val(&st) > 0
                    && c1.val(&st) >= 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
            );

            try_rewrite_if!(
                self, st, ret,
                truncmod(x + y * c1, c2),
                truncmod(x, c2),
                c2.val(&st) > 0
                    && c1.val(&st) % c2.val(&st) == 0
                    && self.can_prove_greater_equal(&x.get(&st), 0)
                    && {
                        let yc1 = (y * c1).0.eval(&st, None);
                        self.can_prove_greater_equal(&yc1, 0)
                    }
            );

            // canonicalization: x % c == x % (-c) under truncated division
            try_recursive_rewrite_if!(
                self, st, ret,
                truncmod(x, c1),
                truncmod(x, 0 - c1),
                c1.val(&st) < 0
            );

            // modular set analysis; truncation needs the non-negative proof
            if pmatch!(st, ret, truncmod(x, c1)) {
                let c1v = c1.val(&st);
                let xe = x.get(&st);
                if c1v > 0 {
                    let xmod = self.analyzer.modular_set(&xe);
                    if xmod.coeff % c1v == 0 && self.can_prove_greater_equal(&xe, 0) {
                        return Expr::int(xmod.base.wrapping_rem(c1v), ret.ty);
                    }
                }
            }
        }
        ret
    }

    pub(crate) fn visit_floordiv(&mut self, orig: &Expr) -> Expr {
        let ret = self.rebuild_binary(orig);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::FloorDiv, a, b) {
                return folded;
            }
        }
        let [x, y, z, b1, lanes] = pvars_expr();
        let [c1, c2, c3] = pvars_int();
        let mut st = MatchState::new();

        // Vector rules
        if ret.ty.is_vector() {
            try_rewrite!(
                self, st, ret,
                floordiv(broadcast(x, lanes), broadcast(y, lanes)),
                broadcast(floordiv(x, y), lanes)
            );
            // ramp // broadcast
            if pmatch!(st, ret, floordiv(ramp(b1, c1, lanes), broadcast(c2, lanes))) {
                let c1v = c1.val(&st);
                let c2v = c2.val(&st);
                if c2v != 0 {
                    if c1v % c2v == 0 {
                        let pat = ramp(floordiv(b1, c2), floordiv(c1, c2), lanes);
                        return pat.0.eval(&st, Some(&ret.ty));
                    }
                    let lanes_e = lanes.get(&st);
                    if !contains_vscale_call(&lanes_e) {
                        if let Some(lanes_int) = lanes_e.as_const_int() {
                            let base = b1.get(&st);
                            let bmod = self.analyzer.modular_set(&base);
                            let last = bmod.base.wrapping_add((lanes_int - 1).wrapping_mul(c1v));
                            let ramp_min = floordiv64(bmod.base, c2v);
                            let ramp_max = floordiv64(last, c2v);
                            if ramp_min == ramp_max {
                                // every index divides into the same bucket
                                if bmod.coeff % c2v == 0 {
                                    let pat = broadcast(floordiv(b1, c2), lanes);
                                    return pat.0.eval(&st, Some(&ret.ty));
                                }
                                // or the whole ramp settles inside one coeff
                                // period
                                if bmod.coeff != 0
                                    && c2v % bmod.coeff == 0
                                    && last < bmod.coeff
                                {
                                    let pat = broadcast(floordiv(b1, c2), lanes);
                                    return pat.0.eval(&st, Some(&ret.ty));
                                }
                            }
                        }
                    }
                }
            }
        }

        if ret.ty.is_index_type() {
            // floored division rules
            try_rewrite_if!(
                self, st, ret,
                floordiv(floordiv(x, c1), c2),
                floordiv(x, c1 * c2),
                c1.val(&st) > 0 && c2.val(&st) > 0
            );

            try_rewrite_if!(
                self, st, ret,
                floordiv(floordiv(x, c1) + c2, c3),
                floordiv(x + c1 * c2, c1 * c3),
                c1.val(&st) > 0 && c3.val(&st) > 0
            );

            if pmatch!(st, ret, floordiv(x * c1 + y, c2))
                || pmatch!(st, ret, floordiv(x * c1, c2))
                || pmatch!(st, ret, floordiv(y + x * c1, c2))
            {
                // everything below divides by c2, starting with the
                // floormod on the matched coefficient
                let c2v = c2.val(&st);
                if c2v == 0 {
                    return ret;
                }
                let c1v = c1.val(&st);
                let xe = x.get(&st);
                let ye = y.get_or_zero(&st, &ret);
                let c2e = Expr::int(c2v, ret.ty);

                // try to eliminate the residue part
                let residue = Expr::floordiv(
                    Expr::add(
                        fold_or_build(
                            BinOpKind::Mul,
                            xe.clone(),
                            Expr::int(floormod64(c1v, c2v), ret.ty),
                        ),
                        fold_or_build(BinOpKind::FloorMod, ye.clone(), c2e.clone()),
                    ),
                    c2e.clone(),
                );
                let y_div_expr = fold_or_build(BinOpKind::FloorDiv, ye.clone(), c2e.clone());
                let y_div = if self.can_prove_equal(&y_div_expr, 0) {
                    Expr::int(0, ret.ty)
                } else {
                    y_div_expr
                };
                let bound = self.analyzer.const_int_bound(&residue);
                if bound.is_single() {
                    let quot = fold_or_build(
                        BinOpKind::Mul,
                        xe.clone(),
                        Expr::int(floordiv64(c1v, c2v), ret.ty),
                    );
                    let rest =
                        fold_or_build(BinOpKind::Add, y_div, Expr::int(bound.max_value, ret.ty));
                    return fold_or_build(BinOpKind::Add, quot, rest);
                }

                // try to simplify the divisor:
                // with c2 == a*c1, x == a*x' + b, y == d*c2 + e:
                //   (x*c1 + y) // c2 == x // (c2 // c1) + y // c2
                // since 0 <= b*c1 <= (a-1)*c1 and 0 <= e < c1
                if c1v > 0 && c2v > 0 && c2v % c1v == 0 {
                    let y_mod = fold_or_build(BinOpKind::FloorMod, ye.clone(), c2e);
                    if self.can_prove_less(&y_mod, c1v) {
                        let quot =
                            fold_or_build(BinOpKind::FloorDiv, xe, Expr::int(c2v / c1v, ret.ty));
                        return fold_or_build(BinOpKind::Add, quot, y_div);
                    }
                }
            }

            try_rewrite!(self, st, ret, floordiv(x, x), one_like(x));
            try_rewrite!(
                self, st, ret,
                matches_one_of((floordiv(x * c1, x), floordiv(c1 * x, x))),
                c1
            );

            try_rewrite!(
                self, st, ret,
                floordiv(floormod(x, 2) + 1, 2),
                floormod(x, 2)
            );

            // rules involving 2 operands
            try_rewrite_if!(
                self, st, ret,
                floordiv(min(x * c1, y), c2),
                min(x * floordiv(c1, c2), floordiv(y, c2)),
                c2.val(&st) > 0 && c1.val(&st) % c2.val(&st) == 0
            );
            try_rewrite_if!(
                self, st, ret,
                floordiv(max(x * c1, y), c2),
                max(x * floordiv(c1, c2), floordiv(y, c2)),
                c2.val(&st) > 0 && c1.val(&st) % c2.val(&st) == 0
            );
            try_rewrite_if!(
                self, st, ret,
                floordiv(min(y, x * c1), c2),
                min(floordiv(y, c2), x * floordiv(c1, c2)),
                c2.val(&st) > 0 && c1.val(&st) % c2.val(&st) == 0
            );
            try_rewrite_if!(
                self, st, ret,
                floordiv(max(y, x * c1), c2),
                max(floordiv(y, c2), x * floordiv(c1, c2)),
                c2.val(&st) > 0 && c1.val(&st) % c2.val(&st) == 0
            );

            // rules involving 3 operands
            try_rewrite_if!(
                self, st, ret,
                floordiv(x * c1 + y + z, c2),
                x * floordiv(c1, c2) + floordiv(y + z, c2),
                c2.val(&st) > 0 && c1.val(&st) % c2.val(&st) == 0
            );
            try_rewrite_if!(
                self, st, ret,
                floordiv(x * c1 + y + z, c2),
                floordiv(x, floordiv(c2, c1)),
                c1.val(&st) > 0
                    && c2.val(&st) > 0
                    && c2.val(&st) % c1.val(&st) == 0
                    && {
                        let yz_div = floordiv(y + z, c1).0.eval(&st, None);
                        self.can_prove_equal(&yz_div, 0)
                    }
            );

            try_rewrite_if!(
                self, st, ret,
                matches_one_of((floordiv(x * c1 - y + z, c2), floordiv(x * c1 + z - y, c2))),
                x * floordiv(c1, c2) + floordiv(z - y, c2),
                c2.val(&st) > 0 && c1.val(&st) % c2.val(&st) == 0
            );
            try_rewrite_if!(
                self, st, ret,
                floordiv(y + x * c1 + z, c2),
                x * floordiv(c1, c2) + floordiv(y + z, c2),
                c2.val(&st) > 0 && c1.val(&st) % c2.val(&st) == 0
            );

            try_rewrite_if!(
                self, st, ret,
                floordiv(x + c1, c2),
                floordiv(x, c2) + floordiv(c1, c2),
                c2.val(&st) > 0 && c1.val(&st) % c2.val(&st) == 0
            );

            try_rewrite_if!(
                self, st, ret,
                floordiv(x * c1, x * c2),
                floordiv(c1, c2),
                c2.val(&st) > 0
            );

            try_rewrite_if!(
                self, st, ret,
                matches_one_of((floordiv(x + y, x), floordiv(y + x, x))),
                floordiv(y, x) + 1,
                self.can_prove_greater_equal(&x.get(&st), 0)
            );
            try_rewrite_if!(
                self, st, ret,
                matches_one_of((
                    floordiv((x + y) + z, x),
                    floordiv((y + x) + z, x),
                    floordiv(y + (z + x), x),
                    floordiv(y + (x + z), x),
                )),
                floordiv(y + z, x) + 1,
                self.can_prove_greater_equal(&x.get(&st), 0)
            );

            try_rewrite_if!(
                self, st, ret,
                matches_one_of((floordiv(x * y, y), floordiv(y * x, y))),
                x,
                self.can_prove_greater_equal(&y.get(&st), 0)
            );

            try_rewrite_if!(
                self, st, ret,
                matches_one_of((floordiv(x * z + y, z), floordiv(z * x + y, z))),
                x + floordiv(y, z),
                self.can_prove_greater_equal(&z.get(&st), 0)
            );
            try_rewrite_if!(
                self, st, ret,
                matches_one_of((floordiv(y + x * z, z), floordiv(y + z * x, z))),
                floordiv(y, z) + x,
                self.can_prove_greater_equal(&z.get(&st), 0)
            );
            try_rewrite_if!(
                self, st, ret,
                floordiv(x * z * c1 + y, z * c1),
                x + floordiv(y, z * c1),
                {
                    let zc1 = (z * c1).0.eval(&st, None);
                    self.can_prove_greater_equal(&zc1, 0)
                }
            );

            try_rewrite_if!(
                self, st, ret,
                floordiv(x - floormod(x, c1), c1),
                floordiv(x, c1),
                c1.val(&st) != 0
            );

            // scalable divisor
            try_rewrite_if!(
                self, st, ret,
                floordiv(x, y),
                zero_like(x),
                contains_vscale_call(&y.get(&st))
                    && self.can_prove_greater_equal(&x.get(&st), 0)
                    && self.can_prove_greater_equal(&y.get(&st), 0)
                    && {
                        let cmp = Expr::lt(x.get(&st), y.get(&st));
                        self.can_prove(&cmp)
                    }
            );
        }
        ret
    }

    pub(crate) fn visit_floormod(&mut self, orig: &Expr) -> Expr {
        let ret = self.rebuild_binary(orig);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::FloorMod, a, b) {
                return folded;
            }
        }
        let [x, y, z, b1, lanes] = pvars_expr();
        let [c1, c2] = pvars_int();
        let mut st = MatchState::new();

        // Vector rules
        if ret.ty.is_vector() {
            try_rewrite!(
                self, st, ret,
                floormod(broadcast(x, lanes), broadcast(y, lanes)),
                broadcast(floormod(x, y), lanes)
            );

            // floormod(ramp, broadcast)
            if pmatch!(st, ret, floormod(ramp(b1, c1, lanes), broadcast(c2, lanes))) {
                let c1v = c1.val(&st);
                let c2v = c2.val(&st);
                if c2v != 0 {
                    if c1v % c2v == 0 {
                        let pat = broadcast(floormod(b1, c2), lanes);
                        return pat.0.eval(&st, Some(&ret.ty));
                    }
                    let base = b1.get(&st);
                    let bmod = self.analyzer.modular_set(&base);
                    let lanes_e = lanes.get(&st);
                    if !contains_vscale_call(&lanes_e) {
                        if let Some(lanes_int) = lanes_e.as_const_int() {
                            let last = bmod.base.wrapping_add((lanes_int - 1).wrapping_mul(c1v));
                            let ramp_min = floordiv64(bmod.base, c2v);
                            let ramp_max = floordiv64(last, c2v);
                            if ramp_min == ramp_max {
                                if bmod.coeff % c2v == 0 {
                                    let new_base =
                                        Expr::int(floormod64(bmod.base, c2v), base.ty);
                                    return Expr::ramp(new_base, c1.get(&st), lanes_e);
                                }
                                if bmod.coeff != 0
                                    && c2v % bmod.coeff == 0
                                    && last < bmod.coeff
                                {
                                    let pat = ramp(floormod(b1, c2), c1, lanes);
                                    return pat.0.eval(&st, Some(&ret.ty));
                                }
                            }
                            if bmod.coeff % c2v == 0 {
                                let new_base = Expr::int(floormod64(bmod.base, c2v), base.ty);
                                let new_ramp =
                                    Expr::ramp(new_base, c1.get(&st), lanes_e.clone());
                                let bcast = Expr::broadcast(c2.get(&st), lanes_e);
                                return Expr::floormod(new_ramp, bcast);
                            }
                        }
                    } else if bmod.coeff % c2v == 0 {
                        // scalable vectors: reduce the base only
                        let new_base = Expr::int(floormod64(bmod.base, c2v), base.ty);
                        let new_ramp = Expr::ramp(new_base, c1.get(&st), lanes_e.clone());
                        let bcast = Expr::broadcast(c2.get(&st), lanes_e);
                        return Expr::floormod(new_ramp, bcast);
                    }
                }
            }
        }

        if ret.ty.is_index_type() {
            // floored modulus rules
            try_rewrite_if!(
                self, st, ret,
                floormod(x * c1, c2),
                floormod(x * floormod(c1, c2), c2),
                c2.val(&st) != 0 && floormod64(c1.val(&st), c2.val(&st)) != c1.val(&st)
            );

            try_rewrite_if!(
                self, st, ret,
                floormod(x * c1 + y, c2),
                floormod(x, floordiv(c2, c1)) * c1 + y,
                c1.val(&st) > 0
                    && c2.val(&st) > 0
                    && c2.val(&st) % c1.val(&st) == 0
                    && {
                        let y_div = floordiv(y, c1).0.eval(&st, None);
                        self.can_prove_equal(&y_div, 0)
                    }
            );

            try_rewrite_if!(
                self, st, ret,
                floormod(x * c1 + y, c2),
                floormod(x * floormod(c1, c2) + y, c2),
                c2.val(&st) > 0 && floormod64(c1.val(&st), c2.val(&st)) != c1.val(&st)
            );

            // (x + 5) % 2 -> (x + 1) % 2, (x + 3) % 3 -> x % 3
            try_rewrite_if!(
                self, st, ret,
                floormod(x + c1, c2),
                floormod(x + floormod(c1, c2), c2),
                c2.val(&st) > 0 && (c1.val(&st) >= c2.val(&st) || c1.val(&st) < 0)
            );

            try_rewrite_if!(
                self, st, ret,
                floormod(x + y * c1, c2),
                floormod(x + y * floormod(c1, c2), c2),
                c2.val(&st) > 0 && floormod64(c1.val(&st), c2.val(&st)) != c1.val(&st)
            );

            try_rewrite_if!(
                self, st, ret,
                floormod(x * c1, x * c2),
                x * floormod(c1, c2),
                c2.val(&st) != 0
            );

            try_rewrite!(
                self, st, ret,
                matches_one_of((floormod(x * y, y), floormod(y * x, y))),
                zero_like(y)
            );

            // with x = a*y + b: (a*y + b + (n*y - a*y - b) % y) % y == 0
            try_rewrite_if!(
                self, st, ret,
                matches_one_of((floormod(x + floormod(z, y), y), floormod(floormod(z, y) + x, y))),
                zero_like(x),
                {
                    let sum_mod = floormod(x + z, y).0.eval(&st, None);
                    self.can_prove_equal(&sum_mod, 0)
                }
            );
            // with x = a*y + b: (a*y + b - (a*y + b) % ±y) % y == 0
            try_rewrite_if!(
                self, st, ret,
                matches_one_of((floormod(x - floormod(x, z), y), floormod(floormod(x, z) - x, y))),
                zero_like(x),
                {
                    let diff = (y - z).0.eval(&st, None);
                    let sum = (y + z).0.eval(&st, None);
                    self.can_prove_equal(&diff, 0) || self.can_prove_equal(&sum, 0)
                }
            );

            try_rewrite_if!(
                self, st, ret,
                floormod(x * z * c1 + y, z * c1),
                floormod(y, z * c1),
                {
                    let zc1 = (z * c1).0.eval(&st, None);
                    self.can_prove_greater_equal(&zc1, 0)
                }
            );

            // scalable divisor
            try_rewrite_if!(
                self, st, ret,
                floormod(x, y),
                x,
                contains_vscale_call(&y.get(&st))
                    && self.can_prove_greater_equal(&x.get(&st), 0)
                    && self.can_prove_greater_equal(&y.get(&st), 0)
                    && {
                        let cmp = Expr::lt(x.get(&st), y.get(&st));
                        self.can_prove(&cmp)
                    }
            );

            if pmatch!(st, ret, floormod(x, c1)) {
                let c1v = c1.val(&st);
                let xe = x.get(&st);
                if c1v > 0 {
                    // modular set analysis; floormod is sign-independent
                    let xmod = self.analyzer.modular_set(&xe);
                    if xmod.coeff % c1v == 0 {
                        return Expr::int(floormod64(xmod.base, c1v), ret.ty);
                    }

                    // floormod(x, c1) is a no-op when x is already in range
                    let bound = self.analyzer.const_int_bound(&xe);
                    if bound.min_value >= 0 && bound.max_value < c1v {
                        return xe;
                    }
                }
            }
        }
        ret
    }
}
