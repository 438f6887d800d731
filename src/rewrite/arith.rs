//! Rewrite rules for addition, subtraction, and multiplication.

use crate::analysis::{side_effect, SideEffect};
use crate::ast::{BinOpKind, Expr};

use super::const_fold::try_binary_fold;
use super::pattern::{
    broadcast, floordiv, floormod, matches_one_of, max, min, one_like, pvars_expr, pvars_float,
    pvars_int, ramp, select, truncdiv, truncmod, try_recursive_rewrite, try_recursive_rewrite_if,
    try_rewrite, try_rewrite_if, zero_like, MatchState, PatternNode,
};
use super::{binary_parts, RewriteSimplifier};

impl RewriteSimplifier<'_> {
    pub(crate) fn visit_add(&mut self, orig: &Expr) -> Expr {
        let ret = self.rebuild_binary(orig);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::Add, a, b) {
                return folded;
            }
        }
        let [x, y, z, b1, b2, s1, s2, lanes] = pvars_expr();
        let [c1, c2] = pvars_int();
        let [c4] = pvars_float();
        let mut st = MatchState::new();

        // Vector rules
        if ret.ty.is_vector() {
            try_rewrite!(
                self, st, ret,
                ramp(b1, s1, lanes) + ramp(b2, s2, lanes),
                ramp(b1 + b2, s1 + s2, lanes)
            );
            try_rewrite!(
                self, st, ret,
                ramp(b1, s1, lanes) + broadcast(x, lanes),
                ramp(b1 + x, s1, lanes)
            );
            try_rewrite!(
                self, st, ret,
                broadcast(x, lanes) + ramp(b1, s1, lanes),
                ramp(x + b1, s1, lanes)
            );
            try_rewrite!(
                self, st, ret,
                broadcast(x, lanes) + broadcast(y, lanes),
                broadcast(x + y, lanes)
            );
            try_rewrite_if!(self, st, ret, x + broadcast(c4, lanes), x, c4.val(&st) == 0.0);
        }

        if ret.ty.is_index_type() {
            // Index rules
            // cancellation rules
            try_rewrite!(self, st, ret, (x - y) + y, x);
            try_rewrite!(self, st, ret, x + (y - x), y);

            try_rewrite!(self, st, ret, (x - y) + (y - z), x - z);
            try_rewrite!(self, st, ret, (x - y) + (z - x), z - y);

            try_rewrite!(self, st, ret, min(x, y - z) + z, min(x + z, y));
            try_rewrite!(self, st, ret, min(x - z, y) + z, min(x, y + z));
            try_rewrite!(self, st, ret, max(x, y - z) + z, max(x + z, y));
            try_rewrite!(self, st, ret, max(x - z, y) + z, max(x, y + z));

            try_rewrite_if!(
                self, st, ret,
                min(x, y + z * c1) + z * c2,
                min(x + z * c2, y),
                c1.val(&st) == -c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                max(x, y + z * c1) + z * c2,
                max(x + z * c2, y),
                c1.val(&st) == -c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                min(y + z * c1, x) + z * c2,
                min(x + z * c2, y),
                c1.val(&st) == -c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                max(y + z * c1, x) + z * c2,
                max(x + z * c2, y),
                c1.val(&st) == -c2.val(&st)
            );

            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    max(x, y) + min(x, y),
                    min(x, y) + max(x, y),
                    max(x, y) + min(y, x),
                    min(x, y) + max(y, x),
                )),
                x + y
            );

            try_rewrite_if!(
                self, st, ret,
                min(x, y + c1) + c2,
                min(x + c2, y),
                c1.val(&st) == -c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                min(x + c1, y) + c2,
                min(x, y + c2),
                c1.val(&st) == -c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                max(x, y + c1) + c2,
                max(x + c2, y),
                c1.val(&st) == -c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                max(x + c1, y) + c2,
                max(x, y + c2),
                c1.val(&st) == -c2.val(&st)
            );

            // constant folding; canonicalization may do better
            try_rewrite!(self, st, ret, (x + c1) + c2, x + (c1 + c2));

            // mul coefficient folding
            try_rewrite!(self, st, ret, x + x, x * 2);

            try_rewrite!(
                self, st, ret,
                matches_one_of((x * y + x, y * x + x, x + y * x, x + x * y)),
                (y + 1) * x
            );

            try_rewrite!(
                self, st, ret,
                matches_one_of((x * y + x * z, y * x + x * z, x * y + z * x, y * x + z * x)),
                (y + z) * x
            );

            // DivMod rules
            // truncated division
            try_rewrite!(self, st, ret, truncdiv(x, c1) * c1 + truncmod(x, c1), x);
            // floored division
            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    floordiv(x, y) * y + floormod(x, y),
                    y * floordiv(x, y) + floormod(x, y),
                    floormod(x, y) + floordiv(x, y) * y,
                    floormod(x, y) + y * floordiv(x, y),
                )),
                x
            );

            try_rewrite_if!(
                self, st, ret,
                floordiv(floormod(x, c2) + c1, c2) + floordiv(x, c2),
                floordiv(x + c1, c2),
                c2.val(&st) > 0
            );

            try_recursive_rewrite!(
                self, st, ret,
                floordiv(x, 2) + floormod(x, 2),
                floordiv(x + 1, 2)
            );

            // (x + 1) % 2 + x % 2 == 1 for odd offsets; rewriting further
            // into 1 - x % 2 would introduce negative signs that hurt
            // iterator analysis, so only the paired form simplifies.
            try_rewrite_if!(
                self, st, ret,
                floormod(x + c1, 2) + floormod(x, 2),
                one_like(x),
                c1.val(&st).rem_euclid(2) == 1
            );
            try_rewrite_if!(
                self, st, ret,
                floormod(x, 2) + floormod(x + c1, 2),
                one_like(x),
                c1.val(&st).rem_euclid(2) == 1
            );

            // canonicalization; the rewritten form is revisited
            try_recursive_rewrite!(self, st, ret, c1 + x, x + c1);
            try_recursive_rewrite!(
                self, st, ret,
                matches_one_of((x + (c1 - y), (c1 - y) + x)),
                (x - y) + c1
            );
            try_recursive_rewrite!(
                self, st, ret,
                matches_one_of(((x + c1) + y, x + (c1 + y), x + (y + c1))),
                (x + y) + c1
            );
            try_recursive_rewrite!(self, st, ret, x + max(y, z), max(y, z) + x);
            try_recursive_rewrite!(self, st, ret, x + min(y, z), min(y, z) + x);

            // truncated division
            try_recursive_rewrite!(
                self, st, ret,
                truncmod(y, c1) + x * c1,
                x * c1 + truncmod(y, c1)
            );
            // floored division
            try_recursive_rewrite!(
                self, st, ret,
                floormod(y, c1) + x * c1,
                x * c1 + floormod(y, c1)
            );
        }

        // condition rules
        try_rewrite!(
            self, st, ret,
            select(x, b1, b2) + select(x, s1, s2),
            select(x, b1 + s1, b2 + s2)
        );
        ret
    }

    pub(crate) fn visit_sub(&mut self, orig: &Expr) -> Expr {
        let ret = self.rebuild_binary(orig);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::Sub, a, b) {
                return folded;
            }
        }
        let [x, y, z, b1, b2, s1, s2, lanes] = pvars_expr();
        let [c1, c2, c3] = pvars_int();
        let mut st = MatchState::new();

        // Vector rules
        if ret.ty.is_vector() {
            try_rewrite!(
                self, st, ret,
                ramp(b1, s1, lanes) - ramp(b2, s2, lanes),
                ramp(b1 - b2, s1 - s2, lanes)
            );
            try_rewrite!(
                self, st, ret,
                ramp(b1, s1, lanes) - broadcast(x, lanes),
                ramp(b1 - x, s1, lanes)
            );
            try_rewrite!(
                self, st, ret,
                broadcast(x, lanes) - ramp(b1, s1, lanes),
                ramp(x - b1, 0 - s1, lanes)
            );
            try_rewrite!(
                self, st, ret,
                broadcast(x, lanes) - broadcast(y, lanes),
                broadcast(x - y, lanes)
            );
        }

        if ret.ty.is_index_type() {
            // Index rules
            // cancellation rules
            try_rewrite!(self, st, ret, matches_one_of(((x + y) - y, (y + x) - y)), x);
            try_rewrite!(
                self, st, ret,
                matches_one_of((x - (y + x), x - (x + y))),
                0 - y
            );

            try_rewrite!(
                self, st, ret,
                matches_one_of((min(x, y) - y, x - max(y, x))),
                min(x - y, 0)
            );
            try_rewrite!(
                self, st, ret,
                matches_one_of((x - max(x, y), min(y, x) - y)),
                min(0, x - y)
            );
            try_rewrite!(
                self, st, ret,
                matches_one_of((max(x, y) - y, x - min(y, x))),
                max(x - y, 0)
            );
            try_rewrite!(
                self, st, ret,
                matches_one_of((x - min(x, y), max(y, x) - y)),
                max(0, x - y)
            );

            // mul coefficient folding; the coefficient stays on the right
            try_rewrite!(self, st, ret, x - x, zero_like(x));
            try_rewrite!(
                self, st, ret,
                matches_one_of((x * y - x, y * x - x)),
                (y - 1) * x
            );
            try_rewrite!(
                self, st, ret,
                matches_one_of((x - y * x, x - x * y)),
                (1 - y) * x
            );
            try_rewrite!(
                self, st, ret,
                matches_one_of((x * y - x * z, y * x - x * z, x * y - z * x, y * x - z * x)),
                (y - z) * x
            );

            // constant cancellation
            try_rewrite!(self, st, ret, (x + c1) - c2, x + (c1 - c2));
            try_rewrite!(self, st, ret, (c1 - x) - (c2 - y), (y - x) + (c1 - c2));

            // cancellation rules involving 4 operands
            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    (x + y) - (x + z),
                    (x + y) - (z + x),
                    (y + x) - (z + x),
                    (y + x) - (x + z),
                )),
                y - z
            );

            try_rewrite!(
                self, st, ret,
                matches_one_of((min(x + y, z) - x, min(y + x, z) - x)),
                min(y, z - x)
            );
            try_rewrite!(
                self, st, ret,
                matches_one_of((min(z, x + y) - x, min(z, y + x) - x)),
                min(z - x, y)
            );
            try_rewrite!(
                self, st, ret,
                matches_one_of((max(x + y, z) - x, max(y + x, z) - x)),
                max(y, z - x)
            );
            try_rewrite!(
                self, st, ret,
                matches_one_of((max(z, x + y) - x, max(z, y + x) - x)),
                max(z - x, y)
            );

            try_rewrite!(
                self, st, ret,
                matches_one_of((x - min(x + y, z), x - min(y + x, z))),
                max(0 - y, x - z)
            );
            try_rewrite!(
                self, st, ret,
                matches_one_of((x - min(z, x + y), x - min(z, y + x))),
                max(x - z, 0 - y)
            );
            try_rewrite!(
                self, st, ret,
                matches_one_of((x - max(x + y, z), x - max(y + x, z))),
                min(0 - y, x - z)
            );
            try_rewrite!(
                self, st, ret,
                matches_one_of((x - max(z, x + y), x - max(z, y + x))),
                min(x - z, 0 - y)
            );

            try_rewrite!(self, st, ret, min(x, y) - min(y, x), zero_like(x));
            try_rewrite!(self, st, ret, max(x, y) - max(y, x), zero_like(x));

            try_rewrite_if!(
                self, st, ret,
                matches_one_of((min(b1, b2) - min(s1, s2), min(b1, b2) - min(s2, s1))),
                b1 - s1,
                {
                    let diff = ((b1 - s1) - (b2 - s2)).0.eval(&st, None);
                    self.can_prove_equal(&diff, 0)
                }
            );
            try_rewrite_if!(
                self, st, ret,
                matches_one_of((max(b1, b2) - max(s1, s2), max(b1, b2) - max(s2, s1))),
                b1 - s1,
                {
                    let diff = ((b1 - s1) - (b2 - s2)).0.eval(&st, None);
                    self.can_prove_equal(&diff, 0)
                }
            );

            // DivMod rules
            // truncated division
            // c1*(x/c1) + x % c1 == x is true for every division mode
            try_rewrite_if!(
                self, st, ret,
                x - truncdiv(x, c1) * c1,
                truncmod(x, c1),
                c1.val(&st) != 0
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x, c1) * c1 - x,
                0 - truncmod(x, c1),
                c1.val(&st) != 0
            );
            try_rewrite_if!(
                self, st, ret,
                x - truncdiv(x + y, c1) * c1,
                truncmod(x + y, c1) - y,
                c1.val(&st) != 0
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x + y, c1) * c1 - x,
                y - truncmod(x + y, c1),
                c1.val(&st) != 0
            );
            try_rewrite_if!(
                self, st, ret,
                x - truncdiv(x - y, c1) * c1,
                truncmod(x - y, c1) + y,
                c1.val(&st) != 0
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x - y, c1) * c1 - x,
                0 - truncmod(x - y, c1) - y,
                c1.val(&st) != 0
            );

            try_rewrite_if!(
                self, st, ret,
                x * c2 - truncdiv(x, c1) * c3,
                truncmod(x, c1) * c2,
                c1.val(&st) != 0 && c3.val(&st) == c1.val(&st) * c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x, c1) * c3 - x * c2,
                0 - truncmod(x, c1) * c2,
                c1.val(&st) != 0 && c3.val(&st) == c1.val(&st) * c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                x * c2 - truncdiv(x + y, c1) * c3,
                (truncmod(x + y, c1) - y) * c2,
                c1.val(&st) != 0 && c3.val(&st) == c1.val(&st) * c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x + y, c1) * c3 - x * c2,
                (y - truncmod(x + y, c1)) * c2,
                c1.val(&st) != 0 && c3.val(&st) == c1.val(&st) * c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                x * c2 - truncdiv(x - y, c1) * c3,
                (truncmod(x - y, c1) + y) * c2,
                c1.val(&st) != 0 && c3.val(&st) == c1.val(&st) * c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x - y, c1) * c3 - x * c2,
                (0 - truncmod(x - y, c1) - y) * c2,
                c1.val(&st) != 0 && c3.val(&st) == c1.val(&st) * c2.val(&st)
            );

            // truncated division only holds with the positivity proofs:
            // with x = a*c3 + r, (x + c1)/c3 - (x + c2)/c3 => (r + c1)/c3.
            // floormod(c2, c3) keeps the shifted constant simplified.
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x + c1, c3) - truncdiv(x + c2, c3),
                truncdiv(truncmod(x + floormod(c2, c3), c3) + (c1 - c2), c3),
                self.can_prove_greater_equal(&x.get(&st), -c2.val(&st))
                    && c1.val(&st) >= c2.val(&st)
                    && c3.val(&st) > 0
            );
            try_rewrite_if!(
                self, st, ret,
                truncdiv(x + c1, c3) - truncdiv(x, c3),
                truncdiv(truncmod(x, c3) + c1, c3),
                self.can_prove_greater_equal(&x.get(&st), 0)
                    && c1.val(&st) >= 0
                    && c3.val(&st) > 0
            );

            // floored division
            try_rewrite_if!(
                self, st, ret,
                x - floordiv(x, c1) * c1,
                floormod(x, c1),
                c1.val(&st) != 0
            );
            try_rewrite_if!(
                self, st, ret,
                floordiv(x, c1) * c1 - x,
                0 - floormod(x, c1),
                c1.val(&st) != 0
            );
            try_rewrite_if!(
                self, st, ret,
                x - floordiv(x + y, c1) * c1,
                floormod(x + y, c1) - y,
                c1.val(&st) != 0
            );
            try_rewrite_if!(
                self, st, ret,
                floordiv(x + y, c1) * c1 - x,
                y - floormod(x + y, c1),
                c1.val(&st) != 0
            );
            try_rewrite_if!(
                self, st, ret,
                x - floordiv(x - y, c1) * c1,
                floormod(x - y, c1) + y,
                c1.val(&st) != 0
            );
            try_rewrite_if!(
                self, st, ret,
                floordiv(x - y, c1) * c1 - x,
                0 - floormod(x - y, c1) - y,
                c1.val(&st) != 0
            );

            try_recursive_rewrite!(
                self, st, ret,
                floordiv(x + c1, 2) - floordiv(x + c2, 2),
                floormod(x, 2) * (floormod(c1, 2) - floormod(c2, 2))
                    + (floordiv(c1, 2) - floordiv(c2, 2))
            );
            try_recursive_rewrite!(
                self, st, ret,
                floordiv(x, 2) - floordiv(x + c2, 2),
                floormod(x, 2) * (0 - floormod(c2, 2)) - floordiv(c2, 2)
            );
            try_recursive_rewrite!(
                self, st, ret,
                floordiv(x + c1, 2) - floordiv(x, 2),
                floormod(x, 2) * floormod(c1, 2) + floordiv(c1, 2)
            );

            try_rewrite_if!(
                self, st, ret,
                x * c2 - floordiv(x, c1) * c3,
                floormod(x, c1) * c2,
                c1.val(&st) != 0 && c3.val(&st) == c1.val(&st) * c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                floordiv(x, c1) * c3 - x * c2,
                0 - floormod(x, c1) * c2,
                c1.val(&st) != 0 && c3.val(&st) == c1.val(&st) * c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                x * c2 - floordiv(x + y, c1) * c3,
                (floormod(x + y, c1) - y) * c2,
                c1.val(&st) != 0 && c3.val(&st) == c1.val(&st) * c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                floordiv(x + y, c1) * c3 - x * c2,
                (y - floormod(x + y, c1)) * c2,
                c1.val(&st) != 0 && c3.val(&st) == c1.val(&st) * c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                x * c2 - floordiv(x - y, c1) * c3,
                (floormod(x - y, c1) + y) * c2,
                c1.val(&st) != 0 && c3.val(&st) == c1.val(&st) * c2.val(&st)
            );
            try_rewrite_if!(
                self, st, ret,
                floordiv(x - y, c1) * c3 - x * c2,
                (0 - floormod(x - y, c1) - y) * c2,
                c1.val(&st) != 0 && c3.val(&st) == c1.val(&st) * c2.val(&st)
            );

            try_recursive_rewrite!(
                self, st, ret,
                floordiv(x + 1, 2) - floormod(x, 2),
                floordiv(x, 2)
            );

            // floored division stays linear, no positivity needed
            try_rewrite_if!(
                self, st, ret,
                floordiv(x + c1, c3) - floordiv(x + c2, c3),
                floordiv(floormod(x + floormod(c2, c3), c3) + (c1 - c2), c3),
                c3.val(&st) > 0
            );
            try_rewrite_if!(
                self, st, ret,
                floordiv(x + c1, c3) - floordiv(x, c3),
                floordiv(floormod(x, c3) + c1, c3),
                c3.val(&st) > 0
            );

            // canonicalization: subtraction is lowered into negated addition
            try_rewrite!(self, st, ret, x - c1, x + (0 - c1));
            try_recursive_rewrite!(self, st, ret, (x + c1) - y, (x - y) + c1);
            try_recursive_rewrite!(self, st, ret, x - (y + c1), (x - y) + (0 - c1));
            try_recursive_rewrite!(self, st, ret, x - (y - z), (x + z) - y);
            try_recursive_rewrite!(self, st, ret, x - y * c1, x + y * (0 - c1));
        } else {
            // Cancellation rules, deliberately off the integer path to keep
            // it free of side-effect checks. These do not preserve NaN/Inf
            // in the inputs: for IEEE floats `NaN - NaN` is `NaN` and does
            // not cancel.
            try_rewrite_if!(
                self, st, ret,
                x - x,
                zero_like(x),
                side_effect(&x.get(&st)) <= SideEffect::ReadState
            );
            try_rewrite_if!(
                self, st, ret,
                (x + y) - y,
                x,
                side_effect(&y.get(&st)) <= SideEffect::ReadState
            );
            try_rewrite_if!(
                self, st, ret,
                (x + y) - x,
                y,
                side_effect(&x.get(&st)) <= SideEffect::ReadState
            );
            try_rewrite_if!(
                self, st, ret,
                x - (y + x),
                0 - y,
                side_effect(&x.get(&st)) <= SideEffect::ReadState
            );
            try_rewrite_if!(
                self, st, ret,
                x - (x + y),
                0 - y,
                side_effect(&x.get(&st)) <= SideEffect::ReadState
            );
        }

        // condition rules
        try_rewrite!(
            self, st, ret,
            select(x, b1, b2) - select(x, s1, s2),
            select(x, b1 - s1, b2 - s2)
        );
        try_rewrite!(
            self, st, ret,
            select(x, y, z) - z,
            select(x, y - z, zero_like(z))
        );
        try_rewrite!(
            self, st, ret,
            select(x, y, z) - y,
            select(x, zero_like(y), z - y)
        );
        ret
    }

    pub(crate) fn visit_mul(&mut self, orig: &Expr) -> Expr {
        let ret = self.rebuild_binary(orig);
        {
            let (a, b) = binary_parts(&ret);
            if let Some(folded) = try_binary_fold(BinOpKind::Mul, a, b) {
                return folded;
            }
        }
        let [x, y, b1, s1, lanes] = pvars_expr();
        let [c1, c2] = pvars_int();
        let [c3] = pvars_float();
        let mut st = MatchState::new();

        // Vector rules
        if ret.ty.is_vector() {
            try_rewrite!(
                self, st, ret,
                broadcast(x, lanes) * broadcast(y, lanes),
                broadcast(x * y, lanes)
            );
            try_rewrite!(
                self, st, ret,
                matches_one_of((
                    ramp(b1, s1, lanes) * broadcast(x, lanes),
                    broadcast(x, lanes) * ramp(b1, s1, lanes),
                )),
                ramp(b1 * x, s1 * x, lanes)
            );
            try_rewrite_if!(
                self, st, ret,
                broadcast(c3, lanes) * x,
                broadcast(c3, lanes),
                c3.val(&st) == 0.0
            );
        }

        if ret.ty.is_index_type() {
            // constant simplification
            try_rewrite!(self, st, ret, (x + c1) * c2, x * c2 + c1 * c2);
            try_rewrite!(self, st, ret, (x * c1) * c2, x * (c1 * c2));
            try_rewrite!(
                self, st, ret,
                matches_one_of((min(x, y) * max(x, y), max(x, y) * min(x, y))),
                x * y
            );

            // two representations of const*ceildiv(x, c2)
            try_rewrite_if!(
                self, st, ret,
                floordiv(x - floormod(x, c2), c1) * c1,
                x - floormod(x, c2),
                c1.val(&st) == -c2.val(&st)
            );

            // canonicalization
            try_recursive_rewrite!(self, st, ret, x * (c1 * y), (x * y) * c1);
            try_recursive_rewrite!(self, st, ret, c1 * x, x * c1);
            try_recursive_rewrite_if!(
                self, st, ret,
                (x - y) * c1,
                (y - x) * (0 - c1),
                c1.val(&st) < 0
            );
        }
        ret
    }
}
