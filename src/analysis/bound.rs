//! Constant integer bound analysis: a sound (possibly loose) interval for
//! every integer expression.

use std::fmt;

use indexmap::IndexMap;
use itertools::iproduct;

use crate::ast::{BinOpKind, CallOp, Expr, ExprKind, Symbol};

/// Sentinel for "unbounded below".
pub const NEG_INF: i64 = i64::MIN;
/// Sentinel for "unbounded above".
pub const POS_INF: i64 = i64::MAX;

/// An inclusive interval with ±∞ sentinels. Invariant: `min_value <=
/// max_value`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ConstIntBound {
    pub min_value: i64,
    pub max_value: i64,
}

impl ConstIntBound {
    pub fn new(min_value: i64, max_value: i64) -> Self {
        debug_assert!(min_value <= max_value);
        ConstIntBound {
            min_value,
            max_value,
        }
    }

    pub fn everything() -> Self {
        ConstIntBound::new(NEG_INF, POS_INF)
    }

    pub fn single(value: i64) -> Self {
        ConstIntBound::new(value, value)
    }

    pub fn is_single(&self) -> bool {
        self.min_value == self.max_value
    }

    pub fn intersect(self, other: ConstIntBound) -> ConstIntBound {
        let min_value = self.min_value.max(other.min_value);
        let max_value = self.max_value.min(other.max_value);
        if min_value <= max_value {
            ConstIntBound::new(min_value, max_value)
        } else {
            // Contradictory information; either side alone is sound.
            self
        }
    }

    pub fn union(self, other: ConstIntBound) -> ConstIntBound {
        ConstIntBound::new(
            self.min_value.min(other.min_value),
            self.max_value.max(other.max_value),
        )
    }

    pub fn negate(self) -> ConstIntBound {
        ConstIntBound::new(neg_inf_aware(self.max_value), neg_inf_aware(self.min_value))
    }
}

impl fmt::Display for ConstIntBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo: &dyn fmt::Display = if self.min_value == NEG_INF {
            &"-inf"
        } else {
            &self.min_value
        };
        let hi: &dyn fmt::Display = if self.max_value == POS_INF {
            &"+inf"
        } else {
            &self.max_value
        };
        write!(f, "[{}, {}]", lo, hi)
    }
}

fn neg_inf_aware(v: i64) -> i64 {
    if v == NEG_INF {
        POS_INF
    } else if v == POS_INF {
        NEG_INF
    } else {
        -v
    }
}

fn clamp(v: i128) -> i64 {
    if v <= NEG_INF as i128 {
        NEG_INF
    } else if v >= POS_INF as i128 {
        POS_INF
    } else {
        v as i64
    }
}

fn is_inf(v: i64) -> bool {
    v == NEG_INF || v == POS_INF
}

fn add_val(a: i64, b: i64) -> i64 {
    if is_inf(a) {
        a
    } else if is_inf(b) {
        b
    } else {
        clamp(a as i128 + b as i128)
    }
}

fn mul_val(a: i64, b: i64) -> i64 {
    if a == 0 || b == 0 {
        return 0;
    }
    if is_inf(a) || is_inf(b) {
        return if (a < 0) == (b < 0) { POS_INF } else { NEG_INF };
    }
    clamp(a as i128 * b as i128)
}

fn div_val(a: i64, b: i64, floored: bool) -> i64 {
    debug_assert!(b != 0);
    if is_inf(b) {
        // The quotient of any dividend approaches zero as the divisor grows.
        return if floored && (a < 0) != (b < 0) { -1 } else { 0 };
    }
    if is_inf(a) {
        return if (a < 0) == (b < 0) { POS_INF } else { NEG_INF };
    }
    if floored {
        floordiv(a, b)
    } else {
        a.wrapping_div(b)
    }
}

/// Division rounding towards negative infinity.
pub fn floordiv(a: i64, b: i64) -> i64 {
    let q = a.wrapping_div(b);
    let r = a.wrapping_rem(b);
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

/// Remainder of floored division; has the divisor's sign.
pub fn floormod(a: i64, b: i64) -> i64 {
    a.wrapping_sub(floordiv(a, b).wrapping_mul(b))
}

#[derive(Default)]
pub struct ConstIntBoundAnalyzer {
    vars: IndexMap<Symbol, ConstIntBound>,
    /// Constraint-derived intervals, keyed by structural equality.
    info: Vec<(Expr, ConstIntBound)>,
}

impl ConstIntBoundAnalyzer {
    pub fn bind(&mut self, var: Symbol, bound: ConstIntBound) {
        self.vars.insert(var, bound);
    }

    pub fn mark(&self) -> usize {
        self.info.len()
    }

    pub fn truncate(&mut self, mark: usize) {
        self.info.truncate(mark);
    }

    /// Ingest a constraint atom: comparisons against a constant tighten the
    /// interval of the non-constant side.
    pub fn ingest(&mut self, atom: &Expr) {
        let ExprKind::Binary(op, a, b) = &atom.kind else {
            return;
        };
        match (op, a.as_const_int(), b.as_const_int()) {
            (BinOpKind::Lt, None, Some(c)) if c != NEG_INF => {
                self.add_info(a, ConstIntBound::new(NEG_INF, c - 1))
            }
            (BinOpKind::Lt, Some(c), None) if c != POS_INF => {
                self.add_info(b, ConstIntBound::new(c + 1, POS_INF))
            }
            (BinOpKind::Le, None, Some(c)) => self.add_info(a, ConstIntBound::new(NEG_INF, c)),
            (BinOpKind::Le, Some(c), None) => self.add_info(b, ConstIntBound::new(c, POS_INF)),
            (BinOpKind::Gt, None, Some(c)) if c != POS_INF => {
                self.add_info(a, ConstIntBound::new(c + 1, POS_INF))
            }
            (BinOpKind::Gt, Some(c), None) if c != NEG_INF => {
                self.add_info(b, ConstIntBound::new(NEG_INF, c - 1))
            }
            (BinOpKind::Ge, None, Some(c)) => self.add_info(a, ConstIntBound::new(c, POS_INF)),
            (BinOpKind::Ge, Some(c), None) => self.add_info(b, ConstIntBound::new(NEG_INF, c)),
            (BinOpKind::Eq, None, Some(c)) => self.add_info(a, ConstIntBound::single(c)),
            (BinOpKind::Eq, Some(c), None) => self.add_info(b, ConstIntBound::single(c)),
            _ => {}
        }
    }

    fn add_info(&mut self, e: &Expr, bound: ConstIntBound) {
        self.info.push((e.clone(), bound));
    }

    pub fn eval(&self, e: &Expr) -> ConstIntBound {
        let mut res = self.eval_kind(e);
        for (key, bound) in &self.info {
            if key == e {
                res = res.intersect(*bound);
            }
        }
        res
    }

    fn eval_kind(&self, e: &Expr) -> ConstIntBound {
        match &e.kind {
            ExprKind::Lit(_) => match (e.as_const_int(), e.as_const_bool()) {
                (Some(v), _) => ConstIntBound::single(v),
                (_, Some(v)) => ConstIntBound::single(v as i64),
                _ => ConstIntBound::everything(),
            },
            ExprKind::Var(name) => {
                let from_ty = type_range(e);
                match self.vars.get(name) {
                    Some(bound) => bound.intersect(from_ty),
                    None => from_ty,
                }
            }
            ExprKind::Binary(op, a, b) => self.eval_binary(*op, a, b),
            ExprKind::Not(_) => ConstIntBound::new(0, 1),
            ExprKind::Select(_cond, on_true, on_false) => {
                self.eval(on_true).union(self.eval(on_false))
            }
            ExprKind::Broadcast(value, _lanes) => self.eval(value),
            ExprKind::Ramp(base, stride, lanes) => {
                let (Some(s), Some(n)) = (stride.as_const_int(), lanes.as_const_int()) else {
                    return ConstIntBound::everything();
                };
                let base = self.eval(base);
                let last_off = mul_val(s, n - 1);
                base.union(ConstIntBound::new(
                    add_val(base.min_value, last_off.min(0)),
                    add_val(base.max_value, last_off.max(0)),
                ))
            }
            ExprKind::Cast(value) => {
                let inner = if value.ty.is_int() || value.ty.is_bool() {
                    self.eval(value)
                } else {
                    ConstIntBound::everything()
                };
                inner.intersect(type_range(e))
            }
            ExprKind::Call(op, args) => match op {
                // vscale is a positive runtime constant
                CallOp::Vscale => ConstIntBound::new(1, POS_INF),
                CallOp::IfThenElse if args.len() == 3 => {
                    self.eval(&args[1]).union(self.eval(&args[2]))
                }
                CallOp::Clz => ConstIntBound::new(0, 64),
                _ => type_range(e),
            },
            ExprKind::Let(_name, _value, body) => self.eval(body),
        }
    }

    fn eval_binary(&self, op: BinOpKind, a: &Expr, b: &Expr) -> ConstIntBound {
        if op.is_comparison() || op.is_logical() {
            return ConstIntBound::new(0, 1);
        }
        let ba = self.eval(a);
        let bb = self.eval(b);
        match op {
            BinOpKind::Add => ConstIntBound::new(
                add_val(ba.min_value, bb.min_value),
                add_val(ba.max_value, bb.max_value),
            ),
            BinOpKind::Sub => {
                let nb = bb.negate();
                ConstIntBound::new(
                    add_val(ba.min_value, nb.min_value),
                    add_val(ba.max_value, nb.max_value),
                )
            }
            BinOpKind::Mul => corner_products(ba, bb, mul_val),
            BinOpKind::Div | BinOpKind::FloorDiv => {
                // Only divide when the divisor's sign is known and nonzero.
                if bb.min_value >= 1 || (bb.max_value <= -1 && bb.min_value != NEG_INF) {
                    let floored = op == BinOpKind::FloorDiv;
                    corner_products(ba, bb, |x, y| div_val(x, y, floored))
                } else {
                    ConstIntBound::everything()
                }
            }
            BinOpKind::Mod => {
                // Truncated remainder follows the dividend's sign, with
                // magnitude below the divisor's.
                let Some(mag) = divisor_magnitude(bb) else {
                    return ConstIntBound::everything();
                };
                let mut res = ConstIntBound::new(-(mag - 1), mag - 1);
                if ba.min_value >= 0 {
                    res = res.intersect(ConstIntBound::new(0, POS_INF));
                    res.max_value = res.max_value.min(ba.max_value);
                }
                if ba.max_value <= 0 {
                    res = res.intersect(ConstIntBound::new(NEG_INF, 0));
                    res.min_value = res.min_value.max(ba.min_value);
                }
                res
            }
            BinOpKind::FloorMod => {
                // Floored remainder follows the divisor's sign.
                if bb.min_value >= 1 {
                    let hi = if bb.max_value == POS_INF {
                        POS_INF
                    } else {
                        bb.max_value - 1
                    };
                    ConstIntBound::new(0, if ba.min_value >= 0 { hi.min(ba.max_value) } else { hi })
                } else if bb.max_value <= -1 && bb.min_value != NEG_INF {
                    ConstIntBound::new(bb.min_value + 1, 0)
                } else {
                    ConstIntBound::everything()
                }
            }
            BinOpKind::Min => ConstIntBound::new(
                ba.min_value.min(bb.min_value),
                ba.max_value.min(bb.max_value),
            ),
            BinOpKind::Max => ConstIntBound::new(
                ba.min_value.max(bb.min_value),
                ba.max_value.max(bb.max_value),
            ),
            _ => ConstIntBound::everything(),
        }
    }
}

fn corner_products(
    a: ConstIntBound,
    b: ConstIntBound,
    f: impl Fn(i64, i64) -> i64,
) -> ConstIntBound {
    let candidates = iproduct!(
        [a.min_value, a.max_value],
        [b.min_value, b.max_value]
    )
    .map(|(x, y)| f(x, y));
    let mut min_value = POS_INF;
    let mut max_value = NEG_INF;
    for c in candidates {
        min_value = min_value.min(c);
        max_value = max_value.max(c);
    }
    ConstIntBound::new(min_value, max_value)
}

/// The largest magnitude a remainder by this divisor may have, when finite.
fn divisor_magnitude(b: ConstIntBound) -> Option<i64> {
    if is_inf(b.min_value) || is_inf(b.max_value) {
        return None;
    }
    let mag = b.min_value.abs().max(b.max_value.abs());
    if mag == 0 {
        None
    } else {
        Some(mag)
    }
}

fn type_range(e: &Expr) -> ConstIntBound {
    match e.ty.int_range() {
        Some((lo, hi)) => ConstIntBound::new(lo, hi),
        None => ConstIntBound::everything(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::DataType;

    fn x() -> Expr {
        Expr::var("x", DataType::int(64))
    }

    #[test]
    fn literal_and_arith() {
        let analyzer = ConstIntBoundAnalyzer::default();
        let ty = DataType::int(64);
        let e = Expr::add(Expr::int(3, ty), Expr::int(4, ty));
        assert_eq!(analyzer.eval(&e), ConstIntBound::new(7, 7));
    }

    #[test]
    fn constraint_tightens_var() {
        let mut analyzer = ConstIntBoundAnalyzer::default();
        let ty = DataType::int(64);
        analyzer.ingest(&Expr::le(Expr::int(0, ty), x()));
        analyzer.ingest(&Expr::lt(x(), Expr::int(10, ty)));
        let bound = analyzer.eval(&x());
        assert_eq!(bound, ConstIntBound::new(0, 9));
        // x * 2 + 1 ∈ [1, 19]
        let e = Expr::add(Expr::mul(x(), Expr::int(2, ty)), Expr::int(1, ty));
        assert_eq!(analyzer.eval(&e), ConstIntBound::new(1, 19));
    }

    #[test]
    fn floormod_nonnegative() {
        let analyzer = ConstIntBoundAnalyzer::default();
        let ty = DataType::int(64);
        let e = Expr::floormod(x(), Expr::int(8, ty));
        assert_eq!(analyzer.eval(&e), ConstIntBound::new(0, 7));
    }

    #[test]
    fn floor_semantics() {
        assert_eq!(floordiv(-7, 2), -4);
        assert_eq!(floormod(-7, 2), 1);
        assert_eq!(floordiv(7, -2), -4);
        assert_eq!(floormod(7, -2), -1);
        assert_eq!(-7i64 / 2, -3);
        assert_eq!(-7i64 % 2, -1);
    }
}
