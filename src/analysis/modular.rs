//! Modular-congruence analysis: for an integer expression, a sound
//! description `coeff * k + base` of the values it may take.

use std::fmt;

use indexmap::IndexMap;

use crate::ast::{BinOpKind, Expr, ExprKind, Symbol};

/// The set `{ base + coeff * k | k ∈ ℤ }`.
///
/// Invariant: `coeff >= 0` and, when `coeff != 0`, `0 <= base < coeff`.
/// `coeff == 0` means the expression is exactly the integer `base`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ModularSet {
    pub coeff: i64,
    pub base: i64,
}

impl ModularSet {
    pub fn new(coeff: i64, base: i64) -> Self {
        let coeff = coeff.abs();
        let base = if coeff != 0 {
            base.rem_euclid(coeff)
        } else {
            base
        };
        ModularSet { coeff, base }
    }

    /// The set of all integers.
    pub fn everything() -> Self {
        ModularSet { coeff: 1, base: 0 }
    }

    /// The singleton set containing exactly `value`.
    pub fn single(value: i64) -> Self {
        ModularSet {
            coeff: 0,
            base: value,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.coeff == 0
    }
}

impl fmt::Display for ModularSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ℤ + {}", self.coeff, self.base)
    }
}

/// `gcd(|a|, |b|)` with `gcd(0, x) = |x|` and `gcd(0, 0) = 0`.
pub fn zero_aware_gcd(a: i64, b: i64) -> i64 {
    num::integer::gcd(a, b)
}

fn checked(v: i128) -> Option<i64> {
    i64::try_from(v).ok()
}

/// Whether `a` describes a subset of every set `b` could describe, i.e. `a`
/// is at least as precise.
fn refines(a: &ModularSet, b: &ModularSet) -> bool {
    if a.coeff == 0 {
        return true;
    }
    b.coeff != 0 && a.coeff % b.coeff == 0
}

fn union(a: ModularSet, b: ModularSet) -> ModularSet {
    let coeff = zero_aware_gcd(zero_aware_gcd(a.coeff, b.coeff), a.base.wrapping_sub(b.base).abs());
    if coeff == 0 {
        // Both sides are the same exact integer.
        ModularSet::single(a.base)
    } else {
        ModularSet::new(coeff, a.base)
    }
}

fn add(a: ModularSet, b: ModularSet) -> ModularSet {
    let coeff = zero_aware_gcd(a.coeff, b.coeff);
    match checked(a.base as i128 + b.base as i128) {
        Some(base) => ModularSet::new(coeff, base),
        None => ModularSet::everything(),
    }
}

fn negate(a: ModularSet) -> ModularSet {
    match checked(-(a.base as i128)) {
        Some(base) => ModularSet::new(a.coeff, base),
        None => ModularSet::everything(),
    }
}

fn mul(a: ModularSet, b: ModularSet) -> ModularSet {
    // (ca·k + ba)(cb·l + bb) = ca·cb·kl + ca·bb·k + cb·ba·l + ba·bb
    let products = [
        (a.coeff as i128) * (b.coeff as i128),
        (a.coeff as i128) * (b.base as i128),
        (b.coeff as i128) * (a.base as i128),
    ];
    let mut coeff = 0i64;
    for p in products {
        match checked(p) {
            Some(p) => coeff = zero_aware_gcd(coeff, p),
            None => return ModularSet::everything(),
        }
    }
    match checked(a.base as i128 * b.base as i128) {
        Some(base) => ModularSet::new(coeff, base),
        None => ModularSet::everything(),
    }
}

/// Division is only exact when both coefficient and base are divisible; in
/// that case truncated and floored division agree.
fn div_by_const(a: ModularSet, c: i64) -> ModularSet {
    if c != 0 && a.coeff % c == 0 && a.base % c == 0 {
        ModularSet::new(a.coeff / c, a.base / c)
    } else {
        ModularSet::everything()
    }
}

fn mod_by_const(a: ModularSet, c: i64, floored: bool) -> ModularSet {
    if c == 0 {
        return ModularSet::everything();
    }
    let c = c.abs();
    if floored && a.coeff % c == 0 {
        // floormod is periodic in the divisor, no sign reasoning needed
        return ModularSet::single(a.base.rem_euclid(c));
    }
    // Either way the residue is congruent to the dividend modulo
    // gcd(coeff, c).
    let g = zero_aware_gcd(a.coeff, c);
    ModularSet::new(g, a.base)
}

#[derive(Default)]
pub struct ModularSetAnalyzer {
    vars: IndexMap<Symbol, ModularSet>,
    /// Constraint-derived sets, keyed by structural equality.
    info: Vec<(Expr, ModularSet)>,
}

impl ModularSetAnalyzer {
    pub fn bind(&mut self, var: Symbol, set: ModularSet) {
        self.vars.insert(var, set);
    }

    pub fn mark(&self) -> usize {
        self.info.len()
    }

    pub fn truncate(&mut self, mark: usize) {
        self.info.truncate(mark);
    }

    /// Ingest a constraint atom. Recognizes `e % c1 == c2` in both division
    /// families: either way the dividend is congruent to the residue.
    pub fn ingest(&mut self, atom: &Expr) {
        if let ExprKind::Binary(BinOpKind::Eq, lhs, rhs) = &atom.kind {
            let (m, r) = if rhs.as_const_int().is_some() {
                (lhs, rhs)
            } else {
                (rhs, lhs)
            };
            let Some(residue) = r.as_const_int() else {
                return;
            };
            if let ExprKind::Binary(BinOpKind::FloorMod | BinOpKind::Mod, e, c) = &m.kind {
                if let Some(c) = c.as_const_int() {
                    if c != 0 {
                        self.info
                            .push((e.clone(), ModularSet::new(c.abs(), residue)));
                    }
                }
            }
        }
    }

    pub fn eval(&self, e: &Expr) -> ModularSet {
        let mut res = self.eval_kind(e);
        for (key, set) in &self.info {
            if key == e && refines(set, &res) {
                res = *set;
            }
        }
        res
    }

    fn eval_kind(&self, e: &Expr) -> ModularSet {
        match &e.kind {
            ExprKind::Lit(_) => match e.as_const_int() {
                Some(v) => ModularSet::single(v),
                None => ModularSet::everything(),
            },
            ExprKind::Var(name) => self
                .vars
                .get(name)
                .copied()
                .unwrap_or_else(ModularSet::everything),
            ExprKind::Binary(op, a, b) => {
                let ma = self.eval(a);
                match op {
                    BinOpKind::Add => add(ma, self.eval(b)),
                    BinOpKind::Sub => add(ma, negate(self.eval(b))),
                    BinOpKind::Mul => mul(ma, self.eval(b)),
                    BinOpKind::Div | BinOpKind::FloorDiv => match b.as_const_int() {
                        Some(c) => div_by_const(ma, c),
                        None => ModularSet::everything(),
                    },
                    BinOpKind::Mod | BinOpKind::FloorMod => match b.as_const_int() {
                        Some(c) => mod_by_const(ma, c, *op == BinOpKind::FloorMod),
                        None => ModularSet::everything(),
                    },
                    BinOpKind::Min | BinOpKind::Max => union(ma, self.eval(b)),
                    _ => ModularSet::everything(),
                }
            }
            ExprKind::Select(_cond, a, b) => union(self.eval(a), self.eval(b)),
            ExprKind::Broadcast(value, _lanes) => self.eval(value),
            ExprKind::Cast(value) => {
                // Only safe when the cast cannot wrap.
                if value.ty.is_int() && value.ty.bits() <= e.ty.bits() {
                    self.eval(value)
                } else {
                    ModularSet::everything()
                }
            }
            _ => ModularSet::everything(),
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

    #[test]
    fn affine_sets() {
        let analyzer = ModularSetAnalyzer::default();
        let ty = DataType::int(32);
        // x * 4 + 2 ≡ 2 (mod 4)
        let e = Expr::add(Expr::mul(x(), Expr::int(4, ty)), Expr::int(2, ty));
        assert_eq!(analyzer.eval(&e), ModularSet::new(4, 2));
        // (x * 6) * 10 ≡ 0 (mod 60)
        let e = Expr::mul(Expr::mul(x(), Expr::int(6, ty)), Expr::int(10, ty));
        assert_eq!(analyzer.eval(&e), ModularSet::new(60, 0));
    }

    #[test]
    fn union_of_branches() {
        let a = ModularSet::new(0, 3);
        let b = ModularSet::new(0, 5);
        let u = union(a, b);
        assert_eq!(u, ModularSet::new(2, 1));
    }

    #[test]
    fn constraint_ingestion() {
        let mut analyzer = ModularSetAnalyzer::default();
        let ty = DataType::int(32);
        let atom = Expr::eq(Expr::floormod(x(), Expr::int(8, ty)), Expr::int(3, ty));
        analyzer.ingest(&atom);
        assert_eq!(analyzer.eval(&x()), ModularSet::new(8, 3));
    }

    #[test]
    fn gcd_conventions() {
        assert_eq!(zero_aware_gcd(0, 0), 0);
        assert_eq!(zero_aware_gcd(0, -4), 4);
        assert_eq!(zero_aware_gcd(6, -4), 2);
    }
}
