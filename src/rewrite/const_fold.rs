//! Per-opcode constant folding and small arithmetic helpers.
//!
//! Folding honors the exact operator semantics: truncated division rounds
//! towards zero, floored division towards negative infinity, integer
//! arithmetic wraps on the declared width (unsigned types wrap modulo
//! `2^bits`), and division or remainder by zero refuses to fold so the node
//! stays in the IR for a later pass to diagnose.

use std::cmp::Ordering;

use crate::ast::{BinOpKind, DataType, Expr, ExprKind, LitKind, ScalarKind};

/// Fold `op(a, b)` when enough of the operands are literals, or return
/// `None`. Only scalar operands fold; vector literals are reached through
/// the broadcast rules instead.
pub fn try_binary_fold(op: BinOpKind, a: &Expr, b: &Expr) -> Option<Expr> {
    if a.ty.is_vector() || b.ty.is_vector() {
        return None;
    }
    if let (Some(va), Some(vb)) = (a.as_const_int(), b.as_const_int()) {
        return fold_int(op, a, va, vb);
    }
    if let (Some(va), Some(vb)) = (a.as_const_float(), b.as_const_float()) {
        return fold_float(op, a, va, vb);
    }
    if let (Some(va), Some(vb)) = (a.as_const_bool(), b.as_const_bool()) {
        return fold_bool(op, va, vb);
    }
    fold_partial(op, a, b)
}

fn fold_int(op: BinOpKind, a: &Expr, va: i64, vb: i64) -> Option<Expr> {
    let ty = a.ty;
    let unsigned = matches!(ty.scalar, ScalarKind::UInt(_));
    let value = if unsigned {
        let (ua, ub) = (va as u64 as u128, vb as u64 as u128);
        (match op {
            BinOpKind::Add => ua.wrapping_add(ub),
            BinOpKind::Sub => ua.wrapping_sub(ub),
            BinOpKind::Mul => ua.wrapping_mul(ub),
            // all division families agree on unsigned operands
            BinOpKind::Div | BinOpKind::FloorDiv => {
                if ub == 0 {
                    return None;
                }
                ua / ub
            }
            BinOpKind::Mod | BinOpKind::FloorMod => {
                if ub == 0 {
                    return None;
                }
                ua % ub
            }
            BinOpKind::Min => ua.min(ub),
            BinOpKind::Max => ua.max(ub),
            _ => return fold_int_compare(op, cmp_int(&ty, va, vb)),
        }) as i128
    } else {
        let (ia, ib) = (va as i128, vb as i128);
        match op {
            BinOpKind::Add => ia + ib,
            BinOpKind::Sub => ia - ib,
            BinOpKind::Mul => ia * ib,
            // truncated: rounds towards zero
            BinOpKind::Div => {
                if ib == 0 {
                    return None;
                }
                ia / ib
            }
            BinOpKind::Mod => {
                if ib == 0 {
                    return None;
                }
                ia % ib
            }
            // floored: rounds towards negative infinity
            BinOpKind::FloorDiv => {
                if ib == 0 {
                    return None;
                }
                floordiv_i128(ia, ib)
            }
            BinOpKind::FloorMod => {
                if ib == 0 {
                    return None;
                }
                floormod_i128(ia, ib)
            }
            BinOpKind::Min => ia.min(ib),
            BinOpKind::Max => ia.max(ib),
            _ => return fold_int_compare(op, cmp_int(&ty, va, vb)),
        }
    };
    Some(Expr::int(crate::ast::wrap_to_width(value, &ty), ty))
}

fn floordiv_i128(a: i128, b: i128) -> i128 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn floormod_i128(a: i128, b: i128) -> i128 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

fn cmp_int(ty: &DataType, va: i64, vb: i64) -> Ordering {
    if matches!(ty.scalar, ScalarKind::UInt(_)) {
        (va as u64).cmp(&(vb as u64))
    } else {
        va.cmp(&vb)
    }
}

fn fold_int_compare(op: BinOpKind, ord: Ordering) -> Option<Expr> {
    let value = match op {
        BinOpKind::Eq => ord == Ordering::Equal,
        BinOpKind::Ne => ord != Ordering::Equal,
        BinOpKind::Lt => ord == Ordering::Less,
        BinOpKind::Le => ord != Ordering::Greater,
        BinOpKind::Gt => ord == Ordering::Greater,
        BinOpKind::Ge => ord != Ordering::Less,
        _ => return None,
    };
    Some(Expr::bool_lit(value))
}

fn fold_float(op: BinOpKind, a: &Expr, va: f64, vb: f64) -> Option<Expr> {
    let ty = a.ty;
    let value = match op {
        BinOpKind::Add => va + vb,
        BinOpKind::Sub => va - vb,
        BinOpKind::Mul => va * vb,
        BinOpKind::Div => {
            if vb == 0.0 {
                return None;
            }
            va / vb
        }
        BinOpKind::Min => va.min(vb),
        BinOpKind::Max => va.max(vb),
        _ => {
            let value = match op {
                BinOpKind::Eq => va == vb,
                BinOpKind::Ne => va != vb,
                BinOpKind::Lt => va < vb,
                BinOpKind::Le => va <= vb,
                BinOpKind::Gt => va > vb,
                BinOpKind::Ge => va >= vb,
                _ => return None,
            };
            return Some(Expr::bool_lit(value));
        }
    };
    Some(Expr::float(value, ty))
}

fn fold_bool(op: BinOpKind, va: bool, vb: bool) -> Option<Expr> {
    let value = match op {
        BinOpKind::And => va && vb,
        BinOpKind::Or => va || vb,
        BinOpKind::Eq => va == vb,
        BinOpKind::Ne => va != vb,
        _ => return None,
    };
    Some(Expr::bool_lit(value))
}

/// Folds that only need one literal operand: identity elements, absorbing
/// zeros, and short-circuiting boolean connectives.
fn fold_partial(op: BinOpKind, a: &Expr, b: &Expr) -> Option<Expr> {
    let (ca, cb) = (a.as_const_int(), b.as_const_int());
    match op {
        BinOpKind::Add => {
            if ca == Some(0) {
                return Some(b.clone());
            }
            if cb == Some(0) {
                return Some(a.clone());
            }
        }
        BinOpKind::Sub => {
            if cb == Some(0) {
                return Some(a.clone());
            }
        }
        BinOpKind::Mul => {
            if ca == Some(0) {
                return Some(a.clone());
            }
            if cb == Some(0) {
                return Some(b.clone());
            }
            if ca == Some(1) {
                return Some(b.clone());
            }
            if cb == Some(1) {
                return Some(a.clone());
            }
        }
        BinOpKind::Div | BinOpKind::FloorDiv => {
            if cb == Some(1) {
                return Some(a.clone());
            }
            if ca == Some(0) {
                return Some(a.clone());
            }
        }
        BinOpKind::Mod | BinOpKind::FloorMod => {
            if cb == Some(1) {
                return Some(Expr::zero_like(a));
            }
        }
        BinOpKind::And => match (a.as_const_bool(), b.as_const_bool()) {
            (Some(true), _) => return Some(b.clone()),
            (_, Some(true)) => return Some(a.clone()),
            (Some(false), _) => return Some(a.clone()),
            (_, Some(false)) => return Some(b.clone()),
            _ => {}
        },
        BinOpKind::Or => match (a.as_const_bool(), b.as_const_bool()) {
            (Some(false), _) => return Some(b.clone()),
            (_, Some(false)) => return Some(a.clone()),
            (Some(true), _) => return Some(a.clone()),
            (_, Some(true)) => return Some(b.clone()),
            _ => {}
        },
        _ => {}
    }
    None
}

pub fn try_not_fold(a: &Expr) -> Option<Expr> {
    match a.as_const_bool() {
        Some(v) => Some(Expr::bool_typed(!v, a.ty)),
        None => None,
    }
}

/// Build `op(a, b)`, folding eagerly when possible. This is what result
/// patterns evaluate through, so synthesized constants collapse on the spot.
pub fn fold_or_build(op: BinOpKind, a: Expr, b: Expr) -> Expr {
    try_binary_fold(op, &a, &b).unwrap_or_else(|| Expr::binary(op, a, b))
}

pub fn fold_or_build_not(a: Expr) -> Expr {
    try_not_fold(&a).unwrap_or_else(|| Expr::not(a))
}

/// Fold a cast of a scalar literal to `ty`, re-wrapping to the target width.
pub fn try_cast_fold(ty: &DataType, value: &Expr) -> Option<Expr> {
    if ty.is_vector() {
        return None;
    }
    match &value.kind {
        ExprKind::Lit(LitKind::Int(v)) => {
            if ty.is_int() || ty.is_bool() {
                Some(Expr::int(*v, *ty))
            } else if ty.is_float() {
                Some(Expr::float(*v as f64, *ty))
            } else {
                None
            }
        }
        ExprKind::Lit(LitKind::Bool(v)) => {
            if ty.is_int() {
                Some(Expr::int(*v as i64, *ty))
            } else {
                None
            }
        }
        ExprKind::Lit(LitKind::Float(v)) => {
            if ty.is_float() {
                Some(Expr::float(*v, *ty))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Decompose `x + c`, `x - c`, and `c - x` into a base and a signed
/// constant. The `c - x` shape reports `(x, c)`; callers must account for
/// the flipped sign of the base themselves. `(c + x)` never appears because
/// addition is canonicalized to constant-on-right.
pub fn extract_constant_offset(e: &Expr) -> (Expr, i64) {
    if let ExprKind::Binary(op, a, b) = &e.kind {
        match op {
            BinOpKind::Add => {
                if let Some(c) = b.as_const_int() {
                    return (a.clone(), c);
                }
            }
            BinOpKind::Sub => {
                if let Some(c) = b.as_const_int() {
                    return (a.clone(), -c);
                }
                if let Some(c) = a.as_const_int() {
                    return (b.clone(), c);
                }
            }
            _ => {}
        }
    }
    (e.clone(), 0)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::DataType;

    fn ity() -> DataType {
        DataType::int(32)
    }

    fn int(v: i64) -> Expr {
        Expr::int(v, ity())
    }

    #[test]
    fn division_families_on_negatives() {
        let fold = |op, a, b| {
            try_binary_fold(op, &int(a), &int(b))
                .unwrap()
                .as_const_int()
                .unwrap()
        };
        assert_eq!(fold(BinOpKind::Div, -7, 2), -3);
        assert_eq!(fold(BinOpKind::Mod, -7, 2), -1);
        assert_eq!(fold(BinOpKind::FloorDiv, -7, 2), -4);
        assert_eq!(fold(BinOpKind::FloorMod, -7, 2), 1);
        assert_eq!(fold(BinOpKind::FloorDiv, 7, -2), -4);
        assert_eq!(fold(BinOpKind::FloorMod, 7, -2), -1);
    }

    #[test]
    fn division_by_zero_refuses() {
        assert!(try_binary_fold(BinOpKind::Div, &int(1), &int(0)).is_none());
        assert!(try_binary_fold(BinOpKind::FloorMod, &int(1), &int(0)).is_none());
    }

    #[test]
    fn wrapping_on_declared_width() {
        let ty = DataType::int(8);
        let a = Expr::int(100, ty);
        let b = Expr::int(100, ty);
        let folded = try_binary_fold(BinOpKind::Add, &a, &b).unwrap();
        assert_eq!(folded.as_const_int(), Some(-56));
    }

    #[test]
    fn unsigned_comparison() {
        let ty = DataType::uint(64);
        let a = Expr::int(-1, ty); // 2^64 - 1
        let b = Expr::int(1, ty);
        let folded = try_binary_fold(BinOpKind::Lt, &a, &b).unwrap();
        assert_eq!(folded.as_const_bool(), Some(false));
    }

    #[test]
    fn partial_folds() {
        let x = Expr::var("x", ity());
        assert_eq!(
            try_binary_fold(BinOpKind::Add, &x, &int(0)),
            Some(x.clone())
        );
        assert_eq!(
            try_binary_fold(BinOpKind::Mul, &x, &int(1)),
            Some(x.clone())
        );
        let t = Expr::bool_lit(true);
        let b = Expr::var("b", DataType::bool_());
        assert_eq!(try_binary_fold(BinOpKind::And, &t, &b), Some(b.clone()));
        assert_eq!(
            try_binary_fold(BinOpKind::Or, &t, &b).unwrap().as_const_bool(),
            Some(true)
        );
    }

    #[test]
    fn offset_extraction() {
        let x = Expr::var("x", ity());
        let (b, c) = extract_constant_offset(&Expr::add(x.clone(), int(4)));
        assert_eq!((b, c), (x.clone(), 4));
        let (b, c) = extract_constant_offset(&Expr::sub(x.clone(), int(4)));
        assert_eq!((b, c), (x.clone(), -4));
        let (b, c) = extract_constant_offset(&Expr::sub(int(4), x.clone()));
        assert_eq!((b, c), (x.clone(), 4));
        let (b, c) = extract_constant_offset(&x);
        assert_eq!((b, c), (x, 0));
    }
}
