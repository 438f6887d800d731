//! Comparisons derived from entered constraints, with optional transitive
//! chaining.

use std::fmt;
use std::ops::BitAnd;

use crate::ast::{BinOpKind, Expr, ExprKind};

/// The possible relations between two integer values, as a bitset over the
/// three mutually exclusive outcomes `EQ`, `LT`, `GT`. Intersection of
/// knowledge is bitwise-AND: `LE & GE == EQ`, `LE & NE == LT`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CompareResult(pub u8);

impl CompareResult {
    pub const INCONSISTENT: CompareResult = CompareResult(0);
    pub const EQ: CompareResult = CompareResult(1);
    pub const LT: CompareResult = CompareResult(2);
    pub const LE: CompareResult = CompareResult(3);
    pub const GT: CompareResult = CompareResult(4);
    pub const GE: CompareResult = CompareResult(5);
    pub const NE: CompareResult = CompareResult(6);
    pub const UNKNOWN: CompareResult = CompareResult(7);

    /// Whether the relation is pinned down to a single outcome.
    pub fn is_decided(self) -> bool {
        matches!(self, CompareResult::EQ | CompareResult::LT | CompareResult::GT)
    }
}

impl BitAnd for CompareResult {
    type Output = CompareResult;

    fn bitand(self, rhs: CompareResult) -> CompareResult {
        CompareResult(self.0 & rhs.0)
    }
}

impl fmt::Debug for CompareResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            CompareResult::INCONSISTENT => "Inconsistent",
            CompareResult::EQ => "EQ",
            CompareResult::LT => "LT",
            CompareResult::LE => "LE",
            CompareResult::GT => "GT",
            CompareResult::GE => "GE",
            CompareResult::NE => "NE",
            CompareResult::UNKNOWN => "Unknown",
            _ => return write!(f, "CompareResult({:#b})", self.0),
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum EdgeRel {
    /// `lhs <= rhs + offset`
    Le,
    /// `lhs == rhs + offset`
    Eq,
    /// `lhs != rhs + offset`
    Ne,
}

struct Edge {
    lhs: Expr,
    rhs: Expr,
    rel: EdgeRel,
    offset: i64,
}

/// Split a canonical `e + c` / `e - c` into a base and a signed constant.
/// Unlike the simplifier's own offset extraction this ignores the `c - e`
/// shape, whose flipped sign has no edge representation.
fn split_offset(e: &Expr) -> (&Expr, i64) {
    if let ExprKind::Binary(op @ (BinOpKind::Add | BinOpKind::Sub), a, b) = &e.kind {
        if let Some(c) = b.as_const_int() {
            let off = if *op == BinOpKind::Add { c } else { -c };
            return (a, off);
        }
    }
    (e, 0)
}

#[derive(Default)]
pub struct TransitiveComparisonAnalyzer {
    edges: Vec<Edge>,
}

impl TransitiveComparisonAnalyzer {
    pub fn mark(&self) -> usize {
        self.edges.len()
    }

    pub fn truncate(&mut self, mark: usize) {
        self.edges.truncate(mark);
    }

    /// Ingest a comparison atom whose sides are both non-constant.
    pub fn ingest(&mut self, atom: &Expr) {
        let ExprKind::Binary(op, a, b) = &atom.kind else {
            return;
        };
        if a.is_const() || b.is_const() {
            return;
        }
        let (abase, aoff) = split_offset(a);
        let (bbase, boff) = split_offset(b);
        let diff = boff - aoff;
        let (lhs, rhs) = (abase.clone(), bbase.clone());
        match op {
            // a < b  ⟺  abase <= bbase + (diff - 1)
            BinOpKind::Lt => self.push(lhs, rhs, EdgeRel::Le, diff - 1),
            BinOpKind::Le => self.push(lhs, rhs, EdgeRel::Le, diff),
            BinOpKind::Gt => self.push(rhs, lhs, EdgeRel::Le, -diff - 1),
            BinOpKind::Ge => self.push(rhs, lhs, EdgeRel::Le, -diff),
            BinOpKind::Eq => self.push(lhs, rhs, EdgeRel::Eq, diff),
            BinOpKind::Ne => self.push(lhs, rhs, EdgeRel::Ne, diff),
            _ => {}
        }
    }

    fn push(&mut self, lhs: Expr, rhs: Expr, rel: EdgeRel, offset: i64) {
        self.edges.push(Edge {
            lhs,
            rhs,
            rel,
            offset,
        });
    }

    /// Relate `x` and `y` using the stored comparisons. With `propagate` set,
    /// inequalities are chained through intermediate expressions.
    pub fn compare(&self, x: &Expr, y: &Expr, propagate: bool) -> CompareResult {
        let (xb, xo) = split_offset(x);
        let (yb, yo) = split_offset(y);
        // x ⋈ y  ⟺  xb - yb ⋈ d
        let d = yo - xo;
        if xb == yb {
            return if d > 0 {
                CompareResult::LT
            } else if d < 0 {
                CompareResult::GT
            } else {
                CompareResult::EQ
            };
        }

        let upper = self.chain_upper(xb, yb, propagate);
        let lower = self.chain_upper(yb, xb, propagate).map(|k| -k);

        let mut res = CompareResult::UNKNOWN;
        if let Some(k) = upper {
            if k < d {
                res = res & CompareResult::LT;
            } else if k == d {
                res = res & CompareResult::LE;
            }
        }
        if let Some(m) = lower {
            if m > d {
                res = res & CompareResult::GT;
            } else if m == d {
                res = res & CompareResult::GE;
            }
        }
        for edge in &self.edges {
            if edge.rel != EdgeRel::Ne {
                continue;
            }
            let known = if &edge.lhs == xb && &edge.rhs == yb {
                Some(edge.offset)
            } else if &edge.lhs == yb && &edge.rhs == xb {
                Some(-edge.offset)
            } else {
                None
            };
            if known == Some(d) {
                res = res & CompareResult::NE;
            }
        }
        res
    }

    /// The tightest known `k` with `from <= to + k`, chaining edges when
    /// `propagate` allows it.
    fn chain_upper<'a>(&'a self, from: &'a Expr, to: &Expr, propagate: bool) -> Option<i64> {
        // Bellman-Ford style relaxation over the (tiny) edge list. Without
        // propagation, a single round starting at `from` only resolves direct
        // edges.
        let mut dist: Vec<(&'a Expr, i64)> = vec![(from, 0)];
        let rounds = if propagate { self.edges.len().min(8) + 1 } else { 1 };
        for _ in 0..rounds {
            let mut changed = false;
            for edge in &self.edges {
                let (src, dst, offset) = match edge.rel {
                    EdgeRel::Le | EdgeRel::Eq => (&edge.lhs, &edge.rhs, edge.offset),
                    EdgeRel::Ne => continue,
                };
                changed |= relax(&mut dist, src, dst, offset);
                // equalities chain in both directions
                if edge.rel == EdgeRel::Eq {
                    changed |= relax(&mut dist, dst, src, -offset);
                }
            }
            if !changed {
                break;
            }
        }
        dist.iter().find(|(e, _)| *e == to).map(|(_, k)| *k)
    }
}

fn relax<'a>(dist: &mut Vec<(&'a Expr, i64)>, src: &Expr, dst: &'a Expr, offset: i64) -> bool {
    let Some(&(_, k)) = dist.iter().find(|(e, _)| *e == src) else {
        return false;
    };
    let candidate = k.saturating_add(offset);
    match dist.iter_mut().find(|(e, _)| *e == dst) {
        Some((_, cur)) => {
            if candidate < *cur {
                *cur = candidate;
                true
            } else {
                false
            }
        }
        None => {
            dist.push((dst, candidate));
            true
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::DataType;

    fn v(name: &str) -> Expr {
        Expr::var(name, DataType::int(64))
    }

    #[test]
    fn lattice_intersection() {
        assert_eq!(CompareResult::LE & CompareResult::GE, CompareResult::EQ);
        assert_eq!(CompareResult::LE & CompareResult::NE, CompareResult::LT);
        assert_eq!(CompareResult::LT & CompareResult::LE, CompareResult::LT);
        assert!(!CompareResult::LE.is_decided());
        assert!(CompareResult::GT.is_decided());
    }

    #[test]
    fn direct_edges() {
        let mut analyzer = TransitiveComparisonAnalyzer::default();
        let ty = DataType::int(64);
        // x < y
        analyzer.ingest(&Expr::lt(v("x"), v("y")));
        assert_eq!(analyzer.compare(&v("x"), &v("y"), false), CompareResult::LT);
        assert_eq!(analyzer.compare(&v("y"), &v("x"), false), CompareResult::GT);
        // x < y implies x <= y + 5
        let y5 = Expr::add(v("y"), Expr::int(5, ty));
        assert_eq!(analyzer.compare(&v("x"), &y5, false), CompareResult::LT);
    }

    #[test]
    fn transitive_chain() {
        let mut analyzer = TransitiveComparisonAnalyzer::default();
        analyzer.ingest(&Expr::le(v("a"), v("b")));
        analyzer.ingest(&Expr::lt(v("b"), v("c")));
        assert_eq!(
            analyzer.compare(&v("a"), &v("c"), false),
            CompareResult::UNKNOWN
        );
        assert_eq!(analyzer.compare(&v("a"), &v("c"), true), CompareResult::LT);
    }

    #[test]
    fn same_base_offsets() {
        let ty = DataType::int(64);
        let analyzer = TransitiveComparisonAnalyzer::default();
        let x = v("x");
        let x3 = Expr::add(x.clone(), Expr::int(3, ty));
        assert_eq!(analyzer.compare(&x, &x3, false), CompareResult::LT);
        assert_eq!(analyzer.compare(&x3, &x, false), CompareResult::GT);
    }
}
