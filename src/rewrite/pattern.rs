//! A typed pattern language for the rewrite rules.
//!
//! Pattern trees are stack-allocated `Copy` values built with operator
//! overloading (`+`, `-`, `*`, `!`) plus comparison/logical methods and
//! constructor functions. Pattern variables are indices into a [`MatchState`]
//! whose slots are reset at the start of every match attempt; a variable seen
//! twice in one pattern must unify with a structurally equal expression.
//!
//! When using [`matches_one_of`], the different alternatives may bind
//! different variable sets; a result pattern must only reference variables
//! bound in *every* alternative.

use std::ops::{Add, Mul, Not, Sub};

use crate::ast::{BinOpKind, DataType, Expr, ExprKind};

use super::const_fold::{fold_or_build, fold_or_build_not};

pub const MAX_EXPR_VARS: usize = 10;
pub const MAX_INT_VARS: usize = 4;
pub const MAX_FLOAT_VARS: usize = 2;

/// Binding slots for one match attempt.
pub struct MatchState {
    exprs: [Option<Expr>; MAX_EXPR_VARS],
    ints: [Option<Expr>; MAX_INT_VARS],
    floats: [Option<Expr>; MAX_FLOAT_VARS],
}

impl MatchState {
    pub fn new() -> Self {
        MatchState {
            exprs: std::array::from_fn(|_| None),
            ints: std::array::from_fn(|_| None),
            floats: std::array::from_fn(|_| None),
        }
    }

    pub fn reset(&mut self) {
        self.exprs = std::array::from_fn(|_| None);
        self.ints = std::array::from_fn(|_| None);
        self.floats = std::array::from_fn(|_| None);
    }
}

impl Default for MatchState {
    fn default() -> Self {
        MatchState::new()
    }
}

/// A node of a pattern tree.
pub trait PatternNode: Copy {
    fn match_in(&self, e: &Expr, st: &mut MatchState) -> bool;

    /// Materialize the pattern after a successful match. `hint` supplies the
    /// datatype for bare literal patterns that cannot infer one from a
    /// sibling.
    fn eval(&self, st: &MatchState, hint: Option<&DataType>) -> Expr;

    /// Whether [`PatternNode::eval`] needs a datatype hint (bare literals).
    fn needs_hint(&self) -> bool {
        false
    }
}

/// Wrapper providing the operator-overloading surface; `T` is the concrete
/// pattern node.
#[derive(Clone, Copy)]
pub struct P<T>(pub T);

/// An untyped pattern variable: matches any expression.
#[derive(Clone, Copy)]
pub struct PVarExpr {
    slot: usize,
}

impl PatternNode for PVarExpr {
    fn match_in(&self, e: &Expr, st: &mut MatchState) -> bool {
        if let Some(bound) = &st.exprs[self.slot] {
            return bound == e;
        }
        st.exprs[self.slot] = Some(e.clone());
        true
    }

    fn eval(&self, st: &MatchState, _hint: Option<&DataType>) -> Expr {
        st.exprs[self.slot]
            .clone()
            .expect("unbound expression pattern variable in result")
    }
}

/// A typed pattern variable that only binds to scalar integer literals.
#[derive(Clone, Copy)]
pub struct PVarInt {
    slot: usize,
}

impl PatternNode for PVarInt {
    fn match_in(&self, e: &Expr, st: &mut MatchState) -> bool {
        if e.as_const_int().is_none() {
            return false;
        }
        if let Some(bound) = &st.ints[self.slot] {
            return bound == e;
        }
        st.ints[self.slot] = Some(e.clone());
        true
    }

    fn eval(&self, st: &MatchState, _hint: Option<&DataType>) -> Expr {
        st.ints[self.slot]
            .clone()
            .expect("unbound integer pattern variable in result")
    }
}

/// A typed pattern variable that only binds to scalar float literals.
#[derive(Clone, Copy)]
pub struct PVarFloat {
    slot: usize,
}

impl PatternNode for PVarFloat {
    fn match_in(&self, e: &Expr, st: &mut MatchState) -> bool {
        if e.as_const_float().is_none() {
            return false;
        }
        if let Some(bound) = &st.floats[self.slot] {
            return bound == e;
        }
        st.floats[self.slot] = Some(e.clone());
        true
    }

    fn eval(&self, st: &MatchState, _hint: Option<&DataType>) -> Expr {
        st.floats[self.slot]
            .clone()
            .expect("unbound float pattern variable in result")
    }
}

/// Declare `N` distinct expression pattern variables.
pub fn pvars_expr<const N: usize>() -> [P<PVarExpr>; N] {
    assert!(N <= MAX_EXPR_VARS);
    std::array::from_fn(|slot| P(PVarExpr { slot }))
}

/// Declare `N` distinct integer-literal pattern variables.
pub fn pvars_int<const N: usize>() -> [P<PVarInt>; N] {
    assert!(N <= MAX_INT_VARS);
    std::array::from_fn(|slot| P(PVarInt { slot }))
}

/// Declare `N` distinct float-literal pattern variables.
pub fn pvars_float<const N: usize>() -> [P<PVarFloat>; N] {
    assert!(N <= MAX_FLOAT_VARS);
    std::array::from_fn(|slot| P(PVarFloat { slot }))
}

impl P<PVarExpr> {
    /// The expression bound to this variable. Panics when unbound.
    pub fn get(&self, st: &MatchState) -> Expr {
        self.0.eval(st, None)
    }

    pub fn try_get(&self, st: &MatchState) -> Option<Expr> {
        st.exprs[self.0.slot].clone()
    }

    /// The bound expression, or a typed zero when this variable did not
    /// participate in the matched alternative.
    pub fn get_or_zero(&self, st: &MatchState, like: &Expr) -> Expr {
        self.try_get(st)
            .unwrap_or_else(|| Expr::int(0, like.ty.element()))
    }
}

impl P<PVarInt> {
    pub fn get(&self, st: &MatchState) -> Expr {
        self.0.eval(st, None)
    }

    /// The value of the bound integer literal. Panics when unbound.
    pub fn val(&self, st: &MatchState) -> i64 {
        self.get(st).as_const_int().unwrap()
    }
}

impl P<PVarFloat> {
    pub fn val(&self, st: &MatchState) -> f64 {
        self.0.eval(st, None).as_const_float().unwrap()
    }
}

/// A bare integer literal in a pattern: matches exactly that value and needs
/// a sibling or root type hint when evaluated.
#[derive(Clone, Copy)]
pub struct PConstInt {
    value: i64,
}

impl PatternNode for PConstInt {
    fn match_in(&self, e: &Expr, _st: &mut MatchState) -> bool {
        e.as_const_int() == Some(self.value)
    }

    fn eval(&self, _st: &MatchState, hint: Option<&DataType>) -> Expr {
        let ty = hint.expect("integer literal pattern needs a type hint");
        typed_const(self.value, ty.element())
    }

    fn needs_hint(&self) -> bool {
        true
    }
}

/// A numeric constant of the element type `ty`, as a float literal for float
/// types and an integer literal otherwise.
fn typed_const(value: i64, ty: DataType) -> Expr {
    if ty.is_float() {
        Expr::float(value as f64, ty)
    } else {
        Expr::int(value, ty)
    }
}

/// A boolean literal result; takes its (possibly vector) type from the hint.
#[derive(Clone, Copy)]
pub struct PConstBool {
    value: bool,
}

impl PatternNode for PConstBool {
    fn match_in(&self, e: &Expr, _st: &mut MatchState) -> bool {
        e.as_const_bool() == Some(self.value)
    }

    fn eval(&self, _st: &MatchState, hint: Option<&DataType>) -> Expr {
        let ty = hint.expect("boolean literal pattern needs a type hint");
        Expr::bool_typed(self.value, *ty)
    }

    fn needs_hint(&self) -> bool {
        true
    }
}

/// An integer literal whose type is taken from another bound pattern.
#[derive(Clone, Copy)]
pub struct PTypedConst<T> {
    value: i64,
    like: T,
}

impl<T: PatternNode> PatternNode for PTypedConst<T> {
    fn match_in(&self, e: &Expr, _st: &mut MatchState) -> bool {
        e.as_const_int() == Some(self.value)
    }

    fn eval(&self, st: &MatchState, _hint: Option<&DataType>) -> Expr {
        let like = self.like.eval(st, None);
        typed_const(self.value, like.ty)
    }
}

#[derive(Clone, Copy)]
pub struct PBin<A, B> {
    op: BinOpKind,
    a: A,
    b: B,
}

impl<A: PatternNode, B: PatternNode> PatternNode for PBin<A, B> {
    fn match_in(&self, e: &Expr, st: &mut MatchState) -> bool {
        match &e.kind {
            ExprKind::Binary(op, a, b) if *op == self.op => {
                self.a.match_in(a, st) && self.b.match_in(b, st)
            }
            _ => false,
        }
    }

    fn eval(&self, st: &MatchState, hint: Option<&DataType>) -> Expr {
        // Comparison operands have their own type, unrelated to the boolean
        // result the hint describes.
        let child_hint = if self.op.is_comparison() { None } else { hint };
        let (ea, eb);
        if self.a.needs_hint() && !self.b.needs_hint() {
            eb = self.b.eval(st, child_hint);
            ea = self.a.eval(st, Some(&eb.ty));
        } else {
            ea = self.a.eval(st, child_hint);
            let a_ty = ea.ty;
            eb = self.b.eval(st, Some(&a_ty));
        }
        fold_or_build(self.op, ea, eb)
    }
}

#[derive(Clone, Copy)]
pub struct PNot<A> {
    a: A,
}

impl<A: PatternNode> PatternNode for PNot<A> {
    fn match_in(&self, e: &Expr, st: &mut MatchState) -> bool {
        match &e.kind {
            ExprKind::Not(operand) => self.a.match_in(operand, st),
            _ => false,
        }
    }

    fn eval(&self, st: &MatchState, hint: Option<&DataType>) -> Expr {
        fold_or_build_not(self.a.eval(st, hint))
    }
}

#[derive(Clone, Copy)]
pub struct PSelect<C, T, F> {
    cond: C,
    on_true: T,
    on_false: F,
}

impl<C: PatternNode, T: PatternNode, F: PatternNode> PatternNode for PSelect<C, T, F> {
    fn match_in(&self, e: &Expr, st: &mut MatchState) -> bool {
        match &e.kind {
            ExprKind::Select(cond, on_true, on_false) => {
                self.cond.match_in(cond, st)
                    && self.on_true.match_in(on_true, st)
                    && self.on_false.match_in(on_false, st)
            }
            _ => false,
        }
    }

    fn eval(&self, st: &MatchState, hint: Option<&DataType>) -> Expr {
        let cond = self.cond.eval(st, None);
        let on_true = self.on_true.eval(st, hint);
        let t_ty = on_true.ty;
        let on_false = self.on_false.eval(st, Some(&t_ty));
        match cond.as_const_bool() {
            Some(true) => on_true,
            Some(false) => on_false,
            None => Expr::select(cond, on_true, on_false),
        }
    }
}

#[derive(Clone, Copy)]
pub struct PBroadcast<V, L> {
    value: V,
    lanes: L,
}

impl<V: PatternNode, L: PatternNode> PatternNode for PBroadcast<V, L> {
    fn match_in(&self, e: &Expr, st: &mut MatchState) -> bool {
        match &e.kind {
            ExprKind::Broadcast(value, lanes) => {
                self.value.match_in(value, st) && self.lanes.match_in(lanes, st)
            }
            _ => false,
        }
    }

    fn eval(&self, st: &MatchState, _hint: Option<&DataType>) -> Expr {
        let value = self.value.eval(st, None);
        let lanes = self.lanes.eval(st, None);
        Expr::broadcast(value, lanes)
    }
}

#[derive(Clone, Copy)]
pub struct PRamp<B, S, L> {
    base: B,
    stride: S,
    lanes: L,
}

impl<B: PatternNode, S: PatternNode, L: PatternNode> PatternNode for PRamp<B, S, L> {
    fn match_in(&self, e: &Expr, st: &mut MatchState) -> bool {
        match &e.kind {
            ExprKind::Ramp(base, stride, lanes) => {
                self.base.match_in(base, st)
                    && self.stride.match_in(stride, st)
                    && self.lanes.match_in(lanes, st)
            }
            _ => false,
        }
    }

    fn eval(&self, st: &MatchState, _hint: Option<&DataType>) -> Expr {
        let base = self.base.eval(st, None);
        let base_ty = base.ty;
        let stride = self.stride.eval(st, Some(&base_ty));
        let lanes = self.lanes.eval(st, None);
        Expr::ramp(base, stride, lanes)
    }
}

/// Alternatives tried in order; the first successful match wins. Slots are
/// reset before each alternative so partial bindings never leak.
#[derive(Clone, Copy)]
pub struct POneOf<T> {
    alts: T,
}

macro_rules! impl_one_of {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: PatternNode),+> PatternNode for POneOf<($(P<$name>,)+)> {
            fn match_in(&self, e: &Expr, st: &mut MatchState) -> bool {
                $(
                    st.reset();
                    let P(ref alternative) = (self.alts).$idx;
                    if alternative.match_in(e, st) {
                        return true;
                    }
                )+
                false
            }

            fn eval(&self, _st: &MatchState, _hint: Option<&DataType>) -> Expr {
                unreachable!("matches_one_of cannot be used as a result pattern")
            }
        }
    };
}

impl_one_of!(A: 0, B: 1);
impl_one_of!(A: 0, B: 1, C: 2);
impl_one_of!(A: 0, B: 1, C: 2, D: 3);
impl_one_of!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_one_of!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_one_of!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_one_of!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

pub fn matches_one_of<T: Copy>(alts: T) -> P<POneOf<T>> {
    P(POneOf { alts })
}

/// Conversion of pattern operands: patterns pass through, `i64` embeds as a
/// constant pattern.
pub trait IntoPat: Copy {
    type Node: PatternNode;
    fn into_pat(self) -> Self::Node;
}

impl<T: PatternNode> IntoPat for P<T> {
    type Node = T;
    fn into_pat(self) -> T {
        self.0
    }
}

impl IntoPat for i64 {
    type Node = PConstInt;
    fn into_pat(self) -> PConstInt {
        PConstInt { value: self }
    }
}

fn bin<A: IntoPat, B: IntoPat>(op: BinOpKind, a: A, b: B) -> P<PBin<A::Node, B::Node>> {
    P(PBin {
        op,
        a: a.into_pat(),
        b: b.into_pat(),
    })
}

impl<A: PatternNode, B: PatternNode> Add<P<B>> for P<A> {
    type Output = P<PBin<A, B>>;
    fn add(self, rhs: P<B>) -> Self::Output {
        bin(BinOpKind::Add, self, rhs)
    }
}

impl<A: PatternNode> Add<i64> for P<A> {
    type Output = P<PBin<A, PConstInt>>;
    fn add(self, rhs: i64) -> Self::Output {
        bin(BinOpKind::Add, self, rhs)
    }
}

impl<A: PatternNode> Add<P<A>> for i64 {
    type Output = P<PBin<PConstInt, A>>;
    fn add(self, rhs: P<A>) -> Self::Output {
        bin(BinOpKind::Add, self, rhs)
    }
}

impl<A: PatternNode, B: PatternNode> Sub<P<B>> for P<A> {
    type Output = P<PBin<A, B>>;
    fn sub(self, rhs: P<B>) -> Self::Output {
        bin(BinOpKind::Sub, self, rhs)
    }
}

impl<A: PatternNode> Sub<i64> for P<A> {
    type Output = P<PBin<A, PConstInt>>;
    fn sub(self, rhs: i64) -> Self::Output {
        bin(BinOpKind::Sub, self, rhs)
    }
}

impl<A: PatternNode> Sub<P<A>> for i64 {
    type Output = P<PBin<PConstInt, A>>;
    fn sub(self, rhs: P<A>) -> Self::Output {
        bin(BinOpKind::Sub, self, rhs)
    }
}

impl<A: PatternNode, B: PatternNode> Mul<P<B>> for P<A> {
    type Output = P<PBin<A, B>>;
    fn mul(self, rhs: P<B>) -> Self::Output {
        bin(BinOpKind::Mul, self, rhs)
    }
}

impl<A: PatternNode> Mul<i64> for P<A> {
    type Output = P<PBin<A, PConstInt>>;
    fn mul(self, rhs: i64) -> Self::Output {
        bin(BinOpKind::Mul, self, rhs)
    }
}

impl<A: PatternNode> Mul<P<A>> for i64 {
    type Output = P<PBin<PConstInt, A>>;
    fn mul(self, rhs: P<A>) -> Self::Output {
        bin(BinOpKind::Mul, self, rhs)
    }
}

impl<A: PatternNode> Not for P<A> {
    type Output = P<PNot<A>>;
    fn not(self) -> Self::Output {
        P(PNot { a: self.0 })
    }
}

impl<A: PatternNode> P<A> {
    pub fn lt<B: IntoPat>(self, other: B) -> P<PBin<A, B::Node>> {
        bin(BinOpKind::Lt, self, other)
    }

    pub fn le<B: IntoPat>(self, other: B) -> P<PBin<A, B::Node>> {
        bin(BinOpKind::Le, self, other)
    }

    pub fn gt<B: IntoPat>(self, other: B) -> P<PBin<A, B::Node>> {
        bin(BinOpKind::Gt, self, other)
    }

    pub fn ge<B: IntoPat>(self, other: B) -> P<PBin<A, B::Node>> {
        bin(BinOpKind::Ge, self, other)
    }

    pub fn eq<B: IntoPat>(self, other: B) -> P<PBin<A, B::Node>> {
        bin(BinOpKind::Eq, self, other)
    }

    pub fn ne<B: IntoPat>(self, other: B) -> P<PBin<A, B::Node>> {
        bin(BinOpKind::Ne, self, other)
    }

    pub fn and<B: IntoPat>(self, other: B) -> P<PBin<A, B::Node>> {
        bin(BinOpKind::And, self, other)
    }

    pub fn or<B: IntoPat>(self, other: B) -> P<PBin<A, B::Node>> {
        bin(BinOpKind::Or, self, other)
    }
}

pub fn min<A: IntoPat, B: IntoPat>(a: A, b: B) -> P<PBin<A::Node, B::Node>> {
    bin(BinOpKind::Min, a, b)
}

pub fn max<A: IntoPat, B: IntoPat>(a: A, b: B) -> P<PBin<A::Node, B::Node>> {
    bin(BinOpKind::Max, a, b)
}

pub fn truncdiv<A: IntoPat, B: IntoPat>(a: A, b: B) -> P<PBin<A::Node, B::Node>> {
    bin(BinOpKind::Div, a, b)
}

pub fn truncmod<A: IntoPat, B: IntoPat>(a: A, b: B) -> P<PBin<A::Node, B::Node>> {
    bin(BinOpKind::Mod, a, b)
}

pub fn floordiv<A: IntoPat, B: IntoPat>(a: A, b: B) -> P<PBin<A::Node, B::Node>> {
    bin(BinOpKind::FloorDiv, a, b)
}

pub fn floormod<A: IntoPat, B: IntoPat>(a: A, b: B) -> P<PBin<A::Node, B::Node>> {
    bin(BinOpKind::FloorMod, a, b)
}

pub fn select<C: IntoPat, T: IntoPat, F: IntoPat>(
    cond: C,
    on_true: T,
    on_false: F,
) -> P<PSelect<C::Node, T::Node, F::Node>> {
    P(PSelect {
        cond: cond.into_pat(),
        on_true: on_true.into_pat(),
        on_false: on_false.into_pat(),
    })
}

pub fn broadcast<V: IntoPat, L: IntoPat>(value: V, lanes: L) -> P<PBroadcast<V::Node, L::Node>> {
    P(PBroadcast {
        value: value.into_pat(),
        lanes: lanes.into_pat(),
    })
}

pub fn ramp<B: IntoPat, S: IntoPat, L: IntoPat>(
    base: B,
    stride: S,
    lanes: L,
) -> P<PRamp<B::Node, S::Node, L::Node>> {
    P(PRamp {
        base: base.into_pat(),
        stride: stride.into_pat(),
        lanes: lanes.into_pat(),
    })
}

/// A zero with the type of `like`'s binding.
pub fn zero_like<T: IntoPat>(like: T) -> P<PTypedConst<T::Node>> {
    P(PTypedConst {
        value: 0,
        like: like.into_pat(),
    })
}

/// A one with the type of `like`'s binding.
pub fn one_like<T: IntoPat>(like: T) -> P<PTypedConst<T::Node>> {
    P(PTypedConst {
        value: 1,
        like: like.into_pat(),
    })
}

/// A boolean literal result pattern; the type (and lanes) come from the
/// rewritten node.
pub fn pbool(value: bool) -> P<PConstBool> {
    P(PConstBool { value })
}

/// An explicit integer literal pattern, for positions where a bare `i64`
/// cannot be used (e.g. as a method receiver).
pub fn pint(value: i64) -> P<PConstInt> {
    P(PConstInt { value })
}

/// Try to match `$pat` against `$ret`, resetting the shared slots first.
macro_rules! pmatch {
    ($st:ident, $ret:ident, $pat:expr) => {{
        $st.reset();
        $crate::rewrite::pattern::PatternNode::match_in(&($pat).0, &$ret, &mut $st)
    }};
}
pub(crate) use pmatch;

/// Rewrite `$ret` to `$res` when `$pat` matches.
macro_rules! try_rewrite {
    ($slf:ident, $st:ident, $ret:ident, $pat:expr, $res:expr) => {
        $slf.stats.rewrites_attempted += 1;
        if !$slf.budget_exhausted() && $crate::rewrite::pattern::pmatch!($st, $ret, $pat) {
            $slf.stats.rewrites_performed += 1;
            return ($res).0.eval(&$st, Some(&$ret.ty));
        }
    };
}
pub(crate) use try_rewrite;

/// Rewrite `$ret` to `$res` when `$pat` matches and the guard `$cond` (which
/// may inspect the bound variables) holds.
macro_rules! try_rewrite_if {
    ($slf:ident, $st:ident, $ret:ident, $pat:expr, $res:expr, $cond:expr) => {
        $slf.stats.rewrites_attempted += 1;
        if !$slf.budget_exhausted() && $crate::rewrite::pattern::pmatch!($st, $ret, $pat) && $cond {
            $slf.stats.rewrites_performed += 1;
            return ($res).0.eval(&$st, Some(&$ret.ty));
        }
    };
}
pub(crate) use try_rewrite_if;

/// Like [`try_rewrite!`], but re-enters the simplifier on the result,
/// bounded by the global rewrite budget.
macro_rules! try_recursive_rewrite {
    ($slf:ident, $st:ident, $ret:ident, $pat:expr, $res:expr) => {
        $slf.stats.rewrites_attempted += 1;
        if !$slf.budget_exhausted() && $crate::rewrite::pattern::pmatch!($st, $ret, $pat) {
            $slf.stats.rewrites_performed += 1;
            let rewritten = ($res).0.eval(&$st, Some(&$ret.ty));
            return $slf.recursive_rewrite(rewritten);
        }
    };
}
pub(crate) use try_recursive_rewrite;

macro_rules! try_recursive_rewrite_if {
    ($slf:ident, $st:ident, $ret:ident, $pat:expr, $res:expr, $cond:expr) => {
        $slf.stats.rewrites_attempted += 1;
        if !$slf.budget_exhausted() && $crate::rewrite::pattern::pmatch!($st, $ret, $pat) && $cond {
            $slf.stats.rewrites_performed += 1;
            let rewritten = ($res).0.eval(&$st, Some(&$ret.ty));
            return $slf.recursive_rewrite(rewritten);
        }
    };
}
pub(crate) use try_recursive_rewrite_if;

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::DataType;

    fn ity() -> DataType {
        DataType::int(32)
    }

    #[test]
    fn variable_unification() {
        let [x, y] = pvars_expr();
        let mut st = MatchState::new();
        let a = Expr::var("a", ity());
        let b = Expr::var("b", ity());
        // (a - b) + b matches (x - y) + y
        let e = Expr::add(Expr::sub(a.clone(), b.clone()), b.clone());
        let pat = (x - y) + y;
        assert!(pmatch!(st, e, pat));
        assert_eq!(x.get(&st), a);
        assert_eq!(y.get(&st), b);
        // (a - b) + a does not: y must unify
        let e = Expr::add(Expr::sub(a.clone(), b.clone()), a.clone());
        assert!(!pmatch!(st, e, pat));
    }

    #[test]
    fn typed_literal_variables_refuse_non_literals() {
        let [x] = pvars_expr();
        let [c1] = pvars_int();
        let mut st = MatchState::new();
        let a = Expr::var("a", ity());
        let pat = x + c1;
        let e = Expr::add(a.clone(), Expr::int(3, ity()));
        assert!(pmatch!(st, e, pat));
        assert_eq!(c1.val(&st), 3);
        let e = Expr::add(a.clone(), a.clone());
        assert!(!pmatch!(st, e, pat));
    }

    #[test]
    fn one_of_resets_bindings() {
        let [x, y] = pvars_expr();
        let [c1] = pvars_int();
        let mut st = MatchState::new();
        let a = Expr::var("a", ity());
        let b = Expr::var("b", ity());
        // The first alternative binds y to `a` before failing on the
        // literal; a stale binding would make the second alternative's
        // unification of y against `b` fail.
        let pat = matches_one_of((y + c1, x + y));
        let e = Expr::add(a.clone(), b.clone());
        assert!(pmatch!(st, e, pat));
        assert_eq!(x.get(&st), a);
        assert_eq!(y.get(&st), b);
    }

    #[test]
    fn eval_folds_constants() {
        let [x] = pvars_expr();
        let [c1, c2] = pvars_int();
        let mut st = MatchState::new();
        let a = Expr::var("a", ity());
        let e = Expr::add(Expr::add(a.clone(), Expr::int(2, ity())), Expr::int(3, ity()));
        let pat = (x + c1) + c2;
        assert!(pmatch!(st, e, pat));
        let res = (x + (c1 + c2)).0.eval(&st, Some(&e.ty));
        assert_eq!(res, Expr::add(a, Expr::int(5, ity())));
    }

    #[test]
    fn bare_literals_take_sibling_types() {
        let [x] = pvars_expr();
        let mut st = MatchState::new();
        let a = Expr::var("a", DataType::int(8));
        let e = Expr::mul(a.clone(), Expr::int(2, DataType::int(8)));
        let pat = x * 2;
        assert!(pmatch!(st, e, pat));
        let res = (x * 4).0.eval(&st, Some(&e.ty));
        assert_eq!(res.ty, DataType::int(8));
    }
}
