//! Abstract representation of expressions.

use std::fmt;

use crate::pretty::{parens_group, pretty_list, Doc, SimplePretty};

use super::{shared::Shared, DataType, Lanes, Symbol};

pub type Expr = Shared<ExprData>;

#[derive(Debug, Clone, PartialEq)]
pub struct ExprData {
    pub kind: ExprKind,
    pub ty: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A variable.
    Var(Symbol),
    /// A value literal.
    Lit(LitKind),
    /// Use of a binary operator.
    Binary(BinOpKind, Expr, Expr),
    /// Boolean negation.
    Not(Expr),
    /// Element-wise selection: `select(cond, on_true, on_false)`.
    Select(Expr, Expr, Expr),
    /// A vector whose lanes all hold the same value.
    Broadcast(Expr, Expr),
    /// A vector whose `i`-th lane is `base + stride * i`.
    Ramp(Expr, Expr, Expr),
    /// A call to a builtin or external operation.
    Call(CallOp, Vec<Expr>),
    /// Conversion of the operand to this node's type.
    Cast(Expr),
    /// A let binding: `let var = value in body`.
    Let(Symbol, Expr, Expr),
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LitKind {
    /// An integer literal, stored sign-extended; the node's type carries the
    /// declared width.
    Int(i64),
    /// A floating point literal.
    Float(f64),
    /// A boolean literal.
    Bool(bool),
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BinOpKind {
    /// The `+` operator (addition).
    Add,
    /// The `-` operator (subtraction).
    Sub,
    /// The `*` operator (multiplication).
    Mul,
    /// The `/` operator (division, truncated towards zero).
    Div,
    /// The `%` operator (remainder of truncated division).
    Mod,
    /// Division rounding towards negative infinity.
    FloorDiv,
    /// Remainder of floored division; the result has the divisor's sign.
    FloorMod,
    /// The binary minimum.
    Min,
    /// The binary maximum.
    Max,
    /// The `==` operator (equality).
    Eq,
    /// The `!=` operator (inequality).
    Ne,
    /// The `<` operator (less than).
    Lt,
    /// The `<=` operator (less than or equal to).
    Le,
    /// The `>` operator (greater than).
    Gt,
    /// The `>=` operator (greater than or equal to).
    Ge,
    /// The `&&` operator (logical and).
    And,
    /// The `||` operator (logical or).
    Or,
}

impl BinOpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::FloorDiv => "floordiv",
            Self::FloorMod => "floormod",
            Self::Min => "min",
            Self::Max => "max",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// Operators rendered in call syntax rather than infix.
    fn is_call_syntax(self) -> bool {
        matches!(
            self,
            Self::FloorDiv | Self::FloorMod | Self::Min | Self::Max
        )
    }
}

/// The operations a [`ExprKind::Call`] may invoke. The simplifier only
/// rewrites the closed set of builtins; [`CallOp::Extern`] calls are opaque,
/// though their arguments are still simplified.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CallOp {
    Likely,
    ShiftLeft,
    ShiftRight,
    Ceil,
    Log2,
    Clz,
    IfThenElse,
    Vscale,
    Extern(Symbol),
}

impl CallOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOp::Likely => "likely",
            CallOp::ShiftLeft => "shift_left",
            CallOp::ShiftRight => "shift_right",
            CallOp::Ceil => "ceil",
            CallOp::Log2 => "log2",
            CallOp::Clz => "clz",
            CallOp::IfThenElse => "if_then_else",
            CallOp::Vscale => "vscale",
            CallOp::Extern(_) => "extern",
        }
    }
}

impl fmt::Display for CallOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallOp::Extern(name) => name.fmt(f),
            _ => f.write_str(self.as_str()),
        }
    }
}

impl Expr {
    pub fn var(name: &str, ty: DataType) -> Expr {
        Expr::var_named(Symbol::intern(name), ty)
    }

    pub fn var_named(name: Symbol, ty: DataType) -> Expr {
        Shared::new(ExprData {
            kind: ExprKind::Var(name),
            ty,
        })
    }

    /// An integer literal, wrapped to the width of `ty`.
    pub fn int(value: i64, ty: DataType) -> Expr {
        Shared::new(ExprData {
            kind: ExprKind::Lit(LitKind::Int(wrap_to_width(value as i128, &ty))),
            ty,
        })
    }

    pub fn float(value: f64, ty: DataType) -> Expr {
        Shared::new(ExprData {
            kind: ExprKind::Lit(LitKind::Float(value)),
            ty,
        })
    }

    pub fn bool_lit(value: bool) -> Expr {
        Expr::bool_typed(value, DataType::bool_())
    }

    /// A boolean literal with an explicit (possibly vector) type.
    pub fn bool_typed(value: bool, ty: DataType) -> Expr {
        Shared::new(ExprData {
            kind: ExprKind::Lit(LitKind::Bool(value)),
            ty,
        })
    }

    /// A zero of the same type as `like`.
    pub fn zero_like(like: &Expr) -> Expr {
        Expr::int(0, like.ty)
    }

    /// A one of the same type as `like`.
    pub fn one_like(like: &Expr) -> Expr {
        Expr::int(1, like.ty)
    }

    pub fn binary(op: BinOpKind, a: Expr, b: Expr) -> Expr {
        let ty = if op.is_comparison() {
            DataType::bool_().with_lanes(a.ty.lanes)
        } else {
            a.ty
        };
        Shared::new(ExprData {
            kind: ExprKind::Binary(op, a, b),
            ty,
        })
    }

    pub fn add(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Add, a, b)
    }

    pub fn sub(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Sub, a, b)
    }

    pub fn mul(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Mul, a, b)
    }

    pub fn truncdiv(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Div, a, b)
    }

    pub fn truncmod(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Mod, a, b)
    }

    pub fn floordiv(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::FloorDiv, a, b)
    }

    pub fn floormod(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::FloorMod, a, b)
    }

    pub fn min(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Min, a, b)
    }

    pub fn max(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Max, a, b)
    }

    pub fn eq(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Eq, a, b)
    }

    pub fn ne(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Ne, a, b)
    }

    pub fn lt(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Lt, a, b)
    }

    pub fn le(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Le, a, b)
    }

    pub fn gt(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Gt, a, b)
    }

    pub fn ge(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Ge, a, b)
    }

    pub fn and(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::And, a, b)
    }

    pub fn or(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOpKind::Or, a, b)
    }

    pub fn not(a: Expr) -> Expr {
        let ty = a.ty;
        Shared::new(ExprData {
            kind: ExprKind::Not(a),
            ty,
        })
    }

    pub fn select(cond: Expr, on_true: Expr, on_false: Expr) -> Expr {
        let ty = on_true.ty;
        Shared::new(ExprData {
            kind: ExprKind::Select(cond, on_true, on_false),
            ty,
        })
    }

    pub fn broadcast(value: Expr, lanes: Expr) -> Expr {
        let ty = value.ty.with_lanes(lanes_of_expr(&lanes));
        Shared::new(ExprData {
            kind: ExprKind::Broadcast(value, lanes),
            ty,
        })
    }

    pub fn ramp(base: Expr, stride: Expr, lanes: Expr) -> Expr {
        let ty = base.ty.with_lanes(lanes_of_expr(&lanes));
        Shared::new(ExprData {
            kind: ExprKind::Ramp(base, stride, lanes),
            ty,
        })
    }

    pub fn call(op: CallOp, args: Vec<Expr>, ty: DataType) -> Expr {
        Shared::new(ExprData {
            kind: ExprKind::Call(op, args),
            ty,
        })
    }

    pub fn cast(ty: DataType, value: Expr) -> Expr {
        if value.ty == ty {
            return value;
        }
        Shared::new(ExprData {
            kind: ExprKind::Cast(value),
            ty,
        })
    }

    pub fn let_in(name: Symbol, value: Expr, body: Expr) -> Expr {
        let ty = body.ty;
        Shared::new(ExprData {
            kind: ExprKind::Let(name, value, body),
            ty,
        })
    }

    /// The value of a scalar integer literal.
    pub fn as_const_int(&self) -> Option<i64> {
        match &self.kind {
            ExprKind::Lit(LitKind::Int(v)) if !self.ty.is_vector() => Some(*v),
            _ => None,
        }
    }

    pub fn as_const_float(&self) -> Option<f64> {
        match &self.kind {
            ExprKind::Lit(LitKind::Float(v)) if !self.ty.is_vector() => Some(*v),
            _ => None,
        }
    }

    pub fn as_const_bool(&self) -> Option<bool> {
        match &self.kind {
            ExprKind::Lit(LitKind::Bool(v)) if !self.ty.is_vector() => Some(*v),
            _ => None,
        }
    }

    /// Whether this expression is any literal.
    pub fn is_const(&self) -> bool {
        matches!(self.kind, ExprKind::Lit(_))
    }

    pub fn is_const_int_value(&self, value: i64) -> bool {
        self.as_const_int() == Some(value)
    }

    pub fn is_true_lit(&self) -> bool {
        self.as_const_bool() == Some(true)
    }

    pub fn is_false_lit(&self) -> bool {
        self.as_const_bool() == Some(false)
    }
}

/// Wrap a value to the declared width of an integer type, sign-extending for
/// signed types and zero-extending for unsigned ones.
pub fn wrap_to_width(value: i128, ty: &DataType) -> i64 {
    use super::ScalarKind;
    match ty.scalar {
        ScalarKind::Int(b) if b < 64 => {
            let shift = 128 - b as u32;
            ((value << shift) >> shift) as i64
        }
        ScalarKind::UInt(b) if b < 64 => (value & ((1i128 << b) - 1)) as i64,
        _ => value as i64,
    }
}

/// Determine the vector shape described by a lanes expression: an integer
/// literal gives fixed lanes; anything mentioning `vscale` is scalable.
pub fn lanes_of_expr(lanes: &Expr) -> Lanes {
    if let Some(n) = lanes.as_const_int() {
        return Lanes::Fixed(n as u32);
    }
    match &lanes.kind {
        ExprKind::Call(CallOp::Vscale, _) => Lanes::Scalable(1),
        ExprKind::Binary(BinOpKind::Mul, a, b) => {
            match (&a.kind, b.as_const_int(), a.as_const_int(), &b.kind) {
                (ExprKind::Call(CallOp::Vscale, _), Some(n), _, _) => Lanes::Scalable(n as u32),
                (_, _, Some(n), ExprKind::Call(CallOp::Vscale, _)) => Lanes::Scalable(n as u32),
                _ => Lanes::Scalable(0),
            }
        }
        _ => Lanes::Scalable(0),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.pretty().render_fmt(80, f)
    }
}

impl SimplePretty for Expr {
    fn pretty(&self) -> Doc {
        let res = match &self.kind {
            ExprKind::Var(name) => Doc::as_string(name),
            ExprKind::Lit(lit) => lit.pretty(),
            ExprKind::Binary(op, lhs, rhs) if op.is_call_syntax() => {
                Doc::text(op.as_str()).append(parens_group(pretty_list([lhs, rhs])))
            }
            ExprKind::Binary(op, lhs, rhs) => parens_group(
                lhs.pretty()
                    .append(Doc::space())
                    .append(Doc::text(op.as_str()))
                    .append(Doc::space())
                    .append(rhs.pretty()),
            ),
            ExprKind::Not(operand) => Doc::text("!").append(parens_group(operand.pretty())),
            ExprKind::Select(cond, on_true, on_false) => {
                Doc::text("select").append(parens_group(pretty_list([cond, on_true, on_false])))
            }
            ExprKind::Broadcast(value, lanes) => {
                Doc::text("broadcast").append(parens_group(pretty_list([value, lanes])))
            }
            ExprKind::Ramp(base, stride, lanes) => {
                Doc::text("ramp").append(parens_group(pretty_list([base, stride, lanes])))
            }
            ExprKind::Call(op, args) => {
                Doc::as_string(op).append(parens_group(pretty_list(args)))
            }
            ExprKind::Cast(value) => Doc::text("cast").append(parens_group(
                Doc::as_string(self.ty)
                    .append(Doc::text(", "))
                    .append(Doc::line_())
                    .append(value.pretty()),
            )),
            ExprKind::Let(name, value, body) => Doc::text("let ")
                .append(Doc::as_string(name))
                .append(Doc::text(" = "))
                .append(value.pretty())
                .append(Doc::text(" in "))
                .append(body.pretty()),
        };
        Doc::group(res)
    }
}

impl fmt::Display for LitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LitKind::Int(v) => v.fmt(f),
            LitKind::Float(v) => write!(f, "{:?}", v),
            LitKind::Bool(v) => v.fmt(f),
        }
    }
}

impl SimplePretty for LitKind {
    fn pretty(&self) -> Doc {
        Doc::as_string(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pretty::pretty_string;

    #[test]
    fn format_expr() {
        let ty = DataType::int(32);
        let x = Expr::var("x", ty);
        let y = Expr::var("y", ty);
        let expr = Expr::add(x, Expr::mul(y, Expr::int(17, ty)));
        assert_eq!(pretty_string(&expr), "(x + (y * 17))");
    }

    #[test]
    fn wrap_literals_to_width() {
        let e = Expr::int(300, DataType::int(8));
        assert_eq!(e.as_const_int(), Some(44));
        let e = Expr::int(-1, DataType::uint(8));
        assert_eq!(e.as_const_int(), Some(255));
    }

    #[test]
    fn structural_equality() {
        let ty = DataType::int(32);
        let a = Expr::add(Expr::var("x", ty), Expr::int(1, ty));
        let b = Expr::add(Expr::var("x", ty), Expr::int(1, ty));
        assert_eq!(a, b);
        assert!(!Expr::ptr_eq(&a, &b));
    }
}
