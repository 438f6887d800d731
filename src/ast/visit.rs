//! Read-only traversal over expressions.

use super::{Expr, ExprKind};

pub trait Visitor: Sized {
    fn visit_expr(&mut self, e: &Expr) {
        walk_expr(self, e)
    }
}

pub fn walk_expr<V: Visitor>(visitor: &mut V, e: &Expr) {
    match &e.kind {
        ExprKind::Var(_) | ExprKind::Lit(_) => {}
        ExprKind::Binary(_op, lhs, rhs) => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }
        ExprKind::Not(operand) => visitor.visit_expr(operand),
        ExprKind::Select(cond, on_true, on_false) => {
            visitor.visit_expr(cond);
            visitor.visit_expr(on_true);
            visitor.visit_expr(on_false);
        }
        ExprKind::Broadcast(value, lanes) => {
            visitor.visit_expr(value);
            visitor.visit_expr(lanes);
        }
        ExprKind::Ramp(base, stride, lanes) => {
            visitor.visit_expr(base);
            visitor.visit_expr(stride);
            visitor.visit_expr(lanes);
        }
        ExprKind::Call(_op, args) => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        ExprKind::Cast(value) => visitor.visit_expr(value),
        ExprKind::Let(_name, value, body) => {
            visitor.visit_expr(value);
            visitor.visit_expr(body);
        }
    }
}
