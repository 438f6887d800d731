//! Visitors for selection, calls, variables, casts, lets, and the vector
//! constructors.

use crate::ast::{CallOp, Expr, ExprKind};

use super::const_fold::{fold_or_build, fold_or_build_not, try_cast_fold};
use super::normalize::normalize_boolean_operators;
use super::pattern::{pvars_expr, select, try_rewrite, MatchState, PatternNode};
use super::RewriteSimplifier;
use crate::ast::BinOpKind;

impl RewriteSimplifier<'_> {
    pub(crate) fn visit_select(&mut self, orig: &Expr) -> Expr {
        let ExprKind::Select(cond, on_true, on_false) = &orig.kind else {
            unreachable!("visit_select on a non-select node")
        };
        let ncond = self.visit_expr(cond);
        if let Some(taken) = ncond.as_const_bool() {
            // a literal condition selects its branch outright
            return if taken {
                self.visit_expr(on_true)
            } else {
                self.visit_expr(on_false)
            };
        }

        // each branch is simplified knowing which way the condition went
        let frame = self.analyzer.push_constraint(&ncond);
        let ntrue = self.visit_expr(on_true);
        self.analyzer.pop_constraint(frame);

        let negated = normalize_boolean_operators(&fold_or_build_not(ncond.clone()));
        let frame = self.analyzer.push_constraint(&negated);
        let nfalse = self.visit_expr(on_false);
        self.analyzer.pop_constraint(frame);

        let ret = if Expr::ptr_eq(&ncond, cond)
            && Expr::ptr_eq(&ntrue, on_true)
            && Expr::ptr_eq(&nfalse, on_false)
        {
            orig.clone()
        } else {
            Expr::select(ncond, ntrue, nfalse)
        };

        let [x, y] = pvars_expr();
        let mut st = MatchState::new();
        try_rewrite!(self, st, ret, select(x, y, y), y);
        ret
    }

    pub(crate) fn visit_call(&mut self, orig: &Expr) -> Expr {
        let ExprKind::Call(op, args) = &orig.kind else {
            unreachable!("visit_call on a non-call node")
        };
        let op = *op;

        // if_then_else branches are visited under their condition, like
        // select
        let nargs: Vec<Expr> = if op == CallOp::IfThenElse && args.len() == 3 {
            let cond = self.visit_expr(&args[0]);

            let frame = self.analyzer.push_constraint(&cond);
            let then_value = self.visit_expr(&args[1]);
            self.analyzer.pop_constraint(frame);

            let negated = normalize_boolean_operators(&fold_or_build_not(cond.clone()));
            let frame = self.analyzer.push_constraint(&negated);
            let else_value = self.visit_expr(&args[2]);
            self.analyzer.pop_constraint(frame);

            vec![cond, then_value, else_value]
        } else {
            args.iter().map(|arg| self.visit_expr(arg)).collect()
        };

        let unchanged = nargs
            .iter()
            .zip(args.iter())
            .all(|(n, o)| Expr::ptr_eq(n, o));
        let ret = if unchanged {
            orig.clone()
        } else {
            Expr::call(op, nargs, orig.ty)
        };

        let ExprKind::Call(_, args) = &ret.kind else {
            unreachable!()
        };

        match op {
            CallOp::Likely => {
                // a decided likelihood hint is just its argument
                if args[0].is_const() {
                    return args[0].clone();
                }
            }
            CallOp::ShiftRight => {
                if let (Some(a), Some(b)) = (args[0].as_const_int(), args[1].as_const_int()) {
                    if (0..64).contains(&b) {
                        return Expr::int(a >> b, ret.ty);
                    }
                }
            }
            CallOp::ShiftLeft => {
                if let (Some(a), Some(b)) = (args[0].as_const_int(), args[1].as_const_int()) {
                    if (0..64).contains(&b) {
                        return Expr::int(a.wrapping_shl(b as u32), ret.ty);
                    }
                }
            }
            CallOp::Ceil => {
                let arg = &args[0];
                if arg.as_const_int().is_some() {
                    if let Some(folded) = try_cast_fold(&ret.ty, arg) {
                        return folded;
                    }
                } else if let Some(v) = arg.as_const_float() {
                    let ceiled = Expr::float(v.ceil(), arg.ty);
                    if let Some(folded) = try_cast_fold(&ret.ty, &ceiled) {
                        return folded;
                    }
                    return ceiled;
                } else if let ExprKind::Call(CallOp::Log2, log_args) = &arg.kind {
                    // ceil(log2(f)) with a literal argument appears in
                    // iteration bounds; the result is independent of the
                    // target's rounding mode
                    if let Some(v) = log_args[0].as_const_float() {
                        return Expr::float(v.log2().ceil(), ret.ty);
                    }
                }
            }
            CallOp::Clz => {
                if let Some(v) = args[0].as_const_int() {
                    let bits = i64::from(args[0].ty.bits());
                    if v == 0 {
                        return Expr::int(bits, ret.ty);
                    }
                    for i in (0..bits).rev() {
                        if (1i64 << i) & v != 0 {
                            return Expr::int(bits - i - 1, ret.ty);
                        }
                    }
                    unreachable!("nonzero value with no leading bit");
                }
            }
            _ => {}
        }

        if op == CallOp::Likely {
            // for (i, 0, n) { if likely(i < n) { .. } } style hints resolve
            // against the entered constraints
            if let Some(matched) = self.try_match_literal_constraint(&args[0]) {
                return matched;
            }
        }

        if op == CallOp::IfThenElse && args.len() == 3 {
            // if cond { if inner_cond { t } else { e' } } else { e }
            // collapses when e' and e are provably the same constant
            let cond = &args[0];
            let then_value = &args[1];
            let else_value = &args[2];
            if let ExprKind::Call(CallOp::IfThenElse, inner) = &then_value.kind {
                if inner.len() == 3 {
                    let inner_cond = &inner[0];
                    let inner_then = &inner[1];
                    let inner_else = &inner[2];
                    if inner_else.is_const() && else_value.is_const() {
                        let same =
                            Expr::eq(inner_else.clone(), else_value.clone());
                        let (cond, inner_cond, inner_then, else_value) = (
                            cond.clone(),
                            inner_cond.clone(),
                            inner_then.clone(),
                            else_value.clone(),
                        );
                        if self.can_prove(&same) {
                            let merged_cond =
                                fold_or_build(BinOpKind::And, cond, inner_cond);
                            return Expr::call(
                                CallOp::IfThenElse,
                                vec![merged_cond, inner_then, else_value],
                                ret.ty,
                            );
                        }
                    }
                }
            }
        }

        ret
    }

    pub(crate) fn visit_var(&mut self, orig: &Expr) -> Expr {
        let ExprKind::Var(name) = &orig.kind else {
            unreachable!("visit_var on a non-variable node")
        };
        if orig.ty.is_bool() {
            if let Some(matched) = self.try_match_literal_constraint(orig) {
                return matched;
            }
        }
        if let Some(value) = self.var_map.get(name) {
            return value.clone();
        }
        orig.clone()
    }

    pub(crate) fn visit_cast(&mut self, orig: &Expr) -> Expr {
        let ExprKind::Cast(value) = &orig.kind else {
            unreachable!("visit_cast on a non-cast node")
        };
        let nvalue = self.visit_expr(value);
        if let Some(folded) = try_cast_fold(&orig.ty, &nvalue) {
            return folded;
        }
        if Expr::ptr_eq(&nvalue, value) {
            orig.clone()
        } else {
            Expr::cast(orig.ty, nvalue)
        }
    }

    pub(crate) fn visit_let(&mut self, orig: &Expr) -> Expr {
        let ExprKind::Let(var, value, body) = &orig.kind else {
            unreachable!("visit_let on a non-let node")
        };
        let nvalue = self.visit_expr(value);
        // Only trivial bindings are inlined; anything larger stays a let so
        // deliberately shared subexpressions are not duplicated.
        if can_inline_let(&nvalue) {
            // the binding itself may still inform the analyses
            self.analyzer.bind(*var, &nvalue);
            self.update(*var, nvalue, false);
            return self.visit_expr(body);
        }
        let nbody = self.visit_expr(body);
        if Expr::ptr_eq(&nvalue, value) && Expr::ptr_eq(&nbody, body) {
            orig.clone()
        } else {
            Expr::let_in(*var, nvalue, nbody)
        }
    }

    pub(crate) fn visit_broadcast(&mut self, orig: &Expr) -> Expr {
        let ExprKind::Broadcast(value, lanes) = &orig.kind else {
            unreachable!("visit_broadcast on a non-broadcast node")
        };
        let nvalue = self.visit_expr(value);
        let nlanes = self.visit_expr(lanes);
        if Expr::ptr_eq(&nvalue, value) && Expr::ptr_eq(&nlanes, lanes) {
            orig.clone()
        } else {
            Expr::broadcast(nvalue, nlanes)
        }
    }

    pub(crate) fn visit_ramp(&mut self, orig: &Expr) -> Expr {
        let ExprKind::Ramp(base, stride, lanes) = &orig.kind else {
            unreachable!("visit_ramp on a non-ramp node")
        };
        let nbase = self.visit_expr(base);
        let nstride = self.visit_expr(stride);
        let nlanes = self.visit_expr(lanes);
        if Expr::ptr_eq(&nbase, base) && Expr::ptr_eq(&nstride, stride) && Expr::ptr_eq(&nlanes, lanes)
        {
            orig.clone()
        } else {
            Expr::ramp(nbase, nstride, nlanes)
        }
    }
}

/// Only literals and plain variables are worth inlining; everything else
/// risks exponential expression growth.
fn can_inline_let(value: &Expr) -> bool {
    value.is_const() || matches!(value.kind, ExprKind::Var(_))
}
