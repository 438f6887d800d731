// Using [`IndexSet`], which is a HashSet that preserves the insertion order,
// for deterministic results.
use indexmap::IndexSet;

use super::{
    visit::{walk_expr, Visitor},
    CallOp, Expr, ExprKind, Symbol,
};

/// Helper to find all free variables in expressions.
#[derive(Debug, Default)]
pub struct FreeVariableCollector {
    pub variables: IndexSet<Symbol>,
    bound: Vec<Symbol>,
}

impl FreeVariableCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(expr: &Expr) -> IndexSet<Symbol> {
        let mut collector = FreeVariableCollector::new();
        collector.visit_expr(expr);
        collector.variables
    }
}

impl Visitor for FreeVariableCollector {
    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Var(name) => {
                if !self.bound.contains(name) {
                    self.variables.insert(*name);
                }
            }
            ExprKind::Let(name, value, body) => {
                self.visit_expr(value);
                self.bound.push(*name);
                self.visit_expr(body);
                self.bound.pop();
            }
            _ => walk_expr(self, expr),
        }
    }
}

/// Whether the expression mentions the runtime `vscale` builtin anywhere.
/// Rewrites that would enumerate vector lanes must refuse such expressions.
pub fn contains_vscale_call(expr: &Expr) -> bool {
    struct Finder {
        found: bool,
    }
    impl Visitor for Finder {
        fn visit_expr(&mut self, e: &Expr) {
            if self.found {
                return;
            }
            if matches!(e.kind, ExprKind::Call(CallOp::Vscale, _)) {
                self.found = true;
                return;
            }
            walk_expr(self, e);
        }
    }
    let mut finder = Finder { found: false };
    finder.visit_expr(expr);
    finder.found
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{DataType, Expr};

    #[test]
    fn free_variables() {
        let ty = DataType::int(64);
        let x = Expr::var("x", ty);
        let y = Expr::var("y", ty);
        // let y = x in (x + y): x is free, y is bound.
        let expr = Expr::let_in(
            crate::ast::Symbol::intern("y"),
            x.clone(),
            Expr::add(x.clone(), y),
        );
        let free = FreeVariableCollector::collect(&expr);
        assert_eq!(
            free.into_iter().collect::<Vec<_>>(),
            vec![crate::ast::Symbol::intern("x")]
        );
    }

    #[test]
    fn finds_vscale() {
        let ty = DataType::int(32);
        let vscale = Expr::call(CallOp::Vscale, vec![], ty);
        let lanes = Expr::mul(vscale, Expr::int(4, ty));
        assert!(contains_vscale_call(&lanes));
        assert!(!contains_vscale_call(&Expr::int(4, ty)));
    }
}
