//! Generative tests for the simplifier.
//!
//! Expressions are generated with proptest and equivalence is checked by
//! evaluating both the original and the simplified expression under random
//! environments: wherever the original is defined, the simplified form must
//! be defined and agree. Division by zero is undefined, and so is integer
//! overflow: index arithmetic assumes in-range values, and the rule tables
//! reason about unbounded integers.

use indexmap::IndexMap;
use proptest::prelude::*;

use crate::analysis::bound::{floordiv, floormod};
use crate::analysis::Analyzer;
use crate::ast::{BinOpKind, DataType, Expr, ExprKind, Symbol};
use crate::rewrite::{Extension, RewriteSimplifier};

fn ity() -> DataType {
    DataType::int(32)
}

const INT_VARS: [&str; 4] = ["x", "y", "z", "w"];
const BOOL_VARS: [&str; 2] = ["p", "q"];

#[derive(Clone, Copy, PartialEq, Debug)]
enum Value {
    Int(i64),
    Bool(bool),
}

type Env = IndexMap<Symbol, Value>;

fn in_range(v: i64) -> Option<Value> {
    if (i32::MIN as i64..=i32::MAX as i64).contains(&v) {
        Some(Value::Int(v))
    } else {
        None
    }
}

/// Evaluate a scalar expression under `env`. `None` means undefined:
/// division by zero or a value leaving the 32-bit range.
fn eval(e: &Expr, env: &Env) -> Option<Value> {
    match &e.kind {
        ExprKind::Var(name) => env.get(name).copied(),
        ExprKind::Lit(_) => match (e.as_const_int(), e.as_const_bool()) {
            (Some(v), _) => Some(Value::Int(v)),
            (_, Some(v)) => Some(Value::Bool(v)),
            _ => None,
        },
        ExprKind::Binary(op, a, b) => {
            let va = eval(a, env)?;
            let vb = eval(b, env)?;
            match (va, vb) {
                (Value::Int(va), Value::Int(vb)) => eval_int_binary(*op, va, vb),
                (Value::Bool(va), Value::Bool(vb)) => match op {
                    BinOpKind::And => Some(Value::Bool(va && vb)),
                    BinOpKind::Or => Some(Value::Bool(va || vb)),
                    BinOpKind::Eq => Some(Value::Bool(va == vb)),
                    BinOpKind::Ne => Some(Value::Bool(va != vb)),
                    _ => None,
                },
                _ => None,
            }
        }
        ExprKind::Not(a) => match eval(a, env)? {
            Value::Bool(v) => Some(Value::Bool(!v)),
            Value::Int(_) => None,
        },
        ExprKind::Select(cond, on_true, on_false) => match eval(cond, env)? {
            Value::Bool(true) => eval(on_true, env),
            Value::Bool(false) => eval(on_false, env),
            Value::Int(_) => None,
        },
        _ => None,
    }
}

fn eval_int_binary(op: BinOpKind, a: i64, b: i64) -> Option<Value> {
    match op {
        BinOpKind::Add => in_range(a.checked_add(b)?),
        BinOpKind::Sub => in_range(a.checked_sub(b)?),
        BinOpKind::Mul => in_range(a.checked_mul(b)?),
        BinOpKind::Div => {
            if b == 0 {
                None
            } else {
                in_range(a / b)
            }
        }
        BinOpKind::Mod => {
            if b == 0 {
                None
            } else {
                in_range(a % b)
            }
        }
        BinOpKind::FloorDiv => {
            if b == 0 {
                None
            } else {
                in_range(floordiv(a, b))
            }
        }
        BinOpKind::FloorMod => {
            if b == 0 {
                None
            } else {
                in_range(floormod(a, b))
            }
        }
        BinOpKind::Min => Some(Value::Int(a.min(b))),
        BinOpKind::Max => Some(Value::Int(a.max(b))),
        BinOpKind::Eq => Some(Value::Bool(a == b)),
        BinOpKind::Ne => Some(Value::Bool(a != b)),
        BinOpKind::Lt => Some(Value::Bool(a < b)),
        BinOpKind::Le => Some(Value::Bool(a <= b)),
        BinOpKind::Gt => Some(Value::Bool(a > b)),
        BinOpKind::Ge => Some(Value::Bool(a >= b)),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct TestCase {
    expr: Expr,
    env: Env,
}

fn int_leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        2 => (-8i64..9).prop_map(|v| Expr::int(v, ity())),
        3 => prop::sample::select(INT_VARS.to_vec()).prop_map(|n| Expr::var(n, ity())),
    ]
}

fn bool_leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        1 => prop::bool::ANY.prop_map(Expr::bool_lit),
        1 => prop::sample::select(BOOL_VARS.to_vec())
            .prop_map(|n| Expr::var(n, DataType::bool_())),
    ]
}

fn int_expr() -> impl Strategy<Value = Expr> {
    let leaf = int_leaf();
    leaf.prop_recursive(4, 24, 3, |inner| {
        let arith = prop::sample::select(vec![
            BinOpKind::Add,
            BinOpKind::Sub,
            BinOpKind::Mul,
            BinOpKind::Div,
            BinOpKind::Mod,
            BinOpKind::FloorDiv,
            BinOpKind::FloorMod,
            BinOpKind::Min,
            BinOpKind::Max,
        ]);
        (arith, inner.clone(), inner).prop_map(|(op, a, b)| Expr::binary(op, a, b))
    })
}

fn bool_expr() -> impl Strategy<Value = Expr> {
    let cmp = prop::sample::select(vec![
        BinOpKind::Eq,
        BinOpKind::Ne,
        BinOpKind::Lt,
        BinOpKind::Le,
        BinOpKind::Gt,
        BinOpKind::Ge,
    ]);
    let comparison = (cmp, int_expr(), int_expr()).prop_map(|(op, a, b)| Expr::binary(op, a, b));
    let leaf = prop_oneof![bool_leaf(), comparison];
    leaf.prop_recursive(3, 12, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::and(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::or(a, b)),
            inner.prop_map(Expr::not),
        ]
    })
}

fn env_strategy() -> impl Strategy<Value = Env> {
    let ints = prop::collection::vec(-12i64..25, INT_VARS.len());
    let bools = prop::collection::vec(prop::bool::ANY, BOOL_VARS.len());
    (ints, bools).prop_map(|(ints, bools)| {
        let mut env = Env::new();
        for (name, v) in INT_VARS.iter().zip(ints) {
            env.insert(Symbol::intern(name), Value::Int(v));
        }
        for (name, v) in BOOL_VARS.iter().zip(bools) {
            env.insert(Symbol::intern(name), Value::Bool(v));
        }
        env
    })
}

fn int_case() -> impl Strategy<Value = TestCase> {
    (int_expr(), env_strategy()).prop_map(|(expr, env)| TestCase { expr, env })
}

fn bool_case() -> impl Strategy<Value = TestCase> {
    (bool_expr(), env_strategy()).prop_map(|(expr, env)| TestCase { expr, env })
}

fn check_equivalent(case: &TestCase) -> Result<(), TestCaseError> {
    let mut analyzer = Analyzer::new();
    let mut simp = RewriteSimplifier::new(&mut analyzer);
    let simplified = simp.simplify(&case.expr);
    if let Some(expected) = eval(&case.expr, &case.env) {
        let actual = eval(&simplified, &case.env);
        prop_assert_eq!(
            actual,
            Some(expected),
            "{} simplified to {}, which disagrees under {:?}",
            case.expr,
            simplified,
            case.env
        );
    }
    Ok(())
}

fn check_idempotent(case: &TestCase) -> Result<(), TestCaseError> {
    let mut analyzer = Analyzer::new();
    let mut simp = RewriteSimplifier::new(&mut analyzer);
    let once = simp.simplify(&case.expr);
    let twice = simp.simplify(&once);
    prop_assert_eq!(
        &once,
        &twice,
        "simplification of {} is not idempotent",
        case.expr
    );
    Ok(())
}

/// No `Add`/`Mul` keeps a constant on the left of a non-constant operand,
/// and no index-typed `Sub` keeps a literal right operand.
fn check_canonical(e: &Expr) -> Result<(), TestCaseError> {
    match &e.kind {
        ExprKind::Binary(op, a, b) => {
            match op {
                BinOpKind::Add | BinOpKind::Mul => {
                    prop_assert!(
                        !(a.is_const() && !b.is_const()),
                        "constant on the left in {}",
                        e
                    );
                }
                BinOpKind::Sub => {
                    prop_assert!(
                        !(b.as_const_int().is_some() && e.ty.is_index_type()),
                        "literal right operand survived in {}",
                        e
                    );
                }
                _ => {}
            }
            check_canonical(a)?;
            check_canonical(b)
        }
        ExprKind::Not(a) => check_canonical(a),
        ExprKind::Select(c, t, f) => {
            check_canonical(c)?;
            check_canonical(t)?;
            check_canonical(f)
        }
        _ => Ok(()),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn int_simplification_preserves_semantics(case in int_case()) {
        check_equivalent(&case)?;
    }

    #[test]
    fn bool_simplification_preserves_semantics(case in bool_case()) {
        check_equivalent(&case)?;
    }

    #[test]
    fn int_simplification_is_idempotent(case in int_case()) {
        check_idempotent(&case)?;
    }

    #[test]
    fn bool_simplification_is_idempotent(case in bool_case()) {
        check_idempotent(&case)?;
    }

    #[test]
    fn simplified_form_is_canonical(case in int_case()) {
        let mut analyzer = Analyzer::new();
        let mut simp = RewriteSimplifier::new(&mut analyzer);
        let simplified = simp.simplify(&case.expr);
        check_canonical(&simplified)?;
    }

    #[test]
    fn branch_constraint_extension_preserves_semantics(case in bool_case()) {
        let mut analyzer = Analyzer::new();
        let mut simp = RewriteSimplifier::new(&mut analyzer);
        simp.set_enabled_extensions(
            Extension::APPLY_CONSTRAINTS_TO_BOOLEAN_BRANCHES
                | Extension::TRANSITIVELY_PROVE_INEQUALITIES,
        );
        let simplified = simp.simplify(&case.expr);
        if let Some(expected) = eval(&case.expr, &case.env) {
            let actual = eval(&simplified, &case.env);
            prop_assert_eq!(actual, Some(expected));
        }
    }

    #[test]
    fn entered_constraints_are_believed(v in -6i64..7) {
        let mut analyzer = Analyzer::new();
        let mut simp = RewriteSimplifier::new(&mut analyzer);
        let x = Expr::var("cx", ity());
        let constraint = Expr::lt(x.clone(), Expr::int(v, ity()));
        let handle = simp.enter_constraint(&constraint);
        let entered = simp.simplify(&constraint);
        prop_assert!(entered.is_true_lit(), "constraint {} did not hold: {}", constraint, entered);
        let negated = simp.simplify(&Expr::not(constraint.clone()));
        prop_assert!(negated.is_false_lit(), "negation of {} did not refute: {}", constraint, negated);
        simp.exit_constraint(handle);
    }
}
