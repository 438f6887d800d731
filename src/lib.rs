//! Rewrite-rule based simplification for tensor index arithmetic.
//!
//! The crate centers on [`rewrite::RewriteSimplifier`], a bottom-up
//! expression mutator that applies a large table of algebraic identities to
//! the typed integer/boolean expression IR defined in [`ast`]. Identities are
//! guarded by conditional predicates (non-negativity, divisibility, known
//! signs) answered by the analyses in [`analysis`]: constant integer bounds,
//! modular-congruence sets, transitive comparisons, and side-effect
//! classification.
//!
//! The simplifier returns an equivalent expression that is typically smaller
//! and in a canonical form (constants on the right, subtraction lowered into
//! negated addition, min/max constants rotated outward) that downstream
//! passes like index flattening and loop bound inference depend on.
//!
//! ```
//! use diophant::analysis::Analyzer;
//! use diophant::ast::{DataType, Expr};
//! use diophant::rewrite::RewriteSimplifier;
//!
//! let mut analyzer = Analyzer::new();
//! let mut simp = RewriteSimplifier::new(&mut analyzer);
//! let x = Expr::var("x", DataType::int(32));
//! let five = Expr::int(5, DataType::int(32));
//! let e = Expr::sub(Expr::add(x.clone(), five.clone()), five);
//! assert_eq!(simp.simplify(&e), x);
//! ```

pub mod analysis;
pub mod ast;
pub mod pretty;
pub mod rewrite;

pub use analysis::Analyzer;
pub use ast::Expr;
pub use rewrite::{Extension, RewriteSimplifier, SimplifierStats};
