//! Types for the expression IR consumed by the simplifier.

pub mod shared;
pub use shared::*;
pub mod symbol;
pub use symbol::*;
pub mod ty;
pub use ty::*;
pub mod expr;
pub use expr::*;
pub mod util;
pub mod visit;
