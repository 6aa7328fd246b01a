//! Convenient star-import for common types
//!
//! ```rust
//! use verity::prelude::*;
//! ```

pub use verity_core::{Record, Scalar, Series, Table};
pub use verity_engine::{
    Rule, RuleKind, RuleResult, ValidationEngine, ValidationReport, ROW_ID_COLUMN,
};
pub use verity_formula::{
    apply_formula, CompiledExpr, Compiler, EvalContext, Expr, ExprKind, FunctionLibrary,
};
