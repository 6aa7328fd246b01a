//! # verity
//!
//! Formula-driven data-quality validation for columnar tables.
//!
//! A spreadsheet-style formula language is compiled into native columnar
//! expressions, and a rule engine built on that compiler applies ordered
//! validation rules — formulas, custom functions, regexes and format
//! checks — to a table, producing per-rule failure counts and
//! failing-row extracts.
//!
//! ## Example
//!
//! ```rust
//! use verity::prelude::*;
//!
//! let table = Table::from_columns(vec![
//!     Series::strs("name", vec!["JOHN", "Jane"]),
//! ]).unwrap();
//!
//! let engine = ValidationEngine::new(vec![Rule::new(
//!     "upper", "name", RuleKind::Formula,
//!     "IF(UPPER([name]) = [name], TRUE, FALSE)",
//!     "Name must be uppercase",
//! )]);
//!
//! let report = engine.validate(&table);
//! assert_eq!(report.results()[0].failed_count, 1);
//! ```

pub mod prelude;

pub use verity_core::{CoreError, CoreResult, Record, Scalar, Series, Table};
pub use verity_engine::{
    io, row_scalar, table_predicate, CustomFunctionRegistry, EngineError, EngineResult,
    FormatSpec, FunctionProvider, ProvidedFunction, Rule, RuleKind, RuleResult, TablePredicate,
    ValidationEngine, ValidationReport, FAILED_EXECUTION, ROW_ID_COLUMN,
};
pub use verity_formula::{
    apply_formula, evaluate, evaluate_predicate, parse_formula, CompiledExpr, Compiler,
    EvalContext, Expr, ExprKind, FormulaError, FormulaResult, FunctionLibrary, FunctionSpec,
    RowFn, SoftWarning,
};
