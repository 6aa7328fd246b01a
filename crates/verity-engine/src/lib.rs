//! # verity-engine
//!
//! Rule-based data-quality validation over columnar tables.
//!
//! This crate provides:
//! - The rule model (Formula, CustomFunction, Regex and Format kinds)
//! - The validation engine: per-rule dispatch, aggregate group-by
//!   detection, isolated failures, per-rule failing-row extracts
//! - Custom-function registration through a provider interface
//! - CSV rule sources, data tables and result sinks
//!
//! ## Example
//!
//! ```rust,ignore
//! use verity_engine::{ValidationEngine, io};
//!
//! let engine = ValidationEngine::from_rules_path("rules.csv")?;
//! let table = io::read_table_file("data.csv")?;
//! let report = engine.validate(&table);
//! report.write_csv("results/")?;
//! ```

pub mod custom;
pub mod engine;
pub mod error;
pub mod io;
pub mod report;
pub mod rule;

pub use custom::{
    row_scalar, table_predicate, CustomFunctionRegistry, FunctionProvider, ProvidedFunction,
    TablePredicate,
};
pub use engine::{ValidationEngine, ROW_ID_COLUMN};
pub use error::{EngineError, EngineResult};
pub use report::{RuleResult, ValidationReport, FAILED_EXECUTION};
pub use rule::{FormatSpec, Rule, RuleKind};
