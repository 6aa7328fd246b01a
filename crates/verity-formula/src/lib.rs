//! # verity-formula
//!
//! Formula parser and columnar expression compiler for verity.
//!
//! This crate provides:
//! - Formula parsing (text → parse tree)
//! - An expression compiler (parse tree → target expression) with
//!   row-wise/aggregate classification and referenced-column tracking
//! - A function library covering mathematical, statistical, logical,
//!   text, date, criteria, lookup and financial categories, extensible
//!   with caller-supplied generators
//! - Native evaluation of compiled expressions against a table
//!
//! ## Example
//!
//! ```rust,ignore
//! use verity_formula::{Compiler, FunctionLibrary};
//!
//! let library = FunctionLibrary::with_builtins();
//! let compiled = Compiler::new(&library).compile("=SUMPRODUCT(Price, Quantity)")?;
//! assert!(compiled.is_aggregate());
//! ```

pub mod ast;
pub mod compiler;
pub mod error;
pub mod eval;
pub mod expr;
pub mod functions;
pub mod parser;

pub use ast::{AddOp, CompareOp, LiteralValue, LogicalOp, MultOp, ParseNode};
pub use compiler::Compiler;
pub use error::{FormulaError, FormulaResult};
pub use eval::{apply_formula, evaluate, evaluate_predicate, EvalContext, RowFn};
pub use expr::{
    AggOp, BinaryOp, CompiledExpr, DateUnit, DtOp, Expr, ExprKind, FinOp, MathOp, SoftWarning,
    StrOp,
};
pub use functions::{FunctionLibrary, FunctionSpec, GeneratorFn};
pub use parser::parse_formula;
