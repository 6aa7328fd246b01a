//! Target expression tree
//!
//! The compiler lowers a parse tree into this tagged expression form,
//! which the columnar evaluator executes directly against a table. No
//! intermediate source text is generated or interpreted.

use std::fmt;

use verity_core::Scalar;

/// A target-engine expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a table column by name
    Column(String),
    /// Typed constant, broadcast across rows
    Literal(Scalar),

    /// Arithmetic negation
    Neg(Box<Expr>),
    /// Boolean negation
    Not(Box<Expr>),
    /// Null test (ISBLANK)
    IsNull(Box<Expr>),
    /// Non-null test (IFERROR's guard)
    IsNotNull(Box<Expr>),

    /// Binary operation
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Vectorizable conditional (when/then/otherwise)
    When {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },

    /// Whole-column reduction
    Agg { op: AggOp, input: Box<Expr> },

    /// Restrict a reduction input to rows where the predicate holds
    Filter {
        input: Box<Expr>,
        predicate: Box<Expr>,
    },

    /// Membership test against a fixed item list
    IsIn { value: Box<Expr>, items: Vec<Expr> },

    /// String concatenation; every argument is stringified uniformly
    ConcatStr(Vec<Expr>),

    /// Row-wise string operation
    Str { op: StrOp, args: Vec<Expr> },

    /// Row-wise math operation
    Math { op: MathOp, args: Vec<Expr> },

    /// Date component extraction
    Dt { op: DtOp, input: Box<Expr> },

    /// Difference between two dates in the given unit
    DateDiff {
        start: Box<Expr>,
        end: Box<Expr>,
        unit: DateUnit,
    },

    /// Construct a date from year/month/day components
    MakeDate {
        year: Box<Expr>,
        month: Box<Expr>,
        day: Box<Expr>,
    },

    /// Current date / current timestamp at evaluation time
    Today,
    Now,

    /// Bundle arguments into a per-row list value
    ListOf(Vec<Expr>),

    /// Financial routine applied per row
    Financial { op: FinOp, args: Vec<Expr> },

    /// First-match equality join: look up `value` in `key_column`, yield
    /// the matching row's `result_column`. A declared approximation of
    /// spreadsheet lookup semantics.
    Lookup {
        value: Box<Expr>,
        key_column: String,
        result_column: String,
    },

    /// Per-row invocation of a registered external callable; arguments
    /// are bundled into a keyed record
    MapRow { function: String, args: Vec<Expr> },

    /// Pass-through call for an unregistered function name. Compiles with
    /// a warning; evaluating it is an error.
    RawCall { name: String, args: Vec<Expr> },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,
}

/// Whole-column reductions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Sum,
    Mean,
    Min,
    Max,
    Median,
    Std,
    Var,
    Count,
}

/// Row-wise string operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrOp {
    Left,
    Right,
    Mid,
    Len,
    Trim,
    Upper,
    Lower,
    Substitute,
}

/// Row-wise math operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Abs,
    Round,
    Ceiling,
    Floor,
    Sqrt,
}

/// Date component extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtOp {
    Year,
    Month,
    Day,
}

/// DATEDIF units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Days,
    Months,
    Years,
}

/// Financial routines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinOp {
    Fv,
    Pv,
    Npv,
    Pmt,
    Rate,
    Irr,
}

impl fmt::Display for FinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FinOp::Fv => "FV",
            FinOp::Pv => "PV",
            FinOp::Npv => "NPV",
            FinOp::Pmt => "PMT",
            FinOp::Rate => "RATE",
            FinOp::Irr => "IRR",
        };
        write!(f, "{}", name)
    }
}

/// Whether an expression evaluates independently per row or requires a
/// whole-table (or grouped) reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    RowWise,
    Aggregate,
}

/// Non-fatal conditions recorded during compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftWarning {
    /// Function name with no registered implementation; a pass-through
    /// call expression was synthesized instead
    UnsupportedFunction(String),
    /// Lookup approximated as an equality join
    ApproximateLookup(String),
}

impl fmt::Display for SoftWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftWarning::UnsupportedFunction(name) => {
                write!(f, "function {} is not supported; passing through", name)
            }
            SoftWarning::ApproximateLookup(name) => {
                write!(f, "{} is approximated as an equality join; verify output", name)
            }
        }
    }
}

/// The compiler's output: one expression per formula, plus its
/// classification and the columns it references
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    pub expr: Expr,
    pub kind: ExprKind,
    /// Referenced column names, sorted and deduplicated
    pub columns: Vec<String>,
    pub warnings: Vec<SoftWarning>,
}

impl CompiledExpr {
    pub fn is_aggregate(&self) -> bool {
        self.kind == ExprKind::Aggregate
    }
}
