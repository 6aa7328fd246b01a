//! Columnar expression evaluation
//!
//! Executes a compiled [`Expr`] directly against a [`Table`]. Results are
//! plain value vectors: length-one results broadcast across rows, so
//! aggregates compose with row-wise arithmetic the way a columnar engine
//! composes them.

use std::collections::HashMap;
use std::sync::Arc;

use verity_core::{Record, Scalar, Table};

use crate::compiler::Compiler;
use crate::error::{FormulaError, FormulaResult};
use crate::expr::{AggOp, BinaryOp, DateUnit, DtOp, Expr, FinOp, MathOp, StrOp};
use crate::functions::{financial, FunctionLibrary};

/// External per-row callable, invoked with the bundled argument record
pub type RowFn = Arc<dyn Fn(&Record) -> FormulaResult<Scalar> + Send + Sync>;

/// Everything an expression needs at evaluation time
pub struct EvalContext<'a> {
    table: &'a Table,
    row_fns: Option<&'a HashMap<String, RowFn>>,
}

impl<'a> EvalContext<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            row_fns: None,
        }
    }

    pub fn with_row_fns(table: &'a Table, row_fns: &'a HashMap<String, RowFn>) -> Self {
        Self {
            table,
            row_fns: Some(row_fns),
        }
    }

    pub fn table(&self) -> &Table {
        self.table
    }

    fn row_fn(&self, name: &str) -> Option<&RowFn> {
        self.row_fns.and_then(|m| m.get(name))
    }
}

/// Evaluate an expression to one value per table row
pub fn evaluate(expr: &Expr, ctx: &EvalContext) -> FormulaResult<Vec<Scalar>> {
    let values = eval(expr, ctx)?;
    let height = ctx.table.height();

    if values.len() == height {
        return Ok(values);
    }
    if values.len() == 1 {
        return Ok(vec![values.into_iter().next().expect("length checked"); height]);
    }
    Err(FormulaError::Evaluation(format!(
        "expression produced {} values for a table of height {}",
        values.len(),
        height
    )))
}

/// Evaluate an expression as a row-wise predicate. `None` marks rows where
/// the predicate is null (neither pass nor fail).
pub fn evaluate_predicate(expr: &Expr, ctx: &EvalContext) -> FormulaResult<Vec<Option<bool>>> {
    evaluate(expr, ctx)?
        .into_iter()
        .map(|v| match v {
            Scalar::Null => Ok(None),
            other => other.as_bool().map(Some).ok_or_else(|| {
                FormulaError::TypeMismatch(format!(
                    "predicate produced a non-boolean {} value",
                    other.type_name()
                ))
            }),
        })
        .collect()
}

/// Compile a formula and materialize it as a named column
pub fn apply_formula(
    table: &Table,
    library: &FunctionLibrary,
    formula: &str,
    new_column: &str,
) -> FormulaResult<Table> {
    let compiled = Compiler::new(library).compile(formula)?;
    let ctx = EvalContext::new(table);
    let values = evaluate(&compiled.expr, &ctx)?;
    Ok(table
        .clone()
        .with_column(verity_core::Series::new(new_column, values))?)
}

// === Internal evaluation ===
//
// Columns evaluate to vectors of table height; literals and aggregates to
// length one; Filter inputs may be shorter. Broadcasting happens at the
// combination points.

fn eval(expr: &Expr, ctx: &EvalContext) -> FormulaResult<Vec<Scalar>> {
    match expr {
        Expr::Column(name) => ctx
            .table
            .column(name)
            .map(|c| c.values().to_vec())
            .ok_or_else(|| FormulaError::UnknownColumn(name.clone())),

        Expr::Literal(value) => Ok(vec![value.clone()]),

        Expr::Neg(inner) => map_unary(eval(inner, ctx)?, |v| match v {
            Scalar::Int(n) => Ok(Scalar::Int(-n)),
            Scalar::Float(n) => Ok(Scalar::Float(-n)),
            other => Err(FormulaError::TypeMismatch(format!(
                "cannot negate a {} value",
                other.type_name()
            ))),
        }),

        Expr::Not(inner) => map_unary(eval(inner, ctx)?, |v| {
            v.as_bool().map(|b| Scalar::Bool(!b)).ok_or_else(|| {
                FormulaError::TypeMismatch(format!("cannot apply NOT to a {} value", v.type_name()))
            })
        }),

        Expr::IsNull(inner) => Ok(eval(inner, ctx)?
            .into_iter()
            .map(|v| Scalar::Bool(v.is_null()))
            .collect()),

        Expr::IsNotNull(inner) => Ok(eval(inner, ctx)?
            .into_iter()
            .map(|v| Scalar::Bool(!v.is_null()))
            .collect()),

        Expr::Binary { op, left, right } => {
            let lhs = eval(left, ctx)?;
            let rhs = eval(right, ctx)?;
            zip_binary(lhs, rhs, |l, r| binary_scalar(*op, l, r))
        }

        Expr::When {
            cond,
            then,
            otherwise,
        } => {
            let cond = eval(cond, ctx)?;
            let then = eval(then, ctx)?;
            let otherwise = eval(otherwise, ctx)?;

            let n = cond.len().max(then.len()).max(otherwise.len());
            let cond = broadcast(cond, n)?;
            let then = broadcast(then, n)?;
            let otherwise = broadcast(otherwise, n)?;

            Ok(cond
                .into_iter()
                .zip(then)
                .zip(otherwise)
                .map(|((c, t), o)| {
                    // Null conditions fall through to the otherwise branch
                    if c.as_bool() == Some(true) {
                        t
                    } else {
                        o
                    }
                })
                .collect())
        }

        Expr::Agg { op, input } => {
            let values = eval(input, ctx)?;
            Ok(vec![aggregate(*op, &values)?])
        }

        Expr::Filter { input, predicate } => {
            let values = eval(input, ctx)?;
            let mask = eval(predicate, ctx)?;

            let n = values.len().max(mask.len());
            let values = broadcast(values, n)?;
            let mask = broadcast(mask, n)?;

            Ok(values
                .into_iter()
                .zip(mask)
                .filter_map(|(v, keep)| (keep.as_bool() == Some(true)).then_some(v))
                .collect())
        }

        Expr::IsIn { value, items } => {
            let values = eval(value, ctx)?;
            let mut columns = Vec::with_capacity(items.len());
            let mut n = values.len();
            for item in items {
                let col = eval(item, ctx)?;
                n = n.max(col.len());
                columns.push(col);
            }

            let values = broadcast(values, n)?;
            let columns = columns
                .into_iter()
                .map(|c| broadcast(c, n))
                .collect::<FormulaResult<Vec<_>>>()?;

            Ok(values
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    if v.is_null() {
                        return Scalar::Null;
                    }
                    let found = columns.iter().any(|c| {
                        v.compare(&c[row]) == Some(std::cmp::Ordering::Equal)
                    });
                    Scalar::Bool(found)
                })
                .collect())
        }

        Expr::ConcatStr(args) => {
            let (columns, n) = eval_all(args, ctx)?;
            Ok((0..n)
                .map(|row| {
                    let mut out = String::new();
                    for col in &columns {
                        match &col[row] {
                            Scalar::Null => return Scalar::Null,
                            v => out.push_str(&v.to_string()),
                        }
                    }
                    Scalar::Str(out)
                })
                .collect())
        }

        Expr::Str { op, args } => eval_str(*op, args, ctx),

        Expr::Math { op, args } => eval_math(*op, args, ctx),

        Expr::Dt { op, input } => map_unary(eval(input, ctx)?, |v| {
            use chrono::Datelike;
            let date = v.as_date().ok_or_else(|| {
                FormulaError::TypeMismatch(format!(
                    "cannot extract a date part from a {} value",
                    v.type_name()
                ))
            })?;
            Ok(Scalar::Int(match op {
                DtOp::Year => date.year() as i64,
                DtOp::Month => date.month() as i64,
                DtOp::Day => date.day() as i64,
            }))
        }),

        Expr::DateDiff { start, end, unit } => {
            let start = eval(start, ctx)?;
            let end = eval(end, ctx)?;
            zip_binary(start, end, |s, e| date_diff(*unit, s, e))
        }

        Expr::MakeDate { year, month, day } => {
            let year = eval(year, ctx)?;
            let month = eval(month, ctx)?;
            let day = eval(day, ctx)?;

            let n = year.len().max(month.len()).max(day.len());
            let year = broadcast(year, n)?;
            let month = broadcast(month, n)?;
            let day = broadcast(day, n)?;

            (0..n)
                .map(|row| make_date(&year[row], &month[row], &day[row]))
                .collect()
        }

        Expr::Today => Ok(vec![Scalar::Date(chrono::Local::now().date_naive())]),

        Expr::Now => Ok(vec![Scalar::DateTime(chrono::Local::now().naive_local())]),

        Expr::ListOf(args) => {
            let (columns, n) = eval_all(args, ctx)?;
            Ok((0..n)
                .map(|row| Scalar::List(columns.iter().map(|c| c[row].clone()).collect()))
                .collect())
        }

        Expr::Financial { op, args } => eval_financial(*op, args, ctx),

        Expr::Lookup {
            value,
            key_column,
            result_column,
        } => {
            let keys = ctx
                .table
                .column(key_column)
                .ok_or_else(|| FormulaError::UnknownColumn(key_column.clone()))?;
            let results = ctx
                .table
                .column(result_column)
                .ok_or_else(|| FormulaError::UnknownColumn(result_column.clone()))?;

            // First occurrence wins
            let mut map: HashMap<String, Scalar> = HashMap::new();
            for (key, result) in keys.iter().zip(results.iter()) {
                if key.is_null() {
                    continue;
                }
                map.entry(key.to_string()).or_insert_with(|| result.clone());
            }

            Ok(evaluate(value, ctx)?
                .into_iter()
                .map(|v| {
                    if v.is_null() {
                        return Scalar::Null;
                    }
                    map.get(&v.to_string()).cloned().unwrap_or(Scalar::Null)
                })
                .collect())
        }

        Expr::MapRow { function, args } => {
            let row_fn = ctx
                .row_fn(function)
                .cloned()
                .ok_or_else(|| FormulaError::UnknownFunction(function.clone()))?;

            let (columns, n) = eval_all(args, ctx)?;
            (0..n)
                .map(|row| {
                    let record = Record::new(
                        columns
                            .iter()
                            .enumerate()
                            .map(|(i, c)| (format!("arg{}", i), c[row].clone()))
                            .collect(),
                    );
                    // Results are floating-point unless the callable says
                    // otherwise
                    row_fn(&record).map(|v| match v {
                        Scalar::Int(n) => Scalar::Float(n as f64),
                        other => other,
                    })
                })
                .collect()
        }

        Expr::RawCall { name, .. } => Err(FormulaError::UnknownFunction(name.clone())),
    }
}

/// Evaluate a slice of expressions and broadcast them to a common length
fn eval_all(args: &[Expr], ctx: &EvalContext) -> FormulaResult<(Vec<Vec<Scalar>>, usize)> {
    let mut columns = Vec::with_capacity(args.len());
    let mut n = 1;
    for arg in args {
        let col = eval(arg, ctx)?;
        n = n.max(col.len());
        columns.push(col);
    }
    let columns = columns
        .into_iter()
        .map(|c| broadcast(c, n))
        .collect::<FormulaResult<Vec<_>>>()?;
    Ok((columns, n))
}

fn broadcast(values: Vec<Scalar>, n: usize) -> FormulaResult<Vec<Scalar>> {
    if values.len() == n {
        return Ok(values);
    }
    if values.len() == 1 {
        return Ok(vec![values.into_iter().next().expect("length checked"); n]);
    }
    Err(FormulaError::Evaluation(format!(
        "cannot broadcast {} values to length {}",
        values.len(),
        n
    )))
}

fn map_unary<F>(values: Vec<Scalar>, f: F) -> FormulaResult<Vec<Scalar>>
where
    F: Fn(&Scalar) -> FormulaResult<Scalar>,
{
    values
        .iter()
        .map(|v| if v.is_null() { Ok(Scalar::Null) } else { f(v) })
        .collect()
}

fn zip_binary<F>(lhs: Vec<Scalar>, rhs: Vec<Scalar>, f: F) -> FormulaResult<Vec<Scalar>>
where
    F: Fn(&Scalar, &Scalar) -> FormulaResult<Scalar>,
{
    let n = lhs.len().max(rhs.len());
    let lhs = broadcast(lhs, n)?;
    let rhs = broadcast(rhs, n)?;
    lhs.iter().zip(rhs.iter()).map(|(l, r)| f(l, r)).collect()
}

fn binary_scalar(op: BinaryOp, l: &Scalar, r: &Scalar) -> FormulaResult<Scalar> {
    use BinaryOp::*;

    if l.is_null() || r.is_null() {
        return Ok(Scalar::Null);
    }

    match op {
        Add | Sub | Mul => {
            if let (Scalar::Int(a), Scalar::Int(b)) = (l, r) {
                let result = match op {
                    Add => a.checked_add(*b),
                    Sub => a.checked_sub(*b),
                    _ => a.checked_mul(*b),
                };
                if let Some(n) = result {
                    return Ok(Scalar::Int(n));
                }
            }
            let (a, b) = numeric_pair(op, l, r)?;
            Ok(Scalar::Float(match op {
                Add => a + b,
                Sub => a - b,
                _ => a * b,
            }))
        }

        Div => {
            let (a, b) = numeric_pair(op, l, r)?;
            Ok(Scalar::Float(a / b))
        }

        Mod => {
            if let (Scalar::Int(a), Scalar::Int(b)) = (l, r) {
                if *b != 0 {
                    return Ok(Scalar::Int(a.rem_euclid(*b)));
                }
            }
            let (a, b) = numeric_pair(op, l, r)?;
            Ok(Scalar::Float(a.rem_euclid(b)))
        }

        Pow => {
            let (a, b) = numeric_pair(op, l, r)?;
            Ok(Scalar::Float(a.powf(b)))
        }

        Eq | Ne | Lt | Le | Gt | Ge => {
            let ordering = l.compare(r).ok_or_else(|| {
                FormulaError::TypeMismatch(format!(
                    "cannot compare {} with {}",
                    l.type_name(),
                    r.type_name()
                ))
            })?;
            use std::cmp::Ordering::*;
            Ok(Scalar::Bool(match op {
                Eq => ordering == Equal,
                Ne => ordering != Equal,
                Lt => ordering == Less,
                Le => ordering != Greater,
                Gt => ordering == Greater,
                _ => ordering != Less,
            }))
        }

        And | Or => {
            let a = bool_operand(l)?;
            let b = bool_operand(r)?;
            Ok(Scalar::Bool(if op == And { a && b } else { a || b }))
        }
    }
}

fn numeric_pair(op: BinaryOp, l: &Scalar, r: &Scalar) -> FormulaResult<(f64, f64)> {
    match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(FormulaError::TypeMismatch(format!(
            "{:?} requires numeric operands, got {} and {}",
            op,
            l.type_name(),
            r.type_name()
        ))),
    }
}

fn bool_operand(v: &Scalar) -> FormulaResult<bool> {
    v.as_bool().ok_or_else(|| {
        FormulaError::TypeMismatch(format!(
            "logical operators require boolean operands, got {}",
            v.type_name()
        ))
    })
}

fn aggregate(op: AggOp, values: &[Scalar]) -> FormulaResult<Scalar> {
    match op {
        AggOp::Count => Ok(Scalar::Int(
            values.iter().filter(|v| !v.is_null()).count() as i64
        )),

        AggOp::Min | AggOp::Max => {
            let mut best: Option<&Scalar> = None;
            for v in values.iter().filter(|v| !v.is_null()) {
                best = match best {
                    None => Some(v),
                    Some(b) => match v.compare(b) {
                        Some(std::cmp::Ordering::Less) if op == AggOp::Min => Some(v),
                        Some(std::cmp::Ordering::Greater) if op == AggOp::Max => Some(v),
                        _ => Some(b),
                    },
                };
            }
            Ok(best.cloned().unwrap_or(Scalar::Null))
        }

        AggOp::Sum => {
            let all_ints = values
                .iter()
                .all(|v| matches!(v, Scalar::Int(_) | Scalar::Null));
            if all_ints {
                let mut total = 0i64;
                for v in values {
                    if let Scalar::Int(n) = v {
                        total = total.saturating_add(*n);
                    }
                }
                Ok(Scalar::Int(total))
            } else {
                Ok(Scalar::Float(numeric(values).into_iter().sum()))
            }
        }

        AggOp::Mean => {
            let nums = numeric(values);
            if nums.is_empty() {
                return Ok(Scalar::Null);
            }
            Ok(Scalar::Float(nums.iter().sum::<f64>() / nums.len() as f64))
        }

        AggOp::Median => {
            let mut nums = numeric(values);
            if nums.is_empty() {
                return Ok(Scalar::Null);
            }
            nums.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let mid = nums.len() / 2;
            Ok(Scalar::Float(if nums.len() % 2 == 0 {
                (nums[mid - 1] + nums[mid]) / 2.0
            } else {
                nums[mid]
            }))
        }

        AggOp::Std | AggOp::Var => {
            let nums = numeric(values);
            if nums.len() < 2 {
                return Ok(Scalar::Null);
            }
            let mean = nums.iter().sum::<f64>() / nums.len() as f64;
            // Sample variance
            let var = nums.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                / (nums.len() - 1) as f64;
            Ok(Scalar::Float(if op == AggOp::Var { var } else { var.sqrt() }))
        }
    }
}

/// Numeric view of a value slice; nulls and non-numeric values drop out
fn numeric(values: &[Scalar]) -> Vec<f64> {
    values.iter().filter_map(Scalar::as_f64).collect()
}

fn eval_str(op: StrOp, args: &[Expr], ctx: &EvalContext) -> FormulaResult<Vec<Scalar>> {
    let (columns, n) = eval_all(args, ctx)?;

    (0..n)
        .map(|row| {
            let text = match &columns[0][row] {
                Scalar::Null => return Ok(Scalar::Null),
                Scalar::Str(s) => s.clone(),
                other => {
                    return Err(FormulaError::TypeMismatch(format!(
                        "{:?} expects text, got {}",
                        op,
                        other.type_name()
                    )))
                }
            };

            Ok(match op {
                StrOp::Len => Scalar::Int(text.chars().count() as i64),
                StrOp::Trim => Scalar::Str(text.trim().to_string()),
                StrOp::Upper => Scalar::Str(text.to_uppercase()),
                StrOp::Lower => Scalar::Str(text.to_lowercase()),
                StrOp::Left => {
                    let count = int_arg(&columns[1][row], "LEFT")?.max(0) as usize;
                    Scalar::Str(text.chars().take(count).collect())
                }
                StrOp::Right => {
                    let count = int_arg(&columns[1][row], "RIGHT")?.max(0) as usize;
                    let len = text.chars().count();
                    Scalar::Str(text.chars().skip(len.saturating_sub(count)).collect())
                }
                StrOp::Mid => {
                    // 1-based start position
                    let start = int_arg(&columns[1][row], "MID")?.max(1) as usize;
                    let count = int_arg(&columns[2][row], "MID")?.max(0) as usize;
                    Scalar::Str(text.chars().skip(start - 1).take(count).collect())
                }
                StrOp::Substitute => {
                    let old = str_arg(&columns[1][row], "SUBSTITUTE")?;
                    let new = str_arg(&columns[2][row], "SUBSTITUTE")?;
                    Scalar::Str(text.replace(&old, &new))
                }
            })
        })
        .collect()
}

fn int_arg(v: &Scalar, function: &str) -> FormulaResult<i64> {
    v.as_f64().map(|n| n.trunc() as i64).ok_or_else(|| {
        FormulaError::TypeMismatch(format!(
            "{} expects a numeric argument, got {}",
            function,
            v.type_name()
        ))
    })
}

fn str_arg(v: &Scalar, function: &str) -> FormulaResult<String> {
    v.as_str().map(str::to_string).ok_or_else(|| {
        FormulaError::TypeMismatch(format!(
            "{} expects a text argument, got {}",
            function,
            v.type_name()
        ))
    })
}

fn eval_math(op: MathOp, args: &[Expr], ctx: &EvalContext) -> FormulaResult<Vec<Scalar>> {
    let (columns, n) = eval_all(args, ctx)?;

    (0..n)
        .map(|row| {
            let v = &columns[0][row];
            if v.is_null() {
                return Ok(Scalar::Null);
            }

            Ok(match op {
                MathOp::Abs => match v {
                    Scalar::Int(n) => Scalar::Int(n.abs()),
                    other => Scalar::Float(number(other, "ABS")?.abs()),
                },
                MathOp::Ceiling => match v {
                    Scalar::Int(n) => Scalar::Int(*n),
                    other => Scalar::Float(number(other, "CEILING")?.ceil()),
                },
                MathOp::Floor => match v {
                    Scalar::Int(n) => Scalar::Int(*n),
                    other => Scalar::Float(number(other, "FLOOR")?.floor()),
                },
                MathOp::Sqrt => Scalar::Float(number(v, "SQRT")?.sqrt()),
                MathOp::Round => {
                    let digits = int_arg(&columns[1][row], "ROUND")? as i32;
                    let factor = 10f64.powi(digits);
                    Scalar::Float((number(v, "ROUND")? * factor).round() / factor)
                }
            })
        })
        .collect()
}

fn number(v: &Scalar, function: &str) -> FormulaResult<f64> {
    v.as_f64().ok_or_else(|| {
        FormulaError::TypeMismatch(format!(
            "{} expects a numeric argument, got {}",
            function,
            v.type_name()
        ))
    })
}

fn date_diff(unit: DateUnit, start: &Scalar, end: &Scalar) -> FormulaResult<Scalar> {
    if start.is_null() || end.is_null() {
        return Ok(Scalar::Null);
    }

    let (start, end) = match (start.as_date(), end.as_date()) {
        (Some(s), Some(e)) => (s, e),
        _ => {
            return Err(FormulaError::TypeMismatch(format!(
                "DATEDIF expects dates, got {} and {}",
                start.type_name(),
                end.type_name()
            )))
        }
    };

    let days = (end - start).num_days();
    Ok(Scalar::Int(match unit {
        DateUnit::Days => days,
        // The 30.42/365.25 divisors match the engine's historical
        // month/year approximation; truncation toward zero
        DateUnit::Months => (days as f64 / 30.42) as i64,
        DateUnit::Years => (days as f64 / 365.25) as i64,
    }))
}

fn make_date(year: &Scalar, month: &Scalar, day: &Scalar) -> FormulaResult<Scalar> {
    if year.is_null() || month.is_null() || day.is_null() {
        return Ok(Scalar::Null);
    }

    let (y, m, d) = match (year.as_i64(), month.as_i64(), day.as_i64()) {
        (Some(y), Some(m), Some(d)) => (y, m, d),
        _ => {
            return Err(FormulaError::TypeMismatch(
                "DATE expects integer year, month and day".into(),
            ))
        }
    };

    chrono::NaiveDate::from_ymd_opt(y as i32, m as u32, d as u32)
        .map(Scalar::Date)
        .ok_or_else(|| {
            FormulaError::Evaluation(format!("invalid date {}-{}-{}", y, m, d))
        })
}

fn eval_financial(op: FinOp, args: &[Expr], ctx: &EvalContext) -> FormulaResult<Vec<Scalar>> {
    let (columns, n) = eval_all(args, ctx)?;

    (0..n)
        .map(|row| match op {
            FinOp::Fv | FinOp::Pv | FinOp::Pmt | FinOp::Rate => {
                let mut nums = [0.0; 4];
                for (slot, col) in nums.iter_mut().zip(&columns) {
                    match &col[row] {
                        Scalar::Null => return Ok(Scalar::Null),
                        v => *slot = number(v, &op.to_string())?,
                    }
                }
                let [a, b, c, d] = nums;
                Ok(Scalar::Float(match op {
                    FinOp::Fv => financial::fv(a, b, c, d),
                    FinOp::Pv => financial::pv(a, b, c, d),
                    FinOp::Pmt => financial::pmt(a, b, c, d),
                    _ => financial::rate(a, b, c, d),
                }))
            }

            FinOp::Npv => {
                let rate = match &columns[0][row] {
                    Scalar::Null => return Ok(Scalar::Null),
                    v => number(v, "NPV")?,
                };
                match sequence(&columns[1][row], "NPV")? {
                    None => Ok(Scalar::Null),
                    Some(flows) => Ok(Scalar::Float(financial::npv(rate, &flows))),
                }
            }

            FinOp::Irr => match sequence(&columns[0][row], "IRR")? {
                None => Ok(Scalar::Null),
                Some(flows) => Ok(Scalar::Float(financial::irr(&flows))),
            },
        })
        .collect()
}

/// A declared cash-flow sequence: a list value whose items are numeric
fn sequence(v: &Scalar, function: &str) -> FormulaResult<Option<Vec<f64>>> {
    match v {
        Scalar::Null => Ok(None),
        Scalar::List(items) => items
            .iter()
            .map(|item| number(item, function))
            .collect::<FormulaResult<Vec<f64>>>()
            .map(Some),
        other => Err(FormulaError::TypeMismatch(format!(
            "{} expects a list-typed sequence, got {}",
            function,
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_core::Series;

    fn sample() -> Table {
        Table::from_columns(vec![
            Series::floats("Price", vec![100.0, 150.0, -50.0, 200.0]),
            Series::ints("Quantity", vec![5, 12, 8, 15]),
            Series::strs("Name", vec!["John", "Alice", "Bob", "Eve"]),
            Series::dates(
                "Date",
                vec!["2025-01-01", "2025-02-01", "2025-03-01", "2025-04-01"],
            ),
        ])
        .unwrap()
    }

    fn run(formula: &str, table: &Table) -> Vec<Scalar> {
        let library = FunctionLibrary::with_builtins();
        let compiled = Compiler::new(&library).compile(formula).unwrap();
        let ctx = EvalContext::new(table);
        evaluate(&compiled.expr, &ctx).unwrap()
    }

    #[test]
    fn test_basic_arithmetic() {
        let table = Table::from_columns(vec![
            Series::floats("Price", vec![100.0, 150.0]),
            Series::floats("Tax", vec![10.0, 15.0]),
        ])
        .unwrap();
        assert_eq!(
            run("=Price + Tax", &table),
            vec![Scalar::Float(110.0), Scalar::Float(165.0)]
        );
    }

    #[test]
    fn test_conditional_discount() {
        let out = run("=IF(Quantity > 10, Price * 0.9, Price)", &sample());
        assert_eq!(
            out,
            vec![
                Scalar::Float(100.0),
                Scalar::Float(135.0),
                Scalar::Float(-50.0),
                Scalar::Float(180.0),
            ]
        );
    }

    #[test]
    fn test_concat_mixes_columns_and_literals() {
        let out = run("=CONCAT(Name, \" \", Quantity)", &sample());
        assert_eq!(out[0], Scalar::Str("John 5".into()));
        assert_eq!(out[1], Scalar::Str("Alice 12".into()));
    }

    #[test]
    fn test_datedif_days_scenario() {
        let out = run("=DATEDIF(\"2025-01-01\", Date, \"d\")", &sample());
        assert_eq!(
            out,
            vec![
                Scalar::Int(0),
                Scalar::Int(31),
                Scalar::Int(59),
                Scalar::Int(90),
            ]
        );
    }

    #[test]
    fn test_sumproduct_scenario() {
        let table = Table::from_columns(vec![
            Series::floats("Price", vec![100.0, 150.0]),
            Series::ints("Quantity", vec![5, 12]),
        ])
        .unwrap();
        let out = run("=SUMPRODUCT(Price, Quantity)", &table);
        // Aggregate broadcasts to table height
        assert_eq!(out, vec![Scalar::Float(2300.0), Scalar::Float(2300.0)]);
    }

    #[test]
    fn test_upper_comparison_is_case_sensitive() {
        let table =
            Table::from_columns(vec![Series::strs("name", vec!["JOHN", "Jane"])]).unwrap();
        let library = FunctionLibrary::with_builtins();
        let compiled = Compiler::new(&library)
            .compile("IF(UPPER([name]) = [name], TRUE, FALSE)")
            .unwrap();
        let ctx = EvalContext::new(&table);
        let pass = evaluate_predicate(&compiled.expr, &ctx).unwrap();
        assert_eq!(pass, vec![Some(true), Some(false)]);
    }

    #[test]
    fn test_membership() {
        let table = Table::from_columns(vec![Series::strs(
            "department",
            vec!["IT", "HR", "Marketing"],
        )])
        .unwrap();
        let out = run(
            "IF([department] IN (\"IT\", \"HR\", \"Finance\"), TRUE, FALSE)",
            &table,
        );
        assert_eq!(
            out,
            vec![Scalar::Bool(true), Scalar::Bool(true), Scalar::Bool(false)]
        );
    }

    #[test]
    fn test_round_and_abs() {
        let out = run("=ROUND(ABS(Price) / 7, 2)", &sample());
        assert_eq!(out[0], Scalar::Float(14.29));
    }

    #[test]
    fn test_aggregate_mean_broadcast() {
        let out = run("=AVERAGE(Quantity)", &sample());
        assert_eq!(out, vec![Scalar::Float(10.0); 4]);
    }

    #[test]
    fn test_countif() {
        let out = run("=COUNTIF(Quantity, Quantity > 7)", &sample());
        assert_eq!(out, vec![Scalar::Int(3); 4]);
    }

    #[test]
    fn test_sumif_with_sum_range() {
        let out = run("=SUMIF(Quantity, Quantity > 7, Price)", &sample());
        // 150 - 50 + 200
        assert_eq!(out, vec![Scalar::Float(300.0); 4]);
    }

    #[test]
    fn test_iferror_null_coalescing() {
        let table = Table::from_columns(vec![Series::new(
            "v",
            vec![Scalar::Float(1.5), Scalar::Null],
        )])
        .unwrap();
        let out = run("=IFERROR([v], 0)", &table);
        assert_eq!(out, vec![Scalar::Float(1.5), Scalar::Int(0)]);
    }

    #[test]
    fn test_isblank() {
        let table = Table::from_columns(vec![Series::new(
            "v",
            vec![Scalar::Null, Scalar::Int(3)],
        )])
        .unwrap();
        let out = run("=ISBLANK([v])", &table);
        assert_eq!(out, vec![Scalar::Bool(true), Scalar::Bool(false)]);
    }

    #[test]
    fn test_financial_fv_per_row() {
        let table = Table::from_columns(vec![
            Series::floats("Rate", vec![0.05]),
            Series::ints("Periods", vec![10]),
            Series::ints("Payment", vec![-100]),
            Series::floats("Pv", vec![100.0]),
        ])
        .unwrap();
        let out = run("=FV(Rate, Periods, Payment, Pv)", &table);
        match &out[0] {
            Scalar::Float(v) => assert!((v - 1094.899791).abs() < 1e-5),
            other => panic!("Expected Float, got {:?}", other),
        }
    }

    #[test]
    fn test_irr_over_list_column() {
        let flows = Scalar::List(vec![
            Scalar::Float(-100.0),
            Scalar::Float(39.0),
            Scalar::Float(59.0),
            Scalar::Float(55.0),
            Scalar::Float(20.0),
        ]);
        let table = Table::from_columns(vec![Series::new("CashFlows", vec![flows])]).unwrap();
        let out = run("=IRR(CashFlows)", &table);
        match &out[0] {
            Scalar::Float(v) => assert!((v - 0.28095).abs() < 1e-4),
            other => panic!("Expected Float, got {:?}", other),
        }
    }

    #[test]
    fn test_raw_call_fails_at_evaluation_only() {
        let library = FunctionLibrary::with_builtins();
        let compiled = Compiler::new(&library).compile("FOO([Price])").unwrap();
        assert_eq!(compiled.warnings.len(), 1);

        let table = sample();
        let ctx = EvalContext::new(&table);
        let err = evaluate(&compiled.expr, &ctx).unwrap_err();
        assert!(matches!(err, FormulaError::UnknownFunction(name) if name == "FOO"));
    }

    #[test]
    fn test_map_row_custom_function() {
        let mut library = FunctionLibrary::with_builtins();
        library
            .register_generator("DOUBLE", |args| {
                Ok(Expr::MapRow {
                    function: "DOUBLE".into(),
                    args,
                })
            })
            .unwrap();

        let mut row_fns: HashMap<String, RowFn> = HashMap::new();
        row_fns.insert(
            "DOUBLE".into(),
            Arc::new(|record: &Record| {
                let v = record
                    .get("arg0")
                    .and_then(Scalar::as_f64)
                    .unwrap_or_default();
                Ok(Scalar::Float(v * 2.0))
            }),
        );

        let table = Table::from_columns(vec![Series::ints("x", vec![1, 2, 3])]).unwrap();
        let compiled = Compiler::new(&library).compile("DOUBLE([x])").unwrap();
        let ctx = EvalContext::with_row_fns(&table, &row_fns);
        let out = evaluate(&compiled.expr, &ctx).unwrap();
        assert_eq!(
            out,
            vec![Scalar::Float(2.0), Scalar::Float(4.0), Scalar::Float(6.0)]
        );
    }

    #[test]
    fn test_lookup_first_match_join() {
        let table = Table::from_columns(vec![
            Series::strs("code", vec!["A", "B", "A"]),
            Series::strs("label", vec!["alpha", "beta", "shadow"]),
            Series::strs("probe", vec!["B", "A", "C"]),
        ])
        .unwrap();
        let out = run("=VLOOKUP([probe], [code], [label])", &table);
        assert_eq!(
            out,
            vec![
                Scalar::Str("beta".into()),
                Scalar::Str("alpha".into()),
                Scalar::Null,
            ]
        );
    }

    #[test]
    fn test_apply_formula_materializes_column() {
        let library = FunctionLibrary::with_builtins();
        let table = sample();
        let out = apply_formula(&table, &library, "=Price * Quantity", "Total").unwrap();
        assert_eq!(out.column("Total").unwrap().get(0), Some(&Scalar::Float(500.0)));
        assert_eq!(out.width(), table.width() + 1);
    }
}
