//! Rule evaluation engine
//!
//! Applies every rule to an input table in declaration order. Each rule's
//! failure is isolated: an error during compilation or evaluation becomes
//! that rule's result with the sentinel count, and the pass continues.

use lazy_regex::regex;
use verity_core::{Scalar, Table};
use verity_formula::{
    evaluate_predicate, Compiler, EvalContext, FunctionLibrary, FunctionSpec,
};

use crate::custom::{CustomFunctionRegistry, FunctionProvider, TablePredicate};
use crate::error::{EngineError, EngineResult};
use crate::report::{RuleResult, ValidationReport};
use crate::rule::{FormatSpec, Rule, RuleKind};

/// Name of the synthetic row-identifier column
pub const ROW_ID_COLUMN: &str = "row_id";

/// Tolerance for the decimal-places format check
const DECIMAL_TOLERANCE: f64 = 1e-10;

/// The validation engine: one rule set, one function library, one custom
/// registry. Registries are written only before a pass begins.
pub struct ValidationEngine {
    library: FunctionLibrary,
    customs: CustomFunctionRegistry,
    rules: Vec<Rule>,
}

impl ValidationEngine {
    /// Create an engine over a rule set, with the built-in function
    /// library
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            library: FunctionLibrary::with_builtins(),
            customs: CustomFunctionRegistry::new(),
            rules,
        }
    }

    /// Create an engine from a CSV rule source
    pub fn from_rules_path(path: impl AsRef<std::path::Path>) -> EngineResult<Self> {
        let rules = crate::io::read_rules_file(path)?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn library(&self) -> &FunctionLibrary {
        &self.library
    }

    /// Install or override a formula function
    pub fn register_function(&mut self, name: &str, spec: FunctionSpec) -> EngineResult<()> {
        self.library.register(name, spec)?;
        Ok(())
    }

    /// Install a whole-table predicate for CustomFunction-kind rules
    pub fn register_predicate(
        &mut self,
        name: &str,
        predicate: TablePredicate,
    ) -> EngineResult<()> {
        self.customs.register_predicate(name, predicate)
    }

    /// Load every function a provider exposes
    pub fn load_provider(&mut self, provider: &dyn FunctionProvider) -> EngineResult<usize> {
        self.customs.load_provider(provider, &mut self.library)
    }

    /// Apply every rule to the table, in declaration order. The summary
    /// always carries one result per declared rule, whatever happened.
    pub fn validate(&self, table: &Table) -> ValidationReport {
        let table = table.with_row_ids(ROW_ID_COLUMN);

        let results = self
            .rules
            .iter()
            .map(|rule| {
                self.apply_rule(&table, rule).unwrap_or_else(|err| {
                    log::error!("error applying rule {}: {}", rule.rule_id, err);
                    RuleResult::failed_execution(rule, &err)
                })
            })
            .collect();

        ValidationReport::new(results)
    }

    fn apply_rule(&self, table: &Table, rule: &Rule) -> EngineResult<RuleResult> {
        let failing = match rule.kind {
            RuleKind::Formula => self.formula_failures(table, rule)?,
            RuleKind::CustomFunction => self.custom_failures(table, rule)?,
            RuleKind::Regex => self.regex_failures(table, rule)?,
            RuleKind::Format => self.format_failures(table, rule)?,
        };

        // Row identifier plus the columns the rule referenced, restricted
        // to columns that actually exist
        let mut columns = vec![ROW_ID_COLUMN.to_string()];
        for name in referenced_columns(rule, table) {
            if name != ROW_ID_COLUMN && !columns.contains(&name) {
                columns.push(name);
            }
        }
        let failed_records = table.take(&failing).select(&columns)?;

        Ok(RuleResult::checked(rule, failing.len() as i64, failed_records))
    }

    fn formula_failures(&self, table: &Table, rule: &Rule) -> EngineResult<Vec<usize>> {
        let compiled = Compiler::new(&self.library).compile(&rule.expression)?;
        for warning in &compiled.warnings {
            log::warn!("rule {}: {}", rule.rule_id, warning);
        }

        let missing: Vec<String> = compiled
            .columns
            .iter()
            .filter(|name| !table.has_column(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::MissingColumn(missing));
        }

        // Aggregate formulas group by the columns the rule does not
        // reference, when there are any; the predicate then runs per
        // group with its reductions scoped to the group
        if compiled.is_aggregate() {
            let group_columns: Vec<String> = table
                .column_names()
                .filter(|name| *name != ROW_ID_COLUMN && !compiled.columns.iter().any(|c| c == name))
                .map(str::to_string)
                .collect();

            if !group_columns.is_empty() {
                let mut failing = Vec::new();
                for rows in table.partition_by(&group_columns)? {
                    let group = table.take(&rows);
                    let ctx = EvalContext::with_row_fns(&group, self.customs.row_fns());
                    let pass = evaluate_predicate(&compiled.expr, &ctx)?;
                    failing.extend(
                        pass.iter()
                            .enumerate()
                            .filter(|(_, p)| **p == Some(false))
                            .map(|(i, _)| rows[i]),
                    );
                }
                failing.sort_unstable();
                return Ok(failing);
            }
        }

        let ctx = EvalContext::with_row_fns(table, self.customs.row_fns());
        let pass = evaluate_predicate(&compiled.expr, &ctx)?;
        Ok(failing_rows(&pass))
    }

    fn custom_failures(&self, table: &Table, rule: &Rule) -> EngineResult<Vec<usize>> {
        let predicate = self
            .customs
            .predicate(&rule.expression)
            .ok_or_else(|| EngineError::MissingCustomFunction(rule.expression.clone()))?;

        let pass = predicate(table, &rule.column)?;
        if pass.len() != table.height() {
            return Err(EngineError::CustomFunction(format!(
                "predicate '{}' returned {} flags for {} rows",
                rule.expression,
                pass.len(),
                table.height()
            )));
        }

        Ok(pass
            .iter()
            .enumerate()
            .filter(|(_, p)| !**p)
            .map(|(i, _)| i)
            .collect())
    }

    fn regex_failures(&self, table: &Table, rule: &Rule) -> EngineResult<Vec<usize>> {
        let column = table
            .column(&rule.column)
            .ok_or_else(|| EngineError::MissingColumn(vec![rule.column.clone()]))?;

        let pattern =
            regex::Regex::new(&rule.expression).map_err(|source| EngineError::InvalidPattern {
                pattern: rule.expression.clone(),
                source,
            })?;

        let mut failing = Vec::new();
        for (row, value) in column.iter().enumerate() {
            match value {
                Scalar::Null => {}
                Scalar::Str(s) => {
                    if !pattern.is_match(s) {
                        failing.push(row);
                    }
                }
                other => {
                    return Err(verity_formula::FormulaError::TypeMismatch(format!(
                        "regex rules apply to text columns, column '{}' holds {}",
                        rule.column,
                        other.type_name()
                    ))
                    .into())
                }
            }
        }
        Ok(failing)
    }

    fn format_failures(&self, table: &Table, rule: &Rule) -> EngineResult<Vec<usize>> {
        let column = table
            .column(&rule.column)
            .ok_or_else(|| EngineError::MissingColumn(vec![rule.column.clone()]))?;

        let spec = FormatSpec::parse(&rule.expression)?;
        let pattern = match &spec {
            FormatSpec::Pattern(p) => Some(regex::Regex::new(p).map_err(|source| {
                EngineError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                }
            })?),
            _ => None,
        };

        Ok(column
            .iter()
            .enumerate()
            .filter(|(_, value)| !format_passes(&spec, pattern.as_ref(), value))
            .map(|(row, _)| row)
            .collect())
    }
}

/// Missing values never satisfy a format check
fn format_passes(spec: &FormatSpec, pattern: Option<&regex::Regex>, value: &Scalar) -> bool {
    if value.is_null() {
        return false;
    }

    match spec {
        FormatSpec::Date(format) => {
            chrono::NaiveDate::parse_from_str(&value.to_string(), format).is_ok()
        }

        FormatSpec::Integer => match value {
            Scalar::Int(_) => true,
            Scalar::Float(n) => n.fract() == 0.0,
            Scalar::Str(s) => s.trim().parse::<i64>().is_ok(),
            _ => false,
        },

        FormatSpec::Decimal(digits) => {
            let number = match value {
                Scalar::Int(n) => Some(*n as f64),
                Scalar::Float(n) => Some(*n),
                Scalar::Str(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            match number {
                Some(x) => {
                    let factor = 10f64.powi(*digits as i32);
                    (x - (x * factor).round() / factor).abs() < DECIMAL_TOLERANCE
                }
                None => false,
            }
        }

        FormatSpec::Pattern(_) => pattern
            .map(|p| p.is_match(&value.to_string()))
            .unwrap_or(false),
    }
}

fn failing_rows(pass: &[Option<bool>]) -> Vec<usize> {
    pass.iter()
        .enumerate()
        .filter(|(_, p)| **p == Some(false))
        .map(|(i, _)| i)
        .collect()
}

/// Columns a rule references, for the failing-row extract: bracketed
/// names in the expression text for Formula/Regex/Format kinds, the
/// declared target column for CustomFunction. Only columns present in the
/// table are kept.
fn referenced_columns(rule: &Rule, table: &Table) -> Vec<String> {
    match rule.kind {
        RuleKind::CustomFunction => {
            if table.has_column(&rule.column) {
                vec![rule.column.clone()]
            } else {
                vec![]
            }
        }
        _ => {
            let mut names = Vec::new();
            for capture in regex!(r"\[([^\]]*)\]").captures_iter(&rule.expression) {
                let name = capture[1].to_string();
                if table.has_column(&name) && !names.contains(&name) {
                    names.push(name);
                }
            }
            names
        }
    }
}
