//! Validation results

use std::path::Path;

use chrono::{DateTime, Utc};
use verity_core::{Scalar, Series, Table};

use crate::error::{EngineError, EngineResult};
use crate::rule::Rule;

/// Sentinel count for a rule whose compilation or evaluation failed
pub const FAILED_EXECUTION: i64 = -1;

/// Outcome of applying one rule to one table
#[derive(Debug, Clone)]
pub struct RuleResult {
    pub rule_id: String,
    pub column: String,
    /// Number of failing rows, or −1 when the rule itself failed
    pub failed_count: i64,
    pub error_message: String,
    /// Failing rows, restricted to the row identifier and the columns the
    /// rule referenced
    pub failed_records: Table,
    pub timestamp: DateTime<Utc>,
}

impl RuleResult {
    pub(crate) fn checked(rule: &Rule, failed_count: i64, failed_records: Table) -> Self {
        Self {
            rule_id: rule.rule_id.clone(),
            column: rule.column.clone(),
            failed_count,
            error_message: rule.error_message.clone(),
            failed_records,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn failed_execution(rule: &Rule, error: &EngineError) -> Self {
        Self {
            rule_id: rule.rule_id.clone(),
            column: rule.column.clone(),
            failed_count: FAILED_EXECUTION,
            error_message: format!("Rule execution failed: {}", error),
            failed_records: Table::new(),
            timestamp: Utc::now(),
        }
    }

    /// True when the rule itself could not be evaluated
    pub fn is_error(&self) -> bool {
        self.failed_count == FAILED_EXECUTION
    }

    /// True when the rule ran and found failing rows
    pub fn has_failures(&self) -> bool {
        self.failed_count > 0
    }
}

/// All results of one validation pass, in rule declaration order
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    results: Vec<RuleResult>,
}

impl ValidationReport {
    pub fn new(results: Vec<RuleResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[RuleResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RuleResult> {
        self.results.iter()
    }

    /// One summary row per declared rule
    pub fn summary(&self) -> Table {
        let columns = vec![
            Series::new(
                "rule_id",
                self.results
                    .iter()
                    .map(|r| Scalar::Str(r.rule_id.clone()))
                    .collect(),
            ),
            Series::new(
                "column",
                self.results
                    .iter()
                    .map(|r| Scalar::Str(r.column.clone()))
                    .collect(),
            ),
            Series::new(
                "failed_count",
                self.results
                    .iter()
                    .map(|r| Scalar::Int(r.failed_count))
                    .collect(),
            ),
            Series::new(
                "error_message",
                self.results
                    .iter()
                    .map(|r| Scalar::Str(r.error_message.clone()))
                    .collect(),
            ),
            Series::new(
                "timestamp",
                self.results
                    .iter()
                    .map(|r| Scalar::DateTime(r.timestamp.naive_utc()))
                    .collect(),
            ),
        ];

        Table::from_columns(columns).expect("summary columns are uniform")
    }

    /// Write the summary plus one failing-rows file per rule with
    /// failures into the given directory
    pub fn write_csv(&self, directory: impl AsRef<Path>) -> EngineResult<()> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory)?;

        crate::io::write_table_file(&self.summary(), directory.join("summary.csv"))?;

        for result in &self.results {
            if result.has_failures() {
                let path = directory.join(format!("rule_{}.csv", result.rule_id));
                crate::io::write_table_file(&result.failed_records, path)?;
            }
        }

        log::info!("results saved to {}", directory.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleKind;

    fn rule() -> Rule {
        Rule::new("r1", "c", RuleKind::Formula, "[c] > 0", "must be positive")
    }

    #[test]
    fn test_failed_execution_sentinel() {
        let result =
            RuleResult::failed_execution(&rule(), &EngineError::MissingColumn(vec!["c".into()]));
        assert!(result.is_error());
        assert!(!result.has_failures());
        assert!(result.error_message.starts_with("Rule execution failed:"));
    }

    #[test]
    fn test_summary_shape() {
        let report = ValidationReport::new(vec![
            RuleResult::checked(&rule(), 2, Table::new()),
            RuleResult::failed_execution(&rule(), &EngineError::InvalidFormatSpec("x".into())),
        ]);

        let summary = report.summary();
        assert_eq!(summary.height(), 2);
        let names: Vec<&str> = summary.column_names().collect();
        assert_eq!(
            names,
            vec!["rule_id", "column", "failed_count", "error_message", "timestamp"]
        );
        assert_eq!(
            summary.column("failed_count").unwrap().values(),
            &[Scalar::Int(2), Scalar::Int(-1)]
        );
    }
}
