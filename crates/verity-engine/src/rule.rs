//! Validation rule model

use std::str::FromStr;

use crate::error::EngineError;

/// The kind of check a rule performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Spreadsheet-style formula compiled to a columnar predicate
    Formula,
    /// Previously registered table predicate, looked up by name
    CustomFunction,
    /// Regex match over the target column's text
    Regex,
    /// Declarative format check (date/number/string)
    Format,
}

impl FromStr for RuleKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The `excel` and `python` names are accepted for rule sets
        // written against the engine's earlier incarnation
        match s.trim().to_lowercase().as_str() {
            "formula" | "excel" => Ok(RuleKind::Formula),
            "custom" | "custom_function" | "python" => Ok(RuleKind::CustomFunction),
            "regex" => Ok(RuleKind::Regex),
            "format" => Ok(RuleKind::Format),
            other => Err(EngineError::UnknownRuleKind(other.to_string())),
        }
    }
}

/// One validation rule, immutable after load
#[derive(Debug, Clone)]
pub struct Rule {
    pub rule_id: String,
    pub column: String,
    pub kind: RuleKind,
    pub expression: String,
    pub error_message: String,
}

impl Rule {
    pub fn new(
        rule_id: impl Into<String>,
        column: impl Into<String>,
        kind: RuleKind,
        expression: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            column: column.into(),
            kind,
            expression: expression.into(),
            error_message: error_message.into(),
        }
    }
}

/// Parsed form of a Format-kind rule expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSpec {
    /// `date:<chrono format>`
    Date(String),
    /// `number:integer`
    Integer,
    /// `number:decimal:<n>`
    Decimal(u32),
    /// `string:<pattern>`
    Pattern(String),
}

impl FormatSpec {
    pub fn parse(spec: &str) -> Result<FormatSpec, EngineError> {
        if let Some(format) = spec.strip_prefix("date:") {
            return Ok(FormatSpec::Date(format.to_string()));
        }

        if let Some(number) = spec.strip_prefix("number:") {
            if number == "integer" {
                return Ok(FormatSpec::Integer);
            }
            if let Some(digits) = number.strip_prefix("decimal:") {
                let digits = digits
                    .parse::<u32>()
                    .map_err(|_| EngineError::InvalidFormatSpec(spec.to_string()))?;
                return Ok(FormatSpec::Decimal(digits));
            }
            return Err(EngineError::InvalidFormatSpec(spec.to_string()));
        }

        if let Some(pattern) = spec.strip_prefix("string:") {
            return Ok(FormatSpec::Pattern(pattern.to_string()));
        }

        Err(EngineError::InvalidFormatSpec(spec.to_string()))
    }
}
