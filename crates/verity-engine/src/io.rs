//! CSV rule sources, data tables and result sinks

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use verity_core::{Scalar, Series, Table};

use crate::error::{EngineError, EngineResult};
use crate::rule::{Rule, RuleKind};

/// Headers a rule source must carry
const REQUIRED_RULE_COLUMNS: [&str; 5] = [
    "rule_id",
    "column",
    "rule_type",
    "rule_expression",
    "error_message",
];

/// Read a rule set from a CSV file
pub fn read_rules_file(path: impl AsRef<Path>) -> EngineResult<Vec<Rule>> {
    let file = File::open(path)?;
    read_rules(file)
}

/// Read a rule set from a CSV reader. Missing required headers are a
/// load-time error enumerating every absent column.
pub fn read_rules<R: Read>(reader: R) -> EngineResult<Vec<Rule>> {
    let mut csv_reader = csv::ReaderBuilder::new().from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = REQUIRED_RULE_COLUMNS
        .iter()
        .filter(|name| position(name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(EngineError::MissingRuleColumns(missing));
    }

    let indices: Vec<usize> = REQUIRED_RULE_COLUMNS
        .iter()
        .map(|name| position(name).expect("presence checked"))
        .collect();

    let mut rules = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let field = |i: usize| record.get(indices[i]).unwrap_or("").to_string();

        rules.push(Rule::new(
            field(0),
            field(1),
            RuleKind::from_str(&field(2))?,
            field(3),
            field(4),
        ));
    }

    Ok(rules)
}

/// Read a data table from a CSV file
pub fn read_table_file(path: impl AsRef<Path>) -> EngineResult<Table> {
    let file = File::open(path)?;
    read_table(file)
}

/// Read a data table from a CSV reader, detecting cell types
pub fn read_table<R: Read>(reader: R) -> EngineResult<Table> {
    let mut csv_reader = csv::ReaderBuilder::new().from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect();

    let mut columns: Vec<Vec<Scalar>> = vec![Vec::new(); headers.len()];
    for record in csv_reader.records() {
        let record = record?;
        for (i, column) in columns.iter_mut().enumerate() {
            column.push(detect_type(record.get(i).unwrap_or("")));
        }
    }

    Ok(Table::from_columns(
        headers
            .into_iter()
            .zip(columns)
            .map(|(name, values)| Series::new(name, values))
            .collect(),
    )?)
}

/// Detect the type of a CSV field: integer, float, boolean, ISO date,
/// text; empty fields become null
fn detect_type(field: &str) -> Scalar {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Scalar::Null;
    }

    if let Ok(n) = trimmed.parse::<i64>() {
        return Scalar::Int(n);
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        return Scalar::Float(n);
    }

    let upper = trimmed.to_uppercase();
    if upper == "TRUE" {
        return Scalar::Bool(true);
    }
    if upper == "FALSE" {
        return Scalar::Bool(false);
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Scalar::Date(date);
    }

    Scalar::Str(field.to_string())
}

/// Write a table to a CSV file
pub fn write_table_file(table: &Table, path: impl AsRef<Path>) -> EngineResult<()> {
    let file = File::create(path)?;
    write_table(table, file)
}

/// Write a table to a CSV writer
pub fn write_table<W: Write>(table: &Table, writer: W) -> EngineResult<()> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);

    csv_writer.write_record(table.column_names())?;

    for row in 0..table.height() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|c| c.get(row).map(Scalar::to_string).unwrap_or_default())
            .collect();
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}
