//! Verity CLI - rule-based data-quality validation

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use verity::io as table_io;
use verity::prelude::*;

#[derive(Parser)]
#[command(name = "verity")]
#[command(author, version, about = "Data-quality validation over columnar tables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a data table against a rule set and print the summary
    Validate {
        /// Rule source CSV (rule_id, column, rule_type, rule_expression, error_message)
        #[arg(short, long)]
        rules: PathBuf,

        /// Input data table CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Directory for summary.csv and per-rule failing-row extracts
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile a formula and show its expression, classification and warnings
    Explain {
        /// Formula text, e.g. 'IF(SUM([salary]) > 100000, TRUE, FALSE)'
        formula: String,
    },

    /// List the rules in a rule source
    Rules {
        /// Rule source CSV
        #[arg(short, long)]
        rules: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            rules,
            data,
            output,
        } => validate(&rules, &data, output.as_deref()),
        Commands::Explain { formula } => explain(&formula),
        Commands::Rules { rules } => list_rules(&rules),
    }
}

fn validate(rules: &PathBuf, data: &PathBuf, output: Option<&std::path::Path>) -> Result<()> {
    let engine = ValidationEngine::from_rules_path(rules)
        .with_context(|| format!("Failed to load rules from '{}'", rules.display()))?;

    let table = table_io::read_table_file(data)
        .with_context(|| format!("Failed to read data table '{}'", data.display()))?;

    eprintln!(
        "Validating {} rows against {} rules",
        table.height(),
        engine.rules().len()
    );

    let report = engine.validate(&table);

    // Summary to stdout as CSV
    let mut buffer = Vec::new();
    table_io::write_table(&report.summary(), &mut buffer)
        .context("Failed to render summary")?;
    io::stdout()
        .write_all(&buffer)
        .context("Failed to write to stdout")?;

    let errored = report.iter().filter(|r| r.is_error()).count();
    let failed = report.iter().filter(|r| r.has_failures()).count();
    eprintln!(
        "{} rules ran clean, {} found failures, {} errored",
        report.len() - failed - errored,
        failed,
        errored
    );

    if let Some(directory) = output {
        report
            .write_csv(directory)
            .with_context(|| format!("Failed to write results to '{}'", directory.display()))?;
        eprintln!("Results written to '{}'", directory.display());
    }

    Ok(())
}

fn explain(formula: &str) -> Result<()> {
    let library = FunctionLibrary::with_builtins();
    let compiled = Compiler::new(&library)
        .compile(formula)
        .with_context(|| format!("Failed to compile '{}'", formula))?;

    println!("classification: {:?}", compiled.kind);
    println!("columns: {:?}", compiled.columns);
    for warning in &compiled.warnings {
        println!("warning: {}", warning);
    }
    println!("expression: {:#?}", compiled.expr);

    Ok(())
}

fn list_rules(rules: &PathBuf) -> Result<()> {
    let loaded = table_io::read_rules_file(rules)
        .with_context(|| format!("Failed to load rules from '{}'", rules.display()))?;

    for rule in &loaded {
        println!(
            "{}\t{:?}\t{}\t{}",
            rule.rule_id, rule.kind, rule.column, rule.expression
        );
    }
    eprintln!("{} rules", loaded.len());

    Ok(())
}
