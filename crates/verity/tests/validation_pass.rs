//! End-to-end validation pass tests, modeled on a realistic rule suite

use std::sync::Arc;

use verity::io;
use verity::prelude::*;
use verity::{row_scalar, table_predicate, EngineResult, FunctionProvider, ProvidedFunction};

fn people() -> Table {
    Table::from_columns(vec![
        Series::strs("name", vec!["JOHN", "Jane", "bob", "BOBBY", "Alice"]),
        Series::ints("age", vec![25, 30, 35, 22, 28]),
        Series::strs(
            "email",
            vec![
                "john@example.com",
                "jane@example.com",
                "invalid",
                "bob@",
                "alice@example.com",
            ],
        ),
        Series::floats(
            "salary",
            vec![50000.00, 60000.50, 55000.123, 45000.00, 65000.00],
        ),
        Series::strs(
            "join_date",
            vec!["2023-01-15", "2024-06-20", "2022/03/10", "2024-01-01", "2023-07-01"],
        ),
        Series::strs("department", vec!["IT", "HR", "IT", "Finance", "Marketing"]),
        Series::strs("code", vec!["ABC123", "DEF456", "GH789", "IJK123", "LMN456"]),
    ])
    .unwrap()
}

struct EmailFunctions;

impl FunctionProvider for EmailFunctions {
    fn name(&self) -> &str {
        "email-functions"
    }

    fn functions(&self) -> EngineResult<Vec<(String, ProvidedFunction)>> {
        Ok(vec![(
            "validate_email".into(),
            table_predicate(|table, column| {
                let pattern =
                    regex::Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
                        .expect("static pattern");
                Ok(table
                    .column(column)
                    .map(|c| {
                        c.iter()
                            .map(|v| v.as_str().map_or(false, |s| pattern.is_match(s)))
                            .collect()
                    })
                    .unwrap_or_default())
            }),
        )])
    }
}

fn full_suite() -> Vec<Rule> {
    vec![
        Rule::new(
            "1",
            "name",
            RuleKind::Formula,
            "IF(UPPER([name]) = [name], TRUE, FALSE)",
            "Name must be uppercase",
        ),
        Rule::new(
            "2",
            "age",
            RuleKind::Formula,
            "IF(ROUND(ABS([age]) / [salary], 2) < 0.001, TRUE, FALSE)",
            "Age to salary ratio invalid",
        ),
        Rule::new(
            "3",
            "email",
            RuleKind::CustomFunction,
            "validate_email",
            "Invalid email format",
        ),
        Rule::new(
            "6",
            "name",
            RuleKind::Regex,
            "^[A-Z][a-z]+$",
            "Name must start with capital letter followed by lowercase",
        ),
        Rule::new(
            "7",
            "join_date",
            RuleKind::Format,
            "date:%Y-%m-%d",
            "Join date must be in YYYY-MM-DD format",
        ),
        Rule::new(
            "8",
            "salary",
            RuleKind::Format,
            "number:decimal:2",
            "Salary must have exactly 2 decimal places",
        ),
        Rule::new(
            "9",
            "code",
            RuleKind::Format,
            "string:^[A-Z]{3}\\d{3}$",
            "Code must be 3 letters followed by 3 digits",
        ),
        Rule::new(
            "10",
            "department",
            RuleKind::Formula,
            "IF([department] IN (\"IT\", \"HR\", \"Finance\"), TRUE, FALSE)",
            "Department must be IT, HR, or Finance",
        ),
    ]
}

#[test]
fn full_rule_suite_counts() {
    let mut engine = ValidationEngine::new(full_suite());
    engine.load_provider(&EmailFunctions).unwrap();

    let report = engine.validate(&people());
    let counts: Vec<(String, i64)> = report
        .results()
        .iter()
        .map(|r| (r.rule_id.clone(), r.failed_count))
        .collect();

    assert_eq!(
        counts,
        vec![
            ("1".to_string(), 3),  // Jane, bob, Alice are not uppercase
            ("2".to_string(), 0),  // every ratio rounds below the bound
            ("3".to_string(), 2),  // "invalid" and "bob@"
            ("6".to_string(), 3),  // JOHN, bob, BOBBY
            ("7".to_string(), 1),  // 2022/03/10
            ("8".to_string(), 1),  // 55000.123
            ("9".to_string(), 1),  // GH789
            ("10".to_string(), 1), // Marketing
        ]
    );
}

#[test]
fn failing_records_carry_row_ids_and_referenced_columns() {
    let mut engine = ValidationEngine::new(full_suite());
    engine.load_provider(&EmailFunctions).unwrap();

    let report = engine.validate(&people());
    let upper = &report.results()[0];

    let names: Vec<&str> = upper.failed_records.column_names().collect();
    assert_eq!(names, vec![ROW_ID_COLUMN, "name"]);
    assert_eq!(
        upper.failed_records.column(ROW_ID_COLUMN).unwrap().values(),
        &[Scalar::Int(1), Scalar::Int(2), Scalar::Int(4)]
    );
}

#[test]
fn one_malformed_rule_among_valid_rules() {
    let mut rules = full_suite();
    rules.insert(
        3,
        Rule::new("bad", "nope", RuleKind::Formula, "[nope] > 1", "broken"),
    );

    let mut engine = ValidationEngine::new(rules);
    engine.load_provider(&EmailFunctions).unwrap();

    let report = engine.validate(&people());
    assert_eq!(report.len(), 9);

    let errors: Vec<&str> = report
        .iter()
        .filter(|r| r.is_error())
        .map(|r| r.rule_id.as_str())
        .collect();
    assert_eq!(errors, vec!["bad"]);
    assert!(report.iter().filter(|r| !r.is_error()).all(|r| r.failed_count >= 0));
}

#[test]
fn decimal_format_boundary_values() {
    let table = Table::from_columns(vec![Series::floats(
        "salary",
        vec![55000.123, 50000.00],
    )])
    .unwrap();

    let engine = ValidationEngine::new(vec![Rule::new(
        "8",
        "salary",
        RuleKind::Format,
        "number:decimal:2",
        "Two decimal places",
    )]);

    let validation = engine.validate(&table);
    let result = &validation.results()[0];
    assert_eq!(result.failed_count, 1);
    assert_eq!(
        result.failed_records.column(ROW_ID_COLUMN).unwrap().values(),
        &[Scalar::Int(0)]
    );
}

#[test]
fn csv_round_trip_through_rule_source_and_result_sink() {
    let rules_csv = "\
rule_id,column,rule_type,rule_expression,error_message
1,name,excel,\"IF(UPPER([name]) = [name], TRUE, FALSE)\",Name must be uppercase
2,department,excel,\"IF([department] IN (\"\"IT\"\", \"\"HR\"\"), TRUE, FALSE)\",Bad department
";
    let data_csv = "name,department\nJOHN,IT\nJane,Legal\n";

    let dir = tempfile::tempdir().unwrap();
    let rules_path = dir.path().join("rules.csv");
    let data_path = dir.path().join("data.csv");
    std::fs::write(&rules_path, rules_csv).unwrap();
    std::fs::write(&data_path, data_csv).unwrap();

    let engine = ValidationEngine::from_rules_path(&rules_path).unwrap();
    let table = io::read_table_file(&data_path).unwrap();
    let report = engine.validate(&table);

    let out_dir = dir.path().join("results");
    report.write_csv(&out_dir).unwrap();

    let summary = std::fs::read_to_string(out_dir.join("summary.csv")).unwrap();
    let mut lines = summary.lines();
    assert_eq!(
        lines.next().unwrap(),
        "rule_id,column,failed_count,error_message,timestamp"
    );
    assert_eq!(summary.lines().count(), 3);

    // Both rules flagged the "Jane,Legal" row
    let rule1 = std::fs::read_to_string(out_dir.join("rule_1.csv")).unwrap();
    assert!(rule1.contains("Jane"));
    let rule2 = std::fs::read_to_string(out_dir.join("rule_2.csv")).unwrap();
    assert!(rule2.contains("Legal"));
}

#[test]
fn row_scalar_functions_work_inside_formula_rules() {
    struct Doubler;

    impl FunctionProvider for Doubler {
        fn name(&self) -> &str {
            "doubler"
        }

        fn functions(&self) -> EngineResult<Vec<(String, ProvidedFunction)>> {
            Ok(vec![(
                "double".into(),
                row_scalar(|record| {
                    let v = record
                        .get("arg0")
                        .and_then(Scalar::as_f64)
                        .unwrap_or_default();
                    Ok(Scalar::Float(v * 2.0))
                }),
            )])
        }
    }

    let mut engine = ValidationEngine::new(vec![Rule::new(
        "d1",
        "age",
        RuleKind::Formula,
        "DOUBLE([age]) >= 50",
        "doubled age below 50",
    )]);
    engine.load_provider(&Doubler).unwrap();

    let table = Table::from_columns(vec![Series::ints("age", vec![25, 24, 30])]).unwrap();
    let validation = engine.validate(&table);
    let result = &validation.results()[0];
    // 24 doubles to 48
    assert_eq!(result.failed_count, 1);
}

#[test]
fn aggregate_rule_with_grouping_detected() {
    let table = Table::from_columns(vec![
        Series::strs("department", vec!["IT", "IT", "HR"]),
        Series::ints("salary", vec![60000, 70000, 20000]),
    ])
    .unwrap();

    let engine = ValidationEngine::new(vec![Rule::new(
        "agg",
        "salary",
        RuleKind::Formula,
        "IF(SUM([salary]) > 100000, TRUE, FALSE)",
        "Department salary mass too small",
    )]);

    let validation = engine.validate(&table);
    let result = &validation.results()[0];
    // HR's lone row fails; IT's group sums to 130000 and passes
    assert_eq!(result.failed_count, 1);
    assert_eq!(
        result.failed_records.column(ROW_ID_COLUMN).unwrap().values(),
        &[Scalar::Int(2)]
    );
}

#[test]
fn predicate_nulls_do_not_fail_rows() {
    let table = Table::from_columns(vec![Series::new(
        "v",
        vec![Scalar::Int(1), Scalar::Null, Scalar::Int(-1)],
    )])
    .unwrap();

    let engine = ValidationEngine::new(vec![Rule::new(
        "n",
        "v",
        RuleKind::Formula,
        "[v] > 0",
        "must be positive",
    )]);

    let validation = engine.validate(&table);
    let result = &validation.results()[0];
    // The null row is neither pass nor fail; only -1 fails
    assert_eq!(result.failed_count, 1);
    assert_eq!(
        result.failed_records.column(ROW_ID_COLUMN).unwrap().values(),
        &[Scalar::Int(2)]
    );
}
