//! Date and time functions

use chrono::NaiveDate;
use verity_core::Scalar;

use super::{exactly, FunctionLibrary};
use crate::error::{FormulaError, FormulaResult};
use crate::expr::{DateUnit, DtOp, Expr};

pub(crate) fn register(library: &mut FunctionLibrary) {
    library
        .register_generator("TODAY", |args| {
            exactly("TODAY", &args, 0)?;
            Ok(Expr::Today)
        })
        .expect("builtin");

    library
        .register_generator("NOW", |args| {
            exactly("NOW", &args, 0)?;
            Ok(Expr::Now)
        })
        .expect("builtin");

    register_dt(library, "YEAR", DtOp::Year);
    register_dt(library, "MONTH", DtOp::Month);
    register_dt(library, "DAY", DtOp::Day);

    library
        .register_generator("DATE", |mut args| {
            exactly("DATE", &args, 3)?;
            let day = args.pop().expect("arity checked");
            let month = args.pop().expect("arity checked");
            let year = args.pop().expect("arity checked");
            Ok(Expr::MakeDate {
                year: Box::new(year),
                month: Box::new(month),
                day: Box::new(day),
            })
        })
        .expect("builtin");

    library
        .register_generator("DATEDIF", |mut args| {
            exactly("DATEDIF", &args, 3)?;
            let unit = parse_unit(&args.pop().expect("arity checked"))?;
            let end = coerce_date_literal(args.pop().expect("arity checked"))?;
            let start = coerce_date_literal(args.pop().expect("arity checked"))?;
            Ok(Expr::DateDiff {
                start: Box::new(start),
                end: Box::new(end),
                unit,
            })
        })
        .expect("builtin");
}

fn register_dt(library: &mut FunctionLibrary, name: &'static str, op: DtOp) {
    library
        .register_generator(name, move |mut args| {
            exactly(name, &args, 1)?;
            Ok(Expr::Dt {
                op,
                input: Box::new(args.pop().expect("arity checked")),
            })
        })
        .expect("builtin");
}

/// The unit must be a literal text argument in {d, m, y}
fn parse_unit(arg: &Expr) -> FormulaResult<DateUnit> {
    let text = match arg {
        Expr::Literal(Scalar::Str(s)) => s.trim().to_lowercase(),
        other => {
            return Err(FormulaError::Argument(format!(
                "DATEDIF unit must be a literal string, got {:?}",
                other
            )))
        }
    };

    match text.as_str() {
        "d" => Ok(DateUnit::Days),
        "m" => Ok(DateUnit::Months),
        "y" => Ok(DateUnit::Years),
        other => Err(FormulaError::UnsupportedUnit(other.to_string())),
    }
}

/// String-literal date endpoints are cast to date literals at compile
/// time; everything else passes through for row-wise coercion
fn coerce_date_literal(arg: Expr) -> FormulaResult<Expr> {
    match arg {
        Expr::Literal(Scalar::Str(s)) => {
            let date = NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
                FormulaError::Argument(format!("cannot cast '{}' to a date", s))
            })?;
            Ok(Expr::Literal(Scalar::Date(date)))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datedif_rejects_bad_unit() {
        let library = {
            let mut l = FunctionLibrary::new();
            register(&mut l);
            l
        };
        let spec = library.lookup("DATEDIF").unwrap();
        let generator = match spec {
            super::super::FunctionSpec::Generator(f) => f,
            other => panic!("Expected Generator, got {:?}", other),
        };

        let err = generator(vec![
            Expr::Literal(Scalar::Str("2025-01-01".into())),
            Expr::Column("Date".into()),
            Expr::Literal(Scalar::Str("w".into())),
        ])
        .unwrap_err();
        assert!(matches!(err, FormulaError::UnsupportedUnit(u) if u == "w"));
    }

    #[test]
    fn test_datedif_casts_string_endpoints() {
        let library = {
            let mut l = FunctionLibrary::new();
            register(&mut l);
            l
        };
        let generator = match library.lookup("DATEDIF").unwrap() {
            super::super::FunctionSpec::Generator(f) => f.clone(),
            other => panic!("Expected Generator, got {:?}", other),
        };

        let expr = generator(vec![
            Expr::Literal(Scalar::Str("2025-01-01".into())),
            Expr::Column("Date".into()),
            Expr::Literal(Scalar::Str("d".into())),
        ])
        .unwrap();

        match expr {
            Expr::DateDiff { start, unit, .. } => {
                assert_eq!(unit, DateUnit::Days);
                assert_eq!(
                    *start,
                    Expr::Literal(Scalar::Date(
                        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
                    ))
                );
            }
            other => panic!("Expected DateDiff, got {:?}", other),
        }
    }
}
