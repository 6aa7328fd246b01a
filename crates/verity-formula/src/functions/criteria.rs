//! Criteria-based reductions (COUNTIF, SUMIF)

use super::{between, exactly, FunctionLibrary};
use crate::expr::{AggOp, Expr};

pub(crate) fn register(library: &mut FunctionLibrary) {
    // COUNTIF(range, criteria): count rows of the range where the
    // criteria expression holds
    library
        .register_generator("COUNTIF", |mut args| {
            exactly("COUNTIF", &args, 2)?;
            let predicate = args.pop().expect("arity checked");
            let range = args.pop().expect("arity checked");
            Ok(Expr::Agg {
                op: AggOp::Count,
                input: Box::new(Expr::Filter {
                    input: Box::new(range),
                    predicate: Box::new(predicate),
                }),
            })
        })
        .expect("builtin");

    // SUMIF(range, criteria[, sum_range]): sum the sum-range (defaulting
    // to the filter range) where the criteria holds
    library
        .register_generator("SUMIF", |mut args| {
            between("SUMIF", &args, 2, 3)?;
            let sum_range = if args.len() == 3 {
                args.pop().expect("arity checked")
            } else {
                args[0].clone()
            };
            let predicate = args.pop().expect("arity checked");
            let _range = args.pop().expect("arity checked");
            Ok(Expr::Agg {
                op: AggOp::Sum,
                input: Box::new(Expr::Filter {
                    input: Box::new(sum_range),
                    predicate: Box::new(predicate),
                }),
            })
        })
        .expect("builtin");
}
