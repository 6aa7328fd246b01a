//! Mathematical functions

use std::sync::Arc;

use verity_core::Scalar;

use super::{at_least, between, exactly, FunctionLibrary, FunctionSpec};
use crate::expr::{AggOp, BinaryOp, Expr, MathOp};

pub(crate) fn register(library: &mut FunctionLibrary) {
    library
        .register("SUM", FunctionSpec::DirectReduce(AggOp::Sum))
        .expect("builtin");
    library
        .register("AVERAGE", FunctionSpec::DirectReduce(AggOp::Mean))
        .expect("builtin");
    library
        .register("MIN", FunctionSpec::DirectReduce(AggOp::Min))
        .expect("builtin");
    library
        .register("MAX", FunctionSpec::DirectReduce(AggOp::Max))
        .expect("builtin");
    library
        .register("COUNT", FunctionSpec::DirectReduce(AggOp::Count))
        .expect("builtin");

    library
        .register_generator("ABS", |args| {
            exactly("ABS", &args, 1)?;
            Ok(Expr::Math {
                op: MathOp::Abs,
                args,
            })
        })
        .expect("builtin");

    library
        .register_generator("ROUND", |mut args| {
            between("ROUND", &args, 1, 2)?;
            if args.len() == 1 {
                args.push(Expr::Literal(Scalar::Int(0)));
            }
            Ok(Expr::Math {
                op: MathOp::Round,
                args,
            })
        })
        .expect("builtin");

    library
        .register_generator("CEILING", |args| {
            exactly("CEILING", &args, 1)?;
            Ok(Expr::Math {
                op: MathOp::Ceiling,
                args,
            })
        })
        .expect("builtin");

    library
        .register_generator("FLOOR", |args| {
            exactly("FLOOR", &args, 1)?;
            Ok(Expr::Math {
                op: MathOp::Floor,
                args,
            })
        })
        .expect("builtin");

    library
        .register_generator("SQRT", |args| {
            exactly("SQRT", &args, 1)?;
            Ok(Expr::Math {
                op: MathOp::Sqrt,
                args,
            })
        })
        .expect("builtin");

    library
        .register_generator("MOD", |args| {
            exactly("MOD", &args, 2)?;
            Ok(binary(BinaryOp::Mod, args))
        })
        .expect("builtin");

    library
        .register_generator("POWER", |args| {
            exactly("POWER", &args, 2)?;
            Ok(binary(BinaryOp::Pow, args))
        })
        .expect("builtin");

    // SUMPRODUCT folds pairwise multiplication left-to-right, then sums
    library
        .register(
            "SUMPRODUCT",
            FunctionSpec::Generator(Arc::new(|args| {
                at_least("SUMPRODUCT", &args, 1)?;
                let product = fold_binary(BinaryOp::Mul, args);
                Ok(Expr::Agg {
                    op: AggOp::Sum,
                    input: Box::new(product),
                })
            })),
        )
        .expect("builtin");
}

fn binary(op: BinaryOp, mut args: Vec<Expr>) -> Expr {
    let right = args.pop().expect("arity checked");
    let left = args.pop().expect("arity checked");
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Left-to-right fold of a non-empty argument list
pub(crate) fn fold_binary(op: BinaryOp, args: Vec<Expr>) -> Expr {
    let mut iter = args.into_iter();
    let first = iter.next().expect("arity checked");
    iter.fold(first, |acc, next| Expr::Binary {
        op,
        left: Box::new(acc),
        right: Box::new(next),
    })
}
