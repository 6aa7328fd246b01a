//! Logical functions

use super::{at_least, exactly, FunctionLibrary};
use crate::expr::{BinaryOp, Expr};
use crate::functions::math::fold_binary;

pub(crate) fn register(library: &mut FunctionLibrary) {
    // IF synthesizes a when/then/otherwise conditional so the result
    // stays vectorizable
    library
        .register_generator("IF", |mut args| {
            exactly("IF", &args, 3)?;
            let otherwise = args.pop().expect("arity checked");
            let then = args.pop().expect("arity checked");
            let cond = args.pop().expect("arity checked");
            Ok(Expr::When {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            })
        })
        .expect("builtin");

    // IFERROR approximates error trapping as null-coalescing: the target
    // engine has no exception-valued cells
    library
        .register_generator("IFERROR", |mut args| {
            exactly("IFERROR", &args, 2)?;
            let fallback = args.pop().expect("arity checked");
            let value = args.pop().expect("arity checked");
            Ok(Expr::When {
                cond: Box::new(Expr::IsNotNull(Box::new(value.clone()))),
                then: Box::new(value),
                otherwise: Box::new(fallback),
            })
        })
        .expect("builtin");

    library
        .register_generator("AND", |args| {
            at_least("AND", &args, 1)?;
            Ok(fold_binary(BinaryOp::And, args))
        })
        .expect("builtin");

    library
        .register_generator("OR", |args| {
            at_least("OR", &args, 1)?;
            Ok(fold_binary(BinaryOp::Or, args))
        })
        .expect("builtin");

    library
        .register_generator("NOT", |mut args| {
            exactly("NOT", &args, 1)?;
            Ok(Expr::Not(Box::new(args.pop().expect("arity checked"))))
        })
        .expect("builtin");
}
