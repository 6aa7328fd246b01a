//! Information functions

use super::{exactly, FunctionLibrary, FunctionSpec};
use crate::expr::{AggOp, Expr};

pub(crate) fn register(library: &mut FunctionLibrary) {
    library
        .register_generator("ISBLANK", |mut args| {
            exactly("ISBLANK", &args, 1)?;
            Ok(Expr::IsNull(Box::new(args.pop().expect("arity checked"))))
        })
        .expect("builtin");

    // Alias kept for rule sets written against the engine's older
    // text-rewriting path
    library
        .register("AVG", FunctionSpec::DirectReduce(AggOp::Mean))
        .expect("builtin");
}
