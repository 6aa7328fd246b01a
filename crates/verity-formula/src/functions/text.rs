//! Text functions

use super::{at_least, exactly, FunctionLibrary};
use crate::expr::{Expr, StrOp};

pub(crate) fn register(library: &mut FunctionLibrary) {
    // CONCAT stringifies every argument uniformly, so literals
    // interleaved with column references type-check the same way
    library
        .register_generator("CONCAT", |args| {
            at_least("CONCAT", &args, 1)?;
            Ok(Expr::ConcatStr(args))
        })
        .expect("builtin");

    register_str(library, "LEFT", StrOp::Left, 2);
    register_str(library, "RIGHT", StrOp::Right, 2);
    register_str(library, "MID", StrOp::Mid, 3);
    register_str(library, "LEN", StrOp::Len, 1);
    register_str(library, "TRIM", StrOp::Trim, 1);
    register_str(library, "UPPER", StrOp::Upper, 1);
    register_str(library, "LOWER", StrOp::Lower, 1);
    register_str(library, "SUBSTITUTE", StrOp::Substitute, 3);
}

fn register_str(library: &mut FunctionLibrary, name: &'static str, op: StrOp, arity: usize) {
    library
        .register_generator(name, move |args| {
            exactly(name, &args, arity)?;
            Ok(Expr::Str { op, args })
        })
        .expect("builtin");
}
