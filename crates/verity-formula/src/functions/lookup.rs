//! Lookup functions
//!
//! VLOOKUP and HLOOKUP are approximated as first-match equality joins
//! against columns of the same table; the compiler records an
//! `ApproximateLookup` warning for every use.

use super::{exactly, FunctionLibrary};
use crate::error::{FormulaError, FormulaResult};
use crate::expr::Expr;

pub(crate) fn register(library: &mut FunctionLibrary) {
    register_lookup(library, "VLOOKUP");
    register_lookup(library, "HLOOKUP");
}

fn register_lookup(library: &mut FunctionLibrary, name: &'static str) {
    library
        .register_generator(name, move |mut args| {
            exactly(name, &args, 3)?;
            let result_column = column_name(name, args.pop().expect("arity checked"))?;
            let key_column = column_name(name, args.pop().expect("arity checked"))?;
            let value = args.pop().expect("arity checked");
            Ok(Expr::Lookup {
                value: Box::new(value),
                key_column,
                result_column,
            })
        })
        .expect("builtin");
}

fn column_name(function: &str, arg: Expr) -> FormulaResult<String> {
    match arg {
        Expr::Column(name) => Ok(name),
        other => Err(FormulaError::Argument(format!(
            "{} expects column references for its range arguments, got {:?}",
            function, other
        ))),
    }
}
