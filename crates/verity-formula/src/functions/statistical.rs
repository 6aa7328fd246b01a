//! Statistical functions

use super::{FunctionLibrary, FunctionSpec};
use crate::expr::AggOp;

pub(crate) fn register(library: &mut FunctionLibrary) {
    library
        .register("MEDIAN", FunctionSpec::DirectReduce(AggOp::Median))
        .expect("builtin");
    library
        .register("STDEV", FunctionSpec::DirectReduce(AggOp::Std))
        .expect("builtin");
    library
        .register("VAR", FunctionSpec::DirectReduce(AggOp::Var))
        .expect("builtin");
}
