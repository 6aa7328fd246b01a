//! Built-in formula functions
//!
//! Each function maps a canonical (upper-case) name to codegen behavior:
//! either a direct reduction method or a generator that builds a composite
//! expression from already-compiled argument expressions.

pub mod criteria;
pub mod date;
pub mod financial;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod statistical;
pub mod text;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::{FormulaError, FormulaResult};
use crate::expr::{AggOp, Expr};

/// Generator signature: consume compiled argument expressions, produce the
/// composite expression for the call
pub type GeneratorFn = Arc<dyn Fn(Vec<Expr>) -> FormulaResult<Expr> + Send + Sync>;

/// Codegen behavior for one function name
#[derive(Clone)]
pub enum FunctionSpec {
    /// Fold the arguments with `+` and apply the reduction method
    DirectReduce(AggOp),
    /// Build a composite expression from the argument list
    Generator(GeneratorFn),
}

impl fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionSpec::DirectReduce(op) => write!(f, "DirectReduce({:?})", op),
            FunctionSpec::Generator(_) => write!(f, "Generator(..)"),
        }
    }
}

/// Function names whose presence classifies a formula as an aggregate
static AGGREGATE_FUNCTIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "SUM", "AVERAGE", "AVG", "MIN", "MAX", "MEDIAN", "STDEV", "VAR", "COUNT", "COUNTIF",
        "SUMIF", "SUMPRODUCT",
    ]
    .into_iter()
    .collect()
});

/// Lookup functions whose join approximation warrants a soft warning
pub(crate) const APPROXIMATE_LOOKUPS: [&str; 2] = ["VLOOKUP", "HLOOKUP"];

/// Registry mapping canonical function names to codegen behavior
///
/// The registry is mutable before an evaluation pass begins: later
/// registrations overwrite earlier ones, which lets callers override
/// built-ins under the same name.
pub struct FunctionLibrary {
    functions: HashMap<String, FunctionSpec>,
}

impl FunctionLibrary {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Create a registry with all built-in functions
    pub fn with_builtins() -> Self {
        let mut library = Self::new();

        math::register(&mut library);
        statistical::register(&mut library);
        logical::register(&mut library);
        text::register(&mut library);
        date::register(&mut library);
        criteria::register(&mut library);
        lookup::register(&mut library);
        financial::register(&mut library);
        info::register(&mut library);

        library
    }

    /// Look up a function by name (case-insensitive)
    pub fn lookup(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(&name.trim().to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Install or override a function. Names are canonicalized to
    /// upper-case; empty names are rejected.
    pub fn register(&mut self, name: &str, spec: FunctionSpec) -> FormulaResult<()> {
        let canonical = name.trim().to_uppercase();
        if canonical.is_empty() {
            return Err(FormulaError::EmptyFunctionName);
        }
        self.functions.insert(canonical, spec);
        Ok(())
    }

    /// Install or override a generator closure
    pub fn register_generator<F>(&mut self, name: &str, generator: F) -> FormulaResult<()>
    where
        F: Fn(Vec<Expr>) -> FormulaResult<Expr> + Send + Sync + 'static,
    {
        self.register(name, FunctionSpec::Generator(Arc::new(generator)))
    }

    /// Whether a built-in name denotes an aggregate reduction
    pub fn is_aggregate(name: &str) -> bool {
        AGGREGATE_FUNCTIONS.contains(name.trim().to_uppercase().as_str())
    }
}

impl Default for FunctionLibrary {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// === Argument checking helpers shared by the category modules ===

pub(crate) fn exactly(function: &str, args: &[Expr], n: usize) -> FormulaResult<()> {
    if args.len() != n {
        return Err(FormulaError::ArgumentCount {
            function: function.to_string(),
            expected: n.to_string(),
            actual: args.len(),
        });
    }
    Ok(())
}

pub(crate) fn at_least(function: &str, args: &[Expr], n: usize) -> FormulaResult<()> {
    if args.len() < n {
        return Err(FormulaError::ArgumentCount {
            function: function.to_string(),
            expected: format!("at least {}", n),
            actual: args.len(),
        });
    }
    Ok(())
}

pub(crate) fn between(function: &str, args: &[Expr], min: usize, max: usize) -> FormulaResult<()> {
    if args.len() < min || args.len() > max {
        return Err(FormulaError::ArgumentCount {
            function: function.to_string(),
            expected: format!("{} to {}", min, max),
            actual: args.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_core::Scalar;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let library = FunctionLibrary::with_builtins();
        assert!(library.contains("sum"));
        assert!(library.contains("Sum"));
        assert!(library.contains(" SUM "));
        assert!(!library.contains("NO_SUCH_FN"));
    }

    #[test]
    fn test_register_rejects_empty_name() {
        let mut library = FunctionLibrary::new();
        let err = library
            .register_generator("  ", |_| Ok(Expr::Literal(Scalar::Null)))
            .unwrap_err();
        assert!(matches!(err, FormulaError::EmptyFunctionName));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut library = FunctionLibrary::with_builtins();
        library
            .register_generator("SUM", |_| Ok(Expr::Literal(Scalar::Int(7))))
            .unwrap();
        match library.lookup("SUM") {
            Some(FunctionSpec::Generator(f)) => {
                assert_eq!(f(vec![]).unwrap(), Expr::Literal(Scalar::Int(7)));
            }
            other => panic!("Expected Generator, got {:?}", other),
        }
    }

    #[test]
    fn test_aggregate_name_set() {
        assert!(FunctionLibrary::is_aggregate("sum"));
        assert!(FunctionLibrary::is_aggregate("SUMPRODUCT"));
        assert!(FunctionLibrary::is_aggregate("AVG"));
        assert!(!FunctionLibrary::is_aggregate("UPPER"));
        assert!(!FunctionLibrary::is_aggregate("IRR"));
    }
}
