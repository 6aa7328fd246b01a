//! Custom function registry
//!
//! Extends the engine at two levels: whole-table predicates consumed by
//! CustomFunction-kind rules, and per-row scalar callables installed into
//! the formula library. Providers are the stable plugin surface: a
//! provider enumerates named functions at startup; a failing provider
//! aborts only its own registration.

use std::collections::HashMap;
use std::sync::Arc;

use verity_core::{Record, Scalar, Table};
use verity_formula::{Expr, FormulaResult, FunctionLibrary, RowFn};

use crate::error::{EngineError, EngineResult};

/// Whole-table predicate: given the table and the target column, return
/// one pass/fail flag per row (true = pass)
pub type TablePredicate =
    Arc<dyn Fn(&Table, &str) -> EngineResult<Vec<bool>> + Send + Sync>;

/// A function exposed by a provider
pub enum ProvidedFunction {
    /// Usable by CustomFunction-kind rules
    Predicate(TablePredicate),
    /// Usable inside formulas; invoked once per row with the bundled
    /// argument record
    RowScalar(RowFn),
}

/// A loadable unit exposing zero or more named functions
pub trait FunctionProvider {
    /// Provider name, used in registration error messages
    fn name(&self) -> &str;

    /// Enumerate the functions this provider exposes
    fn functions(&self) -> EngineResult<Vec<(String, ProvidedFunction)>>;
}

/// Registry of externally supplied functions
#[derive(Default)]
pub struct CustomFunctionRegistry {
    predicates: HashMap<String, TablePredicate>,
    row_fns: HashMap<String, RowFn>,
}

impl CustomFunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a whole-table predicate under the given name
    pub fn register_predicate(
        &mut self,
        name: &str,
        predicate: TablePredicate,
    ) -> EngineResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(verity_formula::FormulaError::EmptyFunctionName.into());
        }
        self.predicates.insert(name.to_string(), predicate);
        Ok(())
    }

    /// Install a per-row scalar callable and expose it as a formula
    /// function in the given library
    pub fn register_row_fn(
        &mut self,
        name: &str,
        row_fn: RowFn,
        library: &mut FunctionLibrary,
    ) -> EngineResult<()> {
        let canonical = name.trim().to_uppercase();
        if canonical.is_empty() {
            return Err(verity_formula::FormulaError::EmptyFunctionName.into());
        }

        self.row_fns.insert(canonical.clone(), row_fn);

        let call_name = canonical.clone();
        library.register_generator(&canonical, move |args| {
            Ok(Expr::MapRow {
                function: call_name.clone(),
                args,
            })
        })?;
        Ok(())
    }

    /// Load every function a provider exposes. A failure reports the
    /// provider and leaves previously registered functions intact.
    pub fn load_provider(
        &mut self,
        provider: &dyn FunctionProvider,
        library: &mut FunctionLibrary,
    ) -> EngineResult<usize> {
        let functions = provider
            .functions()
            .map_err(|e| EngineError::Registration {
                provider: provider.name().to_string(),
                reason: e.to_string(),
            })?;

        let count = functions.len();
        for (name, function) in functions {
            match function {
                ProvidedFunction::Predicate(predicate) => {
                    self.register_predicate(&name, predicate)?;
                }
                ProvidedFunction::RowScalar(row_fn) => {
                    self.register_row_fn(&name, row_fn, library)?;
                }
            }
            log::info!("loaded custom function: {}", name);
        }

        Ok(count)
    }

    /// Exact-name lookup of a table predicate
    pub fn predicate(&self, name: &str) -> Option<&TablePredicate> {
        self.predicates.get(name.trim())
    }

    pub fn row_fns(&self) -> &HashMap<String, RowFn> {
        &self.row_fns
    }
}

/// Convenience constructor for per-row callables
pub fn row_scalar<F>(f: F) -> ProvidedFunction
where
    F: Fn(&Record) -> FormulaResult<Scalar> + Send + Sync + 'static,
{
    ProvidedFunction::RowScalar(Arc::new(f))
}

/// Convenience constructor for table predicates
pub fn table_predicate<F>(f: F) -> ProvidedFunction
where
    F: Fn(&Table, &str) -> EngineResult<Vec<bool>> + Send + Sync + 'static,
{
    ProvidedFunction::Predicate(Arc::new(f))
}
