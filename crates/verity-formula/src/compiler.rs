//! Expression compiler
//!
//! Lowers a formula's parse tree into one [`CompiledExpr`] with a single
//! explicit post-order walk: children are visited before parents, each
//! node exit pops its operands from an evaluation stack and pushes the
//! synthesized expression. A finished compile must leave exactly one
//! expression on the stack; any other depth is a compiler defect.

use std::collections::BTreeSet;

use verity_core::Scalar;

use crate::ast::{AddOp, CompareOp, LiteralValue, LogicalOp, MultOp, ParseNode};
use crate::error::{FormulaError, FormulaResult};
use crate::expr::{BinaryOp, CompiledExpr, Expr, ExprKind, SoftWarning};
use crate::functions::{FunctionLibrary, FunctionSpec, APPROXIMATE_LOOKUPS};
use crate::parser::parse_formula;

/// Compiles formulas against a function library
pub struct Compiler<'a> {
    library: &'a FunctionLibrary,
}

impl<'a> Compiler<'a> {
    pub fn new(library: &'a FunctionLibrary) -> Self {
        Self { library }
    }

    /// Parse and compile a formula string
    pub fn compile(&self, formula: &str) -> FormulaResult<CompiledExpr> {
        let tree = parse_formula(formula)?;
        self.compile_tree(&tree)
    }

    /// Compile an already-parsed tree
    pub fn compile_tree(&self, tree: &ParseNode) -> FormulaResult<CompiledExpr> {
        let mut walk = Walk {
            library: self.library,
            stack: Vec::new(),
            columns: BTreeSet::new(),
            aggregate: false,
            warnings: Vec::new(),
        };

        walk.run(tree)?;

        if walk.stack.len() != 1 {
            return Err(FormulaError::Internal(format!(
                "expression stack holds {} entries after compilation, expected 1",
                walk.stack.len()
            )));
        }
        let expr = walk.stack.pop().expect("stack depth checked");

        Ok(CompiledExpr {
            expr,
            kind: if walk.aggregate {
                ExprKind::Aggregate
            } else {
                ExprKind::RowWise
            },
            columns: walk.columns.into_iter().collect(),
            warnings: walk.warnings,
        })
    }
}

enum Step<'t> {
    Enter(&'t ParseNode),
    Exit(&'t ParseNode),
}

struct Walk<'a> {
    library: &'a FunctionLibrary,
    stack: Vec<Expr>,
    columns: BTreeSet<String>,
    aggregate: bool,
    warnings: Vec<SoftWarning>,
}

impl Walk<'_> {
    fn run(&mut self, root: &ParseNode) -> FormulaResult<()> {
        let mut work = vec![Step::Enter(root)];

        while let Some(step) = work.pop() {
            match step {
                Step::Enter(node) => {
                    work.push(Step::Exit(node));
                    // Children pushed in reverse so they are entered in
                    // source order
                    for child in node.children().into_iter().rev() {
                        work.push(Step::Enter(child));
                    }
                }
                Step::Exit(node) => self.leave(node)?,
            }
        }

        Ok(())
    }

    fn leave(&mut self, node: &ParseNode) -> FormulaResult<()> {
        match node {
            ParseNode::Formula { .. } => {}

            ParseNode::Literal { value } => {
                self.stack.push(Expr::Literal(literal_scalar(value)));
            }

            ParseNode::ColumnRef { name } => {
                // Existence is checked by the classifier, not here
                self.columns.insert(name.clone());
                self.stack.push(Expr::Column(name.clone()));
            }

            ParseNode::Negate { .. } => {
                let operand = self.pop()?;
                self.stack.push(Expr::Neg(Box::new(operand)));
            }

            ParseNode::Logical { op, .. } => {
                let mapped = match op {
                    LogicalOp::And => BinaryOp::And,
                    LogicalOp::Or => BinaryOp::Or,
                };
                self.push_binary(mapped)?;
            }

            ParseNode::Compare { op, .. } => {
                let mapped = match op {
                    CompareOp::Eq => BinaryOp::Eq,
                    CompareOp::Ne => BinaryOp::Ne,
                    CompareOp::Lt => BinaryOp::Lt,
                    CompareOp::Le => BinaryOp::Le,
                    CompareOp::Gt => BinaryOp::Gt,
                    CompareOp::Ge => BinaryOp::Ge,
                };
                self.push_binary(mapped)?;
            }

            ParseNode::Add { op, .. } => {
                let mapped = match op {
                    AddOp::Add => BinaryOp::Add,
                    AddOp::Sub => BinaryOp::Sub,
                };
                self.push_binary(mapped)?;
            }

            ParseNode::Mult { op, .. } => {
                let mapped = match op {
                    MultOp::Mul => BinaryOp::Mul,
                    MultOp::Div => BinaryOp::Div,
                    MultOp::Pow => BinaryOp::Pow,
                };
                self.push_binary(mapped)?;
            }

            ParseNode::Membership { items, .. } => {
                let mut popped = Vec::with_capacity(items.len());
                for _ in 0..items.len() {
                    popped.push(self.pop()?);
                }
                popped.reverse();
                let value = self.pop()?;
                self.stack.push(Expr::IsIn {
                    value: Box::new(value),
                    items: popped,
                });
            }

            ParseNode::FunctionCall { name, args } => {
                // Arguments were pushed left-to-right; pop in reverse and
                // restore source order
                let mut popped = Vec::with_capacity(args.len());
                for _ in 0..args.len() {
                    popped.push(self.pop()?);
                }
                popped.reverse();

                self.push_call(name, popped)?;
            }
        }

        Ok(())
    }

    fn push_call(&mut self, name: &str, args: Vec<Expr>) -> FormulaResult<()> {
        let canonical = name.trim().to_uppercase();

        if FunctionLibrary::is_aggregate(&canonical) {
            self.aggregate = true;
        }

        let expr = match self.library.lookup(&canonical) {
            Some(FunctionSpec::DirectReduce(op)) => {
                if args.is_empty() {
                    return Err(FormulaError::ArgumentCount {
                        function: canonical,
                        expected: "at least 1".to_string(),
                        actual: 0,
                    });
                }
                let folded = crate::functions::math::fold_binary(BinaryOp::Add, args);
                Expr::Agg {
                    op: *op,
                    input: Box::new(folded),
                }
            }
            Some(FunctionSpec::Generator(generator)) => {
                if APPROXIMATE_LOOKUPS.contains(&canonical.as_str()) {
                    let warning = SoftWarning::ApproximateLookup(canonical.clone());
                    log::warn!("{}", warning);
                    self.warnings.push(warning);
                }
                generator(args)?
            }
            None => {
                // Unregistered names never abort the pipeline: emit a
                // pass-through call and keep compiling
                let warning = SoftWarning::UnsupportedFunction(canonical.clone());
                log::warn!("{}", warning);
                self.warnings.push(warning);
                Expr::RawCall {
                    name: canonical,
                    args,
                }
            }
        };

        self.stack.push(expr);
        Ok(())
    }

    fn push_binary(&mut self, op: BinaryOp) -> FormulaResult<()> {
        // Right was pushed last
        let right = self.pop()?;
        let left = self.pop()?;
        self.stack.push(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        });
        Ok(())
    }

    fn pop(&mut self) -> FormulaResult<Expr> {
        self.stack
            .pop()
            .ok_or_else(|| FormulaError::Internal("expression stack underflow".into()))
    }
}

fn literal_scalar(value: &LiteralValue) -> Scalar {
    match value {
        LiteralValue::Int(n) => Scalar::Int(*n),
        LiteralValue::Float(n) => Scalar::Float(*n),
        LiteralValue::Text(s) => Scalar::Str(s.clone()),
        LiteralValue::Bool(b) => Scalar::Bool(*b),
        LiteralValue::Date(d) => Scalar::Date(*d),
    }
}
