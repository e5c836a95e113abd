//! Fitness evaluation against a dataset.
//!
//! Fitness is the negated total error over every fitness case, so higher is
//! better and an exact fit scores 0. Each evaluation compacts the genome once
//! and then runs the interpreter per row.

use crate::dataset::Dataset;
use crate::gp::compact::Program;
use crate::gp::genome::Genome;
use crate::gp::interpreter::{EvalError, Interpreter};
use crate::gp::symbol::{ConstantPool, Cutoffs, SymbolTable};
use serde::{Deserialize, Serialize};

/// Per-case error measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMetric {
    /// Absolute error `|p - t|`.
    #[default]
    Mae,
    /// Squared error `(p - t)^2`.
    Mse,
}

impl ErrorMetric {
    /// Error of one prediction.
    #[inline]
    #[must_use]
    pub fn error(self, predicted: f64, target: f64) -> f64 {
        let diff = predicted - target;
        match self {
            Self::Mae => diff.abs(),
            Self::Mse => diff * diff,
        }
    }
}

/// Evaluates genomes against one dataset, reusing its scratch buffers.
///
/// Not shared between threads; each worker builds its own.
#[derive(Debug)]
pub struct Evaluator<'a> {
    table: &'a SymbolTable,
    pool: &'a ConstantPool,
    dataset: &'a Dataset,
    cutoffs: Cutoffs,
    metric: ErrorMetric,
    program: Program,
    interpreter: Interpreter,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator.
    #[must_use]
    pub fn new(
        table: &'a SymbolTable,
        pool: &'a ConstantPool,
        dataset: &'a Dataset,
        cutoffs: Cutoffs,
        metric: ErrorMetric,
    ) -> Self {
        Self {
            table,
            pool,
            dataset,
            cutoffs,
            metric,
            program: Program::default(),
            interpreter: Interpreter::new(),
        }
    }

    /// Fitness of `genome`: the negated sum of per-case errors.
    ///
    /// A NaN total is reported as negative infinity so that every fitness
    /// value stays comparable.
    ///
    /// # Errors
    ///
    /// Returns an error if the genome is malformed.
    pub fn fitness(&mut self, genome: &Genome) -> Result<f64, EvalError> {
        self.program.compact_from(genome, self.table, self.pool, self.cutoffs)?;

        let total = if let Some(value) = self.program.as_constant() {
            self.dataset.rows().map(|(_, target)| self.metric.error(value, target)).sum()
        } else {
            let mut total = 0.0;
            for (inputs, target) in self.dataset.rows() {
                let predicted = self.interpreter.run(&self.program, inputs, self.table, self.cutoffs)?;
                total += self.metric.error(predicted, target);
            }
            total
        };

        Ok(if total.is_nan() { f64::NEG_INFINITY } else { -total })
    }

    /// Output of `genome` for one input vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the genome is malformed or `inputs` is too short.
    pub fn predict(&mut self, genome: &Genome, inputs: &[f64]) -> Result<f64, EvalError> {
        self.program.compact_from(genome, self.table, self.pool, self.cutoffs)?;
        self.interpreter.run(&self.program, inputs, self.table, self.cutoffs)
    }
}
