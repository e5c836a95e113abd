//! Per-generation summary records.

// Population sizes are far below 2^52
#![allow(clippy::cast_precision_loss)]

use crate::gp::genome::Genome;
use crate::gp::population::Individual;
use serde::{Deserialize, Serialize};

/// Statistics of the population at the end of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// Generation index; 0 is the initial population.
    pub generation: usize,
    /// Mean fitness.
    pub average_fitness: f64,
    /// Highest fitness.
    pub best_fitness: f64,
    /// Mean genome length.
    pub average_size: f64,
    /// Copy of the fittest genome. The first in slot order wins ties.
    pub best_genome: Genome,
}

/// Summarise a population snapshot, or `None` if it is empty.
#[must_use]
pub fn summarize(generation: usize, individuals: &[Individual]) -> Option<GenerationSummary> {
    let mut best = individuals.first()?;
    let mut fitness_sum = 0.0;
    let mut size_sum = 0usize;
    for individual in individuals {
        if individual.fitness > best.fitness {
            best = individual;
        }
        fitness_sum += individual.fitness;
        size_sum += individual.genome.len();
    }

    let count = individuals.len() as f64;
    Some(GenerationSummary {
        generation,
        average_fitness: fitness_sum / count,
        best_fitness: best.fitness,
        average_size: size_sum as f64 / count,
        best_genome: Genome::clone(&best.genome),
    })
}
