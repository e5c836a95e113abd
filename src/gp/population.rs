//! Shared steady-state population.
//!
//! Every slot pairs a genome with its fitness behind its own short-lived
//! lock, so a reader never sees a genome with another genome's fitness.
//! Workers read and replace slots concurrently without any wider
//! coordination: a selection may observe a slot before or after a
//! concurrent replacement.

use crate::gp::genome::Genome;
use crate::gp::selection::FitnessSource;
use parking_lot::RwLock;
use std::sync::Arc;

/// A genome with its fitness.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    /// The program. Shared so that readers copy a pointer, not the buffer.
    pub genome: Arc<Genome>,
    /// Negated total error; higher is better.
    pub fitness: f64,
}

impl Individual {
    /// Pair a genome with its fitness.
    #[must_use]
    pub fn new(genome: Genome, fitness: f64) -> Self {
        Self {
            genome: Arc::new(genome),
            fitness,
        }
    }
}

/// Fixed-size array of individuals with per-slot locking.
#[derive(Debug)]
pub struct Population {
    slots: Vec<RwLock<Individual>>,
}

impl Population {
    /// Build a population from its initial individuals.
    #[must_use]
    pub fn new(individuals: Vec<Individual>) -> Self {
        Self {
            slots: individuals.into_iter().map(RwLock::new).collect(),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the population has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Consistent copy of slot `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Individual> {
        self.slots.get(index).map(|slot| slot.read().clone())
    }

    /// Genome in slot `index`.
    #[must_use]
    pub fn genome(&self, index: usize) -> Option<Arc<Genome>> {
        self.slots.get(index).map(|slot| Arc::clone(&slot.read().genome))
    }

    /// Fitness of slot `index`.
    #[must_use]
    pub fn fitness(&self, index: usize) -> Option<f64> {
        self.slots.get(index).map(|slot| slot.read().fitness)
    }

    /// Install `individual` in slot `index`, returning the one it displaced.
    pub fn replace(&self, index: usize, individual: Individual) -> Option<Individual> {
        self.slots
            .get(index)
            .map(|slot| std::mem::replace(&mut *slot.write(), individual))
    }

    /// Copy of every slot, taken one slot at a time.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Individual> {
        self.slots.iter().map(|slot| slot.read().clone()).collect()
    }
}

impl FitnessSource for Population {
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn fitness_at(&self, index: usize) -> f64 {
        self.fitness(index).unwrap_or(f64::NEG_INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::selection::{negative_tournament, tournament};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rayon::prelude::*;

    fn population(fitness: &[f64]) -> Population {
        Population::new(
            fitness
                .iter()
                .enumerate()
                .map(|(i, &f)| Individual::new(Genome::from_codes(vec![u8::try_from(i).unwrap()]), f))
                .collect(),
        )
    }

    #[test]
    fn test_replace_and_read() {
        let population = population(&[-3.0, -2.0, -1.0]);
        let old = population
            .replace(1, Individual::new(Genome::from_codes(vec![9]), -0.5))
            .unwrap();
        assert_eq!(old.genome.codes(), &[1]);
        assert_eq!(population.genome(1).unwrap().codes(), &[9]);
        assert!((population.fitness(1).unwrap() + 0.5).abs() < f64::EPSILON);
        assert!(population.get(3).is_none());
        assert!(population.replace(3, Individual::new(Genome::default(), 0.0)).is_none());
    }

    #[test]
    fn test_selection_over_population() {
        let population = population(&[-3.0, -0.1, -9.0, -4.0]);
        let mut rng = SmallRng::seed_from_u64(42);
        assert_eq!(tournament(&population, 4, &mut rng), 1);
        assert_eq!(negative_tournament(&population, 4, &mut rng), 2);
    }

    #[test]
    fn test_concurrent_replacement_keeps_pairs() {
        let population = population(&[0.0; 64]);
        (0..10_000usize).into_par_iter().for_each(|i| {
            let slot = i % 64;
            let code = u8::try_from(i % 200).unwrap();
            population.replace(slot, Individual::new(Genome::from_codes(vec![code]), f64::from(code)));
            let seen = population.get((i * 7) % 64).unwrap();
            let code = seen.genome.codes()[0];
            assert!((seen.fitness - f64::from(code)).abs() < f64::EPSILON || seen.fitness.abs() < f64::EPSILON);
        });
        assert_eq!(population.snapshot().len(), 64);
    }
}
