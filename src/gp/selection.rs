//! Tournament selection.
//!
//! A tournament draws `k` distinct individuals and keeps the best of them
//! (or, for the negative variant, the worst). When `k` is at least the size
//! of the pool every individual competes. Ties go to the first contestant
//! drawn.

use rand::Rng;
use rand::seq::index;
use std::ops::Range;

/// Index-addressed read access to fitness values.
pub trait FitnessSource {
    /// Number of individuals.
    fn len(&self) -> usize;

    /// Fitness of the individual at `index`.
    fn fitness_at(&self, index: usize) -> f64;

    /// Whether there are no individuals.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FitnessSource for [f64] {
    fn len(&self) -> usize {
        <[f64]>::len(self)
    }

    fn fitness_at(&self, index: usize) -> f64 {
        self[index]
    }
}

impl FitnessSource for Vec<f64> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn fitness_at(&self, index: usize) -> f64 {
        self[index]
    }
}

/// Index of the fittest of `k` randomly drawn individuals.
///
/// Returns 0 for an empty source.
#[must_use]
pub fn tournament<S, R>(source: &S, k: usize, rng: &mut R) -> usize
where
    S: FitnessSource + ?Sized,
    R: Rng,
{
    contest(source, 0..source.len(), k, rng, |candidate, best| candidate > best)
}

/// Index of the least fit of `k` randomly drawn individuals: the slot a new
/// offspring replaces.
///
/// Returns 0 for an empty source.
#[must_use]
pub fn negative_tournament<S, R>(source: &S, k: usize, rng: &mut R) -> usize
where
    S: FitnessSource + ?Sized,
    R: Rng,
{
    negative_tournament_in(source, 0..source.len(), k, rng)
}

/// [`negative_tournament`] restricted to the slots in `range`.
///
/// Returns `range.start` when the range is empty.
#[must_use]
pub fn negative_tournament_in<S, R>(source: &S, range: Range<usize>, k: usize, rng: &mut R) -> usize
where
    S: FitnessSource + ?Sized,
    R: Rng,
{
    contest(source, range, k, rng, |candidate, worst| candidate < worst)
}

fn contest<S, R>(source: &S, range: Range<usize>, k: usize, rng: &mut R, wins: impl Fn(f64, f64) -> bool) -> usize
where
    S: FitnessSource + ?Sized,
    R: Rng,
{
    let size = range.len();
    if size == 0 {
        return range.start;
    }

    let k = k.clamp(1, size);
    let mut winner = None;
    for offset in index::sample(rng, size, k).iter() {
        let candidate = range.start + offset;
        let fitness = source.fitness_at(candidate);
        match winner {
            Some((_, held)) if !wins(fitness, held) => {}
            _ => winner = Some((candidate, fitness)),
        }
    }
    winner.map_or(range.start, |(index, _)| index)
}
