#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tinygp::gp::{Operator, SymbolTable, crossover, mutate, random_genome};

/// Structured input for crossover and mutation fuzzing.
#[derive(Arbitrary, Debug)]
struct OperatorInput {
    /// Generator seed.
    seed: u64,
    /// Length bound.
    max_len: u16,
    /// Depth bound for the parents.
    depth: u8,
    /// Number of constants.
    constants: u8,
    /// Mutation rate numerator over 255.
    rate: u8,
}

fuzz_target!(|input: OperatorInput| {
    let max_len = usize::from(input.max_len % 512).max(3);
    let depth = usize::from(input.depth % 10).max(1);
    let Ok(table) = SymbolTable::new(2, usize::from(input.constants).max(1), &Operator::ALL) else {
        return;
    };
    let mut rng = SmallRng::seed_from_u64(input.seed);

    let (Some(parent1), Some(parent2)) = (
        random_genome(max_len, depth, &table, &mut rng),
        random_genome(max_len, depth, &table, &mut rng),
    ) else {
        return;
    };

    let child = crossover(&parent1, &parent2, &table, max_len, &mut rng);
    assert!(child.is_well_formed(&table));
    assert!(child.len() <= max_len);

    let mutant = mutate(&child, &table, f64::from(input.rate) / 255.0, &mut rng);
    assert!(mutant.is_well_formed(&table));
    assert_eq!(mutant.len(), child.len());
});
