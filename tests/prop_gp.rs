//! Property-based tests for the genome operators and evaluation.
//!
//! Run with: cargo test --release prop_gp

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use tinygp::gp::{
    ConstantPool, ConstantRange, Cutoffs, Genome, Interpreter, Operator, Program, SymbolTable, crossover,
    evaluate_tree, mutate, random_genome, splice, subtree_at, tournament,
};

fn operator_subset() -> impl Strategy<Value = Vec<Operator>> {
    (proptest::sample::subsequence(Operator::ALL.to_vec(), 0..=7), 0usize..4).prop_map(|(mut ops, binary)| {
        // At least one 2-ary operator is required
        ops.push(Operator::ALL[binary]);
        ops
    })
}

fn setup(variables: usize, constants: usize, operators: &[Operator], seed: u64) -> (SymbolTable, ConstantPool, SmallRng) {
    let table = SymbolTable::new(variables, constants, operators).unwrap();
    let mut rng = SmallRng::seed_from_u64(seed);
    let pool = ConstantPool::sample(&mut rng, constants, ConstantRange { min: -5.0, max: 5.0 });
    (table, pool, rng)
}

fn same_value(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Generated genomes are well formed and respect both bounds.
    #[test]
    fn prop_generator_bounds(
        variables in 0usize..4,
        constants in 1usize..50,
        operators in operator_subset(),
        max_len in 3usize..200,
        depth in 1usize..8,
        seed in any::<u64>()
    ) {
        let (table, _, mut rng) = setup(variables, constants, &operators, seed);
        let genome = random_genome(max_len, depth, &table, &mut rng).unwrap();
        prop_assert!(genome.is_well_formed(&table));
        prop_assert!(genome.len() <= max_len);
        prop_assert!(genome.depth(&table).unwrap() <= depth);
    }

    /// Constant folding never changes the value of a program.
    #[test]
    fn prop_folding_preserves_value(
        operators in operator_subset(),
        seed in any::<u64>(),
        x in -50.0f64..50.0,
        y in -50.0f64..50.0
    ) {
        let (table, pool, mut rng) = setup(2, 8, &operators, seed);
        let cutoffs = Cutoffs::default();
        let mut interpreter = Interpreter::new();
        for _ in 0..8 {
            let genome = random_genome(120, 6, &table, &mut rng).unwrap();
            let program = Program::compact(&genome, &table, &pool, cutoffs).unwrap();
            prop_assert!(program.len() <= genome.len());
            let folded = interpreter.run(&program, &[x, y], &table, cutoffs).unwrap();
            let direct = evaluate_tree(&genome, &[x, y], &table, &pool, cutoffs).unwrap();
            prop_assert!(same_value(folded, direct), "{folded} != {direct} for {:?}", genome.codes());
        }
    }

    /// Mutation keeps genomes well formed and of the same length.
    #[test]
    fn prop_mutation_well_formed(
        operators in operator_subset(),
        rate in 0.0f64..=1.0,
        seed in any::<u64>()
    ) {
        let (table, _, mut rng) = setup(2, 10, &operators, seed);
        let genome = random_genome(100, 6, &table, &mut rng).unwrap();
        let mutant = mutate(&genome, &table, rate, &mut rng);
        prop_assert!(mutant.is_well_formed(&table));
        prop_assert_eq!(mutant.len(), genome.len());
    }

    /// Splicing two subtrees yields a well-formed genome of the predicted length.
    #[test]
    fn prop_splice_length(
        operators in operator_subset(),
        seed in any::<u64>(),
        pick1 in any::<usize>(),
        pick2 in any::<usize>()
    ) {
        let (table, _, mut rng) = setup(1, 10, &operators, seed);
        let parent1 = random_genome(80, 6, &table, &mut rng).unwrap();
        let parent2 = random_genome(80, 6, &table, &mut rng).unwrap();
        let start1 = pick1 % parent1.len();
        let start2 = pick2 % parent2.len();

        let target = subtree_at(parent1.codes(), start1, &table).unwrap();
        let donated = subtree_at(parent2.codes(), start2, &table).unwrap();
        let child = splice(parent1.codes(), target.clone(), parent2.codes(), donated.clone());

        prop_assert!(child.is_well_formed(&table));
        prop_assert_eq!(
            child.len(),
            target.start + (donated.end - donated.start) + (parent1.len() - target.end)
        );
    }

    /// Random crossover respects the length bound and well-formedness.
    #[test]
    fn prop_crossover_bounded(
        operators in operator_subset(),
        seed in any::<u64>(),
        max_len in 3usize..60
    ) {
        let (table, _, mut rng) = setup(1, 10, &operators, seed);
        let parent1 = random_genome(max_len, 5, &table, &mut rng).unwrap();
        let parent2 = random_genome(max_len, 5, &table, &mut rng).unwrap();
        let child: Genome = crossover(&parent1, &parent2, &table, max_len, &mut rng);
        prop_assert!(child.is_well_formed(&table));
        prop_assert!(child.len() <= max_len);
    }

    /// Protected division by zero returns the numerator.
    #[test]
    fn prop_division_by_zero_is_identity(x in -1e6f64..1e6) {
        let value = Operator::Div.apply_binary(x, 0.0, Cutoffs::default());
        prop_assert!(same_value(value, x));
    }

    /// EXP passes large arguments through unchanged.
    #[test]
    fn prop_exponent_guard(x in 100.0001f64..1e9) {
        prop_assert!(same_value(Operator::Exp.apply_unary(x, Cutoffs::default()), x));
    }

    /// A strictly dominant individual always wins a full tournament.
    #[test]
    fn prop_dominant_wins_full_tournament(
        mut fitness in proptest::collection::vec(-1e6f64..0.0, 1..64),
        pick in any::<usize>(),
        seed in any::<u64>()
    ) {
        let best = pick % fitness.len();
        fitness[best] = 1.0;
        let mut rng = SmallRng::seed_from_u64(seed);
        prop_assert_eq!(tournament(&fitness, fitness.len(), &mut rng), best);
    }
}
