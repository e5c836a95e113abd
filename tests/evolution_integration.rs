//! End-to-end evolution runs over small regression problems.
//!
//! These tests run complete evolutions on a single worker with fixed seeds
//! and check the run-level guarantees: the best fitness never drops, the
//! reported best genome reproduces its fitness, and runs replay exactly.
//!
//! Run with: cargo test --release evolution_integration

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::io::Write;

use tinygp::gp::{EvolutionConfig, Evaluator, Operator, RunStatus, evolve, evolve_with};
use tinygp::{DatFile, Dataset};

/// `x^2 + 2` sampled on 0..=10.
fn quadratic() -> Dataset {
    Dataset::from_fn((0..=10).map(f64::from), |x| x * x + 2.0).unwrap()
}

fn config(seed: u64) -> EvolutionConfig {
    EvolutionConfig {
        max_length: 300,
        population_size: 1000,
        depth: 5,
        generations: 12,
        constant_count: 30,
        seed: Some(seed),
        workers: Some(1),
        ..EvolutionConfig::default()
    }
}

fn same_value(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits()
}

#[test]
fn test_quadratic_run_is_monotonic() {
    let dataset = quadratic();
    let report = evolve(config(2024), &dataset).unwrap();

    assert!(!report.history.is_empty());
    assert!(report.history.len() <= 12);
    for (index, summary) in report.history.iter().enumerate() {
        assert_eq!(summary.generation, index);
        assert!(summary.average_size >= 1.0);
    }
    for pair in report.history.windows(2) {
        assert!(
            pair[1].best_fitness >= pair[0].best_fitness,
            "best fitness dropped from {} to {}",
            pair[0].best_fitness,
            pair[1].best_fitness
        );
    }
}

#[test]
fn test_status_matches_goal() {
    let dataset = quadratic();
    let config = config(7);
    let goal = config.goal_error;
    let budget = config.generations;
    let report = evolve(config, &dataset).unwrap();

    match report.status {
        RunStatus::Converged => assert!(report.best_fitness > -goal),
        RunStatus::NotSolved => {
            assert_eq!(report.history.len(), budget);
            assert!(report.best_fitness <= -goal);
        }
    }
}

#[test]
fn test_best_genome_reproduces_fitness() {
    let dataset = quadratic();
    let config = config(99);
    let (cutoffs, metric) = (config.cutoffs, config.metric);
    let report = evolve(config, &dataset).unwrap();

    assert!(report.best.is_well_formed(&report.symbols));
    assert!(report.best.len() <= 300);

    let mut evaluator = Evaluator::new(&report.symbols, &report.constants, &dataset, cutoffs, metric);
    let fitness = evaluator.fitness(&report.best).unwrap();
    assert!(same_value(fitness, report.best_fitness));

    let last = report.history.last().unwrap();
    assert!(same_value(last.best_fitness, report.best_fitness));
    assert_eq!(last.best_genome, report.best);
}

#[test]
fn test_fixed_seed_replays_exactly() {
    let dataset = quadratic();
    let first = evolve(config(31337), &dataset).unwrap();
    let second = evolve(config(31337), &dataset).unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.history, second.history);
    assert_eq!(first.best, second.best);
    assert_eq!(first.constants, second.constants);
}

#[test]
fn test_reporter_sees_every_generation() {
    let dataset = quadratic();
    let mut seen = Vec::new();
    let report = evolve_with(config(5), &dataset, |summary| seen.push(summary.generation)).unwrap();
    let expected: Vec<usize> = (0..report.history.len()).collect();
    assert_eq!(seen, expected);
}

#[test]
fn test_parallel_run_keeps_invariants() {
    let dataset = quadratic();
    let report = evolve(
        EvolutionConfig {
            workers: Some(4),
            ..config(11)
        },
        &dataset,
    )
    .unwrap();

    assert!(report.best.is_well_formed(&report.symbols));
    for summary in &report.history {
        assert!(summary.best_genome.is_well_formed(&report.symbols));
        assert!(summary.best_genome.len() <= 300);
    }
}

#[test]
fn test_dat_file_run() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    // variables, constants, min, max, cases
    writeln!(file, "2 10 -5 5 6").unwrap();
    for (x, y) in [(0.0_f64, 1.0_f64), (1.0, 2.0), (2.0, 0.5), (3.0, 3.0), (4.0, -1.0), (5.0, 2.5)] {
        writeln!(file, "{x} {y} {}", x + y).unwrap();
    }
    file.flush().unwrap();

    let dat = DatFile::load(file.path()).unwrap();
    assert_eq!(dat.header.variables, 2);
    assert_eq!(dat.dataset.len(), 6);

    let report = evolve(
        EvolutionConfig {
            constant_count: dat.header.constants,
            constant_range: dat.header.range,
            operators: vec![Operator::Add, Operator::Sub],
            population_size: 500,
            generations: 20,
            max_length: 100,
            seed: Some(8),
            workers: Some(1),
            ..EvolutionConfig::default()
        },
        &dat.dataset,
    )
    .unwrap();

    assert_eq!(report.symbols.variables(), 2);
    assert_eq!(report.constants.len(), 10);
    assert!(report.best.is_well_formed(&report.symbols));
}
