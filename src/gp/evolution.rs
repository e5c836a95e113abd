//! Steady-state evolution loop.
//!
//! The [`Engine`] owns one run: it lays out the symbol codes, samples the
//! constant pool, seeds and evaluates the initial population, then advances
//! one generation per [`Engine::step`]. A generation produces one offspring
//! per population slot. The offspring budget is split into contiguous ranges,
//! one per worker; every offspring is evaluated and written over the loser
//! of a negative tournament as soon as it exists, so later selections in the
//! same generation already see it.
//!
//! ```text
//! Initializing ─► Evaluating(0) ─┬─► Converged
//!                                └─► Evolving(g) ─► Evaluating(g+1) ─┬─► Converged
//!                                                                    ├─► NotSolved (budget spent)
//!                                                                    └─► Evolving(g+1) ...
//! ```
//!
//! Workers only meet at the end of a generation. Under
//! [`ReplacementPolicy::Shared`] a worker may overwrite any slot, including
//! one another worker is reading; each slot is swapped atomically so a
//! reader sees either the old or the new individual, never a mix.

use crate::dataset::Dataset;
use crate::error::{EvolutionError, SetupError};
use crate::gp::crossover::crossover;
use crate::gp::fitness::{ErrorMetric, Evaluator};
use crate::gp::generator::random_genome;
use crate::gp::genome::Genome;
use crate::gp::interpreter::EvalError;
use crate::gp::mutation::mutate;
use crate::gp::population::{Individual, Population};
use crate::gp::selection::{negative_tournament, negative_tournament_in, tournament};
use crate::gp::stats::{GenerationSummary, summarize};
use crate::gp::symbol::{ConstantPool, ConstantRange, Cutoffs, Operator, SymbolTable};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info};

/// Which slots a worker may overwrite with its offspring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementPolicy {
    /// Negative tournaments span the whole population; workers may race on
    /// the same slot.
    #[default]
    Shared,
    /// Each worker only replaces slots inside its own production range.
    /// Parents are still drawn from the whole population.
    Partitioned,
}

/// Parameters of one run. All of them are fixed at setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvolutionConfig {
    /// Longest genome the generator and crossover may produce.
    pub max_length: usize,
    /// Number of individuals.
    pub population_size: usize,
    /// Depth bound for initial trees.
    pub depth: usize,
    /// Number of generation summaries to record, the initial population
    /// included, before giving up.
    pub generations: usize,
    /// Individuals per tournament.
    pub tournament_size: usize,
    /// Sampling range of the ephemeral constants.
    pub constant_range: ConstantRange,
    /// Number of ephemeral constants.
    pub constant_count: usize,
    /// Per-symbol mutation probability.
    pub mutation_rate: f64,
    /// Probability that an offspring comes from crossover rather than mutation.
    pub crossover_rate: f64,
    /// The run converges once the best total error drops below this value.
    pub goal_error: f64,
    /// Numeric guards for `DIV` and `EXP`.
    pub cutoffs: Cutoffs,
    /// Operators available to evolved expressions.
    pub operators: Vec<Operator>,
    /// Per-case error measure.
    pub metric: ErrorMetric,
    /// Master seed; drawn from entropy when absent.
    pub seed: Option<u64>,
    /// Worker threads; the hardware parallelism when absent.
    pub workers: Option<usize>,
    /// Replacement scope of each worker.
    pub replacement: ReplacementPolicy,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            max_length: 10_000,
            population_size: 100_000,
            depth: 5,
            generations: 100,
            tournament_size: 2,
            constant_range: ConstantRange::default(),
            constant_count: 100,
            mutation_rate: 0.05,
            crossover_rate: 0.9,
            goal_error: 1e-5,
            cutoffs: Cutoffs::default(),
            operators: vec![Operator::Add, Operator::Sub, Operator::Mul, Operator::Div],
            metric: ErrorMetric::Mae,
            seed: None,
            workers: None,
            replacement: ReplacementPolicy::Shared,
        }
    }
}

impl EvolutionConfig {
    /// Check every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), SetupError> {
        at_least("population_size", self.population_size, 1)?;
        at_least("max_length", self.max_length, 3)?;
        at_least("depth", self.depth, 1)?;
        at_least("generations", self.generations, 1)?;
        at_least("tournament_size", self.tournament_size, 1)?;
        at_least("constant_count", self.constant_count, 1)?;
        probability("mutation_rate", self.mutation_rate)?;
        probability("crossover_rate", self.crossover_rate)?;

        let ConstantRange { min, max } = self.constant_range;
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(SetupError::invalid(
                "constant_range",
                format!("[{min}, {max}] is not a finite range"),
            ));
        }
        if self.workers == Some(0) {
            return Err(SetupError::invalid("workers", "must be at least 1"));
        }
        if self.goal_error.is_nan() || self.goal_error < 0.0 {
            return Err(SetupError::invalid("goal_error", "must be non-negative"));
        }
        positive("cutoffs.division", self.cutoffs.division)?;
        positive("cutoffs.exponent", self.cutoffs.exponent)?;
        Ok(())
    }

    /// Number of worker threads this configuration asks for.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, NonZeroUsize::get))
    }
}

fn at_least(field: &'static str, value: usize, min: usize) -> Result<(), SetupError> {
    if value < min {
        return Err(SetupError::invalid(field, format!("must be at least {min}, got {value}")));
    }
    Ok(())
}

fn probability(field: &'static str, value: f64) -> Result<(), SetupError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SetupError::invalid(field, format!("must lie in [0, 1], got {value}")));
    }
    Ok(())
}

fn positive(field: &'static str, value: f64) -> Result<(), SetupError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SetupError::invalid(field, format!("must be positive and finite, got {value}")));
    }
    Ok(())
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The best individual met the error goal.
    Converged,
    /// The generation budget ran out first.
    NotSolved,
}

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct EvolutionReport {
    /// Terminal state.
    pub status: RunStatus,
    /// One summary per generation, the initial population first.
    pub history: Vec<GenerationSummary>,
    /// Fittest genome of the final population.
    pub best: Genome,
    /// Its fitness.
    pub best_fitness: f64,
    /// The constant pool the genomes refer to.
    pub constants: ConstantPool,
    /// The code layout the genomes use.
    pub symbols: SymbolTable,
    /// Master seed of the run.
    pub seed: u64,
}

/// One evolution run over a borrowed dataset.
#[derive(Debug)]
pub struct Engine<'d> {
    config: EvolutionConfig,
    dataset: &'d Dataset,
    table: SymbolTable,
    constants: ConstantPool,
    population: Population,
    threads: rayon::ThreadPool,
    rng: SmallRng,
    seed: u64,
    history: Vec<GenerationSummary>,
    status: Option<RunStatus>,
}

impl<'d> Engine<'d> {
    /// Set up a run and evaluate the initial population, recording
    /// generation 0.
    ///
    /// # Errors
    ///
    /// Returns a setup error for an invalid configuration or a layout that
    /// does not fit the code space, and an evaluation error if an initial
    /// genome cannot be evaluated.
    pub fn new(config: EvolutionConfig, dataset: &'d Dataset) -> Result<Self, EvolutionError> {
        config.validate()?;
        let table = SymbolTable::new(dataset.variables(), config.constant_count, &config.operators)?;
        let threads = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_count())
            .thread_name(|i| format!("gp-worker-{i}"))
            .build()?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = SmallRng::seed_from_u64(seed);
        let constants = ConstantPool::sample(&mut rng, config.constant_count, config.constant_range);

        info!(
            seed,
            population = config.population_size,
            workers = threads.current_num_threads(),
            variables = dataset.variables(),
            cases = dataset.len(),
            operators = table.operators().len(),
            "starting evolution"
        );

        let genomes: Vec<Genome> = (0..config.population_size)
            .map(|_| random_genome(config.max_length, config.depth, &table, &mut rng))
            .collect::<Option<_>>()
            .ok_or_else(|| {
                SetupError::invalid(
                    "max_length",
                    format!("no tree of depth {} fits in {} symbols", config.depth, config.max_length),
                )
            })?;
        let fitness = threads.install(|| {
            genomes
                .par_iter()
                .map_init(
                    || Evaluator::new(&table, &constants, dataset, config.cutoffs, config.metric),
                    |evaluator, genome| evaluator.fitness(genome),
                )
                .collect::<Result<Vec<f64>, EvalError>>()
        })?;
        let population = Population::new(
            genomes
                .into_iter()
                .zip(fitness)
                .map(|(genome, fitness)| Individual::new(genome, fitness))
                .collect(),
        );

        let mut engine = Self {
            config,
            dataset,
            table,
            constants,
            population,
            threads,
            rng,
            seed,
            history: Vec::new(),
            status: None,
        };
        engine.record();
        Ok(engine)
    }

    /// Run one generation and return its summary, or `None` once the run
    /// has ended.
    ///
    /// # Errors
    ///
    /// Returns an error if an offspring cannot be evaluated.
    pub fn step(&mut self) -> Result<Option<&GenerationSummary>, EvolutionError> {
        if self.status.is_some() {
            return Ok(None);
        }
        self.breed()?;
        self.record();
        Ok(self.history.last())
    }

    /// Run to completion, handing every summary (including any already
    /// recorded) to `reporter`.
    ///
    /// # Errors
    ///
    /// Returns an error if an offspring cannot be evaluated.
    pub fn run(mut self, mut reporter: impl FnMut(&GenerationSummary)) -> Result<EvolutionReport, EvolutionError> {
        for summary in &self.history {
            reporter(summary);
        }
        while let Some(summary) = self.step()? {
            reporter(summary);
        }

        let status = self.status.unwrap_or(RunStatus::NotSolved);
        let (best, best_fitness) = self
            .history
            .last()
            .map(|summary| (summary.best_genome.clone(), summary.best_fitness))
            .unwrap_or_default();
        info!(?status, generations = self.history.len(), best_fitness, "evolution finished");

        Ok(EvolutionReport {
            status,
            history: self.history,
            best,
            best_fitness,
            constants: self.constants,
            symbols: self.table,
            seed: self.seed,
        })
    }

    /// Terminal state, or `None` while the run can continue.
    #[must_use]
    pub fn status(&self) -> Option<RunStatus> {
        self.status
    }

    /// Summaries recorded so far.
    #[must_use]
    pub fn history(&self) -> &[GenerationSummary] {
        &self.history
    }

    /// The live population.
    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// The code layout of this run.
    #[must_use]
    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    /// The ephemeral constants of this run.
    #[must_use]
    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    /// The run's configuration.
    #[must_use]
    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Master seed in effect.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Produce one generation of offspring across the worker pool.
    fn breed(&mut self) -> Result<(), EvalError> {
        let size = self.population.len();
        let min_range = match self.config.replacement {
            ReplacementPolicy::Shared => 1,
            ReplacementPolicy::Partitioned => self.config.tournament_size.max(2),
        };
        let tasks: Vec<(Range<usize>, u64)> = slot_ranges(size, self.threads.current_num_threads(), min_range)
            .map(|slots| (slots, self.rng.r#gen()))
            .collect();

        let breeder = Breeder {
            config: &self.config,
            table: &self.table,
            constants: &self.constants,
            dataset: self.dataset,
            population: &self.population,
        };
        let produced: Vec<usize> = self.threads.install(|| {
            tasks
                .into_par_iter()
                .map(|(slots, seed)| breeder.produce(&slots, seed))
                .collect::<Result<_, EvalError>>()
        })?;
        debug_assert_eq!(produced.iter().sum::<usize>(), size);
        Ok(())
    }

    /// Summarise the population and decide whether the run is over.
    fn record(&mut self) {
        let generation = self.history.len();
        let Some(summary) = summarize(generation, &self.population.snapshot()) else {
            self.status = Some(RunStatus::NotSolved);
            return;
        };
        debug!(
            generation,
            best_fitness = summary.best_fitness,
            average_fitness = summary.average_fitness,
            average_size = summary.average_size,
            "generation complete"
        );

        if summary.best_fitness > -self.config.goal_error {
            self.status = Some(RunStatus::Converged);
        } else if generation + 1 >= self.config.generations {
            self.status = Some(RunStatus::NotSolved);
        }
        self.history.push(summary);
    }
}

/// Split `0..size` into at most `workers` contiguous ranges whose lengths
/// differ by at most one, each holding at least `min_len` slots unless the
/// whole population is smaller than that.
fn slot_ranges(size: usize, workers: usize, min_len: usize) -> impl Iterator<Item = Range<usize>> {
    let parts = workers.min(size / min_len.max(1)).max(1);
    (0..parts).map(move |i| (i * size / parts)..((i + 1) * size / parts))
}

/// Read-only view of a run shared by the workers of one generation.
struct Breeder<'a> {
    config: &'a EvolutionConfig,
    table: &'a SymbolTable,
    constants: &'a ConstantPool,
    dataset: &'a Dataset,
    population: &'a Population,
}

impl Breeder<'_> {
    /// Produce one offspring per index in `slots` with a worker-local
    /// generator.
    fn produce(&self, slots: &Range<usize>, seed: u64) -> Result<usize, EvalError> {
        let config = self.config;
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut evaluator = Evaluator::new(self.table, self.constants, self.dataset, config.cutoffs, config.metric);

        for _ in slots.clone() {
            let offspring = if rng.gen_bool(config.crossover_rate) {
                let first = self.parent(&mut rng);
                let second = self.parent(&mut rng);
                crossover(&first, &second, self.table, config.max_length, &mut rng)
            } else {
                let parent = self.parent(&mut rng);
                mutate(&parent, self.table, config.mutation_rate, &mut rng)
            };
            let fitness = evaluator.fitness(&offspring)?;

            let target = match config.replacement {
                ReplacementPolicy::Shared => negative_tournament(self.population, config.tournament_size, &mut rng),
                ReplacementPolicy::Partitioned => {
                    negative_tournament_in(self.population, slots.clone(), config.tournament_size, &mut rng)
                }
            };
            self.population.replace(target, Individual::new(offspring, fitness));
        }
        Ok(slots.len())
    }

    fn parent(&self, rng: &mut SmallRng) -> Arc<Genome> {
        let index = tournament(self.population, self.config.tournament_size, rng);
        self.population.genome(index).unwrap_or_default()
    }
}

/// Run a full evolution over `dataset`.
///
/// # Errors
///
/// See [`Engine::new`] and [`Engine::step`].
pub fn evolve(config: EvolutionConfig, dataset: &Dataset) -> Result<EvolutionReport, EvolutionError> {
    evolve_with(config, dataset, |_| {})
}

/// Run a full evolution, streaming each generation summary to `reporter` as
/// soon as it is recorded.
///
/// # Errors
///
/// See [`Engine::new`] and [`Engine::step`].
pub fn evolve_with(
    config: EvolutionConfig,
    dataset: &Dataset,
    reporter: impl FnMut(&GenerationSummary),
) -> Result<EvolutionReport, EvolutionError> {
    Engine::new(config, dataset)?.run(reporter)
}
