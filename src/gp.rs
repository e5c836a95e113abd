//! Genetic programming engine for symbolic regression.
//!
//! Candidate programs are arithmetic expression trees stored as flat
//! prefix-order code buffers. Evaluation goes through a constant-folding
//! compaction pass and a small stack interpreter; the evolution loop breeds
//! offspring in parallel with steady-state replacement.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Evolution Loop                 │
//! ├─────────────────────────────────────────────┤
//! │ Selection │ Crossover │ Mutation │ Generator│
//! ├─────────────────────────────────────────────┤
//! │            Fitness Evaluation               │
//! ├─────────────────────────────────────────────┤
//! │   Genome → Compacted Program → Interpreter  │
//! ├─────────────────────────────────────────────┤
//! │      Symbol Table / Constant Pool           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tinygp::Dataset;
//! use tinygp::gp::{EvolutionConfig, evolve};
//!
//! let dataset = Dataset::from_fn((0..=10).map(f64::from), |x| x * x + 2.0)?;
//! let config = EvolutionConfig {
//!     population_size: 1000,
//!     seed: Some(42),
//!     ..EvolutionConfig::default()
//! };
//! let report = evolve(config, &dataset)?;
//! println!("{:?} after {} generations", report.status, report.history.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod compact;
mod crossover;
mod evolution;
mod fitness;
mod generator;
mod genome;
mod interpreter;
mod mutation;
mod population;
mod selection;
mod stats;
mod symbol;

pub use compact::{LITERAL, Program};
pub use crossover::{crossover, splice, subtree_at, subtree_end};
pub use evolution::{
    Engine, EvolutionConfig, EvolutionReport, ReplacementPolicy, RunStatus, evolve, evolve_with,
};
pub use fitness::{ErrorMetric, Evaluator};
pub use generator::{LengthExceeded, grow, min_tree_len, random_genome, retry};
pub use genome::{Genome, GenomeError};
pub use interpreter::{EvalError, Interpreter, evaluate_tree};
pub use mutation::mutate;
pub use population::{Individual, Population};
pub use selection::{FitnessSource, negative_tournament, negative_tournament_in, tournament};
pub use stats::{GenerationSummary, summarize};
pub use symbol::{
    Arity, Code, ConstantPool, ConstantRange, Cutoffs, DIVISION_CUTOFF, EXPONENT_CUTOFF, Operator, Symbol,
    SymbolClass, SymbolError, SymbolTable,
};
