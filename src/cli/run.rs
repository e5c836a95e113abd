//! Run command implementation.

use super::output::{JsonRunReport, format_generation, format_outcome, render};
use super::{CliError, OutputFormat};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tinygp::gp::{Engine, ErrorMetric, EvolutionConfig, EvolutionReport, Operator, ReplacementPolicy};
use tinygp::{DatFile, EvolutionError};

/// Arguments of the `run` command. Flags override the config file.
#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Dataset file (.dat)
    #[arg(required = true)]
    dataset: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Population size
    #[arg(short, long)]
    population: Option<usize>,

    /// Generation budget, the initial population included
    #[arg(short, long)]
    generations: Option<usize>,

    /// Maximum genome length
    #[arg(long)]
    max_length: Option<usize>,

    /// Depth bound for initial trees
    #[arg(long)]
    depth: Option<usize>,

    /// Tournament size
    #[arg(short, long)]
    tournament_size: Option<usize>,

    /// Per-symbol mutation probability
    #[arg(long)]
    mutation_rate: Option<f64>,

    /// Crossover probability
    #[arg(long)]
    crossover_rate: Option<f64>,

    /// Stop once the best total error is below this value
    #[arg(long)]
    goal_error: Option<f64>,

    /// Number of ephemeral constants
    #[arg(long)]
    constants: Option<usize>,

    /// Operators, comma-separated (ADD,SUB,MUL,DIV,EXP,SIN,COS)
    #[arg(long, value_delimiter = ',', value_parser = parse_operator)]
    operators: Option<Vec<Operator>>,

    /// Error metric: mae or mse
    #[arg(long)]
    metric: Option<Metric>,

    /// Replacement policy: shared or partitioned
    #[arg(long)]
    replacement: Option<Replacement>,

    /// Random seed (default: random)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Worker threads (default: CPU count)
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Show progress bar
    #[arg(long)]
    progress: bool,

    /// Only print the final result
    #[arg(short, long)]
    quiet: bool,
}

/// Error metric names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Metric {
    /// Sum of absolute errors.
    Mae,
    /// Sum of squared errors.
    Mse,
}

/// Replacement policy names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Replacement {
    /// Any worker may replace any slot.
    Shared,
    /// Workers replace only slots in their own range.
    Partitioned,
}

fn parse_operator(name: &str) -> Result<Operator, String> {
    Operator::ALL
        .into_iter()
        .find(|op| op.name().eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| format!("unknown operator {name:?}"))
}

/// Build the run configuration: config file (or defaults), then dataset
/// header hints for settings the file leaves at their defaults, then flags.
fn build_config(args: &RunArgs, file: &DatFile) -> Result<EvolutionConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => EvolutionConfig::default(),
    };

    let defaults = EvolutionConfig::default();
    if config.constant_count == defaults.constant_count && file.header.constants > 0 {
        config.constant_count = file.header.constants;
    }
    if config.constant_range == defaults.constant_range {
        config.constant_range = file.header.range;
    }

    macro_rules! override_with {
        ($($field:ident <- $flag:expr),* $(,)?) => {
            $(if let Some(value) = $flag { config.$field = value; })*
        };
    }
    override_with!(
        population_size <- args.population,
        generations <- args.generations,
        max_length <- args.max_length,
        depth <- args.depth,
        tournament_size <- args.tournament_size,
        mutation_rate <- args.mutation_rate,
        crossover_rate <- args.crossover_rate,
        goal_error <- args.goal_error,
        constant_count <- args.constants,
        operators <- args.operators.clone(),
    );
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(workers) = args.workers {
        config.workers = Some(workers);
    }
    if let Some(metric) = args.metric {
        config.metric = match metric {
            Metric::Mae => ErrorMetric::Mae,
            Metric::Mse => ErrorMetric::Mse,
        };
    }
    if let Some(replacement) = args.replacement {
        config.replacement = match replacement {
            Replacement::Shared => ReplacementPolicy::Shared,
            Replacement::Partitioned => ReplacementPolicy::Partitioned,
        };
    }

    config
        .validate()
        .map_err(|e| CliError::new(e.to_string()))?;
    Ok(config)
}

fn load_config(path: &Path) -> Result<EvolutionConfig, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::new(format!("Invalid config {}: {e}", path.display())))
}

/// Run `engine` to completion, handing each generation's text line to `emit`
/// as soon as the generation is recorded.
fn evolve_streaming(
    engine: Engine<'_>,
    progress: Option<&ProgressBar>,
    mut emit: impl FnMut(&str),
) -> Result<EvolutionReport, EvolutionError> {
    let table = engine.table().clone();
    let constants = engine.constants().clone();
    engine.run(|summary| {
        if let Some(bar) = progress {
            bar.set_message(format!("best error {:.6}", -summary.best_fitness));
            bar.inc(1);
        }
        emit(&format_generation(summary, &table, &constants));
    })
}

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the dataset or config cannot be loaded, the
/// configuration is invalid, or evolution fails.
pub(crate) fn execute(args: &RunArgs) -> Result<(), CliError> {
    let file = DatFile::load(&args.dataset)?;
    let config = build_config(args, &file)?;

    let text = args.format == OutputFormat::Text;
    if text && !args.quiet {
        println!("-- TINY GP --");
        println!("  Dataset:     {} ({} cases)", args.dataset.display(), file.dataset.len());
        println!("  Population:  {}", config.population_size);
        println!("  Generations: {}", config.generations);
        println!("  Operators:   {:?}", config.operators);
        println!();
    }

    let progress = if args.progress {
        let bar = ProgressBar::new(u64::try_from(config.generations).unwrap_or(u64::MAX));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} generations ({msg})")
                .map_err(|e| CliError::new(format!("Invalid progress template: {e}")))?
                .progress_chars("=>-"),
        );
        Some(bar)
    } else {
        None
    };

    let stream = text && !args.quiet;
    let start = Instant::now();
    let engine = Engine::new(config, &file.dataset)?;
    let report = evolve_streaming(engine, progress.as_ref(), |line| {
        if !stream {
            return;
        }
        match &progress {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    })?;
    let elapsed = start.elapsed();
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    match args.format {
        OutputFormat::Text => {
            if stream {
                println!();
            }
            println!(
                "Best: {} (error {:.6})",
                render(&report.best, &report.symbols, &report.constants),
                -report.best_fitness
            );
            println!("{}", format_outcome(report.status, elapsed));
        }
        OutputFormat::Json => {
            let json = JsonRunReport {
                status: report.status,
                seed: report.seed,
                elapsed_seconds: elapsed.as_secs_f64(),
                best_fitness: report.best_fitness,
                best_expression: render(&report.best, &report.symbols, &report.constants),
                best_genome: &report.best,
                constants: report.constants.values(),
                history: &report.history,
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}
