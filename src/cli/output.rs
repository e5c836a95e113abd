//! Output formatting utilities for CLI.

use serde::Serialize;
use std::time::Duration;
use tinygp::gp::{
    Arity, ConstantPool, GenerationSummary, Genome, Operator, RunStatus, Symbol, SymbolTable,
};
use tinygp::{DatHeader, Dataset};

/// Render a genome as an infix expression.
///
/// Variables print as `X1..`, constants by value, 2-ary operators as
/// parenthesised infix and 1-ary operators as calls.
pub(super) fn render(genome: &Genome, table: &SymbolTable, constants: &ConstantPool) -> String {
    let mut output = String::new();
    let mut cursor = 0;
    match render_node(genome.codes(), &mut cursor, table, constants, &mut output) {
        Some(()) if cursor == genome.len() => output,
        _ => format!("<malformed {:?}>", genome.codes()),
    }
}

fn render_node(
    codes: &[u8],
    cursor: &mut usize,
    table: &SymbolTable,
    constants: &ConstantPool,
    output: &mut String,
) -> Option<()> {
    let code = *codes.get(*cursor)?;
    *cursor += 1;

    match table.decode(code)? {
        Symbol::Variable(index) => output.push_str(&format!("X{}", u16::from(index) + 1)),
        Symbol::Constant(index) => output.push_str(&constants.value(index)?.to_string()),
        Symbol::Operator(op) => match op.arity() {
            Arity::Binary => {
                output.push('(');
                render_node(codes, cursor, table, constants, output)?;
                output.push_str(&format!(" {} ", infix_symbol(op)));
                render_node(codes, cursor, table, constants, output)?;
                output.push(')');
            }
            Arity::Unary => {
                output.push_str(&format!("{op}("));
                render_node(codes, cursor, table, constants, output)?;
                output.push(')');
            }
        },
    }
    Some(())
}

fn infix_symbol(op: Operator) -> &'static str {
    match op {
        Operator::Add => "+",
        Operator::Sub => "-",
        Operator::Mul => "*",
        Operator::Div => "/",
        Operator::Exp | Operator::Sin | Operator::Cos => op.name(),
    }
}

/// Format one generation as human-readable text. Errors are shown as
/// positive totals.
pub(super) fn format_generation(summary: &GenerationSummary, table: &SymbolTable, constants: &ConstantPool) -> String {
    format!(
        "Generation={} Avg Error={:.6} Best Error={:.6} Avg Size={:.2}\nBest Individual: {}",
        summary.generation,
        -summary.average_fitness,
        -summary.best_fitness,
        summary.average_size,
        render(&summary.best_genome, table, constants),
    )
}

/// Final verdict line.
pub(super) fn format_outcome(status: RunStatus, elapsed: Duration) -> String {
    let verdict = match status {
        RunStatus::Converged => "PROBLEM SOLVED",
        RunStatus::NotSolved => "PROBLEM *NOT* SOLVED",
    };
    format!("{verdict}\nElapsed: {:.3}s", elapsed.as_secs_f64())
}

/// JSON-serializable run result.
#[derive(Debug, Serialize)]
pub(super) struct JsonRunReport<'a> {
    /// Terminal state.
    pub(super) status: RunStatus,
    /// Master seed used.
    pub(super) seed: u64,
    /// Wall-clock duration in seconds.
    pub(super) elapsed_seconds: f64,
    /// Fitness of the best genome (negated total error).
    pub(super) best_fitness: f64,
    /// Infix rendering of the best genome.
    pub(super) best_expression: String,
    /// Raw codes of the best genome.
    pub(super) best_genome: &'a Genome,
    /// Ephemeral constant values, by index.
    pub(super) constants: &'a [f64],
    /// One record per generation.
    pub(super) history: &'a [GenerationSummary],
}

/// JSON-serializable dataset description.
#[derive(Debug, Serialize)]
pub(super) struct JsonDatasetInfo {
    /// Header fields as written in the file.
    pub(super) header: DatHeader,
    /// Rows actually present.
    pub(super) cases: usize,
    /// Smallest target value.
    pub(super) target_min: f64,
    /// Largest target value.
    pub(super) target_max: f64,
}

impl JsonDatasetInfo {
    /// Describe a loaded dataset.
    pub(super) fn new(header: DatHeader, dataset: &Dataset) -> Self {
        let (target_min, target_max) = dataset
            .rows()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, t)| (lo.min(t), hi.max(t)));
        Self {
            header,
            cases: dataset.len(),
            target_min,
            target_max,
        }
    }
}

/// Format a dataset description as human-readable text.
pub(super) fn format_dataset(info: &JsonDatasetInfo) -> String {
    let header = &info.header;
    format!(
        "  Variables:    {}\n  Cases:        {}\n  Constants:    {} in [{}, {}]\n  Target range: [{}, {}]",
        header.variables,
        info.cases,
        header.constants,
        header.range.min,
        header.range.max,
        info.target_min,
        info.target_max,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (SymbolTable, ConstantPool) {
        let table = SymbolTable::new(2, 2, &Operator::ALL).unwrap();
        let constants = ConstantPool::from_values(vec![1.5, -2.0]);
        (table, constants)
    }

    #[test]
    fn test_render_infix() {
        let (table, constants) = setup();
        // ADD=4 SUB=5 MUL=6 DIV=7 EXP=8 SIN=9 COS=10
        let genome = Genome::from_codes(vec![4, 6, 0, 0, 2]);
        assert_eq!(render(&genome, &table, &constants), "((X1 * X1) + 1.5)");

        let genome = Genome::from_codes(vec![7, 8, 1, 3]);
        assert_eq!(render(&genome, &table, &constants), "(EXP(X2) / -2)");
    }

    #[test]
    fn test_render_malformed() {
        let (table, constants) = setup();
        let genome = Genome::from_codes(vec![4, 0]);
        assert!(render(&genome, &table, &constants).starts_with("<malformed"));
        let genome = Genome::from_codes(vec![0, 1]);
        assert!(render(&genome, &table, &constants).starts_with("<malformed"));
    }

    #[test]
    fn test_outcome_lines() {
        let solved = format_outcome(RunStatus::Converged, Duration::from_millis(1500));
        assert!(solved.starts_with("PROBLEM SOLVED"));
        assert!(solved.contains("1.500s"));
        assert!(format_outcome(RunStatus::NotSolved, Duration::ZERO).starts_with("PROBLEM *NOT* SOLVED"));
    }

    #[test]
    fn test_generation_line_shows_errors() {
        let (table, constants) = setup();
        let summary = GenerationSummary {
            generation: 2,
            average_fitness: -10.0,
            best_fitness: -0.5,
            average_size: 7.25,
            best_genome: Genome::from_codes(vec![0]),
        };
        let text = format_generation(&summary, &table, &constants);
        assert!(text.contains("Generation=2"));
        assert!(text.contains("Best Error=0.500000"));
        assert!(text.contains("Avg Size=7.25"));
        assert!(text.ends_with("Best Individual: X1"));
    }
}
