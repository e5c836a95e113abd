#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tinygp::gp::{ConstantPool, Cutoffs, Genome, Interpreter, Operator, Program, SymbolTable, evaluate_tree};

/// Structured input for compaction fuzzing.
#[derive(Arbitrary, Debug)]
struct CompactInput {
    /// Number of input variables.
    variables: u8,
    /// Constant values; the pool size follows from this.
    constants: Vec<f64>,
    /// Bitmask over `Operator::ALL`.
    operators: u8,
    /// Raw genome codes, not necessarily well formed.
    codes: Vec<u8>,
    /// Values bound to the variables.
    inputs: Vec<f64>,
}

fuzz_target!(|input: CompactInput| {
    let operators: Vec<Operator> = Operator::ALL
        .into_iter()
        .enumerate()
        .filter(|(bit, _)| input.operators & (1 << bit) != 0)
        .map(|(_, op)| op)
        .collect();
    let Ok(table) = SymbolTable::new(usize::from(input.variables % 8), input.constants.len(), &operators) else {
        return;
    };
    let pool = ConstantPool::from_values(input.constants);
    let genome = Genome::from_codes(input.codes);
    let cutoffs = Cutoffs::default();

    // Malformed genomes must be rejected, never panic
    let direct = evaluate_tree(&genome, &input.inputs, &table, &pool, cutoffs);
    let Ok(program) = Program::compact(&genome, &table, &pool, cutoffs) else {
        return;
    };
    assert!(program.len() <= genome.len());

    let folded = Interpreter::new().run(&program, &input.inputs, &table, cutoffs);
    if genome.is_well_formed(&table) {
        if let (Ok(a), Ok(b)) = (folded, direct) {
            assert!(a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan()), "{a} != {b}");
        }
    }
});
