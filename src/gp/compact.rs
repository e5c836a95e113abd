//! Constant-folding compaction of genomes into evaluation programs.
//!
//! A single left-to-right pass rewrites a genome into two parallel arrays:
//! `ops` holds a tag per live slot and `nums` the literal value where the tag
//! is [`LITERAL`]. Constant leaves fold eagerly into any operator whose
//! operands are all literals, so every fully constant subtree collapses to
//! one slot while variable-dependent structure is kept verbatim.

use crate::gp::genome::Genome;
use crate::gp::interpreter::EvalError;
use crate::gp::symbol::{Code, ConstantPool, Cutoffs, Symbol, SymbolClass, SymbolTable};

/// Tag marking a slot that holds a literal value.
pub const LITERAL: Code = 0;

/// A compacted, constant-folded program.
///
/// Slot tags: [`LITERAL`] for a value in `nums`, `1..=V` for variable
/// `tag - 1`, anything else is the operator's genome code. Variable tags
/// never reach the operator range because the layout reserves at least one
/// constant code between them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    ops: Vec<Code>,
    nums: Vec<f64>,
}

impl Program {
    /// Create an empty program with room for genomes of `capacity` symbols.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ops: Vec::with_capacity(capacity),
            nums: Vec::with_capacity(capacity),
        }
    }

    /// Compact `genome` into a fresh program.
    ///
    /// # Errors
    ///
    /// Returns an error if the genome holds a code outside the table or a
    /// constant index outside the pool.
    pub fn compact(
        genome: &Genome,
        table: &SymbolTable,
        pool: &ConstantPool,
        cutoffs: Cutoffs,
    ) -> Result<Self, EvalError> {
        let mut program = Self::with_capacity(genome.len());
        program.compact_from(genome, table, pool, cutoffs)?;
        Ok(program)
    }

    /// Compact `genome` into this program, reusing its buffers.
    ///
    /// # Errors
    ///
    /// See [`Program::compact`].
    pub fn compact_from(
        &mut self,
        genome: &Genome,
        table: &SymbolTable,
        pool: &ConstantPool,
        cutoffs: Cutoffs,
    ) -> Result<(), EvalError> {
        self.ops.clear();
        self.nums.clear();

        for &code in genome.codes() {
            match table.decode(code).ok_or(EvalError::UnknownSymbol(code))? {
                Symbol::Variable(index) => self.push(index + 1, 0.0),
                Symbol::Constant(index) => {
                    let value = pool.value(index).ok_or(EvalError::UnknownSymbol(code))?;
                    self.push_literal(value, table, cutoffs);
                }
                Symbol::Operator(_) => self.push(code, 0.0),
            }
        }
        Ok(())
    }

    /// Push a literal and fold it into every operator it completes.
    fn push_literal(&mut self, mut value: f64, table: &SymbolTable, cutoffs: Cutoffs) {
        loop {
            let len = self.ops.len();
            if len >= 2 && self.ops[len - 1] == LITERAL && self.is_class(len - 2, SymbolClass::Binary, table) {
                let Some(op) = table.operator(self.ops[len - 2]) else {
                    break;
                };
                value = op.apply_binary(self.nums[len - 1], value, cutoffs);
                self.truncate(len - 2);
            } else if len >= 1 && self.is_class(len - 1, SymbolClass::Unary, table) {
                let Some(op) = table.operator(self.ops[len - 1]) else {
                    break;
                };
                value = op.apply_unary(value, cutoffs);
                self.truncate(len - 1);
            } else {
                break;
            }
        }
        self.push(LITERAL, value);
    }

    /// Whether slot `at` is an operator of the given class.
    fn is_class(&self, at: usize, class: SymbolClass, table: &SymbolTable) -> bool {
        table.class(self.ops[at]) == Some(class)
    }

    fn push(&mut self, tag: Code, value: f64) {
        self.ops.push(tag);
        self.nums.push(value);
    }

    fn truncate(&mut self, len: usize) {
        self.ops.truncate(len);
        self.nums.truncate(len);
    }

    /// Effective length: live slots after folding.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the program has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Slot tags.
    #[must_use]
    pub fn ops(&self) -> &[Code] {
        &self.ops
    }

    /// Literal values, meaningful where the tag is [`LITERAL`].
    #[must_use]
    pub fn nums(&self) -> &[f64] {
        &self.nums
    }

    /// The folded value if the whole program reduced to one literal.
    #[must_use]
    pub fn as_constant(&self) -> Option<f64> {
        match (self.ops.as_slice(), self.nums.as_slice()) {
            ([LITERAL], [value]) => Some(*value),
            _ => None,
        }
    }
}
