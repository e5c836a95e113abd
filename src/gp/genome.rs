//! Genome representation for genetic programming.
//!
//! A genome is an expression tree flattened in prefix order: every operator
//! is immediately followed by its operand subtrees. Reading left to right
//! with an "owed subtrees" counter that starts at 1 (leaf −1, 2-ary +1,
//! 1-ary 0), a well-formed genome reaches 0 exactly at its last symbol.

use crate::gp::symbol::{Code, Symbol, SymbolClass, SymbolTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A candidate program as a flat prefix-order code buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genome {
    codes: Vec<Code>,
}

/// Structural defects found by [`Genome::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GenomeError {
    /// The genome holds no symbols.
    #[error("empty genome")]
    Empty,
    /// A code outside the symbol table.
    #[error("unknown symbol code {code} at position {position}")]
    UnknownCode {
        /// Offending code.
        code: Code,
        /// Index in the genome.
        position: usize,
    },
    /// The tree closed before the end of the buffer.
    #[error("tree complete at position {position}, {trailing} trailing symbols")]
    Trailing {
        /// Index of the symbol that completed the tree.
        position: usize,
        /// Symbols left over.
        trailing: usize,
    },
    /// The buffer ended with operands still owed.
    #[error("tree incomplete: {owed} operands missing")]
    Incomplete {
        /// Missing operands.
        owed: usize,
    },
}

impl Genome {
    /// Wrap a raw code buffer. No validation is performed.
    #[must_use]
    pub fn from_codes(codes: Vec<Code>) -> Self {
        Self { codes }
    }

    /// Raw code sequence, for renderers and persistence.
    #[must_use]
    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the genome has no symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Decoded symbols, or `None` where a code is outside the table.
    pub fn symbols<'a>(&'a self, table: &'a SymbolTable) -> impl Iterator<Item = Option<Symbol>> + 'a {
        self.codes.iter().map(|&code| table.decode(code))
    }

    /// Check the prefix-arity invariant.
    ///
    /// # Errors
    ///
    /// Returns the first structural defect found.
    pub fn validate(&self, table: &SymbolTable) -> Result<(), GenomeError> {
        if self.codes.is_empty() {
            return Err(GenomeError::Empty);
        }

        let mut owed: usize = 1;
        for (position, &code) in self.codes.iter().enumerate() {
            if owed == 0 {
                return Err(GenomeError::Trailing {
                    position: position - 1,
                    trailing: self.codes.len() - position,
                });
            }
            match table.class(code) {
                Some(SymbolClass::Leaf) => owed -= 1,
                Some(SymbolClass::Binary) => owed += 1,
                Some(SymbolClass::Unary) => {}
                None => return Err(GenomeError::UnknownCode { code, position }),
            }
        }

        if owed == 0 {
            Ok(())
        } else {
            Err(GenomeError::Incomplete { owed })
        }
    }

    /// Whether [`Genome::validate`] succeeds.
    #[must_use]
    pub fn is_well_formed(&self, table: &SymbolTable) -> bool {
        self.validate(table).is_ok()
    }

    /// Tree height in edges (a lone leaf has depth 0).
    ///
    /// Returns `None` for malformed genomes.
    #[must_use]
    pub fn depth(&self, table: &SymbolTable) -> Option<usize> {
        self.validate(table).ok()?;

        // Remaining child slots of each open operator, innermost last.
        let mut open: Vec<u8> = Vec::new();
        let mut max_depth = 0;
        for &code in &self.codes {
            max_depth = max_depth.max(open.len());
            match table.class(code)? {
                SymbolClass::Binary => open.push(2),
                SymbolClass::Unary => open.push(1),
                SymbolClass::Leaf => {
                    while let Some(slots) = open.last_mut() {
                        *slots -= 1;
                        if *slots > 0 {
                            break;
                        }
                        open.pop();
                    }
                }
            }
        }
        Some(max_depth)
    }
}

impl From<Vec<Code>> for Genome {
    fn from(codes: Vec<Code>) -> Self {
        Self::from_codes(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::symbol::Operator;

    // x0, c0..c2, ADD SUB MUL DIV EXP SIN COS = codes 4..=10
    fn table() -> SymbolTable {
        SymbolTable::new(1, 3, &Operator::ALL).unwrap()
    }

    const ADD: Code = 4;
    const MUL: Code = 6;
    const SIN: Code = 9;

    #[test]
    fn test_well_formed() {
        let table = table();
        assert!(Genome::from_codes(vec![0]).is_well_formed(&table));
        assert!(Genome::from_codes(vec![ADD, 0, 1]).is_well_formed(&table));
        assert!(Genome::from_codes(vec![SIN, ADD, 0, MUL, 2, 0]).is_well_formed(&table));
    }

    #[test]
    fn test_malformed() {
        let table = table();
        assert_eq!(Genome::default().validate(&table), Err(GenomeError::Empty));
        assert_eq!(
            Genome::from_codes(vec![ADD, 0]).validate(&table),
            Err(GenomeError::Incomplete { owed: 1 })
        );
        assert_eq!(
            Genome::from_codes(vec![0, 1]).validate(&table),
            Err(GenomeError::Trailing { position: 0, trailing: 1 })
        );
        assert_eq!(
            Genome::from_codes(vec![ADD, 0, 200]).validate(&table),
            Err(GenomeError::UnknownCode { code: 200, position: 2 })
        );
    }

    #[test]
    fn test_depth() {
        let table = table();
        assert_eq!(Genome::from_codes(vec![0]).depth(&table), Some(0));
        assert_eq!(Genome::from_codes(vec![ADD, 0, 1]).depth(&table), Some(1));
        assert_eq!(Genome::from_codes(vec![ADD, MUL, 0, 1, 2]).depth(&table), Some(2));
        assert_eq!(Genome::from_codes(vec![ADD, 0, MUL, 1, SIN, 2]).depth(&table), Some(3));
        assert_eq!(Genome::from_codes(vec![ADD, 0]).depth(&table), None);
    }

    #[test]
    fn test_symbols_decode() {
        let table = table();
        let genome = Genome::from_codes(vec![ADD, 0, 2]);
        let symbols: Vec<_> = genome.symbols(&table).collect();
        assert_eq!(
            symbols,
            vec![
                Some(Symbol::Operator(Operator::Add)),
                Some(Symbol::Variable(0)),
                Some(Symbol::Constant(1)),
            ]
        );
    }

    #[test]
    fn test_genome_serialization() {
        let genome = Genome::from_codes(vec![ADD, 0, 1]);
        let encoded = serde_json::to_string(&genome).unwrap();
        assert_eq!(encoded, "[4,0,1]");
        let decoded: Genome = serde_json::from_str(&encoded).unwrap();
        assert_eq!(genome, decoded);
    }
}
