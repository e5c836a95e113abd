//! Subtree crossover on prefix-order genomes.
//!
//! A random subtree of the first parent is replaced by a random subtree of
//! the second. Subtree boundaries are found with an arity-balance scan: from
//! the start position, count leaves and 2-ary operators until the operators
//! seen are exactly one fewer than the leaves seen.

use crate::gp::genome::Genome;
use crate::gp::symbol::{Code, SymbolClass, SymbolTable};
use rand::Rng;
use std::ops::Range;

/// Exclusive end of the subtree starting at `start`.
///
/// Returns `None` if `start` is out of bounds, the scan meets a code outside
/// the table, or the buffer ends before the subtree is complete.
#[must_use]
pub fn subtree_end(codes: &[Code], start: usize, table: &SymbolTable) -> Option<usize> {
    let mut leaves = 0usize;
    let mut operators = 0usize;
    for (position, &code) in codes.iter().enumerate().skip(start) {
        match table.class(code)? {
            SymbolClass::Leaf => leaves += 1,
            SymbolClass::Binary => operators += 1,
            SymbolClass::Unary => {}
        }
        if operators + 1 == leaves {
            return Some(position + 1);
        }
    }
    None
}

/// Span of the subtree starting at `start`.
#[must_use]
pub fn subtree_at(codes: &[Code], start: usize, table: &SymbolTable) -> Option<Range<usize>> {
    subtree_end(codes, start, table).map(|end| start..end)
}

/// Replace `target` in `recipient` with the `donated` span of `donor`.
///
/// The offspring length is
/// `target.start + donated.len() + (recipient.len() - target.end)`.
#[must_use]
pub fn splice(recipient: &[Code], target: Range<usize>, donor: &[Code], donated: Range<usize>) -> Genome {
    let mut codes = Vec::with_capacity(recipient.len() - target.len() + donated.len());
    codes.extend_from_slice(&recipient[..target.start]);
    codes.extend_from_slice(&donor[donated]);
    codes.extend_from_slice(&recipient[target.end..]);
    Genome::from_codes(codes)
}

/// Cross two parents at uniformly random positions.
///
/// Offspring longer than `max_len` are discarded and a copy of `parent1` is
/// returned instead, as is the case for empty or malformed parents.
#[must_use]
pub fn crossover<R: Rng>(
    parent1: &Genome,
    parent2: &Genome,
    table: &SymbolTable,
    max_len: usize,
    rng: &mut R,
) -> Genome {
    if parent1.is_empty() || parent2.is_empty() {
        return parent1.clone();
    }

    let start1 = rng.gen_range(0..parent1.len());
    let start2 = rng.gen_range(0..parent2.len());
    let spans = subtree_at(parent1.codes(), start1, table).zip(subtree_at(parent2.codes(), start2, table));
    let Some((target, donated)) = spans else {
        return parent1.clone();
    };

    if parent1.len() - target.len() + donated.len() > max_len {
        return parent1.clone();
    }
    splice(parent1.codes(), target, parent2.codes(), donated)
}
