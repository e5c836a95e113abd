//! Random tree generation for seeding populations.
//!
//! Trees are grown recursively into a size-bounded buffer. Running out of
//! room is not an error: the attempt is abandoned and the caller grows a new
//! tree from scratch.

use crate::gp::genome::Genome;
use crate::gp::symbol::{Arity, Code, SymbolClass, SymbolTable};
use rand::Rng;
use thiserror::Error;

/// A growth attempt ran past the length bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("tree exceeded {max_len} symbols")]
pub struct LengthExceeded {
    /// The bound that was hit.
    pub max_len: usize,
}

/// Grow one tree into `buffer`, which is cleared first.
///
/// The root is always an operator. Below it, each position becomes a leaf
/// when `depth` is exhausted or a fair coin says so, otherwise a uniformly
/// random operator whose children are grown with `depth - 1`.
///
/// # Errors
///
/// Returns [`LengthExceeded`] when the tree would need more than `max_len`
/// symbols. `buffer` then holds a partial tree and must be discarded.
pub fn grow<R: Rng>(
    buffer: &mut Vec<Code>,
    max_len: usize,
    depth: usize,
    table: &SymbolTable,
    rng: &mut R,
) -> Result<(), LengthExceeded> {
    buffer.clear();
    grow_node(buffer, max_len, depth, table, rng)
}

fn grow_node<R: Rng>(
    buffer: &mut Vec<Code>,
    max_len: usize,
    depth: usize,
    table: &SymbolTable,
    rng: &mut R,
) -> Result<(), LengthExceeded> {
    if buffer.len() >= max_len {
        return Err(LengthExceeded { max_len });
    }

    let is_root = buffer.is_empty();
    let leaf = depth == 0 || (!is_root && rng.gen_bool(0.5));
    if leaf {
        buffer.push(table.random_leaf(rng));
        return Ok(());
    }

    let op = table.random_operator(rng);
    buffer.push(op);
    match table.class(op) {
        Some(SymbolClass::Binary) => {
            grow_node(buffer, max_len, depth - 1, table, rng)?;
            grow_node(buffer, max_len, depth - 1, table, rng)
        }
        _ => grow_node(buffer, max_len, depth - 1, table, rng),
    }
}

/// Call `attempt` until it succeeds, returning the value and the number of
/// failed attempts.
pub fn retry<T, E>(mut attempt: impl FnMut() -> Result<T, E>) -> (T, usize) {
    let mut failures = 0;
    loop {
        match attempt() {
            Ok(value) => return (value, failures),
            Err(_) => failures += 1,
        }
    }
}

/// Smallest tree `grow` can produce: a lone leaf when `depth` is 0,
/// otherwise an operator root over leaves, which needs 2 symbols with a
/// 1-ary operator available and 3 without.
#[must_use]
pub fn min_tree_len(depth: usize, table: &SymbolTable) -> usize {
    if depth == 0 {
        1
    } else if table.operators().iter().any(|op| op.arity() == Arity::Unary) {
        2
    } else {
        3
    }
}

/// Grow a random well-formed genome of at most `max_len` symbols and depth
/// at most `depth`, retrying until an attempt fits.
///
/// Returns `None` when `max_len` is below [`min_tree_len`], since no attempt
/// could ever fit.
#[must_use]
pub fn random_genome<R: Rng>(max_len: usize, depth: usize, table: &SymbolTable, rng: &mut R) -> Option<Genome> {
    if max_len < min_tree_len(depth, table) {
        return None;
    }

    let mut buffer = Vec::with_capacity(max_len.min(1024));
    let ((), failures) = retry(|| grow(&mut buffer, max_len, depth, table, rng));
    if failures > 0 {
        tracing::trace!(failures, len = buffer.len(), "regrew oversized trees");
    }
    Some(Genome::from_codes(buffer))
}
