//! Point mutation.
//!
//! Every symbol is independently replaced with probability `rate` by a
//! random symbol of the same class: leaves by leaves, 2-ary operators by
//! 2-ary operators, 1-ary operators by 1-ary operators. The tree shape is
//! never changed, so a well-formed genome stays well formed.

use crate::gp::genome::Genome;
use crate::gp::symbol::{SymbolClass, SymbolTable};
use rand::Rng;

/// Return a mutated copy of `genome`.
///
/// `rate` must lie in `[0, 1]`. Codes outside the table are copied through.
#[must_use]
pub fn mutate<R: Rng>(genome: &Genome, table: &SymbolTable, rate: f64, rng: &mut R) -> Genome {
    let codes = genome
        .codes()
        .iter()
        .map(|&code| {
            if !rng.gen_bool(rate) {
                return code;
            }
            match table.class(code) {
                Some(SymbolClass::Leaf) => table.random_leaf(rng),
                Some(SymbolClass::Binary) => table.random_binary(rng),
                Some(SymbolClass::Unary) => table.random_unary(rng),
                None => code,
            }
        })
        .collect();
    Genome::from_codes(codes)
}
