//! Symbol codes, operators and the ephemeral constant pool.
//!
//! Genomes are stored as flat buffers of small integer codes. The code space
//! is split into three disjoint ranges laid out by a [`SymbolTable`]:
//!
//! ```text
//! 0 ........ V ........ F ............ F2 ............ E
//! | variables | constants | 2-ary operators | 1-ary operators |
//! ```
//!
//! The integer encoding stays internal to genome buffers; everything that
//! crosses a module boundary decodes into the tagged [`Symbol`] variant.

// Code-space arithmetic is bounded by the u8 range checked in `SymbolTable::new`
#![allow(clippy::cast_possible_truncation)]

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw symbol code as stored in a genome buffer.
pub type Code = u8;

/// Division guard: denominators at or below this magnitude make `DIV` a no-op.
pub const DIVISION_CUTOFF: f64 = 0.001;

/// Exponent guard: `EXP` passes its argument through above this value.
pub const EXPONENT_CUTOFF: f64 = 100.0;

/// Number of distinct codes available to a genome.
const CODE_SPACE: usize = Code::MAX as usize + 1;

/// Arithmetic primitives available to evolved expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Protected division.
    Div,
    /// Protected natural exponent.
    Exp,
    /// Sine of an argument in degrees.
    Sin,
    /// Cosine of an argument in degrees.
    Cos,
}

/// Number of operands an operator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// One operand.
    Unary,
    /// Two operands.
    Binary,
}

impl Operator {
    /// All operators in canonical code order.
    pub const ALL: [Operator; 7] = [
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Exp,
        Operator::Sin,
        Operator::Cos,
    ];

    /// The operator's arity.
    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Self::Add | Self::Sub | Self::Mul | Self::Div => Arity::Binary,
            Self::Exp | Self::Sin | Self::Cos => Arity::Unary,
        }
    }

    /// Short upper-case mnemonic.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Exp => "EXP",
            Self::Sin => "SIN",
            Self::Cos => "COS",
        }
    }

    /// Apply a 2-ary operator. `first` is the leftmost operand in prefix order.
    ///
    /// Calling this on a 1-ary operator is a caller bug: debug builds panic,
    /// release builds ignore `second`.
    #[inline]
    #[must_use]
    pub fn apply_binary(self, first: f64, second: f64, cutoffs: Cutoffs) -> f64 {
        debug_assert_eq!(self.arity(), Arity::Binary, "{self} is not a 2-ary operator");
        match self {
            Self::Add => first + second,
            Self::Sub => first - second,
            Self::Mul => first * second,
            Self::Div => {
                if second.abs() <= cutoffs.division {
                    first
                } else {
                    first / second
                }
            }
            Self::Exp | Self::Sin | Self::Cos => self.apply_unary(first, cutoffs),
        }
    }

    /// Apply a 1-ary operator.
    ///
    /// Calling this on a 2-ary operator is a caller bug: debug builds panic,
    /// release builds return `x`.
    #[inline]
    #[must_use]
    pub fn apply_unary(self, x: f64, cutoffs: Cutoffs) -> f64 {
        debug_assert_eq!(self.arity(), Arity::Unary, "{self} is not a 1-ary operator");
        match self {
            Self::Exp => {
                if x <= cutoffs.exponent {
                    x.exp()
                } else {
                    x
                }
            }
            Self::Sin => x.to_radians().sin(),
            Self::Cos => x.to_radians().cos(),
            Self::Add | Self::Sub | Self::Mul | Self::Div => x,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric guards shared by folding and interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cutoffs {
    /// Denominator magnitude at or below which division is skipped.
    pub division: f64,
    /// Argument above which `EXP` returns its input unchanged.
    pub exponent: f64,
}

impl Default for Cutoffs {
    fn default() -> Self {
        Self {
            division: DIVISION_CUTOFF,
            exponent: EXPONENT_CUTOFF,
        }
    }
}

/// A decoded symbol code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Input variable by index.
    Variable(u8),
    /// Ephemeral constant by pool index.
    Constant(u8),
    /// Operator node.
    Operator(Operator),
}

/// Structural class of a code, all the genetic operators need to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolClass {
    /// Variable or constant.
    Leaf,
    /// 1-ary operator.
    Unary,
    /// 2-ary operator.
    Binary,
}

/// Errors laying out the symbol code space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SymbolError {
    /// Variables, constants and operators do not fit in the code space.
    #[error(
        "{variables} variables + {constants} constants + {operators} operators exceed the {limit}-symbol code space"
    )]
    CodeSpaceExhausted {
        /// Requested variables.
        variables: usize,
        /// Requested constants.
        constants: usize,
        /// Requested operators.
        operators: usize,
        /// Available codes.
        limit: usize,
    },
    /// The constant pool must not be empty.
    #[error("at least one ephemeral constant is required")]
    NoConstants,
    /// Trees cannot branch without a 2-ary operator.
    #[error("at least one 2-ary operator is required")]
    NoBinaryOperator,
}

/// Layout of the code space for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    variables: u8,
    constants: u8,
    /// Operators by `code - first_operator`: binary first, then unary.
    operators: Vec<Operator>,
    binary_count: u8,
}

impl SymbolTable {
    /// Lay out codes for `variables` inputs, `constants` pool entries and the
    /// given operator set. Duplicates are dropped and operators are placed in
    /// canonical order.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout does not fit in the code space, the
    /// pool is empty, or no 2-ary operator is available.
    pub fn new(variables: usize, constants: usize, operators: &[Operator]) -> Result<Self, SymbolError> {
        let mut ops: Vec<Operator> = operators.to_vec();
        ops.sort_unstable();
        ops.dedup();

        if constants == 0 {
            return Err(SymbolError::NoConstants);
        }
        let binary_count = ops.iter().filter(|op| op.arity() == Arity::Binary).count();
        if binary_count == 0 {
            return Err(SymbolError::NoBinaryOperator);
        }
        if variables.saturating_add(constants).saturating_add(ops.len()) > CODE_SPACE {
            return Err(SymbolError::CodeSpaceExhausted {
                variables,
                constants,
                operators: ops.len(),
                limit: CODE_SPACE,
            });
        }
        // Canonical order already puts every binary operator first.
        Ok(Self {
            variables: variables as u8,
            constants: constants as u8,
            operators: ops,
            binary_count: binary_count as u8,
        })
    }

    /// Number of input variables (`V`).
    #[must_use]
    pub fn variables(&self) -> usize {
        usize::from(self.variables)
    }

    /// Number of ephemeral constants.
    #[must_use]
    pub fn constants(&self) -> usize {
        usize::from(self.constants)
    }

    /// Number of leaf codes (variables + constants).
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.variables() + self.constants()
    }

    /// First operator code (`F`).
    #[must_use]
    pub fn first_operator(&self) -> Code {
        self.variables + self.constants
    }

    /// Last 2-ary operator code (`F2`).
    #[must_use]
    pub fn last_binary(&self) -> Code {
        self.first_operator() + (self.binary_count - 1)
    }

    /// Last operator code (`E`).
    #[must_use]
    pub fn last_operator(&self) -> Code {
        self.first_operator() + (self.operators.len() as u8 - 1)
    }

    /// Operators in code order.
    #[must_use]
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Classify a code, or `None` if it lies outside the layout.
    #[inline]
    #[must_use]
    pub fn class(&self, code: Code) -> Option<SymbolClass> {
        if code < self.first_operator() {
            Some(SymbolClass::Leaf)
        } else if code <= self.last_binary() {
            Some(SymbolClass::Binary)
        } else if code <= self.last_operator() {
            Some(SymbolClass::Unary)
        } else {
            None
        }
    }

    /// Operator for an operator code.
    #[inline]
    #[must_use]
    pub fn operator(&self, code: Code) -> Option<Operator> {
        let offset = code.checked_sub(self.first_operator())?;
        self.operators.get(usize::from(offset)).copied()
    }

    /// Decode a raw code into its tagged form.
    #[must_use]
    pub fn decode(&self, code: Code) -> Option<Symbol> {
        if code < self.variables {
            Some(Symbol::Variable(code))
        } else if code < self.first_operator() {
            Some(Symbol::Constant(code - self.variables))
        } else {
            self.operator(code).map(Symbol::Operator)
        }
    }

    /// Encode a tagged symbol, or `None` if it is not part of this layout.
    #[must_use]
    pub fn encode(&self, symbol: Symbol) -> Option<Code> {
        match symbol {
            Symbol::Variable(i) => (i < self.variables).then_some(i),
            Symbol::Constant(i) => (i < self.constants).then(|| self.variables + i),
            Symbol::Operator(op) => self
                .operators
                .iter()
                .position(|&o| o == op)
                .map(|p| self.first_operator() + p as u8),
        }
    }

    /// Uniformly random leaf code (variable or constant).
    pub fn random_leaf<R: Rng>(&self, rng: &mut R) -> Code {
        rng.gen_range(0..self.first_operator())
    }

    /// Uniformly random operator code of any arity.
    pub fn random_operator<R: Rng>(&self, rng: &mut R) -> Code {
        rng.gen_range(self.first_operator()..=self.last_operator())
    }

    /// Uniformly random 2-ary operator code.
    pub fn random_binary<R: Rng>(&self, rng: &mut R) -> Code {
        rng.gen_range(self.first_operator()..=self.last_binary())
    }

    /// Uniformly random 1-ary operator code.
    ///
    /// Only meaningful when the layout holds a 1-ary operator; otherwise a
    /// 2-ary code is returned so callers never see an invalid code.
    pub fn random_unary<R: Rng>(&self, rng: &mut R) -> Code {
        if self.last_operator() > self.last_binary() {
            rng.gen_range(self.last_binary() + 1..=self.last_operator())
        } else {
            self.random_binary(rng)
        }
    }
}

/// Inclusive sampling range for ephemeral constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantRange {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl Default for ConstantRange {
    fn default() -> Self {
        Self { min: -5.0, max: 5.0 }
    }
}

/// Immutable pool of random constants shared by every individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantPool {
    values: Vec<f64>,
}

impl ConstantPool {
    /// Sample `count` constants uniformly from `range`.
    #[must_use]
    pub fn sample<R: Rng>(rng: &mut R, count: usize, range: ConstantRange) -> Self {
        let values = (0..count)
            .map(|_| (range.max - range.min) * rng.r#gen::<f64>() + range.min)
            .collect();
        Self { values }
    }

    /// Build a pool from explicit values.
    #[must_use]
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Value of the constant at `index`.
    #[inline]
    #[must_use]
    pub fn value(&self, index: u8) -> Option<f64> {
        self.values.get(usize::from(index)).copied()
    }

    /// All constants in pool order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of constants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn full_table() -> SymbolTable {
        SymbolTable::new(2, 10, &Operator::ALL).unwrap()
    }

    #[test]
    fn test_code_layout() {
        let table = full_table();
        assert_eq!(table.first_operator(), 12);
        assert_eq!(table.last_binary(), 15);
        assert_eq!(table.last_operator(), 18);

        assert_eq!(table.decode(1), Some(Symbol::Variable(1)));
        assert_eq!(table.decode(2), Some(Symbol::Constant(0)));
        assert_eq!(table.decode(12), Some(Symbol::Operator(Operator::Add)));
        assert_eq!(table.decode(18), Some(Symbol::Operator(Operator::Cos)));
        assert_eq!(table.decode(19), None);
    }

    #[test]
    fn test_encode_decode_agree() {
        let table = full_table();
        for code in 0..=table.last_operator() {
            let symbol = table.decode(code).unwrap();
            assert_eq!(table.encode(symbol), Some(code));
        }
        assert_eq!(table.encode(Symbol::Variable(2)), None);
        assert_eq!(table.encode(Symbol::Constant(10)), None);
    }

    #[test]
    fn test_operator_subset_is_canonicalised() {
        let table = SymbolTable::new(1, 4, &[Operator::Sin, Operator::Mul, Operator::Add, Operator::Mul]).unwrap();
        assert_eq!(table.operators(), &[Operator::Add, Operator::Mul, Operator::Sin]);
        assert_eq!(table.class(5), Some(SymbolClass::Binary));
        assert_eq!(table.class(6), Some(SymbolClass::Binary));
        assert_eq!(table.class(7), Some(SymbolClass::Unary));
        assert_eq!(table.class(8), None);
    }

    #[test]
    fn test_layout_errors() {
        assert_eq!(
            SymbolTable::new(1, 0, &Operator::ALL),
            Err(SymbolError::NoConstants)
        );
        assert_eq!(
            SymbolTable::new(1, 5, &[Operator::Exp, Operator::Sin]),
            Err(SymbolError::NoBinaryOperator)
        );
        assert!(matches!(
            SymbolTable::new(100, 150, &Operator::ALL),
            Err(SymbolError::CodeSpaceExhausted { .. })
        ));
    }

    #[test]
    fn test_division_guard() {
        let cutoffs = Cutoffs::default();
        assert!((Operator::Div.apply_binary(7.5, 0.0, cutoffs) - 7.5).abs() < f64::EPSILON);
        assert!((Operator::Div.apply_binary(7.5, 0.0005, cutoffs) - 7.5).abs() < f64::EPSILON);
        assert!((Operator::Div.apply_binary(9.0, 3.0, cutoffs) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exponent_guard() {
        let cutoffs = Cutoffs::default();
        assert!((Operator::Exp.apply_unary(1000.0, cutoffs) - 1000.0).abs() < f64::EPSILON);
        assert!((Operator::Exp.apply_unary(1.0, cutoffs) - std::f64::consts::E).abs() < 1e-12);
    }

    #[test]
    fn test_trig_uses_degrees() {
        let cutoffs = Cutoffs::default();
        assert!((Operator::Sin.apply_unary(90.0, cutoffs) - 1.0).abs() < 1e-12);
        assert!(Operator::Cos.apply_unary(90.0, cutoffs).abs() < 1e-12);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "SIN is not a 2-ary operator")]
    fn test_binary_application_rejects_unary_operator() {
        let _ = Operator::Sin.apply_binary(1.0, 2.0, Cutoffs::default());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "DIV is not a 1-ary operator")]
    fn test_unary_application_rejects_binary_operator() {
        let _ = Operator::Div.apply_unary(1.0, Cutoffs::default());
    }

    #[test]
    fn test_random_codes_respect_class() {
        let table = full_table();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert_eq!(table.class(table.random_leaf(&mut rng)), Some(SymbolClass::Leaf));
            assert_eq!(table.class(table.random_binary(&mut rng)), Some(SymbolClass::Binary));
            assert_eq!(table.class(table.random_unary(&mut rng)), Some(SymbolClass::Unary));
            assert!(table.class(table.random_operator(&mut rng)).is_some_and(|c| c != SymbolClass::Leaf));
        }
    }

    #[test]
    fn test_constant_pool_within_range() {
        let mut rng = SmallRng::seed_from_u64(99);
        let range = ConstantRange { min: -2.0, max: 3.0 };
        let pool = ConstantPool::sample(&mut rng, 500, range);
        assert_eq!(pool.len(), 500);
        assert!(pool.values().iter().all(|v| (-2.0..=3.0).contains(v)));
        assert_eq!(pool.value(0), pool.values().first().copied());
        assert!(pool.value(200).is_some());
    }
}
