//! Stack-machine interpreter for compacted programs.
//!
//! Programs are stored in prefix order, so the interpreter scans from the last
//! live slot back to the first: leaves push, operators pop their operands and
//! push the result. The most recently pushed value is always the leftmost
//! operand of the operator being applied.

use crate::gp::compact::{LITERAL, Program};
use crate::gp::genome::Genome;
use crate::gp::symbol::{Arity, Code, ConstantPool, Cutoffs, Symbol, SymbolTable};
use thiserror::Error;

/// Evaluation failures. Each one means a genome was corrupted by a defective
/// operator; none is recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A code outside the symbol table or constant pool.
    #[error("unknown symbol code {0}")]
    UnknownSymbol(Code),
    /// An operator found too few operands on the stack.
    #[error("operand stack underflow")]
    StackUnderflow,
    /// The scan finished with other than exactly one value on the stack.
    #[error("program left {0} values on the stack")]
    UnbalancedStack(usize),
    /// The binding vector is shorter than the program's variable references.
    #[error("no binding for variable {0}")]
    UnboundVariable(usize),
}

/// Reusable interpreter holding the operand stack.
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    stack: Vec<f64>,
}

impl Interpreter {
    /// Create an interpreter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `program` with `variables` bound to the input slots.
    ///
    /// # Errors
    ///
    /// Returns an error if the program is malformed or references a variable
    /// beyond `variables`.
    pub fn run(
        &mut self,
        program: &Program,
        variables: &[f64],
        table: &SymbolTable,
        cutoffs: Cutoffs,
    ) -> Result<f64, EvalError> {
        let stack = &mut self.stack;
        stack.clear();

        let var_tags = table.variables();
        for (&tag, &num) in program.ops().iter().zip(program.nums()).rev() {
            if tag == LITERAL {
                stack.push(num);
            } else if usize::from(tag) <= var_tags {
                let index = usize::from(tag) - 1;
                let value = variables.get(index).ok_or(EvalError::UnboundVariable(index))?;
                stack.push(*value);
            } else {
                let op = table.operator(tag).ok_or(EvalError::UnknownSymbol(tag))?;
                let first = stack.pop().ok_or(EvalError::StackUnderflow)?;
                let result = match op.arity() {
                    Arity::Binary => {
                        let second = stack.pop().ok_or(EvalError::StackUnderflow)?;
                        op.apply_binary(first, second, cutoffs)
                    }
                    Arity::Unary => op.apply_unary(first, cutoffs),
                };
                stack.push(result);
            }
        }

        match stack.as_slice() {
            [value] => Ok(*value),
            other => Err(EvalError::UnbalancedStack(other.len())),
        }
    }
}

/// Evaluate a raw genome directly by recursive descent, without folding.
///
/// This is the reference semantics the compacted path must reproduce.
///
/// # Errors
///
/// Returns an error if the genome is malformed.
pub fn evaluate_tree(
    genome: &Genome,
    variables: &[f64],
    table: &SymbolTable,
    pool: &ConstantPool,
    cutoffs: Cutoffs,
) -> Result<f64, EvalError> {
    let mut cursor = 0;
    let value = descend(genome.codes(), &mut cursor, variables, table, pool, cutoffs)?;
    if cursor == genome.len() {
        Ok(value)
    } else {
        Err(EvalError::UnbalancedStack(genome.len() - cursor))
    }
}

fn descend(
    codes: &[Code],
    cursor: &mut usize,
    variables: &[f64],
    table: &SymbolTable,
    pool: &ConstantPool,
    cutoffs: Cutoffs,
) -> Result<f64, EvalError> {
    let code = *codes.get(*cursor).ok_or(EvalError::StackUnderflow)?;
    *cursor += 1;

    match table.decode(code).ok_or(EvalError::UnknownSymbol(code))? {
        Symbol::Variable(index) => variables
            .get(usize::from(index))
            .copied()
            .ok_or(EvalError::UnboundVariable(usize::from(index))),
        Symbol::Constant(index) => pool.value(index).ok_or(EvalError::UnknownSymbol(code)),
        Symbol::Operator(op) => match op.arity() {
            Arity::Binary => {
                let first = descend(codes, cursor, variables, table, pool, cutoffs)?;
                let second = descend(codes, cursor, variables, table, pool, cutoffs)?;
                Ok(op.apply_binary(first, second, cutoffs))
            }
            Arity::Unary => {
                let x = descend(codes, cursor, variables, table, pool, cutoffs)?;
                Ok(op.apply_unary(x, cutoffs))
            }
        },
    }
}
