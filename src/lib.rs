// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! tinygp: parallel genetic programming for symbolic regression.
//!
//! This crate evolves small arithmetic expressions that fit a table of
//! numeric fitness cases. It provides:
//! - A compact prefix-order genome encoding with constant folding
//! - A stack interpreter with guarded division and exponentiation
//! - Steady-state evolution spread over a worker pool
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │      CLI (run / validate)           │
//! ├─────────────────────────────────────┤
//! │      Evolution Engine (gp)          │
//! ├─────────────────────────────────────┤
//! │      Dataset (.dat loader)          │
//! └─────────────────────────────────────┘
//! ```

pub mod dataset;
pub mod error;
pub mod gp;

pub use dataset::{DatFile, DatHeader, Dataset, DatasetError};
pub use error::{EvolutionError, SetupError};
