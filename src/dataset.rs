//! Target datasets for symbolic regression.
//!
//! A dataset is a fixed table of fitness cases: each row holds `V` input
//! values followed by one target value. Rows are stored flat, row-major.
//!
//! The `.dat` text format starts with a header line
//!
//! ```text
//! varnumber constantcount minrandom maxrandom fitnesscases
//! ```
//!
//! followed by `fitnesscases` lines of `varnumber + 1` whitespace-separated
//! numbers. Blank lines are ignored.

use crate::gp::ConstantRange;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading or building a dataset. All are fatal at setup.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The header line is missing.
    #[error("missing header line")]
    MissingHeader,
    /// The header does not hold five valid fields.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// A token is not a number.
    #[error("line {line}: cannot parse {token:?} as a number")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// Offending token.
        token: String,
    },
    /// A row has the wrong number of values.
    #[error("line {line}: expected {expected} values, found {found}")]
    RowWidth {
        /// 1-based line number, or row index for in-memory rows.
        line: usize,
        /// Values per row (`V + 1`).
        expected: usize,
        /// Values present.
        found: usize,
    },
    /// The number of rows disagrees with the header.
    #[error("header announces {expected} fitness cases, found {found}")]
    RowCount {
        /// Cases announced by the header.
        expected: usize,
        /// Rows present.
        found: usize,
    },
    /// No rows at all.
    #[error("dataset has no fitness cases")]
    Empty,
}

/// An immutable table of fitness cases.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    variables: usize,
    values: Vec<f64>,
}

impl Dataset {
    /// Build a dataset from rows of `variables` inputs plus one target.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no rows or any row has the wrong width.
    pub fn from_rows<I, R>(variables: usize, rows: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[f64]>,
    {
        let width = variables.saturating_add(1);
        let mut values = Vec::new();
        for (index, row) in rows.into_iter().enumerate() {
            let row = row.as_ref();
            if row.len() != width {
                return Err(DatasetError::RowWidth {
                    line: index + 1,
                    expected: width,
                    found: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        if values.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(Self { variables, values })
    }

    /// Sample `target` at each of `inputs` to build a one-variable dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Empty`] if `inputs` is empty.
    pub fn from_fn(inputs: impl IntoIterator<Item = f64>, target: impl Fn(f64) -> f64) -> Result<Self, DatasetError> {
        Self::from_rows(1, inputs.into_iter().map(|x| [x, target(x)]))
    }

    /// Number of input variables (`V`).
    #[must_use]
    pub fn variables(&self) -> usize {
        self.variables
    }

    /// Number of fitness cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len() / (self.variables + 1)
    }

    /// Whether the dataset holds no cases. Never true for a constructed
    /// dataset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Inputs and target of row `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<(&[f64], f64)> {
        let width = self.variables + 1;
        let start = index.checked_mul(width)?;
        let row = self.values.get(start..start.checked_add(width)?)?;
        let (inputs, target) = row.split_at(self.variables);
        Some((inputs, target[0]))
    }

    /// Rows as `(inputs, target)` pairs.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = (&[f64], f64)> + '_ {
        self.values.chunks_exact(self.variables + 1).map(|row| {
            let (inputs, target) = row.split_at(self.variables);
            (inputs, target[0])
        })
    }
}

/// Parameters announced by a `.dat` header line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatHeader {
    /// Input variables per row.
    pub variables: usize,
    /// Suggested ephemeral constant count.
    pub constants: usize,
    /// Suggested constant sampling range.
    pub range: ConstantRange,
    /// Number of rows that follow.
    pub cases: usize,
}

/// A parsed `.dat` file.
#[derive(Debug, Clone, PartialEq)]
pub struct DatFile {
    /// Header fields.
    pub header: DatHeader,
    /// Fitness cases.
    pub dataset: Dataset,
}

impl DatFile {
    /// Parse `.dat` text.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing or invalid header, unparsable numbers,
    /// rows of the wrong width, or a row count that disagrees with the header.
    pub fn parse(text: &str) -> Result<Self, DatasetError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line))
            .filter(|(_, line)| !line.trim().is_empty());

        let (header_line, header) = lines.next().ok_or(DatasetError::MissingHeader)?;
        let header = parse_header(header, header_line)?;

        let width = header.variables.saturating_add(1);
        let mut rows = Vec::new();
        for (line, text) in lines {
            let row = parse_numbers(text, line)?;
            if row.len() != width {
                return Err(DatasetError::RowWidth {
                    line,
                    expected: width,
                    found: row.len(),
                });
            }
            rows.push(row);
        }

        if rows.len() != header.cases {
            return Err(DatasetError::RowCount {
                expected: header.cases,
                found: rows.len(),
            });
        }
        let dataset = Dataset::from_rows(header.variables, rows)?;
        Ok(Self { header, dataset })
    }

    /// Read and parse a `.dat` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails to parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = Self::parse(&text)?;
        tracing::debug!(
            path = %path.display(),
            variables = file.header.variables,
            cases = file.header.cases,
            "loaded dataset"
        );
        Ok(file)
    }
}

fn parse_numbers(text: &str, line: usize) -> Result<Vec<f64>, DatasetError> {
    text.split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| DatasetError::InvalidNumber {
                line,
                token: token.to_string(),
            })
        })
        .collect()
}

fn parse_header(text: &str, line: usize) -> Result<DatHeader, DatasetError> {
    let fields = parse_numbers(text, line)?;
    let [variables, constants, min, max, cases] = fields[..] else {
        return Err(DatasetError::InvalidHeader(format!(
            "expected 5 fields, found {}",
            fields.len()
        )));
    };

    Ok(DatHeader {
        variables: header_count("varnumber", variables)?,
        constants: header_count("constantcount", constants)?,
        range: ConstantRange { min, max },
        cases: header_count("fitnesscases", cases)?,
    })
}

// Counts are written as floats by some generators; only integral values pass
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn header_count(name: &str, value: f64) -> Result<usize, DatasetError> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Ok(value as usize)
    } else {
        Err(DatasetError::InvalidHeader(format!(
            "{name} must be a non-negative integer, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1 100 -5 5 3\n0 2\n1 3\n\n2 6\n";

    #[test]
    fn test_parse_dat() {
        let file = DatFile::parse(SAMPLE).unwrap();
        assert_eq!(file.header.variables, 1);
        assert_eq!(file.header.constants, 100);
        assert_eq!(file.header.cases, 3);
        assert_eq!(file.dataset.len(), 3);

        let (inputs, target) = file.dataset.row(2).unwrap();
        assert_eq!(inputs.len(), 1);
        assert!((inputs[0] - 2.0).abs() < f64::EPSILON);
        assert!((target - 6.0).abs() < f64::EPSILON);
        assert!(file.dataset.row(3).is_none());
        assert!(file.dataset.row(usize::MAX).is_none());
        assert!(file.dataset.row(usize::MAX / 2 + 1).is_none());
    }

    #[test]
    fn test_header_errors() {
        assert!(matches!(DatFile::parse(""), Err(DatasetError::MissingHeader)));
        assert!(matches!(DatFile::parse("1 2 3\n"), Err(DatasetError::InvalidHeader(_))));
        assert!(matches!(
            DatFile::parse("1.5 100 -5 5 1\n0 1\n"),
            Err(DatasetError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_row_errors() {
        assert!(matches!(
            DatFile::parse("1 10 -1 1 2\n0 1\n0 1 2\n"),
            Err(DatasetError::RowWidth { line: 3, expected: 2, found: 3 })
        ));
        assert!(matches!(
            DatFile::parse("1 10 -1 1 3\n0 1\n1 2\n"),
            Err(DatasetError::RowCount { expected: 3, found: 2 })
        ));
        assert!(matches!(
            DatFile::parse("1 10 -1 1 1\n0 abc\n"),
            Err(DatasetError::InvalidNumber { line: 2, .. })
        ));
        assert!(matches!(DatFile::parse("1 10 -1 1 0\n"), Err(DatasetError::Empty)));
    }

    #[test]
    fn test_from_rows() {
        let dataset = Dataset::from_rows(2, [[1.0, 2.0, 3.0], [4.0, 5.0, 9.0]]).unwrap();
        assert_eq!(dataset.variables(), 2);
        let targets: Vec<f64> = dataset.rows().map(|(_, t)| t).collect();
        assert_eq!(targets.len(), 2);
        assert!((targets[1] - 9.0).abs() < f64::EPSILON);

        assert!(matches!(
            Dataset::from_rows(2, [vec![1.0, 2.0]]),
            Err(DatasetError::RowWidth { line: 1, .. })
        ));
        assert!(matches!(
            Dataset::from_rows(1, Vec::<Vec<f64>>::new()),
            Err(DatasetError::Empty)
        ));
    }

    #[test]
    fn test_from_fn() {
        let dataset = Dataset::from_fn((0..=10).map(f64::from), |x| x * x + 2.0).unwrap();
        assert_eq!(dataset.len(), 11);
        let (inputs, target) = dataset.row(10).unwrap();
        assert!((inputs[0] - 10.0).abs() < f64::EPSILON);
        assert!((target - 102.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_file() {
        let result = DatFile::load("/nonexistent/problem.dat");
        assert!(matches!(result, Err(DatasetError::Io { .. })));
    }
}
