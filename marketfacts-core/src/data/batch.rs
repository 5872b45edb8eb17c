//! Batch merge: concatenation of tabular payloads from different loaders.
//!
//! A [`Batch`] is a transport unit, not a domain entity. Merging never coerces
//! types and never drops rows; a payload that cannot be appended as-is is an
//! error.

use polars::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("cannot merge a {left} payload with a {right} payload")]
    UnsupportedBackend {
        left: &'static str,
        right: &'static str,
    },

    #[error("payload shapes differ: {left} vs {right}")]
    ShapeMismatch { left: String, right: String },

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {row} has {found} values, expected {expected}")]
pub struct RaggedRowsError {
    pub row: usize,
    pub expected: usize,
    pub found: usize,
}

/// Dense row-major matrix of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    width: usize,
    rows: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, RaggedRowsError> {
        let width = rows.first().map_or(0, Vec::len);
        let count = rows.len();
        let mut data = Vec::with_capacity(width * rows.len());
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != width {
                return Err(RaggedRowsError {
                    row,
                    expected: width,
                    found: values.len(),
                });
            }
            data.extend(values);
        }
        Ok(Self {
            width,
            rows: count,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.width;
        self.data.get(start..start + self.width)
    }
}

#[derive(Debug, Clone)]
pub enum Payload {
    Frame(DataFrame),
    Matrix(Matrix),
}

impl Payload {
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Frame(_) => "polars frame",
            Self::Matrix(_) => "matrix",
        }
    }

    pub fn rows(&self) -> usize {
        match self {
            Self::Frame(df) => df.height(),
            Self::Matrix(m) => m.rows(),
        }
    }

    fn append(self, other: Payload) -> Result<Payload, MergeError> {
        match (self, other) {
            (Self::Frame(left), Self::Frame(right)) => {
                let left_shape = frame_shape(&left);
                let right_shape = frame_shape(&right);
                if left_shape != right_shape {
                    return Err(MergeError::ShapeMismatch {
                        left: left_shape,
                        right: right_shape,
                    });
                }
                Ok(Self::Frame(left.vstack(&right)?))
            }
            // A matrix without rows has no meaningful width.
            (Self::Matrix(left), Self::Matrix(right)) if right.rows == 0 => Ok(Self::Matrix(left)),
            (Self::Matrix(left), Self::Matrix(right)) if left.rows == 0 => Ok(Self::Matrix(right)),
            (Self::Matrix(mut left), Self::Matrix(right)) => {
                if left.width != right.width {
                    return Err(MergeError::ShapeMismatch {
                        left: format!("{} columns", left.width),
                        right: format!("{} columns", right.width),
                    });
                }
                left.data.extend(right.data);
                left.rows += right.rows;
                Ok(Self::Matrix(left))
            }
            (left, right) => Err(MergeError::UnsupportedBackend {
                left: left.backend(),
                right: right.backend(),
            }),
        }
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Frame(a), Self::Frame(b)) => a.equals_missing(b),
            (Self::Matrix(a), Self::Matrix(b)) => a == b,
            _ => false,
        }
    }
}

/// `name:dtype` pairs in column order.
fn frame_shape(df: &DataFrame) -> String {
    df.get_column_names()
        .iter()
        .zip(df.dtypes())
        .map(|(name, dtype)| format!("{name}:{dtype}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Where a batch came from. Kept from the left operand on merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchMeta {
    pub source: String,
    pub labels: BTreeMap<String, String>,
}

impl BatchMeta {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub payload: Payload,
    pub meta: BatchMeta,
}

impl Batch {
    pub fn new(payload: Payload, meta: BatchMeta) -> Self {
        Self { payload, meta }
    }

    pub fn frame(df: DataFrame, source: impl Into<String>) -> Self {
        Self::new(Payload::Frame(df), BatchMeta::new(source))
    }

    pub fn matrix(matrix: Matrix, source: impl Into<String>) -> Self {
        Self::new(Payload::Matrix(matrix), BatchMeta::new(source))
    }

    pub fn rows(&self) -> usize {
        self.payload.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    /// Rows of `self` followed by rows of `other`; `self`'s metadata wins.
    pub fn append(self, other: Batch) -> Result<Batch, MergeError> {
        Ok(Batch {
            payload: self.payload.append(other.payload)?,
            meta: self.meta,
        })
    }
}

/// Merge two optional batches. `None` is the identity on either side.
pub fn merge(a: Option<Batch>, b: Option<Batch>) -> Result<Option<Batch>, MergeError> {
    match (a, b) {
        (None, other) | (other, None) => Ok(other),
        (Some(a), Some(b)) => a.append(b).map(Some),
    }
}
