//! Projection of validated facts into polars frames.
//!
//! Frames are the tabular payload of a [`Batch`](super::batch::Batch). Each
//! fact kind has one canonical schema; frames built here always satisfy it.

use polars::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{IndicatorFact, PriceBarFact};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("{field} value {value} does not fit in f64")]
    NotRepresentable { field: &'static str, value: String },

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

fn timestamp_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

/// Column layout for price bar frames.
pub struct PriceFrameSchema;

impl PriceFrameSchema {
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new("code".into(), DataType::String),
            Field::new("interval".into(), DataType::String),
            Field::new("timestamp".into(), timestamp_dtype()),
            Field::new("open".into(), DataType::Float64),
            Field::new("high".into(), DataType::Float64),
            Field::new("low".into(), DataType::Float64),
            Field::new("close".into(), DataType::Float64),
            Field::new("volume".into(), DataType::Float64),
        ])
    }

    pub fn validate(df: &DataFrame) -> Result<(), FrameError> {
        validate_against(df, &Self::schema())
    }
}

/// Column layout for indicator frames.
pub struct IndicatorFrameSchema;

impl IndicatorFrameSchema {
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new("entity".into(), DataType::String),
            Field::new("name".into(), DataType::String),
            Field::new("timestamp".into(), timestamp_dtype()),
            Field::new("value".into(), DataType::Float64),
        ])
    }

    pub fn validate(df: &DataFrame) -> Result<(), FrameError> {
        validate_against(df, &Self::schema())
    }
}

fn validate_against(df: &DataFrame, expected: &Schema) -> Result<(), FrameError> {
    let actual = df.schema();
    for field in expected.iter_fields() {
        let dtype = actual
            .get(field.name())
            .ok_or_else(|| FrameError::MissingColumn(field.name().to_string()))?;
        if dtype != field.dtype() {
            return Err(FrameError::TypeMismatch {
                column: field.name().to_string(),
                expected: field.dtype().clone(),
                actual: dtype.clone(),
            });
        }
    }
    Ok(())
}

/// Integers up to 2^53 convert to `f64` exactly.
const MAX_EXACT_VOLUME: u64 = 1 << 53;

fn to_f64(field: &'static str, value: Decimal) -> Result<f64, FrameError> {
    value.to_f64().ok_or_else(|| FrameError::NotRepresentable {
        field,
        value: value.to_string(),
    })
}

fn volume_f64(volume: u64) -> Result<f64, FrameError> {
    if volume > MAX_EXACT_VOLUME {
        return Err(FrameError::NotRepresentable {
            field: "volume",
            value: volume.to_string(),
        });
    }
    Ok(volume as f64)
}

fn optional_f64(field: &'static str, value: Option<Decimal>) -> Result<Option<f64>, FrameError> {
    value.map(|v| to_f64(field, v)).transpose()
}

fn timestamp_column(millis: Vec<i64>) -> Result<Column, FrameError> {
    Ok(Column::new("timestamp".into(), millis).cast(&timestamp_dtype())?)
}

/// Build a frame from price bars, preserving their order.
///
/// Prices become the nearest `f64`, so digits past its precision are lost;
/// the validated facts stay the exact record. Volume is checked instead:
/// anything above 2^53 fails with [`FrameError::NotRepresentable`]. Missing
/// open/high/low/volume become nulls.
pub fn prices_to_frame(bars: &[PriceBarFact]) -> Result<DataFrame, FrameError> {
    let n = bars.len();
    let mut codes = Vec::with_capacity(n);
    let mut intervals = Vec::with_capacity(n);
    let mut millis = Vec::with_capacity(n);
    let mut opens = Vec::with_capacity(n);
    let mut highs = Vec::with_capacity(n);
    let mut lows = Vec::with_capacity(n);
    let mut closes = Vec::with_capacity(n);
    let mut volumes: Vec<Option<f64>> = Vec::with_capacity(n);

    for bar in bars {
        codes.push(bar.code());
        intervals.push(bar.interval().label());
        millis.push(bar.ts().timestamp_millis());
        opens.push(optional_f64("open", bar.open())?);
        highs.push(optional_f64("high", bar.high())?);
        lows.push(optional_f64("low", bar.low())?);
        closes.push(to_f64("close", bar.close())?);
        volumes.push(bar.volume().map(volume_f64).transpose()?);
    }

    let df = DataFrame::new(vec![
        Column::new("code".into(), codes),
        Column::new("interval".into(), intervals),
        timestamp_column(millis)?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])?;
    Ok(df)
}

/// Build a frame from indicator observations, preserving their order.
pub fn indicators_to_frame(facts: &[IndicatorFact]) -> Result<DataFrame, FrameError> {
    let entities: Vec<&str> = facts.iter().map(|f| f.entity()).collect();
    let names: Vec<&str> = facts.iter().map(|f| f.name()).collect();
    let millis: Vec<i64> = facts.iter().map(|f| f.ts().timestamp_millis()).collect();
    let values = facts
        .iter()
        .map(|f| to_f64("value", f.value()))
        .collect::<Result<Vec<_>, _>>()?;

    let df = DataFrame::new(vec![
        Column::new("entity".into(), entities),
        Column::new("name".into(), names),
        timestamp_column(millis)?,
        Column::new("value".into(), values),
    ])?;
    Ok(df)
}
