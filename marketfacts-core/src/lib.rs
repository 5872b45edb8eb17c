//! marketfacts core: validated market facts, aggregates, repository contracts.
//!
//! - Fact value objects (price bars, indicators, listings) that validate on
//!   construction and cannot exist in an invalid state
//! - Aggregate roots (assets, economic units) owning shared fact sequences
//! - Read-repository traits (prices, indicators, units, listings) and the
//!   time-window query model
//! - Backend-agnostic batch merge over polars frames and dense matrices
//! - Flat-file CSV store with a metadata sidecar

pub mod data;
pub mod domain;
