//! Domain types: self-validating facts and the aggregates that own them.

pub mod asset;
pub mod economic_unit;
pub mod error;
pub mod indicator;
pub mod input;
pub mod interval;
pub mod listing;
pub mod price;

pub use asset::Asset;
pub use economic_unit::{validate_country_code, EconomicUnit, EconomicUnitType};
pub use error::ValidationError;
pub use indicator::{IndicatorFact, RawIndicator};
pub use input::{DecimalInput, TimestampInput, TimestampPrecision};
pub use interval::Interval;
pub use listing::{validate_currency, InstrumentType, Listing};
pub use price::{PriceBarFact, RawPriceBar};
