use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::input::normalize_identity;

const CURRENCY_RULE: &str = "three ASCII letters (ISO-4217)";
const FX_RULE: &str = "BASE/QUOTE with three-letter codes";
const NON_FX_RULE: &str = "no '/' outside FX listings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentType {
    Equity,
    Bond,
    Fx,
    Other,
}

/// A tradable instrument at a venue: `PETR4.SA` on `B3` in `BRL`, or
/// `BRL/USD` as an FX pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Listing {
    symbol: String,
    exchange: String,
    currency: String,
    instrument_type: Option<InstrumentType>,
}

impl Listing {
    pub fn new(
        symbol: &str,
        exchange: &str,
        currency: &str,
        instrument_type: Option<InstrumentType>,
    ) -> Result<Self, ValidationError> {
        let exchange = normalize_identity("exchange", exchange)?;
        let currency = validate_currency("currency", currency)?;
        let symbol = normalize_identity("symbol", symbol)?;

        if instrument_type == Some(InstrumentType::Fx) {
            if split_fx(&symbol).is_none() {
                return Err(ValidationError::Pattern {
                    field: "symbol",
                    value: symbol,
                    rule: FX_RULE,
                });
            }
        } else if symbol.contains('/') {
            return Err(ValidationError::Pattern {
                field: "symbol",
                value: symbol,
                rule: NON_FX_RULE,
            });
        }

        Ok(Self {
            symbol,
            exchange,
            currency,
            instrument_type,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn instrument_type(&self) -> Option<InstrumentType> {
        self.instrument_type
    }

    pub fn is_fx(&self) -> bool {
        self.instrument_type == Some(InstrumentType::Fx)
    }

    /// `(base, quote)` for FX listings, `None` otherwise.
    pub fn fx_currencies(&self) -> Option<(&str, &str)> {
        if self.is_fx() {
            split_fx(&self.symbol)
        } else {
            None
        }
    }
}

/// Trim, uppercase and check a three-letter currency code.
pub fn validate_currency(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let code = normalize_identity(field, raw)?;
    if is_currency_code(&code) {
        Ok(code)
    } else {
        Err(ValidationError::Pattern {
            field,
            value: raw.to_string(),
            rule: CURRENCY_RULE,
        })
    }
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

fn split_fx(symbol: &str) -> Option<(&str, &str)> {
    let (base, quote) = symbol.split_once('/')?;
    (is_currency_code(base) && is_currency_code(quote)).then_some((base, quote))
}
