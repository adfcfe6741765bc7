//! The PKG identifier scheme.
//!
//! Every graph node is keyed by a `PkgId`: three single-digit codes for
//! timeframe, periodicity and currency, a hierarchy layer, and a free-form
//! sequence token. Textual form: `"{tf}{period}{ccy}^{layer}-{sequence}"`,
//! e.g. `391^2-126` = M15, no periodicity, USDJPY, layer 2, sequence 126.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bar granularity of the data a node is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub fn code(self) -> u8 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 2,
            Timeframe::M15 => 3,
            Timeframe::M30 => 4,
            Timeframe::H1 => 5,
            Timeframe::H4 => 6,
            Timeframe::D1 => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Timeframe::M1,
            2 => Timeframe::M5,
            3 => Timeframe::M15,
            4 => Timeframe::M30,
            5 => Timeframe::H1,
            6 => Timeframe::H4,
            7 => Timeframe::D1,
            _ => return None,
        })
    }
}

/// Cyclic periodicity of a node. `Common` (code 9) means no periodicity;
/// the numbered variants are minute cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    P10,
    P15,
    P30,
    P45,
    P60,
    P90,
    P180,
    Common,
}

impl Period {
    pub fn code(self) -> u8 {
        match self {
            Period::P10 => 1,
            Period::P15 => 2,
            Period::P30 => 3,
            Period::P45 => 4,
            Period::P60 => 5,
            Period::P90 => 6,
            Period::P180 => 7,
            Period::Common => 9,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Period::P10,
            2 => Period::P15,
            3 => Period::P30,
            4 => Period::P45,
            5 => Period::P60,
            6 => Period::P90,
            7 => Period::P180,
            9 => Period::Common,
            _ => return None,
        })
    }
}

/// Traded currency pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    UsdJpy,
    EurUsd,
    EurJpy,
    GbpJpy,
    AudJpy,
}

impl Currency {
    pub fn code(self) -> u8 {
        match self {
            Currency::UsdJpy => 1,
            Currency::EurUsd => 2,
            Currency::EurJpy => 3,
            Currency::GbpJpy => 4,
            Currency::AudJpy => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Currency::UsdJpy,
            2 => Currency::EurUsd,
            3 => Currency::EurJpy,
            4 => Currency::GbpJpy,
            5 => Currency::AudJpy,
            _ => return None,
        })
    }

    /// Pip size of the quote: 0.01 for JPY quotes, 0.0001 otherwise.
    pub fn pip(self) -> f64 {
        match self {
            Currency::UsdJpy | Currency::EurJpy | Currency::GbpJpy | Currency::AudJpy => 0.01,
            Currency::EurUsd => 0.0001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("malformed identifier '{input}': expected {{tf}}{{period}}{{ccy}}^{{layer}}-{{sequence}}")]
    BadShape { input: String },
    #[error("unknown timeframe code {code} in '{input}'")]
    UnknownTimeframe { code: u8, input: String },
    #[error("unknown period code {code} in '{input}'")]
    UnknownPeriod { code: u8, input: String },
    #[error("unknown currency code {code} in '{input}'")]
    UnknownCurrency { code: u8, input: String },
    #[error("sequence '{sequence}' must be non-empty and free of '^' and '-'")]
    BadSequence { sequence: String },
}

/// Structured node identifier. Immutable once constructed; equality and
/// hashing cover the full 5-tuple so it can key the node table directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PkgId {
    pub timeframe: Timeframe,
    pub period: Period,
    pub currency: Currency,
    pub layer: u8,
    pub sequence: String,
}

impl PkgId {
    pub fn new(
        timeframe: Timeframe,
        period: Period,
        currency: Currency,
        layer: u8,
        sequence: impl Into<String>,
    ) -> Result<Self, IdError> {
        let sequence = sequence.into();
        if sequence.is_empty() || sequence.contains('^') || sequence.contains('-') {
            return Err(IdError::BadSequence { sequence });
        }
        Ok(Self { timeframe, period, currency, layer, sequence })
    }

    /// Key for a layer-0 raw-data leaf.
    pub fn raw(timeframe: Timeframe, period: Period, currency: Currency, symbol: impl Into<String>) -> Result<Self, IdError> {
        Self::new(timeframe, period, currency, 0, symbol)
    }

    /// Lenient parse used by the bulk-import path: unknown digit codes fall
    /// back to M15 / Common / USDJPY instead of failing. Shape errors still
    /// fail. Interactive callers should use `FromStr`, which is strict.
    pub fn parse_lenient(s: &str) -> Result<Self, IdError> {
        let (tf, period, ccy, layer, sequence) = split(s)?;
        Ok(Self {
            timeframe: Timeframe::from_code(tf).unwrap_or(Timeframe::M15),
            period: Period::from_code(period).unwrap_or(Period::Common),
            currency: Currency::from_code(ccy).unwrap_or(Currency::UsdJpy),
            layer,
            sequence,
        })
    }
}

impl fmt::Display for PkgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}^{}-{}",
            self.timeframe.code(),
            self.period.code(),
            self.currency.code(),
            self.layer,
            self.sequence
        )
    }
}

impl FromStr for PkgId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, IdError> {
        let (tf, period, ccy, layer, sequence) = split(s)?;
        let timeframe = Timeframe::from_code(tf)
            .ok_or_else(|| IdError::UnknownTimeframe { code: tf, input: s.to_string() })?;
        let period = Period::from_code(period)
            .ok_or_else(|| IdError::UnknownPeriod { code: period, input: s.to_string() })?;
        let currency = Currency::from_code(ccy)
            .ok_or_else(|| IdError::UnknownCurrency { code: ccy, input: s.to_string() })?;
        Ok(Self { timeframe, period, currency, layer, sequence })
    }
}

/// Splits `"{d}{d}{d}^{layer}-{sequence}"` into its raw parts.
fn split(s: &str) -> Result<(u8, u8, u8, u8, String), IdError> {
    let bad = || IdError::BadShape { input: s.to_string() };

    let (head, rest) = s.split_once('^').ok_or_else(bad)?;
    let (layer_str, sequence) = rest.split_once('-').ok_or_else(bad)?;

    let digits: Vec<u8> = head.chars().map(|c| c.to_digit(10).map(|d| d as u8)).collect::<Option<_>>().ok_or_else(bad)?;
    if digits.len() != 3 {
        return Err(bad());
    }
    let layer: u8 = layer_str.parse().map_err(|_| bad())?;

    if sequence.is_empty() || sequence.contains('^') || sequence.contains('-') {
        return Err(IdError::BadSequence { sequence: sequence.to_string() });
    }

    Ok((digits[0], digits[1], digits[2], layer, sequence.to_string()))
}
