use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

use super::market::{provenance_label, MarketStatus};
use crate::{ProviderId, Symbol, ValidationError};

/// Signed day-over-day change in percent, rendered as `"+1.24%"`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct ChangePercent(f64);

impl ChangePercent {
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                field: "change_percent",
            });
        }
        let rounded = round2(value);
        // avoid rendering "-0.00%"
        Ok(Self(if rounded == 0.0 { 0.0 } else { rounded }))
    }

    /// Percent move from `previous` to `current`; zero when there is no usable base.
    pub fn between(current: f64, previous: f64) -> Self {
        if previous > 0.0 && current.is_finite() && previous.is_finite() {
            Self::new((current - previous) / previous * 100.0).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Accepts provider spellings such as `"1.2400%"`, `"-0.58%"` or `"+3"`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
        let value = number
            .parse::<f64>()
            .map_err(|_| ValidationError::InvalidChangePercent {
                value: input.to_owned(),
            })?;
        Self::new(value)
    }

    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Display for ChangePercent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+.2}%", self.0)
    }
}

impl Serialize for ChangePercent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChangePercent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Point-in-time snapshot for one ticker.
///
/// Built only through [`QuoteDraft::build`], which enforces the price
/// invariants; a newer fetch supersedes a quote rather than updating it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: Symbol,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: ChangePercent,
    pub volume: u64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub previous_close: f64,
    pub last_updated: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_status: Option<MarketStatus>,
    #[serde(skip)]
    pub source: ProviderId,
}

impl Quote {
    pub fn is_simulated(&self) -> bool {
        !self.source.is_upstream()
    }
}

/// Unvalidated quote fields as read from a provider or the demo generator.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteDraft {
    pub symbol: Symbol,
    pub price: f64,
    pub change: f64,
    pub change_percent: ChangePercent,
    pub volume: u64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub previous_close: f64,
    pub as_of: OffsetDateTime,
    pub market_status: Option<MarketStatus>,
    pub source: ProviderId,
}

impl QuoteDraft {
    pub fn build(self) -> Result<Quote, ValidationError> {
        validate_non_negative("price", self.price)?;
        validate_non_negative("high", self.high)?;
        validate_non_negative("low", self.low)?;
        validate_non_negative("open", self.open)?;
        validate_non_negative("previous_close", self.previous_close)?;
        if !self.change.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "change" });
        }
        if self.high < self.low {
            return Err(ValidationError::InvalidPriceRange);
        }

        Ok(Quote {
            name: company_name(&self.symbol),
            last_updated: provenance_label(self.as_of, self.source),
            symbol: self.symbol,
            price: round2(self.price),
            change: round2(self.change),
            change_percent: self.change_percent,
            volume: self.volume,
            high: round2(self.high),
            low: round2(self.low),
            open: round2(self.open),
            previous_close: round2(self.previous_close),
            market_status: self.market_status,
            source: self.source,
        })
    }
}

/// Display name for well-known tickers, `"<SYMBOL> Inc."` otherwise.
pub fn company_name(symbol: &Symbol) -> String {
    let known = match symbol.as_str() {
        "AAPL" => "Apple Inc.",
        "GOOGL" => "Alphabet Inc.",
        "MSFT" => "Microsoft Corporation",
        "AMZN" => "Amazon.com Inc.",
        "TSLA" => "Tesla Inc.",
        "META" => "Meta Platforms Inc.",
        "NVDA" => "NVIDIA Corporation",
        "NFLX" => "Netflix Inc.",
        "AMD" => "Advanced Micro Devices",
        "INTC" => "Intel Corporation",
        other => return format!("{other} Inc."),
    };
    known.to_owned()
}

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
