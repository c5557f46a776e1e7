use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Canonical provider identifiers used for cache keys and provenance tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    TwelveData,
    AlphaVantage,
    Yahoo,
    Finnhub,
    /// Demo data produced locally when every upstream failed.
    Simulated,
}

impl ProviderId {
    /// Upstream providers in default quote priority order.
    pub const UPSTREAM: [Self; 4] = [
        Self::TwelveData,
        Self::AlphaVantage,
        Self::Yahoo,
        Self::Finnhub,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TwelveData => "twelve_data",
            Self::AlphaVantage => "alpha_vantage",
            Self::Yahoo => "yahoo",
            Self::Finnhub => "finnhub",
            Self::Simulated => "simulated",
        }
    }

    /// Human-readable tag embedded in `Quote::last_updated`.
    pub const fn label(self) -> &'static str {
        match self {
            Self::TwelveData => "Twelve Data",
            Self::AlphaVantage => "Alpha Vantage",
            Self::Yahoo => "Yahoo Finance",
            Self::Finnhub => "Finnhub",
            Self::Simulated => "Simulated Live",
        }
    }

    pub const fn is_upstream(self) -> bool {
        !matches!(self, Self::Simulated)
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_simulated_is_not_upstream() {
        assert!(ProviderId::UPSTREAM.iter().all(|id| id.is_upstream()));
        assert!(!ProviderId::Simulated.is_upstream());
    }

    #[test]
    fn wire_names_match_serde() {
        for id in ProviderId::UPSTREAM.into_iter().chain([ProviderId::Simulated]) {
            let json = serde_json::to_value(id).expect("serializes");
            assert_eq!(json, id.as_str());
        }
    }
}
