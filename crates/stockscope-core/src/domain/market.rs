use serde::{Deserialize, Serialize};
use time::macros::{format_description, offset};
use time::{OffsetDateTime, UtcOffset, Weekday};

use crate::ProviderId;

/// India Standard Time, the wall clock used for session status and provenance labels.
pub const IST: UtcOffset = offset!(+5:30);

/// US equity session status as seen from IST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketStatus {
    Open,
    Closed,
    PreMarket,
    AfterHours,
}

impl MarketStatus {
    pub fn at(now: OffsetDateTime) -> Self {
        let local = now.to_offset(IST);
        if is_weekend(local.weekday()) {
            return Self::Closed;
        }

        match local.hour() {
            21..=23 | 0..=3 => Self::Open,
            19..=20 => Self::PreMarket,
            4..=7 => Self::AfterHours,
            _ => Self::Closed,
        }
    }

    pub fn now() -> Self {
        Self::at(OffsetDateTime::now_utc())
    }
}

/// True while the US regular session (21:00-03:59 IST, Mon-Fri) is trading.
pub fn is_us_session(now: OffsetDateTime) -> bool {
    let local = now.to_offset(IST);
    let hour = local.hour();
    (hour >= 21 || hour < 4) && !is_weekend(local.weekday())
}

/// `"2026-10-19 21:15:02 IST (Twelve Data)"`
pub fn provenance_label(as_of: OffsetDateTime, source: ProviderId) -> String {
    let local = as_of.to_offset(IST);
    let stamp = local
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| local.date().to_string());
    format!("{stamp} IST ({})", source.label())
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Saturday | Weekday::Sunday)
}
