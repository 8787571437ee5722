//! Stored FX rates and the resolved-rate view handed to callers.

use crate::core::currency::{CurrencyId, round_rate};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Provenance of a rate row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RateSource {
    Ecb,
    Identity,
    Other(String),
}

impl RateSource {
    pub fn as_str(&self) -> &str {
        match self {
            RateSource::Ecb => "ecb",
            RateSource::Identity => "identity",
            RateSource::Other(name) => name,
        }
    }
}

impl From<&str> for RateSource {
    fn from(s: &str) -> Self {
        match s {
            "ecb" => RateSource::Ecb,
            "identity" => RateSource::Identity,
            other => RateSource::Other(other.to_string()),
        }
    }
}

impl From<String> for RateSource {
    fn from(s: String) -> Self {
        RateSource::from(s.as_str())
    }
}

impl From<RateSource> for String {
    fn from(source: RateSource) -> Self {
        source.as_str().to_string()
    }
}

impl Display for RateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One persisted rate for an ordered currency pair on a calendar day.
///
/// `(from_currency, to_currency, date)` is unique. A replicated row always
/// carries the strictly earlier date it was copied from; a fetched row never
/// does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxRate {
    pub from_currency: CurrencyId,
    pub to_currency: CurrencyId,
    pub date: NaiveDate,
    pub rate: Decimal,
    pub source: RateSource,
    pub is_replicated: bool,
    pub replicated_from_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FxRate {
    /// A row sourced straight from a rate authority.
    pub fn fetched(
        from_currency: CurrencyId,
        to_currency: CurrencyId,
        date: NaiveDate,
        rate: Decimal,
        source: RateSource,
    ) -> Self {
        let now = Utc::now();
        Self {
            from_currency,
            to_currency,
            date,
            rate: round_rate(rate),
            source,
            is_replicated: false,
            replicated_from_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A copy of `source_row` carried forward to `date`.
    pub fn replicated(source_row: &FxRate, date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            from_currency: source_row.from_currency,
            to_currency: source_row.to_currency,
            date,
            rate: source_row.rate,
            source: source_row.source.clone(),
            is_replicated: true,
            replicated_from_date: Some(source_row.date),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_valid_replication(&self) -> bool {
        match (self.is_replicated, self.replicated_from_date) {
            (true, Some(from)) => from < self.date,
            (false, None) => true,
            _ => false,
        }
    }
}

/// The answer to "what rate applies for this pair on this day".
///
/// Identity rates are synthesized on demand and have no row behind them, so
/// they are a separate variant rather than a fake `FxRate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRate {
    Persisted(FxRate),
    Identity { currency: String, date: NaiveDate },
}

impl ResolvedRate {
    pub fn value(&self) -> Decimal {
        match self {
            ResolvedRate::Persisted(rate) => rate.rate,
            ResolvedRate::Identity { .. } => Decimal::ONE,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            ResolvedRate::Persisted(rate) => rate.date,
            ResolvedRate::Identity { date, .. } => *date,
        }
    }

    pub fn source(&self) -> RateSource {
        match self {
            ResolvedRate::Persisted(rate) => rate.source.clone(),
            ResolvedRate::Identity { .. } => RateSource::Identity,
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, ResolvedRate::Identity { .. })
    }

    pub fn as_persisted(&self) -> Option<&FxRate> {
        match self {
            ResolvedRate::Persisted(rate) => Some(rate),
            ResolvedRate::Identity { .. } => None,
        }
    }

    pub fn into_persisted(self) -> Option<FxRate> {
        match self {
            ResolvedRate::Persisted(rate) => Some(rate),
            ResolvedRate::Identity { .. } => None,
        }
    }
}
