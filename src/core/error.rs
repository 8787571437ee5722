//! Error taxonomy shared by every FX operation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T, E = FxError> = std::result::Result<T, E>;

/// A single catchable failure kind for rate lookup, fetching and conversion.
///
/// Provider-level variants (`UnsupportedPair` through `MalformedResponse`)
/// propagate unchanged through the resolution engine. Only the batch
/// coordinator matches on them to degrade per item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FxError {
    #[error("Currency pair {from}/{to} is not supported by this rate source")]
    UnsupportedPair { from: String, to: String },

    #[error("No rate published for {from}/{to} on {date}")]
    RateUnavailable {
        from: String,
        to: String,
        date: NaiveDate,
    },

    #[error("Rate source request failed: {0}")]
    UpstreamError(String),

    #[error("Rate source throttled the request: {0}")]
    RateLimited(String),

    #[error("Could not parse rate source response: {0}")]
    MalformedResponse(String),

    #[error("No rate for {from}/{to} before {date} to replicate from")]
    NoSourceRate {
        from: String,
        to: String,
        date: NaiveDate,
    },

    #[error("No rate available to convert {from} to {to} on {date}")]
    NoRateAvailable {
        from: String,
        to: String,
        date: NaiveDate,
    },

    #[error("A rate for {from}/{to} on {date} already exists")]
    DuplicateRate {
        from: String,
        to: String,
        date: NaiveDate,
    },

    #[error("Rates cannot be requested for a future date: {0}")]
    FutureDate(NaiveDate),

    #[error("Cannot fetch a rate for {0} against itself")]
    SameCurrency(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Amount {amount} has more than {places} decimal places allowed for {currency}")]
    InvalidAmount {
        currency: String,
        amount: Decimal,
        places: u32,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl FxError {
    /// True when an insert lost a race against another writer for the same
    /// (from, to, date). Callers re-read instead of failing.
    pub fn is_recoverable_duplicate(&self) -> bool {
        matches!(self, FxError::DuplicateRate { .. })
    }

    /// Message suitable for showing to whoever triggered a manual fetch or
    /// refetch. Each variant maps to a different corrective action.
    pub fn user_message(&self) -> String {
        match self {
            FxError::DuplicateRate { from, to, date } => format!(
                "A {from}/{to} rate for {date} is already stored. Use refetch to re-validate it."
            ),
            FxError::FutureDate(date) => {
                format!("{date} is in the future. Rates can only be fetched for today or earlier.")
            }
            FxError::SameCurrency(code) => {
                format!("{code} to {code} is always 1. Pick two different currencies.")
            }
            FxError::UpstreamError(_) | FxError::RateLimited(_) => format!(
                "The exchange-rate source could not be reached ({self}). Try again later."
            ),
            FxError::RateUnavailable { date, .. } => format!(
                "No rate was published for {date}, probably a non-trading day. Replicate the previous rate instead."
            ),
            other => other.to_string(),
        }
    }
}

impl From<fjall::Error> for FxError {
    fn from(e: fjall::Error) -> Self {
        FxError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for FxError {
    fn from(e: serde_json::Error) -> Self {
        FxError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[test]
    fn test_duplicate_is_recoverable() {
        let err = FxError::DuplicateRate {
            from: "USD".to_string(),
            to: "EUR".to_string(),
            date: june(14),
        };
        assert!(err.is_recoverable_duplicate());
        assert!(!FxError::UpstreamError("boom".to_string()).is_recoverable_duplicate());
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let duplicate = FxError::DuplicateRate {
            from: "USD".to_string(),
            to: "EUR".to_string(),
            date: june(14),
        }
        .user_message();
        let future = FxError::FutureDate(june(14)).user_message();
        let same = FxError::SameCurrency("USD".to_string()).user_message();
        let upstream = FxError::UpstreamError("connection refused".to_string()).user_message();

        assert!(duplicate.contains("already stored"));
        assert!(future.contains("future"));
        assert!(same.contains("always 1"));
        assert!(upstream.contains("could not be reached"));

        let all = [&duplicate, &future, &same, &upstream];
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_display_includes_pair_and_date() {
        let err = FxError::RateUnavailable {
            from: "EUR".to_string(),
            to: "COP".to_string(),
            date: june(15),
        };
        assert_eq!(err.to_string(), "No rate published for EUR/COP on 2024-06-15");
    }
}
