//! Rate source abstraction

use crate::core::error::{FxError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One day's rate as reported by an external authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedRate {
    pub rate: Decimal,
    pub date: NaiveDate,
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Provenance tag stored on rows this provider produces.
    fn source(&self) -> &str;

    async fn fetch(&self, from: &str, to: &str, date: NaiveDate) -> Result<FetchedRate>;

    /// Drops any response cached for this request. Providers without a
    /// response cache have nothing to do.
    async fn evict(&self, _from: &str, _to: &str, _date: NaiveDate) {}
}

/// Fails fast with `UnsupportedPair` unless both codes are allow-listed.
pub fn ensure_supported(allowed: &[String], from: &str, to: &str) -> Result<()> {
    let known = |code: &str| allowed.iter().any(|a| a.eq_ignore_ascii_case(code));
    if known(from) && known(to) {
        Ok(())
    } else {
        Err(FxError::UnsupportedPair {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_supported() {
        let allowed = vec!["USD".to_string(), "EUR".to_string(), "COP".to_string()];
        assert!(ensure_supported(&allowed, "USD", "COP").is_ok());
        assert!(ensure_supported(&allowed, "eur", "usd").is_ok());
        assert_eq!(
            ensure_supported(&allowed, "USD", "GBP"),
            Err(FxError::UnsupportedPair {
                from: "USD".to_string(),
                to: "GBP".to_string()
            })
        );
    }
}
