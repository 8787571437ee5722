use crate::core::config::FetchSettings;
use crate::core::currency::round_rate;
use crate::core::error::{FxError, Result};
use crate::core::provider::{FetchedRate, RateProvider, ensure_supported};
use crate::providers::util::{get_text, http_client};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Frankfurter JSON API, itself backed by ECB reference data.
pub struct FrankfurterProvider {
    base_url: String,
    settings: FetchSettings,
    client: reqwest::Client,
}

impl FrankfurterProvider {
    pub fn new(base_url: &str, settings: FetchSettings) -> Result<Self> {
        Ok(FrankfurterProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(&settings)?,
            settings,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FrankfurterResponse {
    date: NaiveDate,
    rates: HashMap<String, serde_json::Number>,
}

#[async_trait]
impl RateProvider for FrankfurterProvider {
    fn source(&self) -> &str {
        "frankfurter"
    }

    #[instrument(name = "FrankfurterRateFetch", skip(self))]
    async fn fetch(&self, from: &str, to: &str, date: NaiveDate) -> Result<FetchedRate> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        ensure_supported(&self.settings.allowed_currencies, &from, &to)?;
        if from == to {
            return Ok(FetchedRate {
                rate: Decimal::ONE,
                date,
            });
        }

        let url = format!(
            "{}/{}?base={}&symbols={}",
            self.base_url,
            date.format("%Y-%m-%d"),
            from,
            to
        );
        let body = get_text(&self.client, &url, &self.settings, (&from, &to, date)).await?;

        let data: FrankfurterResponse = serde_json::from_str(&body).map_err(|e| {
            FxError::MalformedResponse(format!("Failed to parse Frankfurter response: {e}"))
        })?;
        let number = data
            .rates
            .get(&to)
            .ok_or_else(|| FxError::RateUnavailable {
                from: from.clone(),
                to: to.clone(),
                date,
            })?;
        let rate = Decimal::from_str(&number.to_string())
            .or_else(|_| Decimal::from_scientific(&number.to_string()))
            .map_err(|e| FxError::MalformedResponse(format!("Bad rate '{number}': {e}")))?;
        let rate = round_rate(rate);
        if rate <= Decimal::ZERO {
            return Err(FxError::MalformedResponse(format!(
                "Non-positive rate {number} for {from}/{to}"
            )));
        }

        if data.date > date {
            return Err(FxError::MalformedResponse(format!(
                "Frankfurter answered {} for a request on {}",
                data.date, date
            )));
        }
        if data.date != date {
            debug!(requested = %date, returned = %data.date, "Frankfurter returned an earlier date");
        }

        Ok(FetchedRate {
            rate,
            date: data.date,
        })
    }
}
