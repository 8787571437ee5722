//! European Central Bank reference rates.
//!
//! The ECB publishes one daily series per currency, quoted as units of that
//! currency per EUR. Pairs not involving EUR are derived from two series.

use crate::core::config::FetchSettings;
use crate::core::currency::round_rate;
use crate::core::error::{FxError, Result};
use crate::core::provider::{FetchedRate, RateProvider, ensure_supported};
use crate::providers::util::{get_text, http_client};
use async_trait::async_trait;
use chrono::NaiveDate;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, instrument};

const EUR: &str = "EUR";

pub struct EcbProvider {
    base_url: String,
    settings: FetchSettings,
    client: reqwest::Client,
}

impl EcbProvider {
    pub fn new(base_url: &str, settings: FetchSettings) -> Result<Self> {
        Ok(EcbProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(&settings)?,
            settings,
        })
    }

    /// Units of `currency` per EUR on `date`.
    async fn euro_quote(&self, currency: &str, date: NaiveDate) -> Result<FetchedRate> {
        let day = date.format("%Y-%m-%d");
        let url = format!(
            "{}/service/data/EXR/D.{}.EUR.SP00.A?startPeriod={day}&endPeriod={day}",
            self.base_url, currency
        );
        let body = get_text(&self.client, &url, &self.settings, (EUR, currency, date)).await?;

        let observations = parse_observations(&body)?;
        let (obs_date, rate) = observations
            .into_iter()
            .filter(|(d, _)| *d <= date)
            .max_by_key(|(d, _)| *d)
            .ok_or_else(|| FxError::RateUnavailable {
                from: EUR.to_string(),
                to: currency.to_string(),
                date,
            })?;

        if rate <= Decimal::ZERO {
            return Err(FxError::MalformedResponse(format!(
                "Non-positive ECB quote {rate} for {currency}"
            )));
        }
        debug!(currency, %obs_date, %rate, "ECB quote");
        Ok(FetchedRate {
            rate,
            date: obs_date,
        })
    }

    async fn quote(&self, from: &str, to: &str, date: NaiveDate) -> Result<FetchedRate> {
        let (rate, quoted_on) = match (from, to) {
            (f, t) if f == t => (Decimal::ONE, date),
            (EUR, t) => {
                let quote = self.euro_quote(t, date).await?;
                (quote.rate, quote.date)
            }
            (f, EUR) => {
                let quote = self.euro_quote(f, date).await?;
                (invert(quote.rate)?, quote.date)
            }
            (f, t) => {
                let (from_leg, to_leg) =
                    futures::try_join!(self.euro_quote(f, date), self.euro_quote(t, date))?;
                let cross = to_leg.rate.checked_div(from_leg.rate).ok_or_else(|| {
                    FxError::MalformedResponse(format!("Cannot cross {f}/{t} through EUR"))
                })?;
                (cross, from_leg.date.min(to_leg.date))
            }
        };

        Ok(FetchedRate {
            rate: round_rate(rate),
            date: quoted_on,
        })
    }
}

#[async_trait]
impl RateProvider for EcbProvider {
    fn source(&self) -> &str {
        "ecb"
    }

    #[instrument(name = "EcbRateFetch", skip(self))]
    async fn fetch(&self, from: &str, to: &str, date: NaiveDate) -> Result<FetchedRate> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        ensure_supported(&self.settings.allowed_currencies, &from, &to)?;

        // Quote legs are EUR-based; report gaps against the requested pair.
        self.quote(&from, &to, date).await.map_err(|e| match e {
            FxError::RateUnavailable { date, .. } => FxError::RateUnavailable {
                from: from.clone(),
                to: to.clone(),
                date,
            },
            other => other,
        })
    }
}

fn invert(rate: Decimal) -> Result<Decimal> {
    Decimal::ONE
        .checked_div(rate)
        .ok_or_else(|| FxError::MalformedResponse(format!("Cannot invert ECB quote {rate}")))
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| FxError::MalformedResponse(e.to_string()))?;
        if attr.key.local_name().as_ref() == name {
            let value = std::str::from_utf8(&attr.value)
                .map_err(|e| FxError::MalformedResponse(e.to_string()))?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| FxError::MalformedResponse(format!("Bad TIME_PERIOD '{value}': {e}")))
}

fn parse_decimal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|e| FxError::MalformedResponse(format!("Bad OBS_VALUE '{value}': {e}")))
}

/// Extracts `(date, value)` observations from an SDMX-ML message.
///
/// Handles both the generic layout (`Obs` with `ObsDimension`/`ObsValue`
/// children) and the structure-specific one (`Obs` attributes).
fn parse_observations(xml: &str) -> Result<Vec<(NaiveDate, Decimal)>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut observations = Vec::new();
    let mut pending_date: Option<NaiveDate> = None;
    let mut pending_value: Option<Decimal> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"Obs" => {
                    pending_date = None;
                    pending_value = None;
                    let period = attribute(&e, b"TIME_PERIOD")?;
                    let value = attribute(&e, b"OBS_VALUE")?;
                    if let (Some(period), Some(value)) = (period, value) {
                        observations.push((parse_date(&period)?, parse_decimal(&value)?));
                    }
                }
                b"ObsDimension" => {
                    if let Some(value) = attribute(&e, b"value")? {
                        pending_date = Some(parse_date(&value)?);
                    }
                }
                b"ObsValue" => {
                    if let Some(value) = attribute(&e, b"value")? {
                        pending_value = Some(parse_decimal(&value)?);
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Obs" => {
                if let (Some(date), Some(value)) = (pending_date.take(), pending_value.take()) {
                    observations.push((date, value));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(FxError::MalformedResponse(format!(
                    "Invalid SDMX at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    Ok(observations)
}
