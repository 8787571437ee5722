//! Finds, fetches and replicates FX rates.
//!
//! Lookups are strictly backward-looking: a rate dated after the requested
//! day is never returned. Only the `fetch*` and `refetch_rate` operations go to
//! the network; `find_rate` and `convert` are local-only so reports can resolve
//! many rates cheaply and defer network calls.

use crate::core::currency::{CurrencyId, CurrencyRegistry, round_amount, round_rate};
use crate::core::error::{FxError, Result};
use crate::core::provider::RateProvider;
use crate::core::rate::{FxRate, RateSource, ResolvedRate};
use crate::core::repository::RateRepository;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// The read/fetch face of the engine, as seen by amount conversion.
#[async_trait]
pub trait RateResolver: Send + Sync {
    async fn find_rate(&self, from: &str, to: &str, date: NaiveDate)
    -> Result<Option<ResolvedRate>>;

    async fn fetch_rate(&self, from: &str, to: &str, date: NaiveDate) -> Result<ResolvedRate>;

    fn decimal_places(&self, code: &str) -> Result<u32>;
}

pub struct RateResolutionEngine {
    registry: Arc<dyn CurrencyRegistry>,
    repository: Arc<dyn RateRepository>,
    provider: Arc<dyn RateProvider>,
}

impl RateResolutionEngine {
    pub fn new(
        registry: Arc<dyn CurrencyRegistry>,
        repository: Arc<dyn RateRepository>,
        provider: Arc<dyn RateProvider>,
    ) -> Self {
        Self {
            registry,
            repository,
            provider,
        }
    }

    pub fn registry(&self) -> &dyn CurrencyRegistry {
        self.registry.as_ref()
    }

    fn identity(code: &str, date: NaiveDate) -> ResolvedRate {
        ResolvedRate::Identity {
            currency: code.to_uppercase(),
            date,
        }
    }

    fn is_same(from: &str, to: &str) -> bool {
        from.eq_ignore_ascii_case(to)
    }

    fn ensure_not_future(date: NaiveDate) -> Result<()> {
        if date > Utc::now().date_naive() {
            return Err(FxError::FutureDate(date));
        }
        Ok(())
    }

    fn resolve(&self, code: &str) -> Result<CurrencyId> {
        self.registry
            .resolve_by_code(code)
            .ok_or_else(|| FxError::UnknownCurrency(code.to_string()))
    }

    fn resolve_pair(&self, from: &str, to: &str) -> Result<(CurrencyId, CurrencyId)> {
        Ok((self.resolve(from)?, self.resolve(to)?))
    }

    fn code_of(&self, id: CurrencyId) -> Result<String> {
        self.registry
            .code(id)
            .map(str::to_string)
            .ok_or_else(|| FxError::UnknownCurrency(id.to_string()))
    }

    /// Repository errors speak currency ids; callers want codes.
    fn with_codes(err: FxError, from: &str, to: &str) -> FxError {
        match err {
            FxError::DuplicateRate { date, .. } => FxError::DuplicateRate {
                from: from.to_uppercase(),
                to: to.to_uppercase(),
                date,
            },
            other => other,
        }
    }

    /// Inserts a row; losing a uniqueness race returns the winner's row.
    async fn persist(&self, rate: FxRate) -> Result<FxRate> {
        let (from, to, date) = (rate.from_currency, rate.to_currency, rate.date);
        match self.repository.insert(rate).await {
            Ok(stored) => Ok(stored),
            Err(err) if err.is_recoverable_duplicate() => {
                debug!(%from, %to, %date, "Rate inserted concurrently, re-reading");
                self.repository.find_exact(from, to, date).await?.ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Best local rate for the day: exact match first, then nearest prior.
    pub async fn find_rate(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Option<ResolvedRate>> {
        if Self::is_same(from, to) {
            return Ok(Some(Self::identity(from, date)));
        }

        let (Some(from_id), Some(to_id)) = (
            self.registry.resolve_by_code(from),
            self.registry.resolve_by_code(to),
        ) else {
            debug!(from, to, "Unknown currency in lookup");
            return Ok(None);
        };

        if let Some(rate) = self.repository.find_exact(from_id, to_id, date).await? {
            return Ok(Some(ResolvedRate::Persisted(rate)));
        }

        let fallback = self
            .repository
            .find_nearest_prior_or_equal(from_id, to_id, date)
            .await?;
        if let Some(rate) = &fallback {
            debug!(from, to, %date, fallback = %rate.date, "Using nearest prior rate");
        }
        Ok(fallback.map(ResolvedRate::Persisted))
    }

    /// Rate stored for exactly this day, fetching and persisting it if needed.
    ///
    /// A nearest-prior fallback does not count as stored: the authority is
    /// asked whenever the exact day is missing.
    #[instrument(skip(self))]
    pub async fn fetch_rate(&self, from: &str, to: &str, date: NaiveDate) -> Result<ResolvedRate> {
        if Self::is_same(from, to) {
            return Ok(Self::identity(from, date));
        }
        Self::ensure_not_future(date)?;

        if let Some(found) = self.find_rate(from, to, date).await?
            && found.date() == date
        {
            debug!("Exact rate already stored");
            return Ok(found);
        }

        let (from_id, to_id) = self.resolve_pair(from, to)?;
        let fetched = self.provider.fetch(from, to, date).await?;
        if fetched.date != date {
            debug!(returned = %fetched.date, "Provider answered for a different date");
        }

        let row = FxRate::fetched(
            from_id,
            to_id,
            fetched.date,
            fetched.rate,
            RateSource::from(self.provider.source()),
        );
        let stored = self.persist(row).await?;
        info!(rate = %stored.rate, date = %stored.date, source = %stored.source, "Stored fetched rate");
        Ok(ResolvedRate::Persisted(stored))
    }

    /// Manual fetch of a day that is not stored yet.
    pub async fn fetch_missing_rate(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<ResolvedRate> {
        if Self::is_same(from, to) {
            return Err(FxError::SameCurrency(from.to_uppercase()));
        }
        Self::ensure_not_future(date)?;

        let (from_id, to_id) = self.resolve_pair(from, to)?;
        if self
            .repository
            .find_exact(from_id, to_id, date)
            .await?
            .is_some()
        {
            return Err(FxError::DuplicateRate {
                from: from.to_uppercase(),
                to: to.to_uppercase(),
                date,
            });
        }

        self.fetch_rate(from, to, date).await
    }

    /// Copies the latest rate strictly before `date` forward onto `date`.
    #[instrument(skip(self))]
    pub async fn replicate_rate(&self, from: &str, to: &str, date: NaiveDate) -> Result<FxRate> {
        Self::ensure_not_future(date)?;
        let (from_id, to_id) = self.resolve_pair(from, to)?;

        let source_row = self
            .repository
            .find_latest_before(from_id, to_id, date)
            .await?
            .ok_or_else(|| FxError::NoSourceRate {
                from: from.to_uppercase(),
                to: to.to_uppercase(),
                date,
            })?;

        let stored = self
            .repository
            .insert(FxRate::replicated(&source_row, date))
            .await
            .map_err(|e| Self::with_codes(e, from, to))?;
        info!(rate = %stored.rate, replicated_from = %source_row.date, "Replicated rate");
        Ok(stored)
    }

    /// Replicates every day in `start..=end` that has no stored rate.
    pub async fn fill_gaps(
        &self,
        from: &str,
        to: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FxRate>> {
        Self::ensure_not_future(end)?;
        let (from_id, to_id) = self.resolve_pair(from, to)?;

        let mut created = Vec::new();
        for date in start.iter_days().take_while(|d| *d <= end) {
            if self
                .repository
                .find_exact(from_id, to_id, date)
                .await?
                .is_none()
            {
                created.push(self.replicate_rate(from, to, date).await?);
            }
        }
        Ok(created)
    }

    /// Re-validates a stored row against the authority and overwrites it.
    ///
    /// The row always ends up non-replicated. On any failure the stored row
    /// is left untouched.
    #[instrument(skip(self, existing), fields(date = %existing.date))]
    pub async fn refetch_rate(&self, existing: &FxRate) -> Result<FxRate> {
        let from = self.code_of(existing.from_currency)?;
        let to = self.code_of(existing.to_currency)?;

        self.provider.evict(&from, &to, existing.date).await;
        let fetched = self.provider.fetch(&from, &to, existing.date).await?;
        if fetched.date != existing.date {
            // The authority only had an earlier day; that is not a fresh value for this row.
            return Err(FxError::RateUnavailable {
                from,
                to,
                date: existing.date,
            });
        }

        let updated = self
            .repository
            .update_in_place(
                existing,
                round_rate(fetched.rate),
                RateSource::from(self.provider.source()),
                true,
            )
            .await?;
        info!(before = %existing.rate, after = %updated.rate, "Refetched rate");
        Ok(updated)
    }

    /// Multiplies `amount` by the local rate, rounded to the target's precision.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Decimal> {
        if Self::is_same(from, to) {
            return Ok(amount);
        }

        let rate = self
            .find_rate(from, to, date)
            .await?
            .ok_or_else(|| FxError::NoRateAvailable {
                from: from.to_uppercase(),
                to: to.to_uppercase(),
                date,
            })?;

        let places = RateResolver::decimal_places(self, to)?;
        Ok(round_amount(amount * rate.value(), places))
    }

    pub async fn list_rates(&self, from: &str, to: &str) -> Result<Vec<FxRate>> {
        let (from_id, to_id) = self.resolve_pair(from, to)?;
        self.repository.list(from_id, to_id).await
    }
}

#[async_trait]
impl RateResolver for RateResolutionEngine {
    async fn find_rate(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Option<ResolvedRate>> {
        RateResolutionEngine::find_rate(self, from, to, date).await
    }

    async fn fetch_rate(&self, from: &str, to: &str, date: NaiveDate) -> Result<ResolvedRate> {
        RateResolutionEngine::fetch_rate(self, from, to, date).await
    }

    fn decimal_places(&self, code: &str) -> Result<u32> {
        let id = self.resolve(code)?;
        self.registry
            .decimal_places(id)
            .ok_or_else(|| FxError::UnknownCurrency(code.to_string()))
    }
}
