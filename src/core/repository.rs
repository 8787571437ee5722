//! Persistence contracts for rates and transactions.

use crate::core::currency::CurrencyId;
use crate::core::error::Result;
use crate::core::rate::{FxRate, RateSource};
use crate::core::transaction::Transaction;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Historical FX rates keyed by `(from, to, date)`.
#[async_trait]
pub trait RateRepository: Send + Sync {
    async fn find_exact(
        &self,
        from: CurrencyId,
        to: CurrencyId,
        date: NaiveDate,
    ) -> Result<Option<FxRate>>;

    /// Latest rate dated on or before `date`.
    async fn find_nearest_prior_or_equal(
        &self,
        from: CurrencyId,
        to: CurrencyId,
        date: NaiveDate,
    ) -> Result<Option<FxRate>>;

    /// Latest rate dated strictly before `date`.
    async fn find_latest_before(
        &self,
        from: CurrencyId,
        to: CurrencyId,
        date: NaiveDate,
    ) -> Result<Option<FxRate>> {
        match date.pred_opt() {
            Some(previous) => self.find_nearest_prior_or_equal(from, to, previous).await,
            None => Ok(None),
        }
    }

    /// All rows for a pair, oldest first.
    async fn list(&self, from: CurrencyId, to: CurrencyId) -> Result<Vec<FxRate>>;

    /// Fails with `DuplicateRate` if the triple is already taken.
    async fn insert(&self, rate: FxRate) -> Result<FxRate>;

    /// Overwrites value and provenance of an existing row. With
    /// `clear_replication` the row becomes a freshly sourced one.
    async fn update_in_place(
        &self,
        existing: &FxRate,
        rate: Decimal,
        source: RateSource,
        clear_replication: bool,
    ) -> Result<FxRate>;
}

/// Transaction rows as far as amount caching is concerned.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn save(&self, transaction: &Transaction) -> Result<()>;

    async fn load(&self, id: Uuid) -> Result<Option<Transaction>>;

    /// All transactions, oldest first.
    async fn list(&self) -> Result<Vec<Transaction>>;

    /// Writes a single currency slot. `None` nulls it.
    async fn write_amount(&self, id: Uuid, currency: &str, amount: Option<Decimal>) -> Result<()>;
}
