use crate::core::currency::CurrencyId;
use crate::core::error::{FxError, Result};
use crate::core::rate::{FxRate, RateSource};
use crate::core::repository::{RateRepository, TransactionStore};
use crate::core::transaction::Transaction;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

type RateKey = (CurrencyId, CurrencyId, NaiveDate);

/// Rate storage held in process memory.
#[derive(Default)]
pub struct MemoryRateRepository {
    rates: Mutex<BTreeMap<RateKey, FxRate>>,
}

impl MemoryRateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rates.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rates.lock().await.is_empty()
    }
}

#[async_trait]
impl RateRepository for MemoryRateRepository {
    async fn find_exact(
        &self,
        from: CurrencyId,
        to: CurrencyId,
        date: NaiveDate,
    ) -> Result<Option<FxRate>> {
        let rates = self.rates.lock().await;
        Ok(rates.get(&(from, to, date)).cloned())
    }

    async fn find_nearest_prior_or_equal(
        &self,
        from: CurrencyId,
        to: CurrencyId,
        date: NaiveDate,
    ) -> Result<Option<FxRate>> {
        let rates = self.rates.lock().await;
        Ok(rates
            .range((from, to, NaiveDate::MIN)..=(from, to, date))
            .next_back()
            .map(|(_, rate)| rate.clone()))
    }

    async fn list(&self, from: CurrencyId, to: CurrencyId) -> Result<Vec<FxRate>> {
        let rates = self.rates.lock().await;
        Ok(rates
            .range((from, to, NaiveDate::MIN)..=(from, to, NaiveDate::MAX))
            .map(|(_, rate)| rate.clone())
            .collect())
    }

    async fn insert(&self, rate: FxRate) -> Result<FxRate> {
        let mut rates = self.rates.lock().await;
        let key = (rate.from_currency, rate.to_currency, rate.date);
        if rates.contains_key(&key) {
            return Err(FxError::DuplicateRate {
                from: rate.from_currency.to_string(),
                to: rate.to_currency.to_string(),
                date: rate.date,
            });
        }
        debug!(from = %rate.from_currency, to = %rate.to_currency, date = %rate.date, "Inserting rate");
        rates.insert(key, rate.clone());
        Ok(rate)
    }

    async fn update_in_place(
        &self,
        existing: &FxRate,
        rate: Decimal,
        source: RateSource,
        clear_replication: bool,
    ) -> Result<FxRate> {
        let mut rates = self.rates.lock().await;
        let key = (existing.from_currency, existing.to_currency, existing.date);
        let row = rates.get_mut(&key).ok_or_else(|| {
            FxError::Storage(format!(
                "No stored rate for {}/{} on {}",
                existing.from_currency, existing.to_currency, existing.date
            ))
        })?;
        row.rate = rate;
        row.source = source;
        if clear_replication {
            row.is_replicated = false;
            row.replicated_from_date = None;
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }
}

/// Transaction storage held in process memory.
#[derive(Default)]
pub struct MemoryTransactionStore {
    transactions: Mutex<BTreeMap<Uuid, Transaction>>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn save(&self, transaction: &Transaction) -> Result<()> {
        let mut transactions = self.transactions.lock().await;
        transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<Transaction>> {
        let transactions = self.transactions.lock().await;
        Ok(transactions.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Transaction>> {
        let transactions = self.transactions.lock().await;
        let mut all: Vec<Transaction> = transactions.values().cloned().collect();
        all.sort_by_key(|t| t.date);
        Ok(all)
    }

    async fn write_amount(&self, id: Uuid, currency: &str, amount: Option<Decimal>) -> Result<()> {
        let mut transactions = self.transactions.lock().await;
        let transaction = transactions
            .get_mut(&id)
            .ok_or_else(|| FxError::Storage(format!("Unknown transaction {id}")))?;
        transaction.set_amount(currency, amount);
        Ok(())
    }
}
