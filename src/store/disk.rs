use crate::core::currency::CurrencyId;
use crate::core::error::{FxError, Result};
use crate::core::rate::{FxRate, RateSource};
use crate::core::repository::{RateRepository, TransactionStore};
use crate::core::transaction::Transaction;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use rust_decimal::Decimal;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

const RATES: &str = "rates";
const TRANSACTIONS: &str = "transactions";

/// Rates and transactions persisted in a fjall keyspace.
///
/// Rate keys are `{from}:{to}:{YYYY-MM-DD}` with zero-padded ids, so keys of
/// one pair sort by date and the nearest prior rate is a reverse range scan.
pub struct DiskStore {
    keyspace: Keyspace,
    rates: PartitionHandle,
    transactions: PartitionHandle,
    write_lock: Mutex<()>,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .map_err(|e| FxError::Storage(format!("Cannot create {}: {e}", path.display())))?;

        let keyspace = Config::new(path.join("fjall_db")).open()?;
        let rates = keyspace.open_partition(RATES, PartitionCreateOptions::default())?;
        let transactions =
            keyspace.open_partition(TRANSACTIONS, PartitionCreateOptions::default())?;
        debug!("Opened store at {}", path.display());

        Ok(Self {
            keyspace,
            rates,
            transactions,
            write_lock: Mutex::new(()),
        })
    }

    fn pair_prefix(from: CurrencyId, to: CurrencyId) -> String {
        format!("{from}:{to}:")
    }

    fn rate_key(from: CurrencyId, to: CurrencyId, date: NaiveDate) -> String {
        format!("{}{}", Self::pair_prefix(from, to), date.format("%Y-%m-%d"))
    }

    fn flush(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn read_transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
        match self.transactions.get(id.to_string())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_transaction(&self, transaction: &Transaction) -> Result<()> {
        self.transactions
            .insert(transaction.id.to_string().as_str(), serde_json::to_vec(transaction)?)?;
        self.flush()
    }
}

#[async_trait]
impl RateRepository for DiskStore {
    async fn find_exact(
        &self,
        from: CurrencyId,
        to: CurrencyId,
        date: NaiveDate,
    ) -> Result<Option<FxRate>> {
        match self.rates.get(Self::rate_key(from, to, date))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn find_nearest_prior_or_equal(
        &self,
        from: CurrencyId,
        to: CurrencyId,
        date: NaiveDate,
    ) -> Result<Option<FxRate>> {
        let start = Self::pair_prefix(from, to);
        let end = Self::rate_key(from, to, date);
        match self.rates.range(start..=end).next_back() {
            Some(entry) => {
                let (_, bytes) = entry?;
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, from: CurrencyId, to: CurrencyId) -> Result<Vec<FxRate>> {
        self.rates
            .prefix(Self::pair_prefix(from, to))
            .map(|entry| {
                let (_, bytes) = entry?;
                Ok(serde_json::from_slice(&bytes)?)
            })
            .collect()
    }

    async fn insert(&self, rate: FxRate) -> Result<FxRate> {
        let _guard = self.write_lock.lock().await;
        let key = Self::rate_key(rate.from_currency, rate.to_currency, rate.date);
        if self.rates.contains_key(&key)? {
            return Err(FxError::DuplicateRate {
                from: rate.from_currency.to_string(),
                to: rate.to_currency.to_string(),
                date: rate.date,
            });
        }

        self.rates.insert(key.as_str(), serde_json::to_vec(&rate)?)?;
        self.flush()?;
        debug!("Stored rate {}", key);
        Ok(rate)
    }

    async fn update_in_place(
        &self,
        existing: &FxRate,
        rate: Decimal,
        source: RateSource,
        clear_replication: bool,
    ) -> Result<FxRate> {
        let _guard = self.write_lock.lock().await;
        let key = Self::rate_key(existing.from_currency, existing.to_currency, existing.date);
        let mut row: FxRate = match self.rates.get(&key)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => return Err(FxError::Storage(format!("No stored rate under {key}"))),
        };

        row.rate = rate;
        row.source = source;
        if clear_replication {
            row.is_replicated = false;
            row.replicated_from_date = None;
        }
        row.updated_at = Utc::now();

        self.rates.insert(key.as_str(), serde_json::to_vec(&row)?)?;
        self.flush()?;
        debug!("Updated rate {}", key);
        Ok(row)
    }
}

#[async_trait]
impl TransactionStore for DiskStore {
    async fn save(&self, transaction: &Transaction) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_transaction(transaction)
    }

    async fn load(&self, id: Uuid) -> Result<Option<Transaction>> {
        self.read_transaction(id)
    }

    async fn list(&self) -> Result<Vec<Transaction>> {
        let mut all = self
            .transactions
            .iter()
            .map(|entry| {
                let (_, bytes) = entry?;
                Ok(serde_json::from_slice(&bytes)?)
            })
            .collect::<Result<Vec<Transaction>>>()?;
        all.sort_by_key(|t| t.date);
        Ok(all)
    }

    async fn write_amount(&self, id: Uuid, currency: &str, amount: Option<Decimal>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut transaction = self
            .read_transaction(id)?
            .ok_or_else(|| FxError::Storage(format!("Unknown transaction {id}")))?;
        transaction.set_amount(currency, amount);
        self.write_transaction(&transaction)
    }
}
