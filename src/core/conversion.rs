//! Lazy per-transaction amount conversion.
//!
//! A transaction's converted amounts are computed on first demand and written
//! back into its currency slots. Filled slots are authoritative: they are
//! returned as-is until explicitly cleared.

use crate::core::currency::round_amount;
use crate::core::error::{FxError, Result};
use crate::core::repository::TransactionStore;
use crate::core::resolution::RateResolver;
use crate::core::transaction::Transaction;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

pub struct TransactionAmountCache {
    resolver: Arc<dyn RateResolver>,
    store: Arc<dyn TransactionStore>,
}

impl TransactionAmountCache {
    pub fn new(resolver: Arc<dyn RateResolver>, store: Arc<dyn TransactionStore>) -> Self {
        Self { resolver, store }
    }

    /// Amount of `transaction` in `target`, computing and storing it on a miss.
    ///
    /// Errors from rate resolution propagate; tolerating them is up to the caller.
    pub async fn amount_in(&self, transaction: &mut Transaction, target: &str) -> Result<Decimal> {
        if let Some(amount) = transaction.stored_amount(target) {
            debug!(id = %transaction.id, target, "Converted amount cache hit");
            return Ok(amount);
        }

        if transaction.is_original(target) {
            self.validate_amount(transaction)?;
            let amount = transaction.amount;
            self.write(transaction, target, Some(amount)).await?;
            return Ok(amount);
        }

        let places = self.resolver.decimal_places(target)?;
        let rate = match self
            .resolver
            .find_rate(&transaction.currency, target, transaction.date)
            .await?
        {
            Some(rate) => rate,
            None => {
                debug!(id = %transaction.id, target, "No local rate, fetching");
                self.resolver
                    .fetch_rate(&transaction.currency, target, transaction.date)
                    .await?
            }
        };

        let amount = round_amount(transaction.amount * rate.value(), places);
        debug!(
            id = %transaction.id,
            from = %transaction.currency,
            target,
            rate = %rate.value(),
            %amount,
            "Converted transaction amount"
        );
        self.write(transaction, target, Some(amount)).await?;
        Ok(amount)
    }

    /// Rejects a native amount finer than its currency's minor unit.
    pub fn validate_amount(&self, transaction: &Transaction) -> Result<()> {
        let places = self.resolver.decimal_places(&transaction.currency)?;
        if transaction.amount.normalize().scale() > places {
            return Err(FxError::InvalidAmount {
                currency: transaction.currency.clone(),
                amount: transaction.amount,
                places,
            });
        }
        Ok(())
    }

    /// True when `target` still has to be computed from a rate.
    pub fn needs_conversion(&self, transaction: &Transaction, target: &str) -> bool {
        transaction.stored_amount(target).is_none() && !transaction.is_original(target)
    }

    /// Empties one slot, or every derived slot when `currency` is `None`.
    pub async fn clear_conversions(
        &self,
        transaction: &mut Transaction,
        currency: Option<&str>,
    ) -> Result<()> {
        let targets: Vec<String> = match currency {
            Some(code) => vec![code.to_uppercase()],
            None => transaction
                .converted
                .keys()
                .filter(|code| !transaction.is_original(code))
                .cloned()
                .collect(),
        };

        for code in targets {
            self.write(transaction, &code, None).await?;
        }
        Ok(())
    }

    /// Multiplier implied by a stored conversion.
    pub fn effective_rate(&self, transaction: &Transaction, target: &str) -> Option<Decimal> {
        if transaction.is_original(target) {
            return Some(Decimal::ONE);
        }
        let converted = transaction.stored_amount(target)?;
        if transaction.amount.is_zero() {
            return None;
        }
        converted.checked_div(transaction.amount)
    }

    async fn write(
        &self,
        transaction: &mut Transaction,
        currency: &str,
        amount: Option<Decimal>,
    ) -> Result<()> {
        self.store
            .write_amount(transaction.id, currency, amount)
            .await?;
        transaction.set_amount(currency, amount);
        Ok(())
    }
}
