use crate::core::conversion::TransactionAmountCache;
use crate::core::transaction::Transaction;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// How a set of transactions stands with respect to one target currency.
///
/// The three buckets are disjoint and add up to `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    pub total: usize,
    pub need_conversion: usize,
    pub already_converted: usize,
    pub same_as_original: usize,
    pub conversion_rate_percent: Decimal,
}

/// Converts many transactions, tolerating per-item failures.
pub struct ConversionBatchCoordinator {
    cache: Arc<TransactionAmountCache>,
}

impl ConversionBatchCoordinator {
    pub fn new(cache: Arc<TransactionAmountCache>) -> Self {
        Self { cache }
    }

    /// Converts each transaction to `target`.
    ///
    /// A failed conversion is logged and does not stop the batch. Its entry is
    /// the native amount when `target` is the transaction's own currency and
    /// `None` otherwise.
    pub async fn convert_batch(
        &self,
        transactions: &mut [Transaction],
        target: &str,
    ) -> HashMap<Uuid, Option<Decimal>> {
        self.convert_batch_with_progress(transactions, target, |_| {}).await
    }

    /// Same as [`Self::convert_batch`], calling `on_item` after each transaction.
    pub async fn convert_batch_with_progress(
        &self,
        transactions: &mut [Transaction],
        target: &str,
        on_item: impl Fn(&Transaction),
    ) -> HashMap<Uuid, Option<Decimal>> {
        let mut results = HashMap::with_capacity(transactions.len());

        for transaction in transactions.iter_mut() {
            let outcome = match self.cache.amount_in(transaction, target).await {
                Ok(amount) => Some(amount),
                Err(err) => {
                    warn!(
                        id = %transaction.id,
                        from = %transaction.currency,
                        target,
                        "Conversion failed: {}",
                        err
                    );
                    transaction
                        .is_original(target)
                        .then_some(transaction.amount)
                }
            };
            results.insert(transaction.id, outcome);
            on_item(transaction);
        }

        debug!(
            target,
            total = transactions.len(),
            converted = results.values().filter(|v| v.is_some()).count(),
            "Batch conversion finished"
        );
        results
    }

    pub fn conversion_stats(&self, transactions: &[Transaction], target: &str) -> ConversionStats {
        let mut stats = ConversionStats {
            total: transactions.len(),
            need_conversion: 0,
            already_converted: 0,
            same_as_original: 0,
            conversion_rate_percent: Decimal::ZERO,
        };

        for transaction in transactions {
            if transaction.is_original(target) {
                stats.same_as_original += 1;
            } else if transaction.stored_amount(target).is_some() {
                stats.already_converted += 1;
            } else {
                stats.need_conversion += 1;
            }
        }

        if stats.total > 0 {
            stats.conversion_rate_percent = (Decimal::from(stats.already_converted)
                * Decimal::ONE_HUNDRED
                / Decimal::from(stats.total))
            .round_dp(2);
        }
        stats
    }
}
