//! Core business logic abstractions

pub mod batch;
pub mod cache;
pub mod config;
pub mod conversion;
pub mod currency;
pub mod error;
pub mod log;
pub mod provider;
pub mod rate;
pub mod repository;
pub mod resolution;
pub mod transaction;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for cleaner imports
pub use batch::{ConversionBatchCoordinator, ConversionStats};
pub use conversion::TransactionAmountCache;
pub use currency::{Currency, CurrencyId, CurrencyRegistry, SeededCurrencies};
pub use error::{FxError, Result};
pub use provider::{FetchedRate, RateProvider};
pub use rate::{FxRate, RateSource, ResolvedRate};
pub use repository::{RateRepository, TransactionStore};
pub use resolution::{RateResolutionEngine, RateResolver};
pub use transaction::Transaction;
