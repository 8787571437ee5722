use crate::core::cache::Cache;
use crate::core::error::Result;
use crate::core::provider::{FetchedRate, RateProvider};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tracing::debug;

type RateKey = (String, String, NaiveDate);

/// Read-through cache over any rate provider.
///
/// Only successful answers are cached, each for `ttl`. Errors always reach the
/// caller and the next call goes back to the inner provider.
pub struct CachingRateProvider<T: RateProvider> {
    inner: T,
    cache: Cache<RateKey, FetchedRate>,
    ttl: Duration,
}

impl<T: RateProvider> CachingRateProvider<T> {
    pub fn new(inner: T, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::new(),
            ttl,
        }
    }

    fn key(from: &str, to: &str, date: NaiveDate) -> RateKey {
        (from.to_uppercase(), to.to_uppercase(), date)
    }
}

#[async_trait]
impl<T: RateProvider> RateProvider for CachingRateProvider<T> {
    fn source(&self) -> &str {
        self.inner.source()
    }

    async fn fetch(&self, from: &str, to: &str, date: NaiveDate) -> Result<FetchedRate> {
        let key = Self::key(from, to, date);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        debug!("Cache miss for rate {}/{} on {}", from, to, date);
        let fetched = self.inner.fetch(from, to, date).await?;
        self.cache.put(key, fetched.clone(), Some(self.ttl)).await;
        Ok(fetched)
    }

    async fn evict(&self, from: &str, to: &str, date: NaiveDate) {
        self.cache.remove(&Self::key(from, to, date)).await;
        self.inner.evict(from, to, date).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FxError;
    use crate::core::testing::{MockRateProvider, june};
    use rust_decimal_macros::dec;

    #[async_trait]
    impl RateProvider for &MockRateProvider {
        fn source(&self) -> &str {
            (**self).source()
        }

        async fn fetch(&self, from: &str, to: &str, date: NaiveDate) -> Result<FetchedRate> {
            (**self).fetch(from, to, date).await
        }

        async fn evict(&self, from: &str, to: &str, date: NaiveDate) {
            (**self).evict(from, to, date).await
        }
    }

    #[tokio::test]
    async fn test_caching_rate_provider() {
        let inner = MockRateProvider::new();
        inner.add_rate("USD", "EUR", june(14), dec!(0.93), june(14));
        let caching = CachingRateProvider::new(&inner, Duration::from_secs(60));

        // First call - should hit inner provider
        let first = caching.fetch("USD", "EUR", june(14)).await.unwrap();
        assert_eq!(first.rate, dec!(0.93));
        assert_eq!(inner.calls(), 1);

        // Second call - should be cached, whatever the code casing
        let second = caching.fetch("usd", "eur", june(14)).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(inner.calls(), 1);

        // Another date is another key
        let _ = caching.fetch("USD", "EUR", june(13)).await;
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let inner = MockRateProvider::new();
        inner.add_error(
            "USD",
            "EUR",
            june(14),
            FxError::UpstreamError("down".to_string()),
        );
        let caching = CachingRateProvider::new(&inner, Duration::from_secs(60));

        assert!(caching.fetch("USD", "EUR", june(14)).await.is_err());
        assert!(caching.fetch("USD", "EUR", june(14)).await.is_err());
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_evict_forces_round_trip() {
        let inner = MockRateProvider::new();
        inner.add_rate("USD", "EUR", june(14), dec!(0.93), june(14));
        let caching = CachingRateProvider::new(&inner, Duration::from_secs(60));

        caching.fetch("USD", "EUR", june(14)).await.unwrap();
        caching.evict("USD", "EUR", june(14)).await;
        caching.fetch("USD", "EUR", june(14)).await.unwrap();

        assert_eq!(inner.calls(), 2);
        assert_eq!(inner.evictions(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() {
        let inner = MockRateProvider::new();
        inner.add_rate("USD", "EUR", june(14), dec!(0.93), june(14));
        let caching = CachingRateProvider::new(&inner, Duration::from_millis(0));

        caching.fetch("USD", "EUR", june(14)).await.unwrap();
        caching.fetch("USD", "EUR", june(14)).await.unwrap();
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_source_is_passed_through() {
        let inner = MockRateProvider::new();
        let caching = CachingRateProvider::new(&inner, Duration::from_secs(60));
        assert_eq!(caching.source(), "mock");
    }
}
