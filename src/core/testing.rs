//! Test doubles shared by the core unit tests.

use crate::core::error::{FxError, Result};
use crate::core::provider::{FetchedRate, RateProvider};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

type Key = (String, String, NaiveDate);

/// Canned provider answers with call counting.
pub struct MockRateProvider {
    responses: Mutex<HashMap<Key, Result<FetchedRate>>>,
    calls: AtomicUsize,
    evictions: AtomicUsize,
}

impl MockRateProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            evictions: AtomicUsize::new(0),
        }
    }

    fn key(from: &str, to: &str, date: NaiveDate) -> Key {
        (from.to_uppercase(), to.to_uppercase(), date)
    }

    /// Answers a request for `requested` with `rate` dated `returned`.
    pub fn add_rate(
        &self,
        from: &str,
        to: &str,
        requested: NaiveDate,
        rate: Decimal,
        returned: NaiveDate,
    ) {
        self.responses.lock().unwrap().insert(
            Self::key(from, to, requested),
            Ok(FetchedRate {
                rate,
                date: returned,
            }),
        );
    }

    pub fn add_error(&self, from: &str, to: &str, requested: NaiveDate, error: FxError) {
        self.responses
            .lock()
            .unwrap()
            .insert(Self::key(from, to, requested), Err(error));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn evictions(&self) -> usize {
        self.evictions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateProvider for MockRateProvider {
    fn source(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, from: &str, to: &str, date: NaiveDate) -> Result<FetchedRate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .get(&Self::key(from, to, date))
            .cloned()
            .unwrap_or_else(|| {
                Err(FxError::RateUnavailable {
                    from: from.to_string(),
                    to: to.to_string(),
                    date,
                })
            })
    }

    async fn evict(&self, _from: &str, _to: &str, _date: NaiveDate) {
        self.evictions.fetch_add(1, Ordering::SeqCst);
    }
}
