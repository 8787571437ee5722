use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A ledger transaction, reduced to what amount conversion needs.
///
/// `converted` holds one slot per supported currency code; a missing key is
/// an empty slot. The slot for `currency` itself, once filled, equals `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    #[serde(default)]
    pub converted: BTreeMap<String, Decimal>,
}

impl Transaction {
    pub fn new(date: NaiveDate, currency: &str, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            currency: currency.to_uppercase(),
            amount,
            converted: BTreeMap::new(),
        }
    }

    pub fn stored_amount(&self, currency: &str) -> Option<Decimal> {
        self.converted.get(&currency.to_uppercase()).copied()
    }

    pub fn is_original(&self, currency: &str) -> bool {
        self.currency.eq_ignore_ascii_case(currency)
    }

    pub(crate) fn set_amount(&mut self, currency: &str, amount: Option<Decimal>) {
        let key = currency.to_uppercase();
        match amount {
            Some(value) => {
                self.converted.insert(key, value);
            }
            None => {
                self.converted.remove(&key);
            }
        }
    }
}
