//! Currency reference data and amount rounding.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Fractional digits kept on stored rates.
pub const RATE_DECIMAL_PLACES: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyId(pub u16);

impl Display for CurrencyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:05}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub id: CurrencyId,
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub decimal_places: u32,
}

/// Lookup of the currencies known to the ledger.
pub trait CurrencyRegistry: Send + Sync {
    fn resolve_by_code(&self, code: &str) -> Option<CurrencyId>;
    fn currency(&self, id: CurrencyId) -> Option<&Currency>;
    fn all(&self) -> &[Currency];

    fn decimal_places(&self, id: CurrencyId) -> Option<u32> {
        self.currency(id).map(|c| c.decimal_places)
    }

    fn code(&self, id: CurrencyId) -> Option<&str> {
        self.currency(id).map(|c| c.code.as_str())
    }
}

/// The fixed set of currencies the ledger ships with.
#[derive(Debug, Clone)]
pub struct SeededCurrencies {
    currencies: Vec<Currency>,
}

impl SeededCurrencies {
    pub fn new() -> Self {
        let seed = [
            (1, "USD", "US Dollar", "$", 2),
            (2, "EUR", "Euro", "€", 2),
            (3, "COP", "Colombian Peso", "COL$", 0),
        ];
        Self {
            currencies: seed
                .into_iter()
                .map(|(id, code, name, symbol, decimal_places)| Currency {
                    id: CurrencyId(id),
                    code: code.to_string(),
                    name: name.to_string(),
                    symbol: symbol.to_string(),
                    decimal_places,
                })
                .collect(),
        }
    }
}

impl Default for SeededCurrencies {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrencyRegistry for SeededCurrencies {
    fn resolve_by_code(&self, code: &str) -> Option<CurrencyId> {
        self.currencies
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .map(|c| c.id)
    }

    fn currency(&self, id: CurrencyId) -> Option<&Currency> {
        self.currencies.iter().find(|c| c.id == id)
    }

    fn all(&self) -> &[Currency] {
        &self.currencies
    }
}

/// Rounds an amount to a currency's precision, half away from zero.
pub fn round_amount(value: Decimal, decimal_places: u32) -> Decimal {
    value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_rate(value: Decimal) -> Decimal {
    round_amount(value, RATE_DECIMAL_PLACES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_seeded_currencies() {
        let registry = SeededCurrencies::new();
        assert_eq!(registry.all().len(), 3);

        let cop = registry.resolve_by_code("COP").unwrap();
        assert_eq!(registry.decimal_places(cop), Some(0));
        assert_eq!(registry.code(cop), Some("COP"));

        let usd = registry.resolve_by_code("usd").unwrap();
        assert_eq!(registry.decimal_places(usd), Some(2));

        assert!(registry.resolve_by_code("GBP").is_none());
        assert!(registry.currency(CurrencyId(99)).is_none());
    }

    #[test]
    fn test_round_amount_half_up() {
        assert_eq!(round_amount(dec!(400012.345678), 0), dec!(400012));
        assert_eq!(round_amount(dec!(2.5), 0), dec!(3));
        assert_eq!(round_amount(dec!(-2.5), 0), dec!(-3));
        assert_eq!(round_amount(dec!(10.005), 2), dec!(10.01));
        assert_eq!(round_amount(dec!(10.004), 2), dec!(10.00));
    }

    #[test]
    fn test_round_rate_keeps_eight_digits() {
        assert_eq!(round_rate(dec!(1.123456789)), dec!(1.12345679));
        assert_eq!(round_rate(dec!(4000.12345678)), dec!(4000.12345678));
    }

    #[test]
    fn test_currency_id_display_is_padded() {
        assert_eq!(CurrencyId(3).to_string(), "00003");
    }
}
