use super::ui;
use crate::core::RateResolutionEngine;
use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Converts an amount with locally stored rates only.
pub async fn run(
    engine: &RateResolutionEngine,
    amount: Decimal,
    from: &str,
    to: &str,
    date: NaiveDate,
) -> Result<()> {
    let converted = engine
        .convert(amount, from, to, date)
        .await
        .map_err(super::rate::report_failure)?;

    println!(
        "{} {} = {} {} ({})",
        amount,
        from.to_uppercase(),
        ui::style_text(&converted.to_string(), ui::StyleType::Success),
        to.to_uppercase(),
        ui::style_text(&date.to_string(), ui::StyleType::Subtle)
    );
    Ok(())
}
