use super::ui;
use crate::App;
use crate::core::{ConversionStats, FxError, Transaction};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxCommand {
    Add {
        amount: Decimal,
        currency: String,
        date: NaiveDate,
    },
    /// Converts every stored transaction; `None` means the base currency.
    Convert { currency: Option<String> },
    Stats { currency: Option<String> },
    /// Empties one slot on every transaction, or all derived slots.
    Clear { currency: Option<String> },
}

pub async fn run(app: &App, command: TxCommand) -> Result<()> {
    match command {
        TxCommand::Add {
            amount,
            currency,
            date,
        } => {
            if app.engine.registry().resolve_by_code(&currency).is_none() {
                return Err(FxError::UnknownCurrency(currency).into());
            }
            let transaction = Transaction::new(date, &currency, amount);
            app.amounts.validate_amount(&transaction)?;
            app.transactions.save(&transaction).await?;
            println!(
                "Added {} {} on {} ({})",
                transaction.amount,
                transaction.currency,
                transaction.date,
                ui::style_text(&transaction.id.to_string(), ui::StyleType::Subtle)
            );
        }
        TxCommand::Convert { currency } => {
            let target = target_or_base(app, currency);
            let mut transactions = app.transactions.list().await?;
            if transactions.is_empty() {
                println!("No transactions stored");
                return Ok(());
            }

            let pb = ui::new_progress_bar(transactions.len() as u64, true);
            pb.set_message(format!("Converting to {target}"));
            pb.enable_steady_tick(Duration::from_millis(100));
            let results = app
                .batch
                .convert_batch_with_progress(&mut transactions, &target, |_| pb.inc(1))
                .await;
            pb.finish_and_clear();

            display_conversions(&transactions, &results, &target);
        }
        TxCommand::Stats { currency } => {
            let target = target_or_base(app, currency);
            let transactions = app.transactions.list().await?;
            display_stats(&app.batch.conversion_stats(&transactions, &target), &target);
        }
        TxCommand::Clear { currency } => {
            let mut cleared = 0;
            for mut transaction in app.transactions.list().await? {
                app.amounts
                    .clear_conversions(&mut transaction, currency.as_deref())
                    .await?;
                cleared += 1;
            }
            let scope = currency.map_or("all converted".to_string(), |c| c.to_uppercase());
            println!("Cleared {scope} amounts on {cleared} transactions");
        }
    }
    Ok(())
}

fn target_or_base(app: &App, currency: Option<String>) -> String {
    currency
        .unwrap_or_else(|| app.config.base_currency.clone())
        .to_uppercase()
}

fn display_conversions(
    transactions: &[Transaction],
    results: &HashMap<Uuid, Option<Decimal>>,
    target: &str,
) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Amount"),
        ui::header_cell("Currency"),
        ui::header_cell(&format!("Amount ({target})")),
    ]);

    for transaction in transactions {
        let converted = results.get(&transaction.id).copied().flatten();
        table.add_row(vec![
            Cell::new(transaction.date),
            ui::decimal_cell(transaction.amount),
            Cell::new(&transaction.currency),
            ui::format_optional_cell(converted, |v| v.to_string()),
        ]);
    }

    println!("{table}");

    let failed = results.values().filter(|v| v.is_none()).count();
    if failed > 0 {
        println!(
            "{}",
            ui::style_text(
                &format!("{failed} transactions could not be converted to {target}"),
                ui::StyleType::Error
            )
        );
    }
}

fn display_stats(stats: &ConversionStats, target: &str) {
    println!(
        "\n{}",
        ui::style_text(&format!("Conversion to {target}"), ui::StyleType::Title)
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Bucket"), ui::header_cell("Count")]);
    for (label, count) in [
        ("Total", stats.total),
        ("Same as original", stats.same_as_original),
        ("Already converted", stats.already_converted),
        ("Need conversion", stats.need_conversion),
    ] {
        table.add_row(vec![Cell::new(label), ui::decimal_cell(Decimal::from(count))]);
    }
    table.add_row(vec![
        Cell::new("Converted %"),
        ui::decimal_cell(stats.conversion_rate_percent),
    ]);

    println!("{table}");
}
