use super::ui;
use crate::core::{CurrencyId, FxError, FxRate, RateResolutionEngine, ResolvedRate};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use comfy_table::Cell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateCommand {
    Find {
        from: String,
        to: String,
        date: NaiveDate,
    },
    Fetch {
        from: String,
        to: String,
        date: NaiveDate,
    },
    Replicate {
        from: String,
        to: String,
        date: NaiveDate,
    },
    Refetch {
        from: String,
        to: String,
        date: NaiveDate,
    },
    Fill {
        from: String,
        to: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    List {
        from: String,
        to: String,
    },
}

pub async fn run(engine: &RateResolutionEngine, command: RateCommand) -> Result<()> {
    match command {
        RateCommand::Find { from, to, date } => match engine.find_rate(&from, &to, date).await? {
            Some(ResolvedRate::Identity { currency, .. }) => {
                println!("{currency}/{currency} on {date}: 1");
            }
            Some(ResolvedRate::Persisted(rate)) => {
                if rate.date != date {
                    println!(
                        "{}",
                        ui::style_text(
                            &format!("No rate stored for {date}; using {}", rate.date),
                            ui::StyleType::Subtle
                        )
                    );
                }
                display_rates(engine, &[rate]);
            }
            None => println!("No {from}/{to} rate stored on or before {date}"),
        },
        RateCommand::Fetch { from, to, date } => {
            let fetched = engine
                .fetch_missing_rate(&from, &to, date)
                .await
                .map_err(report_failure)?;
            if let Some(rate) = fetched.as_persisted() {
                if rate.date != date {
                    println!(
                        "{}",
                        ui::style_text(
                            &format!("The source had no rate for {date}; stored {}", rate.date),
                            ui::StyleType::Subtle
                        )
                    );
                }
                display_rates(engine, std::slice::from_ref(rate));
            }
        }
        RateCommand::Replicate { from, to, date } => {
            let rate = engine
                .replicate_rate(&from, &to, date)
                .await
                .map_err(report_failure)?;
            display_rates(engine, &[rate]);
        }
        RateCommand::Refetch { from, to, date } => {
            let existing = engine
                .find_rate(&from, &to, date)
                .await?
                .and_then(ResolvedRate::into_persisted)
                .filter(|rate| rate.date == date)
                .ok_or_else(|| anyhow!("No {from}/{to} rate stored for {date}"))?;

            let updated = engine
                .refetch_rate(&existing)
                .await
                .map_err(report_failure)?;
            let summary = if updated.rate == existing.rate {
                format!("{from}/{to} on {date} confirmed unchanged at {}", updated.rate)
            } else {
                format!(
                    "{from}/{to} on {date} changed from {} to {}",
                    existing.rate, updated.rate
                )
            };
            println!("{}", ui::style_text(&summary, ui::StyleType::Success));
        }
        RateCommand::Fill {
            from,
            to,
            start,
            end,
        } => {
            let created = engine
                .fill_gaps(&from, &to, start, end)
                .await
                .map_err(report_failure)?;
            if created.is_empty() {
                println!("No gaps between {start} and {end}");
            } else {
                display_rates(engine, &created);
            }
        }
        RateCommand::List { from, to } => {
            let rates = engine.list_rates(&from, &to).await?;
            if rates.is_empty() {
                println!("No {from}/{to} rates stored");
            } else {
                display_rates(engine, &rates);
            }
        }
    }
    Ok(())
}

/// Shows the user-facing explanation and hands the error back.
pub(crate) fn report_failure(err: FxError) -> anyhow::Error {
    eprintln!("{}", ui::style_text(&err.user_message(), ui::StyleType::Error));
    err.into()
}

fn display_rates(engine: &RateResolutionEngine, rates: &[FxRate]) {
    let code = |id: CurrencyId| engine.registry().code(id).unwrap_or("?").to_string();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Date"),
        ui::header_cell("Rate"),
        ui::header_cell("Source"),
        ui::header_cell("Replicated From"),
    ]);

    for rate in rates {
        table.add_row(vec![
            Cell::new(format!(
                "{}/{}",
                code(rate.from_currency),
                code(rate.to_currency)
            )),
            Cell::new(rate.date),
            ui::decimal_cell(rate.rate),
            Cell::new(rate.source.as_str()),
            ui::format_optional_cell(rate.replicated_from_date, |d| d.to_string()),
        ]);
    }

    println!("{table}");
}
