use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use fxledger::cli::{RateCommand, TxCommand, setup::setup};
use fxledger::core::log::init_logging;
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Look up, fetch and maintain stored rates
    #[command(subcommand)]
    Rate(RateArgs),
    /// Convert an amount using stored rates only
    Convert {
        amount: Decimal,
        from: String,
        to: String,
        /// Rate date, defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Record transactions and convert their amounts
    #[command(subcommand)]
    Tx(TxArgs),
}

#[derive(Subcommand)]
enum RateArgs {
    /// Show the best stored rate for a day
    Find {
        from: String,
        to: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Fetch a day that is not stored yet
    Fetch {
        from: String,
        to: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Copy the previous stored rate onto a day
    Replicate {
        from: String,
        to: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Re-validate a stored day against the source
    Refetch {
        from: String,
        to: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Replicate every missing day in a range
    Fill {
        from: String,
        to: String,
        #[arg(long)]
        start: NaiveDate,
        /// Last day, defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// List every stored rate of a pair
    List { from: String, to: String },
}

#[derive(Subcommand)]
enum TxArgs {
    /// Record a transaction
    Add {
        amount: Decimal,
        currency: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Convert all transactions, defaults to the base currency
    Convert { currency: Option<String> },
    /// Show how many transactions are converted
    Stats { currency: Option<String> },
    /// Forget converted amounts
    Clear {
        #[arg(long)]
        currency: Option<String>,
    },
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl From<RateArgs> for RateCommand {
    fn from(args: RateArgs) -> RateCommand {
        match args {
            RateArgs::Find { from, to, date } => RateCommand::Find {
                from,
                to,
                date: date.unwrap_or_else(today),
            },
            RateArgs::Fetch { from, to, date } => RateCommand::Fetch {
                from,
                to,
                date: date.unwrap_or_else(today),
            },
            RateArgs::Replicate { from, to, date } => RateCommand::Replicate {
                from,
                to,
                date: date.unwrap_or_else(today),
            },
            RateArgs::Refetch { from, to, date } => RateCommand::Refetch {
                from,
                to,
                date: date.unwrap_or_else(today),
            },
            RateArgs::Fill {
                from,
                to,
                start,
                end,
            } => RateCommand::Fill {
                from,
                to,
                start,
                end: end.unwrap_or_else(today),
            },
            RateArgs::List { from, to } => RateCommand::List { from, to },
        }
    }
}

impl From<TxArgs> for TxCommand {
    fn from(args: TxArgs) -> TxCommand {
        match args {
            TxArgs::Add {
                amount,
                currency,
                date,
            } => TxCommand::Add {
                amount,
                currency,
                date: date.unwrap_or_else(today),
            },
            TxArgs::Convert { currency } => TxCommand::Convert { currency },
            TxArgs::Stats { currency } => TxCommand::Stats { currency },
            TxArgs::Clear { currency } => TxCommand::Clear { currency },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let command = match cli.command {
        Some(Commands::Setup) => {
            let result = setup();
            if let Err(e) = &result {
                tracing::error!(error = %e, "Setup failed");
            }
            return result;
        }
        Some(Commands::Rate(args)) => fxledger::AppCommand::Rate(args.into()),
        Some(Commands::Convert {
            amount,
            from,
            to,
            date,
        }) => fxledger::AppCommand::Convert {
            amount,
            from,
            to,
            date: date.unwrap_or_else(today),
        },
        Some(Commands::Tx(args)) => fxledger::AppCommand::Tx(args.into()),
        None => {
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    let result = fxledger::run_command(command, cli.config_path.as_deref()).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
