pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::{RateCommand, TxCommand};
use crate::core::config::{AppConfig, ProviderKind};
use crate::core::{
    ConversionBatchCoordinator, RateProvider, RateResolutionEngine, SeededCurrencies,
    TransactionAmountCache, TransactionStore,
};
use crate::providers::{CachingRateProvider, EcbProvider, FrankfurterProvider};
use crate::store::DiskStore;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Rate(RateCommand),
    Convert {
        amount: Decimal,
        from: String,
        to: String,
        date: NaiveDate,
    },
    Tx(TxCommand),
}

/// Everything a command needs, wired from one configuration.
pub struct App {
    pub config: AppConfig,
    pub engine: Arc<RateResolutionEngine>,
    pub transactions: Arc<dyn TransactionStore>,
    pub amounts: Arc<TransactionAmountCache>,
    pub batch: ConversionBatchCoordinator,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let data_path = config.data_path()?;
        let store = Arc::new(
            DiskStore::open(&data_path)
                .with_context(|| format!("Failed to open store at {}", data_path.display()))?,
        );

        let provider = build_provider(&config)?;
        info!(source = provider.source(), "Using rate provider");

        let engine = Arc::new(RateResolutionEngine::new(
            Arc::new(SeededCurrencies::new()),
            store.clone(),
            provider,
        ));
        let amounts = Arc::new(TransactionAmountCache::new(engine.clone(), store.clone()));
        let batch = ConversionBatchCoordinator::new(amounts.clone());

        Ok(Self {
            config,
            engine,
            transactions: store,
            amounts,
            batch,
        })
    }
}

fn build_provider(config: &AppConfig) -> Result<Arc<dyn RateProvider>> {
    let fetch = config.fetch.clone();
    let ttl = fetch.ttl();
    let provider: Arc<dyn RateProvider> = match config.providers.default {
        ProviderKind::Ecb => {
            let base_url = config
                .providers
                .ecb
                .as_ref()
                .map_or("https://data-api.ecb.europa.eu", |p| &p.base_url);
            Arc::new(CachingRateProvider::new(
                EcbProvider::new(base_url, fetch).context("Failed to build ECB provider")?,
                ttl,
            ))
        }
        ProviderKind::Frankfurter => {
            let base_url = config
                .providers
                .frankfurter
                .as_ref()
                .map_or("https://api.frankfurter.dev/v1", |p| &p.base_url);
            Arc::new(CachingRateProvider::new(
                FrankfurterProvider::new(base_url, fetch)
                    .context("Failed to build Frankfurter provider")?,
                ttl,
            ))
        }
    };
    Ok(provider)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxledger starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = App::new(config)?;
    match command {
        AppCommand::Rate(cmd) => cli::rate::run(&app.engine, cmd).await,
        AppCommand::Convert {
            amount,
            from,
            to,
            date,
        } => cli::convert::run(&app.engine, amount, &from, &to, date).await,
        AppCommand::Tx(cmd) => cli::tx::run(&app, cmd).await,
    }
}
