use chrono::NaiveDate;
use fxledger::AppCommand;
use fxledger::cli::{RateCommand, TxCommand};
use fxledger::core::{CurrencyId, RateRepository, RateSource, TransactionStore};
use fxledger::store::DiskStore;
use rust_decimal_macros::dec;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub fn ecb_body(date: &str, value: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<message:GenericData xmlns:message="http://www.sdmx.org/resources/sdmxml/schemas/v2_1/message" xmlns:generic="http://www.sdmx.org/resources/sdmxml/schemas/v2_1/data/generic">
  <message:DataSet>
    <generic:Series>
      <generic:Obs>
        <generic:ObsDimension value="{date}"/>
        <generic:ObsValue value="{value}"/>
      </generic:Obs>
    </generic:Series>
  </message:DataSet>
</message:GenericData>"#
        )
    }

    pub async fn mount_ecb_quote(server: &MockServer, currency: &str, date: &str, value: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/service/data/EXR/D.{currency}.EUR.SP00.A")))
            .and(query_param("startPeriod", date))
            .and(query_param("endPeriod", date))
            .respond_with(ResponseTemplate::new(200).set_body_string(ecb_body(date, value)))
            .mount(server)
            .await;
    }
}

struct Workspace {
    dir: TempDir,
    config_path: String,
}

impl Workspace {
    fn new(ecb_url: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_path = dir.path().join("config.yaml");
        let data_path = dir.path().join("data");
        let config_content = format!(
            r#"
base_currency: "USD"
data_path: "{}"
providers:
  default: ecb
  ecb:
    base_url: "{}"
fetch:
  retry_attempts: 1
  retry_delay_ms: 1
"#,
            data_path.display(),
            ecb_url
        );
        fs::write(&config_path, config_content).expect("Failed to write config file");

        Self {
            config_path: config_path.to_string_lossy().to_string(),
            dir,
        }
    }

    async fn run(&self, command: AppCommand) -> anyhow::Result<()> {
        fxledger::run_command(command, Some(&self.config_path)).await
    }

    fn data_path(&self) -> std::path::PathBuf {
        self.dir.path().join("data")
    }
}

fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

fn open_store(path: &Path) -> DiskStore {
    DiskStore::open(path).expect("Failed to reopen store")
}

#[test_log::test(tokio::test)]
async fn test_fetch_convert_and_transactions_with_ecb_mock() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_ecb_quote(&server, "USD", "2024-06-14", "1.0722").await;
    let ws = Workspace::new(&server.uri());

    ws.run(AppCommand::Rate(RateCommand::Fetch {
        from: "EUR".to_string(),
        to: "USD".to_string(),
        date: june(14),
    }))
    .await
    .expect("fetch failed");

    // A weekend conversion falls back to Friday's stored rate.
    ws.run(AppCommand::Convert {
        amount: dec!(100),
        from: "EUR".to_string(),
        to: "USD".to_string(),
        date: june(15),
    })
    .await
    .expect("convert failed");

    ws.run(AppCommand::Rate(RateCommand::Replicate {
        from: "EUR".to_string(),
        to: "USD".to_string(),
        date: june(15),
    }))
    .await
    .expect("replicate failed");

    ws.run(AppCommand::Tx(TxCommand::Add {
        amount: dec!(250.50),
        currency: "eur".to_string(),
        date: june(16),
    }))
    .await
    .expect("tx add failed");

    ws.run(AppCommand::Tx(TxCommand::Convert { currency: None }))
        .await
        .expect("tx convert failed");

    ws.run(AppCommand::Tx(TxCommand::Stats { currency: None }))
        .await
        .expect("tx stats failed");

    let store = open_store(&ws.data_path());
    let eur = CurrencyId(2);
    let usd = CurrencyId(1);
    let rates = RateRepository::list(&store, eur, usd).await.unwrap();
    info!(?rates, "Stored rates");
    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0].rate, dec!(1.0722));
    assert_eq!(rates[0].source, RateSource::Ecb);
    assert!(rates[1].is_replicated);
    assert_eq!(rates[1].replicated_from_date, Some(june(14)));

    let transactions = TransactionStore::list(&store).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].currency, "EUR");
    // 250.50 * 1.0722 = 268.58610, rounded half-up to cents.
    assert_eq!(transactions[0].stored_amount("USD"), Some(dec!(268.59)));
}

#[test_log::test(tokio::test)]
async fn test_manual_fetch_guards() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_ecb_quote(&server, "USD", "2024-06-14", "1.0722").await;
    let ws = Workspace::new(&server.uri());

    let fetch = |from: &str, to: &str, date: NaiveDate| {
        AppCommand::Rate(RateCommand::Fetch {
            from: from.to_string(),
            to: to.to_string(),
            date,
        })
    };

    ws.run(fetch("EUR", "USD", june(14))).await.unwrap();

    let duplicate = ws.run(fetch("EUR", "USD", june(14))).await;
    assert!(duplicate.unwrap_err().to_string().contains("already exists"));

    let same = ws.run(fetch("USD", "USD", june(14))).await;
    assert!(same.unwrap_err().to_string().contains("against itself"));

    let future = chrono::Utc::now().date_naive() + chrono::Duration::days(3);
    let result = ws.run(fetch("EUR", "USD", future)).await;
    assert!(result.unwrap_err().to_string().contains("future"));

    let result = ws.run(fetch("EUR", "GBP", june(14))).await;
    assert!(result.unwrap_err().to_string().contains("GBP"));
}

#[test_log::test(tokio::test)]
async fn test_refetch_overwrites_replicated_row() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_ecb_quote(&server, "USD", "2024-06-14", "1.0722").await;
    test_utils::mount_ecb_quote(&server, "USD", "2024-06-17", "1.0701").await;
    let ws = Workspace::new(&server.uri());

    ws.run(AppCommand::Rate(RateCommand::Fetch {
        from: "EUR".to_string(),
        to: "USD".to_string(),
        date: june(14),
    }))
    .await
    .unwrap();

    ws.run(AppCommand::Rate(RateCommand::Fill {
        from: "EUR".to_string(),
        to: "USD".to_string(),
        start: june(14),
        end: june(17),
    }))
    .await
    .unwrap();

    ws.run(AppCommand::Rate(RateCommand::Refetch {
        from: "EUR".to_string(),
        to: "USD".to_string(),
        date: june(17),
    }))
    .await
    .unwrap();

    let store = open_store(&ws.data_path());
    let rates = RateRepository::list(&store, CurrencyId(2), CurrencyId(1))
        .await
        .unwrap();
    assert_eq!(rates.len(), 4);
    assert!(rates[1].is_replicated);
    assert!(rates[2].is_replicated);

    let refetched = &rates[3];
    assert_eq!(refetched.date, june(17));
    assert_eq!(refetched.rate, dec!(1.0701));
    assert!(!refetched.is_replicated);
    assert!(refetched.replicated_from_date.is_none());
}

#[test_log::test(tokio::test)]
async fn test_missing_config_fails() {
    let result = fxledger::run_command(
        AppCommand::Rate(RateCommand::List {
            from: "EUR".to_string(),
            to: "USD".to_string(),
        }),
        Some("/definitely/not/here.yaml"),
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_tx_add_rejects_fractional_zero_decimal_amount() {
    let server = wiremock::MockServer::start().await;
    let ws = Workspace::new(&server.uri());

    let result = ws
        .run(AppCommand::Tx(TxCommand::Add {
            amount: dec!(100.5),
            currency: "COP".to_string(),
            date: june(14),
        }))
        .await;
    assert!(result.unwrap_err().to_string().contains("decimal places"));

    let store = open_store(&ws.data_path());
    assert!(TransactionStore::list(&store).await.unwrap().is_empty());
}
