use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

/// Transport settings handed to every rate provider at construction.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FetchSettings {
    pub ttl_seconds: u64,
    /// Total attempts, including the first one.
    pub retry_attempts: usize,
    pub retry_delay_ms: u64,
    pub timeout_seconds: u64,
    pub allowed_currencies: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            ttl_seconds: 86_400,
            retry_attempts: 3,
            retry_delay_ms: 500,
            timeout_seconds: 30,
            allowed_currencies: vec!["USD".to_string(), "EUR".to_string(), "COP".to_string()],
        }
    }
}

impl FetchSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ecb,
    Frankfurter,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EcbProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FrankfurterProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub default: ProviderKind,
    pub ecb: Option<EcbProviderConfig>,
    pub frankfurter: Option<FrankfurterProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            default: ProviderKind::Ecb,
            ecb: Some(EcbProviderConfig {
                base_url: "https://data-api.ecb.europa.eu".to_string(),
            }),
            frankfurter: Some(FrankfurterProviderConfig {
                base_url: "https://api.frankfurter.dev/v1".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub base_currency: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub fetch: FetchSettings,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fxledger", "fxledger")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "fxledger", "fxledger")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("base_currency: USD").unwrap();

        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.providers.default, ProviderKind::Ecb);
        assert_eq!(
            config.providers.ecb.unwrap().base_url,
            "https://data-api.ecb.europa.eu"
        );
        assert_eq!(config.fetch, FetchSettings::default());
        assert_eq!(config.fetch.ttl(), Duration::from_secs(86_400));
        assert_eq!(config.fetch.retry_attempts, 3);
        assert_eq!(config.fetch.timeout(), Duration::from_secs(30));
        assert!(config.data_path.is_none());
    }

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
base_currency: "COP"
data_path: "/tmp/fxledger"
providers:
  default: frankfurter
  frankfurter:
    base_url: "http://example.com/frankfurter"
fetch:
  retry_attempts: 5
  allowed_currencies: ["USD", "EUR"]
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.base_currency, "COP");
        assert_eq!(config.providers.default, ProviderKind::Frankfurter);
        assert!(config.providers.ecb.is_none());
        assert_eq!(
            config.providers.frankfurter.as_ref().unwrap().base_url,
            "http://example.com/frankfurter"
        );
        assert_eq!(config.fetch.retry_attempts, 5);
        assert_eq!(config.fetch.ttl_seconds, 86_400);
        assert_eq!(config.fetch.allowed_currencies, vec!["USD", "EUR"]);
        assert_eq!(config.data_path().unwrap(), PathBuf::from("/tmp/fxledger"));
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = AppConfig::load_from_path("/definitely/not/here.yaml");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
