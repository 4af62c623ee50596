use std::{
    fs::File,
    io::{BufReader, Write as _},
    path::{Path, PathBuf},
};

use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_yaml::from_reader;
use tracing::{debug, info, instrument};

use crate::error::PriceActionError;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PriceActionConfig {
    pub tickers: Vec<String>,
    #[serde(rename = "metadata-dir", default)]
    pub metadata_dir: Option<PathBuf>,
    #[serde(rename = "symbol-suffix", default = "default_symbol_suffix")]
    pub symbol_suffix: String,
    #[serde(rename = "cache-enabled", default)]
    pub cache_enabled: bool,
    #[serde(rename = "cache-dir", default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(rename = "price-ttl-secs", default = "default_price_ttl_secs")]
    pub price_ttl_secs: i64,
    #[serde(rename = "analysis-ttl-secs", default = "default_analysis_ttl_secs")]
    pub analysis_ttl_secs: i64,
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(rename = "yahoo-base-url", default = "default_yahoo_base_url")]
    pub yahoo_base_url: String,
}

const DEFAULT_DATA: &str = r#"
tickers:
  - "^CNXREALTY"
  - "ANANTRAJ.NS"
  - "BRIGADE.NS"
  - "DLF.NS"
  - "SOBHA.NS"
  - "RAYMOND.NS"
  - "PHOENIXLTD.NS"
  - "PRESTIGE.NS"
  - "LODHA.NS"
  - "GODREJPROP.NS"
  - "OBEROIRLTY.NS"
metadata-dir: "data/stocks"
symbol-suffix: ".NS"
cache-enabled: true
price-ttl-secs: 86400
analysis-ttl-secs: 3600
output-dir: "data"
"#;

fn default_symbol_suffix() -> String {
    ".NS".to_string()
}

fn default_price_ttl_secs() -> i64 {
    60 * 60 * 24
}

fn default_analysis_ttl_secs() -> i64 {
    60 * 60
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_yahoo_base_url() -> String {
    DEFAULT_YAHOO_BASE_URL.to_string()
}

impl Default for PriceActionConfig {
    fn default() -> Self {
        Self {
            tickers: [
                "^CNXREALTY",
                "ANANTRAJ.NS",
                "BRIGADE.NS",
                "DLF.NS",
                "SOBHA.NS",
                "RAYMOND.NS",
                "PHOENIXLTD.NS",
                "PRESTIGE.NS",
                "LODHA.NS",
                "GODREJPROP.NS",
                "OBEROIRLTY.NS",
            ]
            .iter()
            .map(|t| t.to_string())
            .collect(),
            metadata_dir: Some(PathBuf::from("data/stocks")),
            symbol_suffix: default_symbol_suffix(),
            cache_enabled: true,
            cache_dir: None,
            price_ttl_secs: default_price_ttl_secs(),
            analysis_ttl_secs: default_analysis_ttl_secs(),
            output_dir: default_output_dir(),
            yahoo_base_url: default_yahoo_base_url(),
        }
    }
}

fn ttl_from_secs(name: &str, secs: i64) -> Result<Duration, PriceActionError> {
    if secs <= 0 {
        return Err(PriceActionError::ConfigError(format!(
            "{} must be positive, got {}",
            name, secs
        )));
    }
    Duration::try_seconds(secs).ok_or_else(|| {
        PriceActionError::ConfigError(format!("{} is out of range: {}", name, secs))
    })
}

impl PriceActionConfig {
    /// Reads the configuration from a YAML file.
    ///
    /// If the file does not exist, a default configuration file is written
    /// to that path and the default configuration is returned.
    #[instrument(level = "info", skip(filename))]
    pub fn read_config<P: AsRef<Path>>(filename: Option<P>) -> Result<Self, PriceActionError> {
        let path = filename
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(|| Path::new("config.yml").to_path_buf());

        info!(path = %path.display(), "Reading configuration");

        if !path.exists() {
            info!(
                "Config file does not exist. Creating default config at {}",
                path.display()
            );
            let mut file = File::create(&path)?;
            file.write_all(DEFAULT_DATA.as_bytes())?;
            debug!("Default configuration file created");
            return Ok(PriceActionConfig::default());
        }

        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let config: Self = from_reader(reader)?;
        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    fn validate(&self) -> Result<(), PriceActionError> {
        ttl_from_secs("price-ttl-secs", self.price_ttl_secs)?;
        ttl_from_secs("analysis-ttl-secs", self.analysis_ttl_secs)?;
        Ok(())
    }

    /// How long raw price history may be reused before refetching.
    pub fn price_ttl(&self) -> Duration {
        Duration::try_seconds(self.price_ttl_secs).unwrap_or(Duration::MAX)
    }

    /// How long a computed analysis table may be reused.
    pub fn analysis_ttl(&self) -> Duration {
        Duration::try_seconds(self.analysis_ttl_secs).unwrap_or(Duration::MAX)
    }

    /// Resolves the on-disk price cache directory, falling back to the
    /// platform cache directory when none is configured.
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Some(dir.clone());
        }
        ProjectDirs::from("", "", "price-action").map(|dirs| dirs.cache_dir().to_path_buf())
    }
}
