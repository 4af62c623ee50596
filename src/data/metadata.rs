use std::{collections::BTreeSet, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::PriceActionError;

/// One listed company as described by the exchange sector files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMetadata {
    pub symbol: String,
    pub sector: Option<String>,
    pub company_name: String,
    pub industry: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataRecord {
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "Sector")]
    sector: Option<String>,
    #[serde(rename = "Company Name")]
    company_name: String,
    #[serde(rename = "Industry")]
    industry: Option<String>,
}

/// The combined stock catalog used to pick a ticker by sector and company.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StockCatalog {
    stocks: Vec<StockMetadata>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl StockCatalog {
    pub fn new(stocks: Vec<StockMetadata>) -> Self {
        Self { stocks }
    }

    /// Reads every `.csv` file in `dir` and appends `symbol_suffix` to each
    /// symbol (e.g. "DLF" becomes "DLF.NS").
    #[instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(dir: P, symbol_suffix: &str) -> Result<Self, PriceActionError> {
        let mut paths: Vec<_> = fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|ext| ext == "csv").unwrap_or(false))
            .collect();
        paths.sort();

        let mut stocks = Vec::new();
        for path in paths {
            debug!("Reading stock metadata from {}", path.display());
            let mut reader = csv::Reader::from_path(&path)?;
            for record in reader.deserialize::<MetadataRecord>() {
                let record = record?;
                stocks.push(StockMetadata {
                    symbol: format!("{}{}", record.symbol.trim(), symbol_suffix),
                    sector: non_empty(record.sector),
                    company_name: record.company_name.trim().to_string(),
                    industry: non_empty(record.industry),
                });
            }
        }
        info!("Loaded metadata for {} stocks", stocks.len());
        Ok(Self::new(stocks))
    }

    pub fn stocks(&self) -> &[StockMetadata] {
        &self.stocks
    }

    /// Distinct sectors in sorted order, ignoring stocks without one.
    pub fn sectors(&self) -> Vec<String> {
        self.stocks
            .iter()
            .filter_map(|s| s.sector.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn companies_in(&self, sector: &str) -> Vec<&StockMetadata> {
        self.stocks
            .iter()
            .filter(|s| s.sector.as_deref() == Some(sector))
            .collect()
    }

    pub fn ticker_for(&self, company_name: &str) -> Option<&str> {
        self.stocks
            .iter()
            .find(|s| s.company_name == company_name)
            .map(|s| s.symbol.as_str())
    }
}
