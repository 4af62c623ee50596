use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use tracing::{debug, info, instrument, warn};

use crate::error::PriceActionError;

use super::price_series::PriceSeries;

/// Supplies the full available closing-price history for a ticker.
///
/// A ticker with no data (delisted, unknown symbol) yields an empty series.
/// Errors are reserved for failures the caller may want to retry.
pub trait PriceSource {
    fn closing_prices(&self, ticker: &str) -> Result<PriceSeries, PriceActionError>;
}

impl<S: PriceSource + ?Sized> PriceSource for &S {
    fn closing_prices(&self, ticker: &str) -> Result<PriceSeries, PriceActionError> {
        (**self).closing_prices(ticker)
    }
}

impl<S: PriceSource + ?Sized> PriceSource for Box<S> {
    fn closing_prices(&self, ticker: &str) -> Result<PriceSeries, PriceActionError> {
        (**self).closing_prices(ticker)
    }
}

/// Serves pre-fetched series from memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    series: HashMap<String, PriceSeries>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.ticker().to_string(), series);
    }
}

impl PriceSource for StaticSource {
    fn closing_prices(&self, ticker: &str) -> Result<PriceSeries, PriceActionError> {
        match self.series.get(ticker) {
            Some(series) => Ok(series.clone()),
            None => {
                warn!("No static series registered for {}", ticker);
                Ok(PriceSeries::empty(ticker))
            }
        }
    }
}

/// Reads `<dir>/<ticker>.csv` files in `Date,Close` layout.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker))
    }
}

impl PriceSource for CsvDirSource {
    #[instrument(skip(self))]
    fn closing_prices(&self, ticker: &str) -> Result<PriceSeries, PriceActionError> {
        let path = self.path_for(ticker);
        if !path.exists() {
            warn!("Price file not found: {}", path.display());
            return Ok(PriceSeries::empty(ticker));
        }
        debug!("Reading prices from {}", path.display());
        let series = PriceSeries::from_csv_path(ticker, &path)?;
        info!("Loaded {} closes for {} from {}", series.len(), ticker, path.display());
        Ok(series)
    }
}
