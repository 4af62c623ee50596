use chrono::Duration;
use tracing::{debug, info, instrument, warn};

use crate::{
    chart::{build_average_bar_chart, build_heatmap, BarChart, HeatmapChart},
    config::PriceActionConfig,
    data::{
        cache::{CacheKey, Clock, DiskCache, FetchKind, SystemClock, TtlCache},
        price_series::PriceSeries,
        source::PriceSource,
    },
    error::PriceActionError,
};

use super::{
    format::{format_analysis, DisplayTable},
    monthly::{compute_analysis, AnalysisTable},
};

/// Entry point for table and chart consumers. Raw price history and computed
/// tables are cached per ticker with independent TTLs, so the table and both
/// charts for a ticker share a single fetch.
pub struct AnalysisService<S, C = SystemClock> {
    source: S,
    clock: C,
    prices: TtlCache<PriceSeries>,
    analyses: TtlCache<AnalysisTable>,
    disk: Option<DiskCache>,
}

impl<S: PriceSource> AnalysisService<S, SystemClock> {
    /// Service with the default TTLs: 24 hours for prices, 1 hour for tables.
    pub fn new(source: S) -> Self {
        Self::with_clock(source, SystemClock, Duration::hours(24), Duration::hours(1))
    }

    pub fn from_config(source: S, config: &PriceActionConfig) -> Self {
        let service = Self::with_clock(
            source,
            SystemClock,
            config.price_ttl(),
            config.analysis_ttl(),
        );
        if !config.cache_enabled {
            return service;
        }
        match config.resolved_cache_dir() {
            Some(dir) => {
                info!("Price history disk cache at {}", dir.display());
                service.with_disk_cache(DiskCache::new(dir, config.price_ttl()))
            }
            None => {
                warn!("Cache enabled but no cache directory could be resolved");
                service
            }
        }
    }
}

impl<S: PriceSource, C: Clock> AnalysisService<S, C> {
    pub fn with_clock(source: S, clock: C, price_ttl: Duration, analysis_ttl: Duration) -> Self {
        Self {
            source,
            clock,
            prices: TtlCache::new(price_ttl),
            analyses: TtlCache::new(analysis_ttl),
            disk: None,
        }
    }

    pub fn with_disk_cache(mut self, disk: DiskCache) -> Self {
        self.disk = Some(disk);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Full closing-price history, fetched at most once per price TTL. A
    /// series read from the disk cache keeps its original save time, so the
    /// TTL is counted from the fetch and not from the disk read.
    #[instrument(skip(self))]
    pub fn closing_prices(&mut self, ticker: &str) -> Result<PriceSeries, PriceActionError> {
        let key = CacheKey::new(ticker, FetchKind::PriceHistory);
        let now = self.clock.now();
        if let Some(series) = self.prices.get(&key, now) {
            debug!("Reusing cached price history for {}", ticker);
            return Ok(series);
        }

        if let Some(disk) = &self.disk {
            match disk.load(ticker, now) {
                Ok(Some(cached)) => {
                    self.prices.insert(key, cached.series.clone(), cached.saved_at);
                    return Ok(cached.series);
                }
                Ok(None) => {}
                Err(e) => warn!("Error reading disk cache for {}: {}", ticker, e),
            }
        }

        let series = self.source.closing_prices(ticker)?;
        if series.is_empty() {
            warn!("No price data for {}", ticker);
        } else if let Some(disk) = &self.disk {
            if let Err(e) = disk.save(&series) {
                warn!("Error writing disk cache for {}: {}", ticker, e);
            }
        }
        self.prices.insert(key, series.clone(), now);
        Ok(series)
    }

    /// Monthly analysis for a ticker, reused for the analysis TTL.
    #[instrument(skip(self))]
    pub fn monthly_analysis(&mut self, ticker: &str) -> Result<AnalysisTable, PriceActionError> {
        let key = CacheKey::new(ticker, FetchKind::Analysis);
        let now = self.clock.now();
        if let Some(table) = self.analyses.get(&key, now) {
            debug!("Reusing cached analysis for {}", ticker);
            return Ok(table);
        }
        let series = self.closing_prices(ticker)?;
        let table = compute_analysis(&series);
        info!(
            "Computed analysis for {}: {} rows from {} closes",
            ticker,
            table.len(),
            series.len()
        );
        self.analyses.insert(key, table.clone(), now);
        Ok(table)
    }

    /// Analysis of a caller-supplied series. Nothing is fetched or cached.
    pub fn analysis_for_series(&self, series: &PriceSeries) -> AnalysisTable {
        compute_analysis(series)
    }

    pub fn formatted_table(&mut self, ticker: &str) -> Result<DisplayTable, PriceActionError> {
        Ok(format_analysis(&self.monthly_analysis(ticker)?))
    }

    pub fn heatmap(&mut self, ticker: &str) -> Result<HeatmapChart, PriceActionError> {
        let table = self.monthly_analysis(ticker)?;
        Ok(build_heatmap(ticker, &table.return_grid()))
    }

    pub fn average_bar_chart(&mut self, ticker: &str) -> Result<BarChart, PriceActionError> {
        Ok(build_average_bar_chart(&self.monthly_analysis(ticker)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{cache::ManualClock, price_series::PricePoint};
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::cell::Cell;
    use tempfile::tempdir;

    struct CountingSource {
        calls: Cell<usize>,
        fail: bool,
    }

    impl PriceSource for CountingSource {
        fn closing_prices(&self, ticker: &str) -> Result<PriceSeries, PriceActionError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(PriceActionError::data_unavailable(ticker, "network down"));
            }
            let d = |m: u32| NaiveDate::from_ymd_opt(2024, m, 15).unwrap();
            PriceSeries::new(
                ticker,
                vec![PricePoint::new(d(1), 100.0), PricePoint::new(d(2), 105.0)],
            )
        }
    }

    fn service(fail: bool) -> AnalysisService<CountingSource, ManualClock> {
        AnalysisService::with_clock(
            CountingSource {
                calls: Cell::new(0),
                fail,
            },
            ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()),
            Duration::hours(24),
            Duration::hours(1),
        )
    }

    #[test]
    fn test_table_and_charts_share_one_fetch() {
        let mut service = service(false);
        service.formatted_table("DLF.NS").unwrap();
        service.heatmap("DLF.NS").unwrap();
        service.average_bar_chart("DLF.NS").unwrap();
        assert_eq!(service.source().calls.get(), 1);
    }

    #[test]
    fn test_analysis_expiry_reuses_price_history() {
        let mut service = service(false);
        service.monthly_analysis("DLF.NS").unwrap();
        service.clock.advance(Duration::hours(2));
        service.monthly_analysis("DLF.NS").unwrap();
        assert_eq!(service.source().calls.get(), 1);

        service.clock.advance(Duration::hours(23));
        service.monthly_analysis("DLF.NS").unwrap();
        assert_eq!(service.source().calls.get(), 2);
    }

    #[test]
    fn test_failed_fetch_propagates_and_is_retried() {
        let mut service = service(true);
        assert!(service.monthly_analysis("DLF.NS").is_err());
        assert!(service.monthly_analysis("DLF.NS").is_err());
        assert_eq!(service.source().calls.get(), 2);
    }

    #[test]
    fn test_analysis_for_series_bypasses_source() {
        let service = service(false);
        let table = service.analysis_for_series(&PriceSeries::empty("X"));
        assert!(table.is_empty());
        assert_eq!(service.source().calls.get(), 0);
    }

    #[test]
    fn test_disk_hit_keeps_original_save_time() {
        let dir = tempdir().unwrap();
        let disk = DiskCache::new(dir.path(), Duration::hours(24));
        let stale = PriceSeries::new(
            "DLF.NS",
            vec![PricePoint::new(NaiveDate::from_ymd_opt(2023, 5, 31).unwrap(), 5.0)],
        )
        .unwrap();
        disk.save(&stale).unwrap();

        let mut service = AnalysisService::with_clock(
            CountingSource {
                calls: Cell::new(0),
                fail: false,
            },
            ManualClock::new(Utc::now()),
            Duration::hours(24),
            Duration::hours(1),
        )
        .with_disk_cache(disk);

        service.clock.advance(Duration::hours(23));
        assert_eq!(service.closing_prices("DLF.NS").unwrap(), stale);
        assert_eq!(service.source().calls.get(), 0);

        service.clock.advance(Duration::hours(23));
        let fresh = service.closing_prices("DLF.NS").unwrap();
        assert_eq!(service.source().calls.get(), 1);
        assert_ne!(fresh, stale);
    }
}
