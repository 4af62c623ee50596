//! Yahoo Finance chart API price source.
//!
//! Downloads the full daily history of a ticker and keeps the adjusted
//! close (falling back to the raw close when no adjustment is published).

use std::{collections::BTreeMap, time::Duration};

use chrono::{DateTime, NaiveDate};
use derive_builder::Builder;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::{config::DEFAULT_YAHOO_BASE_URL, error::PriceActionError};

use super::{
    price_series::{PricePoint, PriceSeries},
    source::PriceSource,
};

#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

/// Blocking Yahoo Finance client.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), default)]
pub struct YahooSource {
    base_url: String,
    user_agent: String,
    range: String,
    interval: String,
    timeout_secs: u64,
}

impl Default for YahooSource {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            range: "max".to_string(),
            interval: "1d".to_string(),
            timeout_secs: 30,
        }
    }
}

impl YahooSource {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    fn build_url(&self, ticker: &str) -> String {
        format!(
            "{}/{}?range={}&interval={}&includeAdjustedClose=true",
            self.base_url, ticker, self.range, self.interval
        )
    }

    /// Parses a chart API payload into a series. "Not found" style API
    /// errors and empty results yield an empty series.
    fn parse_response(ticker: &str, json: &str) -> Result<PriceSeries, PriceActionError> {
        let response: YahooResponse = serde_json::from_str(json)?;

        if let Some(error) = response.chart.error {
            if error.code.eq_ignore_ascii_case("Not Found") {
                warn!("Yahoo has no data for {}: {}", ticker, error.description);
                return Ok(PriceSeries::empty(ticker));
            }
            return Err(PriceActionError::YahooApi {
                code: error.code,
                description: error.description,
            });
        }

        let Some(data) = response.chart.result.as_ref().and_then(|r| r.first()) else {
            warn!("Yahoo returned an empty result for {}", ticker);
            return Ok(PriceSeries::empty(ticker));
        };

        let offset = data.meta.as_ref().map(|m| m.gmtoffset).unwrap_or(0);
        let closes = data.indicators.quote.first().map(|q| q.close.as_slice()).unwrap_or(&[]);
        let adjusted = data
            .indicators
            .adjclose
            .as_ref()
            .and_then(|a| a.first())
            .map(|a| a.adjclose.as_slice())
            .unwrap_or(&[]);

        // Keyed by local exchange date; a repeated date keeps the later quote.
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (i, ts) in data.timestamp.iter().enumerate() {
            let price = adjusted
                .get(i)
                .copied()
                .flatten()
                .or_else(|| closes.get(i).copied().flatten());
            let Some(price) = price else {
                continue;
            };
            let Some(local) = DateTime::from_timestamp(ts + offset, 0) else {
                return Err(PriceActionError::ParseError {
                    value_name: "timestamp".to_string(),
                    row: i,
                });
            };
            by_date.insert(local.date_naive(), price);
        }

        let points = by_date
            .into_iter()
            .map(|(date, close)| PricePoint::new(date, close))
            .collect();
        PriceSeries::new(ticker, points)
    }
}

impl PriceSource for YahooSource {
    #[instrument(skip(self))]
    fn closing_prices(&self, ticker: &str) -> Result<PriceSeries, PriceActionError> {
        let url = self.build_url(ticker);
        info!("Fetching price history for {} from Yahoo", ticker);
        debug!(url = %url, "Yahoo request");

        let client = reqwest::blocking::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;
        let text = client.get(&url).send()?.text()?;

        let series = Self::parse_response(ticker, &text)?;
        info!("Fetched {} closes for {}", series.len(), ticker);
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let source = YahooSourceBuilder::default()
            .base_url("http://localhost:9000/chart")
            .build()
            .unwrap();
        let url = source.build_url("DLF.NS");
        assert_eq!(
            url,
            "http://localhost:9000/chart/DLF.NS?range=max&interval=1d&includeAdjustedClose=true"
        );
    }

    #[test]
    fn test_parse_response_prefers_adjusted_close() {
        let json = r#"{"chart":{"result":[{"meta":{"gmtoffset":19800},"timestamp":[1704166200,1704252600,1704339000],"indicators":{"quote":[{"close":[185.5,186.5,187.5]}],"adjclose":[{"adjclose":[180.0,null,182.0]}]}}],"error":null}}"#;
        let series = YahooSource::parse_response("DLF.NS", json).unwrap();
        let closes: Vec<f64> = series.points().iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![180.0, 186.5, 182.0]);
        assert_eq!(
            series.points()[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_parse_response_skips_nulls() {
        let json = r#"{"chart":{"result":[{"timestamp":[1704067200,1704153600],"indicators":{"quote":[{"close":[null,186.5]}]}}],"error":null}}"#;
        let series = YahooSource::parse_response("DLF.NS", json).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_parse_response_not_found_is_empty() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let series = YahooSource::parse_response("GONE.NS", json).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_parse_response_other_api_error() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid range"}}}"#;
        let result = YahooSource::parse_response("DLF.NS", json);
        assert!(matches!(result, Err(PriceActionError::YahooApi { .. })));
    }

    #[test]
    fn test_parse_response_invalid_json() {
        let result = YahooSource::parse_response("DLF.NS", "not json");
        assert!(matches!(result, Err(PriceActionError::SerdeJsonError(_))));
    }
}
