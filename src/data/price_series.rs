use std::{fs::File, io::Read, path::Path};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::PriceActionError;

/// A single daily closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Chronologically ordered closing prices for one ticker, at most one per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

#[derive(Debug, Deserialize)]
struct PriceRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Close")]
    close: Option<f64>,
}

impl PriceSeries {
    /// Builds a series, sorting by date. Duplicate dates and non-finite
    /// prices are rejected. An empty series is valid.
    pub fn new(ticker: &str, mut points: Vec<PricePoint>) -> Result<Self, PriceActionError> {
        points.sort_by_key(|p| p.date);
        for pair in points.windows(2) {
            if pair[0].date == pair[1].date {
                return Err(PriceActionError::DuplicateDate {
                    ticker: ticker.to_string(),
                    date: pair[0].date,
                });
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.close.is_finite()) {
            return Err(PriceActionError::InvalidPrice {
                ticker: ticker.to_string(),
                date: bad.date,
                price: bad.close,
            });
        }
        Ok(Self {
            ticker: ticker.to_string(),
            points,
        })
    }

    pub fn empty(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            points: Vec::new(),
        }
    }

    /// Reads a `Date,Close` CSV (dates as `%Y-%m-%d`). Rows with a blank
    /// close are skipped.
    #[instrument(skip(reader))]
    pub fn from_csv_reader<R: Read>(ticker: &str, reader: R) -> Result<Self, PriceActionError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut points = Vec::new();
        for (i, record) in csv_reader.deserialize::<PriceRecord>().enumerate() {
            let record = record?;
            let row = i + 1;
            let date = NaiveDate::parse_from_str(record.date.trim(), "%Y-%m-%d").map_err(|_| {
                PriceActionError::ParseError {
                    value_name: "Date".to_string(),
                    row,
                }
            })?;
            match record.close {
                Some(close) => points.push(PricePoint::new(date, close)),
                None => debug!("Skipping row {} with no close for {}", row, ticker),
            }
        }
        Self::new(ticker, points)
    }

    pub fn from_csv_path<P: AsRef<Path>>(ticker: &str, path: P) -> Result<Self, PriceActionError> {
        let file = File::open(path)?;
        Self::from_csv_reader(ticker, file)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_sorts_points() {
        let series = PriceSeries::new(
            "DLF.NS",
            vec![
                PricePoint::new(date(2024, 1, 3), 102.0),
                PricePoint::new(date(2024, 1, 1), 100.0),
                PricePoint::new(date(2024, 1, 2), 101.0),
            ],
        )
        .unwrap();
        let closes: Vec<f64> = series.points().iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![100.0, 101.0, 102.0]);
        assert_eq!(
            series.date_range(),
            Some((date(2024, 1, 1), date(2024, 1, 3)))
        );
    }

    #[test]
    fn test_new_rejects_duplicate_dates() {
        let result = PriceSeries::new(
            "DLF.NS",
            vec![
                PricePoint::new(date(2024, 1, 1), 100.0),
                PricePoint::new(date(2024, 1, 1), 101.0),
            ],
        );
        assert!(matches!(result, Err(PriceActionError::DuplicateDate { .. })));
    }

    #[test]
    fn test_new_rejects_nan_price() {
        let result = PriceSeries::new("DLF.NS", vec![PricePoint::new(date(2024, 1, 1), f64::NAN)]);
        assert!(matches!(result, Err(PriceActionError::InvalidPrice { .. })));
    }

    #[test]
    fn test_empty_series() {
        let series = PriceSeries::new("DLF.NS", Vec::new()).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.date_range(), None);
        assert_eq!(series, PriceSeries::empty("DLF.NS"));
    }

    #[test]
    fn test_from_csv_reader() {
        let data = "Date,Close\n2024-01-02,100.5\n2024-01-03,\n2024-01-04,101.25\n";
        let series = PriceSeries::from_csv_reader("SOBHA.NS", data.as_bytes()).unwrap();
        assert_eq!(series.ticker(), "SOBHA.NS");
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[1], PricePoint::new(date(2024, 1, 4), 101.25));
    }

    #[test]
    fn test_from_csv_reader_bad_date() {
        let data = "Date,Close\n02/01/2024,100.5\n";
        let result = PriceSeries::from_csv_reader("SOBHA.NS", data.as_bytes());
        assert!(matches!(
            result,
            Err(PriceActionError::ParseError { row: 1, .. })
        ));
    }
}
