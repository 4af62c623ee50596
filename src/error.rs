use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum PriceActionError {
    #[error("No price data available for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },
    #[error("Duplicate price observation for {ticker} on {date}.")]
    DuplicateDate { ticker: String, date: NaiveDate },
    #[error("Invalid closing price {price} for {ticker} on {date}.")]
    InvalidPrice {
        ticker: String,
        date: NaiveDate,
        price: f64,
    },
    #[error("Failed to parse value {value_name} at row {row}.")]
    ParseError { value_name: String, row: usize },
    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),
    #[error("Yahoo API Error [{code}]: {description}")]
    YahooApi { code: String, description: String },
    #[error("Configuration Error: {0}")]
    ConfigError(String),
    #[error("Cache Error: {0}")]
    CacheError(String),
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse date: {0}")]
    ParseDateError(#[from] chrono::ParseError),
    #[error("Serde YAML Error: {0}")]
    SerdeYamlError(#[from] serde_yaml::Error),
    #[error("Serde JSON Error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("CSV Error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Workbook Error: {0}")]
    XlsxError(#[from] rust_xlsxwriter::XlsxError),
    #[error("HTTP Error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl PriceActionError {
    pub fn data_unavailable(ticker: &str, reason: impl Into<String>) -> Self {
        PriceActionError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_unavailable_message() {
        let err = PriceActionError::data_unavailable("DLF.NS", "delisted");
        assert_eq!(
            err.to_string(),
            "No price data available for DLF.NS: delisted"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PriceActionError = io.into();
        assert!(matches!(err, PriceActionError::IoError(_)));
    }
}
