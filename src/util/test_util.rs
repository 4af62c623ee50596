use std::path::Path;

use chrono::{Datelike, NaiveDate};
use tracing::{info, subscriber::set_default};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;

use crate::{
    analysis::month::Month,
    data::price_series::{PricePoint, PriceSeries},
    error::PriceActionError,
};

pub struct TracingGuards {
    _subscriber_guard: tracing::subscriber::DefaultGuard,
    _worker_guard: WorkerGuard,
}

/// Routes this thread's tracing output to `tests/logs/<test_name>.log`.
pub fn setup_test_tracing(test_name: &str) -> TracingGuards {
    let log_dir = Path::new("tests/logs");
    if !log_dir.exists() {
        let _ = std::fs::create_dir_all(log_dir);
    }

    let log_file = format!("tests/logs/{}.log", test_name);
    let file_appender = tracing_appender::rolling::never("", &log_file);
    let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = fmt::Subscriber::builder()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let subscriber_guard = set_default(subscriber);
    info!("-----------------");
    info!("Test: {}", test_name);
    info!("-----------------");

    TracingGuards {
        _subscriber_guard: subscriber_guard,
        _worker_guard: worker_guard,
    }
}

/// One close per month on the 28th, starting at `start_year`/`start_month`.
pub fn monthly_series(
    ticker: &str,
    start_year: i32,
    start_month: Month,
    closes: &[f64],
) -> Result<PriceSeries, PriceActionError> {
    let mut year = start_year;
    let mut month = start_month.number();
    let mut points = Vec::with_capacity(closes.len());
    for &close in closes {
        let date = NaiveDate::from_ymd_opt(year, month, 28).ok_or_else(|| {
            PriceActionError::data_unavailable(ticker, "synthetic date out of range")
        })?;
        points.push(PricePoint::new(date, close));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    PriceSeries::new(ticker, points)
}

/// Several closes per month on business-like days. Only the last one of each
/// month should survive resampling.
pub fn daily_series(
    ticker: &str,
    month_end_closes: &[(NaiveDate, f64)],
) -> Result<PriceSeries, PriceActionError> {
    let mut points = Vec::with_capacity(month_end_closes.len() * 3);
    for &(date, close) in month_end_closes {
        for (offset, noise) in [(20u32, 0.97), (10, 1.02)] {
            if date.day() > offset {
                if let Some(earlier) = date.with_day(date.day() - offset) {
                    points.push(PricePoint::new(earlier, close * noise));
                }
            }
        }
        points.push(PricePoint::new(date, close));
    }
    PriceSeries::new(ticker, points)
}
