#![allow(dead_code)]

use price_action::{
    analysis::month::Month,
    data::price_series::PriceSeries,
    util::test_util::{monthly_series, setup_test_tracing, TracingGuards},
};
use tracing::info;

/// `100, 110, 99, ...`: alternately up 10% and down 10%.
pub fn alternating_closes(count: usize) -> Vec<f64> {
    let mut closes = Vec::with_capacity(count);
    let mut close = 100.0;
    for i in 0..count {
        if i > 0 {
            close *= if i % 2 == 1 { 1.1 } else { 0.9 };
        }
        closes.push(close);
    }
    closes
}

/// Month-end closes from Jan-2023 through Jan-2025.
pub fn setup_scenario(test_name: &str) -> (PriceSeries, TracingGuards) {
    let guards = setup_test_tracing(test_name);
    let series = monthly_series("SCENARIO", 2023, Month::Jan, &alternating_closes(25)).unwrap();
    info!("Scenario series with {} closes", series.len());
    (series, guards)
}
