use serde::{Deserialize, Serialize};

use crate::{
    analysis::{month::Month, monthly::AnalysisTable},
    util::math_utils::to_percent,
};

use super::color::ColorScale;

/// Twelve bars, one per calendar month, showing the cross-year average
/// monthly return in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<String>,
    pub y: Vec<Option<f64>>,
    pub text: Vec<String>,
    pub colors: Vec<Option<String>>,
    pub color_scale: ColorScale,
}

pub fn build_average_bar_chart(table: &AnalysisTable) -> BarChart {
    let y: Vec<Option<f64>> = match table.average() {
        Some(avg) => avg.iter().map(|v| v.map(to_percent)).collect(),
        None => vec![None; 12],
    };
    let color_scale = ColorScale::centered(y.iter().copied());
    let text = y
        .iter()
        .map(|v| v.map(|v| format!("{:.2}%", v)).unwrap_or_default())
        .collect();
    let colors = y.iter().map(|v| color_scale.color_for(*v)).collect();

    BarChart {
        title: format!("Average Monthly Returns for {}", table.ticker()),
        x_label: "Month".to_string(),
        y_label: "Avg Monthly Returns (%)".to_string(),
        x: Month::ALL.iter().map(|m| m.abbrev().to_string()).collect(),
        y,
        text,
        colors,
        color_scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::monthly::compute_analysis,
        data::price_series::{PricePoint, PriceSeries},
    };
    use chrono::NaiveDate;

    #[test]
    fn test_bars_follow_average_row() {
        let d = |y: i32, m: u32, day: u32| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        let series = PriceSeries::new(
            "SOBHA.NS",
            vec![
                PricePoint::new(d(2023, 12, 29), 100.0),
                PricePoint::new(d(2024, 1, 31), 110.0),
                PricePoint::new(d(2024, 2, 29), 99.0),
            ],
        )
        .unwrap();
        let chart = build_average_bar_chart(&compute_analysis(&series));

        assert_eq!(chart.x.len(), 12);
        assert_eq!(chart.y[0], Some(10.0));
        assert_eq!(chart.y[1], Some(-10.0));
        assert_eq!(chart.y[2], None);
        assert_eq!(chart.text[0], "10.00%");
        assert_eq!(chart.text[1], "-10.00%");
        assert_eq!(chart.text[2], "");
        assert_eq!(chart.colors[0].as_deref(), Some("#006837"));
        assert_eq!(chart.colors[1].as_deref(), Some("#a50026"));
        assert_eq!(chart.colors[2], None);
        assert_eq!(chart.title, "Average Monthly Returns for SOBHA.NS");
    }

    #[test]
    fn test_no_data_gives_blank_bars() {
        let chart = build_average_bar_chart(&compute_analysis(&PriceSeries::empty("X")));
        assert!(chart.y.iter().all(Option::is_none));
        assert!(chart.colors.iter().all(Option::is_none));
    }
}
