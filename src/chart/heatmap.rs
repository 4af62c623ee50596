use serde::{Deserialize, Serialize};

use crate::{
    analysis::{monthly::ReturnGrid, month::Month},
    util::math_utils::to_percent,
};

use super::color::ColorScale;

/// Year by month heatmap of monthly returns in percent. Rows run from the
/// most recent year down; undefined cells carry no value, text or color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<String>,
    pub y: Vec<String>,
    pub z: Vec<Vec<Option<f64>>>,
    pub text: Vec<Vec<String>>,
    pub colors: Vec<Vec<Option<String>>>,
    pub color_scale: ColorScale,
    pub colorbar_title: String,
    pub colorbar_tick_suffix: String,
}

impl HeatmapChart {
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Cell value by year label and month.
    pub fn value(&self, year: &str, month: Month) -> Option<f64> {
        let row = self.y.iter().position(|y| y == year)?;
        self.z[row][month.index()]
    }
}

pub fn build_heatmap(ticker: &str, grid: &ReturnGrid) -> HeatmapChart {
    let mut y = Vec::with_capacity(grid.len());
    let mut z = Vec::with_capacity(grid.len());
    for (year, row) in grid.rows().rev() {
        y.push(year.to_string());
        z.push(row.iter().map(|v| v.map(to_percent)).collect::<Vec<_>>());
    }

    let color_scale = ColorScale::centered(z.iter().flatten().copied());
    let text = z
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| v.map(|v| format!("{:.2}", v)).unwrap_or_default())
                .collect()
        })
        .collect();
    let colors = z
        .iter()
        .map(|row| row.iter().map(|v| color_scale.color_for(*v)).collect())
        .collect();

    HeatmapChart {
        title: format!("Historical Monthly Returns of {}", ticker),
        x_label: String::new(),
        y_label: "Year".to_string(),
        x: Month::ALL.iter().map(|m| m.abbrev().to_string()).collect(),
        y,
        z,
        text,
        colors,
        color_scale,
        colorbar_title: "Return (%)".to_string(),
        colorbar_tick_suffix: "%".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::monthly::MonthlyReturn;

    fn grid() -> ReturnGrid {
        ReturnGrid::from_returns(&[
            MonthlyReturn { year: 2023, month: Month::Dec, value: None },
            MonthlyReturn { year: 2024, month: Month::Jan, value: Some(0.031249) },
            MonthlyReturn { year: 2024, month: Month::Feb, value: Some(-0.05) },
        ])
    }

    #[test]
    fn test_most_recent_year_first() {
        let chart = build_heatmap("DLF.NS", &grid());
        assert_eq!(chart.y, vec!["2024".to_string(), "2023".to_string()]);
        assert_eq!(chart.x.len(), 12);
        assert_eq!(chart.title, "Historical Monthly Returns of DLF.NS");
    }

    #[test]
    fn test_values_text_and_blank_cells() {
        let chart = build_heatmap("DLF.NS", &grid());
        assert_eq!(chart.value("2024", Month::Jan), Some(3.12));
        assert_eq!(chart.value("2024", Month::Feb), Some(-5.0));
        assert_eq!(chart.text[0][0], "3.12");
        assert_eq!(chart.text[0][1], "-5.00");

        assert_eq!(chart.value("2023", Month::Dec), None);
        assert_eq!(chart.text[1][11], "");
        assert_eq!(chart.colors[1][11], None);
        assert!(chart.colors[0][0].is_some());
    }

    #[test]
    fn test_empty_grid() {
        let chart = build_heatmap("NONE", &ReturnGrid::default());
        assert!(chart.is_empty());
        assert!(chart.z.is_empty());
    }
}
