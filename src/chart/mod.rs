//! Declarative chart descriptions derived from the monthly return grid.
//!
//! Charts are plain data (values, labels, per-cell colors) serialized to JSON
//! and handed to whatever renders them.

use serde::{Deserialize, Serialize};

use crate::error::PriceActionError;

pub mod bar;
pub mod color;
pub mod heatmap;

pub use bar::{build_average_bar_chart, BarChart};
pub use color::ColorScale;
pub use heatmap::{build_heatmap, HeatmapChart};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartSpec {
    Heatmap(HeatmapChart),
    Bar(BarChart),
}

impl ChartSpec {
    pub fn to_json(&self) -> Result<String, PriceActionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<HeatmapChart> for ChartSpec {
    fn from(chart: HeatmapChart) -> Self {
        ChartSpec::Heatmap(chart)
    }
}

impl From<BarChart> for ChartSpec {
    fn from(chart: BarChart) -> Self {
        ChartSpec::Bar(chart)
    }
}
