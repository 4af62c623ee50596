use serde::{Deserialize, Serialize};

use crate::util::math_utils::to_percent;

use super::{
    month::Month,
    monthly::{AnalysisTable, Column, RowLabel},
};

pub const AVERAGE_ROW_LABEL: &str = "Avg Monthly Returns";

/// Human-facing rendition of an `AnalysisTable`: percentages rounded to two
/// decimals, half-year grouping, readable labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayTable {
    pub ticker: String,
    pub columns: Vec<String>,
    pub rows: Vec<DisplayRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

impl DisplayTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    pub fn value(&self, row_label: &str, column_label: &str) -> Option<f64> {
        let col = self.column_index(column_label)?;
        self.rows
            .iter()
            .find(|r| r.label == row_label)
            .and_then(|r| r.values[col])
    }
}

/// Column order of the formatted table.
pub fn display_columns() -> Vec<Column> {
    let mut columns: Vec<Column> = Month::ALL[..6].iter().map(|m| Column::Month(*m)).collect();
    columns.push(Column::FirstHalfAvg);
    columns.extend(Month::ALL[6..].iter().map(|m| Column::Month(*m)));
    columns.push(Column::SecondHalfAvg);
    columns.push(Column::AnnualReturns);
    columns.extend(Month::ALL.iter().map(|m| Column::Contribution(*m)));
    columns
}

pub fn display_label(column: &Column) -> String {
    match column {
        Column::Month(m) => m.abbrev().to_string(),
        Column::FirstHalfAvg => "Avg returns till June".to_string(),
        Column::SecondHalfAvg => "Avg returns after June".to_string(),
        Column::AnnualReturns => "Total Annual Returns".to_string(),
        Column::Contribution(m) => format!("{} Contribution", m.abbrev()),
    }
}

fn display_row_label(label: &RowLabel) -> String {
    match label {
        RowLabel::Year(year) => year.to_string(),
        RowLabel::MonthlyAvg => AVERAGE_ROW_LABEL.to_string(),
    }
}

/// Reorders, relabels and scales the table. No value is recomputed.
pub fn format_analysis(table: &AnalysisTable) -> DisplayTable {
    let columns = display_columns();
    let rows = table
        .row_labels()
        .into_iter()
        .map(|label| DisplayRow {
            label: display_row_label(&label),
            values: columns
                .iter()
                .map(|column| table.get(label, *column).map(to_percent))
                .collect(),
        })
        .collect();

    DisplayTable {
        ticker: table.ticker().to_string(),
        columns: columns.iter().map(display_label).collect(),
        rows,
    }
}
