//! Monthly aggregation of a daily closing-price series.
//!
//! The pipeline is resample (last close per calendar month), month over month
//! returns, pivot into a year by month grid, then per-year aggregates and a
//! cross-year average row. Every cell is an `Option<f64>`: `None` is an
//! undefined value and is never conflated with `0.0`.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    data::price_series::PriceSeries,
    error::PriceActionError,
    util::{
        date_utils::{month_end, year_month},
        math_utils::{compound_defined, finite, log_return, mean_defined},
    },
};

use super::month::Month;

/// One value per calendar month, indexed by `Month::index`.
pub type MonthRow = [Option<f64>; 12];

/// Last observed close of a calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyClose {
    pub year: i32,
    pub month: Month,
    /// Calendar month end, the label of the observation.
    pub month_end: NaiveDate,
    /// Date of the trading day the close was taken from.
    pub last_trade: NaiveDate,
    pub close: f64,
}

/// Return of a month-end close against the previous available month-end close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: Month,
    pub value: Option<f64>,
}

/// Groups the series by calendar month and keeps the last close of each.
/// Months without trading data are absent, not zero-filled.
pub fn resample_monthly(series: &PriceSeries) -> Vec<MonthlyClose> {
    let mut closes: Vec<MonthlyClose> = Vec::new();
    for point in series.points() {
        let (year, month) = year_month(&point.date);
        match closes.last_mut() {
            Some(last) if last.year == year && last.month == month => {
                last.last_trade = point.date;
                last.close = point.close;
            }
            _ => closes.push(MonthlyClose {
                year,
                month,
                month_end: month_end(year, month).unwrap_or(point.date),
                last_trade: point.date,
                close: point.close,
            }),
        }
    }
    closes
}

/// Month over month returns. The first month has no return. A month that
/// follows a gap is measured against the nearest earlier close.
pub fn monthly_returns(closes: &[MonthlyClose]) -> Vec<MonthlyReturn> {
    let mut returns = Vec::with_capacity(closes.len());
    let mut previous: Option<f64> = None;
    for close in closes {
        let value = previous.and_then(|prev| finite(close.close / prev - 1.0));
        returns.push(MonthlyReturn {
            year: close.year,
            month: close.month,
            value,
        });
        previous = Some(close.close);
    }
    returns
}

/// Year by month matrix of monthly returns. Rows are the distinct years seen,
/// ascending; columns are always the twelve calendar months.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnGrid {
    rows: BTreeMap<i32, MonthRow>,
}

impl ReturnGrid {
    pub fn from_returns(returns: &[MonthlyReturn]) -> Self {
        let mut rows: BTreeMap<i32, MonthRow> = BTreeMap::new();
        for r in returns {
            let row = rows.entry(r.year).or_insert([None; 12]);
            row[r.month.index()] = r.value;
        }
        Self { rows }
    }

    /// Resample, compute returns and pivot in one step.
    pub fn from_series(series: &PriceSeries) -> Self {
        Self::from_returns(&monthly_returns(&resample_monthly(series)))
    }

    pub fn years(&self) -> Vec<i32> {
        self.rows.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, year: i32, month: Month) -> Option<f64> {
        self.rows.get(&year).and_then(|row| row[month.index()])
    }

    pub fn row(&self, year: i32) -> Option<&MonthRow> {
        self.rows.get(&year)
    }

    /// Rows in ascending year order.
    pub fn rows(&self) -> impl DoubleEndedIterator<Item = (i32, &MonthRow)> {
        self.rows.iter().map(|(year, row)| (*year, row))
    }

    pub fn column(&self, month: Month) -> Vec<Option<f64>> {
        self.rows.values().map(|row| row[month.index()]).collect()
    }

    pub fn has_defined_cell(&self) -> bool {
        self.rows.values().any(|row| row.iter().any(Option::is_some))
    }

    /// Column-wise mean across years, ignoring undefined cells.
    pub fn column_means(&self) -> MonthRow {
        let mut means = [None; 12];
        for month in Month::ALL {
            means[month.index()] = mean_defined(self.column(month));
        }
        means
    }
}

/// Aggregates derived from one year row of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub annual_return: Option<f64>,
    pub first_half_avg: Option<f64>,
    pub second_half_avg: Option<f64>,
    /// Share of the annual log-return attributable to each month.
    pub contributions: MonthRow,
}

impl YearSummary {
    pub fn from_row(row: &MonthRow) -> Self {
        let annual_return = compound_defined(row.iter().copied());
        let first_half_avg = mean_defined(row[..6].iter().copied());
        let second_half_avg = mean_defined(row[6..].iter().copied());

        let mut contributions = [None; 12];
        for (slot, value) in contributions.iter_mut().zip(row.iter()) {
            *slot = contribution(*value, annual_return);
        }

        Self {
            annual_return,
            first_half_avg,
            second_half_avg,
            contributions,
        }
    }
}

/// `ln(1 + monthly) / ln(1 + annual)`. The ratio is not clamped: with a small
/// or opposite-signed annual return it can exceed one or be negative.
pub fn contribution(monthly: Option<f64>, annual: Option<f64>) -> Option<f64> {
    let annual_log = log_return(annual?)?;
    if annual_log == 0.0 {
        return None;
    }
    let monthly_log = log_return(monthly?)?;
    finite(monthly_log / annual_log)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearRow {
    pub year: i32,
    pub returns: MonthRow,
    pub summary: YearSummary,
}

/// Row index of the analysis table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowLabel {
    Year(i32),
    MonthlyAvg,
}

impl fmt::Display for RowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowLabel::Year(year) => write!(f, "{}", year),
            RowLabel::MonthlyAvg => write!(f, "monthly_avg"),
        }
    }
}

impl FromStr for RowLabel {
    type Err = PriceActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "monthly_avg" {
            return Ok(RowLabel::MonthlyAvg);
        }
        s.parse::<i32>()
            .map(RowLabel::Year)
            .map_err(|_| PriceActionError::ParseError {
                value_name: format!("row label '{}'", s),
                row: 0,
            })
    }
}

/// Column of the analysis table, named by its aggregator key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Month(Month),
    AnnualReturns,
    FirstHalfAvg,
    SecondHalfAvg,
    Contribution(Month),
}

impl Column {
    /// Columns in the order the aggregator produces them.
    pub fn all() -> Vec<Column> {
        let mut columns: Vec<Column> = Month::ALL.iter().map(|m| Column::Month(*m)).collect();
        columns.extend([
            Column::AnnualReturns,
            Column::FirstHalfAvg,
            Column::SecondHalfAvg,
        ]);
        columns.extend(Month::ALL.iter().map(|m| Column::Contribution(*m)));
        columns
    }

    pub fn key(&self) -> String {
        match self {
            Column::Month(m) => m.abbrev().to_string(),
            Column::AnnualReturns => "annual_returns".to_string(),
            Column::FirstHalfAvg => "first_half_avg".to_string(),
            Column::SecondHalfAvg => "second_half_avg".to_string(),
            Column::Contribution(m) => format!("{}_contrib", m.abbrev()),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Column {
    type Err = PriceActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::all()
            .into_iter()
            .find(|c| c.key() == s)
            .ok_or_else(|| PriceActionError::ParseError {
                value_name: format!("column '{}'", s),
                row: 0,
            })
    }
}

/// Combined monthly analysis for one ticker: year rows with their
/// aggregates, followed by the cross-year average row when any return is
/// defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisTable {
    ticker: String,
    rows: Vec<YearRow>,
    average: Option<MonthRow>,
}

impl AnalysisTable {
    pub fn from_grid(ticker: &str, grid: &ReturnGrid) -> Self {
        let rows: Vec<YearRow> = grid
            .rows()
            .map(|(year, returns)| YearRow {
                year,
                returns: *returns,
                summary: YearSummary::from_row(returns),
            })
            .collect();
        let average = if grid.has_defined_cell() {
            Some(grid.column_means())
        } else {
            None
        };
        Self {
            ticker: ticker.to_string(),
            rows,
            average,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn year_rows(&self) -> &[YearRow] {
        &self.rows
    }

    pub fn average(&self) -> Option<&MonthRow> {
        self.average.as_ref()
    }

    /// Total rows, the average row included.
    pub fn len(&self) -> usize {
        self.rows.len() + usize::from(self.average.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row_labels(&self) -> Vec<RowLabel> {
        let mut labels: Vec<RowLabel> = self.rows.iter().map(|r| RowLabel::Year(r.year)).collect();
        if self.average.is_some() {
            labels.push(RowLabel::MonthlyAvg);
        }
        labels
    }

    pub fn year_row(&self, year: i32) -> Option<&YearRow> {
        self.rows.iter().find(|r| r.year == year)
    }

    /// Cell lookup by row and column. The average row only carries the
    /// twelve month columns.
    pub fn get(&self, row: RowLabel, column: Column) -> Option<f64> {
        match row {
            RowLabel::Year(year) => {
                let row = self.year_row(year)?;
                match column {
                    Column::Month(m) => row.returns[m.index()],
                    Column::AnnualReturns => row.summary.annual_return,
                    Column::FirstHalfAvg => row.summary.first_half_avg,
                    Column::SecondHalfAvg => row.summary.second_half_avg,
                    Column::Contribution(m) => row.summary.contributions[m.index()],
                }
            }
            RowLabel::MonthlyAvg => match column {
                Column::Month(m) => self.average.as_ref()?[m.index()],
                _ => None,
            },
        }
    }

    /// The year by month return grid the table was built from.
    pub fn return_grid(&self) -> ReturnGrid {
        ReturnGrid {
            rows: self.rows.iter().map(|r| (r.year, r.returns)).collect(),
        }
    }
}

/// Runs the full monthly analysis. Never fails: an empty series gives an
/// empty table and invalid arithmetic gives undefined cells.
#[instrument(skip(series), fields(ticker = series.ticker(), points = series.len()))]
pub fn compute_analysis(series: &PriceSeries) -> AnalysisTable {
    let closes = resample_monthly(series);
    let returns = monthly_returns(&closes);
    let grid = ReturnGrid::from_returns(&returns);
    debug!(
        "Resampled {} daily closes into {} months across {} years",
        series.len(),
        closes.len(),
        grid.len()
    );
    AnalysisTable::from_grid(series.ticker(), &grid)
}
