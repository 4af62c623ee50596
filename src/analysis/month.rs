use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::PriceActionError;

/// Calendar month, ordered January to December.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    /// Three-letter label, e.g. "Jan".
    pub fn abbrev(&self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Aug => "Aug",
            Month::Sep => "Sep",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dec => "Dec",
        }
    }

    /// 1-based month number.
    pub fn number(&self) -> u32 {
        self.index() as u32 + 1
    }

    /// 0-based position in `Month::ALL`.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            1..=12 => Some(Month::ALL[(number - 1) as usize]),
            _ => None,
        }
    }

    pub fn is_first_half(&self) -> bool {
        self.number() <= 6
    }
}

impl FromStr for Month {
    type Err = PriceActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::ALL
            .iter()
            .find(|m| m.abbrev().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| PriceActionError::ParseError {
                value_name: format!("month '{}'", s),
                row: 0,
            })
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbrev())
    }
}

impl TryFrom<String> for Month {
    type Error = PriceActionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.abbrev().to_string()
    }
}
