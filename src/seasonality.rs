//! Search volume seasonality: weekday pattern, month of year and a handful of
//! holidays, each depending on the advertiser's industry.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    #[default]
    General,
    Retail,
    B2b,
    Travel,
    Education,
}

/// (month, day, multiplier)
const HOLIDAYS: [(u32, u32, f64); 6] = [
    (1, 1, 0.70),
    (2, 14, 1.20),
    (7, 4, 0.80),
    (11, 24, 1.40),
    (12, 25, 0.50),
    (12, 31, 0.70),
];

impl Industry {
    /// Monday first
    pub fn weekday_pattern(&self) -> [f64; 7] {
        match self {
            Industry::General => [0.95, 1.00, 1.05, 1.05, 1.00, 0.85, 0.75],
            Industry::Retail => [0.90, 0.95, 1.00, 1.05, 1.10, 1.20, 1.15],
            Industry::B2b => [1.10, 1.15, 1.10, 1.05, 1.00, 0.60, 0.55],
            Industry::Travel => [0.85, 0.90, 0.95, 1.00, 1.05, 1.20, 1.25],
            Industry::Education => [1.05, 1.10, 1.10, 1.05, 1.00, 0.80, 0.75],
        }
    }

    /// January first
    pub fn month_pattern(&self) -> [f64; 12] {
        match self {
            Industry::General => [1.0; 12],
            Industry::Retail => [0.80, 0.75, 0.85, 0.90, 0.95, 0.95, 0.90, 0.95, 1.00, 1.05, 1.30, 1.50],
            Industry::Travel => [0.90, 0.85, 1.00, 1.10, 1.15, 1.30, 1.35, 1.25, 1.00, 0.95, 0.90, 0.95],
            Industry::B2b => [1.05, 1.10, 1.10, 1.05, 1.00, 0.95, 0.85, 0.90, 1.05, 1.10, 1.05, 0.85],
            Industry::Education => [1.30, 1.25, 1.10, 1.00, 0.95, 0.70, 0.65, 1.20, 1.25, 1.10, 1.05, 0.85],
        }
    }

    /// Search volume relative to an ordinary day
    pub fn volume_multiplier(&self, date: NaiveDate) -> f64 {
        let weekday = self.weekday_pattern()[date.weekday().num_days_from_monday() as usize];
        let month = self.month_pattern()[date.month0() as usize];
        let holiday = HOLIDAYS
            .iter()
            .find(|(m, d, _)| *m == date.month() && *d == date.day())
            .map(|(_, _, multiplier)| *multiplier)
            .unwrap_or(1.0);
        weekday * month * holiday
    }
}
