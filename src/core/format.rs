use std::fmt;

use serde::Serialize;

use super::types::MONTHS_PER_YEAR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearsMonths {
    pub years: u32,
    pub months: u32,
}

impl YearsMonths {
    pub fn from_months(total_months: u32) -> Self {
        Self {
            years: total_months / MONTHS_PER_YEAR,
            months: total_months % MONTHS_PER_YEAR,
        }
    }

    /// Rounds fractional years to the nearest whole month first.
    pub fn from_years(years: f64) -> Self {
        Self::from_months((years * f64::from(MONTHS_PER_YEAR)).round() as u32)
    }
}

impl fmt::Display for YearsMonths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}y {}m", self.years, self.months)
    }
}
