use serde::Serialize;

pub const MONTHS_PER_YEAR: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParameters {
    pub initial_investment: f64,
    pub target_profit: f64,
    pub annual_growth_rate: f64,
    pub annual_yield_rate: f64,
    pub reinvest_dividends: bool,
}

impl SimulationParameters {
    /// Portfolio value at which the target profit is realised.
    pub fn target_value(&self) -> f64 {
        self.initial_investment + self.target_profit
    }

    pub fn effective_annual_rate(&self) -> f64 {
        if self.reinvest_dividends {
            self.annual_growth_rate + self.annual_yield_rate
        } else {
            self.annual_growth_rate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloParameters {
    pub base: SimulationParameters,
    pub expected_return: f64,
    pub volatility: f64,
    pub trial_count: u32,
    pub horizon_years: u32,
}

impl MonteCarloParameters {
    pub fn horizon_months(&self) -> u32 {
        self.horizon_years * MONTHS_PER_YEAR
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeterministicResult {
    Reached { years_to_target: f64 },
    Unreachable,
}

impl DeterministicResult {
    pub fn years(&self) -> Option<f64> {
        match self {
            Self::Reached { years_to_target } => Some(*years_to_target),
            Self::Unreachable => None,
        }
    }

    pub fn rounded_months(&self) -> Option<u32> {
        self.years()
            .map(|years| (years * f64::from(MONTHS_PER_YEAR)).round() as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialOutcome {
    pub reached: bool,
    pub time_to_target_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloResult {
    pub p10_months: u32,
    pub p50_months: u32,
    pub p90_months: u32,
    pub probability_not_reached: f64,
    pub trial_count: u32,
    pub horizon_months: u32,
}
