use super::error::{Result, SimulationError};
use super::rng::SimRng;
use super::types::{MONTHS_PER_YEAR, MonteCarloParameters, TrialOutcome};

const DT: f64 = 1.0 / MONTHS_PER_YEAR as f64;

/// Per-step constants of one GBM path, computed once per run.
#[derive(Debug, Clone, Copy)]
pub struct PathSampler {
    start_value: f64,
    target_value: f64,
    drift: f64,
    shock_scale: f64,
    dividend_factor: Option<f64>,
    steps: u32,
}

impl PathSampler {
    pub fn new(params: &MonteCarloParameters) -> Self {
        let base = &params.base;
        let sigma = params.volatility;
        let dividend_factor = (base.reinvest_dividends && base.annual_yield_rate > 0.0)
            .then(|| 1.0 + base.annual_yield_rate * DT);

        Self {
            start_value: base.initial_investment,
            target_value: base.target_value(),
            drift: (params.expected_return - 0.5 * sigma * sigma) * DT,
            shock_scale: sigma * DT.sqrt(),
            dividend_factor,
            steps: params.horizon_months(),
        }
    }

    pub fn horizon_months(&self) -> u32 {
        self.steps
    }

    /// Runs one trial to the full horizon and reports its first-passage
    /// month, or the horizon itself when the target is never hit.
    pub fn sample(&self, trial: u32, rng: &mut SimRng) -> Result<TrialOutcome> {
        let mut value = self.start_value;
        let mut reached_at = None;

        for month in 1..=self.steps {
            let z = rng.standard_normal();
            value *= (self.drift + self.shock_scale * z).exp();
            // Dividend accrual is applied after growth within the same month.
            if let Some(factor) = self.dividend_factor {
                value *= factor;
            }

            if !value.is_finite() {
                return Err(SimulationError::NumericOverflow { trial, month });
            }

            if reached_at.is_none() && value >= self.target_value {
                reached_at = Some(month);
            }
        }

        Ok(match reached_at {
            Some(month) => TrialOutcome {
                reached: true,
                time_to_target_months: month,
            },
            None => TrialOutcome {
                reached: false,
                time_to_target_months: self.steps,
            },
        })
    }
}
