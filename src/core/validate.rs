use super::error::{Result, SimulationError};
use super::types::{MONTHS_PER_YEAR, MonteCarloParameters, SimulationParameters};

pub fn validate_simulation(params: &SimulationParameters) -> Result<()> {
    require_finite("initial_investment", params.initial_investment)?;
    require_finite("target_profit", params.target_profit)?;
    require_finite("annual_growth_rate", params.annual_growth_rate)?;
    require_finite("annual_yield_rate", params.annual_yield_rate)?;

    if params.initial_investment <= 0.0 {
        return Err(SimulationError::invalid(
            "initial_investment",
            "must be > 0",
        ));
    }
    if params.target_profit <= 0.0 {
        return Err(SimulationError::invalid("target_profit", "must be > 0"));
    }
    Ok(())
}

pub fn validate_monte_carlo(params: &MonteCarloParameters) -> Result<()> {
    validate_simulation(&params.base)?;
    require_finite("expected_return", params.expected_return)?;
    require_finite("volatility", params.volatility)?;

    if params.volatility < 0.0 {
        return Err(SimulationError::invalid("volatility", "must be >= 0"));
    }
    // A non-finite step drift collapses every path to zero instead of failing.
    let dt = 1.0 / f64::from(MONTHS_PER_YEAR);
    let sigma = params.volatility;
    let drift = (params.expected_return - 0.5 * sigma * sigma) * dt;
    let shock_scale = sigma * dt.sqrt();
    if !drift.is_finite() || !shock_scale.is_finite() {
        return Err(SimulationError::invalid(
            "volatility",
            "too large for a monthly step",
        ));
    }
    if params.trial_count == 0 {
        return Err(SimulationError::invalid("trial_count", "must be > 0"));
    }
    if params.horizon_years == 0 {
        return Err(SimulationError::invalid("horizon_years", "must be > 0"));
    }
    if params.horizon_years.checked_mul(MONTHS_PER_YEAR).is_none() {
        return Err(SimulationError::invalid(
            "horizon_years",
            "horizon in months overflows",
        ));
    }
    Ok(())
}

fn require_finite(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::invalid(field, "must be a finite number"))
    }
}
