mod engine;
mod error;
mod format;
mod rng;
mod sampler;
mod solver;
mod types;
mod validate;

pub use engine::{MonteCarloEngine, MonteCarloProgress};
pub use error::{Result, SimulationError};
pub use format::YearsMonths;
pub use rng::SimRng;
pub use sampler::PathSampler;
pub use solver::solve_time_to_target;
pub use types::{
    DeterministicResult, MONTHS_PER_YEAR, MonteCarloParameters, MonteCarloResult,
    SimulationParameters, TrialOutcome,
};
pub use validate::{validate_monte_carlo, validate_simulation};

/// Validates, then solves the closed-form time to target.
pub fn solve_deterministic(params: &SimulationParameters) -> Result<DeterministicResult> {
    validate_simulation(params)?;
    Ok(solve_time_to_target(params))
}

pub fn run_monte_carlo(params: MonteCarloParameters, rng: &mut SimRng) -> Result<MonteCarloResult> {
    MonteCarloEngine::new(params)?.run(rng)
}
