use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use super::error::{Result, SimulationError};
use super::rng::SimRng;
use super::sampler::PathSampler;
use super::types::{MonteCarloParameters, MonteCarloResult};
use super::validate::validate_monte_carlo;

const MAX_BATCH_SIZE: u32 = 256;
const NO_FAILURE: u32 = u32::MAX;

/// Shared progress and cancellation state for a Monte Carlo run.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloProgress {
    completed: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl MonteCarloProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct BatchSummary {
    sorted_months: Vec<u32>,
    censored: u32,
}

#[derive(Debug, Clone)]
pub struct MonteCarloEngine {
    params: MonteCarloParameters,
    sampler: PathSampler,
}

impl MonteCarloEngine {
    pub fn new(params: MonteCarloParameters) -> Result<Self> {
        validate_monte_carlo(&params)?;
        Ok(Self {
            sampler: PathSampler::new(&params),
            params,
        })
    }

    pub fn run(&self, rng: &mut SimRng) -> Result<MonteCarloResult> {
        self.run_with_progress(rng, &MonteCarloProgress::new())
    }

    /// Runs every trial and reduces them to nearest-rank percentiles.
    ///
    /// One `u64` is drawn from `rng` as the base seed; each trial then uses
    /// its own substream, so the result does not depend on how batches are
    /// scheduled.
    pub fn run_with_progress(
        &self,
        rng: &mut SimRng,
        progress: &MonteCarloProgress,
    ) -> Result<MonteCarloResult> {
        let base_seed = rng.next_u64();
        let trial_count = self.params.trial_count;
        tracing::info!(
            trials = trial_count,
            horizon_months = self.sampler.horizon_months(),
            base_seed,
            "Starting Monte Carlo run"
        );

        let batches = batch_ranges(trial_count, MAX_BATCH_SIZE);
        let first_failure = AtomicU32::new(NO_FAILURE);

        #[cfg(feature = "parallel")]
        let outcomes: Vec<Result<BatchSummary>> = batches
            .into_par_iter()
            .map(|range| self.run_batch(range, base_seed, progress, &first_failure))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<Result<BatchSummary>> = batches
            .into_iter()
            .map(|range| self.run_batch(range, base_seed, progress, &first_failure))
            .collect();

        // First error in trial order wins, so failures are reproducible too.
        let summaries = outcomes.into_iter().collect::<Result<Vec<_>>>()?;

        let censored = summaries.iter().map(|s| s.censored).sum::<u32>();
        let months = merge_sorted(summaries.into_iter().map(|s| s.sorted_months).collect());
        let result = summarize(&months, censored, self.sampler.horizon_months());

        tracing::info!(
            p10 = result.p10_months,
            p50 = result.p50_months,
            p90 = result.p90_months,
            probability_not_reached = result.probability_not_reached,
            "Monte Carlo run finished"
        );
        Ok(result)
    }

    /// Runs one contiguous range of trials. Trials after the lowest failed
    /// trial seen so far are skipped: the run already ends in that error.
    fn run_batch(
        &self,
        range: Range<u32>,
        base_seed: u64,
        progress: &MonteCarloProgress,
        first_failure: &AtomicU32,
    ) -> Result<BatchSummary> {
        tracing::debug!(first = range.start, last = range.end, "Running batch");
        let mut sorted_months = Vec::with_capacity(range.len());
        let mut censored = 0_u32;

        for trial in range {
            if progress.is_cancelled() {
                return Err(SimulationError::Cancelled);
            }
            if trial > first_failure.load(Ordering::Relaxed) {
                break;
            }
            let mut rng = SimRng::substream(base_seed, trial);
            let outcome = match self.sampler.sample(trial, &mut rng) {
                Ok(outcome) => outcome,
                Err(err) => {
                    first_failure.fetch_min(trial, Ordering::Relaxed);
                    tracing::debug!(trial, error = %err, "Trial failed, stopping later trials");
                    return Err(err);
                }
            };
            if !outcome.reached {
                censored += 1;
            }
            sorted_months.push(outcome.time_to_target_months);
            progress.increment();
        }

        sorted_months.sort_unstable();
        Ok(BatchSummary {
            sorted_months,
            censored,
        })
    }
}

fn batch_ranges(total: u32, batch_size: u32) -> Vec<Range<u32>> {
    (0..total.div_ceil(batch_size))
        .map(|i| {
            let start = i * batch_size;
            start..start.saturating_add(batch_size).min(total)
        })
        .collect()
}

/// K-way merge of individually sorted runs.
fn merge_sorted(runs: Vec<Vec<u32>>) -> Vec<u32> {
    let total = runs.iter().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);
    let mut heap = BinaryHeap::with_capacity(runs.len());

    for (run, values) in runs.iter().enumerate() {
        if let Some(&first) = values.first() {
            heap.push(Reverse((first, run, 0_usize)));
        }
    }

    while let Some(Reverse((value, run, idx))) = heap.pop() {
        merged.push(value);
        if let Some(&next) = runs[run].get(idx + 1) {
            heap.push(Reverse((next, run, idx + 1)));
        }
    }
    merged
}

/// Element at `floor(q * n)` of the sorted sample; no interpolation.
fn nearest_rank(sorted: &[u32], q: f64) -> u32 {
    let idx = (q * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn summarize(sorted_months: &[u32], censored: u32, horizon_months: u32) -> MonteCarloResult {
    let n = sorted_months.len();
    MonteCarloResult {
        p10_months: nearest_rank(sorted_months, 0.10),
        p50_months: nearest_rank(sorted_months, 0.50),
        p90_months: nearest_rank(sorted_months, 0.90),
        probability_not_reached: f64::from(censored) / n as f64,
        trial_count: n as u32,
        horizon_months,
    }
}
