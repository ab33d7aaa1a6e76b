use super::types::{DeterministicResult, SimulationParameters};

/// Closed-form years to target under constant compounding:
/// `ln(1 + L/I0) / ln(1 + r)`.
///
/// Expects parameters that already passed validation.
pub fn solve_time_to_target(params: &SimulationParameters) -> DeterministicResult {
    let rate = params.effective_annual_rate();
    let profit_ratio = params.target_profit / params.initial_investment;

    if rate <= 0.0 || profit_ratio <= 0.0 {
        return DeterministicResult::Unreachable;
    }

    let years_to_target = profit_ratio.ln_1p() / rate.ln_1p();
    // A subnormal rate or an overflowing ratio leaves no finite horizon.
    if !years_to_target.is_finite() {
        return DeterministicResult::Unreachable;
    }
    DeterministicResult::Reached { years_to_target }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn params(growth: f64, yield_rate: f64, reinvest: bool) -> SimulationParameters {
        SimulationParameters {
            initial_investment: 10_000.0,
            target_profit: 5_000.0,
            annual_growth_rate: growth,
            annual_yield_rate: yield_rate,
            reinvest_dividends: reinvest,
        }
    }

    #[test]
    fn reference_case_with_reinvested_yield() {
        let result = solve_time_to_target(&params(0.12, 0.06, true));
        let years = result.years().expect("target is reachable");
        assert_close(years, 1.5_f64.ln() / 1.18_f64.ln(), 1e-12);
        assert_close(years, 2.4497, 1e-3);
        assert_eq!(result.rounded_months(), Some(29));
    }

    #[test]
    fn yield_ignored_without_reinvestment() {
        let with = solve_time_to_target(&params(0.12, 0.06, false));
        let without = solve_time_to_target(&params(0.12, 0.0, false));
        assert_eq!(with, without);
    }

    #[test]
    fn zero_or_negative_growth_is_unreachable() {
        assert_eq!(
            solve_time_to_target(&params(0.0, 0.0, true)),
            DeterministicResult::Unreachable
        );
        assert_eq!(
            solve_time_to_target(&params(-0.05, 0.06, false)),
            DeterministicResult::Unreachable
        );
        assert_eq!(
            solve_time_to_target(&params(-0.05, 0.03, true)),
            DeterministicResult::Unreachable
        );
    }

    #[test]
    fn yield_can_rescue_flat_growth_when_reinvested() {
        let result = solve_time_to_target(&params(0.0, 0.05, true));
        let years = result.years().expect("reinvested yield makes it reachable");
        assert_close(years, 1.5_f64.ln() / 1.05_f64.ln(), 1e-12);
    }

    #[test]
    fn overflowing_profit_ratio_is_unreachable() {
        let mut p = params(0.12, 0.0, false);
        p.initial_investment = 1e-300;
        p.target_profit = 1e300;
        assert_eq!(solve_time_to_target(&p), DeterministicResult::Unreachable);
    }

    #[test]
    fn vanishing_positive_rate_is_unreachable() {
        let result = solve_time_to_target(&params(1e-320, 0.0, false));
        assert_eq!(result, DeterministicResult::Unreachable);
        assert_eq!(result.rounded_months(), None);
    }

    proptest! {
        #[test]
        fn matches_closed_form_without_yield(
            i0 in 1.0_f64..1e7,
            l in 1.0_f64..1e7,
            g in 0.001_f64..1.0,
        ) {
            let p = SimulationParameters {
                initial_investment: i0,
                target_profit: l,
                annual_growth_rate: g,
                annual_yield_rate: 0.0,
                reinvest_dividends: false,
            };
            let expected = (1.0 + l / i0).ln() / (1.0 + g).ln();
            let years = solve_time_to_target(&p).years().unwrap_or(f64::NAN);
            prop_assert!((years - expected).abs() <= 1e-9 * expected.max(1.0));
        }

        #[test]
        fn non_positive_growth_without_reinvestment_is_unreachable(
            g in -0.99_f64..=0.0,
            y in -0.5_f64..0.5,
        ) {
            let p = params(g, y, false);
            prop_assert!(solve_time_to_target(&p) == DeterministicResult::Unreachable);
        }

        #[test]
        fn non_positive_growth_and_yield_is_unreachable(
            g in -0.99_f64..=0.0,
            y in -0.5_f64..=0.0,
        ) {
            let p = params(g, y, true);
            prop_assert!(solve_time_to_target(&p) == DeterministicResult::Unreachable);
        }
    }
}
