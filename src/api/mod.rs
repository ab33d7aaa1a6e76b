use axum::{
    Router,
    extract::{Json, Query},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    DeterministicResult, MonteCarloParameters, MonteCarloResult, SimRng, SimulationError,
    SimulationParameters, YearsMonths, run_monte_carlo, solve_deterministic,
};

const DEFAULT_SEED: u64 = 42;

#[derive(Parser, Debug)]
#[command(
    name = "profit-target",
    about = "Estimate how long an investment takes to reach a target profit (closed-form compounding + Monte Carlo GBM)"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log level used when RUST_LOG is unset"
    )]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Closed-form time to target under constant annual growth
    Deterministic(DeterministicArgs),
    /// Monte Carlo first-passage percentiles under GBM
    MonteCarlo(MonteCarloArgs),
    /// Serve both operations as a JSON HTTP API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone)]
pub struct DeterministicArgs {
    #[arg(long, help = "Optional ticker label, echoed back unchanged")]
    ticker: Option<String>,
    #[arg(long, default_value_t = 10_000.0)]
    initial_investment: f64,
    #[arg(long, default_value_t = 5_000.0, help = "Profit to reach on top of the initial investment")]
    target_profit: f64,
    #[arg(long, default_value_t = 12.0, help = "Expected annual growth in percent, e.g. 12")]
    growth_rate: f64,
    #[arg(long, default_value_t = 6.0, help = "Annual dividend yield in percent")]
    dividend_yield: f64,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    reinvest_dividends: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MonteCarloArgs {
    #[arg(long, help = "Optional ticker label, echoed back unchanged")]
    ticker: Option<String>,
    #[arg(long, default_value_t = 10_000.0)]
    initial_investment: f64,
    #[arg(long, default_value_t = 5_000.0, help = "Profit to reach on top of the initial investment")]
    target_profit: f64,
    #[arg(long, default_value_t = 10.0, help = "Expected annual return (mu) in percent")]
    expected_return: f64,
    #[arg(long, default_value_t = 25.0, help = "Annual volatility (sigma) in percent")]
    volatility: f64,
    #[arg(long, default_value_t = 6.0, help = "Annual dividend yield in percent")]
    dividend_yield: f64,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    reinvest_dividends: bool,
    #[arg(long, default_value_t = 1_000, allow_negative_numbers = true)]
    simulations: i64,
    #[arg(long, default_value_t = 10, allow_negative_numbers = true, help = "Horizon in whole years")]
    horizon_years: i64,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DeterministicPayload {
    ticker: Option<String>,
    initial_investment: Option<f64>,
    target_profit: Option<f64>,
    growth_rate: Option<f64>,
    dividend_yield: Option<f64>,
    reinvest_dividends: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MonteCarloPayload {
    ticker: Option<String>,
    initial_investment: Option<f64>,
    target_profit: Option<f64>,
    expected_return: Option<f64>,
    volatility: Option<f64>,
    dividend_yield: Option<f64>,
    reinvest_dividends: Option<bool>,
    simulations: Option<i64>,
    horizon_years: Option<i64>,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Assumptions {
    initial_investment: f64,
    target_profit: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    growth_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_return: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    volatility: Option<f64>,
    dividend_yield: f64,
    reinvest_dividends: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    horizon_years: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeterministicResponse {
    ticker: Option<String>,
    method: &'static str,
    reachable: bool,
    years_to_target: Option<f64>,
    months_to_target: Option<u32>,
    duration: Option<YearsMonths>,
    assumptions: Assumptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MonteCarloResponse {
    ticker: Option<String>,
    method: &'static str,
    #[serde(flatten)]
    stats: MonteCarloResult,
    p10: YearsMonths,
    p50: YearsMonths,
    p90: YearsMonths,
    seed: u64,
    assumptions: Assumptions,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_simulation_parameters(args: &DeterministicArgs) -> SimulationParameters {
    SimulationParameters {
        initial_investment: args.initial_investment,
        target_profit: args.target_profit,
        annual_growth_rate: args.growth_rate / 100.0,
        annual_yield_rate: args.dividend_yield / 100.0,
        reinvest_dividends: args.reinvest_dividends,
    }
}

fn build_monte_carlo_parameters(
    args: &MonteCarloArgs,
) -> Result<MonteCarloParameters, SimulationError> {
    Ok(MonteCarloParameters {
        base: SimulationParameters {
            initial_investment: args.initial_investment,
            target_profit: args.target_profit,
            // The stochastic path never reads the deterministic growth rate.
            annual_growth_rate: 0.0,
            annual_yield_rate: args.dividend_yield / 100.0,
            reinvest_dividends: args.reinvest_dividends,
        },
        expected_return: args.expected_return / 100.0,
        volatility: args.volatility / 100.0,
        trial_count: positive_u32("trial_count", args.simulations)?,
        horizon_years: positive_u32("horizon_years", args.horizon_years)?,
    })
}

fn positive_u32(field: &'static str, value: i64) -> Result<u32, SimulationError> {
    if value <= 0 {
        return Err(SimulationError::invalid(field, "must be > 0"));
    }
    u32::try_from(value).map_err(|_| SimulationError::invalid(field, "is too large"))
}

fn execute_deterministic(args: DeterministicArgs) -> Result<DeterministicResponse, SimulationError> {
    let params = build_simulation_parameters(&args);
    let result = solve_deterministic(&params)?;
    tracing::debug!(?result, "Deterministic solve finished");

    let (reachable, years_to_target, months_to_target, duration) = match result {
        DeterministicResult::Reached { years_to_target } => (
            true,
            Some(years_to_target),
            result.rounded_months(),
            Some(YearsMonths::from_years(years_to_target)),
        ),
        DeterministicResult::Unreachable => (false, None, None, None),
    };

    Ok(DeterministicResponse {
        ticker: args.ticker,
        method: "deterministic",
        reachable,
        years_to_target,
        months_to_target,
        duration,
        assumptions: Assumptions {
            initial_investment: args.initial_investment,
            target_profit: args.target_profit,
            growth_rate: Some(args.growth_rate),
            expected_return: None,
            volatility: None,
            dividend_yield: args.dividend_yield,
            reinvest_dividends: args.reinvest_dividends,
            simulations: None,
            horizon_years: None,
        },
    })
}

fn execute_monte_carlo(args: MonteCarloArgs) -> Result<MonteCarloResponse, SimulationError> {
    let params = build_monte_carlo_parameters(&args)?;
    let mut rng = SimRng::new(args.seed);
    let stats = run_monte_carlo(params, &mut rng)?;

    Ok(MonteCarloResponse {
        ticker: args.ticker,
        method: "montecarlo",
        p10: YearsMonths::from_months(stats.p10_months),
        p50: YearsMonths::from_months(stats.p50_months),
        p90: YearsMonths::from_months(stats.p90_months),
        stats,
        seed: args.seed,
        assumptions: Assumptions {
            initial_investment: args.initial_investment,
            target_profit: args.target_profit,
            growth_rate: None,
            expected_return: Some(args.expected_return),
            volatility: Some(args.volatility),
            dividend_yield: args.dividend_yield,
            reinvest_dividends: args.reinvest_dividends,
            simulations: Some(params.trial_count),
            horizon_years: Some(params.horizon_years),
        },
    })
}

pub async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .map_err(|e| format!("Server error: {e}")),
        Command::Deterministic(args) => {
            let response = execute_deterministic(args).map_err(|e| e.to_string())?;
            print_json(&response)
        }
        Command::MonteCarlo(args) => {
            let response = tokio::task::spawn_blocking(move || execute_monte_carlo(args))
                .await
                .map_err(|e| format!("Simulation task failed: {e}"))?
                .map_err(|e| e.to_string())?;
            print_json(&response)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize result: {e}"))?;
    println!("{json}");
    Ok(())
}

pub fn build_router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/deterministic",
            get(deterministic_get_handler).post(deterministic_post_handler),
        )
        .route(
            "/api/monte-carlo",
            get(monte_carlo_get_handler).post(monte_carlo_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Profit-target HTTP API listening");
    tracing::info!("Local access: http://127.0.0.1:{port}/api/deterministic");

    axum::serve(listener, build_router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn deterministic_get_handler(Query(payload): Query<DeterministicPayload>) -> Response {
    deterministic_handler_impl(payload)
}

async fn deterministic_post_handler(Json(payload): Json<DeterministicPayload>) -> Response {
    deterministic_handler_impl(payload)
}

async fn monte_carlo_get_handler(Query(payload): Query<MonteCarloPayload>) -> Response {
    monte_carlo_handler_impl(payload).await
}

async fn monte_carlo_post_handler(Json(payload): Json<MonteCarloPayload>) -> Response {
    monte_carlo_handler_impl(payload).await
}

fn deterministic_handler_impl(payload: DeterministicPayload) -> Response {
    match execute_deterministic(deterministic_args_from_payload(payload)) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => simulation_error_response(&err),
    }
}

async fn monte_carlo_handler_impl(payload: MonteCarloPayload) -> Response {
    let args = monte_carlo_args_from_payload(payload);
    let joined = tokio::task::spawn_blocking(move || execute_monte_carlo(args)).await;
    match joined {
        Ok(Ok(response)) => json_response(StatusCode::OK, response),
        Ok(Err(err)) => simulation_error_response(&err),
        Err(err) => {
            tracing::error!(error = %err, "Monte Carlo task panicked");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation failed")
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn simulation_error_response(err: &SimulationError) -> Response {
    let status = match err {
        SimulationError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
        SimulationError::NumericOverflow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SimulationError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    };
    tracing::warn!(error = %err, status = status.as_u16(), "Rejected simulation request");
    error_response(status, &err.to_string())
}

fn default_deterministic_args() -> DeterministicArgs {
    DeterministicArgs {
        ticker: None,
        initial_investment: 10_000.0,
        target_profit: 5_000.0,
        growth_rate: 12.0,
        dividend_yield: 6.0,
        reinvest_dividends: true,
    }
}

fn default_monte_carlo_args() -> MonteCarloArgs {
    MonteCarloArgs {
        ticker: None,
        initial_investment: 10_000.0,
        target_profit: 5_000.0,
        expected_return: 10.0,
        volatility: 25.0,
        dividend_yield: 6.0,
        reinvest_dividends: true,
        simulations: 1_000,
        horizon_years: 10,
        seed: DEFAULT_SEED,
    }
}

fn deterministic_args_from_payload(payload: DeterministicPayload) -> DeterministicArgs {
    let mut args = default_deterministic_args();
    if let Some(v) = payload.ticker {
        args.ticker = Some(v.to_uppercase());
    }
    if let Some(v) = payload.initial_investment {
        args.initial_investment = v;
    }
    if let Some(v) = payload.target_profit {
        args.target_profit = v;
    }
    if let Some(v) = payload.growth_rate {
        args.growth_rate = v;
    }
    if let Some(v) = payload.dividend_yield {
        args.dividend_yield = v;
    }
    if let Some(v) = payload.reinvest_dividends {
        args.reinvest_dividends = v;
    }
    args
}

fn monte_carlo_args_from_payload(payload: MonteCarloPayload) -> MonteCarloArgs {
    let mut args = default_monte_carlo_args();
    if let Some(v) = payload.ticker {
        args.ticker = Some(v.to_uppercase());
    }
    if let Some(v) = payload.initial_investment {
        args.initial_investment = v;
    }
    if let Some(v) = payload.target_profit {
        args.target_profit = v;
    }
    if let Some(v) = payload.expected_return {
        args.expected_return = v;
    }
    if let Some(v) = payload.volatility {
        args.volatility = v;
    }
    if let Some(v) = payload.dividend_yield {
        args.dividend_yield = v;
    }
    if let Some(v) = payload.reinvest_dividends {
        args.reinvest_dividends = v;
    }
    if let Some(v) = payload.simulations {
        args.simulations = v;
    }
    if let Some(v) = payload.horizon_years {
        args.horizon_years = v;
    }
    if let Some(v) = payload.seed {
        args.seed = v;
    }
    args
}
