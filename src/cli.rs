//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_export_adapter::{CsvExportAdapter, format_metric};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::projected_gradient_solver::ProjectedGradientSolver;
use crate::domain::backtest::{BacktestConfig, Backtester, DEFAULT_INITIAL_CAPITAL};
use crate::domain::config_validation::{
    parse_date, parse_or, required_string, validate_config,
};
use crate::domain::error::PortfolioError;
use crate::domain::frontier::{DEFAULT_FRONTIER_POINTS, Frontier, FrontierSolver};
use crate::domain::metrics::{PerformanceSummary, RiskReport, TRADING_DAYS_PER_YEAR};
use crate::domain::monte_carlo::{MonteCarloSampler, SamplerConfig, SamplingResult};
use crate::domain::prices::PriceTable;
use crate::domain::rebalance::{
    DEFAULT_MIN_OBSERVATIONS, RebalanceConfig, RebalanceReport, RebalancingEngine,
};
use crate::domain::returns::ReturnSeries;
use crate::domain::universe::{load_universe, parse_tickers};
use crate::domain::weights::WeightVector;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;
use crate::ports::export_port::ExportPort;
use crate::ports::solver_port::QpSolverPort;

const TOP_HOLDINGS: usize = 5;

#[derive(Parser, Debug)]
#[command(
    name = "allocator",
    about = "Max-Sharpe allocation, efficient frontier and annual rebalancing backtests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sample portfolios, trace the frontier and backtest the max-Sharpe allocation
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [export] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Re-optimize every calendar year and chain the yearly backtests
    Rebalance {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [export] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List tickers available in the configured data directory
    ListTickers {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Typed view of a validated configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub data_path: PathBuf,
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub seed: u64,
    pub frontier_points: usize,
    pub min_observations: usize,
    pub sampler: SamplerConfig,
    pub backtest: BacktestConfig,
    pub benchmark: Option<String>,
    pub output_dir: PathBuf,
}

impl RunConfig {
    pub fn periods_per_year(&self) -> f64 {
        self.sampler.periods_per_year
    }

    pub fn rebalance_config(&self) -> RebalanceConfig {
        RebalanceConfig {
            min_observations: self.min_observations,
            seed: self.seed,
            frontier_points: self.frontier_points,
            sampler: self.sampler.clone(),
            backtest: self.backtest.clone(),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Optimize { config, output } => run_optimize(&config, output.as_deref()),
        Command::Rebalance { config, output } => run_rebalance(&config, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListTickers { config } => run_list_tickers(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, PortfolioError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

pub fn build_run_config(adapter: &dyn ConfigPort) -> Result<RunConfig, PortfolioError> {
    let tickers = parse_tickers(&required_string(adapter, "data", "tickers")?)?;
    let risk_free_rate = parse_or(adapter, "backtest", "risk_free_rate", 0.03)?;
    let periods_per_year = parse_or(adapter, "optimizer", "periods_per_year", TRADING_DAYS_PER_YEAR)?;

    let benchmark = if adapter.has_section("benchmark") {
        adapter
            .get_string("benchmark", "ticker")
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
    } else {
        None
    };

    Ok(RunConfig {
        data_path: PathBuf::from(required_string(adapter, "data", "path")?),
        tickers,
        start_date: parse_date(adapter, "data", "start_date")?,
        end_date: parse_date(adapter, "data", "end_date")?,
        seed: parse_or(adapter, "optimizer", "seed", 42)?,
        frontier_points: parse_or(adapter, "optimizer", "frontier_points", DEFAULT_FRONTIER_POINTS)?,
        min_observations: parse_or(
            adapter,
            "backtest",
            "min_observations",
            DEFAULT_MIN_OBSERVATIONS,
        )?,
        sampler: SamplerConfig {
            portfolios: parse_or(adapter, "optimizer", "portfolios", 10_000)?,
            risk_free_rate,
            periods_per_year,
        },
        backtest: BacktestConfig {
            initial_capital: parse_or(
                adapter,
                "backtest",
                "initial_capital",
                DEFAULT_INITIAL_CAPITAL,
            )?,
            risk_free_rate,
            periods_per_year,
            cvar_confidence: Some(parse_or(adapter, "backtest", "cvar_confidence", 0.95)?),
        },
        benchmark,
        output_dir: adapter
            .get_string("export", "output_dir")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("exports")),
    })
}

/// Load, validate and type a configuration file, applying an output
/// directory override.
fn prepare(config_path: &Path, output: Option<&Path>) -> Result<RunConfig, PortfolioError> {
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;
    let mut run = build_run_config(&adapter)?;
    if let Some(dir) = output {
        run.output_dir = dir.to_path_buf();
    }
    Ok(run)
}

/// Fetches the universe, aligns it on common dates and converts to returns.
pub fn load_returns(
    data_port: &dyn PriceDataPort,
    tickers: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<ReturnSeries, PortfolioError> {
    eprintln!(
        "Loading {} tickers, {} to {}...",
        tickers.len(),
        start_date,
        end_date
    );
    let universe = load_universe(data_port, tickers, start_date, end_date)?;
    for skipped in &universe.skipped {
        eprintln!("  skipped {} ({:?})", skipped.ticker, skipped.reason);
    }

    let table = PriceTable::align(&universe.series)?;
    let returns = ReturnSeries::from_prices(&table)?;
    eprintln!(
        "  {} assets, {} aligned return periods",
        returns.asset_count(),
        returns.len()
    );
    Ok(returns)
}

fn run_optimize(config_path: &Path, output: Option<&Path>) -> Result<(), PortfolioError> {
    let run = prepare(config_path, output)?;
    let data_port = CsvAdapter::new(run.data_path.clone());
    let solver = ProjectedGradientSolver::new();
    let exporter = CsvExportAdapter::create(&run.output_dir)?;

    run_optimize_pipeline(&data_port, &solver, &exporter, &run)?;
    eprintln!("\nExports written to: {}", exporter.output_dir().display());
    Ok(())
}

fn run_rebalance(config_path: &Path, output: Option<&Path>) -> Result<(), PortfolioError> {
    let run = prepare(config_path, output)?;
    let data_port = CsvAdapter::new(run.data_path.clone());
    let solver = ProjectedGradientSolver::new();
    let exporter = CsvExportAdapter::create(&run.output_dir)?;

    run_rebalance_pipeline(&data_port, &solver, &exporter, &run)?;
    eprintln!("\nExports written to: {}", exporter.output_dir().display());
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), PortfolioError> {
    let run = prepare(config_path, None)?;

    eprintln!("\nData:");
    eprintln!("  path:       {}", run.data_path.display());
    eprintln!("  tickers:    {}", run.tickers.join(", "));
    eprintln!("  range:      {} to {}", run.start_date, run.end_date);
    eprintln!("\nOptimizer:");
    eprintln!("  portfolios: {}", run.sampler.portfolios);
    eprintln!("  seed:       {}", run.seed);
    eprintln!("  frontier:   {} points", run.frontier_points);
    eprintln!("\nBacktest:");
    eprintln!("  capital:    {:.2}", run.backtest.initial_capital);
    eprintln!("  risk free:  {:.2}%", run.backtest.risk_free_rate * 100.0);
    eprintln!("  min obs:    {} per year", run.min_observations);
    if let Some(benchmark) = &run.benchmark {
        eprintln!("  benchmark:  {}", benchmark);
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_tickers(config_path: &Path) -> Result<(), PortfolioError> {
    let adapter = load_config(config_path)?;
    let data_path = required_string(&adapter, "data", "path")?;
    let tickers = CsvAdapter::new(PathBuf::from(&data_path)).list_tickers()?;

    if tickers.is_empty() {
        eprintln!("No price files found in {}", data_path);
    } else {
        for ticker in &tickers {
            println!("{}", ticker);
        }
        eprintln!("{} tickers found", tickers.len());
    }
    Ok(())
}

/// Everything the single-window study produces.
#[derive(Debug, Clone)]
pub struct OptimizeOutcome {
    pub tickers: Vec<String>,
    pub sampling: SamplingResult,
    pub frontier: Frontier,
    pub summary: PerformanceSummary,
    pub risk: RiskReport,
}

pub fn run_optimize_pipeline(
    data_port: &dyn PriceDataPort,
    solver: &dyn QpSolverPort,
    exporter: &dyn ExportPort,
    run: &RunConfig,
) -> Result<OptimizeOutcome, PortfolioError> {
    // Stage 1: Returns
    let returns = load_returns(data_port, &run.tickers, run.start_date, run.end_date)?;
    let tickers = returns.tickers().to_vec();

    // Stage 2: Monte Carlo max-Sharpe
    eprintln!(
        "Sampling {} portfolios (seed {})...",
        run.sampler.portfolios, run.seed
    );
    let sampling = MonteCarloSampler::new(run.sampler.clone()).sample_seeded(&returns, run.seed)?;

    // Stage 3: Efficient frontier
    let frontier = FrontierSolver::new(solver)
        .with_points(run.frontier_points)
        .with_periods_per_year(run.periods_per_year())
        .solve(&returns)?;
    eprintln!(
        "Efficient frontier: {} of {} targets solved",
        frontier.points.len(),
        run.frontier_points
    );

    // Stage 4: Backtest the selected weights
    let weights = sampling.best_weights().clone();
    let mut backtester = Backtester::from_config(&returns, weights.clone(), &run.backtest);
    backtester.run()?;
    let summary = backtester.summarize(run.backtest.risk_free_rate)?;
    let curve = backtester.equity_curve()?;

    let risk = RiskReport::compute(
        sampling.best_return(),
        sampling.best_volatility(),
        sampling.best_sharpe(),
        curve,
        backtester.daily_returns()?,
        run.backtest.risk_free_rate,
        run.periods_per_year(),
        run.backtest.cvar_confidence.unwrap_or(0.95),
    );

    // Stage 5: Console summary
    print_weights("Max-Sharpe Weights", &tickers, &weights);
    print_metrics("Backtest Summary", &summary);
    eprintln!("\n=== Risk Report ===");
    for metric in risk.metrics() {
        eprintln!("{:<18}{}", format!("{}:", metric.name), format_metric(&metric));
    }
    eprintln!(
        "Acceptance:       {}",
        if risk.meets_acceptance() {
            "PASS"
        } else {
            "FAIL"
        }
    );

    // Stage 6: Export
    exporter.write_portfolios("monte_carlo_portfolios", &tickers, &sampling)?;
    exporter.write_frontier("efficient_frontier", &tickers, &frontier)?;
    exporter.write_weights("best_weights", &tickers, &weights)?;
    exporter.write_equity_curve("equity_curve", curve)?;
    exporter.write_drawdown("drawdown", curve)?;
    let mut metrics = summary.metrics();
    metrics.extend(
        risk.metrics()
            .into_iter()
            .filter(|m| ["Calmar Ratio", "Sortino Ratio", "VaR"].contains(&m.name)),
    );
    exporter.write_metrics("portfolio_metrics_summary", &metrics)?;

    Ok(OptimizeOutcome {
        tickers,
        sampling,
        frontier,
        summary,
        risk,
    })
}

pub fn run_rebalance_pipeline(
    data_port: &dyn PriceDataPort,
    solver: &dyn QpSolverPort,
    exporter: &dyn ExportPort,
    run: &RunConfig,
) -> Result<RebalanceReport, PortfolioError> {
    // Stage 1: Returns
    let returns = load_returns(data_port, &run.tickers, run.start_date, run.end_date)?;
    let tickers = returns.tickers().to_vec();

    // Stage 2: Yearly optimization and chained backtest
    eprintln!(
        "Rebalancing annually over {} years...",
        returns.years().len()
    );
    let engine = RebalancingEngine::new(solver, run.rebalance_config());
    let report = engine.run(&returns)?;

    // Stage 3: Console summary
    eprintln!("\n=== Annual Results ===");
    for year in &report.years {
        let top: Vec<String> = year
            .weights
            .top(&tickers, TOP_HOLDINGS)
            .into_iter()
            .map(|(t, w)| format!("{t} {:.1}%", w * 100.0))
            .collect();
        eprintln!(
            "  {}: return {:>8}, sharpe {:>7.2}, HHI {:.3}  [{}]",
            year.year,
            format!("{:.2}%", year.summary.total_return * 100.0),
            year.summary.sharpe_ratio,
            year.herfindahl,
            top.join(", ")
        );
    }
    for skipped in &report.skipped {
        eprintln!("  {}: skipped ({})", skipped.year, skipped.reason);
    }
    eprintln!(
        "{} years processed, {} skipped",
        report.years.len(),
        report.skipped_count()
    );
    print_metrics("Full Backtest Summary", &report.full_summary);

    // Stage 4: Export
    exporter.write_equity_curve("annual_rebalanced_equity", &report.equity_curve)?;
    exporter.write_annual_summary("annual_summary", &report.years)?;
    exporter.write_annual_weights("annual_weights", &tickers, &report.allocations)?;
    exporter.write_concentration("annual_concentration", &report.years)?;
    exporter.write_metrics("full_backtest_summary", &report.full_summary.metrics())?;
    for year in &report.years {
        exporter.write_frontier(
            &format!("efficient_frontier_{}", year.year),
            &tickers,
            &year.frontier,
        )?;
    }

    // Stage 5: Benchmark
    if let Some(benchmark) = &run.benchmark {
        match benchmark_summary(data_port, benchmark, run) {
            Ok(summary) => {
                print_metrics(&format!("Benchmark ({benchmark})"), &summary);
                exporter.write_metrics("benchmark_summary", &summary.metrics())?;
            }
            Err(e) => {
                tracing::warn!(benchmark = %benchmark, error = %e, "benchmark skipped");
                eprintln!("warning: benchmark {} skipped ({})", benchmark, e);
            }
        }
    }

    Ok(report)
}

/// Buy-and-hold backtest of a single ticker over the configured range.
pub fn benchmark_summary(
    data_port: &dyn PriceDataPort,
    ticker: &str,
    run: &RunConfig,
) -> Result<PerformanceSummary, PortfolioError> {
    let returns = load_returns(data_port, &[ticker.to_string()], run.start_date, run.end_date)?;
    let mut backtester = Backtester::from_config(&returns, WeightVector::equal(1), &run.backtest);
    backtester.run()?;
    backtester.summarize(run.backtest.risk_free_rate)
}

fn print_weights(title: &str, tickers: &[String], weights: &WeightVector) {
    eprintln!("\n=== {} ===", title);
    for (ticker, weight) in weights.top(tickers, tickers.len()) {
        eprintln!("  {:<8} {:>6.2}%", ticker, weight * 100.0);
    }
    eprintln!("  HHI: {:.4}", weights.herfindahl());
}

fn print_metrics(title: &str, summary: &PerformanceSummary) {
    eprintln!("\n=== {} ===", title);
    for metric in summary.metrics() {
        eprintln!("{:<18}{}", format!("{}:", metric.name), format_metric(&metric));
    }
}
