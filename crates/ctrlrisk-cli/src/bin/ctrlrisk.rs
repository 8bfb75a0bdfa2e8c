//! ctrlrisk CLI - run the control-risk engines over JSON request files
//!
//! Usage:
//!   ctrlrisk posterior request.json              # Beta posterior summary
//!   ctrlrisk cascade graph.json -o json          # Cascade propagation as JSON
//!   ctrlrisk simulate loss.json --seed 7         # Reproducible Monte Carlo run
//!   RUST_LOG=debug ctrlrisk what-if graph.json   # Engine diagnostics on stderr

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use ctrlrisk_core::engine::beta_bernoulli::{
    aggregate_evidence, calculate_posterior, generate_posterior_time_series, EvidenceCounts,
    EvidencePayload, EvidencePoint, Posterior, PosteriorTimeSeriesPoint, Prior,
};
use ctrlrisk_core::engine::cascade::{
    propagate_cascade_risk, simulate_control_failure, CascadeResult, ControlNode, DependencyEdge,
    WhatIfResult,
};
use ctrlrisk_core::engine::fair::{bayesian_fair, BayesianFairResult};
use ctrlrisk_core::engine::monte_carlo::{
    simulate_annual_loss_with_config, LossDistribution, LossScenario, MonteCarloConfig,
};
use ctrlrisk_core::stats::bootstrap::{bootstrap_ci_with_config, BootstrapConfig, BootstrapResult};
use ctrlrisk_core::stats::correlation::{calculate_correlation, CorrelationResult};
use ctrlrisk_core::stats::descriptive::{mean, median, standard_deviation};
use ctrlrisk_core::stats::regression::{
    linear_regression_xy, logistic_regression_with_config, LogisticRegressionConfig,
    LogisticRegressionResult, RegressionResult,
};
use ctrlrisk_core::stats::survival::{kaplan_meier, SurvivalResult};
use ctrlrisk_core::RiskError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ctrlrisk")]
#[command(version)]
#[command(about = "ctrlrisk - Bayesian control-risk quantification CLI")]
#[command(
    long_about = "Score control evidence, estimate loss exposure, propagate cascade risk \
                  and analyze control data from JSON request files"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary, global = true)]
    output: OutputFormat,

    /// Seed for randomized commands (simulate, bootstrap); entropy when omitted
    #[arg(long, global = true, value_name = "SEED")]
    seed: Option<u64>,

    /// Iterations for simulate, bootstrap and logistic
    #[arg(long, global = true, value_name = "N")]
    iterations: Option<usize>,

    /// Interval coverage for bootstrap
    #[arg(long, global = true, value_name = "LEVEL")]
    confidence_level: Option<f64>,

    /// Log engine diagnostics at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Beta posterior from a prior and pass/fail evidence
    Posterior { file: PathBuf },
    /// Posterior after each timestamped evidence batch
    Timeseries { file: PathBuf },
    /// FAIR annualized loss exposure
    Fair { file: PathBuf },
    /// Monte Carlo annual-loss distribution
    Simulate { file: PathBuf },
    /// Cascade risk over a control dependency graph
    Cascade { file: PathBuf },
    /// Force one control to fail and report the downstream impact
    WhatIf { file: PathBuf },
    /// Pearson correlation between two series
    Correlate { file: PathBuf },
    /// Ordinary least-squares regression
    Regress { file: PathBuf },
    /// Logistic regression on feature rows and boolean outcomes
    Logistic { file: PathBuf },
    /// Kaplan-Meier survival curve
    Survival { file: PathBuf },
    /// Percentile bootstrap interval for a statistic
    Bootstrap { file: PathBuf },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
    Debug,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PosteriorRequest {
    prior: Prior,
    #[serde(default)]
    passes: u64,
    #[serde(default)]
    failures: u64,
    /// Payloads added on top of the explicit counts.
    #[serde(default)]
    evidence: Vec<EvidencePayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeSeriesRequest {
    prior: Prior,
    points: Vec<EvidencePoint>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FairRequest {
    prior: Prior,
    passes: u64,
    failures: u64,
    threat_event_frequency: f64,
    loss_magnitude: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateRequest {
    prior: Prior,
    passes: u64,
    failures: u64,
    scenario: LossScenario,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphRequest {
    nodes: Vec<ControlNode>,
    #[serde(default)]
    edges: Vec<DependencyEdge>,
    /// Required by what-if only.
    failed_control_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PairedRequest {
    x: Vec<f64>,
    y: Vec<f64>,
}

#[derive(Deserialize)]
struct LogisticRequest {
    features: Vec<Vec<f64>>,
    outcomes: Vec<bool>,
}

#[derive(Deserialize)]
struct SurvivalRequest {
    times: Vec<f64>,
    events: Vec<bool>,
}

#[derive(Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Statistic {
    #[default]
    Mean,
    Median,
    StdDev,
}

#[derive(Deserialize)]
struct BootstrapRequest {
    data: Vec<f64>,
    #[serde(default)]
    statistic: Statistic,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Error reading file '{}': {1}", .0.display())]
    Read(PathBuf, #[source] std::io::Error),
    #[error("Invalid request in '{}': {1}", .0.display())]
    Parse(PathBuf, #[source] serde_json::Error),
    #[error("Computation failed: {0}")]
    Engine(#[from] RiskError),
    #[error("Error serializing to JSON: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("Request is missing '{0}'")]
    MissingField(&'static str),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Posterior { file } => {
            let req: PosteriorRequest = read_request(file)?;
            let counts = EvidenceCounts {
                passes: req.passes,
                failures: req.failures,
            }
            .checked_add(aggregate_evidence(&req.evidence))?;
            let posterior = calculate_posterior(&req.prior, counts.passes, counts.failures)?;
            emit(cli.output, &posterior, print_posterior)
        }
        Command::Timeseries { file } => {
            let req: TimeSeriesRequest = read_request(file)?;
            let series = generate_posterior_time_series(&req.prior, &req.points)?;
            emit(cli.output, &series, print_time_series)
        }
        Command::Fair { file } => {
            let req: FairRequest = read_request(file)?;
            let result = bayesian_fair(
                &req.prior,
                req.passes,
                req.failures,
                req.threat_event_frequency,
                req.loss_magnitude,
            )?;
            emit(cli.output, &result, print_fair)
        }
        Command::Simulate { file } => {
            let req: SimulateRequest = read_request(file)?;
            let mut config = MonteCarloConfig::default();
            if let Some(iterations) = cli.iterations {
                config.iterations = iterations;
            }
            let mut rng = make_rng(cli.seed);
            let dist = simulate_annual_loss_with_config(
                &req.prior,
                req.passes,
                req.failures,
                &req.scenario,
                config,
                &mut rng,
            )?;
            emit(cli.output, &dist, print_loss_distribution)
        }
        Command::Cascade { file } => {
            let req: GraphRequest = read_request(file)?;
            let result = propagate_cascade_risk(&req.nodes, &req.edges)?;
            emit(cli.output, &result, print_cascade)
        }
        Command::WhatIf { file } => {
            let req: GraphRequest = read_request(file)?;
            let failed = req
                .failed_control_id
                .as_deref()
                .ok_or(CliError::MissingField("failedControlId"))?;
            let result = simulate_control_failure(&req.nodes, &req.edges, failed)?;
            emit(cli.output, &result, print_what_if)
        }
        Command::Correlate { file } => {
            let req: PairedRequest = read_request(file)?;
            let result = calculate_correlation(&req.x, &req.y)?;
            emit(cli.output, &result, print_correlation)
        }
        Command::Regress { file } => {
            let req: PairedRequest = read_request(file)?;
            let result = linear_regression_xy(&req.x, &req.y)?;
            emit(cli.output, &result, print_regression)
        }
        Command::Logistic { file } => {
            let req: LogisticRequest = read_request(file)?;
            let mut config = LogisticRegressionConfig::default();
            if let Some(iterations) = cli.iterations {
                config.iterations = iterations;
            }
            let result = logistic_regression_with_config(&req.features, &req.outcomes, config)?;
            emit(cli.output, &result, print_logistic)
        }
        Command::Survival { file } => {
            let req: SurvivalRequest = read_request(file)?;
            let result = kaplan_meier(&req.times, &req.events)?;
            emit(cli.output, &result, print_survival)
        }
        Command::Bootstrap { file } => {
            let req: BootstrapRequest = read_request(file)?;
            let mut config = BootstrapConfig::default();
            if let Some(iterations) = cli.iterations {
                config.iterations = iterations;
            }
            if let Some(level) = cli.confidence_level {
                config.confidence_level = level;
            }
            let statistic: fn(&[f64]) -> f64 = match req.statistic {
                Statistic::Mean => mean,
                Statistic::Median => median,
                Statistic::StdDev => standard_deviation,
            };
            let mut rng = make_rng(cli.seed);
            let result = bootstrap_ci_with_config(&req.data, statistic, config, &mut rng)?;
            emit(cli.output, &result, print_bootstrap)
        }
    }
}

fn read_request<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    tracing::debug!("reading request from {}", path.display());
    let source =
        std::fs::read_to_string(path).map_err(|e| CliError::Read(path.to_path_buf(), e))?;
    serde_json::from_str(&source).map_err(|e| CliError::Parse(path.to_path_buf(), e))
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn emit<T: Serialize + Debug>(
    format: OutputFormat,
    value: &T,
    summary: fn(&T),
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).map_err(CliError::Serialize)?;
            println!("{}", json);
        }
        OutputFormat::Debug => println!("{:#?}", value),
        OutputFormat::Summary => summary(value),
    }
    Ok(())
}

fn print_posterior(p: &Posterior) {
    println!("Posterior Beta({:.3}, {:.3})", p.alpha, p.beta);
    println!("  mean                 = {:.6}", p.mean);
    println!("  std dev              = {:.6}", p.standard_deviation());
    println!("  mode                 = {:.6}", p.mode);
    println!(
        "  95% credible interval = [{:.6}, {:.6}]",
        p.credible_interval.lower, p.credible_interval.upper
    );
    println!("  evidence             = {}", p.total_evidence);
    println!("  confidence level     = {:.4}", p.confidence_level);
}

fn print_time_series(series: &Vec<PosteriorTimeSeriesPoint>) {
    println!("Posterior time series ({} points):", series.len());
    for point in series {
        println!(
            "  {}  passes={:<6} failures={:<6} mean={:.6}  [{:.6}, {:.6}]",
            point.timestamp.to_rfc3339(),
            point.cumulative_passes,
            point.cumulative_failures,
            point.posterior.mean,
            point.posterior.credible_interval.lower,
            point.posterior.credible_interval.upper
        );
    }
}

fn print_fair(r: &BayesianFairResult) {
    println!("Annualized loss exposure = {:.2}", r.annualized_loss_exposure);
    println!(
        "  interval           = [{:.2}, {:.2}]",
        r.confidence_interval.lower, r.confidence_interval.upper
    );
    println!("  breach probability = {:.6}", r.posterior.mean);
    println!("  evidence strength  = {}", r.evidence_strength.as_str());
    println!("  prior influence    = {:.4}", r.prior_influence);
}

fn print_loss_distribution(d: &LossDistribution) {
    println!("Simulated annual loss ({} iterations):", d.iterations);
    println!("  mean    = {:.2}", d.mean);
    println!("  std dev = {:.2}", d.std_dev);
    println!("  p5      = {:.2}", d.p5);
    println!("  p50     = {:.2}", d.p50);
    println!("  p95     = {:.2}", d.p95);
    println!("  p99     = {:.2}", d.percentile(0.99));
    println!("  max     = {:.2}", d.max);
}

fn print_cascade(r: &CascadeResult) {
    println!(
        "Cascade risk over {} controls, {} dependencies (max depth {})",
        r.nodes.len(),
        r.edges.len(),
        r.max_depth
    );
    println!("  aggregate risk = {:.6}", r.aggregate_risk);
    if let Some(id) = &r.most_vulnerable {
        println!("  most vulnerable = {}", id);
    }
    println!("\nControls (topological order):");
    for n in &r.nodes {
        println!(
            "  [{}] {:<12} standalone={:.4} cascade={:.4}",
            n.depth, n.id, n.failure_probability, n.cascade_risk
        );
    }
    if !r.critical_paths.is_empty() {
        println!("\nCritical paths:");
        for path in &r.critical_paths {
            println!("  {:.4}  {}", path.average_risk, path.node_ids.join(" -> "));
        }
    }
}

fn print_what_if(r: &WhatIfResult) {
    println!(
        "Failing '{}' raises risk on {} controls (total impact {:.4})",
        r.failed_control_id,
        r.impacts.len(),
        r.total_impact
    );
    for impact in &r.impacts {
        println!(
            "  {:<12} {:.4} -> {:.4}  (+{:.4})",
            impact.control_id, impact.original_risk, impact.new_cascade_risk, impact.risk_increase
        );
    }
}

fn print_correlation(r: &CorrelationResult) {
    println!("{} (n = {})", r.interpretation, r.sample_size);
    if r.status.is_computed() {
        println!("  r       = {:.6}", r.pearson_r);
        println!("  t       = {:.4}", r.t_statistic);
        println!(
            "  p       = {:.6}{}",
            r.p_value,
            if r.significant { " (significant)" } else { "" }
        );
        println!(
            "  95% CI  = [{:.4}, {:.4}]",
            r.confidence_interval.lower, r.confidence_interval.upper
        );
    }
}

fn print_regression(r: &RegressionResult) {
    println!("y = {:.6} + {:.6}·x  (n = {})", r.intercept, r.slope, r.sample_size);
    println!("  r²             = {:.6}", r.r_squared);
    println!("  standard error = {:.6}", r.standard_error);
    println!("  slope p-value  = {:.6}", r.slope_p_value);
    if !r.status.is_computed() {
        println!("  status         = {:?}", r.status);
    }
}

fn print_logistic(r: &LogisticRegressionResult) {
    println!("Logistic regression (n = {}, {} iterations)", r.sample_size, r.iterations);
    println!("  intercept    = {:.6}", r.intercept);
    for (i, w) in r.coefficients.iter().enumerate() {
        println!("  coefficient[{}] = {:.6}", i, w);
    }
    println!("  accuracy     = {:.4}", r.accuracy);
    println!("  AUC          = {:.4}", r.auc);
    println!("  log-loss     = {:.6}", r.log_loss);
}

fn print_survival(r: &SurvivalResult) {
    println!(
        "Kaplan-Meier over {} subjects ({} events, {} censored)",
        r.sample_size, r.total_events, r.total_censored
    );
    match r.median_survival {
        Some(t) => println!("  median survival = {}", t),
        None => println!("  median survival not reached"),
    }
    for p in &r.points {
        println!(
            "  t={:<8} at_risk={:<4} events={:<3} S={:.4}  [{:.4}, {:.4}]",
            p.time, p.at_risk, p.events, p.survival_probability, p.lower, p.upper
        );
    }
}

fn print_bootstrap(r: &BootstrapResult) {
    println!(
        "Estimate = {:.6}  ({:.0}% CI [{:.6}, {:.6}])",
        r.estimate,
        r.confidence_level * 100.0,
        r.confidence_interval.lower,
        r.confidence_interval.upper
    );
    println!("  standard error = {:.6}", r.standard_error);
    println!("  resamples      = {}", r.iterations);
}
