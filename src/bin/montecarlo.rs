//! Monte Carlo scenario tool
//!
//! - Run scenarios against a remote or in-process engine
//! - Preview single distributions
//! - Save, list and show named scenarios
//! - Serve the reference engine over HTTP

use std::num::NonZeroU32;
use std::path::Path;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use montecarlo_sdk::analysis::{CdfSeries, HistogramSeries, SensitivityView, StatsTable};
use montecarlo_sdk::config::EngineMode;
use montecarlo_sdk::engine::serve;
use montecarlo_sdk::{
    preview_distribution, run_scenario, AppConfig, BaseUrl, Distribution, HttpEngine, LocalEngine,
    ResultsSession, Scenario, ScenarioStore, SimulationEngine,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser)]
#[command(name = "montecarlo")]
#[command(version, about = "Monte Carlo scenario runner", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "montecarlo.toml")]
    config: String,

    /// Engine base URL (overrides config)
    #[arg(long, env = "MONTECARLO_ENGINE_URL")]
    engine_url: Option<String>,

    /// Use the in-process engine instead of HTTP
    #[arg(long)]
    local: bool,

    /// Scenario store directory (overrides config)
    #[arg(long)]
    store_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output format (pretty, json, compact)
    #[arg(long)]
    log_format: Option<String>,

    /// Log file path (logs to both file and stdout)
    #[arg(long)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print its results
    Run {
        /// Scenario JSON file
        #[arg(short, long, conflicts_with = "name")]
        file: Option<String>,
        /// Saved scenario name
        #[arg(short, long)]
        name: Option<String>,
        /// Override trial count
        #[arg(long)]
        trials: Option<u32>,
        /// Output to show (default: first)
        #[arg(short, long)]
        output: Option<String>,
        /// Scatter pair as X,Y
        #[arg(long, value_delimiter = ',')]
        scatter: Option<Vec<String>>,
        /// Print the raw engine reply as JSON
        #[arg(long)]
        json: bool,
    },
    /// Preview draws of one distribution
    Preview {
        /// Distribution type (normal, uniform, triangular, lognormal, beta, constant)
        #[arg(short = 't', long = "type")]
        kind: String,
        /// Parameters as key=value
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Save a scenario file under a name
    Save {
        /// Scenario JSON file
        #[arg(short, long)]
        file: String,
        /// Name to save under (default: the scenario's own name)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List saved scenario names
    List,
    /// Print a saved scenario as JSON
    Show { name: String },
    /// Serve the reference engine over HTTP
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: String,
    },
    /// Generate a sample config file
    GenerateConfig {
        /// Output file path
        #[arg(short, long, default_value = "montecarlo.toml")]
        output: String,
    },
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    if let Commands::GenerateConfig { output } = &cli.command {
        return generate_sample_config(output);
    }

    let config = AppConfig::load(&cli.config)?;
    setup_logging(&config, &cli)?;

    match &cli.command {
        Commands::Run {
            file,
            name,
            trials,
            output,
            scatter,
            json,
        } => {
            let mut scenario = match (file, name) {
                (Some(path), _) => read_scenario(path)?,
                (None, Some(name)) => open_store(&config, &cli)?.load(name)?,
                (None, None) => return Err("either --file or --name is required".into()),
            };
            if let Some(trials) = trials {
                scenario.trial_count = NonZeroU32::new(*trials).ok_or("--trials must be positive")?;
            }
            let engine = build_engine(&config, &cli)?;
            run(engine.as_ref(), &scenario, output.as_deref(), scatter.as_deref(), *json).await
        }
        Commands::Preview { kind, params } => {
            let raw: Map<String, Value> = params
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            let distribution = Distribution::from_raw(kind, &raw)?;
            let engine = build_engine(&config, &cli)?;
            let series =
                preview_distribution(engine.as_ref(), &distribution, config.simulation.histogram_bins)
                    .await?;
            println!("{} preview", distribution.kind());
            print_histogram(&series);
            Ok(())
        }
        Commands::Save { file, name } => {
            let scenario = read_scenario(file)?;
            let name = name.clone().unwrap_or_else(|| scenario.name.clone());
            open_store(&config, &cli)?.save(&name, &scenario)?;
            println!("Saved scenario '{name}'");
            Ok(())
        }
        Commands::List => {
            for name in open_store(&config, &cli)?.list()? {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Show { name } => {
            let scenario = open_store(&config, &cli)?.load(name)?;
            println!("{}", serde_json::to_string_pretty(&scenario)?);
            Ok(())
        }
        Commands::Serve { addr } => {
            let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
            let engine = Arc::new(LocalEngine::new(config.local_engine()));
            serve(listener, engine).await?;
            Ok(())
        }
        Commands::GenerateConfig { .. } => Ok(()),
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run(
    engine: &dyn SimulationEngine,
    scenario: &Scenario,
    output: Option<&str>,
    scatter: Option<&[String]>,
    json: bool,
) -> CliResult<()> {
    let session = Mutex::new(ResultsSession::new());
    let result = run_scenario(engine, &session, scenario).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(result.as_ref())?);
        return Ok(());
    }

    let mut session = session.lock().map_err(|_| "session lock poisoned")?;
    let view = match output {
        Some(name) => session
            .select_output(name)
            .ok_or_else(|| format!("no output named '{name}'"))?,
        None => session.current_view().ok_or("engine returned no outputs")?,
    };

    println!("== {} ({} trials) ==", view.output, scenario.trial_count);
    print_table(&view.stats);
    match &view.histogram {
        Ok(series) => print_histogram(series),
        Err(e) => println!("histogram unavailable: {e}"),
    }
    match &view.cdf {
        Ok(cdf) => print_cdf(cdf),
        Err(e) => println!("cdf unavailable: {e}"),
    }
    print_sensitivity(&view.sensitivity);

    let scatter = match scatter {
        Some([x, y]) => session.select_scatter(x, y),
        _ => session.scatter_view(),
    };
    match scatter {
        Ok(Some(series)) => println!(
            "\nScatter {} vs {}: {} trial-aligned points",
            series.x_name,
            series.y_name,
            series.len()
        ),
        Ok(None) => {}
        Err(e) => println!("\nscatter unavailable: {e}"),
    }
    Ok(())
}

fn print_table(table: &StatsTable) {
    for row in &table.rows {
        match &row.value {
            Ok(value) => println!("{:<20} {value:>14}", row.label),
            Err(e) => println!("{:<20} {:>14}  ({e})", row.label, "-"),
        }
    }
}

fn print_histogram(series: &HistogramSeries) {
    let peak = series.counts.iter().copied().max().unwrap_or(0).max(1);
    println!();
    for (center, count) in series.centers.iter().zip(&series.counts) {
        let width = (count * 40 / peak) as usize;
        println!("{center:>12.4} | {:<40} {count}", "#".repeat(width));
    }
}

fn print_cdf(cdf: &CdfSeries) {
    if cdf.degenerate {
        println!("\nCDF: no counts");
        return;
    }
    println!("\nCDF");
    for (x, y) in cdf.x.iter().zip(&cdf.y) {
        println!("{x:>12.4}  {y:.3}");
    }
}

fn print_sensitivity(view: &SensitivityView) {
    let SensitivityView::Ranked(bars) = view else {
        return;
    };
    println!("\nSensitivity");
    for bar in bars {
        let width = (bar.correlation.abs() * 20.0).round() as usize;
        let sign = if bar.is_negative() { '-' } else { '+' };
        println!(
            "{:<16} {:>7.3} {}",
            bar.variable,
            bar.correlation,
            sign.to_string().repeat(width)
        );
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn build_engine(config: &AppConfig, cli: &Cli) -> CliResult<Box<dyn SimulationEngine>> {
    if cli.local || config.engine.mode == EngineMode::Local {
        info!("Using in-process engine");
        return Ok(Box::new(LocalEngine::new(config.local_engine())));
    }
    let base_url = match &cli.engine_url {
        Some(url) => BaseUrl::from(url.as_str()),
        None => config.engine.base_url(),
    };
    info!(url = %base_url.get_url(), "Using HTTP engine");
    Ok(Box::new(HttpEngine::new(base_url, config.engine.timeout())?))
}

fn open_store(config: &AppConfig, cli: &Cli) -> CliResult<ScenarioStore> {
    let dir = cli.store_dir.as_ref().unwrap_or(&config.store.dir);
    Ok(ScenarioStore::open(dir)?)
}

fn read_scenario(path: &str) -> CliResult<Scenario> {
    let content = std::fs::read_to_string(path)?;
    let scenario: Scenario = serde_json::from_str(&content)?;
    Ok(scenario)
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

fn setup_logging(config: &AppConfig, cli: &Cli) -> CliResult<()> {
    let level = cli.log_level.as_ref().unwrap_or(&config.logging.level);

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(level)
            .add_directive("hyper=warn".parse()?)
            .add_directive("reqwest=warn".parse()?),
    };

    let format = cli
        .log_format
        .as_deref()
        .unwrap_or(config.logging.format.as_str());

    // Get log file path from CLI or config
    let log_file = cli.log_file.as_ref().or(config.logging.log_file.as_ref());

    if let Some(log_path) = log_file {
        let file = std::fs::File::create(log_path)?;
        let file = std::sync::Mutex::new(file);

        // JSON on both sinks when a file is involved
        let stdout_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .json();
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .json();

        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .with(file_layer)
            .init();

        eprintln!("Logging to file: {log_path}");
    } else {
        // Logs go to stderr so command output stays clean on stdout
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);
        match format {
            "json" => builder.json().init(),
            "compact" => builder.compact().init(),
            _ => builder.with_target(false).init(),
        }
    }

    Ok(())
}

fn generate_sample_config(path: &str) -> CliResult<()> {
    if Path::new(path).exists() {
        return Err(format!("{path} already exists").into());
    }
    let content = AppConfig::default().to_toml()?;

    let with_comments = format!(
        r#"# Monte Carlo scenario tool configuration
# See: montecarlo --help
#
# [engine] mode = "http" talks to base_url; "local" runs the in-process engine.
# [simulation] seed = 42 makes local runs reproducible.

{content}
# Log format options: pretty, json, compact
"#
    );

    std::fs::write(path, with_comments)?;
    println!("Sample config written to: {path}");
    Ok(())
}
