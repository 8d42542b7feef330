//! epistats - COVID-19 statistics per country
//!
//! A CLI tool that downloads the ECDC case-distribution dataset,
//! aggregates it per country, and renders Markdown or JSON reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing or malformed dataset, unknown country, etc.)
//!
//! A failed download is not an error: the run continues with whatever
//! dataset file is already on disk.

mod analysis;
mod cli;
mod config;
mod context;
mod fetcher;
mod models;
mod report;
mod store;

use analysis::AggregateError;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat, View};
use config::Config;
use context::AppContext;
use fetcher::{Fetcher, Source};
use models::{FetchStatus, Report, ReportBody, ReportMetadata};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("epistats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .epistats.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  .epistats.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .epistats.toml")?;

    println!("✅ Created .epistats.toml with default settings.");
    println!("   Edit it to change the dataset source, report format, and comparison list.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so a report printed to stdout stays clean.
/// `RUST_LOG` takes precedence over the verbosity flags.
fn init_logging(args: &Args) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the fetch, load, and report workflow.
async fn run(args: Args) -> Result<()> {
    // Status lines only when the report goes to a file
    let chatty = args.output.is_some() && !args.quiet;

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let dataset = PathBuf::from(&config.dataset.path);
    let source = Source::parse(&config.dataset.source);

    // Step 1: Refresh the dataset (best effort)
    let fetch_status = if args.skip_fetch {
        info!("Skipping download, using {}", dataset.display());
        FetchStatus::Skipped
    } else {
        if chatty {
            println!("📥 Fetching dataset: {}", source);
        }
        let fetcher = Fetcher::new(!args.quiet);
        fetcher.fetch_best_effort(&dataset, &source).await
    };

    if let FetchStatus::Failed { ref reason } = fetch_status {
        if chatty {
            println!("   ⚠️  Download failed ({}), using existing file", reason);
        }
    }

    // Step 2: Load the dataset (fails loudly)
    let context = AppContext::load(&dataset)
        .with_context(|| format!("Failed to load dataset {}", dataset.display()))?;
    let country_count = context.countries().len();

    if let Some(ref export) = args.export {
        store::save(export, context.records())
            .with_context(|| format!("Failed to export dataset to {}", export.display()))?;
        if chatty {
            println!("💾 Exported {} records to {}", context.record_count(), export.display());
        }
    }

    if args.list_countries {
        for country in context.countries() {
            println!("{}", country);
        }
        return Ok(());
    }

    // Step 3: Run the queries for the requested view
    if chatty {
        println!("🔬 Aggregating {} records...", context.record_count());
    }
    let body = build_body(&args, &config, &context)?;

    // Step 4: Render and save the report
    let report = Report {
        metadata: ReportMetadata {
            dataset_path: dataset.display().to_string(),
            source: source.to_string(),
            fetch_status,
            generated_at: Utc::now(),
            records_loaded: context.record_count(),
            countries: country_count,
        },
        body,
    };

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if chatty {
                println!("\n✅ Report saved to: {}", path.display());
            }
        }
        None => print!("{}", output),
    }

    Ok(())
}

/// Query the context for the data the selected view shows.
fn build_body(args: &Args, config: &Config, context: &AppContext) -> Result<ReportBody> {
    let body = match args.view {
        View::World => {
            let mut aggregates = context
                .aggregate_all()
                .map_err(|e| whole_table_error("world", e))?;
            analysis::sort_by_deaths(&mut aggregates);
            if let Some(top) = config.report.top {
                aggregates.truncate(top);
            }
            ReportBody::World { aggregates }
        }
        View::Country => {
            let country = args
                .country
                .as_deref()
                .context("--view country requires --country <NAME>")?;

            let aggregate = context.aggregate(country)?;
            info!("{}", report::country_headline(&aggregate));

            let per_million = match context.per_million(country) {
                Ok(points) => Some(points),
                Err(e) => {
                    warn!("Skipping per-million series: {}", e);
                    None
                }
            };

            ReportBody::Country {
                aggregate,
                timeline: context.timeline(country)?,
                per_million,
            }
        }
        View::Compare => ReportBody::Comparison {
            rows: context.compare(&config.comparison.countries)?,
        },
        View::Map => ReportBody::Map {
            metric: args.metric,
            points: context
                .choropleth(args.metric)
                .map_err(|e| whole_table_error("map", e))?,
        },
    };

    Ok(body)
}

/// Name the country that stopped a view spanning every country.
fn whole_table_error(view: &str, err: AggregateError) -> anyhow::Error {
    let message = match err.country() {
        Some(country) => format!(
            "The {} view covers every country and could not aggregate {}",
            view, country
        ),
        None => format!("The {} view could not be built", view),
    };
    anyhow::Error::new(err).context(message)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
