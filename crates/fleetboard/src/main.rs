//! fleetboard - Contract analytics for fleet rental snapshots

mod cli;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use fleetboard_core::analytics::{Granularity, PeriodRequest};
use fleetboard_core::export::{
    export_analytics_to_json, export_forecasts_to_csv, export_report, export_segments_to_csv,
    export_trends_to_csv,
};
use fleetboard_core::report::{ChartType, CustomReportConfig, ExportFormat, ReportFilter};
use fleetboard_core::{AnalyticsConfig, ContractAnalyticsEngine, LoadReport};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "fleetboard",
    version,
    about = "Contract analytics for fleet rental snapshots",
    long_about = "Computes metrics, trends, segments, revenue forecasts and insights over a\n\
                  snapshot of rental contracts, builds custom grouped reports, and exports\n\
                  results as JSON or CSV.\n\
                  \n\
                  Snapshots can be a JSON array, a backend response ({\"data\": [...]}) or JSONL.\n\
                  \n\
                  Examples:\n\
                    fleetboard analytics contracts.json\n\
                    fleetboard analytics contracts.json --from 6m --granularity weekly\n\
                    fleetboard analytics contracts.json -f 'status=active' -f 'contract_amount>10000'\n\
                    fleetboard report contracts.json -m total_value -m monthly_revenue -g contract_type\n\
                    fleetboard report contracts.json --definition report.json --out report.csv\n\
                    fleetboard performance contracts.json c-42\n\
                    fleetboard export contracts.json --out exports/ --format csv\n\
                  \n\
                  Environment Variables:\n\
                    FLEETBOARD_CONFIG                # Path to config.toml\n\
                    FLEETBOARD_NO_COLOR              # Disable ANSI colors (log-friendly)\n\
                    RUST_LOG                         # Log filter (default: fleetboard=info)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to config.toml (default: <config dir>/fleetboard/config.toml)
    #[arg(long, global = true, env = "FLEETBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, global = true, env = "FLEETBOARD_NO_COLOR")]
    no_color: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print analytics for a snapshot
    Analytics {
        /// Contract snapshot file
        file: PathBuf,
        #[command(flatten)]
        scope: ScopeArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build a custom report
    Report {
        /// Contract snapshot file
        file: PathBuf,
        /// Report definition as JSON (overrides the flags below)
        #[arg(long)]
        definition: Option<PathBuf>,
        #[arg(long, default_value = "Custom report")]
        title: String,
        /// Metric to aggregate (repeatable)
        #[arg(long = "metric", short = 'm')]
        metrics: Vec<String>,
        /// Field to group by (repeatable)
        #[arg(long = "group-by", short = 'g')]
        group_by: Vec<String>,
        /// Filter expression (repeatable)
        #[arg(long = "filter", short = 'f')]
        filters: Vec<String>,
        /// table, line, bar, pie, area, scatter
        #[arg(long, default_value = "table")]
        chart: String,
        /// Write the report to a file; format from the extension
        #[arg(long)]
        out: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the performance report of one contract
    Performance {
        /// Contract snapshot file
        file: PathBuf,
        /// Contract ID
        contract_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write analytics to files
    Export {
        /// Contract snapshot file
        file: PathBuf,
        /// Output directory
        #[arg(long, short = 'o')]
        out: PathBuf,
        /// json (one file) or csv (segments, trends, forecasts)
        #[arg(long, default_value = "json", value_parser = ["json", "csv"])]
        format: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
}

/// Period and filters shared by analytics and export
#[derive(Args)]
struct ScopeArgs {
    /// Period start: YYYY-MM-DD or relative (30d, 6m, 1y)
    #[arg(long)]
    from: Option<String>,
    /// Period end: YYYY-MM-DD or relative
    #[arg(long)]
    to: Option<String>,
    /// daily, weekly, monthly, quarterly, yearly, custom
    #[arg(long)]
    granularity: Option<String>,
    /// Filter expression, e.g. 'status=active' (repeatable)
    #[arg(long = "filter", short = 'f')]
    filters: Vec<String>,
}

impl ScopeArgs {
    fn period_request(&self) -> Result<PeriodRequest> {
        let now = Utc::now();
        let mut request = PeriodRequest::new();

        if let Some(from) = &self.from {
            request = request.with_start(cli::parse_date_arg(from, now)?);
        }
        if let Some(to) = &self.to {
            request = request.with_end(cli::parse_date_arg(to, now)?);
        }
        if let Some(granularity) = &self.granularity {
            let granularity: Granularity = granularity.parse().map_err(anyhow::Error::msg)?;
            request = request.with_granularity(granularity);
        }

        Ok(request)
    }

    fn filters(&self) -> Result<Vec<ReportFilter>> {
        cli::parse_filters(&self.filters)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.no_color);

    let config = AnalyticsConfig::discover(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let no_color = cli.no_color;

    match cli.command {
        Command::Analytics { file, scope, json } => {
            run_analytics(config, &file, &scope, json, no_color)?;
        }
        Command::Report {
            file,
            definition,
            title,
            metrics,
            group_by,
            filters,
            chart,
            out,
            json,
        } => {
            let report_config = match definition {
                Some(path) => read_report_definition(&path)?,
                None => CustomReportConfig {
                    title,
                    metrics,
                    group_by,
                    filters: cli::parse_filters(&filters)?,
                    chart_type: chart.parse::<ChartType>().map_err(anyhow::Error::msg)?,
                    ..Default::default()
                },
            };
            run_report(config, &file, &report_config, out.as_deref(), json, no_color)?;
        }
        Command::Performance {
            file,
            contract_id,
            json,
        } => {
            run_performance(config, &file, &contract_id, json, no_color)?;
        }
        Command::Export {
            file,
            out,
            format,
            scope,
        } => {
            run_export(config, &file, &out, &format, &scope)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so JSON output on stdout stays clean
fn init_tracing(no_color: bool) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!no_color),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fleetboard=info")))
        .init();
}

/// Load the snapshot into a fresh engine, surfacing skipped records
fn load_engine(config: AnalyticsConfig, file: &Path) -> Result<ContractAnalyticsEngine> {
    tracing::debug!(path = %file.display(), "Loading contract snapshot");
    let engine = ContractAnalyticsEngine::new(config);
    let report = engine.load_file(file);
    report_load_problems(&report);

    if report.has_fatal_errors() {
        bail!("Could not load contracts from {}", file.display());
    }
    Ok(engine)
}

fn report_load_problems(report: &LoadReport) {
    let (warnings, errors, fatal) = report.error_count();
    if warnings + errors + fatal == 0 {
        return;
    }

    for problem in &report.errors {
        eprintln!("  {:?}: {}", problem.severity, problem.message);
        if let Some(suggestion) = &problem.suggestion {
            eprintln!("    → {}", suggestion);
        }
    }
    eprintln!(
        "Loaded {} contracts, skipped {} ({} warnings, {} errors)",
        report.records_loaded, report.records_skipped, warnings, errors + fatal
    );
}

fn read_report_definition(path: &Path) -> Result<CustomReportConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report definition: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid report definition: {}", path.display()))
}

fn run_analytics(
    config: AnalyticsConfig,
    file: &Path,
    scope: &ScopeArgs,
    json: bool,
    no_color: bool,
) -> Result<()> {
    let engine = load_engine(config, file)?;
    let analytics = engine.generate_analytics(&scope.period_request()?, &scope.filters()?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analytics)?);
    } else {
        println!("{}", cli::format_analytics(&analytics, no_color));
    }
    Ok(())
}

fn run_report(
    config: AnalyticsConfig,
    file: &Path,
    report_config: &CustomReportConfig,
    out: Option<&Path>,
    json: bool,
    no_color: bool,
) -> Result<()> {
    let engine = load_engine(config, file)?;
    let report = engine.generate_custom_report(report_config, None)?;

    if let Some(out) = out {
        let format = cli::format_from_extension(out)?;
        export_report(&report, format, out)?;
        eprintln!("Report written to {}", out.display());
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", cli::format_report(&report, no_color));
    }
    Ok(())
}

fn run_performance(
    config: AnalyticsConfig,
    file: &Path,
    contract_id: &str,
    json: bool,
    no_color: bool,
) -> Result<()> {
    let engine = load_engine(config, file)?;
    let report = engine.generate_contract_performance_report(contract_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", cli::format_performance(&report, no_color));
    }
    Ok(())
}

fn run_export(
    config: AnalyticsConfig,
    file: &Path,
    out: &Path,
    format: &str,
    scope: &ScopeArgs,
) -> Result<()> {
    let engine = load_engine(config, file)?;
    let analytics = engine.generate_analytics(&scope.period_request()?, &scope.filters()?)?;

    let written: Vec<PathBuf> = match format.parse::<ExportFormat>().map_err(anyhow::Error::msg)? {
        ExportFormat::Json => {
            let path = out.join("analytics.json");
            export_analytics_to_json(&analytics, &path)?;
            vec![path]
        }
        ExportFormat::Csv => {
            let segments = out.join("segments.csv");
            let trends = out.join("trends.csv");
            let forecasts = out.join("forecasts.csv");
            export_segments_to_csv(&analytics.segments, &segments)?;
            export_trends_to_csv(&analytics.trends, &trends)?;
            export_forecasts_to_csv(&analytics.forecasts, &forecasts)?;
            vec![segments, trends, forecasts]
        }
        other => bail!("Export format not supported: {}", other),
    };

    for path in written {
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}
