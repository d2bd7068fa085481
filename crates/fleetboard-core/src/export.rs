//! Export functionality for analytics snapshots and custom reports
//!
//! JSON exports serialize the full structures. CSV exports flatten one
//! section per file so they open cleanly in a spreadsheet.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::analytics::{AnalyticsTrend, ContractAnalytics, ContractSegment, RevenueForecast};
use crate::error::CoreError;
use crate::report::{CustomReport, ExportFormat};

/// Create parent directories and open a buffered writer on `path`
fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Quote a CSV field when it contains a delimiter, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path, what: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {} to JSON", what))?;

    let mut writer = create_writer(path)?;
    writer
        .write_all(json.as_bytes())
        .with_context(|| format!("Failed to write JSON file: {}", path.display()))?;
    writer.flush().context("Failed to flush JSON writer")?;
    Ok(())
}

/// Export a full analytics snapshot to pretty-printed JSON
///
/// # Examples
///
/// ```no_run
/// use chrono::Utc;
/// use fleetboard_core::analytics::{ContractAnalytics, PeriodRequest};
/// use fleetboard_core::config::AnalyticsConfig;
/// use fleetboard_core::estimates::Estimates;
/// use fleetboard_core::export::export_analytics_to_json;
/// use std::path::Path;
///
/// let analytics = ContractAnalytics::compute(
///     &[],
///     &PeriodRequest::new(),
///     &[],
///     &AnalyticsConfig::default(),
///     &mut Estimates::fixed(),
///     Utc::now(),
/// )
/// .unwrap();
/// export_analytics_to_json(&analytics, Path::new("analytics.json")).unwrap();
/// ```
pub fn export_analytics_to_json(analytics: &ContractAnalytics, path: &Path) -> Result<()> {
    write_json(analytics, path, "analytics")
}

/// Export segments to CSV
///
/// CSV columns: Dimension, Segment, Contracts, Value, Share (%), Growth (%)
pub fn export_segments_to_csv(segments: &[ContractSegment], path: &Path) -> Result<()> {
    let mut writer = create_writer(path)?;

    writeln!(writer, "Dimension,Segment,Contracts,Value,Share (%),Growth (%)")
        .context("Failed to write CSV header")?;

    for segment in segments {
        writeln!(
            writer,
            "{},{},{},{:.2},{:.2},{:.2}",
            segment.dimension.field_name(),
            csv_field(&segment.name),
            segment.count,
            segment.value,
            segment.percentage,
            segment.growth_rate
        )
        .with_context(|| format!("Failed to write row for segment {}", segment.name))?;
    }

    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Export trends to CSV, one row per metric and bucket
///
/// CSV columns: Metric, Bucket Start, Value
pub fn export_trends_to_csv(trends: &[AnalyticsTrend], path: &Path) -> Result<()> {
    let mut writer = create_writer(path)?;

    writeln!(writer, "Metric,Bucket Start,Value").context("Failed to write CSV header")?;

    for trend in trends {
        for point in &trend.data_points {
            writeln!(
                writer,
                "{},{},{:.2}",
                trend.metric,
                point.date.format("%Y-%m-%d"),
                point.value
            )
            .with_context(|| format!("Failed to write row for trend {}", trend.metric))?;
        }
    }

    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Export forecasts to CSV
///
/// CSV columns: Period, Predicted Revenue, Lower, Upper
pub fn export_forecasts_to_csv(forecasts: &[RevenueForecast], path: &Path) -> Result<()> {
    let mut writer = create_writer(path)?;

    writeln!(writer, "Period,Predicted Revenue,Lower,Upper").context("Failed to write CSV header")?;

    for forecast in forecasts {
        writeln!(
            writer,
            "{},{:.2},{:.2},{:.2}",
            forecast.period,
            forecast.predicted_revenue,
            forecast.confidence_interval.lower,
            forecast.confidence_interval.upper
        )
        .with_context(|| format!("Failed to write row for forecast {}", forecast.period))?;
    }

    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Export a custom report's rows to CSV
///
/// Columns are the `group_by` fields followed by every aggregate, in name
/// order. Rows follow the report's group order.
pub fn export_report_to_csv(report: &CustomReport, path: &Path) -> Result<()> {
    let rows = report.data.rows();
    let metrics: Vec<&str> = rows
        .first()
        .map(|&(_, aggregates)| aggregates.iter().map(|(name, _)| name).collect())
        .unwrap_or_else(|| vec!["count"]);

    let mut writer = create_writer(path)?;

    let header: Vec<String> = report
        .group_by
        .iter()
        .map(String::as_str)
        .chain(metrics.iter().copied())
        .map(csv_field)
        .collect();
    writeln!(writer, "{}", header.join(",")).context("Failed to write CSV header")?;

    for (group, aggregates) in &rows {
        let cells: Vec<String> = group
            .iter()
            .map(|value| csv_field(value))
            .chain(
                metrics
                    .iter()
                    .map(|metric| aggregates.get(metric).map(fmt_value).unwrap_or_default()),
            )
            .collect();
        writeln!(writer, "{}", cells.join(","))
            .with_context(|| format!("Failed to write row for group {:?}", group))?;
    }

    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Integral values without a decimal part, others to two places
fn fmt_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

pub fn export_report_to_json(report: &CustomReport, path: &Path) -> Result<()> {
    write_json(report, path, "report")
}

/// Export a report in one of its configured formats
///
/// PDF and Excel are rejected with [`CoreError::UnsupportedExport`].
pub fn export_report(report: &CustomReport, format: ExportFormat, path: &Path) -> Result<()> {
    match format {
        ExportFormat::Csv => export_report_to_csv(report, path),
        ExportFormat::Json => export_report_to_json(report, path),
        ExportFormat::Pdf | ExportFormat::Excel => Err(CoreError::UnsupportedExport {
            format: format.to_string(),
        }
        .into()),
    }
}
