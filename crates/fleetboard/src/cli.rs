//! CLI helpers: argument parsing and terminal formatting
//!
//! Formatters render with comfy-table; every one has a `no_color` switch
//! for log-friendly output.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table};
use fleetboard_core::analytics::{
    ContractAnalytics, ContractPerformanceReport, Impact, TrendDirection,
};
use fleetboard_core::report::{CustomReport, ExportFormat, ReportFilter};
use std::path::Path;

// ============================================================================
// Argument Parsing
// ============================================================================

/// Parse "7d", "6m", "1y" (relative to `now`) or "YYYY-MM-DD"
pub fn parse_date_arg(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if let Some(stripped) = s.strip_suffix('d') {
        let days = stripped
            .parse::<i64>()
            .context("Invalid days format (expected: 30d)")?;
        return Ok(now - Duration::days(days));
    }

    if let Some(stripped) = s.strip_suffix('m') {
        let months = stripped
            .parse::<u32>()
            .context("Invalid months format (expected: 6m)")?;
        return now
            .checked_sub_months(Months::new(months))
            .context("Date out of range");
    }

    if let Some(stripped) = s.strip_suffix('y') {
        let years = stripped
            .parse::<u32>()
            .context("Invalid years format (expected: 1y)")?;
        return now
            .checked_sub_months(Months::new(years * 12))
            .context("Date out of range");
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}' (expected YYYY-MM-DD, 30d, 6m or 1y)", s))?;
    Ok(date.and_hms_opt(0, 0, 0).context("Invalid time")?.and_utc())
}

pub fn parse_filters(raw: &[String]) -> Result<Vec<ReportFilter>> {
    raw.iter()
        .map(|expr| {
            expr.parse::<ReportFilter>()
                .with_context(|| format!("Invalid filter: {}", expr))
        })
        .collect()
}

/// Export format implied by a file extension
pub fn format_from_extension(path: &Path) -> Result<ExportFormat> {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        bail!("Cannot infer export format from {}", path.display());
    };
    ext.parse::<ExportFormat>().map_err(anyhow::Error::msg)
}

// ============================================================================
// Formatters
// ============================================================================

fn new_table(headers: &[&str], no_color: bool) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    if no_color {
        table.set_header(headers.to_vec());
    } else {
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    }
    table
}

fn colored(text: String, color: Color, no_color: bool) -> Cell {
    if no_color {
        Cell::new(text)
    } else {
        Cell::new(text).fg(color)
    }
}

/// Full analytics snapshot as stacked tables
pub fn format_analytics(analytics: &ContractAnalytics, no_color: bool) -> String {
    let m = &analytics.metrics;
    let mut sections = Vec::new();

    sections.push(format!(
        "Period: {} → {} ({})",
        analytics.period.start_date.format("%Y-%m-%d"),
        analytics.period.end_date.format("%Y-%m-%d"),
        analytics.period.granularity
    ));

    let mut metrics = new_table(&["Metric", "Value"], no_color);
    let rows: [(&str, String); 13] = [
        ("Total contracts", m.total_contracts.to_string()),
        ("Active", m.active_contracts.to_string()),
        ("Expired", m.expired_contracts.to_string()),
        ("Cancelled", m.cancelled_contracts.to_string()),
        ("Total value", format_money(m.total_contract_value)),
        ("Monthly revenue", format_money(m.monthly_revenue)),
        ("Annual revenue", format_money(m.annual_revenue)),
        ("Average value", format_money(m.average_contract_value)),
        ("Renewal rate", format_pct(m.renewal_rate)),
        ("Termination rate", format_pct(m.termination_rate)),
        ("Compliance rate*", format_pct(m.compliance_rate)),
        ("Satisfaction*", format!("{:.1} / 5", m.customer_satisfaction)),
        ("Vehicle utilization*", format_pct(m.vehicle_utilization)),
    ];
    for (label, value) in rows {
        metrics.add_row(vec![label.to_string(), value]);
    }
    sections.push(metrics.to_string());

    let mut trends = new_table(&["Trend", "Latest", "Change", "Direction"], no_color);
    for trend in &analytics.trends {
        let (arrow, color) = match trend.trend_direction {
            TrendDirection::Up => ("↑ up", Color::Green),
            TrendDirection::Down => ("↓ down", Color::Red),
            TrendDirection::Stable => ("→ stable", Color::Grey),
        };
        trends.add_row(vec![
            Cell::new(trend.metric.name()),
            Cell::new(format!("{:.2}", trend.latest().map(|p| p.value).unwrap_or(0.0))),
            Cell::new(format!("{:+.1}%", trend.period_over_period_change)),
            colored(arrow.to_string(), color, no_color),
        ]);
    }
    sections.push(trends.to_string());

    let mut segments = new_table(&["Segment", "Contracts", "Value", "Share", "Growth*"], no_color);
    for segment in &analytics.segments {
        segments.add_row(vec![
            segment.name.clone(),
            segment.count.to_string(),
            format_money(segment.value),
            format!("{:.1}%", segment.percentage),
            format!("{:+.1}%", segment.growth_rate),
        ]);
    }
    sections.push(segments.to_string());

    let mut forecasts = new_table(&["Month", "Predicted", "Low", "High"], no_color);
    for forecast in &analytics.forecasts {
        forecasts.add_row(vec![
            forecast.period.clone(),
            format_money(forecast.predicted_revenue),
            format_money(forecast.confidence_interval.lower),
            format_money(forecast.confidence_interval.upper),
        ]);
    }
    sections.push(forecasts.to_string());

    if analytics.insights.is_empty() {
        sections.push("No insights: all indicators within thresholds.".to_string());
    } else {
        let mut insights = new_table(&["Impact", "Insight", "Suggested actions"], no_color);
        for insight in &analytics.insights {
            let color = match insight.impact {
                Impact::Critical => Color::Red,
                Impact::High => Color::Yellow,
                Impact::Medium => Color::Blue,
                Impact::Low => Color::Grey,
            };
            insights.add_row(vec![
                colored(insight.impact.as_str().to_string(), color, no_color),
                Cell::new(format!("{}\n{}", insight.title, insight.description)),
                Cell::new(insight.suggested_actions.join("\n")),
            ]);
        }
        sections.push(insights.to_string());
    }

    sections.push("* estimated, not derived from contract data".to_string());
    sections.join("\n\n")
}

/// Custom report rows: group columns, then aggregates
pub fn format_report(report: &CustomReport, no_color: bool) -> String {
    let rows = report.data.rows();
    let metrics: Vec<&str> = rows
        .first()
        .map(|&(_, aggregates)| aggregates.iter().map(|(name, _)| name).collect())
        .unwrap_or_default();

    let headers: Vec<&str> = report
        .group_by
        .iter()
        .map(String::as_str)
        .chain(metrics.iter().copied())
        .collect();
    let mut table = new_table(&headers, no_color);

    for (group, aggregates) in &rows {
        let cells: Vec<String> = group
            .iter()
            .map(|value| if value.is_empty() { "-".to_string() } else { value.clone() })
            .chain(metrics.iter().map(|metric| {
                aggregates
                    .get(metric)
                    .map(|v| format!("{:.2}", v))
                    .unwrap_or_default()
            }))
            .collect();
        table.add_row(cells);
    }

    format!(
        "{}\n{}\n\n{}",
        report.title,
        "=".repeat(report.title.chars().count()),
        table
    )
}

/// Single contract performance (human)
pub fn format_performance(report: &ContractPerformanceReport, no_color: bool) -> String {
    let mut lines = vec![];
    lines.push(format!("Contract:          {}", report.contract_id));
    lines.push(format!("Performance score: {:.1}", report.performance_score));
    lines.push(format!("Revenue:           {}", format_money(report.revenue_generated)));
    lines.push(format!("Costs:             {}", format_money(report.costs_incurred)));
    lines.push(format!("Profitability:     {}", format_money(report.profitability)));
    lines.push(format!("Retention score:   {:.1}", report.customer_retention_score));
    lines.push(format!("Compliance score:  {:.1}", report.compliance_score));
    lines.push(format!("Utilization:       {:.1}%", report.utilization_rate));

    let mut payments = new_table(&["Due", "Amount", "Status", "Days late"], no_color);
    for entry in &report.payment_history {
        payments.add_row(vec![
            entry.date.format("%Y-%m-%d").to_string(),
            format_money(entry.amount),
            format!("{:?}", entry.status),
            entry.days_late.to_string(),
        ]);
    }
    lines.push(String::new());
    lines.push(payments.to_string());

    if !report.issues.is_empty() {
        lines.push(String::new());
        lines.push("Issues:".to_string());
        for issue in &report.issues {
            lines.push(format!(
                "  - [{:?}] {} ({})",
                issue.severity,
                issue.description,
                if issue.resolved { "resolved" } else { "open" }
            ));
        }
    }

    if !report.recommendations.is_empty() {
        lines.push(String::new());
        lines.push("Recommendations:".to_string());
        for recommendation in &report.recommendations {
            lines.push(format!("  - {}", recommendation));
        }
    }

    lines.push(String::new());
    lines.push(format!("Estimated fields: {}", report.estimated_fields.join(", ")));
    lines.join("\n")
}

// ============================================================================
// Utilities
// ============================================================================

fn format_money(amount: f64) -> String {
    let abs = amount.abs();
    let sign = if amount < 0.0 { "-" } else { "" };
    if abs >= 1_000_000.0 {
        format!("{}{:.2}M", sign, abs / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{}{:.1}K", sign, abs / 1_000.0)
    } else {
        format!("{}{:.2}", sign, abs)
    }
}

fn format_pct(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fleetboard_core::analytics::PeriodRequest;
    use fleetboard_core::config::AnalyticsConfig;
    use fleetboard_core::estimates::Estimates;
    use fleetboard_core::report::{CustomReportConfig, FilterOperator};
    use fleetboard_core::ContractRecord;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_date_arg_relative() {
        assert_eq!(parse_date_arg("7d", now()).unwrap(), now() - Duration::days(7));
        assert_eq!(
            parse_date_arg("6m", now()).unwrap(),
            Utc.with_ymd_and_hms(2023, 12, 15, 12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date_arg("1y", now()).unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_date_arg_absolute() {
        assert_eq!(
            parse_date_arg("2024-01-31", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()
        );
        assert!(parse_date_arg("yesterday", now()).is_err());
    }

    #[test]
    fn test_parse_filters() {
        let filters = parse_filters(&["status=active".to_string(), "contract_amount>500".to_string()])
            .unwrap();
        assert_eq!(filters[1].operator, FilterOperator::GreaterThan);

        assert!(parse_filters(&["???".to_string()]).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(format_from_extension(Path::new("out/r.csv")).unwrap(), ExportFormat::Csv);
        assert_eq!(format_from_extension(Path::new("r.xlsx")).unwrap(), ExportFormat::Excel);
        assert!(format_from_extension(Path::new("report")).is_err());
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(950.0), "950.00");
        assert_eq!(format_money(12_345.0), "12.3K");
        assert_eq!(format_money(-2_500_000.0), "-2.50M");
    }

    #[test]
    fn test_format_analytics_empty() {
        let analytics = ContractAnalytics::compute(
            &[],
            &PeriodRequest::new(),
            &[],
            &AnalyticsConfig::default(),
            &mut Estimates::fixed(),
            now(),
        )
        .unwrap();

        let output = format_analytics(&analytics, true);
        assert!(output.contains("Total contracts"));
        assert!(output.contains("No insights"));
        assert!(output.contains("2024-07"));
    }

    #[test]
    fn test_format_report_marks_missing_group() {
        let mut record = ContractRecord::new("a", "active");
        record.contract_amount = Some(100.0);
        let config = CustomReportConfig {
            title: "By type".to_string(),
            metrics: vec!["total_value".to_string()],
            group_by: vec!["contract_type".to_string()],
            ..Default::default()
        };
        let report = CustomReport::build(&config, &[Arc::new(record)], now()).unwrap();

        let output = format_report(&report, true);
        assert!(output.starts_with("By type\n======="));
        assert!(output.contains("contract_type"));
        assert!(output.contains("100.00"));
    }
}
