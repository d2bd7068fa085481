//! Custom report builder
//!
//! A [`CustomReportConfig`] names the metrics to aggregate, the filters to
//! apply and optionally the fields to group by. Groups keep the order in
//! which their first record appears in the snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::filter::{apply_filters, display_value, to_number, ReportFilter};
use crate::analytics::period::months_before;
use crate::error::CoreError;
use crate::models::ContractRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Table,
    Line,
    Bar,
    Pie,
    Area,
    Scatter,
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "line" => Ok(Self::Line),
            "bar" => Ok(Self::Bar),
            "pie" => Ok(Self::Pie),
            "area" => Ok(Self::Area),
            "scatter" => Ok(Self::Scatter),
            other => Err(format!("unknown chart type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Excel,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "excel",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// Formats this crate can write
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Csv | Self::Json)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "excel" | "xlsx" => Ok(Self::Excel),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CustomReportConfig {
    pub title: String,
    pub description: String,
    pub metrics: Vec<String>,
    pub filters: Vec<ReportFilter>,
    pub group_by: Vec<String>,
    pub chart_type: ChartType,
    pub export_formats: Vec<ExportFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub metrics: Vec<String>,
}

/// Metric name to value; always contains `count`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aggregates(pub BTreeMap<String, f64>);

impl Aggregates {
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.0.get(metric).copied()
    }

    pub fn count(&self) -> usize {
        self.get("count").unwrap_or(0.0) as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportGroup {
    /// One value per `group_by` field, missing values as empty strings
    pub group: Vec<String>,
    #[serde(flatten)]
    pub aggregates: Aggregates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportData {
    Grouped(Vec<ReportGroup>),
    Summary(Aggregates),
}

impl ReportData {
    /// Rows as (group values, aggregates); a summary is one row with no group
    pub fn rows(&self) -> Vec<(&[String], &Aggregates)> {
        match self {
            Self::Grouped(groups) => groups
                .iter()
                .map(|g| (g.group.as_slice(), &g.aggregates))
                .collect(),
            Self::Summary(aggregates) => vec![(&[][..], aggregates)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomReport {
    pub title: String,
    pub description: String,
    pub generated_at: DateTime<Utc>,
    pub period: ReportPeriod,
    /// Fields the groups in `data` are keyed by
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    pub data: ReportData,
    pub chart_config: ChartConfig,
}

impl CustomReport {
    /// Build a report over `records`
    ///
    /// The reported period is the trailing twelve months; it is informative
    /// only and does not restrict the records.
    pub fn build(
        config: &CustomReportConfig,
        records: &[Arc<ContractRecord>],
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let filtered = apply_filters(records, &config.filters)?;

        let data = if config.group_by.is_empty() {
            ReportData::Summary(aggregate(&filtered, &config.metrics))
        } else {
            ReportData::Grouped(group(&filtered, &config.group_by, &config.metrics))
        };

        tracing::debug!(
            title = %config.title,
            records = filtered.len(),
            groups = config.group_by.len(),
            "Built custom report"
        );

        Ok(Self {
            title: config.title.clone(),
            description: config.description.clone(),
            generated_at: now,
            period: ReportPeriod {
                start_date: months_before(now, 12),
                end_date: now,
            },
            group_by: config.group_by.clone(),
            data,
            chart_config: ChartConfig {
                chart_type: config.chart_type,
                metrics: config.metrics.clone(),
            },
        })
    }
}

/// Group records by the values of `group_by`, in first-seen order
pub fn group(
    records: &[Arc<ContractRecord>],
    group_by: &[String],
    metrics: &[String],
) -> Vec<ReportGroup> {
    let mut order: Vec<Vec<String>> = Vec::new();
    let mut members: HashMap<Vec<String>, Vec<Arc<ContractRecord>>> = HashMap::new();

    for record in records {
        let key: Vec<String> = group_by.iter().map(|field| group_value(record, field)).collect();
        members
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(Arc::clone(record));
    }

    order
        .into_iter()
        .map(|key| {
            let items = members.remove(&key).unwrap_or_default();
            ReportGroup {
                aggregates: aggregate(&items, metrics),
                group: key,
            }
        })
        .collect()
}

fn group_value(record: &ContractRecord, field: &str) -> String {
    match record.field(field) {
        Value::Null => String::new(),
        value => display_value(&value),
    }
}

/// Aggregate the named metrics; `count` is always present
///
/// Known metrics: `total_value`, `average_value`, `monthly_revenue` (active
/// contracts only) and `count`. Any other name sums that field, with
/// non-numeric values counting as zero.
pub fn aggregate(records: &[Arc<ContractRecord>], metrics: &[String]) -> Aggregates {
    let mut out = BTreeMap::new();
    out.insert("count".to_string(), records.len() as f64);

    let total_value = || records.iter().map(|r| r.amount()).sum::<f64>();

    for metric in metrics {
        let value = match metric.as_str() {
            "total_value" => total_value(),
            "average_value" if records.is_empty() => 0.0,
            "average_value" => total_value() / records.len() as f64,
            "monthly_revenue" => records
                .iter()
                .filter(|r| r.is_active())
                .map(|r| r.monthly())
                .sum(),
            "count" => records.len() as f64,
            field => records
                .iter()
                .map(|r| to_number(&r.field(field)))
                .filter(|n| n.is_finite())
                .sum(),
        };
        out.insert(metric.clone(), value);
    }

    Aggregates(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn contract(id: &str, status: &str, region: Option<&str>, amount: f64) -> Arc<ContractRecord> {
        let mut record = ContractRecord::new(id, status);
        record.contract_amount = Some(amount);
        record.monthly_amount = Some(amount / 10.0);
        if let Some(region) = region {
            record.extra.insert("region".to_string(), json!(region));
        }
        record.extra.insert("mileage".to_string(), json!(amount / 100.0));
        Arc::new(record)
    }

    fn records() -> Vec<Arc<ContractRecord>> {
        vec![
            contract("a", "active", Some("north"), 1000.0),
            contract("b", "expired", Some("south"), 2000.0),
            contract("c", "active", Some("north"), 3000.0),
            contract("d", "active", None, 4000.0),
        ]
    }

    fn metrics(names: &[&str]) -> Vec<String> {
        names.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn test_aggregate_known_and_custom_metrics() {
        let agg = aggregate(
            &records(),
            &metrics(&["total_value", "average_value", "monthly_revenue", "mileage"]),
        );

        assert_eq!(agg.count(), 4);
        assert_eq!(agg.get("total_value"), Some(10_000.0));
        assert_eq!(agg.get("average_value"), Some(2_500.0));
        // expired contract excluded
        assert_eq!(agg.get("monthly_revenue"), Some(800.0));
        assert_eq!(agg.get("mileage"), Some(100.0));
    }

    #[test]
    fn test_aggregate_empty() {
        let agg = aggregate(&[], &metrics(&["average_value", "unknown_field"]));
        assert_eq!(agg.count(), 0);
        assert_eq!(agg.get("average_value"), Some(0.0));
        assert_eq!(agg.get("unknown_field"), Some(0.0));
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let groups = group(&records(), &metrics(&["region"]), &metrics(&["total_value"]));

        let keys: Vec<&str> = groups.iter().map(|g| g.group[0].as_str()).collect();
        assert_eq!(keys, vec!["north", "south", ""]);
        assert_eq!(groups[0].aggregates.count(), 2);
        assert_eq!(groups[0].aggregates.get("total_value"), Some(4_000.0));
    }

    #[test]
    fn test_build_report() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let config = CustomReportConfig {
            title: "Active by region".to_string(),
            metrics: metrics(&["total_value"]),
            filters: vec![ReportFilter::equals("status", "active")],
            group_by: metrics(&["region"]),
            chart_type: ChartType::Bar,
            ..Default::default()
        };

        let report = CustomReport::build(&config, &records(), now).unwrap();
        assert_eq!(report.period.start_date, Utc.with_ymd_and_hms(2023, 6, 15, 0, 0, 0).unwrap());
        assert_eq!(report.chart_config.chart_type, ChartType::Bar);

        let ReportData::Grouped(groups) = &report.data else {
            panic!("expected grouped data");
        };
        assert_eq!(groups.len(), 2);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["chart_config"]["type"], "bar");
        assert_eq!(json["data"][0]["group"], json!(["north"]));
        assert_eq!(json["data"][0]["count"], json!(2.0));
    }

    #[test]
    fn test_summary_without_group_by() {
        let config = CustomReportConfig {
            metrics: metrics(&["count"]),
            ..Default::default()
        };
        let report = CustomReport::build(&config, &records(), Utc::now()).unwrap();

        assert!(matches!(report.data, ReportData::Summary(ref agg) if agg.count() == 4));
        assert_eq!(report.data.rows().len(), 1);
    }

    #[test]
    fn test_export_format_support() {
        assert!(ExportFormat::Csv.is_supported());
        assert!(!ExportFormat::Pdf.is_supported());
        assert_eq!("xlsx".parse::<ExportFormat>(), Ok(ExportFormat::Excel));
    }
}
