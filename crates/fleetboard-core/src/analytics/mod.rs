//! Contract analytics
//!
//! Headline metrics, time series trends, segmentation, revenue forecasts and
//! rule-based insights computed over an in-memory contract snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AnalyticsConfig;
use crate::error::CoreError;
use crate::estimates::Estimates;
use crate::models::ContractRecord;
use crate::report::filter::{apply_filters, ReportFilter};

pub mod forecasting;
pub mod insights;
pub mod metrics;
pub mod performance;
pub mod period;
pub mod segments;
pub mod trends;


pub use forecasting::{generate_forecasts, ConfidenceInterval, RevenueForecast};
pub use insights::{generate_insights, ContractInsight, Impact, InsightKind};
pub use metrics::{compute_metrics, ContractMetrics};
pub use performance::{
    ContractIssue, ContractPerformanceReport, IssueKind, PaymentHistoryEntry, PaymentStatus,
    Severity,
};
pub use period::{AnalyticsPeriod, Granularity, PeriodRequest};
pub use segments::{create_segments, ContractSegment, SegmentDimension};
pub use trends::{compute_trends, AnalyticsTrend, TrendDirection, TrendMetric, TrendPoint};

/// Fields of [`ContractAnalytics`] that hold placeholder values
const ESTIMATED_FIELDS: [&str; 4] = [
    "metrics.compliance_rate",
    "metrics.customer_satisfaction",
    "metrics.vehicle_utilization",
    "segments.growth_rate",
];

/// Complete analytics snapshot for a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractAnalytics {
    pub period: AnalyticsPeriod,
    pub metrics: ContractMetrics,
    pub trends: Vec<AnalyticsTrend>,
    pub segments: Vec<ContractSegment>,
    pub forecasts: Vec<RevenueForecast>,
    pub insights: Vec<ContractInsight>,
    pub generated_at: DateTime<Utc>,
    /// Dotted paths of placeholder values in this snapshot
    pub estimated_fields: Vec<String>,
}

impl ContractAnalytics {
    /// Compute analytics over `records` (sync function)
    ///
    /// Filters are applied first; every section is then computed over the
    /// filtered set. Only malformed filters fail: empty or sparse data
    /// yields zeroed metrics.
    ///
    /// # Performance
    /// Linear in the number of records; each section is one pass.
    pub fn compute(
        records: &[Arc<ContractRecord>],
        request: &PeriodRequest,
        filters: &[ReportFilter],
        config: &AnalyticsConfig,
        estimates: &mut Estimates,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let period = request.resolve(now);
        let filtered = apply_filters(records, filters)?;

        let metrics = compute_metrics(&filtered, &period, &config.placeholders);
        let trends = compute_trends(&filtered, &period, &config.trends);
        let segments = create_segments(&filtered, estimates);
        let forecasts = generate_forecasts(&filtered, now, &config.forecast);
        let insights = generate_insights(&filtered, &period, &metrics, &trends, &config.thresholds);

        tracing::debug!(
            records = records.len(),
            filtered = filtered.len(),
            active = metrics.active_contracts,
            insights = insights.len(),
            granularity = %period.granularity,
            "Computed contract analytics"
        );

        Ok(Self {
            period,
            metrics,
            trends,
            segments,
            forecasts,
            insights,
            generated_at: now,
            estimated_fields: ESTIMATED_FIELDS.iter().map(|f| f.to_string()).collect(),
        })
    }

    pub fn trend(&self, metric: TrendMetric) -> Option<&AnalyticsTrend> {
        self.trends.iter().find(|t| t.metric == metric)
    }

    /// Segments along one dimension, in output order
    pub fn segments_by(&self, dimension: SegmentDimension) -> impl Iterator<Item = &ContractSegment> {
        self.segments.iter().filter(move |s| s.dimension == dimension)
    }

    /// Insights at or above the given impact
    pub fn insights_at_least(&self, impact: Impact) -> impl Iterator<Item = &ContractInsight> {
        self.insights.iter().filter(move |i| i.impact <= impact)
    }

    /// Sum of predicted revenue over the forecast horizon
    pub fn forecast_total(&self) -> f64 {
        self.forecasts.iter().map(|f| f.predicted_revenue).sum()
    }
}
