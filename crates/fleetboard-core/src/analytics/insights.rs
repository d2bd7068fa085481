//! Actionable insights generation
//!
//! Rule-based findings over the computed metrics and trends. Each rule has a
//! configurable threshold (see [`InsightThresholds`]); rules that fire carry
//! suggested actions and, where a set of contracts is to blame, their IDs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::metrics::{cancelled_ids, unrenewed_ids, ContractMetrics};
use super::period::AnalyticsPeriod;
use super::trends::{AnalyticsTrend, TrendDirection, TrendMetric};
use crate::config::InsightThresholds;
use crate::models::{ContractId, ContractRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Opportunity,
    Risk,
    Trend,
    Anomaly,
    Recommendation,
}

/// Ordered from most to least severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Critical,
    High,
    Medium,
    Low,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractInsight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub impact: Impact,
    pub actionable: bool,
    pub suggested_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_contracts: Vec<ContractId>,
    /// 0.0 - 1.0
    pub confidence: f64,
}

impl ContractInsight {
    fn new(kind: InsightKind, impact: Impact, title: &str, description: String, confidence: f64) -> Self {
        Self {
            kind,
            title: title.to_string(),
            description,
            impact,
            actionable: true,
            suggested_actions: Vec::new(),
            related_contracts: Vec::new(),
            confidence,
        }
    }

    fn actions(mut self, actions: &[&str]) -> Self {
        self.suggested_actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }

    fn related(mut self, ids: Vec<ContractId>) -> Self {
        self.related_contracts = ids;
        self
    }
}

fn pct(rate: f64) -> f64 {
    rate * 100.0
}

/// Generate insights for one analytics snapshot
///
/// Rules, in output order:
/// - termination rate above the maximum → risk
/// - renewal rate below the minimum → opportunity
/// - monthly revenue trending down → trend
/// - compliance rate below the minimum → critical risk
/// - vehicle utilization below the minimum → opportunity
pub fn generate_insights(
    records: &[Arc<ContractRecord>],
    period: &AnalyticsPeriod,
    metrics: &ContractMetrics,
    trends: &[AnalyticsTrend],
    thresholds: &InsightThresholds,
) -> Vec<ContractInsight> {
    let mut insights = Vec::new();
    let limit = thresholds.max_related_contracts;

    if metrics.termination_rate > thresholds.max_termination_rate {
        insights.push(
            ContractInsight::new(
                InsightKind::Risk,
                Impact::High,
                "High Termination Rate Detected",
                format!(
                    "Termination rate is {:.1}%, which is above the healthy threshold of {:.0}%",
                    pct(metrics.termination_rate),
                    pct(thresholds.max_termination_rate)
                ),
                0.85,
            )
            .actions(&[
                "Review termination reasons and identify patterns",
                "Implement customer retention strategies",
                "Analyze competitor offerings",
                "Improve onboarding and support processes",
            ])
            .related(cancelled_ids(records, limit)),
        );
    }

    if metrics.renewal_rate < thresholds.min_renewal_rate {
        insights.push(
            ContractInsight::new(
                InsightKind::Opportunity,
                Impact::High,
                "Renewal Rate Improvement Opportunity",
                format!(
                    "Current renewal rate is {:.1}%. There's opportunity to improve customer retention",
                    pct(metrics.renewal_rate)
                ),
                0.8,
            )
            .actions(&[
                "Implement early renewal incentives",
                "Improve contract terms and pricing",
                "Enhance customer communication",
                "Develop loyalty programs",
            ])
            .related(unrenewed_ids(records, period, limit)),
        );
    }

    let revenue_trend = trends
        .iter()
        .find(|t| t.metric == TrendMetric::MonthlyRevenue);
    if let Some(trend) = revenue_trend.filter(|t| t.trend_direction == TrendDirection::Down) {
        insights.push(
            ContractInsight::new(
                InsightKind::Trend,
                Impact::High,
                "Revenue Decline Detected",
                format!(
                    "Monthly revenue has declined by {:.1}%",
                    trend.period_over_period_change.abs()
                ),
                0.9,
            )
            .actions(&[
                "Investigate reasons for revenue decline",
                "Review pricing strategy",
                "Analyze customer acquisition rates",
                "Evaluate market conditions",
            ]),
        );
    }

    if metrics.compliance_rate < thresholds.min_compliance_rate {
        insights.push(
            ContractInsight::new(
                InsightKind::Risk,
                Impact::Critical,
                "Compliance Issues Need Attention",
                format!(
                    "Compliance rate is {:.1}%, below the target of {:.0}%",
                    pct(metrics.compliance_rate),
                    pct(thresholds.min_compliance_rate)
                ),
                0.95,
            )
            .actions(&[
                "Review compliance failures and root causes",
                "Implement compliance training",
                "Strengthen compliance validation",
                "Consider compliance automation tools",
            ]),
        );
    }

    if metrics.vehicle_utilization < thresholds.min_vehicle_utilization {
        insights.push(
            ContractInsight::new(
                InsightKind::Opportunity,
                Impact::Medium,
                "Low Vehicle Utilization",
                format!(
                    "Vehicle utilization is {:.1}%, indicating potential optimization opportunities",
                    pct(metrics.vehicle_utilization)
                ),
                0.75,
            )
            .actions(&[
                "Analyze vehicle availability and booking patterns",
                "Optimize vehicle allocation and scheduling",
                "Consider dynamic pricing strategies",
                "Improve marketing and demand generation",
            ]),
        );
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::period::Granularity;
    use crate::config::PlaceholderMetrics;
    use chrono::{TimeZone, Utc};

    fn period() -> AnalyticsPeriod {
        AnalyticsPeriod::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
            Granularity::Monthly,
        )
    }

    fn healthy() -> ContractMetrics {
        ContractMetrics::empty(&PlaceholderMetrics::default())
    }

    #[test]
    fn test_healthy_metrics_produce_no_insights() {
        let insights = generate_insights(&[], &period(), &healthy(), &[], &InsightThresholds::default());
        assert!(insights.is_empty());
    }

    #[test]
    fn test_termination_insight_lists_cancelled_contracts() {
        let records: Vec<_> = (0..15)
            .map(|i| Arc::new(ContractRecord::new(format!("c-{}", i), "cancelled")))
            .collect();
        let mut metrics = healthy();
        metrics.termination_rate = 0.5;

        let insights =
            generate_insights(&records, &period(), &metrics, &[], &InsightThresholds::default());

        assert_eq!(insights.len(), 1);
        let insight = &insights[0];
        assert_eq!(insight.kind, InsightKind::Risk);
        assert_eq!(insight.impact, Impact::High);
        assert_eq!(insight.confidence, 0.85);
        assert_eq!(insight.related_contracts.len(), 10);
        assert_eq!(insight.related_contracts[0].as_str(), "c-0");
        assert!(insight.description.starts_with("Termination rate is 50.0%"));
    }

    #[test]
    fn test_threshold_boundaries_do_not_fire() {
        let mut metrics = healthy();
        metrics.termination_rate = 0.15;
        metrics.renewal_rate = 0.7;
        metrics.compliance_rate = 0.9;
        metrics.vehicle_utilization = 0.7;

        let insights = generate_insights(&[], &period(), &metrics, &[], &InsightThresholds::default());
        assert!(insights.is_empty());
    }

    #[test]
    fn test_compliance_is_critical() {
        let mut metrics = healthy();
        metrics.compliance_rate = 0.8;

        let insights = generate_insights(&[], &period(), &metrics, &[], &InsightThresholds::default());
        assert_eq!(insights[0].impact, Impact::Critical);
        assert_eq!(insights[0].confidence, 0.95);
        assert!(insights[0].related_contracts.is_empty());
    }

    #[test]
    fn test_revenue_decline_insight() {
        let trend = AnalyticsTrend {
            metric: TrendMetric::MonthlyRevenue,
            period_over_period_change: -23.44,
            trend_direction: TrendDirection::Down,
            data_points: Vec::new(),
        };

        let insights =
            generate_insights(&[], &period(), &healthy(), &[trend], &InsightThresholds::default());
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::Trend);
        assert_eq!(insights[0].description, "Monthly revenue has declined by 23.4%");
    }
}
