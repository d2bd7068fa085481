//! Per-contract performance report
//!
//! Revenue, cost and profitability derive from the contract row. Scores,
//! payment outcomes and issues are not recorded anywhere, so they are drawn
//! from [`Estimates`] and listed in `estimated_fields`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::period::months_after;
use crate::config::PlaceholderMetrics;
use crate::error::CoreError;
use crate::estimates::Estimates;
use crate::models::{ContractId, ContractRecord};

/// Payment history never exceeds one year of entries
pub const MAX_PAYMENT_ENTRIES: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    OnTime,
    Late,
    Partial,
    Missed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistoryEntry {
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub status: PaymentStatus,
    pub days_late: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Payment,
    Compliance,
    Maintenance,
    Customer,
    Vehicle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub description: String,
    pub severity: Severity,
    pub resolved: bool,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractPerformanceReport {
    pub contract_id: ContractId,
    /// 0 - 100
    pub performance_score: f64,
    pub revenue_generated: f64,
    pub costs_incurred: f64,
    pub profitability: f64,
    pub customer_retention_score: f64,
    pub compliance_score: f64,
    /// Percent
    pub utilization_rate: f64,
    pub payment_history: Vec<PaymentHistoryEntry>,
    pub issues: Vec<ContractIssue>,
    pub recommendations: Vec<String>,
    /// Fields above that carry estimates rather than recorded data
    pub estimated_fields: Vec<String>,
}

const ESTIMATED_FIELDS: [&str; 7] = [
    "performance_score",
    "customer_retention_score",
    "compliance_score",
    "utilization_rate",
    "payment_history.status",
    "issues",
    "recommendations",
];

impl ContractPerformanceReport {
    /// Build the report for one contract
    pub fn generate(
        record: &ContractRecord,
        placeholders: &PlaceholderMetrics,
        estimates: &mut Estimates,
        now: DateTime<Utc>,
    ) -> Self {
        let performance_score = estimates.performance_score();
        let revenue_generated = record.amount();
        let costs_incurred = revenue_generated * placeholders.cost_ratio;
        let profitability = revenue_generated - costs_incurred;
        let customer_retention_score = estimates.retention_score();
        let compliance_score = estimates.compliance_score();
        let utilization_rate = estimates.utilization_rate();

        let payment_history = payment_history(record, estimates);
        let issues = contract_issues(estimates, now);
        let recommendations = recommendations(performance_score, profitability, estimates);

        Self {
            contract_id: record.id.clone(),
            performance_score,
            revenue_generated,
            costs_incurred,
            profitability,
            customer_retention_score,
            compliance_score,
            utilization_rate,
            payment_history,
            issues,
            recommendations,
            estimated_fields: ESTIMATED_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Look up a contract by ID
pub fn find_contract<'a>(
    records: &'a [Arc<ContractRecord>],
    contract_id: &str,
) -> Result<&'a Arc<ContractRecord>, CoreError> {
    records
        .iter()
        .find(|r| r.id.as_str() == contract_id)
        .ok_or_else(|| CoreError::ContractNotFound {
            contract_id: contract_id.to_string(),
        })
}

/// Monthly entries from start to end date inclusive
///
/// Contracts missing either date have no history.
pub fn payment_history(record: &ContractRecord, estimates: &mut Estimates) -> Vec<PaymentHistoryEntry> {
    let (Some(start), Some(end)) = (record.start_date, record.end_date) else {
        return Vec::new();
    };

    // Offsets are taken from the start date so month-end days are not eroded
    (0..MAX_PAYMENT_ENTRIES as u32)
        .map(|i| months_after(start, i))
        .take_while(|date| *date <= end)
        .map(|date| {
            let days_late = estimates.days_late();
            PaymentHistoryEntry {
                date,
                amount: record.monthly(),
                status: if days_late.is_some() {
                    PaymentStatus::Late
                } else {
                    PaymentStatus::OnTime
                },
                days_late: days_late.unwrap_or(0),
            }
        })
        .collect()
}

fn contract_issues(estimates: &mut Estimates, now: DateTime<Utc>) -> Vec<ContractIssue> {
    let mut issues = Vec::new();

    if estimates.chance(0.2) {
        issues.push(ContractIssue {
            kind: IssueKind::Payment,
            description: "Late payment reported".to_string(),
            severity: Severity::Medium,
            resolved: false,
            date: now - Duration::days(15),
            impact_cost: Some(50.0),
        });
    }

    if estimates.chance(0.1) {
        issues.push(ContractIssue {
            kind: IssueKind::Maintenance,
            description: "Vehicle maintenance required".to_string(),
            severity: Severity::High,
            resolved: true,
            date: now - Duration::days(30),
            impact_cost: Some(500.0),
        });
    }

    issues
}

fn recommendations(performance_score: f64, profitability: f64, estimates: &mut Estimates) -> Vec<String> {
    let mut recommendations = Vec::new();

    if performance_score < 80.0 {
        recommendations.push("Consider reviewing contract terms for optimization".to_string());
    }
    if profitability < 0.0 {
        recommendations.push("Review pricing strategy to improve profitability".to_string());
    }
    if estimates.chance(0.3) {
        recommendations.push("Consider upselling additional services".to_string());
    }
    if estimates.chance(0.2) {
        recommendations.push("Review customer satisfaction for improvement opportunities".to_string());
    }

    recommendations
}
