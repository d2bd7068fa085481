//! Headline contract metrics
//!
//! Count and sum fields are exact functions of the snapshot. The three
//! operational rates at the bottom of [`ContractMetrics`] come from
//! configuration because contract rows carry no data for them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::period::AnalyticsPeriod;
use crate::config::PlaceholderMetrics;
use crate::models::{ContractId, ContractRecord, ContractStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractMetrics {
    pub total_contracts: usize,
    /// Status active and term overlapping the period
    pub active_contracts: usize,
    pub expired_contracts: usize,
    pub cancelled_contracts: usize,
    pub total_contract_value: f64,
    /// Sum of monthly amounts over active contracts
    pub monthly_revenue: f64,
    pub annual_revenue: f64,
    pub average_contract_value: f64,
    /// Fraction of contracts ending in the period that were renewed
    pub renewal_rate: f64,
    /// Cancelled / active
    pub termination_rate: f64,
    /// Placeholder
    pub compliance_rate: f64,
    /// Placeholder, out of 5
    pub customer_satisfaction: f64,
    /// Placeholder
    pub vehicle_utilization: f64,
}

impl ContractMetrics {
    /// Metrics of an empty snapshot
    pub fn empty(placeholders: &PlaceholderMetrics) -> Self {
        Self {
            total_contracts: 0,
            active_contracts: 0,
            expired_contracts: 0,
            cancelled_contracts: 0,
            total_contract_value: 0.0,
            monthly_revenue: 0.0,
            annual_revenue: 0.0,
            average_contract_value: 0.0,
            renewal_rate: 1.0,
            termination_rate: 0.0,
            compliance_rate: placeholders.compliance_rate,
            customer_satisfaction: placeholders.customer_satisfaction,
            vehicle_utilization: placeholders.vehicle_utilization,
        }
    }
}

/// Active status with a term overlapping the period
pub(crate) fn is_active_in(record: &ContractRecord, period: &AnalyticsPeriod) -> bool {
    record.is_active() && record.overlaps(period.start_date, period.end_date)
}

/// Expired by status, or lapsed before the period without being cancelled.
/// Disjoint from active and cancelled.
pub(crate) fn is_expired_in(record: &ContractRecord, period: &AnalyticsPeriod) -> bool {
    if record.is_cancelled() {
        return false;
    }
    record.status == ContractStatus::Expired
        || (record.ended_before(period.start_date) && !is_active_in(record, period))
}

fn ends_in(record: &ContractRecord, period: &AnalyticsPeriod) -> bool {
    record.end_date.is_some_and(|end| period.contains(end))
}

/// Compute the headline metrics
///
/// # Performance
/// Single pass over the records.
pub fn compute_metrics(
    records: &[Arc<ContractRecord>],
    period: &AnalyticsPeriod,
    placeholders: &PlaceholderMetrics,
) -> ContractMetrics {
    let mut metrics = ContractMetrics::empty(placeholders);
    metrics.total_contracts = records.len();

    for record in records {
        if is_active_in(record, period) {
            metrics.active_contracts += 1;
        } else if is_expired_in(record, period) {
            metrics.expired_contracts += 1;
        } else if record.is_cancelled() {
            metrics.cancelled_contracts += 1;
        }

        metrics.total_contract_value += record.amount();
        if record.is_active() {
            metrics.monthly_revenue += record.monthly();
        }
    }

    metrics.annual_revenue = metrics.monthly_revenue * 12.0;
    metrics.average_contract_value = if metrics.total_contracts > 0 {
        metrics.total_contract_value / metrics.total_contracts as f64
    } else {
        0.0
    };
    metrics.renewal_rate = renewal_rate(records, period);
    metrics.termination_rate = if metrics.active_contracts > 0 {
        metrics.cancelled_contracts as f64 / metrics.active_contracts as f64
    } else {
        0.0
    };

    metrics
}

/// Share of contracts ending inside the period that were renewed
///
/// Returns 1.0 when no contract ends in the period.
pub fn renewal_rate(records: &[Arc<ContractRecord>], period: &AnalyticsPeriod) -> f64 {
    let (ending, renewed) = records
        .iter()
        .filter(|r| ends_in(r, period))
        .fold((0usize, 0usize), |(ending, renewed), r| {
            (ending + 1, renewed + usize::from(r.is_renewed()))
        });

    if ending == 0 {
        1.0
    } else {
        renewed as f64 / ending as f64
    }
}

/// IDs of cancelled contracts, in snapshot order
pub(crate) fn cancelled_ids(records: &[Arc<ContractRecord>], limit: usize) -> Vec<ContractId> {
    records
        .iter()
        .filter(|r| r.is_cancelled())
        .take(limit)
        .map(|r| r.id.clone())
        .collect()
}

/// IDs of contracts ending in the period without a renewal
pub(crate) fn unrenewed_ids(
    records: &[Arc<ContractRecord>],
    period: &AnalyticsPeriod,
    limit: usize,
) -> Vec<ContractId> {
    records
        .iter()
        .filter(|r| ends_in(r, period) && !r.is_renewed())
        .take(limit)
        .map(|r| r.id.clone())
        .collect()
}
