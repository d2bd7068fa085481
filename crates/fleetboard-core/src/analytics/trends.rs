//! Time series trends
//!
//! Buckets contracts by `created_at` over the analysis period and reports
//! the period-over-period change of four headline metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::period::AnalyticsPeriod;
use crate::config::TrendConfig;
use crate::models::ContractRecord;

/// Metrics tracked over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    TotalContracts,
    ActiveContracts,
    MonthlyRevenue,
    TotalContractValue,
}

impl TrendMetric {
    pub const ALL: [TrendMetric; 4] = [
        TrendMetric::TotalContracts,
        TrendMetric::ActiveContracts,
        TrendMetric::MonthlyRevenue,
        TrendMetric::TotalContractValue,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::TotalContracts => "total_contracts",
            Self::ActiveContracts => "active_contracts",
            Self::MonthlyRevenue => "monthly_revenue",
            Self::TotalContractValue => "total_contract_value",
        }
    }
}

impl fmt::Display for TrendMetric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Bucket start
    pub date: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsTrend {
    pub metric: TrendMetric,
    /// Percent change from the first to the last point
    pub period_over_period_change: f64,
    pub trend_direction: TrendDirection,
    pub data_points: Vec<TrendPoint>,
}

impl AnalyticsTrend {
    pub fn latest(&self) -> Option<&TrendPoint> {
        self.data_points.last()
    }
}

/// Per-bucket accumulator for all tracked metrics
#[derive(Default, Clone, Copy)]
struct BucketAggregate {
    total: usize,
    active: usize,
    monthly_revenue: f64,
    contract_value: f64,
}

impl BucketAggregate {
    fn value(&self, metric: TrendMetric) -> f64 {
        match metric {
            TrendMetric::TotalContracts => self.total as f64,
            TrendMetric::ActiveContracts => self.active as f64,
            TrendMetric::MonthlyRevenue => self.monthly_revenue,
            TrendMetric::TotalContractValue => self.contract_value,
        }
    }
}

/// Percent change from first to last value
///
/// A zero baseline gives 0 when the series stays at zero and +/-100 otherwise.
pub fn period_over_period_change(points: &[TrendPoint]) -> f64 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return 0.0;
    };
    if points.len() < 2 {
        return 0.0;
    }

    if first.value == 0.0 {
        return if last.value == 0.0 {
            0.0
        } else {
            100.0 * last.value.signum()
        };
    }

    (last.value - first.value) / first.value.abs() * 100.0
}

/// Up/down outside the stable band, stable inside it
pub fn trend_direction(change: f64, stable_band_pct: f64) -> TrendDirection {
    if change.abs() <= stable_band_pct {
        TrendDirection::Stable
    } else if change > 0.0 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    }
}

/// Compute trends for every [`TrendMetric`]
///
/// Records without `created_at`, or created outside every bucket, do not
/// contribute to any point.
///
/// # Performance
/// One pass over the records plus a binary search per record.
pub fn compute_trends(
    records: &[Arc<ContractRecord>],
    period: &AnalyticsPeriod,
    config: &TrendConfig,
) -> Vec<AnalyticsTrend> {
    let buckets = period.buckets(config.max_points);
    let mut aggregates = vec![BucketAggregate::default(); buckets.len()];
    let mut undated = 0usize;

    for record in records {
        let Some(created) = record.created_at else {
            undated += 1;
            continue;
        };

        // Buckets are contiguous and sorted: find the last one starting at or before `created`
        let idx = buckets.partition_point(|(start, _)| *start <= created);
        if idx == 0 {
            continue;
        }
        let (_, end) = buckets[idx - 1];
        if created >= end {
            continue;
        }

        let agg = &mut aggregates[idx - 1];
        agg.total += 1;
        agg.contract_value += record.amount();
        if record.is_active() {
            agg.active += 1;
            agg.monthly_revenue += record.monthly();
        }
    }

    if undated > 0 {
        tracing::debug!(undated, "Contracts without created_at excluded from trends");
    }

    TrendMetric::ALL
        .iter()
        .map(|&metric| {
            let data_points: Vec<TrendPoint> = buckets
                .iter()
                .zip(&aggregates)
                .map(|((start, _), agg)| TrendPoint {
                    date: *start,
                    value: agg.value(metric),
                })
                .collect();

            let change = period_over_period_change(&data_points);
            AnalyticsTrend {
                metric,
                period_over_period_change: change,
                trend_direction: trend_direction(change, config.stable_band_pct),
                data_points,
            }
        })
        .collect()
}
