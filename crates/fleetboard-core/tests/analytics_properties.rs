//! Property tests for analytics invariants
//!
//! Run with:
//! ```bash
//! cargo test --test analytics_properties
//! ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use fleetboard_core::analytics::{ContractAnalytics, PeriodRequest, SegmentDimension};
use fleetboard_core::config::AnalyticsConfig;
use fleetboard_core::estimates::Estimates;
use fleetboard_core::models::ContractRecord;
use fleetboard_core::report::{apply_filters, ReportFilter};
use quickcheck_macros::quickcheck;
use std::sync::Arc;

const STATUSES: [&str; 7] = [
    "active",
    "expired",
    "cancelled",
    "renewed",
    "draft",
    "suspended",
    "terminated",
];
const TYPES: [&str; 3] = ["lease", "rental", ""];

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

/// (status, type, amount, start offset in weeks, term in days)
type Row = (u8, u8, u16, i8, u16);

fn build(rows: &[Row]) -> Vec<Arc<ContractRecord>> {
    let now = now();
    rows.iter()
        .enumerate()
        .map(|(i, &(status, kind, amount, offset, term))| {
            let start = now + Duration::weeks(i64::from(offset));
            let mut record =
                ContractRecord::new(format!("c-{}", i), STATUSES[status as usize % STATUSES.len()]);
            let kind = TYPES[kind as usize % TYPES.len()];
            record.contract_type = (!kind.is_empty()).then(|| kind.to_string());
            record.contract_amount = Some(f64::from(amount) * 3.0);
            record.monthly_amount = Some(f64::from(amount) / 12.0);
            record.created_at = Some(start);
            record.start_date = Some(start);
            record.end_date = Some(start + Duration::days(i64::from(term % 1500)));
            Arc::new(record)
        })
        .collect()
}

fn compute(records: &[Arc<ContractRecord>], estimates: &mut Estimates) -> ContractAnalytics {
    ContractAnalytics::compute(
        records,
        &PeriodRequest::new(),
        &[],
        &AnalyticsConfig::default(),
        estimates,
        now(),
    )
    .expect("no filters, cannot fail")
}

#[quickcheck]
fn status_classes_never_exceed_total(rows: Vec<Row>) -> bool {
    let m = compute(&build(&rows), &mut Estimates::fixed()).metrics;
    m.active_contracts + m.expired_contracts + m.cancelled_contracts <= m.total_contracts
}

#[quickcheck]
fn segment_shares_sum_to_hundred(rows: Vec<Row>) -> bool {
    let records = build(&rows);
    let analytics = compute(&records, &mut Estimates::fixed());
    let total_value: f64 = records.iter().map(|r| r.amount()).sum();

    let sums_to_hundred = |dimension| {
        let sum: f64 = analytics.segments_by(dimension).map(|s| s.percentage).sum();
        (sum - 100.0).abs() < 1e-6
    };

    let by_value_ok = records.is_empty() || sums_to_hundred(SegmentDimension::ValueRange);
    let by_type_ok = total_value == 0.0 || sums_to_hundred(SegmentDimension::ContractType);
    by_value_ok && by_type_ok
}

#[quickcheck]
fn count_and_sum_fields_ignore_estimates(rows: Vec<Row>, seed_a: u64, seed_b: u64) -> bool {
    let records = build(&rows);
    let a = compute(&records, &mut Estimates::seeded(seed_a));
    let b = compute(&records, &mut Estimates::seeded(seed_b));

    a.metrics == b.metrics && a.trends == b.trends && a.forecasts == b.forecasts
}

#[quickcheck]
fn renewal_and_termination_rates_in_range(rows: Vec<Row>) -> bool {
    let m = compute(&build(&rows), &mut Estimates::fixed()).metrics;
    (0.0..=1.0).contains(&m.renewal_rate) && m.termination_rate >= 0.0
}

#[quickcheck]
fn greater_than_filter_keeps_only_larger(rows: Vec<Row>, threshold: u16) -> bool {
    let records = build(&rows);
    let threshold = f64::from(threshold);
    let filter: ReportFilter = match format!("contract_amount > {}", threshold).parse() {
        Ok(filter) => filter,
        Err(_) => return false,
    };

    match apply_filters(&records, &[filter]) {
        Ok(kept) => {
            let expected = records.iter().filter(|r| r.amount() > threshold).count();
            kept.len() == expected && kept.iter().all(|r| r.amount() > threshold)
        }
        Err(_) => false,
    }
}
