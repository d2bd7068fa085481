//! Contract segmentation
//!
//! Partitions the snapshot along three categorical columns and one value
//! range. Categorical segments report their share of total contract value;
//! value-range segments report their share of contract count.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::estimates::Estimates;
use crate::models::ContractRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentDimension {
    ContractType,
    CustomerType,
    VehicleCategory,
    ValueRange,
}

impl SegmentDimension {
    pub const ALL: [SegmentDimension; 4] = [
        SegmentDimension::ContractType,
        SegmentDimension::CustomerType,
        SegmentDimension::VehicleCategory,
        SegmentDimension::ValueRange,
    ];

    pub fn field_name(&self) -> &'static str {
        match self {
            Self::ContractType => "contract_type",
            Self::CustomerType => "customer_type",
            Self::VehicleCategory => "vehicle_category",
            Self::ValueRange => "value_range",
        }
    }

    fn category<'a>(&self, record: &'a ContractRecord) -> Option<&'a str> {
        match self {
            Self::ContractType => record.contract_type.as_deref(),
            Self::CustomerType => record.customer_type.as_deref(),
            Self::VehicleCategory => record.vehicle_category.as_deref(),
            Self::ValueRange => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSegment {
    pub name: String,
    pub dimension: SegmentDimension,
    /// Sum of contract amounts
    pub value: f64,
    pub percentage: f64,
    pub count: usize,
    /// Placeholder estimate, percent
    pub growth_rate: f64,
}

/// Contract value bands: label, inclusive lower bound, exclusive upper bound
pub const VALUE_RANGES: [(&str, f64, f64); 4] = [
    ("Low Value (0-10K)", 0.0, 10_000.0),
    ("Medium Value (10K-50K)", 10_000.0, 50_000.0),
    ("High Value (50K-100K)", 50_000.0, 100_000.0),
    ("Enterprise (>100K)", 100_000.0, f64::INFINITY),
];

/// All segments, dimension by dimension
pub fn create_segments(
    records: &[Arc<ContractRecord>],
    estimates: &mut Estimates,
) -> Vec<ContractSegment> {
    let mut segments = Vec::new();
    for dimension in [
        SegmentDimension::ContractType,
        SegmentDimension::CustomerType,
        SegmentDimension::VehicleCategory,
    ] {
        segments.extend(segment_by_field(records, dimension, estimates));
    }
    segments.extend(segment_by_value_range(records, estimates));
    segments
}

/// Group by a categorical column; missing values group under `unknown`
///
/// Segments are ordered by first appearance in `records`.
pub fn segment_by_field(
    records: &[Arc<ContractRecord>],
    dimension: SegmentDimension,
    estimates: &mut Estimates,
) -> Vec<ContractSegment> {
    let mut groups: Vec<(&str, f64, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut total_value = 0.0;

    for record in records {
        let key = dimension.category(record).unwrap_or("unknown");
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((key, 0.0, 0));
            groups.len() - 1
        });
        let entry = &mut groups[slot];
        entry.1 += record.amount();
        entry.2 += 1;
        total_value += record.amount();
    }

    groups
        .into_iter()
        .map(|(name, value, count)| ContractSegment {
            name: format!("{}: {}", dimension.field_name(), name),
            dimension,
            value,
            percentage: if total_value > 0.0 {
                value / total_value * 100.0
            } else {
                0.0
            },
            count,
            growth_rate: estimates.segment_growth_rate(),
        })
        .collect()
}

/// Bucket by contract amount into [`VALUE_RANGES`]
///
/// Always returns one segment per range, empty ones included. Negative
/// amounts fall in no range.
pub fn segment_by_value_range(
    records: &[Arc<ContractRecord>],
    estimates: &mut Estimates,
) -> Vec<ContractSegment> {
    VALUE_RANGES
        .iter()
        .map(|&(name, min, max)| {
            let (value, count) = records
                .iter()
                .map(|r| r.amount())
                .filter(|amount| *amount >= min && *amount < max)
                .fold((0.0, 0usize), |(sum, n), amount| (sum + amount, n + 1));

            ContractSegment {
                name: name.to_string(),
                dimension: SegmentDimension::ValueRange,
                value,
                percentage: if records.is_empty() {
                    0.0
                } else {
                    count as f64 / records.len() as f64 * 100.0
                },
                count,
                growth_rate: estimates.segment_growth_rate(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(id: &str, contract_type: Option<&str>, amount: f64) -> Arc<ContractRecord> {
        let mut record = ContractRecord::new(id, "active");
        record.contract_type = contract_type.map(str::to_string);
        record.contract_amount = Some(amount);
        Arc::new(record)
    }

    #[test]
    fn test_field_segments_share_of_value() {
        let records = vec![
            contract("a", Some("lease"), 30_000.0),
            contract("b", Some("lease"), 10_000.0),
            contract("c", None, 60_000.0),
        ];
        let segments =
            segment_by_field(&records, SegmentDimension::ContractType, &mut Estimates::fixed());

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].name, "contract_type: lease");
        assert_eq!(segments[0].count, 2);
        assert_eq!(segments[0].value, 40_000.0);
        assert_eq!(segments[0].percentage, 40.0);
        assert_eq!(segments[1].name, "contract_type: unknown");
        assert_eq!(segments[1].percentage, 60.0);
    }

    #[test]
    fn test_field_segments_keep_first_seen_order() {
        let records = vec![
            contract("a", Some("rental"), 1_000.0),
            contract("b", Some("lease"), 2_000.0),
            contract("c", Some("rental"), 3_000.0),
        ];
        let names: Vec<String> =
            segment_by_field(&records, SegmentDimension::ContractType, &mut Estimates::fixed())
                .into_iter()
                .map(|s| s.name)
                .collect();

        assert_eq!(names, vec!["contract_type: rental", "contract_type: lease"]);
    }

    #[test]
    fn test_zero_total_value_gives_zero_percentages() {
        let records = vec![contract("a", Some("lease"), 0.0)];
        let segments =
            segment_by_field(&records, SegmentDimension::ContractType, &mut Estimates::fixed());
        assert_eq!(segments[0].percentage, 0.0);
    }

    #[test]
    fn test_value_ranges_half_open() {
        let records = vec![
            contract("a", None, 9_999.0),
            contract("b", None, 10_000.0),
            contract("c", None, 100_000.0),
            contract("d", None, 250_000.0),
        ];
        let segments = segment_by_value_range(&records, &mut Estimates::fixed());

        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0].count, 1);
        assert_eq!(segments[1].count, 1);
        assert_eq!(segments[2].count, 0);
        assert_eq!(segments[3].count, 2);
        assert_eq!(segments[3].percentage, 50.0);
        assert_eq!(segments[3].growth_rate, 5.0);
    }
}
