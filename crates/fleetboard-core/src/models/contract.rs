//! Contract record model
//!
//! A `ContractRecord` is an immutable snapshot of one row of the backend's
//! `contracts` table. Columns the analytics engine understands are typed;
//! everything else is kept verbatim in `extra` so filters and custom reports
//! can still reach it by name.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Newtype for contract IDs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(String);

impl ContractId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ContractId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ContractId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for ContractId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Contract lifecycle status
///
/// Unknown statuses are preserved as `Other` so they still round-trip and
/// can be matched by filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContractStatus {
    Draft,
    UnderReview,
    PendingApproval,
    Approved,
    Active,
    Suspended,
    Expired,
    Cancelled,
    Terminated,
    Renewed,
    Completed,
    Archived,
    Other(String),
}

impl ContractStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::UnderReview => "under_review",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Terminated => "terminated",
            Self::Renewed => "renewed",
            Self::Completed => "completed",
            Self::Archived => "archived",
            Self::Other(raw) => raw,
        }
    }
}

impl Default for ContractStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for ContractStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "draft" => Self::Draft,
            "under_review" => Self::UnderReview,
            "pending_approval" => Self::PendingApproval,
            "approved" => Self::Approved,
            "active" => Self::Active,
            "suspended" => Self::Suspended,
            "expired" => Self::Expired,
            "cancelled" => Self::Cancelled,
            "terminated" => Self::Terminated,
            "renewed" => Self::Renewed,
            "completed" => Self::Completed,
            "archived" => Self::Archived,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for ContractStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<ContractStatus> for String {
    fn from(status: ContractStatus) -> Self {
        match status {
            ContractStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One contract row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ContractRow")]
pub struct ContractRecord {
    pub id: ContractId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_number: Option<String>,

    pub status: ContractStatus,
    pub contract_type: Option<String>,
    pub customer_type: Option<String>,
    pub vehicle_category: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub contract_amount: Option<f64>,
    pub monthly_amount: Option<f64>,
    pub renewed_contract_id: Option<String>,

    /// Every other column, untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Date columns as they appeared in the source row
    #[serde(skip)]
    raw_dates: Map<String, Value>,
}

/// Wire shape of a row; date columns are kept raw until conversion
#[derive(Deserialize)]
struct ContractRow {
    id: ContractId,
    #[serde(default)]
    contract_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_status")]
    status: ContractStatus,
    #[serde(default, deserialize_with = "non_empty_string")]
    contract_type: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    customer_type: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    vehicle_category: Option<String>,
    #[serde(default)]
    start_date: Value,
    #[serde(default)]
    end_date: Value,
    #[serde(default)]
    created_at: Value,
    #[serde(default, deserialize_with = "lenient_amount")]
    contract_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    monthly_amount: Option<f64>,
    #[serde(default, deserialize_with = "non_empty_string")]
    renewed_contract_id: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<ContractRow> for ContractRecord {
    fn from(row: ContractRow) -> Self {
        let mut raw_dates = Map::new();
        let mut date = |column: &str, raw: Value| {
            let parsed = lenient_timestamp(&raw);
            if !raw.is_null() {
                raw_dates.insert(column.to_string(), raw);
            }
            parsed
        };
        let start_date = date("start_date", row.start_date);
        let end_date = date("end_date", row.end_date);
        let created_at = date("created_at", row.created_at);

        Self {
            id: row.id,
            contract_number: row.contract_number,
            status: row.status,
            contract_type: row.contract_type,
            customer_type: row.customer_type,
            vehicle_category: row.vehicle_category,
            start_date,
            end_date,
            created_at,
            contract_amount: row.contract_amount,
            monthly_amount: row.monthly_amount,
            renewed_contract_id: row.renewed_contract_id,
            extra: row.extra,
            raw_dates,
        }
    }
}

impl ContractRecord {
    /// Minimal record, mostly for tests and programmatic construction
    pub fn new(id: impl Into<ContractId>, status: impl Into<ContractStatus>) -> Self {
        Self {
            id: id.into(),
            contract_number: None,
            status: status.into(),
            contract_type: None,
            customer_type: None,
            vehicle_category: None,
            start_date: None,
            end_date: None,
            created_at: None,
            contract_amount: None,
            monthly_amount: None,
            renewed_contract_id: None,
            extra: Map::new(),
            raw_dates: Map::new(),
        }
    }

    /// Contract value, 0 when missing
    pub fn amount(&self) -> f64 {
        self.contract_amount.unwrap_or(0.0)
    }

    /// Monthly billing amount, 0 when missing
    pub fn monthly(&self) -> f64 {
        self.monthly_amount.unwrap_or(0.0)
    }

    pub fn is_active(&self) -> bool {
        self.status == ContractStatus::Active
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == ContractStatus::Cancelled
    }

    /// Renewed either by status or by a link to its successor
    pub fn is_renewed(&self) -> bool {
        self.status == ContractStatus::Renewed || self.renewed_contract_id.is_some()
    }

    /// True when the contract's term intersects `[start, end]`.
    /// Missing dates never overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        matches!(
            (self.start_date, self.end_date),
            (Some(s), Some(e)) if s <= end && e >= start
        )
    }

    /// True when the contract ended strictly before `instant`
    pub fn ended_before(&self, instant: DateTime<Utc>) -> bool {
        self.end_date.is_some_and(|e| e < instant)
    }

    /// Resolve a dotted field path to a JSON value
    ///
    /// Typed columns are checked first, then `extra`, descending into nested
    /// objects. Date columns resolve to their value as loaded, falling back
    /// to RFC 3339 for records built in code. Anything missing resolves to
    /// `Value::Null`.
    pub fn field(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let Some(head) = segments.next() else {
            return Value::Null;
        };

        let root = match head {
            "id" => Value::String(self.id.to_string()),
            "contract_number" => opt_string(&self.contract_number),
            "status" => Value::String(self.status.as_str().to_string()),
            "contract_type" => opt_string(&self.contract_type),
            "customer_type" => opt_string(&self.customer_type),
            "vehicle_category" => opt_string(&self.vehicle_category),
            "start_date" => self.date_field(head, self.start_date),
            "end_date" => self.date_field(head, self.end_date),
            "created_at" => self.date_field(head, self.created_at),
            "contract_amount" => opt_number(self.contract_amount),
            "monthly_amount" => opt_number(self.monthly_amount),
            "renewed_contract_id" => opt_string(&self.renewed_contract_id),
            other => self.extra.get(other).cloned().unwrap_or(Value::Null),
        };

        segments.fold(root, |current, key| match current {
            Value::Object(mut map) => map.remove(key).unwrap_or(Value::Null),
            Value::Array(mut items) => key
                .parse::<usize>()
                .ok()
                .filter(|&i| i < items.len())
                .map(|i| items.swap_remove(i))
                .unwrap_or(Value::Null),
            _ => Value::Null,
        })
    }

    fn date_field(&self, column: &str, parsed: Option<DateTime<Utc>>) -> Value {
        match self.raw_dates.get(column) {
            Some(raw) if lenient_timestamp(raw) == parsed => raw.clone(),
            _ => opt_timestamp(parsed),
        }
    }
}

fn opt_string(value: &Option<String>) -> Value {
    value
        .as_ref()
        .map(|s| Value::String(s.clone()))
        .unwrap_or(Value::Null)
}

fn opt_number(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn opt_timestamp(value: Option<DateTime<Utc>>) -> Value {
    value
        .map(|ts| Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)))
        .unwrap_or(Value::Null)
}

/// Parse the timestamp shapes the backend emits
///
/// Accepts RFC 3339, Postgres-style `YYYY-MM-DD HH:MM:SS[.f][+TZ]`, naive
/// date-times (taken as UTC) and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() && !raw.trim().is_empty() {
                tracing::debug!(value = %raw, "Unparsable contract timestamp, treating as missing");
            }
            parsed
        }
        // Epoch milliseconds
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_status<'de, D>(deserializer: D) -> Result<ContractStatus, D::Error>
where
    D: Deserializer<'de>,
{
    // Non-text statuses are kept verbatim as unknown statuses
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => ContractStatus::default(),
        Value::String(s) => ContractStatus::from(s),
        other => ContractStatus::Other(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_deserialize_backend_row() {
        let row = json!({
            "id": "c-1",
            "contract_number": "CNT-2024-001",
            "status": "active",
            "contract_type": "monthly_rental",
            "customer_type": "corporate",
            "start_date": "2024-01-01",
            "end_date": "2024-12-31T23:59:59Z",
            "created_at": "2024-01-01 09:30:00+00",
            "contract_amount": "12000.50",
            "monthly_amount": 1000,
            "customer": { "name": "Acme Logistics", "city": "Doha" }
        });

        let record: ContractRecord = serde_json::from_value(row).unwrap();

        assert_eq!(record.id.as_str(), "c-1");
        assert_eq!(record.status, ContractStatus::Active);
        assert_eq!(record.contract_amount, Some(12000.5));
        assert_eq!(record.monthly(), 1000.0);
        assert_eq!(
            record.start_date,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            record.created_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap())
        );
        assert!(record.extra.contains_key("customer"));
        assert_eq!(record.vehicle_category, None);
    }

    #[test]
    fn test_lenient_fields_degrade_to_none() {
        let row = json!({
            "id": "c-2",
            "status": null,
            "contract_type": "",
            "start_date": "not a date",
            "contract_amount": "n/a",
        });

        let record: ContractRecord = serde_json::from_value(row).unwrap();

        assert_eq!(record.status, ContractStatus::default());
        assert_eq!(record.contract_type, None);
        assert_eq!(record.start_date, None);
        assert_eq!(record.amount(), 0.0);
    }

    #[test]
    fn test_unknown_status_round_trips() {
        let status = ContractStatus::from("on_hold");
        assert_eq!(status, ContractStatus::Other("on_hold".to_string()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("on_hold"));
        assert_eq!(
            serde_json::to_value(ContractStatus::PendingApproval).unwrap(),
            json!("pending_approval")
        );
    }

    #[test]
    fn test_field_resolves_typed_extra_and_nested() {
        let mut record = ContractRecord::new("c-3", "active");
        record.contract_amount = Some(5000.0);
        record
            .extra
            .insert("customer".to_string(), json!({ "name": "Acme", "tags": ["vip"] }));

        assert_eq!(record.field("status"), json!("active"));
        assert_eq!(record.field("contract_amount"), json!(5000.0));
        assert_eq!(record.field("customer.name"), json!("Acme"));
        assert_eq!(record.field("customer.tags.0"), json!("vip"));
        assert_eq!(record.field("customer.missing"), Value::Null);
        assert_eq!(record.field("monthly_amount"), Value::Null);
        assert_eq!(record.field("status.nested"), Value::Null);
    }

    #[test]
    fn test_date_fields_keep_source_form() {
        let row = json!({
            "id": "c-7",
            "start_date": "2024-01-01",
            "end_date": "someday",
            "created_at": "2024-01-01 09:30:00+00",
        });
        let mut record: ContractRecord = serde_json::from_value(row).unwrap();

        assert_eq!(record.field("start_date"), json!("2024-01-01"));
        assert_eq!(record.field("created_at"), json!("2024-01-01 09:30:00+00"));
        assert_eq!(record.end_date, None);
        assert_eq!(record.field("end_date"), json!("someday"));

        // Reassigned in code: the source form no longer applies
        record.start_date = Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(record.field("start_date"), json!("2024-02-01T00:00:00.000Z"));
    }

    #[test]
    fn test_overlap_requires_both_dates() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();

        let mut record = ContractRecord::new("c-4", "active");
        assert!(!record.overlaps(start, end));

        record.start_date = Some(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap());
        record.end_date = Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert!(record.overlaps(start, end));
        assert!(!record.ended_before(start));
    }

    #[test]
    fn test_renewed_by_link() {
        let mut record = ContractRecord::new("c-5", "expired");
        assert!(!record.is_renewed());
        record.renewed_contract_id = Some("c-6".to_string());
        assert!(record.is_renewed());
    }
}
