//! Report filters
//!
//! A `ReportFilter` is the serializable form (`field`, `operator`, `value`,
//! `label`) shared by analytics and custom reports. It is compiled into a
//! typed predicate before use so malformed operands are rejected once,
//! up front, instead of silently matching nothing.
//!
//! Filters can also be written in a compact text form:
//!
//! ```
//! use fleetboard_core::report::ReportFilter;
//!
//! let filter: ReportFilter = "contract_amount between 1000..5000".parse().unwrap();
//! assert_eq!(filter.field, "contract_amount");
//!
//! let filter: ReportFilter = "status in active,expired".parse().unwrap();
//! assert_eq!(filter.value, serde_json::json!(["active", "expired"]));
//! ```

use crate::error::CoreError;
use crate::models::ContractRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    /// Inclusive `[min, max]`
    Between,
    In,
    /// Case-insensitive substring
    Contains,
}

impl FilterOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::Between => "between",
            Self::In => "in",
            Self::Contains => "~",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFilter {
    /// Dotted field path, e.g. `customer.city`
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub label: String,
}

impl ReportFilter {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        let label = format!("{} {} {}", field, operator.symbol(), display_value(&value));
        Self {
            field,
            operator,
            value,
            label,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Equals, value)
    }

    pub fn between(field: impl Into<String>, min: f64, max: f64) -> Self {
        Self::new(field, FilterOperator::Between, vec![min, max])
    }

    /// Validate the operand and build the predicate
    pub fn compile(&self) -> Result<CompiledFilter, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidFilter {
            field: self.field.clone(),
            reason: reason.to_string(),
        };

        if self.field.trim().is_empty() {
            return Err(invalid("field name is empty"));
        }

        let predicate = match self.operator {
            FilterOperator::Equals => Predicate::Equals(self.value.clone()),
            FilterOperator::NotEquals => Predicate::NotEquals(self.value.clone()),
            FilterOperator::GreaterThan => Predicate::GreaterThan(to_number(&self.value)),
            FilterOperator::LessThan => Predicate::LessThan(to_number(&self.value)),
            FilterOperator::Between => match &self.value {
                Value::Array(bounds) if bounds.len() == 2 => {
                    Predicate::Between(to_number(&bounds[0]), to_number(&bounds[1]))
                }
                _ => return Err(invalid("between expects a [min, max] pair")),
            },
            FilterOperator::In => match &self.value {
                Value::Array(items) => Predicate::In(items.clone()),
                _ => return Err(invalid("in expects a list of values")),
            },
            FilterOperator::Contains => Predicate::Contains(display_value(&self.value).to_lowercase()),
        };

        Ok(CompiledFilter {
            field: self.field.clone(),
            predicate,
        })
    }
}

impl fmt::Display for ReportFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.label.is_empty() {
            write!(
                f,
                "{} {} {}",
                self.field,
                self.operator.symbol(),
                display_value(&self.value)
            )
        } else {
            f.write_str(&self.label)
        }
    }
}

fn keyword_regex() -> &'static Regex {
    static KEYWORD_RE: OnceLock<Regex> = OnceLock::new();
    KEYWORD_RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*([A-Za-z_][\w.]*)\s+(between|in)\s+(.+?)\s*$").unwrap()
    })
}

fn symbol_regex() -> &'static Regex {
    static SYMBOL_RE: OnceLock<Regex> = OnceLock::new();
    SYMBOL_RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_][\w.]*)\s*(!=|==|=|>|<|~)\s*(.*?)\s*$").unwrap()
    })
}

impl FromStr for ReportFilter {
    type Err = CoreError;

    /// Parse `field=value`, `field!=value`, `field>n`, `field<n`,
    /// `field~text`, `field between a..b` or `field in a,b,c`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CoreError::InvalidFilter {
            field: s.trim().to_string(),
            reason: reason.to_string(),
        };

        if let Some(caps) = keyword_regex().captures(s) {
            let field = &caps[1];
            let operand = &caps[3];
            return match caps[2].to_lowercase().as_str() {
                "between" => {
                    let (min, max) = operand
                        .split_once("..")
                        .ok_or_else(|| invalid("between expects 'min..max'"))?;
                    let parse = |raw: &str| {
                        raw.trim()
                            .parse::<f64>()
                            .map_err(|_| invalid("between bounds must be numbers"))
                    };
                    Ok(Self::between(field, parse(min)?, parse(max)?))
                }
                _ => {
                    let items: Vec<Value> = operand
                        .split(',')
                        .map(|item| parse_scalar(item.trim()))
                        .collect();
                    Ok(Self::new(field, FilterOperator::In, items))
                }
            };
        }

        let caps = symbol_regex()
            .captures(s)
            .ok_or_else(|| invalid("expected 'field<op>value' with op one of = != > < ~ between in"))?;

        // `>=`, `<=` and `!==` would otherwise leave a stray `=` in the operand
        if caps[3].starts_with('=') {
            return Err(invalid("unsupported operator (use = != > < ~ between in)"));
        }

        let operator = match &caps[2] {
            "=" | "==" => FilterOperator::Equals,
            "!=" => FilterOperator::NotEquals,
            ">" => FilterOperator::GreaterThan,
            "<" => FilterOperator::LessThan,
            _ => FilterOperator::Contains,
        };

        let value = match operator {
            // Substring search is always textual
            FilterOperator::Contains => Value::String(unquote(&caps[3]).to_string()),
            _ => parse_scalar(&caps[3]),
        };

        Ok(Self::new(&caps[1], operator, value))
    }
}

fn unquote(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(raw)
}

/// Interpret a bare DSL operand: quoted text, number, boolean, null or text
fn parse_scalar(raw: &str) -> Value {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Value::String(unquote(raw).to_string());
    }
    match raw {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .and_then(|n| {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    Some(Value::from(n as i64))
                } else {
                    serde_json::Number::from_f64(n).map(Value::Number)
                }
            })
            .unwrap_or_else(|| Value::String(raw.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Equals(Value),
    NotEquals(Value),
    GreaterThan(f64),
    LessThan(f64),
    Between(f64, f64),
    In(Vec<Value>),
    Contains(String),
}

/// A validated filter ready to test records
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    field: String,
    predicate: Predicate,
}

impl CompiledFilter {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn matches(&self, record: &ContractRecord) -> bool {
        let value = record.field(&self.field);
        match &self.predicate {
            Predicate::Equals(expected) => strict_eq(&value, expected),
            Predicate::NotEquals(expected) => !strict_eq(&value, expected),
            // NaN on either side compares false
            Predicate::GreaterThan(bound) => to_number(&value) > *bound,
            Predicate::LessThan(bound) => to_number(&value) < *bound,
            Predicate::Between(min, max) => {
                let n = to_number(&value);
                n >= *min && n <= *max
            }
            Predicate::In(items) => items.iter().any(|item| strict_eq(&value, item)),
            Predicate::Contains(needle) => display_value(&value).to_lowercase().contains(needle),
        }
    }
}

/// Compile every filter, failing on the first malformed one
pub fn compile_filters(filters: &[ReportFilter]) -> Result<Vec<CompiledFilter>, CoreError> {
    filters.iter().map(ReportFilter::compile).collect()
}

/// Keep the records matching every filter
pub fn apply_filters(
    records: &[Arc<ContractRecord>],
    filters: &[ReportFilter],
) -> Result<Vec<Arc<ContractRecord>>, CoreError> {
    let compiled = compile_filters(filters)?;
    Ok(records
        .iter()
        .filter(|record| compiled.iter().all(|f| f.matches(record)))
        .cloned()
        .collect())
}

/// Equality where numbers compare by value regardless of int/float encoding
fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Numeric coercion: null is 0, booleans are 0/1, numeric text parses,
/// anything else is NaN
pub(crate) fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Textual form of a value as shown to users and matched by `contains`
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(n),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display_value(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object]".to_string(),
    }
}

fn format_number(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
