//! Analysis periods and time buckets

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bucket size used to slice a period into trend points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    /// Weeks start on Sunday
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Yearly,
    /// Arbitrary range, bucketed by month
    Custom,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Custom => "custom",
        }
    }

    /// Start of the bucket containing `ts`
    ///
    /// Quarterly, yearly and custom periods are sliced into months.
    pub fn bucket_start(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = ts.date_naive();
        let start = match self {
            Self::Daily => date,
            Self::Weekly => date - Duration::days(i64::from(date.weekday().num_days_from_sunday())),
            Self::Monthly | Self::Quarterly | Self::Yearly | Self::Custom => {
                first_of_month(date.year(), date.month()).unwrap_or(date)
            }
        };
        midnight(start)
    }

    /// Start of the bucket following the one starting at `bucket_start`
    pub fn next_bucket(&self, bucket_start: DateTime<Utc>) -> DateTime<Utc> {
        self.advance(bucket_start)
    }

    /// Move `ts` forward by one bucket unit, keeping its offset in the unit
    /// (month ends clamp: Jan 31 becomes Feb 29)
    pub fn advance(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let next = match self {
            Self::Daily => ts.checked_add_signed(Duration::days(1)),
            Self::Weekly => ts.checked_add_signed(Duration::days(7)),
            Self::Monthly | Self::Quarterly | Self::Yearly | Self::Custom => {
                ts.checked_add_months(Months::new(1))
            }
        };
        next.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "quarterly" | "quarter" => Ok(Self::Quarterly),
            "yearly" | "year" => Ok(Self::Yearly),
            "custom" => Ok(Self::Custom),
            other => Err(format!(
                "unknown granularity '{}' (expected daily, weekly, monthly, quarterly, yearly, custom)",
                other
            )),
        }
    }
}

/// Resolved analysis window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsPeriod {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub granularity: Granularity,
}

impl AnalyticsPeriod {
    pub fn new(start_date: DateTime<Utc>, end_date: DateTime<Utc>, granularity: Granularity) -> Self {
        Self {
            start_date,
            end_date,
            granularity,
        }
    }

    /// The `months` months up to `now`
    pub fn trailing_months(now: DateTime<Utc>, months: u32, granularity: Granularity) -> Self {
        Self::new(months_before(now, months), now, granularity)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start_date && ts <= self.end_date
    }

    /// Half-open `[start, end)` buckets covering the period, at most `max_points`
    ///
    /// A cursor walks from `start_date` one unit at a time while it is
    /// before `end_date`; each step emits the aligned bucket containing it,
    /// so the first bucket may begin before `start_date`. An inverted
    /// period yields no buckets.
    pub fn buckets(&self, max_points: usize) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        let mut buckets = Vec::new();
        let mut cursor = self.start_date;

        while cursor < self.end_date && buckets.len() < max_points {
            let start = self.granularity.bucket_start(cursor);
            let end = self.granularity.next_bucket(start);
            buckets.push((start, end));
            cursor = self.granularity.advance(cursor);
        }

        buckets
    }
}

/// Partially specified period; gaps are filled when resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodRequest {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub granularity: Option<Granularity>,
}

impl PeriodRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = Some(granularity);
        self
    }

    /// Missing start: 12 months before `now`. Missing end: `now`.
    /// Missing granularity: monthly.
    pub fn resolve(&self, now: DateTime<Utc>) -> AnalyticsPeriod {
        AnalyticsPeriod {
            start_date: self.start_date.unwrap_or_else(|| months_before(now, 12)),
            end_date: self.end_date.unwrap_or(now),
            granularity: self.granularity.unwrap_or_default(),
        }
    }
}

impl From<AnalyticsPeriod> for PeriodRequest {
    fn from(period: AnalyticsPeriod) -> Self {
        Self {
            start_date: Some(period.start_date),
            end_date: Some(period.end_date),
            granularity: Some(period.granularity),
        }
    }
}

pub(crate) fn months_before(ts: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    ts.checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub(crate) fn months_after(ts: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    ts.checked_add_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub(crate) fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub(crate) fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 15, 45, 0).unwrap()
    }

    #[test]
    fn test_bucket_start_per_granularity() {
        // 2024-05-15 is a Wednesday
        let t = ts(2024, 5, 15);
        assert_eq!(Granularity::Daily.bucket_start(t), midnight(t.date_naive()));
        assert_eq!(
            Granularity::Weekly.bucket_start(t),
            Utc.with_ymd_and_hms(2024, 5, 12, 0, 0, 0).unwrap()
        );
        assert_eq!(
            Granularity::Monthly.bucket_start(t),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
        // Coarser granularities are still sliced by month
        for granularity in [Granularity::Quarterly, Granularity::Yearly, Granularity::Custom] {
            assert_eq!(
                granularity.bucket_start(t),
                Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
            );
        }
    }

    #[test]
    fn test_monthly_buckets_cover_period() {
        let period = AnalyticsPeriod::new(ts(2024, 1, 20), ts(2024, 4, 10), Granularity::Monthly);
        let buckets = period.buckets(12);

        // Cursor visits Jan 20, Feb 20 and Mar 20; Apr 20 is past the end
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].0, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(buckets[2].1, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
        for pair in buckets.windows(2) {
            assert_eq!(pair[0].1, pair[1].0, "Buckets must be contiguous");
        }
    }

    #[test]
    fn test_quarterly_period_uses_monthly_buckets() {
        let start = Utc.with_ymd_and_hms(2023, 7, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        let buckets = AnalyticsPeriod::new(start, end, Granularity::Quarterly).buckets(12);

        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0], (start, Utc.with_ymd_and_hms(2023, 8, 1, 0, 0, 0).unwrap()));
        assert_eq!(buckets[11].0, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_month_end_cursor_clamps_without_skipping() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 4, 15, 0, 0, 0).unwrap();
        let buckets = AnalyticsPeriod::new(start, end, Granularity::Monthly).buckets(12);

        // Jan 31, Feb 29, Mar 29; Apr 29 is past the end
        let months: Vec<u32> = buckets.iter().map(|(s, _)| s.month()).collect();
        assert_eq!(months, vec![1, 2, 3]);
    }

    #[test]
    fn test_buckets_capped() {
        let period = AnalyticsPeriod::new(ts(2024, 1, 1), ts(2024, 12, 31), Granularity::Daily);
        assert_eq!(period.buckets(12).len(), 12);
    }

    #[test]
    fn test_inverted_period_has_no_buckets() {
        let period = AnalyticsPeriod::new(ts(2024, 6, 1), ts(2024, 1, 1), Granularity::Monthly);
        assert!(period.buckets(12).is_empty());
    }

    #[test]
    fn test_request_defaults_to_trailing_year() {
        let now = ts(2024, 3, 31);
        let period = PeriodRequest::new().resolve(now);

        assert_eq!(period.end_date, now);
        assert_eq!(period.start_date, ts(2023, 3, 31));
        assert_eq!(period.granularity, Granularity::Monthly);
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!("Weekly".parse::<Granularity>(), Ok(Granularity::Weekly));
        assert_eq!("quarter".parse::<Granularity>(), Ok(Granularity::Quarterly));
        assert!("hourly".parse::<Granularity>().is_err());
    }
}
