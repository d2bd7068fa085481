//! Revenue forecasting
//!
//! Projects current monthly revenue forward with a fixed seasonal table
//! and a flat growth assumption. No history is fitted: the base is the
//! sum of `monthly_amount` over currently active contracts.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::period::months_after;
use crate::config::ForecastConfig;
use crate::models::ContractRecord;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueForecast {
    /// Forecast month as `YYYY-MM`
    pub period: String,
    pub predicted_revenue: f64,
    pub confidence_interval: ConfidenceInterval,
    /// Human-readable assumptions behind the prediction
    pub factors: Vec<String>,
}

/// Seasonal multiplier for the month of `ts`
pub fn seasonal_factor(config: &ForecastConfig, ts: DateTime<Utc>) -> f64 {
    config.seasonal_factors[ts.month0() as usize]
}

/// Current monthly revenue of active contracts
pub fn base_revenue(records: &[Arc<ContractRecord>]) -> f64 {
    records
        .iter()
        .filter(|r| r.is_active())
        .map(|r| r.monthly())
        .sum()
}

/// One forecast per month for `horizon_months` months after `now`
///
/// # Performance
/// One pass over the records; the horizon loop is constant work.
pub fn generate_forecasts(
    records: &[Arc<ContractRecord>],
    now: DateTime<Utc>,
    config: &ForecastConfig,
) -> Vec<RevenueForecast> {
    let base = base_revenue(records);
    let growth_factor = 1.0 + config.monthly_growth;

    (1..=config.horizon_months)
        .map(|offset| {
            let month = months_after(now, offset);
            let seasonal = seasonal_factor(config, month);
            let predicted = base * seasonal * growth_factor;
            let spread = predicted * config.variance;

            RevenueForecast {
                period: month.format("%Y-%m").to_string(),
                predicted_revenue: predicted,
                confidence_interval: ConfidenceInterval {
                    lower: (predicted - spread).max(0.0),
                    upper: predicted + spread,
                },
                factors: vec![
                    format!("Seasonal factor: {:.2}", seasonal),
                    format!("Growth assumption: {:.1}%", config.monthly_growth * 100.0),
                ],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn active(monthly: f64) -> Arc<ContractRecord> {
        let mut record = ContractRecord::new("c", "active");
        record.monthly_amount = Some(monthly);
        Arc::new(record)
    }

    #[test]
    fn test_forecast_months_follow_now() {
        let now = Utc.with_ymd_and_hms(2024, 11, 15, 12, 0, 0).unwrap();
        let forecasts = generate_forecasts(&[active(1000.0)], now, &ForecastConfig::default());

        let periods: Vec<&str> = forecasts.iter().map(|f| f.period.as_str()).collect();
        assert_eq!(
            periods,
            vec!["2024-12", "2025-01", "2025-02", "2025-03", "2025-04", "2025-05"]
        );
    }

    #[test]
    fn test_forecast_applies_season_and_growth() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
        let records = vec![active(1000.0), active(500.0)];
        let forecasts = generate_forecasts(&records, now, &ForecastConfig::default());

        // July factor is 1.4
        let july = &forecasts[0];
        assert_eq!(july.period, "2024-07");
        assert!((july.predicted_revenue - 1500.0 * 1.4 * 1.02).abs() < 1e-9);
        assert!((july.confidence_interval.lower - july.predicted_revenue * 0.9).abs() < 1e-9);
        assert!((july.confidence_interval.upper - july.predicted_revenue * 1.1).abs() < 1e-9);
        assert_eq!(july.factors[0], "Seasonal factor: 1.40");
        assert_eq!(july.factors[1], "Growth assumption: 2.0%");
    }

    #[test]
    fn test_inactive_contracts_ignored() {
        let mut cancelled = ContractRecord::new("x", "cancelled");
        cancelled.monthly_amount = Some(900.0);
        let forecasts = generate_forecasts(
            &[Arc::new(cancelled)],
            Utc::now(),
            &ForecastConfig::default(),
        );

        assert_eq!(forecasts.len(), 6);
        assert!(forecasts.iter().all(|f| f.predicted_revenue == 0.0));
        assert!(forecasts.iter().all(|f| f.confidence_interval.lower == 0.0));
    }
}
