//! Contract analytics engine
//!
//! Owns the loaded snapshot and hands out analytics, custom reports and
//! per-contract performance reports. The snapshot sits behind a
//! `parking_lot::RwLock` so the engine can be shared between threads;
//! every computation works on a cheap clone of the `Arc` list.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::analytics::performance::find_contract;
use crate::analytics::{ContractAnalytics, ContractPerformanceReport, PeriodRequest};
use crate::config::AnalyticsConfig;
use crate::error::{CoreError, LoadReport};
use crate::estimates::Estimates;
use crate::loader::ContractLoader;
use crate::models::ContractRecord;
use crate::report::{CustomReport, CustomReportConfig, ReportFilter};

/// Central analytics engine for fleetboard
pub struct ContractAnalyticsEngine {
    /// Arc<ContractRecord> so snapshots are cheap to clone out of the lock
    records: RwLock<Vec<Arc<ContractRecord>>>,

    /// When `records` was last replaced
    last_data_update: RwLock<Option<DateTime<Utc>>>,

    config: AnalyticsConfig,

    /// Placeholder source, shared across calls so seeded runs stay reproducible
    estimates: Mutex<Estimates>,
}

impl ContractAnalyticsEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        let estimates = Estimates::from_config(&config.estimates);
        Self::with_estimates(config, estimates)
    }

    /// Engine with an explicit placeholder source
    pub fn with_estimates(config: AnalyticsConfig, estimates: Estimates) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            last_data_update: RwLock::new(None),
            config,
            estimates: Mutex::new(estimates),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(AnalyticsConfig::default())
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Replace the snapshot
    pub fn load_data(&self, records: Vec<ContractRecord>) {
        let count = records.len();
        let records: Vec<Arc<ContractRecord>> = records.into_iter().map(Arc::new).collect();

        *self.records.write() = records;
        *self.last_data_update.write() = Some(Utc::now());
        info!(count, "Contract snapshot loaded");
    }

    /// Replace the snapshot from a file
    ///
    /// Malformed records are skipped; the returned report lists them. On a
    /// fatal error the previous snapshot is kept.
    pub fn load_file(&self, path: &Path) -> LoadReport {
        let mut report = LoadReport::new();
        let records = ContractLoader::new().load_graceful(path, &mut report);

        if report.has_fatal_errors() {
            debug!(path = %path.display(), "Keeping previous snapshot after fatal load error");
            return report;
        }

        self.load_data(records);
        report
    }

    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    pub fn last_data_update(&self) -> Option<DateTime<Utc>> {
        *self.last_data_update.read()
    }

    /// Current snapshot (cheap Arc clones)
    pub fn snapshot(&self) -> Vec<Arc<ContractRecord>> {
        self.records.read().clone()
    }

    pub fn generate_analytics(
        &self,
        request: &PeriodRequest,
        filters: &[ReportFilter],
    ) -> Result<ContractAnalytics, CoreError> {
        self.generate_analytics_at(request, filters, Utc::now())
    }

    /// [`Self::generate_analytics`] with an explicit clock
    pub fn generate_analytics_at(
        &self,
        request: &PeriodRequest,
        filters: &[ReportFilter],
        now: DateTime<Utc>,
    ) -> Result<ContractAnalytics, CoreError> {
        let records = self.snapshot();
        let mut estimates = self.estimates.lock();
        ContractAnalytics::compute(&records, request, filters, &self.config, &mut estimates, now)
    }

    /// Build a custom report over `data`, or over the loaded snapshot when `None`
    pub fn generate_custom_report(
        &self,
        config: &CustomReportConfig,
        data: Option<&[ContractRecord]>,
    ) -> Result<CustomReport, CoreError> {
        self.generate_custom_report_at(config, data, Utc::now())
    }

    pub fn generate_custom_report_at(
        &self,
        config: &CustomReportConfig,
        data: Option<&[ContractRecord]>,
        now: DateTime<Utc>,
    ) -> Result<CustomReport, CoreError> {
        let records: Vec<Arc<ContractRecord>> = match data {
            Some(records) => records.iter().cloned().map(Arc::new).collect(),
            None => self.snapshot(),
        };
        CustomReport::build(config, &records, now)
    }

    pub fn generate_contract_performance_report(
        &self,
        contract_id: &str,
    ) -> Result<ContractPerformanceReport, CoreError> {
        self.generate_contract_performance_report_at(contract_id, Utc::now())
    }

    pub fn generate_contract_performance_report_at(
        &self,
        contract_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ContractPerformanceReport, CoreError> {
        let records = self.records.read();
        let record = find_contract(&records, contract_id)?;
        let mut estimates = self.estimates.lock();

        Ok(ContractPerformanceReport::generate(
            record,
            &self.config.placeholders,
            &mut estimates,
            now,
        ))
    }
}

impl Default for ContractAnalyticsEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
