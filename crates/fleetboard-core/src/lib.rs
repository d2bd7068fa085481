//! fleetboard-core - Core library for fleetboard
//!
//! Provides the contract model, snapshot loader, analytics engine, custom
//! report builder and exporters for vehicle rental contract data.

pub mod analytics;
pub mod config;
pub mod engine;
pub mod error;
pub mod estimates;
pub mod export;
pub mod loader;
pub mod models;
pub mod report;

pub use analytics::{ContractAnalytics, ContractPerformanceReport, PeriodRequest};
pub use config::AnalyticsConfig;
pub use engine::ContractAnalyticsEngine;
pub use error::{CoreError, LoadReport};
pub use estimates::{EstimateMode, Estimates};
pub use loader::ContractLoader;
pub use models::{ContractId, ContractRecord, ContractStatus};
pub use report::{CustomReport, CustomReportConfig, ReportFilter};
