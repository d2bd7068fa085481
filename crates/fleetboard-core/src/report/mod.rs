//! Filters and custom reports

pub mod builder;
pub mod filter;

pub use builder::{
    aggregate, group, Aggregates, ChartConfig, ChartType, CustomReport, CustomReportConfig,
    ExportFormat, ReportData, ReportGroup, ReportPeriod,
};
pub use filter::{apply_filters, compile_filters, CompiledFilter, FilterOperator, ReportFilter};
