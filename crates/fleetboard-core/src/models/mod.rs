//! Data models for fleetboard

pub mod contract;

pub use contract::{parse_timestamp, ContractId, ContractRecord, ContractStatus};
