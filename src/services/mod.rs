//! Business logic for the scan pipeline: validation, command building,
//! subprocess execution, normalization, aggregation, and persistence.

pub mod aggregator;
pub mod dashboard;
pub mod executor;
pub mod insights;
pub mod orchestrator;
pub mod patches;
pub mod registry;
pub mod report;
pub mod store;
pub mod validator;
