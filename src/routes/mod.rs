//! Route definitions for the scan orchestration API.

pub mod dashboard;
pub mod health;
pub mod patches;
pub mod report;
pub mod scans;
