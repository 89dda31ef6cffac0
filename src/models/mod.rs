//! Data models shared across services and routes.

pub mod patch;
pub mod scan;
