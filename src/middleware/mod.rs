//! Cross-cutting request concerns.

pub mod rate_limit;
