//! Admission control for scan requests: a keyed token bucket per client
//! IP, checked before any subprocess is spawned.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;

use crate::config::AppConfig;
use crate::errors::AppError;

pub type ScanRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// Build the per-client limiter from the configured window and ceiling
/// (default: 100 requests per 15 minutes).
pub fn build(config: &AppConfig) -> Arc<ScanRateLimiter> {
    let max = NonZeroU32::new(config.rate_limit_max_requests).unwrap_or(nonzero!(100u32));
    let window = Duration::from_secs(config.rate_limit_window_secs.max(1));
    let replenish = window / max.get();

    let quota = Quota::with_period(replenish)
        .unwrap_or_else(|| Quota::per_minute(nonzero!(7u32)))
        .allow_burst(max);

    Arc::new(RateLimiter::keyed(quota))
}

/// Admit or reject one scan request from `client`.
pub fn check(limiter: &ScanRateLimiter, client: IpAddr) -> Result<(), AppError> {
    limiter.check_key(&client).map_err(|_| AppError::RateLimited)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: u32, window_secs: u64) -> AppConfig {
        AppConfig {
            database_url: None,
            database_max_connections: 10,
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:5173".into(),
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".into(),
            tool_timeout_secs: 600,
            max_tool_output_bytes: 10 * 1024 * 1024,
            rate_limit_window_secs: window_secs,
            rate_limit_max_requests: max,
        }
    }

    #[test]
    fn rejects_after_the_burst_is_spent() {
        let limiter = build(&config(3, 900));
        let client: IpAddr = "203.0.113.9".parse().unwrap();

        for _ in 0..3 {
            assert!(check(&limiter, client).is_ok());
        }
        assert!(matches!(
            check(&limiter, client),
            Err(AppError::RateLimited)
        ));
    }

    #[test]
    fn clients_are_limited_independently() {
        let limiter = build(&config(1, 900));
        let first: IpAddr = "203.0.113.9".parse().unwrap();
        let second: IpAddr = "203.0.113.10".parse().unwrap();

        assert!(check(&limiter, first).is_ok());
        assert!(check(&limiter, first).is_err());
        assert!(check(&limiter, second).is_ok());
    }
}
