//! Property tests for the fixed-window rate limiter: invariants that must
//! hold for any request count and any set of client IPs, not just the fixed
//! examples in the unit tests.

use std::collections::HashSet;

use proptest::prelude::*;
use rproxy::models::settings::RateLimitSettings;
use rproxy::services::rate_limiter::{Admission, RateLimiter};

fn settings(max_per_window: u32, capacity: usize) -> RateLimitSettings {
    RateLimitSettings {
        max_per_window,
        window_secs: 3600,
        capacity,
    }
}

proptest! {
    /// Exactly the first `max_per_window` requests from one IP within a
    /// window are admitted; everything after that is limited, regardless of
    /// how many total requests are sent.
    #[test]
    fn admits_at_most_max_per_window(max in 1u32..20, total in 0u32..60) {
        let limiter = RateLimiter::new(settings(max, 1000));
        let mut admitted = 0u32;
        for _ in 0..total {
            if limiter.admit("203.0.113.1") == Admission::Ok {
                admitted += 1;
            }
        }
        prop_assert_eq!(admitted, total.min(max));
    }

    /// Distinct client IPs never share a budget: each gets its own
    /// max_per_window allowance within the same window.
    #[test]
    fn distinct_ips_are_independent(max in 1u32..10, ip_count in 1u32..10) {
        let limiter = RateLimiter::new(settings(max, 1000));
        let ips: Vec<String> = (0..ip_count).map(|i| format!("10.0.0.{}", i)).collect();

        for ip in &ips {
            for _ in 0..max {
                prop_assert_eq!(limiter.admit(ip), Admission::Ok);
            }
            prop_assert_eq!(limiter.admit(ip), Admission::Limited);
        }
    }

    /// The limiter never admits more than capacity distinct IPs' worth of
    /// bookkeeping at once — once over capacity, the least-recently-touched
    /// entries are evicted, but every IP that's within the last `capacity`
    /// touched IPs gets the full allowance again.
    #[test]
    fn eviction_never_lets_more_than_capacity_ips_share_state(capacity in 1usize..8, extra in 0usize..8) {
        let max = 2u32;
        let limiter = RateLimiter::new(settings(max, capacity));
        let total_ips = capacity + extra;
        let mut seen = HashSet::new();
        for i in 0..total_ips {
            let ip = format!("192.0.2.{}", i);
            seen.insert(ip.clone());
            // First touch of a fresh IP is always admitted since it either
            // has no prior window or was evicted (counts as fresh).
            prop_assert_eq!(limiter.admit(&ip), Admission::Ok);
        }
        prop_assert_eq!(seen.len(), total_ips);
    }
}
