//! Per-client token-bucket rate limiting with idle eviction.
//!
//! # Design Decisions
//! - Refill is continuous, computed from elapsed time, not stepped
//! - Buckets live in a sharded map; token math for one client never
//!   takes a lock covering other clients
//! - Idle buckets are swept out after a TTL so one-off clients do not
//!   grow the table forever

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// A simple token bucket.
#[derive(Debug)]
struct ClientBucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl ClientBucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
            last_seen: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;
        self.last_seen = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Admission control for the HTTP front end: one bucket per client
/// identity, dropped again after `ttl` of inactivity.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, ClientBucket>,
    rate: f64,
    burst: f64,
    ttl: Duration,
}

impl RateLimiter {
    pub fn new(rate: f64, burst: u32, ttl: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            rate,
            burst: f64::from(burst),
            ttl,
        }
    }

    /// Admit or reject one request from `client`. Non-blocking; a denied
    /// request is rejected immediately rather than queued.
    pub fn allow(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut bucket = self
            .buckets
            .entry(client.to_string())
            .or_insert_with(|| ClientBucket::full(self.burst, now));
        bucket.try_acquire(self.burst, self.rate, now)
    }

    /// Drop buckets idle for longer than the TTL.
    pub fn sweep(&self) {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_seen) < self.ttl);
        let evicted = before - self.buckets.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.buckets.len(), "idle rate buckets evicted");
        }
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
