use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;

use crate::metrics::RATE_LIMIT_ENTRIES;

// Rate limit entry - tracks requests per IP/device
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    Ip,
    Device,
}

impl LimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitScope::Ip => "ip",
            LimitScope::Device => "device",
        }
    }
}

/// Fixed-window counter keyed by an arbitrary string.
///
/// The first request from a key opens a window. Every request inside the
/// window counts, rejected ones included, and the key is blocked once the
/// count passes `max_requests`. The window is reset by the first request
/// arriving after it has expired.
pub struct FixedWindowLimiter {
    scope: LimitScope,
    max_requests: u32,
    window: Duration,
    entries: DashMap<String, RateLimitEntry>,
}

impl FixedWindowLimiter {
    pub fn new(scope: LimitScope, max_requests: u32, window: Duration) -> Self {
        Self {
            scope,
            max_requests,
            window,
            entries: DashMap::new(),
        }
    }

    pub fn scope(&self) -> LimitScope {
        self.scope
    }

    // true = allowed
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        // the entry guard holds the shard lock, so the read-modify-write is atomic per key
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                window_start: now,
            });

        // new key or window expired..? Start a fresh one
        if entry.count == 0 || now.saturating_duration_since(entry.window_start) >= self.window {
            entry.count = 1;
            entry.window_start = now;
            return true;
        }

        entry.count = entry.count.saturating_add(1);
        entry.count <= self.max_requests
    }

    /// Drops entries whose window has expired, returns how many were removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        let window = self.window;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.window_start) < window);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// Both limiters in front of /send-location
pub struct RateLimiters {
    pub ip: FixedWindowLimiter,
    pub device: FixedWindowLimiter,
}

impl RateLimiters {
    pub fn new(ip_limit: u32, device_limit: u32, window: Duration) -> Self {
        Self {
            ip: FixedWindowLimiter::new(LimitScope::Ip, ip_limit, window),
            device: FixedWindowLimiter::new(LimitScope::Device, device_limit, window),
        }
    }

    pub fn tracked_entries(&self) -> usize {
        self.ip.len() + self.device.len()
    }
}

// Sweeper - drops expired windows so the maps don't grow forever
pub async fn sweeper(limiters: Arc<RateLimiters>, every: Duration) {
    let mut interval = interval(every);

    tracing::info!(interval = ?every, "Rate limit sweeper started");

    loop {
        interval.tick().await;

        let now = Instant::now();
        let removed = limiters.ip.sweep_at(now) + limiters.device.sweep_at(now);
        let remaining = limiters.tracked_entries();
        RATE_LIMIT_ENTRIES.set(remaining as f64);

        if removed > 0 {
            tracing::debug!(removed, remaining, "Swept expired rate limit entries");
        }
    }
}
