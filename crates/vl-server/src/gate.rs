//! Admission control for the streaming endpoint.
//!
//! Two independent gates, both rejecting rather than queueing:
//!
//! - a process-wide ceiling on concurrent streams (a [`Semaphore`]), and
//! - a per-client-IP request budget over fixed windows.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use vl_core::config::DeliveryConfig;
use vl_core::{Error, Result};

/// Holds one concurrency slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct DeliveryPermit {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    opened: Instant,
    count: u32,
}

/// At most `max` requests per client inside each `window`. A client's
/// window opens with its first request and its count resets once the
/// window has fully elapsed.
#[derive(Debug)]
struct WindowCounter {
    max: u32,
    window: Duration,
    clients: DashMap<IpAddr, ClientWindow>,
}

impl WindowCounter {
    fn check(&self, ip: IpAddr, now: Instant) -> Result<()> {
        let retry_after = {
            let mut slot = self.clients.entry(ip).or_insert(ClientWindow {
                opened: now,
                count: 0,
            });
            if now.saturating_duration_since(slot.opened) >= self.window {
                *slot = ClientWindow {
                    opened: now,
                    count: 0,
                };
            }
            if slot.count < self.max {
                slot.count += 1;
                return Ok(());
            }
            self.window
                .saturating_sub(now.saturating_duration_since(slot.opened))
        };

        let retry_after_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
        tracing::info!(client = %ip, retry_after_secs, "stream rate limit exceeded");
        Err(Error::RateLimitExceeded {
            retry_after_secs: retry_after_secs.max(1),
        })
    }

    fn forget_expired(&self, now: Instant) {
        self.clients
            .retain(|_, w| now.saturating_duration_since(w.opened) < self.window);
    }
}

/// Concurrency and rate gate for streaming requests.
#[derive(Debug)]
pub struct DeliveryGate {
    slots: Arc<Semaphore>,
    max_concurrent: usize,
    limiter: Option<WindowCounter>,
}

impl DeliveryGate {
    /// `rate_limit_max = 0` disables the per-client budget.
    pub fn new(config: &DeliveryConfig) -> Self {
        let limiter = (config.rate_limit_max > 0).then(|| WindowCounter {
            max: config.rate_limit_max,
            window: Duration::from_secs(config.rate_limit_window_secs.max(1)),
            clients: DashMap::new(),
        });

        Self {
            slots: Arc::new(Semaphore::new(config.max_concurrent)),
            max_concurrent: config.max_concurrent,
            limiter,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Streams currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent
            .saturating_sub(self.slots.available_permits())
    }

    pub fn rate_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Count one request from `ip` against its current window.
    pub fn check_rate(&self, ip: IpAddr) -> Result<()> {
        self.check_rate_at(ip, Instant::now())
    }

    /// [`Self::check_rate`] with an explicit clock reading.
    pub fn check_rate_at(&self, ip: IpAddr, now: Instant) -> Result<()> {
        match &self.limiter {
            Some(limiter) => limiter.check(ip, now),
            None => Ok(()),
        }
    }

    /// Take a concurrency slot without waiting.
    pub fn try_acquire(&self) -> Result<DeliveryPermit> {
        match self.slots.clone().try_acquire_owned() {
            Ok(permit) => Ok(DeliveryPermit { _permit: permit }),
            Err(_) => {
                tracing::warn!(limit = self.max_concurrent, "concurrent stream ceiling reached");
                Err(Error::TooManyConcurrentRequests {
                    limit: self.max_concurrent,
                })
            }
        }
    }

    /// Rate check, then concurrency check.
    pub fn admit(&self, ip: IpAddr) -> Result<DeliveryPermit> {
        self.check_rate(ip)?;
        self.try_acquire()
    }

    /// Forget clients whose window has elapsed.
    pub fn housekeeping(&self) {
        self.housekeeping_at(Instant::now());
    }

    pub fn housekeeping_at(&self, now: Instant) {
        if let Some(limiter) = &self.limiter {
            limiter.forget_expired(now);
        }
    }

    /// Clients with an open rate window.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.as_ref().map_or(0, |l| l.clients.len())
    }
}

/// Periodically run [`DeliveryGate::housekeeping`] until `cancel` fires.
pub fn start_housekeeping_task(
    gate: Arc<DeliveryGate>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => gate.housekeeping(),
            }
        }
    })
}
