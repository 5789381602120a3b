//! In-memory request rate limiting
//!
//! Each rule allows at most `max_requests` per key in any sliding `window`.
//! A governor keyed limiter is the admission gate; a per-key log of admitted
//! request times holds the sliding bound, since GCRA alone refills one slot
//! every `window / max_requests`. Idle keys are dropped by `retain_recent`.

use crate::config::RateLimitConfig;
use crate::{Error, Result};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota};
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroU32;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default window for every rule
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Operations subject to rate limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitRule {
    /// Per submitting user
    CreateTicket,
    /// Shared by all callers
    CreateAsset,
    /// Shared by all callers
    CreateUser,
    /// Per email address
    Login,
}

impl RateLimitRule {
    pub const ALL: [RateLimitRule; 4] = [
        RateLimitRule::CreateTicket,
        RateLimitRule::CreateAsset,
        RateLimitRule::CreateUser,
        RateLimitRule::Login,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RateLimitRule::CreateTicket => "create-ticket",
            RateLimitRule::CreateAsset => "create-asset",
            RateLimitRule::CreateUser => "create-user",
            RateLimitRule::Login => "login",
        }
    }

    /// Global rules ignore the caller key
    pub fn is_global(&self) -> bool {
        matches!(self, RateLimitRule::CreateAsset | RateLimitRule::CreateUser)
    }

    fn limit(&self, config: &RateLimitConfig) -> u32 {
        match self {
            RateLimitRule::CreateTicket => config.create_ticket_per_minute,
            RateLimitRule::CreateAsset => config.create_asset_per_minute,
            RateLimitRule::CreateUser => config.create_user_per_minute,
            RateLimitRule::Login => config.login_per_minute,
        }
    }
}

fn quota(max_requests: u32, window: Duration) -> Quota {
    let burst = NonZeroU32::new(max_requests.max(1)).unwrap_or(NonZeroU32::MIN);
    Quota::with_period(window / burst.get())
        .unwrap_or_else(|| Quota::per_minute(burst))
        .allow_burst(burst)
}

/// Admission gate plus sliding log for one rule
struct RuleLimiter {
    gate: DefaultKeyedRateLimiter<String>,
    max_requests: usize,
    window: Duration,
    admitted: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RuleLimiter {
    fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            gate: DefaultKeyedRateLimiter::keyed(quota(max_requests, window)),
            max_requests: max_requests.max(1) as usize,
            window,
            admitted: Mutex::new(HashMap::new()),
        }
    }

    /// Wait until the oldest admission in the window expires, or `None` to admit
    fn sliding_wait(&self, log: &mut VecDeque<Instant>, now: Instant) -> Option<Duration> {
        while log
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            log.pop_front();
        }
        if log.len() < self.max_requests {
            return None;
        }
        log.front()
            .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
    }
}

fn whole_seconds(wait: Duration) -> u64 {
    (wait.as_secs() + u64::from(wait.subsec_nanos() > 0)).max(1)
}

/// Keyed limiters for every rule
pub struct RateLimiter {
    limiters: HashMap<RateLimitRule, RuleLimiter>,
    clock: DefaultClock,
}

impl RateLimiter {
    /// Limiters for every rule, quotas taken from configuration
    pub fn new(config: &RateLimitConfig) -> Self {
        let mut limiter = Self {
            limiters: HashMap::new(),
            clock: DefaultClock::default(),
        };
        for rule in RateLimitRule::ALL {
            limiter.set_quota(rule, rule.limit(config), DEFAULT_WINDOW);
        }
        limiter
    }

    /// Replace one rule's quota
    pub fn with_quota(mut self, rule: RateLimitRule, max_requests: u32, window: Duration) -> Self {
        self.set_quota(rule, max_requests, window);
        self
    }

    fn set_quota(&mut self, rule: RateLimitRule, max_requests: u32, window: Duration) {
        debug!(
            "Rate limit {}: {} requests per {:?}",
            rule.name(),
            max_requests,
            window
        );
        self.limiters
            .insert(rule, RuleLimiter::new(max_requests, window));
    }

    /// Record one request for `key`, failing with a retry hint when over quota
    pub fn check(&self, rule: RateLimitRule, key: &str) -> Result<()> {
        let Some(limiter) = self.limiters.get(&rule) else {
            return Ok(());
        };

        let key = if rule.is_global() {
            rule.name().to_string()
        } else {
            format!("{}-{}", rule.name(), key)
        };

        let mut admitted = limiter
            .admitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let log = admitted.entry(key.clone()).or_default();
        let now = Instant::now();

        let wait = match limiter.sliding_wait(log, now) {
            Some(wait) => Some(wait),
            None => limiter
                .gate
                .check_key(&key)
                .err()
                .map(|not_until| not_until.wait_time_from(self.clock.now())),
        };

        match wait {
            None => {
                log.push_back(now);
                Ok(())
            }
            Some(wait) => {
                let retry_after_secs = whole_seconds(wait);
                warn!("Rate limit exceeded for {} (retry in {}s)", key, retry_after_secs);
                Err(Error::RateLimited { retry_after_secs })
            }
        }
    }

    /// Drop keys with no admissions left in their window
    pub fn retain_recent(&self) {
        let now = Instant::now();
        for limiter in self.limiters.values() {
            limiter.gate.retain_recent();
            limiter.gate.shrink_to_fit();
            let mut admitted = limiter
                .admitted
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            admitted.retain(|_, log| {
                log.back()
                    .is_some_and(|t| now.duration_since(*t) < limiter.window)
            });
        }
    }

    /// Number of keys currently tracked across all rules
    pub fn tracked_keys(&self) -> usize {
        self.limiters
            .values()
            .map(|l| {
                l.admitted
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .len()
            })
            .sum()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimitConfig::default())
    }
}
