//! Per-IP and per-email rate limiting for the auth endpoints.
//!
//! Credential endpoints get a strict budget, authenticated reads a looser
//! one. The default limiter keeps fixed one-minute windows in memory; a
//! multi-node deployment would swap in a shared store behind the same trait.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::warn;

/// Endpoints that are subject to rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    Register,
    VerifyEmail,
    Login,
    Refresh,
    ForgotPassword,
    VerifyOtp,
    ResendOtp,
    ResetPassword,
    Me,
}

impl RateLimitAction {
    const fn name(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::VerifyEmail => "verify_email",
            Self::Login => "login",
            Self::Refresh => "refresh",
            Self::ForgotPassword => "forgot_password",
            Self::VerifyOtp => "verify_otp",
            Self::ResendOtp => "resend_otp",
            Self::ResetPassword => "reset_password",
            Self::Me => "me",
        }
    }

    /// Maximum requests allowed per window.
    const fn budget(self) -> u32 {
        match self {
            Self::Me => 60,
            _ => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
    fn check_email(&self, email: &str, action: RateLimitAction) -> RateLimitDecision;
}

/// Limiter that always allows, for tests and for deployments that rate
/// limit upstream.
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }

    fn check_email(&self, _email: &str, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

const WINDOW: Duration = Duration::from_secs(60);

// Prune dead windows once the map grows past this.
const PRUNE_THRESHOLD: usize = 4096;

struct Window {
    started: Instant,
    count: u32,
}

/// In-memory fixed-window limiter keyed by action and subject.
pub struct FixedWindowRateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowRateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn check(&self, subject: &str, action: RateLimitAction) -> RateLimitDecision {
        let key = format!("{}:{subject}", action.name());
        let now = Instant::now();

        let Ok(mut windows) = self.windows.lock() else {
            // A poisoned lock means a panic elsewhere; fail open.
            return RateLimitDecision::Allowed;
        };

        if windows.len() > PRUNE_THRESHOLD {
            windows.retain(|_, window| now.duration_since(window.started) < WINDOW);
        }

        let window = windows.entry(key).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= WINDOW {
            window.started = now;
            window.count = 0;
        }

        window.count += 1;

        if window.count > action.budget() {
            warn!(action = action.name(), subject, "rate limit exceeded");
            RateLimitDecision::Limited
        } else {
            RateLimitDecision::Allowed
        }
    }
}

impl Default for FixedWindowRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        // Without a client address there is nothing to key on.
        match ip {
            Some(ip) => self.check(ip, action),
            None => RateLimitDecision::Allowed,
        }
    }

    fn check_email(&self, email: &str, action: RateLimitAction) -> RateLimitDecision {
        self.check(email, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_within_budget() {
        let limiter = FixedWindowRateLimiter::new();
        for _ in 0..10 {
            assert_eq!(
                limiter.check_email("alice@example.com", RateLimitAction::Login),
                RateLimitDecision::Allowed
            );
        }
    }

    #[test]
    fn limits_beyond_budget() {
        let limiter = FixedWindowRateLimiter::new();
        for _ in 0..10 {
            limiter.check_email("alice@example.com", RateLimitAction::Login);
        }
        assert_eq!(
            limiter.check_email("alice@example.com", RateLimitAction::Login),
            RateLimitDecision::Limited
        );
    }

    #[test]
    fn subjects_are_independent() {
        let limiter = FixedWindowRateLimiter::new();
        for _ in 0..11 {
            limiter.check_email("alice@example.com", RateLimitAction::Login);
        }
        assert_eq!(
            limiter.check_email("bob@example.com", RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn actions_are_independent() {
        let limiter = FixedWindowRateLimiter::new();
        for _ in 0..11 {
            limiter.check_email("alice@example.com", RateLimitAction::Login);
        }
        assert_eq!(
            limiter.check_email("alice@example.com", RateLimitAction::ForgotPassword),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn missing_ip_is_allowed() {
        let limiter = FixedWindowRateLimiter::new();
        for _ in 0..20 {
            assert_eq!(
                limiter.check_ip(None, RateLimitAction::Login),
                RateLimitDecision::Allowed
            );
        }
    }

    #[test]
    fn noop_always_allows() {
        let limiter = NoopRateLimiter;
        for _ in 0..100 {
            assert_eq!(
                limiter.check_email("alice@example.com", RateLimitAction::Register),
                RateLimitDecision::Allowed
            );
        }
    }
}
