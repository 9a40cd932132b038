//! Shared auth configuration and handler state.

use super::{rate_limit::RateLimiter, tokens::TokenIssuer};
use crate::api::email::Mailer;
use secrecy::SecretString;
use std::sync::Arc;

const DEFAULT_ACCESS_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 24 * 3600;
const DEFAULT_REFRESH_REMEMBER_TTL_SECONDS: i64 = 7 * 24 * 3600;
const DEFAULT_OTP_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_RESET_PROOF_TTL_SECONDS: i64 = 10 * 60;

/// Tuning knobs for the auth flows. Construct with [`AuthConfig::new`] and
/// adjust with the `with_*` builders.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    frontend_base_url: String,
    jwt_secret: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    refresh_remember_ttl_seconds: i64,
    otp_ttl_seconds: i64,
    reset_proof_ttl_seconds: i64,
    resend_requires_unverified: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String, jwt_secret: SecretString) -> Self {
        Self {
            frontend_base_url,
            jwt_secret,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            refresh_remember_ttl_seconds: DEFAULT_REFRESH_REMEMBER_TTL_SECONDS,
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            reset_proof_ttl_seconds: DEFAULT_RESET_PROOF_TTL_SECONDS,
            resend_requires_unverified: false,
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_remember_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_remember_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_proof_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_proof_ttl_seconds = seconds;
        self
    }

    /// When set, resending a verification code to an already verified
    /// account is rejected instead of silently re-issuing one.
    #[must_use]
    pub fn with_resend_requires_unverified(mut self, value: bool) -> Self {
        self.resend_requires_unverified = value;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub const fn jwt_secret(&self) -> &SecretString {
        &self.jwt_secret
    }

    #[must_use]
    pub const fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub const fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    #[must_use]
    pub const fn refresh_remember_ttl_seconds(&self) -> i64 {
        self.refresh_remember_ttl_seconds
    }

    #[must_use]
    pub const fn otp_ttl_seconds(&self) -> i64 {
        self.otp_ttl_seconds
    }

    #[must_use]
    pub const fn reset_proof_ttl_seconds(&self) -> i64 {
        self.reset_proof_ttl_seconds
    }

    #[must_use]
    pub const fn resend_requires_unverified(&self) -> bool {
        self.resend_requires_unverified
    }

    /// Refresh cookies are marked Secure when the frontend is served over
    /// https, which is also what permits `SameSite=None`.
    #[must_use]
    pub fn refresh_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Per-process state shared by every auth handler.
pub struct AuthState {
    config: AuthConfig,
    tokens: TokenIssuer,
    rate_limiter: Arc<dyn RateLimiter>,
    mailer: Arc<dyn Mailer>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        rate_limiter: Arc<dyn RateLimiter>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let tokens = TokenIssuer::new(
            config.jwt_secret(),
            config.access_ttl_seconds(),
            config.refresh_ttl_seconds(),
            config.refresh_remember_ttl_seconds(),
        );
        Self {
            config,
            tokens,
            rate_limiter,
            mailer,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }

    #[must_use]
    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }
}
