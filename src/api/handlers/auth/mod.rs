//! Auth handlers and supporting modules.
//!
//! This module coordinates account registration, email verification through
//! one-time codes, password login, refresh-token rotation, and password
//! recovery.
//!
//! ## Session Model
//!
//! A login issues a short-lived bearer access token plus a refresh token
//! scoped to the rotation endpoint by an `HttpOnly` cookie. Only a SHA-256
//! digest of the active refresh token is stored, one per account, so a login
//! or rotation invalidates whatever token was stored before it.
//!
//! ## One-Time Codes
//!
//! Codes are six digits, hashed at rest, and namespaced by purpose
//! (`verify_email` vs `reset_password`). At most one code per purpose is
//! live; issuing a new one drops its predecessor.

pub(crate) mod login;
pub(crate) mod me;
pub(crate) mod password;
pub(crate) mod principal;
mod rate_limit;
pub(crate) mod session;
pub(crate) mod signup;
mod state;
mod storage;
mod tokens;
pub(crate) mod types;
mod utils;
pub(crate) mod verification;


pub use rate_limit::{FixedWindowRateLimiter, NoopRateLimiter, RateLimiter};
pub use state::{AuthConfig, AuthState};
