//! # Hiredesk (Auth & Session Authority)
//!
//! `hiredesk` is the authentication and session-lifecycle service of the
//! hiredesk job board. It owns registration, email verification via one-time
//! passcodes, login, access/refresh token issuance, refresh-token rotation,
//! logout, and password reset. Job postings, applications, and the rest of
//! the board consume the principal this service attaches to each request.
//!
//! ## Session Model
//!
//! Access tokens are short-lived signed JWTs and are never persisted. Refresh
//! tokens are longer-lived JWTs whose SHA-256 digest is stored on the user
//! row together with an absolute expiry. Presenting a refresh token is only
//! accepted when the signature verifies *and* the digest matches the stored
//! one *and* the stored deadline has not passed; rotation replaces the digest
//! while keeping the original deadline, so a session can never outlive the
//! lifetime it was granted at login.
//!
//! ## OTP Lifecycle
//!
//! Passcodes are 6-digit numeric codes bound to a purpose (`verify_email` or
//! `reset_password`) and an expiry. Only the digest is stored. Issuing a new
//! code deletes prior codes of the same purpose; a code is deleted on
//! successful use or when an expired row is read. There is no background
//! sweep.
//!
//! ## Concurrency Policy
//!
//! The service holds no in-process locks. Concurrent registrations for the
//! same email race on the database unique index and the loser maps to
//! `409 Conflict`. Concurrent refresh rotations are last-write-wins on the
//! single stored digest: the loser's freshly returned token stops matching
//! and fails the next rotation with `403 Forbidden`.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
