//! JWT issuance and verification.
//!
//! Access and refresh tokens are both HS256, signed with the same secret and
//! differing only in lifetime. Refresh tokens carry a random rotation id so
//! that every issued refresh token is unique even within the same second.

use super::{types::Role, utils::generate_rotation_id};
use anyhow::{anyhow, Context, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    /// Rotation id, present on refresh tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
}

pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime the refresh token was signed with, in seconds.
    pub refresh_ttl_seconds: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IssueOptions {
    pub remember_me: bool,
    /// Overrides the remember-me policy entirely; used on rotation to keep
    /// the replacement token on the original absolute expiry.
    pub refresh_ttl_override_seconds: Option<i64>,
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    refresh_remember_ttl_seconds: i64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(
        secret: &SecretString,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
        refresh_remember_ttl_seconds: i64,
    ) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            access_ttl_seconds,
            refresh_ttl_seconds,
            refresh_remember_ttl_seconds,
        }
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
        options: IssueOptions,
    ) -> Result<TokenPair> {
        let now = unix_now()?;

        let refresh_ttl_seconds = options.refresh_ttl_override_seconds.unwrap_or(
            if options.remember_me {
                self.refresh_remember_ttl_seconds
            } else {
                self.refresh_ttl_seconds
            },
        );

        let access = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            exp: now + self.access_ttl_seconds,
            rid: None,
        };

        let refresh = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            exp: now + refresh_ttl_seconds,
            rid: Some(generate_rotation_id()?),
        };

        let header = Header::default();
        let access_token =
            encode(&header, &access, &self.encoding).context("Failed to sign access token")?;
        let refresh_token =
            encode(&header, &refresh, &self.encoding).context("Failed to sign refresh token")?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            refresh_ttl_seconds,
        })
    }

    /// Verifies the signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .context("Token verification failed")?;
        Ok(data.claims)
    }
}

fn unix_now() -> Result<i64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|error| anyhow!("System clock before Unix epoch: {error}"))?;
    i64::try_from(now.as_secs()).context("Unix time out of range")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 24 * 3600;

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(&SecretString::from(secret.to_string()), 900, DAY, 7 * DAY)
    }

    #[test]
    fn issued_tokens_verify() -> Result<()> {
        let issuer = issuer("test-secret");
        let user_id = Uuid::new_v4();
        let pair = issuer.issue(
            user_id,
            "alice@example.com",
            Role::JobSeeker,
            IssueOptions::default(),
        )?;

        let access = issuer.verify(&pair.access_token)?;
        assert_eq!(access.sub, user_id.to_string());
        assert_eq!(access.email, "alice@example.com");
        assert_eq!(access.role, Role::JobSeeker);
        assert!(access.rid.is_none());

        let refresh = issuer.verify(&pair.refresh_token)?;
        assert!(refresh.rid.is_some());
        assert_eq!(pair.refresh_ttl_seconds, DAY);
        Ok(())
    }

    #[test]
    fn wrong_secret_fails_verification() -> Result<()> {
        let pair = issuer("test-secret").issue(
            Uuid::new_v4(),
            "alice@example.com",
            Role::JobSeeker,
            IssueOptions::default(),
        )?;
        assert!(issuer("other-secret").verify(&pair.access_token).is_err());
        Ok(())
    }

    #[test]
    fn remember_me_extends_refresh_ttl() -> Result<()> {
        let issuer = issuer("test-secret");
        let pair = issuer.issue(
            Uuid::new_v4(),
            "alice@example.com",
            Role::Employer,
            IssueOptions {
                remember_me: true,
                refresh_ttl_override_seconds: None,
            },
        )?;
        assert_eq!(pair.refresh_ttl_seconds, 7 * DAY);
        Ok(())
    }

    #[test]
    fn ttl_override_wins_over_remember_me() -> Result<()> {
        let issuer = issuer("test-secret");
        let pair = issuer.issue(
            Uuid::new_v4(),
            "alice@example.com",
            Role::Employer,
            IssueOptions {
                remember_me: true,
                refresh_ttl_override_seconds: Some(120),
            },
        )?;
        assert_eq!(pair.refresh_ttl_seconds, 120);
        Ok(())
    }

    #[test]
    fn expired_token_fails_verification() -> Result<()> {
        let issuer = issuer("test-secret");
        let pair = issuer.issue(
            Uuid::new_v4(),
            "alice@example.com",
            Role::JobSeeker,
            IssueOptions {
                remember_me: false,
                refresh_ttl_override_seconds: Some(-60),
            },
        )?;
        assert!(issuer.verify(&pair.refresh_token).is_err());
        Ok(())
    }

    #[test]
    fn rotation_ids_are_unique() -> Result<()> {
        let issuer = issuer("test-secret");
        let options = IssueOptions::default();
        let first = issuer.issue(Uuid::new_v4(), "a@example.com", Role::JobSeeker, options)?;
        let second = issuer.issue(Uuid::new_v4(), "a@example.com", Role::JobSeeker, options)?;
        assert_ne!(first.refresh_token, second.refresh_token);
        Ok(())
    }
}
