//! Database helpers for accounts, one-time codes, and refresh-token state.
//!
//! All expiry math happens on the database clock so that a fleet of app
//! servers never disagrees about what has expired.

use anyhow::{anyhow, Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::{OtpPurpose, Role};

/// Outcome when attempting to create a new account.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created,
    Conflict,
}

/// Fields needed to check a password login.
pub(super) struct LoginRecord {
    pub(super) user_id: Uuid,
    pub(super) email: String,
    pub(super) role: Role,
    pub(super) email_verified: bool,
    pub(super) password_hash: String,
}

/// Identity fields without any credential material.
pub(crate) struct UserSummary {
    pub(crate) user_id: Uuid,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) role: Role,
    pub(crate) email_verified: bool,
}

/// Full sanitized profile returned to authenticated callers.
pub(crate) struct ProfileRecord {
    pub(crate) user_id: Uuid,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) role: Role,
    pub(crate) email_verified: bool,
    pub(crate) avatar_url: Option<String>,
    pub(crate) resume_url: Option<String>,
    pub(crate) company_name: Option<String>,
    pub(crate) company_description: Option<String>,
    pub(crate) company_logo_url: Option<String>,
}

impl ProfileRecord {
    pub(crate) fn into_profile(self) -> super::types::UserProfile {
        super::types::UserProfile {
            id: self.user_id.to_string(),
            name: self.name,
            email: self.email,
            role: self.role,
            email_verified: self.email_verified,
            avatar_url: self.avatar_url,
            resume_url: self.resume_url,
            company_name: self.company_name,
            company_description: self.company_description,
            company_logo_url: self.company_logo_url,
        }
    }
}

/// A stored one-time code. `expired` is computed against the database
/// clock at read time.
pub(super) struct OtpRecord {
    pub(super) otp_id: Uuid,
    pub(super) code_hash: Vec<u8>,
    pub(super) expired: bool,
}

/// Stored refresh-token state for one account.
pub(super) struct RefreshTokenState {
    pub(super) token_hash: Option<Vec<u8>>,
    /// Seconds until the stored token expires, clamped at zero.
    pub(super) remaining_seconds: i64,
}

fn parse_role(value: &str) -> Result<Role> {
    Role::parse(value).ok_or_else(|| anyhow!("Unknown role in users table: {value}"))
}

/// Creates the account and its first verification code in one transaction.
pub(super) async fn insert_user_and_otp(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
    code_hash: &[u8],
    otp_ttl_seconds: i64,
) -> Result<SignupOutcome> {
    let mut tx = pool.begin().await.context("begin signup transaction")?;

    let query = r"
        INSERT INTO users
            (name, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&mut *tx)
        .instrument(span)
        .await;

    let user_id: Uuid = match row {
        Ok(row) => row.get("id"),
        Err(err) => {
            if super::utils::is_unique_violation(&err) {
                let _ = tx.rollback().await;
                return Ok(SignupOutcome::Conflict);
            }
            return Err(err).context("failed to insert user");
        }
    };

    insert_otp_tx(
        &mut tx,
        user_id,
        OtpPurpose::VerifyEmail,
        code_hash,
        otp_ttl_seconds,
    )
    .await?;

    tx.commit().await.context("commit signup transaction")?;

    Ok(SignupOutcome::Created)
}

async fn insert_otp_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    purpose: OtpPurpose,
    code_hash: &[u8],
    ttl_seconds: i64,
) -> Result<()> {
    let query = r"
        INSERT INTO otps
            (user_id, purpose, code_hash, expires_at)
        VALUES ($1, $2, $3, NOW() + make_interval(secs => $4::double precision))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(purpose.as_str())
        .bind(code_hash)
        .bind(ttl_seconds)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert otp")?;
    Ok(())
}

/// Drops any outstanding code for the purpose and stores the new one, so at
/// most one code per (user, purpose) is live.
pub(super) async fn replace_otp(
    pool: &PgPool,
    user_id: Uuid,
    purpose: OtpPurpose,
    code_hash: &[u8],
    ttl_seconds: i64,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin otp transaction")?;

    let query = "DELETE FROM otps WHERE user_id = $1 AND purpose = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(purpose.as_str())
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to delete prior otps")?;

    insert_otp_tx(&mut tx, user_id, purpose, code_hash, ttl_seconds).await?;

    tx.commit().await.context("commit otp transaction")?;
    Ok(())
}

pub(super) async fn find_otp(
    pool: &PgPool,
    user_id: Uuid,
    purpose: OtpPurpose,
) -> Result<Option<OtpRecord>> {
    let query = r"
        SELECT id, code_hash, (expires_at <= NOW()) AS expired
        FROM otps
        WHERE user_id = $1 AND purpose = $2
        ORDER BY created_at DESC
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(purpose.as_str())
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup otp")?;

    Ok(row.map(|row| OtpRecord {
        otp_id: row.get("id"),
        code_hash: row.get("code_hash"),
        expired: row.get("expired"),
    }))
}

pub(super) async fn delete_otp(pool: &PgPool, otp_id: Uuid) -> Result<()> {
    let query = "DELETE FROM otps WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(otp_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete otp")?;
    Ok(())
}

pub(super) async fn lookup_login_record(
    pool: &PgPool,
    email: &str,
) -> Result<Option<LoginRecord>> {
    let query = r"
        SELECT id, email, role, email_verified, password_hash
        FROM users
        WHERE email = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup login record")?;

    row.map(|row| {
        Ok(LoginRecord {
            user_id: row.get("id"),
            email: row.get("email"),
            role: parse_role(row.get("role"))?,
            email_verified: row.get("email_verified"),
            password_hash: row.get("password_hash"),
        })
    })
    .transpose()
}

pub(super) async fn lookup_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserSummary>> {
    let query = r"
        SELECT id, name, email, role, email_verified
        FROM users
        WHERE email = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    row.map(user_summary_from_row).transpose()
}

pub(crate) async fn lookup_user_by_id(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<UserSummary>> {
    let query = r"
        SELECT id, name, email, role, email_verified
        FROM users
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    row.map(user_summary_from_row).transpose()
}

fn user_summary_from_row(row: sqlx::postgres::PgRow) -> Result<UserSummary> {
    Ok(UserSummary {
        user_id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: parse_role(row.get("role"))?,
        email_verified: row.get("email_verified"),
    })
}

pub(crate) async fn lookup_profile(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<ProfileRecord>> {
    let query = r"
        SELECT id, name, email, role, email_verified,
               avatar_url, resume_url,
               company_name, company_description, company_logo_url
        FROM users
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup profile")?;

    row.map(|row| {
        Ok(ProfileRecord {
            user_id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            role: parse_role(row.get("role"))?,
            email_verified: row.get("email_verified"),
            avatar_url: row.get("avatar_url"),
            resume_url: row.get("resume_url"),
            company_name: row.get("company_name"),
            company_description: row.get("company_description"),
            company_logo_url: row.get("company_logo_url"),
        })
    })
    .transpose()
}

pub(super) async fn mark_email_verified(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = r"
        UPDATE users
        SET email_verified = TRUE, updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to mark email verified")?;
    Ok(())
}

/// Stores the digest of a freshly issued refresh token along with its
/// absolute expiry.
pub(super) async fn store_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &[u8],
    ttl_seconds: i64,
) -> Result<()> {
    let query = r"
        UPDATE users
        SET refresh_token_hash = $2,
            refresh_token_expires_at = NOW() + make_interval(secs => $3::double precision),
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(token_hash)
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store refresh token")?;
    Ok(())
}

/// Swaps in a rotated token digest without touching the stored expiry, so
/// rotation never extends the session window.
pub(super) async fn store_rotated_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &[u8],
) -> Result<()> {
    let query = r"
        UPDATE users
        SET refresh_token_hash = $2, updated_at = NOW()
        WHERE id = $1 AND refresh_token_expires_at IS NOT NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store rotated refresh token")?;
    Ok(())
}

/// Clears the stored refresh state. A no-op when nothing is stored, which
/// keeps logout idempotent.
pub(super) async fn clear_refresh_token(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = r"
        UPDATE users
        SET refresh_token_hash = NULL,
            refresh_token_expires_at = NULL,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to clear refresh token")?;
    Ok(())
}

pub(super) async fn refresh_token_state(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<RefreshTokenState>> {
    let query = r"
        SELECT refresh_token_hash,
               COALESCE(
                   GREATEST(EXTRACT(EPOCH FROM (refresh_token_expires_at - NOW())), 0),
                   0
               )::BIGINT AS remaining_seconds
        FROM users
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup refresh token state")?;

    Ok(row.map(|row| RefreshTokenState {
        token_hash: row.get("refresh_token_hash"),
        remaining_seconds: row.get("remaining_seconds"),
    }))
}

/// Records that a reset code was validated, authorizing one password reset
/// within the proof window.
pub(super) async fn upsert_reset_proof(
    pool: &PgPool,
    user_id: Uuid,
    ttl_seconds: i64,
) -> Result<()> {
    let query = r"
        INSERT INTO password_reset_proofs (user_id, expires_at)
        VALUES ($1, NOW() + make_interval(secs => $2::double precision))
        ON CONFLICT (user_id) DO UPDATE SET expires_at = EXCLUDED.expires_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to upsert reset proof")?;
    Ok(())
}

/// Removes the proof row and reports whether it was still valid. Expired
/// proofs are consumed but do not authorize a reset.
pub(super) async fn consume_reset_proof(pool: &PgPool, user_id: Uuid) -> Result<bool> {
    let query = r"
        DELETE FROM password_reset_proofs
        WHERE user_id = $1
        RETURNING (expires_at > NOW()) AS valid
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume reset proof")?;

    Ok(row.is_some_and(|row| row.get("valid")))
}

/// Applies a password reset: new hash, revoked refresh state, and every
/// outstanding code for the account dropped, all in one transaction.
pub(super) async fn apply_password_reset(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin password reset transaction")?;

    let query = r"
        UPDATE users
        SET password_hash = $2,
            refresh_token_hash = NULL,
            refresh_token_expires_at = NULL,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update password")?;

    let query = "DELETE FROM otps WHERE user_id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to delete otps")?;

    tx.commit().await.context("commit password reset transaction")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{LoginRecord, OtpRecord, RefreshTokenState, SignupOutcome};
    use crate::api::handlers::auth::types::Role;
    use uuid::Uuid;

    #[test]
    fn signup_outcome_debug_names() {
        assert_eq!(format!("{:?}", SignupOutcome::Created), "Created");
        assert_eq!(format!("{:?}", SignupOutcome::Conflict), "Conflict");
    }

    #[test]
    fn parse_role_rejects_unknown_values() {
        assert!(super::parse_role("job_seeker").is_ok());
        assert!(super::parse_role("root").is_err());
    }

    #[test]
    fn login_record_holds_values() {
        let record = LoginRecord {
            user_id: Uuid::nil(),
            email: "alice@example.com".to_string(),
            role: Role::JobSeeker,
            email_verified: true,
            password_hash: "$2b$10$hash".to_string(),
        };
        assert_eq!(record.user_id, Uuid::nil());
        assert_eq!(record.role, Role::JobSeeker);
        assert!(record.email_verified);
    }

    #[test]
    fn otp_record_holds_values() {
        let record = OtpRecord {
            otp_id: Uuid::nil(),
            code_hash: vec![1, 2, 3],
            expired: false,
        };
        assert_eq!(record.code_hash, vec![1, 2, 3]);
        assert!(!record.expired);
    }

    #[test]
    fn refresh_state_remaining_defaults_to_zero() {
        let state = RefreshTokenState {
            token_hash: None,
            remaining_seconds: 0,
        };
        assert!(state.token_hash.is_none());
        assert_eq!(state.remaining_seconds, 0);
    }
}
