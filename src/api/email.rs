//! Outbound mail for one-time codes.
//!
//! The engine only needs fire-and-forget delivery of a short-lived code, so
//! the surface is a single trait. Production wires an SMTP or provider-backed
//! implementation; the default [`LogMailer`] writes the message to the log,
//! which is enough for development and tests.

use anyhow::Result;
use tracing::info;

/// A one-time-code notification addressed to a single recipient.
#[derive(Debug, Clone)]
pub struct OtpMail {
    pub to_email: String,
    pub recipient_name: String,
    pub subject: String,
    pub code: String,
    pub expires_minutes: i64,
}

pub trait Mailer: Send + Sync {
    fn send(&self, mail: &OtpMail) -> Result<()>;
}

/// Logs the outbound message instead of delivering it.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &OtpMail) -> Result<()> {
        info!(
            to = mail.to_email,
            recipient = mail.recipient_name,
            subject = mail.subject,
            code = mail.code,
            expires_minutes = mail.expires_minutes,
            "otp mail"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_mailer_accepts_mail() -> Result<()> {
        let mail = OtpMail {
            to_email: "alice@example.com".to_string(),
            recipient_name: "Alice".to_string(),
            subject: "Verify your email address".to_string(),
            code: "123456".to_string(),
            expires_minutes: 10,
        };
        LogMailer.send(&mail)
    }
}
