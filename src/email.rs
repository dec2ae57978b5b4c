// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outgoing email seam.
//!
//! Delivery is a collaborator behind the [`Mailer`] trait; the default
//! [`LogMailer`] only records that a send happened. Handlers treat sends as
//! best-effort: a mailer failure never fails the operation that triggered it.

use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// A rendered email ready for delivery.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body_html: String,
}

/// Email delivery seam.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError>;
}

/// Mailer that logs delivery metadata instead of sending.
///
/// Logs sender, recipient and subject only. Bodies carry recovery tokens
/// and must not reach the logs.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

impl Mailer for LogMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        tracing::info!(from = %self.from, to = %email.to, subject = %email.subject, "outgoing email");
        Ok(())
    }
}

/// Build the password recovery email.
///
/// Contains a reset link and a short uppercase display code (the first six
/// characters of the token) for support conversations.
pub fn recovery_email(app_url: &str, to: &str, token: &str) -> OutgoingEmail {
    let link = format!("{app_url}/reset-password?token={token}");
    let display_code = token.chars().take(6).collect::<String>().to_uppercase();
    let body_html = format!(
        "<h2>Password Recovery</h2>\
         <p>A password reset was requested for your wallet. The link below is \
         valid for one hour and can be used once.</p>\
         <p><a href=\"{link}\">Reset your password</a></p>\
         <p>Reference code: <strong>{display_code}</strong></p>\
         <p>If you did not request this, no action is needed.</p>"
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: "Reset your wallet password".to_string(),
        body_html,
    }
}

/// Build the password-changed notification email.
pub fn password_changed_email(to: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Your wallet password was changed".to_string(),
        body_html: "<h2>Password Changed</h2>\
                    <p>The password for your wallet was just changed. If this \
                    was not you, contact support immediately.</p>"
            .to_string(),
    }
}

/// Structured detail for audit events about email sends. Never includes the
/// body.
pub fn send_outcome_details(email: &OutgoingEmail, delivered: bool) -> serde_json::Value {
    json!({ "subject": email.subject, "delivered": delivered })
}

/// Test mailer that records every send.
#[cfg(test)]
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<OutgoingEmail>>,
    pub fail: bool,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[cfg(test)]
impl Mailer for RecordingMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        if self.fail {
            return Err(MailerError::Delivery("recording mailer set to fail".into()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
