//! Outbound mail interface
//!
//! Delivery itself is an external collaborator; the auth flows only need a
//! `send(kind, recipient, link)` capability. The logging implementation
//! serves development and tests.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// What the message is for; the transport picks the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    Welcome,
    PasswordReset,
}

impl MailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailKind::Welcome => "welcome",
            MailKind::PasswordReset => "password-reset",
        }
    }
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Outbound mail capability
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, kind: MailKind, recipient: &str, link: &str) -> Result<(), MailError>;
}

/// Development mailer: logs instead of delivering
///
/// The reset link embeds the one-time secret, so the log line names only
/// the kind and recipient.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, kind: MailKind, recipient: &str, _link: &str) -> Result<(), MailError> {
        info!("Would send {} mail to {}", kind.as_str(), recipient);
        Ok(())
    }
}
