//! Email notification delivery via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport to send
//! plain-text notification emails. The transport is built once, when the
//! configuration is applied; the connection mode is chosen from the port:
//! 465 uses implicit TLS, every other port connects in plain text and
//! upgrades with STARTTLS before authenticating.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use licmon_core::config::MonitorConfig;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The configuration lists no recipient.
    #[error("No email recipients configured")]
    NoRecipients,
}

// ---------------------------------------------------------------------------
// SmtpSecurity
// ---------------------------------------------------------------------------

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// TLS from the first byte (SMTPS).
    Implicit,
    /// Plain connection upgraded with STARTTLS.
    StartTls,
}

impl SmtpSecurity {
    /// Port on which implicit TLS is used.
    pub const IMPLICIT_TLS_PORT: u16 = 465;

    /// Connection mode for `port`.
    pub fn for_port(port: u16) -> Self {
        if port == Self::IMPLICIT_TLS_PORT {
            SmtpSecurity::Implicit
        } else {
            SmtpSecurity::StartTls
        }
    }
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// SMTP timeout for connect and every command.
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port.
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Recipient addresses.
    pub recipients: Vec<String>,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Email settings of a monitor configuration.
    ///
    /// Returns `None` when SMTP is disabled, signalling that email
    /// delivery should be skipped.
    pub fn from_monitor_config(config: &MonitorConfig) -> Option<Self> {
        if !config.smtp_enabled {
            return None;
        }
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Some(Self {
            smtp_host: config.smtp_server.trim().to_string(),
            smtp_port: config.smtp_port,
            from_address: config.smtp_from.trim().to_string(),
            recipients: config.smtp_recipients(),
            smtp_user: non_empty(&config.smtp_username),
            smtp_password: non_empty(&config.smtp_password),
        })
    }

    /// Connection mode derived from the port.
    pub fn security(&self) -> SmtpSecurity {
        SmtpSecurity::for_port(self.smtp_port)
    }
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends notification emails via SMTP.
#[derive(Clone)]
pub struct EmailDelivery {
    config: EmailConfig,
    from: Mailbox,
    to: Vec<Mailbox>,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for EmailDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailDelivery")
            .field("smtp_host", &self.config.smtp_host)
            .field("smtp_port", &self.config.smtp_port)
            .field("security", &self.config.security())
            .field("recipients", &self.config.recipients)
            .finish()
    }
}

impl EmailDelivery {
    /// Parse the addresses and build the SMTP transport. No connection is
    /// opened until the first send.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let from: Mailbox = config.from_address.parse()?;
        let to = config
            .recipients
            .iter()
            .map(|r| r.parse::<Mailbox>())
            .collect::<Result<Vec<_>, _>>()?;
        if to.is_empty() {
            return Err(EmailError::NoRecipients);
        }

        let mut transport_builder = match config.security() {
            SmtpSecurity::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?,
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            }
        }
        .port(config.smtp_port)
        .timeout(Some(SMTP_TIMEOUT));

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            from,
            to,
            mailer: transport_builder.build(),
            config,
        })
    }

    /// The connection mode this delivery uses.
    pub fn security(&self) -> SmtpSecurity {
        self.config.security()
    }

    /// Send a plain-text email to every configured recipient.
    pub async fn send(&self, subject: &str, body: &str) -> Result<(), EmailError> {
        let email = self.build_message(subject, body)?;
        self.mailer.send(email).await?;

        tracing::info!(
            recipients = self.to.len(),
            subject,
            "Notification email sent"
        );
        Ok(())
    }

    /// Assemble the multipart message with a single UTF-8 text part.
    fn build_message(&self, subject: &str, body: &str) -> Result<Message, EmailError> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }

        builder
            .multipart(
                MultiPart::mixed().singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(body.to_string()),
                ),
            )
            .map_err(|e| EmailError::Build(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
