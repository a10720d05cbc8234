use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::Settings;
use crate::error::AppError;
use crate::rendering::markdown::render_markdown;

/// An outgoing email with HTML and plain-text bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl EmailMessage {
    /// Build a message from a Markdown body. The Markdown source doubles as
    /// the plain-text alternative.
    pub fn from_markdown(to: &str, subject: &str, markdown: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: subject.to_string(),
            text: markdown.to_string(),
            html: render_markdown(markdown),
        }
    }
}

/// Outbound mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError>;
}

/// SMTP delivery through lettre's pooled async transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &Settings, host: &str) -> Result<Self, AppError> {
        let from = settings
            .mail_from
            .parse::<Mailbox>()
            .map_err(|e| AppError::Email(format!("Invalid MAIL_FROM: {e}")))?;

        // Port 465 speaks implicit TLS, everything else upgrades with STARTTLS.
        let relay = if settings.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        };

        let mut builder = relay
            .map_err(|e| AppError::Email(e.to_string()))?
            .port(settings.smtp_port);
        if let (Some(user), Some(pass)) = (&settings.smtp_username, &settings.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::Email(format!("Invalid recipient '{}': {e}", message.to)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                message.text.clone(),
                message.html.clone(),
            ))
            .map_err(|e| AppError::Email(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::Email(e.to_string()))?;
        Ok(())
    }
}

/// Stand-in used when SMTP is not configured. Every send fails.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
        tracing::info!(to = %message.to, subject = %message.subject, "SMTP not configured, email dropped");
        Err(AppError::Email("SMTP is not configured".into()))
    }
}

/// Pick the SMTP mailer when a host is configured, the disabled one otherwise.
pub fn mailer_from_settings(settings: &Settings) -> Result<Arc<dyn Mailer>, AppError> {
    match settings.smtp_host.as_deref() {
        Some(host) => {
            tracing::info!(host, port = settings.smtp_port, "SMTP mailer configured");
            Ok(Arc::new(SmtpMailer::new(settings, host)?))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, outgoing email is disabled");
            Ok(Arc::new(DisabledMailer))
        }
    }
}

/// Send one message, logging instead of propagating failures.
///
/// Returns whether the message was accepted by the transport.
pub async fn deliver(mailer: &dyn Mailer, message: &EmailMessage) -> bool {
    match mailer.send(message).await {
        Ok(()) => {
            tracing::debug!(to = %message.to, subject = %message.subject, "Email sent");
            true
        }
        Err(e) => {
            tracing::warn!(to = %message.to, subject = %message.subject, "Email delivery failed: {e}");
            false
        }
    }
}

/// How a broadcast is chunked.
#[derive(Debug, Clone, Copy)]
pub struct BatchPolicy {
    pub size: usize,
    pub delay: Duration,
}

impl BatchPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            size: settings.broadcast_batch_size.max(1),
            delay: settings.broadcast_delay(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: u64,
    pub failed: u64,
}

/// Send messages in batches, concurrently within a batch, pausing between
/// batches. Only aggregate counts are kept.
pub async fn broadcast(
    mailer: &dyn Mailer,
    messages: &[EmailMessage],
    policy: BatchPolicy,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    let batches: Vec<_> = messages.chunks(policy.size.max(1)).collect();
    let last = batches.len().saturating_sub(1);

    for (index, batch) in batches.into_iter().enumerate() {
        let outcomes =
            futures::future::join_all(batch.iter().map(|message| deliver(mailer, message))).await;
        for delivered in outcomes {
            if delivered {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }

        if index < last && !policy.delay.is_zero() {
            tokio::time::sleep(policy.delay).await;
        }
    }

    tracing::info!(sent = report.sent, failed = report.failed, "Broadcast finished");
    report
}
