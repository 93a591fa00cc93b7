// src/utils/mailer.rs

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::{config::SmtpConfig, error::AppError};

/// Outbound e-mail. Implementations must be cheap to share behind an `Arc`.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError>;
}

/// Delivers through an SMTP relay (STARTTLS).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| AppError::InternalServerError(format!("Invalid SMTP_FROM: {}", e)))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(())
    }
}

/// Used when no SMTP relay is configured: the mail is written to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        tracing::info!(%to, %subject, %body, "smtp not configured, mail logged only");
        Ok(())
    }
}

/// Sends without blocking the caller. Failures are logged, never returned.
pub fn send_in_background(
    mailer: std::sync::Arc<dyn Mailer>,
    to: String,
    subject: String,
    body: String,
) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&to, &subject, &body).await {
            tracing::error!(%to, %subject, error = %e, "failed to send mail");
        }
    });
}

pub fn verification_mail(base_url: &str, token: &str) -> (String, String) {
    (
        "Verify your LinkIT account".to_string(),
        format!(
            "Welcome to LinkIT!\n\nConfirm your e-mail address by opening:\n{}/verify?token={}\n",
            base_url.trim_end_matches('/'),
            token
        ),
    )
}

pub fn reset_mail(base_url: &str, token: &str, ttl_minutes: i64) -> (String, String) {
    (
        "Reset your LinkIT password".to_string(),
        format!(
            "Someone asked to reset your LinkIT password.\n\nOpen this link within {} minutes:\n{}/reset-password?token={}\n\nIf it was not you, ignore this mail.\n",
            ttl_minutes,
            base_url.trim_end_matches('/'),
            token
        ),
    )
}
