use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
            .context("smtp relay")?
            .port(cfg.port);
        if !cfg.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                cfg.username.clone(),
                cfg.password.clone(),
            ));
        }
        Ok(Self {
            transport: builder.build(),
            from: cfg.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.parse().context("parse from address")?)
            .to(email.to.parse().context("parse recipient address")?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .context("build message")?;
        self.transport
            .send(message)
            .await
            .context("smtp send")?;
        Ok(())
    }
}

/// Writes outgoing mail to the log instead of sending it.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        info!(to = %email.to, subject = %email.subject, body = %email.body, "mail not sent: smtp disabled");
        Ok(())
    }
}

pub fn verification_email(to: &str, public_url: &str, token: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "Verify your email".into(),
        body: format!(
            "Welcome! Confirm your address by opening:\n\n{public_url}/verify-email/{token}\n"
        ),
    }
}

pub fn password_reset_email(to: &str, public_url: &str, token: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "Password reset".into(),
        body: format!(
            "A password reset was requested for your account. The link expires in one hour:\n\n\
             {public_url}/reset-password/{token}\n\n\
             If you did not ask for this, ignore this email.\n"
        ),
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Collects every email instead of sending it.
    #[derive(Clone, Default)]
    pub struct RecordingMailer {
        pub sent: Arc<Mutex<Vec<Email>>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: Email) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(email);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_point_at_public_url() {
        let email = verification_email("a@b.io", "https://shop.example", "abc123");
        assert_eq!(email.to, "a@b.io");
        assert!(email.body.contains("https://shop.example/verify-email/abc123"));

        let email = password_reset_email("a@b.io", "https://shop.example", "zzz");
        assert!(email.body.contains("https://shop.example/reset-password/zzz"));
    }

    #[tokio::test]
    async fn recording_mailer_keeps_messages() {
        let mailer = testing::RecordingMailer::default();
        mailer
            .send(verification_email("x@y.io", "http://l", "t"))
            .await
            .unwrap();
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }
}
