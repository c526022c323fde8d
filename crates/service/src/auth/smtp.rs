use std::time::Duration;

use async_trait::async_trait;
use configs::MailConfig;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::notify::{Notifier, NotifyError};

/// STARTTLS SMTP delivery.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn from_config(cfg: &MailConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = format!("{} <{}>", cfg.from_name, cfg.from)
            .parse()
            .map_err(|e| NotifyError::Message(format!("invalid from address: {e}")))?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(cfg.port)
            .timeout(Some(Duration::from_secs(10)));
        if !cfg.username.is_empty() {
            builder = builder.credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()));
        }
        Ok(Self { transport: builder.build(), from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, body_html: &str) -> Result<(), NotifyError> {
        let to_box: Mailbox = to.parse().map_err(|e| NotifyError::Message(format!("invalid to address: {e}")))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to_box)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body_html.to_string())
            .map_err(|e| NotifyError::Message(e.to_string()))?;
        self.transport.send(email).await.map_err(|e| NotifyError::Transport(e.to_string()))?;
        info!(to = %to, subject = %subject, "mail sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_sender() {
        let cfg = MailConfig { enabled: true, host: "smtp.example.com".into(), from: "not an address".into(), ..Default::default() };
        assert!(matches!(SmtpNotifier::from_config(&cfg), Err(NotifyError::Message(_))));
    }

    #[tokio::test]
    async fn builds_from_valid_config() {
        let cfg = MailConfig {
            enabled: true,
            host: "smtp.example.com".into(),
            from: "noreply@example.com".into(),
            username: "user".into(),
            password: "pw".into(),
            ..Default::default()
        };
        assert!(SmtpNotifier::from_config(&cfg).is_ok());
    }
}
