use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::PoolConfig;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

use crate::email::{EmailError, EmailMessage, SendEmail};

pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    reply_to: Mailbox,
}

impl SmtpSender {
    pub fn with_credentials(
        username: &str,
        password: &str,
        relay_address: &str,
        relay_port: u16,
        max_connections: u32,
        idle_timeout: Duration,
        from: Mailbox,
        reply_to: Mailbox,
    ) -> Result<Self, EmailError> {
        let credentials = Credentials::new(username.to_string(), password.to_string());

        let pool_config = PoolConfig::new()
            .max_size(max_connections)
            .idle_timeout(idle_timeout);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(relay_address)
            .map_err(|e| EmailError::RelayConnectionFailed(e.to_string()))?
            .port(relay_port)
            .credentials(credentials)
            .pool_config(pool_config)
            .build();

        Ok(Self {
            transport,
            from,
            reply_to,
        })
    }

    pub async fn test_connection(&self) -> Result<bool, EmailError> {
        self.transport
            .test_connection()
            .await
            .map_err(EmailError::FailedToSend)
    }
}

#[async_trait]
impl SendEmail for SmtpSender {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let destination = message
            .to
            .parse::<Mailbox>()
            .map_err(|_| EmailError::InvalidDestination(message.to.clone()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .reply_to(self.reply_to.clone())
            .to(destination)
            .subject(message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html_body)
            .map_err(EmailError::InvalidMessage)?;

        self.transport
            .send(email)
            .await
            .map_err(EmailError::FailedToSend)?;

        Ok(())
    }
}
