use async_trait::async_trait;
use std::sync::Mutex;

use crate::email::{EmailError, EmailMessage, SendEmail};

/// Logs messages instead of sending them and keeps them in an outbox. Used when email is
/// disabled and in tests.
#[derive(Default)]
pub struct MockSender {
    outbox: Mutex<Vec<EmailMessage>>,
}

impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent message addressed to `to`, if any.
    pub fn last_sent_to(&self, to: &str) -> Option<EmailMessage> {
        let outbox = self.outbox.lock().unwrap_or_else(|e| e.into_inner());
        outbox.iter().rev().find(|m| m.to == to).cloned()
    }

    pub fn sent_count(&self) -> usize {
        self.outbox.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl SendEmail for MockSender {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        log::info!(
            "Email not sent (email is disabled): \"{}\" to {}",
            message.subject,
            message.to
        );
        log::debug!("{}", message.html_body);

        self.outbox
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);

        Ok(())
    }
}
