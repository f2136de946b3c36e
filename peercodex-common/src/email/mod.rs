pub mod senders;
pub mod templates;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
pub enum EmailError {
    RelayConnectionFailed(String),
    InvalidDestination(String),
    InvalidMessage(lettre::error::Error),
    FailedToSend(lettre::transport::smtp::Error),
}

impl std::error::Error for EmailError {}

impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailError::RelayConnectionFailed(e) => {
                write!(f, "EmailError: Relay connection failed: {e}")
            }
            EmailError::InvalidDestination(addr) => {
                write!(f, "EmailError: Invalid destination address '{addr}'")
            }
            EmailError::InvalidMessage(e) => write!(f, "EmailError: Invalid message: {e}"),
            EmailError::FailedToSend(e) => write!(f, "EmailError: Failed to send: {e}"),
        }
    }
}

/// An HTML email to a single recipient. The sender and reply-to addresses belong to the
/// `SendEmail` implementation.
#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to: String,
    pub subject: &'static str,
    pub html_body: String,
}

#[async_trait]
pub trait SendEmail: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

#[async_trait]
impl<T: SendEmail + ?Sized> SendEmail for Arc<T> {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        (**self).send(message).await
    }
}

pub type EmailSender = Box<dyn SendEmail>;
