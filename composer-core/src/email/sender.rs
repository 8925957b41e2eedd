//! Email sender trait and error types

use crate::domain::ComposedMessage;
use async_trait::async_trait;
use thiserror::Error;

/// Email sender error types
#[derive(Error, Debug)]
pub enum EmailSenderError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Transport capability that delivers a composed message.
///
/// The message is only borrowed; the caller keeps ownership and releases it
/// (and its attachments) once `send` returns, whatever the outcome.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver `message` to its single recipient
    async fn send(&self, message: &ComposedMessage) -> Result<(), EmailSenderError>;

    /// Get the sender name
    fn sender_name(&self) -> &'static str;
}
