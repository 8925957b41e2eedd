//! SMTP email sender implementation using lettre

use super::sender::{EmailSender, EmailSenderError};
use crate::config::SmtpConfig;
use crate::domain::ComposedMessage;
use async_trait::async_trait;
use lettre::{
    transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport,
    Tokio1Executor,
};

/// SMTP-based email sender
pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpSender {
    /// Create a new SMTP sender from configuration
    pub fn from_config(config: &SmtpConfig) -> Result<Self, EmailSenderError> {
        if config.host.trim().is_empty() {
            return Err(EmailSenderError::InvalidConfiguration(
                "SMTP host is empty".to_string(),
            ));
        }

        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| EmailSenderError::InvalidConfiguration(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        builder = builder.port(config.port);

        // Add credentials if provided
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            let credentials = Credentials::new(username.clone(), password.clone());
            builder = builder.credentials(credentials);
        }

        Ok(Self {
            transport: builder.build(),
        })
    }

    /// Test connection to the SMTP server
    pub async fn test_connection(&self) -> Result<(), EmailSenderError> {
        self.transport
            .test_connection()
            .await
            .map(|_| ())
            .map_err(|e| classify(e.to_string()))
    }
}

fn classify(error_msg: String) -> EmailSenderError {
    if error_msg.contains("authentication") || error_msg.contains("AUTH") {
        EmailSenderError::AuthenticationFailed(error_msg)
    } else if error_msg.contains("connection") || error_msg.contains("timeout") {
        EmailSenderError::ConnectionError(error_msg)
    } else {
        EmailSenderError::SendFailed(error_msg)
    }
}

#[async_trait]
impl EmailSender for SmtpSender {
    async fn send(&self, message: &ComposedMessage) -> Result<(), EmailSenderError> {
        let email = message
            .to_lettre()
            .map_err(|e| EmailSenderError::InvalidMessage(e.to_string()))?;

        match self.transport.send(email).await {
            Ok(response) => {
                tracing::debug!(
                    code = %response.code(),
                    response = ?response.message().next(),
                    "SMTP server accepted message"
                );
                Ok(())
            }
            Err(e) => Err(classify(e.to_string())),
        }
    }

    fn sender_name(&self) -> &'static str {
        "smtp"
    }
}
