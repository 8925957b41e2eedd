//! Email composer: resolve template, build message, send

use crate::cancellation::CancellationToken;
use crate::domain::{release_all, ComposedMessage, Culture};
use crate::email::{build_body, BodyBuildError, BodyError, Email, EmailSender, TemplateProvider};
use crate::error::{ComposeError, ComposeStage, Result};
use lettre::message::Mailbox;
use std::fmt::{Debug, Display};
use std::sync::Arc;
use std::time::Instant;

/// Composes emails from templates and hands them to an [`EmailSender`].
///
/// Stateless between calls; concurrent `compose` calls share nothing but
/// the provider and sender.
pub struct EmailComposer<I = String> {
    provider: Arc<dyn TemplateProvider<Id = I>>,
    sender: Arc<dyn EmailSender>,
    default_culture: Culture,
}

impl<I> Clone for EmailComposer<I> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            sender: self.sender.clone(),
            default_culture: self.default_culture.clone(),
        }
    }
}

impl<I> EmailComposer<I>
where
    I: Debug + Display + Send + Sync,
{
    pub fn new(
        provider: Arc<dyn TemplateProvider<Id = I>>,
        sender: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            provider,
            sender,
            default_culture: Culture::invariant(),
        }
    }

    /// Culture used by [`compose_default`](Self::compose_default)
    pub fn with_default_culture(mut self, culture: Culture) -> Self {
        self.default_culture = culture;
        self
    }

    pub fn default_culture(&self) -> &Culture {
        &self.default_culture
    }

    /// Compose `email` for `recipient` in `culture` and send it.
    ///
    /// Exactly one send is attempted when the message could be built, none
    /// otherwise. On return every resource the composer took ownership of
    /// has been released; attachments it never took over come back inside
    /// the error.
    #[tracing::instrument(
        name = "compose",
        skip_all,
        fields(recipient = %recipient.email, template_id = %email.template_id(), culture = %culture)
    )]
    pub async fn compose<E>(
        &self,
        recipient: Mailbox,
        email: &E,
        culture: &Culture,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        E: Email<TemplateId = I> + ?Sized,
    {
        let started = Instant::now();
        let result = self.run(recipient, email, culture, cancel).await;
        self.record(started, &result);
        result
    }

    fn record(&self, started: Instant, result: &Result<()>) {
        let outcome = match result {
            Ok(()) => "sent",
            Err(e) => e.kind(),
        };
        metrics::counter!("composer_emails_total", "outcome" => outcome).increment(1);
        metrics::histogram!("composer_compose_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => tracing::info!(sender = self.sender.sender_name(), "Email sent"),
            Err(e) => tracing::warn!(stage = %e.stage(), error = %e, "Compose failed"),
        }
    }

    /// Compose using the composer's default culture
    pub async fn compose_default<E>(
        &self,
        recipient: Mailbox,
        email: &E,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        E: Email<TemplateId = I> + ?Sized,
    {
        let culture = self.default_culture.clone();
        self.compose(recipient, email, &culture, cancel).await
    }

    /// Compose for a recipient given as text (`user@example.com` or
    /// `Name <user@example.com>`); `None` uses the default culture.
    pub async fn compose_to<E>(
        &self,
        recipient: &str,
        email: &E,
        culture: Option<&Culture>,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        E: Email<TemplateId = I> + ?Sized,
    {
        let started = Instant::now();
        let mailbox: Mailbox = match recipient.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                let e: lettre::address::AddressError = e;
                let result = Err(ComposeError::InvalidRecipient {
                    address: recipient.to_string(),
                    reason: e.to_string(),
                });
                self.record(started, &result);
                return result;
            }
        };

        let culture = culture.unwrap_or(&self.default_culture).clone();
        self.compose(mailbox, email, &culture, cancel).await
    }

    async fn run<E>(
        &self,
        recipient: Mailbox,
        email: &E,
        culture: &Culture,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        E: Email<TemplateId = I> + ?Sized,
    {
        // Load template.
        let resolved = cancel
            .run(self.provider.resolve(email.template_id(), culture))
            .await;
        let template = match resolved {
            Some(Ok(Some(template))) => template,
            Some(Ok(None)) => {
                return Err(ComposeError::TemplateNotFound {
                    template_id: email.template_id().to_string(),
                    culture: culture.clone(),
                })
            }
            Some(Err(e)) => return Err(ComposeError::TemplateLookupFailed(e)),
            None => return Err(cancelled(ComposeStage::ResolveTemplate)),
        };

        if !template.culture().matches(culture) {
            tracing::debug!(resolved = %template.culture(), "Using fallback template");
        }

        // Fetch data and attachments. Until both succeed the email keeps
        // ownership of anything it produced.
        let data = match cancel.run(email.data()).await {
            Some(Ok(data)) => data,
            Some(Err(e)) => return Err(ComposeError::DataRetrievalFailed(e)),
            None => return Err(cancelled(ComposeStage::FetchData)),
        };

        let attachments = match cancel.run(email.attachments()).await {
            Some(Ok(attachments)) => attachments,
            Some(Err(e)) => return Err(ComposeError::AttachmentRetrievalFailed(e)),
            None => return Err(cancelled(ComposeStage::FetchAttachments)),
        };

        // Construct message.
        let recipients = [recipient];

        let subject = cancel
            .run(template.build_subject(&recipients, data.as_ref()))
            .await;
        let subject = match subject {
            Some(Ok(subject)) => subject,
            Some(Err(e)) => {
                let released = release_all(attachments);
                tracing::debug!(released, "Released attachments after subject failure");
                return Err(ComposeError::SubjectBuildFailed(e));
            }
            None => {
                release_all(attachments);
                return Err(cancelled(ComposeStage::BuildSubject));
            }
        };

        let body = build_body(
            &*template,
            &recipients,
            data.as_ref(),
            attachments,
            cancel,
        )
        .await;
        let body = match body {
            Ok(body) => body,
            Err(BodyBuildError {
                source: BodyError::Cancelled,
                externals,
            }) => {
                return Err(ComposeError::Cancelled {
                    stage: ComposeStage::BuildBody,
                    attachments: externals,
                })
            }
            Err(BodyBuildError { source, externals }) => {
                return Err(ComposeError::BodyBuildFailed {
                    source,
                    attachments: externals,
                })
            }
        };

        let [recipient] = recipients;
        let message = ComposedMessage::new(template.sender().clone(), recipient, subject, body);
        tracing::debug!(
            attachments = message.body().attachments().len(),
            has_text = message.body().text().is_some(),
            "Message built"
        );

        // Send email. The message and everything it owns is released
        // afterwards whatever the outcome.
        let sent = cancel.run(self.sender.send(&message)).await;
        drop(message);

        match sent {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(ComposeError::DeliveryFailed(e)),
            None => Err(cancelled(ComposeStage::Send)),
        }
    }
}

fn cancelled(stage: ComposeStage) -> ComposeError {
    ComposeError::Cancelled {
        stage,
        attachments: Vec::new(),
    }
}
