//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use composer_core::domain::{Attachment, ComposedMessage, Culture};
use composer_core::email::{
    AttachmentSet, Email, EmailSender, EmailSenderError, StaticTemplateProvider, Template,
    TemplateError, TemplateProvider,
};
use lettre::message::Mailbox;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Records the name of every attachment released through it
#[derive(Clone, Default)]
pub struct ReleaseLog {
    released: Arc<Mutex<Vec<String>>>,
}

impl ReleaseLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A plain-text attachment whose release is recorded here
    pub fn attachment(&self, name: &str) -> Attachment {
        self.attachment_typed(name, "text/plain")
    }

    pub fn attachment_typed(&self, name: &str, content_type: &str) -> Attachment {
        let released = self.released.clone();
        Attachment::new(name, content_type, format!("content of {}", name)).on_release(
            move |a| {
                released.lock().unwrap().push(a.name().to_string());
            },
        )
    }

    pub fn released(&self) -> Vec<String> {
        let mut released = self.released.lock().unwrap().clone();
        released.sort();
        released
    }

    pub fn count(&self, name: &str) -> usize {
        self.released
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.as_str() == name)
            .count()
    }

    pub fn total(&self) -> usize {
        self.released.lock().unwrap().len()
    }
}

/// What a sender saw, captured while the message was still alive
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: Option<String>,
    pub attachments: Vec<String>,
    /// Releases recorded by the log at the time of sending
    pub released_before_send: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBehavior {
    Accept,
    Reject,
    Hang,
}

/// Sender that records every message handed to it
pub struct RecordingSender {
    sent: Mutex<Vec<Sent>>,
    behavior: SendBehavior,
    log: ReleaseLog,
}

impl RecordingSender {
    pub fn new(log: &ReleaseLog) -> Self {
        Self::with_behavior(log, SendBehavior::Accept)
    }

    pub fn with_behavior(log: &ReleaseLog, behavior: SendBehavior) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            behavior,
            log: log.clone(),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingSender {
    async fn send(&self, message: &ComposedMessage) -> Result<(), EmailSenderError> {
        self.sent.lock().unwrap().push(Sent {
            from: message.from().to_string(),
            to: message.to().to_string(),
            subject: message.subject().to_string(),
            text: message.body().text().map(str::to_string),
            attachments: message
                .body()
                .attachments()
                .iter()
                .map(|a| a.name().to_string())
                .collect(),
            released_before_send: self.log.total(),
        });

        match self.behavior {
            SendBehavior::Accept => Ok(()),
            SendBehavior::Reject => Err(EmailSenderError::ConnectionError(
                "connection reset by peer".to_string(),
            )),
            SendBehavior::Hang => std::future::pending().await,
        }
    }

    fn sender_name(&self) -> &'static str {
        "recording"
    }
}

/// Template step that can be made to fail or never complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Subject,
    Text,
    Attachments,
}

fn culture_label(tag: &str) -> &str {
    if tag.is_empty() {
        "invariant"
    } else {
        tag
    }
}

/// Configurable template for exercising every failure path
pub struct FakeTemplate {
    culture: Culture,
    sender: Mailbox,
    subject: String,
    text: Option<String>,
    contributed: Vec<(String, String)>,
    fail_at: Option<Step>,
    hang_at: Option<Step>,
    log: ReleaseLog,
}

impl FakeTemplate {
    pub fn new(culture: &str, log: &ReleaseLog) -> Self {
        Self {
            culture: culture.parse().unwrap(),
            sender: format!("Team <team.{}@example.com>", culture_label(culture))
                .parse()
                .unwrap(),
            subject: format!("Subject [{}]", culture_label(culture)),
            text: Some(format!("Body [{}]", culture_label(culture))),
            contributed: Vec::new(),
            fail_at: None,
            hang_at: None,
            log: log.clone(),
        }
    }

    pub fn without_text(mut self) -> Self {
        self.text = None;
        self
    }

    /// Contribute an attachment on every body build
    pub fn contributing(mut self, name: &str, content_type: &str) -> Self {
        self.contributed
            .push((name.to_string(), content_type.to_string()));
        self
    }

    pub fn failing_at(mut self, step: Step) -> Self {
        self.fail_at = Some(step);
        self
    }

    pub fn hanging_at(mut self, step: Step) -> Self {
        self.hang_at = Some(step);
        self
    }

    async fn step(&self, step: Step) -> Result<(), TemplateError> {
        if self.hang_at == Some(step) {
            std::future::pending::<()>().await;
        }
        if self.fail_at == Some(step) {
            return Err(TemplateError::RenderFailed(format!("{:?} exploded", step)));
        }
        Ok(())
    }
}

#[async_trait]
impl Template for FakeTemplate {
    fn culture(&self) -> &Culture {
        &self.culture
    }

    fn sender(&self) -> &Mailbox {
        &self.sender
    }

    async fn build_subject(
        &self,
        _recipients: &[Mailbox],
        _data: Option<&Value>,
    ) -> Result<String, TemplateError> {
        self.step(Step::Subject).await?;
        Ok(self.subject.clone())
    }

    async fn build_plain_message(
        &self,
        _recipients: &[Mailbox],
        data: Option<&Value>,
    ) -> Result<Option<String>, TemplateError> {
        self.step(Step::Text).await?;
        Ok(self.text.as_ref().map(|text| match data {
            Some(data) => format!("{} {}", text, data),
            None => text.clone(),
        }))
    }

    async fn attachments(
        &self,
        _recipients: &[Mailbox],
        _data: Option<&Value>,
        set: &mut AttachmentSet,
    ) -> Result<(), TemplateError> {
        for (name, content_type) in &self.contributed {
            set.push(self.log.attachment_typed(name, content_type));
        }
        self.step(Step::Attachments).await
    }
}

/// Email with scripted data and attachments
pub struct FakeEmail {
    template_id: u32,
    data: Option<Value>,
    attachments: Vec<String>,
    fail_data: bool,
    fail_attachments: bool,
    hang_data: bool,
    log: ReleaseLog,
}

impl FakeEmail {
    pub fn new(template_id: u32, log: &ReleaseLog) -> Self {
        Self {
            template_id,
            data: None,
            attachments: Vec::new(),
            fail_data: false,
            fail_attachments: false,
            hang_data: false,
            log: log.clone(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_attachments(mut self, names: &[&str]) -> Self {
        self.attachments = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn failing_data(mut self) -> Self {
        self.fail_data = true;
        self
    }

    pub fn failing_attachments(mut self) -> Self {
        self.fail_attachments = true;
        self
    }

    pub fn hanging_data(mut self) -> Self {
        self.hang_data = true;
        self
    }
}

#[async_trait]
impl Email for FakeEmail {
    type TemplateId = u32;

    fn template_id(&self) -> &u32 {
        &self.template_id
    }

    async fn data(&self) -> anyhow::Result<Option<Value>> {
        if self.hang_data {
            std::future::pending::<()>().await;
        }
        if self.fail_data {
            anyhow::bail!("data store unavailable");
        }
        Ok(self.data.clone())
    }

    async fn attachments(&self) -> anyhow::Result<Vec<Attachment>> {
        if self.fail_attachments {
            anyhow::bail!("blob store unavailable");
        }
        Ok(self
            .attachments
            .iter()
            .map(|name| self.log.attachment(name))
            .collect())
    }
}

/// Provider whose lookups always fail
pub struct BrokenProvider;

#[async_trait]
impl TemplateProvider for BrokenProvider {
    type Id = u32;

    async fn resolve(
        &self,
        _id: &u32,
        _culture: &Culture,
    ) -> anyhow::Result<Option<Arc<dyn Template>>> {
        anyhow::bail!("catalogue offline")
    }
}

/// Provider holding the given templates under id 42
pub fn provider_with(templates: Vec<FakeTemplate>) -> Arc<dyn TemplateProvider<Id = u32>> {
    let mut provider = StaticTemplateProvider::<u32>::new();
    for template in templates {
        provider.insert(42, Arc::new(template));
    }
    Arc::new(provider)
}

pub fn recipient() -> Mailbox {
    "Ada Lovelace <ada@example.com>".parse().unwrap()
}

pub fn culture(tag: &str) -> Culture {
    tag.parse().unwrap()
}
