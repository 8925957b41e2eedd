//! Composed message types handed to email senders

use super::attachment::Attachment;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::Message;

/// MIME structure of a finalised body
#[derive(Debug)]
pub enum BodyPart {
    /// Neither text nor attachments
    Empty,
    /// A single `text/plain` part
    Single(SinglePart),
    /// `multipart/mixed` with the text part (if any) followed by attachments
    Multi(MultiPart),
}

/// A finalised email body.
///
/// The body owns every attachment that was added while it was being built;
/// they are released together with the body.
#[derive(Debug)]
pub struct MessageBody {
    text: Option<String>,
    part: BodyPart,
    attachments: Vec<Attachment>,
}

impl MessageBody {
    pub(crate) fn new(text: Option<String>, part: BodyPart, attachments: Vec<Attachment>) -> Self {
        Self {
            text,
            part,
            attachments,
        }
    }

    /// Plain text content, if the template produced one
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn part(&self) -> &BodyPart {
        &self.part
    }

    /// Attachments owned by this body, in MIME order
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.attachments.is_empty()
    }
}

/// A fully built message with one sender and one recipient
#[derive(Debug)]
pub struct ComposedMessage {
    from: Mailbox,
    to: Mailbox,
    subject: String,
    body: MessageBody,
}

impl ComposedMessage {
    pub fn new(from: Mailbox, to: Mailbox, subject: impl Into<String>, body: MessageBody) -> Self {
        Self {
            from,
            to,
            subject: subject.into(),
            body,
        }
    }

    pub fn from(&self) -> &Mailbox {
        &self.from
    }

    pub fn to(&self) -> &Mailbox {
        &self.to
    }

    /// Recipient list as seen by templates (always exactly one entry)
    pub fn recipients(&self) -> &[Mailbox] {
        std::slice::from_ref(&self.to)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    /// Render into a transport-ready lettre message
    pub fn to_lettre(&self) -> Result<Message, lettre::error::Error> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.subject.clone());

        match &self.body.part {
            BodyPart::Empty => builder.body(String::new()),
            BodyPart::Single(part) => builder.singlepart(part.clone()),
            BodyPart::Multi(part) => builder.multipart(part.clone()),
        }
    }
}
