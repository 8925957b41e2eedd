//! Template contract and body assembly
//!
//! A [`Template`] renders the subject and plain text of one kind of email for
//! one culture, and may contribute attachments of its own. [`build_body`]
//! turns its output plus the caller's attachments into a [`MessageBody`]:
//!
//! - on success the body owns every attachment;
//! - on failure the attachments the template contributed are released and
//!   the caller's attachments are handed back untouched in the error.

use crate::cancellation::CancellationToken;
use crate::domain::{release_all, Attachment, BodyPart, Culture, Disposition, MessageBody};
use async_trait::async_trait;
use lettre::message::header::ContentTypeErr;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised by template implementations
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Missing template variable: {0}")]
    MissingVariable(String),

    #[error("Invalid template data: {0}")]
    InvalidData(String),

    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Attachment unavailable: {0}")]
    AttachmentUnavailable(String),

    #[error("Attachment index {index} out of range for {len} attachments")]
    AttachmentIndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised while assembling a body
#[derive(Error, Debug)]
pub enum BodyError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid content type {content_type:?} for attachment {name}: {source}")]
    InvalidContentType {
        name: String,
        content_type: String,
        #[source]
        source: ContentTypeErr,
    },

    #[error("Duplicate inline content id: {0}")]
    DuplicateContentId(String),

    #[error("Body assembly cancelled")]
    Cancelled,
}

/// Failed body assembly.
///
/// Carries the externally supplied attachments back to the caller, who
/// still owns them.
#[derive(Error, Debug)]
#[error("Body build failed: {source}")]
pub struct BodyBuildError {
    #[source]
    pub source: BodyError,
    pub externals: Vec<Attachment>,
}

/// Where an attachment in an [`AttachmentSet`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Supplied by the email; owned by the caller until the body is finalised
    External,
    /// Contributed by the template
    Template,
}

/// Ordered attachments of a body under construction.
///
/// Starts with the external attachments; templates may add their own and
/// reorder entries, but cannot remove an external one.
#[derive(Debug, Default)]
pub struct AttachmentSet {
    entries: Vec<(Origin, Attachment)>,
}

impl AttachmentSet {
    pub fn from_externals(externals: Vec<Attachment>) -> Self {
        Self {
            entries: externals
                .into_iter()
                .map(|a| (Origin::External, a))
                .collect(),
        }
    }

    /// Append a template-owned attachment
    pub fn push(&mut self, attachment: Attachment) {
        self.entries.push((Origin::Template, attachment));
    }

    /// Insert a template-owned attachment at `index` (clamped to the end)
    pub fn insert(&mut self, index: usize, attachment: Attachment) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, (Origin::Template, attachment));
    }

    /// Swap the positions of two entries.
    ///
    /// Fails without touching the set if either index is out of range.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), TemplateError> {
        let len = self.entries.len();
        if let Some(index) = [a, b].into_iter().find(|&i| i >= len) {
            return Err(TemplateError::AttachmentIndexOutOfRange { index, len });
        }
        self.entries.swap(a, b);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Origin, &Attachment)> {
        self.entries.iter().map(|(origin, a)| (*origin, a))
    }

    pub fn externals(&self) -> impl Iterator<Item = &Attachment> {
        self.iter()
            .filter(|(origin, _)| *origin == Origin::External)
            .map(|(_, a)| a)
    }

    /// Number of attachments contributed by the template
    pub fn contributed(&self) -> usize {
        self.iter()
            .filter(|(origin, _)| *origin == Origin::Template)
            .count()
    }

    fn into_attachments(self) -> Vec<Attachment> {
        self.entries.into_iter().map(|(_, a)| a).collect()
    }

    /// Give up on this set: release the template's attachments and hand the
    /// external ones back in their relative order.
    fn abandon(self, source: BodyError) -> BodyBuildError {
        let (externals, contributed): (Vec<_>, Vec<_>) = self
            .entries
            .into_iter()
            .partition(|(origin, _)| *origin == Origin::External);

        let released = release_all(contributed.into_iter().map(|(_, a)| a));
        let externals: Vec<Attachment> = externals.into_iter().map(|(_, a)| a).collect();

        tracing::debug!(
            released,
            returned = externals.len(),
            "Released template attachments after failed body build"
        );

        BodyBuildError { source, externals }
    }
}

/// An email template bound to one culture and one sender.
///
/// Implementations are immutable; a provider creates or shares one per
/// resolution.
#[async_trait]
pub trait Template: Send + Sync {
    /// Culture this template renders for (may differ from the requested one
    /// when the provider fell back)
    fn culture(&self) -> &Culture;

    /// Mailbox the email is sent from
    fn sender(&self) -> &Mailbox;

    async fn build_subject(
        &self,
        recipients: &[Mailbox],
        data: Option<&Value>,
    ) -> Result<String, TemplateError>;

    /// Render the plain text part, or `None` if this template has none
    async fn build_plain_message(
        &self,
        recipients: &[Mailbox],
        data: Option<&Value>,
    ) -> Result<Option<String>, TemplateError>;

    /// Hook for template-specific attachments (a logo, a signature, ...).
    ///
    /// The default leaves the set as supplied by the email.
    async fn attachments(
        &self,
        _recipients: &[Mailbox],
        _data: Option<&Value>,
        _set: &mut AttachmentSet,
    ) -> Result<(), TemplateError> {
        Ok(())
    }
}

/// Build a message body from `template`, taking ownership of `externals`.
///
/// On success the returned body owns all attachments (externals first
/// unless the template reordered them). On failure, including
/// cancellation, attachments contributed by the template are released and
/// `externals` are returned inside the error without being released.
pub async fn build_body(
    template: &dyn Template,
    recipients: &[Mailbox],
    data: Option<&Value>,
    externals: Vec<Attachment>,
    cancel: &CancellationToken,
) -> Result<MessageBody, BodyBuildError> {
    let rendered = cancel
        .run(template.build_plain_message(recipients, data))
        .await;
    let text = match rendered {
        Some(Ok(text)) => text,
        Some(Err(e)) => {
            return Err(BodyBuildError {
                source: e.into(),
                externals,
            })
        }
        None => {
            return Err(BodyBuildError {
                source: BodyError::Cancelled,
                externals,
            })
        }
    };

    let mut set = AttachmentSet::from_externals(externals);

    let contributed = cancel
        .run(template.attachments(recipients, data, &mut set))
        .await;
    match contributed {
        Some(Ok(())) => {}
        Some(Err(e)) => return Err(set.abandon(e.into())),
        None => return Err(set.abandon(BodyError::Cancelled)),
    }

    finalize(text, set)
}

/// Turn the accumulated text and attachments into a body
fn finalize(text: Option<String>, set: AttachmentSet) -> Result<MessageBody, BodyBuildError> {
    if let Some(content_id) = duplicate_content_id(&set) {
        return Err(set.abandon(BodyError::DuplicateContentId(content_id)));
    }

    let rendered: Result<Vec<SinglePart>, BodyError> = set
        .iter()
        .map(|(_, a)| {
            a.to_part().map_err(|source| BodyError::InvalidContentType {
                name: a.name().to_string(),
                content_type: a.content_type().to_string(),
                source,
            })
        })
        .collect();

    let parts = match rendered {
        Ok(parts) => parts,
        Err(e) => return Err(set.abandon(e)),
    };

    let part = match (&text, parts.is_empty()) {
        (None, true) => BodyPart::Empty,
        (Some(text), true) => BodyPart::Single(SinglePart::plain(text.clone())),
        (text, false) => {
            let mut mixed = MultiPart::mixed().build();
            if let Some(text) = text {
                mixed = mixed.singlepart(SinglePart::plain(text.clone()));
            }
            for part in parts {
                mixed = mixed.singlepart(part);
            }
            BodyPart::Multi(mixed)
        }
    };

    Ok(MessageBody::new(text, part, set.into_attachments()))
}

fn duplicate_content_id(set: &AttachmentSet) -> Option<String> {
    let mut seen = HashSet::new();
    set.iter().find_map(|(_, a)| match a.disposition() {
        Disposition::Inline { content_id } if !seen.insert(content_id.as_str()) => {
            Some(content_id.clone())
        }
        _ => None,
    })
}
