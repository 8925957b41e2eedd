//! Unified error handling for the email composer

use crate::domain::{Attachment, Culture};
use crate::email::{BodyError, EmailSenderError, TemplateError};
use thiserror::Error;

/// Composer-wide result type
pub type Result<T> = std::result::Result<T, ComposeError>;

/// Step of a compose operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeStage {
    ParseRecipient,
    ResolveTemplate,
    FetchData,
    FetchAttachments,
    BuildSubject,
    BuildBody,
    Send,
}

impl std::fmt::Display for ComposeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ParseRecipient => "parse_recipient",
            Self::ResolveTemplate => "resolve_template",
            Self::FetchData => "fetch_data",
            Self::FetchAttachments => "fetch_attachments",
            Self::BuildSubject => "build_subject",
            Self::BuildBody => "build_body",
            Self::Send => "send",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of a failed compose.
///
/// Whatever the variant, the composer has already released every resource it
/// owned. Variants that carry `attachments` hand back attachments the
/// composer never took ownership of; dropping the error releases them.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Invalid recipient {address:?}: {reason}")]
    InvalidRecipient { address: String, reason: String },

    #[error("No template with identifier {template_id} and culture {culture}")]
    TemplateNotFound {
        template_id: String,
        culture: Culture,
    },

    #[error("Template lookup failed: {0}")]
    TemplateLookupFailed(#[source] anyhow::Error),

    #[error("Failed to get template data: {0}")]
    DataRetrievalFailed(#[source] anyhow::Error),

    #[error("Failed to get attachments: {0}")]
    AttachmentRetrievalFailed(#[source] anyhow::Error),

    #[error("Failed to build subject: {0}")]
    SubjectBuildFailed(#[source] TemplateError),

    #[error("Failed to build body: {source}")]
    BodyBuildFailed {
        #[source]
        source: BodyError,
        attachments: Vec<Attachment>,
    },

    #[error("Delivery failed: {0}")]
    DeliveryFailed(#[source] EmailSenderError),

    #[error("Compose cancelled during {stage}")]
    Cancelled {
        stage: ComposeStage,
        attachments: Vec<Attachment>,
    },
}

impl ComposeError {
    /// Stage at which the compose failed
    pub fn stage(&self) -> ComposeStage {
        match self {
            Self::InvalidRecipient { .. } => ComposeStage::ParseRecipient,
            Self::TemplateNotFound { .. } | Self::TemplateLookupFailed(_) => {
                ComposeStage::ResolveTemplate
            }
            Self::DataRetrievalFailed(_) => ComposeStage::FetchData,
            Self::AttachmentRetrievalFailed(_) => ComposeStage::FetchAttachments,
            Self::SubjectBuildFailed(_) => ComposeStage::BuildSubject,
            Self::BodyBuildFailed { .. } => ComposeStage::BuildBody,
            Self::DeliveryFailed(_) => ComposeStage::Send,
            Self::Cancelled { stage, .. } => *stage,
        }
    }

    /// Short label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRecipient { .. } => "invalid_recipient",
            Self::TemplateNotFound { .. } => "template_not_found",
            Self::TemplateLookupFailed(_) => "template_lookup_failed",
            Self::DataRetrievalFailed(_) => "data_retrieval_failed",
            Self::AttachmentRetrievalFailed(_) => "attachment_retrieval_failed",
            Self::SubjectBuildFailed(_) => "subject_build_failed",
            Self::BodyBuildFailed { .. } => "body_build_failed",
            Self::DeliveryFailed(_) => "delivery_failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Attachments handed back to the caller, if any
    pub fn attachments(&self) -> &[Attachment] {
        match self {
            Self::BodyBuildFailed { attachments, .. } | Self::Cancelled { attachments, .. } => {
                attachments
            }
            _ => &[],
        }
    }

    /// Take ownership of the attachments handed back to the caller
    pub fn into_attachments(self) -> Vec<Attachment> {
        match self {
            Self::BodyBuildFailed { attachments, .. } | Self::Cancelled { attachments, .. } => {
                attachments
            }
            _ => Vec::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
