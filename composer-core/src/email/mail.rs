//! Email trait implemented by each kind of notification

use crate::domain::Attachment;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

/// One kind of email (welcome, password reset, invoice, ...).
///
/// Data and attachments are produced lazily when the email is composed.
/// Attachments returned from [`Email::attachments`] belong to the composer
/// from then on; if producing them fails, anything produced so far stays
/// with (and is released by) the implementation.
#[async_trait]
pub trait Email: Send + Sync {
    type TemplateId: Send + Sync;

    fn template_id(&self) -> &Self::TemplateId;

    /// Data to inject into the template; `None` when there is none
    async fn data(&self) -> anyhow::Result<Option<Value>> {
        Ok(None)
    }

    async fn attachments(&self) -> anyhow::Result<Vec<Attachment>> {
        Ok(Vec::new())
    }
}

/// A file on disk to attach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSource {
    pub path: PathBuf,
    pub content_type: String,
    /// Name shown to the recipient; defaults to the file name of `path`
    pub filename: Option<String>,
}

impl AttachmentSource {
    pub fn new(path: impl Into<PathBuf>, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content_type: content_type.into(),
            filename: None,
        }
    }

    fn display_name(&self) -> String {
        self.filename.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string())
        })
    }

    async fn load(&self) -> anyhow::Result<Attachment> {
        let content = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read attachment {}", self.path.display()))?;
        Ok(Attachment::new(
            self.display_name(),
            self.content_type.clone(),
            content,
        ))
    }
}

impl std::str::FromStr for AttachmentSource {
    type Err = std::convert::Infallible;

    /// Parse `path` or `path:type/subtype`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once(':') {
            Some((path, content_type)) if !path.is_empty() && content_type.contains('/') => {
                Ok(Self::new(path, content_type))
            }
            _ => Ok(Self::new(s, "application/octet-stream")),
        }
    }
}

/// General-purpose email for callers without a dedicated type
#[derive(Debug, Clone)]
pub struct BasicEmail<I = String> {
    template_id: I,
    data: Option<Value>,
    attachments: Vec<AttachmentSource>,
}

impl<I> BasicEmail<I> {
    pub fn new(template_id: I) -> Self {
        Self {
            template_id,
            data: None,
            attachments: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_attachment(mut self, source: AttachmentSource) -> Self {
        self.attachments.push(source);
        self
    }
}

#[async_trait]
impl<I: Send + Sync> Email for BasicEmail<I> {
    type TemplateId = I;

    fn template_id(&self) -> &I {
        &self.template_id
    }

    async fn data(&self) -> anyhow::Result<Option<Value>> {
        Ok(self.data.clone())
    }

    async fn attachments(&self) -> anyhow::Result<Vec<Attachment>> {
        let mut loaded = Vec::with_capacity(self.attachments.len());
        for source in &self.attachments {
            loaded.push(source.load().await?);
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_attachment_source() {
        let source: AttachmentSource = "report.pdf:application/pdf".parse().unwrap();
        assert_eq!(source.path, PathBuf::from("report.pdf"));
        assert_eq!(source.content_type, "application/pdf");

        let source: AttachmentSource = "notes.txt".parse().unwrap();
        assert_eq!(source.content_type, "application/octet-stream");

        let source: AttachmentSource = "C:\\data\\a.bin".parse().unwrap();
        assert_eq!(source.path, PathBuf::from("C:\\data\\a.bin"));
    }

    #[test]
    fn test_display_name_defaults_to_file_name() {
        let source = AttachmentSource::new("/tmp/dir/invoice.pdf", "application/pdf");
        assert_eq!(source.display_name(), "invoice.pdf");

        let source = AttachmentSource {
            filename: Some("renamed.pdf".to_string()),
            ..source
        };
        assert_eq!(source.display_name(), "renamed.pdf");
    }

    #[tokio::test]
    async fn test_basic_email_defaults() {
        let email = BasicEmail::new("welcome".to_string());
        assert_eq!(email.template_id(), "welcome");
        assert!(email.data().await.unwrap().is_none());
        assert!(email.attachments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_basic_email_loads_files() {
        let path = std::env::temp_dir().join(format!("composer-{}.txt", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"hello").await.unwrap();

        let email = BasicEmail::new(42u32)
            .with_data(json!({ "name": "Ada" }))
            .with_attachment(AttachmentSource::new(&path, "text/plain"));

        let attachments = email.attachments().await.unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].content(), b"hello");
        assert_eq!(email.data().await.unwrap(), Some(json!({ "name": "Ada" })));

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_basic_email_missing_file_fails() {
        let email = BasicEmail::new("x".to_string())
            .with_attachment(AttachmentSource::new("/nonexistent/file.bin", "application/pdf"));

        let err = email.attachments().await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/file.bin"));
    }
}
