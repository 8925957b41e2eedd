//! Attachment resources and their release lifecycle

use lettre::message::header::{ContentType, ContentTypeErr};
use lettre::message::SinglePart;
use uuid::Uuid;

/// Callback invoked exactly once when an attachment is released
pub type ReleaseHook = Box<dyn FnOnce(&Attachment) + Send + Sync>;

/// How an attachment is presented in the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Regular attachment with a file name
    Attachment { filename: String },
    /// Inline resource referenced by `cid:` from the body
    Inline { content_id: String },
}

/// A binary MIME resource with single-owner semantics.
///
/// Releasing happens when the value is dropped (or explicitly through
/// [`Attachment::release`]). Whoever holds the value owns it; moving it moves
/// the responsibility to release it.
pub struct Attachment {
    id: Uuid,
    disposition: Disposition,
    content_type: String,
    content: Vec<u8>,
    on_release: Option<ReleaseHook>,
}

impl Attachment {
    /// Create a regular (`Content-Disposition: attachment`) attachment
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self::with_disposition(
            Disposition::Attachment {
                filename: filename.into(),
            },
            content_type,
            content,
        )
    }

    /// Create an inline attachment addressed by Content-ID
    pub fn inline(
        content_id: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self::with_disposition(
            Disposition::Inline {
                content_id: content_id.into(),
            },
            content_type,
            content,
        )
    }

    fn with_disposition(
        disposition: Disposition,
        content_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            disposition,
            content_type: content_type.into(),
            content: content.into(),
            on_release: None,
        }
    }

    /// Register a callback that runs when this attachment is released
    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&Attachment) + Send + Sync + 'static,
    {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// Identity of this resource; two attachments are the same resource
    /// only when their ids are equal.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn disposition(&self) -> &Disposition {
        &self.disposition
    }

    /// File name or Content-ID, whichever applies
    pub fn name(&self) -> &str {
        match &self.disposition {
            Disposition::Attachment { filename } => filename,
            Disposition::Inline { content_id } => content_id,
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Release the resource now
    pub fn release(self) {
        drop(self);
    }

    /// Render this attachment as a MIME part.
    ///
    /// The attachment itself is not consumed; the caller decides who keeps
    /// ownership of the resource.
    pub(crate) fn to_part(&self) -> Result<SinglePart, ContentTypeErr> {
        let content_type = ContentType::parse(&self.content_type)?;
        let builder = match &self.disposition {
            Disposition::Attachment { filename } => {
                lettre::message::Attachment::new(filename.clone())
            }
            Disposition::Inline { content_id } => {
                lettre::message::Attachment::new_inline(content_id.clone())
            }
        };
        Ok(builder.body(self.content.clone(), content_type))
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        tracing::trace!(attachment_id = %self.id, name = %self.name(), "Attachment released");
        metrics::counter!("composer_attachments_released_total").increment(1);

        if let Some(hook) = self.on_release.take() {
            hook(self);
        }
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("id", &self.id)
            .field("disposition", &self.disposition)
            .field("content_type", &self.content_type)
            .field("len", &self.content.len())
            .finish()
    }
}

/// Release every attachment in `attachments`, returning how many were released
pub fn release_all(attachments: impl IntoIterator<Item = Attachment>) -> usize {
    let mut released = 0;
    for attachment in attachments {
        attachment.release();
        released += 1;
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_release_hook_runs_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();

        let attachment = Attachment::new("report.pdf", "application/pdf", vec![1, 2, 3])
            .on_release(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        assert_eq!(released.load(Ordering::SeqCst), 0);

        attachment.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hook_sees_attachment() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let slot = seen.clone();

        let attachment = Attachment::inline("logo", "image/png", b"png".to_vec()).on_release(
            move |a| {
                *slot.lock().unwrap() = Some(a.name().to_string());
            },
        );
        let id = attachment.id();
        drop(attachment);

        assert_eq!(seen.lock().unwrap().as_deref(), Some("logo"));
        assert!(!id.is_nil());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Attachment::new("a.txt", "text/plain", "a");
        let b = Attachment::new("a.txt", "text/plain", "a");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_to_part_rejects_bad_content_type() {
        let attachment = Attachment::new("a.bin", "not a mime type", vec![0u8]);
        assert!(attachment.to_part().is_err());

        let attachment = Attachment::new("a.txt", "text/plain", "hello");
        assert!(attachment.to_part().is_ok());
    }

    #[test]
    fn test_release_all_counts() {
        let attachments = vec![
            Attachment::new("a.txt", "text/plain", "a"),
            Attachment::new("b.txt", "text/plain", "b"),
        ];
        assert_eq!(release_all(attachments), 2);
    }

    #[test]
    fn test_debug_hides_content() {
        let attachment = Attachment::new("secret.txt", "text/plain", "top secret");
        let debug = format!("{:?}", attachment);
        assert!(debug.contains("secret.txt"));
        assert!(!debug.contains("top secret"));
    }
}
