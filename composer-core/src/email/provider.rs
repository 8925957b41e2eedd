//! Template provider trait

use super::template::Template;
use crate::domain::Culture;
use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::sync::Arc;

/// Resolves a template identifier and culture to a [`Template`].
///
/// When no template exists for the exact culture, the provider decides the
/// fallback policy: it may return a template for another culture (whose
/// [`Template::culture`] must then report that culture), or `Ok(None)`.
/// `Err` is reserved for lookup failures such as storage I/O.
#[async_trait]
pub trait TemplateProvider: Send + Sync {
    /// Template identifier type (a string, a number, an application enum, ...)
    type Id: Debug + Display + Send + Sync;

    async fn resolve(
        &self,
        id: &Self::Id,
        culture: &Culture,
    ) -> anyhow::Result<Option<Arc<dyn Template>>>;
}
