//! Composer Core - templated email composition
//!
//! Resolves a template for an email identifier and culture, renders the
//! subject and body, transfers attachment ownership into the message and
//! hands the result to a pluggable sender.

pub mod cancellation;
pub mod config;
pub mod domain;
pub mod email;
pub mod error;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use cancellation::{CancellationSource, CancellationToken};
pub use config::Config;
pub use domain::{Attachment, ComposedMessage, Culture};
pub use email::{Email, EmailSender, Template, TemplateProvider};
pub use error::{ComposeError, ComposeStage, Result};
pub use service::EmailComposer;
