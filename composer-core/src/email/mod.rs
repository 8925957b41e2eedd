//! Email composition building blocks
//!
//! - [`Email`]: what the application wants to send
//! - [`TemplateProvider`] / [`Template`]: how it is rendered per culture
//! - [`EmailSender`]: how the finished message is delivered (SMTP via lettre)

pub mod mail;
pub mod provider;
pub mod sender;
pub mod smtp;
pub mod static_provider;
pub mod template;
pub mod templates;

pub use mail::{AttachmentSource, BasicEmail, Email};
pub use provider::TemplateProvider;
pub use sender::{EmailSender, EmailSenderError};
pub use smtp::SmtpSender;
pub use static_provider::StaticTemplateProvider;
pub use template::{
    build_body, AttachmentSet, BodyBuildError, BodyError, Origin, Template, TemplateError,
};
pub use templates::{TemplateAsset, TemplateDefinition, TemplateEngine, TextTemplate};
