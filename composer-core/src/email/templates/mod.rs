//! Text email templates
//!
//! Provides simple variable substitution for email templates.
//! Variables are specified using {{variable_name}} syntax and are taken from
//! the JSON object passed as template data. Two variables are always
//! available: `recipient` (the address) and `recipient_name` (display name,
//! or the address when there is none).

use super::template::{AttachmentSet, Template, TemplateError};
use crate::domain::{Attachment, Culture};
use async_trait::async_trait;
use base64::Engine as _;
use lettre::message::Mailbox;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Template rendering engine with variable substitution
#[derive(Debug, Default)]
pub struct TemplateEngine {
    variables: HashMap<String, String>,
}

impl TemplateEngine {
    /// Create a new template engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine from recipients and template data.
    ///
    /// `data` must be a JSON object (or absent). Strings are used verbatim,
    /// `null` renders as an empty string and other values as JSON text.
    pub fn from_data(recipients: &[Mailbox], data: Option<&Value>) -> Result<Self, TemplateError> {
        let mut engine = Self::new();

        if let Some(recipient) = recipients.first() {
            let address = recipient.email.to_string();
            let name = recipient.name.clone().unwrap_or_else(|| address.clone());
            engine.set("recipient", address).set("recipient_name", name);
        }

        match data {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => {
                engine.set_all(map.iter().map(|(k, v)| (k.clone(), value_to_string(v))));
            }
            Some(other) => {
                return Err(TemplateError::InvalidData(format!(
                    "expected a JSON object, got {}",
                    json_kind(other)
                )))
            }
        }

        Ok(engine)
    }

    /// Set a variable value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Set multiple variables from an iterator
    pub fn set_all<I, K, V>(&mut self, iter: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in iter {
            self.variables.insert(k.into(), v.into());
        }
        self
    }

    /// Render a template string, replacing {{variable}} with values.
    ///
    /// Unknown variables are left as-is.
    pub fn render(&self, template: &str) -> String {
        self.substitute(template, false)
            .unwrap_or_else(|_| template.to_string())
    }

    /// Render a template string, failing on the first unknown variable
    pub fn render_strict(&self, template: &str) -> Result<String, TemplateError> {
        self.substitute(template, true)
    }

    // Single pass, so values containing `{{...}}` are never expanded again.
    fn substitute(&self, template: &str, strict: bool) -> Result<String, TemplateError> {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let Some(end) = after.find("}}") else {
                rest = &rest[start..];
                break;
            };

            let key = after[..end].trim();
            match self.variables.get(key) {
                Some(value) => result.push_str(value),
                None if strict => return Err(TemplateError::MissingVariable(key.to_string())),
                None => result.push_str(&rest[start..start + 2 + end + 2]),
            }
            rest = &after[end + 2..];
        }

        result.push_str(rest);
        Ok(result)
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A fixed attachment contributed by a template (a logo, terms of service, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateAsset {
    pub name: String,
    pub content_type: String,
    /// Embed inline with `name` as Content-ID instead of attaching
    pub inline: bool,
    pub content: Vec<u8>,
}

impl TemplateAsset {
    /// Create a fresh attachment resource for one message
    fn to_attachment(&self) -> Attachment {
        if self.inline {
            Attachment::inline(self.name.clone(), self.content_type.clone(), self.content.clone())
        } else {
            Attachment::new(self.name.clone(), self.content_type.clone(), self.content.clone())
        }
    }
}

/// Serialized form of a [`TextTemplate`], as found in a template catalogue
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateDefinition {
    pub id: String,
    #[serde(default)]
    pub culture: Culture,
    pub sender: String,
    pub subject: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub assets: Vec<AssetDefinition>,
}

/// Serialized form of a [`TemplateAsset`] with base64 content
#[derive(Debug, Clone, Deserialize)]
pub struct AssetDefinition {
    pub name: String,
    pub content_type: String,
    #[serde(default)]
    pub inline: bool,
    pub content_base64: String,
}

/// Template whose subject and plain text are `{{variable}}` strings
#[derive(Debug, Clone)]
pub struct TextTemplate {
    culture: Culture,
    sender: Mailbox,
    subject: String,
    text: Option<String>,
    assets: Vec<TemplateAsset>,
}

impl TextTemplate {
    pub fn new(culture: Culture, sender: Mailbox, subject: impl Into<String>) -> Self {
        Self {
            culture,
            sender,
            subject: subject.into(),
            text: None,
            assets: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_asset(mut self, asset: TemplateAsset) -> Self {
        self.assets.push(asset);
        self
    }

    /// Build a template from its catalogue definition
    pub fn from_definition(definition: &TemplateDefinition) -> Result<Self, TemplateError> {
        let sender: Mailbox = definition.sender.parse().map_err(|e| {
            TemplateError::InvalidData(format!(
                "invalid sender {:?} for template {}: {}",
                definition.sender, definition.id, e
            ))
        })?;

        let mut template = Self::new(definition.culture.clone(), sender, &definition.subject);
        template.text = definition.text.clone();

        for asset in &definition.assets {
            let content = base64::engine::general_purpose::STANDARD
                .decode(&asset.content_base64)
                .map_err(|e| {
                    TemplateError::AttachmentUnavailable(format!(
                        "asset {} of template {}: {}",
                        asset.name, definition.id, e
                    ))
                })?;
            template.assets.push(TemplateAsset {
                name: asset.name.clone(),
                content_type: asset.content_type.clone(),
                inline: asset.inline,
                content,
            });
        }

        Ok(template)
    }
}

#[async_trait]
impl Template for TextTemplate {
    fn culture(&self) -> &Culture {
        &self.culture
    }

    fn sender(&self) -> &Mailbox {
        &self.sender
    }

    async fn build_subject(
        &self,
        recipients: &[Mailbox],
        data: Option<&Value>,
    ) -> Result<String, TemplateError> {
        TemplateEngine::from_data(recipients, data)?.render_strict(&self.subject)
    }

    async fn build_plain_message(
        &self,
        recipients: &[Mailbox],
        data: Option<&Value>,
    ) -> Result<Option<String>, TemplateError> {
        let Some(text) = &self.text else {
            return Ok(None);
        };
        TemplateEngine::from_data(recipients, data)?
            .render_strict(text)
            .map(Some)
    }

    async fn attachments(
        &self,
        _recipients: &[Mailbox],
        _data: Option<&Value>,
        set: &mut AttachmentSet,
    ) -> Result<(), TemplateError> {
        for asset in &self.assets {
            set.push(asset.to_attachment());
        }
        Ok(())
    }
}
