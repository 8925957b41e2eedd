//! In-memory template provider with culture fallback

use super::provider::TemplateProvider;
use super::template::Template;
use super::templates::{TemplateDefinition, TextTemplate};
use crate::domain::Culture;
use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::path::Path;
use std::sync::Arc;

/// Templates registered per identifier and culture.
///
/// Resolution tries the requested culture, then each parent culture
/// (`fr-CA` -> `fr` -> invariant). Culture matching ignores ASCII case.
pub struct StaticTemplateProvider<I = String> {
    templates: HashMap<(I, String), Arc<dyn Template>>,
}

impl<I: Debug> Debug for StaticTemplateProvider<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTemplateProvider")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<I> Default for StaticTemplateProvider<I> {
    fn default() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }
}

fn culture_key(culture: &Culture) -> String {
    culture.as_str().to_ascii_lowercase()
}

impl<I: Eq + Hash + Clone> StaticTemplateProvider<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `template` under `id` for the template's own culture,
    /// replacing any previous registration.
    pub fn insert(&mut self, id: I, template: Arc<dyn Template>) -> &mut Self {
        let key = (id, culture_key(template.culture()));
        self.templates.insert(key, template);
        self
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    fn lookup(&self, id: &I, culture: &Culture) -> Option<Arc<dyn Template>> {
        culture
            .lineage()
            .find_map(|c| self.templates.get(&(id.clone(), culture_key(&c))).cloned())
    }
}

impl StaticTemplateProvider<String> {
    /// Build a provider from catalogue definitions
    pub fn from_definitions(definitions: &[TemplateDefinition]) -> anyhow::Result<Self> {
        let mut provider = Self::new();
        for definition in definitions {
            let template = TextTemplate::from_definition(definition)
                .with_context(|| format!("Invalid template {}", definition.id))?;
            provider.insert(definition.id.clone(), Arc::new(template));
        }
        Ok(provider)
    }

    /// Load a JSON catalogue (an array of template definitions)
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read template catalogue {}", path.display()))?;
        let definitions: Vec<TemplateDefinition> = serde_json::from_slice(&raw)
            .with_context(|| format!("Invalid template catalogue {}", path.display()))?;

        let provider = Self::from_definitions(&definitions)?;
        tracing::info!(
            templates = provider.len(),
            path = %path.display(),
            "Loaded template catalogue"
        );
        Ok(provider)
    }
}

#[async_trait]
impl<I> TemplateProvider for StaticTemplateProvider<I>
where
    I: Eq + Hash + Clone + Debug + Display + Send + Sync,
{
    type Id = I;

    async fn resolve(
        &self,
        id: &I,
        culture: &Culture,
    ) -> anyhow::Result<Option<Arc<dyn Template>>> {
        let template = self.lookup(id, culture);

        if let Some(template) = &template {
            if !template.culture().matches(culture) {
                tracing::debug!(
                    template_id = %id,
                    requested = %culture,
                    resolved = %template.culture(),
                    "Falling back to less specific template culture"
                );
            }
        }

        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn template(culture: &str, subject: &str) -> Arc<dyn Template> {
        Arc::new(TextTemplate::new(
            culture.parse().unwrap(),
            "noreply@example.com".parse().unwrap(),
            subject,
        ))
    }

    fn provider() -> StaticTemplateProvider<u32> {
        let mut provider = StaticTemplateProvider::new();
        provider
            .insert(42, template("", "invariant"))
            .insert(42, template("fr", "fr"))
            .insert(42, template("fr-CA", "fr-CA"))
            .insert(7, template("de-DE", "de-DE"));
        provider
    }

    #[rstest]
    #[case(42, "fr-CA", Some("fr-CA"))]
    #[case(42, "FR-ca", Some("fr-CA"))]
    #[case(42, "fr-FR", Some("fr"))]
    #[case(42, "ja-JP", Some(""))]
    #[case(42, "", Some(""))]
    #[case(7, "de-DE", Some("de-DE"))]
    #[case(7, "de-AT", None)]
    #[case(99, "en", None)]
    #[tokio::test]
    async fn test_resolve_with_fallback(
        #[case] id: u32,
        #[case] requested: &str,
        #[case] expected: Option<&str>,
    ) {
        let provider = provider();
        let culture: Culture = requested.parse().unwrap();

        let resolved = provider.resolve(&id, &culture).await.unwrap();
        assert_eq!(
            resolved.as_ref().map(|t| t.culture().as_str()),
            expected
        );
    }

    #[test]
    fn test_debug_lists_registered_keys() {
        let mut provider = StaticTemplateProvider::new();
        provider.insert("welcome".to_string(), template("fr-CA", "fr-CA"));

        let debug = format!("{:?}", provider);
        assert!(debug.contains("StaticTemplateProvider"));
        assert!(debug.contains("(\"welcome\", \"fr-ca\")"));
    }

    #[tokio::test]
    async fn test_insert_replaces() {
        let mut provider = StaticTemplateProvider::new();
        provider.insert("a".to_string(), template("en", "one"));
        provider.insert("a".to_string(), template("EN", "two"));
        assert_eq!(provider.len(), 1);
    }

    #[tokio::test]
    async fn test_load_catalogue() {
        let path = std::env::temp_dir().join(format!("templates-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(
            &path,
            r#"[
                {"id": "welcome", "culture": "en", "sender": "noreply@example.com", "subject": "Hi"},
                {"id": "welcome", "sender": "noreply@example.com", "subject": "Hello"}
            ]"#,
        )
        .await
        .unwrap();

        let provider = StaticTemplateProvider::load(&path).await.unwrap();
        assert_eq!(provider.len(), 2);

        let resolved = provider
            .resolve(&"welcome".to_string(), &"en-GB".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.culture().as_str(), "en");

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_catalogue() {
        let path = std::env::temp_dir().join(format!("templates-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, r#"[{"id": "x", "sender": "bad", "subject": "s"}]"#)
            .await
            .unwrap();

        let err = StaticTemplateProvider::load(&path).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid template x"));

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
