use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::adapter::SourceAdapter;
use super::{dicio, images, linguee, reverso};
use crate::error::ConfigError;

/// Per-source overrides taken from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Site used for auxiliary lookups such as spelling suggestions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

type Factory = Box<dyn Fn(&SourceSettings) -> Box<dyn SourceAdapter> + Send + Sync>;

/// Maps source names to adapter factories.
pub struct SourceRegistry {
    factories: BTreeMap<String, Factory>,
}

impl SourceRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// All built-in adapters.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("linguee", |s| Box::new(linguee::LingueeAdapter::new(s)));
        registry.register("reverso", |s| Box::new(reverso::ReversoAdapter::new(s)));
        registry.register("dicio", |s| Box::new(dicio::DicioAdapter::new(s)));
        registry.register("images", |s| Box::new(images::ImageAdapter::new(s)));
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&SourceSettings) -> Box<dyn SourceAdapter> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn build(
        &self,
        name: &str,
        settings: &SourceSettings,
    ) -> Result<Box<dyn SourceAdapter>, ConfigError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownSource {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
        Ok(factory(settings))
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
