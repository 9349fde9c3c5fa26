use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::normalize::NormalizeOptions;
use crate::sources::{SourceId, SourceSettings};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_from_lang")]
    pub from_lang: String,
    #[serde(default = "default_to_lang")]
    pub to_lang: String,
    /// Adapters in priority order.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub normalize: NormalizeOptions,
    /// TSV file with `lemma<TAB>form` lines.
    #[serde(default)]
    pub lemma_table: Option<String>,
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_true")]
    pub highlight_examples: bool,
}

fn default_true() -> bool {
    true
}

fn default_from_lang() -> String {
    "pt".to_string()
}

fn default_to_lang() -> String {
    "de".to_string()
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new("linguee").required(),
        SourceConfig::new("reverso"),
        SourceConfig::new("dicio"),
        SourceConfig::new("images"),
    ]
}

impl Config {
    /// Source ids in configured priority order.
    pub fn priority(&self) -> Vec<SourceId> {
        self.sources.iter().map(|s| SourceId::new(&s.name)).collect()
    }

    pub fn lemma_table_path(&self) -> Option<PathBuf> {
        self.lemma_table.as_deref().map(expand_home)
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path
            .as_deref()
            .map(expand_home)
            .or_else(crate::db::default_database_path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            from_lang: default_from_lang(),
            to_lang: default_to_lang(),
            sources: default_sources(),
            http: HttpSettings::default(),
            normalize: NormalizeOptions::default(),
            lemma_table: None,
            database_path: None,
            highlight_examples: true,
        }
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// A failure of a required source fails the whole phrase.
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub settings: SourceSettings,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            settings: SourceSettings::default(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_referrer")]
    pub referrer: Option<String>,
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0".to_string()
}

fn default_referrer() -> Option<String> {
    Some("https://google.com".to_string())
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
            referrer: default_referrer(),
        }
    }
}
