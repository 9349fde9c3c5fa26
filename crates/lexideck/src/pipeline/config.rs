use std::collections::HashSet;
use std::time::Duration;

use crate::config::Config;
use crate::record::SearchTerm;
use crate::sources::{FetchRequest, SourceId};

pub struct PipelineConfig {
    pub from_lang: String,
    pub to_lang: String,
    /// Merge order of the partial records.
    pub priority: Vec<SourceId>,
    pub required: HashSet<SourceId>,
    /// Upper bound for a single adapter call.
    pub request_timeout: Duration,
    pub highlight_examples: bool,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            from_lang: config.from_lang.clone(),
            to_lang: config.to_lang.clone(),
            priority: config.priority(),
            required: config
                .sources
                .iter()
                .filter(|s| s.required)
                .map(|s| SourceId::new(&s.name))
                .collect(),
            request_timeout: Duration::from_secs(config.http.timeout_secs),
            highlight_examples: config.highlight_examples,
        }
    }

    pub fn is_required(&self, source: &SourceId) -> bool {
        self.required.contains(source)
    }

    pub fn request(&self, phrase: SearchTerm) -> FetchRequest {
        FetchRequest::new(phrase, &self.from_lang, &self.to_lang)
    }

    /// Position of a source in the priority list; unknown sources sort last.
    pub fn rank(&self, source: &SourceId) -> usize {
        self.priority
            .iter()
            .position(|s| s == source)
            .unwrap_or(self.priority.len())
    }
}
