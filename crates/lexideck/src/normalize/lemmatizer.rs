//! Lemmatizer seam.
//!
//! The "language model" is a form-to-lemma table loaded from a TSV file
//! with one `lemma<TAB>form` pair per line. Without a table the normalizer
//! runs degraded with the identity mapping.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

pub trait Lemmatizer: Send + Sync {
    /// Dictionary form of a single lowercase token, if known.
    fn lemma(&self, word: &str) -> Option<String>;

    /// False when no real model is loaded.
    fn is_available(&self) -> bool;
}

/// Stand-in used when no lemma table could be loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityLemmatizer;

impl Lemmatizer for IdentityLemmatizer {
    fn lemma(&self, _word: &str) -> Option<String> {
        None
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[derive(Debug, Default, Clone)]
pub struct TableLemmatizer {
    forms: HashMap<String, String>,
}

impl TableLemmatizer {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut forms = HashMap::new();
        for (lemma, form) in pairs {
            // First entry wins for ambiguous forms.
            forms
                .entry(form.into().to_lowercase())
                .or_insert_with(|| lemma.into().to_lowercase());
        }
        Self { forms }
    }

    /// Parses `lemma<TAB>form` lines. Blank lines, `#` comments and lines
    /// without a tab are skipped.
    pub fn from_tsv(content: &str) -> Self {
        let pairs = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let (lemma, form) = line.split_once('\t')?;
                let (lemma, form) = (lemma.trim(), form.trim());
                (!lemma.is_empty() && !form.is_empty()).then_some((lemma, form))
            });
        Self::from_pairs(pairs)
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_tsv(&content))
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

impl Lemmatizer for TableLemmatizer {
    fn lemma(&self, word: &str) -> Option<String> {
        self.forms.get(word).cloned()
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Loads the lemma table, falling back to the identity lemmatizer when the
/// path is unset, missing or unreadable.
pub fn load_lemmatizer(path: Option<&Path>) -> Arc<dyn Lemmatizer> {
    let Some(path) = path else {
        warn!("No lemma table configured, lemmatization is disabled");
        return Arc::new(IdentityLemmatizer);
    };

    match TableLemmatizer::from_file(path) {
        Ok(table) => {
            info!(path = %path.display(), forms = table.len(), "Loaded lemma table");
            Arc::new(table)
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to load lemma table, lemmatization is disabled"
            );
            Arc::new(IdentityLemmatizer)
        }
    }
}
