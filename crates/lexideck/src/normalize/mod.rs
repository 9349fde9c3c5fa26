//! Normalization filter applied to raw words before they are queued.
//!
//! Words are cleaned (edge punctuation, case), de-duplicated and mapped to
//! their lemma. Words whose lemma equals the cleaned word are accepted as
//! is; the others are returned as suggestions for the user to confirm.

pub mod highlight;
pub mod lemmatizer;
pub mod punctuation;

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

pub use highlight::tag_word;
pub use lemmatizer::{load_lemmatizer, IdentityLemmatizer, Lemmatizer, TableLemmatizer};
pub use punctuation::strip_punctuation;

static RE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").unwrap());

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    #[serde(default = "default_true")]
    pub remove_punctuation: bool,

    #[serde(default = "default_true")]
    pub lower_case: bool,

    #[serde(default = "default_true")]
    pub lemmatize: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            remove_punctuation: true,
            lower_case: true,
            lemmatize: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOutcome {
    /// Words already in dictionary form, in input order.
    pub unchanged: Vec<String>,

    /// Cleaned word -> proposed lemma.
    pub suggestions: BTreeMap<String, String>,

    /// True when lemmatization was requested but no model is loaded.
    pub degraded: bool,
}

pub struct Normalizer {
    options: NormalizeOptions,
    lemmatizer: Arc<dyn Lemmatizer>,
}

impl Normalizer {
    pub fn new(options: NormalizeOptions, lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        Self {
            options,
            lemmatizer,
        }
    }

    pub fn options(&self) -> NormalizeOptions {
        self.options
    }

    pub fn is_degraded(&self) -> bool {
        self.options.lemmatize && !self.lemmatizer.is_available()
    }

    /// Strips punctuation and folds case according to the options.
    pub fn clean(&self, word: &str) -> String {
        let word = if self.options.remove_punctuation {
            strip_punctuation(word)
        } else {
            word
        };
        if self.options.lower_case {
            word.to_lowercase()
        } else {
            word.to_string()
        }
    }

    /// Lemma of a cleaned word or phrase. Phrases are lemmatized token by
    /// token, keeping the original whitespace.
    pub fn lemma(&self, cleaned: &str) -> String {
        if !self.options.lemmatize {
            return cleaned.to_string();
        }
        RE_TOKEN
            .replace_all(cleaned, |caps: &Captures<'_>| {
                let token = &caps[0];
                self.lemmatizer
                    .lemma(&token.to_lowercase())
                    .unwrap_or_else(|| token.to_string())
            })
            .into_owned()
    }

    pub fn normalize<I, S>(&self, words: I) -> NormalizeOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut mapping = Vec::new();
        for word in words {
            let cleaned = self.clean(word.as_ref());
            if cleaned.is_empty() || !seen.insert(cleaned.clone()) {
                continue;
            }
            let lemma = self.lemma(&cleaned);
            mapping.push((cleaned, lemma));
        }

        let (unchanged, suggestions) = pop_unchanged(mapping);
        let outcome = NormalizeOutcome {
            unchanged,
            suggestions,
            degraded: self.is_degraded(),
        };

        tracing::debug!(
            unchanged = outcome.unchanged.len(),
            suggestions = outcome.suggestions.len(),
            degraded = outcome.degraded,
            "Normalized word list"
        );
        outcome
    }
}

/// Splits a word -> lemma mapping into unchanged words, in mapping order,
/// and suggestions.
pub fn pop_unchanged<I, K, V>(mapping: I) -> (Vec<String>, BTreeMap<String, String>)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut unchanged = Vec::new();
    let mut suggestions = BTreeMap::new();
    for (word, lemma) in mapping {
        let (word, lemma) = (word.as_ref(), lemma.as_ref());
        if word == lemma {
            unchanged.push(word.to_string());
        } else {
            suggestions.insert(word.to_string(), lemma.to_string());
        }
    }
    (unchanged, suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Arc<dyn Lemmatizer> {
        Arc::new(TableLemmatizer::from_pairs([
            ("deixar", "deixa"),
            ("começar", "começou"),
            ("dar", "deu"),
        ]))
    }

    fn normalizer(options: NormalizeOptions) -> Normalizer {
        Normalizer::new(options, table())
    }

    #[test]
    fn test_pop_unchanged() {
        let mapping = BTreeMap::from([
            ("aguento".to_string(), "aguento".to_string()),
            ("deixa".to_string(), "deixar".to_string()),
        ]);
        let (unchanged, suggestions) = pop_unchanged(&mapping);
        assert_eq!(unchanged, vec!["aguento"]);
        assert_eq!(
            suggestions,
            BTreeMap::from([("deixa".to_string(), "deixar".to_string())])
        );
    }

    #[test]
    fn test_pop_unchanged_keeps_mapping_order() {
        let (unchanged, suggestions) =
            pop_unchanged([("mesa", "mesa"), ("deu", "dar"), ("casa", "casa")]);
        assert_eq!(unchanged, vec!["mesa", "casa"]);
        assert_eq!(suggestions.len(), 1);
    }

    #[test]
    fn test_normalize_splits_unchanged_and_suggestions() {
        let outcome = normalizer(NormalizeOptions::default()).normalize(["Aguento,", "deixa!"]);
        assert_eq!(outcome.unchanged, vec!["aguento"]);
        assert_eq!(
            outcome.suggestions,
            BTreeMap::from([("deixa".to_string(), "deixar".to_string())])
        );
        assert!(!outcome.degraded);
    }

    #[test]
    fn test_empty_and_duplicate_words_collapse() {
        let outcome = normalizer(NormalizeOptions::default())
            .normalize(["casa", "", "?!", "Casa.", "casa", "mesa"]);
        assert_eq!(outcome.unchanged, vec!["casa", "mesa"]);
        assert!(outcome.suggestions.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let outcome = normalizer(NormalizeOptions::default()).normalize(Vec::<String>::new());
        assert_eq!(outcome, NormalizeOutcome::default());
    }

    #[test]
    fn test_normalize_is_idempotent_on_unchanged() {
        let n = normalizer(NormalizeOptions::default());
        let first = n.normalize(["“Casa”", "deixa", "Mesa;", "começou"]);
        let second = n.normalize(&first.unchanged);
        assert_eq!(second.unchanged, first.unchanged);
        assert!(second.suggestions.is_empty());
    }

    #[test]
    fn test_phrases_are_lemmatized_per_token() {
        let outcome = normalizer(NormalizeOptions::default()).normalize(["deu  certo"]);
        assert_eq!(
            outcome.suggestions.get("deu  certo").map(String::as_str),
            Some("dar  certo")
        );
    }

    #[test]
    fn test_options_disable_steps_independently() {
        let options = NormalizeOptions {
            remove_punctuation: false,
            lower_case: false,
            lemmatize: false,
        };
        let outcome = normalizer(options).normalize(["Deixa!", "deixa"]);
        assert_eq!(outcome.unchanged, vec!["Deixa!", "deixa"]);
        assert!(outcome.suggestions.is_empty());

        let options = NormalizeOptions {
            lemmatize: false,
            ..Default::default()
        };
        let outcome = normalizer(options).normalize(["Deixa!"]);
        assert_eq!(outcome.unchanged, vec!["deixa"]);
    }

    #[test]
    fn test_missing_model_is_degraded_identity() {
        let n = Normalizer::new(NormalizeOptions::default(), Arc::new(IdentityLemmatizer));
        assert!(n.is_degraded());

        let outcome = n.normalize(["deixa"]);
        assert!(outcome.degraded);
        assert_eq!(outcome.unchanged, vec!["deixa"]);
    }
}
