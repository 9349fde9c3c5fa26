//! Core data model: search terms, the field vocabulary and field records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalized phrase used as the unique key for caching and queueing.
///
/// Construction trims surrounding whitespace and case-folds, so two terms
/// compare equal whenever they would hit the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchTerm(String);

impl SearchTerm {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SearchTerm {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for SearchTerm {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

/// Whether a vocabulary field holds one value or an ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    List,
}

/// The system-wide field vocabulary shared by every source adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Translation,
    Example,
    ExampleTrans,
    Synonym,
    SynonymTrans,
    Antonym,
    AntonymTrans,
    Explanation,
    ExplanationTrans,
    Audio,
    Image,
    AdditionalInfo,
    ConjugationTable,
    WordType,
    Gender,
    Suggestion,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::Translation,
        Field::Example,
        Field::ExampleTrans,
        Field::Synonym,
        Field::SynonymTrans,
        Field::Antonym,
        Field::AntonymTrans,
        Field::Explanation,
        Field::ExplanationTrans,
        Field::Audio,
        Field::Image,
        Field::AdditionalInfo,
        Field::ConjugationTable,
        Field::WordType,
        Field::Gender,
        Field::Suggestion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Translation => "translation",
            Field::Example => "example",
            Field::ExampleTrans => "example_trans",
            Field::Synonym => "synonym",
            Field::SynonymTrans => "synonym_trans",
            Field::Antonym => "antonym",
            Field::AntonymTrans => "antonym_trans",
            Field::Explanation => "explanation",
            Field::ExplanationTrans => "explanation_trans",
            Field::Audio => "audio",
            Field::Image => "image",
            Field::AdditionalInfo => "additional_info",
            Field::ConjugationTable => "conjugation_table",
            Field::WordType => "word_type",
            Field::Gender => "gender",
            Field::Suggestion => "suggestion",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == name)
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Audio
            | Field::AdditionalInfo
            | Field::ConjugationTable
            | Field::WordType
            | Field::Gender => FieldKind::Scalar,
            _ => FieldKind::List,
        }
    }

    /// The parallel translation list for a content list, if any.
    ///
    /// Items at the same index in both lists belong together.
    pub fn translation_pair(&self) -> Option<Field> {
        match self {
            Field::Example => Some(Field::ExampleTrans),
            Field::Synonym => Some(Field::SynonymTrans),
            Field::Antonym => Some(Field::AntonymTrans),
            Field::Explanation => Some(Field::ExplanationTrans),
            _ => None,
        }
    }

    /// Suggestion-style fields hold candidates for a user decision rather
    /// than aggregated content.
    pub fn is_suggestion(&self) -> bool {
        matches!(self, Field::Suggestion)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field value: one string or an ordered list.
///
/// List items are optional so translation lists can carry explicit
/// "no translation" placeholders and stay index-aligned with their
/// content list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    List(Vec<Option<String>>),
}

impl FieldValue {
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::List(items.into_iter().map(|s| Some(s.into())).collect())
    }

    /// A list of `len` empty placeholders.
    pub fn placeholders(len: usize) -> Self {
        FieldValue::List(vec![None; len])
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Scalar(_) => FieldKind::Scalar,
            FieldValue::List(_) => FieldKind::List,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(s) => Some(s),
            FieldValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Option<String>]> {
        match self {
            FieldValue::List(items) => Some(items),
            FieldValue::Scalar(_) => None,
        }
    }

    /// Non-empty list items, skipping placeholders.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            FieldValue::Scalar(s) => vec![s.as_str()],
            FieldValue::List(items) => items.iter().flatten().map(String::as_str).collect(),
        }
    }
}

/// The per-phrase mapping from field name to value.
///
/// Absent fields are omitted rather than stored as empty values, so
/// "the source had no data" stays distinguishable from "empty list".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    /// Sets a vocabulary field.
    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.fields.insert(field.as_str().to_string(), value);
    }

    /// Sets a scalar field, skipping empty strings.
    pub fn set_text(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.set(field, FieldValue::Scalar(value));
        }
    }

    /// Sets a list field, skipping empty lists.
    pub fn set_list<I, S>(&mut self, field: Field, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let value = FieldValue::list(items);
        if value.as_list().is_some_and(|l| !l.is_empty()) {
            self.set(field, value);
        }
    }

    /// Sets a content list together with a placeholder translation list of
    /// the same length. Nothing is written when `items` is empty.
    pub fn set_untranslated_list(&mut self, field: Field, items: Vec<String>) {
        let Some(pair) = field.translation_pair() else {
            self.set_list(field, items);
            return;
        };
        if items.is_empty() {
            return;
        }
        let len = items.len();
        self.set(field, FieldValue::list(items));
        self.set(pair, FieldValue::placeholders(len));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn field(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(field.as_str())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Zips a content list with its translation list.
    pub fn pairs(&self, field: Field) -> Vec<(String, Option<String>)> {
        let Some(items) = self.field(field).and_then(FieldValue::as_list) else {
            return Vec::new();
        };
        let translations = field
            .translation_pair()
            .and_then(|pair| self.field(pair))
            .and_then(FieldValue::as_list)
            .unwrap_or(&[]);

        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                item.as_ref()
                    .map(|text| (text.clone(), translations.get(i).cloned().flatten()))
            })
            .collect()
    }

    /// Removes suggestion-style items that equal the phrase itself.
    ///
    /// Such items need no user decision. Aggregated content fields are
    /// never touched; a suggestion field left empty is removed.
    pub fn drop_unchanged_suggestions(&mut self, phrase: &SearchTerm) {
        let names: Vec<String> = self
            .fields
            .keys()
            .filter(|name| Field::from_name(name).is_some_and(|f| f.is_suggestion()))
            .cloned()
            .collect();

        for name in names {
            let now_empty = match self.fields.get_mut(&name) {
                Some(FieldValue::List(items)) => {
                    items.retain(|item| {
                        item.as_deref()
                            .is_some_and(|s| SearchTerm::new(s) != *phrase)
                    });
                    items.is_empty()
                }
                Some(FieldValue::Scalar(s)) => SearchTerm::new(s) == *phrase,
                None => false,
            };
            if now_empty {
                self.fields.remove(&name);
            }
        }
    }
}

impl FromIterator<(String, FieldValue)> for FieldRecord {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
