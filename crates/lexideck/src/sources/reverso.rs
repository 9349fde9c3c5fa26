//! Reverso Context adapter: bilingual example sentences.
//!
//! `GET {base}/translation/{from_name}-{to_name}/{phrase}`; every
//! `div.example` yields one `example` (from `div.src`) and one aligned
//! `example_trans` (from `div.trg`). A page without examples is a NoMatch.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use super::adapter::{encode_phrase, FetchError, FetchRequest, SourceAdapter, SourceId};
use super::registry::SourceSettings;
use super::transport::{HttpRequest, RawResponse};
use crate::record::{Field, FieldRecord, FieldValue};

pub const DEFAULT_BASE_URL: &str = "https://context.reverso.net";

pub struct ReversoAdapter {
    base_url: String,
}

impl ReversoAdapter {
    pub fn new(settings: &SourceSettings) -> Self {
        Self {
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    fn language_name(&self, code: &str) -> Result<&'static str, FetchError> {
        let name = match code {
            "ar" => "arabic",
            "de" => "german",
            "en" => "english",
            "es" => "spanish",
            "fr" => "french",
            "he" => "hebrew",
            "it" => "italian",
            "ja" => "japanese",
            "nl" => "dutch",
            "pl" => "polish",
            "pt" => "portuguese",
            "ro" => "romanian",
            "ru" => "russian",
            "tr" => "turkish",
            "zh" => "chinese",
            _ => {
                return Err(FetchError::UnsupportedLanguage {
                    source_id: self.id(),
                    lang: code.to_string(),
                })
            }
        };
        Ok(name)
    }
}

fn element_text(element: Option<ElementRef<'_>>) -> Option<String> {
    element
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl SourceAdapter for ReversoAdapter {
    fn id(&self) -> SourceId {
        SourceId::new("reverso")
    }

    fn content_kind(&self) -> Option<&'static str> {
        Some("html")
    }

    fn build_request(&self, request: &FetchRequest) -> Result<HttpRequest, FetchError> {
        let from = self.language_name(&request.from_lang)?;
        let to = self.language_name(&request.to_lang)?;
        let url = format!(
            "{}/translation/{}-{}/{}",
            self.base_url.trim_end_matches('/'),
            from,
            to,
            encode_phrase(&request.phrase)
        );
        Ok(HttpRequest::get(url).with_header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ))
    }

    fn parse(
        &self,
        _request: &FetchRequest,
        response: RawResponse,
    ) -> Result<FieldRecord, FetchError> {
        let document = Html::parse_document(&response.body);
        let (Ok(example), Ok(src), Ok(trg)) = (
            Selector::parse("div.example"),
            Selector::parse("div.src"),
            Selector::parse("div.trg"),
        ) else {
            return Err(FetchError::NoMatch { source_id: self.id() });
        };

        let mut examples = Vec::new();
        let mut translations = Vec::new();
        for block in document.select(&example) {
            let Some(text) = element_text(block.select(&src).next()) else {
                continue;
            };
            examples.push(Some(text));
            translations.push(element_text(block.select(&trg).next()));
        }

        if examples.is_empty() {
            return Err(FetchError::NoMatch { source_id: self.id() });
        }

        let mut record = FieldRecord::new();
        record.set(Field::Example, FieldValue::List(examples));
        record.set(Field::ExampleTrans, FieldValue::List(translations));
        Ok(record)
    }
}
