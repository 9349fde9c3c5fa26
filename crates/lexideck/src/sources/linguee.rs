//! Linguee dictionary adapter.
//!
//! Queries a Linguee JSON API mirror:
//! `GET {base}?q={phrase}&src={from}&dst={to}` answering
//! `{"exact_matches": [{"word_type": {"pos", "gender"}, "translations":
//! [{"text"}], "audio_links": [{"url_part", "lang"}]}]}`.
//!
//! Produces `translation` (all exact matches), `word_type`, `gender` (first
//! letter, nouns only) and `audio` (first audio link in the source
//! language). A missing or empty `exact_matches` array is a NoMatch.
//!
//! The HTML search page is also used for spelling corrections
//! (`span.corrected`), see `LingueeAdapter::suggest`.

use async_trait::async_trait;
use reqwest::Url;
use scraper::{Html, Selector};
use serde::Deserialize;

use super::adapter::{get_checked, FetchError, FetchRequest, SourceAdapter, SourceId};
use super::registry::SourceSettings;
use super::transport::{HttpRequest, RawResponse, Transport};
use crate::record::{Field, FieldRecord};

pub const DEFAULT_BASE_URL: &str = "https://linguee-api.herokuapp.com/api";
pub const DEFAULT_SITE_URL: &str = "https://www.linguee.de";
const AUDIO_URL_TEMPLATE: &str = "https://www.linguee.de/mp3/{id}.mp3";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    exact_matches: Option<Vec<ExactMatch>>,
}

#[derive(Debug, Deserialize)]
struct ExactMatch {
    #[serde(default)]
    word_type: Option<WordType>,
    #[serde(default)]
    translations: Vec<Translation>,
    #[serde(default)]
    audio_links: Vec<AudioLink>,
}

#[derive(Debug, Deserialize)]
struct WordType {
    #[serde(default)]
    pos: Option<String>,
    #[serde(default)]
    gender: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

#[derive(Debug, Deserialize)]
struct AudioLink {
    url_part: String,
    lang: String,
}

pub struct LingueeAdapter {
    base_url: String,
    site_url: String,
}

impl LingueeAdapter {
    pub fn new(settings: &SourceSettings) -> Self {
        Self {
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            site_url: settings
                .site_url
                .clone()
                .unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
        }
    }

    fn suggestion_request(&self, request: &FetchRequest) -> Result<HttpRequest, FetchError> {
        let from = site_language_name(&request.from_lang).ok_or_else(|| {
            FetchError::UnsupportedLanguage {
                source_id: self.id(),
                lang: request.from_lang.clone(),
            }
        })?;
        let to = site_language_name(&request.to_lang).ok_or_else(|| {
            FetchError::UnsupportedLanguage {
                source_id: self.id(),
                lang: request.to_lang.clone(),
            }
        })?;

        let base = format!("{}/{}-{}/search", self.site_url.trim_end_matches('/'), to, from);
        let url = Url::parse_with_params(
            &base,
            &[("source", from), ("query", request.phrase.as_str())],
        )
        .map_err(|e| FetchError::Transport {
            source_id: self.id(),
            message: format!("Invalid suggestion URL '{}': {}", base, e),
            retryable: false,
        })?;
        Ok(HttpRequest::get(url.to_string()))
    }
}

/// Language labels used by the API for audio links.
fn audio_language_label(code: &str) -> Option<&'static str> {
    match code {
        "pt" => Some("Brazilian Portuguese"),
        "de" => Some("German"),
        "en" => Some("British English"),
        "es" => Some("Spanish"),
        "fr" => Some("French"),
        "it" => Some("Italian"),
        _ => None,
    }
}

/// Language names as they appear in linguee.de search paths.
fn site_language_name(code: &str) -> Option<&'static str> {
    match code {
        "de" => Some("deutsch"),
        "pt" => Some("portugiesisch"),
        "en" => Some("englisch"),
        "es" => Some("spanisch"),
        "fr" => Some("franzoesisch"),
        "it" => Some("italienisch"),
        "nl" => Some("niederlaendisch"),
        "pl" => Some("polnisch"),
        _ => None,
    }
}

#[async_trait]
impl SourceAdapter for LingueeAdapter {
    fn id(&self) -> SourceId {
        SourceId::new("linguee")
    }

    fn content_kind(&self) -> Option<&'static str> {
        Some("json")
    }

    fn build_request(&self, request: &FetchRequest) -> Result<HttpRequest, FetchError> {
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("q", request.phrase.as_str()),
                ("src", request.from_lang.as_str()),
                ("dst", request.to_lang.as_str()),
            ],
        )
        .map_err(|e| FetchError::Transport {
            source_id: self.id(),
            message: format!("Invalid base URL '{}': {}", self.base_url, e),
            retryable: false,
        })?;
        Ok(HttpRequest::get(url.to_string()).with_header("Accept", "application/json"))
    }

    fn parse(
        &self,
        request: &FetchRequest,
        response: RawResponse,
    ) -> Result<FieldRecord, FetchError> {
        let no_match = || FetchError::NoMatch { source_id: self.id() };

        let parsed: ApiResponse = serde_json::from_str(&response.body).map_err(|e| {
            tracing::debug!(source = "linguee", error = %e, "Payload is not the expected JSON");
            no_match()
        })?;
        let matches = parsed.exact_matches.unwrap_or_default();
        let Some(first) = matches.first() else {
            return Err(no_match());
        };

        let mut record = FieldRecord::new();

        let translations: Vec<String> = matches
            .iter()
            .flat_map(|m| m.translations.iter().map(|t| t.text.clone()))
            .collect();
        record.set_list(Field::Translation, translations);

        if let Some(word_type) = &first.word_type {
            let pos = word_type.pos.clone().unwrap_or_default();
            if pos == "noun" {
                if let Some(initial) = word_type.gender.as_deref().and_then(|g| g.chars().next()) {
                    record.set_text(Field::Gender, initial.to_string());
                }
            }
            record.set_text(Field::WordType, pos);
        }

        if let Some(label) = audio_language_label(&request.from_lang) {
            let audio_id = matches
                .iter()
                .flat_map(|m| m.audio_links.iter())
                .find(|link| link.lang == label)
                .map(|link| link.url_part.as_str());
            if let Some(id) = audio_id {
                record.set_text(Field::Audio, AUDIO_URL_TEMPLATE.replace("{id}", id));
            }
        }

        Ok(record)
    }

    async fn suggest(
        &self,
        transport: &dyn Transport,
        request: &FetchRequest,
    ) -> Result<Vec<String>, FetchError> {
        let http = self.suggestion_request(request)?;
        let response = get_checked(self.id(), transport, &http).await?;
        Ok(parse_corrections(&response.body))
    }
}

fn parse_corrections(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("span.corrected") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
