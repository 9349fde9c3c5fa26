//! Image search adapter backed by the Wikimedia Commons API.
//!
//! Searches the file namespace for the phrase and returns the direct URLs
//! of up to `limit` images as the `image` list. No pages is a NoMatch.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use super::adapter::{FetchError, FetchRequest, SourceAdapter, SourceId};
use super::registry::SourceSettings;
use super::transport::{HttpRequest, RawResponse};
use crate::record::{Field, FieldRecord};

pub const DEFAULT_BASE_URL: &str = "https://commons.wikimedia.org/w/api.php";
pub const DEFAULT_LIMIT: usize = 15;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<Query>,
}

#[derive(Debug, Deserialize)]
struct Query {
    #[serde(default)]
    pages: BTreeMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    index: Option<u32>,
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    url: String,
}

pub struct ImageAdapter {
    base_url: String,
    limit: usize,
}

impl ImageAdapter {
    pub fn new(settings: &SourceSettings) -> Self {
        Self {
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            limit: settings.limit.unwrap_or(DEFAULT_LIMIT),
        }
    }
}

#[async_trait]
impl SourceAdapter for ImageAdapter {
    fn id(&self) -> SourceId {
        SourceId::new("images")
    }

    fn content_kind(&self) -> Option<&'static str> {
        Some("json")
    }

    fn build_request(&self, request: &FetchRequest) -> Result<HttpRequest, FetchError> {
        let limit = self.limit.to_string();
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("action", "query"),
                ("generator", "search"),
                ("gsrsearch", request.phrase.as_str()),
                ("gsrnamespace", "6"),
                ("gsrlimit", limit.as_str()),
                ("prop", "imageinfo"),
                ("iiprop", "url"),
                ("format", "json"),
            ],
        )
        .map_err(|e| FetchError::Transport {
            source_id: self.id(),
            message: format!("Invalid base URL '{}': {}", self.base_url, e),
            retryable: false,
        })?;
        Ok(HttpRequest::get(url.to_string()))
    }

    fn parse(
        &self,
        _request: &FetchRequest,
        response: RawResponse,
    ) -> Result<FieldRecord, FetchError> {
        let parsed: ApiResponse = serde_json::from_str(&response.body)
            .map_err(|_| FetchError::NoMatch { source_id: self.id() })?;

        let mut pages: Vec<Page> = parsed
            .query
            .map(|q| q.pages.into_values().collect())
            .unwrap_or_default();
        // Page ids are arbitrary; `index` carries the search rank.
        pages.sort_by_key(|p| p.index.unwrap_or(u32::MAX));

        let urls: Vec<String> = pages
            .into_iter()
            .filter_map(|p| p.imageinfo.into_iter().next().map(|i| i.url))
            .take(self.limit)
            .collect();

        if urls.is_empty() {
            return Err(FetchError::NoMatch { source_id: self.id() });
        }

        let mut record = FieldRecord::new();
        record.set_list(Field::Image, urls);
        Ok(record)
    }
}
