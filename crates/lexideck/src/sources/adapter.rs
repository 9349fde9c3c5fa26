//! The source adapter contract.

use std::fmt;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::transport::{truncate_body, HttpRequest, RawResponse, Transport, TransportError};
use crate::record::{FieldRecord, SearchTerm};

/// Stable identity of a source, e.g. `"linguee"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A lookup of one phrase for one language pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub phrase: SearchTerm,
    pub from_lang: String,
    pub to_lang: String,
}

impl FetchRequest {
    pub fn new(phrase: SearchTerm, from_lang: impl Into<String>, to_lang: impl Into<String>) -> Self {
        Self {
            phrase,
            from_lang: from_lang.into(),
            to_lang: to_lang.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The source answered but has no usable data for this phrase.
    #[error("No match in source '{source_id}'")]
    NoMatch { source_id: SourceId },

    #[error("Transport error in source '{source_id}': {message}")]
    Transport {
        source_id: SourceId,
        message: String,
        retryable: bool,
    },

    #[error("Source '{source_id}' does not support language '{lang}'")]
    UnsupportedLanguage { source_id: SourceId, lang: String },
}

impl FetchError {
    pub fn source_id(&self) -> &SourceId {
        match self {
            FetchError::NoMatch { source_id }
            | FetchError::Transport { source_id, .. }
            | FetchError::UnsupportedLanguage { source_id, .. } => source_id,
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, FetchError::NoMatch { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Transport {
                retryable: true,
                ..
            }
        )
    }

    pub fn from_transport(source_id: SourceId, error: TransportError) -> Self {
        let retryable = !matches!(
            error,
            TransportError::InvalidUrl { .. } | TransportError::Client(_)
        );
        FetchError::Transport {
            source_id,
            message: error.to_string(),
            retryable,
        }
    }
}

/// A uniform wrapper around one external source.
///
/// `build_request` and `parse` are pure; `fetch` wires them to a
/// transport. Adapters never touch shared state.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> SourceId;

    fn build_request(&self, request: &FetchRequest) -> Result<HttpRequest, FetchError>;

    fn parse(&self, request: &FetchRequest, response: RawResponse)
        -> Result<FieldRecord, FetchError>;

    /// Content type the parser understands (`"json"`, `"html"`). A
    /// response declaring anything else is a NoMatch.
    fn content_kind(&self) -> Option<&'static str> {
        None
    }

    async fn fetch(
        &self,
        transport: &dyn Transport,
        request: &FetchRequest,
    ) -> Result<FieldRecord, FetchError> {
        let http = self.build_request(request)?;
        let response = get_checked(self.id(), transport, &http).await?;
        check_content_type(&self.id(), self.content_kind(), &response)?;
        self.parse(request, response)
    }

    /// Alternative spellings for a phrase this source had no match for.
    async fn suggest(
        &self,
        _transport: &dyn Transport,
        _request: &FetchRequest,
    ) -> Result<Vec<String>, FetchError> {
        Ok(Vec::new())
    }
}

/// Sends a request and maps transport failures and non-success statuses
/// to `FetchError`.
pub(crate) async fn get_checked(
    source: SourceId,
    transport: &dyn Transport,
    request: &HttpRequest,
) -> Result<RawResponse, FetchError> {
    let response = transport
        .get(request)
        .await
        .map_err(|e| FetchError::from_transport(source.clone(), e))?;

    if !response.is_success() {
        tracing::info!(
            source = %source,
            status = response.status,
            body = %truncate_body(&response.body),
            "Source answered with non-success status"
        );
        return Err(FetchError::NoMatch { source_id: source });
    }
    Ok(response)
}

pub(crate) fn check_content_type(
    source: &SourceId,
    expected: Option<&str>,
    response: &RawResponse,
) -> Result<(), FetchError> {
    match expected {
        Some(kind) if !response.declares(kind) => {
            tracing::info!(
                source = %source,
                content_type = response.content_type.as_deref().unwrap_or_default(),
                expected = kind,
                "Source answered with unexpected content type"
            );
            Err(FetchError::NoMatch {
                source_id: source.clone(),
            })
        }
        _ => Ok(()),
    }
}

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'+');

/// Encodes a phrase for use inside a URL path segment. Spaces become `+`.
pub fn encode_phrase(phrase: &SearchTerm) -> String {
    utf8_percent_encode(&phrase.as_str().replace(' ', "+"), PATH_SEGMENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_phrase() {
        assert_eq!(encode_phrase(&SearchTerm::new("casa")), "casa");
        assert_eq!(encode_phrase(&SearchTerm::new("dar certo")), "dar+certo");
        assert_eq!(encode_phrase(&SearchTerm::new("começar")), "come%C3%A7ar");
    }

    #[test]
    fn test_content_type_mismatch_is_no_match() {
        let source = SourceId::new("linguee");
        let mut response = RawResponse::ok("<html></html>");
        assert!(check_content_type(&source, Some("json"), &response).is_ok());

        response.content_type = Some("text/html; charset=utf-8".to_string());
        let err = check_content_type(&source, Some("json"), &response).unwrap_err();
        assert!(err.is_no_match());
        assert!(check_content_type(&source, Some("html"), &response).is_ok());
        assert!(check_content_type(&source, None, &response).is_ok());
    }

    #[test]
    fn test_transport_errors_are_retryable() {
        let err = FetchError::from_transport(
            SourceId::new("images"),
            TransportError::Timeout {
                url: "https://x.test".into(),
            },
        );
        assert!(err.is_retryable());
        assert_eq!(err.source_id().as_str(), "images");

        let err = FetchError::NoMatch {
            source_id: SourceId::new("linguee"),
        };
        assert!(!err.is_retryable());
        assert!(err.is_no_match());
    }
}
