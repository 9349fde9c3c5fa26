//! Dicio (Portuguese monolingual dictionary) adapter.
//!
//! `GET {base}/pesquisa.php?q={phrase}` with spaces turned into dashes. When
//! the search page only offers a suggestion link (`a._sugg`), that link is
//! followed once and the target page is parsed instead.
//!
//! Extracted fields, all content lists paired with `None` translation
//! placeholders since the source is monolingual:
//!
//! - `explanation`: `.significado > span:not(.cl)`
//! - `example`: `.tit-frases + .frases div.frase`
//! - `synonym` / `antonym`: links of `p.sinonimos`, split by the paragraph
//!   label ("sinônimo" / "contrário")
//! - `additional_info`: the element following the "Definição" heading
//! - `conjugation_table`: HTML of the Indicativo and Subjuntivo tenses for
//!   `eu`, `ele`, `nós`, `eles`; omitted when the page has no table
//!
//! A page without any explanation is a NoMatch.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use super::adapter::{
    check_content_type, get_checked, FetchError, FetchRequest, SourceAdapter, SourceId,
};
use super::registry::SourceSettings;
use super::transport::{HttpRequest, RawResponse, Transport};
use crate::record::{Field, FieldRecord};

pub const DEFAULT_BASE_URL: &str = "https://www.dicio.com.br";

static RE_DEFINITION_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*Definição").unwrap());

const PRONOUNS: [&str; 4] = ["eu", "ele", "nós", "eles"];
const ALL_PRONOUNS: [&str; 6] = ["eu", "tu", "ele", "nós", "vós", "eles"];

pub struct DicioAdapter {
    base_url: String,
}

impl DicioAdapter {
    pub fn new(settings: &SourceSettings) -> Self {
        Self {
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    /// Absolute URL of the "did you mean" link on a search page, if any.
    fn suggestion_link(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("a._sugg").ok()?;
        let href = document
            .select(&selector)
            .next()?
            .value()
            .attr("href")?
            .trim()
            .to_string();
        if href.is_empty() {
            return None;
        }
        if href.starts_with("http://") || href.starts_with("https://") {
            Some(href)
        } else {
            Some(format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                href.trim_start_matches('/')
            ))
        }
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn texts(document: &Html, css: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };
    document
        .select(&sel)
        .map(|e| collapse_whitespace(&e.text().collect::<String>()))
        .filter(|s| !s.is_empty())
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Synonym or antonym links, picked by the label of their paragraph.
fn related_words(document: &Html, label: &str) -> Vec<String> {
    let (Some(paragraph), Some(link)) = (selector("p.sinonimos"), selector("a")) else {
        return Vec::new();
    };
    document
        .select(&paragraph)
        .filter(|p| p.text().collect::<String>().to_lowercase().contains(label))
        .flat_map(|p| {
            p.select(&link)
                .map(|a| collapse_whitespace(&a.text().collect::<String>()))
                .collect::<Vec<_>>()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Text of the element right after the "Definição ..." heading, one
/// trimmed line per source line.
fn additional_info(document: &Html) -> Option<String> {
    let heading = selector("h2, h3")?;
    let title = document
        .select(&heading)
        .find(|h| RE_DEFINITION_HEADING.is_match(&h.text().collect::<String>()))?;
    let next = title.next_siblings().find_map(ElementRef::wrap)?;
    let text = next
        .text()
        .collect::<String>()
        .trim()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    (!text.is_empty()).then_some(text)
}

/// Tense name -> pronoun -> verb form, for the first two moods on the page.
fn conjugations(document: &Html) -> Vec<(String, BTreeMap<String, String>)> {
    let (Some(mood), Some(item)) = (selector("div.modo"), selector("li")) else {
        return Vec::new();
    };

    let mut tenses = Vec::new();
    for mood_block in document.select(&mood).take(2) {
        let Some(list) = mood_block.next_siblings().find_map(ElementRef::wrap) else {
            continue;
        };
        for tense_item in list.select(&item) {
            let mut strings = tense_item
                .text()
                .map(str::trim)
                .filter(|s| !s.is_empty());
            let Some(tense) = strings.next() else {
                continue;
            };
            let tokens: Vec<&str> = strings.flat_map(str::split_whitespace).collect();
            let mut forms = BTreeMap::new();
            for pair in tokens.windows(2) {
                if ALL_PRONOUNS.contains(&pair[0]) && !ALL_PRONOUNS.contains(&pair[1]) {
                    forms
                        .entry(pair[0].to_string())
                        .or_insert_with(|| pair[1].to_string());
                }
            }
            if !forms.is_empty() {
                tenses.push((collapse_whitespace(tense), forms));
            }
        }
    }
    tenses
}

/// Renders one small table per tense. Subjunctive tenses get class `subj`,
/// the rest `ind`; the mood suffix is dropped from the header.
fn conjugation_html(tenses: &[(String, BTreeMap<String, String>)]) -> Option<String> {
    if tenses.is_empty() {
        return None;
    }
    let tables: Vec<String> = tenses
        .iter()
        .map(|(tense, forms)| {
            let class = if tense.contains("Subjuntivo") { "subj" } else { "ind" };
            let title = tense
                .replace("do Subjuntivo", "")
                .replace("do Indicativo", "")
                .trim()
                .to_string();
            let rows: String = PRONOUNS
                .iter()
                .map(|p| {
                    format!(
                        "<tr><td>{}</td></tr>",
                        forms.get(*p).map(String::as_str).unwrap_or("")
                    )
                })
                .collect();
            format!(
                "<table class=\"{}\"><thead><tr><th>{}</th></tr></thead><tbody>{}</tbody></table>",
                class, title, rows
            )
        })
        .collect();
    Some(tables.join("\n"))
}

#[async_trait]
impl SourceAdapter for DicioAdapter {
    fn id(&self) -> SourceId {
        SourceId::new("dicio")
    }

    fn content_kind(&self) -> Option<&'static str> {
        Some("html")
    }

    fn build_request(&self, request: &FetchRequest) -> Result<HttpRequest, FetchError> {
        if request.from_lang != "pt" {
            return Err(FetchError::UnsupportedLanguage {
                source_id: self.id(),
                lang: request.from_lang.clone(),
            });
        }
        let base = format!("{}/pesquisa.php", self.base_url.trim_end_matches('/'));
        let phrase = request.phrase.as_str().replace(' ', "-");
        let url = Url::parse_with_params(&base, &[("q", phrase.as_str())]).map_err(|e| {
            FetchError::Transport {
                source_id: self.id(),
                message: format!("Invalid base URL '{}': {}", base, e),
                retryable: false,
            }
        })?;
        Ok(HttpRequest::get(url.to_string()))
    }

    fn parse(
        &self,
        _request: &FetchRequest,
        response: RawResponse,
    ) -> Result<FieldRecord, FetchError> {
        let document = Html::parse_document(&response.body);

        let explanations = texts(&document, ".significado > span:not(.cl)");
        if explanations.is_empty() {
            return Err(FetchError::NoMatch { source_id: self.id() });
        }

        let mut record = FieldRecord::new();
        record.set_untranslated_list(Field::Explanation, explanations);
        record.set_untranslated_list(Field::Synonym, related_words(&document, "sin"));
        record.set_untranslated_list(Field::Antonym, related_words(&document, "contr"));
        record.set_untranslated_list(
            Field::Example,
            texts(&document, ".tit-frases + .frases div.frase"),
        );
        if let Some(info) = additional_info(&document) {
            record.set_text(Field::AdditionalInfo, info);
        }
        match conjugation_html(&conjugations(&document)) {
            Some(html) => record.set_text(Field::ConjugationTable, html),
            None => tracing::debug!(source = "dicio", "No conjugation table on page"),
        }
        Ok(record)
    }

    async fn fetch(
        &self,
        transport: &dyn Transport,
        request: &FetchRequest,
    ) -> Result<FieldRecord, FetchError> {
        let http = self.build_request(request)?;
        let response = get_checked(self.id(), transport, &http).await?;

        let response = match self.suggestion_link(&response.body) {
            Some(url) => {
                tracing::debug!(source = "dicio", url = %url, "Following suggestion link");
                get_checked(self.id(), transport, &HttpRequest::get(url)).await?
            }
            None => response,
        };
        check_content_type(&self.id(), self.content_kind(), &response)?;
        self.parse(request, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, SearchTerm};

    const PAGE: &str = r#"<html><body>
        <p class="significado textonovo">
            <span class="cl">verbo transitivo direto</span>
            <span>Dar início a; iniciar.</span>
            <span>Ter começo; principiar.</span>
        </p>
        <p class="adicional sinonimos">Sinônimos de <b>começar</b>:
            <a href="/iniciar/">iniciar</a>, <a href="/principiar/">principiar</a></p>
        <p class="adicional sinonimos">Contrário de <b>começar</b>:
            <a href="/acabar/">acabar</a></p>
        <h3 class="tit-frases">Frases com começar</h3>
        <div class="frases">
            <div class="frase">Vou começar   agora.</div>
            <div class="frase">Começou a chover.</div>
        </div>
        <h2 class="tit-section">Definição de Começar</h2>
        <p class="adicional">
            Classe gramatical: verbo
            Separação silábica: co-me-çar
        </p>
        <div class="modo">Indicativo</div>
        <ul>
            <li><p>Presente do Indicativo</p>eu começo<br>tu começas<br>ele começa<br>nós começamos<br>vós começais<br>eles começam</li>
        </ul>
        <div class="modo">Subjuntivo</div>
        <ul>
            <li><p>Presente do Subjuntivo</p>que eu comece<br>que tu comeces<br>que ele comece<br>que nós comecemos<br>que vós comeceis<br>que eles comecem</li>
        </ul>
    </body></html>"#;

    fn adapter() -> DicioAdapter {
        DicioAdapter::new(&SourceSettings::default())
    }

    fn request(phrase: &str) -> FetchRequest {
        FetchRequest::new(SearchTerm::new(phrase), "pt", "de")
    }

    #[test]
    fn test_build_request() {
        let http = adapter().build_request(&request("dar certo")).unwrap();
        assert_eq!(http.url, "https://www.dicio.com.br/pesquisa.php?q=dar-certo");
    }

    #[test]
    fn test_only_portuguese_is_supported() {
        let req = FetchRequest::new(SearchTerm::new("house"), "en", "de");
        assert!(matches!(
            adapter().build_request(&req),
            Err(FetchError::UnsupportedLanguage { .. })
        ));
    }

    #[test]
    fn test_parse_full_page() {
        let record = adapter().parse(&request("começar"), RawResponse::ok(PAGE)).unwrap();

        assert_eq!(
            record.field(Field::Explanation),
            Some(&FieldValue::list(["Dar início a; iniciar.", "Ter começo; principiar."]))
        );
        assert_eq!(
            record.field(Field::ExplanationTrans),
            Some(&FieldValue::placeholders(2))
        );
        assert_eq!(
            record.field(Field::Synonym),
            Some(&FieldValue::list(["iniciar", "principiar"]))
        );
        assert_eq!(record.field(Field::Antonym), Some(&FieldValue::list(["acabar"])));
        assert_eq!(
            record.field(Field::Example),
            Some(&FieldValue::list(["Vou começar agora.", "Começou a chover."]))
        );
        assert_eq!(
            record.field(Field::AdditionalInfo),
            Some(&FieldValue::Scalar(
                "Classe gramatical: verbo\nSeparação silábica: co-me-çar".into()
            ))
        );

        let table = record
            .field(Field::ConjugationTable)
            .and_then(FieldValue::as_scalar)
            .unwrap();
        assert!(table.contains("<table class=\"ind\"><thead><tr><th>Presente</th>"));
        assert!(table.contains("<table class=\"subj\">"));
        assert!(table.contains("<td>começamos</td>"));
        assert!(table.contains("<td>comecem</td>"));
        assert!(!table.contains("começas"));
    }

    #[test]
    fn test_missing_conjugation_table_is_omitted() {
        let html = r#"<p class="significado"><span>Habitação.</span></p>"#;
        let record = adapter().parse(&request("casa"), RawResponse::ok(html)).unwrap();
        assert!(record.field(Field::ConjugationTable).is_none());
        assert!(record.field(Field::Synonym).is_none());
    }

    #[test]
    fn test_no_explanation_is_no_match() {
        let err = adapter()
            .parse(&request("xyz"), RawResponse::ok("<html></html>"))
            .unwrap_err();
        assert!(err.is_no_match());
    }

    #[test]
    fn test_suggestion_link_is_absolutized() {
        let html = r#"<a class="_sugg" href="/comecar/">começar</a>"#;
        assert_eq!(
            adapter().suggestion_link(html).as_deref(),
            Some("https://www.dicio.com.br/comecar/")
        );
        assert_eq!(adapter().suggestion_link("<p>nothing</p>"), None);
    }
}
