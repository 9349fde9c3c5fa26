//! Kindle notebook exports (HTML).
//!
//! Each highlight is a `div.noteHeading` carrying a `span.highlight_<color>`
//! followed by a `div.noteText` with the highlighted text. By convention
//! yellow marks single words, blue phrases and pink sentences.

use std::collections::BTreeMap;
use std::path::Path;

use scraper::{ElementRef, Html, Selector};

use super::read_file;
use crate::error::ImportError;

pub const WORDS_COLOR: &str = "yellow";
pub const PHRASES_COLOR: &str = "blue";
pub const SENTENCES_COLOR: &str = "pink";

const HIGHLIGHT_PREFIX: &str = "highlight_";

/// Highlighted texts of the given color, in document order.
pub fn words_from_kindle(path: &Path, color: &str) -> Result<Vec<String>, ImportError> {
    let html = read_file(path)?;
    Ok(highlights_by_color(&html).remove(color).unwrap_or_default())
}

/// All highlights grouped by color name (`"yellow"`, `"blue"`, ...).
pub fn highlights_by_color(html: &str) -> BTreeMap<String, Vec<String>> {
    let document = Html::parse_document(html);
    let mut highlights: BTreeMap<String, Vec<String>> = BTreeMap::new();

    let (Ok(heading), Ok(span)) = (Selector::parse("div.noteHeading"), Selector::parse("span"))
    else {
        return highlights;
    };

    for note_heading in document.select(&heading) {
        let Some(color) = note_heading
            .select(&span)
            .find_map(|s| s.value().classes().find_map(|c| c.strip_prefix(HIGHLIGHT_PREFIX)))
        else {
            continue;
        };
        let Some(text) = note_text(note_heading) else {
            continue;
        };
        highlights.entry(color.to_string()).or_default().push(text);
    }

    highlights
}

/// Text of the `div.noteText` following a heading. Only direct text
/// children count: exports often leave `noteText` unclosed, which nests
/// the rest of the notebook inside it.
fn note_text(heading: ElementRef<'_>) -> Option<String> {
    let note = heading.next_siblings().find_map(ElementRef::wrap)?;
    if !note.value().classes().any(|c| c == "noteText") {
        return None;
    }
    let text: String = note
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|t| t.to_string())
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
