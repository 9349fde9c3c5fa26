//! Kobo / Adobe Digital Editions annotation files (`.annot`).

use std::path::Path;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use quick_xml::Reader;

use super::read_file;
use crate::error::ImportError;

/// Element path whose text is a highlighted passage.
const FRAGMENT_TEXT_PATH: [&[u8]; 4] = [b"annotation", b"target", b"fragment", b"text"];

pub fn words_from_kobo(path: &Path) -> Result<Vec<String>, ImportError> {
    let xml = read_file(path)?;
    parse_annotations(&xml).map_err(|message| ImportError::Malformed {
        path: path.to_path_buf(),
        message,
    })
}

/// Highlighted texts in document order. Notes in `annotation/content` are
/// ignored.
pub fn parse_annotations(xml: &str) -> Result<Vec<String>, String> {
    // Text is trimmed per passage at its closing tag. Trimming per event
    // would eat the spaces around entity references.
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut current = String::new();
    let mut words = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                path.push(e.local_name().as_ref().to_vec());
            }
            Ok(Event::End(_)) => {
                if in_fragment_text(&path) {
                    let text = current.trim();
                    if !text.is_empty() {
                        words.push(text.to_string());
                    }
                    current.clear();
                }
                path.pop();
            }
            Ok(Event::Text(e)) => {
                if in_fragment_text(&path) {
                    let decoded = e
                        .decode()
                        .map_err(|e| format!("Invalid text encoding: {}", e))?;
                    current.push_str(&decoded);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_fragment_text(&path) {
                    current.push_str(&resolve_reference(&e)?);
                }
            }
            Ok(Event::CData(e)) => {
                if in_fragment_text(&path) {
                    current.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parsing error: {}", e)),
            _ => {}
        }
    }

    Ok(words)
}

/// Expands `&#233;`, `&#xE9;` and the predefined XML entities. Any other
/// entity is kept as written.
fn resolve_reference(reference: &BytesRef<'_>) -> Result<String, String> {
    if let Some(ch) = reference
        .resolve_char_ref()
        .map_err(|e| format!("Invalid character reference: {}", e))?
    {
        return Ok(ch.to_string());
    }

    let name = reference
        .decode()
        .map_err(|e| format!("Invalid entity name: {}", e))?;
    Ok(match resolve_predefined_entity(&name) {
        Some(value) => value.to_string(),
        None => format!("&{};", name),
    })
}

fn in_fragment_text(path: &[Vec<u8>]) -> bool {
    path.len() >= FRAGMENT_TEXT_PATH.len()
        && path[path.len() - FRAGMENT_TEXT_PATH.len()..]
            .iter()
            .zip(FRAGMENT_TEXT_PATH)
            .all(|(a, b)| a.as_slice() == b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANNOT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<annotationSet xmlns:xhtml="http://www.w3.org/1999/xhtml" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns="http://ns.adobe.com/adobedigitaleditions/2007">
  <publication>
    <dc:identifier>urn:uuid:1234</dc:identifier>
    <dc:title>Contos</dc:title>
  </publication>
  <annotation>
    <dc:identifier>urn:uuid:a1</dc:identifier>
    <dc:date>2021-03-01T10:00:00Z</dc:date>
    <target>
      <fragment start="OEBPS/ch1.xhtml#point(/1/4/2:10)" end="OEBPS/ch1.xhtml#point(/1/4/2:17)">
        <text>aguento</text>
      </fragment>
    </target>
    <content>
      <text>minha nota</text>
    </content>
  </annotation>
  <annotation>
    <target>
      <fragment start="a" end="b">
        <text>dar certo</text>
      </fragment>
    </target>
  </annotation>
</annotationSet>
"#;

    #[test]
    fn test_parse_annotations() {
        let words = parse_annotations(ANNOT).unwrap();
        assert_eq!(words, vec!["aguento", "dar certo"]);
    }

    #[test]
    fn test_malformed_xml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.annot");
        std::fs::write(&path, "<annotationSet><annotation></target></annotationSet>").unwrap();

        let result = words_from_kobo(&path);
        assert!(matches!(result, Err(ImportError::Malformed { .. })));
    }

    #[test]
    fn test_entity_references_are_expanded() {
        let xml = "<annotationSet><annotation><target><fragment>\
                   <text> d&apos;água &amp; p&#xE3;o </text>\
                   </fragment></target></annotation>\
                   <annotation><target><fragment>\
                   <text>caf&#233; &nbsp;</text>\
                   </fragment></target></annotation></annotationSet>";

        let words = parse_annotations(xml).unwrap();
        assert_eq!(words, vec!["d'água & pão", "café &nbsp;"]);
    }

    #[test]
    fn test_empty_set() {
        let words = parse_annotations("<annotationSet/>").unwrap();
        assert!(words.is_empty());
    }
}
