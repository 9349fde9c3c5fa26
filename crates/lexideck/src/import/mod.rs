//! Word lists from files: plain text, Kindle notebooks and Kobo
//! annotations. Imported words still need the normalization filter.

pub mod kindle;
pub mod kobo;
pub mod text;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ImportError;

pub use kindle::{highlights_by_color, words_from_kindle};
pub use kobo::words_from_kobo;
pub use text::words_from_txt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    Text,
    Kindle,
    Kobo,
}

impl ImportFormat {
    /// Detects the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "txt" => Ok(ImportFormat::Text),
            "html" | "htm" => Ok(ImportFormat::Kindle),
            "annot" => Ok(ImportFormat::Kobo),
            _ => Err(ImportError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "txt" | "text" => Some(ImportFormat::Text),
            "kindle" | "html" => Some(ImportFormat::Kindle),
            "kobo" | "annot" => Some(ImportFormat::Kobo),
            _ => None,
        }
    }
}

/// Reads the raw word list of a file. Kindle imports take the words color.
pub fn import_words(path: &Path, format: ImportFormat) -> Result<Vec<String>, ImportError> {
    let words = match format {
        ImportFormat::Text => words_from_txt(path)?,
        ImportFormat::Kindle => words_from_kindle(path, kindle::WORDS_COLOR)?,
        ImportFormat::Kobo => words_from_kobo(path)?,
    };
    tracing::info!(
        path = %path.display(),
        format = ?format,
        count = words.len(),
        "Imported word list"
    );
    Ok(words)
}

fn read_file(path: &Path) -> Result<String, ImportError> {
    std::fs::read_to_string(path).map_err(|e| ImportError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ImportFormat::from_path(Path::new("words.txt")).unwrap(),
            ImportFormat::Text
        );
        assert_eq!(
            ImportFormat::from_path(Path::new("Notizbuch.HTML")).unwrap(),
            ImportFormat::Kindle
        );
        assert_eq!(
            ImportFormat::from_path(Path::new("book.annot")).unwrap(),
            ImportFormat::Kobo
        );
        assert!(matches!(
            ImportFormat::from_path(Path::new("book.pdf")),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ImportFormat::parse("kindle"), Some(ImportFormat::Kindle));
        assert_eq!(ImportFormat::parse("TXT"), Some(ImportFormat::Text));
        assert_eq!(ImportFormat::parse("pdf"), None);
    }

    #[test]
    fn test_import_words_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "casa\nmesa\n").unwrap();

        let words = import_words(&path, ImportFormat::Text).unwrap();
        assert_eq!(words, vec!["casa", "mesa"]);
    }
}
