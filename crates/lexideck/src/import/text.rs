use std::path::Path;

use super::read_file;
use crate::error::ImportError;

/// One word or phrase per line. Blank lines are skipped.
pub fn words_from_txt(path: &Path) -> Result<Vec<String>, ImportError> {
    let content = read_file(path)?;
    Ok(words_from_str(&content))
}

pub fn words_from_str(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
