/// Characters stripped from both ends of a word, on top of ASCII
/// punctuation and whitespace.
const EDGE_PUNCTUATION: &[char] = &[
    '–', '—', '¿', '¡', '”', '“', '„', '«', '»', '‘', '’', '…',
];

fn is_edge_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || c.is_whitespace() || EDGE_PUNCTUATION.contains(&c)
}

/// Strips leading and trailing punctuation and whitespace.
///
/// Inner punctuation is kept, so `"guarda-chuva"` and `"d'água"` survive.
pub fn strip_punctuation(word: &str) -> &str {
    word.trim_matches(is_edge_punctuation)
}
