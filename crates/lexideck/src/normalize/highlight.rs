use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::Normalizer;

const OPEN_TAG: &str = "<span class=\"word\">";
const CLOSE_TAG: &str = "</span>";

static RE_MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static RE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+(?:['’-][\p{L}\p{N}]+)*").unwrap());

/// Wraps every form of `word` in `sentence` in `<span class="word">`.
///
/// Single words match case-insensitively on the cleaned surface form or on
/// the lemma, so "começou" is tagged when looking for "começar". Phrases
/// match literally, ignoring case. Existing markup is left untouched and a
/// sentence that is already tagged is returned as is.
pub fn tag_word(sentence: &str, word: &str, normalizer: &Normalizer) -> String {
    if sentence.contains(OPEN_TAG) {
        return sentence.to_string();
    }
    let target = normalizer.clean(word).to_lowercase();
    if target.is_empty() {
        return sentence.to_string();
    }

    let phrase_pattern = if target.contains(char::is_whitespace) {
        let escaped = target
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\s+");
        Regex::new(&format!("(?i){}", escaped)).ok()
    } else {
        None
    };
    let target_lemma = normalizer.lemma(&target);

    let tag_segment = |text: &str| -> String {
        match &phrase_pattern {
            Some(pattern) => pattern
                .replace_all(text, |caps: &Captures<'_>| {
                    format!("{}{}{}", OPEN_TAG, &caps[0], CLOSE_TAG)
                })
                .into_owned(),
            None => RE_WORD
                .replace_all(text, |caps: &Captures<'_>| {
                    let token = &caps[0];
                    let cleaned = token.to_lowercase();
                    if cleaned == target || normalizer.lemma(&cleaned) == target_lemma {
                        format!("{}{}{}", OPEN_TAG, token, CLOSE_TAG)
                    } else {
                        token.to_string()
                    }
                })
                .into_owned(),
        }
    };

    let mut out = String::with_capacity(sentence.len() + 32);
    let mut last = 0;
    for tag in RE_MARKUP.find_iter(sentence) {
        out.push_str(&tag_segment(&sentence[last..tag.start()]));
        out.push_str(tag.as_str());
        last = tag.end();
    }
    out.push_str(&tag_segment(&sentence[last..]));
    out
}
