//! Name normalization and fuzzy matching utilities
//!
//! The storefront search endpoints provide no usable relevance score, so
//! results are ranked with edit distance and token overlap against a
//! normalized query.

use std::sync::LazyLock;

use deunicode::deunicode;
use regex::Regex;

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").unwrap());
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// True when the string contains characters from the common Japanese blocks
/// (hiragana, katakana, CJK unified ideographs, halfwidth katakana).
pub fn contains_japanese(s: &str) -> bool {
    s.chars().any(|c| {
        matches!(c,
            '\u{3040}'..='\u{30FF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{FF66}'..='\u{FF9F}')
    })
}

/// Canonicalize a free-text game title for searching and matching.
///
/// Bracketed and parenthesized segments carry platform/region annotations,
/// not title content, and are dropped. Native-script titles are returned
/// unchanged: the Japanese and Asian search backends expect them verbatim.
///
/// Idempotent: `normalize_game_name(normalize_game_name(x)) == normalize_game_name(x)`.
pub fn normalize_game_name(raw: &str) -> String {
    if contains_japanese(raw) {
        return raw.to_string();
    }

    let lowered = raw.replace(['™', '®'], "").to_lowercase();
    let stripped = BRACKETED.replace_all(&lowered, "");
    let transliterated = deunicode(&stripped).to_lowercase();

    let filtered: String = transliterated
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a normalized query into matching tokens, dropping empty fragments.
pub fn query_words(normalized: &str) -> Vec<String> {
    NON_WORD
        .split(normalized)
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

/// True when `name` contains every whitespace-delimited token of the
/// normalized query (case-insensitive substring containment).
pub fn contains_all_words(name: &str, normalized_query: &str) -> bool {
    let name = name.to_lowercase();
    query_words(normalized_query).iter().all(|w| name.contains(w))
}

/// Symmetric Levenshtein edit distance, used as an ascending ranking key.
pub fn name_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev_row: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b_chars.len() + 1];

    for i in 1..=a_chars.len() {
        curr_row[0] = i;
        for j in 1..=b_chars.len() {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            curr_row[j] = (prev_row[j] + 1)
                .min(curr_row[j - 1] + 1)
                .min(prev_row[j - 1] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_chars.len()]
}
