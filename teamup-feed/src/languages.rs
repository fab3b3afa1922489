//! Encoding of a post's language list.
//!
//! The store keeps the list as one text value shaped like a JSON array
//! (`["Python","Go"]`), but older rows use looser quoting. Decoding is lossy:
//! a language name containing a comma, bracket or quote does not survive a
//! round trip.

use serde_json::Value;

/// Decode the persisted languages field into trimmed, non-empty names.
///
/// One leading `[` and one trailing `]` are stripped, every `"` is removed,
/// and the rest is split on `,`. Already-decoded comma-joined text decodes to
/// the same names.
pub fn decode_languages(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let inner = raw.strip_prefix('[').unwrap_or(raw);
    let inner = inner.strip_suffix(']').unwrap_or(inner);

    inner
        .replace('"', "")
        .split(',')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .collect()
}

/// Persisted form of a selected language list, as written on post creation.
pub fn encode_languages(languages: &[String]) -> String {
    Value::from(languages.to_vec()).to_string()
}

/// Persisted form of the edit form's comma-separated input; `None` when blank.
pub fn encode_languages_input(input: &str) -> Option<String> {
    let languages: Vec<String> = input
        .split(',')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .collect();

    if languages.is_empty() {
        None
    } else {
        Some(encode_languages(&languages))
    }
}

/// Language names compare with full Unicode lowercasing.
pub fn same_language(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Case-insensitive membership test shared by the filter and the selection.
pub fn contains_language(languages: &[String], wanted: &str) -> bool {
    languages.iter().any(|lang| same_language(lang, wanted))
}
