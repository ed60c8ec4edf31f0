use crate::attrs::{AttributeMap, CategorySet};

/// Newznab category codes for general audio results.
pub const AUDIO_CATEGORIES: &[&str] =
    &["3000", "3010", "3020", "3030", "3040", "3050", "3060"];

/// Audiobooks specifically.
pub const AUDIOBOOK_CATEGORIES: &[&str] = &["3030"];

/// Newznab category codes for book results.
pub const BOOK_CATEGORIES: &[&str] = &[
    "7000", "7010", "7020", "7030", "7040", "7050", "7060", "7100", "7110", "7120", "7130",
    "8000", "8010", "8020",
];

/// Audio quality tokens recognised downstream, scanned longest-first so a
/// short token never matches inside a longer one (DSD vs DSD64).
pub const AUDIO_QUALITY_SCAN_ORDER: &[&str] = &[
    "LOSSLESS",
    "DSD128", "DSD256", "16-BIT", "24-BIT",
    "DSD64", "16BIT", "24BIT", "LOSSY", "VINYL",
    "FLAC", "ALAC", "AIFF", "OPUS",
    "MP3", "AAC", "OGG", "WMA", "WAV", "DSD", "WEB", "320", "256", "192", "128",
    "V0", "V2", "CD",
];

/// Book format tokens, scanned longest-first. The order is part of the
/// contract: when a title carries several formats, the first hit in this
/// list is the one reported (AZW3 must win over AZW, DOCX over DOC).
pub const BOOK_FORMAT_SCAN_ORDER: &[&str] = &[
    "EPUB", "MOBI", "AZW3", "DJVU", "DOCX",
    "AZW", "PDF", "CBR", "CBZ", "FB2", "LIT", "LRF", "PDB", "DOC", "RTF", "TXT",
];

/// Categories that imply a quality when nothing else names one.
const CATEGORY_QUALITY_HINTS: &[(&str, &str)] = &[("3010", "WEB"), ("3040", "FLAC")];

/// When several hinted categories are present, prefer the more specific one.
const CATEGORY_QUALITY_PRIORITY: &[&str] = &["3040", "3010"];

/// First known audio quality token found in `text` as a whole word,
/// case-insensitive, in scan order.
pub fn find_audio_quality(text: &str) -> Option<&'static str> {
    if text.is_empty() {
        return None;
    }
    let upper = text.to_uppercase();
    AUDIO_QUALITY_SCAN_ORDER
        .iter()
        .find(|token| contains_word(&upper, token))
        .copied()
}

/// Resolve a quality for an audio entry.
///
/// Precedence: the `audio` attribute annotation, then the original title,
/// then a category hint.
pub fn detect_quality(
    attrs: &AttributeMap,
    original_title: &str,
    categories: &CategorySet,
) -> Option<&'static str> {
    if let Some(quality) = attrs.get("audio").and_then(find_audio_quality) {
        return Some(quality);
    }

    if let Some(quality) = find_audio_quality(original_title) {
        return Some(quality);
    }

    for code in CATEGORY_QUALITY_PRIORITY {
        if categories.contains(code) {
            return hint_for(code);
        }
    }

    categories.iter().find_map(hint_for)
}

/// First known book format token found in `title` as a whole word.
pub fn detect_book_format(title: &str) -> Option<&'static str> {
    let upper = title.to_uppercase();
    BOOK_FORMAT_SCAN_ORDER
        .iter()
        .find(|token| contains_word(&upper, token))
        .copied()
}

fn hint_for(code: &str) -> Option<&'static str> {
    CATEGORY_QUALITY_HINTS
        .iter()
        .find(|(hinted, _)| *hinted == code)
        .map(|(_, quality)| *quality)
}

/// Whole-word containment over an upper-cased haystack. A match counts only
/// when neither neighbouring character is a word character, mirroring the
/// `\b` anchors the tokens were designed against.
fn contains_word(haystack: &str, token: &str) -> bool {
    let bytes = haystack.as_bytes();
    let mut start = 0;
    while let Some(position) = haystack[start..].find(token) {
        let begin = start + position;
        let end = begin + token.len();
        let before_ok = begin == 0 || !is_word_byte(bytes[begin - 1]);
        let after_ok = end == bytes.len() || !is_word_byte(bytes[end]);
        if before_ok && after_ok {
            return true;
        }
        start = begin + 1;
    }
    false
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || !byte.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::{detect_book_format, detect_quality, find_audio_quality};
    use crate::attrs::{AttributeMap, CategorySet};

    #[test]
    fn finds_quality_in_title() {
        assert_eq!(find_audio_quality("Something-FLAC-2020"), Some("FLAC"));
        assert_eq!(find_audio_quality("Something-MP3-320"), Some("MP3"));
        assert_eq!(find_audio_quality("No quality here"), None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(find_audio_quality("album in flac please"), Some("FLAC"));
    }

    #[test]
    fn longest_token_wins() {
        assert_eq!(find_audio_quality("Album DSD64 rip"), Some("DSD64"));
        assert_eq!(find_audio_quality("Album DSD rip"), Some("DSD"));
        assert_eq!(find_audio_quality("Album 24-BIT master"), Some("24-BIT"));
    }

    #[test]
    fn requires_word_boundaries() {
        // CD inside a word must not match
        assert_eq!(find_audio_quality("ACDC Discography"), None);
        assert_eq!(find_audio_quality("320kbps"), None);
    }

    #[test]
    fn audio_attribute_takes_precedence() {
        let mut attrs = AttributeMap::default();
        attrs.insert("audio", "MP3 320kbps");
        let categories = CategorySet::default();
        assert_eq!(detect_quality(&attrs, "Title-FLAC", &categories), Some("MP3"));
    }

    #[test]
    fn title_beats_category_hint() {
        let attrs = AttributeMap::default();
        let mut categories = CategorySet::default();
        categories.insert("3010");
        assert_eq!(detect_quality(&attrs, "Title-FLAC", &categories), Some("FLAC"));
    }

    #[test]
    fn category_hints_follow_priority() {
        let attrs = AttributeMap::default();
        let mut categories = CategorySet::default();
        categories.insert("3010");
        categories.insert("3040");
        assert_eq!(detect_quality(&attrs, "plain title", &categories), Some("FLAC"));

        let mut web_only = CategorySet::default();
        web_only.insert("3010");
        assert_eq!(detect_quality(&attrs, "plain title", &web_only), Some("WEB"));
    }

    #[test]
    fn no_quality_resolves_to_none() {
        let attrs = AttributeMap::default();
        let mut categories = CategorySet::default();
        categories.insert("3000");
        assert_eq!(detect_quality(&attrs, "plain title", &categories), None);
    }

    #[test]
    fn book_format_from_title() {
        assert_eq!(detect_book_format("Some-Publisher-BookTitle-EPUB"), Some("EPUB"));
        assert_eq!(detect_book_format("Report azw3 retail"), Some("AZW3"));
        assert_eq!(detect_book_format("No format"), None);
    }
}
