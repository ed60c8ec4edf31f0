use std::sync::LazyLock;

use regex::Regex;

use crate::attrs::{AttributeMap, CategorySet};
use crate::config::RewriteConfig;
use crate::detect::{
    AUDIO_CATEGORIES, AUDIOBOOK_CATEGORIES, BOOK_CATEGORIES, detect_book_format, detect_quality,
};
use crate::sanitize::{escape_delimiters, sanitize_field};

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Music,
    Book,
    Audiobook,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Music => "music",
            MediaKind::Book => "book",
            MediaKind::Audiobook => "audiobook",
        }
    }
}

/// Classify an entry by its category codes, honouring the per-kind toggles.
///
/// Audiobook wins over book wins over audio; a disabled kind falls through
/// to the next match, so an entry in both the audiobook and general audio
/// sets still rewrites as music when audiobooks are switched off.
pub fn classify(categories: &CategorySet, config: &RewriteConfig) -> Option<MediaKind> {
    if config.audiobooks && categories.intersects(AUDIOBOOK_CATEGORIES) {
        return Some(MediaKind::Audiobook);
    }
    if config.books && categories.intersects(BOOK_CATEGORIES) {
        return Some(MediaKind::Book);
    }
    if config.music && categories.intersects(AUDIO_CATEGORIES) {
        return Some(MediaKind::Music);
    }
    None
}

/// Build a music title of the shape {artist}-{album}-{track}-{quality}-{year}.
///
/// Artist and album pass through sanitisation and delimiter escaping so the
/// joining hyphens stay the only field separators in the result.
pub fn build_music_title(
    attrs: &AttributeMap,
    original_title: &str,
    categories: &CategorySet,
    best_effort: bool,
) -> Option<String> {
    let artist = attrs.get("artist");
    let album = attrs.get("album");

    if artist.is_none() && album.is_none() {
        if !best_effort {
            return None;
        }
        // nothing to identify the release by, best effort or not
        return None;
    }

    let artist = sanitize_field(artist.unwrap_or(""));
    let album = sanitize_field(album.unwrap_or(""));

    let mut parts = vec![escape_delimiters(&artist)];

    if !album.is_empty() {
        parts.push(escape_delimiters(&album));
    }

    if let Some(track) = attrs.get("track") {
        let track = escape_delimiters(&sanitize_field(track));
        if !track.is_empty() {
            parts.push(track);
        }
    }

    if let Some(quality) = detect_quality(attrs, original_title, categories) {
        parts.push(quality.to_string());
    }

    if let Some(year) = resolve_year(attrs, original_title) {
        parts.push(year);
    }

    Some(parts.join("-"))
}

/// Build a book title of the shape "{author} - {booktitle} ({year}) {format}".
pub fn build_book_title(
    attrs: &AttributeMap,
    original_title: &str,
    best_effort: bool,
) -> Option<String> {
    let author = attrs.get("author");
    let book_title = attrs
        .get("booktitle")
        .or_else(|| attrs.get("title"))
        .or_else(|| attrs.get("album"));

    if author.is_none() && book_title.is_none() {
        if !best_effort {
            return None;
        }
        return None;
    }

    let author = sanitize_field(author.unwrap_or(""));
    let book_title = sanitize_field(book_title.unwrap_or(""));

    let mut result = join_author_title(&author, &book_title);

    if let Some(year) = resolve_year(attrs, original_title) {
        result.push_str(&format!(" ({year})"));
    }
    if let Some(format) = detect_book_format(original_title) {
        result.push(' ');
        result.push_str(format);
    }

    Some(result)
}

/// Build an audiobook title: like a book title, but the author may come from
/// the artist attribute and a track annotation extends the title when it
/// adds information. No format suffix.
pub fn build_audiobook_title(attrs: &AttributeMap, original_title: &str) -> Option<String> {
    let author = attrs.get("author").or_else(|| attrs.get("artist"));
    let title = attrs
        .get("booktitle")
        .or_else(|| attrs.get("title"))
        .or_else(|| attrs.get("album"));

    if author.is_none() && title.is_none() {
        return None;
    }

    let author = sanitize_field(author.unwrap_or(""));
    let mut title = sanitize_field(title.unwrap_or(""));

    if let Some(track) = attrs.get("track") {
        let track = sanitize_field(track);
        if !track.is_empty() && !title.to_lowercase().contains(&track.to_lowercase()) {
            title = if title.is_empty() {
                track
            } else {
                format!("{title} {track}")
            };
        }
    }

    let mut result = join_author_title(&author, &title);

    if let Some(year) = resolve_year(attrs, original_title) {
        result.push_str(&format!(" ({year})"));
    }

    Some(result)
}

fn join_author_title(author: &str, title: &str) -> String {
    if !author.is_empty() && !title.is_empty() {
        format!("{author} - {title}")
    } else if !author.is_empty() {
        author.to_string()
    } else {
        title.to_string()
    }
}

/// Year from the year attribute, else the first 19xx/20xx token in the
/// original title.
fn resolve_year(attrs: &AttributeMap, original_title: &str) -> Option<String> {
    if let Some(year) = attrs.get("year") {
        return Some(year.to_string());
    }
    YEAR_PATTERN
        .find(original_title)
        .map(|found| found.as_str().to_string())
}
