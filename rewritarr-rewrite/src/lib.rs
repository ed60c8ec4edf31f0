mod attrs;
mod config;
mod detect;
mod feed;
mod sanitize;
mod title;

pub use attrs::{AttributeMap, CategorySet};
pub use config::RewriteConfig;
pub use detect::{detect_book_format, detect_quality, find_audio_quality};
pub use feed::{FeedOutcome, PassthroughReason, RewriteEngine};
pub use sanitize::{escape_delimiters, sanitize_field};
pub use title::{
    MediaKind, build_audiobook_title, build_book_title, build_music_title, classify,
};
