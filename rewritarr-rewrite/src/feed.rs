use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use quick_xml::writer::Writer;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

use crate::attrs::{AttributeMap, CategorySet};
use crate::config::RewriteConfig;
use crate::title::{
    MediaKind, build_audiobook_title, build_book_title, build_music_title, classify,
};

const NEWZNAB_NS: &[u8] = b"http://www.newznab.com/DTD/2010/feeds/attributes/";
const ORIGINAL_TITLE_ATTR: &str = "original_title";

/// Result of running the engine over one response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// The input must be forwarded unchanged; the reason says why.
    Passthrough(PassthroughReason),
    Rewritten {
        body: Vec<u8>,
        rewritten: usize,
        total: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassthroughReason {
    ParseFailed(String),
    NoChannel,
    NoItems,
    NothingRewritten,
}

impl fmt::Display for PassthroughReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassthroughReason::ParseFailed(message) => {
                write!(f, "input is not well-formed XML: {message}")
            }
            PassthroughReason::NoChannel => write!(f, "no channel element found"),
            PassthroughReason::NoItems => write!(f, "no items in feed"),
            PassthroughReason::NothingRewritten => write!(f, "no titles needed rewriting"),
        }
    }
}

/// Rewrites item titles in a newznab search response.
///
/// The document streams through untouched except for items whose attribute
/// annotations produce a different title; passthrough always returns the
/// original input bytes rather than a re-serialisation, so content the
/// engine does not rewrite is preserved byte for byte. The engine never
/// fails: anything unparseable is a passthrough outcome.
#[derive(Debug, Clone)]
pub struct RewriteEngine {
    config: RewriteConfig,
}

impl RewriteEngine {
    pub fn new(config: RewriteConfig) -> Self {
        Self { config }
    }

    pub fn process(&self, input: &[u8]) -> FeedOutcome {
        let transformed = match self.transform(input) {
            Ok(transformed) => transformed,
            Err(error) => {
                debug!("not a parseable feed, passing through unchanged: {error}");
                return FeedOutcome::Passthrough(PassthroughReason::ParseFailed(
                    error.to_string(),
                ));
            }
        };

        if !transformed.saw_channel {
            return FeedOutcome::Passthrough(PassthroughReason::NoChannel);
        }
        if transformed.items == 0 {
            return FeedOutcome::Passthrough(PassthroughReason::NoItems);
        }
        if transformed.rewritten == 0 {
            return FeedOutcome::Passthrough(PassthroughReason::NothingRewritten);
        }

        info!(
            "rewrote {}/{} titles in response",
            transformed.rewritten, transformed.items
        );
        FeedOutcome::Rewritten {
            body: transformed.body,
            rewritten: transformed.rewritten,
            total: transformed.items,
        }
    }

    fn transform(&self, input: &[u8]) -> Result<Transformed, FeedError> {
        let mut reader = NsReader::from_reader(input);
        let mut writer = Writer::new(Vec::with_capacity(input.len()));

        let mut saw_channel = false;
        let mut items = 0usize;
        let mut rewritten = 0usize;
        let mut capture: Option<ItemCapture<'_>> = None;

        loop {
            let (resolve, event) = reader.read_resolved_event()?;
            if matches!(event, Event::Eof) {
                break;
            }
            let attr_element = is_newznab_attr(&resolve, &event);

            if let Some(mut item) = capture.take() {
                item.absorb(event, attr_element);
                if item.closed {
                    if item.finish(&self.config, &mut writer)? {
                        rewritten += 1;
                    }
                } else {
                    capture = Some(item);
                }
                continue;
            }

            match top_level_kind(&event) {
                TopLevel::Channel => {
                    saw_channel = true;
                    writer.write_event(event)?;
                }
                TopLevel::ItemStart => {
                    items += 1;
                    let mut item = ItemCapture::default();
                    item.absorb(event, false);
                    capture = Some(item);
                }
                TopLevel::ItemEmpty => {
                    items += 1;
                    writer.write_event(event)?;
                }
                TopLevel::Other => writer.write_event(event)?,
            }
        }

        // an unterminated item keeps the document shape by replaying verbatim
        if let Some(item) = capture.take() {
            for event in item.events {
                writer.write_event(event)?;
            }
        }

        Ok(Transformed {
            body: writer.into_inner(),
            saw_channel,
            items,
            rewritten,
        })
    }
}

struct Transformed {
    body: Vec<u8>,
    saw_channel: bool,
    items: usize,
    rewritten: usize,
}

/// Internal only; every variant collapses to a passthrough outcome.
#[derive(Debug, Error)]
enum FeedError {
    #[error("{0}")]
    Xml(#[from] quick_xml::Error),
    #[error("{0}")]
    Write(#[from] std::io::Error),
}

enum TopLevel {
    Channel,
    ItemStart,
    ItemEmpty,
    Other,
}

fn top_level_kind(event: &Event<'_>) -> TopLevel {
    match event {
        Event::Start(element) => match element.local_name().as_ref() {
            b"channel" => TopLevel::Channel,
            b"item" => TopLevel::ItemStart,
            _ => TopLevel::Other,
        },
        Event::Empty(element) if element.local_name().as_ref() == b"item" => TopLevel::ItemEmpty,
        _ => TopLevel::Other,
    }
}

fn is_newznab_attr(resolve: &ResolveResult<'_>, event: &Event<'_>) -> bool {
    let local = match event {
        Event::Start(element) => element.local_name(),
        Event::Empty(element) => element.local_name(),
        _ => return false,
    };
    local.as_ref() == b"attr"
        && matches!(resolve, ResolveResult::Bound(Namespace(ns)) if *ns == NEWZNAB_NS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Child {
    Title,
    Category,
    Other,
}

/// One `<item>` being buffered: its raw events plus everything the rewrite
/// decision needs, gathered while the events stream in.
#[derive(Default)]
struct ItemCapture<'i> {
    events: Vec<Event<'i>>,
    depth: usize,
    closed: bool,
    current: Option<Child>,
    title: String,
    title_indices: Vec<usize>,
    attrs: AttributeMap,
    categories: CategorySet,
    attr_qname: Option<Vec<u8>>,
}

impl<'i> ItemCapture<'i> {
    fn absorb(&mut self, event: Event<'i>, attr_element: bool) {
        let index = self.events.len();
        match &event {
            Event::Start(element) => {
                if self.depth == 1 {
                    self.enter_child(element, attr_element);
                }
                self.depth += 1;
            }
            Event::Empty(element) => {
                if self.depth == 1 && attr_element {
                    self.record_attr(element);
                }
            }
            Event::End(_) => {
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 1 {
                    self.current = None;
                }
                if self.depth == 0 {
                    self.closed = true;
                }
            }
            Event::Text(text) => {
                if self.depth == 2 {
                    if let Ok(text) = text.unescape() {
                        self.capture_text(index, &text);
                    }
                }
            }
            Event::CData(data) => {
                if self.depth == 2 {
                    let text = String::from_utf8_lossy(data).into_owned();
                    self.capture_text(index, &text);
                }
            }
            _ => {}
        }
        self.events.push(event);
    }

    fn enter_child(&mut self, element: &BytesStart<'_>, attr_element: bool) {
        if attr_element {
            self.record_attr(element);
            self.current = Some(Child::Other);
            return;
        }
        self.current = match element.local_name().as_ref() {
            b"title" => Some(Child::Title),
            b"category" => Some(Child::Category),
            _ => Some(Child::Other),
        };
    }

    fn record_attr(&mut self, element: &BytesStart<'_>) {
        if self.attr_qname.is_none() {
            self.attr_qname = Some(element.name().as_ref().to_vec());
        }

        let mut name = None;
        let mut value = None;
        for attr in element.attributes().flatten() {
            match attr.key.as_ref() {
                b"name" => name = attr.unescape_value().ok().map(|v| v.into_owned()),
                b"value" => value = attr.unescape_value().ok().map(|v| v.into_owned()),
                _ => {}
            }
        }

        if let (Some(name), Some(value)) = (name, value) {
            if name.eq_ignore_ascii_case("category") {
                self.categories.insert(&value);
            }
            self.attrs.insert(&name, &value);
        }
    }

    fn capture_text(&mut self, index: usize, text: &str) {
        match self.current {
            Some(Child::Title) => {
                self.title.push_str(text);
                self.title_indices.push(index);
            }
            Some(Child::Category) => self.categories.insert(text),
            _ => {}
        }
    }

    fn decide(&self, config: &RewriteConfig) -> Option<(MediaKind, String)> {
        if self.title.is_empty() {
            return None;
        }
        if self.attrs.is_empty() {
            debug!("no attribute annotations for '{}'", self.title);
            return None;
        }
        let Some(kind) = classify(&self.categories, config) else {
            debug!("categories not matched for rewrite: '{}'", self.title);
            return None;
        };

        let new_title = match kind {
            MediaKind::Audiobook => build_audiobook_title(&self.attrs, &self.title),
            MediaKind::Book => build_book_title(&self.attrs, &self.title, config.best_effort),
            MediaKind::Music => {
                build_music_title(&self.attrs, &self.title, &self.categories, config.best_effort)
            }
        }?;

        if new_title == self.title {
            return None;
        }
        Some((kind, new_title))
    }

    /// Emit the buffered item, rewritten when a decision was reached.
    /// Returns whether the title changed.
    fn finish(
        self,
        config: &RewriteConfig,
        writer: &mut Writer<Vec<u8>>,
    ) -> Result<bool, FeedError> {
        let Some((kind, new_title)) = self.decide(config) else {
            for event in self.events {
                writer.write_event(event)?;
            }
            return Ok(false);
        };

        info!(
            "[{}] title rewritten: '{}' -> '{}'",
            kind.label(),
            self.title,
            new_title
        );

        let last = self.events.len().saturating_sub(1);
        let first_title_event = self.title_indices.first().copied();
        for (index, event) in self.events.into_iter().enumerate() {
            if Some(index) == first_title_event {
                writer.write_event(Event::Text(BytesText::new(&new_title)))?;
                continue;
            }
            if self.title_indices.contains(&index) {
                continue;
            }
            if index == last && config.debug_attrs {
                let qname = match &self.attr_qname {
                    Some(name) => String::from_utf8_lossy(name).into_owned(),
                    None => "newznab:attr".to_string(),
                };
                let mut debug_attr = BytesStart::new(qname.as_str());
                debug_attr.push_attribute(("name", ORIGINAL_TITLE_ATTR));
                debug_attr.push_attribute(("value", self.title.as_str()));
                writer.write_event(Event::Empty(debug_attr))?;
            }
            writer.write_event(event)?;
        }

        Ok(true)
    }
}
