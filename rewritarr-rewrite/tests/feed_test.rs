use assert_matches::assert_matches;
use rewritarr_rewrite::{FeedOutcome, PassthroughReason, RewriteConfig, RewriteEngine};

const MUSIC_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom"
     xmlns:newznab="http://www.newznab.com/DTD/2010/feeds/attributes/">
  <channel>
    <title>Test Indexer</title>
    <item>
      <title>Beispiel-Firma GmbH-Cybercast-Folge 19: Securing an Austrian Silicon Fab-FLAC-2017</title>
      <guid>https://indexer.example.com/details/798d4debe1360a81ca03e4d54419ddfb</guid>
      <category>3000</category>
      <newznab:attr name="category" value="3000"/>
      <newznab:attr name="size" value="316887082"/>
      <newznab:attr name="album" value="Cybercast"/>
      <newznab:attr name="artist" value="Tatjana Schaumberger"/>
      <newznab:attr name="publisher" value="Beispiel-Firma GmbH"/>
      <newznab:attr name="track" value="Folge 19: Securing an Austrian Silicon Fab"/>
      <newznab:attr name="coverurl" value=""/>
    </item>
  </channel>
</rss>"#;

const BOOK_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:newznab="http://www.newznab.com/DTD/2010/feeds/attributes/">
  <channel>
    <title>Test Indexer</title>
    <item>
      <title>Cybersecurity Report in automotive Industry</title>
      <guid>https://indexer.example.com/details/abc123</guid>
      <category>7020</category>
      <newznab:attr name="category" value="7020"/>
      <newznab:attr name="author" value="Max Mustermann"/>
      <newznab:attr name="booktitle" value="Cybersecurity Report in Automotive Industry"/>
      <newznab:attr name="year" value="2025"/>
    </item>
  </channel>
</rss>"#;

const AUDIOBOOK_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:newznab="http://www.newznab.com/DTD/2010/feeds/attributes/">
  <channel>
    <title>Test Indexer</title>
    <item>
      <title>SomeBadTitle-Verlag-Mein Buch-2024</title>
      <category>3030</category>
      <newznab:attr name="category" value="3030"/>
      <newznab:attr name="artist" value="Anna Schmidt"/>
      <newznab:attr name="album" value="Das große Abenteuer"/>
      <newznab:attr name="track" value="Kapitel 1-20"/>
    </item>
  </channel>
</rss>"#;

const MULTI_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:newznab="http://www.newznab.com/DTD/2010/feeds/attributes/">
  <channel>
    <title>Test Indexer</title>
    <item>
      <title>Bad-Title-Music-FLAC-2020</title>
      <category>3000</category>
      <newznab:attr name="category" value="3000"/>
      <newznab:attr name="artist" value="Die Toten Hosen"/>
      <newznab:attr name="album" value="Alles ohne Strom"/>
    </item>
    <item>
      <title>No attrs here just a normal title</title>
      <category>3000</category>
      <newznab:attr name="category" value="3000"/>
    </item>
    <item>
      <title>Some-Publisher-BookTitle-EPUB</title>
      <category>7020</category>
      <newznab:attr name="category" value="7020"/>
      <newznab:attr name="author" value="Friedrich Dürrenmatt"/>
      <newznab:attr name="booktitle" value="Der Besuch der alten Dame"/>
      <newznab:attr name="year" value="1956"/>
    </item>
  </channel>
</rss>"#;

fn engine() -> RewriteEngine {
    RewriteEngine::new(RewriteConfig::default())
}

fn rewritten_body(outcome: FeedOutcome) -> String {
    match outcome {
        FeedOutcome::Rewritten { body, .. } => String::from_utf8(body).expect("utf-8 output"),
        other => panic!("expected a rewrite, got {other:?}"),
    }
}

#[test]
fn rewrites_music_item_from_attributes() {
    let output = rewritten_body(engine().process(MUSIC_FEED.as_bytes()));

    assert!(output.contains(
        "<title>Tatjana Schaumberger-Cybercast-Folge 19: Securing an Austrian Silicon Fab-FLAC-2017</title>"
    ));
    assert!(!output.contains("<title>Beispiel-Firma GmbH"));
    // everything around the title survives untouched
    assert!(output.contains(
        "<guid>https://indexer.example.com/details/798d4debe1360a81ca03e4d54419ddfb</guid>"
    ));
    assert!(output.contains(r#"xmlns:newznab="http://www.newznab.com/DTD/2010/feeds/attributes/""#));
    assert!(output.contains(r#"<newznab:attr name="publisher" value="Beispiel-Firma GmbH"/>"#));
}

#[test]
fn rewrites_book_item_with_author_title_year() {
    let output = rewritten_body(engine().process(BOOK_FEED.as_bytes()));

    assert!(output.contains(
        "<title>Max Mustermann - Cybersecurity Report in Automotive Industry (2025)</title>"
    ));
}

#[test]
fn rewrites_audiobook_with_artist_fallback_and_track() {
    let output = rewritten_body(engine().process(AUDIOBOOK_FEED.as_bytes()));

    assert!(output.contains("Anna Schmidt"));
    assert!(output.contains("Das große Abenteuer"));
    assert!(output.contains("Kapitel 1 20"));
    assert!(output.contains("(2024)"));
    assert!(!output.contains("SomeBadTitle"));
}

#[test]
fn processes_items_independently() {
    let outcome = engine().process(MULTI_FEED.as_bytes());
    assert_matches!(
        outcome,
        FeedOutcome::Rewritten {
            rewritten: 2,
            total: 3,
            ..
        }
    );

    let output = rewritten_body(outcome);
    assert!(output.contains("<title>Die Toten Hosen-Alles ohne Strom-FLAC-2020</title>"));
    // the attr-less middle item is byte-identical
    assert!(output.contains("<title>No attrs here just a normal title</title>"));
    assert!(
        output.contains("<title>Friedrich Dürrenmatt - Der Besuch der alten Dame (1956) EPUB</title>")
    );
}

#[test]
fn non_xml_input_passes_through() {
    let outcome = engine().process(b"This is not XML at all");
    assert_matches!(outcome, FeedOutcome::Passthrough(_));
}

#[test]
fn document_without_channel_passes_through() {
    let outcome = engine().process(b"<?xml version=\"1.0\"?><root><foo/></root>");
    assert_matches!(
        outcome,
        FeedOutcome::Passthrough(PassthroughReason::NoChannel)
    );
}

#[test]
fn channel_without_items_passes_through() {
    let outcome =
        engine().process(b"<rss><channel><title>Empty Indexer</title></channel></rss>");
    assert_matches!(outcome, FeedOutcome::Passthrough(PassthroughReason::NoItems));
}

#[test]
fn items_without_usable_attributes_pass_through() {
    let feed = r#"<rss><channel><item><title>Plain old title</title></item></channel></rss>"#;
    let outcome = engine().process(feed.as_bytes());
    assert_matches!(
        outcome,
        FeedOutcome::Passthrough(PassthroughReason::NothingRewritten)
    );
}

#[test]
fn rewriting_twice_is_stable() {
    let first = rewritten_body(engine().process(MUSIC_FEED.as_bytes()));

    // a second pass rebuilds the identical title and leaves the feed alone
    let second = engine().process(first.as_bytes());
    assert_matches!(
        second,
        FeedOutcome::Passthrough(PassthroughReason::NothingRewritten)
    );
}

#[test]
fn debug_attrs_preserve_the_original_title() {
    let config = RewriteConfig {
        debug_attrs: true,
        ..RewriteConfig::default()
    };
    let output = rewritten_body(RewriteEngine::new(config).process(BOOK_FEED.as_bytes()));

    assert!(output.contains(r#"<newznab:attr name="original_title" value="Cybersecurity Report in automotive Industry"/>"#));
}

#[test]
fn disabled_kinds_are_not_rewritten() {
    let config = RewriteConfig {
        books: false,
        ..RewriteConfig::default()
    };
    let outcome = RewriteEngine::new(config).process(BOOK_FEED.as_bytes());
    assert_matches!(
        outcome,
        FeedOutcome::Passthrough(PassthroughReason::NothingRewritten)
    );
}

#[test]
fn picks_the_longest_quality_token() {
    let feed = r#"<rss xmlns:newznab="http://www.newznab.com/DTD/2010/feeds/attributes/"><channel><item>
      <title>Artist Album DSD64 2021</title>
      <category>3000</category>
      <newznab:attr name="artist" value="Artist"/>
      <newznab:attr name="album" value="Album"/>
    </item></channel></rss>"#;

    let output = rewritten_body(engine().process(feed.as_bytes()));
    assert!(output.contains("<title>Artist-Album-DSD64-2021</title>"));
}
