//! Parse, save and reparse real-world shaped GData documents.

use gdata_atom::model::{AtomNode, Feed};
use gdata_atom::primitives::{BatchOperationType, TextKind};
use gdata_atom::{AtomFeedParser, ParserOptions, WriteOptions};
use pretty_assertions::assert_eq;

const ITEMS_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"
      xmlns:openSearch="http://a9.com/-/spec/opensearchrss/1.0/"
      xmlns:batch="http://schemas.google.com/gdata/batch"
      xmlns:gd="http://schemas.google.com/g/2005"
      xml:base="http://example.com/" xml:lang="en" gd:etag="W/abc">
  <id>http://example.com/feeds/items</id>
  <updated>2024-05-01T10:00:00Z</updated>
  <title type="text">Items</title>
  <subtitle type="html">&lt;b&gt;All&lt;/b&gt; items</subtitle>
  <generator version="1.0" uri="http://example.com/gen">Gen</generator>
  <icon>/icon.png</icon>
  <author><name>Ann</name><email>ann@example.com</email></author>
  <contributor><name>Bob</name></contributor>
  <category term="items" scheme="http://example.com/schemes"/>
  <link rel="self" type="application/atom+xml" href="feeds/items"/>
  <link rel="alternate" type="text/html" href="items.html" hreflang="en" title="Items" length="1024"/>
  <openSearch:totalResults>2</openSearch:totalResults>
  <openSearch:startIndex>1</openSearch:startIndex>
  <openSearch:itemsPerPage>25</openSearch:itemsPerPage>
  <batch:operation type="insert"/>
  <gd:where valueString="Zurich"/>
  <entry gd:etag="W/e1">
    <id>urn:item:1</id>
    <published>2024-04-30T08:15:00+02:00</published>
    <updated>2024-05-01T09:30:00.250Z</updated>
    <title>First &amp; foremost</title>
    <summary type="text">One</summary>
    <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Hello <b>world</b></p></div></content>
    <gd:rating value="4" max="5"/>
    <batch:id>1</batch:id>
    <batch:operation type="update"/>
    <batch:status code="200" reason="Success"/>
  </entry>
  <entry>
    <id>urn:item:2</id>
    <content type="html">&lt;p&gt;Two&lt;/p&gt;</content>
    <source><id>urn:origin</id><title>Origin</title></source>
  </entry>
</feed>"#;

fn reparse(xml: &str) -> Feed {
    match xml.parse() {
        Ok(feed) => feed,
        Err(e) => panic!("failed to reparse {xml}: {e}"),
    }
}

#[test]
fn test_typed_fields_are_read() {
    let feed: Feed = ITEMS_FEED.parse().unwrap();
    let source = feed.source();

    assert_eq!(source.id().unwrap().uri().as_str(), "http://example.com/feeds/items");
    assert_eq!(source.title().unwrap().text(), "Items");
    assert_eq!(source.subtitle().unwrap().kind(), TextKind::Html);
    assert_eq!(source.subtitle().unwrap().text(), "<b>All</b> items");
    assert_eq!(source.generator().unwrap().version(), Some("1.0"));
    assert_eq!(source.authors().len(), 1);
    assert_eq!(source.contributors().get(0).unwrap().name(), Some("Bob"));
    assert_eq!(source.links().len(), 2);
    assert_eq!(feed.common().language(), Some("en"));

    assert_eq!(feed.total_results(), Some(2));
    assert_eq!(feed.start_index(), Some(1));
    assert_eq!(feed.items_per_page(), Some(25));
    assert_eq!(feed.batch().unwrap().operation, BatchOperationType::Insert);

    let alternate = source.links().find_service(Some("alternate"), None).unwrap();
    assert_eq!(alternate.length(), Some(1024));
    assert_eq!(
        alternate.absolute_href(feed.common().base()).as_deref(),
        Some("http://example.com/items.html")
    );

    let first = feed.entries().get(0).unwrap();
    assert_eq!(first.title().unwrap().text(), "First & foremost");
    let batch = first.batch().unwrap();
    assert_eq!(batch.id.as_deref(), Some("1"));
    assert_eq!(batch.operation, Some(BatchOperationType::Update));
    assert_eq!(batch.status.as_ref().unwrap().code, Some(200));

    assert!(!feed.is_dirty());
}

#[test]
fn test_round_trip_is_stable() {
    let feed: Feed = ITEMS_FEED.parse().unwrap();
    let xml = feed.to_xml_string().unwrap();
    let reparsed = reparse(&xml);

    assert_eq!(feed, reparsed);
    assert_eq!(xml, reparsed.to_xml_string().unwrap());
}

#[test]
fn test_pretty_round_trip_is_stable() {
    let feed: Feed = ITEMS_FEED.parse().unwrap();
    let xml = feed.to_xml_string_with(&WriteOptions::pretty()).unwrap();
    assert!(xml.contains("\n  <id>http://example.com/feeds/items</id>"));

    assert_eq!(feed, reparse(&xml));
}

#[test]
fn test_extensions_survive() {
    let feed: Feed = ITEMS_FEED.parse().unwrap();
    let xml = feed.to_xml_string().unwrap();

    assert!(xml.contains("gd:etag=\"W/abc\""));
    assert!(xml.contains("<gd:where xmlns:gd=\"http://schemas.google.com/g/2005\" valueString=\"Zurich\"/>"));
    assert!(xml.contains("<gd:rating xmlns:gd=\"http://schemas.google.com/g/2005\" value=\"4\" max=\"5\"/>"));

    let entry = feed.entries().get(0).unwrap();
    let rating = entry
        .common()
        .extensions()
        .find("http://schemas.google.com/g/2005", "rating")
        .unwrap();
    assert!(!rating.is_attribute());
    let etag = entry.common().extensions().attributes().next().unwrap();
    assert_eq!(etag.qualified_name(), "gd:etag");
    assert_eq!(etag.value, "W/e1");
}

#[test]
fn test_xhtml_and_html_content_differ() {
    let feed: Feed = ITEMS_FEED.parse().unwrap();

    let xhtml = feed.entries().get(0).unwrap().content().unwrap();
    assert!(xhtml.is_xhtml());
    assert_eq!(
        xhtml.body(),
        Some("<div xmlns=\"http://www.w3.org/1999/xhtml\"><p>Hello <b>world</b></p></div>")
    );

    let html = feed.entries().get(1).unwrap().content().unwrap();
    assert!(!html.is_xhtml());
    assert_eq!(html.body(), Some("<p>Two</p>"));

    let xml = feed.to_xml_string().unwrap();
    assert!(xml.contains("<content type=\"xhtml\"><div xmlns=\"http://www.w3.org/1999/xhtml\"><p>Hello <b>world</b></p></div></content>"));
    assert!(xml.contains("<content type=\"html\">&lt;p&gt;Two&lt;/p&gt;</content>"));
}

#[test]
fn test_entry_source_is_kept() {
    let feed: Feed = ITEMS_FEED.parse().unwrap();
    let source = feed.entries().get(1).unwrap().source().unwrap();
    assert_eq!(source.id().unwrap().uri().as_str(), "urn:origin");
    assert_eq!(source.title().unwrap().text(), "Origin");

    let xml = feed.to_xml_string().unwrap();
    assert!(xml.contains("<source><id>urn:origin</id><title>Origin</title></source>"));
}

#[test]
fn test_standalone_entry_document() {
    let xml = r#"<entry><id>urn:1</id><title type="text">A &amp; B</title></entry>"#;
    let feed: Feed = xml.parse().unwrap();

    assert_eq!(feed.entries().len(), 1);
    let entry = feed.entries().get(0).unwrap();
    assert_eq!(entry.id().unwrap().uri().as_str(), "urn:1");
    assert_eq!(entry.title().unwrap().text(), "A & B");
    assert_eq!(entry.title().unwrap().kind(), TextKind::Text);

    let saved = entry.to_xml_string().unwrap();
    assert!(saved.ends_with(
        "<entry xmlns=\"http://www.w3.org/2005/Atom\"><id>urn:1</id><title>A &amp; B</title></entry>"
    ));
}

#[test]
fn test_batch_errors_are_opt_in() {
    let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:batch="http://schemas.google.com/gdata/batch">
      <entry>
        <batch:status code="400" reason="Bad Request" content-type="text/plain">
          <batch:errors>
            <batch:error type="request" reason="Invalid value" field="price"/>
          </batch:errors>
        </batch:status>
        <batch:interrupt reason="too many errors" success="3" failures="1" parsed="5" unprocessed="1"/>
      </entry>
    </feed>"#;

    let feed: Feed = xml.parse().unwrap();
    let status = feed.entries().get(0).unwrap().batch().unwrap().status.clone().unwrap();
    assert_eq!(status.code, Some(400));
    assert_eq!(status.content_type.as_deref(), Some("text/plain"));
    assert!(status.errors.is_empty());

    let parser = AtomFeedParser::with_options(ParserOptions {
        parse_batch_errors: true,
        ..Default::default()
    });
    let mut feed = Feed::new();
    parser.parse(xml.as_bytes(), &mut feed).unwrap();

    let batch = feed.entries().get(0).unwrap().batch().unwrap();
    let errors = &batch.status.as_ref().unwrap().errors;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type.as_deref(), Some("request"));
    assert_eq!(errors[0].field.as_deref(), Some("price"));

    let interrupt = batch.interrupt.as_ref().unwrap();
    assert_eq!(interrupt.successes, 3);
    assert_eq!(interrupt.failures, 1);
    assert_eq!(interrupt.parsed, 5);
    assert_eq!(interrupt.unprocessed, 1);
}

#[test]
fn test_unknown_batch_operation_fails_the_parse() {
    let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:batch="http://schemas.google.com/gdata/batch">
      <batch:operation type="upsert"/>
    </feed>"#;

    let err = xml.parse::<Feed>().unwrap_err();
    assert!(err.to_string().contains("Parsing failed"));
    let cause = std::error::Error::source(&err).unwrap();
    assert!(cause.to_string().contains("upsert"));
}

#[test]
fn test_malformed_counter_fails_the_parse() {
    let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:openSearch="http://a9.com/-/spec/opensearch/1.1/">
      <openSearch:totalResults>many</openSearch:totalResults>
    </feed>"#;

    assert!(xml.parse::<Feed>().is_err());
}

#[test]
fn test_opensearch_namespace_follows_protocol_version() {
    let mut feed = Feed::new();
    feed.set_total_results(5);
    let xml = feed.to_xml_string().unwrap();
    assert!(xml.contains("xmlns:openSearch=\"http://a9.com/-/spec/opensearchrss/1.0/\""));
    assert!(xml.contains("<openSearch:totalResults>5</openSearch:totalResults>"));

    feed.set_protocol_version(2, 0);
    let xml = feed.to_xml_string().unwrap();
    assert!(xml.contains("xmlns:openSearch=\"http://a9.com/-/spec/opensearch/1.1/\""));

    let reparsed = reparse(&xml);
    assert_eq!(reparsed.total_results(), Some(5));
}

#[test]
fn test_unknown_root_is_ignored() {
    let feed: Feed = "<rss version=\"2.0\"><channel/></rss>".parse().unwrap();
    assert!(feed.entries().is_empty());
    assert!(!feed.has_content());
}

#[test]
fn test_captured_extension_declares_prefixes_from_ancestors() {
    let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:g="urn:g" xmlns:h="urn:h"><g:item h:flag="1"><h:sub>x</h:sub></g:item></feed>"#;
    let feed: Feed = xml.parse().unwrap();
    let item = feed.source().common().extensions().find("urn:g", "item").unwrap();
    assert!(!item.is_attribute());

    let saved = feed.to_xml_string().unwrap();
    assert!(saved.contains(r#"<g:item xmlns:g="urn:g" xmlns:h="urn:h" h:flag="1"><h:sub>x</h:sub></g:item>"#));

    let reparsed = reparse(&saved);
    assert_eq!(feed, reparsed);
    assert_eq!(saved, reparsed.to_xml_string().unwrap());
}

#[test]
fn test_prefixed_xhtml_content_keeps_its_namespace() {
    let xml = r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:xhtml="http://www.w3.org/1999/xhtml"><id>urn:x</id><content type="xhtml"><xhtml:div>hi</xhtml:div></content></entry>"#;
    let feed: Feed = xml.parse().unwrap();
    let content = feed.entries().get(0).unwrap().content().unwrap();
    assert_eq!(
        content.body(),
        Some(r#"<xhtml:div xmlns:xhtml="http://www.w3.org/1999/xhtml">hi</xhtml:div>"#)
    );

    let saved = feed.entries().get(0).unwrap().to_xml_string().unwrap();
    assert!(saved.contains(r#"<content type="xhtml"><xhtml:div xmlns:xhtml="http://www.w3.org/1999/xhtml">hi</xhtml:div></content>"#));
    assert_eq!(feed.entries().get(0), reparse(&saved).entries().get(0));
}

#[test]
fn test_repeated_self_link_keeps_the_last() {
    let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
      <link rel="self" href="http://a"/>
      <link rel="self" href="http://b"/>
    </feed>"#;
    let feed: Feed = xml.parse().unwrap();
    let links = feed.source().links();
    assert_eq!(links.len(), 1);
    assert_eq!(links.get(0).unwrap().href().unwrap().as_str(), "http://b");
}
