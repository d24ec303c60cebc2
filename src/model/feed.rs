use super::collections::EntryCollection;
use super::source::Source;
use super::{AtomNode, CommonAttributes, NodeKind, Untracked};
use crate::errors::AtomError;
use crate::names::{BATCH_PREFIX, NS_ATOM, NS_BATCH, NS_OPENSEARCH, NS_OPENSEARCH_RSS, OPENSEARCH_PREFIX};
use crate::parser::AtomFeedParser;
use crate::primitives::BatchFeedData;
use crate::writer::{AtomWriter, WriteOptions, XmlPersist, save_element, save_node};
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;
use uuid::Uuid;

use super::entry::write_batch_operation;

/// Identity of one feed instance. Entries point back to their owner with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedId(Uuid);

impl FeedId {
    pub fn new() -> Self {
        FeedId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FeedId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// `atom:feed`: source metadata, entries, OpenSearch paging and batch data.
///
/// Cloning a feed yields a new identity; the cloned entries belong to the
/// clone.
#[derive(Debug, PartialEq)]
pub struct Feed {
    id: Untracked<FeedId>,
    pub(crate) source: Source,
    pub(crate) entries: EntryCollection,
    pub(crate) total_results: Option<i32>,
    pub(crate) start_index: Option<i32>,
    pub(crate) items_per_page: Option<i32>,
    pub(crate) batch: Option<BatchFeedData>,
    pub(crate) dirty: Untracked<bool>,
}

impl Feed {
    pub fn new() -> Self {
        let id = FeedId::new();
        Self {
            id: Untracked(id),
            source: Source::default(),
            entries: EntryCollection::new(id),
            total_results: None,
            start_index: None,
            items_per_page: None,
            batch: None,
            dirty: Untracked(false),
        }
    }

    /// Parses a complete document with a default parser.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, AtomError> {
        let mut feed = Feed::new();
        AtomFeedParser::new().parse(reader, &mut feed)?;
        Ok(feed)
    }

    pub fn id(&self) -> FeedId {
        self.id.0
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut Source {
        &mut self.source
    }

    pub fn entries(&self) -> &EntryCollection {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut EntryCollection {
        &mut self.entries
    }

    pub fn total_results(&self) -> Option<i32> {
        self.total_results
    }

    pub fn set_total_results(&mut self, value: i32) {
        self.total_results = Some(value);
        self.dirty.0 = true;
    }

    pub fn start_index(&self) -> Option<i32> {
        self.start_index
    }

    pub fn set_start_index(&mut self, value: i32) {
        self.start_index = Some(value);
        self.dirty.0 = true;
    }

    pub fn items_per_page(&self) -> Option<i32> {
        self.items_per_page
    }

    pub fn set_items_per_page(&mut self, value: i32) {
        self.items_per_page = Some(value);
        self.dirty.0 = true;
    }

    pub fn batch(&self) -> Option<&BatchFeedData> {
        self.batch.as_ref()
    }

    pub fn set_batch(&mut self, batch: Option<BatchFeedData>) {
        self.batch = batch;
        self.dirty.0 = true;
    }

    pub fn protocol_version(&self) -> (u32, u32) {
        self.entries.protocol_version()
    }

    /// Entries already in the feed keep the version they were stamped with.
    pub fn set_protocol_version(&mut self, major: u32, minor: u32) {
        self.entries.set_protocol_version(major, minor);
    }

    pub fn save<W: Write>(&self, out: W) -> Result<(), AtomError> {
        self.save_with(out, &WriteOptions::default())
    }

    /// Writes the feed as a document. The root element is always written.
    pub fn save_with<W: Write>(&self, mut out: W, options: &WriteOptions) -> Result<(), AtomError> {
        let opensearch_decl = format!("xmlns:{OPENSEARCH_PREFIX}");
        let batch_decl = format!("xmlns:{BATCH_PREFIX}");

        let mut declarations = vec![("xmlns", NS_ATOM)];
        if self.has_paging() {
            declarations.push((opensearch_decl.as_str(), self.opensearch_namespace()));
        }
        if self.batch.is_some() || self.entries.iter().any(|e| e.batch().is_some()) {
            declarations.push((batch_decl.as_str(), NS_BATCH));
        }

        let mut w = AtomWriter::new(&mut out, options);
        w.declaration()?;
        save_element(&mut w, self, &declarations)?;
        out.flush()?;
        Ok(())
    }

    pub fn to_xml_string(&self) -> Result<String, AtomError> {
        self.to_xml_string_with(&WriteOptions::default())
    }

    pub fn to_xml_string_with(&self, options: &WriteOptions) -> Result<String, AtomError> {
        let mut out = Vec::new();
        self.save_with(&mut out, options)?;
        String::from_utf8(out).map_err(|e| AtomError::Serialization(e.to_string()))
    }

    fn has_paging(&self) -> bool {
        self.total_results.is_some() || self.start_index.is_some() || self.items_per_page.is_some()
    }

    /// GData 1.x speaks the OpenSearch RSS draft, later versions OpenSearch 1.1.
    fn opensearch_namespace(&self) -> &'static str {
        if self.protocol_version().0 <= 1 {
            NS_OPENSEARCH_RSS
        } else {
            NS_OPENSEARCH
        }
    }
}

impl Default for Feed {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Feed {
    fn clone(&self) -> Self {
        let id = FeedId::new();
        let mut entries = self.entries.clone();
        entries.reown(id);
        Self {
            id: Untracked(id),
            source: self.source.clone(),
            entries,
            total_results: self.total_results,
            start_index: self.start_index,
            items_per_page: self.items_per_page,
            batch: self.batch.clone(),
            dirty: self.dirty,
        }
    }
}

impl FromStr for Feed {
    type Err = AtomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feed::from_reader(s.as_bytes())
    }
}

impl AtomNode for Feed {
    fn kind(&self) -> NodeKind {
        NodeKind::Feed
    }

    fn xml_name(&self) -> &'static str {
        "feed"
    }

    fn common(&self) -> &CommonAttributes {
        &self.source.common
    }

    fn common_mut(&mut self) -> &mut CommonAttributes {
        &mut self.source.common
    }

    fn is_dirty(&self) -> bool {
        self.dirty.0 || self.source.is_dirty() || self.entries.is_dirty()
    }

    fn has_content(&self) -> bool {
        self.source.has_content() || !self.entries.is_empty() || self.has_paging() || self.batch.is_some()
    }

    fn mark_clean(&mut self) {
        self.dirty.0 = false;
        self.source.mark_clean();
        self.entries.mark_clean();
    }
}

impl XmlPersist for Feed {
    fn write_content(&self, w: &mut AtomWriter<'_>) -> Result<(), AtomError> {
        self.source.write_children(w)?;
        for (name, value) in [
            ("totalResults", self.total_results),
            ("startIndex", self.start_index),
            ("itemsPerPage", self.items_per_page),
        ] {
            if let Some(value) = value {
                w.text_element(&format!("{OPENSEARCH_PREFIX}:{name}"), &value.to_string())?;
            }
        }
        if let Some(batch) = &self.batch {
            write_batch_operation(w, batch.operation)?;
        }
        Ok(())
    }

    fn write_trailing(&self, w: &mut AtomWriter<'_>) -> Result<(), AtomError> {
        for entry in &self.entries {
            save_node(w, entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BaseLink, Entry, TextConstruct};

    #[test]
    fn test_clone_gets_new_identity() {
        let mut feed = Feed::new();
        feed.entries_mut().add(Entry::new()).unwrap();

        let copy = feed.clone();
        assert_ne!(copy.id(), feed.id());
        assert_eq!(copy, feed);
        assert_eq!(copy.entries().get(0).unwrap().owner(), Some(copy.id()));
        assert_eq!(feed.entries().get(0).unwrap().owner(), Some(feed.id()));
    }

    #[test]
    fn test_empty_feed_still_writes_root() {
        let feed = Feed::new();
        assert_eq!(
            feed.to_xml_string().unwrap(),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><feed xmlns=\"http://www.w3.org/2005/Atom\"/>"
        );
    }

    #[test]
    fn test_paging_declares_opensearch() {
        let mut feed = Feed::new();
        feed.set_total_results(12);
        feed.set_items_per_page(25);
        let xml = feed.to_xml_string().unwrap();
        assert!(xml.contains("xmlns:openSearch=\"http://a9.com/-/spec/opensearchrss/1.0/\""));
        assert!(xml.contains("<openSearch:totalResults>12</openSearch:totalResults>"));
        assert!(!xml.contains("startIndex"));

        feed.set_protocol_version(2, 0);
        let xml = feed.to_xml_string().unwrap();
        assert!(xml.contains("xmlns:openSearch=\"http://a9.com/-/spec/opensearch/1.1/\""));
    }

    #[test]
    fn test_entries_follow_feed_metadata() {
        let mut feed = Feed::new();
        let mut entry = Entry::new();
        entry.set_id(Some(BaseLink::new("urn:e1")));
        feed.entries_mut().add(entry).unwrap();
        feed.source_mut().set_title(Some(TextConstruct::plain("Feed")));

        let xml = feed.to_xml_string().unwrap();
        assert!(xml.ends_with("<title>Feed</title><entry><id>urn:e1</id></entry></feed>"));
    }
}
