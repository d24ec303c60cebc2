use super::collections::{CategoryCollection, LinkCollection, PersonCollection};
use super::constructs::{
    BaseLink, BaseLinkKind, Content, PersonElement, TextConstruct, TextElement, save_people,
};
use super::feed::FeedId;
use super::source::Source;
use super::{AtomNode, CommonAttributes, NodeKind, Untracked};
use crate::errors::AtomError;
use crate::names::{BATCH_PREFIX, NS_ATOM, NS_BATCH};
use crate::primitives::{BatchEntryData, BatchOperationType, format_timestamp};
use crate::writer::{AtomWriter, WriteOptions, XmlPersist, push_opt, save_element, save_node, save_optional};
use chrono::{DateTime, FixedOffset};
use quick_xml::events::BytesStart;
use std::io::Write;

const DEFAULT_PROTOCOL: (u32, u32) = (1, 0);

/// `atom:entry`, with optional GData batch metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    pub(crate) common: CommonAttributes,
    pub(crate) id: Option<BaseLink>,
    pub(crate) updated: Option<DateTime<FixedOffset>>,
    pub(crate) published: Option<DateTime<FixedOffset>>,
    pub(crate) title: Option<TextConstruct>,
    pub(crate) summary: Option<TextConstruct>,
    pub(crate) rights: Option<TextConstruct>,
    pub(crate) authors: PersonCollection,
    pub(crate) contributors: PersonCollection,
    pub(crate) categories: CategoryCollection,
    pub(crate) links: LinkCollection,
    pub(crate) content: Option<Content>,
    pub(crate) source: Option<Source>,
    pub(crate) batch: Option<BatchEntryData>,
    pub(crate) protocol: Untracked<Option<(u32, u32)>>,
    pub(crate) owner: Untracked<Option<FeedId>>,
    pub(crate) dirty: Untracked<bool>,
}

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The feed this entry was inserted into, if any.
    pub fn owner(&self) -> Option<FeedId> {
        self.owner.0
    }

    /// Stamped from the owning feed at insertion; 1.0 for a free entry.
    pub fn protocol_version(&self) -> (u32, u32) {
        self.protocol.0.unwrap_or(DEFAULT_PROTOCOL)
    }

    pub fn id(&self) -> Option<&BaseLink> {
        self.id.as_ref()
    }

    pub fn set_id(&mut self, id: Option<BaseLink>) {
        self.id = id.map(|mut l| {
            l.kind = BaseLinkKind::Id;
            l
        });
        self.dirty.0 = true;
    }

    pub fn updated(&self) -> Option<&DateTime<FixedOffset>> {
        self.updated.as_ref()
    }

    pub fn set_updated(&mut self, updated: Option<DateTime<FixedOffset>>) {
        self.updated = updated;
        self.dirty.0 = true;
    }

    pub fn published(&self) -> Option<&DateTime<FixedOffset>> {
        self.published.as_ref()
    }

    pub fn set_published(&mut self, published: Option<DateTime<FixedOffset>>) {
        self.published = published;
        self.dirty.0 = true;
    }

    pub fn title(&self) -> Option<&TextConstruct> {
        self.title.as_ref()
    }

    pub fn set_title(&mut self, title: Option<TextConstruct>) {
        self.title = title.map(|t| stamp(t, TextElement::Title));
        self.dirty.0 = true;
    }

    pub fn summary(&self) -> Option<&TextConstruct> {
        self.summary.as_ref()
    }

    pub fn set_summary(&mut self, summary: Option<TextConstruct>) {
        self.summary = summary.map(|t| stamp(t, TextElement::Summary));
        self.dirty.0 = true;
    }

    pub fn rights(&self) -> Option<&TextConstruct> {
        self.rights.as_ref()
    }

    pub fn set_rights(&mut self, rights: Option<TextConstruct>) {
        self.rights = rights.map(|t| stamp(t, TextElement::Rights));
        self.dirty.0 = true;
    }

    pub fn authors(&self) -> &PersonCollection {
        &self.authors
    }

    pub fn authors_mut(&mut self) -> &mut PersonCollection {
        &mut self.authors
    }

    pub fn contributors(&self) -> &PersonCollection {
        &self.contributors
    }

    pub fn contributors_mut(&mut self) -> &mut PersonCollection {
        &mut self.contributors
    }

    pub fn categories(&self) -> &CategoryCollection {
        &self.categories
    }

    pub fn categories_mut(&mut self) -> &mut CategoryCollection {
        &mut self.categories
    }

    pub fn links(&self) -> &LinkCollection {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut LinkCollection {
        &mut self.links
    }

    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    pub fn content_mut(&mut self) -> Option<&mut Content> {
        self.content.as_mut()
    }

    pub fn set_content(&mut self, content: Option<Content>) {
        self.content = content;
        self.dirty.0 = true;
    }

    /// The `atom:source` provenance copied along with the entry.
    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn set_source(&mut self, source: Option<Source>) {
        self.source = source;
        self.dirty.0 = true;
    }

    pub fn batch(&self) -> Option<&BatchEntryData> {
        self.batch.as_ref()
    }

    /// Batch data, created on first access. Marks the entry dirty.
    pub fn batch_mut(&mut self) -> &mut BatchEntryData {
        self.dirty.0 = true;
        self.batch.get_or_insert_with(BatchEntryData::default)
    }

    pub fn set_batch(&mut self, batch: Option<BatchEntryData>) {
        self.batch = batch;
        self.dirty.0 = true;
    }

    /// Writes this entry as a standalone document.
    pub fn save<W: Write>(&self, out: W) -> Result<(), AtomError> {
        self.save_with(out, &WriteOptions::default())
    }

    pub fn save_with<W: Write>(&self, mut out: W, options: &WriteOptions) -> Result<(), AtomError> {
        let mut w = AtomWriter::new(&mut out, options);
        w.declaration()?;
        let batch_decl = format!("xmlns:{BATCH_PREFIX}");
        let mut declarations = vec![("xmlns", NS_ATOM)];
        if self.batch.is_some() {
            declarations.push((batch_decl.as_str(), NS_BATCH));
        }
        save_element(&mut w, self, &declarations)?;
        out.flush()?;
        Ok(())
    }

    pub fn to_xml_string(&self) -> Result<String, AtomError> {
        let mut out = Vec::new();
        self.save(&mut out)?;
        String::from_utf8(out).map_err(|e| AtomError::Serialization(e.to_string()))
    }

    fn children_dirty(&self) -> bool {
        self.common.is_dirty()
            || self.id.as_ref().is_some_and(AtomNode::is_dirty)
            || self.title.as_ref().is_some_and(AtomNode::is_dirty)
            || self.summary.as_ref().is_some_and(AtomNode::is_dirty)
            || self.rights.as_ref().is_some_and(AtomNode::is_dirty)
            || self.content.as_ref().is_some_and(AtomNode::is_dirty)
            || self.source.as_ref().is_some_and(AtomNode::is_dirty)
            || self.authors.is_dirty()
            || self.contributors.is_dirty()
            || self.categories.is_dirty()
            || self.links.is_dirty()
    }
}

fn stamp(mut text: TextConstruct, element: TextElement) -> TextConstruct {
    text.element = element;
    text
}

impl AtomNode for Entry {
    fn kind(&self) -> NodeKind {
        NodeKind::Entry
    }

    fn xml_name(&self) -> &'static str {
        "entry"
    }

    fn common(&self) -> &CommonAttributes {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonAttributes {
        &mut self.common
    }

    fn is_dirty(&self) -> bool {
        self.dirty.0 || self.children_dirty()
    }

    fn has_content(&self) -> bool {
        self.id.is_some()
            || self.updated.is_some()
            || self.published.is_some()
            || self.title.is_some()
            || self.summary.is_some()
            || self.rights.is_some()
            || self.content.is_some()
            || self.source.is_some()
            || self.batch.is_some()
            || !self.authors.is_empty()
            || !self.contributors.is_empty()
            || !self.categories.is_empty()
            || !self.links.is_empty()
    }

    fn mark_clean(&mut self) {
        self.dirty.0 = false;
        self.common.mark_clean();
        for text in [&mut self.title, &mut self.summary, &mut self.rights]
            .into_iter()
            .flatten()
        {
            text.mark_clean();
        }
        if let Some(id) = &mut self.id {
            id.mark_clean();
        }
        if let Some(content) = &mut self.content {
            content.mark_clean();
        }
        if let Some(source) = &mut self.source {
            source.mark_clean();
        }
        self.authors.mark_clean();
        self.contributors.mark_clean();
        self.categories.mark_clean();
        self.links.mark_clean();
    }
}

impl XmlPersist for Entry {
    fn write_content(&self, w: &mut AtomWriter<'_>) -> Result<(), AtomError> {
        save_optional(w, self.id.as_ref())?;
        if let Some(published) = &self.published {
            w.text_element("published", &format_timestamp(published))?;
        }
        if let Some(updated) = &self.updated {
            w.text_element("updated", &format_timestamp(updated))?;
        }
        save_optional(w, self.title.as_ref())?;
        save_optional(w, self.summary.as_ref())?;
        save_optional(w, self.rights.as_ref())?;
        save_people(w, &self.authors, PersonElement::Author)?;
        save_people(w, &self.contributors, PersonElement::Contributor)?;
        for category in &self.categories {
            save_node(w, category)?;
        }
        for link in &self.links {
            save_node(w, link)?;
        }
        save_optional(w, self.content.as_ref())?;
        save_optional(w, self.source.as_ref())?;
        if let Some(batch) = &self.batch {
            write_batch_entry(w, batch)?;
        }
        Ok(())
    }
}

pub(crate) fn write_batch_operation(
    w: &mut AtomWriter<'_>,
    operation: BatchOperationType,
) -> Result<(), AtomError> {
    let name = format!("{BATCH_PREFIX}:operation");
    let mut start = BytesStart::new(name.as_str());
    start.push_attribute(("type", operation.as_str()));
    w.empty(start)
}

fn write_batch_entry(w: &mut AtomWriter<'_>, batch: &BatchEntryData) -> Result<(), AtomError> {
    if let Some(id) = &batch.id {
        w.text_element(&format!("{BATCH_PREFIX}:id"), id)?;
    }
    if let Some(operation) = batch.operation {
        write_batch_operation(w, operation)?;
    }
    if let Some(status) = &batch.status {
        let name = format!("{BATCH_PREFIX}:status");
        let mut start = BytesStart::new(name.as_str());
        if let Some(code) = status.code {
            start.push_attribute(("code", code.to_string().as_str()));
        }
        push_opt(&mut start, "reason", status.reason.as_deref());
        push_opt(&mut start, "content-type", status.content_type.as_deref());
        if status.errors.is_empty() {
            w.empty(start)?;
        } else {
            w.start(start)?;
            let errors = format!("{BATCH_PREFIX}:errors");
            w.start(BytesStart::new(errors.as_str()))?;
            let error_name = format!("{BATCH_PREFIX}:error");
            for error in &status.errors {
                let mut item = BytesStart::new(error_name.as_str());
                push_opt(&mut item, "type", error.error_type.as_deref());
                push_opt(&mut item, "reason", error.reason.as_deref());
                push_opt(&mut item, "field", error.field.as_deref());
                w.empty(item)?;
            }
            w.end(&errors)?;
            w.end(&name)?;
        }
    }
    if let Some(interrupt) = &batch.interrupt {
        let name = format!("{BATCH_PREFIX}:interrupt");
        let mut start = BytesStart::new(name.as_str());
        push_opt(&mut start, "reason", interrupt.reason.as_deref());
        for (key, value) in [
            ("success", interrupt.successes),
            ("failures", interrupt.failures),
            ("parsed", interrupt.parsed),
            ("unprocessed", interrupt.unprocessed),
        ] {
            start.push_attribute((key, value.to_string().as_str()));
        }
        w.empty(start)?;
    }
    Ok(())
}
