//! Recursive-descent parser from an XML stream into the element tree.
//!
//! Dispatch is on (namespace, local name) within the current container.
//! Atom names fill typed fields and collections; batch names route to batch
//! metadata; OpenSearch names set the paging counters of a feed. Anything
//! else is captured into the container's extension list and never rejected.

mod cursor;

use crate::errors::AtomError;
use crate::extensions::{Extension, ExtensionAttribute, ExtensionRegistry};
use crate::model::{
    AtomNode, BaseLink, BaseLinkKind, Category, CommonAttributes, Content, Entry, Feed, Generator,
    Link, NodeKind, Person, PersonElement, Source, TextConstruct, TextElement,
};
use crate::names::{Name, NameTable, Namespace};
use crate::primitives::{
    AtomUri, BatchError, BatchFeedData, BatchInterrupt, BatchOperationType, BatchStatus, TextKind,
    parse_int, parse_timestamp,
};
use chrono::{DateTime, FixedOffset};
use cursor::{StartTag, TagAttribute, XmlCursor};
use log::{debug, info, warn};
use std::io::BufRead;

/// Tunables for [`AtomFeedParser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Read the `batch:errors` list nested in `batch:status`. Off by default;
    /// the status subtree is skipped after its attributes.
    pub parse_batch_errors: bool,
    /// Entries between progress log lines of [`ProgressTracker`](crate::progress::ProgressTracker).
    pub report_interval: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            parse_batch_errors: false,
            report_interval: 500,
        }
    }
}

/// What to do with an entry once the observer has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    Keep,
    /// Remove the entry from the feed again.
    Discard,
}

/// Notifications raised while a document is parsed.
pub trait ParseObserver {
    /// Called after each entry has been inserted into the feed.
    fn entry_completed(&mut self, _entry: &Entry) -> EntryAction {
        EntryAction::Keep
    }

    /// Called once after a `feed` or `entry` document has been read.
    fn document_completed(&mut self, _feed: &Feed) {}
}

impl ParseObserver for () {}

#[derive(Debug, Clone, Default)]
pub struct AtomFeedParser {
    names: NameTable,
    registry: ExtensionRegistry,
    options: ParserOptions,
}

impl AtomFeedParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParserOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn with_registry(mut self, registry: ExtensionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn registry_mut(&mut self) -> &mut ExtensionRegistry {
        &mut self.registry
    }

    /// Reads a `feed` or a single `entry` document into `feed`.
    pub fn parse<R: BufRead>(&self, input: R, feed: &mut Feed) -> Result<(), AtomError> {
        self.parse_with(input, feed, &mut ())
    }

    /// As [`parse`](Self::parse), reporting each completed entry to `observer`.
    ///
    /// Every failure comes back wrapped in [`AtomError::ParsingFailed`].
    pub fn parse_with<R, O>(&self, input: R, feed: &mut Feed, observer: &mut O) -> Result<(), AtomError>
    where
        R: BufRead,
        O: ParseObserver + ?Sized,
    {
        let mut session = ParseSession {
            names: &self.names,
            registry: &self.registry,
            options: &self.options,
            cursor: XmlCursor::new(input),
            observer,
            entries: 0,
        };
        session
            .parse_document(feed)
            .map_err(|e| AtomError::ParsingFailed(Box::new(e)))
    }
}

/// State of one parse call.
struct ParseSession<'p, 'o, R, O: ?Sized> {
    names: &'p NameTable,
    registry: &'p ExtensionRegistry,
    options: &'p ParserOptions,
    cursor: XmlCursor<R>,
    observer: &'o mut O,
    entries: usize,
}

impl<R: BufRead, O: ParseObserver + ?Sized> ParseSession<'_, '_, R, O> {
    fn parse_document(&mut self, feed: &mut Feed) -> Result<(), AtomError> {
        let Some(root) = self.cursor.move_to_start_element()? else {
            warn!("document has no root element, nothing parsed");
            return Ok(());
        };

        match self.classify(&root) {
            Some(Name::Feed) => {
                self.parse_feed(&root, feed)?;
                info!("parsed feed document with {} entries", self.entries);
            }
            Some(Name::Entry) => {
                let entry = self.parse_entry(&root)?;
                self.deliver(entry, feed)?;
                info!("parsed standalone entry document");
            }
            _ => {
                warn!("unrecognized root element <{}>, nothing parsed", root.qname);
                return Ok(());
            }
        }

        feed.mark_clean();
        self.observer.document_completed(feed);
        Ok(())
    }

    fn namespace_of(&self, tag: &StartTag) -> Namespace {
        if tag.namespace.is_none() && tag.prefix.is_some() {
            return Namespace::Other;
        }
        self.names.namespace(tag.namespace.as_deref())
    }

    fn classify(&self, tag: &StartTag) -> Option<Name> {
        self.names.element(self.namespace_of(tag), &tag.local_name)
    }

    fn attribute_name(&self, attr: &TagAttribute) -> Option<Name> {
        let namespace = match (&attr.namespace, &attr.prefix) {
            (None, None) => None,
            (None, Some(_)) => Some(Namespace::Other),
            (Some(uri), _) => Some(self.names.namespace(Some(uri))),
        };
        self.names.attribute(namespace, &attr.local_name)
    }

    fn parse_feed(&mut self, tag: &StartTag, feed: &mut Feed) -> Result<(), AtomError> {
        for attr in &tag.attributes {
            self.parse_base_attribute(attr, &mut feed.source.common);
        }
        while let Some(child) = self.cursor.next_child(tag)? {
            match self.classify(&child) {
                Some(Name::Entry) => {
                    let entry = self.parse_entry(&child)?;
                    self.deliver(entry, feed)?;
                }
                Some(Name::TotalResults) => {
                    feed.total_results = Some(self.read_int(&child, "totalResults")?);
                }
                Some(Name::StartIndex) => {
                    feed.start_index = Some(self.read_int(&child, "startIndex")?);
                }
                Some(Name::ItemsPerPage) => {
                    feed.items_per_page = Some(self.read_int(&child, "itemsPerPage")?);
                }
                Some(Name::BatchOperation) => {
                    let operation = self.parse_operation(&child)?;
                    feed.batch = Some(BatchFeedData { operation });
                }
                _ => self.parse_source_child(&child, &mut feed.source, NodeKind::Feed)?,
            }
        }
        Ok(())
    }

    fn deliver(&mut self, entry: Entry, feed: &mut Feed) -> Result<(), AtomError> {
        self.entries += 1;
        let stored = feed.entries.add(entry)?;
        if self.observer.entry_completed(stored) == EntryAction::Discard {
            let index = feed.entries.len() - 1;
            feed.entries.remove(index);
        }
        Ok(())
    }

    fn parse_source(&mut self, tag: &StartTag) -> Result<Source, AtomError> {
        let mut source = Source::default();
        for attr in &tag.attributes {
            self.parse_base_attribute(attr, &mut source.common);
        }
        while let Some(child) = self.cursor.next_child(tag)? {
            self.parse_source_child(&child, &mut source, NodeKind::Source)?;
        }
        Ok(source)
    }

    /// Children common to `feed` and `source`.
    fn parse_source_child(
        &mut self,
        child: &StartTag,
        source: &mut Source,
        owner: NodeKind,
    ) -> Result<(), AtomError> {
        match self.classify(child) {
            Some(Name::Title) => {
                source.title = Some(self.parse_text_construct(child, TextElement::Title)?);
            }
            Some(Name::Subtitle) => {
                source.subtitle = Some(self.parse_text_construct(child, TextElement::Subtitle)?);
            }
            Some(Name::Rights) => {
                source.rights = Some(self.parse_text_construct(child, TextElement::Rights)?);
            }
            Some(Name::Updated) => source.updated = Some(self.read_timestamp(child, "updated")?),
            Some(Name::Id) => source.id = Some(self.parse_base_link(child, BaseLinkKind::Id)?),
            Some(Name::Icon) => source.icon = Some(self.parse_base_link(child, BaseLinkKind::Icon)?),
            Some(Name::Logo) => source.logo = Some(self.parse_base_link(child, BaseLinkKind::Logo)?),
            Some(Name::Link) => {
                let link = self.parse_link(child)?;
                source.links.add(link);
            }
            Some(Name::Category) => {
                let category = self.parse_category(child)?;
                source.categories.add(category);
            }
            Some(Name::Author) => {
                let person = self.parse_person(child, PersonElement::Author)?;
                source.authors.add(person);
            }
            Some(Name::Contributor) => {
                let person = self.parse_person(child, PersonElement::Contributor)?;
                source.contributors.add(person);
            }
            Some(Name::Generator) => source.generator = Some(self.parse_generator(child)?),
            _ => self.parse_extension_element(child, owner, &mut source.common)?,
        }
        Ok(())
    }

    fn parse_entry(&mut self, tag: &StartTag) -> Result<Entry, AtomError> {
        if self.classify(tag) != Some(Name::Entry) {
            return Err(AtomError::InvalidArgument(format!(
                "expected an atom entry, found <{}>",
                tag.qname
            )));
        }

        let mut entry = Entry::default();
        for attr in &tag.attributes {
            self.parse_base_attribute(attr, &mut entry.common);
        }
        while let Some(child) = self.cursor.next_child(tag)? {
            match self.classify(&child) {
                Some(Name::Id) => entry.id = Some(self.parse_base_link(&child, BaseLinkKind::Id)?),
                Some(Name::Updated) => entry.updated = Some(self.read_timestamp(&child, "updated")?),
                Some(Name::Published) => {
                    entry.published = Some(self.read_timestamp(&child, "published")?);
                }
                Some(Name::Title) => {
                    entry.title = Some(self.parse_text_construct(&child, TextElement::Title)?);
                }
                Some(Name::Summary) => {
                    entry.summary = Some(self.parse_text_construct(&child, TextElement::Summary)?);
                }
                Some(Name::Rights) => {
                    entry.rights = Some(self.parse_text_construct(&child, TextElement::Rights)?);
                }
                Some(Name::Link) => {
                    let link = self.parse_link(&child)?;
                    entry.links.add(link);
                }
                Some(Name::Category) => {
                    let category = self.parse_category(&child)?;
                    entry.categories.add(category);
                }
                Some(Name::Author) => {
                    let person = self.parse_person(&child, PersonElement::Author)?;
                    entry.authors.add(person);
                }
                Some(Name::Contributor) => {
                    let person = self.parse_person(&child, PersonElement::Contributor)?;
                    entry.contributors.add(person);
                }
                Some(Name::Content) => entry.content = Some(self.parse_content(&child)?),
                Some(Name::Source) => entry.source = Some(self.parse_source(&child)?),
                Some(Name::BatchId) => {
                    let id = self.cursor.read_text(&child)?;
                    entry.batch.get_or_insert_with(Default::default).id = Some(id);
                }
                Some(Name::BatchOperation) => {
                    let operation = self.parse_operation(&child)?;
                    entry.batch.get_or_insert_with(Default::default).operation = Some(operation);
                }
                Some(Name::BatchStatus) => {
                    let status = self.parse_batch_status(&child)?;
                    entry.batch.get_or_insert_with(Default::default).status = Some(status);
                }
                Some(Name::BatchInterrupt) => {
                    let interrupt = self.parse_batch_interrupt(&child)?;
                    entry.batch.get_or_insert_with(Default::default).interrupt = Some(interrupt);
                }
                _ => self.parse_extension_element(&child, NodeKind::Entry, &mut entry.common)?,
            }
        }
        entry.mark_clean();
        Ok(entry)
    }

    /// `xml:base` and `xml:lang` go to the node itself; any other attribute
    /// becomes an extension attribute.
    fn parse_base_attribute(&self, attr: &TagAttribute, common: &mut CommonAttributes) {
        match self.attribute_name(attr) {
            Some(Name::Base) if attr.prefix.as_deref() == Some("xml") => {
                common.base = Some(AtomUri::new(attr.value.as_str()));
            }
            Some(Name::Lang) if attr.prefix.as_deref() == Some("xml") => {
                common.language = Some(attr.value.clone());
            }
            _ => {
                debug!("keeping attribute {} as extension", attr.qname);
                common.extensions.push(Extension::Attribute(ExtensionAttribute {
                    namespace: attr.namespace.clone(),
                    prefix: attr.prefix.clone(),
                    local_name: attr.local_name.clone(),
                    value: attr.value.clone(),
                }));
            }
        }
    }

    fn parse_extension_element(
        &mut self,
        tag: &StartTag,
        owner: NodeKind,
        common: &mut CommonAttributes,
    ) -> Result<(), AtomError> {
        let element = self.cursor.capture_element(tag)?;
        debug!("captured extension element <{}> on {:?}", element.qualified_name(), owner);
        let extension = self.registry.resolve(owner, element)?;
        common.extensions.push(extension);
        Ok(())
    }

    fn parse_text_construct(
        &mut self,
        tag: &StartTag,
        element: TextElement,
    ) -> Result<TextConstruct, AtomError> {
        let mut construct = TextConstruct {
            element,
            ..Default::default()
        };
        for attr in &tag.attributes {
            match self.attribute_name(attr) {
                Some(Name::Type) => construct.kind = attr.value.parse()?,
                _ => self.parse_base_attribute(attr, &mut construct.common),
            }
        }
        construct.text = match construct.kind {
            TextKind::Xhtml => self.cursor.read_inner_markup(tag)?,
            TextKind::Text | TextKind::Html => self.cursor.read_text(tag)?,
        };
        Ok(construct)
    }

    fn parse_person(&mut self, tag: &StartTag, element: PersonElement) -> Result<Person, AtomError> {
        let mut person = Person {
            element,
            ..Default::default()
        };
        for attr in &tag.attributes {
            self.parse_base_attribute(attr, &mut person.common);
        }
        while let Some(child) = self.cursor.next_child(tag)? {
            match self.classify(&child) {
                Some(Name::PersonName) => person.name = Some(self.cursor.read_text(&child)?),
                Some(Name::PersonUri) => {
                    person.uri = Some(AtomUri::new(self.cursor.read_text(&child)?));
                }
                Some(Name::PersonEmail) => person.email = Some(self.cursor.read_text(&child)?),
                _ => self.parse_extension_element(&child, NodeKind::Person, &mut person.common)?,
            }
        }
        Ok(person)
    }

    fn parse_link(&mut self, tag: &StartTag) -> Result<Link, AtomError> {
        let mut link = Link::default();
        for attr in &tag.attributes {
            match self.attribute_name(attr) {
                Some(Name::Href) => link.href = Some(AtomUri::new(attr.value.as_str())),
                Some(Name::Rel) => link.rel = Some(attr.value.clone()),
                Some(Name::Type) => link.link_type = Some(attr.value.clone()),
                Some(Name::HrefLang) => link.hreflang = Some(attr.value.clone()),
                Some(Name::Title) => link.title = Some(attr.value.clone()),
                Some(Name::Length) => link.length = Some(parse_int("length", &attr.value)?),
                _ => self.parse_base_attribute(attr, &mut link.common),
            }
        }
        while let Some(child) = self.cursor.next_child(tag)? {
            self.parse_extension_element(&child, NodeKind::Link, &mut link.common)?;
        }
        Ok(link)
    }

    fn parse_category(&mut self, tag: &StartTag) -> Result<Category, AtomError> {
        let mut category = Category::default();
        for attr in &tag.attributes {
            match self.attribute_name(attr) {
                Some(Name::Term) => category.term = Some(attr.value.clone()),
                Some(Name::Scheme) => category.scheme = Some(AtomUri::new(attr.value.as_str())),
                Some(Name::Label) => category.label = Some(attr.value.clone()),
                _ => self.parse_base_attribute(attr, &mut category.common),
            }
        }
        while let Some(child) = self.cursor.next_child(tag)? {
            self.parse_extension_element(&child, NodeKind::Category, &mut category.common)?;
        }
        Ok(category)
    }

    fn parse_generator(&mut self, tag: &StartTag) -> Result<Generator, AtomError> {
        let mut generator = Generator::default();
        for attr in &tag.attributes {
            match self.attribute_name(attr) {
                Some(Name::Uri) => generator.uri = Some(AtomUri::new(attr.value.as_str())),
                Some(Name::Version) => generator.version = Some(attr.value.clone()),
                _ => self.parse_base_attribute(attr, &mut generator.common),
            }
        }
        let text = self.cursor.read_text(tag)?;
        if !text.is_empty() {
            generator.text = Some(text);
        }
        Ok(generator)
    }

    /// XHTML content keeps its inner markup verbatim; every other type is
    /// read as decoded text.
    fn parse_content(&mut self, tag: &StartTag) -> Result<Content, AtomError> {
        let mut content = Content::default();
        for attr in &tag.attributes {
            match self.attribute_name(attr) {
                Some(Name::Type) => content.content_type = Some(attr.value.clone()),
                Some(Name::Src) => content.src = Some(AtomUri::new(attr.value.as_str())),
                _ => self.parse_base_attribute(attr, &mut content.common),
            }
        }
        if tag.empty {
            return Ok(content);
        }
        let body = if content.is_xhtml() {
            self.cursor.read_inner_markup(tag)?
        } else {
            self.cursor.read_text(tag)?
        };
        content.body = Some(body);
        Ok(content)
    }

    fn parse_base_link(&mut self, tag: &StartTag, kind: BaseLinkKind) -> Result<BaseLink, AtomError> {
        let mut link = BaseLink {
            kind,
            ..Default::default()
        };
        for attr in &tag.attributes {
            self.parse_base_attribute(attr, &mut link.common);
        }
        link.uri = AtomUri::new(self.cursor.read_text(tag)?);
        Ok(link)
    }

    /// `batch:operation@type`; a missing type means `default`.
    fn parse_operation(&mut self, tag: &StartTag) -> Result<BatchOperationType, AtomError> {
        let mut operation = BatchOperationType::Default;
        for attr in &tag.attributes {
            if self.attribute_name(attr) == Some(Name::Type) {
                operation = attr.value.parse()?;
            }
        }
        self.cursor.skip(tag)?;
        Ok(operation)
    }

    fn parse_batch_status(&mut self, tag: &StartTag) -> Result<BatchStatus, AtomError> {
        let mut status = BatchStatus::default();
        for attr in &tag.attributes {
            match self.attribute_name(attr) {
                Some(Name::Code) => status.code = Some(parse_int("code", &attr.value)?),
                Some(Name::Reason) => status.reason = Some(attr.value.clone()),
                Some(Name::ContentType) => status.content_type = Some(attr.value.clone()),
                _ => {}
            }
        }
        if !self.options.parse_batch_errors {
            self.cursor.skip(tag)?;
            return Ok(status);
        }
        while let Some(child) = self.cursor.next_child(tag)? {
            if self.classify(&child) == Some(Name::BatchErrors) {
                status.errors.extend(self.parse_batch_errors(&child)?);
            } else {
                self.cursor.skip(&child)?;
            }
        }
        Ok(status)
    }

    fn parse_batch_errors(&mut self, tag: &StartTag) -> Result<Vec<BatchError>, AtomError> {
        let mut errors = Vec::new();
        while let Some(child) = self.cursor.next_child(tag)? {
            if self.classify(&child) == Some(Name::BatchError) {
                let mut error = BatchError::default();
                for attr in &child.attributes {
                    match self.attribute_name(attr) {
                        Some(Name::Type) => error.error_type = Some(attr.value.clone()),
                        Some(Name::Reason) => error.reason = Some(attr.value.clone()),
                        Some(Name::Field) => error.field = Some(attr.value.clone()),
                        _ => {}
                    }
                }
                errors.push(error);
            }
            self.cursor.skip(&child)?;
        }
        Ok(errors)
    }

    fn parse_batch_interrupt(&mut self, tag: &StartTag) -> Result<BatchInterrupt, AtomError> {
        let mut interrupt = BatchInterrupt::default();
        for attr in &tag.attributes {
            match self.attribute_name(attr) {
                Some(Name::Reason) => interrupt.reason = Some(attr.value.clone()),
                Some(Name::Success) => interrupt.successes = parse_int("success", &attr.value)?,
                Some(Name::Failures) => interrupt.failures = parse_int("failures", &attr.value)?,
                Some(Name::Parsed) => interrupt.parsed = parse_int("parsed", &attr.value)?,
                Some(Name::Unprocessed) => {
                    interrupt.unprocessed = parse_int("unprocessed", &attr.value)?;
                }
                _ => {}
            }
        }
        self.cursor.skip(tag)?;
        Ok(interrupt)
    }

    fn read_int(&mut self, tag: &StartTag, field: &'static str) -> Result<i32, AtomError> {
        let text = self.cursor.read_text(tag)?;
        parse_int(field, &text)
    }

    fn read_timestamp(
        &mut self,
        tag: &StartTag,
        field: &'static str,
    ) -> Result<DateTime<FixedOffset>, AtomError> {
        let text = self.cursor.read_text(tag)?;
        parse_timestamp(field, &text)
    }
}
