//! Leaf constructs: text constructs, persons, links, categories, generator,
//! content and the URI-valued leaves (`id`, `icon`, `logo`).

use super::{AtomNode, CommonAttributes, NodeKind, Untracked};
use crate::errors::AtomError;
use crate::primitives::{AtomUri, TextKind};
use crate::writer::{AtomWriter, XmlPersist, push_opt, save_node};
use quick_xml::events::BytesStart;

/// The element a [`TextConstruct`] is written as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TextElement {
    #[default]
    Title,
    Subtitle,
    Rights,
    Summary,
}

impl TextElement {
    pub fn local_name(self) -> &'static str {
        match self {
            TextElement::Title => "title",
            TextElement::Subtitle => "subtitle",
            TextElement::Rights => "rights",
            TextElement::Summary => "summary",
        }
    }
}

/// Plain text, escaped HTML or embedded XHTML.
///
/// The XHTML body is kept as the raw inner markup of the element and written
/// back without escaping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextConstruct {
    pub(crate) common: CommonAttributes,
    pub(crate) element: TextElement,
    pub(crate) kind: TextKind,
    pub(crate) text: String,
    pub(crate) dirty: Untracked<bool>,
}

impl TextConstruct {
    pub fn new(kind: TextKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(TextKind::Text, text)
    }

    pub fn element(&self) -> TextElement {
        self.element
    }

    pub fn kind(&self) -> TextKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: TextKind) {
        self.kind = kind;
        self.dirty.0 = true;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.dirty.0 = true;
    }
}

impl AtomNode for TextConstruct {
    fn kind(&self) -> NodeKind {
        NodeKind::Text
    }

    fn xml_name(&self) -> &'static str {
        self.element.local_name()
    }

    fn common(&self) -> &CommonAttributes {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonAttributes {
        &mut self.common
    }

    fn is_dirty(&self) -> bool {
        self.dirty.0 || self.common.is_dirty()
    }

    fn has_content(&self) -> bool {
        !self.text.is_empty()
    }

    fn mark_clean(&mut self) {
        self.dirty.0 = false;
        self.common.mark_clean();
    }
}

impl XmlPersist for TextConstruct {
    fn write_attributes(&self, start: &mut BytesStart<'_>) {
        if self.kind != TextKind::Text {
            start.push_attribute(("type", self.kind.as_str()));
        }
    }

    fn has_body(&self) -> bool {
        !self.text.is_empty()
    }

    fn write_content(&self, w: &mut AtomWriter<'_>) -> Result<(), AtomError> {
        match self.kind {
            TextKind::Xhtml => w.raw(&self.text),
            TextKind::Text | TextKind::Html => w.text(&self.text),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PersonElement {
    #[default]
    Author,
    Contributor,
}

/// `atomPersonConstruct`: an author or contributor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub(crate) common: CommonAttributes,
    pub(crate) element: PersonElement,
    pub(crate) name: Option<String>,
    pub(crate) uri: Option<AtomUri>,
    pub(crate) email: Option<String>,
    pub(crate) dirty: Untracked<bool>,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn element(&self) -> PersonElement {
        self.element
    }

    string_property!(name, set_name);
    uri_property!(uri, set_uri);
    string_property!(email, set_email);
}

impl AtomNode for Person {
    fn kind(&self) -> NodeKind {
        NodeKind::Person
    }

    fn xml_name(&self) -> &'static str {
        match self.element {
            PersonElement::Author => "author",
            PersonElement::Contributor => "contributor",
        }
    }

    fn common(&self) -> &CommonAttributes {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonAttributes {
        &mut self.common
    }

    fn is_dirty(&self) -> bool {
        self.dirty.0 || self.common.is_dirty()
    }

    fn has_content(&self) -> bool {
        self.name.is_some() || self.uri.is_some() || self.email.is_some()
    }

    fn mark_clean(&mut self) {
        self.dirty.0 = false;
        self.common.mark_clean();
    }
}

impl XmlPersist for Person {
    fn has_body(&self) -> bool {
        self.has_content()
    }

    fn write_content(&self, w: &mut AtomWriter<'_>) -> Result<(), AtomError> {
        if let Some(name) = &self.name {
            w.text_element("name", name)?;
        }
        if let Some(uri) = &self.uri {
            w.text_element("uri", uri.as_str())?;
        }
        if let Some(email) = &self.email {
            w.text_element("email", email)?;
        }
        Ok(())
    }
}

/// Writes a person collection under `role`, whatever element the persons
/// were created or parsed as.
pub(crate) fn save_people<'p>(
    w: &mut AtomWriter<'_>,
    people: impl IntoIterator<Item = &'p Person>,
    role: PersonElement,
) -> Result<(), AtomError> {
    for person in people {
        if person.element == role {
            save_node(w, person)?;
        } else {
            let mut stamped = person.clone();
            stamped.element = role;
            save_node(w, &stamped)?;
        }
    }
    Ok(())
}

/// `atom:link`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Link {
    pub(crate) common: CommonAttributes,
    pub(crate) href: Option<AtomUri>,
    pub(crate) rel: Option<String>,
    pub(crate) link_type: Option<String>,
    pub(crate) hreflang: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) length: Option<u64>,
    pub(crate) dirty: Untracked<bool>,
}

impl Link {
    pub fn new(href: impl Into<AtomUri>, rel: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            rel: Some(rel.into()),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, link_type: impl Into<String>) -> Self {
        self.link_type = Some(link_type.into());
        self
    }

    uri_property!(href, set_href);
    string_property!(rel, set_rel);
    string_property!(
        /// The advisory media type.
        link_type,
        set_link_type
    );
    string_property!(hreflang, set_hreflang);
    string_property!(title, set_title);

    pub fn length(&self) -> Option<u64> {
        self.length
    }

    pub fn set_length(&mut self, length: u64) {
        self.length = Some(length);
        self.dirty.0 = true;
    }

    /// True when this link matches the query. A `None` on the query side
    /// matches anything; a missing value on the link only matches `None`.
    pub fn matches(&self, rel: Option<&str>, link_type: Option<&str>) -> bool {
        rel.is_none_or(|rel| self.rel.as_deref() == Some(rel))
            && link_type.is_none_or(|t| self.link_type.as_deref() == Some(t))
    }

    /// `href` resolved against this link's own `xml:base`, else `inherited`.
    pub fn absolute_href(&self, inherited: Option<&AtomUri>) -> Option<String> {
        self.href
            .as_ref()
            .map(|href| href.resolve(self.common.effective_base(inherited)))
    }
}

impl AtomNode for Link {
    fn kind(&self) -> NodeKind {
        NodeKind::Link
    }

    fn xml_name(&self) -> &'static str {
        "link"
    }

    fn common(&self) -> &CommonAttributes {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonAttributes {
        &mut self.common
    }

    fn is_dirty(&self) -> bool {
        self.dirty.0 || self.common.is_dirty()
    }

    fn has_content(&self) -> bool {
        self.href.is_some()
            || self.rel.is_some()
            || self.link_type.is_some()
            || self.hreflang.is_some()
            || self.title.is_some()
            || self.length.is_some()
    }

    fn mark_clean(&mut self) {
        self.dirty.0 = false;
        self.common.mark_clean();
    }
}

impl XmlPersist for Link {
    fn write_attributes(&self, start: &mut BytesStart<'_>) {
        push_opt(start, "href", self.href.as_ref().map(|h| h.as_str()));
        push_opt(start, "rel", self.rel.as_deref());
        push_opt(start, "type", self.link_type.as_deref());
        push_opt(start, "hreflang", self.hreflang.as_deref());
        push_opt(start, "title", self.title.as_deref());
        if let Some(length) = self.length {
            start.push_attribute(("length", length.to_string().as_str()));
        }
    }

    fn has_body(&self) -> bool {
        false
    }
}

/// `atom:category`. Identity is the (term, scheme) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Category {
    pub(crate) common: CommonAttributes,
    pub(crate) term: Option<String>,
    pub(crate) scheme: Option<AtomUri>,
    pub(crate) label: Option<String>,
    pub(crate) dirty: Untracked<bool>,
}

impl Category {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: Some(term.into()),
            ..Default::default()
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<AtomUri>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    string_property!(term, set_term);
    uri_property!(scheme, set_scheme);
    string_property!(label, set_label);

    /// Term must be equal; a `None` scheme query matches any scheme.
    pub fn matches(&self, term: &str, scheme: Option<&str>) -> bool {
        self.term.as_deref() == Some(term)
            && scheme.is_none_or(|s| self.scheme.as_ref().map(|u| u.as_str()) == Some(s))
    }
}

impl AtomNode for Category {
    fn kind(&self) -> NodeKind {
        NodeKind::Category
    }

    fn xml_name(&self) -> &'static str {
        "category"
    }

    fn common(&self) -> &CommonAttributes {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonAttributes {
        &mut self.common
    }

    fn is_dirty(&self) -> bool {
        self.dirty.0 || self.common.is_dirty()
    }

    fn has_content(&self) -> bool {
        self.term.is_some() || self.scheme.is_some() || self.label.is_some()
    }

    fn mark_clean(&mut self) {
        self.dirty.0 = false;
        self.common.mark_clean();
    }
}

impl XmlPersist for Category {
    fn write_attributes(&self, start: &mut BytesStart<'_>) {
        push_opt(start, "term", self.term.as_deref());
        push_opt(start, "scheme", self.scheme.as_ref().map(|s| s.as_str()));
        push_opt(start, "label", self.label.as_deref());
    }

    fn has_body(&self) -> bool {
        false
    }
}

/// `atom:generator`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generator {
    pub(crate) common: CommonAttributes,
    pub(crate) text: Option<String>,
    pub(crate) uri: Option<AtomUri>,
    pub(crate) version: Option<String>,
    pub(crate) dirty: Untracked<bool>,
}

impl Generator {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    string_property!(text, set_text);
    uri_property!(uri, set_uri);
    string_property!(version, set_version);
}

impl AtomNode for Generator {
    fn kind(&self) -> NodeKind {
        NodeKind::Generator
    }

    fn xml_name(&self) -> &'static str {
        "generator"
    }

    fn common(&self) -> &CommonAttributes {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonAttributes {
        &mut self.common
    }

    fn is_dirty(&self) -> bool {
        self.dirty.0 || self.common.is_dirty()
    }

    fn has_content(&self) -> bool {
        self.text.is_some() || self.uri.is_some() || self.version.is_some()
    }

    fn mark_clean(&mut self) {
        self.dirty.0 = false;
        self.common.mark_clean();
    }
}

impl XmlPersist for Generator {
    fn write_attributes(&self, start: &mut BytesStart<'_>) {
        push_opt(start, "uri", self.uri.as_ref().map(|u| u.as_str()));
        push_opt(start, "version", self.version.as_deref());
    }

    fn has_body(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }

    fn write_content(&self, w: &mut AtomWriter<'_>) -> Result<(), AtomError> {
        match &self.text {
            Some(text) => w.text(text),
            None => Ok(()),
        }
    }
}

/// `atom:content`: inline body or a `src` reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    pub(crate) common: CommonAttributes,
    pub(crate) content_type: Option<String>,
    pub(crate) src: Option<AtomUri>,
    pub(crate) body: Option<String>,
    pub(crate) dirty: Untracked<bool>,
}

impl Content {
    pub fn new(content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            body: Some(body.into()),
            ..Default::default()
        }
    }

    pub fn out_of_line(src: impl Into<AtomUri>, content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            src: Some(src.into()),
            ..Default::default()
        }
    }

    string_property!(content_type, set_content_type);
    uri_property!(src, set_src);
    string_property!(body, set_body);

    pub fn is_xhtml(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("xhtml"))
    }

    pub fn absolute_src(&self, inherited: Option<&AtomUri>) -> Option<String> {
        self.src
            .as_ref()
            .map(|src| src.resolve(self.common.effective_base(inherited)))
    }
}

impl AtomNode for Content {
    fn kind(&self) -> NodeKind {
        NodeKind::Content
    }

    fn xml_name(&self) -> &'static str {
        "content"
    }

    fn common(&self) -> &CommonAttributes {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonAttributes {
        &mut self.common
    }

    fn is_dirty(&self) -> bool {
        self.dirty.0 || self.common.is_dirty()
    }

    fn has_content(&self) -> bool {
        self.content_type.is_some() || self.src.is_some() || self.body.is_some()
    }

    fn mark_clean(&mut self) {
        self.dirty.0 = false;
        self.common.mark_clean();
    }
}

impl XmlPersist for Content {
    fn write_attributes(&self, start: &mut BytesStart<'_>) {
        push_opt(start, "type", self.content_type.as_deref());
        push_opt(start, "src", self.src.as_ref().map(|s| s.as_str()));
    }

    fn has_body(&self) -> bool {
        self.body.as_deref().is_some_and(|b| !b.is_empty())
    }

    fn write_content(&self, w: &mut AtomWriter<'_>) -> Result<(), AtomError> {
        match &self.body {
            Some(body) if self.is_xhtml() => w.raw(body),
            Some(body) => w.text(body),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BaseLinkKind {
    #[default]
    Id,
    Icon,
    Logo,
}

/// A URI-valued leaf element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseLink {
    pub(crate) common: CommonAttributes,
    pub(crate) kind: BaseLinkKind,
    pub(crate) uri: AtomUri,
    pub(crate) dirty: Untracked<bool>,
}

impl BaseLink {
    pub fn new(uri: impl Into<AtomUri>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn link_kind(&self) -> BaseLinkKind {
        self.kind
    }

    pub fn uri(&self) -> &AtomUri {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: impl Into<AtomUri>) {
        self.uri = uri.into();
        self.dirty.0 = true;
    }
}

impl AtomNode for BaseLink {
    fn kind(&self) -> NodeKind {
        NodeKind::BaseLink
    }

    fn xml_name(&self) -> &'static str {
        match self.kind {
            BaseLinkKind::Id => "id",
            BaseLinkKind::Icon => "icon",
            BaseLinkKind::Logo => "logo",
        }
    }

    fn common(&self) -> &CommonAttributes {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonAttributes {
        &mut self.common
    }

    fn is_dirty(&self) -> bool {
        self.dirty.0 || self.common.is_dirty()
    }

    fn has_content(&self) -> bool {
        !self.uri.is_empty()
    }

    fn mark_clean(&mut self) {
        self.dirty.0 = false;
        self.common.mark_clean();
    }
}

impl XmlPersist for BaseLink {
    fn has_body(&self) -> bool {
        !self.uri.is_empty()
    }

    fn write_content(&self, w: &mut AtomWriter<'_>) -> Result<(), AtomError> {
        w.text(self.uri.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{WriteOptions, save_element};

    fn render<N: XmlPersist>(node: &N) -> String {
        let mut out = Vec::new();
        {
            let mut w = AtomWriter::new(&mut out, &WriteOptions::default());
            save_element(&mut w, node, &[]).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_html_text_is_escaped() {
        let title = TextConstruct::new(TextKind::Html, "<b>bold</b>");
        assert_eq!(
            render(&title),
            "<title type=\"html\">&lt;b&gt;bold&lt;/b&gt;</title>"
        );
    }

    #[test]
    fn test_xhtml_content_is_raw() {
        let content = Content::new(
            "xhtml",
            "<div xmlns=\"http://www.w3.org/1999/xhtml\"><p>hi</p></div>",
        );
        assert_eq!(
            render(&content),
            "<content type=\"xhtml\"><div xmlns=\"http://www.w3.org/1999/xhtml\"><p>hi</p></div></content>"
        );
    }

    #[test]
    fn test_link_attribute_order() {
        let mut link = Link::new("http://example.com/1", "alternate").with_type("text/html");
        link.set_length(42);
        link.common_mut().set_language("en");
        assert_eq!(
            render(&link),
            "<link href=\"http://example.com/1\" rel=\"alternate\" type=\"text/html\" length=\"42\" xml:lang=\"en\"/>"
        );
    }

    #[test]
    fn test_link_matching_wildcards() {
        let link = Link::new("http://example.com/1", "alternate").with_type("text/html");
        assert!(link.matches(None, None));
        assert!(link.matches(Some("alternate"), None));
        assert!(link.matches(Some("alternate"), Some("text/html")));
        assert!(!link.matches(Some("self"), None));

        let untyped = Link::new("http://example.com/2", "alternate");
        assert!(!untyped.matches(None, Some("text/html")));
    }

    #[test]
    fn test_absolute_href_prefers_own_base() {
        let inherited = AtomUri::new("http://example.com/feeds/");
        let mut link = Link::new("entry/1", "alternate");
        assert_eq!(
            link.absolute_href(Some(&inherited)).as_deref(),
            Some("http://example.com/feeds/entry/1")
        );

        link.common_mut().set_base("http://other.org/base/");
        assert_eq!(
            link.absolute_href(Some(&inherited)).as_deref(),
            Some("http://other.org/base/entry/1")
        );
    }

    #[test]
    fn test_person_children() {
        let mut person = Person::new("Ann");
        person.set_email("ann@example.com");
        assert_eq!(
            render(&person),
            "<author><name>Ann</name><email>ann@example.com</email></author>"
        );
    }

    #[test]
    fn test_generator_and_category() {
        let mut generator = Generator::new("Blogger");
        generator.set_version("7.00");
        assert_eq!(
            render(&generator),
            "<generator version=\"7.00\">Blogger</generator>"
        );

        let category = Category::new("news").with_scheme("http://example.com/scheme");
        assert_eq!(
            render(&category),
            "<category term=\"news\" scheme=\"http://example.com/scheme\"/>"
        );
        assert!(category.matches("news", None));
        assert!(category.matches("news", Some("http://example.com/scheme")));
        assert!(!category.matches("news", Some("urn:other")));
    }

    #[test]
    fn test_setters_mark_dirty() {
        let mut category = Category::new("a");
        assert!(!category.is_dirty());
        category.set_label("A");
        assert!(category.is_dirty());
        category.mark_clean();
        assert!(!category.is_dirty());
        assert!(category.should_be_persisted());

        let empty = TextConstruct::default();
        assert!(!empty.should_be_persisted());
    }
}
