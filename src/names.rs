//! The fixed vocabulary of the Atom, OpenSearch and GData batch grammars.
//!
//! Element and attribute names are resolved once into a [`Name`] token so the
//! parser dispatches on enum equality instead of comparing strings at every
//! level of the tree.

use std::collections::HashMap;

pub const NS_ATOM: &str = "http://www.w3.org/2005/Atom";
pub const NS_OPENSEARCH_RSS: &str = "http://a9.com/-/spec/opensearchrss/1.0/";
pub const NS_OPENSEARCH: &str = "http://a9.com/-/spec/opensearch/1.1/";
pub const NS_BATCH: &str = "http://schemas.google.com/gdata/batch";
pub const NS_XML: &str = "http://www.w3.org/XML/1998/namespace";

pub const OPENSEARCH_PREFIX: &str = "openSearch";
pub const BATCH_PREFIX: &str = "batch";

/// Namespaces the grammar knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Atom,
    OpenSearch,
    Batch,
    Xml,
    Other,
}

/// Interned element and attribute names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Name {
    // atom elements
    Feed,
    Entry,
    Source,
    Title,
    Subtitle,
    Rights,
    Summary,
    Content,
    Updated,
    Published,
    Link,
    Id,
    Icon,
    Logo,
    Author,
    Contributor,
    Generator,
    Category,
    PersonName,
    PersonUri,
    PersonEmail,

    // opensearch elements
    TotalResults,
    StartIndex,
    ItemsPerPage,

    // batch elements
    BatchId,
    BatchOperation,
    BatchStatus,
    BatchInterrupt,
    BatchErrors,
    BatchError,

    // xml attributes
    Base,
    Lang,

    // plain attributes
    Href,
    Rel,
    Type,
    HrefLang,
    Length,
    Term,
    Scheme,
    Label,
    Src,
    Uri,
    Version,
    Code,
    Reason,
    ContentType,
    Field,
    Success,
    Failures,
    Parsed,
    Unprocessed,
}

impl Name {
    /// Local name as written on the wire.
    pub fn local_name(self) -> &'static str {
        match self {
            Name::Feed => "feed",
            Name::Entry => "entry",
            Name::Source => "source",
            Name::Title => "title",
            Name::Subtitle => "subtitle",
            Name::Rights => "rights",
            Name::Summary => "summary",
            Name::Content => "content",
            Name::Updated => "updated",
            Name::Published => "published",
            Name::Link => "link",
            Name::Id => "id",
            Name::Icon => "icon",
            Name::Logo => "logo",
            Name::Author => "author",
            Name::Contributor => "contributor",
            Name::Generator => "generator",
            Name::Category => "category",
            Name::PersonName => "name",
            Name::PersonUri => "uri",
            Name::PersonEmail => "email",
            Name::TotalResults => "totalResults",
            Name::StartIndex => "startIndex",
            Name::ItemsPerPage => "itemsPerPage",
            Name::BatchId => "id",
            Name::BatchOperation => "operation",
            Name::BatchStatus => "status",
            Name::BatchInterrupt => "interrupt",
            Name::BatchErrors => "errors",
            Name::BatchError => "error",
            Name::Base => "base",
            Name::Lang => "lang",
            Name::Href => "href",
            Name::Rel => "rel",
            Name::Type => "type",
            Name::HrefLang => "hreflang",
            Name::Length => "length",
            Name::Term => "term",
            Name::Scheme => "scheme",
            Name::Label => "label",
            Name::Src => "src",
            Name::Uri => "uri",
            Name::Version => "version",
            Name::Code => "code",
            Name::Reason => "reason",
            Name::ContentType => "content-type",
            Name::Field => "field",
            Name::Success => "success",
            Name::Failures => "failures",
            Name::Parsed => "parsed",
            Name::Unprocessed => "unprocessed",
        }
    }
}

const ATOM_ELEMENTS: &[Name] = &[
    Name::Feed,
    Name::Entry,
    Name::Source,
    Name::Title,
    Name::Subtitle,
    Name::Rights,
    Name::Summary,
    Name::Content,
    Name::Updated,
    Name::Published,
    Name::Link,
    Name::Id,
    Name::Icon,
    Name::Logo,
    Name::Author,
    Name::Contributor,
    Name::Generator,
    Name::Category,
    Name::PersonName,
    Name::PersonUri,
    Name::PersonEmail,
];

const OPENSEARCH_ELEMENTS: &[Name] = &[Name::TotalResults, Name::StartIndex, Name::ItemsPerPage];

const BATCH_ELEMENTS: &[Name] = &[
    Name::BatchId,
    Name::BatchOperation,
    Name::BatchStatus,
    Name::BatchInterrupt,
    Name::BatchErrors,
    Name::BatchError,
];

const XML_ATTRIBUTES: &[Name] = &[Name::Base, Name::Lang];

const PLAIN_ATTRIBUTES: &[Name] = &[
    Name::Href,
    Name::Rel,
    Name::Type,
    Name::HrefLang,
    Name::Title,
    Name::Length,
    Name::Term,
    Name::Scheme,
    Name::Label,
    Name::Src,
    Name::Uri,
    Name::Version,
    Name::Code,
    Name::Reason,
    Name::ContentType,
    Name::Field,
    Name::Success,
    Name::Failures,
    Name::Parsed,
    Name::Unprocessed,
];

/// Lookup table built once per parser and shared by every nested call.
#[derive(Debug, Clone)]
pub struct NameTable {
    namespaces: HashMap<&'static str, Namespace>,
    elements: HashMap<Namespace, HashMap<&'static str, Name>>,
    xml_attributes: HashMap<&'static str, Name>,
    attributes: HashMap<&'static str, Name>,
}

impl NameTable {
    pub fn new() -> Self {
        let namespaces = HashMap::from([
            (NS_ATOM, Namespace::Atom),
            (NS_OPENSEARCH_RSS, Namespace::OpenSearch),
            (NS_OPENSEARCH, Namespace::OpenSearch),
            (NS_BATCH, Namespace::Batch),
            (NS_XML, Namespace::Xml),
        ]);

        let mut elements = HashMap::new();
        elements.insert(Namespace::Atom, index(ATOM_ELEMENTS));
        elements.insert(Namespace::OpenSearch, index(OPENSEARCH_ELEMENTS));
        elements.insert(Namespace::Batch, index(BATCH_ELEMENTS));

        Self {
            namespaces,
            elements,
            xml_attributes: index(XML_ATTRIBUTES),
            attributes: index(PLAIN_ATTRIBUTES),
        }
    }

    /// Classifies a namespace URI. Elements without any namespace are read
    /// as Atom.
    pub fn namespace(&self, uri: Option<&str>) -> Namespace {
        match uri {
            None | Some("") => Namespace::Atom,
            Some(uri) => self.namespaces.get(uri).copied().unwrap_or(Namespace::Other),
        }
    }

    pub fn element(&self, namespace: Namespace, local_name: &str) -> Option<Name> {
        self.elements
            .get(&namespace)
            .and_then(|names| names.get(local_name))
            .copied()
    }

    /// Resolves an attribute. Unqualified attributes map to the plain
    /// vocabulary; `xml:` attributes to base/lang.
    pub fn attribute(&self, namespace: Option<Namespace>, local_name: &str) -> Option<Name> {
        match namespace {
            None => self.attributes.get(local_name).copied(),
            Some(Namespace::Xml) => self.xml_attributes.get(local_name).copied(),
            Some(_) => None,
        }
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

fn index(names: &[Name]) -> HashMap<&'static str, Name> {
    names.iter().map(|name| (name.local_name(), *name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_local_name_in_different_namespaces() {
        let names = NameTable::new();
        assert_eq!(names.element(Namespace::Atom, "id"), Some(Name::Id));
        assert_eq!(names.element(Namespace::Batch, "id"), Some(Name::BatchId));
        assert_eq!(names.element(Namespace::OpenSearch, "id"), None);
    }

    #[test]
    fn test_namespace_classification() {
        let names = NameTable::new();
        assert_eq!(names.namespace(None), Namespace::Atom);
        assert_eq!(names.namespace(Some(NS_ATOM)), Namespace::Atom);
        assert_eq!(names.namespace(Some(NS_OPENSEARCH_RSS)), Namespace::OpenSearch);
        assert_eq!(names.namespace(Some(NS_OPENSEARCH)), Namespace::OpenSearch);
        assert_eq!(names.namespace(Some(NS_BATCH)), Namespace::Batch);
        assert_eq!(
            names.namespace(Some("http://schemas.google.com/g/2005")),
            Namespace::Other
        );
    }

    #[test]
    fn test_attribute_lookup() {
        let names = NameTable::new();
        assert_eq!(names.attribute(None, "href"), Some(Name::Href));
        assert_eq!(names.attribute(None, "title"), Some(Name::Title));
        assert_eq!(names.attribute(Some(Namespace::Xml), "lang"), Some(Name::Lang));
        assert_eq!(names.attribute(Some(Namespace::Xml), "href"), None);
        assert_eq!(names.attribute(Some(Namespace::Other), "href"), None);
    }
}
