//! Foreign markup preserved on any node.
//!
//! Unknown attributes and elements are kept in document order so a parsed
//! feed writes them back out unchanged. Applications can register an
//! [`ExtensionFactory`] per owning node kind and namespace to turn captured
//! elements into their own [`TypedExtension`] values.

use crate::errors::AtomError;
use crate::model::{NodeKind, Untracked};
use crate::writer::AtomWriter;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An attribute outside the grammar of the node that carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionAttribute {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local_name: String,
    pub value: String,
}

impl ExtensionAttribute {
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.local_name)
    }
}

/// A captured element, kept as its outer markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionElement {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local_name: String,
    /// Attributes of the element itself, by qualified name.
    pub attributes: Vec<(String, String)>,
    pub markup: String,
}

impl ExtensionElement {
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.local_name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// An application-defined element model.
pub trait TypedExtension: fmt::Debug + Send + Sync {
    fn namespace(&self) -> &str;

    fn local_name(&self) -> &str;

    /// Writes the element, including any namespace declaration it needs.
    fn save(&self, writer: &mut AtomWriter<'_>) -> Result<(), AtomError>;

    fn clone_box(&self) -> Box<dyn TypedExtension>;

    fn as_any(&self) -> &dyn Any;

    fn eq_dyn(&self, other: &dyn TypedExtension) -> bool;
}

impl Clone for Box<dyn TypedExtension> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Builds typed extensions from captured elements.
pub trait ExtensionFactory: Send + Sync {
    /// Returns `Ok(None)` to leave the element as raw markup.
    fn create(&self, element: &ExtensionElement)
    -> Result<Option<Box<dyn TypedExtension>>, AtomError>;
}

#[derive(Debug, Clone)]
pub enum Extension {
    Attribute(ExtensionAttribute),
    Element(ExtensionElement),
    Typed(Box<dyn TypedExtension>),
}

impl Extension {
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Extension::Attribute(a) => a.namespace.as_deref(),
            Extension::Element(e) => e.namespace.as_deref(),
            Extension::Typed(t) => Some(t.namespace()),
        }
    }

    pub fn local_name(&self) -> &str {
        match self {
            Extension::Attribute(a) => &a.local_name,
            Extension::Element(e) => &e.local_name,
            Extension::Typed(t) => t.local_name(),
        }
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self, Extension::Attribute(_))
    }
}

impl PartialEq for Extension {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Extension::Attribute(a), Extension::Attribute(b)) => a == b,
            (Extension::Element(a), Extension::Element(b)) => a == b,
            (Extension::Typed(a), Extension::Typed(b)) => a.eq_dyn(b.as_ref()),
            _ => false,
        }
    }
}

/// Ordered extension list of a single node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionList {
    items: Vec<Extension>,
    dirty: Untracked<bool>,
}

impl ExtensionList {
    pub fn push(&mut self, extension: Extension) {
        self.items.push(extension);
        self.dirty.0 = true;
    }

    pub fn remove(&mut self, index: usize) -> Option<Extension> {
        if index >= self.items.len() {
            return None;
        }
        self.dirty.0 = true;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items.clear();
            self.dirty.0 = true;
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.items.iter()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &ExtensionAttribute> {
        self.items.iter().filter_map(|ext| match ext {
            Extension::Attribute(a) => Some(a),
            _ => None,
        })
    }

    /// Element and typed extensions, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Extension> {
        self.items.iter().filter(|ext| !ext.is_attribute())
    }

    pub fn has_elements(&self) -> bool {
        self.elements().next().is_some()
    }

    pub fn find(&self, namespace: &str, local_name: &str) -> Option<&Extension> {
        self.items
            .iter()
            .find(|ext| ext.namespace() == Some(namespace) && ext.local_name() == local_name)
    }

    /// First typed extension of the given concrete type.
    pub fn find_typed<T: 'static>(&self) -> Option<&T> {
        self.items.iter().find_map(|ext| match ext {
            Extension::Typed(t) => t.as_any().downcast_ref::<T>(),
            _ => None,
        })
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.0
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty.0 = false;
    }
}

/// Extension factories keyed by owning node kind and namespace.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    factories: HashMap<(NodeKind, String), Vec<Arc<dyn ExtensionFactory>>>,
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.factories.keys().collect();
        keys.sort_by(|a, b| a.1.cmp(&b.1));
        f.debug_struct("ExtensionRegistry")
            .field("registered", &keys)
            .finish()
    }
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factories for the same key are tried in registration order.
    pub fn register(
        &mut self,
        owner: NodeKind,
        namespace: impl Into<String>,
        factory: impl ExtensionFactory + 'static,
    ) {
        self.factories
            .entry((owner, namespace.into()))
            .or_default()
            .push(Arc::new(factory));
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Offers `element` to the factories registered for `owner` and its
    /// namespace. Without a taker it stays raw markup.
    pub fn resolve(
        &self,
        owner: NodeKind,
        element: ExtensionElement,
    ) -> Result<Extension, AtomError> {
        let Some(namespace) = element.namespace.as_deref() else {
            return Ok(Extension::Element(element));
        };
        let Some(factories) = self.factories.get(&(owner, namespace.to_string())) else {
            return Ok(Extension::Element(element));
        };
        for factory in factories {
            if let Some(typed) = factory.create(&element)? {
                return Ok(Extension::Typed(typed));
            }
        }
        Ok(Extension::Element(element))
    }
}

fn qualify(prefix: Option<&str>, local_name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{local_name}"),
        None => local_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Rating(u8);

    impl TypedExtension for Rating {
        fn namespace(&self) -> &str {
            "urn:rating"
        }

        fn local_name(&self) -> &str {
            "rating"
        }

        fn save(&self, writer: &mut AtomWriter<'_>) -> Result<(), AtomError> {
            writer.raw(&format!(
                "<r:rating xmlns:r=\"urn:rating\" value=\"{}\"/>",
                self.0
            ))
        }

        fn clone_box(&self) -> Box<dyn TypedExtension> {
            Box::new(self.clone())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn eq_dyn(&self, other: &dyn TypedExtension) -> bool {
            other.as_any().downcast_ref::<Rating>() == Some(self)
        }
    }

    struct RatingFactory;

    impl ExtensionFactory for RatingFactory {
        fn create(
            &self,
            element: &ExtensionElement,
        ) -> Result<Option<Box<dyn TypedExtension>>, AtomError> {
            if element.local_name != "rating" {
                return Ok(None);
            }
            let value = element.attribute("value").unwrap_or("0");
            let value = value
                .parse::<u8>()
                .map_err(|e| AtomError::malformed("value", value, e))?;
            Ok(Some(Box::new(Rating(value))))
        }
    }

    fn rating_element(value: &str) -> ExtensionElement {
        ExtensionElement {
            namespace: Some("urn:rating".to_string()),
            prefix: Some("r".to_string()),
            local_name: "rating".to_string(),
            attributes: vec![("value".to_string(), value.to_string())],
            markup: format!("<r:rating xmlns:r=\"urn:rating\" value=\"{value}\"/>"),
        }
    }

    #[test]
    fn test_registry_builds_typed_extension() {
        let mut registry = ExtensionRegistry::new();
        registry.register(NodeKind::Entry, "urn:rating", RatingFactory);

        let ext = registry.resolve(NodeKind::Entry, rating_element("4")).unwrap();
        let mut list = ExtensionList::default();
        list.push(ext);
        assert_eq!(list.find_typed::<Rating>(), Some(&Rating(4)));
    }

    #[test]
    fn test_registry_is_keyed_by_owner() {
        let mut registry = ExtensionRegistry::new();
        registry.register(NodeKind::Entry, "urn:rating", RatingFactory);

        let ext = registry.resolve(NodeKind::Feed, rating_element("4")).unwrap();
        assert!(matches!(ext, Extension::Element(_)));
    }

    #[test]
    fn test_factory_error_propagates() {
        let mut registry = ExtensionRegistry::new();
        registry.register(NodeKind::Entry, "urn:rating", RatingFactory);

        let result = registry.resolve(NodeKind::Entry, rating_element("lots"));
        assert!(matches!(result, Err(AtomError::MalformedValue { .. })));
    }

    #[test]
    fn test_list_find_and_dirty() {
        let mut list = ExtensionList::default();
        assert!(!list.is_dirty());
        list.push(Extension::Element(rating_element("1")));
        assert!(list.is_dirty());
        assert!(list.find("urn:rating", "rating").is_some());
        assert!(list.find("urn:other", "rating").is_none());

        list.mark_clean();
        assert!(list.remove(3).is_none());
        assert!(!list.is_dirty());
        assert!(list.remove(0).is_some());
        assert!(list.is_dirty());
    }
}
