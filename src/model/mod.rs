//! The Atom element tree.
//!
//! Every node embeds [`CommonAttributes`] (`xml:base`, `xml:lang` and the
//! ordered extension list) and implements [`AtomNode`], which carries the
//! dirty-tracking contract used by the writer: a node is written only when it
//! or a descendant changed since it was loaded, or when it holds non-default
//! data.

macro_rules! string_property {
    ($(#[$doc:meta])* $field:ident, $setter:ident) => {
        $(#[$doc])*
        pub fn $field(&self) -> Option<&str> {
            self.$field.as_deref()
        }

        pub fn $setter(&mut self, value: impl Into<String>) {
            self.$field = Some(value.into());
            self.dirty.0 = true;
        }
    };
}

macro_rules! uri_property {
    ($(#[$doc:meta])* $field:ident, $setter:ident) => {
        $(#[$doc])*
        pub fn $field(&self) -> Option<&$crate::primitives::AtomUri> {
            self.$field.as_ref()
        }

        pub fn $setter(&mut self, value: impl Into<$crate::primitives::AtomUri>) {
            self.$field = Some(value.into());
            self.dirty.0 = true;
        }
    };
}

pub mod collections;
pub mod constructs;
pub mod entry;
pub mod feed;
pub mod source;

pub use collections::{CategoryCollection, Collection, EntryCollection, LinkCollection, PersonCollection};
pub use constructs::{
    BaseLink, BaseLinkKind, Category, Content, Generator, Link, Person, PersonElement,
    TextConstruct, TextElement,
};
pub use entry::Entry;
pub use feed::{Feed, FeedId};
pub use source::Source;

use crate::extensions::ExtensionList;
use crate::primitives::AtomUri;

/// Which kind of node owns an extension. Extension factories are registered
/// per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Feed,
    Entry,
    Source,
    Text,
    Person,
    Link,
    Category,
    Generator,
    Content,
    BaseLink,
}

/// Bookkeeping that never takes part in structural equality.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Untracked<T>(pub(crate) T);

impl<T> PartialEq for Untracked<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// `atomCommonAttributes` plus the open-ended extension list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommonAttributes {
    pub(crate) base: Option<AtomUri>,
    pub(crate) language: Option<String>,
    pub(crate) extensions: ExtensionList,
    pub(crate) dirty: Untracked<bool>,
}

impl CommonAttributes {
    uri_property!(
        /// `xml:base` set on this node itself.
        base,
        set_base
    );

    string_property!(
        /// `xml:lang` set on this node itself.
        language,
        set_language
    );

    pub fn extensions(&self) -> &ExtensionList {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut ExtensionList {
        &mut self.extensions
    }

    /// The base in effect for this node: its own, else the inherited one.
    pub fn effective_base<'a>(&'a self, inherited: Option<&'a AtomUri>) -> Option<&'a AtomUri> {
        self.base.as_ref().or(inherited)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.0 || self.extensions.is_dirty()
    }

    pub fn has_content(&self) -> bool {
        self.base.is_some() || self.language.is_some() || !self.extensions.is_empty()
    }

    pub fn mark_clean(&mut self) {
        self.dirty.0 = false;
        self.extensions.mark_clean();
    }
}

/// Capability shared by every element of the tree.
pub trait AtomNode {
    fn kind(&self) -> NodeKind;

    /// Local name of the element this node is written as.
    fn xml_name(&self) -> &'static str;

    fn common(&self) -> &CommonAttributes;

    fn common_mut(&mut self) -> &mut CommonAttributes;

    /// True when this node or any descendant was mutated since it was built
    /// or loaded.
    fn is_dirty(&self) -> bool;

    /// True when any typed field holds a non-default value.
    fn has_content(&self) -> bool;

    /// Clears the dirty flag of this node and all of its descendants.
    fn mark_clean(&mut self);

    fn should_be_persisted(&self) -> bool {
        self.is_dirty() || self.has_content() || self.common().has_content()
    }
}
