use super::collections::{CategoryCollection, LinkCollection, PersonCollection};
use super::constructs::{
    BaseLink, BaseLinkKind, Generator, PersonElement, TextConstruct, TextElement, save_people,
};
use super::{AtomNode, CommonAttributes, NodeKind, Untracked};
use crate::errors::AtomError;
use crate::primitives::format_timestamp;
use crate::writer::{AtomWriter, XmlPersist, save_node, save_optional};
use chrono::{DateTime, FixedOffset};

/// Feed-level metadata. A [`Feed`](super::Feed) is built on top of one, and
/// an entry may carry one as its `atom:source` provenance echo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Source {
    pub(crate) common: CommonAttributes,
    pub(crate) id: Option<BaseLink>,
    pub(crate) title: Option<TextConstruct>,
    pub(crate) subtitle: Option<TextConstruct>,
    pub(crate) rights: Option<TextConstruct>,
    pub(crate) updated: Option<DateTime<FixedOffset>>,
    pub(crate) generator: Option<Generator>,
    pub(crate) icon: Option<BaseLink>,
    pub(crate) logo: Option<BaseLink>,
    pub(crate) authors: PersonCollection,
    pub(crate) contributors: PersonCollection,
    pub(crate) categories: CategoryCollection,
    pub(crate) links: LinkCollection,
    pub(crate) dirty: Untracked<bool>,
}

fn stamp_text(mut text: TextConstruct, element: TextElement) -> TextConstruct {
    text.element = element;
    text
}

fn stamp_link(mut link: BaseLink, kind: BaseLinkKind) -> BaseLink {
    link.kind = kind;
    link
}

impl Source {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<&BaseLink> {
        self.id.as_ref()
    }

    pub fn set_id(&mut self, id: Option<BaseLink>) {
        self.id = id.map(|l| stamp_link(l, BaseLinkKind::Id));
        self.dirty.0 = true;
    }

    pub fn title(&self) -> Option<&TextConstruct> {
        self.title.as_ref()
    }

    pub fn set_title(&mut self, title: Option<TextConstruct>) {
        self.title = title.map(|t| stamp_text(t, TextElement::Title));
        self.dirty.0 = true;
    }

    pub fn subtitle(&self) -> Option<&TextConstruct> {
        self.subtitle.as_ref()
    }

    pub fn set_subtitle(&mut self, subtitle: Option<TextConstruct>) {
        self.subtitle = subtitle.map(|t| stamp_text(t, TextElement::Subtitle));
        self.dirty.0 = true;
    }

    pub fn rights(&self) -> Option<&TextConstruct> {
        self.rights.as_ref()
    }

    pub fn set_rights(&mut self, rights: Option<TextConstruct>) {
        self.rights = rights.map(|t| stamp_text(t, TextElement::Rights));
        self.dirty.0 = true;
    }

    pub fn updated(&self) -> Option<&DateTime<FixedOffset>> {
        self.updated.as_ref()
    }

    pub fn set_updated(&mut self, updated: Option<DateTime<FixedOffset>>) {
        self.updated = updated;
        self.dirty.0 = true;
    }

    pub fn generator(&self) -> Option<&Generator> {
        self.generator.as_ref()
    }

    pub fn set_generator(&mut self, generator: Option<Generator>) {
        self.generator = generator;
        self.dirty.0 = true;
    }

    pub fn icon(&self) -> Option<&BaseLink> {
        self.icon.as_ref()
    }

    pub fn set_icon(&mut self, icon: Option<BaseLink>) {
        self.icon = icon.map(|l| stamp_link(l, BaseLinkKind::Icon));
        self.dirty.0 = true;
    }

    pub fn logo(&self) -> Option<&BaseLink> {
        self.logo.as_ref()
    }

    pub fn set_logo(&mut self, logo: Option<BaseLink>) {
        self.logo = logo.map(|l| stamp_link(l, BaseLinkKind::Logo));
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

    pub(crate) fn children_dirty(&self) -> bool {
        self.common.is_dirty()
            || self.id.as_ref().is_some_and(AtomNode::is_dirty)
            || self.title.as_ref().is_some_and(AtomNode::is_dirty)
            || self.subtitle.as_ref().is_some_and(AtomNode::is_dirty)
            || self.rights.as_ref().is_some_and(AtomNode::is_dirty)
            || self.generator.as_ref().is_some_and(AtomNode::is_dirty)
            || self.icon.as_ref().is_some_and(AtomNode::is_dirty)
            || self.logo.as_ref().is_some_and(AtomNode::is_dirty)
            || self.authors.is_dirty()
            || self.contributors.is_dirty()
            || self.categories.is_dirty()
            || self.links.is_dirty()
    }

    pub(crate) fn mark_children_clean(&mut self) {
        self.common.mark_clean();
        for child in [&mut self.id, &mut self.icon, &mut self.logo].into_iter().flatten() {
            child.mark_clean();
        }
        for child in [&mut self.title, &mut self.subtitle, &mut self.rights]
            .into_iter()
            .flatten()
        {
            child.mark_clean();
        }
        if let Some(generator) = &mut self.generator {
            generator.mark_clean();
        }
        self.authors.mark_clean();
        self.contributors.mark_clean();
        self.categories.mark_clean();
        self.links.mark_clean();
    }

    /// Children shared by `feed` and `source`, in RFC 4287 order.
    pub(crate) fn write_children(&self, w: &mut AtomWriter<'_>) -> Result<(), AtomError> {
        save_optional(w, self.id.as_ref())?;
        save_optional(w, self.title.as_ref())?;
        save_optional(w, self.subtitle.as_ref())?;
        if let Some(updated) = &self.updated {
            w.text_element("updated", &format_timestamp(updated))?;
        }
        save_optional(w, self.rights.as_ref())?;
        save_optional(w, self.generator.as_ref())?;
        save_optional(w, self.icon.as_ref())?;
        save_optional(w, self.logo.as_ref())?;
        save_people(w, &self.authors, PersonElement::Author)?;
        save_people(w, &self.contributors, PersonElement::Contributor)?;
        for category in &self.categories {
            save_node(w, category)?;
        }
        for link in &self.links {
            save_node(w, link)?;
        }
        Ok(())
    }
}

impl AtomNode for Source {
    fn kind(&self) -> NodeKind {
        NodeKind::Source
    }

    fn xml_name(&self) -> &'static str {
        "source"
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
            || self.title.is_some()
            || self.subtitle.is_some()
            || self.rights.is_some()
            || self.updated.is_some()
            || self.generator.is_some()
            || self.icon.is_some()
            || self.logo.is_some()
            || !self.authors.is_empty()
            || !self.contributors.is_empty()
            || !self.categories.is_empty()
            || !self.links.is_empty()
    }

    fn mark_clean(&mut self) {
        self.dirty.0 = false;
        self.mark_children_clean();
    }
}

impl XmlPersist for Source {
    fn write_content(&self, w: &mut AtomWriter<'_>) -> Result<(), AtomError> {
        self.write_children(w)
    }
}
