//! Ordered child collections with their insertion rules.
//!
//! Links are unique by (rel, type) and categories by (term, scheme): adding a
//! duplicate replaces the earlier one. Entries carry a back-reference to the
//! feed that owns them; see [`EntryCollection::add`].

use super::constructs::{Category, Link, Person};
use super::entry::Entry;
use super::feed::FeedId;
use super::{AtomNode, Untracked};
use crate::errors::AtomError;
use crate::primitives::AtomUri;
use log::debug;

/// Plain ordered list of child nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    items: Vec<T>,
    dirty: Untracked<bool>,
}

pub type PersonCollection = Collection<Person>;
pub type LinkCollection = Collection<Link>;
pub type CategoryCollection = Collection<Category>;

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            dirty: Untracked(false),
        }
    }
}

impl<T: AtomNode> Collection<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
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

    pub fn is_dirty(&self) -> bool {
        self.dirty.0 || self.items.iter().any(AtomNode::is_dirty)
    }

    pub fn mark_clean(&mut self) {
        self.dirty.0 = false;
        self.items.iter_mut().for_each(AtomNode::mark_clean);
    }

    fn append(&mut self, item: T) {
        self.items.push(item);
        self.dirty.0 = true;
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Collection<Person> {
    /// Persons are neither unique nor reordered.
    pub fn add(&mut self, person: Person) {
        self.append(person);
    }
}

impl Collection<Link> {
    /// Replaces the first link matching the new link's (rel, type), then
    /// appends.
    pub fn add(&mut self, link: Link) {
        let existing = self
            .items
            .iter()
            .position(|l| l.matches(link.rel.as_deref(), link.link_type.as_deref()));
        if let Some(index) = existing {
            self.items.remove(index);
        }
        self.append(link);
    }

    pub fn find_service(&self, rel: Option<&str>, link_type: Option<&str>) -> Option<&Link> {
        self.items.iter().find(|l| l.matches(rel, link_type))
    }

    pub fn find_service_list(&self, rel: Option<&str>, link_type: Option<&str>) -> Vec<&Link> {
        self.items.iter().filter(|l| l.matches(rel, link_type)).collect()
    }
}

impl Collection<Category> {
    /// Replaces the first category matching the new one's (term, scheme),
    /// then appends.
    pub fn add(&mut self, category: Category) {
        if let Some(term) = category.term.as_deref() {
            let scheme = category.scheme.as_ref().map(AtomUri::as_str);
            if let Some(index) = self.items.iter().position(|c| c.matches(term, scheme)) {
                self.items.remove(index);
            }
        }
        self.append(category);
    }

    /// First category with this term, whatever its scheme.
    pub fn find(&self, term: &str) -> Option<&Category> {
        self.find_with_scheme(term, None)
    }

    pub fn find_with_scheme(&self, term: &str, scheme: Option<&str>) -> Option<&Category> {
        self.items.iter().find(|c| c.matches(term, scheme))
    }

    pub fn contains(&self, category: &Category) -> bool {
        self.items.iter().any(|c| c == category)
    }
}

const DEFAULT_PROTOCOL: (u32, u32) = (1, 0);

/// Entries of one feed.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryCollection {
    items: Vec<Entry>,
    owner: Untracked<FeedId>,
    protocol: (u32, u32),
    dirty: Untracked<bool>,
}

impl EntryCollection {
    pub(crate) fn new(owner: FeedId) -> Self {
        Self {
            items: Vec::new(),
            owner: Untracked(owner),
            protocol: DEFAULT_PROTOCOL,
            dirty: Untracked(false),
        }
    }

    /// Inserts `entry` and returns the stored value.
    ///
    /// A free entry is adopted. An entry already owned by this feed is
    /// rejected. An entry owned by a different feed is replaced by an
    /// [`import`](Self::import)ed copy. Either way the stored entry is
    /// stamped with this feed's protocol version.
    pub fn add(&mut self, entry: Entry) -> Result<&mut Entry, AtomError> {
        let entry = match entry.owner() {
            None => entry,
            Some(owner) if owner == self.owner.0 => {
                return Err(AtomError::EntryAlreadyInCollection);
            }
            Some(_) => {
                debug!("entry owned by another feed, importing a copy");
                detach(entry)
            }
        };
        Ok(self.adopt(entry))
    }

    /// Copies an entry owned elsewhere into this collection. The copy shares
    /// no state with the original.
    pub fn import(&mut self, entry: &Entry) -> &mut Entry {
        self.adopt(detach(entry.clone()))
    }

    pub fn remove(&mut self, index: usize) -> Option<Entry> {
        if index >= self.items.len() {
            return None;
        }
        self.dirty.0 = true;
        let mut entry = self.items.remove(index);
        entry.owner = Untracked(None);
        Some(entry)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Entry> {
        self.items
            .iter()
            .find(|e| e.id().is_some_and(|i| i.uri().as_str() == id))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entry> {
        self.items.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entry> {
        self.items.get_mut(index)
    }

    pub fn protocol_version(&self) -> (u32, u32) {
        self.protocol
    }

    /// Takes effect for entries inserted afterwards.
    pub(crate) fn set_protocol_version(&mut self, major: u32, minor: u32) {
        self.protocol = (major, minor);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.0 || self.items.iter().any(AtomNode::is_dirty)
    }

    pub fn mark_clean(&mut self) {
        self.dirty.0 = false;
        self.items.iter_mut().for_each(AtomNode::mark_clean);
    }

    /// Moves the collection and its entries under a new owner.
    pub(crate) fn reown(&mut self, owner: FeedId) {
        self.owner = Untracked(owner);
        for entry in &mut self.items {
            entry.owner = Untracked(Some(owner));
        }
    }

    fn adopt(&mut self, mut entry: Entry) -> &mut Entry {
        entry.owner = Untracked(Some(self.owner.0));
        entry.protocol = Untracked(Some(self.protocol));
        self.items.push(entry);
        self.dirty.0 = true;
        let index = self.items.len() - 1;
        &mut self.items[index]
    }
}

impl<'a> IntoIterator for &'a EntryCollection {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn detach(mut entry: Entry) -> Entry {
    entry.owner = Untracked(None);
    entry.dirty.0 = true;
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Feed;

    #[test]
    fn test_link_dedup_keeps_last() {
        let mut links = LinkCollection::default();
        links.add(Link::new("http://example.com/a", "alternate").with_type("text/html"));
        links.add(Link::new("http://example.com/self", "self"));
        links.add(Link::new("http://example.com/b", "alternate").with_type("text/html"));

        assert_eq!(links.len(), 2);
        let alternate = links.find_service(Some("alternate"), Some("text/html")).unwrap();
        assert_eq!(alternate.href().unwrap().as_str(), "http://example.com/b");
    }

    #[test]
    fn test_link_find_service_list_wildcard() {
        let mut links = LinkCollection::default();
        links.add(Link::new("http://example.com/a", "alternate").with_type("text/html"));
        links.add(Link::new("http://example.com/a.atom", "alternate").with_type("application/atom+xml"));
        links.add(Link::new("http://example.com/self", "self"));

        assert_eq!(links.find_service_list(Some("alternate"), None).len(), 2);
        assert_eq!(links.find_service_list(None, None).len(), 3);
        assert!(links.find_service(Some("edit"), None).is_none());
    }

    #[test]
    fn test_category_dedup_and_lookup() {
        let mut categories = CategoryCollection::default();
        for label in ["one", "two", "three"] {
            let mut category = Category::new("news").with_scheme("urn:scheme");
            category.set_label(label);
            categories.add(category);
        }
        categories.add(Category::new("sport").with_scheme("urn:scheme"));

        assert_eq!(categories.len(), 2);
        assert_eq!(categories.find("news").unwrap().label(), Some("three"));
        assert!(categories.find_with_scheme("news", Some("urn:other")).is_none());
        assert!(categories.contains(&Category::new("sport").with_scheme("urn:scheme")));
    }

    #[test]
    fn test_entry_add_rules() {
        let mut feed = Feed::new();
        feed.set_protocol_version(2, 1);

        let stored = feed.entries_mut().add(Entry::new()).unwrap();
        assert_eq!(stored.protocol_version(), (2, 1));
        let again = stored.clone();

        assert!(matches!(
            feed.entries_mut().add(again),
            Err(AtomError::EntryAlreadyInCollection)
        ));
        assert_eq!(feed.entries().len(), 1);
    }

    #[test]
    fn test_entry_remove_releases_owner() {
        let mut feed = Feed::new();
        feed.entries_mut().add(Entry::new()).unwrap();
        let removed = feed.entries_mut().remove(0).unwrap();
        assert!(removed.owner().is_none());
        assert!(feed.entries().is_empty());
        assert!(feed.entries_mut().remove(0).is_none());
    }
}
