//! Element handles: navigation, attributes, and typed content access.

use chrono::{DateTime, FixedOffset};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::namespace::QName;
use crate::tree::{Attribute, ElementData, NodeId, NodeKind};

/// A lightweight, copyable handle to one element of a [`Document`].
///
/// Elements borrow from their document and cannot outlive it. Two handles
/// compare equal when they refer to the same node of the same document.
#[derive(Clone, Copy)]
pub struct Element<'d> {
    doc: &'d Document,
    pub(crate) id: NodeId,
}

impl<'d> Element<'d> {
    pub(crate) fn new(doc: &'d Document, id: NodeId) -> Self {
        Element { doc, id }
    }

    fn data(&self) -> &'d ElementData {
        match &self.doc.arena.node(self.id).kind {
            NodeKind::Element(data) => data,
            // Element handles are only ever constructed for element nodes.
            _ => unreachable!("element handle pointing at a non-element node"),
        }
    }

    /// The owning document.
    pub fn document(&self) -> &'d Document {
        self.doc
    }

    /// The element's local tag name.
    pub fn tag(&self) -> &'d str {
        self.data().name.local()
    }

    /// The element's namespace URI, if qualified.
    pub fn namespace(&self) -> Option<&'d str> {
        self.data().name.namespace()
    }

    /// The element's full qualified name.
    pub fn qname(&self) -> &'d QName {
        &self.data().name
    }

    /// The parent element, or `None` for the root element.
    pub fn parent(&self) -> Option<Element<'d>> {
        let parent = self.doc.arena.parent(self.id)?;
        self.doc.arena.node(parent).kind.is_element().then(|| Element::new(self.doc, parent))
    }

    /// Direct child elements, in document order.
    pub fn children(&self) -> Vec<Element<'d>> {
        self.doc
            .arena
            .children(self.id)
            .iter()
            .filter(|&&id| self.doc.arena.node(id).kind.is_element())
            .map(|&id| Element::new(self.doc, id))
            .collect()
    }

    /// Number of direct child elements.
    pub fn child_count(&self) -> usize {
        self.doc
            .arena
            .children(self.id)
            .iter()
            .filter(|&&id| self.doc.arena.node(id).kind.is_element())
            .count()
    }

    /// The `index`-th child element (0-based).
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] when `index` is past the end.
    pub fn child_at(&self, index: usize) -> Result<Element<'d>> {
        let children = self.children();
        let len = children.len();
        children
            .into_iter()
            .nth(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    /// The previous sibling element, skipping text and comment nodes.
    pub fn previous_sibling(&self) -> Option<Element<'d>> {
        let mut current = self.doc.arena.prev_sibling(self.id);
        while let Some(id) = current {
            if self.doc.arena.node(id).kind.is_element() {
                return Some(Element::new(self.doc, id));
            }
            current = self.doc.arena.prev_sibling(id);
        }
        None
    }

    /// The next sibling element, skipping text and comment nodes.
    pub fn next_sibling(&self) -> Option<Element<'d>> {
        let mut current = self.doc.arena.next_sibling(self.id);
        while let Some(id) = current {
            if self.doc.arena.node(id).kind.is_element() {
                return Some(Element::new(self.doc, id));
            }
            current = self.doc.arena.next_sibling(id);
        }
        None
    }

    /// The element's attributes, in declaration order.
    pub fn attributes(&self) -> &'d [Attribute] {
        &self.data().attributes
    }

    /// The value of the first attribute with this local name, in any
    /// namespace, in declaration order.
    pub fn attribute(&self, name: &str) -> Option<&'d str> {
        self.data()
            .attributes
            .iter()
            .find(|attr| attr.name.local() == name)
            .map(|attr| attr.value.as_str())
    }

    /// The value of the attribute matching exactly (namespace, local name).
    pub fn attribute_ns(&self, name: &str, namespace: Option<&str>) -> Option<&'d str> {
        self.data()
            .attributes
            .iter()
            .find(|attr| attr.name.matches(name, namespace))
            .map(|attr| attr.value.as_str())
    }

    /// The first direct child element with this tag, any namespace.
    pub fn first_child_with_tag(&self, tag: &str) -> Option<Element<'d>> {
        self.children().into_iter().find(|child| child.tag() == tag)
    }

    /// The first direct child element matching (tag, namespace) exactly.
    pub fn first_child_with_tag_ns(
        &self,
        tag: &str,
        namespace: Option<&str>,
    ) -> Option<Element<'d>> {
        self.children()
            .into_iter()
            .find(|child| child.tag() == tag && child.namespace() == namespace)
    }

    /// All direct child elements with this tag, any namespace, in
    /// document order. Descendants are not searched.
    pub fn children_with_tag(&self, tag: &str) -> Vec<Element<'d>> {
        self.children()
            .into_iter()
            .filter(|child| child.tag() == tag)
            .collect()
    }

    /// All direct child elements matching (tag, namespace) exactly.
    pub fn children_with_tag_ns(&self, tag: &str, namespace: Option<&str>) -> Vec<Element<'d>> {
        self.children()
            .into_iter()
            .filter(|child| child.tag() == tag && child.namespace() == namespace)
            .collect()
    }

    /// The concatenation of every text run under this element, in
    /// document order. Empty (never `None`) for a blank element.
    pub fn string_value(&self) -> String {
        let mut text = String::new();
        self.doc.arena.append_text(self.id, &mut text);
        text
    }

    /// The string value parsed with the document's number formatter.
    /// `None` for blank or non-numeric content.
    pub fn number_value(&self) -> Option<f64> {
        self.doc.number_format().parse(&self.string_value())
    }

    /// The string value parsed with the document's date formatter.
    /// `None` for blank or non-date content.
    pub fn date_value(&self) -> Option<DateTime<FixedOffset>> {
        self.doc.date_format().parse(&self.string_value())
    }

    /// True when the trimmed string value is empty.
    pub fn is_blank(&self) -> bool {
        self.string_value().trim().is_empty()
    }
}

impl PartialEq for Element<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for Element<'_> {}

impl std::fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Element({self})")
    }
}

impl std::fmt::Display for Element<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}", self.tag())?;
        for attr in self.attributes() {
            write!(f, " {}=\"{}\"", attr.name(), attr.value())?;
        }
        f.write_str(">")
    }
}
