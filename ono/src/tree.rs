//! Arena storage for document trees.
//!
//! Nodes live in a single `Vec` owned by the [`crate::Document`]; all
//! relationships are `NodeId` indices into that arena, so there are no
//! reference cycles and navigation is O(1). Ids are assigned in preorder
//! during construction, which makes `NodeId` order identical to document
//! order; the selector engine relies on this when sorting result sets.
//!
//! Index 0 is always the synthetic document node; the root element is its
//! first element child.

use crate::namespace::QName;

/// Compact node identifier: an index into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(pub(crate) u32);

impl NodeId {
    /// The synthetic document node.
    pub(crate) const DOCUMENT: NodeId = NodeId(0);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// One node in the arena.
#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    /// `None` only for the document node.
    pub(crate) parent: Option<NodeId>,
    /// Position within the parent's child list.
    pub(crate) pos_in_parent: u32,
    /// Children in document order.
    pub(crate) children: Vec<NodeId>,
}

/// The payload of a node.
#[derive(Debug)]
pub(crate) enum NodeKind {
    /// The synthetic root above the root element.
    Document,
    /// An element with a name and attributes.
    Element(ElementData),
    /// A text run (CDATA included).
    Text(String),
    /// A comment, without the `<!--`/`-->` markers.
    Comment(String),
    /// A processing instruction.
    ProcessingInstruction {
        target: String,
        data: String,
    },
}

impl NodeKind {
    pub(crate) fn is_element(&self) -> bool {
        matches!(self, NodeKind::Element(_))
    }

    pub(crate) fn as_element(&self) -> Option<&ElementData> {
        match self {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }
}

/// Element name and attribute store.
#[derive(Debug)]
pub(crate) struct ElementData {
    pub(crate) name: QName,
    /// Attributes in declaration order. Namespace declarations are not
    /// stored here; they are folded into the document's prefix map.
    pub(crate) attributes: Vec<Attribute>,
}

/// A single attribute: qualified name plus string value.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub(crate) name: QName,
    pub(crate) value: String,
}

impl Attribute {
    /// The attribute's local name.
    pub fn name(&self) -> &str {
        self.name.local()
    }

    /// The attribute's namespace URI, if qualified.
    pub fn namespace(&self) -> Option<&str> {
        self.name.namespace()
    }

    /// The attribute value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// The node arena. Built once, then never mutated.
#[derive(Debug)]
pub(crate) struct Arena {
    nodes: Vec<NodeData>,
}

impl Arena {
    /// Creates an arena holding only the document node.
    pub(crate) fn new() -> Self {
        Arena {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                pos_in_parent: 0,
                children: Vec::new(),
            }],
        }
    }

    /// Appends a node as the last child of `parent`.
    pub(crate) fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let pos = self.nodes[parent.index()].children.len() as u32;
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            pos_in_parent: pos,
            children: Vec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    /// Mutable access for the builder; never used after construction.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub(crate) fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub(crate) fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        let parent = self.node(node.parent?);
        parent
            .children
            .get(node.pos_in_parent as usize + 1)
            .copied()
    }

    pub(crate) fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        let parent = self.node(node.parent?);
        let pos = node.pos_in_parent as usize;
        if pos == 0 {
            None
        } else {
            parent.children.get(pos - 1).copied()
        }
    }

    /// Collects the descendants of `id` in document (preorder) order,
    /// excluding `id` itself.
    pub(crate) fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        self.collect_descendants(id, &mut result);
        result
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in self.children(id) {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }

    /// Appends all text runs under `id` (inclusive) to `out`, in document
    /// order.
    pub(crate) fn append_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Document | NodeKind::Element(_) => {
                for &child in self.children(id) {
                    self.append_text(child, out);
                }
            }
            NodeKind::Comment(_) | NodeKind::ProcessingInstruction { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str) -> NodeKind {
        NodeKind::Element(ElementData {
            name: QName::unqualified(name),
            attributes: Vec::new(),
        })
    }

    #[test]
    fn test_preorder_ids_are_document_order() {
        let mut arena = Arena::new();
        let root = arena.push(NodeId::DOCUMENT, element("root"));
        let a = arena.push(root, element("a"));
        let a1 = arena.push(a, element("a1"));
        let b = arena.push(root, element("b"));

        assert!(root < a && a < a1 && a1 < b);
        assert_eq!(arena.descendants(root), vec![a, a1, b]);
    }

    #[test]
    fn test_sibling_links_match_child_order() {
        let mut arena = Arena::new();
        let root = arena.push(NodeId::DOCUMENT, element("root"));
        let a = arena.push(root, element("a"));
        let b = arena.push(root, element("b"));
        let c = arena.push(root, element("c"));

        assert_eq!(arena.prev_sibling(a), None);
        assert_eq!(arena.next_sibling(a), Some(b));
        assert_eq!(arena.prev_sibling(b), Some(a));
        assert_eq!(arena.next_sibling(b), Some(c));
        assert_eq!(arena.next_sibling(c), None);
        assert_eq!(arena.parent(a), Some(root));
    }

    #[test]
    fn test_text_concatenation_is_document_order() {
        let mut arena = Arena::new();
        let root = arena.push(NodeId::DOCUMENT, element("root"));
        arena.push(root, NodeKind::Text("one ".to_string()));
        let inner = arena.push(root, element("inner"));
        arena.push(inner, NodeKind::Text("two".to_string()));
        arena.push(root, NodeKind::Text(" three".to_string()));
        arena.push(root, NodeKind::Comment("ignored".to_string()));

        let mut text = String::new();
        arena.append_text(root, &mut text);
        assert_eq!(text, "one two three");
    }
}
