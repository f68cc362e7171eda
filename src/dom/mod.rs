//! DOM Module - Arena-based mutable XML Document
//!
//! Implements the tree the facade wraps:
//! - Arena allocation for nodes, NodeId (u32) references
//! - String interning for names and text
//! - Event-driven builder with well-formedness checks
//! - Serializer driving any `XmlSink`

pub mod builder;
pub mod document;
pub mod node;
pub mod strings;
pub mod writer;

pub use builder::LoadOptions;
pub use document::{Declaration, Document};
pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode};
pub use strings::StringPool;
pub use writer::{Formatting, SaveOptions, TextSink, XmlSink};

/// Read surface used by the XPath engine
pub trait DocumentAccess {
    /// Topmost ancestor of a node (the document node when attached)
    fn tree_root_of(&self, id: NodeId) -> NodeId;

    fn node_kind_of(&self, id: NodeId) -> Option<NodeKind>;

    /// Element name or PI target
    fn node_name(&self, id: NodeId) -> Option<&str>;

    /// Node local name (without prefix)
    fn node_local_name(&self, id: NodeId) -> Option<&str>;

    fn node_namespace_uri(&self, id: NodeId) -> Option<&str>;

    /// Get attribute value by name
    fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str>;

    /// Get all attribute names and values
    fn get_attribute_values(&self, node_id: NodeId) -> Vec<(&str, &str)>;

    fn parent_of(&self, id: NodeId) -> Option<NodeId>;

    fn next_sibling_of(&self, id: NodeId) -> Option<NodeId>;

    fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId>;

    /// Children - returns collected Vec for trait object compatibility
    fn children_vec(&self, id: NodeId) -> Vec<NodeId>;

    /// Descendants in document order - returns collected Vec
    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId>;

    /// XPath string-value of a node
    fn string_value(&self, id: NodeId) -> String;
}

impl DocumentAccess for Document {
    fn tree_root_of(&self, id: NodeId) -> NodeId {
        self.tree_root(id)
    }

    fn node_kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.kind(id)
    }

    fn node_name(&self, id: NodeId) -> Option<&str> {
        self.name(id)
    }

    fn node_local_name(&self, id: NodeId) -> Option<&str> {
        self.local_name(id)
    }

    fn node_namespace_uri(&self, id: NodeId) -> Option<&str> {
        self.namespace_uri(id)
    }

    fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.attribute(node_id, name)
    }

    fn get_attribute_values(&self, node_id: NodeId) -> Vec<(&str, &str)> {
        self.attribute_pairs(node_id)
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id)
    }

    fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.next_sibling(id)
    }

    fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.prev_sibling(id)
    }

    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id).collect()
    }

    fn string_value(&self, id: NodeId) -> String {
        self.text_value(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_through_trait() {
        let doc = Document::parse("<r a=\"1\"><x>t</x><y/></r>").unwrap();
        let access: &dyn DocumentAccess = &doc;
        let root = doc.root_element().unwrap();
        assert_eq!(access.tree_root_of(root), Document::DOCUMENT_NODE);
        assert_eq!(access.children_vec(root).len(), 2);
        assert_eq!(access.get_attribute(root, "a"), Some("1"));
        assert_eq!(access.string_value(root), "t");
    }
}
