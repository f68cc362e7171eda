//! XML Document - Arena-based mutable DOM
//!
//! Storage:
//! - Arena of nodes addressed by NodeId (node 0 is the document node)
//! - Arena of attributes; each element owns a contiguous run
//! - String interning for names and text
//!
//! Mutation never moves an existing node. Detached subtrees (created but not
//! yet appended, or removed from their parent) stay in the arena with no
//! parent and can be re-attached later.

use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode};
use super::strings::StringPool;
use crate::core::scanner::is_valid_name;
use crate::error::{Result, XmlError};

/// Namespace bound to the reserved `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Contents of the `<?xml ...?>` declaration seen on load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

/// An XML document stored in arena format
#[derive(Debug)]
pub struct Document {
    nodes: Vec<XmlNode>,
    attributes: Vec<XmlAttribute>,
    /// Attribute slots no element's run covers any more
    dead_attributes: usize,
    pub(crate) strings: StringPool,
    pub(crate) declaration: Option<Declaration>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Id of the document node
    pub const DOCUMENT_NODE: NodeId = 0;

    /// Create an empty document (just the document node)
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(XmlNode::document());
        Document {
            nodes,
            attributes: Vec::with_capacity(32),
            dead_attributes: 0,
            strings: StringPool::new(),
            declaration: None,
        }
    }

    // =========================================================================
    // Structure queries
    // =========================================================================

    /// Root element (first element child of the document node)
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(Self::DOCUMENT_NODE)
            .find(|&id| self.kind(id) == Some(NodeKind::Element))
    }

    /// XML declaration read on load, if any
    pub fn declaration(&self) -> Option<&Declaration> {
        self.declaration.as_ref()
    }

    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut XmlNode> {
        self.nodes
            .get_mut(id as usize)
            .ok_or_else(|| XmlError::Tree(format!("Unknown node id {}", id)))
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::Element)
    }

    /// Element name or PI target
    pub fn name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => self.strings.get(node.name_id),
            _ => None,
        }
    }

    /// Name without its namespace prefix
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        let name = self.name(id)?;
        Some(name.split_once(':').map(|(_, l)| l).unwrap_or(name))
    }

    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        self.name(id)?.split_once(':').map(|(p, _)| p)
    }

    /// Namespace URI of an element, resolved through the in-scope `xmlns`
    /// declarations of the element and its ancestors
    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        if !self.is_element(id) {
            return None;
        }
        let declaration = match self.prefix(id) {
            Some("xml") => return Some(XML_NAMESPACE),
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        };
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(uri) = self.attribute(node, &declaration) {
                return if uri.is_empty() { None } else { Some(uri) };
            }
            current = self.parent(node);
        }
        None
    }

    /// Raw content of a text, CDATA, comment or PI node
    pub fn content(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Document | NodeKind::Element => None,
            _ => self.strings.get(node.value_id),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.next_sibling
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.prev_sibling
    }

    /// Top of the tree containing `id`: the document node for attached
    /// nodes, the outermost detached ancestor otherwise
    pub fn tree_root(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_child);
        ChildIter { doc: self, next: first }
    }

    /// Iterate over all descendants of a node (document order, excluding self)
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        if let Some(node) = self.get_node(id) {
            let mut child_id = node.last_child;
            while let Some(cid) = child_id {
                stack.push(cid);
                child_id = self.prev_sibling(cid);
            }
        }
        DescendantIter { doc: self, stack }
    }

    /// Element children of a node
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(move |&c| self.is_element(c))
    }

    /// Direct element children with the given name, in document order
    pub fn children_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.child_elements(id)
            .filter(|&c| self.name(c) == Some(name))
            .collect()
    }

    /// First direct element child with the given name
    pub fn first_child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.child_elements(id).find(|&c| self.name(c) == Some(name))
    }

    /// Attributes of an element, in document order
    pub fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        match self.get_node(id) {
            Some(node) if node.is_element() => {
                let start = node.attr_start as usize;
                let end = start + node.attr_count as usize;
                self.attributes.get(start..end).unwrap_or(&[])
            }
            _ => &[],
        }
    }

    /// Get attribute value by name
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| self.strings.get(a.name_id) == Some(name))
            .and_then(|a| self.strings.get(a.value_id))
    }

    /// All attribute names and values of an element
    pub fn attribute_pairs(&self, id: NodeId) -> Vec<(&str, &str)> {
        self.attributes(id)
            .iter()
            .map(|a| {
                (
                    self.strings.get_or_empty(a.name_id),
                    self.strings.get_or_empty(a.value_id),
                )
            })
            .collect()
    }

    /// Flattened text value: all descendant text and CDATA concatenated.
    /// For a text-like node, its own content.
    pub fn text_value(&self, id: NodeId) -> String {
        let Some(node) = self.get_node(id) else {
            return String::new();
        };
        match node.kind {
            NodeKind::Document | NodeKind::Element => {
                let mut out = String::new();
                for d in self.descendants(id) {
                    if let Some(n) = self.get_node(d) {
                        if n.is_text() {
                            out.push_str(self.strings.get_or_empty(n.value_id));
                        }
                    }
                }
                out
            }
            _ => self.content(id).unwrap_or_default().to_string(),
        }
    }

    /// Is `ancestor` the same as, or an ancestor of, `id`
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Get total number of nodes in the arena (attached or not)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // =========================================================================
    // Node creation
    // =========================================================================

    fn push_node(&mut self, node: XmlNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> Result<NodeId> {
        if !is_valid_name(name) {
            return Err(XmlError::Tree(format!("Invalid element name: '{}'", name)));
        }
        let name_id = self.strings.intern(name);
        Ok(self.push_node(XmlNode::element(name_id)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let value_id = self.strings.intern(text);
        self.push_node(XmlNode::text(value_id))
    }

    pub fn create_cdata(&mut self, text: &str) -> NodeId {
        let value_id = self.strings.intern(text);
        self.push_node(XmlNode::cdata(value_id))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        let value_id = self.strings.intern(text);
        self.push_node(XmlNode::comment(value_id))
    }

    pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> NodeId {
        let target_id = self.strings.intern(target);
        let data_id = self.strings.intern(data);
        self.push_node(XmlNode::processing_instruction(target_id, data_id))
    }

    // =========================================================================
    // Linking
    // =========================================================================

    /// Append a detached node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        match self.kind(parent) {
            Some(NodeKind::Element) | Some(NodeKind::Document) => {}
            Some(_) => return Err(XmlError::Tree("Only elements and documents have children".into())),
            None => return Err(XmlError::Tree(format!("Unknown node id {}", parent))),
        }
        match self.get_node(child) {
            None => return Err(XmlError::Tree(format!("Unknown node id {}", child))),
            Some(n) if n.kind == NodeKind::Document => {
                return Err(XmlError::Tree("The document node cannot be a child".into()))
            }
            Some(n) if n.parent.is_some() => {
                return Err(XmlError::Tree("Node already has a parent".into()))
            }
            Some(_) => {}
        }
        // A childless node can only contain itself
        let cyclic = match self.get_node(child) {
            Some(n) if n.has_children() => self.is_ancestor_or_self(child, parent),
            _ => child == parent,
        };
        if cyclic {
            return Err(XmlError::Tree("A node cannot be appended to its own subtree".into()));
        }
        self.link_child(parent, child);
        Ok(())
    }

    /// Link a child node to its parent
    pub(super) fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child_opt = self.nodes[parent_id as usize].last_child;

        if let Some(last_child_id) = last_child_opt {
            self.nodes[child_id as usize].prev_sibling = Some(last_child_id);
            self.nodes[last_child_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
        self.nodes[child_id as usize].parent = Some(parent_id);
    }

    /// Create an element and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        let id = self.create_element(name)?;
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Append a text node to `parent` (no-op for empty text)
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let id = self.create_text(text);
        self.append_child(parent, id)
    }

    /// Unlink a node from its parent; the subtree stays usable as a detached tree
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get_node(id) else {
            return;
        };
        let Some(parent) = node.parent else {
            return;
        };
        let (prev, next) = (node.prev_sibling, node.next_sibling);

        match prev {
            Some(p) => self.nodes[p as usize].next_sibling = next,
            None => self.nodes[parent as usize].first_child = next,
        }
        match next {
            Some(n) => self.nodes[n as usize].prev_sibling = prev,
            None => self.nodes[parent as usize].last_child = prev,
        }

        let node = &mut self.nodes[id as usize];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Detach every child of a node
    pub fn remove_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            self.detach(child);
        }
    }

    /// Replace all children of an element with a single text node
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        match self.kind(id) {
            Some(NodeKind::Element) => match self.get_node(id).and_then(|n| n.first_child) {
                // Rewrite a leading text node in place so repeated
                // assignments do not grow the arena
                Some(first) if !text.is_empty() && self.kind(first) == Some(NodeKind::Text) => {
                    while let Some(extra) = self.next_sibling(first) {
                        self.detach(extra);
                    }
                    let value_id = self.strings.intern(text);
                    self.node_mut(first)?.value_id = value_id;
                    Ok(())
                }
                _ => {
                    self.remove_children(id);
                    self.append_text(id, text)
                }
            },
            Some(NodeKind::Text) | Some(NodeKind::CData) | Some(NodeKind::Comment) => {
                let value_id = self.strings.intern(text);
                self.node_mut(id)?.value_id = value_id;
                Ok(())
            }
            _ => Err(XmlError::Tree("Node has no settable text".into())),
        }
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Set or replace an attribute on an element
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        if !self.is_element(id) {
            return Err(XmlError::Tree("Attributes can only be set on elements".into()));
        }
        if !is_valid_name(name) {
            return Err(XmlError::Tree(format!("Invalid attribute name: '{}'", name)));
        }
        let name_id = self.strings.intern(name);
        let value_id = self.strings.intern(value);

        let (start, count) = {
            let node = &self.nodes[id as usize];
            (node.attr_start as usize, node.attr_count as usize)
        };
        if let Some(existing) = self.attributes[start..start + count]
            .iter_mut()
            .find(|a| a.name_id == name_id)
        {
            existing.value_id = value_id;
            return Ok(());
        }
        if count == u16::MAX as usize {
            return Err(XmlError::Tree("Too many attributes on element".into()));
        }

        // The run must stay contiguous: relocate it to the end of the arena
        // unless it already sits there.
        if start + count != self.attributes.len() || count == 0 {
            let new_start = self.attributes.len();
            self.attributes.extend_from_within(start..start + count);
            self.nodes[id as usize].attr_start = new_start as u32;
            self.dead_attributes += count;
        }
        self.attributes.push(XmlAttribute::new(name_id, value_id));
        self.nodes[id as usize].attr_count += 1;
        self.reclaim_attributes();
        Ok(())
    }

    /// Remove an attribute, returning whether it existed
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        let Some(position) = self
            .attributes(id)
            .iter()
            .position(|a| self.strings.get(a.name_id) == Some(name))
        else {
            return false;
        };
        let node = &mut self.nodes[id as usize];
        let start = node.attr_start as usize;
        let count = node.attr_count as usize;
        // Shift the tail of the run left by one
        self.attributes[start + position..start + count].rotate_left(1);
        node.attr_count -= 1;
        self.release_attributes(start + count - 1, 1);
        true
    }

    /// Drop every attribute of an element
    pub fn remove_attributes(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id as usize) else {
            return;
        };
        let (start, count) = (node.attr_start as usize, node.attr_count as usize);
        node.attr_count = 0;
        self.release_attributes(start, count);
    }

    /// Give back `count` slots starting at `start` that no run covers now
    fn release_attributes(&mut self, start: usize, count: usize) {
        if count == 0 {
            return;
        }
        if start + count == self.attributes.len() {
            self.attributes.truncate(start);
        } else {
            self.dead_attributes += count;
        }
        self.reclaim_attributes();
    }

    /// Repack the attribute arena once more than half of it is dead
    fn reclaim_attributes(&mut self) {
        if self.dead_attributes * 2 <= self.attributes.len() {
            return;
        }
        let mut packed = Vec::with_capacity(self.attributes.len() - self.dead_attributes);
        for node in self.nodes.iter_mut().filter(|n| n.attr_count > 0) {
            let start = node.attr_start as usize;
            let end = start + node.attr_count as usize;
            node.attr_start = packed.len() as u32;
            packed.extend_from_slice(&self.attributes[start..end]);
        }
        tracing::trace!(
            before = self.attributes.len(),
            after = packed.len(),
            "attribute arena compacted"
        );
        self.attributes = packed;
        self.dead_attributes = 0;
    }

    /// Slots held in the attribute arena, live or not
    pub fn attribute_capacity(&self) -> usize {
        self.attributes.len()
    }

    // =========================================================================
    // Cross-document copy
    // =========================================================================

    /// Deep-copy a subtree of `source` into this document as a detached tree
    pub fn import(&mut self, source: &Document, node: NodeId) -> Result<NodeId> {
        let root = self.import_one(source, node)?;
        // (source node, copy) pairs whose children still need copying
        let mut stack = vec![(node, root)];
        while let Some((src, dst)) = stack.pop() {
            for child in source.children(src) {
                let copy = self.import_one(source, child)?;
                self.link_child(dst, copy);
                stack.push((child, copy));
            }
        }
        Ok(root)
    }

    /// Copy a single node (with its attributes) without its children
    fn import_one(&mut self, source: &Document, node: NodeId) -> Result<NodeId> {
        let src = source
            .get_node(node)
            .ok_or_else(|| XmlError::Tree(format!("Unknown node id {}", node)))?;
        let copy = match src.kind {
            NodeKind::Document => {
                return Err(XmlError::Tree("The document node cannot be imported".into()))
            }
            NodeKind::Element => {
                let id = self.create_element(source.name(node).unwrap_or_default())?;
                for (name, value) in source.attribute_pairs(node) {
                    self.set_attribute(id, name, value)?;
                }
                id
            }
            NodeKind::Text => self.create_text(source.content(node).unwrap_or_default()),
            NodeKind::CData => self.create_cdata(source.content(node).unwrap_or_default()),
            NodeKind::Comment => self.create_comment(source.content(node).unwrap_or_default()),
            NodeKind::ProcessingInstruction => self.create_processing_instruction(
                source.name(node).unwrap_or_default(),
                source.content(node).unwrap_or_default(),
            ),
        };
        Ok(copy)
    }

    /// Deep-copy a subtree within this document as a detached tree
    pub fn duplicate(&mut self, node: NodeId) -> Result<NodeId> {
        let mut scratch = Document::new();
        let copy = scratch.import(self, node)?;
        self.import(&scratch, copy)
    }
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl<'d> Iterator for ChildIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_sibling(current);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first, document order)
pub struct DescendantIter<'d> {
    doc: &'d Document,
    stack: Vec<NodeId>,
}

impl<'d> Iterator for DescendantIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;

        // Push children in reverse order so the first child is visited first
        if let Some(node) = self.doc.get_node(current) {
            let mut child_id = node.last_child;
            while let Some(id) = child_id {
                self.stack.push(id);
                child_id = self.doc.prev_sibling(id);
            }
        }

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = doc.append_element(Document::DOCUMENT_NODE, "root").unwrap();
        (doc, root)
    }

    #[test]
    fn test_build_tree() {
        let (mut doc, root) = sample();
        let a = doc.append_element(root, "a").unwrap();
        doc.append_text(a, "hello").unwrap();
        doc.append_element(root, "b").unwrap();

        assert_eq!(doc.root_element(), Some(root));
        assert_eq!(doc.children(root).count(), 2);
        assert_eq!(doc.descendants(root).count(), 3);
        assert_eq!(doc.text_value(root), "hello");
        assert_eq!(doc.parent(a), Some(root));
    }

    #[test]
    fn test_children_named_in_order() {
        let (mut doc, root) = sample();
        let t1 = doc.append_element(root, "tag").unwrap();
        doc.append_element(root, "other").unwrap();
        let t2 = doc.append_element(root, "tag").unwrap();
        assert_eq!(doc.children_named(root, "tag"), vec![t1, t2]);
        assert_eq!(doc.first_child_named(root, "tag"), Some(t1));
        assert!(doc.children_named(root, "missing").is_empty());
    }

    #[test]
    fn test_set_attribute_relocates_run() {
        let (mut doc, root) = sample();
        let a = doc.append_element(root, "a").unwrap();
        doc.set_attribute(root, "x", "1").unwrap();
        doc.set_attribute(a, "y", "2").unwrap();
        doc.set_attribute(root, "z", "3").unwrap();
        doc.set_attribute(root, "x", "4").unwrap();

        assert_eq!(doc.attribute_pairs(root), vec![("x", "4"), ("z", "3")]);
        assert_eq!(doc.attribute_pairs(a), vec![("y", "2")]);
    }

    #[test]
    fn test_remove_attribute() {
        let (mut doc, root) = sample();
        doc.set_attribute(root, "a", "1").unwrap();
        doc.set_attribute(root, "b", "2").unwrap();
        doc.set_attribute(root, "c", "3").unwrap();
        assert!(doc.remove_attribute(root, "b"));
        assert!(!doc.remove_attribute(root, "b"));
        assert_eq!(doc.attribute_pairs(root), vec![("a", "1"), ("c", "3")]);
    }

    #[test]
    fn test_set_text_replaces_children() {
        let (mut doc, root) = sample();
        let a = doc.append_element(root, "a").unwrap();
        doc.append_text(a, "old").unwrap();
        doc.set_text(root, "new").unwrap();
        assert_eq!(doc.text_value(root), "new");
        assert_eq!(doc.children(root).count(), 1);
        assert_eq!(doc.parent(a), None);
    }

    #[test]
    fn test_set_text_reuses_text_node() {
        let (mut doc, root) = sample();
        let n = doc.append_element(root, "n").unwrap();
        doc.append_text(n, "0").unwrap();
        let nodes = doc.node_count();
        for i in 1..1000 {
            doc.set_text(n, &i.to_string()).unwrap();
        }
        assert_eq!(doc.node_count(), nodes);
        assert_eq!(doc.text_value(n), "999");
        assert_eq!(doc.children(n).count(), 1);
    }

    #[test]
    fn test_set_text_drops_trailing_siblings() {
        let (mut doc, root) = sample();
        doc.append_text(root, "a").unwrap();
        doc.append_element(root, "b").unwrap();
        doc.set_text(root, "c").unwrap();
        assert_eq!(doc.children(root).count(), 1);
        assert_eq!(doc.text_value(root), "c");

        doc.set_text(root, "").unwrap();
        assert!(!doc.get_node(root).unwrap().has_children());
    }

    #[test]
    fn test_attribute_slots_reclaimed() {
        let (mut doc, root) = sample();
        let a = doc.append_element(root, "a").unwrap();
        doc.set_attribute(root, "keep", "1").unwrap();
        doc.set_attribute(a, "keep", "2").unwrap();
        for i in 0..1000 {
            let name = format!("n{}", i % 7);
            doc.set_attribute(root, &name, "x").unwrap();
            doc.set_attribute(a, &name, "y").unwrap();
            doc.remove_attribute(root, &name);
            doc.remove_attribute(a, &name);
        }
        assert!(doc.attribute_capacity() <= 8, "{}", doc.attribute_capacity());
        assert_eq!(doc.attribute_pairs(root), vec![("keep", "1")]);
        assert_eq!(doc.attribute_pairs(a), vec![("keep", "2")]);

        doc.remove_attributes(root);
        doc.remove_attributes(a);
        assert_eq!(doc.attribute_capacity(), 0);
    }

    #[test]
    fn test_detach_middle_child() {
        let (mut doc, root) = sample();
        let a = doc.append_element(root, "a").unwrap();
        let b = doc.append_element(root, "b").unwrap();
        let c = doc.append_element(root, "c").unwrap();
        doc.detach(b);
        assert_eq!(doc.children(root).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(doc.next_sibling(a), Some(c));
        assert_eq!(doc.prev_sibling(c), Some(a));
        assert_eq!(doc.tree_root(b), b);
    }

    #[test]
    fn test_append_rejects_cycles_and_reparenting() {
        let (mut doc, root) = sample();
        let a = doc.append_element(root, "a").unwrap();
        assert!(doc.append_child(a, a).is_err());
        assert!(doc.append_child(root, a).is_err());
        doc.detach(a);
        doc.append_element(a, "inner").unwrap();
        doc.detach(root);
        assert!(doc.append_child(a, root).is_ok());
    }

    #[test]
    fn test_invalid_names_rejected() {
        let (mut doc, root) = sample();
        assert!(doc.create_element("").is_err());
        assert!(doc.create_element("a b").is_err());
        assert!(doc.set_attribute(root, "1x", "v").is_err());
    }

    #[test]
    fn test_namespace_resolution() {
        let (mut doc, root) = sample();
        doc.set_attribute(root, "xmlns", "urn:default").unwrap();
        doc.set_attribute(root, "xmlns:p", "urn:p").unwrap();
        let plain = doc.append_element(root, "plain").unwrap();
        let prefixed = doc.append_element(root, "p:item").unwrap();
        let reset = doc.append_element(root, "reset").unwrap();
        doc.set_attribute(reset, "xmlns", "").unwrap();

        assert_eq!(doc.namespace_uri(plain), Some("urn:default"));
        assert_eq!(doc.namespace_uri(prefixed), Some("urn:p"));
        assert_eq!(doc.local_name(prefixed), Some("item"));
        assert_eq!(doc.namespace_uri(reset), None);
    }

    #[test]
    fn test_import_subtree() {
        let (mut src, root) = sample();
        src.set_attribute(root, "id", "7").unwrap();
        let child = src.append_element(root, "child").unwrap();
        src.append_text(child, "text").unwrap();

        let mut dst = Document::new();
        let copy = dst.import(&src, root).unwrap();
        dst.append_child(Document::DOCUMENT_NODE, copy).unwrap();
        assert_eq!(dst.name(copy), Some("root"));
        assert_eq!(dst.attribute(copy, "id"), Some("7"));
        assert_eq!(dst.text_value(copy), "text");
    }

    #[test]
    fn test_duplicate_within_document() {
        let (mut doc, root) = sample();
        let child = doc.append_element(root, "child").unwrap();
        doc.append_text(child, "x").unwrap();

        let copy = doc.duplicate(child).unwrap();
        assert_ne!(copy, child);
        assert_eq!(doc.parent(copy), None);
        assert_eq!(doc.text_value(copy), "x");
        assert_eq!(doc.parent(child), Some(root));
    }

    #[test]
    fn test_import_deep_tree() {
        const DEPTH: usize = 100_000;
        let (mut src, root) = sample();
        let mut parent = root;
        for _ in 0..DEPTH {
            parent = src.append_element(parent, "d").unwrap();
        }
        src.append_text(parent, "leaf").unwrap();

        let copy = src.duplicate(root).unwrap();
        assert_eq!(src.descendants(copy).count(), DEPTH + 1);
        assert_eq!(src.text_value(copy), "leaf");
    }
}
