//! XPath Axes Implementation
//!
//! Node axes:
//! - child, parent, self
//! - descendant, descendant-or-self
//! - ancestor, ancestor-or-self
//! - following, following-sibling
//! - preceding, preceding-sibling
//!
//! Every axis returns nodes in axis order: forward axes in document order,
//! reverse axes nearest node first. The attribute axis is resolved by the
//! evaluator since attributes are not arena nodes.

use super::compiler::CompiledNodeTest;
use super::parser::Axis;
use crate::dom::{DocumentAccess, NodeId, NodeKind};

/// Navigate along an axis from a context node
pub fn navigate<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children_vec(context),
        Axis::Descendant => doc.descendants_vec(context),
        Axis::DescendantOrSelf => descendant_or_self_axis(doc, context),
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => ancestor_axis(doc, context),
        Axis::AncestorOrSelf => ancestor_or_self_axis(doc, context),
        Axis::FollowingSibling => following_sibling_axis(doc, context),
        Axis::PrecedingSibling => preceding_sibling_axis(doc, context),
        Axis::Following => following_axis(doc, context),
        Axis::Preceding => preceding_axis(doc, context),
        Axis::Self_ => vec![context],
        Axis::Attribute => Vec::new(),
    }
}

/// descendant-or-self:: axis - context node plus all descendants
fn descendant_or_self_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let descendants = doc.descendants_vec(context);
    let mut result = Vec::with_capacity(1 + descendants.len());
    result.push(context);
    result.extend(descendants);
    result
}

/// ancestor:: axis - parent, grandparent, ... up to the tree root
fn ancestor_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = context;

    while let Some(parent) = doc.parent_of(current) {
        result.push(parent);
        current = parent;
    }

    result
}

fn ancestor_or_self_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = vec![context];
    result.extend(ancestor_axis(doc, context));
    result
}

fn following_sibling_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();

    let mut sibling = doc.next_sibling_of(context);
    while let Some(sib_id) = sibling {
        result.push(sib_id);
        sibling = doc.next_sibling_of(sib_id);
    }

    result
}

/// preceding-sibling:: axis - nearest sibling first
fn preceding_sibling_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();

    let mut sibling = doc.prev_sibling_of(context);
    while let Some(sib_id) = sibling {
        result.push(sib_id);
        sibling = doc.prev_sibling_of(sib_id);
    }

    result
}

/// following:: axis - all nodes after the context in document order,
/// excluding its descendants
fn following_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = Some(context);

    // Following siblings of the context, then of each ancestor in turn
    while let Some(node) = current {
        let mut sibling = doc.next_sibling_of(node);
        while let Some(sib_id) = sibling {
            result.push(sib_id);
            result.extend(doc.descendants_vec(sib_id));
            sibling = doc.next_sibling_of(sib_id);
        }
        current = doc.parent_of(node);
    }

    result
}

/// preceding:: axis - all nodes before the context in document order,
/// excluding ancestors; nearest first
fn preceding_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let ancestors: std::collections::HashSet<NodeId> =
        ancestor_axis(doc, context).into_iter().collect();
    let root = doc.tree_root_of(context);

    for node in descendant_or_self_axis(doc, root) {
        if node == context {
            break;
        }
        if !ancestors.contains(&node) {
            result.push(node);
        }
    }

    result.reverse();
    result
}

/// Check if a node matches a node test
pub fn matches_node_test<D: DocumentAccess + ?Sized>(
    doc: &D,
    node_id: NodeId,
    node_test: &CompiledNodeTest,
) -> bool {
    let Some(kind) = doc.node_kind_of(node_id) else {
        return false;
    };

    match node_test {
        CompiledNodeTest::Any => kind == NodeKind::Element,
        CompiledNodeTest::Name(name) | CompiledNodeTest::QName(name) => {
            kind == NodeKind::Element && doc.node_name(node_id) == Some(name.as_str())
        }
        CompiledNodeTest::NamespaceWildcard(prefix) => {
            kind == NodeKind::Element
                && doc
                    .node_name(node_id)
                    .and_then(|n| n.split_once(':'))
                    .is_some_and(|(p, _)| p == prefix)
        }
        CompiledNodeTest::Node => true,
        CompiledNodeTest::Text => kind == NodeKind::Text || kind == NodeKind::CData,
        CompiledNodeTest::Comment => kind == NodeKind::Comment,
        CompiledNodeTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target
                    .as_deref()
                    .is_none_or(|t| doc.node_name(node_id) == Some(t))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn sample() -> (Document, NodeId) {
        let doc = Document::parse("<root><a><b/></a><c><d/></c></root>").unwrap();
        let root = doc.root_element().unwrap();
        (doc, root)
    }

    fn names(doc: &Document, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| doc.name(id).unwrap_or("#").to_string())
            .collect()
    }

    #[test]
    fn test_child_axis() {
        let (doc, root) = sample();
        assert_eq!(names(&doc, &navigate(&doc, root, Axis::Child)), vec!["a", "c"]);
    }

    #[test]
    fn test_descendant_axis() {
        let (doc, root) = sample();
        let descendants = navigate(&doc, root, Axis::Descendant);
        assert_eq!(names(&doc, &descendants), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_ancestor_axis() {
        let (doc, root) = sample();
        let b = doc.descendants(root).find(|&n| doc.name(n) == Some("b")).unwrap();
        let ancestors = navigate(&doc, b, Axis::Ancestor);
        assert_eq!(ancestors.len(), 3); // a, root, document
        assert_eq!(doc.name(ancestors[0]), Some("a"));
    }

    #[test]
    fn test_following_and_preceding() {
        let (doc, root) = sample();
        let b = doc.descendants(root).find(|&n| doc.name(n) == Some("b")).unwrap();
        let d = doc.descendants(root).find(|&n| doc.name(n) == Some("d")).unwrap();
        assert_eq!(names(&doc, &navigate(&doc, b, Axis::Following)), vec!["c", "d"]);
        assert_eq!(names(&doc, &navigate(&doc, d, Axis::Preceding)), vec!["b", "a"]);
    }

    #[test]
    fn test_prefixed_node_tests() {
        let doc = Document::parse("<r xmlns:p=\"urn:p\"><p:x/><y/></r>").unwrap();
        let root = doc.root_element().unwrap();
        let children = navigate(&doc, root, Axis::Child);
        let wildcard = CompiledNodeTest::NamespaceWildcard("p".to_string());
        let qname = CompiledNodeTest::QName("p:x".to_string());
        assert!(matches_node_test(&doc, children[0], &wildcard));
        assert!(!matches_node_test(&doc, children[1], &wildcard));
        assert!(matches_node_test(&doc, children[0], &qname));
    }
}
