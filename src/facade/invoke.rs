//! Method forwarding
//!
//! `Node::invoke` dispatches by name through a fixed table of element
//! operations built on first use. Every failure (unknown name, arity,
//! argument kind, tree error) is logged and answered with `None`.

use std::collections::HashMap;
use std::sync::OnceLock;

use thiserror::Error;

use super::{Node, Value};
use crate::dom::{NodeId, SaveOptions};
use crate::error::{XPathError, XmlError};
use crate::xpath;

/// Result of a forwarded method
#[derive(Debug, Clone)]
pub enum Returned {
    /// The method completed and has no result
    Unit,
    /// The method completed and found nothing
    Null,
    Bool(bool),
    Text(String),
    Node(Node),
    Nodes(Vec<Node>),
}

impl Returned {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Returned::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Returned::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Returned::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn into_nodes(self) -> Vec<Node> {
        match self {
            Returned::Node(node) => vec![node],
            Returned::Nodes(nodes) => nodes,
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
enum InvokeError {
    #[error("no such method")]
    Unknown,

    #[error("expected {min} to {max} arguments, got {got}")]
    Arity { min: usize, max: usize, got: usize },

    #[error("argument {0} must be text")]
    ArgumentKind(usize),

    #[error(transparent)]
    Tree(#[from] XmlError),

    #[error(transparent)]
    Path(#[from] XPathError),
}

type Handler = fn(&Node, &[Value]) -> Result<Returned, InvokeError>;

struct Method {
    min_args: usize,
    max_args: usize,
    handler: Handler,
}

struct MethodTable {
    methods: HashMap<&'static str, Method>,
}

static METHODS: OnceLock<MethodTable> = OnceLock::new();

impl MethodTable {
    fn get() -> &'static MethodTable {
        METHODS.get_or_init(MethodTable::build)
    }

    fn build() -> Self {
        let entries: [(&'static str, usize, usize, Handler); 22] = [
            ("name", 0, 0, name),
            ("local_name", 0, 0, local_name),
            ("namespace_uri", 0, 0, namespace_uri),
            ("value", 0, 0, value),
            ("set_value", 1, 1, set_value),
            ("attribute", 1, 1, attribute),
            ("set_attribute", 2, 2, set_attribute),
            ("remove_attribute", 1, 1, remove_attribute),
            ("remove_attributes", 0, 0, remove_attributes),
            ("has_attributes", 0, 0, has_attributes),
            ("has_elements", 0, 0, has_elements),
            ("is_empty", 0, 0, is_empty),
            ("element", 1, 1, element),
            ("elements", 0, 1, elements),
            ("descendants", 0, 1, descendants),
            ("parent", 0, 0, parent),
            ("add", 1, 1, add),
            ("remove", 0, 0, remove),
            ("remove_nodes", 0, 0, remove_nodes),
            ("to_string", 0, 0, to_string),
            ("select", 1, 1, select),
            ("select_value", 1, 1, select_value),
        ];
        let methods = entries
            .into_iter()
            .map(|(name, min_args, max_args, handler)| {
                (
                    name,
                    Method {
                        min_args,
                        max_args,
                        handler,
                    },
                )
            })
            .collect();
        MethodTable { methods }
    }

    fn dispatch(&self, node: &Node, name: &str, args: &[Value]) -> Result<Returned, InvokeError> {
        let method = self.methods.get(name).ok_or(InvokeError::Unknown)?;
        if args.len() < method.min_args || args.len() > method.max_args {
            return Err(InvokeError::Arity {
                min: method.min_args,
                max: method.max_args,
                got: args.len(),
            });
        }
        (method.handler)(node, args)
    }
}

impl Node {
    /// Forward a named element operation. `None` means the call failed.
    pub fn invoke(&self, name: &str, args: &[Value]) -> Option<Returned> {
        match MethodTable::get().dispatch(self, name, args) {
            Ok(returned) => Some(returned),
            Err(e) => {
                tracing::debug!(method = name, args = args.len(), error = %e, "invoke failed");
                None
            }
        }
    }

    /// Names accepted by `invoke`, sorted
    pub fn invocable() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = MethodTable::get().methods.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

fn text_arg(args: &[Value], index: usize) -> Result<&str, InvokeError> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or(InvokeError::ArgumentKind(index))
}

fn name_filter(args: &[Value]) -> Result<Option<&str>, InvokeError> {
    match args.first() {
        Some(_) => text_arg(args, 0).map(Some),
        None => Ok(None),
    }
}

fn optional(node: Option<Node>) -> Returned {
    node.map_or(Returned::Null, Returned::Node)
}

// =============================================================================
// Handlers
// =============================================================================

fn name(node: &Node, _args: &[Value]) -> Result<Returned, InvokeError> {
    Ok(Returned::Text(node.name()))
}

fn local_name(node: &Node, _args: &[Value]) -> Result<Returned, InvokeError> {
    let doc = node.doc.borrow();
    Ok(Returned::Text(doc.local_name(node.id).unwrap_or_default().to_string()))
}

fn namespace_uri(node: &Node, _args: &[Value]) -> Result<Returned, InvokeError> {
    let doc = node.doc.borrow();
    Ok(Returned::Text(doc.namespace_uri(node.id).unwrap_or_default().to_string()))
}

fn value(node: &Node, _args: &[Value]) -> Result<Returned, InvokeError> {
    Ok(Returned::Text(node.value()))
}

fn set_value(node: &Node, args: &[Value]) -> Result<Returned, InvokeError> {
    let text = args[0].to_text();
    node.doc.borrow_mut().set_text(node.id, &text)?;
    Ok(Returned::Unit)
}

fn attribute(node: &Node, args: &[Value]) -> Result<Returned, InvokeError> {
    let attr = text_arg(args, 0)?;
    let doc = node.doc.borrow();
    Ok(doc
        .attribute(node.id, attr)
        .map_or(Returned::Null, |v| Returned::Text(v.to_string())))
}

fn set_attribute(node: &Node, args: &[Value]) -> Result<Returned, InvokeError> {
    let attr = text_arg(args, 0)?;
    let text = args[1].to_text();
    node.doc.borrow_mut().set_attribute(node.id, attr, &text)?;
    Ok(Returned::Unit)
}

fn remove_attribute(node: &Node, args: &[Value]) -> Result<Returned, InvokeError> {
    let attr = text_arg(args, 0)?;
    Ok(Returned::Bool(node.doc.borrow_mut().remove_attribute(node.id, attr)))
}

fn remove_attributes(node: &Node, _args: &[Value]) -> Result<Returned, InvokeError> {
    node.doc.borrow_mut().remove_attributes(node.id);
    Ok(Returned::Unit)
}

fn has_attributes(node: &Node, _args: &[Value]) -> Result<Returned, InvokeError> {
    let doc = node.doc.borrow();
    let found = doc.get_node(node.id).is_some_and(|n| n.has_attributes());
    Ok(Returned::Bool(found))
}

fn has_elements(node: &Node, _args: &[Value]) -> Result<Returned, InvokeError> {
    let doc = node.doc.borrow();
    let found = doc.child_elements(node.id).next().is_some();
    Ok(Returned::Bool(found))
}

fn is_empty(node: &Node, _args: &[Value]) -> Result<Returned, InvokeError> {
    let doc = node.doc.borrow();
    let empty = doc.get_node(node.id).is_none_or(|n| !n.has_children());
    Ok(Returned::Bool(empty))
}

fn element(node: &Node, args: &[Value]) -> Result<Returned, InvokeError> {
    let wanted = text_arg(args, 0)?;
    let found = node.doc.borrow().first_child_named(node.id, wanted);
    Ok(optional(found.map(|id| node.at(id))))
}

fn elements(node: &Node, args: &[Value]) -> Result<Returned, InvokeError> {
    let filter = name_filter(args)?;
    let ids: Vec<NodeId> = {
        let doc = node.doc.borrow();
        doc.child_elements(node.id)
            .filter(|&c| filter.is_none_or(|n| doc.name(c) == Some(n)))
            .collect()
    };
    Ok(Returned::Nodes(node.all_at(ids)))
}

fn descendants(node: &Node, args: &[Value]) -> Result<Returned, InvokeError> {
    let filter = name_filter(args)?;
    let ids: Vec<NodeId> = {
        let doc = node.doc.borrow();
        doc.descendants(node.id)
            .filter(|&d| doc.is_element(d))
            .filter(|&d| filter.is_none_or(|n| doc.name(d) == Some(n)))
            .collect()
    };
    Ok(Returned::Nodes(node.all_at(ids)))
}

fn parent(node: &Node, _args: &[Value]) -> Result<Returned, InvokeError> {
    Ok(optional(node.parent()))
}

/// Append text or an element. An element that already has a parent, or that
/// lives in another document, is appended as a deep copy.
fn add(node: &Node, args: &[Value]) -> Result<Returned, InvokeError> {
    match &args[0] {
        Value::Text(text) => node.doc.borrow_mut().append_text(node.id, text)?,
        Value::Node(other) if std::rc::Rc::ptr_eq(&node.doc, &other.doc) => {
            let mut doc = node.doc.borrow_mut();
            let child = match doc.parent(other.id) {
                Some(_) => doc.duplicate(other.id)?,
                None => other.id,
            };
            doc.append_child(node.id, child)?;
        }
        Value::Node(other) => {
            let source = other.doc.borrow();
            let mut doc = node.doc.borrow_mut();
            let copy = doc.import(&source, other.id)?;
            doc.append_child(node.id, copy)?;
        }
    }
    Ok(Returned::Unit)
}

fn remove(node: &Node, _args: &[Value]) -> Result<Returned, InvokeError> {
    let mut doc = node.doc.borrow_mut();
    if doc.parent(node.id).is_none() {
        return Err(XmlError::Tree("The node has no parent".into()).into());
    }
    doc.detach(node.id);
    Ok(Returned::Unit)
}

fn remove_nodes(node: &Node, _args: &[Value]) -> Result<Returned, InvokeError> {
    node.doc.borrow_mut().remove_children(node.id);
    Ok(Returned::Unit)
}

fn to_string(node: &Node, _args: &[Value]) -> Result<Returned, InvokeError> {
    let doc = node.doc.borrow();
    Ok(Returned::Text(doc.to_xml_string(node.id, &SaveOptions::fragment())))
}

fn select(node: &Node, args: &[Value]) -> Result<Returned, InvokeError> {
    let path = text_arg(args, 0)?;
    Ok(Returned::Nodes(node.select(path)?))
}

fn select_value(node: &Node, args: &[Value]) -> Result<Returned, InvokeError> {
    let path = text_arg(args, 0)?;
    let found = xpath::select_string(&*node.doc.borrow(), node.id, path)?;
    Ok(found.map_or(Returned::Null, Returned::Text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::parse("<p:person xmlns:p=\"urn:people\" id=\"7\"><name>Ann</name><tag>a</tag><tag>b</tag></p:person>")
            .unwrap()
    }

    #[test]
    fn test_allow_list() {
        let names = Node::invocable();
        assert_eq!(names.len(), 22);
        assert!(names.contains(&"set_attribute"));
        assert!(!names.contains(&"detach"));
    }

    #[test]
    fn test_name_queries() {
        let person = sample();
        assert_eq!(person.invoke("name", &[]).unwrap().as_text(), Some("p:person"));
        assert_eq!(person.invoke("local_name", &[]).unwrap().as_text(), Some("person"));
        assert_eq!(
            person.invoke("namespace_uri", &[]).unwrap().as_text(),
            Some("urn:people")
        );
        assert_eq!(person.invoke("value", &[]).unwrap().as_text(), Some("Annab"));
    }

    #[test]
    fn test_attribute_methods() {
        let person = sample();
        assert_eq!(person.invoke("attribute", &["id".into()]).unwrap().as_text(), Some("7"));
        assert!(matches!(
            person.invoke("attribute", &["nope".into()]),
            Some(Returned::Null)
        ));
        person.invoke("set_attribute", &["role".into(), 3i32.into()]).unwrap();
        assert_eq!(person.get("_role").as_attribute(), Some("3"));
        assert_eq!(
            person.invoke("remove_attribute", &["role".into()]).unwrap().as_bool(),
            Some(true)
        );
        assert_eq!(
            person.invoke("remove_attribute", &["role".into()]).unwrap().as_bool(),
            Some(false)
        );
        person.invoke("remove_attributes", &[]).unwrap();
        assert_eq!(person.invoke("has_attributes", &[]).unwrap().as_bool(), Some(false));
    }

    #[test]
    fn test_navigation_methods() {
        let person = sample();
        assert_eq!(person.invoke("has_elements", &[]).unwrap().as_bool(), Some(true));
        assert_eq!(person.invoke("is_empty", &[]).unwrap().as_bool(), Some(false));

        let name = person.invoke("element", &["name".into()]).unwrap();
        assert_eq!(name.as_node().map(Node::value).as_deref(), Some("Ann"));
        assert!(matches!(
            person.invoke("element", &["nope".into()]),
            Some(Returned::Null)
        ));

        assert_eq!(person.invoke("elements", &[]).unwrap().into_nodes().len(), 3);
        assert_eq!(
            person.invoke("elements", &["tag".into()]).unwrap().into_nodes().len(),
            2
        );
        assert_eq!(person.invoke("descendants", &[]).unwrap().into_nodes().len(), 3);

        let tag = person.get("tag").into_iter().next().unwrap();
        let up = tag.invoke("parent", &[]).unwrap();
        assert!(up.as_node().unwrap().same_node(&person));
        assert!(matches!(person.invoke("parent", &[]), Some(Returned::Null)));
    }

    #[test]
    fn test_mutation_methods() {
        let person = sample();
        person.invoke("set_value", &["plain".into()]).unwrap();
        assert_eq!(person.value(), "plain");
        assert_eq!(person.invoke("has_elements", &[]).unwrap().as_bool(), Some(false));

        person.invoke("remove_nodes", &[]).unwrap();
        assert_eq!(person.invoke("is_empty", &[]).unwrap().as_bool(), Some(true));

        let child = Node::create("child").unwrap();
        child.set("leaf", "x");
        person.invoke("add", &[child.into()]).unwrap();
        person.invoke("add", &["tail".into()]).unwrap();
        assert_eq!(person.value(), "xtail");

        let leaf = person.get("child").as_node().cloned().unwrap();
        leaf.invoke("remove", &[]).unwrap();
        assert_eq!(person.value(), "tail");
        assert!(leaf.invoke("remove", &[]).is_none());
    }

    #[test]
    fn test_add_attached_node_copies() {
        let doc = Node::parse("<r><a>1</a><b/></r>").unwrap();
        let a = doc.get("a").as_node().cloned().unwrap();
        let b = doc.get("b").as_node().cloned().unwrap();
        b.invoke("add", &[a.clone().into()]).unwrap();
        assert_eq!(doc.value(), "11");
        assert!(a.parent().unwrap().same_node(&doc));

        assert!(b.invoke("add", &[doc.clone().into()]).is_some());
        assert_eq!(b.value(), "111");
    }

    #[test]
    fn test_serialize_and_query() {
        let person = Node::parse("<r><a>1</a></r>").unwrap();
        assert_eq!(
            person.invoke("to_string", &[]).unwrap().as_text(),
            Some("<r><a>1</a></r>")
        );
        assert_eq!(person.invoke("select", &["a".into()]).unwrap().into_nodes().len(), 1);
        assert_eq!(
            person.invoke("select_value", &["a".into()]).unwrap().as_text(),
            Some("1")
        );
        assert!(matches!(
            person.invoke("select_value", &["b".into()]),
            Some(Returned::Null)
        ));
    }

    #[test]
    fn test_soft_failures() {
        let person = sample();
        assert!(person.invoke("no_such_method", &[]).is_none());
        assert!(person.invoke("name", &["extra".into()]).is_none());
        assert!(person.invoke("attribute", &[]).is_none());
        assert!(person.invoke("attribute", &[person.clone().into()]).is_none());
        assert!(person.invoke("set_attribute", &["1bad".into(), "x".into()]).is_none());
        assert!(person.invoke("select", &["a[".into()]).is_none());
    }
}
