//! Dynamic element facade
//!
//! `Node` wraps one element of a shared `Document` and resolves member
//! names at runtime:
//! - `get`/`set` map names to attributes (`_` prefix) or child elements
//! - `invoke` dispatches to an allow-listed set of element methods
//! - typed conversions parse the element's flattened text
//!
//! Lookups that find nothing answer "absent" rather than failing.

mod compare;
mod convert;
mod invoke;
mod member;
mod persist;

use std::cell::RefCell;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

use crate::dom::{Document, LoadOptions, NodeId};
use crate::error::{Result, XPathError, XmlError};
use crate::xpath;

pub use convert::{ConversionTarget, FormatProvider, FromXmlText};
pub use invoke::Returned;
pub use member::{Member, Value};

/// Dynamic view over one element of a shared document
///
/// Cloning a `Node` clones the handle, not the element: both clones observe
/// and mutate the same tree.
#[derive(Clone)]
pub struct Node {
    doc: Rc<RefCell<Document>>,
    id: NodeId,
}

impl Node {
    /// Wrap an existing element of a shared document. Returns `None` when
    /// `id` is not an element (the document node, text, comments, PIs).
    pub fn wrap(doc: Rc<RefCell<Document>>, id: NodeId) -> Option<Self> {
        if !doc.borrow().is_element(id) {
            return None;
        }
        Some(Node { doc, id })
    }

    /// Wrap the root element of a document
    pub fn from_document(doc: Document) -> Result<Self> {
        let root = doc
            .root_element()
            .ok_or_else(|| XmlError::Tree("Document has no root element".into()))?;
        Ok(Node {
            doc: Rc::new(RefCell::new(doc)),
            id: root,
        })
    }

    /// New detached element in a fresh document
    pub fn create(name: &str) -> Result<Self> {
        let mut doc = Document::new();
        let id = doc.create_element(name)?;
        Ok(Node {
            doc: Rc::new(RefCell::new(doc)),
            id,
        })
    }

    /// Parse XML text and wrap its root element
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, &LoadOptions::default())
    }

    pub fn parse_with(text: &str, options: &LoadOptions) -> Result<Self> {
        Self::from_document(Document::parse_with(text, options)?)
    }

    /// Load a file and wrap its root element
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, &LoadOptions::default())
    }

    pub fn load_with(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        Self::from_document(Document::load(path, options)?)
    }

    /// Read a whole stream and wrap its root element
    pub fn load_from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_document(Document::load_from_reader(reader, &LoadOptions::default())?)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Shared handle to the underlying document
    pub fn document(&self) -> Rc<RefCell<Document>> {
        Rc::clone(&self.doc)
    }

    /// Whether both handles denote the same element of the same document
    pub fn same_node(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.doc, &other.doc) && self.id == other.id
    }

    /// Qualified element name
    pub fn name(&self) -> String {
        self.doc.borrow().name(self.id).unwrap_or_default().to_string()
    }

    /// Flattened text of all descendant text nodes
    pub fn value(&self) -> String {
        self.doc.borrow().text_value(self.id)
    }

    /// Parent element, if attached under one
    pub fn parent(&self) -> Option<Node> {
        let doc = self.doc.borrow();
        doc.parent(self.id)
            .filter(|&p| doc.is_element(p))
            .map(|p| self.at(p))
    }

    /// Direct child elements
    pub fn elements(&self) -> Vec<Node> {
        let ids: Vec<NodeId> = self.doc.borrow().child_elements(self.id).collect();
        self.all_at(ids)
    }

    /// Handle on another element of the same document
    fn at(&self, id: NodeId) -> Node {
        Node {
            doc: Rc::clone(&self.doc),
            id,
        }
    }

    fn all_at(&self, ids: Vec<NodeId>) -> Vec<Node> {
        ids.into_iter().map(|id| self.at(id)).collect()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Text of the first direct child element with the given name
    pub fn value_by_name(&self, name: &str) -> Option<String> {
        let doc = self.doc.borrow();
        doc.first_child_named(self.id, name)
            .map(|child| doc.text_value(child))
    }

    /// Text of the first node or attribute selected by a path expression,
    /// evaluated with this element as context
    pub fn value_by_path(&self, path: &str) -> std::result::Result<Option<String>, XPathError> {
        xpath::select_string(&*self.doc.borrow(), self.id, path)
    }

    /// Elements selected by a path expression, in document order.
    /// Non-element nodes in the result are skipped.
    pub fn select(&self, path: &str) -> std::result::Result<Vec<Node>, XPathError> {
        let ids = {
            let doc = self.doc.borrow();
            let mut ids = xpath::select_nodes(&*doc, self.id, path)?;
            ids.retain(|&id| doc.is_element(id));
            ids
        };
        Ok(self.all_at(ids))
    }

    // =========================================================================
    // Enumeration
    // =========================================================================

    /// A facade enumerates exactly one item: itself
    pub fn iter(&self) -> std::iter::Once<&Node> {
        std::iter::once(self)
    }
}

impl IntoIterator for Node {
    type Item = Node;
    type IntoIter = std::iter::Once<Node>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self)
    }
}

impl<'a> IntoIterator for &'a Node {
    type Item = &'a Node;
    type IntoIter = std::iter::Once<&'a Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("value", &self.value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSON: &str = "<person id=\"7\"><name>Ann</name><tag>a</tag><tag>b</tag></person>";

    #[test]
    fn test_person_end_to_end() {
        let f = Node::parse("<person><name>Ada</name><tag>x</tag><tag>y</tag></person>").unwrap();

        let name = f.get("name");
        assert_eq!(name.as_node().map(Node::value).as_deref(), Some("Ada"));

        let tags: Vec<String> = f.get("tag").into_iter().map(|t| t.value()).collect();
        assert_eq!(tags, vec!["x", "y"]);

        assert!(f.get("_id").is_absent());
    }

    #[test]
    fn test_text_equality_and_typed_value() {
        let node = Node::parse("<n>5</n>").unwrap();
        assert_eq!(node, "5");
        assert_eq!(node.to::<i32>(), Ok(5));
    }

    #[test]
    fn test_reparse_preserves_tree() {
        let source = "<r a=\"1 &amp; 2\"><x>t<![CDATA[<c>]]></x><!--note--><y/></r>";
        let first = Node::parse(source).unwrap();
        let second = Node::parse(&first.to_xml_string()).unwrap();
        assert_eq!(second.to_xml_string(), first.to_xml_string());
        assert_eq!(second.value(), "t<c>");
        assert_eq!(second.get("_a").as_attribute(), Some("1 & 2"));
    }

    #[test]
    fn test_parse_wraps_root() {
        let person = Node::parse(PERSON).unwrap();
        assert_eq!(person.name(), "person");
        assert_eq!(person.value(), "Annab");
        assert_eq!(person.to_string(), "Annab");
        assert!(person.parent().is_none());
    }

    #[test]
    fn test_create_detached() {
        let node = Node::create("item").unwrap();
        assert_eq!(node.name(), "item");
        assert_eq!(node.value(), "");
        assert!(node.parent().is_none());
        assert!(Node::create("1bad").is_err());
    }

    #[test]
    fn test_wrap_accepts_only_elements() {
        let doc = Rc::new(RefCell::new(Document::parse("<r><a>t</a><!--c--></r>").unwrap()));
        let (root, a, comment) = {
            let d = doc.borrow();
            let root = d.root_element().unwrap();
            let a = d.first_child_named(root, "a").unwrap();
            let comment = d.children(root).last().unwrap();
            (root, a, comment)
        };
        let text = doc.borrow().children(a).next().unwrap();

        let wrapped = Node::wrap(Rc::clone(&doc), a).unwrap();
        assert_eq!(wrapped.value(), "t");
        assert_eq!(wrapped.parent().map(|p| p.id()), Some(root));

        assert!(Node::wrap(Rc::clone(&doc), Document::DOCUMENT_NODE).is_none());
        assert!(Node::wrap(Rc::clone(&doc), text).is_none());
        assert!(Node::wrap(Rc::clone(&doc), comment).is_none());
        assert!(Node::wrap(doc, 999).is_none());
    }

    #[test]
    fn test_parse_errors_propagate() {
        assert!(matches!(Node::parse("<a><b></a>"), Err(XmlError::Parse { .. })));
        assert!(Node::parse("").is_err());
    }

    #[test]
    fn test_value_by_name() {
        let person = Node::parse(PERSON).unwrap();
        assert_eq!(person.value_by_name("name").as_deref(), Some("Ann"));
        assert_eq!(person.value_by_name("tag").as_deref(), Some("a"));
        assert_eq!(person.value_by_name("missing"), None);
    }

    #[test]
    fn test_value_by_path() {
        let person = Node::parse(PERSON).unwrap();
        assert_eq!(person.value_by_path("tag[2]").unwrap().as_deref(), Some("b"));
        assert_eq!(person.value_by_path("@id").unwrap().as_deref(), Some("7"));
        assert_eq!(person.value_by_path("/person/name").unwrap().as_deref(), Some("Ann"));
        assert_eq!(person.value_by_path("count(tag)").unwrap().as_deref(), Some("2"));
        assert_eq!(person.value_by_path("nothing").unwrap(), None);
        assert!(person.value_by_path("tag[").is_err());
    }

    #[test]
    fn test_select_and_parent() {
        let person = Node::parse(PERSON).unwrap();
        let tags = person.select("tag").unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[1].value(), "b");
        let parent = tags[0].parent().unwrap();
        assert!(parent.same_node(&person));
        assert!(person.select("1 + 1").is_err());
    }

    #[test]
    fn test_single_enumeration() {
        let person = Node::parse(PERSON).unwrap();
        let items: Vec<&Node> = person.iter().collect();
        assert_eq!(items.len(), 1);
        assert!(items[0].same_node(&person));

        let mut count = 0;
        for item in person.clone() {
            assert!(item.same_node(&person));
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[test]
    fn test_handles_share_tree() {
        let person = Node::parse(PERSON).unwrap();
        let alias = person.clone();
        alias.set("name", "Bob");
        assert_eq!(person.value_by_name("name").as_deref(), Some("Bob"));
    }

    #[test]
    fn test_debug_shows_name_and_text() {
        let node = Node::parse("<n>x</n>").unwrap();
        let debug = format!("{:?}", node);
        assert!(debug.contains("\"n\""));
        assert!(debug.contains("\"x\""));
    }
}
