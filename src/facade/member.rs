//! Member resolution
//!
//! A member name starting with `_` addresses an attribute; `__` inside it
//! stands for `-`. Any other name addresses child elements.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::Decimal;

use super::Node;
use crate::dom::NodeId;

/// Result of a member lookup
#[derive(Debug, Clone)]
pub enum Member {
    /// No attribute or child element with that name
    Absent,
    /// Attribute value
    Attribute(String),
    /// The only child element with that name
    Node(Node),
    /// Two or more child elements with that name, in document order
    Nodes(Vec<Node>),
}

impl Member {
    pub fn is_absent(&self) -> bool {
        matches!(self, Member::Absent)
    }

    pub fn as_attribute(&self) -> Option<&str> {
        match self {
            Member::Attribute(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Member::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_nodes(&self) -> Option<&[Node]> {
        match self {
            Member::Nodes(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Attribute value or single element text
    pub fn text(&self) -> Option<String> {
        match self {
            Member::Attribute(value) => Some(value.clone()),
            Member::Node(node) => Some(node.value()),
            Member::Absent | Member::Nodes(_) => None,
        }
    }
}

impl IntoIterator for Member {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    /// Element results as a sequence; attributes and absent yield nothing
    fn into_iter(self) -> Self::IntoIter {
        match self {
            Member::Node(node) => vec![node].into_iter(),
            Member::Nodes(nodes) => nodes.into_iter(),
            Member::Absent | Member::Attribute(_) => Vec::new().into_iter(),
        }
    }
}

/// Value assigned through `Node::set` or passed to `Node::invoke`
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Node(Node),
}

impl Value {
    /// String representation written into the tree
    pub fn to_text(&self) -> String {
        match self {
            Value::Text(text) => text.clone(),
            Value::Node(node) => node.value(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            Value::Node(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<&Node> for Value {
    fn from(node: &Node) -> Self {
        Value::Node(node.clone())
    }
}

macro_rules! impl_value_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Text(v.to_string())
                }
            }
        )*
    };
}

impl_value_from_display!(bool, char, u8, i16, u16, i32, u32, i64, u64, f32, f64, Decimal);

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Text(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::Text(v.to_rfc3339())
    }
}

/// Where a member name points
#[derive(Debug, PartialEq, Eq)]
enum Target {
    Attribute(String),
    Element(String),
}

fn resolve(name: &str) -> Target {
    match name.strip_prefix('_') {
        Some(rest) => Target::Attribute(rest.replace("__", "-")),
        None => Target::Element(name.to_string()),
    }
}

impl Node {
    /// Look up a member: attribute for `_name`, child elements otherwise
    pub fn get(&self, name: &str) -> Member {
        let member = match resolve(name) {
            Target::Attribute(attr) => self
                .doc
                .borrow()
                .attribute(self.id, &attr)
                .map_or(Member::Absent, |v| Member::Attribute(v.to_string())),
            Target::Element(element) => {
                let mut ids = self.doc.borrow().children_named(self.id, &element);
                match ids.len() {
                    0 => Member::Absent,
                    1 => Member::Node(self.at(ids.remove(0))),
                    _ => Member::Nodes(self.all_at(ids)),
                }
            }
        };
        tracing::trace!(key = name, absent = member.is_absent(), "member lookup");
        member
    }

    /// Assign a member. The first child element with the name gets its text
    /// replaced; a missing child is created. A `Value::Node` creates (or
    /// fills) the child with that node's text, or leaves a new child empty.
    ///
    /// Always reports the assignment as handled; names the tree rejects are
    /// logged and leave it unchanged.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let outcome = match resolve(name) {
            Target::Attribute(attr) => {
                let text = value.to_text();
                self.doc.borrow_mut().set_attribute(self.id, &attr, &text)
            }
            Target::Element(element) => self.set_element(&element, &value),
        };
        if let Err(e) = outcome {
            tracing::debug!(key = name, error = %e, "member assignment ignored");
        }
        true
    }

    fn set_element(&self, element: &str, value: &Value) -> crate::error::Result<()> {
        let existing = self.doc.borrow().first_child_named(self.id, element);
        let text = value.to_text();
        let mut doc = self.doc.borrow_mut();
        match (existing, value) {
            (Some(child), _) => doc.set_text(child, &text),
            (None, Value::Node(_)) => doc.append_element(self.id, element).map(|_| ()),
            (None, Value::Text(_)) => {
                let child: NodeId = doc.append_element(self.id, element)?;
                doc.set_text(child, &text)
            }
        }
    }

    /// Positional access: index 0 is this element, nothing else exists
    pub fn index(&self, index: usize) -> Option<Node> {
        (index == 0).then(|| self.clone())
    }
}
