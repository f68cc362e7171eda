//! Equality, ordering and hashing
//!
//! Equality and ordering look only at the flattened text, compared
//! ordinally. Hashing uses node identity, so two equal nodes with different
//! identities usually hash differently: do not key hash maps by text through
//! `Node`.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use super::Node;

impl Node {
    /// Order against possibly absent text: absent sorts before any text
    pub fn compare_text(&self, other: Option<&str>) -> Ordering {
        match other {
            Some(text) => self.value().as_str().cmp(text),
            None => Ordering::Greater,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        self.same_node(other) || self.value() == other.value()
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Node) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Node) -> Ordering {
        if self.same_node(other) {
            return Ordering::Equal;
        }
        self.value().cmp(&other.value())
    }
}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.doc).hash(state);
        self.id.hash(state);
    }
}

macro_rules! impl_text_comparisons {
    ($($ty:ty),*) => {
        $(
            impl PartialEq<$ty> for Node {
                fn eq(&self, other: &$ty) -> bool {
                    self.value() == AsRef::<str>::as_ref(other)
                }
            }

            impl PartialEq<Node> for $ty {
                fn eq(&self, other: &Node) -> bool {
                    other == self
                }
            }

            impl PartialOrd<$ty> for Node {
                fn partial_cmp(&self, other: &$ty) -> Option<Ordering> {
                    Some(self.compare_text(Some(AsRef::<str>::as_ref(other))))
                }
            }

            impl PartialOrd<Node> for $ty {
                fn partial_cmp(&self, other: &Node) -> Option<Ordering> {
                    other.partial_cmp(self).map(Ordering::reverse)
                }
            }
        )*
    };
}

impl_text_comparisons!(str, &str, String);

impl PartialEq<Option<&str>> for Node {
    /// A node always has text, so it never equals an absent value
    fn eq(&self, other: &Option<&str>) -> bool {
        other.is_some_and(|text| self.value() == text)
    }
}

impl PartialOrd<Option<&str>> for Node {
    fn partial_cmp(&self, other: &Option<&str>) -> Option<Ordering> {
        Some(self.compare_text(*other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(node: &Node) -> u64 {
        let mut hasher = DefaultHasher::new();
        node.hash(&mut hasher);
        hasher.finish()
    }

    fn pair() -> (Node, Node, Node) {
        let root = Node::parse("<r><a>same</a><b>same</b><c>other</c></r>").unwrap();
        let a = root.get("a").as_node().cloned().unwrap();
        let b = root.get("b").as_node().cloned().unwrap();
        let c = root.get("c").as_node().cloned().unwrap();
        (a, b, c)
    }

    #[test]
    fn test_equality_by_text() {
        let (a, b, c) = pair();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, "same");
        assert_eq!("same", a);
        assert_eq!(a, String::from("same"));
        assert_ne!(a, "Same");
    }

    #[test]
    fn test_ordering() {
        let (a, _, c) = pair();
        assert!(c < a);
        assert!(a > "other");
        assert!("other" < a);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);

        let mut nodes = vec![a.clone(), c.clone()];
        nodes.sort();
        assert_eq!(nodes[0].value(), "other");
    }

    #[test]
    fn test_absent_sorts_first() {
        let (a, _, _) = pair();
        let empty = Node::create("e").unwrap();
        assert_eq!(a.compare_text(None), Ordering::Greater);
        assert_eq!(empty.compare_text(None), Ordering::Greater);
        assert!(empty > None);
        assert_ne!(empty, None);
        assert_eq!(empty, Some(""));
        assert!(empty < a);
    }

    #[test]
    fn test_hash_follows_identity() {
        let (a, b, _) = pair();
        assert_eq!(a, b);
        assert_ne!(hash_of(&a), hash_of(&b));
        assert_eq!(hash_of(&a), hash_of(&a.clone()));

        let again = a.parent().unwrap().get("a").as_node().cloned().unwrap();
        assert_eq!(hash_of(&a), hash_of(&again));
    }
}
