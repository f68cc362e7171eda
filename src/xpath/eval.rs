//! XPath Evaluation Engine
//!
//! Evaluates compiled XPath expressions against a document.
//! Node ids do not follow document order once a tree has been mutated, so
//! node sets are ordered through a pre-order position map built lazily
//! (at most once per evaluation).

use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};

use super::axes::{matches_node_test, navigate};
use super::cache::compile_cached;
use super::compiler::{CompiledExpr, CompiledNodeTest, Op};
use super::functions;
use super::parser::{Axis, BinaryOp};
use super::value::{string_to_number, XPathValue};
use crate::dom::{DocumentAccess, NodeId};
use crate::error::XPathError;

/// Document order positions for one tree
pub struct DocumentOrder {
    root: NodeId,
    positions: OnceCell<HashMap<NodeId, usize>>,
}

impl DocumentOrder {
    pub fn new(root: NodeId) -> Self {
        DocumentOrder {
            root,
            positions: OnceCell::new(),
        }
    }

    /// Sort node ids into document order
    pub fn sort<D: DocumentAccess + ?Sized>(&self, doc: &D, nodes: &mut [NodeId]) {
        if nodes.len() < 2 {
            return;
        }
        let positions = self.positions.get_or_init(|| {
            let mut map = HashMap::new();
            map.insert(self.root, 0);
            for (i, id) in doc.descendants_vec(self.root).into_iter().enumerate() {
                map.insert(id, i + 1);
            }
            map
        });
        nodes.sort_by_key(|id| positions.get(id).copied().unwrap_or(usize::MAX));
    }
}

/// Evaluation context - generic over document type
pub struct EvalContext<'a, D: DocumentAccess + ?Sized> {
    pub doc: &'a D,
    pub context_node: NodeId,
    pub context_position: usize,
    pub context_size: usize,
    pub order: &'a DocumentOrder,
}

impl<'a, D: DocumentAccess + ?Sized> EvalContext<'a, D> {
    fn at(&self, node: NodeId, position: usize, size: usize) -> Self {
        EvalContext {
            doc: self.doc,
            context_node: node,
            context_position: position,
            context_size: size,
            order: self.order,
        }
    }
}

/// Evaluate an XPath expression with the root element as context node
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate<D: DocumentAccess + ?Sized>(
    doc: &D,
    root_element: Option<NodeId>,
    xpath: &str,
) -> Result<XPathValue, XPathError> {
    evaluate_from_node(doc, root_element.unwrap_or(0), xpath)
}

/// Evaluate an XPath expression from a specific context node
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate_from_node<D: DocumentAccess + ?Sized>(
    doc: &D,
    context_node: NodeId,
    xpath: &str,
) -> Result<XPathValue, XPathError> {
    let compiled = compile_cached(xpath)?;
    let order = DocumentOrder::new(doc.tree_root_of(context_node));
    let context = EvalContext {
        doc,
        context_node,
        context_position: 1,
        context_size: 1,
        order: &order,
    };
    evaluate_compiled(&compiled, &context)
}

/// Nodes selected by an expression, in document order.
/// Expressions yielding anything other than a node set are an error.
pub fn select_nodes<D: DocumentAccess + ?Sized>(
    doc: &D,
    context_node: NodeId,
    xpath: &str,
) -> Result<Vec<NodeId>, XPathError> {
    match evaluate_from_node(doc, context_node, xpath)? {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        _ => Err(XPathError::Evaluation(format!(
            "Expression '{}' does not select nodes",
            xpath
        ))),
    }
}

/// String value of the first selected node or attribute; scalar results
/// are converted to their string form. `None` when nothing matched.
pub fn select_string<D: DocumentAccess + ?Sized>(
    doc: &D,
    context_node: NodeId,
    xpath: &str,
) -> Result<Option<String>, XPathError> {
    Ok(match evaluate_from_node(doc, context_node, xpath)? {
        XPathValue::NodeSet(nodes) => nodes.first().map(|&n| doc.string_value(n)),
        XPathValue::Attributes(values) => values.into_iter().next(),
        other => Some(other.to_string_value()),
    })
}

/// Evaluate a compiled expression
pub fn evaluate_compiled<D: DocumentAccess + ?Sized>(
    expr: &CompiledExpr,
    ctx: &EvalContext<'_, D>,
) -> Result<XPathValue, XPathError> {
    let mut stack: Vec<XPathValue> = Vec::new();

    for op in &expr.ops {
        match op {
            Op::Root => {
                stack.push(XPathValue::single_node(ctx.doc.tree_root_of(ctx.context_node)));
            }

            Op::Context => {
                stack.push(XPathValue::single_node(ctx.context_node));
            }

            Op::Navigate(axis, node_test, predicates) => {
                let current = stack.pop().unwrap_or_default();
                let XPathValue::NodeSet(nodes) = current else {
                    stack.push(XPathValue::empty_nodeset());
                    continue;
                };
                if *axis == Axis::Attribute {
                    stack.push(attribute_step(ctx, &nodes, node_test, predicates)?);
                    continue;
                }

                let mut seen = HashSet::with_capacity(nodes.len());
                let mut result = Vec::with_capacity(nodes.len());
                for node in nodes {
                    let mut candidates: Vec<NodeId> = navigate(ctx.doc, node, *axis)
                        .into_iter()
                        .filter(|&c| matches_node_test(ctx.doc, c, node_test))
                        .collect();
                    for pred in predicates {
                        candidates = filter_nodes(ctx, candidates, pred)?;
                    }
                    result.extend(candidates.into_iter().filter(|&c| seen.insert(c)));
                }
                ctx.order.sort(ctx.doc, &mut result);
                stack.push(XPathValue::NodeSet(result));
            }

            Op::Predicate(pred_expr) => {
                let current = stack.pop().unwrap_or_default();
                match current {
                    XPathValue::NodeSet(nodes) => {
                        stack.push(XPathValue::NodeSet(filter_nodes(ctx, nodes, pred_expr)?));
                    }
                    _ => {
                        return Err(XPathError::Evaluation(
                            "Predicates can only filter node-sets".to_string(),
                        ))
                    }
                }
            }

            Op::Union => {
                let right = stack.pop().unwrap_or_default();
                let left = stack.pop().unwrap_or_default();

                match (left, right) {
                    (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
                        let mut seen: HashSet<NodeId> = l.iter().copied().collect();
                        let mut result = l;
                        result.reserve(r.len());
                        result.extend(r.into_iter().filter(|&n| seen.insert(n)));
                        ctx.order.sort(ctx.doc, &mut result);
                        stack.push(XPathValue::NodeSet(result));
                    }
                    (XPathValue::Attributes(mut l), XPathValue::Attributes(r)) => {
                        l.extend(r);
                        stack.push(XPathValue::Attributes(l));
                    }
                    _ => {
                        return Err(XPathError::Evaluation(
                            "Union requires two node-sets".to_string(),
                        ));
                    }
                }
            }

            Op::Number(n) => stack.push(XPathValue::Number(*n)),

            Op::String(s) => stack.push(XPathValue::String(s.clone())),

            Op::Negate => {
                let val = stack.pop().unwrap_or(XPathValue::Number(0.0));
                stack.push(XPathValue::Number(-number_of(ctx.doc, &val)));
            }

            Op::Binary(op) => {
                let right = stack.pop().unwrap_or(XPathValue::Number(0.0));
                let left = stack.pop().unwrap_or(XPathValue::Number(0.0));
                stack.push(binary(ctx.doc, *op, &left, &right));
            }

            Op::Call(name, arg_count) => {
                let split = stack.len().saturating_sub(*arg_count);
                let args = stack.split_off(split);
                let result = functions::call(
                    name,
                    args,
                    ctx.doc,
                    ctx.context_node,
                    ctx.context_position,
                    ctx.context_size,
                )?;
                stack.push(result);
            }
        }
    }

    Ok(stack.pop().unwrap_or_default())
}

/// Keep the nodes for which the predicate holds. A numeric predicate
/// result selects by position.
fn filter_nodes<D: DocumentAccess + ?Sized>(
    ctx: &EvalContext<'_, D>,
    nodes: Vec<NodeId>,
    pred: &CompiledExpr,
) -> Result<Vec<NodeId>, XPathError> {
    let size = nodes.len();
    let mut filtered = Vec::with_capacity(size);

    for (i, &node) in nodes.iter().enumerate() {
        let result = evaluate_compiled(pred, &ctx.at(node, i + 1, size))?;
        let include = match result {
            XPathValue::Number(n) => (i + 1) as f64 == n,
            other => other.to_boolean(),
        };
        if include {
            filtered.push(node);
        }
    }

    Ok(filtered)
}

/// attribute:: step. Predicates see the owning element as context node and
/// count positions over that element's matching attributes.
fn attribute_step<D: DocumentAccess + ?Sized>(
    ctx: &EvalContext<'_, D>,
    nodes: &[NodeId],
    node_test: &CompiledNodeTest,
    predicates: &[CompiledExpr],
) -> Result<XPathValue, XPathError> {
    let mut values = Vec::new();
    for &node in nodes {
        let mut matched: Vec<String> = ctx
            .doc
            .get_attribute_values(node)
            .into_iter()
            .filter(|(name, _)| match node_test {
                CompiledNodeTest::Any | CompiledNodeTest::Node => true,
                CompiledNodeTest::Name(n) | CompiledNodeTest::QName(n) => name == n,
                CompiledNodeTest::NamespaceWildcard(prefix) => name
                    .split_once(':')
                    .is_some_and(|(p, _)| p == prefix),
                _ => false,
            })
            .map(|(_, value)| value.to_string())
            .collect();

        for pred in predicates {
            let size = matched.len();
            let mut kept = Vec::with_capacity(size);
            for (i, value) in matched.into_iter().enumerate() {
                let result = evaluate_compiled(pred, &ctx.at(node, i + 1, size))?;
                let include = match result {
                    XPathValue::Number(n) => (i + 1) as f64 == n,
                    other => other.to_boolean(),
                };
                if include {
                    kept.push(value);
                }
            }
            matched = kept;
        }
        values.extend(matched);
    }
    Ok(XPathValue::Attributes(values))
}

/// Number value of any XPath value, resolving node sets through the document
pub(crate) fn number_of<D: DocumentAccess + ?Sized>(doc: &D, value: &XPathValue) -> f64 {
    match value {
        XPathValue::NodeSet(nodes) => nodes
            .first()
            .map(|&n| string_to_number(&doc.string_value(n)))
            .unwrap_or(f64::NAN),
        other => other.to_number(),
    }
}

/// String values of a node set or attribute list; None for scalars
fn string_set<D: DocumentAccess + ?Sized>(doc: &D, value: &XPathValue) -> Option<Vec<String>> {
    match value {
        XPathValue::NodeSet(nodes) => Some(nodes.iter().map(|&n| doc.string_value(n)).collect()),
        XPathValue::Attributes(values) => Some(values.clone()),
        _ => None,
    }
}

fn binary<D: DocumentAccess + ?Sized>(
    doc: &D,
    op: BinaryOp,
    left: &XPathValue,
    right: &XPathValue,
) -> XPathValue {
    match op {
        BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
        BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
        BinaryOp::Eq => XPathValue::Boolean(equals(doc, left, right, false)),
        BinaryOp::NotEq => XPathValue::Boolean(equals(doc, left, right, true)),
        BinaryOp::Lt => compare_numbers(doc, left, right, |a, b| a < b),
        BinaryOp::LtEq => compare_numbers(doc, left, right, |a, b| a <= b),
        BinaryOp::Gt => compare_numbers(doc, left, right, |a, b| a > b),
        BinaryOp::GtEq => compare_numbers(doc, left, right, |a, b| a >= b),
        BinaryOp::Add => XPathValue::Number(number_of(doc, left) + number_of(doc, right)),
        BinaryOp::Sub => XPathValue::Number(number_of(doc, left) - number_of(doc, right)),
        BinaryOp::Mul => XPathValue::Number(number_of(doc, left) * number_of(doc, right)),
        BinaryOp::Div => XPathValue::Number(number_of(doc, left) / number_of(doc, right)),
        BinaryOp::Mod => XPathValue::Number(number_of(doc, left) % number_of(doc, right)),
    }
}

/// `=` / `!=` per XPath 1.0: a set compares true if any member does
fn equals<D: DocumentAccess + ?Sized>(
    doc: &D,
    left: &XPathValue,
    right: &XPathValue,
    negate: bool,
) -> bool {
    let test = |a: bool| a != negate;

    match (string_set(doc, left), string_set(doc, right)) {
        (Some(ls), Some(rs)) => ls.iter().any(|l| rs.iter().any(|r| test(l == r))),
        (Some(set), None) | (None, Some(set)) => {
            let scalar = if string_set(doc, left).is_some() { right } else { left };
            match scalar {
                XPathValue::Boolean(b) => test(!set.is_empty() == *b),
                XPathValue::Number(n) => set.iter().any(|s| test(string_to_number(s) == *n)),
                other => {
                    let s = other.to_string_value();
                    set.iter().any(|v| test(*v == s))
                }
            }
        }
        (None, None) => match (left, right) {
            (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
                test(left.to_boolean() == right.to_boolean())
            }
            (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
                test(left.to_number() == right.to_number())
            }
            _ => test(left.to_string_value() == right.to_string_value()),
        },
    }
}

/// Relational comparison; sets compare true if any member does
fn compare_numbers<D: DocumentAccess + ?Sized, F>(
    doc: &D,
    left: &XPathValue,
    right: &XPathValue,
    cmp: F,
) -> XPathValue
where
    F: Fn(f64, f64) -> bool,
{
    let numbers = |v: &XPathValue| match string_set(doc, v) {
        Some(set) => set.iter().map(|s| string_to_number(s)).collect::<Vec<_>>(),
        None => vec![v.to_number()],
    };
    let (ls, rs) = (numbers(left), numbers(right));
    XPathValue::Boolean(ls.iter().any(|&l| rs.iter().any(|&r| cmp(l, r))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn eval(doc: &Document, xpath: &str) -> XPathValue {
        evaluate(doc, doc.root_element(), xpath).unwrap()
    }

    fn names(doc: &Document, value: &XPathValue) -> Vec<String> {
        value
            .as_nodeset()
            .unwrap()
            .iter()
            .map(|&n| doc.name(n).unwrap_or("#").to_string())
            .collect()
    }

    #[test]
    fn test_simple_path() {
        let doc = Document::parse("<root><child/></root>").unwrap();
        let result = eval(&doc, "/root/child");
        assert_eq!(result.as_nodeset().unwrap().len(), 1);
    }

    #[test]
    fn test_descendant() {
        let doc = Document::parse("<root><a><b/></a></root>").unwrap();
        assert_eq!(eval(&doc, "//b").as_nodeset().unwrap().len(), 1);
    }

    #[test]
    fn test_predicate_position() {
        let doc = Document::parse("<root><a/><b/><c/></root>").unwrap();
        assert_eq!(names(&doc, &eval(&doc, "/root/*[2]")), vec!["b"]);
        assert_eq!(names(&doc, &eval(&doc, "*[last()]")), vec!["c"]);
    }

    #[test]
    fn test_step_predicate_is_per_context() {
        let doc = Document::parse("<r><g><i>1</i><i>2</i></g><g><i>3</i></g></r>").unwrap();
        let result = eval(&doc, "//g/i[1]");
        assert_eq!(result.as_nodeset().unwrap().len(), 2);
        let result = eval(&doc, "(//i)[1]");
        assert_eq!(result.as_nodeset().unwrap().len(), 1);
    }

    #[test]
    fn test_reverse_axis_positions() {
        let doc = Document::parse("<r><a/><b/><c/></r>").unwrap();
        let result = eval(&doc, "c/preceding-sibling::*[1]");
        assert_eq!(names(&doc, &result), vec!["b"]);
    }

    #[test]
    fn test_count_and_arithmetic() {
        let doc = Document::parse("<root><a>2</a><a>3</a></root>").unwrap();
        assert_eq!(eval(&doc, "count(/root/*)").to_number(), 2.0);
        assert_eq!(eval(&doc, "sum(a) * 2").to_number(), 10.0);
        assert_eq!(eval(&doc, "a + 1").to_number(), 3.0);
    }

    #[test]
    fn test_attribute_axis() {
        let doc = Document::parse("<r><i id=\"1\" k=\"x\"/><i id=\"2\"/></r>").unwrap();
        assert_eq!(
            eval(&doc, "i/@id"),
            XPathValue::Attributes(vec!["1".into(), "2".into()])
        );
        assert_eq!(names(&doc, &eval(&doc, "i[@id='2']")), vec!["i"]);
        assert_eq!(eval(&doc, "count(i[@k])").to_number(), 1.0);
        assert_eq!(eval(&doc, "count(i/@*)").to_number(), 3.0);
    }

    #[test]
    fn test_set_comparisons() {
        let doc = Document::parse("<r><v>1</v><v>5</v></r>").unwrap();
        assert!(eval(&doc, "v = 5").to_boolean());
        assert!(eval(&doc, "v != 5").to_boolean());
        assert!(eval(&doc, "v > 4").to_boolean());
        assert!(!eval(&doc, "v > 5").to_boolean());
        assert!(eval(&doc, "v = '1'").to_boolean());
    }

    #[test]
    fn test_document_order_after_mutation() {
        let mut doc = Document::parse("<r><b/></r>").unwrap();
        let root = doc.root_element().unwrap();
        // Created after <b/>, so its id is larger, but inserted before it
        let a = doc.create_element("a").unwrap();
        let b = doc.first_child_named(root, "b").unwrap();
        doc.detach(b);
        doc.append_child(root, a).unwrap();
        doc.append_child(root, b).unwrap();
        assert!(a > b);
        assert_eq!(names(&doc, &eval(&doc, "b | a")), vec!["a", "b"]);
    }

    #[test]
    fn test_absolute_path_in_detached_tree() {
        let mut doc = Document::new();
        let top = doc.create_element("top").unwrap();
        let child = doc.append_element(top, "child").unwrap();
        let result = evaluate_from_node(&doc, child, "/").unwrap();
        assert_eq!(result, XPathValue::single_node(top));
        let result = evaluate_from_node(&doc, child, "//child").unwrap();
        assert_eq!(result, XPathValue::single_node(child));
    }

    #[test]
    fn test_select_helpers() {
        let doc = Document::parse("<r><a id=\"7\">x</a></r>").unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(select_string(&doc, root, "a").unwrap(), Some("x".to_string()));
        assert_eq!(select_string(&doc, root, "a/@id").unwrap(), Some("7".to_string()));
        assert_eq!(select_string(&doc, root, "missing").unwrap(), None);
        assert_eq!(select_string(&doc, root, "count(a)").unwrap(), Some("1".to_string()));
        assert!(select_nodes(&doc, root, "count(a)").is_err());
        assert!(select_nodes(&doc, root, "a[").is_err());
    }

    #[test]
    fn test_unknown_function() {
        let doc = Document::parse("<r/>").unwrap();
        let err = evaluate(&doc, doc.root_element(), "nope()").unwrap_err();
        assert!(matches!(err, XPathError::UnknownFunction(_)));
    }
}
