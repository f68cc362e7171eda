//! XPath Expression Compiler
//!
//! Compiles parsed XPath expressions into a flat stack program.

use super::parser::{Axis, BinaryOp, Expr, NodeTest, Step};
use crate::error::XPathError;

/// Compiled XPath expression
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone)]
pub enum Op {
    /// Push the root of the context node's tree
    Root,
    /// Push context node onto stack
    Context,
    /// Navigate along an axis; predicates apply per context node, in axis order
    Navigate(Axis, CompiledNodeTest, Vec<CompiledExpr>),
    /// Filter the value on top of the stack (document order positions)
    Predicate(Box<CompiledExpr>),
    /// Union two node sets
    Union,
    Number(f64),
    String(String),
    /// Call function: name, arg count
    Call(String, usize),
    Binary(BinaryOp),
    Negate,
}

/// Compiled node test
#[derive(Debug, Clone)]
pub enum CompiledNodeTest {
    Any,
    Name(String),
    /// Qualified name as written, "prefix:local"
    QName(String),
    /// Prefix of a `prefix:*` test
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

impl CompiledExpr {
    /// Compile an XPath expression
    pub fn compile(expr: &Expr) -> Self {
        let mut ops = Vec::new();
        Self::compile_expr(expr, &mut ops);
        CompiledExpr { ops }
    }

    fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) {
        match expr {
            Expr::Root => ops.push(Op::Root),
            Expr::Context => ops.push(Op::Context),
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::String(s) => ops.push(Op::String(s.clone())),
            Expr::Negate(inner) => {
                Self::compile_expr(inner, ops);
                ops.push(Op::Negate);
            }
            Expr::Binary(left, op, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Union);
            }
            Expr::Path(base, step) => {
                Self::compile_expr(base, ops);
                Self::compile_step(step, ops);
            }
            Expr::Filter(base, pred) => {
                Self::compile_expr(base, ops);
                ops.push(Op::Predicate(Box::new(CompiledExpr::compile(pred))));
            }
            Expr::Step(step) => {
                ops.push(Op::Context);
                Self::compile_step(step, ops);
            }
            Expr::Function(name, args) => {
                for arg in args {
                    Self::compile_expr(arg, ops);
                }
                ops.push(Op::Call(name.clone(), args.len()));
            }
        }
    }

    fn compile_step(step: &Step, ops: &mut Vec<Op>) {
        let node_test = match &step.node_test {
            NodeTest::Any => CompiledNodeTest::Any,
            NodeTest::Name(n) => CompiledNodeTest::Name(n.clone()),
            NodeTest::QName(prefix, local) => {
                CompiledNodeTest::QName(format!("{}:{}", prefix, local))
            }
            NodeTest::NamespaceWildcard(prefix) => {
                CompiledNodeTest::NamespaceWildcard(prefix.clone())
            }
            NodeTest::Node => CompiledNodeTest::Node,
            NodeTest::Text => CompiledNodeTest::Text,
            NodeTest::Comment => CompiledNodeTest::Comment,
            NodeTest::ProcessingInstruction(arg) => {
                CompiledNodeTest::ProcessingInstruction(arg.clone())
            }
        };

        let predicates = step.predicates.iter().map(CompiledExpr::compile).collect();
        ops.push(Op::Navigate(step.axis, node_test, predicates));
    }
}

/// Compile an XPath expression string
pub fn compile(xpath: &str) -> Result<CompiledExpr, XPathError> {
    let expr = super::parser::parse(xpath)?;
    Ok(CompiledExpr::compile(&expr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_simple() {
        let compiled = compile("/root").unwrap();
        assert!(matches!(compiled.ops[0], Op::Root));
        assert!(matches!(&compiled.ops[1], Op::Navigate(Axis::Child, CompiledNodeTest::Name(n), _) if n == "root"));
    }

    #[test]
    fn test_compile_step_predicates() {
        let compiled = compile("item[1][@id]").unwrap();
        match &compiled.ops[1] {
            Op::Navigate(_, _, predicates) => assert_eq!(predicates.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_compile_filter() {
        let compiled = compile("(//item)[1]").unwrap();
        assert!(matches!(compiled.ops.last(), Some(Op::Predicate(_))));
    }
}
