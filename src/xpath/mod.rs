//! XPath 1.0 Engine
//!
//! XPath 1.0 evaluator used by path lookups on the facade:
//! - 12 node and attribute axes with abbreviations and predicates
//! - Core function library
//! - Compiled expressions cached per thread

pub mod axes;
pub mod cache;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use eval::{evaluate, evaluate_from_node, select_nodes, select_string};
pub use value::XPathValue;
