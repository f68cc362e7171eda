//! XPath Parser
//!
//! Recursive descent parser for XPath 1.0 expressions.

use super::lexer::{Lexer, Token};
use crate::error::XPathError;

type ParseResult<T> = Result<T, XPathError>;

/// XPath expression AST node
#[derive(Debug, Clone)]
pub enum Expr {
    /// Root path (/)
    Root,
    /// Current context (.)
    Context,
    /// Union of two expressions (|)
    Union(Box<Expr>, Box<Expr>),
    /// Path expression (expr/step)
    Path(Box<Expr>, Box<Step>),
    /// Filter expression with predicate
    Filter(Box<Expr>, Box<Expr>),
    /// Function call
    Function(String, Vec<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Negate(Box<Expr>),
    Number(f64),
    String(String),
    /// Location step relative to the context node
    Step(Box<Step>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Location step in a path
#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn new(axis: Axis, node_test: NodeTest) -> Self {
        Step {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }

    /// `//` expands to `/descendant-or-self::node()/`
    fn descendant_or_self() -> Self {
        Step::new(Axis::DescendantOrSelf, NodeTest::Node)
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            _ => None,
        }
    }

    /// Reverse axes number their nodes nearest-first
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent
                | Axis::Ancestor
                | Axis::AncestorOrSelf
                | Axis::PrecedingSibling
                | Axis::Preceding
        )
    }
}

/// Node test in a location step
#[derive(Debug, Clone)]
pub enum NodeTest {
    /// Matches any element (*)
    Any,
    /// Matches elements with this exact name
    Name(String),
    /// Matches prefix:localname
    QName(String, String),
    /// Matches prefix:*
    NamespaceWildcard(String),
    /// node() - matches any node
    Node,
    /// text() - matches text and CDATA nodes
    Text,
    /// comment() - matches comments
    Comment,
    /// processing-instruction() - matches PIs, optionally by target
    ProcessingInstruction(Option<String>),
}

/// XPath parser over a pre-tokenized expression
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(input: &str) -> ParseResult<Self> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Parser { tokens, pos: 0 })
    }

    /// Parse a complete expression; trailing tokens are an error
    pub fn parse(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_expr()?;
        if *self.current() != Token::Eof {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos + 1).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn unexpected(&self) -> XPathError {
        match self.current() {
            Token::Eof => XPathError::Syntax("Unexpected end of expression".to_string()),
            token => XPathError::Syntax(format!("Unexpected token: {:?}", token)),
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> ParseResult<()> {
        if *self.current() != token {
            return Err(XPathError::Syntax(format!(
                "Expected {}, got {:?}",
                what,
                self.current()
            )));
        }
        self.advance();
        Ok(())
    }

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and_expr()?;

        while *self.current() == Token::Or {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right));
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_equality_expr()?;

        while *self.current() == Token::And {
            self.advance();
            let right = self.parse_equality_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right));
        }

        Ok(left)
    }

    fn parse_equality_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_relational_expr()?;

        loop {
            let op = match self.current() {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    fn parse_relational_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive_expr()?;

        loop {
            let op = match self.current() {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative_expr()?;

        loop {
            let op = match self.current() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary_expr()?;

        loop {
            let op = match self.current() {
                Token::Star => BinaryOp::Mul,
                Token::Div => BinaryOp::Div,
                Token::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> ParseResult<Expr> {
        if *self.current() == Token::Minus {
            self.advance();
            let expr = self.parse_unary_expr()?;
            Ok(Expr::Negate(Box::new(expr)))
        } else {
            self.parse_union_expr()
        }
    }

    fn parse_union_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_path_expr()?;

        while *self.current() == Token::Pipe {
            self.advance();
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// Can the current token begin a location step
    fn at_step_start(&self) -> bool {
        matches!(
            self.current(),
            Token::Name(_)
                | Token::NameTest(_)
                | Token::NodeType(_)
                | Token::Star
                | Token::At
                | Token::Dot
                | Token::DoubleDot
                | Token::Axis(_)
        )
    }

    fn parse_path_expr(&mut self) -> ParseResult<Expr> {
        let expr = match self.current() {
            Token::Slash => {
                self.advance();
                if !self.at_step_start() {
                    // Just "/"
                    return Ok(Expr::Root);
                }
                let step = self.parse_step()?;
                Expr::Path(Box::new(Expr::Root), Box::new(step))
            }
            Token::DoubleSlash => {
                self.advance();
                let step = self.parse_step()?;
                Expr::Path(
                    Box::new(Expr::Path(
                        Box::new(Expr::Root),
                        Box::new(Step::descendant_or_self()),
                    )),
                    Box::new(step),
                )
            }
            _ => self.parse_filter_expr()?,
        };

        self.parse_path_continuation(expr)
    }

    /// Trailing `/step`, `//step` and `[predicate]` parts of a path
    fn parse_path_continuation(&mut self, mut expr: Expr) -> ParseResult<Expr> {
        loop {
            match self.current() {
                Token::Slash => {
                    self.advance();
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                Token::DoubleSlash => {
                    self.advance();
                    let step = self.parse_step()?;
                    expr = Expr::Path(
                        Box::new(Expr::Path(
                            Box::new(expr),
                            Box::new(Step::descendant_or_self()),
                        )),
                        Box::new(step),
                    );
                }
                Token::LeftBracket => {
                    self.advance();
                    let pred = self.parse_expr()?;
                    self.expect(Token::RightBracket, "]")?;
                    expr = Expr::Filter(Box::new(expr), Box::new(pred));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_filter_expr(&mut self) -> ParseResult<Expr> {
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::String(s))
            }
            Token::Dollar => Err(XPathError::Syntax(
                "Variable references are not supported".to_string(),
            )),
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(Token::RightParen, ")")?;
                Ok(expr)
            }
            Token::Name(name) if *self.peek() == Token::LeftParen => {
                self.advance();
                self.advance(); // (
                let args = self.parse_function_args()?;
                Ok(Expr::Function(name, args))
            }
            Token::Dot => {
                self.advance();
                Ok(Expr::Context)
            }
            _ if self.at_step_start() => {
                let step = self.parse_step()?;
                Ok(Expr::Step(Box::new(step)))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Parse a location step
    fn parse_step(&mut self) -> ParseResult<Step> {
        let axis = match self.current().clone() {
            Token::Dot => {
                self.advance();
                return Ok(Step::new(Axis::Self_, NodeTest::Node));
            }
            Token::DoubleDot => {
                self.advance();
                return Ok(Step::new(Axis::Parent, NodeTest::Node));
            }
            Token::At => {
                self.advance();
                Axis::Attribute
            }
            Token::Axis(name) => {
                let axis = Axis::from_name(&name)
                    .ok_or_else(|| XPathError::Syntax(format!("Unknown axis: {}", name)))?;
                self.advance();
                self.expect(Token::DoubleColon, ":: after axis")?;
                axis
            }
            _ => Axis::Child,
        };

        let node_test = self.parse_node_test()?;

        let mut step = Step::new(axis, node_test);
        while *self.current() == Token::LeftBracket {
            self.advance();
            step.predicates.push(self.parse_expr()?);
            self.expect(Token::RightBracket, "]")?;
        }

        Ok(step)
    }

    fn parse_node_test(&mut self) -> ParseResult<NodeTest> {
        let test = match self.current().clone() {
            Token::Star => NodeTest::Any,
            Token::Name(name) => NodeTest::Name(name),
            Token::NameTest(qname) => match qname.split_once(':') {
                Some((prefix, "*")) => NodeTest::NamespaceWildcard(prefix.to_string()),
                Some((prefix, local)) => NodeTest::QName(prefix.to_string(), local.to_string()),
                None => NodeTest::Name(qname),
            },
            Token::NodeType(name) => {
                self.advance();
                self.expect(Token::LeftParen, "(")?;
                let arg = if let Token::String(s) = self.current().clone() {
                    self.advance();
                    Some(s)
                } else {
                    None
                };
                self.expect(Token::RightParen, ")")?;
                return match name.as_str() {
                    "node" => Ok(NodeTest::Node),
                    "text" => Ok(NodeTest::Text),
                    "comment" => Ok(NodeTest::Comment),
                    "processing-instruction" => Ok(NodeTest::ProcessingInstruction(arg)),
                    _ => Err(XPathError::Syntax(format!("Unknown node type: {}", name))),
                };
            }
            _ => {
                return Err(XPathError::Syntax(format!(
                    "Expected node test, got {:?}",
                    self.current()
                )))
            }
        };
        self.advance();
        Ok(test)
    }

    fn parse_function_args(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();

        if *self.current() != Token::RightParen {
            args.push(self.parse_expr()?);

            while *self.current() == Token::Comma {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }

        self.expect(Token::RightParen, ")")?;
        Ok(args)
    }
}

/// Parse an XPath expression string
pub fn parse(input: &str) -> ParseResult<Expr> {
    Parser::new(input)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_path() {
        let expr = parse("/root/child").unwrap();
        assert!(matches!(expr, Expr::Path(..)));
    }

    #[test]
    fn test_predicate_stays_on_step() {
        let expr = parse("item[@id='test']").unwrap();
        match expr {
            Expr::Step(step) => assert_eq!(step.predicates.len(), 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_descendant() {
        let expr = parse("//item").unwrap();
        assert!(matches!(expr, Expr::Path(..)));
    }

    #[test]
    fn test_function() {
        let expr = parse("count(//item)").unwrap();
        assert!(matches!(expr, Expr::Function(name, _) if name == "count"));
    }

    #[test]
    fn test_parent_step() {
        let expr = parse("a/..").unwrap();
        match expr {
            Expr::Path(_, step) => assert_eq!(step.axis, Axis::Parent),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_lone_root() {
        assert!(matches!(parse("/").unwrap(), Expr::Root));
    }

    #[test]
    fn test_malformed() {
        for bad in ["", "a[", "a]", "/a/", "count(", "foo::a", "a b", "$x", "1 +"] {
            assert!(parse(bad).is_err(), "{bad} should not parse");
        }
    }
}
